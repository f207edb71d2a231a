//! Executor hop lowering: bound bodies + resolved scopes → Hop IR.
//!
//! # Entry Point
//!
//! [`lower_function`] takes a function declaration, its body, and the
//! [`ScopeTable`] from resolution, and produces the function's
//! [`HopFunction`] plus one per closure literal. Isolation thunks are
//! shared across functions and cached in [`LowerOutput`].
//!
//! # Architecture
//!
//! - [`HopIrBuilder`]: owns the in-progress function, provides block/var
//!   allocation and instruction emission
//! - `ScopeLowerer` (in `expr.rs`): walks statements and expressions
//! - `executor.rs`: materializes executors and tracks cleanups
//! - `calls.rs`: lowers one call as a guarded region with an explicit set
//!   of exit edges, each beginning with its restoring hop

mod calls;
mod executor;
mod expr;

use hop_diagnostic::{Diagnostic, ErrorCode};
use hop_ir::{Name, Span, StringInterner};
use rustc_hash::FxHashMap;

use crate::body::Body;
use crate::decl::{DeclTable, FuncDecl};
use crate::domain::{IsolationDomain, TypeRef};
use crate::ir::{
    CallSiteId, FunctionKind, HopBlock, HopBlockId, HopFunction, HopInstr, HopParam, HopRole,
    HopTerminator, HopVarId, IrType,
};
use crate::plan::PhaseError;
use crate::resolve::ScopeTable;

pub(crate) use self::executor::{materialize_global_actor, CleanupStack};
use self::expr::{LowerCx, ScopeLowerer};

// ── Problems ────────────────────────────────────────────────────────

/// Internal failure during lowering. Resolution has already rejected
/// every user error, so any problem here is a compiler bug and is
/// reported as a placement violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HopProblem {
    /// No value available for the executor of `domain`.
    MissingExecutor {
        domain: IsolationDomain,
        span: Span,
    },
    /// A call expression without a resolved call site.
    UnresolvedCall { span: Span },
    /// A global actor vanished between resolution and lowering.
    UnknownGlobalActor { actor: TypeRef },
    /// The per-site hop state machine rejected an event.
    Phase {
        site: CallSiteId,
        error: PhaseError,
        span: Span,
    },
}

impl HopProblem {
    pub fn to_diagnostic(&self, interner: &StringInterner) -> Diagnostic {
        let diag = Diagnostic::error(ErrorCode::E9001)
            .with_note("this is a bug in hop insertion, not in the program");
        match self {
            HopProblem::MissingExecutor { domain, span } => diag
                .with_message(format!(
                    "no executor value for {} during lowering",
                    domain.describe(interner)
                ))
                .with_label(*span, "needed here"),
            HopProblem::UnresolvedCall { span } => diag
                .with_message("call reached lowering without a resolved call site")
                .with_label(*span, "unresolved"),
            HopProblem::UnknownGlobalActor { actor } => diag.with_message(format!(
                "global actor `{}` disappeared after resolution",
                actor.display(interner)
            )),
            HopProblem::Phase { site, error, span } => diag
                .with_message(format!("call site #{}: {error}", site.raw()))
                .with_label(*span, "while lowering this call"),
        }
    }
}

// ── Output ──────────────────────────────────────────────────────────

/// Key identifying one isolation thunk.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ThunkKey {
    pub actor: TypeRef,
    pub params: Vec<TypeRef>,
    pub result: Option<TypeRef>,
}

/// Functions produced while lowering a module.
#[derive(Debug, Default)]
pub struct LowerOutput {
    pub functions: Vec<HopFunction>,
    thunks: FxHashMap<ThunkKey, Name>,
}

impl LowerOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn thunk(&self, key: &ThunkKey) -> Option<Name> {
        self.thunks.get(key).copied()
    }

    pub(crate) fn add_thunk(&mut self, key: ThunkKey, func: HopFunction) {
        self.thunks.insert(key, func.name);
        self.functions.push(func);
    }
}

// ── BlockBuilder ────────────────────────────────────────────────────

struct BlockBuilder {
    id: HopBlockId,
    params: Vec<(HopVarId, IrType)>,
    body: Vec<HopInstr>,
    spans: Vec<Option<Span>>,
    terminator: Option<HopTerminator>,
}

impl BlockBuilder {
    fn new(id: HopBlockId) -> Self {
        Self {
            id,
            params: Vec::new(),
            body: Vec::new(),
            spans: Vec::new(),
            terminator: None,
        }
    }
}

// ── HopIrBuilder ────────────────────────────────────────────────────

/// Signature data attached by [`HopIrBuilder::finish`].
pub struct HopSignature {
    pub name: Name,
    pub kind: FunctionKind,
    pub params: Vec<HopParam>,
    pub return_type: IrType,
    pub is_async: bool,
    pub throws: bool,
    pub domain: IsolationDomain,
}

/// Builder for an in-progress Hop IR function.
///
/// Position at a block, emit instructions, terminate; the same pattern as
/// LLVM's `IRBuilder`.
pub struct HopIrBuilder {
    blocks: Vec<BlockBuilder>,
    current_block: HopBlockId,
    var_types: Vec<IrType>,
}

impl Default for HopIrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HopIrBuilder {
    /// Create a builder with an entry block already allocated.
    pub fn new() -> Self {
        Self {
            blocks: vec![BlockBuilder::new(HopBlockId::new(0))],
            current_block: HopBlockId::new(0),
            var_types: Vec::new(),
        }
    }

    // Block management

    #[expect(
        clippy::cast_possible_truncation,
        reason = "block indices never exceed u32"
    )]
    pub fn new_block(&mut self) -> HopBlockId {
        let id = HopBlockId::new(self.blocks.len() as u32);
        self.blocks.push(BlockBuilder::new(id));
        id
    }

    pub fn position_at(&mut self, block: HopBlockId) {
        debug_assert!(
            block.index() < self.blocks.len(),
            "HopBlockId {} out of bounds (have {} blocks)",
            block.raw(),
            self.blocks.len(),
        );
        self.current_block = block;
    }

    #[inline]
    pub fn current_block(&self) -> HopBlockId {
        self.current_block
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.blocks[self.current_block.index()].terminator.is_some()
    }

    #[inline]
    pub fn entry_block(&self) -> HopBlockId {
        HopBlockId::new(0)
    }

    // Variable allocation

    #[expect(
        clippy::cast_possible_truncation,
        reason = "variable indices never exceed u32"
    )]
    pub fn fresh_var(&mut self, ty: IrType) -> HopVarId {
        let id = HopVarId::new(self.var_types.len() as u32);
        self.var_types.push(ty);
        id
    }

    pub fn var_type(&self, var: HopVarId) -> &IrType {
        &self.var_types[var.index()]
    }

    pub fn add_block_param(&mut self, block: HopBlockId, ty: IrType) -> HopVarId {
        let var = self.fresh_var(ty.clone());
        self.blocks[block.index()].params.push((var, ty));
        var
    }

    // Instruction emission

    fn push(&mut self, instr: HopInstr, span: Option<Span>) {
        let block = &mut self.blocks[self.current_block.index()];
        debug_assert!(
            block.terminator.is_none(),
            "emitting into terminated block {}",
            self.current_block.raw()
        );
        block.body.push(instr);
        block.spans.push(span);
    }

    pub fn emit_literal(&mut self, value: i64, span: Option<Span>) -> HopVarId {
        let dst = self.fresh_var(IrType::Int);
        self.push(HopInstr::Literal { dst, value }, span);
        dst
    }

    pub fn emit_function_ref(&mut self, func: Name) -> HopVarId {
        let dst = self.fresh_var(IrType::Function);
        self.push(HopInstr::FunctionRef { dst, func }, None);
        dst
    }

    pub fn emit_metatype(&mut self, ty: TypeRef) -> HopVarId {
        let dst = self.fresh_var(IrType::Metatype(ty.clone()));
        self.push(HopInstr::Metatype { dst, ty }, None);
        dst
    }

    pub fn emit_apply(
        &mut self,
        ty: IrType,
        func: HopVarId,
        args: Vec<HopVarId>,
        site: Option<CallSiteId>,
        span: Option<Span>,
    ) -> HopVarId {
        let dst = self.fresh_var(ty);
        self.push(
            HopInstr::Apply {
                dst,
                func,
                args,
                site,
            },
            span,
        );
        dst
    }

    pub fn emit_partial_apply(&mut self, func: HopVarId, captures: Vec<HopVarId>) -> HopVarId {
        let dst = self.fresh_var(IrType::Function);
        self.push(HopInstr::PartialApply { dst, func, captures }, None);
        dst
    }

    pub fn emit_construct(
        &mut self,
        ty: TypeRef,
        args: Vec<HopVarId>,
        span: Option<Span>,
    ) -> HopVarId {
        let dst = self.fresh_var(IrType::Value(ty.clone()));
        self.push(HopInstr::Construct { dst, ty, args }, span);
        dst
    }

    pub fn emit_pointer_to_address(&mut self, pointer: HopVarId, pointee: TypeRef) -> HopVarId {
        let dst = self.fresh_var(IrType::Address(pointee));
        self.push(HopInstr::PointerToAddress { dst, pointer }, None);
        dst
    }

    pub fn emit_begin_access(&mut self, address: HopVarId) -> HopVarId {
        let dst = self.fresh_var(self.var_type(address).clone());
        self.push(HopInstr::BeginAccess { dst, address }, None);
        dst
    }

    pub fn emit_end_access(&mut self, access: HopVarId) {
        self.push(HopInstr::EndAccess { access }, None);
    }

    /// `load [copy]` from an address of type `*T`.
    pub fn emit_load(&mut self, address: HopVarId) -> HopVarId {
        let ty = match self.var_type(address) {
            IrType::Address(pointee) => IrType::Value(pointee.clone()),
            other => other.clone(),
        };
        let dst = self.fresh_var(ty);
        self.push(HopInstr::Load { dst, address }, None);
        dst
    }

    pub fn emit_copy_value(&mut self, value: HopVarId) -> HopVarId {
        let dst = self.fresh_var(self.var_type(value).clone());
        self.push(HopInstr::CopyValue { dst, value }, None);
        dst
    }

    pub fn emit_begin_borrow(&mut self, value: HopVarId) -> HopVarId {
        let dst = self.fresh_var(self.var_type(value).clone());
        self.push(HopInstr::BeginBorrow { dst, value }, None);
        dst
    }

    pub fn emit_end_borrow(&mut self, borrow: HopVarId) {
        self.push(HopInstr::EndBorrow { borrow }, None);
    }

    pub fn emit_destroy_value(&mut self, value: HopVarId) {
        self.push(HopInstr::DestroyValue { value }, None);
    }

    pub fn emit_get_current_executor(&mut self) -> HopVarId {
        let dst = self.fresh_var(IrType::Executor);
        self.push(HopInstr::GetCurrentExecutor { dst }, None);
        dst
    }

    pub fn emit_hop(&mut self, executor: HopVarId, role: HopRole) {
        self.push(HopInstr::HopToExecutor { executor, role }, None);
    }

    // Terminators

    fn terminate(&mut self, terminator: HopTerminator) {
        let block = &mut self.blocks[self.current_block.index()];
        debug_assert!(
            block.terminator.is_none(),
            "block {} already terminated",
            self.current_block.raw()
        );
        block.terminator = Some(terminator);
    }

    pub fn terminate_return(&mut self, value: Option<HopVarId>) {
        self.terminate(HopTerminator::Return { value });
    }

    pub fn terminate_jump(&mut self, target: HopBlockId, args: Vec<HopVarId>) {
        self.terminate(HopTerminator::Jump { target, args });
    }

    pub fn terminate_try_apply(
        &mut self,
        func: HopVarId,
        args: Vec<HopVarId>,
        site: Option<CallSiteId>,
        normal: HopBlockId,
        error: HopBlockId,
    ) {
        self.terminate(HopTerminator::TryApply {
            func,
            args,
            site,
            normal,
            error,
        });
    }

    pub fn terminate_throw(&mut self, value: HopVarId) {
        self.terminate(HopTerminator::Throw { value });
    }

    pub fn terminate_unreachable(&mut self) {
        self.terminate(HopTerminator::Unreachable);
    }

    // Finalization

    /// Consume the builder and produce a finished [`HopFunction`].
    ///
    /// Unterminated blocks get `Unreachable` (with a tracing warning).
    pub fn finish(mut self, sig: HopSignature) -> HopFunction {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut spans = Vec::with_capacity(self.blocks.len());

        for bb in &mut self.blocks {
            let terminator = bb.terminator.take().unwrap_or_else(|| {
                tracing::warn!(
                    block = bb.id.raw(),
                    "unterminated block in hop IR, adding Unreachable"
                );
                HopTerminator::Unreachable
            });
            blocks.push(HopBlock {
                id: bb.id,
                params: std::mem::take(&mut bb.params),
                body: std::mem::take(&mut bb.body),
                terminator,
            });
            spans.push(std::mem::take(&mut bb.spans));
        }

        HopFunction {
            name: sig.name,
            kind: sig.kind,
            params: sig.params,
            return_type: sig.return_type,
            blocks,
            entry: HopBlockId::new(0),
            var_types: self.var_types,
            spans,
            is_async: sig.is_async,
            throws: sig.throws,
            domain: sig.domain,
        }
    }
}

// ── Types ───────────────────────────────────────────────────────────

/// IR type of a source type; `None` is `()`.
pub(crate) fn ir_type(interner: &StringInterner, ty: Option<&TypeRef>) -> IrType {
    match ty {
        None => IrType::Unit,
        Some(t) if t.args.is_empty() && interner.lookup(t.name) == "Int" => IrType::Int,
        Some(t) => IrType::Value(t.clone()),
    }
}

// ── Public entry point ──────────────────────────────────────────────

/// Lower `func` and its closures into `out`.
///
/// On success the function and its closures are appended to
/// `out.functions` (function first). On failure nothing from this
/// function is appended; isolation thunks it requested stay cached.
pub fn lower_function(
    decls: &DeclTable,
    interner: &StringInterner,
    func: &FuncDecl,
    body: &Body,
    scopes: &ScopeTable,
    out: &mut LowerOutput,
) -> Result<(), Vec<HopProblem>> {
    let mut problems = Vec::new();
    let mut lowered = Vec::new();
    let cx = LowerCx {
        decls,
        interner,
        root: func,
        scopes,
    };

    ScopeLowerer::lower_root(&cx, body, out, &mut lowered, &mut problems);

    tracing::debug!(
        function = interner.lookup(func.name),
        closures = lowered.len().saturating_sub(1),
        hops = lowered.iter().map(HopFunction::hop_count).sum::<usize>(),
        problems = problems.len(),
        "lowered"
    );

    if problems.is_empty() {
        out.functions.extend(lowered);
        Ok(())
    } else {
        Err(problems)
    }
}
