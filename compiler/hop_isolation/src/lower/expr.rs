//! Statement and expression lowering for one scope.

use hop_ir::{Name, Span, StringInterner};
use rustc_hash::FxHashMap;

use crate::body::{Body, ClosureId, ExprId, ExprKind, Stmt};
use crate::decl::{Convention, DeclTable, FuncDecl};
use crate::domain::{ActorValue, IsolationDomain, TypeRef};
use crate::ir::{FunctionKind, HopFunction, HopParam, HopRole, HopVarId, IrType, ParamConvention};
use crate::resolve::{CaptureSource, ResolvedScope, ScopeTable};
use crate::thunk::build_isolation_thunk;

use super::executor::{Cleanup, CleanupStack};
use super::{ir_type, HopIrBuilder, HopProblem, HopSignature, LowerOutput, ThunkKey};

/// Read-only inputs shared by every scope of one function.
pub(crate) struct LowerCx<'a> {
    pub decls: &'a DeclTable,
    pub interner: &'a StringInterner,
    pub root: &'a FuncDecl,
    pub scopes: &'a ScopeTable,
}

/// A lowered expression value.
#[derive(Clone, Copy, Debug)]
pub(super) struct Operand {
    pub var: HopVarId,
    /// The value is owned by this expression and must be consumed or
    /// destroyed by whoever uses it.
    pub owned: bool,
    /// Owned by the frame (an owned local); uses must borrow it.
    pub frame_owned: bool,
}

impl Operand {
    pub(super) fn guaranteed(var: HopVarId) -> Self {
        Operand {
            var,
            owned: false,
            frame_owned: false,
        }
    }

    pub(super) fn owned(var: HopVarId) -> Self {
        Operand {
            var,
            owned: true,
            frame_owned: false,
        }
    }
}

/// A `let`-bound value.
#[derive(Clone, Copy, Debug)]
pub(super) struct LocalSlot {
    pub var: HopVarId,
    pub owned: bool,
}

/// Lowers one function or closure body.
pub(crate) struct ScopeLowerer<'a, 'o> {
    pub(super) cx: &'a LowerCx<'a>,
    pub(super) builder: HopIrBuilder,
    pub(super) body: &'a Body,
    pub(super) scope: &'a ResolvedScope,
    pub(super) span: Span,
    pub(super) out: &'o mut LowerOutput,
    pub(super) lowered: &'o mut Vec<HopFunction>,
    pub(super) problems: &'o mut Vec<HopProblem>,
    /// Guaranteed (or entry-borrowed) receiver.
    pub(super) self_var: Option<HopVarId>,
    pub(super) params: Vec<HopVarId>,
    pub(super) captures: Vec<HopVarId>,
    /// Borrowed copies of captured actors, for hops.
    pub(super) capture_execs: FxHashMap<u32, HopVarId>,
    pub(super) locals: Vec<Option<LocalSlot>>,
    pub(super) frame_executor: Option<HopVarId>,
    /// Cleanups run on every exit from the scope.
    pub(super) cleanups: CleanupStack,
    /// Cleanups of the calls currently being lowered, innermost last.
    /// Error edges run all of them.
    pub(super) site_cleanups: CleanupStack,
}

impl<'a, 'o> ScopeLowerer<'a, 'o> {
    fn new(
        cx: &'a LowerCx<'a>,
        body: &'a Body,
        scope: &'a ResolvedScope,
        span: Span,
        out: &'o mut LowerOutput,
        lowered: &'o mut Vec<HopFunction>,
        problems: &'o mut Vec<HopProblem>,
    ) -> Self {
        ScopeLowerer {
            cx,
            builder: HopIrBuilder::new(),
            body,
            scope,
            span,
            out,
            lowered,
            problems,
            self_var: None,
            params: Vec::new(),
            captures: Vec::new(),
            capture_execs: FxHashMap::default(),
            locals: vec![None; body.num_locals() as usize],
            frame_executor: None,
            cleanups: CleanupStack::default(),
            site_cleanups: CleanupStack::default(),
        }
    }

    /// Lower the function itself; closures land in `lowered` after it.
    pub(crate) fn lower_root(
        cx: &'a LowerCx<'a>,
        body: &'a Body,
        out: &'o mut LowerOutput,
        lowered: &'o mut Vec<HopFunction>,
        problems: &'o mut Vec<HopProblem>,
    ) {
        let func = cx.root;
        let scope = cx.scopes.root();
        let mut lowerer = ScopeLowerer::new(cx, body, scope, func.span, out, lowered, problems);

        let mut params = Vec::with_capacity(func.params.len() + 1);
        for param in &func.params {
            let ty = ir_type(cx.interner, Some(&param.ty));
            let convention = convention_of(&ty);
            let var = lowerer.builder.add_block_param(lowerer.builder.entry_block(), ty.clone());
            lowerer.params.push(var);
            params.push(HopParam {
                var,
                ty,
                convention,
            });
        }
        if let Some(receiver) = &func.receiver {
            let ty = IrType::Value(receiver.actor.clone());
            let var = lowerer.builder.add_block_param(lowerer.builder.entry_block(), ty.clone());
            let convention = match receiver.convention {
                Convention::Guaranteed => {
                    lowerer.self_var = Some(var);
                    ParamConvention::Guaranteed
                }
                Convention::Owned => {
                    // One borrow for the whole body; every hop reuses it.
                    let borrowed = lowerer.builder.emit_begin_borrow(var);
                    lowerer.self_var = Some(borrowed);
                    lowerer.cleanups.push(Cleanup::Destroy(var));
                    lowerer.cleanups.push(Cleanup::EndBorrow(borrowed));
                    ParamConvention::Owned
                }
            };
            params.push(HopParam {
                var,
                ty,
                convention,
            });
        }

        lowerer.emit_entry_hop(HopRole::FunctionEntry);
        lowerer.lower_stmts();

        let lowered_fn = lowerer.builder.finish(HopSignature {
            name: func.name,
            kind: FunctionKind::Function,
            params,
            return_type: ir_type(cx.interner, func.result.as_ref()),
            is_async: func.is_async,
            throws: func.throws,
            domain: scope.domain.clone(),
        });
        lowerer.lowered.insert(0, lowered_fn);
    }

    // ── Statements ──────────────────────────────────────────────

    fn lower_stmts(&mut self) {
        let body = self.body;
        for stmt in body.stmts() {
            if self.builder.is_terminated() {
                tracing::trace!("statement after return ignored");
                break;
            }
            match *stmt {
                Stmt::Let { local, value } => {
                    let Some(op) = self.lower_expr(value) else {
                        continue;
                    };
                    if op.owned {
                        self.cleanups.push(Cleanup::Destroy(op.var));
                    }
                    if let Some(slot) = self.locals.get_mut(local.index()) {
                        *slot = Some(LocalSlot {
                            var: op.var,
                            owned: op.owned,
                        });
                    }
                }
                Stmt::Expr(expr) => {
                    if let Some(op) = self.lower_expr(expr) {
                        self.drop_if_owned(op);
                    }
                }
                Stmt::Return(value) => {
                    let var = value.and_then(|e| self.lower_expr(e)).map(|op| op.var);
                    self.emit_frame_cleanups(var);
                    self.builder.terminate_return(var);
                }
            }
        }
        if !self.builder.is_terminated() {
            self.emit_frame_cleanups(None);
            self.builder.terminate_return(None);
        }
    }

    /// Destroy an owned temporary that nothing consumed.
    pub(super) fn drop_if_owned(&mut self, op: Operand) {
        if op.owned && !matches!(self.builder.var_type(op.var), IrType::Int | IrType::Unit) {
            self.builder.emit_destroy_value(op.var);
        }
    }

    // ── Expressions ─────────────────────────────────────────────

    pub(super) fn lower_expr(&mut self, expr: ExprId) -> Option<Operand> {
        let body = self.body;
        let node = body.expr(expr);
        match &node.kind {
            ExprKind::Int(value) => Some(Operand::guaranteed(
                self.builder.emit_literal(*value, Some(node.span)),
            )),
            ExprKind::Param(i) => self.params.get(*i as usize).copied().map(Operand::guaranteed),
            ExprKind::SelfRef => self.self_var.map(Operand::guaranteed),
            ExprKind::Local(local) => {
                let slot = self.locals.get(local.index()).copied().flatten()?;
                Some(Operand {
                    var: slot.var,
                    owned: false,
                    frame_owned: slot.owned,
                })
            }
            ExprKind::Capture(k) => self.captures.get(*k as usize).copied().map(Operand::guaranteed),
            ExprKind::Construct { actor, args } => {
                let mut vars = Vec::with_capacity(args.len());
                for &arg in args {
                    vars.push(self.lower_expr(arg)?.var);
                }
                let var = self.builder.emit_construct(actor.clone(), vars, Some(node.span));
                Some(Operand::owned(var))
            }
            ExprKind::Call(call) => self.lower_call(expr, call, node.span),
            ExprKind::Closure(id) => self.lower_closure(*id, node.span),
            ExprKind::ToAsync {
                value,
                global_actor,
                params,
                result,
            } => {
                let op = self.lower_expr(*value)?;
                let wrapped = if op.owned {
                    op.var
                } else {
                    self.builder.emit_copy_value(op.var)
                };
                let key = ThunkKey {
                    actor: global_actor.clone(),
                    params: params.clone(),
                    result: result.clone(),
                };
                let thunk = self.thunk_for(key)?;
                let f = self.builder.emit_function_ref(thunk);
                let var = self.builder.emit_partial_apply(f, vec![wrapped]);
                Some(Operand::owned(var))
            }
        }
    }

    fn thunk_for(&mut self, key: ThunkKey) -> Option<Name> {
        if let Some(name) = self.out.thunk(&key) {
            return Some(name);
        }
        match build_isolation_thunk(
            self.cx.decls,
            self.cx.interner,
            &key.actor,
            &key.params,
            key.result.as_ref(),
        ) {
            Some(thunk) => {
                let name = thunk.name;
                self.out.add_thunk(key, thunk);
                Some(name)
            }
            None => {
                self.problems
                    .push(HopProblem::UnknownGlobalActor { actor: key.actor });
                None
            }
        }
    }

    // ── Closures ────────────────────────────────────────────────

    /// Form a closure: evaluate its captures, lower its body as a
    /// separate function, and `partial_apply` the captures to it.
    fn lower_closure(&mut self, id: ClosureId, span: Span) -> Option<Operand> {
        let body = self.body;
        let closure = body.closure(id);
        let Some(&child_id) = self.scope.closures.get(&id) else {
            self.problems.push(HopProblem::UnresolvedCall { span });
            return None;
        };
        let child = self.cx.scopes.scope(child_id);

        let mut captured = Vec::with_capacity(child.captures.len());
        for source in &child.captures {
            let var = match source {
                CaptureSource::Expr(e) => {
                    let op = self.lower_expr(*e)?;
                    if op.owned {
                        op.var
                    } else {
                        self.builder.emit_copy_value(op.var)
                    }
                }
                CaptureSource::Actor(value) => {
                    let Some(var) = self.actor_var(*value) else {
                        self.problems.push(HopProblem::MissingExecutor {
                            domain: IsolationDomain::ActorInstance(*value),
                            span,
                        });
                        return None;
                    };
                    self.builder.emit_copy_value(var)
                }
                CaptureSource::CurrentExecutor => self.builder.emit_get_current_executor(),
            };
            captured.push(var);
        }
        let capture_types: Vec<IrType> = captured
            .iter()
            .map(|&v| self.builder.var_type(v).clone())
            .collect();

        let name = self.cx.interner.intern(&format!(
            "{}.closure#{}",
            self.cx.interner.lookup(self.cx.root.name),
            child_id.raw()
        ));

        let mut inner = ScopeLowerer::new(
            self.cx,
            &closure.body,
            child,
            span,
            &mut *self.out,
            &mut *self.lowered,
            &mut *self.problems,
        );
        let entry = inner.builder.entry_block();
        let mut params = Vec::with_capacity(closure.params.len() + capture_types.len());
        for ty in &closure.params {
            let ty = ir_type(self.cx.interner, Some(ty));
            let var = inner.builder.add_block_param(entry, ty.clone());
            inner.params.push(var);
            params.push(HopParam {
                var,
                convention: convention_of(&ty),
                ty,
            });
        }
        for ty in capture_types {
            let var = inner.builder.add_block_param(entry, ty.clone());
            inner.captures.push(var);
            params.push(HopParam {
                var,
                convention: convention_of(&ty),
                ty,
            });
        }
        inner.emit_entry_hop(HopRole::ClosureEntry);
        inner.lower_stmts();
        let func = inner.builder.finish(HopSignature {
            name,
            kind: FunctionKind::Closure,
            params,
            return_type: ir_type(self.cx.interner, closure.result.as_ref()),
            is_async: closure.is_async,
            throws: closure.throws,
            domain: child.domain.clone(),
        });
        self.lowered.push(func);

        let f = self.builder.emit_function_ref(name);
        let var = self.builder.emit_partial_apply(f, captured);
        Some(Operand::owned(var))
    }

    /// Identity used for hop decisions of `expr`.
    pub(super) fn identity(&self, expr: ExprId) -> ActorValue {
        crate::resolve::value_identity(self.body, expr)
    }

    pub(super) fn result_type(&self, result: Option<&TypeRef>) -> IrType {
        ir_type(self.cx.interner, result)
    }
}

fn convention_of(ty: &IrType) -> ParamConvention {
    match ty {
        IrType::Int | IrType::Unit | IrType::Metatype(_) | IrType::Executor => {
            ParamConvention::Trivial
        }
        _ => ParamConvention::Guaranteed,
    }
}
