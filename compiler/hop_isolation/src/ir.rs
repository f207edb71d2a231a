//! Hop IR: basic-block representation produced by executor hop lowering.
//!
//! - **[`HopFunction`]**: a lowered function, closure, or thunk
//! - **[`HopBlock`]**: block parameters, body instructions, terminator
//! - **[`HopInstr`]**: one instruction; [`HopInstr::HopToExecutor`] is the
//!   runtime switch primitive, tagged with its [`HopRole`]
//! - **[`HopTerminator`]**: block exit, including `try_apply` with normal
//!   and error successors
//!
//! Values are named via [`HopVarId`] (SSA). Every call lowered from
//! source carries a [`CallSiteId`] so hops can be paired with the call
//! they guard.

use hop_ir::{Name, Span};

use crate::domain::{IsolationDomain, TypeRef};

// ── ID newtypes ─────────────────────────────────────────────────────

/// SSA value within one [`HopFunction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HopVarId(u32);

impl HopVarId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block within one [`HopFunction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HopBlockId(u32);

impl HopBlockId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A source call within one [`HopFunction`], allocated sequentially.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CallSiteId(u32);

impl CallSiteId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

// ── Types ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrType {
    Int,
    Unit,
    /// A nominal value, usually an actor reference.
    Value(TypeRef),
    /// `Optional<Builtin.Executor>` from `getCurrentExecutor`.
    Executor,
    RawPointer,
    Address(TypeRef),
    Metatype(TypeRef),
    Function,
    Error,
}

/// How a parameter is passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamConvention {
    Trivial,
    Guaranteed,
    Owned,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HopParam {
    pub var: HopVarId,
    pub ty: IrType,
    pub convention: ParamConvention,
}

// ── Instructions ────────────────────────────────────────────────────

/// Why a hop was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HopRole {
    /// Whole-function entry hop of an async function.
    FunctionEntry,
    /// Entry hop of a closure re-establishing its isolation.
    ClosureEntry,
    /// Switch to the callee's executor before the call.
    CallEntry(CallSiteId),
    /// Restore after the call, one per exit edge.
    CallExit(CallSiteId),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HopInstr {
    /// `let dst: Int = value`.
    Literal { dst: HopVarId, value: i64 },

    /// Reference to a declared function, accessor, or thunk.
    FunctionRef { dst: HopVarId, func: Name },

    /// `metatype $@thin T.Type`.
    Metatype { dst: HopVarId, ty: TypeRef },

    /// Call through a function value. `site` is set for calls lowered
    /// from source; accessor and constructor calls have none.
    Apply {
        dst: HopVarId,
        func: HopVarId,
        args: Vec<HopVarId>,
        site: Option<CallSiteId>,
    },

    /// Closure formation: bind `captures` to `func`.
    PartialApply {
        dst: HopVarId,
        func: HopVarId,
        captures: Vec<HopVarId>,
    },

    /// Allocate an actor instance. The result is owned.
    Construct {
        dst: HopVarId,
        ty: TypeRef,
        args: Vec<HopVarId>,
    },

    PointerToAddress { dst: HopVarId, pointer: HopVarId },

    /// `begin_access [read] [dynamic]`.
    BeginAccess { dst: HopVarId, address: HopVarId },

    EndAccess { access: HopVarId },

    /// `load [copy]`.
    Load { dst: HopVarId, address: HopVarId },

    CopyValue { dst: HopVarId, value: HopVarId },

    BeginBorrow { dst: HopVarId, value: HopVarId },

    EndBorrow { borrow: HopVarId },

    DestroyValue { value: HopVarId },

    /// `builtin "getCurrentExecutor"()`.
    GetCurrentExecutor { dst: HopVarId },

    /// Runtime switch to `executor`.
    HopToExecutor { executor: HopVarId, role: HopRole },
}

impl HopInstr {
    /// The variable defined by this instruction, if any.
    pub fn defined_var(&self) -> Option<HopVarId> {
        match self {
            HopInstr::Literal { dst, .. }
            | HopInstr::FunctionRef { dst, .. }
            | HopInstr::Metatype { dst, .. }
            | HopInstr::Apply { dst, .. }
            | HopInstr::PartialApply { dst, .. }
            | HopInstr::Construct { dst, .. }
            | HopInstr::PointerToAddress { dst, .. }
            | HopInstr::BeginAccess { dst, .. }
            | HopInstr::Load { dst, .. }
            | HopInstr::CopyValue { dst, .. }
            | HopInstr::BeginBorrow { dst, .. }
            | HopInstr::GetCurrentExecutor { dst } => Some(*dst),

            HopInstr::EndAccess { .. }
            | HopInstr::EndBorrow { .. }
            | HopInstr::DestroyValue { .. }
            | HopInstr::HopToExecutor { .. } => None,
        }
    }

    /// Variables read by this instruction.
    pub fn used_vars(&self) -> Vec<HopVarId> {
        match self {
            HopInstr::Literal { .. }
            | HopInstr::FunctionRef { .. }
            | HopInstr::Metatype { .. }
            | HopInstr::GetCurrentExecutor { .. } => vec![],

            HopInstr::Apply { func, args, .. } => {
                let mut vars = Vec::with_capacity(1 + args.len());
                vars.push(*func);
                vars.extend_from_slice(args);
                vars
            }
            HopInstr::PartialApply { func, captures, .. } => {
                let mut vars = Vec::with_capacity(1 + captures.len());
                vars.push(*func);
                vars.extend_from_slice(captures);
                vars
            }
            HopInstr::Construct { args, .. } => args.clone(),

            HopInstr::PointerToAddress { pointer: v, .. }
            | HopInstr::BeginAccess { address: v, .. }
            | HopInstr::EndAccess { access: v }
            | HopInstr::Load { address: v, .. }
            | HopInstr::CopyValue { value: v, .. }
            | HopInstr::BeginBorrow { value: v, .. }
            | HopInstr::EndBorrow { borrow: v }
            | HopInstr::DestroyValue { value: v }
            | HopInstr::HopToExecutor { executor: v, .. } => vec![*v],
        }
    }

    /// The hop's executor and role, if this is a hop.
    #[inline]
    pub fn as_hop(&self) -> Option<(HopVarId, HopRole)> {
        match self {
            HopInstr::HopToExecutor { executor, role } => Some((*executor, *role)),
            _ => None,
        }
    }
}

// ── Terminators ─────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HopTerminator {
    /// Return, `None` for `()`.
    Return { value: Option<HopVarId> },

    Jump {
        target: HopBlockId,
        args: Vec<HopVarId>,
    },

    /// Throwing call. The result is the `normal` block's parameter; the
    /// error is the `error` block's parameter.
    TryApply {
        func: HopVarId,
        args: Vec<HopVarId>,
        site: Option<CallSiteId>,
        normal: HopBlockId,
        error: HopBlockId,
    },

    Throw { value: HopVarId },

    Unreachable,
}

impl HopTerminator {
    pub fn used_vars(&self) -> Vec<HopVarId> {
        match self {
            HopTerminator::Return { value } => value.iter().copied().collect(),
            HopTerminator::Jump { args, .. } => args.clone(),
            HopTerminator::TryApply { func, args, .. } => {
                let mut vars = Vec::with_capacity(1 + args.len());
                vars.push(*func);
                vars.extend_from_slice(args);
                vars
            }
            HopTerminator::Throw { value } => vec![*value],
            HopTerminator::Unreachable => vec![],
        }
    }
}

// ── Blocks ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HopBlock {
    pub id: HopBlockId,
    pub params: Vec<(HopVarId, IrType)>,
    pub body: Vec<HopInstr>,
    pub terminator: HopTerminator,
}

// ── Functions ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Function,
    Closure,
    /// Isolation thunk wrapping a synchronous global-actor function value.
    Thunk,
}

/// A lowered function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HopFunction {
    pub name: Name,
    pub kind: FunctionKind,
    pub params: Vec<HopParam>,
    pub return_type: IrType,
    /// `blocks[entry.index()]` is the entry block.
    pub blocks: Vec<HopBlock>,
    pub entry: HopBlockId,
    /// Indexed by `HopVarId::index()`.
    pub var_types: Vec<IrType>,
    /// Indexed by `[block_index][instr_index]`; `None` for synthetic
    /// instructions such as hops and accessor calls.
    pub spans: Vec<Vec<Option<Span>>>,
    pub is_async: bool,
    pub throws: bool,
    pub domain: IsolationDomain,
}

impl HopFunction {
    /// # Panics
    ///
    /// Debug-panics if `var` is out of bounds.
    #[inline]
    pub fn var_type(&self, var: HopVarId) -> &IrType {
        debug_assert!(
            var.index() < self.var_types.len(),
            "HopVarId {} out of bounds (have {} vars)",
            var.raw(),
            self.var_types.len(),
        );
        &self.var_types[var.index()]
    }

    #[inline]
    pub fn block(&self, id: HopBlockId) -> &HopBlock {
        &self.blocks[id.index()]
    }

    /// All hops in block order, with their position.
    pub fn hops(&self) -> impl Iterator<Item = (HopBlockId, usize, HopVarId, HopRole)> + '_ {
        self.blocks.iter().flat_map(|block| {
            block
                .body
                .iter()
                .enumerate()
                .filter_map(move |(i, instr)| {
                    instr
                        .as_hop()
                        .map(|(executor, role)| (block.id, i, executor, role))
                })
        })
    }

    pub fn hop_count(&self) -> usize {
        self.hops().count()
    }

    /// Remove one instruction, keeping `spans` aligned.
    pub fn remove_instr(&mut self, block: HopBlockId, index: usize) -> HopInstr {
        let bi = block.index();
        if index < self.spans[bi].len() {
            self.spans[bi].remove(index);
        }
        self.blocks[bi].body.remove(index)
    }
}

#[cfg(test)]
mod tests;
