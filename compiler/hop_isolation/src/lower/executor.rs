//! Executor materialization and cleanup tracking.
//!
//! Turning a domain into a value `hop_to_executor` can take:
//!
//! - stored `shared`: `function_ref` addressor → `apply` →
//!   `pointer_to_address` → `begin_access [read] [dynamic]` →
//!   `load [copy]` → `end_access` → `begin_borrow`
//! - computed `shared`: `metatype` → `function_ref` getter → `apply` →
//!   `begin_borrow`
//! - parameter, guaranteed `self`, isolated parameter: the value itself
//! - owned `self`: the single borrow taken at entry
//! - closure capture: `copy_value` → `begin_borrow`, once per scope
//!
//! Materialization that produces owned values registers the cleanups that
//! end them. Cleanups are kept as stacks and emitted LIFO.

use smallvec::{smallvec, SmallVec};

use crate::decl::{DeclTable, SharedAccessor};
use crate::domain::{ActorValue, IsolationDomain, TypeRef};
use crate::ir::{HopRole, HopVarId, IrType};
use crate::resolve::EntryTarget;

use super::expr::ScopeLowerer;
use super::{HopIrBuilder, HopProblem};

/// End of a borrow or an owned value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Cleanup {
    EndBorrow(HopVarId),
    Destroy(HopVarId),
}

impl Cleanup {
    fn var(self) -> HopVarId {
        match self {
            Cleanup::EndBorrow(v) | Cleanup::Destroy(v) => v,
        }
    }

    fn emit(self, builder: &mut HopIrBuilder) {
        match self {
            Cleanup::EndBorrow(v) => builder.emit_end_borrow(v),
            Cleanup::Destroy(v) => builder.emit_destroy_value(v),
        }
    }
}

/// Cleanups pending at some scope, emitted last-in first-out.
#[derive(Clone, Debug, Default)]
pub(crate) struct CleanupStack(Vec<Cleanup>);

impl CleanupStack {
    /// Push a group given in execution order.
    pub(crate) fn push_group(&mut self, group: &[Cleanup]) {
        self.0.extend(group.iter().rev().copied());
    }

    pub(crate) fn push(&mut self, cleanup: Cleanup) {
        self.0.push(cleanup);
    }

    pub(crate) fn depth(&self) -> usize {
        self.0.len()
    }

    /// Drop everything pushed after `depth` was observed.
    pub(crate) fn truncate(&mut self, depth: usize) {
        self.0.truncate(depth);
    }

    /// Emit the cleanups pushed after `depth` was observed.
    pub(crate) fn emit_from(&self, builder: &mut HopIrBuilder, depth: usize) {
        for cleanup in self.0[depth.min(self.0.len())..].iter().rev() {
            cleanup.emit(builder);
        }
    }

    /// Emit everything, skipping the destroy of `keep` (a value being
    /// returned).
    pub(crate) fn emit(&self, builder: &mut HopIrBuilder, keep: Option<HopVarId>) {
        for cleanup in self.0.iter().rev() {
            if matches!(cleanup, Cleanup::Destroy(_)) && Some(cleanup.var()) == keep {
                continue;
            }
            cleanup.emit(builder);
        }
    }
}

/// A materialized executor and the cleanups ending it, in execution
/// order.
pub(crate) struct Materialized {
    pub executor: HopVarId,
    pub cleanups: SmallVec<[Cleanup; 2]>,
}

/// Materialize `actor.shared` as a borrowed value.
///
/// Returns `None` when `actor` is not a declared global actor.
pub(crate) fn materialize_global_actor(
    builder: &mut HopIrBuilder,
    decls: &DeclTable,
    actor: &TypeRef,
) -> Option<Materialized> {
    let decl = decls.global_actor(actor.name)?;
    let instance = decl.instance_type(actor);

    let owned = match decl.shared {
        SharedAccessor::Stored { addressor } => {
            let f = builder.emit_function_ref(addressor);
            let pointer = builder.emit_apply(IrType::RawPointer, f, vec![], None, None);
            let address = builder.emit_pointer_to_address(pointer, instance);
            let access = builder.emit_begin_access(address);
            let loaded = builder.emit_load(access);
            builder.emit_end_access(access);
            loaded
        }
        SharedAccessor::Computed { getter } => {
            let metatype = builder.emit_metatype(actor.clone());
            let f = builder.emit_function_ref(getter);
            builder.emit_apply(IrType::Value(instance), f, vec![metatype], None, None)
        }
    };
    let executor = builder.emit_begin_borrow(owned);

    Some(Materialized {
        executor,
        cleanups: smallvec![Cleanup::EndBorrow(executor), Cleanup::Destroy(owned)],
    })
}

impl ScopeLowerer<'_, '_> {
    /// The frame's value for an actor identity.
    pub(super) fn actor_var(&mut self, value: ActorValue) -> Option<HopVarId> {
        match value {
            ActorValue::SelfValue => self.self_var,
            ActorValue::Param(i) => self.params.get(i as usize).copied(),
            ActorValue::Local(local) => self
                .locals
                .get(local.index())
                .copied()
                .flatten()
                .map(|slot| slot.var),
            ActorValue::Temp(_) => None,
            ActorValue::Capture(k) => {
                if let Some(&borrowed) = self.capture_execs.get(&k) {
                    return Some(borrowed);
                }
                let captured = *self.captures.get(k as usize)?;
                if !matches!(self.builder.var_type(captured), IrType::Value(_)) {
                    return Some(captured);
                }
                let copy = self.builder.emit_copy_value(captured);
                let borrowed = self.builder.emit_begin_borrow(copy);
                self.cleanups
                    .push_group(&[Cleanup::EndBorrow(borrowed), Cleanup::Destroy(copy)]);
                self.capture_execs.insert(k, borrowed);
                Some(borrowed)
            }
        }
    }

    /// Materialize the executor of `domain`. Identities bound at the
    /// current call site (`site_values`) win over frame values; owned
    /// results register their cleanups on `cleanups`.
    pub(super) fn executor_for(
        &mut self,
        domain: &IsolationDomain,
        site_values: &[(ActorValue, HopVarId)],
        cleanups: &mut CleanupStack,
    ) -> Option<HopVarId> {
        if let IsolationDomain::GlobalActor(actor) = domain {
            let Some(m) = materialize_global_actor(&mut self.builder, self.cx.decls, actor) else {
                self.problems.push(HopProblem::UnknownGlobalActor {
                    actor: actor.clone(),
                });
                return None;
            };
            cleanups.push_group(&m.cleanups);
            return Some(m.executor);
        }

        let value = domain.actor_value()?;
        if let Some(&(_, var)) = site_values.iter().find(|(v, _)| *v == value) {
            return Some(var);
        }
        self.actor_var(value)
    }

    /// Executor of the scope's own domain, materialized once.
    pub(super) fn frame_executor(&mut self) -> Option<HopVarId> {
        if let Some(exec) = self.frame_executor {
            return Some(exec);
        }
        let domain = self.scope.domain.clone();
        let mut cleanups = std::mem::take(&mut self.cleanups);
        let exec = self.executor_for(&domain, &[], &mut cleanups);
        self.cleanups = cleanups;
        self.frame_executor = exec;
        exec
    }

    /// Whole-scope entry hop, if the scope has one.
    pub(super) fn emit_entry_hop(&mut self, role: HopRole) {
        let Some(entry) = self.scope.entry.clone() else {
            return;
        };
        let exec = match &entry {
            EntryTarget::Domain(domain) if *domain == self.scope.domain => self.frame_executor(),
            EntryTarget::Domain(domain) => {
                let mut cleanups = std::mem::take(&mut self.cleanups);
                let exec = self.executor_for(domain, &[], &mut cleanups);
                self.cleanups = cleanups;
                exec
            }
            EntryTarget::CapturedExecutor(k) => self.captures.get(*k as usize).copied(),
        };
        match exec {
            Some(exec) => self.builder.emit_hop(exec, role),
            None => {
                let domain = match entry {
                    EntryTarget::Domain(d) => d,
                    EntryTarget::CapturedExecutor(_) => IsolationDomain::Unspecified,
                };
                self.problems.push(HopProblem::MissingExecutor {
                    domain,
                    span: self.span,
                });
            }
        }
    }

    /// Frame cleanups before leaving the scope.
    pub(super) fn emit_frame_cleanups(&mut self, keep: Option<HopVarId>) {
        self.cleanups.emit(&mut self.builder, keep);
    }
}
