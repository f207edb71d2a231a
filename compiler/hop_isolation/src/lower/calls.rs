//! Guarded call lowering.
//!
//! A call with a hop plan is emitted as a region:
//!
//! ```text
//!   <operands, borrows>
//!   <restore executor>          ; frame executor, or get_current_executor
//!   <target executor>
//!   hop_to_executor target      ; CallEntry
//!   apply / try_apply
//! normal:                       ; and error:, for throwing calls
//!   hop_to_executor restore     ; CallExit, first on every exit edge
//!   <site cleanups>
//! ```
//!
//! Nothing is emitted between the apply and an exit hop, so no code runs on
//! the callee's executor after the callee returns.

use hop_ir::Span;
use smallvec::SmallVec;

use crate::body::{Call, Callee, ExprId};
use crate::domain::{ActorValue, IsolationDomain};
use crate::ir::{CallSiteId, HopRole, HopVarId, IrType};
use crate::plan::{ExitKinds, HopEvent, RestoreTarget, SiteProgress};
use crate::resolve::ResolvedCall;

use super::executor::Cleanup;
use super::expr::{Operand, ScopeLowerer};
use super::HopProblem;

/// Operand values bound at one call site, by identity.
type SiteValues = SmallVec<[(ActorValue, HopVarId); 4]>;

impl ScopeLowerer<'_, '_> {
    pub(super) fn lower_call(&mut self, expr: ExprId, call: &Call, span: Span) -> Option<Operand> {
        let scope = self.scope;
        let Some(resolved) = scope.calls.get(&expr) else {
            self.problems.push(HopProblem::UnresolvedCall { span });
            return None;
        };
        let ResolvedCall { site, plan, result } = resolved;
        let depth = self.site_cleanups.depth();
        let mut site_values = SiteValues::new();

        // Receiver and arguments, left to right; the receiver goes last in
        // the argument list. An owned receiver is borrowed across the call.
        let receiver = match call.receiver {
            Some(r) => Some(self.call_operand(r, Some(site.owned_receiver), &mut site_values)?),
            None => None,
        };
        let mut args = Vec::with_capacity(call.args.len() + 1);
        for &arg in &call.args {
            args.push(self.call_operand(arg, None, &mut site_values)?);
        }
        args.extend(receiver);

        let func = match &call.callee {
            Callee::Direct(name) => self.builder.emit_function_ref(*name),
            Callee::Value { func, .. } => {
                let op = self.lower_expr(*func)?;
                if op.owned {
                    self.site_cleanups.push(Cleanup::Destroy(op.var));
                }
                op.var
            }
        };

        let mut restore = None;
        if plan.needs_entry_hop {
            let Some(target) = &plan.entry_target else {
                self.problems.push(HopProblem::MissingExecutor {
                    domain: site.callee.clone(),
                    span,
                });
                return None;
            };
            restore = match &plan.restore {
                Some(RestoreTarget::Caller(domain)) => {
                    let exec = self.frame_executor();
                    if exec.is_none() {
                        self.problems.push(HopProblem::MissingExecutor {
                            domain: domain.clone(),
                            span,
                        });
                    }
                    exec
                }
                Some(RestoreTarget::CapturedExecutor) | None => None,
            };

            let mut site_cleanups = std::mem::take(&mut self.site_cleanups);
            let exec = self.executor_for(target, &site_values, &mut site_cleanups);
            self.site_cleanups = site_cleanups;
            let Some(exec) = exec else {
                self.problems.push(HopProblem::MissingExecutor {
                    domain: target.clone(),
                    span,
                });
                return None;
            };

            // Read immediately before the switch: nothing may suspend in
            // between.
            if plan.capture_current {
                restore = Some(self.builder.emit_get_current_executor());
            }
            self.builder.emit_hop(exec, HopRole::CallEntry(site.id));
            if plan.needs_exit_hop && restore.is_none() {
                return None;
            }
        }
        let mut guard = Guard {
            site: site.id,
            span,
            progress: SiteProgress::new(plan),
            exits: if plan.needs_exit_hop {
                plan.exit_paths
            } else {
                ExitKinds::empty()
            },
            restore,
        };
        if plan.needs_entry_hop {
            self.step(&mut guard, HopEvent::EntryHop)?;
        }

        let result_ty = self.result_type(result.as_ref());
        let owned_result = !matches!(result_ty, IrType::Int | IrType::Unit);

        if !site.throws {
            let dst = self
                .builder
                .emit_apply(result_ty, func, args, Some(site.id), Some(span));
            self.step(&mut guard, HopEvent::Apply)?;
            self.exit_edge(&mut guard, ExitKinds::NORMAL)?;
            self.site_cleanups.emit_from(&mut self.builder, depth);
            self.site_cleanups.truncate(depth);
            return Some(Operand {
                var: dst,
                owned: owned_result,
                frame_owned: false,
            });
        }

        let normal = self.builder.new_block();
        let error = self.builder.new_block();
        let dst = self.builder.add_block_param(normal, result_ty);
        let err = self.builder.add_block_param(error, IrType::Error);
        self.builder
            .terminate_try_apply(func, args, Some(site.id), normal, error);
        self.step(&mut guard, HopEvent::Apply)?;

        // Error edge: restore, then unwind every pending cleanup.
        self.builder.position_at(error);
        self.exit_edge(&mut guard, ExitKinds::ERROR)?;
        self.site_cleanups.emit_from(&mut self.builder, 0);
        self.emit_frame_cleanups(None);
        self.builder.terminate_throw(err);

        self.builder.position_at(normal);
        self.exit_edge(&mut guard, ExitKinds::NORMAL)?;
        self.site_cleanups.emit_from(&mut self.builder, depth);
        self.site_cleanups.truncate(depth);

        Some(Operand {
            var: dst,
            owned: owned_result,
            frame_owned: false,
        })
    }

    /// Lower one receiver or argument, borrowing owned actor values for the
    /// duration of the call. `owned` overrides the operand's own ownership
    /// when the call site already decided it.
    fn call_operand(
        &mut self,
        expr: ExprId,
        owned: Option<bool>,
        site_values: &mut SiteValues,
    ) -> Option<HopVarId> {
        let op = self.lower_expr(expr)?;
        let is_value = matches!(self.builder.var_type(op.var), IrType::Value(_));
        let borrow = owned.unwrap_or(op.owned || op.frame_owned);

        let var = if is_value && borrow {
            let borrowed = self.builder.emit_begin_borrow(op.var);
            if op.owned {
                self.site_cleanups
                    .push_group(&[Cleanup::EndBorrow(borrowed), Cleanup::Destroy(op.var)]);
            } else {
                self.site_cleanups.push(Cleanup::EndBorrow(borrowed));
            }
            borrowed
        } else {
            if op.owned && !matches!(self.builder.var_type(op.var), IrType::Int | IrType::Unit) {
                self.site_cleanups.push(Cleanup::Destroy(op.var));
            }
            op.var
        };

        if is_value {
            site_values.push((self.identity(expr), var));
        }
        Some(var)
    }

    /// Restoring hop at the start of one exit edge, if the plan has one
    /// for `kind`.
    fn exit_edge(&mut self, guard: &mut Guard, kind: ExitKinds) -> Option<()> {
        if !guard.exits.contains(kind) {
            return Some(());
        }
        let Some(restore) = guard.restore else {
            self.problems.push(HopProblem::MissingExecutor {
                domain: IsolationDomain::Unspecified,
                span: guard.span,
            });
            return None;
        };
        self.builder.emit_hop(restore, HopRole::CallExit(guard.site));
        self.step(guard, HopEvent::ExitHop(kind))
    }

    fn step(&mut self, guard: &mut Guard, event: HopEvent) -> Option<()> {
        match guard.progress.advance(event) {
            Ok(_) => Some(()),
            Err(error) => {
                self.problems.push(HopProblem::Phase {
                    site: guard.site,
                    error,
                    span: guard.span,
                });
                None
            }
        }
    }
}

/// Per-site codegen state.
struct Guard {
    site: CallSiteId,
    span: Span,
    progress: SiteProgress,
    /// Edges that must begin with a restoring hop.
    exits: ExitKinds,
    restore: Option<HopVarId>,
}
