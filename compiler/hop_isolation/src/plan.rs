//! Hop insertion planning.
//!
//! Turns a resolved call site into a [`HopPlan`]: whether the call needs a
//! switch to the callee's executor, what to restore afterwards, and on
//! which exit edges. Plans are ephemeral; codegen consumes them
//! immediately.
//!
//! # Tie-breaks
//!
//! In order:
//!
//! 1. Caller and callee statically on the same executor: no hop.
//! 2. `Nonisolated` callee: no hop, it runs wherever it is called from.
//! 3. `Unspecified` callee: no hop, it inherits the caller's context.
//! 4. Otherwise hop to the callee. A statically isolated caller restores
//!    to its own executor; a `Nonisolated` or `Unspecified` caller reads
//!    the current executor immediately before the entry hop and restores
//!    to that.

use std::fmt;

use bitflags::bitflags;
use hop_ir::Span;

use crate::domain::IsolationDomain;
use crate::ir::CallSiteId;

bitflags! {
    /// Control-flow edges leaving a guarded call.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ExitKinds: u8 {
        const NORMAL = 1 << 0;
        const ERROR = 1 << 1;
    }
}

/// One invocation, with both domains expressed in the caller's frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub id: CallSiteId,
    pub caller: IsolationDomain,
    pub callee: IsolationDomain,
    pub is_async: bool,
    pub throws: bool,
    /// Receiver is an owned value (local construction or temporary).
    pub owned_receiver: bool,
    pub span: Span,
}

/// Executor restored by the exit hops.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RestoreTarget {
    /// The caller's own static domain.
    Caller(IsolationDomain),
    /// The executor read by `getCurrentExecutor` before the entry hop.
    CapturedExecutor,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HopPlan {
    pub needs_entry_hop: bool,
    pub entry_target: Option<IsolationDomain>,
    pub needs_exit_hop: bool,
    pub exit_paths: ExitKinds,
    pub restore: Option<RestoreTarget>,
    /// Read the current executor immediately before the entry hop.
    pub capture_current: bool,
}

impl HopPlan {
    pub fn no_hop() -> Self {
        HopPlan {
            needs_entry_hop: false,
            entry_target: None,
            needs_exit_hop: false,
            exit_paths: ExitKinds::empty(),
            restore: None,
            capture_current: false,
        }
    }

    /// Number of exit hops codegen must emit.
    pub fn exit_count(&self) -> usize {
        if self.needs_exit_hop {
            self.exit_paths.iter().count()
        } else {
            0
        }
    }
}

/// Plan the hops around one call.
pub fn plan_call(site: &CallSite) -> HopPlan {
    let skip = site.caller.same_executor(&site.callee)
        || matches!(
            site.callee,
            IsolationDomain::Nonisolated | IsolationDomain::Unspecified
        );

    if skip {
        tracing::trace!(site = site.id.raw(), callee = ?site.callee, "no hop");
        return HopPlan::no_hop();
    }

    let mut exit_paths = ExitKinds::NORMAL;
    if site.throws {
        exit_paths |= ExitKinds::ERROR;
    }

    let (restore, capture_current) = if site.caller.is_static() {
        (RestoreTarget::Caller(site.caller.clone()), false)
    } else {
        (RestoreTarget::CapturedExecutor, true)
    };

    tracing::trace!(
        site = site.id.raw(),
        caller = ?site.caller,
        callee = ?site.callee,
        capture_current,
        "hop around call"
    );

    HopPlan {
        needs_entry_hop: true,
        entry_target: Some(site.callee.clone()),
        needs_exit_hop: true,
        exit_paths,
        restore: Some(restore),
        capture_current,
    }
}

/// Whole-function entry hop: only async scopes with a static domain hop
/// once at entry. Synchronous scopes never do; they cannot suspend.
pub fn plan_entry(domain: &IsolationDomain, is_async: bool) -> Option<IsolationDomain> {
    (is_async && domain.is_static()).then(|| domain.clone())
}

// ── Per-site state machine ──────────────────────────────────────────

/// Codegen progress through one call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HopPhase {
    /// No hop planned; waiting for the apply.
    NoHop,
    PendingEntry,
    Executing,
    /// Some exit edges still lack their restoring hop.
    PendingExit,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HopEvent {
    EntryHop,
    Apply,
    ExitHop(ExitKinds),
}

/// An event arrived in a phase that does not accept it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhaseError {
    pub phase: HopPhase,
    pub event: HopEvent,
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected {:?} in phase {:?}", self.event, self.phase)
    }
}

/// Tracks one site through `NoHop → Done` or
/// `PendingEntry → Executing → PendingExit (per edge) → Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SiteProgress {
    phase: HopPhase,
    remaining: ExitKinds,
}

impl SiteProgress {
    pub fn new(plan: &HopPlan) -> Self {
        if plan.needs_entry_hop {
            SiteProgress {
                phase: HopPhase::PendingEntry,
                remaining: if plan.needs_exit_hop {
                    plan.exit_paths
                } else {
                    ExitKinds::empty()
                },
            }
        } else {
            SiteProgress {
                phase: HopPhase::NoHop,
                remaining: ExitKinds::empty(),
            }
        }
    }

    pub fn phase(&self) -> HopPhase {
        self.phase
    }

    pub fn advance(&mut self, event: HopEvent) -> Result<HopPhase, PhaseError> {
        let next = match (self.phase, event) {
            (HopPhase::NoHop, HopEvent::Apply) => HopPhase::Done,
            (HopPhase::PendingEntry, HopEvent::EntryHop) => HopPhase::Executing,
            (HopPhase::Executing, HopEvent::Apply) if self.remaining.is_empty() => HopPhase::Done,
            (HopPhase::Executing, HopEvent::Apply) => HopPhase::PendingExit,
            (HopPhase::PendingExit, HopEvent::ExitHop(kind))
                if kind.bits().count_ones() == 1 && self.remaining.contains(kind) =>
            {
                self.remaining.remove(kind);
                if self.remaining.is_empty() {
                    HopPhase::Done
                } else {
                    HopPhase::PendingExit
                }
            }
            (phase, event) => return Err(PhaseError { phase, event }),
        };
        self.phase = next;
        Ok(next)
    }
}
