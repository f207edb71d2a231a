//! Hop placement verification.
//!
//! Runs on freshly lowered functions, before coalescing. Every violation
//! is a compiler bug, reported as `E9001`.
//!
//! For each call site that has a `CallEntry` hop:
//!
//! - exactly one entry hop, immediately followed by the site's apply
//! - one `CallExit` hop first on every exit edge of the apply, and no
//!   other exit hops
//! - all exit hops restore the same executor
//! - when the entry hop is immediately preceded by a current-executor
//!   read, exits restore to that value
//! - the exit edges of a throwing call are entered only from that call
//!
//! Synchronous functions contain no hops at all, and every value read in
//! a reachable block is defined in one.

use std::fmt;

use hop_diagnostic::{Diagnostic, ErrorCode};
use hop_ir::{Name, Span, StringInterner};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::{smallvec, SmallVec};

use crate::graph::{compute_predecessors, reachable_blocks, successor_block_ids};
use crate::ir::{CallSiteId, HopBlockId, HopFunction, HopInstr, HopRole, HopTerminator, HopVarId};

/// One broken placement invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HopViolation {
    pub function: Name,
    pub kind: ViolationKind,
    pub span: Option<Span>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    HopInSyncFunction,
    DuplicateEntry { site: CallSiteId },
    /// The entry hop is not immediately followed by the site's apply.
    DetachedEntry { site: CallSiteId },
    /// An exit edge does not begin with the site's exit hop.
    MissingExit { site: CallSiteId, block: HopBlockId },
    /// An exit hop outside the site's exit edges, or without an entry.
    StrayExit { site: CallSiteId, block: HopBlockId },
    MismatchedRestore { site: CallSiteId },
    /// Exits ignore the executor read before the entry hop.
    IgnoredCapture { site: CallSiteId },
    /// An exit edge block is also reached from somewhere other than the call.
    SharedExitEdge { site: CallSiteId, block: HopBlockId },
    UndefinedValue { var: HopVarId },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::HopInSyncFunction => write!(f, "hop in a synchronous function"),
            ViolationKind::DuplicateEntry { site } => {
                write!(f, "call site #{} has more than one entry hop", site.raw())
            }
            ViolationKind::DetachedEntry { site } => write!(
                f,
                "entry hop of call site #{} is not immediately followed by its call",
                site.raw()
            ),
            ViolationKind::MissingExit { site, block } => write!(
                f,
                "exit edge bb{} of call site #{} does not start with a restoring hop",
                block.raw(),
                site.raw()
            ),
            ViolationKind::StrayExit { site, block } => write!(
                f,
                "exit hop of call site #{} in bb{} is not on one of its exit edges",
                site.raw(),
                block.raw()
            ),
            ViolationKind::MismatchedRestore { site } => write!(
                f,
                "exit hops of call site #{} restore different executors",
                site.raw()
            ),
            ViolationKind::IgnoredCapture { site } => write!(
                f,
                "call site #{} captured the current executor but does not restore to it",
                site.raw()
            ),
            ViolationKind::SharedExitEdge { site, block } => write!(
                f,
                "exit edge bb{} of call site #{} has other predecessors",
                block.raw(),
                site.raw()
            ),
            ViolationKind::UndefinedValue { var } => {
                write!(f, "%{} is read but never defined", var.raw())
            }
        }
    }
}

impl HopViolation {
    pub fn to_diagnostic(&self, interner: &StringInterner) -> Diagnostic {
        let diag = Diagnostic::error(ErrorCode::E9001)
            .with_message(format!(
                "in `{}`: {}",
                interner.lookup(self.function),
                self.kind
            ))
            .with_note("this is a bug in hop insertion, not in the program");
        match self.span {
            Some(span) => diag.with_label(span, "lowered from this call"),
            None => diag,
        }
    }
}

/// Position of an instruction.
type Pos = (HopBlockId, usize);

#[derive(Default)]
struct SiteHops {
    entries: SmallVec<[Pos; 1]>,
    exits: SmallVec<[(Pos, HopVarId); 2]>,
}

/// Check every placement invariant of `func`.
pub fn verify_hop_placement(func: &HopFunction) -> Vec<HopViolation> {
    let mut violations = Vec::new();
    let violation = |kind: ViolationKind, span: Option<Span>| HopViolation {
        function: func.name,
        kind,
        span,
    };

    if !func.is_async && func.hop_count() > 0 {
        violations.push(violation(ViolationKind::HopInSyncFunction, None));
    }
    for var in undefined_values(func) {
        violations.push(violation(ViolationKind::UndefinedValue { var }, None));
    }
    let predecessors = compute_predecessors(func);

    let mut sites: FxHashMap<CallSiteId, SiteHops> = FxHashMap::default();
    for (block, idx, executor, role) in func.hops() {
        match role {
            HopRole::CallEntry(site) => sites.entry(site).or_default().entries.push((block, idx)),
            HopRole::CallExit(site) => sites
                .entry(site)
                .or_default()
                .exits
                .push(((block, idx), executor)),
            HopRole::FunctionEntry | HopRole::ClosureEntry => {}
        }
    }

    let mut ordered: Vec<_> = sites.into_iter().collect();
    ordered.sort_by_key(|(site, _)| *site);

    for (site, hops) in ordered {
        let Some(&(entry_block, entry_idx)) = hops.entries.first() else {
            for &((block, _), _) in &hops.exits {
                violations.push(violation(ViolationKind::StrayExit { site, block }, None));
            }
            continue;
        };
        if hops.entries.len() > 1 {
            violations.push(violation(ViolationKind::DuplicateEntry { site }, None));
        }

        let Some((edges, span)) = exit_edges(func, entry_block, entry_idx, site) else {
            violations.push(violation(ViolationKind::DetachedEntry { site }, None));
            continue;
        };

        for &edge in &edges {
            if edge.1 == 0 && predecessors[edge.0.index()] != [entry_block.index()] {
                violations.push(violation(
                    ViolationKind::SharedExitEdge {
                        site,
                        block: edge.0,
                    },
                    span,
                ));
            }
            if !hops.exits.iter().any(|&(pos, _)| pos == edge) {
                violations.push(violation(
                    ViolationKind::MissingExit {
                        site,
                        block: edge.0,
                    },
                    span,
                ));
            }
        }
        for &(pos, _) in &hops.exits {
            if !edges.contains(&pos) {
                violations.push(violation(
                    ViolationKind::StrayExit { site, block: pos.0 },
                    span,
                ));
            }
        }

        let mut restores = hops.exits.iter().map(|&(_, exec)| exec);
        if let Some(first) = restores.next() {
            if restores.any(|exec| exec != first) {
                violations.push(violation(ViolationKind::MismatchedRestore { site }, span));
            }
            let captured = entry_idx
                .checked_sub(1)
                .and_then(|i| func.block(entry_block).body.get(i))
                .and_then(|instr| match instr {
                    HopInstr::GetCurrentExecutor { dst } => Some(*dst),
                    _ => None,
                });
            if captured.is_some_and(|c| hops.exits.iter().any(|&(_, exec)| exec != c)) {
                violations.push(violation(ViolationKind::IgnoredCapture { site }, span));
            }
        }
    }

    if !violations.is_empty() {
        tracing::debug!(
            function = ?func.name,
            violations = violations.len(),
            "hop placement violations"
        );
    }
    violations
}

/// Where the exit hops of `site` must sit, given its entry hop at
/// `(block, idx)`, plus the call's span. `None` when the entry hop is not
/// immediately followed by the site's call.
fn exit_edges(
    func: &HopFunction,
    block: HopBlockId,
    idx: usize,
    site: CallSiteId,
) -> Option<(SmallVec<[Pos; 2]>, Option<Span>)> {
    let hop_block = func.block(block);
    let next = idx + 1;
    if let Some(instr) = hop_block.body.get(next) {
        return match instr {
            HopInstr::Apply { site: Some(s), .. } if *s == site => {
                let span = func.spans[block.index()].get(next).copied().flatten();
                Some((smallvec![(block, next + 1)], span))
            }
            _ => None,
        };
    }
    match &hop_block.terminator {
        HopTerminator::TryApply { site: Some(s), .. } if *s == site => {
            let edges = successor_block_ids(&hop_block.terminator)
                .into_iter()
                .map(|succ| (succ, 0))
                .collect();
            Some((edges, None))
        }
        _ => None,
    }
}

/// Values read in reachable blocks without a definition in one, sorted.
fn undefined_values(func: &HopFunction) -> Vec<HopVarId> {
    let reachable = reachable_blocks(func);
    let mut defined = FxHashSet::default();
    for &id in &reachable {
        let block = func.block(id);
        defined.extend(block.params.iter().map(|(var, _)| *var));
        defined.extend(block.body.iter().filter_map(HopInstr::defined_var));
    }

    let mut undefined: Vec<HopVarId> = reachable
        .iter()
        .flat_map(|&id| {
            let block = func.block(id);
            block
                .body
                .iter()
                .flat_map(HopInstr::used_vars)
                .chain(block.terminator.used_vars())
        })
        .filter(|var| !defined.contains(var))
        .collect();
    undefined.sort_unstable();
    undefined.dedup();
    undefined
}

#[cfg(test)]
mod tests;
