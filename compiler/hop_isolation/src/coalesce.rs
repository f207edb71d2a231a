//! Redundant hop elimination.
//!
//! Within a block, a hop to the executor the task is already on is
//! removed. The task's executor is known after a hop and stays known until
//! an `apply`, which may return anywhere; every other instruction runs
//! without suspending. Block entry is unknown, so the first hop of a block
//! (an exit hop after `try_apply`) always stays.
//!
//! Hops are compared by SSA value, never by domain, so two materializations
//! of the same global actor are not merged.

use crate::ir::{HopBlockId, HopFunction, HopInstr, HopVarId};

/// Remove hops to the current executor; returns how many were removed.
pub fn coalesce_hops(func: &mut HopFunction) -> usize {
    let mut removed = 0;

    for block_idx in 0..func.blocks.len() {
        let block_id = func.blocks[block_idx].id;
        let mut current: Option<HopVarId> = None;
        let mut i = 0;
        while i < func.blocks[block_idx].body.len() {
            let instr = &func.blocks[block_idx].body[i];
            if let Some((executor, _)) = instr.as_hop() {
                if current == Some(executor) {
                    remove_hop(func, block_id, i);
                    removed += 1;
                    continue;
                }
                current = Some(executor);
            } else if matches!(instr, HopInstr::Apply { .. }) {
                current = None;
            }
            i += 1;
        }
    }

    if removed > 0 {
        tracing::debug!(function = ?func.name, removed, "coalesced hops");
    }
    removed
}

fn remove_hop(func: &mut HopFunction, block: HopBlockId, index: usize) {
    let instr = func.remove_instr(block, index);
    tracing::trace!(block = block.raw(), ?instr, "removed redundant hop");
}

#[cfg(test)]
mod tests;
