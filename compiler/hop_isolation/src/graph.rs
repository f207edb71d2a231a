//! Shared CFG utilities for passes over Hop IR.
//!
//! Passes depend on `graph`, never on each other.

use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};

use crate::ir::{HopBlockId, HopFunction, HopTerminator};

/// Successor blocks of a terminator.
pub fn successor_block_ids(terminator: &HopTerminator) -> SmallVec<[HopBlockId; 2]> {
    match terminator {
        HopTerminator::Return { .. } | HopTerminator::Throw { .. } | HopTerminator::Unreachable => {
            SmallVec::new()
        }
        HopTerminator::Jump { target, .. } => smallvec![*target],
        HopTerminator::TryApply { normal, error, .. } => smallvec![*normal, *error],
    }
}

/// Deduplicated predecessor lists, indexed by block index.
pub fn compute_predecessors(func: &HopFunction) -> Vec<Vec<usize>> {
    let num_blocks = func.blocks.len();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); num_blocks];

    for (block_idx, block) in func.blocks.iter().enumerate() {
        let mut seen = FxHashSet::default();
        for succ in successor_block_ids(&block.terminator) {
            let succ_idx = succ.index();
            if succ_idx < num_blocks && seen.insert(succ_idx) {
                predecessors[succ_idx].push(block_idx);
            }
        }
    }

    predecessors
}

/// Blocks reachable from the entry, in depth-first preorder.
pub fn reachable_blocks(func: &HopFunction) -> Vec<HopBlockId> {
    let num_blocks = func.blocks.len();
    let mut visited = vec![false; num_blocks];
    let mut order = Vec::with_capacity(num_blocks);
    let mut stack = vec![func.entry];

    while let Some(id) = stack.pop() {
        let idx = id.index();
        if idx >= num_blocks || visited[idx] {
            continue;
        }
        visited[idx] = true;
        order.push(id);
        // Reverse so the first successor is visited first.
        let succs = successor_block_ids(&func.blocks[idx].terminator);
        stack.extend(succs.into_iter().rev());
    }

    order
}
