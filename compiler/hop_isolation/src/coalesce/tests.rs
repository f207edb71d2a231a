use pretty_assertions::assert_eq;

use hop_ir::Name;

use crate::ir::{HopRole, IrType};
use crate::lower::HopIrBuilder;
use crate::test_helpers::{hop_roles, signature, site};

use super::*;

#[test]
fn second_hop_to_same_value_is_removed() {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    builder.emit_hop(exec, HopRole::FunctionEntry);
    builder.emit_hop(exec, HopRole::CallEntry(site(0)));
    builder.emit_hop(exec, HopRole::CallExit(site(0)));
    builder.terminate_return(None);
    let mut func = builder.finish(signature(Name::from_raw(1), true));

    assert_eq!(coalesce_hops(&mut func), 2);
    assert_eq!(hop_roles(&func), vec![HopRole::FunctionEntry]);
    assert_eq!(func.spans[0].len(), func.blocks[0].body.len());
}

#[test]
fn hops_to_different_values_are_kept() {
    let mut builder = HopIrBuilder::new();
    let first = builder.emit_get_current_executor();
    let second = builder.emit_get_current_executor();
    builder.emit_hop(first, HopRole::FunctionEntry);
    builder.emit_hop(second, HopRole::CallEntry(site(0)));
    builder.terminate_return(None);
    let mut func = builder.finish(signature(Name::from_raw(1), true));

    assert_eq!(coalesce_hops(&mut func), 0);
    assert_eq!(func.hop_count(), 2);
}

#[test]
fn hops_separated_by_non_suspending_instructions_are_merged() {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    builder.emit_hop(exec, HopRole::FunctionEntry);
    builder.emit_literal(0, None);
    builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(exec, HopRole::CallEntry(site(0)));
    builder.terminate_return(None);
    let mut func = builder.finish(signature(Name::from_raw(1), true));

    assert_eq!(coalesce_hops(&mut func), 1);
    assert_eq!(hop_roles(&func), vec![HopRole::FunctionEntry]);
}

#[test]
fn apply_forgets_the_current_executor() {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    let f = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(exec, HopRole::CallEntry(site(0)));
    builder.emit_apply(IrType::Unit, f, vec![], Some(site(0)), None);
    builder.emit_hop(exec, HopRole::CallExit(site(0)));
    builder.terminate_return(None);
    let mut func = builder.finish(signature(Name::from_raw(1), true));

    assert_eq!(coalesce_hops(&mut func), 0);
    assert_eq!(func.hop_count(), 2);
}

#[test]
fn first_hop_of_a_block_is_kept() {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    builder.emit_hop(exec, HopRole::FunctionEntry);
    let next = builder.new_block();
    builder.terminate_jump(next, vec![]);
    builder.position_at(next);
    builder.emit_hop(exec, HopRole::CallExit(site(0)));
    builder.terminate_return(None);
    let mut func = builder.finish(signature(Name::from_raw(1), true));

    assert_eq!(coalesce_hops(&mut func), 0);
}
