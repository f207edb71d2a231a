use pretty_assertions::assert_eq;

use hop_ir::{Name, Span, StringInterner};

use crate::ir::IrType;
use crate::lower::HopIrBuilder;
use crate::test_helpers::{b, signature, site};

use super::*;

fn kinds(func: &HopFunction) -> Vec<ViolationKind> {
    verify_hop_placement(func)
        .into_iter()
        .map(|v| v.kind)
        .collect()
}

fn finish(builder: HopIrBuilder) -> HopFunction {
    builder.finish(signature(Name::from_raw(1), true))
}

#[test]
fn well_formed_site_passes() {
    let mut builder = HopIrBuilder::new();
    let current = builder.emit_get_current_executor();
    let target = builder.emit_function_ref(Name::from_raw(3));
    builder.emit_hop(current, HopRole::FunctionEntry);
    let callee = builder.emit_function_ref(Name::from_raw(2));
    let restore = builder.emit_get_current_executor();
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.emit_apply(IrType::Unit, callee, vec![], Some(site(0)), None);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    assert!(kinds(&finish(builder)).is_empty());
}

#[test]
fn throwing_site_with_both_exits_passes() {
    let mut builder = HopIrBuilder::new();
    let normal = builder.new_block();
    let error = builder.new_block();
    let restore = builder.emit_get_current_executor();
    let target = builder.emit_function_ref(Name::from_raw(3));
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.terminate_try_apply(callee, vec![], Some(site(0)), normal, error);

    builder.position_at(normal);
    builder.add_block_param(normal, IrType::Unit);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    builder.position_at(error);
    let err = builder.add_block_param(error, IrType::Error);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_throw(err);

    assert!(kinds(&finish(builder)).is_empty());
}

#[test]
fn hop_in_sync_function() {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    builder.emit_hop(exec, HopRole::FunctionEntry);
    builder.terminate_return(None);
    let func = builder.finish(signature(Name::from_raw(1), false));

    assert_eq!(kinds(&func), vec![ViolationKind::HopInSyncFunction]);
}

#[test]
fn duplicate_entry_hop() {
    let mut builder = HopIrBuilder::new();
    let target = builder.emit_function_ref(Name::from_raw(3));
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.emit_apply(IrType::Unit, callee, vec![], Some(site(0)), None);
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![
            ViolationKind::DuplicateEntry { site: site(0) },
            ViolationKind::DetachedEntry { site: site(0) },
        ]
    );
}

#[test]
fn entry_hop_must_precede_its_call() {
    let mut builder = HopIrBuilder::new();
    let target = builder.emit_function_ref(Name::from_raw(3));
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.emit_literal(1, None);
    builder.emit_apply(IrType::Unit, callee, vec![], Some(site(0)), None);
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::DetachedEntry { site: site(0) }]
    );
}

#[test]
fn entry_hop_followed_by_another_sites_call() {
    let mut builder = HopIrBuilder::new();
    let target = builder.emit_function_ref(Name::from_raw(3));
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.emit_apply(IrType::Unit, callee, vec![], Some(site(1)), None);
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::DetachedEntry { site: site(0) }]
    );
}

#[test]
fn missing_exit_on_error_edge() {
    let mut builder = HopIrBuilder::new();
    let normal = builder.new_block();
    let error = builder.new_block();
    let restore = builder.emit_get_current_executor();
    let target = builder.emit_function_ref(Name::from_raw(3));
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.terminate_try_apply(callee, vec![], Some(site(0)), normal, error);

    builder.position_at(normal);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    builder.position_at(error);
    let err = builder.add_block_param(error, IrType::Error);
    builder.terminate_throw(err);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::MissingExit {
            site: site(0),
            block: b(2)
        }]
    );
}

#[test]
fn exit_hop_without_entry_is_stray() {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    builder.emit_hop(exec, HopRole::CallExit(site(4)));
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::StrayExit {
            site: site(4),
            block: b(0)
        }]
    );
}

#[test]
fn exit_hop_away_from_the_edge_is_stray() {
    let mut builder = HopIrBuilder::new();
    let restore = builder.emit_get_current_executor();
    let target = builder.emit_function_ref(Name::from_raw(3));
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.emit_apply(IrType::Unit, callee, vec![], Some(site(0)), None);
    builder.emit_literal(1, None);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![
            ViolationKind::MissingExit {
                site: site(0),
                block: b(0)
            },
            ViolationKind::StrayExit {
                site: site(0),
                block: b(0)
            },
        ]
    );
}

#[test]
fn exits_restoring_different_executors() {
    let mut builder = HopIrBuilder::new();
    let normal = builder.new_block();
    let error = builder.new_block();
    let first = builder.emit_get_current_executor();
    let second = builder.emit_get_current_executor();
    let target = builder.emit_function_ref(Name::from_raw(3));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.terminate_try_apply(target, vec![], Some(site(0)), normal, error);

    builder.position_at(normal);
    builder.emit_hop(first, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    builder.position_at(error);
    let err = builder.add_block_param(error, IrType::Error);
    builder.emit_hop(second, HopRole::CallExit(site(0)));
    builder.terminate_throw(err);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::MismatchedRestore { site: site(0) }]
    );
}

#[test]
fn exits_must_restore_the_captured_executor() {
    let mut builder = HopIrBuilder::new();
    let other = builder.emit_get_current_executor();
    let callee = builder.emit_function_ref(Name::from_raw(2));
    builder.emit_get_current_executor();
    builder.emit_hop(other, HopRole::CallEntry(site(0)));
    builder.emit_apply(IrType::Unit, callee, vec![], Some(site(0)), None);
    builder.emit_hop(other, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::IgnoredCapture { site: site(0) }]
    );
}

#[test]
fn exit_edge_reached_from_elsewhere_is_shared() {
    let mut builder = HopIrBuilder::new();
    let normal = builder.new_block();
    let error = builder.new_block();
    let side = builder.new_block();
    let restore = builder.emit_get_current_executor();
    let target = builder.emit_function_ref(Name::from_raw(3));
    builder.emit_hop(target, HopRole::CallEntry(site(0)));
    builder.terminate_try_apply(target, vec![], Some(site(0)), normal, error);

    builder.position_at(normal);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_return(None);

    builder.position_at(error);
    let err = builder.add_block_param(error, IrType::Error);
    builder.emit_hop(restore, HopRole::CallExit(site(0)));
    builder.terminate_throw(err);

    builder.position_at(side);
    builder.terminate_jump(normal, vec![]);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::SharedExitEdge {
            site: site(0),
            block: b(1)
        }]
    );
}

#[test]
fn value_defined_only_in_an_unreachable_block_is_undefined() {
    let mut builder = HopIrBuilder::new();
    let orphan = builder.new_block();
    let entry = builder.current_block();
    builder.position_at(orphan);
    let exec = builder.emit_get_current_executor();
    builder.terminate_return(None);

    builder.position_at(entry);
    builder.emit_hop(exec, HopRole::FunctionEntry);
    builder.terminate_return(None);

    assert_eq!(
        kinds(&finish(builder)),
        vec![ViolationKind::UndefinedValue { var: exec }]
    );
}

#[test]
fn violation_renders_as_internal_error() {
    let interner = StringInterner::new();
    let violation = HopViolation {
        function: interner.intern("f"),
        kind: ViolationKind::MissingExit {
            site: site(2),
            block: b(3),
        },
        span: Some(Span::new(4, 9)),
    };
    let diag = violation.to_diagnostic(&interner);
    assert_eq!(diag.code, ErrorCode::E9001);
    assert_eq!(
        diag.message,
        "in `f`: exit edge bb3 of call site #2 does not start with a restoring hop"
    );
    assert_eq!(diag.primary_span(), Some(Span::new(4, 9)));
}
