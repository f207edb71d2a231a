use pretty_assertions::assert_eq;

use hop_ir::{Name, Span};

use crate::lower::HopIrBuilder;
use crate::test_helpers::{b, signature, site, v};

use super::*;

fn two_hop_function() -> HopFunction {
    let mut builder = HopIrBuilder::new();
    let exec = builder.emit_get_current_executor();
    builder.emit_hop(exec, HopRole::FunctionEntry);
    let one = builder.emit_literal(1, Some(Span::new(3, 4)));
    let func = builder.emit_function_ref(Name::from_raw(5));
    builder.emit_apply(IrType::Unit, func, vec![one], Some(site(0)), Some(Span::new(5, 9)));
    builder.emit_hop(exec, HopRole::CallExit(site(0)));
    builder.terminate_return(None);
    builder.finish(signature(Name::from_raw(1), true))
}

#[test]
fn defined_and_used_vars() {
    let apply = HopInstr::Apply {
        dst: v(3),
        func: v(1),
        args: vec![v(2), v(0)],
        site: None,
    };
    assert_eq!(apply.defined_var(), Some(v(3)));
    assert_eq!(apply.used_vars(), vec![v(1), v(2), v(0)]);

    let hop = HopInstr::HopToExecutor {
        executor: v(4),
        role: HopRole::ClosureEntry,
    };
    assert_eq!(hop.defined_var(), None);
    assert_eq!(hop.used_vars(), vec![v(4)]);
    assert_eq!(hop.as_hop(), Some((v(4), HopRole::ClosureEntry)));
    assert_eq!(apply.as_hop(), None);
}

#[test]
fn terminator_uses() {
    let try_apply = HopTerminator::TryApply {
        func: v(0),
        args: vec![v(1)],
        site: Some(site(2)),
        normal: b(1),
        error: b(2),
    };
    assert_eq!(try_apply.used_vars(), vec![v(0), v(1)]);
    assert_eq!(
        HopTerminator::Return { value: Some(v(7)) }.used_vars(),
        vec![v(7)]
    );
    assert!(HopTerminator::Unreachable.used_vars().is_empty());
}

#[test]
fn hops_iterate_in_block_order_with_positions() {
    let func = two_hop_function();
    let hops: Vec<_> = func.hops().collect();
    assert_eq!(
        hops,
        vec![
            (b(0), 1, v(0), HopRole::FunctionEntry),
            (b(0), 5, v(0), HopRole::CallExit(site(0))),
        ]
    );
    assert_eq!(func.hop_count(), 2);
}

#[test]
fn remove_instr_keeps_spans_aligned() {
    let mut func = two_hop_function();
    assert_eq!(func.spans[0][2], Some(Span::new(3, 4)));

    let removed = func.remove_instr(b(0), 1);
    assert_eq!(removed.as_hop(), Some((v(0), HopRole::FunctionEntry)));
    assert_eq!(func.block(b(0)).body.len(), func.spans[0].len());
    assert_eq!(func.spans[0][1], Some(Span::new(3, 4)));
    assert_eq!(func.spans[0][3], Some(Span::new(5, 9)));
}

#[test]
fn var_types_follow_allocation() {
    let func = two_hop_function();
    assert_eq!(func.var_type(v(0)), &IrType::Executor);
    assert_eq!(func.var_type(v(1)), &IrType::Int);
    assert_eq!(func.var_type(v(2)), &IrType::Function);
    assert_eq!(func.var_type(v(3)), &IrType::Unit);
}
