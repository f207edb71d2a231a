use pretty_assertions::assert_eq;

use hop_ir::StringInterner;

use crate::domain::{ActorValue, IsolationDomain, TypeRef};
use crate::ir::{CallSiteId, HopParam};
use crate::lower::{HopIrBuilder, HopSignature};
use crate::test_helpers::v;

use super::*;

#[test]
fn throwing_call_prints_both_edges() {
    let interner = StringInterner::new();
    let mut builder = HopIrBuilder::new();
    let normal = builder.new_block();
    let error = builder.new_block();
    let site = CallSiteId::new(0);

    let callee = builder.emit_function_ref(interner.intern("f"));
    let five = builder.emit_literal(5, None);
    let current = builder.emit_get_current_executor();
    builder.emit_hop(current, HopRole::CallEntry(site));
    builder.terminate_try_apply(callee, vec![five], Some(site), normal, error);

    builder.position_at(normal);
    builder.add_block_param(normal, IrType::Unit);
    builder.emit_hop(current, HopRole::CallExit(site));
    builder.terminate_return(None);

    builder.position_at(error);
    let err = builder.add_block_param(error, IrType::Error);
    builder.emit_hop(current, HopRole::CallExit(site));
    builder.terminate_throw(err);

    let func = builder.finish(HopSignature {
        name: interner.intern("caller"),
        kind: FunctionKind::Function,
        params: vec![HopParam {
            var: v(1),
            ty: IrType::Int,
            convention: ParamConvention::Trivial,
        }],
        return_type: IrType::Unit,
        is_async: true,
        throws: true,
        domain: IsolationDomain::Nonisolated,
    });

    let expected = "\
// isolation: nonisolated
sil @caller : $@async (Int) -> () throws {
bb0:
  %0 = function_ref @f
  %1 = integer_literal $Int, 5
  %2 = builtin \"getCurrentExecutor\"() : $Optional<Builtin.Executor>
  hop_to_executor %2 : $Optional<Builtin.Executor>  // enter site #0
  try_apply %0(%1), normal bb1, error bb2  // site #0
bb1(%3 : $()):
  hop_to_executor %2 : $Optional<Builtin.Executor>  // exit site #0
  return
bb2(%4 : $any Error):
  hop_to_executor %2 : $Optional<Builtin.Executor>  // exit site #0
  throw %4
}";
    assert_eq!(print_function(&func, &interner), expected);
}

#[test]
fn closure_header_and_ownership_instructions() {
    let interner = StringInterner::new();
    let actor = TypeRef::named(interner.intern("MyActor"));
    let red = TypeRef::named(interner.intern("RedActor"));

    let mut builder = HopIrBuilder::new();
    let meta = builder.emit_metatype(red);
    let fresh = builder.emit_construct(actor.clone(), vec![], None);
    let copy = builder.emit_copy_value(fresh);
    let borrow = builder.emit_begin_borrow(copy);
    builder.emit_end_borrow(borrow);
    builder.emit_destroy_value(copy);
    let thunk = builder.emit_function_ref(interner.intern("g"));
    let closure = builder.emit_partial_apply(thunk, vec![meta, fresh]);
    builder.emit_destroy_value(fresh);
    builder.terminate_return(Some(closure));

    let func = builder.finish(HopSignature {
        name: interner.intern("f.closure#1"),
        kind: FunctionKind::Closure,
        params: vec![HopParam {
            var: v(0),
            ty: IrType::Value(actor),
            convention: ParamConvention::Guaranteed,
        }],
        return_type: IrType::Function,
        is_async: false,
        throws: false,
        domain: IsolationDomain::ActorInstance(ActorValue::Capture(0)),
    });

    let text = FunctionPrinter {
        func: &func,
        interner: &interner,
    }
    .to_string();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "// isolation: captured actor 0");
    assert_eq!(
        lines[1],
        "sil [closure] @f.closure#1 : $(@guaranteed MyActor) -> @callee_guaranteed fn {"
    );
    assert_eq!(lines[3], "  %0 = metatype $@thin RedActor.Type");
    assert_eq!(lines[4], "  %1 = alloc_ref $MyActor()");
    assert_eq!(lines[5], "  %2 = copy_value %1");
    assert_eq!(lines[6], "  %3 = begin_borrow %2");
    assert_eq!(lines[7], "  end_borrow %3");
    assert_eq!(lines[8], "  destroy_value %2");
    assert_eq!(lines[10], "  %5 = partial_apply [callee_guaranteed] %4(%0, %1)");
    assert_eq!(lines[12], "  return %5");
}

#[test]
fn stored_global_actor_access_sequence() {
    let interner = StringInterner::new();
    let actor = TypeRef::named(interner.intern("MyActor"));

    let mut builder = HopIrBuilder::new();
    let addressor = builder.emit_function_ref(interner.intern("GlobalActor.shared.unsafeMutableAddressor"));
    let pointer = builder.emit_apply(IrType::RawPointer, addressor, vec![], None, None);
    let address = builder.emit_pointer_to_address(pointer, actor);
    let access = builder.emit_begin_access(address);
    let value = builder.emit_load(access);
    builder.emit_end_access(access);
    builder.emit_hop(value, HopRole::FunctionEntry);
    builder.emit_destroy_value(value);
    builder.terminate_return(None);
    let func = builder.finish(crate::test_helpers::signature(interner.intern("g"), true));

    let text = print_function(&func, &interner);
    assert!(text.contains("  %1 = apply %0()\n"));
    assert!(text.contains("  %2 = pointer_to_address %1 to [strict] $*MyActor\n"));
    assert!(text.contains("  %3 = begin_access [read] [dynamic] %2 : $*MyActor\n"));
    assert!(text.contains("  %4 = load [copy] %3 : $*MyActor\n"));
    assert!(text.contains("  end_access %3\n"));
    assert!(text.contains("  hop_to_executor %4 : $MyActor  // function entry\n"));
}
