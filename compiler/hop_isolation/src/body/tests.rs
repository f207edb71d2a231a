use pretty_assertions::assert_eq;

use hop_ir::{Name, Span};

use super::*;

#[test]
fn synthetic_spans_follow_push_order() {
    let mut builder = BodyBuilder::starting_at(10);
    let a = builder.int(1);
    let b = builder.param(0);
    let body = builder.finish();
    assert_eq!(body.expr(a).span, Span::new(10, 11));
    assert_eq!(body.expr(b).span, Span::new(11, 12));
    assert_eq!(body.num_exprs(), 2);
}

#[test]
fn bind_allocates_locals_in_order() {
    let mut builder = BodyBuilder::new();
    let one = builder.int(1);
    let first = builder.bind(one);
    let two = builder.int(2);
    let second = builder.bind(two);
    let body = builder.finish();

    assert_eq!(first, LocalId::new(0));
    assert_eq!(second, LocalId::new(1));
    assert_eq!(body.num_locals(), 2);
    assert_eq!(
        body.stmts(),
        &[
            Stmt::Let {
                local: first,
                value: one
            },
            Stmt::Let {
                local: second,
                value: two
            },
        ]
    );
}

#[test]
fn closure_takes_the_span_of_its_literal() {
    let mut builder = BodyBuilder::starting_at(4);
    builder.int(0);
    let inner = BodyBuilder::new().finish();
    let expr = builder.closure(ClosureDef::new(inner).with_async());
    let body = builder.finish();

    let ExprKind::Closure(id) = body.expr(expr).kind else {
        panic!("expected closure literal");
    };
    assert_eq!(id, ClosureId::new(0));
    assert_eq!(body.closure(id).span, Span::new(5, 6));
    assert!(body.closure(id).is_async);
}

#[test]
fn method_call_records_receiver() {
    let mut builder = BodyBuilder::new();
    let recv = builder.self_ref();
    let arg = builder.int(3);
    let callee = Name::from_raw(9);
    let call = builder.method_call(recv, callee, vec![arg]);
    builder.expr_stmt(call);
    builder.ret(None);
    let body = builder.finish();

    assert_eq!(
        body.expr(call).kind,
        ExprKind::Call(Call {
            callee: Callee::Direct(callee),
            receiver: Some(recv),
            args: vec![arg],
        })
    );
    assert_eq!(body.stmts(), &[Stmt::Expr(call), Stmt::Return(None)]);
}

#[test]
fn empty_body_has_nothing() {
    let body = Body::empty();
    assert!(body.stmts().is_empty());
    assert_eq!(body.num_exprs(), 0);
    assert_eq!(body.num_locals(), 0);
}
