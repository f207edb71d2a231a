use pretty_assertions::assert_eq;

use hop_ir::Name;

use crate::body::BodyBuilder;
use crate::lower::HopIrBuilder;
use crate::test_helpers::{signature, site, Fixture};

use super::*;

#[test]
fn nonisolated_caller_returns_to_the_generic_executor() {
    let mut fx = Fixture::new();
    let red = fx.declare(fx.on_global(fx.func("red"), "RedActor").with_async());
    let main = fx.declare(fx.func("main").with_async());
    let mut body = BodyBuilder::new();
    let call = body.call(red, vec![]);
    body.expr_stmt(call);
    let func = fx.lower_one(main, &body.finish());

    let mut env = SimEnv::new();
    env.register_global_actors(&fx.decls);
    let red_exec = env.global_executor(fx.name("RedActor")).unwrap();
    let mut runtime = RecordingRuntime::starting_on(ExecutorId::GENERIC);
    let trace = simulate(&func, &env, &mut runtime).unwrap();

    assert_eq!(trace.calls().collect::<Vec<_>>(), vec![(site(0), red_exec)]);
    assert_eq!(trace.exit_executor, ExecutorId::GENERIC);
    assert!(!trace.threw);
    assert_eq!(runtime.switches, vec![red_exec, ExecutorId::GENERIC]);
}

#[test]
fn stored_global_actor_runs_on_its_executor() {
    let mut fx = Fixture::new();
    let f = fx.declare(fx.on_global(fx.func("f"), "GlobalActor").with_async());
    let func = fx.lower_one(f, &BodyBuilder::new().finish());

    let mut env = SimEnv::new();
    env.register_global_actors(&fx.decls);
    let exec = env.global_executor(fx.name("GlobalActor")).unwrap();
    let trace = simulate(&func, &env, &mut RecordingRuntime::starting_on(ExecutorId::GENERIC)).unwrap();

    assert_eq!(
        trace.events,
        vec![TraceEvent::Hop {
            role: HopRole::FunctionEntry,
            to: exec
        }]
    );
    assert_eq!(trace.exit_executor, exec);
}

#[test]
fn throwing_callee_restores_on_the_error_edge() {
    let mut fx = Fixture::new();
    let g = fx.declare(fx.method("MyActor", "g").with_async().with_throws());
    let f = fx.declare(
        fx.method("MyActor", "f")
            .with_param(fx.param("other", "MyActor"))
            .with_async()
            .with_throws(),
    );
    let mut body = BodyBuilder::new();
    let other = body.param(0);
    let call = body.method_call(other, g, vec![]);
    body.expr_stmt(call);
    let func = fx.lower_one(f, &body.finish());

    let mut env = SimEnv::new();
    let other_exec = env.fresh_executor();
    let self_exec = env.fresh_executor();
    let env = env
        .with_param(SimValue::Actor(other_exec))
        .with_param(SimValue::Actor(self_exec))
        .with_outcome(site(0), CallOutcome::Throw);
    let trace = simulate(&func, &env, &mut RecordingRuntime::starting_on(ExecutorId::GENERIC)).unwrap();

    assert_eq!(
        trace.events,
        vec![
            TraceEvent::Hop {
                role: HopRole::FunctionEntry,
                to: self_exec
            },
            TraceEvent::Hop {
                role: HopRole::CallEntry(site(0)),
                to: other_exec
            },
            TraceEvent::Call {
                site: site(0),
                on: other_exec
            },
            TraceEvent::Hop {
                role: HopRole::CallExit(site(0)),
                to: self_exec
            },
        ]
    );
    assert!(trace.threw);
    assert_eq!(trace.exit_executor, self_exec);
    assert_eq!(trace.hop_count(), 3);
}

#[test]
fn constructed_actor_gets_its_own_executor() {
    let mut fx = Fixture::new();
    let g = fx.declare(fx.method("MyActor", "g").with_async());
    let f = fx.declare(fx.method("MyActor", "f").with_async());
    let mut body = BodyBuilder::new();
    let fresh = body.construct(fx.ty("MyActor"), vec![]);
    let call = body.method_call(fresh, g, vec![]);
    body.expr_stmt(call);
    let func = fx.lower_one(f, &body.finish());

    let mut env = SimEnv::new();
    let self_exec = env.fresh_executor();
    let env = env.with_param(SimValue::Actor(self_exec));
    let trace = simulate(&func, &env, &mut RecordingRuntime::starting_on(self_exec)).unwrap();

    let calls: Vec<_> = trace.calls().collect();
    assert_eq!(calls.len(), 1);
    assert_ne!(calls[0].1, self_exec);
    assert_eq!(trace.exit_executor, self_exec);
}

#[test]
fn hop_to_a_non_executor_is_an_error() {
    let mut builder = HopIrBuilder::new();
    let n = builder.emit_literal(3, None);
    builder.emit_hop(n, HopRole::FunctionEntry);
    builder.terminate_return(None);
    let func = builder.finish(signature(Name::from_raw(1), true));

    let err = simulate(&func, &SimEnv::new(), &mut RecordingRuntime::starting_on(ExecutorId::GENERIC))
        .unwrap_err();
    assert_eq!(err, SimError::NotAnExecutor(n));
    assert_eq!(err.to_string(), "hop operand %0 is not an executor");
}

#[test]
fn missing_parameter_is_an_error() {
    let mut fx = Fixture::new();
    let f = fx.declare(fx.method("MyActor", "f").with_async());
    let func = fx.lower_one(f, &BodyBuilder::new().finish());

    let err = simulate(&func, &SimEnv::new(), &mut RecordingRuntime::starting_on(ExecutorId::GENERIC))
        .unwrap_err();
    assert_eq!(err, SimError::MissingParam(0));
}

#[test]
fn unreachable_block_is_an_error() {
    let mut builder = HopIrBuilder::new();
    builder.terminate_unreachable();
    let func = builder.finish(signature(Name::from_raw(1), true));

    let err = simulate(&func, &SimEnv::new(), &mut RecordingRuntime::starting_on(ExecutorId::GENERIC))
        .unwrap_err();
    assert_eq!(err.to_string(), "reached `unreachable` in bb0");
}

#[test]
fn trace_display() {
    let trace = ExecutionTrace {
        events: vec![
            TraceEvent::Hop {
                role: HopRole::CallEntry(site(0)),
                to: ExecutorId(2),
            },
            TraceEvent::Call {
                site: site(0),
                on: ExecutorId(2),
            },
            TraceEvent::Hop {
                role: HopRole::CallExit(site(0)),
                to: ExecutorId::GENERIC,
            },
        ],
        exit_executor: ExecutorId::GENERIC,
        threw: false,
    };
    assert_eq!(
        trace.to_string(),
        "  hop -> exec#2 (CallEntry(CallSiteId(0)))\n  call #0 on exec#2\n  hop -> generic (CallExit(CallSiteId(0)))\n  return on generic"
    );
}

#[test]
fn fresh_executors_are_distinct_from_generic() {
    let mut env = SimEnv::default();
    let first = env.fresh_executor();
    let second = env.fresh_executor();
    assert_ne!(first, ExecutorId::GENERIC);
    assert_ne!(first, second);
}
