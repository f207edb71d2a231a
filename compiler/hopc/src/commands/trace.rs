//! The `trace` command: simulate a scenario's entry function.

use std::fmt::Write as _;

use hop_diagnostic::DiagnosticQueue;
use hop_ir::StringInterner;
use hop_isolation::runtime::{CallOutcome, SimValue};
use hop_isolation::{
    lower_module, simulate, CallSiteId, ExecutorId, IrType, RecordingRuntime, SimEnv,
};

use super::{lookup, render_diagnostics, Report};
use crate::options::DriverOptions;

/// Lower `name`, run its entry function from the generic executor, and
/// print every hop and call with the executor it landed on.
pub fn trace_scenario(name: &str, options: &DriverOptions) -> Report {
    let scenario = match lookup(name) {
        Ok(s) => s,
        Err(report) => return report,
    };

    let interner = StringInterner::new();
    let module = scenario.module(&interner);
    let mut queue = DiagnosticQueue::with_config(options.diagnostics.clone());
    let lowered = lower_module(&module, &interner, options.hop, &mut queue);

    let entry = interner.intern(scenario.entry);
    let Some(func) = lowered.function(entry) else {
        let mut report = Report::failure(format!(
            "error: `{}` did not lower; nothing to trace\n",
            scenario.entry
        ));
        render_diagnostics(&mut report.stderr, &queue.flush());
        return report;
    };
    let declared_params = module.decls.function(entry).map_or(0, |d| d.params.len());

    let mut env = SimEnv::new();
    env.register_global_actors(&module.decls);
    let mut executors: Vec<(String, ExecutorId)> = module
        .decls
        .global_actors()
        .filter_map(|ga| {
            env.global_executor(ga.name)
                .map(|exec| (interner.lookup(ga.name).to_owned(), exec))
        })
        .collect();

    for (index, param) in func.params.iter().enumerate() {
        let value = match &param.ty {
            IrType::Value(ty) if module.decls.is_actor(ty) => {
                let exec = env.fresh_executor();
                let label = if index >= declared_params {
                    "self".to_owned()
                } else {
                    format!("parameter {index}")
                };
                executors.push((label, exec));
                SimValue::Actor(exec)
            }
            IrType::Value(_) | IrType::Function => SimValue::Function(None),
            IrType::Int => SimValue::Int(0),
            IrType::Executor => SimValue::Executor(ExecutorId::GENERIC),
            _ => SimValue::Unit,
        };
        env = env.with_param(value);
    }
    if let Some(site) = scenario.throw_at {
        env = env.with_outcome(CallSiteId::new(site), CallOutcome::Throw);
    }

    let mut runtime = RecordingRuntime::starting_on(ExecutorId::GENERIC);
    let trace = match simulate(func, &env, &mut runtime) {
        Ok(trace) => trace,
        Err(err) => return Report::failure(format!("error: simulation failed: {err}\n")),
    };
    tracing::debug!(
        scenario = scenario.name,
        hops = trace.hop_count(),
        switches = runtime.switches.len(),
        "traced"
    );

    let mut report = Report::ok();
    let out = &mut report.stdout;
    let _ = writeln!(out, "trace of `{}` ({}):", scenario.entry, scenario.name);
    for (label, exec) in &executors {
        let _ = writeln!(out, "  {label} = {exec}");
    }
    let _ = writeln!(out, "{trace}");
    let _ = writeln!(
        out,
        "  {} hop(s), {} executor switch(es)",
        trace.hop_count(),
        runtime.switches.len()
    );
    render_diagnostics(&mut report.stderr, &queue.flush());
    report
}
