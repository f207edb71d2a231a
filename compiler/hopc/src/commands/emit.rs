//! The `emit` command: lower scenarios and print their hop IR.

use std::fmt::Write as _;

use hop_diagnostic::DiagnosticQueue;
use hop_ir::StringInterner;
use hop_isolation::{lower_module, print_function};

use super::{lookup, render_diagnostics, Report};
use crate::options::DriverOptions;
use crate::scenarios::{self, Scenario};

/// Lower `scenario` (or every scenario) and print the result.
///
/// Fails when any lowered scenario reports an error.
pub fn emit(scenario: Option<&str>, options: &DriverOptions) -> Report {
    let selected: Vec<&Scenario> = match scenario {
        Some(name) => match lookup(name) {
            Ok(s) => vec![s],
            Err(report) => return report,
        },
        None => scenarios::all().iter().collect(),
    };

    let mut report = Report::ok();
    for (index, scenario) in selected.into_iter().enumerate() {
        if index > 0 {
            report.stdout.push('\n');
        }
        let interner = StringInterner::new();
        let mut queue = DiagnosticQueue::with_config(options.diagnostics.clone());
        let module = scenario.module(&interner);
        let lowered = lower_module(&module, &interner, options.hop, &mut queue);

        let _ = writeln!(report.stdout, "// scenario: {}", scenario.name);
        for func in &lowered.functions {
            let _ = writeln!(report.stdout, "{}\n", print_function(func, &interner));
        }
        if lowered.coalesced > 0 {
            let _ = writeln!(
                report.stdout,
                "// coalesced {} redundant hop(s)",
                lowered.coalesced
            );
        }

        if queue.has_errors() {
            report.success = false;
        }
        render_diagnostics(&mut report.stderr, &queue.flush());
    }
    report
}
