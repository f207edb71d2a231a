//! Command handlers for the `hopc` CLI.
//!
//! Handlers build their output in a [`Report`] instead of printing, so the
//! binary decides where text goes and tests can inspect it.

mod emit;
mod explain;
mod list;
mod trace;

pub use emit::emit;
pub use explain::explain_error;
pub use list::list_scenarios;
pub use trace::trace_scenario;

use std::fmt::Write as _;

use hop_diagnostic::Diagnostic;

use crate::scenarios::{self, Scenario};

/// Output of one command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl Report {
    fn ok() -> Self {
        Report {
            success: true,
            ..Report::default()
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Report {
            stderr: message.into(),
            ..Report::default()
        }
    }

    /// Print to the process streams.
    pub fn print(&self) {
        if !self.stdout.is_empty() {
            print!("{}", self.stdout);
        }
        if !self.stderr.is_empty() {
            eprint!("{}", self.stderr);
        }
    }
}

fn lookup(name: &str) -> Result<&'static Scenario, Report> {
    scenarios::find(name).ok_or_else(|| {
        Report::failure(format!(
            "error: unknown scenario `{name}`\nRun `hopc list` to see the bundled scenarios.\n"
        ))
    })
}

/// Render diagnostics one per paragraph, then a summary line. Internal
/// errors get a note of their own so they are not mistaken for problems
/// in the program.
fn render_diagnostics(out: &mut String, diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let _ = writeln!(out, "{diag}\n");
    }
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        let plural = if errors == 1 { "" } else { "s" };
        let _ = writeln!(out, "error: lowering failed with {errors} error{plural}");
    }
    let internal = diagnostics.iter().filter(|d| d.code.is_internal()).count();
    if internal > 0 {
        let _ = writeln!(
            out,
            "note: {internal} of these came from the compiler itself; please report them"
        );
    }
}
