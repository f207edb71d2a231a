//! The `list` command.

use std::fmt::Write as _;

use super::Report;
use crate::scenarios;

pub fn list_scenarios() -> Report {
    let mut report = Report::ok();
    let width = scenarios::all().iter().map(|s| s.name.len()).max().unwrap_or(0);
    for scenario in scenarios::all() {
        let _ = writeln!(
            report.stdout,
            "  {:width$}  {}",
            scenario.name,
            scenario.summary
        );
    }
    report
}
