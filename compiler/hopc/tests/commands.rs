// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Driver command tests: each command runs against the bundled scenarios
//! and its report is checked as text.

use pretty_assertions::assert_eq;

use hopc::commands::{emit, explain_error, list_scenarios, trace_scenario};
use hopc::scenarios;
use hopc::DriverOptions;

#[test]
fn list_shows_every_scenario() {
    let report = list_scenarios();
    assert!(report.success);
    assert_eq!(report.stdout.lines().count(), scenarios::all().len());
    assert!(report.stdout.contains("actor-to-actor"));
    assert!(report.stdout.contains("throwing call into another actor instance"));
}

#[test]
fn emit_prints_entry_hop_for_global_actor() {
    let report = emit(Some("global-entry"), &DriverOptions::default());
    assert!(report.success, "{}", report.stderr);
    assert!(report.stdout.starts_with("// scenario: global-entry\n"));
    assert!(report.stdout.contains("// isolation: global actor GlobalActor\n"));
    assert!(report.stdout.contains("// function entry"));
    assert!(report.stderr.is_empty());
}

#[test]
fn emit_actor_to_actor_restores_on_both_edges() {
    let report = emit(Some("actor-to-actor"), &DriverOptions::default());
    assert!(report.success);
    let exits = report
        .stdout
        .lines()
        .filter(|l| l.ends_with("// exit site #0"))
        .count();
    assert_eq!(exits, 2);
    assert!(report.stdout.contains("try_apply"));
}

#[test]
fn emit_includes_closures_and_thunks() {
    let closure = emit(Some("actor-closure"), &DriverOptions::default());
    assert!(closure.stdout.contains("sil [closure] @MyActor.f.closure#1"));

    let thunk = emit(Some("to-async"), &DriverOptions::default());
    assert!(thunk.stdout.contains("isolation_thunk<RedActor>(Int) -> Int"));
}

#[test]
fn emit_reports_errors_and_fails() {
    let report = emit(Some("sync-hop"), &DriverOptions::default());
    assert!(!report.success);
    assert!(report.stderr.contains("[E4008]"));
    assert!(report.stderr.contains("lowering failed with 1 error\n"));
    // Nothing lowered for the failing function.
    assert!(!report.stdout.contains("sil @main"));
}

#[test]
fn emit_everything_fails_only_because_of_the_error_scenario() {
    let report = emit(None, &DriverOptions::default());
    assert!(!report.success);
    for scenario in scenarios::all() {
        assert!(report
            .stdout
            .contains(&format!("// scenario: {}\n", scenario.name)));
    }
    assert_eq!(report.stderr.matches("[E4008]").count(), 1);
}

#[test]
fn unknown_scenario_is_an_error() {
    let report = emit(Some("purple"), &DriverOptions::default());
    assert!(!report.success);
    assert!(report.stderr.starts_with("error: unknown scenario `purple`"));
    assert!(report.stdout.is_empty());
}

#[test]
fn trace_nonisolated_caller_returns_to_generic() {
    let report = trace_scenario("nonisolated-to-red", &DriverOptions::default());
    assert!(report.success, "{}", report.stderr);
    let lines: Vec<_> = report.stdout.lines().collect();
    assert_eq!(lines[0], "trace of `main` (nonisolated-to-red):");
    let red = lines
        .iter()
        .find_map(|l| l.strip_prefix("  RedActor = "))
        .unwrap();
    assert!(report.stdout.contains(&format!("  call #0 on {red}\n")));
    assert!(report.stdout.contains("  return on generic\n"));
    assert!(report.stdout.contains("  2 hop(s), 2 executor switch(es)"));
}

#[test]
fn trace_throwing_scenario_restores_self() {
    let report = trace_scenario("actor-to-actor", &DriverOptions::default());
    assert!(report.success, "{}", report.stderr);
    let self_exec = report
        .stdout
        .lines()
        .find_map(|l| l.strip_prefix("  self = "))
        .unwrap();
    let other = report
        .stdout
        .lines()
        .find_map(|l| l.strip_prefix("  parameter 0 = "))
        .unwrap();
    assert!(report.stdout.contains(&format!("  call #0 on {other}\n")));
    assert!(report.stdout.contains(&format!("  throw on {self_exec}\n")));
}

#[test]
fn trace_of_a_failing_scenario_reports_diagnostics() {
    let report = trace_scenario("sync-hop", &DriverOptions::default());
    assert!(!report.success);
    assert!(report.stderr.starts_with("error: `main` did not lower"));
    assert!(report.stderr.contains("[E4008]"));
}

#[test]
fn every_valid_scenario_traces() {
    for scenario in scenarios::all().iter().filter(|s| s.name != "sync-hop") {
        let report = trace_scenario(scenario.name, &DriverOptions::default());
        assert!(report.success, "{}: {}", scenario.name, report.stderr);
    }
}

#[test]
fn explain_known_and_unknown_codes() {
    let known = explain_error("e4008");
    assert!(known.success);
    assert!(known.stdout.contains("E4008"));

    let unknown = explain_error("E1234");
    assert!(!unknown.success);
    assert!(unknown.stderr.starts_with("Unknown error code: E1234"));
}
