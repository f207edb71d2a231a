//! Hop insertion driver CLI.

use std::process::ExitCode;

use hopc::commands::{emit, explain_error, list_scenarios, trace_scenario};
use hopc::{init_tracing, parse_driver_options, Report};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let command = &args[1];
    let (options, positional) = parse_driver_options(&args[2..]);
    init_tracing(options.trace);

    let report = match command.as_str() {
        "list" => list_scenarios(),
        "emit" => emit(positional.first().map(String::as_str), &options),
        "trace" => {
            let Some(name) = positional.first() else {
                eprintln!("Usage: hopc trace <scenario> [options]");
                eprintln!();
                eprintln!("Run `hopc list` to see the bundled scenarios.");
                return ExitCode::FAILURE;
            };
            trace_scenario(name, &options)
        }
        "--explain" | "explain" => {
            let Some(code) = positional.first() else {
                eprintln!("Usage: hopc explain <ERROR_CODE>");
                eprintln!("Example: hopc explain E4008");
                return ExitCode::FAILURE;
            };
            explain_error(code)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "version" | "--version" | "-V" => {
            println!("hopc {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    finish(&report)
}

fn finish(report: &Report) -> ExitCode {
    report.print();
    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_usage() {
    println!("hopc: executor hop insertion for actor isolation");
    println!();
    println!("Usage: hopc <command> [options]");
    println!();
    println!("Commands:");
    println!("  list                 List the bundled scenarios");
    println!("  emit [scenario]      Print hop IR (default: every scenario)");
    println!("  trace <scenario>     Simulate a scenario and print executor switches");
    println!("  explain <code>       Explain an error code (e.g., E4008)");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Options:");
    println!("  --no-verify          Skip hop placement verification");
    println!("  --no-coalesce        Keep redundant consecutive hops");
    println!("  --error-limit=<n>    Stop reporting after n errors (0 = unlimited)");
    println!("  --no-dedup           Report duplicate diagnostics");
    println!("  --trace              Log the isolation passes (RUST_LOG overrides)");
    println!();
    println!("Examples:");
    println!("  hopc emit actor-to-actor");
    println!("  hopc trace nonisolated-to-red");
    println!("  hopc emit --no-coalesce");
    println!("  RUST_LOG=hop_isolation=debug hopc emit");
    println!("  hopc explain E4008");
}
