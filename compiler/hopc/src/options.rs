//! Flags shared by every command.

use hop_diagnostic::DiagnosticConfig;
use hop_isolation::HopOptions;

/// Options parsed from `--flag` arguments.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DriverOptions {
    pub hop: HopOptions,
    pub diagnostics: DiagnosticConfig,
    /// Log the isolation passes even without `RUST_LOG`.
    pub trace: bool,
}

/// Split `args` into driver options and positional arguments.
///
/// Unknown flags and malformed values are reported as warnings and
/// otherwise ignored.
pub fn parse_driver_options(args: &[String]) -> (DriverOptions, Vec<String>) {
    let mut options = DriverOptions::default();
    let mut positional = Vec::new();

    for arg in args {
        if arg == "--no-verify" {
            options.hop.verify = false;
        } else if arg == "--no-coalesce" {
            options.hop.coalesce = false;
        } else if arg == "--trace" {
            options.trace = true;
        } else if arg == "--no-dedup" {
            options.diagnostics.deduplicate = false;
        } else if let Some(limit) = arg.strip_prefix("--error-limit=") {
            if let Ok(n) = limit.parse() {
                options.diagnostics.error_limit = n;
            } else {
                eprintln!("warning: invalid error limit '{limit}', using the default");
            }
        } else if arg.starts_with('-') {
            eprintln!("warning: unknown option '{arg}'");
        } else {
            positional.push(arg.clone());
        }
    }

    (options, positional)
}
