use pretty_assertions::assert_eq;

use super::*;

#[test]
fn message_defaults_to_description() {
    let diag = Diagnostic::error(ErrorCode::E4004);
    assert_eq!(diag.message, "unknown global actor");
    assert!(diag.is_error());
}

#[test]
fn primary_span_skips_secondary_labels() {
    let diag = Diagnostic::error(ErrorCode::E4001)
        .with_secondary_label(Span::new(0, 3), "first attribute here")
        .with_label(Span::new(10, 20), "second attribute here");
    assert_eq!(diag.primary_span(), Some(Span::new(10, 20)));
}

#[test]
fn display_renders_labels_notes_and_help() {
    let diag = Diagnostic::error(ErrorCode::E4008)
        .with_message("cannot hop to `RedActor` from a synchronous function")
        .with_label(Span::new(5, 9), "call requires a hop")
        .with_note("hops suspend the current task")
        .with_suggestion("mark the enclosing function `async`");
    let expected = "error [E4008]: cannot hop to `RedActor` from a synchronous function\n  \
                    --> 5..9: call requires a hop\n  \
                    = note: hops suspend the current task\n  \
                    = help: mark the enclosing function `async`";
    assert_eq!(diag.to_string(), expected);
}

#[test]
fn warning_is_not_error() {
    assert!(!Diagnostic::warning(ErrorCode::E4001).is_error());
}
