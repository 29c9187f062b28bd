mod common;

use common::{source, sp};
use oolong_compiler::{DiagnosticLevel, Diagnostics, ErrorCategory};

#[test]
fn errors_render_as_file_line_col_category_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push_error(
        ErrorCategory::NonExhaustiveMatch,
        "match over Result_int_error does not cover Err",
        Some(sp(12, 3)),
    );

    assert_eq!(
        diagnostics.render_all(&source()),
        "unit.go:12:3: non-exhaustive-match: match over Result_int_error does not cover Err"
    );
}

#[test]
fn hints_render_on_an_indented_followup_line() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push_error_with_hint(
        ErrorCategory::TypeInferenceFailure,
        "cannot infer the Result type of Err(...) from its context",
        Some(sp(7, 9)),
        "annotate the destination with the intended Result type",
    );

    let rendered = diagnostics.render_all(&source());
    let mut lines = rendered.lines();
    assert_eq!(
        lines.next(),
        Some("unit.go:7:9: type-inference-failure: cannot infer the Result type of Err(...) from its context")
    );
    assert_eq!(
        lines.next(),
        Some("\thint: annotate the destination with the intended Result type")
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn the_sink_accumulates_without_aborting_and_drains_once() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push_error(ErrorCategory::InvalidGuard, "first", Some(sp(1, 1)));
    diagnostics.push_warning(ErrorCategory::InvalidSumTypeUsage, "second", Some(sp(2, 1)));
    diagnostics.push_error(ErrorCategory::InvalidSumTypeUsage, "third", None);

    assert_eq!(diagnostics.entries().len(), 3);
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.error_count(), 2);

    let drained = diagnostics.drain();
    assert_eq!(drained.len(), 3);
    assert_eq!(drained[1].level, DiagnosticLevel::Warning);
    assert!(diagnostics.is_empty(), "draining empties the sink");
}

#[test]
fn unpositioned_errors_render_without_a_location() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push_error(ErrorCategory::InvalidSumTypeUsage, "match expression has no arms", None);
    assert_eq!(
        diagnostics.render_all(&source()),
        "unit.go: invalid-sum-type-usage: match expression has no arms"
    );
}
