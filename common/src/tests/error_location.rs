use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::here()` records the tracked caller, not itself.
///
/// **WHY THIS MATTERS**: Every ident error carries a location. If `here()` stopped
/// propagating `#[track_caller]`, all errors would point into `error_location.rs`.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is removed from `here()`.
#[test]
fn given_here_called_from_test_when_captured_then_points_at_test_file() {
    // GIVEN/WHEN: Capturing from this test
    let location = ErrorLocation::here();

    // THEN: File is this test module, not the implementation
    assert!(
        location.file.contains("tests"),
        "Should capture the test file, got {}",
        location.file
    );
    assert!(location.line > 0);
    assert!(location.column > 0);
}

/// **VALUE**: Verifies the "[file:line:column]" rendering appended to every error message.
///
/// **WHY THIS MATTERS**: Log lines and CLI output are grepped by location; a format change
/// silently breaks that.
///
/// **BUG THIS CATCHES**: Would catch a Display change that drops a component or brackets.
#[test]
fn given_error_location_when_displayed_then_renders_bracketed_triple() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/client/mod.rs",
        line: 42,
        column: 9,
    };

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: Exact bracketed format
    assert_eq!(formatted, "[src/client/mod.rs:42:9]");
}

/// **VALUE**: Verifies that nested `#[track_caller]` helpers report distinct call sites.
///
/// **BUG THIS CATCHES**: Would catch if location capture collapses onto the helper line.
#[test]
fn given_tracked_helper_when_called_twice_then_lines_differ() {
    // GIVEN: A tracked helper
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Calling it from two consecutive lines
    let first = capture();
    let second = capture();

    // THEN: Consecutive lines, same file
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line);
}

/// **VALUE**: Locations serialize so the CLI can emit errors as JSON.
#[test]
fn given_error_location_when_serialized_then_contains_fields() {
    let location = ErrorLocation {
        file: "lib.rs",
        line: 1,
        column: 2,
    };

    let json = serde_json::to_string(&location).unwrap();

    assert_eq!(json, r#"{"file":"lib.rs","line":1,"column":2}"#);
}
