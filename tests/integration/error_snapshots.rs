//! Snapshot tests for diagnostic rendering.
//!
//! Uses insta to capture rendered output and detect regressions.
//! Run `cargo insta review` to review changes.

mod common;

use common::*;
use insta::assert_snapshot;
use slotcheck::diagnostics::OutputFormat;

#[test]
fn every_handler_error_in_short_format() {
    let report = check_app(
        r#"
    @widget_event("nothing", "clicked")
    def a(self) -> None: ...

    @widget_event("btn", "exploded")
    def b(self) -> None: ...

    @widget_event("field", "cursor")
    def c(self, x: int) -> None: ...

    @widget_event("btn", "toggled")
    def d(me, on: str) -> None: ...

    @staticmethod
    @widget_event("btn", "clicked")
    def e(self) -> None: ...
"#,
    );
    assert_snapshot!(report.render(OutputFormat::Short, false), @r#"
    app.py:15:5: error: "App" has no attribute "nothing"  [UnknownAttribute]
    app.py:18:5: error: "Button" does not have signal "exploded"  [UnknownEvent]
    app.py:22:9: error: Too many arguments for "c"; Emitted signal will supply ["int", "int"]  [TooManyArguments]
    app.py:25:11: error: Argument 1 to d should be "self"  [InvalidReceiverName]
    app.py:25:19: error: Argument 2 to "d" has incompatible type "str"; Emitted signal will expect type "bool".  [ArgumentTypeMismatch]
    app.py:29:9: error: Callbacks may only be decorated by widget_event  [MixedOrInvalidDecorator]
    "#);
}

#[test]
fn unresolved_annotation_in_short_format() {
    let report = check_app(
        r#"
    @widget_event("field", "changed")
    def f(self, text: Ghost) -> None: ...
"#,
    );
    assert_snapshot!(report.render(OutputFormat::Short, false), @r#"app.py:16:23: error: Cannot resolve name "Ghost"  [UnresolvedSymbol]"#);
}

#[test]
fn mismatch_as_json() {
    let report = check_app(
        r#"
    @widget_event("slider", "moved")
    def on_move(self, value: int) -> None: ...
"#,
    );
    assert_snapshot!(report.render(OutputFormat::Json, false), @r#"
    [
      {
        "path": "app.py",
        "line": 16,
        "column": 30,
        "code": "ArgumentTypeMismatch",
        "message": "Argument 2 to \"on_move\" has incompatible type \"int\"; Emitted signal will expect type \"float\".",
        "class": "App",
        "method": "on_move"
      }
    ]
    "#);
}

#[test]
fn pretty_output_names_the_handler() {
    let report = check_app(
        r#"
    @widget_event("field", "changed")
    def on_text(self, text: bytes) -> None: ...
"#,
    );
    let pretty = report.render(OutputFormat::Pretty, false);
    assert!(pretty.contains("[ArgumentTypeMismatch]"), "{pretty}");
    assert!(pretty.contains("in handler \"on_text\" of \"App\""), "{pretty}");
    assert!(pretty.contains("app.py:16:"), "{pretty}");
}
