mod common;

use common::*;
use slotcheck::CheckOptions;
use slotcheck::diagnostics::ErrorCode;

#[test]
fn too_many_is_reported_once_per_pair() {
    let report = check_app(
        r#"
    @widget_event("field", "cursor")
    def one(self, x: int) -> None: ...
"#,
    );
    assert_eq!(
        messages(&report),
        vec!["Too many arguments for \"one\"; Emitted signal will supply [\"int\", \"int\"]"]
    );
}

#[test]
fn missing_receiver_is_too_many() {
    let report = check_app(
        r#"
    @widget_event("btn", "clicked")
    def nothing() -> None: ...
"#,
    );
    assert_eq!(messages(&report), vec!["Too many arguments for \"nothing\"; Emitted signal will supply []"]);
}

#[test]
fn too_few_uses_the_same_code() {
    let report = check_app(
        r#"
    @widget_event("btn", "toggled")
    def two(self, on: bool, extra: int) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::TooManyArguments]);
    assert_eq!(messages(&report), vec!["Too few arguments for \"two\"; Emitted signal will supply [\"bool\"]"]);
}

#[test]
fn variadic_and_optional_formals_absorb_values() {
    let report = check_app(
        r#"
    @widget_event("field", "cursor")
    def star(self, *xs: int) -> None: ...

    @widget_event("field", "cursor")
    def star_after(self, x: int, *rest: Any) -> None: ...

    @widget_event("field", "cursor")
    def kwargs(self, x: int, y: int, **extra: Any) -> None: ...

    @widget_event("field", "cursor")
    def defaults(self, x: int, y: int, z: int = 0) -> None: ...

    @widget_event("btn", "clicked")
    def optional_only(self, flag: bool = False) -> None: ...

    @widget_event("field", "cursor")
    def keyword_only_after(self, x: int, y: int, *, z: int) -> None: ...
"#,
    );
    assert_clean(&report);
}

#[test]
fn keyword_only_formals_never_take_emitted_values() {
    let report = check_app(
        r#"
    @widget_event("field", "cursor")
    def kwonly(self, x: int, *, y: int) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::TooManyArguments]);
}

#[test]
fn variadic_annotation_is_checked_for_every_value() {
    let report = check_app(
        r#"
    @widget_event("field", "cursor")
    def star(self, *xs: str) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::ArgumentTypeMismatch, ErrorCode::ArgumentTypeMismatch]);
    let mut msgs = messages(&report);
    msgs.sort();
    assert_eq!(
        msgs,
        vec![
            "Argument 2 to \"star\" has incompatible type \"str\"; Emitted signal will expect type \"int\".",
            "Argument 3 to \"star\" has incompatible type \"str\"; Emitted signal will expect type \"int\".",
        ]
    );
}

#[test]
fn receiver_must_be_named_self() {
    let report = check_app(
        r#"
    @widget_event("field", "cursor")
    def moved(me, x: int, y: int) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::InvalidReceiverName]);
    assert_eq!(messages(&report), vec!["Argument 1 to moved should be \"self\""]);

    let span = report.diagnostics[0].span;
    let app = &report.files[0].text;
    assert_eq!(&app[span.start..span.end], "me");
}

#[test]
fn receiver_name_is_configurable() {
    let options = CheckOptions { receiver: "this".to_string(), ..CheckOptions::default() };
    let app = format!(
        "{APP_HEADER}{}",
        r#"
    @widget_event("btn", "clicked")
    def good(this) -> None: ...

    @widget_event("btn", "clicked")
    def bad(self) -> None: ...
"#
    );
    let report = check_modules_with(&[("app", &app), ("widgets", WIDGETS)], REGISTRY, &options);
    assert_eq!(messages(&report), vec!["Argument 1 to bad should be \"this\""]);
}

#[test]
fn receiver_and_arity_errors_are_independent() {
    let report = check_app(
        r#"
    @widget_event("btn", "clicked")
    def both(this, flag: bool) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::TooManyArguments, ErrorCode::InvalidReceiverName]);
}
