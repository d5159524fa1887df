mod common;

use common::*;
use slotcheck::CheckOptions;
use slotcheck::diagnostics::ErrorCode;

const PAYLOADS: &str = r#"
class Payload(Base): ...
class Base: ...
"#;

fn with_payloads(body: &str, options: &CheckOptions) -> slotcheck::CheckReport {
    let app = format!("import payloads\n{APP_HEADER}{body}");
    check_modules_with(
        &[("app", &app), ("widgets", WIDGETS), ("payloads", PAYLOADS)],
        "[Field]\nchanged = [\"Payload\"]\n",
        options,
    )
}

#[test]
fn bases_declared_in_later_modules() {
    let report = check_app(
        r#"
    @widget_event("field", "changed")
    def on_changed(self, text: str) -> None: ...
"#,
    );
    assert_clean(&report);
    assert!(report.passes > 1, "app precedes widgets, so its class completes late");
}

#[test]
fn registry_type_that_becomes_ready_later() {
    let ok = with_payloads(
        r#"
    @widget_event("field", "changed")
    def on_changed(self, p: payloads.Payload) -> None: ...
"#,
        &CheckOptions::default(),
    );
    assert_clean(&ok);

    let wrong = with_payloads(
        r#"
    @widget_event("field", "changed")
    def on_changed(self, p: int) -> None: ...
"#,
        &CheckOptions::default(),
    );
    assert_eq!(
        messages(&wrong),
        vec!["Argument 2 to \"on_changed\" has incompatible type \"int\"; Emitted signal will expect type \"Payload\"."]
    );
}

#[test]
fn aliases_and_forward_references_in_the_same_module() {
    let app = format!(
        "{APP_HEADER}{}",
        r#"
    @widget_event("field", "changed")
    def on_text(self, t: "Later") -> None: ...

    @widget_event("btn", "clicked")
    def on_alias(self, t: Text) -> None: ...

class Later: ...
Text = str
"#
    );
    let report = check_modules(&[("app", &app), ("widgets", WIDGETS)], "Field.changed = [\"Later\"]\nButton.clicked = [\"Text\"]\n");
    assert_clean(&report);

    let app = app.replace("t: Text", "t: int");
    let report = check_modules(&[("app", &app), ("widgets", WIDGETS)], "Field.changed = [\"Later\"]\nButton.clicked = [\"Text\"]\n");
    assert_eq!(
        messages(&report),
        vec!["Argument 2 to \"on_alias\" has incompatible type \"int\"; Emitted signal will expect type \"str\"."]
    );
}

#[test]
fn names_that_never_resolve_are_reported_once() {
    let app = format!(
        "{APP_HEADER}{}",
        r#"
    @widget_event("field", "changed")
    def first(self, g: int) -> None: ...

    @widget_event("field", "changed")
    def second(self, g: str) -> None: ...
"#
    );
    let report = check_modules(&[("app", &app), ("widgets", WIDGETS)], "Field.changed = [\"Ghost\"]\n");
    assert_eq!(codes(&report), vec![ErrorCode::UnresolvedSymbol]);
    assert_eq!(messages(&report), vec!["Cannot resolve name \"Ghost\""]);
}

#[test]
fn unresolved_parameter_annotation_is_reported() {
    let report = check_app(
        r#"
    @widget_event("field", "changed")
    def on_changed(self, text: Mystery) -> None: ...
"#,
    );
    assert_eq!(messages(&report), vec!["Cannot resolve name \"Mystery\""]);
}

#[test]
fn exhausted_pass_budget_never_invents_mismatches() {
    let options = CheckOptions { max_passes: 1, ..CheckOptions::default() };
    let report = with_payloads(
        r#"
    @widget_event("field", "changed")
    def on_changed(self, p: int) -> None: ...
"#,
        &options,
    );
    assert_eq!(report.passes, 1);
    assert!(!codes(&report).contains(&ErrorCode::ArgumentTypeMismatch), "{:#?}", report.diagnostics);
    assert!(codes(&report).contains(&ErrorCode::UnresolvedSymbol));
}

#[test]
fn unresolved_name_inside_optional_is_reported() {
    let report = check_app(
        r#"
    @widget_event("field", "changed")
    def on_changed(self, text: Optional[Mystery]) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::UnresolvedSymbol]);
    assert_eq!(messages(&report), vec!["Cannot resolve name \"Mystery\""]);
}

#[test]
fn nested_annotation_waits_for_its_class() {
    const CHAIN: &str = r#"
class Later(C1): ...
class C1(C2): ...
class C2: ...
"#;
    let app = format!(
        "import payloads\n{APP_HEADER}{}",
        r#"
    @widget_event("field", "changed")
    def on_nested(self, p: Optional[payloads.Later]) -> None: ...
"#
    );
    let report = check_modules(&[("app", &app), ("widgets", WIDGETS), ("payloads", CHAIN)], "Field.changed = [\"int\"]\n");
    assert_eq!(codes(&report), vec![ErrorCode::ArgumentTypeMismatch]);
    assert_eq!(
        messages(&report),
        vec!["Argument 2 to \"on_nested\" has incompatible type \"Later | None\"; Emitted signal will expect type \"int\"."]
    );
}
