mod common;

use common::*;
use slotcheck::diagnostics::ErrorCode;

fn check_typed(body: &str) -> slotcheck::CheckReport {
    let app = format!("from typing import Iterable, Mapping, Sequence\n{APP_HEADER}{body}");
    check_modules(&[("app", &app), ("widgets", WIDGETS)], REGISTRY)
}

#[test]
fn bare_registry_generics_match_any_parameterization() {
    let report = check_typed(
        r#"
    @widget_event("listing", "selected")
    def as_list(self, items: list[str]) -> None: ...

    @widget_event("listing", "selected")
    def as_bare_list(self, items: list) -> None: ...

    @widget_event("listing", "selected")
    def as_sequence(self, items: Sequence[int]) -> None: ...

    @widget_event("listing", "selected")
    def as_iterable(self, items: Iterable[object]) -> None: ...

    @widget_event("listing", "activated")
    def as_model(self, model: widgets.Model[int]) -> None: ...
"#,
    );
    assert_clean(&report);
}

#[test]
fn unrelated_generic_is_a_mismatch() {
    let report = check_typed(
        r#"
    @widget_event("listing", "selected")
    def as_dict(self, items: dict[str, int]) -> None: ...

    @widget_event("listing", "selected")
    def as_mapping(self, items: Mapping[str, int]) -> None: ...

    @widget_event("listing", "activated")
    def as_reader(self, model: widgets.Reader[int]) -> None: ...
"#,
    );
    assert_eq!(
        messages(&report),
        vec![
            "Argument 2 to \"as_dict\" has incompatible type \"dict[str, int]\"; Emitted signal will expect type \"list[Any]\".",
            "Argument 2 to \"as_mapping\" has incompatible type \"Mapping[str, int]\"; Emitted signal will expect type \"list[Any]\".",
            "Argument 2 to \"as_reader\" has incompatible type \"Reader[int]\"; Emitted signal will expect type \"Model[Any]\".",
        ]
    );
}

#[test]
fn numeric_promotions_widen_but_never_narrow() {
    let report = check_typed(
        r#"
    @widget_event("slider", "moved")
    def as_float(self, value: float) -> None: ...

    @widget_event("slider", "moved")
    def as_complex(self, value: complex) -> None: ...

    @widget_event("slider", "moved")
    def as_object(self, value: object) -> None: ...

    @widget_event("slider", "released")
    def int_as_float(self, value: float) -> None: ...

    @widget_event("btn", "toggled")
    def bool_as_int(self, on: int) -> None: ...
"#,
    );
    assert_clean(&report);

    let report = check_typed(
        r#"
    @widget_event("slider", "moved")
    def as_int(self, value: int) -> None: ...

    @widget_event("slider", "released")
    def as_bool(self, value: bool) -> None: ...
"#,
    );
    assert_eq!(
        messages(&report),
        vec![
            "Argument 2 to \"as_int\" has incompatible type \"int\"; Emitted signal will expect type \"float\".",
            "Argument 2 to \"as_bool\" has incompatible type \"bool\"; Emitted signal will expect type \"int\".",
        ]
    );
}

#[test]
fn optional_and_union_parameters() {
    let report = check_typed(
        r#"
    @widget_event("slider", "moved")
    def maybe(self, value: Optional[float]) -> None: ...

    @widget_event("slider", "released")
    def either(self, value: int | str) -> None: ...

    @widget_event("field", "changed")
    def any_text(self, text: Any) -> None: ...
"#,
    );
    assert_clean(&report);

    let report = check_typed(
        r#"
    @widget_event("slider", "released")
    def neither(self, value: str | None) -> None: ...
"#,
    );
    assert_eq!(codes(&report), vec![ErrorCode::ArgumentTypeMismatch]);
}

#[test]
fn declared_attribute_arguments_are_kept() {
    let registry = format!("{REGISTRY}\n[Model]\nreset = [\"Model\"]\n");
    let app = format!(
        "{APP_HEADER}{}",
        r#"
    @widget_event("listing.model", "reset")
    def on_reset(self, model: widgets.Model[str]) -> None: ...
"#
    );
    let report = check_modules(&[("app", &app), ("widgets", WIDGETS)], &registry);
    assert_clean(&report);
}
