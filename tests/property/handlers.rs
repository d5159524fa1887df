// Property tests for whole-class checking:
// 1. Supertype parameters produce no diagnostics
// 2. Narrowing one parameter produces exactly one mismatch, at that position
// 3. Dropping trailing parameters produces exactly one arity error
// 4. Unknown emitter paths are always reported, whatever else the method declares
// 5. Types declared in later modules never cause spurious diagnostics

use proptest::prelude::*;
use slotcheck::diagnostics::ErrorCode;
use slotcheck::registry::SignalRegistry;
use slotcheck::{CheckOptions, CheckReport, SourceFile};

/// An emitted type, parameter types that accept it, and ones that do not.
struct Payload {
    emitted: &'static str,
    wider: &'static [&'static str],
    narrower: &'static [&'static str],
}

const PAYLOADS: &[Payload] = &[
    Payload { emitted: "int", wider: &["int", "float", "complex", "object", "Any"], narrower: &["str", "bytes"] },
    Payload { emitted: "bool", wider: &["bool", "int", "float", "object"], narrower: &["str", "list[int]"] },
    Payload { emitted: "str", wider: &["str", "object", "Optional[str]"], narrower: &["int", "bytes"] },
    Payload { emitted: "float", wider: &["float", "complex", "object"], narrower: &["int", "bool"] },
    Payload { emitted: "list", wider: &["list[str]", "list", "Sequence[int]", "object"], narrower: &["dict[str, int]", "str"] },
    Payload { emitted: "Record", wider: &["Record", "models.Base", "object"], narrower: &["models.Other", "int"] },
];

const MODELS: &str = r#"
class Record(Base): ...
class Base: ...
class Other: ...
"#;

const WIDGETS: &str = r#"
class Source: ...
class Holder:
    inner: Source
"#;

fn arb_signature() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..PAYLOADS.len(), 0..5)
}

fn registry(signature: &[usize]) -> SignalRegistry {
    let types: Vec<String> = signature.iter().map(|&i| format!("\"{}\"", PAYLOADS[i].emitted)).collect();
    let toml = format!("[Source]\nfired = [{}]\nother = []\n", types.join(", "));
    SignalRegistry::from_toml_str(&toml, None).unwrap()
}

fn app(handlers: &str) -> String {
    format!(
        r#"
from typing import Any, Optional, Sequence

import models
import widgets
from models import Record
from pyside_callbacks import pyside_callbacks, widget_event

@pyside_callbacks
class App:
    source: widgets.Source
    holder: widgets.Holder
{handlers}"#
    )
}

fn handler(pairs: &[(&str, &str)], params: &[String]) -> String {
    let mut out = String::new();
    for (path, event) in pairs {
        out.push_str(&format!("    @widget_event(\"{path}\", \"{event}\")\n"));
    }
    let mut formals = vec!["self".to_string()];
    formals.extend(params.iter().enumerate().map(|(i, ty)| format!("a{i}: {ty}")));
    out.push_str(&format!("    def handle({}) -> None: ...\n", formals.join(", ")));
    out
}

fn check(signature: &[usize], handlers: &str) -> CheckReport {
    // The app comes first so every registry type is still pending on the first pass.
    let files = [
        SourceFile::new("app", "app.py", app(handlers)),
        SourceFile::new("widgets", "widgets.py", WIDGETS),
        SourceFile::new("models", "models.py", MODELS),
    ];
    slotcheck::check_sources(&files, &CheckOptions::default(), &registry(signature)).unwrap()
}

fn codes(report: &CheckReport) -> Vec<ErrorCode> {
    report.diagnostics.iter().map(|d| d.code).collect()
}

fn wider(signature: &[usize], picks: &[usize]) -> Vec<String> {
    signature
        .iter()
        .zip(picks.iter().cycle())
        .map(|(&i, &pick)| {
            let options = PAYLOADS[i].wider;
            options[pick % options.len()].to_string()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn supertype_parameters_are_clean(
        signature in arb_signature(),
        picks in prop::collection::vec(0usize..8, 1..5),
    ) {
        let params = wider(&signature, &picks);
        let report = check(&signature, &handler(&[("source", "fired")], &params));
        prop_assert!(report.is_clean(), "{:?}", report.diagnostics);
    }

    #[test]
    fn one_narrowed_parameter_is_one_mismatch(
        signature in arb_signature().prop_filter("needs a value", |s| !s.is_empty()),
        picks in prop::collection::vec(0usize..8, 1..5),
        at in any::<prop::sample::Index>(),
        narrow in 0usize..2,
    ) {
        let mut params = wider(&signature, &picks);
        let position = at.index(signature.len());
        let narrower = PAYLOADS[signature[position]].narrower;
        params[position] = narrower[narrow % narrower.len()].to_string();

        let report = check(&signature, &handler(&[("source", "fired")], &params));
        prop_assert_eq!(codes(&report), vec![ErrorCode::ArgumentTypeMismatch]);
        let message = &report.diagnostics[0].message;
        let expected_position = format!("Argument {} to \"handle\"", position + 2);
        prop_assert!(message.starts_with(&expected_position), "{}", message);
    }

    #[test]
    fn missing_parameters_are_one_arity_error(
        signature in arb_signature().prop_filter("needs a value", |s| !s.is_empty()),
        picks in prop::collection::vec(0usize..8, 1..5),
        keep in any::<prop::sample::Index>(),
    ) {
        let mut params = wider(&signature, &picks);
        params.truncate(keep.index(signature.len()));
        let report = check(&signature, &handler(&[("source", "fired")], &params));
        prop_assert_eq!(codes(&report), vec![ErrorCode::TooManyArguments]);
    }

    #[test]
    fn unknown_paths_are_always_reported(
        signature in arb_signature(),
        picks in prop::collection::vec(0usize..8, 1..5),
        missing in "[a-z][a-z_]{0,8}".prop_filter("not an attribute", |s| !["source", "holder", "inner", "handle"].contains(&s.as_str())),
        nested in any::<bool>(),
    ) {
        let params = wider(&signature, &picks);
        let path = if nested { format!("holder.{missing}") } else { missing.clone() };
        let report = check(&signature, &handler(&[("source", "fired"), (path.as_str(), "fired")], &params));
        prop_assert_eq!(codes(&report), vec![ErrorCode::UnknownAttribute]);
    }

    #[test]
    fn stacked_pairs_are_diagnosed_independently(
        signature in arb_signature().prop_filter("needs a value", |s| !s.is_empty()),
        picks in prop::collection::vec(0usize..8, 1..5),
    ) {
        let params = wider(&signature, &picks);
        let report = check(&signature, &handler(&[("source", "fired"), ("holder.inner", "other")], &params));
        prop_assert_eq!(codes(&report), vec![ErrorCode::TooManyArguments]);
        prop_assert!(report.diagnostics[0].message.contains("supply []"));
    }
}
