mod common;

use common::*;
use slotcheck::diagnostics::ErrorCode;
use slotcheck::{CheckOptions, manifest, registry};

fn demo_options() -> CheckOptions {
    let app = demo_dir().join("app.py");
    let found = manifest::discover(&app).unwrap().expect("demo carries a slotcheck.toml");
    let mut options = CheckOptions::default();
    found.apply(&mut options);
    options
}

#[test]
fn demo_reports_only_the_deliberate_mistake() {
    let options = demo_options();
    assert_eq!(options.max_passes, 10);
    let report = slotcheck::check_files(&[demo_dir().join("app.py")], &options).unwrap();

    assert_eq!(codes(&report), vec![ErrorCode::ArgumentTypeMismatch]);
    let diag = &report.diagnostics[0];
    assert_eq!(diag.class_name, "MyQtApp");
    assert_eq!(diag.method_name.as_deref(), Some("block_count_changed"));
    assert_eq!(
        diag.message,
        "Argument 2 to \"block_count_changed\" has incompatible type \"str\"; Emitted signal will expect type \"int\"."
    );
    // The app plus two interface files and three Qt stubs.
    assert_eq!(report.files.len(), 6);
}

#[test]
fn fixed_demo_is_clean() {
    let options = demo_options();
    let mut sources = slotcheck::collect_sources(&[demo_dir().join("app.py")], &options.stubs).unwrap();
    let app = &mut sources[0];
    assert_eq!(app.module, "app");
    app.text = app.text.replace("count: str", "count: int");

    let registry = registry::load_or_bundled(None).unwrap();
    let report = slotcheck::check_sources(&sources, &options, &registry).unwrap();
    assert_clean(&report);
    assert!(report.passes >= 2, "app is declared before its stubs, so one deferral is needed");
}

#[test]
fn demo_through_the_binary() {
    let out = slotcheck()
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--format", "short", "demos/my_app/app.py"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.starts_with("demos/my_app/app.py:37:42: error: Argument 2 to \"block_count_changed\""),
        "{stdout}"
    );
    assert!(stdout.trim_end().ends_with("[ArgumentTypeMismatch]"), "{stdout}");
}
