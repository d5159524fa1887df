mod common;

use std::fs;
use std::path::Path;

use common::*;

const GOOD_APP: &str = r#"
import widgets
from pyside_callbacks import pyside_callbacks, widget_event

@pyside_callbacks
class App:
    field: widgets.Field

    @widget_event("field", "changed")
    def changed(self, text: str) -> None: ...
"#;

fn project(app: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join("app.py"), app).unwrap();
    fs::write(dir.path().join("widgets.py"), WIDGETS).unwrap();
    fs::write(dir.path().join("signals.toml"), REGISTRY).unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let out = slotcheck().current_dir(dir).args(args).output().unwrap();
    (
        out.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&out.stdout).into_owned(),
        String::from_utf8_lossy(&out.stderr).into_owned(),
    )
}

#[test]
fn clean_project_exits_zero() {
    let dir = project(GOOD_APP);
    let (code, stdout, stderr) = run(dir.path(), &["check", "--registry", "signals.toml", "app.py", "widgets.py"]);
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.is_empty(), "{stdout}");
    assert!(stderr.contains("no issues found in 2 file(s)"), "{stderr}");
}

#[test]
fn diagnostics_exit_one_in_short_format() {
    let dir = project(&GOOD_APP.replace("text: str", "text: int"));
    let (code, stdout, _) =
        run(dir.path(), &["check", "--registry", "signals.toml", "--format", "short", "app.py", "widgets.py"]);
    assert_eq!(code, 1);
    assert_eq!(
        stdout.trim_end(),
        "app.py:10:29: error: Argument 2 to \"changed\" has incompatible type \"int\"; \
         Emitted signal will expect type \"str\".  [ArgumentTypeMismatch]"
    );
}

#[test]
fn directories_expand_to_python_files() {
    let dir = project(&GOOD_APP.replace("\"changed\")", "\"vanished\")"));
    fs::write(dir.path().join("notes.txt"), "not python").unwrap();
    let (code, stdout, stderr) = run(dir.path(), &["check", "--registry", "signals.toml", "--format", "short", "."]);
    assert_eq!(code, 1, "{stderr}");
    assert!(stdout.contains("[UnknownEvent]"), "{stdout}");
    assert!(stderr.contains("in 2 file(s)"), "{stderr}");
}

#[test]
fn json_output_is_machine_readable() {
    let dir = project(&GOOD_APP.replace("self, text", "this, text"));
    let (code, stdout, _) =
        run(dir.path(), &["check", "--registry", "signals.toml", "--format", "json", "app.py", "widgets.py"]);
    assert_eq!(code, 1);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["code"], "InvalidReceiverName");
    assert_eq!(records[0]["class"], "App");
    assert_eq!(records[0]["method"], "changed");
    assert_eq!(records[0]["line"], 10);
}

#[test]
fn fatal_errors_exit_two() {
    let dir = project(GOOD_APP);
    fs::write(dir.path().join("broken.toml"), "[Field]\nchanged = \"str\"\n").unwrap();
    let (code, stdout, stderr) = run(dir.path(), &["check", "--registry", "broken.toml", "app.py"]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("RegistryFormatError"), "{stderr}");

    fs::write(dir.path().join("bad.py"), "class (:\n").unwrap();
    let (code, _, stderr) = run(dir.path(), &["check", "--registry", "signals.toml", "bad.py"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("syntax error"), "{stderr}");

    let (code, _, stderr) = run(dir.path(), &["check", "missing.py"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("could not read source"), "{stderr}");
}

#[test]
fn config_file_is_discovered_from_the_first_input() {
    let dir = project(&GOOD_APP.replace("text: str", "text: bytes"));
    fs::write(dir.path().join("slotcheck.toml"), "[check]\nregistry = \"signals.toml\"\nstubs = [\"widgets.py\"]\n")
        .unwrap();
    let (code, stdout, stderr) = run(dir.path(), &["check", "--format", "short", "app.py"]);
    assert_eq!(code, 1, "{stderr}");
    assert!(stdout.contains("[ArgumentTypeMismatch]"), "{stdout}");

    fs::write(dir.path().join("slotcheck.toml"), "[check]\nmax-passes = 0\n").unwrap();
    let (code, _, stderr) = run(dir.path(), &["check", "app.py"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("max-passes"), "{stderr}");
}

#[test]
fn explicit_config_path() {
    let dir = project(GOOD_APP);
    fs::create_dir(dir.path().join("conf")).unwrap();
    fs::write(
        dir.path().join("conf/strict.toml"),
        "[check]\nregistry = \"../signals.toml\"\nreceiver = \"this\"\nstubs = [\"../widgets.py\"]\n",
    )
    .unwrap();
    let (code, stdout, _) = run(dir.path(), &["check", "--config", "conf/strict.toml", "--format", "short", "app.py"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("should be \"this\""), "{stdout}");
}

#[test]
fn registry_subcommand_prints_toml() {
    let dir = project(GOOD_APP);
    let (code, stdout, _) = run(dir.path(), &["registry", "--type", "PySide6.QtWidgets.QPushButton"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("[QPushButton]"), "{stdout}");
    assert!(stdout.contains("clicked = []"), "{stdout}");

    let (code, stdout, _) = run(dir.path(), &["registry", "--registry", "signals.toml"]);
    assert_eq!(code, 0);
    let reparsed = slotcheck::registry::SignalRegistry::from_toml_str(&stdout, None).unwrap();
    assert_eq!(reparsed, registry(REGISTRY));

    let (code, _, stderr) = run(dir.path(), &["registry", "--type", "QNothing"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("QNothing"), "{stderr}");
}
