use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::CheckOptions;
use crate::diagnostics::CheckError;

pub const MANIFEST_NAME: &str = "slotcheck.toml";

// ---- TOML deserialization types ----

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlManifest {
    #[serde(default)]
    check: TomlCheck,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TomlCheck {
    registry: Option<String>,
    max_passes: Option<usize>,
    receiver: Option<String>,
    class_decorator: Option<String>,
    handler_decorator: Option<String>,
    #[serde(default)]
    stubs: Vec<String>,
}

/// A loaded `slotcheck.toml`. Relative paths are already joined onto its directory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pub path: PathBuf,
    pub registry: Option<PathBuf>,
    pub max_passes: Option<usize>,
    pub receiver: Option<String>,
    pub class_decorator: Option<String>,
    pub handler_decorator: Option<String>,
    pub stubs: Vec<PathBuf>,
}

impl Manifest {
    /// Overlay the manifest onto `options`. Values already set from the command line win,
    /// which callers express by applying CLI flags afterwards.
    pub fn apply(&self, options: &mut CheckOptions) {
        if let Some(registry) = &self.registry {
            options.registry_path = Some(registry.clone());
        }
        if let Some(max) = self.max_passes {
            options.max_passes = max;
        }
        if let Some(receiver) = &self.receiver {
            options.receiver = receiver.clone();
        }
        if let Some(deco) = &self.class_decorator {
            options.class_decorator = deco.clone();
        }
        if let Some(deco) = &self.handler_decorator {
            options.handler_decorator = deco.clone();
        }
        options.stubs.extend(self.stubs.iter().cloned());
    }
}

// ---- Manifest discovery ----

/// Walk from start_dir up to .git or FS root, looking for slotcheck.toml.
pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        // A .git file or directory marks the project boundary.
        if dir.join(".git").exists() {
            return None;
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Find and load the manifest governing `input`, if there is one.
pub fn discover(input: &Path) -> Result<Option<Manifest>, CheckError> {
    let start = if input.is_dir() {
        input.to_path_buf()
    } else {
        input.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    let start = if start.as_os_str().is_empty() { PathBuf::from(".") } else { start };
    let start = start.canonicalize().unwrap_or(start);
    match find_manifest(&start) {
        Some(path) => load(&path).map(Some),
        None => Ok(None),
    }
}

// ---- Parsing & validation ----

pub fn load(manifest_path: &Path) -> Result<Manifest, CheckError> {
    let content = std::fs::read_to_string(manifest_path).map_err(|e| {
        CheckError::manifest(format!("{MANIFEST_NAME}: could not read file: {e}"), manifest_path.to_path_buf())
    })?;
    parse(&content, manifest_path)
}

pub fn parse(content: &str, manifest_path: &Path) -> Result<Manifest, CheckError> {
    let raw: TomlManifest = toml::from_str(content).map_err(|e| {
        CheckError::manifest(format!("{MANIFEST_NAME}: invalid syntax: {e}"), manifest_path.to_path_buf())
    })?;
    let check = raw.check;

    if check.max_passes == Some(0) {
        return Err(CheckError::manifest(
            format!("{MANIFEST_NAME}: 'max-passes' must be at least 1"),
            manifest_path.to_path_buf(),
        ));
    }
    for (key, value) in [
        ("receiver", &check.receiver),
        ("class-decorator", &check.class_decorator),
        ("handler-decorator", &check.handler_decorator),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(CheckError::manifest(
                format!("{MANIFEST_NAME}: '{key}' must not be empty"),
                manifest_path.to_path_buf(),
            ));
        }
    }

    let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));
    Ok(Manifest {
        path: manifest_path.to_path_buf(),
        registry: check.registry.map(|p| manifest_dir.join(p)),
        max_passes: check.max_passes,
        receiver: check.receiver,
        class_decorator: check.class_decorator,
        handler_decorator: check.handler_decorator,
        stubs: check.stubs.into_iter().map(|p| manifest_dir.join(p)).collect(),
    })
}
