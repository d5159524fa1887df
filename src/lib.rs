pub mod span;
pub mod line_index;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod typeck;
pub mod plugin;
pub mod registry;
pub mod manifest;
pub mod runtime;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use diagnostics::{CheckError, Diagnostic, OutputFormat};
use plugin::SignalPlugin;
use registry::SignalRegistry;
use typeck::{Analyzer, ParsedModule};

/// One input file and the module name it is analyzed under.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub module: String,
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(module: impl Into<String>, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self { module: module.into(), path: path.into(), text: text.into() }
    }

    /// Read `path`, naming the module after the file stem.
    pub fn read(path: &Path) -> Result<Self, CheckError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CheckError::io(format!("could not read source: {e}"), path.to_path_buf()))?;
        Ok(Self::new(module_name(path), path, text))
    }
}

/// `PySide6.QtWidgets.pyi` → `PySide6.QtWidgets`; `pkg/__init__.pyi` → `pkg`.
pub fn module_name(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    if stem == "__init__" {
        if let Some(parent) = path.parent().and_then(Path::file_name) {
            return parent.to_string_lossy().into_owned();
        }
    }
    stem
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOptions {
    /// Registry file; the bundled Qt registry when `None`.
    pub registry_path: Option<PathBuf>,
    pub max_passes: usize,
    pub receiver: String,
    /// Fully qualified name of the class decorator that enables checking.
    pub class_decorator: String,
    /// Final segment of the handler decorator callee.
    pub handler_decorator: String,
    /// Extra stub files or directories analyzed alongside the inputs.
    pub stubs: Vec<PathBuf>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            registry_path: None,
            max_passes: 20,
            receiver: "self".to_string(),
            class_decorator: "pyside_callbacks.pyside_callbacks".to_string(),
            handler_decorator: "widget_event".to_string(),
            stubs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Sorted by file, then offset.
    pub diagnostics: Vec<Diagnostic>,
    pub passes: usize,
    pub files: Vec<SourceFile>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn render(&self, format: OutputFormat, color: bool) -> String {
        match format {
            OutputFormat::Json => diagnostics::render_json(&self.diagnostics, &self.files),
            OutputFormat::Short => self
                .diagnostics
                .iter()
                .map(|d| diagnostics::render_short(d, &self.files) + "\n")
                .collect(),
            OutputFormat::Pretty => self
                .diagnostics
                .iter()
                .map(|d| diagnostics::render_pretty(d, &self.files, color))
                .collect(),
        }
    }
}

/// Parse and analyze in-memory sources, checking every class carrying the class decorator.
pub fn check_sources(
    files: &[SourceFile],
    options: &CheckOptions,
    registry: &SignalRegistry,
) -> Result<CheckReport, CheckError> {
    let modules = files
        .iter()
        .enumerate()
        .map(|(id, file)| {
            let id = id as u32;
            let ast = parser::parse_module(&file.text).map_err(|e| e.in_file(id))?;
            Ok(ParsedModule { name: file.module.clone(), file_id: Some(id), ast })
        })
        .collect::<Result<Vec<_>, CheckError>>()?;

    let plugin = SignalPlugin::new(registry, options);
    let result = Analyzer::new(Some(&plugin), options.max_passes).analyze(&modules);
    tracing::info!(
        files = files.len(),
        passes = result.passes,
        diagnostics = result.diagnostics.len(),
        "check finished"
    );
    Ok(CheckReport { diagnostics: result.diagnostics, passes: result.passes, files: files.to_vec() })
}

/// Read `paths` plus the configured stubs and check them against the configured registry.
pub fn check_files(paths: &[PathBuf], options: &CheckOptions) -> Result<CheckReport, CheckError> {
    let registry = registry::load_or_bundled(options.registry_path.as_ref())?;
    let files = collect_sources(paths, &options.stubs)?;
    check_sources(&files, options, &registry)
}

/// Read inputs then stubs, expanding directories. A file reached twice is read once.
pub fn collect_sources(paths: &[PathBuf], stubs: &[PathBuf]) -> Result<Vec<SourceFile>, CheckError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for path in paths.iter().chain(stubs) {
        for file in expand(path)? {
            let key = file.canonicalize().unwrap_or_else(|_| file.clone());
            if seen.insert(key) {
                files.push(SourceFile::read(&file)?);
            }
        }
    }
    Ok(files)
}

/// A file as-is; a directory as its `.py`/`.pyi` files in name order.
fn expand(path: &Path) -> Result<Vec<PathBuf>, CheckError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path)
        .map_err(|e| CheckError::io(format!("could not list directory: {e}"), path.to_path_buf()))?;
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && matches!(p.extension().and_then(|e| e.to_str()), Some("py" | "pyi")))
        .collect();
    found.sort();
    Ok(found)
}
