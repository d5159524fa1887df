use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::SourceFile;
use crate::line_index::{LineIndex, char_offset};
use crate::span::Span;

/// Fatal errors: the run stops and nothing is checked.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("Syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("Registry format error: {msg}")]
    Registry { msg: String, path: Option<PathBuf> },

    #[error("Config error: {msg}")]
    Manifest { msg: String, path: PathBuf },

    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },
}

impl CheckError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn registry(msg: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Registry { msg: msg.into(), path }
    }

    pub fn manifest(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Manifest { msg: msg.into(), path }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }

    /// Re-home a syntax error produced while parsing file `file_id`.
    pub fn in_file(self, file_id: u32) -> Self {
        match self {
            Self::Syntax { msg, span } => Self::Syntax {
                msg,
                span: Span::with_file(span.start, span.end, file_id),
            },
            other => other,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Registry { .. } => Some(ErrorCode::RegistryFormatError),
            _ => None,
        }
    }
}

/// Stable, user-visible diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorCode {
    MixedOrInvalidDecorator,
    UnknownAttribute,
    UnknownEvent,
    TooManyArguments,
    InvalidReceiverName,
    ArgumentTypeMismatch,
    UnresolvedSymbol,
    RegistryFormatError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MixedOrInvalidDecorator => "MixedOrInvalidDecorator",
            ErrorCode::UnknownAttribute => "UnknownAttribute",
            ErrorCode::UnknownEvent => "UnknownEvent",
            ErrorCode::TooManyArguments => "TooManyArguments",
            ErrorCode::InvalidReceiverName => "InvalidReceiverName",
            ErrorCode::ArgumentTypeMismatch => "ArgumentTypeMismatch",
            ErrorCode::UnresolvedSymbol => "UnresolvedSymbol",
            ErrorCode::RegistryFormatError => "RegistryFormatError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal finding against one class (and usually one method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub class_name: String,
    pub method_name: Option<String>,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  [{}]", self.message, self.code)
    }
}

/// Output styles accepted by `slotcheck check --format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Short,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(OutputFormat::Pretty),
            "short" => Ok(OutputFormat::Short),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}'; expected 'pretty', 'short' or 'json'")),
        }
    }
}

fn file_for(files: &[SourceFile], span: Span) -> Option<&SourceFile> {
    files.get(span.file_id as usize)
}

/// `path:line:col: error: message  [Code]`, one line per diagnostic.
pub fn render_short(diag: &Diagnostic, files: &[SourceFile]) -> String {
    match file_for(files, diag.span) {
        Some(file) => {
            let pos = LineIndex::new(&file.text).position(&file.text, diag.span.start);
            format!(
                "{}:{}:{}: error: {}",
                file.path.display(),
                pos.line,
                pos.column,
                diag
            )
        }
        None => format!("<unknown>: error: {diag}"),
    }
}

/// Labelled ariadne report for one diagnostic.
pub fn render_pretty(diag: &Diagnostic, files: &[SourceFile], color: bool) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    let Some(file) = file_for(files, diag.span) else {
        return render_short(diag, files);
    };
    let id = file.path.display().to_string();
    let start = char_offset(&file.text, diag.span.start);
    let end = char_offset(&file.text, diag.span.end).max(start);
    let label = match &diag.method_name {
        Some(method) => format!("in handler \"{method}\" of \"{}\"", diag.class_name),
        None => format!("in class \"{}\"", diag.class_name),
    };

    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, id.clone(), start)
        .with_code(diag.code)
        .with_message(&diag.message)
        .with_label(Label::new((id.clone(), start..end)).with_message(label))
        .with_config(Config::default().with_color(color))
        .finish()
        .write((id, Source::from(file.text.as_str())), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => render_short(diag, files),
    }
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    path: String,
    line: usize,
    column: usize,
    code: ErrorCode,
    message: &'a str,
    class: &'a str,
    method: Option<&'a str>,
}

/// A JSON array of diagnostics with resolved positions.
pub fn render_json(diags: &[Diagnostic], files: &[SourceFile]) -> String {
    let records: Vec<JsonDiagnostic<'_>> = diags
        .iter()
        .map(|d| {
            let (path, line, column) = match file_for(files, d.span) {
                Some(file) => {
                    let pos = LineIndex::new(&file.text).position(&file.text, d.span.start);
                    (file.path.display().to_string(), pos.line, pos.column)
                }
                None => ("<unknown>".to_string(), 0, 0),
            };
            JsonDiagnostic {
                path,
                line,
                column,
                code: d.code,
                message: &d.message,
                class: &d.class_name,
                method: d.method_name.as_deref(),
            }
        })
        .collect();
    serde_json::to_string_pretty(&records).unwrap_or_else(|_| "[]".to_string())
}

/// Render a fatal CheckError for terminal output.
pub fn render_error(err: &CheckError, files: &[SourceFile]) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    match err {
        CheckError::Syntax { msg, span } => {
            let Some(file) = file_for(files, *span) else {
                return format!("error: {err}");
            };
            let id = file.path.display().to_string();
            let start = char_offset(&file.text, span.start);
            let end = char_offset(&file.text, span.end).max(start);
            let mut out = Vec::new();
            let written = Report::build(ReportKind::Error, id.clone(), start)
                .with_message("syntax error")
                .with_label(Label::new((id.clone(), start..end)).with_message(msg))
                .with_config(Config::default().with_color(false))
                .finish()
                .write((id, Source::from(file.text.as_str())), &mut out);
            match written {
                Ok(()) => String::from_utf8_lossy(&out).into_owned(),
                Err(_) => format!("error: {err}"),
            }
        }
        CheckError::Registry { path: Some(path), .. } => {
            format!("error[{}]: {err}\n  --> {}", ErrorCode::RegistryFormatError, path.display())
        }
        CheckError::Registry { path: None, .. } => {
            format!("error[{}]: {err}", ErrorCode::RegistryFormatError)
        }
        CheckError::Manifest { path, .. } | CheckError::Io { path, .. } => {
            format!("error: {err}\n  --> {}", path.display())
        }
    }
}
