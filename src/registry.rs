//! The signal registry: emitter type → event name → emitted type names.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;

use crate::diagnostics::CheckError;
use crate::typeck::types::short_name;

const BUNDLED_SIGNALS: &str = include_str!("signals.toml");

static BUNDLED: OnceLock<Result<SignalRegistry, CheckError>> = OnceLock::new();

/// Emitted type names per event, per emitter type. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SignalRegistry {
    emitters: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl SignalRegistry {
    /// The registry compiled into the binary, parsed on first use.
    pub fn bundled() -> Result<&'static SignalRegistry, CheckError> {
        BUNDLED.get_or_init(|| parse_bundled(BUNDLED_SIGNALS)).as_ref().map_err(Clone::clone)
    }

    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CheckError::io(format!("could not read registry: {e}"), path.to_path_buf()))?;
        let registry = Self::from_toml_str(&text, Some(path))?;
        tracing::debug!(path = %path.display(), emitters = registry.emitters.len(), "registry loaded");
        Ok(registry)
    }

    /// Parse a two-level table of string lists. Anything else is a format error.
    pub fn from_toml_str(text: &str, path: Option<&Path>) -> Result<Self, CheckError> {
        let err = |msg: String| CheckError::registry(msg, path.map(Path::to_path_buf));
        let table: toml::Table = toml::from_str(text).map_err(|e| err(format!("invalid TOML: {e}")))?;

        let mut emitters = BTreeMap::new();
        for (emitter, events) in table {
            let toml::Value::Table(events) = events else {
                return Err(err(format!("`{emitter}` must be a table of events, found {}", events.type_str())));
            };
            let mut signals = BTreeMap::new();
            for (event, types) in events {
                let toml::Value::Array(types) = types else {
                    return Err(err(format!(
                        "`{emitter}.{event}` must be an array of type names, found {}",
                        types.type_str()
                    )));
                };
                let names = types
                    .into_iter()
                    .map(|t| match t {
                        toml::Value::String(name) => Ok(name),
                        other => Err(err(format!(
                            "`{emitter}.{event}` must contain only strings, found {}",
                            other.type_str()
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                signals.insert(event, names);
            }
            emitters.insert(emitter, signals);
        }
        Ok(Self { emitters })
    }

    /// Candidate tables for an emitter type: its short name first, then its fullname.
    fn tables<'a, 'k>(&'a self, fullname: &'k str) -> impl Iterator<Item = &'a BTreeMap<String, Vec<String>>> + use<'a, 'k> {
        [short_name(fullname), fullname].into_iter().filter_map(move |key| self.emitters.get(key))
    }

    pub fn emitter(&self, fullname: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.tables(fullname).next()
    }

    /// An event is looked up in every candidate table, so a fullname entry still
    /// answers for events its short-name twin does not list.
    pub fn signal(&self, emitter: &str, event: &str) -> Option<&[String]> {
        self.tables(emitter).find_map(|events| events.get(event)).map(Vec::as_slice)
    }

    pub fn emitter_names(&self) -> impl Iterator<Item = &str> {
        self.emitters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Render as TOML, optionally restricted to one emitter type.
    pub fn to_toml(&self, only: Option<&str>) -> Result<String, CheckError> {
        let selected = match only {
            Some(name) => {
                let events = self
                    .emitter(name)
                    .ok_or_else(|| CheckError::registry(format!("no emitter type named `{name}`"), None))?;
                let mut one = BTreeMap::new();
                one.insert(short_name(name).to_string(), events.clone());
                SignalRegistry { emitters: one }
            }
            None => self.clone(),
        };
        toml::to_string(&selected).map_err(|e| CheckError::registry(format!("could not render registry: {e}"), None))
    }
}

/// The registry named by `path`, or the bundled one.
pub fn load_or_bundled(path: Option<&PathBuf>) -> Result<Cow<'static, SignalRegistry>, CheckError> {
    match path {
        Some(path) => SignalRegistry::load(path).map(Cow::Owned),
        None => SignalRegistry::bundled().map(Cow::Borrowed),
    }
}

fn parse_bundled(text: &str) -> Result<SignalRegistry, CheckError> {
    SignalRegistry::from_toml_str(text, None).map_err(|err| match err {
        CheckError::Registry { msg, path } => CheckError::registry(format!("bundled registry: {msg}"), path),
        other => other,
    })
}
