//! Compiled-in backend table and one-time backend selection

use std::collections::BTreeSet;
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::info;

use crate::backend::{event_channel, Backend, BackendEvent};
use crate::config::OutputConfig;
use crate::error::{OutputError, Result};
use crate::null::NullBackend;

/// Creates a fresh backend instance
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

/// A named backend the registry can create
#[derive(Clone)]
pub struct BackendEntry {
    pub name: &'static str,
    pub description: &'static str,
    factory: BackendFactory,
}

impl BackendEntry {
    pub fn new<F>(name: &'static str, description: &'static str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        Self {
            name,
            description,
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for BackendEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// MIME types the selected backend can render, queried once at selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    mime_types: BTreeSet<String>,
}

impl Capabilities {
    pub fn new(mime_types: BTreeSet<String>) -> Self {
        Self { mime_types }
    }

    pub fn mime_types(&self) -> &BTreeSet<String> {
        &self.mime_types
    }

    pub fn supports(&self, mime: &str) -> bool {
        self.mime_types.contains(mime)
    }
}

/// The backend chosen at startup, initialized and ready to hand to the engine
pub struct SelectedBackend {
    pub name: &'static str,
    pub description: &'static str,
    pub backend: Box<dyn Backend>,
    pub capabilities: Capabilities,
    pub events: Receiver<BackendEvent>,
}

impl fmt::Debug for SelectedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedBackend")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Fixed table of named backends
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
}

impl BackendRegistry {
    /// Backends compiled into this build; the first one is the default
    pub fn builtin() -> Self {
        Self::from_entries(vec![BackendEntry::new(
            "null",
            "Null output, discards media",
            || Box::new(NullBackend::new()),
        )])
    }

    pub fn from_entries(entries: Vec<BackendEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BackendEntry] {
        &self.entries
    }

    /// One `name - description` line per entry, the default one marked
    pub fn describe(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                if index == 0 {
                    format!("{} - {} (default)", entry.name, entry.description)
                } else {
                    format!("{} - {}", entry.name, entry.description)
                }
            })
            .collect()
    }

    /// Create and initialize the named backend, or the default one
    ///
    /// The backend's MIME types are queried exactly once here. The
    /// registry is consumed; selection happens once per process.
    pub fn select(self, name: Option<&str>, config: &OutputConfig) -> Result<SelectedBackend> {
        config.validate()?;

        let entry = match name {
            Some(name) => self
                .entries
                .into_iter()
                .find(|entry| entry.name == name)
                .ok_or_else(|| OutputError::UnknownBackend(name.to_string()))?,
            None => self
                .entries
                .into_iter()
                .next()
                .ok_or(OutputError::NoBackends)?,
        };

        let mut backend = (entry.factory)();
        let (sender, events) = event_channel();
        backend.initialize(config, sender)?;

        let capabilities = Capabilities::new(backend.supported_mime_types());
        info!(
            "Using output '{}' ({} MIME types)",
            entry.name,
            capabilities.mime_types().len()
        );

        Ok(SelectedBackend {
            name: entry.name,
            description: entry.description,
            backend,
            capabilities,
            events,
        })
    }
}
