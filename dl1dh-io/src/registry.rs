//! Registry of event source implementations.
//!
//! Sources are looked up by name or, for sources that implement content
//! sniffing, by asking each one whether it can read a file.

use crate::config::SourceConfig;
use crate::{Error, Result};
use dl1dh_core::ArrayEvent;
use std::path::Path;

/// Boxed stream of events produced by a registered source.
pub type EventStream = Box<dyn Iterator<Item = Result<ArrayEvent>>>;

/// Name under which [`Dl1EventSource`](crate::Dl1EventSource) is registered.
pub const DL1DH_SOURCE: &str = "dl1dh";

/// One registered event source.
#[derive(Clone, Copy)]
pub struct SourceEntry {
    /// Name used to request the source explicitly.
    pub name: &'static str,
    /// Content sniffing used by [`SourceRegistry::open_auto`].
    pub is_compatible: fn(&Path) -> bool,
    /// Opens a file with this source.
    pub open: fn(&Path, SourceConfig) -> Result<EventStream>,
}

impl std::fmt::Debug for SourceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of event sources.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the sources shipped with this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SourceEntry {
            name: DL1DH_SOURCE,
            is_compatible: dl1dh_is_compatible,
            open: open_dl1dh,
        });
        registry
    }

    /// Adds a source. A source with the same name is replaced.
    pub fn register(&mut self, entry: SourceEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == entry.name) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    /// Names of the registered sources in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// First source that claims `path`, if any.
    #[must_use]
    pub fn detect(&self, path: &Path) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| (e.is_compatible)(path))
    }

    /// Opens `path` with the source registered as `name`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownSource`] if no such source is registered, or
    /// the error of the source itself.
    pub fn open(&self, name: &str, path: &Path, config: SourceConfig) -> Result<EventStream> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::UnknownSource(name.to_string()))?;
        log::debug!("opening {} with source {}", path.display(), entry.name);
        (entry.open)(path, config)
    }

    /// Opens `path` with the first source that claims it.
    ///
    /// # Errors
    /// Returns [`Error::NoCompatibleSource`] if no source claims the file.
    pub fn open_auto(&self, path: &Path, config: SourceConfig) -> Result<EventStream> {
        let entry = self
            .detect(path)
            .ok_or_else(|| Error::NoCompatibleSource(path.display().to_string()))?;
        (entry.open)(path, config)
    }
}

#[cfg(feature = "hdf5")]
fn dl1dh_is_compatible(path: &Path) -> bool {
    crate::Dl1EventSource::is_compatible(path)
}

#[cfg(not(feature = "hdf5"))]
fn dl1dh_is_compatible(_path: &Path) -> bool {
    false
}

#[cfg(feature = "hdf5")]
fn open_dl1dh(path: &Path, config: SourceConfig) -> Result<EventStream> {
    let source = crate::Dl1EventSource::open_with(
        path,
        config,
        std::sync::Arc::new(dl1dh_core::BuiltinRegistry),
    )?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "hdf5"))]
fn open_dl1dh(_path: &Path, _config: SourceConfig) -> Result<EventStream> {
    crate::require_hdf5()?;
    Ok(Box::new(std::iter::empty()))
}
