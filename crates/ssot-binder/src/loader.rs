use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::binder::SsotBinder;
use crate::envelope::RegistryEnvelope;
use crate::error::LoadError;

/// Registry location used when nothing else is configured.
pub const DEFAULT_REGISTRY_PATH: &str = "data/ssot_registry.json";

/// Read, validate, and seal the envelope at `path`.
///
/// Any failure is fatal to the load; no partially built binder is returned.
pub fn load_binder(path: impl AsRef<Path>) -> Result<SsotBinder, LoadError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let binder = SsotBinder::from_value(&value)?;
    info!(path = %path.display(), entries = binder.len(), "registry loaded");
    Ok(binder)
}

/// Write `envelope` to `path` as pretty-printed JSON.
///
/// Writes to a sibling temp file first and renames it into place.
pub fn save_envelope(path: impl AsRef<Path>, envelope: &RegistryEnvelope) -> Result<(), LoadError> {
    let path = path.as_ref();
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut body = serde_json::to_string_pretty(envelope).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    body.push('\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), entries = envelope.entries().len(), "registry written");
    Ok(())
}

/// Application-scoped handle to the current binder.
///
/// Loads lazily on first [`get`](Self::get). Every caller afterwards gets the
/// same `Arc` until [`replace`](Self::replace) or [`reload`](Self::reload)
/// swaps in a new snapshot. Holders of an old `Arc` keep their frozen view.
#[derive(Debug)]
pub struct BinderHandle {
    source: Option<PathBuf>,
    current: RwLock<Option<Arc<SsotBinder>>>,
}

impl BinderHandle {
    /// A handle that will load from `path` on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            current: RwLock::new(None),
        }
    }

    /// A handle over an already-built binder, with no backing file.
    pub fn from_binder(binder: SsotBinder) -> Self {
        Self {
            source: None,
            current: RwLock::new(Some(Arc::new(binder))),
        }
    }

    /// The backing registry path, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether a binder has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.current.read().expect("binder handle lock poisoned").is_some()
    }

    /// The current binder, loading it on first use.
    pub fn get(&self) -> Result<Arc<SsotBinder>, LoadError> {
        if let Some(binder) = self.current.read().expect("binder handle lock poisoned").as_ref() {
            return Ok(Arc::clone(binder));
        }

        let loaded = Arc::new(self.load_from_source()?);
        let mut slot = self.current.write().expect("binder handle lock poisoned");
        // Another caller may have finished loading first; keep theirs.
        Ok(Arc::clone(slot.get_or_insert(loaded)))
    }

    /// Swap in a new binder, returning the previous one.
    pub fn replace(&self, binder: SsotBinder) -> Option<Arc<SsotBinder>> {
        let mut slot = self.current.write().expect("binder handle lock poisoned");
        slot.replace(Arc::new(binder))
    }

    /// Re-read the backing file and swap in the result.
    pub fn reload(&self) -> Result<Arc<SsotBinder>, LoadError> {
        let loaded = Arc::new(self.load_from_source()?);
        let mut slot = self.current.write().expect("binder handle lock poisoned");
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    fn load_from_source(&self) -> Result<SsotBinder, LoadError> {
        let path = self.source.as_ref().ok_or(LoadError::NoSource)?;
        load_binder(path)
    }
}
