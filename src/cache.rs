//! The persisted compiled view cache.

use crate::{
    compile::DependencyGraph,
    log::{error_io, error_malformed_cache, Error},
    template::{CompiledView, Template},
};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use tracing::{debug, warn};

/// Everything needed to restore a compiler without touching the view roots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub raw_templates: Vec<Template>,
    pub compiled_views: Vec<CompiledView>,
    pub dependencies: DependencyGraph,
}

impl Snapshot {
    /// Parse a [`Snapshot`] from JSON text.
    ///
    /// Text that is empty or only whitespace holds no snapshot, and returns
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind
    /// [`ErrorKind::MalformedCache`][`crate::ErrorKind::MalformedCache`] when
    /// the text is not a snapshot.
    pub fn parse(text: &str) -> Result<Option<Self>, Error> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let snapshot: Self = serde_json::from_str(text).map_err(error_malformed_cache)?;
        if snapshot.raw_templates.is_empty() {
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    /// Serialize the [`Snapshot`] to JSON text.
    pub fn to_json(&self) -> String {
        // A snapshot is plain strings and maps, which always serialize.
        serde_json::to_string(self).expect("snapshot must serialize")
    }

    /// Read a [`Snapshot`] from the file at `path`.
    ///
    /// A file that is missing, empty or malformed holds no snapshot. Only the
    /// malformed case is logged.
    pub fn read(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no view cache");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "view cache is unreadable");
                return None;
            }
        };

        match Self::parse(&text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "view cache rejected");
                None
            }
        }
    }

    /// Write the [`Snapshot`] to the file at `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| error_io(parent, e))?;
        }

        fs::write(path, self.to_json()).map_err(|e| error_io(path, e))
    }
}
