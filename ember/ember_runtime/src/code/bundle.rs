//! In-memory resource bundle.
//!
//! A packaged deployment ships its preloaded module images inside the
//! runtime instead of on the code path. The bundle maps slash-separated
//! paths to images.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ember_core::error::{ModuleError, Result};
use ember_core::traits::ResourceBundle;
use ember_core::types::ModuleImage;
use tracing::{debug, info};

use crate::system::loader::IMAGE_EXTENSION;

/// Path-addressed module images
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle {
    entries: BTreeMap<String, ModuleImage>,
}

impl MemoryBundle {
    /// An empty bundle, available under no directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the image at `path`.
    pub fn insert(&mut self, path: impl Into<String>, image: ModuleImage) {
        self.entries.insert(path.into(), image);
    }

    /// Package every `.beam` file directly inside `dir` under `prefix`.
    ///
    /// `dir/erlang.beam` becomes `<prefix>/erlang.beam`. Subdirectories
    /// and other files are ignored.
    pub fn from_directory(dir: &Path, prefix: &str) -> Result<Self> {
        let io_error = |source| ModuleError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let prefix = prefix.trim_end_matches('/');
        let mut bundle = Self::new();

        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_image = path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == IMAGE_EXTENSION)
                    .unwrap_or(false);
            if !is_image {
                continue;
            }

            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                debug!("Skipping non-UTF-8 file name {}", path.display());
                continue;
            };

            let bytes = fs::read(&path).map_err(|source| ModuleError::Io {
                path: path.clone(),
                source,
            })?;
            bundle.insert(format!("{}/{}", prefix, file_name), ModuleImage::new(bytes));
        }

        info!(
            "Packaged {} images from {} under {}",
            bundle.len(),
            dir.display(),
            prefix
        );

        Ok(bundle)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entry paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl ResourceBundle for MemoryBundle {
    fn is_available(&self, base: &str) -> bool {
        let prefix = format!("{}/", base.trim_end_matches('/'));
        self.entries
            .range(prefix.clone()..)
            .next()
            .map(|(path, _)| path.starts_with(&prefix))
            .unwrap_or(false)
    }

    fn read(&self, path: &str) -> Result<Option<ModuleImage>> {
        Ok(self.entries.get(path).cloned())
    }
}
