//! Code Space
//!
//! Holds installed modules and the native functions processes can start in.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ember_core::error::{ModuleError, Result};
use ember_core::traits::ModuleLoader;
use ember_core::types::{EntryPoint, ExitReason, ModuleDescriptor, ModuleImage, ProcessArgs, ProcessContext};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::image;
use crate::system::loader::IMAGE_EXTENSION;

/// A function a process can run as its body.
pub type NativeFn = Arc<dyn Fn(&ProcessContext, ProcessArgs) -> ExitReason + Send + Sync>;

/// Where an installed module came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Handed over as an image, typically from the resource bundle
    Image,

    /// Read from this file on the code path
    File(PathBuf),
}

/// A module installed in the code space
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Module name
    pub name: String,

    /// Where it came from
    pub origin: ModuleOrigin,

    /// The validated image
    pub image: ModuleImage,
}

/// Installed modules plus the native function table
pub struct CodeSpace {
    code_path: Vec<PathBuf>,
    modules: RwLock<HashMap<String, LoadedModule>>,
    natives: RwLock<HashMap<EntryPoint, NativeFn>>,
}

impl CodeSpace {
    /// Create an empty code space that resolves modules along `code_path`
    pub fn new(code_path: Vec<PathBuf>) -> Self {
        Self {
            code_path,
            modules: RwLock::new(HashMap::new()),
            natives: RwLock::new(HashMap::new()),
        }
    }

    /// Directories searched by [`ModuleLoader::resolve_and_install`]
    pub fn code_path(&self) -> &[PathBuf] {
        &self.code_path
    }

    /// Check if a module is installed
    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// Get an installed module
    pub fn module(&self, name: &str) -> Option<LoadedModule> {
        self.modules.read().get(name).cloned()
    }

    /// Names of installed modules, sorted
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Make `function` callable as `entry`. Replaces any earlier registration.
    pub fn register_native<F>(&self, entry: EntryPoint, function: F)
    where
        F: Fn(&ProcessContext, ProcessArgs) -> ExitReason + Send + Sync + 'static,
    {
        debug!("Registered native {}", entry);
        self.natives.write().insert(entry, Arc::new(function));
    }

    /// Find the native function for `entry`
    pub fn native(&self, entry: &EntryPoint) -> Option<NativeFn> {
        self.natives.read().get(entry).cloned()
    }

    /// First `<name>.beam` on the code path
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let file_name = format!("{}.{}", name, IMAGE_EXTENSION);
        self.code_path
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    fn validate(name: &str, image: &ModuleImage) -> Result<()> {
        let chunks = image::parse_chunks(image.as_bytes()).map_err(|reason| {
            ModuleError::MalformedImage {
                module: name.to_string(),
                reason,
            }
        })?;

        if let Some(declared) = image::declared_name(&chunks) {
            if declared != name {
                return Err(ModuleError::TypeResolution {
                    module: name.to_string(),
                    reason: format!("image declares module {}", declared),
                }
                .into());
            }
        }

        Ok(())
    }

    fn insert(&self, name: String, image: ModuleImage, origin: ModuleOrigin) {
        let size = image.len();
        let replaced = self
            .modules
            .write()
            .insert(name.clone(), LoadedModule {
                name: name.clone(),
                origin,
                image,
            })
            .is_some();

        if replaced {
            info!("Replaced module {} ({} bytes)", name, size);
        } else {
            debug!("Installed module {} ({} bytes)", name, size);
        }
    }

    fn read_image(path: &Path) -> Result<ModuleImage> {
        fs::read(path).map(ModuleImage::new).map_err(|source| {
            ModuleError::Io {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }
}

impl ModuleLoader for CodeSpace {
    fn install(&self, descriptor: ModuleDescriptor) -> Result<()> {
        Self::validate(&descriptor.name, &descriptor.image)?;
        self.insert(descriptor.name, descriptor.image, ModuleOrigin::Image);
        Ok(())
    }

    fn resolve_and_install(&self, name: &str) -> Result<()> {
        let path = self.locate(name).ok_or_else(|| ModuleError::NotFound {
            module: name.to_string(),
        })?;

        let image = Self::read_image(&path)?;
        Self::validate(name, &image)?;
        self.insert(name.to_string(), image, ModuleOrigin::File(path));
        Ok(())
    }
}

impl fmt::Debug for CodeSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeSpace")
            .field("code_path", &self.code_path)
            .field("modules", &self.loaded_modules())
            .field("natives", &self.natives.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::error::{Error, ErrorKind};
    use tempfile::tempdir;

    fn descriptor(name: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(name, ModuleImage::new(image::minimal_image(name).unwrap()))
    }

    #[test]
    fn test_install_and_replace() {
        let space = CodeSpace::new(Vec::new());

        space.install(descriptor("erlang")).unwrap();
        assert!(space.is_loaded("erlang"));

        let bigger = image::assemble(&[(*b"AtU8", &b"\0\0\0\x01\x06erlang"[..]), (*b"Code", &[1u8; 64][..])]);
        space
            .install(ModuleDescriptor::new("erlang", ModuleImage::new(bigger.clone())))
            .unwrap();

        assert_eq!(space.loaded_modules(), vec!["erlang"]);
        assert_eq!(space.module("erlang").unwrap().image.as_bytes(), &bigger[..]);
    }

    #[test]
    fn test_install_rejects_malformed() {
        let space = CodeSpace::new(Vec::new());
        let err = space
            .install(ModuleDescriptor::new("init", ModuleImage::new(b"not a module".to_vec())))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedImage);
        assert!(!space.is_loaded("init"));
    }

    #[test]
    fn test_install_rejects_name_mismatch() {
        let space = CodeSpace::new(Vec::new());
        let err = space
            .install(ModuleDescriptor::new("init", ModuleImage::new(image::minimal_image("zlib").unwrap())))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeResolution);
        assert!(err.to_string().contains("image declares module zlib"));
    }

    #[test]
    fn test_resolve_searches_code_path_in_order() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(second.path().join("prim_zip.beam"), image::minimal_image("prim_zip").unwrap()).unwrap();
        fs::write(first.path().join("zlib.beam"), image::minimal_image("zlib").unwrap()).unwrap();
        fs::write(second.path().join("zlib.beam"), image::minimal_image("zlib").unwrap()).unwrap();

        let space = CodeSpace::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        space.resolve_and_install("prim_zip").unwrap();
        space.resolve_and_install("zlib").unwrap();

        assert_eq!(
            space.module("prim_zip").unwrap().origin,
            ModuleOrigin::File(second.path().join("prim_zip.beam"))
        );
        assert_eq!(
            space.module("zlib").unwrap().origin,
            ModuleOrigin::File(first.path().join("zlib.beam"))
        );
    }

    #[test]
    fn test_resolve_missing_module() {
        let dir = tempdir().unwrap();
        let space = CodeSpace::new(vec![dir.path().to_path_buf()]);

        let err = space.resolve_and_install("prim_inet").unwrap_err();
        assert!(matches!(err, Error::Module(ModuleError::NotFound { ref module }) if module == "prim_inet"));
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    }

    #[test]
    fn test_natives() {
        let space = CodeSpace::new(Vec::new());
        let entry = EntryPoint::new("otp_ring0", "start", 2);
        assert!(space.native(&entry).is_none());

        space.register_native(entry.clone(), |_, _| ExitReason::Normal);
        assert!(space.native(&entry).is_some());
        assert!(space.native(&EntryPoint::new("otp_ring0", "start", 1)).is_none());
    }
}
