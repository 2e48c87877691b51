//! Module loading interfaces.

use crate::error::Result;
use crate::types::{ModuleDescriptor, ModuleImage};

/// Installs modules into the runtime's code space.
///
/// # Examples
///
/// ```
/// use ember_core::error::{ModuleError, Result};
/// use ember_core::traits::ModuleLoader;
/// use ember_core::types::ModuleDescriptor;
///
/// struct RejectAll;
///
/// impl ModuleLoader for RejectAll {
///     fn install(&self, descriptor: ModuleDescriptor) -> Result<()> {
///         Err(ModuleError::MalformedImage {
///             module: descriptor.name,
///             reason: "rejected".to_string(),
///         }
///         .into())
///     }
///
///     fn resolve_and_install(&self, name: &str) -> Result<()> {
///         Err(ModuleError::NotFound { module: name.to_string() }.into())
///     }
/// }
/// ```
pub trait ModuleLoader: Send + Sync {
    /// Install a module from an already-read image.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - Module name and image. Consumed by the call.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the module is now present in the code space.
    /// * `Err` with a malformed-image or type-resolution error otherwise.
    fn install(&self, descriptor: ModuleDescriptor) -> Result<()>;

    /// Locate a module by name on the filesystem and install it.
    ///
    /// Path resolution and failure detection belong to the implementation.
    fn resolve_and_install(&self, name: &str) -> Result<()>;
}

/// Read-only, path-addressed store of packaged module images.
pub trait ResourceBundle: Send + Sync {
    /// Whether any resource under `base` can be served from this bundle.
    ///
    /// This is the probe that decides the deployment layout: when the
    /// bootstrap directory is available here, every preloaded module is
    /// read from the bundle.
    fn is_available(&self, base: &str) -> bool;

    /// Read the image stored at `path`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(image))` if the resource exists.
    /// * `Ok(None)` if it does not.
    /// * `Err` if the bundle itself could not be read.
    fn read(&self, path: &str) -> Result<Option<ModuleImage>>;
}
