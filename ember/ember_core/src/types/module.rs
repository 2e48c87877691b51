//! Module images and descriptors.

use std::fmt;

/// Binary image of a compiled module.
#[derive(Clone, PartialEq, Eq)]
pub struct ModuleImage(Vec<u8>);

impl ModuleImage {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes of the image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size of the image in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the image is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ModuleImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleImage({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for ModuleImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A module name together with its image.
///
/// Descriptors are moved into the module loader, so each one is consumed
/// exactly once.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Unique module name, e.g. `erl_prim_loader`
    pub name: String,

    /// The module's binary image
    pub image: ModuleImage,
}

impl ModuleDescriptor {
    /// Create a new descriptor.
    pub fn new(name: impl Into<String>, image: ModuleImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }
}
