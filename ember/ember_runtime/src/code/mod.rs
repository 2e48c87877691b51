//! Code space: module images, installed modules and native entry points.

pub mod bundle;
pub mod image;
pub mod launcher;
pub mod space;

pub use bundle::MemoryBundle;
pub use launcher::NativeEntryFactory;
pub use space::{CodeSpace, LoadedModule, ModuleOrigin, NativeFn};
