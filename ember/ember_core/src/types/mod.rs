//! Data types shared between the sequencer and its collaborators.

pub mod args;
pub mod module;
pub mod process;

pub use args::{ArgList, Environment};
pub use module::{ModuleDescriptor, ModuleImage};
pub use process::{
    EntryPoint, ExitReason, Process, ProcessArgs, ProcessBody, ProcessContext, ProcessHandle,
    ROOT_ENTRY,
};
