//! Rana Store - Local schematisation store and settings adapters
//!
//! This crate provides the filesystem-backed registry of downloaded
//! schematisation revisions and the key-value settings stores.

pub mod local;
pub mod memory;
pub mod paths;
pub mod settings;

pub use local::{
    list_local_schematisations, replace_revision_data, LocalRevision, LocalSchematisation,
    RevisionKind,
};
pub use memory::MemorySettingsStore;
pub use settings::FileSettingsStore;
