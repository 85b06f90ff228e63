/*
[INPUT]:  Public API exports for the w3social-auth binary crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod cli;
pub mod config;
pub mod storage;

// Re-export main types for convenience
pub use config::{ServiceConfig, StorageConfig};
pub use storage::JsonFileStore;
