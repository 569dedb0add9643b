//! Shared types, error model, and configuration for Linkloom.
//!
//! This crate is the foundation depended on by all other Linkloom crates.
//! It provides:
//! - [`LinkloomError`] — the unified error type
//! - Domain types ([`BookmarkRecord`], [`EnrichedBookmark`], [`EnrichmentFailure`])
//! - Configuration ([`AppConfig`], [`EnrichOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EnrichOptions, PathsConfig, SinkPaths, SourcesConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{LinkloomError, Result};
pub use types::{BookmarkRecord, EnrichedBookmark, EnrichmentFailure, FailureKind, record_id};
