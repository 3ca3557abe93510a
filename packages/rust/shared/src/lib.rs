//! Shared types, error model, and configuration for ProspectCue.
//!
//! This crate is the foundation depended on by all other ProspectCue crates.
//! It provides:
//! - [`ProspectCueError`] — the unified error type
//! - Domain types ([`PageKind`], [`ConsoleColor`], [`AugmentationState`])
//! - Configuration ([`AppConfig`], [`WatcherConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LogFormat, LoggingConfig, SETTLE_DELAY, WatcherConfig, WatcherSection, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ProspectCueError, Result};
pub use types::{AddressDivs, AugmentationSnapshot, AugmentationState, ConsoleColor, PageKind};
