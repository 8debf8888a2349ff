//! Shared types, error model, and configuration for CourseAdvisor.
//!
//! This crate is the foundation depended on by all other CourseAdvisor
//! crates. It provides:
//! - [`AdvisorError`] — the unified error type
//! - Domain types ([`Catalog`], [`CourseRecord`], [`FragmentMeta`], [`CourseRow`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExpansionRule, FetchConfig, OpenAiConfig, PathsConfig, RetrievalConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{AdvisorError, Result};
pub use types::{Catalog, ChatMessage, CourseRecord, CourseRow, FragmentMeta, Role};
