//! Application configuration for CourseAdvisor.
//!
//! User config lives at `~/.courseadvisor/courseadvisor.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "courseadvisor.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".courseadvisor";

// ---------------------------------------------------------------------------
// Config structs (matching courseadvisor.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI-compatible model provider settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Retrieval and ranking settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Page fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// On-disk artifact locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat-completion model.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

/// One query-expansion rule: when the trigger phrase appears in the raw
/// query, the extra terms are appended to the text used for embedding only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionRule {
    /// Trigger phrase matched case-insensitively against the raw query.
    pub trigger: String,
    /// Terms appended to the embedding text.
    pub append: String,
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of fragments to retrieve per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum courses shown in summaries and the structured table.
    #[serde(default = "default_max_display")]
    pub max_display_courses: usize,

    /// Exchanges (query + reply pairs) kept in the conversation history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Title substrings that demote a course in display ordering
    /// (diplomas are listed before modular/certificate variants).
    #[serde(default = "default_deprioritize_terms")]
    pub deprioritize_title_terms: Vec<String>,

    /// Rule-based query expansions applied before embedding.
    #[serde(default = "default_expansions")]
    pub expansions: Vec<ExpansionRule>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_display_courses: default_max_display(),
            history_limit: default_history_limit(),
            deprioritize_title_terms: default_deprioritize_terms(),
            expansions: default_expansions(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_display() -> usize {
    3
}
fn default_history_limit() -> usize {
    5
}
fn default_deprioritize_terms() -> Vec<String> {
    vec!["modular".into(), "certificate".into()]
}
fn default_expansions() -> Vec<ExpansionRule> {
    vec![ExpansionRule {
        trigger: "project managers".into(),
        append: "construction management BIM management".into(),
    }]
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}

/// `[paths]` section — locations of the catalog and index artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Data directory holding the catalog and index artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Catalog file name within `data_dir`.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,

    /// Vector index file name within `data_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Fragment metadata file name within `data_dir`.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Interaction-log database file name within `data_dir`.
    #[serde(default = "default_log_db")]
    pub log_db: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_file: default_catalog_file(),
            index_file: default_index_file(),
            metadata_file: default_metadata_file(),
            log_db: default_log_db(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_catalog_file() -> String {
    "courses.json".into()
}
fn default_index_file() -> String {
    "fragments.vec".into()
}
fn default_metadata_file() -> String {
    "fragments.meta.json".into()
}
fn default_log_db() -> String {
    "interactions.db".into()
}

impl PathsConfig {
    pub fn catalog_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.catalog_file)
    }

    pub fn index_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.index_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.metadata_file)
    }

    pub fn log_db_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.log_db)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.courseadvisor/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AdvisorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.courseadvisor/courseadvisor.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AdvisorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AdvisorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AdvisorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AdvisorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AdvisorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the model-provider API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(AdvisorError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}
