use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token for the service.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Page size used when loading the document list.
    #[serde(default = "default_page_limit")]
    pub page_limit: i64,
}

fn default_token_env() -> String {
    "DOCVAULT_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_page_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default = "default_rag_top_k")]
    pub rag_top_k: i64,
    /// Character budget for excerpts of chunk content.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            rag_top_k: 3,
            preview_chars: 200,
        }
    }
}

fn default_top_k() -> i64 {
    5
}
fn default_rag_top_k() -> i64 {
    3
}
fn default_preview_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// File extensions accepted for upload and replacement, lowercased.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Upper bound on file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: i64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_types: default_allowed_types(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_allowed_types() -> Vec<String> {
    vec!["pdf".to_string(), "docx".to_string(), "doc".to_string()]
}
fn default_max_file_size() -> i64 {
    50_000_000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate server
    if config.server.base_url.is_empty() {
        anyhow::bail!("server.base_url must not be empty");
    }
    if !config.server.base_url.starts_with("http://") && !config.server.base_url.starts_with("https://")
    {
        anyhow::bail!("server.base_url must start with http:// or https://");
    }
    if config.server.timeout_secs == 0 {
        anyhow::bail!("server.timeout_secs must be > 0");
    }
    if config.server.page_limit < 1 {
        anyhow::bail!("server.page_limit must be >= 1");
    }

    // Validate search
    if config.search.top_k < 1 {
        anyhow::bail!("search.top_k must be >= 1");
    }
    if config.search.rag_top_k < 1 {
        anyhow::bail!("search.rag_top_k must be >= 1");
    }
    if config.search.preview_chars == 0 {
        anyhow::bail!("search.preview_chars must be > 0");
    }

    // Validate upload
    if config.upload.allowed_types.is_empty() {
        anyhow::bail!("upload.allowed_types must not be empty");
    }
    if config.upload.max_file_size < 1 {
        anyhow::bail!("upload.max_file_size must be >= 1");
    }

    Ok(config)
}
