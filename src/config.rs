//! TOML configuration parsing.
//!
//! Every section has defaults, so an empty file (or [`Config::minimal`]) is
//! a working configuration for the usual layout: `./data.json` next to an
//! `./images` directory.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    #[serde(default = "default_images_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_front_suffix")]
    pub front_suffix: String,
    #[serde(default = "default_back_suffix")]
    pub back_suffix: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: default_images_dir(),
            front_suffix: default_front_suffix(),
            back_suffix: default_back_suffix(),
        }
    }
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}
fn default_front_suffix() -> String {
    "_front.webp".to_string()
}
fn default_back_suffix() -> String {
    "_back.webp".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout; `0` keeps the HTTP client's default.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    0
}

impl ExtractorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory served at `/`.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_no_cache")]
    pub no_cache: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            root: default_root(),
            no_cache: default_no_cache(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_no_cache() -> bool {
    true
}

impl Config {
    /// Configuration used when no config file exists at the default path.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let images = &config.images;
    if images.front_suffix.is_empty() || images.back_suffix.is_empty() {
        bail!("images.front_suffix and images.back_suffix must not be empty");
    }
    if images.front_suffix == images.back_suffix {
        bail!("images.front_suffix and images.back_suffix must differ");
    }
    if extension(&images.front_suffix) != extension(&images.back_suffix) {
        bail!(
            "images.front_suffix ('{}') and images.back_suffix ('{}') must share a file extension",
            images.front_suffix,
            images.back_suffix
        );
    }

    match config.extractor.provider.as_str() {
        "gemini" | "disabled" => {}
        other => bail!(
            "Unknown extractor provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }
    if config.extractor.is_enabled() && config.extractor.model.trim().is_empty() {
        bail!("extractor.model must be specified when provider is 'gemini'");
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    Ok(())
}

fn extension(suffix: &str) -> Option<&str> {
    suffix.rsplit_once('.').map(|(_, ext)| ext)
}
