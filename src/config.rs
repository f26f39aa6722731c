//! Configuration loading: TOML file plus environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tenant: TenantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_timeout")]
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_sim_threshold")]
    pub embedding_similarity_threshold: f32,
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors_per_token: usize,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: Option<uuid::Uuid>,
    pub user_id: Option<uuid::Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    #[serde(default = "default_w_model")]
    pub w_model: f64,
    #[serde(default = "default_w_text")]
    pub w_text: f64,
    #[serde(default = "default_w_rel")]
    pub w_rel: f64,
    #[serde(default = "default_w_repeat")]
    pub w_repeat: f64,
    #[serde(default = "default_w_novelty")]
    pub w_novelty: f64,
    #[serde(default = "default_w_energy")]
    pub w_energy: f64,
    #[serde(default = "default_base_temp")]
    pub base_temp: f64,
    #[serde(default = "default_min_temp")]
    pub min_temp: f64,
    #[serde(default = "default_energy_alpha")]
    pub energy_alpha: f64,
    #[serde(default = "default_energy_decay")]
    pub energy_decay: f64,
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_heuristic_weight")]
    pub heuristic_weight: f64,
    #[serde(default = "default_min_elo")]
    pub min_elo: f64,
    #[serde(default = "default_min_observations")]
    pub min_observations: u64,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_min_path_quality")]
    pub min_path_quality: f64,
    #[serde(default = "default_max_reflexion_rounds")]
    pub max_reflexion_rounds: usize,
    #[serde(default = "default_max_response_words")]
    pub max_response_words: usize,
    #[serde(default = "default_walk_max_steps")]
    pub walk_max_steps: usize,
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub include_reasoning_trace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_pool_size() -> u32 { 10 }
fn default_timeout() -> u64 { 30 }
fn default_sim_threshold() -> f32 { 0.50 }
fn default_max_neighbors() -> usize { 20 }
fn default_block_size() -> usize { 1024 }
fn default_w_model() -> f64 { 0.35 }
fn default_w_text() -> f64 { 0.25 }
fn default_w_rel() -> f64 { 0.15 }
fn default_w_repeat() -> f64 { 0.2 }
fn default_w_novelty() -> f64 { 0.1 }
fn default_w_energy() -> f64 { 0.1 }
fn default_base_temp() -> f64 { 1.0 }
fn default_min_temp() -> f64 { 0.2 }
fn default_energy_alpha() -> f64 { 0.5 }
fn default_energy_decay() -> f64 { 0.02 }
fn default_recent_window() -> usize { 8 }
fn default_top_k() -> usize { 32 }
fn default_heuristic_weight() -> f64 { 1.0 }
fn default_min_elo() -> f64 { 1000.0 }
fn default_min_observations() -> u64 { 1 }
fn default_max_expansions() -> usize { 10_000 }
fn default_beam_width() -> usize { 4 }
fn default_min_path_quality() -> f64 { 0.5 }
fn default_max_reflexion_rounds() -> usize { 3 }
fn default_max_response_words() -> usize { 120 }
fn default_walk_max_steps() -> usize { 64 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_true() -> bool { true }

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            embedding_similarity_threshold: default_sim_threshold(),
            max_neighbors_per_token: default_max_neighbors(),
            block_size: default_block_size(),
        }
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self { tenant_id: None, user_id: None }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            w_model: default_w_model(),
            w_text: default_w_text(),
            w_rel: default_w_rel(),
            w_repeat: default_w_repeat(),
            w_novelty: default_w_novelty(),
            w_energy: default_w_energy(),
            base_temp: default_base_temp(),
            min_temp: default_min_temp(),
            energy_alpha: default_energy_alpha(),
            energy_decay: default_energy_decay(),
            recent_window: default_recent_window(),
            top_k: default_top_k(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: default_heuristic_weight(),
            min_elo: default_min_elo(),
            min_observations: default_min_observations(),
            max_expansions: default_max_expansions(),
            beam_width: default_beam_width(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            min_path_quality: default_min_path_quality(),
            max_reflexion_rounds: default_max_reflexion_rounds(),
            max_response_words: default_max_response_words(),
            walk_max_steps: default_walk_max_steps(),
            beam_width: default_beam_width(),
            system_prompt: None,
            include_reasoning_trace: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).context("failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("failed to parse config file")?;
        Ok(config)
    }

    /// Load from file, then apply environment overrides. Env vars take
    /// precedence. Format: `SUBSTRATE_<SECTION>_<KEY>`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SUBSTRATE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(v) = std::env::var("SUBSTRATE_EXTRACTOR_SIM_THRESHOLD") {
            if let Ok(v) = v.parse() {
                self.extractor.embedding_similarity_threshold = v;
            }
        }
        if let Ok(v) = std::env::var("SUBSTRATE_SEARCH_MAX_EXPANSIONS") {
            if let Ok(v) = v.parse() {
                self.search.max_expansions = v;
            }
        }
        if let Ok(level) = std::env::var("SUBSTRATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    pub fn default_with_database(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                url: url.into(),
                pool_size: default_pool_size(),
                connection_timeout_seconds: default_timeout(),
            },
            extractor: ExtractorConfig::default(),
            walk: WalkConfig::default(),
            search: SearchConfig::default(),
            reasoning: ReasoningConfig::default(),
            logging: LoggingConfig::default(),
            tenant: TenantConfig::default(),
        }
    }

    /// Validate cross-field constraints that serde defaults can't express.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database URL is required");
        }
        if self.walk.min_temp > self.walk.base_temp {
            anyhow::bail!("walk.min_temp must not exceed walk.base_temp");
        }
        if self.walk.top_k == 0 {
            anyhow::bail!("walk.top_k must be >= 1");
        }
        if self.search.beam_width == 0 || self.reasoning.beam_width == 0 {
            anyhow::bail!("beam_width must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.extractor.embedding_similarity_threshold) {
            anyhow::bail!("extractor.embedding_similarity_threshold must be in [0, 1]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_with_database_validates() {
        let config = Config::default_with_database("postgresql://localhost/substrate");
        config.validate().unwrap();
    }

    #[test]
    fn env_override_replaces_database_url() {
        std::env::set_var("SUBSTRATE_DATABASE_URL", "postgresql://example/override");
        let mut config = Config::default_with_database("postgresql://localhost/substrate");
        config.apply_env_overrides();
        assert_eq!(config.database.url, "postgresql://example/override");
        std::env::remove_var("SUBSTRATE_DATABASE_URL");
    }

    #[test]
    fn validate_rejects_inverted_temperatures() {
        let mut config = Config::default_with_database("postgresql://localhost/substrate");
        config.walk.min_temp = 5.0;
        config.walk.base_temp = 1.0;
        assert!(config.validate().is_err());
    }
}
