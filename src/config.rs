use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::core::categorical::{default_availability_ranks, default_deadline_ranks, CategoricalRules};
use crate::core::error::EngineError;
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub categories: CategorySettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSettings {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Lexical,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_backend")]
    pub backend: EmbeddingBackend,
    pub endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_lexical_dimensions")]
    pub lexical_dimensions: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            model: default_model(),
            api_key: None,
            request_timeout_secs: None,
            lexical_dimensions: default_lexical_dimensions(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_backend() -> EmbeddingBackend { EmbeddingBackend::Lexical }
fn default_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_lexical_dimensions() -> usize { 512 }
fn default_cache_capacity() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Pairs scored concurrently during a build
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-call bound on the similarity provider; 0 disables it
    #[serde(default = "default_similarity_timeout_ms")]
    pub similarity_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            similarity_timeout_ms: default_similarity_timeout_ms(),
        }
    }
}

fn default_concurrency() -> usize { 8 }
fn default_similarity_timeout_ms() -> u64 { 5_000 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
    #[serde(default = "default_industry_weight")]
    pub industry: f64,
    #[serde(default = "default_timeline_weight")]
    pub timeline: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            semantic: default_semantic_weight(),
            industry: default_industry_weight(),
            timeline: default_timeline_weight(),
        }
    }
}

fn default_semantic_weight() -> f64 { 0.50 }
fn default_industry_weight() -> f64 { 0.30 }
fn default_timeline_weight() -> f64 { 0.20 }

impl WeightsConfig {
    /// Validated weights; rejects triples that do not sum to 1.0
    pub fn to_weights(&self) -> Result<ScoringWeights, EngineError> {
        ScoringWeights::new(self.semantic, self.industry, self.timeline)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySettings {
    #[serde(default = "default_industry_wildcard")]
    pub industry_wildcard: String,
    #[serde(default = "default_exact_industry_score")]
    pub exact_industry_score: u8,
    #[serde(default = "default_wildcard_industry_score")]
    pub wildcard_industry_score: u8,
    #[serde(default = "default_deadline_entries")]
    pub deadline_ranks: Vec<RankEntry>,
    #[serde(default = "default_availability_entries")]
    pub availability_ranks: Vec<RankEntry>,
}

/// One label of an ordered category and its urgency rank
///
/// Kept as a list rather than a table so labels are never re-cased as keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankEntry {
    pub label: String,
    pub rank: u8,
}

impl Default for CategorySettings {
    fn default() -> Self {
        Self {
            industry_wildcard: default_industry_wildcard(),
            exact_industry_score: default_exact_industry_score(),
            wildcard_industry_score: default_wildcard_industry_score(),
            deadline_ranks: default_deadline_entries(),
            availability_ranks: default_availability_entries(),
        }
    }
}

fn to_entries(ranks: HashMap<String, u8>) -> Vec<RankEntry> {
    let mut entries: Vec<RankEntry> = ranks
        .into_iter()
        .map(|(label, rank)| RankEntry { label, rank })
        .collect();
    entries.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.label.cmp(&b.label)));
    entries
}

fn to_ranks(entries: &[RankEntry]) -> HashMap<String, u8> {
    entries.iter().map(|e| (e.label.clone(), e.rank)).collect()
}

fn default_deadline_entries() -> Vec<RankEntry> { to_entries(default_deadline_ranks()) }
fn default_availability_entries() -> Vec<RankEntry> { to_entries(default_availability_ranks()) }
fn default_industry_wildcard() -> String { "Any".to_string() }
fn default_exact_industry_score() -> u8 { 100 }
fn default_wildcard_industry_score() -> u8 { 70 }

impl CategorySettings {
    pub fn to_rules(&self) -> Result<CategoricalRules, EngineError> {
        if self.exact_industry_score > 100 || self.wildcard_industry_score > 100 {
            return Err(EngineError::InvalidConfig(
                "industry scores must be within 0-100".to_string(),
            ));
        }

        Ok(CategoricalRules {
            industry_wildcard: self.industry_wildcard.clone(),
            exact_industry_score: self.exact_industry_score,
            wildcard_industry_score: self.wildcard_industry_score,
            deadline_ranks: to_ranks(&self.deadline_ranks),
            availability_ranks: to_ranks(&self.availability_ranks),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
        }
    }
}

fn default_top_n() -> usize { 3 }
fn default_max_top_n() -> usize { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SKILLMATCH_)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SKILLMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SKILLMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SKILLMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    const MINIMAL: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8080

        [dataset]
        path = "data/users.csv"
    "#;

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.semantic, 0.50);
        assert_eq!(weights.industry, 0.30);
        assert_eq!(weights.timeline, 0.20);
        assert_eq!(weights.to_weights().unwrap(), ScoringWeights::default());
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_minimal_file_fills_defaults() {
        let settings = from_toml(MINIMAL).unwrap();

        assert_eq!(settings.embedding.backend, EmbeddingBackend::Lexical);
        assert_eq!(settings.engine.concurrency, 8);
        assert_eq!(settings.matching.default_top_n, 3);
        assert_eq!(settings.categories.to_rules().unwrap(), CategoricalRules::default());
    }

    #[test]
    fn test_bad_weights_rejected() {
        let toml = format!(
            "{}\n[scoring.weights]\nsemantic = 0.6\nindustry = 0.3\ntimeline = 0.2\n",
            MINIMAL
        );
        let settings = from_toml(&toml).unwrap();

        assert!(matches!(
            settings.scoring.weights.to_weights(),
            Err(EngineError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_category_overrides() {
        let toml = format!(
            "{}\n[categories]\nindustry_wildcard = \"*\"\navailability_ranks = [{{ label = \"Now\", rank = 3 }}]\n",
            MINIMAL
        );
        let rules = from_toml(&toml).unwrap().categories.to_rules().unwrap();

        assert_eq!(rules.industry_wildcard, "*");
        assert_eq!(rules.availability_rank("Now"), 3);
        assert_eq!(rules.availability_rank("Immediate"), 0);
        assert_eq!(rules.deadline_rank("Immediate"), 3);
    }
}
