use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lexigraph: LexigraphConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Top-level paths and logging
#[derive(Debug, Clone, Deserialize)]
pub struct LexigraphConfig {
    /// Directory for the on-disk extraction cache mirror
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Extraction and resolution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Entity-type vocabulary accepted from extractors
    #[serde(default = "default_entity_types")]
    pub entity_types: Vec<String>,
    /// Relation label -> regex pattern for the default pattern extractor
    #[serde(default = "default_relation_patterns")]
    pub relation_patterns: BTreeMap<String, String>,
    /// Bounded parallelism for per-sentence extraction fan-out
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Endpoint matching strategy: "exact", "case-insensitive", or "fuzzy"
    #[serde(default = "default_endpoint_matching")]
    pub endpoint_matching: String,
    /// Fail the whole batch on an unresolvable relation endpoint instead of
    /// dropping the candidate
    #[serde(default)]
    pub strict_endpoints: bool,
}

/// Extraction cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Maximum number of cached extraction results held in memory
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".lexigraph/cache")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_entity_types() -> Vec<String> {
    [
        "PERSON",
        "ORG",
        "GPE",
        "LOC",
        "PRODUCT",
        "EVENT",
        "WORK_OF_ART",
        "LAW",
        "LANGUAGE",
        "DATE",
        "TIME",
        "MONEY",
        "QUANTITY",
        "PERCENT",
        "CARDINAL",
        "ORDINAL",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_relation_patterns() -> BTreeMap<String, String> {
    [
        ("works_for", r"(\w+) (?:work|works|worked) for (\w+)"),
        ("founded", r"(\w+) (?:found|founds|founded) (\w+)"),
        ("created", r"(\w+) (?:create|creates|created) (\w+)"),
        (
            "located_in",
            r"(\w+) (?:is|are|was|were) (?:located|based) in (\w+)",
        ),
        ("has_role", r"(\w+) (?:is|are|was|were) (\w+)'s (\w+)"),
        ("born_in", r"(\w+) (?:was|were) born in (\w+)"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_num_workers() -> usize {
    4
}

fn default_endpoint_matching() -> String {
    "fuzzy".to_string()
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_size() -> usize {
    100
}

impl Default for LexigraphConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            entity_types: default_entity_types(),
            relation_patterns: default_relation_patterns(),
            num_workers: default_num_workers(),
            endpoint_matching: default_endpoint_matching(),
            strict_endpoints: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_size: default_cache_max_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lexigraph: LexigraphConfig::default(),
            extraction: ExtractionConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in LEXIGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// A missing config.toml is not an error: every field has a default.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let explicit = std::env::var("LEXIGRAPH_CONFIG").ok().map(PathBuf::from);
        let config_path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        let config: Config = if config_path.exists() {
            let config_str = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&config_str).context("Failed to parse config.toml")?
        } else if explicit.is_some() {
            // An explicitly requested config file must exist
            anyhow::bail!("Config file not found: {}", config_path.display());
        } else {
            log::info!("No config.toml found, using defaults");
            Config::default()
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.extraction.num_workers == 0 {
            anyhow::bail!("extraction.num_workers must be greater than 0");
        }

        if self.cache.enabled && self.cache.max_size == 0 {
            anyhow::bail!("cache.max_size must be greater than 0 when the cache is enabled");
        }

        match self.extraction.endpoint_matching.as_str() {
            "exact" | "case-insensitive" | "fuzzy" => {}
            other => anyhow::bail!(
                "extraction.endpoint_matching must be one of exact, case-insensitive, fuzzy (got '{}')",
                other
            ),
        }

        if self.extraction.entity_types.is_empty() {
            anyhow::bail!("extraction.entity_types must not be empty");
        }

        Ok(())
    }

    /// Get the on-disk cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.lexigraph.cache_dir
    }
}
