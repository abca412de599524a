//! Configuration for the synergy orchestrator.
//!
//! Configuration is read from a TOML file, then overridden by `SYNAPSE_*`
//! environment variables, then validated. Every key has a default, so an
//! empty file is a valid configuration.
//!
//! # Example
//!
//! ```toml
//! max_parallel_layers = 6
//! synergy_strength_threshold = 0.4
//! working_memory_capacity = 150
//! cross_layer_association_strength = 0.7
//! cognitive_load_adaptation = true
//!
//! [routing]
//! default_layers = ["working", "semantic"]
//!
//! [routing.domains]
//! healthcare = ["working", "semantic", "episodic"]
//!
//! [routing.content_keywords]
//! diagnosis = ["semantic", "episodic"]
//! ```

use crate::error::{Result, SynapseError};
use crate::types::{MemoryType, SynergyType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_MAX_PARALLEL_LAYERS: &str = "SYNAPSE_MAX_PARALLEL_LAYERS";
pub const ENV_SYNERGY_STRENGTH_THRESHOLD: &str = "SYNAPSE_SYNERGY_STRENGTH_THRESHOLD";
pub const ENV_WORKING_MEMORY_CAPACITY: &str = "SYNAPSE_WORKING_MEMORY_CAPACITY";
pub const ENV_CROSS_LAYER_ASSOCIATION_STRENGTH: &str = "SYNAPSE_CROSS_LAYER_ASSOCIATION_STRENGTH";
pub const ENV_COGNITIVE_LOAD_ADAPTATION: &str = "SYNAPSE_COGNITIVE_LOAD_ADAPTATION";
pub const ENV_LAYER_TIMEOUT_MS: &str = "SYNAPSE_LAYER_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "SYNAPSE_LOG_LEVEL";

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynergyConfig {
    /// Size of the worker pool shared by all layer tasks
    pub max_parallel_layers: usize,
    /// Minimum edge strength for an edge to boost ranking
    pub synergy_strength_threshold: f64,
    /// Maximum resident items in working memory
    pub working_memory_capacity: usize,
    /// Weight applied to edge strength when creating associations
    pub cross_layer_association_strength: f64,
    /// Narrow searched layers under high cognitive load
    pub cognitive_load_adaptation: bool,
    /// Cognitive load at or above which adaptation narrows the search
    pub high_load_threshold: f64,
    /// Minimum layer activation for default search selection
    pub activation_floor: f64,
    /// Activation added to each layer touched by a write
    pub activation_increment: f64,
    /// Edge strength added per write activation
    pub write_reinforcement: f64,
    /// Reads apply write updates scaled by this ratio
    pub read_reinforcement_ratio: f64,
    /// Half-life of synergy edge strength in seconds
    pub edge_half_life_secs: u64,
    /// Per-layer operation timeout in milliseconds
    pub layer_timeout_ms: u64,
    /// Default result limit
    pub search_limit: usize,
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    pub routing: RoutingConfig,
    pub initial_strengths: InitialStrengths,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            max_parallel_layers: 4,
            synergy_strength_threshold: 0.4,
            working_memory_capacity: 150,
            cross_layer_association_strength: 0.7,
            cognitive_load_adaptation: true,
            high_load_threshold: 0.7,
            activation_floor: 0.05,
            activation_increment: 0.1,
            write_reinforcement: 0.05,
            read_reinforcement_ratio: 0.3,
            edge_half_life_secs: 24 * 60 * 60,
            layer_timeout_ms: 30_000,
            search_limit: 10,
            log_level: "info".to_string(),
            routing: RoutingConfig::default(),
            initial_strengths: InitialStrengths::default(),
        }
    }
}

/// Domain, attention-focus and content routing for writes without explicit layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Layers used when nothing in the context matches
    pub default_layers: Vec<MemoryType>,
    /// Always route inferred writes through working memory
    pub always_include_working: bool,
    /// Domain (lowercase) to layer set
    pub domains: BTreeMap<String, Vec<MemoryType>>,
    /// Attention-focus keyword (lowercase substring) to extra layers
    pub focus_keywords: BTreeMap<String, Vec<MemoryType>>,
    /// Whole word in the written content to extra layers
    pub content_keywords: BTreeMap<String, Vec<MemoryType>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        use MemoryType::*;

        let domains = [
            ("healthcare", vec![Working, Semantic, Episodic]),
            ("medicine", vec![Working, Semantic, Episodic]),
            ("education", vec![Working, Semantic, Procedural]),
            ("mathematics", vec![Working, Semantic, Procedural]),
            ("engineering", vec![Working, Procedural, Declarative]),
            ("customer_support", vec![Working, Episodic, Contextual]),
            ("research", vec![Working, Semantic, Associative]),
        ];
        let focus_keywords = [
            ("learning", vec![Procedural]),
            ("procedure", vec![Procedural]),
            ("problem solving", vec![Procedural]),
            ("history", vec![Episodic]),
            ("event", vec![Episodic]),
            ("definition", vec![Semantic, Declarative]),
            ("relationship", vec![Associative]),
            ("situation", vec![Contextual]),
        ];
        let content_keywords = [
            ("is", vec![Semantic]),
            ("are", vec![Semantic]),
            ("was", vec![Semantic]),
            ("were", vec![Semantic]),
            ("definition", vec![Semantic]),
            ("means", vec![Semantic]),
            ("yesterday", vec![Episodic]),
            ("today", vec![Episodic]),
            ("when", vec![Episodic]),
            ("where", vec![Episodic]),
            ("happened", vec![Episodic]),
            ("remember", vec![Episodic]),
            ("how", vec![Procedural]),
            ("step", vec![Procedural]),
            ("process", vec![Procedural]),
            ("procedure", vec![Procedural]),
            ("method", vec![Procedural]),
        ];

        Self {
            default_layers: vec![Working, Semantic],
            always_include_working: true,
            domains: domains
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            focus_keywords: focus_keywords
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            content_keywords: content_keywords
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Prior strength of each synergy edge before any activation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitialStrengths {
    pub working_semantic: f64,
    pub working_episodic: f64,
    pub working_procedural: f64,
    pub semantic_episodic: f64,
    pub semantic_procedural: f64,
    pub episodic_procedural: f64,
    pub multi_layer: f64,
}

impl Default for InitialStrengths {
    fn default() -> Self {
        Self {
            working_semantic: 0.9,
            working_episodic: 0.8,
            working_procedural: 0.7,
            semantic_episodic: 0.6,
            semantic_procedural: 0.5,
            episodic_procedural: 0.4,
            multi_layer: 0.3,
        }
    }
}

impl InitialStrengths {
    pub fn get(&self, synergy: SynergyType) -> f64 {
        match synergy {
            SynergyType::WorkingSemantic => self.working_semantic,
            SynergyType::WorkingEpisodic => self.working_episodic,
            SynergyType::WorkingProcedural => self.working_procedural,
            SynergyType::SemanticEpisodic => self.semantic_episodic,
            SynergyType::SemanticProcedural => self.semantic_procedural,
            SynergyType::EpisodicProcedural => self.episodic_procedural,
            SynergyType::MultiLayer => self.multi_layer,
        }
    }

    /// Same strength for every edge
    pub fn uniform(strength: f64) -> Self {
        Self {
            working_semantic: strength,
            working_episodic: strength,
            working_procedural: strength,
            semantic_episodic: strength,
            semantic_procedural: strength,
            episodic_procedural: strength,
            multi_layer: strength,
        }
    }
}

impl SynergyConfig {
    /// Per-layer timeout as a duration
    pub fn layer_timeout(&self) -> Duration {
        Duration::from_millis(self.layer_timeout_ms)
    }

    /// Exponential decay rate of edge strength per second
    pub fn edge_decay_rate(&self) -> f64 {
        std::f64::consts::LN_2 / self.edge_half_life_secs as f64
    }

    /// Parse configuration from TOML text without environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SynapseError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SynapseError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| SynapseError::Config(format!("Failed to parse config file: {}", e)))?;

        config.merge_env_vars()?;
        config.validate()?;

        info!("Configuration loaded successfully from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized or written
    pub async fn save_to_path(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| SynapseError::Config(format!("Failed to create config directory: {}", e)))?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SynapseError::Config(format!("Failed to serialize config: {}", e)))?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("toml.tmp");

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| SynapseError::Config(format!("Failed to write config file: {}", e)))?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| SynapseError::Config(format!("Failed to rename config file: {}", e)))?;

        info!("Configuration saved successfully to {}", path.display());
        Ok(())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(SynapseError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.max_parallel_layers == 0 {
            return Err(SynapseError::Config(
                "max_parallel_layers must be greater than 0".to_string(),
            ));
        }

        if self.working_memory_capacity == 0 {
            return Err(SynapseError::Config(
                "working_memory_capacity must be greater than 0".to_string(),
            ));
        }

        if self.search_limit == 0 {
            return Err(SynapseError::Config(
                "search_limit must be greater than 0".to_string(),
            ));
        }

        if self.layer_timeout_ms == 0 {
            return Err(SynapseError::Config(
                "layer_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.edge_half_life_secs == 0 {
            return Err(SynapseError::Config(
                "edge_half_life_secs must be greater than 0".to_string(),
            ));
        }

        let unit_values = [
            ("synergy_strength_threshold", self.synergy_strength_threshold),
            ("cross_layer_association_strength", self.cross_layer_association_strength),
            ("high_load_threshold", self.high_load_threshold),
            ("activation_floor", self.activation_floor),
            ("activation_increment", self.activation_increment),
            ("write_reinforcement", self.write_reinforcement),
            ("read_reinforcement_ratio", self.read_reinforcement_ratio),
        ];
        for (name, value) in unit_values {
            check_unit_interval(name, value)?;
        }

        for synergy in SynergyType::ALL {
            check_unit_interval(
                &format!("initial_strengths.{}", synergy),
                self.initial_strengths.get(synergy),
            )?;
        }

        if self.routing.default_layers.is_empty() {
            return Err(SynapseError::Config(
                "routing.default_layers must name at least one layer".to_string(),
            ));
        }

        debug!("Configuration validation passed");
        Ok(())
    }

    /// Merge environment variable overrides into the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    pub fn merge_env_vars(&mut self) -> Result<()> {
        debug!("Merging environment variable overrides");

        if let Some(value) = env_parse::<usize>(ENV_MAX_PARALLEL_LAYERS)? {
            debug!("Overriding max_parallel_layers from environment: {}", value);
            self.max_parallel_layers = value;
        }

        if let Some(value) = env_parse::<f64>(ENV_SYNERGY_STRENGTH_THRESHOLD)? {
            debug!("Overriding synergy_strength_threshold from environment: {}", value);
            self.synergy_strength_threshold = value;
        }

        if let Some(value) = env_parse::<usize>(ENV_WORKING_MEMORY_CAPACITY)? {
            debug!("Overriding working_memory_capacity from environment: {}", value);
            self.working_memory_capacity = value;
        }

        if let Some(value) = env_parse::<f64>(ENV_CROSS_LAYER_ASSOCIATION_STRENGTH)? {
            debug!("Overriding cross_layer_association_strength from environment: {}", value);
            self.cross_layer_association_strength = value;
        }

        if let Some(value) = env_parse::<bool>(ENV_COGNITIVE_LOAD_ADAPTATION)? {
            debug!("Overriding cognitive_load_adaptation from environment: {}", value);
            self.cognitive_load_adaptation = value;
        }

        if let Some(value) = env_parse::<u64>(ENV_LAYER_TIMEOUT_MS)? {
            debug!("Overriding layer_timeout_ms from environment: {}", value);
            self.layer_timeout_ms = value;
        }

        if let Ok(log_level) = std::env::var(ENV_LOG_LEVEL) {
            debug!("Overriding log_level from environment: {}", log_level);
            self.log_level = log_level;
        }

        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SynapseError::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SynapseError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = SynergyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.routing.default_layers, vec![MemoryType::Working, MemoryType::Semantic]);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = SynergyConfig::from_toml_str("").unwrap();
        assert_eq!(config, SynergyConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = SynergyConfig::from_toml_str(
            r#"
            max_parallel_layers = 6
            working_memory_capacity = 3

            [routing.domains]
            legal = ["declarative", "episodic"]

            [initial_strengths]
            multi_layer = 0.45
            "#,
        )
        .unwrap();

        assert_eq!(config.max_parallel_layers, 6);
        assert_eq!(config.working_memory_capacity, 3);
        assert_eq!(
            config.routing.domains.get("legal"),
            Some(&vec![MemoryType::Declarative, MemoryType::Episodic])
        );
        assert_eq!(config.initial_strengths.get(SynergyType::MultiLayer), 0.45);
        assert_eq!(config.initial_strengths.get(SynergyType::WorkingSemantic), 0.9);
        assert_eq!(config.routing.content_keywords, RoutingConfig::default().content_keywords);
    }

    #[test]
    fn test_content_keywords_from_toml() {
        let config = SynergyConfig::from_toml_str(
            r#"
            [routing.content_keywords]
            diagnosis = ["semantic", "episodic"]
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.content_keywords.len(), 1);
        assert_eq!(
            config.routing.content_keywords.get("diagnosis"),
            Some(&vec![MemoryType::Semantic, MemoryType::Episodic])
        );
        assert!(RoutingConfig::default().content_keywords.contains_key("yesterday"));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = SynergyConfig::default();
        config.synergy_strength_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = SynergyConfig::default();
        config.max_parallel_layers = 0;
        assert!(config.validate().is_err());

        let mut config = SynergyConfig::default();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = SynergyConfig::default();
        config.routing.default_layers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_layer_in_routing_is_rejected() {
        let result = SynergyConfig::from_toml_str(
            r#"
            [routing]
            default_layers = ["long_term"]
            "#,
        );
        assert!(matches!(result, Err(SynapseError::Config(_))));
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("synapse.toml");

        let mut config = SynergyConfig::default();
        config.working_memory_capacity = 42;
        config.cognitive_load_adaptation = false;

        config.save_to_path(&path).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = SynergyConfig::load_from_path(&path).await.unwrap();
        assert_eq!(loaded.working_memory_capacity, 42);
        assert!(!loaded.cognitive_load_adaptation);
        assert_eq!(loaded.routing, config.routing);
    }

    #[test]
    fn test_edge_decay_rate_matches_half_life() {
        let config = SynergyConfig::default();
        let remaining = (-config.edge_decay_rate() * config.edge_half_life_secs as f64).exp();
        assert!((remaining - 0.5).abs() < 1e-12);
    }
}
