//! Memory layer and synergy vocabulary shared by every Synapse component.

use crate::error::SynapseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Memory Types
// ============================================================================

/// A memory partition. The set is closed and fixed at compile time.
///
/// Declaration order is the canonical layer order used for deterministic
/// tie-breaking and iteration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Semantic,
    Episodic,
    Procedural,
    Working,
    Declarative,
    Associative,
    Contextual,
}

impl MemoryType {
    /// Every memory type in canonical order
    pub const ALL: [MemoryType; 7] = [
        MemoryType::Semantic,
        MemoryType::Episodic,
        MemoryType::Procedural,
        MemoryType::Working,
        MemoryType::Declarative,
        MemoryType::Associative,
        MemoryType::Contextual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Episodic => "episodic",
            Self::Procedural => "procedural",
            Self::Working => "working",
            Self::Declarative => "declarative",
            Self::Associative => "associative",
            Self::Contextual => "contextual",
        }
    }

    /// Activation half-life of the layer.
    ///
    /// Working memory forgets fastest and semantic memory slowest.
    pub fn half_life(&self) -> Duration {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 60 * MINUTE;
        let secs = match self {
            Self::Working => 5 * MINUTE,
            Self::Contextual => 30 * MINUTE,
            Self::Episodic => 2 * HOUR,
            Self::Associative => 6 * HOUR,
            Self::Procedural => 12 * HOUR,
            Self::Declarative => 18 * HOUR,
            Self::Semantic => 24 * HOUR,
        };
        Duration::from_secs(secs)
    }

    /// Exponential decay rate per second derived from the half-life
    pub fn decay_rate(&self) -> f64 {
        std::f64::consts::LN_2 / self.half_life().as_secs_f64()
    }

    /// Processing priority of the layer
    pub fn priority(&self) -> LayerPriority {
        match self {
            Self::Working => LayerPriority::High,
            _ => LayerPriority::Normal,
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = SynapseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let name = normalized.strip_suffix("_memory").unwrap_or(&normalized);
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| SynapseError::invalid_request(format!("Unknown memory type '{}'", s)))
    }
}

// ============================================================================
// Synergy Types
// ============================================================================

/// A named relationship between two or more memory layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SynergyType {
    WorkingSemantic,
    WorkingEpisodic,
    WorkingProcedural,
    SemanticEpisodic,
    SemanticProcedural,
    EpisodicProcedural,
    /// Three or more layers touched together
    MultiLayer,
}

impl SynergyType {
    pub const ALL: [SynergyType; 7] = [
        SynergyType::WorkingSemantic,
        SynergyType::WorkingEpisodic,
        SynergyType::WorkingProcedural,
        SynergyType::SemanticEpisodic,
        SynergyType::SemanticProcedural,
        SynergyType::EpisodicProcedural,
        SynergyType::MultiLayer,
    ];

    /// Minimum number of layers that make up a multi-layer synergy
    pub const MULTI_LAYER_MIN: usize = 3;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkingSemantic => "working_semantic",
            Self::WorkingEpisodic => "working_episodic",
            Self::WorkingProcedural => "working_procedural",
            Self::SemanticEpisodic => "semantic_episodic",
            Self::SemanticProcedural => "semantic_procedural",
            Self::EpisodicProcedural => "episodic_procedural",
            Self::MultiLayer => "multi_layer",
        }
    }

    /// The two endpoint layers of a pairwise synergy, `None` for `MultiLayer`
    pub fn pair(&self) -> Option<(MemoryType, MemoryType)> {
        use MemoryType::*;
        match self {
            Self::WorkingSemantic => Some((Working, Semantic)),
            Self::WorkingEpisodic => Some((Working, Episodic)),
            Self::WorkingProcedural => Some((Working, Procedural)),
            Self::SemanticEpisodic => Some((Semantic, Episodic)),
            Self::SemanticProcedural => Some((Semantic, Procedural)),
            Self::EpisodicProcedural => Some((Episodic, Procedural)),
            Self::MultiLayer => None,
        }
    }

    /// Look up the pairwise synergy joining two layers, in either order
    pub fn for_pair(a: MemoryType, b: MemoryType) -> Option<SynergyType> {
        Self::ALL.into_iter().find(|t| match t.pair() {
            Some((x, y)) => (x == a && y == b) || (x == b && y == a),
            None => false,
        })
    }

    /// Whether this is a pairwise synergy with `layer` as one endpoint
    pub fn involves(&self, layer: MemoryType) -> bool {
        self.pair().is_some_and(|(a, b)| a == layer || b == layer)
    }

    pub fn is_multi_layer(&self) -> bool {
        matches!(self, Self::MultiLayer)
    }
}

impl fmt::Display for SynergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynergyType {
    type Err = SynapseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let name = normalized.strip_suffix("_synergy").unwrap_or(&normalized);
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| SynapseError::invalid_request(format!("Unknown synergy type '{}'", s)))
    }
}

// ============================================================================
// Layer Priority
// ============================================================================

/// Processing priority reported for each layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LayerPriority {
    Immediate = 1,
    High = 2,
    Normal = 3,
    Low = 4,
    Background = 5,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_type_parsing() {
        assert_eq!("semantic".parse::<MemoryType>().unwrap(), MemoryType::Semantic);
        assert_eq!("WORKING".parse::<MemoryType>().unwrap(), MemoryType::Working);
        assert_eq!("episodic_memory".parse::<MemoryType>().unwrap(), MemoryType::Episodic);

        let err = "long_term".parse::<MemoryType>().unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_synergy_type_parsing() {
        assert_eq!(
            "working_semantic_synergy".parse::<SynergyType>().unwrap(),
            SynergyType::WorkingSemantic
        );
        assert_eq!("MULTI_LAYER".parse::<SynergyType>().unwrap(), SynergyType::MultiLayer);
        assert!("working_declarative".parse::<SynergyType>().is_err());
    }

    #[test]
    fn test_pairwise_synergies_name_two_distinct_layers() {
        for synergy in SynergyType::ALL {
            match synergy.pair() {
                Some((a, b)) => assert_ne!(a, b, "{} joins a layer to itself", synergy),
                None => assert!(synergy.is_multi_layer()),
            }
        }
    }

    #[test]
    fn test_for_pair_is_symmetric() {
        assert_eq!(
            SynergyType::for_pair(MemoryType::Semantic, MemoryType::Working),
            Some(SynergyType::WorkingSemantic)
        );
        assert_eq!(
            SynergyType::for_pair(MemoryType::Working, MemoryType::Semantic),
            Some(SynergyType::WorkingSemantic)
        );
        assert_eq!(SynergyType::for_pair(MemoryType::Declarative, MemoryType::Working), None);
    }

    #[test]
    fn test_involves_only_pair_endpoints() {
        assert!(SynergyType::WorkingEpisodic.involves(MemoryType::Working));
        assert!(SynergyType::WorkingEpisodic.involves(MemoryType::Episodic));
        assert!(!SynergyType::SemanticEpisodic.involves(MemoryType::Working));
        assert!(!SynergyType::MultiLayer.involves(MemoryType::Working));
    }

    #[test]
    fn test_working_decays_fastest_and_semantic_slowest() {
        let rates: Vec<f64> = MemoryType::ALL.iter().map(|t| t.decay_rate()).collect();
        let max = rates.iter().cloned().fold(f64::MIN, f64::max);
        let min = rates.iter().cloned().fold(f64::MAX, f64::min);
        assert_eq!(MemoryType::Working.decay_rate(), max);
        assert_eq!(MemoryType::Semantic.decay_rate(), min);
    }

    #[test]
    fn test_canonical_order() {
        let mut shuffled = vec![MemoryType::Contextual, MemoryType::Working, MemoryType::Semantic];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![MemoryType::Semantic, MemoryType::Working, MemoryType::Contextual]
        );
    }
}
