//! Synergy graph between memory layers.
//!
//! The graph holds exactly one edge per [`SynergyType`]. Edge strength is
//! reinforced when its layers are activated together and decays lazily with
//! time since the last activation. An edge that has never been activated
//! keeps its prior strength.

use crate::decay::{self, Decaying};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use synapse_core::config::InitialStrengths;
use synapse_core::{MemoryType, SynergyType};
use tracing::debug;

/// A weighted relationship between layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynergyEdge {
    pub synergy_type: SynergyType,
    pub strength: f64,
    pub last_activation: Option<DateTime<Utc>>,
}

impl SynergyEdge {
    /// Whether this edge joins `layer` to some other layer in `others`.
    ///
    /// A multi-layer edge joins every member of a set of three or more layers.
    pub fn connects(&self, layer: MemoryType, others: &BTreeSet<MemoryType>) -> bool {
        match self.synergy_type.pair() {
            Some((a, b)) if a == layer => others.contains(&b),
            Some((a, b)) if b == layer => others.contains(&a),
            Some(_) => false,
            None => others.len() >= SynergyType::MULTI_LAYER_MIN && others.contains(&layer),
        }
    }
}

/// Undirected weighted graph over the memory layers
pub struct SynergyGraph {
    edges: BTreeMap<SynergyType, Mutex<Decaying>>,
    decay_rate: f64,
}

impl SynergyGraph {
    /// Build the fixed edge set from prior strengths
    pub fn new(initial: &InitialStrengths, decay_rate: f64) -> Self {
        let edges = SynergyType::ALL
            .into_iter()
            .map(|t| (t, Mutex::new(Decaying::new(initial.get(t), None))))
            .collect();
        Self { edges, decay_rate }
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// Edge as seen at `now`, with decay applied
    pub fn get(&self, synergy_type: SynergyType, now: DateTime<Utc>) -> SynergyEdge {
        match self.edges.get(&synergy_type) {
            Some(edge) => {
                let edge = edge.lock();
                SynergyEdge {
                    synergy_type,
                    strength: edge.at(now, self.decay_rate),
                    last_activation: edge.updated_at,
                }
            }
            None => SynergyEdge {
                synergy_type,
                strength: 0.0,
                last_activation: None,
            },
        }
    }

    /// Add `amount` to an edge, capped at 1.0, and stamp its activation time.
    ///
    /// Returns the edge after the update. Concurrent reinforcements of the
    /// same edge are serialised by the edge lock.
    pub fn reinforce(&self, synergy_type: SynergyType, amount: f64, now: DateTime<Utc>) -> SynergyEdge {
        let Some(edge) = self.edges.get(&synergy_type) else {
            return self.get(synergy_type, now);
        };
        let mut edge = edge.lock();
        let strength = edge.add(amount, now, self.decay_rate);
        debug!(synergy = %synergy_type, strength, amount, "Reinforced synergy edge");
        SynergyEdge {
            synergy_type,
            strength,
            last_activation: edge.updated_at,
        }
    }

    /// Strength remaining after `elapsed` without activity
    pub fn decay(&self, strength: f64, elapsed: Duration) -> f64 {
        decay::decayed(strength, self.decay_rate, elapsed)
    }

    /// Edges whose current strength meets `min_strength`, in enum order
    pub fn active_edges(&self, min_strength: f64, now: DateTime<Utc>) -> Vec<SynergyEdge> {
        self.snapshot(now)
            .into_iter()
            .filter(|edge| edge.strength >= min_strength)
            .collect()
    }

    /// All edges at `now`, in enum order
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<SynergyEdge> {
        SynergyType::ALL.into_iter().map(|t| self.get(t, now)).collect()
    }
}

/// Layers each layer shares a pairwise synergy edge with
pub fn synergy_connections(layer: MemoryType) -> Vec<MemoryType> {
    let mut connections: Vec<MemoryType> = SynergyType::ALL
        .into_iter()
        .filter_map(|t| match t.pair() {
            Some((a, b)) if a == layer => Some(b),
            Some((a, b)) if b == layer => Some(a),
            _ => None,
        })
        .collect();
    connections.sort();
    connections
}

/// Synergy types activated when `touched` layers take part in one operation.
///
/// Pairwise edges activate when both endpoints are touched. Working memory
/// mediates: while it is touched, only pairwise edges through working memory
/// activate. Three or more touched layers also activate the multi-layer edge.
pub fn activated_synergies(touched: &BTreeSet<MemoryType>) -> Vec<SynergyType> {
    let working = touched.contains(&MemoryType::Working);
    SynergyType::ALL
        .into_iter()
        .filter(|t| match t.pair() {
            Some((a, b)) => {
                touched.contains(&a) && touched.contains(&b) && (!working || t.involves(MemoryType::Working))
            }
            None => touched.len() >= SynergyType::MULTI_LAYER_MIN,
        })
        .collect()
}

/// Sum of strengths of `edges` joining `layer` to another responding layer
pub fn synergy_boost(layer: MemoryType, responding: &BTreeSet<MemoryType>, edges: &[SynergyEdge]) -> f64 {
    edges
        .iter()
        .filter(|edge| edge.connects(layer, responding))
        .map(|edge| edge.strength)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use MemoryType::*;

    fn graph() -> SynergyGraph {
        SynergyGraph::new(&InitialStrengths::default(), 0.001)
    }

    fn set(layers: &[MemoryType]) -> BTreeSet<MemoryType> {
        layers.iter().copied().collect()
    }

    #[test]
    fn test_one_edge_per_synergy_type() {
        let now = Utc::now();
        let snapshot = graph().snapshot(now);
        assert_eq!(snapshot.len(), SynergyType::ALL.len());
        assert_eq!(snapshot[0].strength, 0.9);
        assert!(snapshot.iter().all(|e| e.last_activation.is_none()));
    }

    #[test]
    fn test_priors_do_not_decay() {
        let g = graph();
        let later = Utc::now() + ChronoDuration::days(30);
        assert_eq!(g.get(SynergyType::WorkingEpisodic, later).strength, 0.8);
    }

    #[test]
    fn test_reinforce_is_bounded_and_monotonic() {
        let g = SynergyGraph::new(&InitialStrengths::uniform(0.0), 0.001);
        let now = Utc::now();
        let mut previous = 0.0;
        for _ in 0..30 {
            let edge = g.reinforce(SynergyType::SemanticEpisodic, 0.05, now);
            assert!(edge.strength <= 1.0);
            if previous < 1.0 {
                assert!(edge.strength > previous);
            }
            previous = edge.strength;
        }
        assert_eq!(previous, 1.0);
        assert_eq!(g.get(SynergyType::SemanticEpisodic, now).last_activation, Some(now));
    }

    #[test]
    fn test_lazy_decay_after_activation() {
        let g = SynergyGraph::new(&InitialStrengths::uniform(0.5), 0.01);
        let now = Utc::now();
        let s0 = g.reinforce(SynergyType::WorkingSemantic, 0.1, now).strength;

        let later = now + ChronoDuration::seconds(50);
        let expected = s0 * (-0.01f64 * 50.0).exp();
        assert!((g.get(SynergyType::WorkingSemantic, later).strength - expected).abs() < 1e-9);
        assert!((g.decay(s0, Duration::from_secs(50)) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_active_edges_threshold() {
        let g = graph();
        let active: Vec<SynergyType> = g
            .active_edges(0.6, Utc::now())
            .into_iter()
            .map(|e| e.synergy_type)
            .collect();
        assert_eq!(
            active,
            vec![
                SynergyType::WorkingSemantic,
                SynergyType::WorkingEpisodic,
                SynergyType::WorkingProcedural,
                SynergyType::SemanticEpisodic,
            ]
        );
    }

    #[test]
    fn test_working_mediates_activation() {
        let activated = activated_synergies(&set(&[Semantic, Episodic, Working]));
        assert_eq!(
            activated,
            vec![
                SynergyType::WorkingSemantic,
                SynergyType::WorkingEpisodic,
                SynergyType::MultiLayer,
            ]
        );
    }

    #[test]
    fn test_activation_without_working() {
        assert_eq!(
            activated_synergies(&set(&[Semantic, Episodic])),
            vec![SynergyType::SemanticEpisodic]
        );
        assert!(activated_synergies(&set(&[Semantic])).is_empty());
        assert!(activated_synergies(&set(&[Declarative, Contextual])).is_empty());
    }

    #[test]
    fn test_synergy_boost() {
        let now = Utc::now();
        let edges = graph().snapshot(now);

        let responding = set(&[Working, Semantic]);
        assert!((synergy_boost(Working, &responding, &edges) - 0.9).abs() < 1e-12);
        assert!((synergy_boost(Semantic, &responding, &edges) - 0.9).abs() < 1e-12);

        let responding = set(&[Working, Semantic, Episodic]);
        // working_semantic + working_episodic + multi_layer
        assert!((synergy_boost(Working, &responding, &edges) - 2.0).abs() < 1e-12);
        // working_semantic + semantic_episodic + multi_layer
        assert!((synergy_boost(Semantic, &responding, &edges) - 1.8).abs() < 1e-12);

        assert_eq!(synergy_boost(Declarative, &set(&[Declarative, Working]), &edges), 0.0);
    }

    #[test]
    fn test_synergy_connections() {
        assert_eq!(synergy_connections(Working), vec![Semantic, Episodic, Procedural]);
        assert!(synergy_connections(Contextual).is_empty());
    }
}
