//! Request, result, and state types of the synergy manager.

use crate::context::CognitiveContext;
use crate::graph::SynergyEdge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use synapse_core::{LayerFailure, LayerPriority, MemoryId, MemoryType, SynergyType};

// ============================================================================
// Requests
// ============================================================================

/// Store content across one or more layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteRequest {
    pub content: String,
    pub user_id: String,
    /// Explicit layers; routed from the context when absent
    pub memory_types: Option<Vec<MemoryType>>,
    /// Context for this request only; the stored context is used when absent
    pub context: Option<CognitiveContext>,
}

impl WriteRequest {
    pub fn new(content: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            user_id: user_id.into(),
            memory_types: None,
            context: None,
        }
    }

    pub fn with_memory_types(mut self, memory_types: impl IntoIterator<Item = MemoryType>) -> Self {
        self.memory_types = Some(memory_types.into_iter().collect());
        self
    }

    pub fn with_context(mut self, context: CognitiveContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Search across layers with synergy-boosted ranking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub user_id: String,
    /// Explicit layers; chosen by activation when absent
    pub memory_types: Option<Vec<MemoryType>>,
    /// Only these edges may boost ranking
    pub synergy_types: Option<Vec<SynergyType>>,
    pub context: Option<CognitiveContext>,
    /// Per-layer and overall result limit
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            memory_types: None,
            synergy_types: None,
            context: None,
            limit: None,
        }
    }

    pub fn with_memory_types(mut self, memory_types: impl IntoIterator<Item = MemoryType>) -> Self {
        self.memory_types = Some(memory_types.into_iter().collect());
        self
    }

    pub fn with_synergy_types(mut self, synergy_types: impl IntoIterator<Item = SynergyType>) -> Self {
        self.synergy_types = Some(synergy_types.into_iter().collect());
        self
    }

    pub fn with_context(mut self, context: CognitiveContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of [`add_with_synergy`](crate::CognitiveMemoryManager::add_with_synergy)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteResult {
    /// One id per layer that stored the content
    pub per_layer_item_ids: BTreeMap<MemoryType, MemoryId>,
    /// Edges activated by this write, after reinforcement
    pub synergy_activations: Vec<SynergyEdge>,
    /// Layers that did not store the content
    pub layer_failures: Vec<LayerFailure>,
    pub associations_created: usize,
}

impl WriteResult {
    pub fn item_id(&self, layer: MemoryType) -> Option<MemoryId> {
        self.per_layer_item_ids.get(&layer).copied()
    }

    pub fn activated(&self, synergy_type: SynergyType) -> Option<&SynergyEdge> {
        self.synergy_activations
            .iter()
            .find(|edge| edge.synergy_type == synergy_type)
    }

    pub fn is_partial(&self) -> bool {
        !self.layer_failures.is_empty()
    }
}

/// One ranked search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredMemory {
    pub item_id: MemoryId,
    pub memory: String,
    pub source_layer: MemoryType,
    pub base_score: f64,
    /// Sum of active edge strengths linking the source layer to other responding layers
    pub synergy_score: f64,
    /// `base_score * (1 + synergy_score)`
    pub final_score: f64,
}

/// Outcome of [`search_with_synergy`](crate::CognitiveMemoryManager::search_with_synergy)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub results: Vec<ScoredMemory>,
    /// Edges reinforced by this search
    pub synergy_activations: Vec<SynergyEdge>,
    pub layer_failures: Vec<LayerFailure>,
    /// Layers that answered, in enum order
    pub searched_layers: Vec<MemoryType>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn activated(&self, synergy_type: SynergyType) -> Option<&SynergyEdge> {
        self.synergy_activations
            .iter()
            .find(|edge| edge.synergy_type == synergy_type)
    }
}

// ============================================================================
// State snapshot
// ============================================================================

/// Observable state of one layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerState {
    pub memory_type: MemoryType,
    pub activation_level: f64,
    pub last_activated: Option<DateTime<Utc>>,
    pub priority: LayerPriority,
    /// Layers this one shares a pairwise edge with
    pub synergy_connections: Vec<MemoryType>,
    /// Items resident in a capacity-bounded layer
    pub resident_items: Option<usize>,
}

/// Read-only snapshot returned by
/// [`get_cognitive_state`](crate::CognitiveMemoryManager::get_cognitive_state)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CognitiveState {
    pub user_id: String,
    pub context: CognitiveContext,
    pub layers: BTreeMap<MemoryType, LayerState>,
    pub edges: BTreeMap<SynergyType, SynergyEdge>,
    pub association_count: usize,
    pub captured_at: DateTime<Utc>,
}
