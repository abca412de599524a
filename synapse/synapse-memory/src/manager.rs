//! Cognitive memory manager orchestrating parallel layers and synergy.
//!
//! Every request fans out one task per selected layer through a shared
//! worker pool, joins all of them, and only then aggregates: synergy
//! scoring, layer activation, edge reinforcement and association updates
//! all happen after the join barrier.

use crate::association::AssociationNetwork;
use crate::context::{CognitiveContext, ContextStore, ContextUpdate};
use crate::graph::{self, SynergyEdge, SynergyGraph};
use crate::layer::MemoryLayer;
use crate::routing::RoutingTable;
use crate::types::*;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use synapse_core::error::{LayerFailure, LayerFailureKind, LayerOperation, Result, SynapseError};
use synapse_core::{Clock, MemoryId, MemoryStore, MemoryType, StoreHit, SynergyConfig, SynergyType, SystemClock};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

type LayerOutcome<T> = (MemoryType, std::result::Result<T, LayerFailure>);

/// Orchestrates writes and searches across all memory layers
pub struct CognitiveMemoryManager {
    config: SynergyConfig,
    layers: BTreeMap<MemoryType, Arc<MemoryLayer>>,
    graph: SynergyGraph,
    routing: RoutingTable,
    contexts: Arc<ContextStore>,
    associations: Arc<AssociationNetwork>,
    clock: Arc<dyn Clock>,
    pool: Arc<Semaphore>,
}

impl CognitiveMemoryManager {
    /// Create a manager with default configuration
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self::build(store, SynergyConfig::default())
    }

    /// Create a manager with custom configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation
    pub fn with_config(store: Arc<dyn MemoryStore>, config: SynergyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<dyn MemoryStore>, config: SynergyConfig) -> Self {
        let layers = MemoryType::ALL
            .into_iter()
            .map(|t| {
                let layer = MemoryLayer::new(t, store.clone(), Some(config.working_memory_capacity));
                (t, Arc::new(layer))
            })
            .collect();

        info!(
            max_parallel_layers = config.max_parallel_layers,
            working_memory_capacity = config.working_memory_capacity,
            "Initializing cognitive memory manager"
        );

        Self {
            graph: SynergyGraph::new(&config.initial_strengths, config.edge_decay_rate()),
            routing: RoutingTable::from_config(&config.routing),
            contexts: Arc::new(ContextStore::new()),
            associations: Arc::new(AssociationNetwork::new()),
            clock: Arc::new(SystemClock),
            pool: Arc::new(Semaphore::new(config.max_parallel_layers)),
            layers,
            config,
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a context store with other components
    pub fn with_context_store(mut self, contexts: Arc<ContextStore>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Share an association network with other components
    pub fn with_association_network(mut self, associations: Arc<AssociationNetwork>) -> Self {
        self.associations = associations;
        self
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store content in every selected layer concurrently.
    ///
    /// Layers that fail are reported in [`WriteResult::layer_failures`];
    /// the request fails only when no layer stored the content.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn add_with_synergy(&self, request: WriteRequest) -> Result<WriteResult> {
        validate_user(&request.user_id)?;
        if request.content.trim().is_empty() {
            return Err(SynapseError::invalid_request("content must not be empty"));
        }
        let explicit = explicit_layers(request.memory_types.as_deref())?;

        let now = self.clock.now();
        let user_id = request.user_id.as_str();
        let content = request.content.as_str();
        let layers = match explicit {
            Some(layers) => layers,
            None => {
                let context = self.resolve_context(user_id, request.context.as_ref());
                self.routing.route(&context, content)
            }
        };

        debug!(user_id = %user_id, layers = ?layers, "Dispatching write");

        let outcomes = self
            .fan_out(user_id, LayerOperation::Write, &layers, move |layer| async move {
                layer.write(user_id, content).await
            })
            .await;

        let (written, layer_failures) = partition(outcomes);
        if written.is_empty() {
            return Err(SynapseError::NoLayersAvailable {
                user_id: user_id.to_string(),
                operation: LayerOperation::Write,
                failures: layer_failures,
            });
        }

        for memory_type in written.keys() {
            if let Some(layer) = self.layers.get(memory_type) {
                layer.bump_activation(self.config.activation_increment, now);
            }
        }
        self.evict(user_id, &written, now).await;

        let touched: BTreeSet<MemoryType> = written.keys().copied().collect();
        let edges = self.reinforce(&touched, self.config.write_reinforcement, now);
        let associations_created = self.associate(user_id, &written, &edges, now);

        info!(
            user_id = %user_id,
            layers = ?touched,
            failed = layer_failures.len(),
            synergies = edges.len(),
            associations = associations_created,
            "Stored memory with synergy"
        );

        Ok(WriteResult {
            per_layer_item_ids: written,
            synergy_activations: edges.into_values().collect(),
            layer_failures,
            associations_created,
        })
    }

    /// Admit new items into capacity-bounded layers and delete what they evict.
    ///
    /// Runs after the join, so a layer that timed out never changes
    /// residency. The deletes are not bounded by the layer timeout.
    async fn evict(&self, user_id: &str, written: &BTreeMap<MemoryType, MemoryId>, now: DateTime<Utc>) {
        let deletions = written.iter().filter_map(|(memory_type, item_id)| {
            let layer = self.layers.get(memory_type)?;
            let evicted = layer.admit(*item_id, user_id, now);
            (!evicted.is_empty()).then(|| async move {
                layer.delete_evicted(&evicted).await;
                evicted
            })
        });

        for evicted in join_all(deletions).await.into_iter().flatten() {
            let removed = self.associations.remove_item(&evicted.user_id, evicted.item_id);
            debug!(item_id = %evicted.item_id, associations = removed, "Dropped evicted item");
        }
    }

    /// Link the new items of every touched pair of layers.
    ///
    /// A pair is weighted by its own pairwise edge when that edge was
    /// activated, otherwise by the multi-layer edge when it was.
    fn associate(
        &self,
        user_id: &str,
        items: &BTreeMap<MemoryType, MemoryId>,
        edges: &BTreeMap<SynergyType, SynergyEdge>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut created = 0;
        let items: Vec<(MemoryType, MemoryId)> = items.iter().map(|(t, id)| (*t, *id)).collect();

        for (i, (a, source_id)) in items.iter().enumerate() {
            for (b, target_id) in &items[i + 1..] {
                let edge = SynergyType::for_pair(*a, *b)
                    .and_then(|t| edges.get(&t))
                    .or_else(|| edges.get(&SynergyType::MultiLayer));
                let Some(edge) = edge else {
                    continue;
                };

                let strength = edge.strength * self.config.cross_layer_association_strength;
                if self
                    .associations
                    .record(user_id, *source_id, *target_id, strength, now)
                    .is_some()
                {
                    created += 1;
                }
            }
        }
        created
    }

    // ========================================================================
    // Searches
    // ========================================================================

    /// Search selected layers concurrently and rank hits with synergy.
    ///
    /// `final_score = base_score * (1 + synergy_score)`. Results are ordered
    /// by final score, then base score, then layer, then the order the
    /// store returned them in.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn search_with_synergy(&self, request: SearchRequest) -> Result<SearchResult> {
        validate_user(&request.user_id)?;
        if request.query.trim().is_empty() {
            return Err(SynapseError::invalid_request("query must not be empty"));
        }
        if request.limit == Some(0) {
            return Err(SynapseError::invalid_request("limit must be greater than 0"));
        }
        let explicit = explicit_layers(request.memory_types.as_deref())?;

        let now = self.clock.now();
        let user_id = request.user_id.as_str();
        let query = request.query.as_str();
        let limit = request.limit.unwrap_or(self.config.search_limit);
        let layers = match explicit {
            Some(layers) => layers,
            None => {
                let context = self.resolve_context(user_id, request.context.as_ref());
                self.select_search_layers(&context, now)
            }
        };

        debug!(user_id = %user_id, layers = ?layers, limit, "Dispatching search");

        let outcomes = self
            .fan_out(user_id, LayerOperation::Search, &layers, move |layer| async move {
                layer.search(user_id, query, limit).await
            })
            .await;

        let (answered, layer_failures) = partition(outcomes);
        if answered.is_empty() {
            return Err(SynapseError::NoLayersAvailable {
                user_id: user_id.to_string(),
                operation: LayerOperation::Search,
                failures: layer_failures,
            });
        }

        let responding: BTreeSet<MemoryType> = answered
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(t, _)| *t)
            .collect();

        let allowed: Option<BTreeSet<SynergyType>> =
            request.synergy_types.as_ref().map(|types| types.iter().copied().collect());
        let boosting: Vec<SynergyEdge> = self
            .graph
            .active_edges(self.config.synergy_strength_threshold, now)
            .into_iter()
            .filter(|edge| allowed.as_ref().is_none_or(|a| a.contains(&edge.synergy_type)))
            .collect();

        let results = rank(&answered, &responding, &boosting, limit);

        // Reads apply the write updates at a reduced ratio
        let ratio = self.config.read_reinforcement_ratio;
        for memory_type in answered.keys() {
            if let Some(layer) = self.layers.get(memory_type) {
                layer.bump_activation(self.config.activation_increment * ratio, now);
            }
        }
        let edges = self.reinforce(&responding, self.config.write_reinforcement * ratio, now);

        if let Some(working) = self.layers.get(&MemoryType::Working) {
            let returned: Vec<MemoryId> = results
                .iter()
                .filter(|r| r.source_layer == MemoryType::Working)
                .map(|r| r.item_id)
                .collect();
            working.refresh_items(&returned, now);
        }

        info!(
            user_id = %user_id,
            results = results.len(),
            responding = ?responding,
            failed = layer_failures.len(),
            "Searched memory with synergy"
        );

        Ok(SearchResult {
            results,
            synergy_activations: edges.into_values().collect(),
            layer_failures,
            searched_layers: answered.keys().copied().collect(),
        })
    }

    /// Layers searched when a request names none.
    ///
    /// Layers whose activation is at or above the floor, or every layer if none
    /// is. Under high cognitive load with adaptation enabled only the most
    /// active of those are kept, fewer as the load approaches 1.0.
    pub fn select_search_layers(&self, context: &CognitiveContext, now: DateTime<Utc>) -> Vec<MemoryType> {
        let mut active: Vec<(MemoryType, f64)> = self
            .layers
            .iter()
            .map(|(t, layer)| (*t, layer.current_activation(now)))
            .filter(|(_, activation)| *activation >= self.config.activation_floor)
            .collect();

        if active.is_empty() {
            return MemoryType::ALL.to_vec();
        }

        let load = context.cognitive_load;
        let threshold = self.config.high_load_threshold;
        if self.config.cognitive_load_adaptation && load >= threshold {
            let span = (1.0 - threshold).max(f64::EPSILON);
            let share = (1.0 - (load - threshold) / span).clamp(0.0, 1.0);
            let keep = ((active.len() as f64 * share).ceil() as usize).max(1);

            active.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            active.truncate(keep);
            debug!(load, keep, "High cognitive load narrowed search layers");
        }

        let mut layers: Vec<MemoryType> = active.into_iter().map(|(t, _)| t).collect();
        layers.sort();
        layers
    }

    // ========================================================================
    // Context
    // ========================================================================

    /// Partially update a user's cognitive context
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error if `user_id` is empty
    #[instrument(skip(self, update))]
    pub fn set_cognitive_context(&self, user_id: &str, update: ContextUpdate) -> Result<CognitiveContext> {
        validate_user(user_id)?;
        Ok(self.contexts.update(user_id, &update))
    }

    /// Forget a user's context; returns whether one existed
    pub fn reset_cognitive_context(&self, user_id: &str) -> bool {
        let existed = self.contexts.reset(user_id);
        if existed {
            info!(user_id = %user_id, "Reset cognitive context");
        }
        existed
    }

    /// Snapshot of a user's context, layer activations and edges.
    ///
    /// Never changes any state.
    pub fn get_cognitive_state(&self, user_id: &str) -> CognitiveState {
        let now = self.clock.now();

        let layers = self
            .layers
            .iter()
            .map(|(t, layer)| {
                let state = LayerState {
                    memory_type: *t,
                    activation_level: layer.current_activation(now),
                    last_activated: layer.last_activated(),
                    priority: t.priority(),
                    synergy_connections: graph::synergy_connections(*t),
                    resident_items: layer.resident_count(),
                };
                (*t, state)
            })
            .collect();

        let edges = self
            .graph
            .snapshot(now)
            .into_iter()
            .map(|edge| (edge.synergy_type, edge))
            .collect();

        CognitiveState {
            user_id: user_id.to_string(),
            context: self.contexts.get(user_id),
            layers,
            edges,
            association_count: self.associations.count(user_id),
            captured_at: now,
        }
    }

    // ========================================================================
    // Associations
    // ========================================================================

    /// Items linked to `item_id` by a cross-layer association
    pub fn associated_items(&self, user_id: &str, item_id: MemoryId) -> BTreeSet<MemoryId> {
        self.associations.neighbors(user_id, item_id)
    }

    /// Remove a user's associations weaker than `min_strength`
    pub fn prune_associations(&self, user_id: &str, min_strength: f64) -> usize {
        let pruned = self.associations.prune(user_id, min_strength);
        info!(user_id = %user_id, pruned, min_strength, "Pruned associations");
        pruned
    }

    // ========================================================================
    // Lifecycle & accessors
    // ========================================================================

    /// Close the worker pool. Later requests find no layer available.
    pub fn shutdown(&self) {
        self.pool.close();
        info!("Cognitive memory manager shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.pool.is_closed()
    }

    pub fn config(&self) -> &SynergyConfig {
        &self.config
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn graph(&self) -> &SynergyGraph {
        &self.graph
    }

    pub fn layer(&self, memory_type: MemoryType) -> Option<&MemoryLayer> {
        self.layers.get(&memory_type).map(Arc::as_ref)
    }

    pub fn contexts(&self) -> &Arc<ContextStore> {
        &self.contexts
    }

    pub fn associations(&self) -> &Arc<AssociationNetwork> {
        &self.associations
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn resolve_context(&self, user_id: &str, supplied: Option<&CognitiveContext>) -> CognitiveContext {
        match supplied {
            Some(context) => context.clone(),
            None => self.contexts.get(user_id),
        }
    }

    /// Reinforce the edges activated by `touched`, keyed by type
    fn reinforce(
        &self,
        touched: &BTreeSet<MemoryType>,
        amount: f64,
        now: DateTime<Utc>,
    ) -> BTreeMap<SynergyType, SynergyEdge> {
        graph::activated_synergies(touched)
            .into_iter()
            .map(|t| (t, self.graph.reinforce(t, amount, now)))
            .collect()
    }

    /// Run `op` on every layer through the worker pool and join all of them.
    ///
    /// Each task holds a pool permit only while its store call runs. The
    /// timeout covers the store call, not the wait for a permit.
    async fn fan_out<T, F, Fut>(
        &self,
        user_id: &str,
        operation: LayerOperation,
        layers: &[MemoryType],
        op: F,
    ) -> Vec<LayerOutcome<T>>
    where
        F: Fn(Arc<MemoryLayer>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.config.layer_timeout();
        let timeout_ms = self.config.layer_timeout_ms;

        let tasks = layers.iter().map(|&memory_type| {
            let pool = self.pool.clone();
            let call = self.layers.get(&memory_type).cloned().map(&op);

            async move {
                let failure = |kind| LayerFailure::new(user_id, memory_type, operation, kind);

                let Some(call) = call else {
                    return (memory_type, Err(failure(LayerFailureKind::Unavailable)));
                };
                let Ok(_permit) = pool.acquire_owned().await else {
                    return (memory_type, Err(failure(LayerFailureKind::Unavailable)));
                };

                let outcome = match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(failure(LayerFailureKind::Store { message: e.to_string() })),
                    Err(_) => Err(failure(LayerFailureKind::Timeout { after_ms: timeout_ms })),
                };
                (memory_type, outcome)
            }
        });

        let outcomes = join_all(tasks).await;

        for (_, outcome) in &outcomes {
            if let Err(failure) = outcome {
                warn!(
                    user_id = %failure.user_id,
                    layer = %failure.layer,
                    operation = %failure.operation,
                    kind = ?failure.kind,
                    "Layer operation failed"
                );
            }
        }
        outcomes
    }
}

impl std::fmt::Debug for CognitiveMemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitiveMemoryManager")
            .field("config", &self.config)
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .field("pool_closed", &self.pool.is_closed())
            .finish()
    }
}

fn validate_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(SynapseError::invalid_request("user_id must not be empty"));
    }
    Ok(())
}

/// Deduplicated explicit layers in enum order, `None` when not given
fn explicit_layers(memory_types: Option<&[MemoryType]>) -> Result<Option<Vec<MemoryType>>> {
    match memory_types {
        None => Ok(None),
        Some([]) => Err(SynapseError::invalid_request("memory_types must not be empty")),
        Some(types) => {
            let unique: BTreeSet<MemoryType> = types.iter().copied().collect();
            Ok(Some(unique.into_iter().collect()))
        }
    }
}

fn partition<T>(outcomes: Vec<LayerOutcome<T>>) -> (BTreeMap<MemoryType, T>, Vec<LayerFailure>) {
    let mut successes = BTreeMap::new();
    let mut failures = Vec::new();
    for (memory_type, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                successes.insert(memory_type, value);
            }
            Err(failure) => failures.push(failure),
        }
    }
    (successes, failures)
}

/// Score and order hits from every answering layer
fn rank(
    answered: &BTreeMap<MemoryType, Vec<StoreHit>>,
    responding: &BTreeSet<MemoryType>,
    edges: &[SynergyEdge],
    limit: usize,
) -> Vec<ScoredMemory> {
    let mut scored: Vec<(ScoredMemory, usize)> = Vec::new();

    for (memory_type, hits) in answered {
        let synergy_score = graph::synergy_boost(*memory_type, responding, edges);
        for (position, hit) in hits.iter().enumerate() {
            let memory = ScoredMemory {
                item_id: hit.item_id,
                memory: hit.content.clone(),
                source_layer: *memory_type,
                base_score: hit.base_score,
                synergy_score,
                final_score: hit.base_score * (1.0 + synergy_score),
            };
            scored.push((memory, position));
        }
    }

    scored.sort_by(|(a, pa), (b, pb)| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| b.base_score.total_cmp(&a.base_score))
            .then_with(|| a.source_layer.cmp(&b.source_layer))
            .then_with(|| pa.cmp(pb))
    });
    scored.truncate(limit);
    scored.into_iter().map(|(memory, _)| memory).collect()
}
