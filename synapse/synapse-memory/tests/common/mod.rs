//! Shared test fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use synapse_core::error::{Result, SynapseError};
use synapse_core::{MemoryId, MemoryStore, MemoryType, StoreHit};

/// Base store with scripted search hits, injected failures and delays
#[derive(Default)]
pub struct ScriptedStore {
    hits: Mutex<HashMap<MemoryType, Vec<StoreHit>>>,
    failing: Mutex<HashSet<MemoryType>>,
    delays: Mutex<HashMap<MemoryType, Duration>>,
    delete_delay: Mutex<Option<Duration>>,
    deleted: Mutex<Vec<MemoryId>>,
    writes: AtomicUsize,
    searches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the hits a layer returns for any query, returning their ids
    pub fn script(&self, layer: MemoryType, hits: &[(&str, f64)]) -> Vec<MemoryId> {
        let hits: Vec<StoreHit> = hits
            .iter()
            .map(|(content, score)| StoreHit {
                item_id: MemoryId::new(),
                content: content.to_string(),
                base_score: *score,
            })
            .collect();
        let ids = hits.iter().map(|h| h.item_id).collect();
        self.hits.lock().insert(layer, hits);
        ids
    }

    pub fn fail(&self, layer: MemoryType) {
        self.failing.lock().insert(layer);
    }

    pub fn delay(&self, layer: MemoryType, by: Duration) {
        self.delays.lock().insert(layer, by);
    }

    /// Make every delete take `by` before completing
    pub fn delay_deletes(&self, by: Duration) {
        *self.delete_delay.lock() = Some(by);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Highest number of store calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<MemoryId> {
        self.deleted.lock().clone()
    }

    pub fn reset_counters(&self) {
        self.writes.store(0, Ordering::SeqCst);
        self.searches.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    async fn enter(&self, layer: MemoryType) -> Result<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.delays.lock().get(&layer).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().contains(&layer) {
            return Err(SynapseError::store(format!("{} store unavailable", layer)));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for ScriptedStore {
    async fn write(&self, layer: MemoryType, _user_id: &str, _content: &str) -> Result<MemoryId> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.enter(layer).await?;
        Ok(MemoryId::new())
    }

    async fn search(
        &self,
        layer: MemoryType,
        _user_id: &str,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<StoreHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.enter(layer).await?;
        let mut hits = self.hits.lock().get(&layer).cloned().unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, _layer: MemoryType, _user_id: &str, item_id: MemoryId) -> Result<bool> {
        let delay = *self.delete_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.deleted.lock().push(item_id);
        Ok(true)
    }
}
