//! Memory layers with activation tracking and capacity-bounded residency.
//!
//! A layer wraps the shared base store for one [`MemoryType`]. It tracks its
//! own activation level, which decays lazily at a rate derived from the
//! layer's half-life. Working memory additionally bounds the number of
//! resident items and evicts the item with the lowest current activation
//! when a write would exceed capacity.

use crate::decay::Decaying;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use synapse_core::error::Result;
use synapse_core::{MemoryId, MemoryStore, MemoryType, StoreHit};
use tracing::{debug, info, warn};

/// An item removed from a capacity-bounded layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedItem {
    pub user_id: String,
    pub item_id: MemoryId,
}

#[derive(Debug)]
struct Resident {
    user_id: String,
    activation: Decaying,
    seq: u64,
}

#[derive(Debug, Default)]
struct Residents {
    items: HashMap<MemoryId, Resident>,
    next_seq: u64,
}

/// One memory partition
pub struct MemoryLayer {
    memory_type: MemoryType,
    store: Arc<dyn MemoryStore>,
    decay_rate: f64,
    capacity: Option<usize>,
    activation: Mutex<Decaying>,
    residents: Mutex<Residents>,
}

impl MemoryLayer {
    /// Create a layer; `capacity` is honoured only for working memory
    pub fn new(memory_type: MemoryType, store: Arc<dyn MemoryStore>, capacity: Option<usize>) -> Self {
        let capacity = match memory_type {
            MemoryType::Working => capacity,
            _ => None,
        };
        Self {
            memory_type,
            store,
            decay_rate: memory_type.decay_rate(),
            capacity,
            activation: Mutex::new(Decaying::new(0.0, None)),
            residents: Mutex::new(Residents::default()),
        }
    }

    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// Persist content in this layer's partition of the base store.
    ///
    /// Only the store call happens here. Residency is updated afterwards with
    /// [`admit`](Self::admit) once the write is known to have succeeded.
    pub async fn write(&self, user_id: &str, content: &str) -> Result<MemoryId> {
        let item_id = self.store.write(self.memory_type, user_id, content).await?;
        debug!(layer = %self.memory_type, user_id = %user_id, %item_id, "Stored item in layer");
        Ok(item_id)
    }

    /// Delete evicted items from the base store.
    ///
    /// Returns how many were deleted. Failures are logged and skipped.
    pub async fn delete_evicted(&self, evicted: &[EvictedItem]) -> usize {
        let mut deleted = 0;
        for item in evicted {
            match self.store.delete(self.memory_type, &item.user_id, item.item_id).await {
                Ok(_) => {
                    deleted += 1;
                    debug!(layer = %self.memory_type, item_id = %item.item_id, "Deleted evicted item");
                }
                Err(e) => warn!(
                    layer = %self.memory_type,
                    item_id = %item.item_id,
                    error = %e,
                    "Failed to delete evicted item from store"
                ),
            }
        }
        deleted
    }

    /// Search this layer, best hit first, with scores clamped to `[0, 1]`
    pub async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<StoreHit>> {
        let mut hits = self.store.search(self.memory_type, user_id, query, limit).await?;
        hits.truncate(limit);
        for hit in &mut hits {
            hit.base_score = if hit.base_score.is_nan() {
                0.0
            } else {
                hit.base_score.clamp(0.0, 1.0)
            };
        }
        debug!(layer = %self.memory_type, user_id = %user_id, hits = hits.len(), "Searched layer");
        Ok(hits)
    }

    /// Raise the layer activation by `amount`, capped at 1.0
    pub fn bump_activation(&self, amount: f64, now: DateTime<Utc>) -> f64 {
        self.activation.lock().add(amount, now, self.decay_rate)
    }

    /// Activation at `now` after lazy decay
    pub fn current_activation(&self, now: DateTime<Utc>) -> f64 {
        self.activation.lock().at(now, self.decay_rate)
    }

    pub fn last_activated(&self) -> Option<DateTime<Utc>> {
        self.activation.lock().updated_at
    }

    /// Mark resident items as freshly reinforced
    pub fn refresh_items(&self, item_ids: &[MemoryId], now: DateTime<Utc>) {
        if self.capacity.is_none() {
            return;
        }
        let mut residents = self.residents.lock();
        for item_id in item_ids {
            if let Some(resident) = residents.items.get_mut(item_id) {
                resident.activation = Decaying::new(1.0, Some(now));
            }
        }
    }

    /// Number of resident items, for capacity-bounded layers
    pub fn resident_count(&self) -> Option<usize> {
        self.capacity.map(|_| self.residents.lock().items.len())
    }

    pub fn is_resident(&self, item_id: MemoryId) -> bool {
        self.residents.lock().items.contains_key(&item_id)
    }

    /// Current activation of a resident item
    pub fn item_activation(&self, item_id: MemoryId, now: DateTime<Utc>) -> Option<f64> {
        self.residents
            .lock()
            .items
            .get(&item_id)
            .map(|r| r.activation.at(now, self.decay_rate))
    }

    /// Register a newly written item and evict the weakest others while over
    /// capacity. Does nothing for layers without a capacity.
    ///
    /// Victims are chosen by lowest current activation, oldest first on ties.
    /// The item being admitted is never a candidate.
    pub fn admit(&self, item_id: MemoryId, user_id: &str, now: DateTime<Utc>) -> Vec<EvictedItem> {
        let Some(capacity) = self.capacity else {
            return Vec::new();
        };
        let mut residents = self.residents.lock();
        let seq = residents.next_seq;
        residents.next_seq += 1;
        residents.items.insert(
            item_id,
            Resident {
                user_id: user_id.to_string(),
                activation: Decaying::new(1.0, Some(now)),
                seq,
            },
        );

        let mut evicted = Vec::new();
        while residents.items.len() > capacity {
            let victim = residents
                .items
                .iter()
                .filter(|(id, _)| **id != item_id)
                .map(|(id, r)| (*id, r.activation.at(now, self.decay_rate), r.seq))
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));

            let Some((victim_id, activation, _)) = victim else {
                break;
            };
            if let Some(resident) = residents.items.remove(&victim_id) {
                info!(
                    layer = %self.memory_type,
                    item_id = %victim_id,
                    activation,
                    capacity,
                    "Evicting lowest-activation resident"
                );
                evicted.push(EvictedItem {
                    user_id: resident.user_id,
                    item_id: victim_id,
                });
            }
        }
        evicted
    }
}

impl std::fmt::Debug for MemoryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLayer")
            .field("memory_type", &self.memory_type)
            .field("capacity", &self.capacity)
            .field("activation", &*self.activation.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::Duration;

    fn working_layer(capacity: usize) -> (MemoryLayer, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let layer = MemoryLayer::new(MemoryType::Working, store.clone(), Some(capacity));
        (layer, store)
    }

    #[test]
    fn test_capacity_only_for_working() {
        let store = Arc::new(InMemoryStore::new());
        let semantic = MemoryLayer::new(MemoryType::Semantic, store.clone(), Some(3));
        assert_eq!(semantic.capacity(), None);
        assert_eq!(semantic.resident_count(), None);

        let working = MemoryLayer::new(MemoryType::Working, store, Some(3));
        assert_eq!(working.capacity(), Some(3));
        assert_eq!(working.resident_count(), Some(0));
    }

    #[test]
    fn test_activation_bump_and_decay() {
        let store = Arc::new(InMemoryStore::new());
        let layer = MemoryLayer::new(MemoryType::Working, store, None);
        let now = Utc::now();

        assert_eq!(layer.current_activation(now), 0.0);
        assert!((layer.bump_activation(0.4, now) - 0.4).abs() < 1e-12);

        let half_life = MemoryType::Working.half_life().as_secs() as i64;
        let later = now + Duration::seconds(half_life);
        assert!((layer.current_activation(later) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_activation_capped() {
        let store = Arc::new(InMemoryStore::new());
        let layer = MemoryLayer::new(MemoryType::Semantic, store, None);
        let now = Utc::now();
        for _ in 0..20 {
            layer.bump_activation(0.1, now);
        }
        assert_eq!(layer.current_activation(now), 1.0);
    }

    async fn write(layer: &MemoryLayer, content: &str, at: DateTime<Utc>) -> (MemoryId, Vec<EvictedItem>) {
        let item_id = layer.write("u1", content).await.unwrap();
        let evicted = layer.admit(item_id, "u1", at);
        layer.delete_evicted(&evicted).await;
        (item_id, evicted)
    }

    #[tokio::test]
    async fn test_eviction_picks_oldest_unreinforced() {
        let (layer, store) = working_layer(2);
        let start = Utc::now();

        let (first, evicted) = write(&layer, "first note", start).await;
        assert!(evicted.is_empty());
        let (second, evicted) = write(&layer, "second note", start + Duration::seconds(10)).await;
        assert!(evicted.is_empty());

        let (third, evicted) = write(&layer, "third note", start + Duration::seconds(20)).await;
        assert_eq!(evicted, vec![EvictedItem { user_id: "u1".to_string(), item_id: first }]);
        assert!(!layer.is_resident(first));
        assert!(layer.is_resident(second));
        assert!(layer.is_resident(third));
        assert_eq!(store.len(MemoryType::Working, "u1"), 2);
    }

    #[tokio::test]
    async fn test_refreshed_item_survives_eviction() {
        let (layer, _store) = working_layer(2);
        let start = Utc::now();

        let (first, _) = write(&layer, "first", start).await;
        let (second, _) = write(&layer, "second", start + Duration::seconds(10)).await;
        layer.refresh_items(&[first], start + Duration::seconds(15));

        let (_, evicted) = write(&layer, "third", start + Duration::seconds(20)).await;
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].item_id, second);
        assert!(layer.is_resident(first));
    }

    #[tokio::test]
    async fn test_store_write_alone_does_not_change_residency() {
        let (layer, store) = working_layer(1);
        let now = Utc::now();

        let (first, _) = write(&layer, "first", now).await;
        let unadmitted = layer.write("u1", "second").await.unwrap();

        assert!(layer.is_resident(first));
        assert!(!layer.is_resident(unadmitted));
        assert_eq!(layer.resident_count(), Some(1));
        assert_eq!(store.len(MemoryType::Working, "u1"), 2);
    }

    #[test]
    fn test_admit_ignores_uncapped_layers() {
        let store = Arc::new(InMemoryStore::new());
        let layer = MemoryLayer::new(MemoryType::Episodic, store, None);
        assert!(layer.admit(MemoryId::new(), "u1", Utc::now()).is_empty());
        assert_eq!(layer.resident_count(), None);
    }

    #[tokio::test]
    async fn test_search_clamps_scores() {
        let store = Arc::new(InMemoryStore::new());
        let layer = MemoryLayer::new(MemoryType::Semantic, store, None);
        layer.write("u1", "blood pressure reading").await.unwrap();

        let hits = layer.search("u1", "blood pressure", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].base_score > 0.0 && hits[0].base_score <= 1.0);
    }
}
