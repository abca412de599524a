//! Cross-layer associations between stored items.
//!
//! Associations are undirected and kept per user. Recording an existing
//! association keeps the larger of the two strengths, so repeating the same
//! activation cannot grow a link without bound.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use synapse_core::MemoryId;
use tracing::debug;

/// A link between two stored items in different layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Association {
    pub source_item_id: MemoryId,
    pub target_item_id: MemoryId,
    pub strength: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct UserAssociations {
    links: HashMap<(MemoryId, MemoryId), Association>,
    adjacency: HashMap<MemoryId, BTreeSet<MemoryId>>,
}

impl UserAssociations {
    fn unlink(&mut self, a: MemoryId, b: MemoryId) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(neighbors) = self.adjacency.get_mut(&from) {
                neighbors.remove(&to);
                if neighbors.is_empty() {
                    self.adjacency.remove(&from);
                }
            }
        }
    }
}

fn key(a: MemoryId, b: MemoryId) -> (MemoryId, MemoryId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Per-user association network
#[derive(Debug, Default)]
pub struct AssociationNetwork {
    users: DashMap<String, Arc<RwLock<UserAssociations>>>,
}

impl AssociationNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn user(&self, user_id: &str) -> Option<Arc<RwLock<UserAssociations>>> {
        self.users.get(user_id).map(|e| e.value().clone())
    }

    /// Add or reinforce an association.
    ///
    /// Strength is clamped to `[0, 1]`; an existing link keeps the maximum of
    /// its strength and the new one. Self-links are ignored.
    pub fn record(
        &self,
        user_id: &str,
        source_id: MemoryId,
        target_id: MemoryId,
        strength: f64,
        now: DateTime<Utc>,
    ) -> Option<Association> {
        if source_id == target_id {
            return None;
        }
        let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };

        let network = self
            .users
            .entry(user_id.to_string())
            .or_default()
            .value()
            .clone();
        let mut network = network.write();

        let association = network
            .links
            .entry(key(source_id, target_id))
            .and_modify(|existing| existing.strength = existing.strength.max(strength))
            .or_insert_with(|| Association {
                source_item_id: source_id,
                target_item_id: target_id,
                strength,
                created_at: now,
            })
            .clone();

        network.adjacency.entry(source_id).or_default().insert(target_id);
        network.adjacency.entry(target_id).or_default().insert(source_id);

        debug!(user_id = %user_id, %source_id, %target_id, strength = association.strength, "Recorded association");
        Some(association)
    }

    /// Association between two items, in either direction
    pub fn get(&self, user_id: &str, a: MemoryId, b: MemoryId) -> Option<Association> {
        self.user(user_id)
            .and_then(|network| network.read().links.get(&key(a, b)).cloned())
    }

    /// Items directly associated with `item_id`
    pub fn neighbors(&self, user_id: &str, item_id: MemoryId) -> BTreeSet<MemoryId> {
        self.user(user_id)
            .and_then(|network| network.read().adjacency.get(&item_id).cloned())
            .unwrap_or_default()
    }

    /// Remove a user's associations weaker than `min_strength`
    pub fn prune(&self, user_id: &str, min_strength: f64) -> usize {
        let Some(network) = self.user(user_id) else {
            return 0;
        };
        let mut network = network.write();

        let weak: Vec<(MemoryId, MemoryId)> = network
            .links
            .iter()
            .filter(|(_, a)| a.strength < min_strength)
            .map(|(k, _)| *k)
            .collect();

        for (a, b) in &weak {
            network.links.remove(&(*a, *b));
            network.unlink(*a, *b);
        }

        if !weak.is_empty() {
            debug!(user_id = %user_id, pruned = weak.len(), min_strength, "Pruned associations");
        }
        weak.len()
    }

    /// Drop every association touching an item that no longer exists
    pub fn remove_item(&self, user_id: &str, item_id: MemoryId) -> usize {
        let Some(network) = self.user(user_id) else {
            return 0;
        };
        let mut network = network.write();
        let Some(neighbors) = network.adjacency.remove(&item_id) else {
            return 0;
        };
        for neighbor in &neighbors {
            network.links.remove(&key(item_id, *neighbor));
            network.unlink(item_id, *neighbor);
        }
        neighbors.len()
    }

    /// Number of associations held for a user
    pub fn count(&self, user_id: &str) -> usize {
        self.user(user_id)
            .map(|network| network.read().links.len())
            .unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.users.iter().map(|e| e.value().read().links.len()).sum()
    }
}
