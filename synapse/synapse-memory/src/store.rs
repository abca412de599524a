//! In-process base memory store.
//!
//! Scores hits by the fraction of query terms present in the stored text.
//! Useful for demos and tests; production deployments inject a store backed
//! by an embedding index.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use synapse_core::error::Result;
use synapse_core::{MemoryId, MemoryStore, MemoryType, StoreHit};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredItem {
    id: MemoryId,
    content: String,
    terms: HashSet<String>,
}

/// Keyword-overlap store partitioned by layer and user
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: DashMap<(MemoryType, String), Vec<StoredItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items held for a user in a layer
    pub fn len(&self, layer: MemoryType, user_id: &str) -> usize {
        self.items
            .get(&(layer, user_id.to_string()))
            .map(|items| items.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|entry| entry.value().is_empty())
    }

    /// Stored content by id
    pub fn get(&self, layer: MemoryType, user_id: &str, item_id: MemoryId) -> Option<String> {
        self.items.get(&(layer, user_id.to_string())).and_then(|items| {
            items
                .iter()
                .find(|item| item.id == item_id)
                .map(|item| item.content.clone())
        })
    }
}

/// Lowercased alphanumeric terms of two characters or more
pub fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn write(&self, layer: MemoryType, user_id: &str, content: &str) -> Result<MemoryId> {
        let item = StoredItem {
            id: MemoryId::new(),
            content: content.to_string(),
            terms: terms(content),
        };
        let id = item.id;
        self.items
            .entry((layer, user_id.to_string()))
            .or_default()
            .push(item);
        Ok(id)
    }

    async fn search(
        &self,
        layer: MemoryType,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<StoreHit>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let Some(items) = self.items.get(&(layer, user_id.to_string())) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<StoreHit> = items
            .iter()
            .filter_map(|item| {
                let matched = query_terms.intersection(&item.terms).count();
                (matched > 0).then(|| StoreHit {
                    item_id: item.id,
                    content: item.content.clone(),
                    base_score: matched as f64 / query_terms.len() as f64,
                })
            })
            .collect();

        // Stable: equal scores keep insertion order
        hits.sort_by(|a, b| b.base_score.total_cmp(&a.base_score));
        hits.truncate(limit);

        debug!(layer = %layer, user_id = %user_id, hits = hits.len(), "In-memory search");
        Ok(hits)
    }

    async fn delete(&self, layer: MemoryType, user_id: &str, item_id: MemoryId) -> Result<bool> {
        let Some(mut items) = self.items.get_mut(&(layer, user_id.to_string())) else {
            return Ok(false);
        };
        let before = items.len();
        items.retain(|item| item.id != item_id);
        Ok(items.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_search() {
        let store = InMemoryStore::new();
        store
            .write(MemoryType::Semantic, "u1", "Hypertension is high blood pressure")
            .await
            .unwrap();
        store
            .write(MemoryType::Semantic, "u1", "Diabetes affects insulin")
            .await
            .unwrap();

        let hits = store
            .search(MemoryType::Semantic, "u1", "blood pressure", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].base_score, 1.0);
        assert!(hits[0].content.contains("Hypertension"));
    }

    #[tokio::test]
    async fn test_partitioned_by_layer_and_user() {
        let store = InMemoryStore::new();
        store.write(MemoryType::Semantic, "u1", "shared words").await.unwrap();

        assert!(store.search(MemoryType::Episodic, "u1", "shared", 10).await.unwrap().is_empty());
        assert!(store.search(MemoryType::Semantic, "u2", "shared", 10).await.unwrap().is_empty());
        assert_eq!(store.len(MemoryType::Semantic, "u1"), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let id = store.write(MemoryType::Working, "u1", "scratch").await.unwrap();
        assert!(store.delete(MemoryType::Working, "u1", id).await.unwrap());
        assert!(!store.delete(MemoryType::Working, "u1", id).await.unwrap());
        assert!(store.get(MemoryType::Working, "u1", id).is_none());
    }

    #[test]
    fn test_terms() {
        let t = terms("To measure BP: 1) inflate, 2) release!");
        assert!(t.contains("measure"));
        assert!(t.contains("bp"));
        assert!(!t.contains("1"));
    }
}
