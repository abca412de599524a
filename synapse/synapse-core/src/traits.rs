//! Interfaces to collaborators that live outside the orchestrator.

use crate::error::Result;
use crate::id::MemoryId;
use crate::types::MemoryType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One hit returned by a base store search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreHit {
    pub item_id: MemoryId,
    pub content: String,
    /// Relevance of the item to the query, in `[0, 1]`
    pub base_score: f64,
}

/// Base memory store used by every layer for content persistence and search.
///
/// Embedding, indexing and similarity search all happen behind this trait.
/// Errors are treated as failures of the calling layer only.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist content in a layer and return its identifier
    async fn write(&self, layer: MemoryType, user_id: &str, content: &str) -> Result<MemoryId>;

    /// Search a layer, best hit first
    async fn search(
        &self,
        layer: MemoryType,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<StoreHit>>;

    /// Delete an item; returns false if it was not present
    async fn delete(&self, layer: MemoryType, user_id: &str, item_id: MemoryId) -> Result<bool>;
}
