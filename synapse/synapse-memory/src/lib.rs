//! Multi-layer associative memory with cognitive synergy.
//!
//! This crate stores textual knowledge across seven memory layers and
//! coordinates them through a weighted synergy graph.
//!
//! # Architecture
//!
//! 1. **Memory Layers**: one partition per [`MemoryType`], each with its own
//!    decaying activation level; working memory is capacity-bounded
//! 2. **Synergy Graph**: one edge per [`SynergyType`], reinforced by
//!    co-activation and decayed lazily by disuse
//! 3. **Cognitive Context**: per-user situational state that drives routing
//!    and search narrowing
//! 4. **Association Network**: item-level links created by synergy activations
//! 5. **Manager**: parallel fan-out over a bounded worker pool, then synergy
//!    scoring and state updates after the join
//!
//! # Usage
//!
//! ```rust,no_run
//! use synapse_memory::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> synapse_core::error::Result<()> {
//! let manager = CognitiveMemoryManager::new(Arc::new(InMemoryStore::new()));
//!
//! manager.set_cognitive_context(
//!     "doctor_1",
//!     ContextUpdate::new().domain("healthcare").cognitive_load(0.7),
//! )?;
//!
//! let written = manager
//!     .add_with_synergy(
//!         WriteRequest::new("Patient shows symptoms of hypertension", "doctor_1")
//!             .with_memory_types([MemoryType::Semantic, MemoryType::Episodic, MemoryType::Working]),
//!     )
//!     .await?;
//! println!("Stored in {} layers", written.per_layer_item_ids.len());
//!
//! let found = manager
//!     .search_with_synergy(SearchRequest::new("hypertension", "doctor_1"))
//!     .await?;
//! for hit in &found.results {
//!     println!("{} [{}] {:.3}", hit.memory, hit.source_layer, hit.final_score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod association;
pub mod context;
pub mod decay;
pub mod graph;
pub mod layer;
pub mod manager;
pub mod routing;
pub mod store;
pub mod types;

pub use association::{Association, AssociationNetwork};
pub use context::{CognitiveContext, ContextStore, ContextUpdate};
pub use graph::{SynergyEdge, SynergyGraph};
pub use layer::{EvictedItem, MemoryLayer};
pub use manager::CognitiveMemoryManager;
pub use routing::RoutingTable;
pub use store::InMemoryStore;
pub use types::*;

pub use synapse_core::{MemoryId, MemoryType, SynergyType};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::association::{Association, AssociationNetwork};
    pub use crate::context::{CognitiveContext, ContextStore, ContextUpdate};
    pub use crate::graph::{SynergyEdge, SynergyGraph};
    pub use crate::manager::CognitiveMemoryManager;
    pub use crate::routing::RoutingTable;
    pub use crate::store::InMemoryStore;
    pub use crate::types::*;
    pub use synapse_core::prelude::*;
}
