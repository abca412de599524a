//! Core types and abstractions for the Synapse associative memory orchestrator.
//!
//! This crate provides the shared vocabulary used across Synapse components:
//! memory layer and synergy enumerations, item identifiers, the error type,
//! configuration, the injectable clock, and the base memory store trait.

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{InitialStrengths, RoutingConfig, SynergyConfig};
pub use error::{LayerFailure, LayerFailureKind, LayerOperation, Result, SynapseError};
pub use id::MemoryId;
pub use traits::{MemoryStore, StoreHit};
pub use types::{LayerPriority, MemoryType, SynergyType};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{InitialStrengths, RoutingConfig, SynergyConfig};
    pub use crate::error::{LayerFailure, LayerFailureKind, LayerOperation, Result, SynapseError};
    pub use crate::id::MemoryId;
    pub use crate::traits::{MemoryStore, StoreHit};
    pub use crate::types::{LayerPriority, MemoryType, SynergyType};
}
