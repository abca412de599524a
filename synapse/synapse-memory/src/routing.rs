//! Context-driven layer routing.
//!
//! Writes that do not name their layers are routed through a [`RoutingTable`]
//! built from [`RoutingConfig`]. The table is plain data: a domain lookup,
//! attention-focus keywords and content keywords, so the policy can be
//! inspected and tested without running a write.

use crate::context::CognitiveContext;
use std::collections::{BTreeMap, BTreeSet};
use synapse_core::{MemoryType, RoutingConfig};

/// Inspectable mapping from a cognitive context to the layers a write touches
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    default_layers: BTreeSet<MemoryType>,
    always_include_working: bool,
    domains: BTreeMap<String, BTreeSet<MemoryType>>,
    focus_keywords: BTreeMap<String, BTreeSet<MemoryType>>,
    content_keywords: BTreeMap<String, BTreeSet<MemoryType>>,
}

impl RoutingTable {
    pub fn from_config(config: &RoutingConfig) -> Self {
        let normalize = |map: &BTreeMap<String, Vec<MemoryType>>| {
            map.iter()
                .map(|(key, layers)| (key.trim().to_lowercase(), layers.iter().copied().collect()))
                .collect()
        };

        Self {
            default_layers: config.default_layers.iter().copied().collect(),
            always_include_working: config.always_include_working,
            domains: normalize(&config.domains),
            focus_keywords: normalize(&config.focus_keywords),
            content_keywords: normalize(&config.content_keywords),
        }
    }

    /// Layers for writing `content` under `context`, in enum order.
    ///
    /// The domain entry, every focus keyword contained in an attention focus
    /// and every content keyword appearing as a whole word in `content`
    /// contribute layers. With no match the default layers apply.
    pub fn route(&self, context: &CognitiveContext, content: &str) -> Vec<MemoryType> {
        let mut layers = BTreeSet::new();

        if let Some(mapped) = context.domain.as_deref().and_then(|d| self.domains.get(&d.trim().to_lowercase())) {
            layers.extend(mapped.iter().copied());
        }

        for focus in &context.attention_focus {
            let focus = focus.to_lowercase();
            for (keyword, mapped) in &self.focus_keywords {
                if focus.contains(keyword.as_str()) {
                    layers.extend(mapped.iter().copied());
                }
            }
        }

        for word in words(content) {
            if let Some(mapped) = self.content_keywords.get(&word) {
                layers.extend(mapped.iter().copied());
            }
        }

        if layers.is_empty() {
            layers.extend(self.default_layers.iter().copied());
        } else if self.always_include_working {
            layers.insert(MemoryType::Working);
        }

        layers.into_iter().collect()
    }

    pub fn default_layers(&self) -> Vec<MemoryType> {
        self.default_layers.iter().copied().collect()
    }

    /// Layers mapped to a domain, if it has an entry
    pub fn domain_layers(&self, domain: &str) -> Option<Vec<MemoryType>> {
        self.domains
            .get(&domain.trim().to_lowercase())
            .map(|layers| layers.iter().copied().collect())
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn focus_keywords(&self) -> impl Iterator<Item = &str> {
        self.focus_keywords.keys().map(String::as_str)
    }

    pub fn content_keywords(&self) -> impl Iterator<Item = &str> {
        self.content_keywords.keys().map(String::as_str)
    }
}

/// Lowercased alphanumeric words of `text`
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}
