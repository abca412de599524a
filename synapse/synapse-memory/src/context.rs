//! Per-user cognitive context.
//!
//! Contexts are held in an explicit [`ContextStore`] that the manager is
//! given at construction. Reads of an unknown user return a default context
//! and never create state; updates use partial-update semantics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Cognitive load assumed when nothing else is known
pub const DEFAULT_COGNITIVE_LOAD: f64 = 0.5;

/// Situational parameters of one user that shape routing and scoring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CognitiveContext {
    pub user_id: String,
    pub session_id: Option<String>,
    pub domain: Option<String>,
    /// Most relevant first
    pub attention_focus: Vec<String>,
    /// Always within `[0, 1]`
    pub cognitive_load: f64,
    pub emotional_state: Option<String>,
    pub active_goals: BTreeSet<String>,
    pub temporal_context: Option<DateTime<Utc>>,
}

impl CognitiveContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
            domain: None,
            attention_focus: Vec::new(),
            cognitive_load: DEFAULT_COGNITIVE_LOAD,
            emotional_state: None,
            active_goals: BTreeSet::new(),
            temporal_context: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_attention_focus<I, S>(mut self, focus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attention_focus = focus.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cognitive_load(mut self, load: f64) -> Self {
        self.cognitive_load = clamp_load(load);
        self
    }
}

/// Clamp a cognitive load into `[0, 1]`; NaN becomes the default load
pub fn clamp_load(load: f64) -> f64 {
    if load.is_nan() {
        DEFAULT_COGNITIVE_LOAD
    } else {
        load.clamp(0.0, 1.0)
    }
}

/// Partial update of a [`CognitiveContext`]; unset fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextUpdate {
    pub session_id: Option<String>,
    pub domain: Option<String>,
    pub attention_focus: Option<Vec<String>>,
    pub cognitive_load: Option<f64>,
    pub emotional_state: Option<String>,
    pub active_goals: Option<BTreeSet<String>>,
    pub temporal_context: Option<DateTime<Utc>>,
}

impl ContextUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn attention_focus<I, S>(mut self, focus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attention_focus = Some(focus.into_iter().map(Into::into).collect());
        self
    }

    pub fn cognitive_load(mut self, load: f64) -> Self {
        self.cognitive_load = Some(load);
        self
    }

    pub fn emotional_state(mut self, state: impl Into<String>) -> Self {
        self.emotional_state = Some(state.into());
        self
    }

    pub fn active_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_goals = Some(goals.into_iter().map(Into::into).collect());
        self
    }

    pub fn temporal_context(mut self, at: DateTime<Utc>) -> Self {
        self.temporal_context = Some(at);
        self
    }

    /// Apply the set fields to `context`
    pub fn apply(&self, context: &mut CognitiveContext) {
        if let Some(session_id) = &self.session_id {
            context.session_id = Some(session_id.clone());
        }
        if let Some(domain) = &self.domain {
            context.domain = Some(domain.clone());
        }
        if let Some(focus) = &self.attention_focus {
            context.attention_focus = focus.clone();
        }
        if let Some(load) = self.cognitive_load {
            context.cognitive_load = clamp_load(load);
        }
        if let Some(state) = &self.emotional_state {
            context.emotional_state = Some(state.clone());
        }
        if let Some(goals) = &self.active_goals {
            context.active_goals = goals.clone();
        }
        if let Some(at) = self.temporal_context {
            context.temporal_context = Some(at);
        }
    }
}

/// Process-wide contexts keyed by user.
///
/// Each user's context sits behind its own lock: updates for one user are
/// serialised, other users are never blocked by them.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: DashMap<String, Arc<RwLock<CognitiveContext>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current context for a user, or a default one if none was set
    pub fn get(&self, user_id: &str) -> CognitiveContext {
        let entry = self.contexts.get(user_id).map(|e| e.value().clone());
        match entry {
            Some(context) => context.read().clone(),
            None => CognitiveContext::new(user_id),
        }
    }

    /// Apply a partial update, creating the context on first use
    pub fn update(&self, user_id: &str, update: &ContextUpdate) -> CognitiveContext {
        let context = self
            .contexts
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(CognitiveContext::new(user_id))))
            .value()
            .clone();

        let mut context = context.write();
        update.apply(&mut context);
        debug!(user_id = %user_id, load = context.cognitive_load, "Updated cognitive context");
        context.clone()
    }

    /// Forget a user's context; returns whether one existed
    pub fn reset(&self, user_id: &str) -> bool {
        self.contexts.remove(user_id).is_some()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.contexts.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Users with a stored context, sorted
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.contexts.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }
}
