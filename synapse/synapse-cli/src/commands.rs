//! Command implementations for the Synapse CLI.

use crate::Scenario;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use synapse_core::{MemoryType, SynergyConfig};
use synapse_memory::prelude::*;
use tracing::info;

/// A scripted scenario
struct Script {
    user_id: &'static str,
    context: ContextUpdate,
    writes: Vec<(&'static [MemoryType], &'static str)>,
    queries: Vec<&'static str>,
}

const SEMANTIC: &[MemoryType] = &[MemoryType::Semantic, MemoryType::Working];
const EPISODIC: &[MemoryType] = &[MemoryType::Episodic, MemoryType::Working];
const PROCEDURAL: &[MemoryType] = &[MemoryType::Procedural, MemoryType::Working];
const MIXED: &[MemoryType] = &[MemoryType::Semantic, MemoryType::Episodic, MemoryType::Working];

fn script(scenario: Scenario) -> Script {
    match scenario {
        Scenario::Healthcare => Script {
            user_id: "doctor_1",
            context: ContextUpdate::new()
                .domain("healthcare")
                .attention_focus(["patient care", "diagnosis", "treatment planning"])
                .cognitive_load(0.7)
                .emotional_state("focused")
                .active_goals(["accurate diagnosis", "patient safety"]),
            writes: vec![
                (SEMANTIC, "Hypertension means a resting blood pressure persistently above 140/90"),
                (SEMANTIC, "Insulin resistance is the hallmark of type 2 diabetes"),
                (EPISODIC, "Clinic visit: 52 year old with chest pain and raised blood pressure"),
                (EPISODIC, "Follow-up: blood pressure normalised after dose adjustment"),
                (PROCEDURAL, "Measuring blood pressure: seat the patient, fit the cuff, inflate, release slowly"),
                (PROCEDURAL, "Chest pain workup: vitals, ECG within ten minutes, consider aspirin"),
                (MIXED, "Patient shows symptoms of hypertension"),
            ],
            queries: vec!["chest pain with high blood pressure", "diabetes follow-up"],
        },
        Scenario::Education => Script {
            user_id: "student_1",
            context: ContextUpdate::new()
                .domain("mathematics")
                .attention_focus(["quadratic equations", "problem solving"])
                .cognitive_load(0.5)
                .emotional_state("curious")
                .active_goals(["master quadratic equations"]),
            writes: vec![
                (SEMANTIC, "A quadratic equation has the form ax^2 + bx + c = 0 with a not zero"),
                (SEMANTIC, "The discriminant b^2 - 4ac decides how many real roots exist"),
                (EPISODIC, "Factored x^2 - 5x + 6 into (x - 2)(x - 3) after two attempts"),
                (EPISODIC, "Lost marks for dropping the plus-minus sign in the quadratic formula"),
                (PROCEDURAL, "Quadratic formula: identify a b c, compute the discriminant, apply, simplify"),
                (PROCEDURAL, "Completing the square: divide by a, move c, add (b/2)^2, factor"),
            ],
            queries: vec!["how to solve a quadratic equation", "discriminant roots"],
        },
    }
}

#[derive(Serialize)]
struct DemoReport {
    user_id: String,
    context: CognitiveContext,
    writes: Vec<WriteResult>,
    searches: Vec<QueryReport>,
    state: CognitiveState,
}

#[derive(Serialize)]
struct QueryReport {
    query: String,
    result: SearchResult,
}

/// Run a scripted scenario on an in-memory store
pub async fn demo(config: SynergyConfig, scenario: Scenario) -> Result<()> {
    let manager = CognitiveMemoryManager::with_config(Arc::new(InMemoryStore::new()), config)?;
    let script = script(scenario);
    info!(scenario = ?scenario, user_id = script.user_id, "Running demo scenario");

    let context = manager.set_cognitive_context(script.user_id, script.context)?;

    let mut writes = Vec::with_capacity(script.writes.len());
    for (layers, content) in script.writes {
        let request = WriteRequest::new(content, script.user_id).with_memory_types(layers.iter().copied());
        writes.push(manager.add_with_synergy(request).await?);
    }

    // Without explicit layers the write is routed from the context
    let routed = WriteRequest::new("Note for the next session", script.user_id);
    writes.push(manager.add_with_synergy(routed).await?);

    let mut searches = Vec::with_capacity(script.queries.len());
    for query in script.queries {
        let result = manager
            .search_with_synergy(SearchRequest::new(query, script.user_id).with_limit(5))
            .await?;
        searches.push(QueryReport {
            query: query.to_string(),
            result,
        });
    }

    let report = DemoReport {
        user_id: script.user_id.to_string(),
        context,
        writes,
        searches,
        state: manager.get_cognitive_state(script.user_id),
    };
    manager.shutdown();

    print_json(&report)
}

#[derive(Serialize)]
struct RouteReport {
    domain: Option<String>,
    attention_focus: Vec<String>,
    content: String,
    layers: Vec<MemoryType>,
}

/// Show the routing decision for a context and content
pub fn route(config: &SynergyConfig, domain: Option<String>, focus: Vec<String>, content: &str) -> Result<()> {
    let table = RoutingTable::from_config(&config.routing);
    let mut context = CognitiveContext::new("cli").with_attention_focus(focus);
    context.domain = domain;

    print_json(&RouteReport {
        layers: table.route(&context, content),
        domain: context.domain,
        attention_focus: context.attention_focus,
        content: content.to_string(),
    })
}

/// Print the state a fresh manager reports for a user
pub fn state(config: SynergyConfig, user_id: &str) -> Result<()> {
    let manager = CognitiveMemoryManager::with_config(Arc::new(InMemoryStore::new()), config)?;
    print_json(&manager.get_cognitive_state(user_id))
}

/// Write the default configuration
pub async fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    SynergyConfig::default()
        .save_to_path(path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scenario_is_valid() {
        for scenario in [Scenario::Healthcare, Scenario::Education] {
            let script = script(scenario);
            assert!(!script.writes.is_empty());
            assert!(!script.queries.is_empty());
            assert!(script.writes.iter().all(|(layers, content)| !layers.is_empty() && !content.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_demo_runs() {
        demo(SynergyConfig::default(), Scenario::Education).await.unwrap();
    }

    #[tokio::test]
    async fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synapse.toml");

        config_init(&path, false).await.unwrap();
        assert!(config_init(&path, false).await.is_err());
        config_init(&path, true).await.unwrap();

        let loaded = SynergyConfig::load_from_path(&path).await.unwrap();
        assert_eq!(loaded.max_parallel_layers, SynergyConfig::default().max_parallel_layers);
    }
}
