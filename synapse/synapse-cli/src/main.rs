//! Synapse CLI - demo scenarios and inspection for the synergy orchestrator.
//!
//! # Usage
//!
//! ```bash
//! # Run a scripted scenario against an in-memory store
//! synapse demo healthcare
//!
//! # Show which layers a context routes writes to
//! synapse route --domain healthcare --focus "patient history" --content "what happened yesterday"
//!
//! # Show the initial cognitive state
//! synapse state doctor_1
//!
//! # Write a default configuration file
//! synapse config init synapse.toml
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use synapse_core::SynergyConfig;

#[derive(Parser)]
#[command(name = "synapse")]
#[command(about = "Synapse - multi-layer associative memory with cognitive synergy", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SYNAPSE_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted scenario and print every result as JSON
    Demo {
        #[arg(value_enum)]
        scenario: Scenario,
    },

    /// Show the layers a write would be routed to
    Route {
        #[arg(long)]
        domain: Option<String>,

        /// Attention focus, most relevant first (repeatable)
        #[arg(long = "focus")]
        focus: Vec<String>,

        /// Content to be written
        #[arg(long, default_value = "")]
        content: String,
    },

    /// Print the cognitive state of a user on a fresh manager
    State {
        user_id: String,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration to a file
    Init {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Scenario {
    Healthcare,
    Education,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).await?;
    init_logging(cli.verbose, cli.json_logs, &config.log_level);

    match cli.command {
        Commands::Demo { scenario } => commands::demo(config, scenario).await?,
        Commands::Route { domain, focus, content } => commands::route(&config, domain, focus, &content)?,
        Commands::State { user_id } => commands::state(config, &user_id)?,
        Commands::Config(ConfigCommands::Init { path, force }) => commands::config_init(&path, force).await?,
        Commands::Config(ConfigCommands::Show { path }) => {
            let config = match path {
                Some(path) => load_config(Some(&path)).await?,
                None => config,
            };
            commands::print_json(&config)?;
        }
    }

    Ok(())
}

async fn load_config(path: Option<&std::path::Path>) -> Result<SynergyConfig> {
    let config = match path {
        Some(path) => SynergyConfig::load_from_path(path).await?,
        None => {
            let mut config = SynergyConfig::default();
            config.merge_env_vars()?;
            config.validate()?;
            config
        }
    };
    Ok(config)
}

/// Initialize logging
fn init_logging(verbose: bool, json: bool, level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("synapse_memory=debug,synapse_core=debug,synapse=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "synapse_memory={level},synapse_core={level},synapse={level},warn"
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
