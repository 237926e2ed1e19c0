//! interpose - inspect plugin configs and run executor scripts through them
//!
//! Usage:
//!   interpose check --config plugins.toml                     → list observers and methods
//!   interpose run --config plugins.toml --script steps.json   → run a script, one JSON line per step
//!   interpose version                                         → show version

use anyhow::Context;
use clap::{Parser, Subcommand};
use interpose::script::Script;
use interpose::session::{executor, Configuration};
use interpose::MemoryDatabase;
use interpose_core::{ObserverChain, Role};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "interpose",
    about = "Observer chains for SQL mapper core objects",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plugin config and show what each observer intercepts
    Check {
        /// Plugin config (TOML, or JSON with a .json extension)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run an executor script against an in-memory database
    Run {
        /// Plugin config; omit to run without observers
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Script file (JSON)
        #[arg(short, long)]
        script: PathBuf,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Check { config } => check(&config)?,
        Commands::Run { config, script } => run(config.as_deref(), &script)?,
        Commands::Version => println!("interpose v{}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "interpose=info,interpose_core=info,interpose_plugins=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_chain(path: &Path) -> anyhow::Result<ObserverChain> {
    interpose_plugins::load_chain(path)
        .with_context(|| format!("loading plugin config {}", path.display()))
}

fn check(path: &Path) -> anyhow::Result<()> {
    let chain = load_chain(path)?;
    if chain.is_empty() {
        println!("no observers enabled");
        return Ok(());
    }
    for (i, binding) in chain.list().iter().enumerate() {
        println!("{}. {}", i + 1, binding.name());
        for role in Role::ALL {
            for method in binding.signatures().methods(role) {
                println!("     {}", method);
            }
        }
    }
    Ok(())
}

fn run(config: Option<&Path>, script_path: &Path) -> anyhow::Result<()> {
    let chain = match config {
        Some(path) => load_chain(path)?,
        None => ObserverChain::new(),
    };
    let script = Script::load(script_path)
        .with_context(|| format!("loading script {}", script_path.display()))?;

    let database = script
        .tables
        .iter()
        .fold(MemoryDatabase::new(), |db, (name, rows)| {
            db.with_table(name.clone(), rows.clone())
        });
    let configuration = Configuration::new(chain.freeze(), Arc::new(database));
    let handle = configuration.new_executor();
    let executor = executor(&handle)?;

    let outcomes = script.run(executor);
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }
    tracing::info!(steps = outcomes.len(), failed, "script finished");
    Ok(())
}
