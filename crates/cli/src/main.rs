use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codemap_graph::GraphIndex;
use codemap_indexer::{IndexOutcome, IndexerConfig, ProjectIndexer};
use std::fs;
use std::path::{Path, PathBuf};

mod inspect;

#[derive(Parser)]
#[command(name = "codemap")]
#[command(about = "Code-structure graph for Python projects", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project graph and write it as JSON
    Index(IndexArgs),

    /// Show one node with its callers, callees, children and imports
    Inspect(InspectArgs),
}

/// Options shared by every command that builds a graph
#[derive(Args)]
struct BuildArgs {
    /// Project root directory
    root: PathBuf,

    /// Config file (defaults to codemap.toml in the project root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Files visited in parallel (overrides config and CODEMAP_CONCURRENCY)
    #[arg(long, short = 'j')]
    concurrency: Option<usize>,

    /// Stop scheduling files after the first unreadable or unplaceable one
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Args)]
struct IndexArgs {
    #[command(flatten)]
    build: BuildArgs,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,

    /// Emit {graph, diagnostics, stats} instead of the bare graph document
    #[arg(long)]
    with_diagnostics: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    build: BuildArgs,

    /// Fully qualified node id, e.g. pkg.mod.Class.method
    node_id: String,

    /// Traversal depth for related nodes
    #[arg(long, short = 'd', default_value_t = 2)]
    depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Index(args) => run_index(args).await?,
        Commands::Inspect(args) => run_inspect(args).await?,
    }

    Ok(())
}

async fn run_index(args: IndexArgs) -> Result<()> {
    let outcome = build_graph(&args.build).await?;

    let json = if args.with_diagnostics {
        outcome.to_json(args.pretty)?
    } else {
        outcome.graph.to_json(args.pretty)?
    };

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Graph written to {}", path.display());
        }
        None => println!("{json}"),
    }

    for diagnostic in &outcome.diagnostics {
        log::debug!("{diagnostic}");
    }
    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let outcome = build_graph(&args.build).await?;
    let index = GraphIndex::new(&outcome.graph);
    let report = inspect::inspect(&index, &args.node_id, args.depth)
        .with_context(|| format!("Cannot inspect {}", args.node_id))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn build_graph(args: &BuildArgs) -> Result<IndexOutcome> {
    let config = load_config(&args.root, args)?;
    let indexer = ProjectIndexer::new(&args.root, config)
        .await
        .with_context(|| format!("Cannot index {}", args.root.display()))?;
    let outcome = indexer.build().await.context("Indexing failed")?;

    if outcome.is_aborted() {
        log::warn!("Run aborted early; the graph is partial");
    }
    if !outcome.diagnostics.is_empty() {
        log::info!("{} diagnostics", outcome.diagnostics.len());
    }
    Ok(outcome)
}

/// Defaults < config file < environment < flags
fn load_config(root: &Path, args: &BuildArgs) -> Result<IndexerConfig> {
    let mut config = IndexerConfig::load(root, args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
