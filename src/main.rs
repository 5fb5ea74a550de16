use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use lexigraph::cache::ExtractionCache;
use lexigraph::extract::{extract_text, PatternExtractor};
use lexigraph::graph::KnowledgeGraph;
use lexigraph::query::QueryEngine;
use lexigraph::resolve::{matcher_from_name, normalize_candidates, resolve_mentions};
use lexigraph::Config;

#[derive(Parser, Debug)]
#[command(name = "lexigraph")]
#[command(about = "Build and query knowledge graphs from free text")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a knowledge graph from a text file
    Process {
        /// Input text file
        file: PathBuf,
        /// Write the resulting graph snapshot here
        #[arg(short, long)]
        save: Option<PathBuf>,
    },
    /// Run a single query against a saved graph snapshot
    Query {
        /// Graph snapshot file (JSON)
        snapshot: PathBuf,
        /// The query, e.g. find Alice
        command: Vec<String>,
    },
    /// Interactive query loop over a saved graph snapshot
    Repl {
        /// Graph snapshot file (JSON)
        snapshot: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();

    match args.command {
        Command::Process { file, save } => run_process(&file, save.as_deref()).await,
        Command::Query { snapshot, command } => run_query(&snapshot, &command.join(" ")),
        Command::Repl { snapshot } => run_repl(&snapshot),
    }
}

async fn run_process(file: &std::path::Path, save: Option<&std::path::Path>) -> Result<()> {
    log::info!("Starting Lexigraph v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");

    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read input file: {}", file.display()))?;

    let cache = if config.cache.enabled {
        Some(
            ExtractionCache::new(config.cache_dir(), config.cache.max_size)
                .with_context(|| format!("Failed to open cache at {}", config.cache_dir().display()))?,
        )
    } else {
        None
    };

    let extractor = Arc::new(
        PatternExtractor::new(&config.extraction).context("Failed to build pattern extractor")?,
    );

    log::info!("Extracting from {}", file.display());
    let batch = extract_text(&text, extractor, cache.as_ref(), &config.extraction).await;
    log::info!(
        "Extracted {} mention(s), {} relation candidate(s)",
        batch.mentions.len(),
        batch.candidates.len()
    );

    let entities = resolve_mentions(batch.mentions);
    log::info!("Resolved {} canonical entit(ies)", entities.len());

    let matcher = matcher_from_name(&config.extraction.endpoint_matching);
    let relations = normalize_candidates(
        &batch.candidates,
        &entities,
        matcher.as_ref(),
        config.extraction.strict_endpoints,
    )?;
    log::info!("Normalized {} relation(s)", relations.len());

    let mut graph = KnowledgeGraph::new();
    for entity in entities.into_entities() {
        graph.add_entity(entity);
    }
    for relation in relations {
        if let Err(e) = graph.add_relation(relation) {
            log::warn!("Skipping relation: {}", e);
        }
    }

    let summary = graph.summary();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = save {
        graph
            .save(path)
            .with_context(|| format!("Failed to save graph to {}", path.display()))?;
        log::info!("Graph saved to {}", path.display());
    }

    Ok(())
}

fn run_query(snapshot: &std::path::Path, command: &str) -> Result<()> {
    let graph = KnowledgeGraph::load(snapshot)
        .with_context(|| format!("Failed to load graph from {}", snapshot.display()))?;
    let engine = QueryEngine::new(&graph);
    let response = engine.execute(command);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn run_repl(snapshot: &std::path::Path) -> Result<()> {
    let graph = KnowledgeGraph::load(snapshot)
        .with_context(|| format!("Failed to load graph from {}", snapshot.display()))?;
    let engine = QueryEngine::new(&graph);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    log::info!(
        "Loaded graph: {} entities, {} relations. Type 'help' for commands, 'exit' to quit.",
        graph.num_entities(),
        graph.num_relations()
    );

    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        let response = engine.execute(line);
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    Ok(())
}
