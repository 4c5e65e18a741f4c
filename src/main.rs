//! LexGraph CLI: build, inspect and query the case knowledge graph

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use lexgraph::embed::client::EmbeddingClient;
use lexgraph::{
    load_cases_from_path, CaseRecord, Embedder, GraphService, HashingEmbedder, LexGraphConfig, NodeKey,
    SearchMode, SearchOrchestrator, SearchRequest,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Dimensions of the offline hashing embedder
const LOCAL_EMBEDDING_DIM: usize = 256;

#[derive(Parser)]
#[command(name = "lexgraph", version, about = "Graph-enhanced legal case retrieval")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "LEXGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Similarity,
    Graphrag,
    Combined,
    CaseNumber,
    Judge,
    CaseType,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Similarity => SearchMode::Similarity,
            ModeArg::Graphrag => SearchMode::GraphRag,
            ModeArg::Combined => SearchMode::Combined,
            ModeArg::CaseNumber => SearchMode::CaseNumber,
            ModeArg::Judge => SearchMode::Judge,
            ModeArg::CaseType => SearchMode::CaseType,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or reuse) the snapshot for a case file or folder
    Build {
        cases: PathBuf,
    },
    /// Print graph statistics
    Stats {
        cases: PathBuf,
    },
    /// Search cases
    Search {
        cases: PathBuf,
        query: String,

        #[arg(long, value_enum, default_value = "combined")]
        mode: ModeArg,

        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,

        /// Also return cases decided by this judge
        #[arg(long)]
        judge: Option<String>,

        /// Also return cases of this type
        #[arg(long)]
        case_type: Option<String>,
    },
    /// Explain how a case relates to a query
    Explain {
        cases: PathBuf,
        case_id: String,

        #[arg(long, default_value = "")]
        query: String,
    },
    /// Cases most connected to an entity, e.g. `judge:สมชาย`
    Recommend {
        cases: PathBuf,
        entity: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = LexGraphConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Build { cases } => {
            let (service, outcome) = open_service(config, &cases)?;
            print_json_or(&cli.format, &outcome, || println!("Rebuild: {:?}", outcome))?;
            info!("Serving snapshot {}", service.snapshot().content_hash());
        }
        Commands::Stats { cases } => {
            let (service, _) = open_service(config, &cases)?;
            let stats = service.stats();
            print_json_or(&cli.format, &stats, || {
                let mut table = Table::new();
                table.set_header(vec!["metric", "value"]);
                table.add_row(vec!["nodes".to_string(), stats.node_count.to_string()]);
                table.add_row(vec!["edges".to_string(), stats.edge_count.to_string()]);
                table.add_row(vec!["communities".to_string(), stats.community_count.to_string()]);
                table.add_row(vec!["avg community size".to_string(), format!("{:.2}", stats.avg_community_size)]);
                table.add_row(vec!["average degree".to_string(), format!("{:.2}", stats.average_degree)]);
                table.add_row(vec!["density".to_string(), format!("{:.5}", stats.density)]);
                table.add_row(vec!["modularity".to_string(), format!("{:.4}", stats.modularity)]);
                for (kind, count) in &stats.nodes_by_kind {
                    table.add_row(vec![format!("{} nodes", kind), count.to_string()]);
                }
                for (kind, count) in &stats.edges_by_kind {
                    table.add_row(vec![format!("{} edges", kind), count.to_string()]);
                }
                table.add_row(vec!["content hash".to_string(), stats.content_hash.clone()]);
                println!("{}", table);
            })?;
        }
        Commands::Search {
            cases,
            query,
            mode,
            k,
            judge,
            case_type,
        } => {
            let records = load_cases(&cases)?;
            let embedder = embedder_for(&config)?;
            let search = SearchOrchestrator::new(Arc::clone(&embedder), config.search.clone(), config.retrieval.clone());
            let (service, _) = GraphService::open(config, &records)?;
            let index = lexgraph::vector::index_cases(embedder.as_ref(), &records)
                .await
                .context("indexing case embeddings")?;

            let mut request = SearchRequest::new(query).with_mode(mode.into());
            request.k = k;
            request.judge = judge;
            request.case_type = case_type;
            let response = search.search(&service.snapshot(), &index, &request).await;

            print_json_or(&cli.format, &response, || {
                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["#", "case", "score", "source", "vector", "graph", "community"]);
                for (rank, hit) in response.hits.iter().enumerate() {
                    let (v, g, c) = hit.breakdown.map_or((String::new(), String::new(), String::new()), |b| {
                        (
                            format!("{:.3}", b.vector_score),
                            format!("{:.3}", b.graph_score),
                            format!("{:.3}", b.community_bonus),
                        )
                    });
                    table.add_row(vec![
                        (rank + 1).to_string(),
                        hit.case_id.clone(),
                        format!("{:.4}", hit.score),
                        format!("{:?}", hit.source),
                        v,
                        g,
                        c,
                    ]);
                }
                println!("{}", table);
                println!("intent: {}", response.intent);
                if response.partial {
                    println!("(partial result: traversal budget exhausted)");
                }
                if response.degraded {
                    println!("(degraded: graph-only ranking)");
                }
                for failure in &response.failed_strategies {
                    println!("strategy {} failed: {}", failure.strategy, failure.error);
                }
            })?;
        }
        Commands::Explain { cases, case_id, query } => {
            let (service, _) = open_service(config, &cases)?;
            let explanation = service.explain(&case_id, &query)?;
            print_json_or(&cli.format, &explanation, || {
                println!("{} ({})", explanation.case_id, explanation.title);
                for edge in &explanation.direct {
                    let arrow = if edge.outgoing { "->" } else { "<-" };
                    println!("  {} [{}] {} (weight {:.2})", arrow, edge.kind, edge.neighbor, edge.weight);
                }
                for path in &explanation.paths {
                    let hops: Vec<String> = path.nodes.iter().map(|k| k.to_string()).collect();
                    println!("  path from {}: {}", path.from, hops.join(" - "));
                }
                if let Some(community) = &explanation.community {
                    println!(
                        "  community {} ({} members), also: {}",
                        community.id,
                        community.size,
                        community.co_members.join(", ")
                    );
                }
            })?;
        }
        Commands::Recommend { cases, entity, limit } => {
            let key: NodeKey = entity.parse().map_err(anyhow::Error::msg)?;
            let (service, _) = open_service(config, &cases)?;
            let hits = service.recommend(&key, limit)?;
            print_json_or(&cli.format, &hits, || {
                let mut table = Table::new();
                table.set_header(vec!["case", "score"]);
                for hit in &hits {
                    table.add_row(vec![hit.case_id.clone(), format!("{:.4}", hit.final_score)]);
                }
                println!("{}", table);
            })?;
        }
    }

    Ok(())
}

fn load_cases(path: &Path) -> anyhow::Result<Vec<CaseRecord>> {
    load_cases_from_path(path).with_context(|| format!("loading cases from {}", path.display()))
}

fn open_service(
    config: LexGraphConfig,
    path: &Path,
) -> anyhow::Result<(GraphService, lexgraph::RebuildOutcome)> {
    let records = load_cases(path)?;
    Ok(GraphService::open(config, &records)?)
}

/// HTTP provider when configured, the local hashing embedder otherwise
fn embedder_for(config: &LexGraphConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match &config.embed {
        Some(embed) => Arc::new(EmbeddingClient::new(embed)?),
        None => Arc::new(HashingEmbedder::new(LOCAL_EMBEDDING_DIM)),
    };
    Ok(embedder)
}

fn print_json_or<T: serde::Serialize>(format: &OutputFormat, value: &T, table: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => table(),
    }
    Ok(())
}
