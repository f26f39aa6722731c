//! Command-line entry point: `ingest`, `walk`, `search`, and `ask` against a
//! running Postgres-backed substrate. Adapted from the teacher's former
//! actix entrypoint — this binary has no HTTP server, only subcommands.

use clap::{Parser, Subcommand};
use semantic_substrate::config::Config;
use semantic_substrate::geometry::S3Point;
use semantic_substrate::hash::{from_hex, to_hex, Hash32};
use semantic_substrate::ingest::{ingest_text, resolve_text_composition, MerkleDagWriter};
use semantic_substrate::monitoring::logging::{init_logging, LogConfig};
use semantic_substrate::reasoning::{self, GraphAccess};
use semantic_substrate::search::{self, Edge};
use semantic_substrate::storage::{PersistenceAdapter, PostgresAdapter, Row};
use semantic_substrate::walk::{self, RawEdge, WalkOutcome, WalkState};
use postgres_types::ToSql;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "substrate", about = "Query and populate the semantic substrate")]
struct Cli {
    #[arg(long, env = "SUBSTRATE_CONFIG", default_value = "substrate.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a text document, minting atoms/compositions/relations.
    Ingest {
        #[arg(long)]
        file: String,
        #[arg(long, default_value = "document")]
        content_type: String,
    },
    /// Generative walk from a starting word.
    Walk {
        #[arg(long)]
        start: String,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long, default_value_t = 32)]
        steps: usize,
        #[arg(long, default_value_t = 200)]
        max_graph_nodes: usize,
    },
    /// A* search between two words.
    Search {
        #[arg(long)]
        start: String,
        #[arg(long)]
        goal: String,
        #[arg(long, default_value_t = 200)]
        max_graph_nodes: usize,
    },
    /// Run the reasoning orchestrator over a prompt.
    Ask {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value_t = 200)]
        max_graph_nodes: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config).unwrap_or_else(|_| Config::default_with_database(std::env::var("DATABASE_URL").unwrap_or_default()));
    init_logging(LogConfig::default()).ok();
    config.validate()?;

    let adapter = Arc::new(PostgresAdapter::new(&config.database.url, config.database.pool_size as usize)?);

    match cli.command {
        Command::Ingest { file, content_type } => run_ingest(&adapter, &file, &content_type).await,
        Command::Walk { start, goal, steps, max_graph_nodes } => run_walk(&adapter, &config, &start, goal.as_deref(), steps, max_graph_nodes).await,
        Command::Search { start, goal, max_graph_nodes } => run_search(&adapter, &config, &start, &goal, max_graph_nodes).await,
        Command::Ask { prompt, max_graph_nodes } => run_ask(&adapter, &config, &prompt, max_graph_nodes).await,
    }
}

async fn run_ingest(adapter: &Arc<PostgresAdapter>, file: &str, content_type: &str) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)?;
    let (_content, records) = ingest_text(content_type.to_string(), &text);
    let writer = MerkleDagWriter::new(Arc::clone(adapter));
    let stats = writer.flush("text", records).await?;
    println!(
        "ingested: {} atoms, {} compositions, {} relations ({} deduped)",
        stats.atoms_written, stats.compositions_written, stats.relations_written, stats.relations_deduped
    );
    Ok(())
}

async fn run_walk(adapter: &Arc<PostgresAdapter>, config: &Config, start: &str, goal: Option<&str>, steps: usize, max_graph_nodes: usize) -> anyhow::Result<()> {
    let span = semantic_substrate::monitoring::logging::spans::walk(start, steps);
    let _guard = span.enter();

    let (start_id, start_pos) = resolve_text_composition(start);
    let goal_resolved = goal.map(resolve_text_composition);

    let graph = PrefetchedGraph::build(adapter, start_id, max_graph_nodes).await?;
    let mut state = WalkState::new(start_id, start_pos, 1.0);
    if let Some((goal_id, goal_pos)) = goal_resolved {
        state.goal_composition = Some(goal_id);
        state.goal_position = Some(goal_pos);
    }

    let mut rng = rand::thread_rng();
    let mut tokens = vec![start.to_string()];
    for _ in 0..steps {
        let raw_edges = graph.raw_edges(&state.current_composition);
        let outcome = walk::step(&mut state, raw_edges, &config.walk, |id| graph.position(id), &mut rng);
        if let Some(text) = graph.text(state.trajectory.last().unwrap()) {
            tokens.push(text);
        }
        if !matches!(outcome, WalkOutcome::Continue) {
            println!("walk ended: {outcome:?}");
            break;
        }
    }
    println!("{}", walk::assemble_text(&tokens));
    Ok(())
}

async fn run_search(adapter: &Arc<PostgresAdapter>, config: &Config, start: &str, goal: &str, max_graph_nodes: usize) -> anyhow::Result<()> {
    let (start_id, start_pos) = resolve_text_composition(start);
    let (goal_id, goal_pos) = resolve_text_composition(goal);

    let graph = PrefetchedGraph::build(adapter, start_id, max_graph_nodes).await?;
    let result = search::search(start_id, Some(start_pos), goal_id, goal_pos, &config.search, |id| graph.edges(id), |id| graph.position(id));

    match result {
        Some(path) => {
            let words: Vec<String> = path.path.iter().filter_map(|id| graph.text(id)).collect();
            println!("{} (avg_elo={:.0}, total_observations={})", walk::assemble_text(&words), path.avg_elo, path.total_observations);
        }
        None => println!("no path found within the explored neighborhood"),
    }
    Ok(())
}

async fn run_ask(adapter: &Arc<PostgresAdapter>, config: &Config, prompt: &str, max_graph_nodes: usize) -> anyhow::Result<()> {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    let mut graph = PrefetchedGraph::empty();
    for word in &words {
        let (id, _) = resolve_text_composition(word);
        graph.merge(PrefetchedGraph::build(adapter, id, max_graph_nodes / words.len().max(1)).await?);
    }

    let resolve = |word: &str| {
        let (id, pos) = resolve_text_composition(word);
        if graph.known(&id) {
            Some((id, pos))
        } else {
            None
        }
    };
    let strong_neighbors = |id: &Hash32| -> Vec<(Hash32, f64)> { graph.edges(id).iter().map(|e| (e.target, e.elo)).collect() };
    let neighbors = |id: &Hash32| graph.edges(id);
    let position = |id: &Hash32| graph.position(id);
    let text_of = |id: &Hash32| graph.text(id);

    let access = GraphAccess { resolve: &resolve, strong_neighbors: &strong_neighbors, neighbors: &neighbors, position: &position, text_of: &text_of };
    let result = reasoning::run(prompt, &[], &config.reasoning, &config.search, &access);

    println!("{}", result.response);
    println!("quality: {:.2}", result.quality);
    if let Some(trace) = result.trace {
        for line in trace {
            println!("  - {line}");
        }
    }
    Ok(())
}

/// A bounded, pre-fetched slice of the relation graph reachable (via
/// breadth-first traversal) within `max_nodes` of one or more seed
/// compositions. `reasoning::GraphAccess` and `search`/`walk`'s neighbor
/// callbacks are synchronous, so the CLI resolves everything it needs from
/// Postgres up front rather than threading `async` through five phases of
/// orchestration logic.
struct PrefetchedGraph {
    edges: HashMap<Hash32, Vec<Edge>>,
    positions: HashMap<Hash32, S3Point>,
    texts: HashMap<Hash32, String>,
}

impl PrefetchedGraph {
    fn empty() -> Self {
        Self { edges: HashMap::new(), positions: HashMap::new(), texts: HashMap::new() }
    }

    fn merge(&mut self, other: Self) {
        self.edges.extend(other.edges);
        self.positions.extend(other.positions);
        self.texts.extend(other.texts);
    }

    async fn build(adapter: &PostgresAdapter, start: Hash32, max_nodes: usize) -> anyhow::Result<Self> {
        let mut graph = Self::empty();
        let mut frontier = vec![start];
        let mut visited = HashSet::new();
        visited.insert(start);

        while let Some(node) = frontier.pop() {
            if graph.edges.len() >= max_nodes {
                break;
            }
            let neighbor_rows = fetch_neighbors(adapter, node).await?;
            let edges: Vec<Edge> = neighbor_rows.iter().map(|(id, elo, obs)| Edge { target: *id, elo: *elo, observations: *obs }).collect();
            for (id, _, _) in &neighbor_rows {
                if visited.insert(*id) {
                    frontier.push(*id);
                }
            }
            if let Some(position) = fetch_position(adapter, node).await? {
                graph.positions.insert(node, position);
            }
            if let Some(text) = fetch_text(adapter, node).await? {
                graph.texts.insert(node, text);
            }
            graph.edges.insert(node, edges);
        }
        Ok(graph)
    }

    fn raw_edges(&self, id: &Hash32) -> Vec<RawEdge> {
        self.edges
            .get(id)
            .map(|edges| {
                edges
                    .iter()
                    .map(|e| RawEdge { composition_id: e.target, text: self.texts.get(&e.target).cloned().unwrap_or_default(), observations: e.observations, rating: e.elo })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn edges(&self, id: &Hash32) -> Vec<Edge> {
        self.edges.get(id).cloned().unwrap_or_default()
    }

    fn position(&self, id: &Hash32) -> Option<S3Point> {
        self.positions.get(id).copied()
    }

    fn text(&self, id: &Hash32) -> Option<String> {
        self.texts.get(id).cloned()
    }

    fn known(&self, id: &Hash32) -> bool {
        self.edges.contains_key(id) || self.positions.contains_key(id)
    }
}

/// One relation hop out of `composition_id`: the composition on the other
/// side of the relation plus that relation's current rating/observations.
async fn fetch_neighbors(adapter: &PostgresAdapter, composition_id: Hash32) -> anyhow::Result<Vec<(Hash32, f64, u64)>> {
    let id_hex = to_hex(&composition_id);
    let mut out = Vec::new();
    let params: &[&(dyn ToSql + Sync)] = &[&id_hex];
    adapter
        .query(
            "SELECT rs2.composition_id AS target, rr.ratingvalue AS elo, rr.observations AS observations \
             FROM relationsequence rs1 \
             JOIN relationsequence rs2 ON rs1.relation_id = rs2.relation_id AND rs2.composition_id <> rs1.composition_id \
             JOIN relationrating rr ON rr.relation_id = rs1.relation_id \
             WHERE rs1.composition_id = $1",
            params,
            &mut |row: Row| {
                let target = row.get("target").and_then(|v| v.as_str()).and_then(|s| from_hex(s).ok());
                let elo = row.get("elo").and_then(|v| v.as_str()).and_then(|s| s.parse::<f64>().ok());
                let observations = row.get("observations").and_then(|v| v.as_str()).and_then(|s| s.parse::<u64>().ok());
                if let (Some(target), Some(elo), Some(observations)) = (target, elo, observations) {
                    out.push((target, elo, observations));
                }
            },
        )
        .await?;
    Ok(out)
}

async fn fetch_position(adapter: &PostgresAdapter, composition_id: Hash32) -> anyhow::Result<Option<S3Point>> {
    let id_hex = to_hex(&composition_id);
    let params: &[&(dyn ToSql + Sync)] = &[&id_hex];
    let centroid = adapter
        .query_single("SELECT p.centroid FROM composition c JOIN physicality p ON p.id = c.physicalityid WHERE c.id = $1", params)
        .await?;
    let Some(raw) = centroid else { return Ok(None) };
    let parsed: Vec<f64> = serde_json::from_str(&raw)?;
    if parsed.len() != 4 {
        return Ok(None);
    }
    Ok(Some([parsed[0], parsed[1], parsed[2], parsed[3]]))
}

async fn fetch_text(adapter: &PostgresAdapter, composition_id: Hash32) -> anyhow::Result<Option<String>> {
    let id_hex = to_hex(&composition_id);
    let comp_params: &[&(dyn ToSql + Sync)] = &[&id_hex];
    let atoms_json = adapter.query_single("SELECT atoms FROM composition WHERE id = $1", comp_params).await?;
    let Some(raw) = atoms_json else { return Ok(None) };
    let runs: Vec<serde_json::Value> = serde_json::from_str(&raw)?;

    let mut text = String::new();
    for run in runs {
        let Some(atom_hex) = run.get("atomid").and_then(|v| v.as_str()) else { continue };
        let run_length = run.get("runlength").and_then(|v| v.as_u64()).unwrap_or(1);
        let atom_hex = atom_hex.to_string();
        let atom_params: &[&(dyn ToSql + Sync)] = &[&atom_hex];
        let codepoint = adapter.query_single("SELECT codepoint FROM atom WHERE id = $1", atom_params).await?;
        if let Some(ch) = codepoint.and_then(|s| s.parse::<u32>().ok()).and_then(char::from_u32) {
            for _ in 0..run_length {
                text.push(ch);
            }
        }
    }
    Ok(Some(text))
}
