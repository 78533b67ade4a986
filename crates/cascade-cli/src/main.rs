use anyhow::{bail, Context, Result};
use cascade_core::{
    CascadeConfig, ConfigManager, CycleStats, EditKind, EditRecord, EngineConfig, LoggingConfig,
    StatsRecorder,
};
use cascade_graph::{
    check_tree, diff_against_fresh, erdos_renyi, load_graph, random_batch, save_graph, BatchSpec,
    CascadeEngine, Graph, WeightRange,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Cascade CLI - Incremental shortest-path tree maintenance", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Explicit config file instead of the usual search path
    #[arg(long, global = true, env = "CASCADE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare incremental repair against fresh solves on random graphs
    Fuzz(FuzzArgs),

    /// Generate a random graph snapshot
    Generate {
        /// Number of vertices
        #[arg(short = 'n', long)]
        vertices: Option<usize>,

        /// Edge probability
        #[arg(short, long)]
        probability: Option<f64>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output file (.json or .bin)
        #[arg(long)]
        out: PathBuf,
    },

    /// Solve a saved graph, apply an edit file and print the repaired tree
    Replay {
        /// Graph snapshot (.json or .bin)
        #[arg(short, long)]
        graph: PathBuf,

        /// Source vertex
        #[arg(short, long, default_value = "0")]
        source: u32,

        /// JSON array of edit records
        #[arg(short, long)]
        edits: PathBuf,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct FuzzArgs {
    /// Number of random graphs
    #[arg(short, long, default_value = "100")]
    runs: usize,

    /// Vertices per graph
    #[arg(short = 'n', long)]
    vertices: Option<usize>,

    /// Edge probability
    #[arg(short, long)]
    probability: Option<f64>,

    /// Edits per batch
    #[arg(short, long)]
    edits: Option<usize>,

    /// Edit kinds to draw from (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "add,remove,modify")]
    kinds: Vec<EditKind>,

    /// Base seed; run i uses seed + i
    #[arg(short, long)]
    seed: Option<u64>,

    /// Cascade in bounded slices of this many steps
    #[arg(long)]
    step_budget: Option<u64>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Target path
        #[arg(long, default_value = ".cascade.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}

#[derive(Serialize)]
struct FuzzFailure {
    run: usize,
    seed: u64,
    differing_vertices: usize,
    violations: Vec<String>,
}

#[derive(Serialize)]
struct FuzzReport {
    runs: usize,
    base_seed: u64,
    vertices: usize,
    edge_probability: f64,
    edits_per_batch: usize,
    applied_edits: usize,
    rejected_edits: usize,
    yields: u64,
    failures: Vec<FuzzFailure>,
    operations: Vec<cascade_core::OperationSummary>,
}

#[derive(Serialize)]
struct GenerateResult {
    path: String,
    seed: u64,
    vertices: usize,
    edges: usize,
}

#[derive(Serialize)]
struct TreeRow {
    vertex: u32,
    distance: Option<f64>,
    parent: Option<u32>,
    height: u32,
}

#[derive(Serialize)]
struct ReplayResult {
    source: u32,
    records: usize,
    applied: usize,
    cascade_steps: u64,
    tree: Vec<TreeRow>,
}

#[derive(Serialize)]
struct ConfigInitResult {
    path: String,
    status: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    init_tracing(&manager.config().logging, cli.verbose);
    if let Some(path) = manager.config_path() {
        debug!("Using config file {}", path.display());
    }

    match execute_command(&cli, manager) {
        Ok((output, success)) => {
            print_output(&cli.output, &output)?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}

/// Runs the selected command. The flag is `false` when the command
/// completed but found a problem that should fail the process.
fn execute_command(cli: &Cli, manager: ConfigManager) -> Result<(serde_json::Value, bool)> {
    let config = manager.config().clone();
    match &cli.command {
        Commands::Fuzz(args) => {
            let report = run_fuzz(args, &config)?;
            let success = report.failures.is_empty();
            Ok((serde_json::to_value(report)?, success))
        }
        Commands::Generate {
            vertices,
            probability,
            seed,
            out,
        } => {
            let result = run_generate(&config, *vertices, *probability, *seed, out)?;
            Ok((serde_json::to_value(result)?, true))
        }
        Commands::Replay {
            graph,
            source,
            edits,
        } => {
            let result = run_replay(&config, graph, *source, edits)?;
            Ok((serde_json::to_value(result)?, true))
        }
        Commands::Config(cmd) => Ok((execute_config_command(cmd, &manager)?, true)),
    }
}

fn weight_range(config: &CascadeConfig) -> Result<WeightRange> {
    WeightRange::new(config.generator.min_weight, config.generator.max_weight)
        .context("Invalid weight range")
}

fn vertex_count(vertices: usize) -> Result<u32> {
    if vertices == 0 {
        bail!("Graphs need at least one vertex to act as the source");
    }
    u32::try_from(vertices).context("Vertex count does not fit in u32")
}

fn check_probability(probability: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&probability) {
        bail!("Edge probability must be within [0, 1], got {}", probability);
    }
    Ok(probability)
}

fn run_fuzz(args: &FuzzArgs, config: &CascadeConfig) -> Result<FuzzReport> {
    let generator = &config.generator;
    let vertices = args.vertices.unwrap_or(generator.vertices);
    let n = vertex_count(vertices)?;
    let probability = check_probability(args.probability.unwrap_or(generator.edge_probability))?;
    let edits = args.edits.unwrap_or(generator.edits_per_batch);
    let base_seed = args.seed.or(generator.seed).unwrap_or_else(rand::random);
    let step_budget = args.step_budget.or(config.engine.step_budget);
    if step_budget == Some(0) {
        bail!("Step budget must be at least 1");
    }

    let spec = BatchSpec {
        count: edits,
        kinds: args.kinds.clone(),
        weights: weight_range(config)?,
        protected: Some(0),
    };

    let mut recorder = StatsRecorder::new();
    let mut failures = Vec::new();
    let (mut applied_edits, mut rejected_edits, mut yields) = (0, 0, 0);

    for run in 0..args.runs {
        let seed = base_seed.wrapping_add(run as u64);
        let mut rng = StdRng::seed_from_u64(seed);
        let graph = erdos_renyi(n, probability, spec.weights, &mut rng);
        let engine_config = EngineConfig {
            step_budget,
            ..config.engine.clone()
        };
        let mut engine = CascadeEngine::with_config(graph, engine_config);

        let mut solve_stats = CycleStats::new();
        engine.solve_with(0, &mut solve_stats)?;
        recorder.record("solve", &solve_stats);

        let batch = random_batch(engine.graph(), &spec, &mut rng);
        let mut apply_stats = CycleStats::new();
        let applied = engine.apply_batch_with(&batch, &mut apply_stats)?;
        recorder.record("apply_batch", &apply_stats);
        let accepted = applied.iter().filter(|ok| **ok).count();
        applied_edits += accepted;
        rejected_edits += applied.len() - accepted;

        let mut cascade_stats = CycleStats::new();
        while !engine.cascade_step(&mut cascade_stats).is_complete() {
            yields += 1;
        }
        recorder.record("cascade", &cascade_stats);

        let diffs = diff_against_fresh(&engine)?;
        let violations = check_tree(&engine);
        if !diffs.is_empty() || !violations.is_empty() {
            error!(
                run,
                seed,
                differing = diffs.len(),
                violations = violations.len(),
                "Incremental tree diverged from a fresh solve"
            );
            failures.push(FuzzFailure {
                run,
                seed,
                differing_vertices: diffs.len(),
                violations: violations.iter().map(ToString::to_string).collect(),
            });
        }
    }

    info!(
        runs = args.runs,
        failures = failures.len(),
        "Fuzzing finished"
    );

    Ok(FuzzReport {
        runs: args.runs,
        base_seed,
        vertices,
        edge_probability: probability,
        edits_per_batch: edits,
        applied_edits,
        rejected_edits,
        yields,
        failures,
        operations: recorder.summary(),
    })
}

fn run_generate(
    config: &CascadeConfig,
    vertices: Option<usize>,
    probability: Option<f64>,
    seed: Option<u64>,
    out: &Path,
) -> Result<GenerateResult> {
    let vertices = vertices.unwrap_or(config.generator.vertices);
    let n = vertex_count(vertices)?;
    let probability = check_probability(probability.unwrap_or(config.generator.edge_probability))?;
    let seed = seed.or(config.generator.seed).unwrap_or_else(rand::random);

    let graph = erdos_renyi(n, probability, weight_range(config)?, &mut StdRng::seed_from_u64(seed));
    save_graph(&graph, out).with_context(|| format!("Failed to write {}", out.display()))?;

    Ok(GenerateResult {
        path: out.display().to_string(),
        seed,
        vertices: graph.vertex_count(),
        edges: graph.edge_count(),
    })
}

fn run_replay(config: &CascadeConfig, graph_path: &Path, source: u32, edits_path: &Path) -> Result<ReplayResult> {
    let graph: Graph<u32> = load_graph(graph_path)
        .with_context(|| format!("Failed to load graph {}", graph_path.display()))?;
    let content = std::fs::read_to_string(edits_path)
        .with_context(|| format!("Failed to read {}", edits_path.display()))?;
    let records: Vec<EditRecord<u32>> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse edit records in {}", edits_path.display()))?;
    let record_count = records.len();

    let mut engine = CascadeEngine::with_config(graph, config.engine.clone());
    engine
        .solve(source)
        .with_context(|| format!("Cannot solve from source {}", source))?;
    let applied = engine.apply_records(records)?;
    let cascade_steps = engine.cascade();

    let state = engine.state();
    let tree = engine
        .graph()
        .vertices()
        .map(|v| TreeRow {
            vertex: *v,
            distance: Some(state.distance(v)).filter(|d| d.is_finite()),
            parent: state.parent(v).copied(),
            height: state.height(v),
        })
        .collect();

    Ok(ReplayResult {
        source,
        records: record_count,
        applied: applied.iter().filter(|ok| **ok).count(),
        cascade_steps,
        tree,
    })
}

fn execute_config_command(cmd: &ConfigCommands, manager: &ConfigManager) -> Result<serde_json::Value> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            if path.exists() && !*force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            ConfigManager::create_default_config(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let result = ConfigInitResult {
                path: path.display().to_string(),
                status: "created".to_string(),
            };
            Ok(serde_json::to_value(result)?)
        }
        ConfigCommands::Show => Ok(serde_json::to_value(manager.config())?),
    }
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
        OutputFormat::Table => {
            print_table(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b {
                            "true".green()
                        } else {
                            "false".red()
                        };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    serde_json::Value::Null => {
                        println!("{}: {}", key_colored, "none".dimmed());
                    }
                    serde_json::Value::Array(arr) if arr.is_empty() => {
                        println!("{}: {}", key_colored, "[]".dimmed());
                    }
                    serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                        println!("{}:", key_colored);
                        print_pretty(val)?;
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("\n{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item)?;
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

/// Scalars print as `key: value`; arrays of objects become tables.
fn print_table(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match render_table(val) {
                    Some(table) => println!("{}\n{}", key.cyan().bold(), table),
                    None => println!("{}: {}", key.cyan().bold(), cell(val)),
                }
            }
            Ok(())
        }
        other => match render_table(other) {
            Some(table) => {
                println!("{}", table);
                Ok(())
            }
            None => print_pretty(other),
        },
    }
}

fn render_table(value: &serde_json::Value) -> Option<String> {
    let rows = value.as_array()?;
    let first = rows.first()?.as_object()?;
    let headers: Vec<String> = first.keys().cloned().collect();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows {
        let row = row.as_object()?;
        builder.push_record(headers.iter().map(|h| row.get(h).map(cell).unwrap_or_default()));
    }
    Some(builder.build().with(Style::rounded()).to_string())
}

fn cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
