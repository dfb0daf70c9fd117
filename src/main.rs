mod app;
mod util;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nation_graph::{ConfigPatch, GraphDocument, Simulation};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph document: JSON with `nodes` and `links`
    graph: PathBuf,

    /// JSON file with force configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lay the graph out without a window and write the result as JSON
    #[arg(long)]
    headless: bool,

    /// Tick limit for headless runs
    #[arg(long, default_value_t = 10_000)]
    max_ticks: usize,

    /// Output file for headless runs (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Canvas width; the layout is centered on the canvas center
    #[arg(long, requires = "height")]
    width: Option<f32>,

    /// Canvas height; the layout is centered on the canvas center
    #[arg(long, requires = "width")]
    height: Option<f32>,
}

fn load_document(path: &Path) -> Result<GraphDocument> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    GraphDocument::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to read graph document {}", path.display()))
}

fn load_patch(path: &Path) -> Result<ConfigPatch> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn build_simulation(args: &Args, document: &GraphDocument) -> Result<Simulation> {
    let mut simulation =
        Simulation::from_document(document).context("failed to build the graph")?;

    if let (Some(width), Some(height)) = (args.width, args.height) {
        let patch = ConfigPatch {
            center_target: Some([width / 2.0, height / 2.0]),
            ..Default::default()
        };
        simulation
            .configure(&patch)
            .context("invalid canvas size")?;
    }

    if let Some(path) = &args.config {
        let patch = load_patch(path)?;
        simulation
            .configure(&patch)
            .with_context(|| format!("rejected config {}", path.display()))?;
    }

    Ok(simulation)
}

fn run_headless(args: &Args, mut document: GraphDocument, mut simulation: Simulation) -> Result<()> {
    let ticks = simulation.run_until_converged(args.max_ticks);
    info!(
        ticks,
        state = ?simulation.state(),
        alpha = simulation.alpha(),
        warnings = simulation.warning_count(),
        "Headless layout finished"
    );

    document.record_positions(simulation.graph());
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &document).context("failed to write layout")?;
    writeln!(writer)?;
    writer.flush().context("failed to write layout")?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let document = load_document(&args.graph)?;
    let simulation = build_simulation(&args, &document)?;
    info!(
        nodes = simulation.graph().node_count(),
        links = simulation.graph().link_count(),
        "Graph loaded"
    );

    if args.headless {
        return run_headless(&args, document, simulation);
    }

    let title = args
        .graph
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "nation-graph".to_owned());
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 880.0]),
        ..Default::default()
    };

    eframe::run_native(
        "nation-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::ForceGraphApp::new(cc, title, simulation)))),
    )
    .map_err(|error| anyhow::anyhow!("viewer failed: {error}"))
}
