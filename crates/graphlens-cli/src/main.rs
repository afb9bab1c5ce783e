use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use graphlens_app::{GraphView, InMemoryFetcher, RecordingSink, VisualizationSettings};
use graphlens_core::{NodeId, QueryResult};
use graphlens_events::{GraphEvent, InteractionEvent, SelectedItem};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Svg,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Lay out a graph query result and render it", long_about = None)]
struct Args {
    /// Query result document with `nodes` and `relationships`
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the rendered frame. Defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Svg)]
    format: Format,

    /// Settings file. Defaults to the user config directory
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value_t = 1200.0)]
    width: f32,

    #[arg(long, default_value_t = 800.0)]
    height: f32,

    /// Node to select before rendering
    #[arg(long)]
    select: Option<String>,

    /// Nodes to expand before rendering, in order
    #[arg(long)]
    expand: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    if args.width <= 0.0 || args.height <= 0.0 {
        bail!("Surface size must be positive, got {}x{}", args.width, args.height);
    }

    let settings = match &args.settings {
        Some(path) => VisualizationSettings::load_from(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?,
        None => VisualizationSettings::load(),
    };

    let document = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {:?}", args.input))?;
    let result = QueryResult::from_json_str(&document)
        .with_context(|| format!("Failed to parse {:?}", args.input))?;

    let fetcher = InMemoryFetcher::new(result.clone());
    let mut view = GraphView::new(settings, args.width, args.height, Box::new(fetcher));
    let sink = RecordingSink::new();
    view.set_render_sink(Box::new(sink.clone()));
    view.load(result, &[]);

    for id in &args.expand {
        view.handle_event(InteractionEvent::NodeDblClicked(NodeId::new(id.as_str())));
    }
    if !args.expand.is_empty() {
        view.settle();
    }
    if let Some(id) = &args.select {
        view.handle_event(InteractionEvent::NodeClicked(NodeId::new(id.as_str())));
    }
    view.zoom_to_fit();

    for event in view.drain_events() {
        match event {
            GraphEvent::ItemSelected(SelectedItem::StatusMessage(message)) => {
                tracing::warn!("{}", message)
            }
            GraphEvent::ExpansionCompleted {
                node_id,
                added_nodes,
            } => tracing::info!("Expanded {}: {} new nodes", node_id, added_nodes),
            _ => {}
        }
    }

    let scene = sink
        .last_frame()
        .unwrap_or_else(|| view.visualization().scene());
    let rendered = match args.format {
        Format::Svg => scene.to_svg(),
        Format::Json => serde_json::to_string_pretty(&scene)?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {:?}", path))?;
            let model = view.visualization().model();
            println!(
                "Rendered {} nodes and {} relationships to {:?} ({} frames drawn)",
                model.node_count(),
                model.relationship_count(),
                path,
                sink.frame_count()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
