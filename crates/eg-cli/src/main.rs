use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use eg_config::PipelineConfig;
use eg_runtime::tracing_init::{WorkerGuard, init_tracing};
use eg_runtime::{Pipeline, WindowExporter};

#[derive(Parser)]
#[command(name = "egregora-window", about = "Window chat exports and track progress")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Window one or all sources and export each window as JSON
    Run {
        /// Path to egregora.toml
        #[arg(short, long)]
        config: PathBuf,
        /// Only run this source
        #[arg(short, long)]
        source: Option<String>,
        /// Export directory (default: <config dir>/windows)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List the windows the next run would process
    Plan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Inspect or reset checkpoints
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Print the stored checkpoint of one or all sources
    Show {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Delete a source's checkpoint so the next run starts over
    Reset {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        source: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            source,
            out,
        } => {
            let (pipeline, base_dir, _guard) = open(&config)?;
            let out = out.unwrap_or_else(|| base_dir.join("windows"));
            for name in selected(&pipeline, source.as_deref()) {
                let mut exporter = WindowExporter::new(&out, &name);
                let report = pipeline
                    .run_source(&name, &mut exporter)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                tracing::info!(domain = "sys", source = %name, files = exporter.written().len(), "source exported");
                println!("{report}");
            }
        }
        Commands::Plan { config, source } => {
            let (pipeline, _, _guard) = open(&config)?;
            for name in selected(&pipeline, source.as_deref()) {
                let windows = pipeline.plan(&name).map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("{name}: {} window(s)", windows.len());
                for w in windows {
                    println!(
                        "  #{:<4} {} .. {}  {:>5} msgs  {:>4} overlap  {:>8} bytes",
                        w.index,
                        w.start_time.format("%Y-%m-%d %H:%M"),
                        w.end_time.format("%Y-%m-%d %H:%M"),
                        w.size,
                        w.overlap,
                        w.bytes,
                    );
                }
            }
        }
        Commands::Checkpoint { action } => match action {
            CheckpointAction::Show { config, source } => {
                let (pipeline, _, _guard) = open(&config)?;
                for name in selected(&pipeline, source.as_deref()) {
                    match pipeline.checkpoint(&name).map_err(|e| anyhow::anyhow!("{e}"))? {
                        Some(cp) => println!("{name}: {}", serde_json::to_string(&cp)?),
                        None => println!("{name}: no checkpoint"),
                    }
                }
            }
            CheckpointAction::Reset { config, source } => {
                let (pipeline, _, _guard) = open(&config)?;
                let removed = pipeline
                    .reset_checkpoint(&source)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                if removed {
                    println!("{source}: checkpoint removed");
                } else {
                    println!("{source}: no checkpoint to remove");
                }
            }
        },
    }

    Ok(())
}

/// Load the config, start logging and bootstrap the pipeline.
fn open(config: &Path) -> Result<(Pipeline, PathBuf, Option<WorkerGuard>)> {
    let config_path = config
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("config path '{}': {e}", config.display()))?;
    let pipeline_config = PipelineConfig::load(&config_path)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("config path has no parent directory"))?;

    let guard = init_tracing(&pipeline_config.logging, &base_dir)?;
    let pipeline =
        Pipeline::bootstrap(pipeline_config, &base_dir).map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok((pipeline, base_dir, guard))
}

fn selected(pipeline: &Pipeline, source: Option<&str>) -> Vec<String> {
    match source {
        Some(name) => vec![name.to_string()],
        None => pipeline.source_names().map(str::to_string).collect(),
    }
}
