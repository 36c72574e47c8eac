// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Rewind` player - inspect, render and play cached screen recordings.
//!
//! # Commands
//!
//! - `rewind demo <dir>` - Write a synthesized recording project
//! - `rewind inspect <dir>` - Summarize tracks, sequences and records
//! - `rewind render <dir> --at-ms <n> --out <png>` - Render one moment to PNG
//! - `rewind play <dir> --out-dir <dir>` - Play to the end, one PNG per render
//! - `rewind settings` - Write the effective settings file
//!
//! ## Architecture
//!
//! Projects are opened with `rewind_sequencer`. Playback runs a ticker and a
//! render worker on a tokio runtime; rendered surfaces go to a PNG worker
//! thread.

mod demo;
mod error;
mod inspect;
mod render_loop;
mod settings;
mod snapshot;

use clap::{Parser, Subcommand, ValueEnum};
use error::{PlayerError, Result};
use inspect::ProjectSummary;
use render_loop::{play_to_snapshots, RenderContext};
use rewind_cache::ticks_from_millis;
use rewind_sequencer::{Project, RenderQuality, Renderer};
use settings::{PlayerSettings, SETTINGS_FILE_NAME};
use snapshot::SnapshotWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Rewind player
#[derive(Parser)]
#[command(name = "rewind")]
#[command(about = "Inspect, render and play cached screen recordings")]
#[command(version)]
struct Cli {
    /// Settings file (RON); defaults are used when it does not exist
    #[arg(long, global = true, default_value = SETTINGS_FILE_NAME)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthesized recording project
    Demo {
        /// Project directory to create
        dir: PathBuf,
    },

    /// Summarize a project
    Inspect {
        /// Project directory
        dir: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render one moment to PNG
    Render {
        /// Project directory
        dir: PathBuf,
        /// Time to render, in milliseconds
        #[arg(long)]
        at_ms: i64,
        /// Output PNG file
        #[arg(long)]
        out: PathBuf,
        /// Resampling quality (overrides settings)
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,
    },

    /// Write the effective settings to the settings file
    Settings,

    /// Play to the end, writing one PNG per render
    Play {
        /// Project directory
        dir: PathBuf,
        /// Directory for the PNG frames
        #[arg(long)]
        out_dir: PathBuf,
        /// Playback ticks per second (overrides settings)
        #[arg(long)]
        fps: Option<u32>,
        /// Playback speed multiplier (overrides settings)
        #[arg(long)]
        speed: Option<f64>,
        /// Stop after this many frames (overrides settings)
        #[arg(long)]
        max_frames: Option<usize>,
        /// Resampling quality (overrides settings)
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,
    },
}

/// Command line spelling of [`RenderQuality`]
#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    Fast,
    High,
}

impl From<QualityArg> for RenderQuality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::Fast => RenderQuality::Fast,
            QualityArg::High => RenderQuality::High,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let settings = PlayerSettings::load_or_default(&cli.settings);
    let default_filter = settings
        .as_ref()
        .map_or_else(|_| PlayerSettings::default().log_filter, |s| s.log_filter.clone());

    // RUST_LOG wins over the settings file
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Starting Rewind player v{}", env!("CARGO_PKG_VERSION"));

    let result = settings
        .map_err(PlayerError::from)
        .and_then(|settings| run(cli.command, &settings, &cli.settings));
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Commands, settings: &PlayerSettings, settings_path: &Path) -> Result<()> {
    match command {
        Commands::Settings => {
            settings.save(settings_path)?;
            println!("Wrote settings to {}", settings_path.display());
            Ok(())
        }
        Commands::Demo { dir } => {
            let (_, summary) = demo::write_demo(&dir)?;
            println!(
                "Wrote demo project to {} ({} frames, {} cursors, {} keys)",
                dir.display(),
                summary.frames,
                summary.cursors,
                summary.keys
            );
            Ok(())
        }
        Commands::Inspect { dir, json } => {
            let project = open_project(&dir)?;
            let summary = ProjectSummary::new(&project);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
            Ok(())
        }
        Commands::Render {
            dir,
            at_ms,
            out,
            quality,
        } => {
            let project = open_project(&dir)?;
            let renderer = Renderer::new(quality.map_or(settings.quality, Into::into));
            let mut surface = Renderer::surface_for(&project);
            let report = renderer.render_at(&project, &mut surface, ticks_from_millis(at_ms));

            let snapshots = SnapshotWriter::new();
            snapshots.submit(&surface, &out)?;
            let mut written = snapshots.finish();
            if let Some(e) = written.failures.pop() {
                return Err(e.into());
            }
            println!(
                "Rendered {} ms to {} ({} sequences drawn, {} failed)",
                at_ms,
                out.display(),
                report.drawn_sequences,
                report.failures.len()
            );
            Ok(())
        }
        Commands::Play {
            dir,
            out_dir,
            fps,
            speed,
            max_frames,
            quality,
        } => {
            let project = open_project(&dir)?;
            let renderer = Renderer::new(quality.map_or(settings.quality, Into::into));
            let context = RenderContext::new(project, renderer);
            context.playback.lock().speed = speed.unwrap_or(settings.speed);

            let fps = fps.unwrap_or(settings.fps);
            let max_frames = max_frames.unwrap_or(settings.max_frames);
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            let snapshots = SnapshotWriter::new();
            let summary = runtime.block_on(play_to_snapshots(context, fps, max_frames, &out_dir, &snapshots))?;

            let written = snapshots.finish();
            for failure in &written.failures {
                tracing::warn!("{failure}");
            }
            println!(
                "Wrote {} of {} frames to {}, ending at {} ms ({} sequence failures)",
                written.written.len(),
                summary.frames,
                out_dir.display(),
                summary.last_timestamp.map_or(0, rewind_cache::millis_from_ticks),
                summary.sequence_failures
            );
            Ok(())
        }
    }
}

fn open_project(dir: &Path) -> Result<Project> {
    if !Project::is_project_directory(dir) {
        return Err(PlayerError::Usage(format!("{} is not a Rewind project", dir.display())));
    }
    Ok(Project::open(dir)?)
}
