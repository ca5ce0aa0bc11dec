//! Headless isovox driver
//!
//! Builds a world from the settings file and command line, runs a number of
//! frames with a scripted player and saves what changed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;

use isovox::constants::*;
use isovox::core::BlockRegistry;
use isovox::input::InputIntents;
use isovox::save::{ChunkStore, FileStore, MemoryStore};
use isovox::utils::settings::EngineSettings;
use isovox::world::{BackgroundStore, GeneratorKind, WorldContext, create_generator};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (TOML); defaults to the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Milliseconds per frame
    #[arg(long, default_value_t = 16)]
    delta_ms: u32,

    /// World seed, overrides the settings file
    #[arg(long)]
    seed: Option<u32>,

    /// Terrain generator: empty, flat or noise
    #[arg(long)]
    generator: Option<GeneratorKind>,

    /// Directory for chunk files, overrides the settings file
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Keep chunks in memory only
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Let the player walk and jump around
    #[arg(long, default_value_t = false)]
    walk: bool,

    /// Write the effective settings back to the config file
    #[arg(long, default_value_t = false)]
    write_config: bool,
}

/// Walks a slow square, jumping now and then.
fn scripted_intents(frame: u64) -> InputIntents {
    let leg = (frame / 120) % 4;
    InputIntents {
        move_forward: leg == 0,
        move_right: leg == 1,
        move_back: leg == 2,
        move_left: leg == 3,
        jump: frame % 90 == 45,
        sprint_factor: 1.0,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let dirs = ProjectDirs::from("", "", "isovox");

    let config_path = args
        .config
        .clone()
        .or_else(|| dirs.as_ref().map(|d| d.config_dir().join("settings.toml")));
    let mut settings = match &config_path {
        Some(path) => EngineSettings::load_or_default(path)?,
        None => EngineSettings::default(),
    };

    if let Some(seed) = args.seed {
        settings.world.seed = Some(seed);
    }
    if let Some(kind) = args.generator {
        settings.world.generator = kind;
    }
    if let Some(dir) = &args.save_dir {
        settings.world.save_dir = Some(dir.clone());
    }

    let seed = settings.world.seed.unwrap_or_else(rand::random::<u32>);
    tracing::info!("Starting isovox with {:?} terrain, seed {}", settings.world.generator, seed);

    let registry = Arc::new(match &settings.world.registry {
        Some(path) => BlockRegistry::load(path)?,
        None => BlockRegistry::builtin()?,
    });
    let generator = create_generator(settings.world.generator, seed, registry.clone());

    let store: Box<dyn ChunkStore> = if args.memory {
        Box::new(MemoryStore::new(registry.clone()))
    } else {
        let dir = settings
            .world
            .save_dir
            .clone()
            .or_else(|| dirs.as_ref().map(|d| d.data_dir().join("world")))
            .context("no save directory configured and no platform data directory found")?;
        tracing::info!("Chunk files in {}", dir.display());
        let files = FileStore::open(&dir, registry.clone())
            .with_context(|| format!("cannot open world directory {}", dir.display()))?;
        if settings.world.background_saves {
            Box::new(BackgroundStore::new(files)?)
        } else {
            Box::new(files)
        }
    };

    let mut context = WorldContext::new(registry, &settings, generator, store);
    context.spawn_player(CHUNK_X / 2, CHUNK_Y / 2);

    let idle = InputIntents::default();
    let mut recalculations = 0;
    let mut shifts = 0;
    for frame in 0..args.frames {
        let intents = if args.walk { scripted_intents(frame) } else { idle };
        let report = context.frame(args.delta_ms, &intents);
        recalculations += report.recalculated as u64;
        shifts += report.shifted.is_some() as u64;

        if settings.debug.log_every_frame || frame % 100 == 0 {
            let player = context.player().map(|p| p.position());
            tracing::info!(
                "Frame {}: {} visible, player at {:?}, map center {:?}",
                report.frame,
                report.visible,
                player,
                context.map.center()
            );
        }
        if settings.debug.build_draw_list {
            let entries = context.draw_list();
            tracing::debug!("Frame {}: {} draw entries", report.frame, entries.len());
        }
    }

    let entries = context.draw_list();
    tracing::info!(
        "Ran {} frames: {} recalculations, {} window shifts, {} entries in the final draw list",
        context.frame_count(),
        recalculations,
        shifts,
        entries.len()
    );

    context.save_all();

    if args.write_config {
        if let Some(path) = &config_path {
            settings.save(path)?;
            tracing::info!("Settings written to {}", path.display());
        }
    }
    Ok(())
}
