mod collaborators;
mod input;
mod plugins;
mod sim_systems;

use std::path::PathBuf;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use oc_sim::ControllerConfig;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "oc-client")]
#[command(about = "First-person sandbox for the player movement and weapon core")]
struct Cli {
    /// Player tuning file (TOML). Defaults to the bundled assets/player.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed seed for spread, kick and recoil sampling
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt().without_time().compact().init();

    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(default_config_path);
    let mut config = match ControllerConfig::load_from_file(&path) {
        Ok(config) => {
            info!(path = %path.display(), weapons = config.loadout.len(), "loaded player config");
            config
        }
        Err(err) => {
            warn!(path = %path.display(), "{err}; using built-in defaults");
            ControllerConfig::default()
        }
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    info!("Starting oc-client");

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "oc-client".into(),
                        ..default()
                    }),
                    ..default()
                })
                .disable::<LogPlugin>(),
        )
        .add_plugins(plugins::PlayerCorePlugin::new(config))
        .add_plugins(plugins::PlayerScenePlugin)
        .run();
}

fn default_config_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/player.toml"))
}
