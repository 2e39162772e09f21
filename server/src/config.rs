//! Server configuration from command line flags and environment variables

use crate::diff::PatchOptimizer;
use crate::tick::SimulationSettings;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Authoritative tile world server", long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, env = "TILE_WORLD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, env = "TILE_WORLD_PORT", default_value = "8080")]
    pub port: u16,

    /// Simulation ticks per second
    #[arg(short, long, env = "TILE_WORLD_TICK_RATE", default_value = "20")]
    pub tick_rate: u32,

    /// Maximum number of concurrent viewers
    #[arg(short, long, env = "TILE_WORLD_MAX_CLIENTS", default_value = "64")]
    pub max_clients: usize,

    /// Width and height in tiles of the square each viewer sees
    #[arg(long, env = "TILE_WORLD_VIEW_DISTANCE", default_value = "32")]
    pub view_distance: f32,

    /// Seconds of silence before a viewer is dropped
    #[arg(long, env = "TILE_WORLD_CLIENT_TIMEOUT", default_value = "5")]
    pub client_timeout: u64,

    /// World content JSON file, the built-in demo world when omitted
    #[arg(short, long, env = "TILE_WORLD_CONTENT")]
    pub content: Option<PathBuf>,

    /// Character save file, characters only live in memory when omitted
    #[arg(long, env = "TILE_WORLD_SAVE_FILE")]
    pub save_file: Option<PathBuf>,

    /// Seconds between character saves
    #[arg(long, env = "TILE_WORLD_PERSIST_INTERVAL", default_value = "30")]
    pub persist_interval: u64,

    /// Seconds a dead npc stays in the world
    #[arg(long, env = "TILE_WORLD_CORPSE_DURATION", default_value = "5")]
    pub corpse_duration: u64,

    /// Seed for the simulation's random decisions
    #[arg(long, env = "TILE_WORLD_SEED")]
    pub seed: Option<u64>,

    /// Send raw diffs instead of optimized ones
    #[arg(long, env = "TILE_WORLD_NO_PATCH_OPTIMIZER")]
    pub no_patch_optimizer: bool,

    /// Accept `guest:<name>` tokens with player permissions
    #[arg(long, env = "TILE_WORLD_ALLOW_GUESTS")]
    pub allow_guests: bool,

    /// Outgoing datagrams that may queue before new ones are dropped
    #[arg(long, env = "TILE_WORLD_SEND_QUEUE", default_value = "1024")]
    pub send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tick_rate: 20,
            max_clients: 64,
            view_distance: 32.0,
            client_timeout: 5,
            content: None,
            save_file: None,
            persist_interval: 30,
            corpse_duration: 5,
            seed: None,
            no_patch_optimizer: false,
            allow_guests: false,
            send_queue: 1024,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Fixed simulation step
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_secs(self.persist_interval.max(1))
    }

    pub fn optimizer(&self) -> PatchOptimizer {
        if self.no_patch_optimizer {
            PatchOptimizer::disabled()
        } else {
            PatchOptimizer::default()
        }
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        SimulationSettings {
            corpse_duration: Duration::from_secs(self.corpse_duration),
            seed: self.seed,
            ..SimulationSettings::default()
        }
    }
}
