//! Process configuration
//!
//! Every option can be given on the command line or through the environment,
//! so the same binary runs locally and on a hosting platform that only sets
//! environment variables.

use crate::error::ConfigError;
use clap::Parser;
use pixel_shared::{GameConfig, DEFAULT_HEIGHT, DEFAULT_PLAYER_SIZE, DEFAULT_WIDTH};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,
    /// Canvas width
    #[clap(long, env = "GAME_WIDTH", default_value_t = DEFAULT_WIDTH)]
    pub width: i32,
    /// Canvas height
    #[clap(long, env = "GAME_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
    pub height: i32,
    /// Player size, governs spawn and movement margins
    #[clap(long, env = "PLAYER_SIZE", default_value_t = DEFAULT_PLAYER_SIZE)]
    pub player_size: i32,
    /// Outbound queue capacity per connection
    #[clap(long, env = "SEND_QUEUE", default_value = "256")]
    pub send_queue: usize,
    /// Directory with the built web client, served at `/`
    #[clap(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
    /// Base URL of the Supabase project used as persistence mirror
    #[clap(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,
    /// Service key for the Supabase mirror
    #[clap(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,
}

/// Connection details of the optional persistence mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub url: String,
    pub service_key: String,
}

/// Fully resolved server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub game: GameConfig,
    pub send_queue: usize,
    pub static_dir: Option<PathBuf>,
    pub mirror: Option<MirrorConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5000".to_string(),
            game: GameConfig::default(),
            send_queue: 256,
            static_dir: None,
            mirror: None,
        }
    }
}

impl ServerConfig {
    /// Builds and validates the settings from parsed arguments
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let game = GameConfig {
            width: args.width,
            height: args.height,
            player_size: args.player_size,
        };
        validate_game_config(&game)?;

        let mirror = match (args.supabase_url, args.supabase_key) {
            (Some(url), Some(service_key)) if !url.is_empty() && !service_key.is_empty() => {
                Some(MirrorConfig { url, service_key })
            }
            _ => None,
        };

        Ok(Self {
            address: format!("{}:{}", args.host, args.port),
            game,
            send_queue: args.send_queue.max(1),
            static_dir: args.static_dir,
            mirror,
        })
    }
}

/// Rejects geometry that would make spawning impossible
///
/// Spawn positions are drawn from `[player_size, side - player_size]`, so each
/// side must be at least twice the player size.
pub fn validate_game_config(game: &GameConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("width", game.width),
        ("height", game.height),
        ("player size", game.player_size),
    ] {
        if value <= 0 {
            return Err(ConfigError::NonPositive { field, value });
        }
    }

    let min_side = game.player_size.checked_mul(2);
    for (field, value) in [("width", game.width), ("height", game.height)] {
        if min_side.map_or(true, |min| value < min) {
            return Err(ConfigError::NoSpawnArea {
                field,
                value,
                player_size: game.player_size,
            });
        }
    }

    Ok(())
}
