//! Spawn placement and identity assignment for joining players

use crate::utils::palette_color;
use pixel_shared::{GameConfig, Participant};
use rand::Rng;

/// Length of the public player identifier in hex characters.
pub const PUBLIC_ID_LEN: usize = 8;

/// Draws a fresh public identifier
pub fn generate_public_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:0width$x}", rng.gen::<u32>(), width = PUBLIC_ID_LEN)
}

/// Draws a uniform spawn position
///
/// The reserved margin is the full player size on every side, wider than the
/// `player_size / 2` margin used when clamping moves.
pub fn spawn_position<R: Rng + ?Sized>(rng: &mut R, config: &GameConfig) -> (i32, i32) {
    let margin = config.player_size;
    let x = rng.gen_range(margin..=config.width - margin);
    let y = rng.gen_range(margin..=config.height - margin);
    (x, y)
}

/// Builds the participant for a connection joining a room of `occupancy` players
///
/// Name and color derive from the occupancy count observed before insertion,
/// so the caller must hold exclusive access to the registry between reading
/// the count and inserting the result. Nothing is mutated here.
pub fn allocate<R: Rng + ?Sized>(
    rng: &mut R,
    occupancy: usize,
    public_id: String,
    config: &GameConfig,
    now: u64,
) -> Participant {
    let (x, y) = spawn_position(rng, config);

    Participant {
        public_id,
        x,
        y,
        color: palette_color(occupancy).to_string(),
        display_name: format!("Player{}", occupancy + 1),
        last_update_millis: now,
    }
}
