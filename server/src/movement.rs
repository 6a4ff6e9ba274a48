//! Single-step movement with boundary clamping

use pixel_shared::{Direction, GameConfig};

/// Computes the position after one unit step
///
/// Each axis is clamped with `player_size / 2` as margin. Returns `None` when
/// the step is absorbed by a boundary and the position would not change.
pub fn step(x: i32, y: i32, direction: Direction, config: &GameConfig) -> Option<(i32, i32)> {
    let margin = config.player_size / 2;

    let (new_x, new_y) = match direction {
        Direction::Up => (x, (y - 1).max(margin)),
        Direction::Down => (x, (y + 1).min(config.height - margin)),
        Direction::Left => ((x - 1).max(margin), y),
        Direction::Right => ((x + 1).min(config.width - margin), y),
    };

    if (new_x, new_y) == (x, y) {
        None
    } else {
        Some((new_x, new_y))
    }
}

/// Parses a raw direction token and applies it
///
/// Unknown tokens are rejected the same way as absorbed steps.
pub fn step_token(x: i32, y: i32, token: &str, config: &GameConfig) -> Option<(i32, i32)> {
    let direction = token.parse::<Direction>().ok()?;
    step(x, y, direction, config)
}
