use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Pick a palette color for the n-th concurrent player (zero based)
pub fn palette_color(player_index: usize) -> &'static str {
    let colors = &pixel_shared::PLAYER_COLORS;
    colors[player_index % colors.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_shared::PLAYER_COLORS;

    #[test]
    fn test_timestamp_is_unix_millis() {
        // 2020-01-01 in millis; anything earlier means the unit is wrong
        assert!(get_timestamp() > 1_577_836_800_000);
    }

    #[test]
    fn test_palette_wraps_around() {
        assert_eq!(palette_color(0), PLAYER_COLORS[0]);
        assert_eq!(palette_color(14), PLAYER_COLORS[14]);
        assert_eq!(palette_color(15), PLAYER_COLORS[0]);
        assert_eq!(palette_color(31), PLAYER_COLORS[1]);
    }
}
