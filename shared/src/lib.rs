//! Wire protocol shared by the presence server and its clients.
//!
//! Every WebSocket text frame carries one JSON envelope of the form
//! `{"event": "<name>", "data": {...}}`. Inbound frames decode into
//! [`ClientEvent`], outbound frames are produced from [`ServerEvent`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_WIDTH: i32 = 800;
pub const DEFAULT_HEIGHT: i32 = 600;
pub const DEFAULT_PLAYER_SIZE: i32 = 4;

/// Longest display name accepted after trimming.
pub const MAX_NAME_LEN: usize = 20;

/// Spawn colors, handed out round-robin by join order.
pub const PLAYER_COLORS: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9", "#F8C471", "#82E0AA", "#AED6F1", "#D7BDE2", "#F9E79F",
];

/// Canvas geometry sent to every joining client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub player_size: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            player_size: DEFAULT_PLAYER_SIZE,
        }
    }
}

/// Server-side record of one connected client, also its wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(rename = "id")]
    pub public_id: String,
    pub x: i32,
    pub y: i32,
    pub color: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "lastUpdate")]
    pub last_update_millis: u64,
}

/// One unit step on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

/// Events a client may send.
///
/// The direction stays a raw token on the wire so that an unknown value drops
/// only the move, not the decoding of the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    MovePlayer { direction: String },
    UpdatePlayerName { name: String },
    GetPlayersList,
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    GameState {
        players: Vec<Participant>,
        your_player_id: String,
        game_config: GameConfig,
    },
    PlayerJoined(Participant),
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: String,
        player_name: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayerMoved {
        player_id: String,
        x: i32,
        y: i32,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    PlayerNameChanged {
        player_id: String,
        old_name: String,
        new_name: String,
    },
    PlayersList {
        players: Vec<Participant>,
        count: usize,
    },
}

impl ServerEvent {
    /// Event name as it appears in the envelope.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GameState { .. } => "game_state",
            ServerEvent::PlayerJoined(_) => "player_joined",
            ServerEvent::PlayerLeft { .. } => "player_left",
            ServerEvent::PlayerMoved { .. } => "player_moved",
            ServerEvent::PlayerNameChanged { .. } => "player_name_changed",
            ServerEvent::PlayersList { .. } => "players_list",
        }
    }
}

impl ClientEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_participant() -> Participant {
        Participant {
            public_id: "a1b2c3d4".to_string(),
            x: 10,
            y: 20,
            color: PLAYER_COLORS[0].to_string(),
            display_name: "Player1".to_string(),
            last_update_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_participant_wire_names() {
        let value = serde_json::to_value(sample_participant()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "a1b2c3d4",
                "x": 10,
                "y": 20,
                "color": "#FF6B6B",
                "name": "Player1",
                "lastUpdate": 1_700_000_000_000u64,
            })
        );
    }

    #[test]
    fn test_direction_tokens() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("down".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert_eq!("right".parse::<Direction>(), Ok(Direction::Right));
        assert!("UP".parse::<Direction>().is_err());
        assert!("diagonal".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_unknown_direction_error_message() {
        let err = "diagonal".parse::<Direction>().unwrap_err();
        assert_eq!(err, UnknownDirection("diagonal".to_string()));
        assert_eq!(err.to_string(), "unknown direction 'diagonal'");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn test_client_event_decoding() {
        let moved = ClientEvent::from_json(r#"{"event":"move_player","data":{"direction":"left"}}"#)
            .unwrap();
        assert_eq!(
            moved,
            ClientEvent::MovePlayer {
                direction: "left".to_string()
            }
        );

        let renamed =
            ClientEvent::from_json(r#"{"event":"update_player_name","data":{"name":"  Bob "}}"#)
                .unwrap();
        assert_eq!(
            renamed,
            ClientEvent::UpdatePlayerName {
                name: "  Bob ".to_string()
            }
        );

        let listed = ClientEvent::from_json(r#"{"event":"get_players_list"}"#).unwrap();
        assert_eq!(listed, ClientEvent::GetPlayersList);
    }

    #[test]
    fn test_unknown_direction_still_decodes() {
        let event =
            ClientEvent::from_json(r#"{"event":"move_player","data":{"direction":"north"}}"#)
                .unwrap();
        match event {
            ClientEvent::MovePlayer { direction } => assert!(direction.parse::<Direction>().is_err()),
            _ => panic!("Wrong event type after decoding"),
        }
    }

    #[test]
    fn test_malformed_client_events_rejected() {
        assert!(ClientEvent::from_json("not json").is_err());
        assert!(ClientEvent::from_json(r#"{"event":"teleport","data":{}}"#).is_err());
        assert!(ClientEvent::from_json(r#"{"event":"move_player","data":{}}"#).is_err());
    }

    #[test]
    fn test_game_state_envelope() {
        let event = ServerEvent::GameState {
            players: vec![sample_participant()],
            your_player_id: "a1b2c3d4".to_string(),
            game_config: GameConfig::default(),
        };
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(value["event"], "game_state");
        assert_eq!(value["data"]["yourPlayerId"], "a1b2c3d4");
        assert_eq!(value["data"]["players"][0]["name"], "Player1");
        assert_eq!(
            value["data"]["gameConfig"],
            json!({"width": 800, "height": 600, "playerSize": 4})
        );
    }

    #[test]
    fn test_player_joined_carries_full_record() {
        let value: Value =
            serde_json::from_str(&ServerEvent::PlayerJoined(sample_participant()).to_json().unwrap())
                .unwrap();
        assert_eq!(value["event"], "player_joined");
        assert_eq!(value["data"]["id"], "a1b2c3d4");
        assert_eq!(value["data"]["color"], "#FF6B6B");
    }

    #[test]
    fn test_outbound_payload_field_names() {
        let left = serde_json::to_value(ServerEvent::PlayerLeft {
            player_id: "p".to_string(),
            player_name: "n".to_string(),
        })
        .unwrap();
        assert_eq!(left["data"], json!({"playerId": "p", "playerName": "n"}));

        let moved = serde_json::to_value(ServerEvent::PlayerMoved {
            player_id: "p".to_string(),
            x: 5,
            y: 6,
            timestamp: 7,
        })
        .unwrap();
        assert_eq!(moved["event"], "player_moved");
        assert_eq!(moved["data"], json!({"playerId": "p", "x": 5, "y": 6, "timestamp": 7}));

        let renamed = serde_json::to_value(ServerEvent::PlayerNameChanged {
            player_id: "p".to_string(),
            old_name: "a".to_string(),
            new_name: "b".to_string(),
        })
        .unwrap();
        assert_eq!(
            renamed["data"],
            json!({"playerId": "p", "oldName": "a", "newName": "b"})
        );

        let listed = serde_json::to_value(ServerEvent::PlayersList {
            players: vec![],
            count: 0,
        })
        .unwrap();
        assert_eq!(listed["event"], "players_list");
        assert_eq!(listed["data"], json!({"players": [], "count": 0}));
    }

    #[test]
    fn test_event_names_match_envelope() {
        let events = vec![
            ServerEvent::PlayerJoined(sample_participant()),
            ServerEvent::PlayersList {
                players: vec![],
                count: 0,
            },
            ServerEvent::PlayerLeft {
                player_id: "p".to_string(),
                player_name: "n".to_string(),
            },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }
}
