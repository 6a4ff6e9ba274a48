use thiserror::Error;

/// Rejected canvas geometry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i32 },

    #[error("{field} of {value} leaves no spawn area for player size {player_size}")]
    NoSpawnArea {
        field: &'static str,
        value: i32,
        player_size: i32,
    },
}

/// Failures that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the persistence mirror. Never reach clients.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mirror rejected {operation}: HTTP {status}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
    },
}
