//! Best-effort mirror of live players into a Supabase `players` table
//!
//! The mirror is write-only. The session actor hands operations to a detached
//! worker over an unbounded channel and never waits for them; failures are
//! logged and dropped. Nothing is ever read back into the live registry.

use crate::config::MirrorConfig;
use crate::error::MirrorError;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use log::{debug, error, info, warn};
use pixel_shared::Participant;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;

const TABLE_PATH: &str = "/rest/v1/players";
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const INACTIVE_AFTER_MINUTES: i64 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One mirrored change, keyed by the participant's public id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOp {
    Insert(Participant),
    UpdatePosition { public_id: String, x: i32, y: i32 },
    UpdateName { public_id: String, name: String },
    Remove { public_id: String },
    SweepInactive { older_than: DateTime<Utc> },
}

/// HTTP request derived from a mirror operation
///
/// Query pairs are left unencoded; reqwest encodes them when the request is built.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorRequest {
    pub method: Method,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl MirrorOp {
    pub fn name(&self) -> &'static str {
        match self {
            MirrorOp::Insert(_) => "insert",
            MirrorOp::UpdatePosition { .. } => "update position",
            MirrorOp::UpdateName { .. } => "update name",
            MirrorOp::Remove { .. } => "remove",
            MirrorOp::SweepInactive { .. } => "sweep",
        }
    }

    /// Maps the operation onto a PostgREST call, stamping it with `now`
    pub fn to_request(&self, now: DateTime<Utc>) -> MirrorRequest {
        let stamp = now.to_rfc3339();
        match self {
            MirrorOp::Insert(participant) => MirrorRequest {
                method: Method::POST,
                query: Vec::new(),
                body: Some(json!({
                    "session_id": participant.public_id,
                    "name": participant.display_name,
                    "x": participant.x,
                    "y": participant.y,
                    "color": participant.color,
                    "last_update": stamp,
                })),
            },
            MirrorOp::UpdatePosition { public_id, x, y } => MirrorRequest {
                method: Method::PATCH,
                query: vec![("session_id", format!("eq.{}", public_id))],
                body: Some(json!({ "x": x, "y": y, "last_update": stamp })),
            },
            MirrorOp::UpdateName { public_id, name } => MirrorRequest {
                method: Method::PATCH,
                query: vec![("session_id", format!("eq.{}", public_id))],
                body: Some(json!({ "name": name, "last_update": stamp })),
            },
            MirrorOp::Remove { public_id } => MirrorRequest {
                method: Method::DELETE,
                query: vec![("session_id", format!("eq.{}", public_id))],
                body: None,
            },
            MirrorOp::SweepInactive { older_than } => MirrorRequest {
                method: Method::DELETE,
                query: vec![(
                    "last_update",
                    format!("lt.{}", older_than.to_rfc3339_opts(SecondsFormat::Millis, true)),
                )],
                body: None,
            },
        }
    }
}

/// Non-blocking entry point to the mirror worker
///
/// A disabled handle swallows every operation.
#[derive(Debug, Clone, Default)]
pub struct MirrorHandle {
    tx: Option<mpsc::UnboundedSender<MirrorOp>>,
}

impl MirrorHandle {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Wraps an existing channel, letting callers observe queued operations
    pub fn from_sender(tx: mpsc::UnboundedSender<MirrorOp>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Starts the mirror worker when configured, otherwise returns a disabled handle
    pub fn spawn(config: Option<MirrorConfig>) -> Self {
        let Some(config) = config else {
            warn!("Supabase credentials not configured, player mirror disabled");
            return Self::disabled();
        };

        let mirror = match SupabaseMirror::new(config) {
            Ok(mirror) => mirror,
            Err(e) => {
                error!("Failed to build Supabase client, player mirror disabled: {}", e);
                return Self::disabled();
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        info!("Mirroring players to {}", mirror.base_url);
        tokio::spawn(mirror.run(rx));
        Self::from_sender(tx)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues an operation without waiting for it
    pub fn record(&self, op: MirrorOp) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(op) {
                warn!("Player mirror worker stopped, dropping {}", e.0.name());
            }
        }
    }
}

/// PostgREST client for the `players` table
struct SupabaseMirror {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseMirror {
    fn new(config: MirrorConfig) -> Result<Self, MirrorError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key,
        })
    }

    /// Applies queued operations and sweeps stale rows until the channel closes
    async fn run(self, mut rx: mpsc::UnboundedReceiver<MirrorOp>) {
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);
        sweep.tick().await;

        loop {
            tokio::select! {
                op = rx.recv() => {
                    match op {
                        Some(op) => self.apply_logged(op).await,
                        None => break,
                    }
                }
                _ = sweep.tick() => {
                    let older_than = Utc::now() - ChronoDuration::minutes(INACTIVE_AFTER_MINUTES);
                    self.apply_logged(MirrorOp::SweepInactive { older_than }).await;
                }
            }
        }

        debug!("Player mirror worker finished");
    }

    async fn apply_logged(&self, op: MirrorOp) {
        if let Err(e) = self.apply(&op).await {
            warn!("Player mirror {} failed: {}", op.name(), e);
        }
    }

    async fn apply(&self, op: &MirrorOp) -> Result<(), MirrorError> {
        let request = op.to_request(Utc::now());

        let url = format!("{}{}", self.base_url, TABLE_PATH);

        let mut builder = self
            .client
            .request(request.method, url)
            .query(&request.query)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(MirrorError::Status {
                operation: op.name(),
                status: response.status(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn participant() -> Participant {
        Participant {
            public_id: "0badc0de".to_string(),
            x: 12,
            y: 34,
            color: "#4ECDC4".to_string(),
            display_name: "Player2".to_string(),
            last_update_millis: 0,
        }
    }

    #[test]
    fn test_insert_request() {
        let request = MirrorOp::Insert(participant()).to_request(now());
        assert_eq!(request.method, Method::POST);
        assert!(request.query.is_empty());

        let body = request.body.unwrap();
        assert_eq!(body["session_id"], "0badc0de");
        assert_eq!(body["name"], "Player2");
        assert_eq!(body["x"], 12);
        assert_eq!(body["y"], 34);
        assert_eq!(body["color"], "#4ECDC4");
        assert_eq!(body["last_update"], "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_update_requests_filter_by_player() {
        let moved = MirrorOp::UpdatePosition {
            public_id: "0badc0de".to_string(),
            x: 1,
            y: 2,
        }
        .to_request(now());
        assert_eq!(moved.method, Method::PATCH);
        assert_eq!(moved.query, vec![("session_id", "eq.0badc0de".to_string())]);
        assert_eq!(moved.body.as_ref().unwrap()["x"], 1);

        let renamed = MirrorOp::UpdateName {
            public_id: "0badc0de".to_string(),
            name: "Zed".to_string(),
        }
        .to_request(now());
        assert_eq!(renamed.method, Method::PATCH);
        assert_eq!(renamed.body.as_ref().unwrap()["name"], "Zed");
    }

    #[test]
    fn test_delete_requests() {
        let removed = MirrorOp::Remove {
            public_id: "0badc0de".to_string(),
        }
        .to_request(now());
        assert_eq!(removed.method, Method::DELETE);
        assert_eq!(removed.query, vec![("session_id", "eq.0badc0de".to_string())]);
        assert!(removed.body.is_none());

        let swept = MirrorOp::SweepInactive {
            older_than: now() - ChronoDuration::minutes(INACTIVE_AFTER_MINUTES),
        }
        .to_request(now());
        assert_eq!(swept.method, Method::DELETE);
        assert!(swept.body.is_none());
    }

    #[test]
    fn test_sweep_cutoff_survives_url_encoding() {
        let swept = MirrorOp::SweepInactive {
            older_than: now() - ChronoDuration::minutes(INACTIVE_AFTER_MINUTES),
        }
        .to_request(now());

        let url = reqwest::Url::parse_with_params(
            &format!("https://example.supabase.co{}", TABLE_PATH),
            &swept.query,
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(
            pairs,
            vec![(
                "last_update".to_string(),
                "lt.2024-05-01T11:55:00.000Z".to_string()
            )]
        );
        assert!(DateTime::parse_from_rfc3339(&pairs[0].1["lt.".len()..]).is_ok());
    }

    #[tokio::test]
    async fn test_spawn_with_credentials_enables_mirror() {
        let handle = MirrorHandle::spawn(Some(MirrorConfig {
            url: "http://127.0.0.1:9/".to_string(),
            service_key: "key".to_string(),
        }));
        assert!(handle.is_enabled());
    }

    #[test]
    fn test_spawn_without_credentials_is_disabled() {
        assert!(!MirrorHandle::spawn(None).is_enabled());
    }

    #[test]
    fn test_disabled_handle_swallows_operations() {
        let handle = MirrorHandle::disabled();
        assert!(!handle.is_enabled());
        handle.record(MirrorOp::Remove {
            public_id: "x".to_string(),
        });
    }

    #[test]
    fn test_handle_forwards_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = MirrorHandle::from_sender(tx);
        handle.record(MirrorOp::Remove {
            public_id: "x".to_string(),
        });

        assert_eq!(
            rx.try_recv().unwrap(),
            MirrorOp::Remove {
                public_id: "x".to_string()
            }
        );
    }

    #[test]
    fn test_record_after_worker_stopped_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        MirrorHandle::from_sender(tx).record(MirrorOp::Remove {
            public_id: "x".to_string(),
        });
    }
}
