// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Timing knobs for a node.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How often a session re-announces its object and runs a sync round.
    pub broadcast_interval: Duration,
    /// How long `join` searches for a room before giving up.
    pub discovery_timeout: Duration,
    /// Pause between discovery attempts.
    pub discovery_retry: Duration,
    /// Pushed operation batches buffered per session.
    pub inbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Config {
        return Config {
            broadcast_interval: Duration::from_secs(2),
            discovery_timeout: Duration::from_secs(30),
            discovery_retry: Duration::from_millis(250),
            inbox_capacity: 1024,
        };
    }
}
