//! Node configuration (spec §6 "core-relevant subset").

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::LOG_TARGET;

/// Core-relevant configuration subset (spec §6). WebRTC/signaling-only
/// options (`WebRTC`, `SignalAddr`, ...) don't alter consensus behavior and
/// are left to whatever transport implementation is plugged in.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_dir: PathBuf,
    pub store: bool,
    pub bootstrap: bool,
    pub maintenance_mode: bool,
    pub cache_size: usize,
    pub heartbeat_timeout: Duration,
    pub slow_heartbeat_timeout: Duration,
    pub tcp_timeout: Duration,
    pub join_timeout: Duration,
    pub sync_limit: u64,
    pub suspend_limit: u64,
    pub enable_fast_sync: bool,
    pub max_pool: usize,
    pub moniker: String,
    pub bind_addr: String,
    pub advertise_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_dir: PathBuf::from("./badger_db"),
            store: true,
            bootstrap: false,
            maintenance_mode: false,
            cache_size: 500,
            heartbeat_timeout: Duration::from_millis(1000),
            slow_heartbeat_timeout: Duration::from_millis(10_000),
            tcp_timeout: Duration::from_millis(1000),
            join_timeout: Duration::from_secs(10),
            sync_limit: 1000,
            suspend_limit: 100_000,
            enable_fast_sync: false,
            max_pool: 2,
            moniker: String::from("node"),
            bind_addr: String::from("0.0.0.0:0"),
            advertise_addr: String::new(),
        }
    }
}

impl Config {
    /// Auto-corrects invariant violations that are non-fatal on their own
    /// (spec §7: `SlowHeartbeat < Heartbeat` is fixed up with a warning,
    /// rather than treated as a fatal boot error).
    pub fn validate(&mut self) {
        if self.slow_heartbeat_timeout < self.heartbeat_timeout {
            warn!(
                target: LOG_TARGET,
                slow_heartbeat_timeout_ms = %self.slow_heartbeat_timeout.as_millis(),
                heartbeat_timeout_ms = %self.heartbeat_timeout.as_millis(),
                "SlowHeartbeatTimeout below HeartbeatTimeout, raising it to match"
            );
            self.slow_heartbeat_timeout = self.heartbeat_timeout;
        }
    }
}
