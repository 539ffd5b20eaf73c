//! Command-line flags for the local demo fleet (spec §6 `hgc-node-bin`
//! loads `Config`'s core-relevant subset this way).

use std::time::Duration;

use clap::Parser;
use hgc_node::Config;

#[derive(Debug, Parser)]
#[command(name = "hgc-node", about = "Run a small in-process hashgraph consensus fleet")]
pub struct Cli {
    /// Number of validators to run in this process, wired together over an
    /// in-process loopback transport.
    #[arg(long, env = "HGC_PEERS", default_value_t = 4)]
    pub peers: usize,

    /// How long to let the fleet gossip before shutting down.
    #[arg(long, env = "HGC_RUN_SECS", default_value_t = 5)]
    pub run_secs: u64,

    #[arg(long, env = "HGC_HEARTBEAT_MS", default_value_t = 200)]
    pub heartbeat_ms: u64,

    #[arg(long, env = "HGC_SLOW_HEARTBEAT_MS", default_value_t = 2000)]
    pub slow_heartbeat_ms: u64,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long, env = "HGC_LOG", default_value = "hgc=info")]
    pub log_filter: String,
}

impl Cli {
    pub fn node_config(&self, moniker: impl Into<String>) -> Config {
        Config {
            moniker: moniker.into(),
            heartbeat_timeout: Duration::from_millis(self.heartbeat_ms),
            slow_heartbeat_timeout: Duration::from_millis(self.slow_heartbeat_ms),
            ..Config::default()
        }
    }
}
