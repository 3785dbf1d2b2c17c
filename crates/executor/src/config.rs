use std::path::PathBuf;
use std::time::Duration;

use aggregator::WorkerSettings;
use clap::{Args, Parser};
use storage::PoolSettings;

use crate::actors::SupervisorSettings;

/// Database flags shared by both processes.
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// SQLite file holding the trade queue and account statistics
    #[arg(long = "db", env = "TRADES_DB", default_value = "data.db")]
    pub db_path: PathBuf,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 25)]
    pub max_connections: u32,

    #[arg(long, env = "DB_MIN_CONNECTIONS", default_value_t = 5)]
    pub min_connections: u32,

    /// Connections older than this are recycled
    #[arg(long, env = "DB_MAX_LIFETIME_SECS", default_value_t = 300)]
    pub max_lifetime_secs: u64,

    /// How long SQLite waits on a locked database; must stay below the op timeout
    #[arg(long, env = "DB_BUSY_TIMEOUT_MS", default_value_t = 3000)]
    pub busy_timeout_ms: u64,

    /// Upper bound on any single storage operation
    #[arg(long, env = "DB_OP_TIMEOUT_MS", default_value_t = 5000)]
    pub op_timeout_ms: u64,
}

impl StorageArgs {
    pub fn pool_settings(&self) -> PoolSettings {
        let mut settings = PoolSettings::new(self.db_path.clone());
        settings.max_connections = self.max_connections;
        settings.min_connections = self.min_connections;
        settings.max_lifetime = Duration::from_secs(self.max_lifetime_secs);
        settings.busy_timeout = Duration::from_millis(self.busy_timeout_ms);
        settings
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "trade-server",
    version,
    about = "HTTP ingestion gateway for the trade queue"
)]
pub struct ServerArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Address to bind; a bare port listens on all interfaces
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Minimum spacing between requests from one client, 0 disables throttling
    #[arg(long, env = "THROTTLE_MS", default_value_t = 100)]
    pub throttle_ms: u64,

    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,
}

impl ServerArgs {
    pub fn listen_addr(&self) -> String {
        let listen = self.listen.trim();
        if let Some(port) = listen.strip_prefix(':') {
            format!("0.0.0.0:{}", port)
        } else if listen.parse::<u16>().is_ok() {
            format!("0.0.0.0:{}", listen)
        } else {
            listen.to_string()
        }
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "trade-worker",
    version,
    about = "Folds queued trades into account statistics"
)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Idle wait after an empty poll
    #[arg(long = "poll-ms", env = "POLL_INTERVAL_MS", default_value_t = 100)]
    pub poll_ms: u64,

    /// Maximum trades fetched per poll
    #[arg(
        long = "batch",
        env = "BATCH_SIZE",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub batch_size: u32,

    /// Time allowed for an in-flight commit to finish on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE_MS", default_value_t = 5000)]
    pub shutdown_grace_ms: u64,
}

impl WorkerArgs {
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            poll_interval: Duration::from_millis(self.poll_ms),
            batch_size: self.batch_size,
        }
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
            ..SupervisorSettings::default()
        }
    }
}
