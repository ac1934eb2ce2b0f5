mod client;
mod commands;
mod outbox;
mod worker;

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::client::SyncClient;

#[derive(Parser)]
#[command(name = "locker-agent")]
#[command(version, about = "Locker-side outbox that syncs package drop-offs to the server", long_about = None)]
struct Cli {
    /// Path to the local outbox database
    #[arg(long, env = "SQLITE_PATH", default_value = "./locker.db", global = true)]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local outbox database
    Init {
        /// Back up an existing database to <name>.db.bak and start over
        #[arg(long)]
        reset: bool,
    },

    /// Queue a dropped-off package for sync
    Dropoff {
        /// Tracking ID for the package (generated when omitted)
        tracking_id: Option<String>,

        /// Lifecycle status reported to the server
        #[arg(short, long, default_value = "dropped_off")]
        status: String,

        /// This locker's identifier
        #[arg(long, env = "LOCKER_ID", default_value = "locker-local")]
        locker_id: String,
    },

    /// Send pending packages until the server acks them
    Sync {
        /// Run a single pass instead of looping
        #[arg(long)]
        once: bool,

        #[command(flatten)]
        args: SyncArgs,
    },

    /// Reset failed packages to pending and attempt sync
    #[command(name = "retry-failed")]
    RetryFailed {
        #[command(flatten)]
        args: SyncArgs,
    },

    /// Show how many packages are pending, synced and failed
    Status,
}

/// Settings shared by every command that talks to the server
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Server sync endpoint
    #[arg(long, env = "SERVER_SYNC_URL", default_value = "http://localhost:8080/sync")]
    pub server_url: String,

    /// Seconds between sync passes
    #[arg(long, env = "SYNC_INTERVAL_SECONDS", default_value_t = 5)]
    pub interval_secs: u64,

    /// Sends per package before it is marked failed
    #[arg(long, env = "MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 10)]
    pub timeout_secs: u64,
}

impl SyncArgs {
    pub fn client(&self) -> Result<SyncClient> {
        Ok(SyncClient::new(
            self.server_url.clone(),
            Duration::from_secs(self.timeout_secs),
        )?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("locker_agent=info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    match cli.command {
        Commands::Init { reset } => {
            commands::init::execute(&cli.db, reset).await?;
        }
        Commands::Dropoff {
            tracking_id,
            status,
            locker_id,
        } => {
            commands::dropoff::execute(&cli.db, &locker_id, tracking_id, &status).await?;
        }
        Commands::Sync { once, args } => {
            commands::sync::execute(&cli.db, &args, once).await?;
        }
        Commands::RetryFailed { args } => {
            commands::retry::execute(&cli.db, &args).await?;
        }
        Commands::Status => {
            commands::status::execute(&cli.db).await?;
        }
    }

    Ok(())
}
