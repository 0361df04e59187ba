use std::time::Duration;

use clap::Parser;
use hakkero::prelude::*;
use tracing_subscriber::EnvFilter;

/// Runs a Hakkero storytelling server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = hakkero::DEFAULT_BIND_ADDR)]
    bind: String,
    /// Players per match
    #[arg(short, long, default_value_t = 4)]
    player: usize,
    /// Seconds each player gets per turn
    #[arg(short, long, default_value_t = 60)]
    timeout: u64,
    /// Seconds between a room's creation and its first turn
    #[arg(long, default_value_t = 10)]
    warmup: u64,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_bind_addr(self.bind.clone())
            .with_queue(
                QueueConfig::default()
                    .with_player_limit(self.player)
                    .with_turn_timeout(Duration::from_secs(self.timeout)),
            )
            .with_room(RoomConfig::default().with_warmup(Duration::from_secs(self.warmup)))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let server = HakkeroServer::builder()
        .config(args.server_config())
        .build()
        .await?;
    tracing::info!(
        addr = %server.local_addr()?,
        players = server.config().queue.player_limit,
        "story server listening"
    );

    let rooms = server.rooms();
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(rooms = rooms.len(), "shutting down");
        }
    }
    Ok(())
}
