use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use room_replay::room::{RoomClient, RoomRequest};
use room_replay::transport::{Connection, MockConnection, WebSocketConnection, WsTarget};
use room_replay::{Cli, FrameStore, ReplayConfig, Session, SessionEnd, telemetry};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init()?;

    let cli = Cli::parse();
    let config = ReplayConfig::try_from(cli).context("invalid configuration")?;
    let store = FrameStore::load(&config.join_source, &config.heartbeat_b64)
        .context("failed to load frames")?;
    info!(
        uid = config.uid,
        ws_url = %config.ws_url,
        join_frames = store.join.len(),
        heartbeat_bytes = store.heartbeat.len(),
        dry_run = config.dry_run,
        "starting room replay"
    );

    run(config, store).await
}

async fn run(config: ReplayConfig, store: FrameStore) -> Result<()> {
    let connection: Arc<dyn Connection> = if config.dry_run {
        warn!("dry run: no room entry, frames go to an in-memory connection");
        Arc::new(MockConnection::new())
    } else {
        if config.skip_room_entry {
            info!("step 1: room entry skipped");
        } else {
            info!("step 1: entering room via HTTP");
            let client = RoomClient::new(&config.device, &config.auth_token)
                .context("failed to build room client")?;
            let request = RoomRequest {
                url: config.room_url.clone(),
                uid: config.uid,
                signature: config.signature.clone(),
            };
            client.enter(&request).await.context("room entry failed")?;
        }

        info!("step 2: opening websocket");
        let target = WsTarget::new(config.ws_url.clone())
            .with_headers(config.device.ws_headers(&config.auth_token))
            .insecure(config.insecure_tls);
        let connection = WebSocketConnection::connect(&target)
            .await
            .context("websocket connection failed")?;
        Arc::new(connection)
    };

    info!("step 3: replaying join sequence, then keeping the session alive (Ctrl+C to stop)");
    let session = Session::new(connection, config.timing);
    let end = session
        .run(&store, async {
            if let Err(err) = signal::ctrl_c().await {
                error!(error = %err, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("session failed")?;

    match end {
        SessionEnd::Shutdown { heartbeats } => {
            info!(heartbeats, "interrupted by user; session closed");
            Ok(())
        }
        SessionEnd::HeartbeatFailed { heartbeats, error } => {
            bail!("session ended after {heartbeats} heartbeats: heartbeat failed: {error}")
        }
    }
}
