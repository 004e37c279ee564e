use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use thiserror::Error;
use url::Url;

use crate::frames::{DEFAULT_HEARTBEAT_B64, FrameSource};
use crate::identity::DeviceProfile;
use crate::session::SessionTiming;

pub const DEFAULT_ROOM_URL: &str = "https://mm-turnover.ihago.net/api/1802/1012";
pub const DEFAULT_SIGNATURE: &str = "e9a3e9f0b6770d8b98c3d3cd730bde10";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{flag} / {env} is required ({hint})")]
    Missing {
        flag: &'static str,
        env: &'static str,
        hint: &'static str,
    },
    #[error("OLA_UID must be a numeric account id, got {0:?}")]
    InvalidUid(String),
    #[error("invalid {name} {value:?}: {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("heartbeat period ({period:?}) must be longer than the join pacing ({pacing:?})")]
    HeartbeatNotAfterPacing { period: Duration, pacing: Duration },
}

#[derive(Debug, Parser)]
#[command(
    name = "room-replay",
    author,
    version,
    about = "Enter a room, replay the captured join frames and stay online"
)]
pub struct Cli {
    /// Numeric account id.
    #[arg(long, env = "OLA_UID")]
    pub uid: Option<String>,

    /// URL-encoded auth token sent to both the room service and the gateway.
    #[arg(long, env = "OLA_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Full websocket URL of the room gateway.
    #[arg(long, env = "OLA_WS_URL")]
    pub ws_url: Option<String>,

    /// Room-entry endpoint.
    #[arg(long, env = "OLA_ROOM_URL", default_value = DEFAULT_ROOM_URL)]
    pub room_url: String,

    /// Signature for the room-entry payload.
    #[arg(long, env = "OLA_ROOM_SIGNATURE", default_value = DEFAULT_SIGNATURE)]
    pub signature: String,

    /// Join frames as written by `ws-log-to-frames` (python, plain or json).
    #[arg(long, env = "OLA_JOIN_FRAMES", conflicts_with = "join_log")]
    pub join_frames: Option<PathBuf>,

    /// Raw logcat dump to extract the join frames from.
    #[arg(long, env = "OLA_JOIN_LOG")]
    pub join_log: Option<PathBuf>,

    /// Base64 heartbeat payload.
    #[arg(long, env = "OLA_HEARTBEAT_B64", default_value = DEFAULT_HEARTBEAT_B64)]
    pub heartbeat_b64: String,

    /// Skip TLS certificate verification on the websocket.
    #[arg(
        long,
        env = "OLA_WS_INSECURE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub insecure: bool,

    /// Reply window after each join frame.
    #[arg(long, env = "OLA_LISTEN_WINDOW_MS", default_value_t = 1000)]
    pub listen_window_ms: u64,

    /// Pause between join frames.
    #[arg(long, env = "OLA_PACING_MS", default_value_t = 150)]
    pub pacing_ms: u64,

    /// Interval between heartbeats.
    #[arg(long, env = "OLA_HEARTBEAT_SECS", default_value_t = 15)]
    pub heartbeat_secs: u64,

    /// Listen for a reply after each heartbeat (off by default).
    #[arg(long, env = "OLA_HEARTBEAT_LISTEN_MS")]
    pub heartbeat_listen_ms: Option<u64>,

    /// Assume the room was already entered.
    #[arg(long)]
    pub skip_room_entry: bool,

    /// Run the session against an in-memory connection; no network traffic.
    #[arg(long)]
    pub dry_run: bool,
}

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub uid: u64,
    pub auth_token: String,
    pub ws_url: Url,
    pub room_url: Url,
    pub signature: String,
    pub join_source: FrameSource,
    pub heartbeat_b64: String,
    pub insecure_tls: bool,
    pub timing: SessionTiming,
    pub skip_room_entry: bool,
    pub dry_run: bool,
    pub device: DeviceProfile,
}

impl TryFrom<Cli> for ReplayConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let uid_raw = require(cli.uid, "--uid", "OLA_UID", "numeric account id")?;
        let uid = uid_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidUid(uid_raw.clone()))?;
        let auth_token = require(
            cli.auth_token,
            "--auth-token",
            "OLA_AUTH_TOKEN",
            "URL-encoded token",
        )?;
        let ws_url = require(cli.ws_url, "--ws-url", "OLA_WS_URL", "full websocket URL")?;
        let ws_url = parse_url("OLA_WS_URL", &ws_url, &["ws", "wss"])?;
        let room_url = parse_url("OLA_ROOM_URL", &cli.room_url, &["http", "https"])?;

        let join_source = match (cli.join_frames, cli.join_log) {
            (Some(path), _) => FrameSource::List(path),
            (None, Some(path)) => FrameSource::TraceLog(path),
            (None, None) => {
                return Err(ConfigError::Missing {
                    flag: "--join-frames",
                    env: "OLA_JOIN_FRAMES",
                    hint: "or --join-log / OLA_JOIN_LOG",
                });
            }
        };

        let timing = SessionTiming {
            listen_window: Duration::from_millis(cli.listen_window_ms),
            pacing: Duration::from_millis(cli.pacing_ms),
            heartbeat_period: Duration::from_secs(cli.heartbeat_secs),
            heartbeat_listen: cli.heartbeat_listen_ms.map(Duration::from_millis),
        };
        if timing.heartbeat_period.is_zero() {
            return Err(ConfigError::ZeroDuration("--heartbeat-secs"));
        }
        if timing.listen_window.is_zero() {
            return Err(ConfigError::ZeroDuration("--listen-window-ms"));
        }
        if timing.heartbeat_period <= timing.pacing {
            return Err(ConfigError::HeartbeatNotAfterPacing {
                period: timing.heartbeat_period,
                pacing: timing.pacing,
            });
        }

        Ok(ReplayConfig {
            uid,
            auth_token,
            ws_url,
            room_url,
            signature: cli.signature,
            join_source,
            heartbeat_b64: cli.heartbeat_b64,
            insecure_tls: cli.insecure,
            timing,
            skip_room_entry: cli.skip_room_entry,
            dry_run: cli.dry_run,
            device: DeviceProfile::default(),
        })
    }
}

fn require(
    value: Option<String>,
    flag: &'static str,
    env: &'static str,
    hint: &'static str,
) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { flag, env, hint })
}

fn parse_url(name: &'static str, value: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|err| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
            reason: format!("scheme must be one of {}", schemes.join(", ")),
        });
    }
    Ok(url)
}
