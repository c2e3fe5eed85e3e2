//! Configuration for the token authority and the playback monitor.
//!
//! Values are resolved in this order:
//! 1. Entries in the [`SecretStore`] (`port`, `clientId`)
//! 2. Environment variables, optionally loaded from a `.env` file in the local
//!    data directory
//! 3. Built-in defaults

use std::{env, path::PathBuf, time::Duration};

use tracing::warn;

use crate::{
    Res,
    error::StoreError,
    management::{SecretStore, keys},
};

pub const DEFAULT_CLIENT_ID: &str = "902fe6b9a4b6421caf88ee01e809939a";
pub const DEFAULT_CALLBACK_PORT: u16 = 58642;
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";

pub const SCOPES: [&str; 4] = [
    "user-modify-playback-state",
    "user-read-playback-state",
    "playlist-read-private",
    "playlist-read-collaborative",
];

const MIN_POLL_SECS: u64 = 1;
const MAX_POLL_SECS: u64 = 3;

/// Returns the directory holding `.env` and `secrets.json`.
///
/// - Linux: `~/.local/share/spotbridge`
/// - macOS: `~/Library/Application Support/spotbridge`
/// - Windows: `%LOCALAPPDATA%/spotbridge`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotbridge");
    path
}

/// Loads environment variables from `<data dir>/.env` if that file exists.
pub async fn load_env() -> Res<()> {
    let path = data_dir().join(".env");
    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(())
}

/// Everything needed to start one authorization round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub client_id: String,
    pub callback_port: u16,
    pub authorize_url: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            authorize_url: DEFAULT_AUTH_URL.to_string(),
        }
    }
}

impl AuthSettings {
    /// Resolves settings from the store, then the environment, then defaults.
    pub async fn resolve(store: &dyn SecretStore) -> Result<Self, StoreError> {
        let client_id = match store.get_string(keys::CLIENT_ID).await? {
            Some(id) if !id.is_empty() => id,
            _ => env::var("SPOTBRIDGE_CLIENT_ID").unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string()),
        };

        let stored_port = store.get_int(keys::PORT).await?;
        let env_port = env::var("SPOTBRIDGE_CALLBACK_PORT")
            .ok()
            .and_then(|p| p.parse::<i64>().ok());
        let callback_port = stored_port
            .or(env_port)
            .map(valid_port)
            .unwrap_or(DEFAULT_CALLBACK_PORT);

        Ok(Self {
            client_id,
            callback_port,
            authorize_url: env::var("SPOTIFY_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
        })
    }
}

fn valid_port(port: i64) -> u16 {
    match u16::try_from(port) {
        Ok(p) if p >= 1024 => p,
        _ => {
            warn!(port, default = DEFAULT_CALLBACK_PORT, "callback port out of range");
            DEFAULT_CALLBACK_PORT
        }
    }
}

/// Time bounds of the authorization round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    /// How long a caller waits for the authorization lock before giving up.
    pub lock_wait: Duration,
    /// How long the browser has to deliver the callback.
    pub callback: Duration,
    /// Upper bound on draining the listener after a successful attempt.
    pub listener_grace: Duration,
}

impl Default for AuthTimeouts {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_secs(10),
            callback: Duration::from_secs(60),
            listener_grace: Duration::from_secs(15),
        }
    }
}

/// Interval between playback polls, clamped to one to three seconds.
pub fn poll_interval() -> Duration {
    let secs = env::var("SPOTBRIDGE_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(MAX_POLL_SECS)
        .clamp(MIN_POLL_SECS, MAX_POLL_SECS);
    Duration::from_secs(secs)
}

/// Base URL of the Web API, e.g. `https://api.spotify.com/v1`.
pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}
