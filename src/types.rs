use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils;

/// An OAuth access token together with its absolute expiration.
///
/// Tokens are never mutated. A refresh replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expiration: DateTime<Utc>,
}

impl Token {
    /// Returns `None` for an empty value.
    pub fn new(value: impl Into<String>, expiration: DateTime<Utc>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            return None;
        }
        Some(Self { value, expiration })
    }

    /// Builds a token that expires `expires_in` seconds after `now`.
    pub fn expiring_in(
        value: impl Into<String>,
        expires_in: u32,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        Self::new(value, utils::expiration_after(now, expires_in))
    }

    /// Rebuilds a token from its persisted `(accessToken, tokenExpiration)` pair.
    ///
    /// Returns `None` for an empty value or an unrepresentable timestamp.
    pub fn from_persisted(value: String, expiration_secs: i64) -> Option<Self> {
        let expiration = Utc.timestamp_opt(expiration_secs, 0).single()?;
        Self::new(value, expiration)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }
}

/// Per-attempt bookkeeping for one browser round trip. Never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub state: String,
    pub callback_port: u16,
}

impl AuthorizationRequest {
    pub fn new(callback_port: u16) -> Self {
        Self {
            state: utils::generate_state(),
            callback_port,
        }
    }
}

/// States a [`crate::playback::PlaybackMonitor`] reports to its listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Play,
    Pause,
    Broken,
    /// Terminal. Emitted once when the track is judged finished.
    Done,
}

/// One poll's snapshot of the remote player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackObservation {
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub track_id: Option<String>,
    pub device_id: Option<String>,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPlayback {
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<PlaybackItem>,
    pub device: Option<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackItem {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl From<CurrentPlayback> for PlaybackObservation {
    fn from(playback: CurrentPlayback) -> Self {
        Self {
            is_playing: playback.is_playing,
            progress_ms: playback.progress_ms,
            track_id: playback.item.and_then(|item| item.id),
            device_id: playback.device.as_ref().and_then(|d| d.id.clone()),
            volume_percent: playback.device.and_then(|d| d.volume_percent),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Tabled)]
pub struct DeviceTableRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub active: String,
    pub volume: String,
}

impl From<Device> for DeviceTableRow {
    fn from(device: Device) -> Self {
        Self {
            id: device.id.unwrap_or_else(|| "-".to_string()),
            name: device.name,
            kind: device.kind,
            active: if device.is_active { "yes" } else { "" }.to_string(),
            volume: device
                .volume_percent
                .map(|v| format!("{v}%"))
                .unwrap_or_default(),
        }
    }
}
