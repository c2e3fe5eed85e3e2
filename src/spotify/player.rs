use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::CONTENT_LENGTH};
use tracing::debug;

use crate::{
    config,
    error::ApiError,
    management::TokenAuthority,
    types::{CurrentPlayback, Device, DevicesResponse, PlayRequest, PlaybackObservation},
};

/// Volume reported when the upstream has no active playback to read it from.
pub const DEFAULT_VOLUME: u8 = 100;

/// Playback commands and queries against a remote player.
#[async_trait]
pub trait Player: Send + Sync {
    /// Resumes playback on `device_id`, starting `track_uri` when given.
    async fn resume(&self, device_id: &str, track_uri: Option<&str>) -> Result<(), ApiError>;

    async fn pause(&self, device_id: &str) -> Result<(), ApiError>;

    /// `None` when nothing is playing on any device.
    async fn current_playback(&self) -> Result<Option<PlaybackObservation>, ApiError>;

    async fn set_volume(&self, device_id: &str, percent: u8) -> Result<(), ApiError>;

    async fn devices(&self) -> Result<Vec<Device>, ApiError>;

    async fn volume(&self) -> Result<u8, ApiError> {
        Ok(self
            .current_playback()
            .await?
            .and_then(|p| p.volume_percent)
            .unwrap_or(DEFAULT_VOLUME))
    }
}

/// [`Player`] backed by the Spotify Web API.
///
/// Every request asks the [`TokenAuthority`] for a token first, so a call may
/// block on a browser authorization when the cached token has expired.
pub struct WebPlayer {
    client: Client,
    base_url: String,
    authority: Arc<TokenAuthority>,
}

impl WebPlayer {
    pub fn new(authority: Arc<TokenAuthority>) -> Self {
        Self::with_base_url(authority, config::spotify_apiurl())
    }

    pub fn with_base_url(authority: Arc<TokenAuthority>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authority,
        }
    }

    /// Sends `request` with a bearer token and turns non-2xx answers into
    /// [`ApiError::Status`].
    ///
    /// # Errors
    ///
    /// - [`ApiError::Auth`] if no token could be obtained
    /// - [`ApiError::Request`] for network failures
    /// - [`ApiError::Status`] for error responses, carrying the body as message
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.authority.get_token().await?;
        let response = request.bearer_auth(token.value()).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Player for WebPlayer {
    async fn resume(&self, device_id: &str, track_uri: Option<&str>) -> Result<(), ApiError> {
        debug!(device_id, track_uri, "resuming playback");
        let request = self
            .client
            .put(self.url("/me/player/play"))
            .query(&[("device_id", device_id)]);

        let request = match track_uri {
            Some(uri) => request.json(&PlayRequest {
                uris: vec![uri.to_string()],
            }),
            None => request.header(CONTENT_LENGTH, 0),
        };

        self.send(request).await.map(|_| ())
    }

    async fn pause(&self, device_id: &str) -> Result<(), ApiError> {
        debug!(device_id, "pausing playback");
        let request = self
            .client
            .put(self.url("/me/player/pause"))
            .query(&[("device_id", device_id)])
            .header(CONTENT_LENGTH, 0);

        self.send(request).await.map(|_| ())
    }

    async fn current_playback(&self) -> Result<Option<PlaybackObservation>, ApiError> {
        let response = self.send(self.client.get(self.url("/me/player"))).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let playback = response.json::<CurrentPlayback>().await?;
        Ok(Some(playback.into()))
    }

    async fn set_volume(&self, device_id: &str, percent: u8) -> Result<(), ApiError> {
        let percent = percent.min(100).to_string();
        let request = self
            .client
            .put(self.url("/me/player/volume"))
            .query(&[("volume_percent", percent.as_str()), ("device_id", device_id)])
            .header(CONTENT_LENGTH, 0);

        self.send(request).await.map(|_| ())
    }

    async fn devices(&self) -> Result<Vec<Device>, ApiError> {
        let response = self
            .send(self.client.get(self.url("/me/player/devices")))
            .await?;
        Ok(response.json::<DevicesResponse>().await?.devices)
    }
}
