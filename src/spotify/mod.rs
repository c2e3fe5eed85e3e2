//! # Spotify Integration Module
//!
//! Integration layer between spotbridge and the Spotify accounts service and
//! Web API.
//!
//! ## Architecture
//!
//! ```text
//! PlaybackMonitor / CLI
//!          ↓
//! Spotify Integration Layer
//!     ├── Authorization (implicit grant URL, browser launch)
//!     └── Player (resume, pause, playback snapshot, volume, devices)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! ### Authorization Module
//!
//! [`auth`] - Builds the authorize URL for the implicit-grant flow
//! (`response_type=token`) with the fixed scope set and the per-attempt `state`
//! nonce, and opens it through a [`auth::BrowserOpener`]. The token itself is
//! received by the local callback listener in [`crate::server`].
//!
//! ### Player Module
//!
//! [`player`] - The [`player::Player`] trait is the playback RPC surface the
//! monitor depends on. [`player::WebPlayer`] implements it over HTTPS:
//!
//! - `PUT /me/player/play` - resume, optionally with a track URI
//! - `PUT /me/player/pause` - pause
//! - `GET /me/player` - current playback snapshot (`204` when idle)
//! - `PUT /me/player/volume` - set volume
//! - `GET /me/player/devices` - available devices
//!
//! ## Error Handling
//!
//! Failed calls surface as [`crate::error::ApiError`]. Bad gateway, service
//! unavailable and gateway timeout answers are classified as transient, which the
//! playback monitor treats as soft poll failures.

pub mod auth;
pub mod player;
