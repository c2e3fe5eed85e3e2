//! # CLI Module
//!
//! Operator commands of the `spotbridge` binary. Each command builds its
//! collaborators from the default [`FileStore`], talks to the library and reports
//! the outcome with the colored status macros.
//!
//! - [`auth`] - ensure a valid token exists, authorizing in the browser if needed
//! - [`refresh`] - force a new browser authorization
//! - [`status`] - show the persisted token's expiration
//! - [`devices`] - list Spotify Connect devices, optionally selecting one
//! - [`play`] - play a track on the selected device until it finishes
//! - [`volume`] - show or set the device volume

mod auth;
mod devices;
mod playback;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error,
    management::{FileStore, SecretStore, TokenAuthority, keys},
    spotify::auth::SystemBrowser,
};

pub use auth::{auth, refresh, status};
pub use devices::devices;
pub use playback::{play, volume};

fn store() -> Arc<FileStore> {
    Arc::new(FileStore::open_default())
}

async fn authority(store: Arc<FileStore>) -> Arc<TokenAuthority> {
    match TokenAuthority::from_store(store, Arc::new(SystemBrowser)).await {
        Ok(authority) => Arc::new(authority),
        Err(e) => error!("Cannot load settings. Err: {}", e),
    }
}

async fn resolve_device(store: &FileStore, device: Option<String>) -> String {
    if let Some(device) = device {
        return device;
    }

    match store.get_string(keys::DEVICE_ID).await {
        Ok(Some(device)) => device,
        Ok(None) => error!("No device selected. Run spotbridge devices --select <ID>."),
        Err(e) => error!("Cannot read selected device. Err: {}", e),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
