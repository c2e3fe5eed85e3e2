use std::sync::{Arc, Mutex};

use crate::{
    config, error, info,
    playback::{PlaybackMonitor, StateListener},
    spotify::player::{Player, WebPlayer},
    success,
    types::PlaybackState,
    warning,
};

use super::{authority, resolve_device, store};

pub async fn play(track_id: String, device: Option<String>) {
    let store = store();
    let device_id = resolve_device(&store, device).await;
    let player: Arc<dyn Player> = Arc::new(WebPlayer::new(authority(store).await));

    let last = Mutex::new(None);
    let listener: StateListener = Arc::new(move |state| {
        let mut last = last.lock().unwrap_or_else(|e| e.into_inner());
        if *last == Some(state) {
            return;
        }
        *last = Some(state);
        match state {
            PlaybackState::Play => info!("Playing"),
            PlaybackState::Pause => info!("Paused"),
            PlaybackState::Broken => warning!("Playback is broken"),
            PlaybackState::Done => success!("Track finished"),
        }
    });

    let mut monitor = PlaybackMonitor::new(
        player,
        device_id,
        track_id,
        config::poll_interval(),
        listener,
    );

    monitor.play().await;
    if !monitor.session().started {
        monitor.close().await;
        error!("Could not start playback.");
    }

    tokio::select! {
        _ = monitor.wait_for_finish() => {}
        _ = tokio::signal::ctrl_c() => info!("Stopping playback"),
    }
    monitor.close().await;
}

pub async fn volume(percent: Option<u8>, device: Option<String>) {
    let store = store();

    match percent {
        Some(percent) => {
            let device_id = resolve_device(&store, device).await;
            let player = WebPlayer::new(authority(store).await);
            match player.set_volume(&device_id, percent).await {
                Ok(()) => success!("Volume set to {}%.", percent.min(100)),
                Err(e) => error!("Cannot set volume. Err: {}", e),
            }
        }
        None => {
            let player = WebPlayer::new(authority(store).await);
            match player.volume().await {
                Ok(volume) => info!("Volume is {}%.", volume),
                Err(e) => error!("Cannot read volume. Err: {}", e),
            }
        }
    }
}
