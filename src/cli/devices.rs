use std::sync::Arc;

use tabled::Table;

use crate::{
    error,
    management::{SecretStore, keys},
    spotify::player::{Player, WebPlayer},
    success,
    types::DeviceTableRow,
    warning,
};

use super::{authority, spinner, store};

pub async fn devices(select: Option<String>) {
    let store = store();

    if let Some(device_id) = select {
        if let Err(e) = store.set_string(keys::DEVICE_ID, Some(&device_id)).await {
            error!("Cannot save device selection. Err: {}", e);
        }
        success!("Selected device {}.", device_id);
        return;
    }

    let player = WebPlayer::new(authority(Arc::clone(&store)).await);

    let pb = spinner("Fetching devices...");
    let result = player.devices().await;
    pb.finish_and_clear();

    match result {
        Ok(devices) if devices.is_empty() => {
            warning!("No devices available. Open Spotify on the device you want to use.")
        }
        Ok(devices) => {
            let rows: Vec<DeviceTableRow> = devices.into_iter().map(DeviceTableRow::from).collect();
            println!("{}", Table::new(rows));
        }
        Err(e) => error!("Cannot list devices. Err: {}", e),
    }
}
