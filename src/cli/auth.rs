use crate::{
    error,
    management::{SecretStore, keys},
    success,
    types::Token,
    utils, warning,
};

use super::{authority, spinner, store};

pub async fn auth() {
    let authority = authority(store()).await;

    let pb = spinner("Waiting for authorization in the browser...");
    let result = authority.get_token().await;
    pb.finish_and_clear();

    match result {
        Ok(token) => success!(
            "Authenticated. Token valid until {}.",
            utils::expiration_time_string(token.expiration())
        ),
        Err(e) => error!("Authentication failed. Err: {}", e),
    }
}

pub async fn refresh() {
    let authority = authority(store()).await;

    let pb = spinner("Waiting for authorization in the browser...");
    let result = authority.refresh().await;
    pb.finish_and_clear();

    match result {
        Ok(token) => success!(
            "Token refreshed. Valid until {}.",
            utils::expiration_time_string(token.expiration())
        ),
        Err(e) => error!("Refresh failed. Err: {}", e),
    }
}

pub async fn status() {
    let store = store();
    let value = store.get_string(keys::ACCESS_TOKEN).await;
    let expiration = store.get_int(keys::TOKEN_EXPIRATION).await;

    let token = match (value, expiration) {
        (Ok(Some(value)), Ok(Some(expiration))) => Token::from_persisted(value, expiration),
        (Err(e), _) | (_, Err(e)) => error!("Cannot read token. Err: {}", e),
        _ => None,
    };

    match token {
        Some(token) if !token.is_expired() => success!(
            "Token valid until {}.",
            utils::expiration_time_string(token.expiration())
        ),
        Some(token) => warning!(
            "Token expired at {}. Run spotbridge refresh.",
            utils::expiration_time_string(token.expiration())
        ),
        None => warning!("No token stored. Run spotbridge auth."),
    }
}
