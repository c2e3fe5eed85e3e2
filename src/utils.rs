use chrono::{DateTime, Duration, Local, Utc};
use rand::Rng;

/// Generates the per-attempt `state` nonce sent along with the authorize request.
///
/// 128 bits from the thread-local CSPRNG, rendered as 32 lowercase hex digits.
pub fn generate_state() -> String {
    let nonce: u128 = rand::rng().random();
    format!("{nonce:032x}")
}

pub fn expiration_after(now: DateTime<Utc>, expires_in: u32) -> DateTime<Utc> {
    now + Duration::seconds(i64::from(expires_in))
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{track_id}")
}

/// Renders an expiration as a short local wall-clock time, e.g. `14:05`.
pub fn expiration_time_string(expiration: DateTime<Utc>) -> String {
    expiration.with_timezone(&Local).format("%H:%M").to_string()
}
