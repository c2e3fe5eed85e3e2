use chrono::{Duration, TimeZone, Utc};
use spotbridge::types::{AuthorizationRequest, Token};
use spotbridge::utils::*;

#[test]
fn test_generate_state() {
    let state = generate_state();

    // 128 bits rendered as fixed-width hex
    assert_eq!(state.len(), 32);
    assert!(state.chars().all(|c| c.is_ascii_hexdigit()));

    // Two nonces should differ
    assert_ne!(state, generate_state());
}

#[test]
fn test_authorization_request_gets_fresh_state() {
    let first = AuthorizationRequest::new(58642);
    let second = AuthorizationRequest::new(58642);

    assert_eq!(first.callback_port, 58642);
    assert_ne!(first.state, second.state);
}

#[test]
fn test_expiration_after() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(expiration_after(now, 3600), now + Duration::hours(1));
    assert_eq!(expiration_after(now, 0), now);
}

#[test]
fn test_track_uri() {
    assert_eq!(
        track_uri("4uLU6hMCjMI75M1A2tKUQC"),
        "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
    );
}

#[test]
fn test_expiration_time_string_is_short_time() {
    let rendered = expiration_time_string(Utc::now());
    assert_eq!(rendered.len(), 5);
    assert_eq!(rendered.chars().nth(2), Some(':'));
}

#[test]
fn test_token_expiry_boundary() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let token = Token::expiring_in("abc", 60, now).unwrap();

    assert_eq!(token.value(), "abc");
    assert!(!token.is_expired_at(now));
    assert!(!token.is_expired_at(now + Duration::seconds(59)));
    // expired exactly at the expiration instant
    assert!(token.is_expired_at(now + Duration::seconds(60)));
    assert!(token.is_expired_at(now + Duration::seconds(61)));
}

#[test]
fn test_token_from_persisted() {
    let token = Token::from_persisted("abc".to_string(), 1_700_000_000).unwrap();
    assert_eq!(token.value(), "abc");
    assert_eq!(token.expiration().timestamp(), 1_700_000_000);
    assert!(token.is_expired());

    assert!(Token::from_persisted(String::new(), 1_700_000_000).is_none());
    assert!(Token::from_persisted("abc".to_string(), i64::MAX).is_none());
}

#[test]
fn test_empty_token_is_rejected() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    assert!(Token::new("", now + Duration::hours(1)).is_none());
    assert!(Token::expiring_in("", 3600, now).is_none());
    assert!(Token::new("abc", now).is_some());
}
