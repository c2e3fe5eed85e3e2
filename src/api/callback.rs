use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Html};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::{error::DenialReason, types::Token};

pub const CALLBACK_PATH: &str = "/Callback";
pub const REDIRECT_PATH: &str = "/redirect";

pub const STATE_KEY: &str = "state";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const EXPIRATION_KEY: &str = "expires_in";
const ERROR_KEY: &str = "error";

/// Served on the first hop. The token sits in the URL fragment, which the browser
/// never sends, so a script forwards it to the second hop as query parameters.
pub const REDIRECT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>spotbridge</title></head>
<body>
<p id="message">Forwarding authorization&hellip;</p>
<script>
  var params = window.location.hash.substring(1);
  if (params.length === 0) {
    params = window.location.search.substring(1);
  }
  if (params.length > 0) {
    window.location.replace("/redirect?" + params);
  } else {
    document.getElementById("message").textContent = "No authorization data received.";
  }
</script>
</body>
</html>
"#;

pub const LANDING_PAGE: &str =
    "<h2>Successfully received token.</h2><p>You may close this window now.</p>";
const INVALID_STATE_PAGE: &str = "<h4>Invalid state.</h4>";
const MISSING_TOKEN_PAGE: &str = "<h4>Did not receive a valid token.</h4>";

pub type CallbackOutcome = Result<Token, DenialReason>;

/// State of one authorization attempt, shared with the request handlers.
pub struct CallbackState {
    state: String,
    outcome: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

impl CallbackState {
    pub fn new(state: String, outcome: oneshot::Sender<CallbackOutcome>) -> Self {
        Self {
            state,
            outcome: Mutex::new(Some(outcome)),
        }
    }

    /// Delivers the attempt's outcome. Only the first call has an effect.
    async fn complete(&self, outcome: CallbackOutcome) -> bool {
        match self.outcome.lock().await.take() {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }
}

pub async fn callback() -> Html<&'static str> {
    debug!("serving fragment redirect page");
    Html(REDIRECT_PAGE)
}

pub async fn redirect(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared): Extension<Arc<CallbackState>>,
) -> (StatusCode, Html<&'static str>) {
    match token_from_params(&shared.state, &params, Utc::now()) {
        Ok(token) => {
            if !shared.complete(Ok(token)).await {
                debug!("authorization attempt already completed");
            }
            (StatusCode::OK, Html(LANDING_PAGE))
        }
        Err(reason) => {
            if let Some(error) = params.get(ERROR_KEY) {
                warn!(%error, "authorization server reported an error");
            }
            warn!(%reason, "rejecting authorization callback");
            shared.complete(Err(reason)).await;
            let page = match reason {
                DenialReason::StateMismatch => INVALID_STATE_PAGE,
                DenialReason::MissingParameters => MISSING_TOKEN_PAGE,
            };
            (denial_status(reason), Html(page))
        }
    }
}

/// Validates the second-hop query parameters against the attempt's nonce.
///
/// The state is checked first, so a forged request is always answered with 403.
pub fn token_from_params(
    expected_state: &str,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Result<Token, DenialReason> {
    if params.get(STATE_KEY).map(String::as_str) != Some(expected_state) {
        return Err(DenialReason::StateMismatch);
    }

    let value = params
        .get(ACCESS_TOKEN_KEY)
        .ok_or(DenialReason::MissingParameters)?;
    let expires_in = params
        .get(EXPIRATION_KEY)
        .and_then(|e| e.parse::<u32>().ok())
        .ok_or(DenialReason::MissingParameters)?;

    Token::expiring_in(value.as_str(), expires_in, now).ok_or(DenialReason::MissingParameters)
}

pub fn denial_status(reason: DenialReason) -> StatusCode {
    match reason {
        DenialReason::StateMismatch => StatusCode::FORBIDDEN,
        DenialReason::MissingParameters => StatusCode::UNAUTHORIZED,
    }
}
