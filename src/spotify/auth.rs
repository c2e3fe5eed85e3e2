use reqwest::Url;

use crate::{
    config::{AuthSettings, SCOPES},
    error::AuthError,
    types::AuthorizationRequest,
};

/// Opens a URL in the user's browser.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Uses the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        webbrowser::open(url)
    }
}

/// Builds the implicit-grant authorize URL for one attempt.
///
/// `response_type=token` makes the authorization server return the access token
/// in the fragment of `redirect_uri`.
pub fn authorize_url(
    settings: &AuthSettings,
    request: &AuthorizationRequest,
    redirect_uri: &str,
) -> Result<String, AuthError> {
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        settings.authorize_url.trim(),
        &[
            ("client_id", settings.client_id.as_str()),
            ("response_type", "token"),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", request.state.as_str()),
        ],
    )
    .map_err(|e| AuthError::InvalidAuthorizeUrl {
        url: settings.authorize_url.clone(),
        reason: e.to_string(),
    })?;

    Ok(url.into())
}
