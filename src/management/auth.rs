use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, MutexGuard, RwLock},
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    config::{AuthSettings, AuthTimeouts},
    error::{AuthError, StoreError},
    management::store::{SecretStore, keys},
    server::CallbackServer,
    spotify::auth::{BrowserOpener, authorize_url},
    types::{AuthorizationRequest, Token},
};

// a failed attempt has nothing left to deliver to the browser
const FAILED_LISTENER_GRACE: Duration = Duration::from_secs(1);

/// Hands out valid access tokens and runs the browser authorization when needed.
///
/// The cached token is a small state box that is only ever read or replaced
/// whole. The authorization lock makes the browser round trip single-flight:
/// callers that cannot get the lock within [`AuthTimeouts::lock_wait`] fail with
/// [`AuthError::Busy`] instead of queuing behind a stuck peer.
pub struct TokenAuthority {
    store: Arc<dyn SecretStore>,
    browser: Arc<dyn BrowserOpener>,
    settings: AuthSettings,
    timeouts: AuthTimeouts,
    current: RwLock<Option<Token>>,
    auth_lock: Mutex<()>,
    round_trips: AtomicUsize,
}

impl TokenAuthority {
    pub fn new(
        store: Arc<dyn SecretStore>,
        browser: Arc<dyn BrowserOpener>,
        settings: AuthSettings,
        timeouts: AuthTimeouts,
    ) -> Self {
        Self {
            store,
            browser,
            settings,
            timeouts,
            current: RwLock::new(None),
            auth_lock: Mutex::new(()),
            round_trips: AtomicUsize::new(0),
        }
    }

    /// Creates an authority whose port and client id come from `store`.
    pub async fn from_store(
        store: Arc<dyn SecretStore>,
        browser: Arc<dyn BrowserOpener>,
    ) -> Result<Self, AuthError> {
        let settings = AuthSettings::resolve(store.as_ref()).await?;
        Ok(Self::new(store, browser, settings, AuthTimeouts::default()))
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Number of browser round trips started so far.
    pub fn authorizations_started(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// The cached token, expired or not. Never authorizes.
    pub async fn cached(&self) -> Option<Token> {
        self.current.read().await.clone()
    }

    /// Replaces the cached token and persists it.
    ///
    /// The token stays cached even if persisting fails.
    pub async fn set_token(&self, token: Token) -> Result<(), AuthError> {
        *self.current.write().await = Some(token.clone());
        self.persist(&token).await.map_err(|e| {
            warn!(error = %e, "failed to persist token");
            AuthError::Store(e)
        })
    }

    /// Returns a non-expired token.
    ///
    /// A fresh cached token is returned without any I/O. Otherwise the persisted
    /// token is tried once, and the browser round trip runs as a last resort.
    pub async fn get_token(&self) -> Result<Token, AuthError> {
        if let Some(token) = self.fresh_cached().await {
            return Ok(token);
        }

        let _guard = self.lock().await?;

        // a peer may have authorized while we waited for the lock
        if let Some(token) = self.fresh_cached().await {
            return Ok(token);
        }

        if self.current.read().await.is_none() {
            if let Some(token) = self.restore().await? {
                debug!(expiration = %token.expiration(), "restored persisted token");
                *self.current.write().await = Some(token.clone());
                return Ok(token);
            }
        }

        let token = self.authorize().await?;
        self.set_token(token.clone()).await?;
        Ok(token)
    }

    /// Runs a new browser round trip regardless of the cached token.
    pub async fn refresh(&self) -> Result<Token, AuthError> {
        let _guard = self.lock().await?;
        let token = self.authorize().await?;
        self.set_token(token.clone()).await?;
        Ok(token)
    }

    async fn fresh_cached(&self) -> Option<Token> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|t| !t.is_expired())
            .cloned()
    }

    async fn lock(&self) -> Result<MutexGuard<'_, ()>, AuthError> {
        debug!("acquiring auth lock");
        match timeout(self.timeouts.lock_wait, self.auth_lock.lock()).await {
            Ok(guard) => {
                debug!("auth lock acquired");
                Ok(guard)
            }
            Err(_) => {
                warn!(wait = ?self.timeouts.lock_wait, "could not acquire auth lock");
                Err(AuthError::Busy)
            }
        }
    }

    async fn restore(&self) -> Result<Option<Token>, AuthError> {
        let value = self.store.get_string(keys::ACCESS_TOKEN).await?;
        let expiration = self.store.get_int(keys::TOKEN_EXPIRATION).await?;

        Ok(match (value, expiration) {
            (Some(value), Some(expiration)) => {
                Token::from_persisted(value, expiration).filter(|t| !t.is_expired())
            }
            _ => None,
        })
    }

    async fn persist(&self, token: &Token) -> Result<(), StoreError> {
        self.store
            .set_string(keys::ACCESS_TOKEN, Some(token.value()))
            .await?;
        self.store
            .set_int(keys::TOKEN_EXPIRATION, Some(token.expiration().timestamp()))
            .await
    }

    /// One browser round trip. The listener is torn down on every exit path.
    async fn authorize(&self) -> Result<Token, AuthError> {
        let request = AuthorizationRequest::new(self.settings.callback_port);
        self.round_trips.fetch_add(1, Ordering::SeqCst);

        let mut server = CallbackServer::start(request.callback_port, request.state.clone()).await?;

        let url = match authorize_url(&self.settings, &request, &server.redirect_url()) {
            Ok(url) => url,
            Err(e) => {
                server.shutdown(FAILED_LISTENER_GRACE).await;
                return Err(e);
            }
        };

        info!(port = server.local_addr().port(), "waiting for browser authorization");
        if let Err(e) = self.browser.open(&url) {
            warn!(error = %e, %url, "failed to open browser, navigate to the URL manually");
        }

        let result = server.wait_for_token(self.timeouts.callback).await;
        match &result {
            Ok(token) => {
                info!(expiration = %token.expiration(), "received new token");
                server.shutdown(self.timeouts.listener_grace).await;
            }
            Err(e) => {
                warn!(error = %e, "could not obtain token");
                server.shutdown(FAILED_LISTENER_GRACE).await;
            }
        }
        result
    }
}
