use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{Extension, Router, routing::get};
use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    api::{self, CallbackOutcome, CallbackState},
    error::AuthError,
    types::Token,
};

/// Ephemeral loopback listener receiving the browser redirect of one attempt.
///
/// It owns the attempt's nonce and completion signal. The serving task is
/// aborted when the server is dropped, so a listener never outlives its attempt.
pub struct CallbackServer {
    addr: SocketAddr,
    outcome: oneshot::Receiver<CallbackOutcome>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CallbackServer {
    /// Binds `127.0.0.1:port` and starts serving. Port 0 picks a free port.
    pub async fn start(port: u16, state: String) -> Result<Self, AuthError> {
        let (outcome_tx, outcome) = oneshot::channel();
        let shared = Arc::new(CallbackState::new(state, outcome_tx));

        let app = Router::new()
            .route(api::CALLBACK_PATH, get(api::callback))
            .route(api::REDIRECT_PATH, get(api::redirect).layer(Extension(shared)));

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|source| AuthError::Listener { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| AuthError::Listener { port, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!(error = %e, "callback listener failed");
            }
        });

        debug!(%addr, "callback listener started");
        Ok(Self {
            addr,
            outcome,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The `redirect_uri` to register with the authorization server.
    pub fn redirect_url(&self) -> String {
        format!("http://localhost:{}{}", self.addr.port(), api::CALLBACK_PATH)
    }

    /// Waits for the second hop to complete the attempt.
    pub async fn wait_for_token(&mut self, deadline: Duration) -> Result<Token, AuthError> {
        match timeout(deadline, &mut self.outcome).await {
            Err(_) => Err(AuthError::Timeout(deadline)),
            Ok(Err(_)) => Err(AuthError::ListenerClosed),
            Ok(Ok(Ok(token))) => Ok(token),
            Ok(Ok(Err(reason))) => Err(AuthError::Denied(reason)),
        }
    }

    /// Stops accepting connections and lets in-flight responses drain for at
    /// most `grace` before the serving task is aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if timeout(grace, &mut self.task).await.is_err() {
            warn!(addr = %self.addr, "callback listener did not drain in time");
            self.task.abort();
        }
        debug!(addr = %self.addr, "callback listener stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
