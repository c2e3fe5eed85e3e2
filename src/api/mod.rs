//! # API Module
//!
//! HTTP handlers of the local callback listener used by the implicit-grant flow.
//!
//! The authorization server redirects the browser to [`CALLBACK_PATH`] with the
//! access token in the URL fragment. Browsers never send fragments to a server,
//! so the flow takes two hops:
//!
//! - [`callback`] - first hop. Serves a small page whose script re-navigates to
//!   [`REDIRECT_PATH`], turning the fragment into query parameters.
//! - [`redirect`] - second hop. Checks the `state` nonce (403 on mismatch),
//!   extracts `access_token` and `expires_in` (401 when missing) and completes
//!   the pending attempt.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::get};
//! use spotbridge::api::{self, CALLBACK_PATH, REDIRECT_PATH};
//!
//! let app = Router::new()
//!     .route(CALLBACK_PATH, get(api::callback))
//!     .route(REDIRECT_PATH, get(api::redirect).layer(Extension(state)));
//! ```

mod callback;

pub use callback::{
    ACCESS_TOKEN_KEY, CALLBACK_PATH, CallbackOutcome, CallbackState, EXPIRATION_KEY,
    LANDING_PAGE, REDIRECT_PAGE, REDIRECT_PATH, STATE_KEY, callback, denial_status, redirect,
    token_from_params,
};
