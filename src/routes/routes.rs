//! Defines routes for the bucket listing.
//!
//! ## Structure
//! - `GET|POST /`               : redirect to `/bucket/`
//! - `GET      /bucket`         : redirect to `/bucket/`
//! - `GET      /bucket/`        : listing of the bucket root
//! - `GET      /bucket/{*path}` : listing of a prefix, e.g. `photos/2025/`
//! - `POST     /bucket/...`     : login form submission for the same view
//! - `GET      /logout`         : drop the session cookie
//!
//! Any listing URL accepts `?flush=1` to rebuild the cached page.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        listing_handlers::{
            list_path, list_root, login_path, login_root, logout, redirect_root,
        },
    },
    state::AppState,
};
use axum::{Router, routing::get};

/// Build and return the router for the listing service.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(redirect_root).post(redirect_root))
        .route("/logout", get(logout))
        .route("/bucket", get(redirect_root))
        .route("/bucket/", get(list_root).post(login_root))
        .route("/bucket/{*path}", get(list_path).post(login_path))
}
