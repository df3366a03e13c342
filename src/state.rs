//! Shared state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        access_gate::AccessGate, cache::PageCache, listing_service::ListingService,
        storage_service::ObjectLister,
    },
};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};

#[derive(Clone)]
pub struct AppState {
    pub listing: ListingService,
    pub gate: AccessGate,
    pub cache: Arc<dyn PageCache>,
    /// Signs the session cookie.
    pub cookie_key: Key,
    pub secure_cookie: bool,
}

impl AppState {
    pub fn new(cfg: &AppConfig, lister: Arc<dyn ObjectLister>, cache: Arc<dyn PageCache>) -> Self {
        let listing = ListingService::new(
            lister,
            cache.clone(),
            Duration::from_secs(cfg.cache_ttl),
            cfg.link_ttl,
        );
        let gate = AccessGate::new(cfg.password.clone(), cache.clone());

        Self {
            listing,
            gate,
            cache,
            cookie_key: cookie_key(cfg.secret_key.as_deref()),
            secure_cookie: cfg.secure_cookie,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the cookie key from the configured secret, or make a random one
/// that only lives as long as the process.
fn cookie_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => Key::derive_from(&Sha256::digest(secret.as_bytes())),
        None => {
            tracing::warn!("SECRET_KEY not set, sessions will not survive a restart");
            Key::generate()
        }
    }
}
