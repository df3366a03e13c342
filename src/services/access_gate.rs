//! Shared-password gate.
//!
//! A single random token lives in the cache. Entering the shared password
//! hands that token to the client's session cookie, and a request is let
//! through while its cookie holds the current token. Replacing or losing
//! the cached token logs every client out at once.

use crate::services::cache::PageCache;
use rand::{Rng, distributions::Alphanumeric};
use std::sync::Arc;
use tracing::{info, warn};

/// Cache key of the server-wide session token.
pub const SERVER_TOKEN_KEY: &str = "bucket-index:session-token";

/// Length of generated session tokens.
pub const TOKEN_LEN: usize = 32;

/// Outcome of one gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub granted: bool,
    /// Token to store in the client's session after a correct password.
    pub issued_token: Option<String>,
    /// A password was supplied and did not match.
    pub failed_attempt: bool,
}

impl AccessDecision {
    fn open() -> Self {
        Self {
            granted: true,
            issued_token: None,
            failed_attempt: false,
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    password: Option<String>,
    cache: Arc<dyn PageCache>,
}

impl AccessGate {
    /// `password: None` disables the gate.
    pub fn new(password: Option<String>, cache: Arc<dyn PageCache>) -> Self {
        Self { password, cache }
    }

    /// Decide whether a request may see listing content.
    ///
    /// `supplied_password` is the login form value, if any; `session_token`
    /// is the token held in the client's session cookie, if any.
    pub async fn check_access(
        &self,
        supplied_password: Option<&str>,
        session_token: Option<&str>,
    ) -> AccessDecision {
        let Some(password) = self.password.as_deref() else {
            return AccessDecision::open();
        };

        let server_token = self.server_token().await;

        let mut issued_token = None;
        let mut failed_attempt = false;
        if let Some(supplied) = supplied_password {
            if constant_time_eq(supplied.as_bytes(), password.as_bytes()) {
                issued_token = Some(server_token.clone());
            } else {
                warn!("rejected login attempt with wrong password");
                failed_attempt = true;
            }
        }

        let held = issued_token.as_deref().or(session_token);
        let granted =
            held.is_some_and(|token| constant_time_eq(token.as_bytes(), server_token.as_bytes()));

        AccessDecision {
            granted,
            issued_token,
            failed_attempt,
        }
    }

    /// Read the server token, creating it when the cache has none.
    ///
    /// Creation goes through `add`, so when several requests race only the
    /// first value is stored and the others re-read it.
    async fn server_token(&self) -> String {
        match self.cache.get(SERVER_TOKEN_KEY).await {
            Ok(Some(token)) => return token,
            Ok(None) => {}
            Err(err) => warn!("reading session token from cache failed: {}", err),
        }

        let candidate = generate_token();
        match self.cache.add(SERVER_TOKEN_KEY, &candidate).await {
            Ok(true) => {
                info!("generated new server session token");
                candidate
            }
            Ok(false) => match self.cache.get(SERVER_TOKEN_KEY).await {
                Ok(Some(winner)) => winner,
                Ok(None) => candidate,
                Err(err) => {
                    warn!("re-reading session token from cache failed: {}", err);
                    candidate
                }
            },
            Err(err) => {
                warn!("storing session token in cache failed: {}", err);
                candidate
            }
        }
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
