//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the page cache round trip

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, time::Duration};
use uuid::Uuid;

/// How long the readiness probe value may linger in the cache.
const PROBE_TTL: Duration = Duration::from_secs(5);

/// `GET /healthz`
///
/// Liveness probe, answers 200 with `{"status":"ok"}`.
/// Performs no I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Writes a short-lived probe value into the page cache and reads it back.
/// HTTP 200 when the value round-trips, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let probe_key = format!("bucket-index:readyz:{}", Uuid::new_v4());
    let cache_check = match state.cache.set(&probe_key, "readyz", PROBE_TTL).await {
        Ok(()) => match state.cache.get(&probe_key).await {
            Ok(Some(value)) if value == "readyz" => (true, None::<String>),
            Ok(Some(_)) => (false, Some("probe value mismatch".to_string())),
            Ok(None) => (false, Some("probe value missing after write".to_string())),
            Err(e) => (false, Some(format!("could not read probe: {}", e))),
        },
        Err(e) => (false, Some(format!("could not write probe: {}", e))),
    };

    let overall_ok = cache_check.0;
    let mut checks = HashMap::new();
    checks.insert(
        "cache",
        CheckStatus {
            ok: cache_check.0,
            error: cache_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
