//! HTTP handlers for the listing view and the login form.
//!
//! Every listing request goes through the access gate first. A denied
//! request gets the login form with 401; a successful login redirects back
//! to the same URL with the session cookie set.

use crate::{
    errors::AppError,
    services::listing_service::display_path,
    state::AppState,
    views::templates,
};
use axum::{
    Form,
    extract::{OriginalUri, Path, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;

/// Name of the signed cookie carrying the session token.
pub const SESSION_COOKIE: &str = "bucket_index_session";

/// Where `/` and `/logout` send the browser.
pub const LISTING_ROOT: &str = "/bucket/";

/// Query params accepted by the listing view.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    /// Any non-empty value other than `0` bypasses the page cache.
    pub flush: Option<String>,
}

impl ListingQuery {
    pub fn bypass_cache(&self) -> bool {
        matches!(self.flush.as_deref(), Some(v) if !v.is_empty() && v != "0")
    }
}

/// Body of the login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: Option<String>,
}

/// `GET|POST /` sends the browser to the listing root.
pub async fn redirect_root() -> Redirect {
    Redirect::to(LISTING_ROOT)
}

/// `GET /bucket/`
pub async fn list_root(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListingQuery>,
) -> Result<Response, AppError> {
    serve_listing(state, jar, String::new(), uri, query).await
}

/// `GET /bucket/{*path}`
pub async fn list_path(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(path): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListingQuery>,
) -> Result<Response, AppError> {
    serve_listing(state, jar, path, uri, query).await
}

/// `POST /bucket/`
pub async fn login_root(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListingQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    submit_login(state, jar, String::new(), uri, query, form).await
}

/// `POST /bucket/{*path}`
pub async fn login_path(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(path): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListingQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    submit_login(state, jar, path, uri, query, form).await
}

/// `GET /logout` drops the session cookie.
pub async fn logout(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to(LISTING_ROOT))
}

async fn serve_listing(
    state: AppState,
    jar: SignedCookieJar,
    path: String,
    uri: Uri,
    query: ListingQuery,
) -> Result<Response, AppError> {
    let session = session_token(&jar);
    let decision = state.gate.check_access(None, session.as_deref()).await;
    if !decision.granted {
        return Ok(login_page(&path, false));
    }

    let page = state
        .listing
        .render_listing(&path, &request_uri(&uri), query.bypass_cache())
        .await?;
    Ok(Html(page).into_response())
}

async fn submit_login(
    state: AppState,
    jar: SignedCookieJar,
    path: String,
    uri: Uri,
    query: ListingQuery,
    form: LoginForm,
) -> Result<Response, AppError> {
    let Some(password) = form.password else {
        return serve_listing(state, jar, path, uri, query).await;
    };

    let session = session_token(&jar);
    let decision = state
        .gate
        .check_access(Some(&password), session.as_deref())
        .await;
    if !decision.granted {
        return Ok(login_page(&path, decision.failed_attempt));
    }

    let jar = match decision.issued_token {
        Some(token) => jar.add(session_cookie(token, state.secure_cookie)),
        None => jar,
    };
    Ok((jar, Redirect::to(&request_uri(&uri))).into_response())
}

fn session_token(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn login_page(path: &str, failed: bool) -> Response {
    let body = Html(templates::render_login(&display_path(path), failed));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

fn request_uri(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
