//! Getwork request dispatcher.
//!
//! Every request walks the same prelude — extract credentials, resolve the
//! caller's worker connection (subscribing on first contact), re-authorize —
//! and then branches: a body carrying `data` is a share submission, a body
//! without it is a work fetch, and the long-poll endpoint suspends until
//! work changes or the timeout elapses.
//!
//! Authorization runs on EVERY request: getwork is connectionless, so a
//! prior success for an address says nothing about the current request's
//! credentials.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tokio::time::Duration;

use crate::api::dto::{GetworkRequest, GetworkResponse};
use crate::api::{X_LONG_POLLING, X_REJECT_REASON};
use crate::app_state::AppState;
use crate::domain::{Credentials, WorkerConnection};
use crate::error::GatewayError;

/// Primary getwork endpoint: fetch when the body has no `data`, submit
/// otherwise.
///
/// # Errors
///
/// Returns [`GatewayError`] on missing credentials, failed authorization,
/// session-resolution failure, or a malformed body.
pub async fn getwork_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let (connection, credentials) = resolve_connection(&state, peer.ip(), &headers).await?;
    let request = parse_body(&body)?;

    let mut response = match request.data {
        Some(data) => {
            let rejection = connection.submit(&credentials.username, &data).await?;
            let mut response = Json(serde_json::json!({})).into_response();
            if let Some(reason) = rejection {
                tracing::info!(
                    address = %peer.ip(),
                    username = %credentials.username,
                    reason,
                    "share rejected"
                );
                if let Ok(value) = HeaderValue::from_str(&reason) {
                    response.headers_mut().insert(X_REJECT_REASON, value);
                }
            }
            response
        }
        None => {
            let work = connection.current_work().await?;
            Json(GetworkResponse::from(work)).into_response()
        }
    };

    // Conforming clients discover the long-poll endpoint from every
    // primary-endpoint response.
    if let Ok(value) = HeaderValue::from_str(&state.config.longpoll_path) {
        response.headers_mut().insert(X_LONG_POLLING, value);
    }
    Ok(response)
}

/// Long-poll endpoint: suspends until new work supersedes what the caller
/// last saw, or the configured timeout elapses; responds like a fetch.
///
/// A body carrying `data` is ignored on this path; submissions belong on
/// the primary endpoint. Suspension is scoped to this one request future.
/// If the client hangs up, the future is dropped and the waiter with it.
///
/// # Errors
///
/// Returns [`GatewayError`] on missing credentials, failed authorization,
/// or session-resolution failure.
pub async fn longpoll_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let (connection, credentials) = resolve_connection(&state, peer.ip(), &headers).await?;

    if let Ok(request) = parse_body(&body)
        && request.data.is_some()
    {
        tracing::debug!(
            address = %peer.ip(),
            username = %credentials.username,
            "share posted to the long-poll path is ignored"
        );
    }

    let timeout = Duration::from_secs(state.config.longpoll_timeout_secs);
    let work = connection.long_poll_work(timeout).await?;
    Ok(Json(GetworkResponse::from(work)).into_response())
}

/// Shared prelude: credentials → connection → per-request authorization.
///
/// On authorization failure the connection is evicted from the registry and
/// the manager notified, so the next request from this address re-enters
/// the subscribe flow.
async fn resolve_connection(
    state: &AppState,
    addr: IpAddr,
    headers: &HeaderMap,
) -> Result<(Arc<WorkerConnection>, Credentials), GatewayError> {
    let credentials = Credentials::from_basic_header(headers.get(header::AUTHORIZATION)).map_err(
        |err| {
            tracing::warn!(%addr, %err, "request without usable credentials");
            GatewayError::MissingCredentials {
                realm: state.config.auth_realm.clone(),
            }
        },
    )?;

    let connection = state.registry.get_or_create(addr).await?;

    if let Err(err) = connection.authorize(&credentials).await {
        tracing::warn!(%addr, username = %credentials.username, "authorization failed, evicting");
        state.registry.evict(addr, "authorization failed").await;
        return Err(err);
    }

    Ok((connection, credentials))
}

/// Parses the request body. An empty body is a plain fetch (legacy miners
/// GET with no payload); a non-empty body must be valid JSON.
fn parse_body(body: &Bytes) -> Result<GetworkRequest, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GetworkRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| GatewayError::InvalidRequest(format!("malformed getwork body: {err}")))
}
