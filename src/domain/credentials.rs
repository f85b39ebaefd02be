//! Miner credentials parsed from HTTP Basic authorization.
//!
//! Getwork is connectionless, so every request must re-present credentials.
//! [`Credentials::from_basic_header`] is a pure parse of the
//! `Authorization` header value; the dispatcher maps any failure to the
//! 401 challenge response.

use axum::http::HeaderValue;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};

/// Username/password pair presented by a miner.
///
/// Transient: derived per request, never stored beyond the username that
/// gets recorded on the worker connection after a successful authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Upstream worker username.
    pub username: String,
    /// Upstream worker password.
    pub password: String,
}

/// Reasons a `Authorization` header fails to yield credentials.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// No `Authorization` header was present.
    #[error("no Authorization header")]
    MissingHeader,
    /// The header used a scheme other than `Basic`.
    #[error("Authorization scheme is not Basic")]
    NotBasic,
    /// The credential payload was not valid base64.
    #[error("credential payload is not valid base64")]
    InvalidBase64,
    /// The decoded payload was not UTF-8 or had no `:` separator.
    #[error("credential payload is malformed")]
    MalformedPayload,
}

impl Credentials {
    /// Creates credentials from already-split parts.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parses an `Authorization: Basic <base64(user:pass)>` header value.
    ///
    /// The decoded payload splits on the FIRST colon, so passwords that
    /// themselves contain colons are preserved intact.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialsError`] when the header is absent, uses a
    /// non-Basic scheme, or carries an undecodable payload.
    pub fn from_basic_header(header: Option<&HeaderValue>) -> Result<Self, CredentialsError> {
        let value = header.ok_or(CredentialsError::MissingHeader)?;
        let value = value.to_str().map_err(|_| CredentialsError::NotBasic)?;

        // RFC 7617: the auth-scheme is case-insensitive.
        let payload = value
            .split_once(char::is_whitespace)
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Basic"))
            .map(|(_, payload)| payload.trim())
            .ok_or(CredentialsError::NotBasic)?;

        let decoded = BASE64_STANDARD
            .decode(payload)
            .map_err(|_| CredentialsError::InvalidBase64)?;
        let decoded = String::from_utf8(decoded).map_err(|_| CredentialsError::MalformedPayload)?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or(CredentialsError::MalformedPayload)?;

        Ok(Self::new(username, password))
    }
}
