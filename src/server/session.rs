//! Request identity extraction.
//!
//! The platform's identity service issues session tokens (HS256 JWTs whose
//! claims carry the verified user id and acting role); this server only
//! verifies them. The extractor runs on every protected route and on the
//! WebSocket handshake, so unauthenticated connections are rejected before
//! they can subscribe.

use super::state::ServerState;
use crate::preferences::AccountRole;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use std::convert::Infallible;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    pub user_id: usize,
    pub role: AccountRole,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: usize,
    role: String,
    #[allow(dead_code)] // checked by jsonwebtoken's validation
    exp: usize,
}

pub enum SessionExtractionError {
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

async fn extract_session_token_from_cookies(parts: &mut Parts, ctx: &ServerState) -> Option<String> {
    CookieJar::from_request_parts(parts, ctx)
        .await
        .expect("Could not read cookies into CookieJar.")
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .and_then(|v| v.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).to_string())
}

/// Decodes and validates a session token against the configured secret.
pub fn verify_session_token(token: &str, jwt_secret: &str) -> Option<Session> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("Session token rejected: {}", e);
        e
    })
    .ok()?;

    let role = AccountRole::from_str(&decoded.claims.role)?;
    Some(Session {
        user_id: decoded.claims.sub,
        role,
    })
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No session token in cookies nor headers.");
            return None;
        }
        Some(token) => token,
    };

    verify_session_token(&token, &ctx.config.jwt_secret)
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx).await)
    }
}
