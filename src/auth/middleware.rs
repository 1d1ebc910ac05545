use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use super::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::{Session, User};

/// Extractor that requires a valid session token and resolves its user.
pub struct RequireUser {
    pub session: Session,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"devdir\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = bearer_token(parts)?.ok_or(AuthError::MissingAuth)?;

        let (lookup, _secret) =
            parse_token(&raw_token).map_err(|_| AuthError::InvalidToken)?;

        let session = state
            .store
            .get_session_by_lookup(&lookup)
            .map_err(|_| AuthError::InternalError)?
            .ok_or(AuthError::InvalidToken)?;

        let generator = TokenGenerator::new();
        if !generator
            .verify(&raw_token, &session.token_hash)
            .map_err(|_| AuthError::InternalError)?
        {
            return Err(AuthError::InvalidToken);
        }

        if let Some(expires_at) = &session.expires_at {
            if expires_at < &Utc::now() {
                return Err(AuthError::TokenExpired);
            }
        }

        let user = state
            .store
            .get_user(&session.user_id)
            .map_err(|_| AuthError::InternalError)?
            .ok_or(AuthError::InvalidToken)?;

        if let Err(e) = state.store.update_session_last_used(&session.id) {
            tracing::warn!("Failed to update session last_used_at: {e}");
        }

        Ok(RequireUser { session, user })
    }
}

/// Only the Bearer scheme is supported; any other scheme is rejected rather
/// than silently treated as anonymous.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) => Ok(Some(token.to_string())),
            None => Err(AuthError::InvalidScheme),
        },
        None => Ok(None),
    }
}
