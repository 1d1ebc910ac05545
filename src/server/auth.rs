use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireUser, email_allowed, select_school_email};
use crate::server::AppState;
use crate::server::dto::{SignInRequest, SignInResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{Session, User, UserPreferences};

const SESSION_TTL_DAYS: i64 = 30;

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
}

/// Completes sign-in for a GitHub identity the OAuth front-channel already
/// verified. The community gate runs on every sign-in, not only the first:
/// the account must carry an email under an allowed domain.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let school_email = match req
        .email
        .as_deref()
        .filter(|e| email_allowed(e, &state.allowed_domains))
    {
        Some(email) => Some(email.to_string()),
        None => {
            // The profile email missed; the account may still hold a
            // matching verified address it keeps private.
            let entries = state.github.list_emails(&req.access_token).await?;
            select_school_email(req.email.as_deref(), &entries, &state.allowed_domains)
        }
    };

    let Some(school_email) = school_email else {
        return Err(ApiError::forbidden(
            "Sign-in is restricted to community email domains",
        ));
    };

    let user = match store.get_user_by_github_login(&req.github_login)? {
        Some(user) => user,
        None => {
            let user = User {
                id: Uuid::new_v4().to_string(),
                github_login: req.github_login.clone(),
                name: req.name.clone(),
                image: req.image.clone(),
                original_image: req.image.clone(),
                email: req.email.clone(),
                school_email: None,
                created_at: Utc::now(),
            };
            store.create_user(&user)?;
            store.create_preferences(&UserPreferences::defaults_for(&user.id))?;
            user
        }
    };

    store.store_github_token(&user.id, &req.access_token)?;

    // Recording the school email is best-effort; a write failure must not
    // undo an allow the gate already granted.
    if user.school_email.as_deref() != Some(school_email.as_str()) {
        if let Err(e) = store.set_user_school_email(&user.id, &school_email) {
            tracing::warn!("Failed to record school email for {}: {e}", user.id);
        }
    }

    let issued = state.tokens.issue()?;
    let now = Utc::now();
    store.create_session(&Session {
        id: Uuid::new_v4().to_string(),
        token_hash: issued.hash,
        token_lookup: issued.lookup,
        user_id: user.id.clone(),
        created_at: now,
        expires_at: Some(now + Duration::days(SESSION_TTL_DAYS)),
        last_used_at: None,
    })?;

    let user = store.get_user(&user.id)?.unwrap_or(user);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(SignInResponse {
            token: issued.raw,
            user,
        })),
    ))
}

async fn sign_out(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.store.delete_session(&auth.session.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
