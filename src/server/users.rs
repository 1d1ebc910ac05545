use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{
    ExperiencePayload, LinkPayload, ListParams, ProfileResponse, ProjectCountResponse,
    PreferencesPatch, PublicProfileResponse,
};
use crate::server::response::{ApiError, ApiResponse, PaginatedResponse, StoreOptionExt};
use crate::server::validation::{validate_experience_payload, validate_link_payload};
use crate::store::Store;
use crate::types::{User, UserLink, UserPreferences, WorkExperience};

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/preferences", patch(update_preferences))
        .route("/me/experience", post(add_experience))
        .route("/me/experience/{id}", delete(remove_experience))
        .route("/me/links", post(add_link))
        .route("/me/links/{id}", delete(remove_link))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/project-count", get(project_count))
}

const PUBLIC_PROJECT_LIMIT: i64 = 6;

fn generic_avatar_url(name: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/initials/svg?seed={}",
        urlencoding::encode(name)
    )
}

/// Applies privacy preferences to a user record before it leaves the server.
/// Hidden fields are dropped entirely rather than blanked.
fn public_view(store: &dyn Store, mut user: User) -> crate::error::Result<PublicProfileResponse> {
    let prefs = store
        .get_preferences(&user.id)?
        .unwrap_or_else(|| UserPreferences::defaults_for(&user.id));

    if !prefs.show_email {
        user.email = None;
    }
    if !prefs.show_school_email {
        user.school_email = None;
    }

    let work_experience = if prefs.show_work_experience {
        store.list_work_experience(&user.id)?
    } else {
        Vec::new()
    };

    let links = store.list_user_links(&user.id)?;

    let organizations = if prefs.show_organizations {
        store.list_user_organizations(&user.id)?
    } else {
        Vec::new()
    };

    let project_ids = if prefs.show_related_projects {
        store.list_user_project_ids(&user.id, Some(PUBLIC_PROJECT_LIMIT))?
    } else {
        Vec::new()
    };

    Ok(PublicProfileResponse {
        user,
        work_experience,
        links,
        organizations,
        project_ids,
    })
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let page = store.list_user_ids(&params.into_query()?)?;

    let mut profiles = Vec::with_capacity(page.ids.len());
    for id in &page.ids {
        let user = store.get_user(id)?.or_not_found("User not found")?;
        profiles.push(public_view(store, user)?);
    }

    Ok::<_, ApiError>(Json(PaginatedResponse::new(profiles, page.next_cursor)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = store.get_user(&id)?.or_not_found("User not found")?;
    let profile = public_view(store, user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

async fn project_count(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let count = state.store.count_user_projects(&id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(ProjectCountResponse { count })))
}

/// The signed-in user's own profile, unredacted.
async fn get_me(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = auth.user;

    let preferences = store
        .get_preferences(&user.id)?
        .unwrap_or_else(|| UserPreferences::defaults_for(&user.id));
    let work_experience = store.list_work_experience(&user.id)?;
    let links = store.list_user_links(&user.id)?;
    let organizations = store.list_user_organizations(&user.id)?;
    let project_ids = store.list_user_project_ids(&user.id, None)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ProfileResponse {
        user,
        preferences,
        work_experience,
        links,
        organizations,
        project_ids,
    })))
}

async fn add_experience(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExperiencePayload>,
) -> impl IntoResponse {
    validate_experience_payload(&payload)?;

    let entry = WorkExperience {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id,
        position: payload.position,
        company: payload.company,
        location: payload.location,
        started_at: payload.started_at,
        ended_at: payload.ended_at,
    };
    state.store.add_work_experience(&entry)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}

async fn remove_experience(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.store.delete_work_experience(&id, &auth.user.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn add_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LinkPayload>,
) -> impl IntoResponse {
    validate_link_payload(&payload)?;

    let link = UserLink {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id,
        url: payload.url,
        link_type: payload.link_type,
        logo: payload.logo,
    };
    state.store.add_user_link(&link)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(link))))
}

async fn remove_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.store.delete_user_link(&id, &auth.user.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn update_preferences(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PreferencesPatch>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    // Flipping the generic-image switch swaps the served avatar between a
    // generated placeholder and the image captured at first sign-in.
    let showing_generic = user.image != user.original_image;
    match patch.show_generic_image {
        Some(true) if !showing_generic => {
            store.set_user_image(&user.id, &generic_avatar_url(&user.name))?;
        }
        Some(false) if showing_generic => {
            if let Some(original) = &user.original_image {
                store.set_user_image(&user.id, original)?;
            }
        }
        _ => {}
    }

    let mut prefs = store
        .get_preferences(&user.id)?
        .unwrap_or_else(|| UserPreferences::defaults_for(&user.id));

    if let Some(v) = patch.show_email {
        prefs.show_email = v;
    }
    if let Some(v) = patch.show_school_email {
        prefs.show_school_email = v;
    }
    if let Some(v) = patch.show_generic_image {
        prefs.show_generic_image = v;
    }
    if let Some(v) = patch.show_work_experience {
        prefs.show_work_experience = v;
    }
    if let Some(v) = patch.show_organizations {
        prefs.show_organizations = v;
    }
    if let Some(v) = patch.show_related_projects {
        prefs.show_related_projects = v;
    }

    store.upsert_preferences(&prefs)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(prefs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_avatar_encodes_seed() {
        assert_eq!(
            generic_avatar_url("Ada Lovelace"),
            "https://api.dicebear.com/7.x/initials/svg?seed=Ada%20Lovelace"
        );
    }
}
