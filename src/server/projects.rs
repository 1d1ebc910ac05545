use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::error::Error;
use crate::github::RepoData;
use crate::server::AppState;
use crate::server::dto::{
    CanEditResponse, LikeCountResponse, LikeStatusResponse, ListParams, ProjectPayload,
    ProjectResponse, RepoPreviewParams,
};
use crate::server::response::{ApiError, ApiResponse, PaginatedResponse, StoreOptionExt};
use crate::server::validation::validate_project_payload;
use crate::store::Store;
use crate::types::Project;

pub fn project_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{id}/can-edit", get(can_edit))
        .route("/projects/{id}/like", post(toggle_like))
        .route("/projects/{id}/liked", get(is_liked))
        .route("/projects/{id}/likes", get(like_count))
        .route("/projects/{id}/refresh", post(refresh_stats))
        .route("/github/repo", get(repo_preview))
}

fn project_response(store: &dyn Store, id: &str) -> Result<ProjectResponse, ApiError> {
    let project = store.get_project(id)?.or_not_found("Project not found")?;
    let members = store.list_project_members(id)?;
    let like_count = store.like_count(id)?;
    Ok(ProjectResponse {
        project,
        members,
        like_count,
    })
}

/// Best-effort repository metadata fetch for create/update enrichment. Any
/// failure is logged and swallowed so a GitHub outage never blocks a save.
async fn try_fetch_repo(state: &AppState, user_id: &str, github_url: &str) -> Option<RepoData> {
    let token = match state.store.github_access_token(user_id) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("Failed to load GitHub credential for {user_id}: {e}");
            None
        }
    };

    match state.github.fetch_repo(github_url, token.as_deref()).await {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!("Could not enrich from {github_url}: {e}");
            None
        }
    }
}

/// The acting user is always a member of what they save, whether or not the
/// request listed them.
fn with_acting_user(mut member_ids: Vec<String>, acting_user: &str) -> Vec<String> {
    if !member_ids.iter().any(|id| id == acting_user) {
        member_ids.insert(0, acting_user.to_string());
    }
    member_ids
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let page = store.list_project_ids(&params.into_query()?)?;

    let mut projects = Vec::with_capacity(page.ids.len());
    for id in &page.ids {
        projects.push(project_response(store, id)?);
    }

    Ok::<_, ApiError>(Json(PaginatedResponse::new(projects, page.next_cursor)))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let response = project_response(state.store.as_ref(), &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

async fn create_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProjectPayload>,
) -> impl IntoResponse {
    validate_project_payload(&payload)?;
    let store = state.store.as_ref();

    let repo = match &payload.github_url {
        Some(url) => try_fetch_repo(&state, &auth.user.id, url).await,
        None => None,
    };

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        description: payload.description,
        category: payload.category,
        programming_language: repo
            .as_ref()
            .and_then(|r| r.language.clone())
            .or(payload.programming_language),
        github_url: payload.github_url,
        deployment_url: payload.deployment_url,
        stars: repo.as_ref().and_then(|r| r.stargazers_count),
        forks: repo.as_ref().and_then(|r| r.forks_count),
        tags: payload.tags,
        organization_id: payload.organization_id,
        created_at: now,
        updated_at: now,
    };

    let member_ids = with_acting_user(payload.user_ids, &auth.user.id);
    store.create_project(&project, &member_ids)?;

    let response = project_response(store, &project.id)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

async fn update_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ProjectPayload>,
) -> impl IntoResponse {
    validate_project_payload(&payload)?;
    let store = state.store.as_ref();

    let repo = match &payload.github_url {
        Some(url) => try_fetch_repo(&state, &auth.user.id, url).await,
        None => None,
    };

    let now = Utc::now();
    let project = Project {
        id,
        name: payload.name,
        description: payload.description,
        category: payload.category,
        programming_language: repo
            .as_ref()
            .and_then(|r| r.language.clone())
            .or(payload.programming_language),
        github_url: payload.github_url,
        deployment_url: payload.deployment_url,
        // None here keeps whatever stats are already stored.
        stars: repo.as_ref().and_then(|r| r.stargazers_count),
        forks: repo.as_ref().and_then(|r| r.forks_count),
        tags: payload.tags,
        organization_id: payload.organization_id,
        created_at: now,
        updated_at: now,
    };

    let member_ids = with_acting_user(payload.user_ids, &auth.user.id);
    store.update_project(&project, &member_ids, &auth.user.id)?;

    let response = project_response(store, &project.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

async fn delete_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.store.delete_project_as_member(&id, &auth.user.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn can_edit(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    store.get_project(&id)?.or_not_found("Project not found")?;
    let can_edit = store.is_project_member(&id, &auth.user.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(CanEditResponse { can_edit })))
}

async fn toggle_like(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    store.get_project(&id)?.or_not_found("Project not found")?;
    let liked = store.toggle_like(&auth.user.id, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(LikeStatusResponse { liked })))
}

async fn is_liked(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    store.get_project(&id)?.or_not_found("Project not found")?;
    let liked = store.is_liked(&auth.user.id, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(LikeStatusResponse { liked })))
}

async fn like_count(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    store.get_project(&id)?.or_not_found("Project not found")?;
    let likes = store.like_count(&id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(LikeCountResponse { likes })))
}

/// Re-fetches star and fork counts on demand. Unlike save-time enrichment,
/// an upstream failure here is reported to the caller.
async fn refresh_stats(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = store.get_project(&id)?.or_not_found("Project not found")?;

    if !store.is_project_member(&id, &auth.user.id)? {
        return Err(ApiError::forbidden("Only project members can refresh"));
    }

    let Some(github_url) = &project.github_url else {
        return Err(Error::BadRequest("Project has no GitHub URL".to_string()).into());
    };

    let token = store.github_access_token(&auth.user.id)?;
    let repo = state.github.fetch_repo(github_url, token.as_deref()).await?;

    store.set_project_stats(
        &id,
        repo.stargazers_count.unwrap_or(0),
        repo.forks_count.unwrap_or(0),
    )?;

    let response = project_response(store, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

/// Metadata preview for the project editor, before anything is saved.
/// Requires a stored GitHub credential from sign-in.
async fn repo_preview(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RepoPreviewParams>,
) -> impl IntoResponse {
    let token = state
        .store
        .github_access_token(&auth.user.id)?
        .ok_or(Error::MissingCredential)?;

    let repo = state.github.fetch_repo(&params.url, Some(&token)).await?;
    Ok::<_, ApiError>(Json(ApiResponse::success(repo)))
}
