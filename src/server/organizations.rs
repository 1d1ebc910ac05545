use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{
    CanEditResponse, ListParams, OrganizationName, OrganizationPayload, OrganizationResponse,
};
use crate::server::response::{ApiError, ApiResponse, PaginatedResponse, StoreOptionExt};
use crate::server::validation::validate_organization_payload;
use crate::store::Store;
use crate::types::Organization;

pub fn organization_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/organizations",
            get(list_organizations).post(create_organization),
        )
        .route("/organizations/names", get(list_names))
        .route(
            "/organizations/{id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route("/organizations/{id}/can-edit", get(can_edit))
}

const DETAIL_PROJECT_LIMIT: i64 = 6;

fn organization_response(
    store: &dyn Store,
    id: &str,
) -> Result<OrganizationResponse, ApiError> {
    let organization = store
        .get_organization(id)?
        .or_not_found("Organization not found")?;
    let members = store.list_organization_members(id)?;
    let project_ids = store.list_organization_project_ids(id, DETAIL_PROJECT_LIMIT)?;
    let (project_count, member_count) = store.organization_counts(id)?;
    Ok(OrganizationResponse {
        organization,
        members,
        project_ids,
        project_count,
        member_count,
    })
}

/// Best-effort logo lookup from the organization's GitHub page. A failed
/// fetch is logged and the logo left unset.
async fn try_fetch_logo(state: &AppState, url: &str) -> Option<String> {
    match state.github.fetch_org(url).await {
        Ok(org) => org.avatar_url,
        Err(e) => {
            tracing::warn!("Could not fetch organization avatar from {url}: {e}");
            None
        }
    }
}

fn with_acting_user(mut member_ids: Vec<String>, acting_user: &str) -> Vec<String> {
    if !member_ids.iter().any(|id| id == acting_user) {
        member_ids.insert(0, acting_user.to_string());
    }
    member_ids
}

async fn list_organizations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let page = store.list_organization_ids(&params.into_query()?)?;

    let mut organizations = Vec::with_capacity(page.ids.len());
    for id in &page.ids {
        organizations.push(organization_response(store, id)?);
    }

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        organizations,
        page.next_cursor,
    )))
}

async fn get_organization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let response = organization_response(state.store.as_ref(), &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

async fn create_organization(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OrganizationPayload>,
) -> impl IntoResponse {
    validate_organization_payload(&payload)?;
    let store = state.store.as_ref();

    let logo = try_fetch_logo(&state, &payload.url).await;

    let organization = Organization {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        description: payload.description,
        logo,
        url: payload.url,
        created_at: Utc::now(),
    };

    let member_ids = with_acting_user(payload.user_ids, &auth.user.id);
    store.create_organization(&organization, &member_ids)?;

    let response = organization_response(store, &organization.id)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

async fn update_organization(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<OrganizationPayload>,
) -> impl IntoResponse {
    validate_organization_payload(&payload)?;
    let store = state.store.as_ref();

    // None keeps the stored logo when the fetch misses.
    let logo = try_fetch_logo(&state, &payload.url).await;

    let organization = Organization {
        id,
        name: payload.name,
        description: payload.description,
        logo,
        url: payload.url,
        created_at: Utc::now(),
    };

    let member_ids = with_acting_user(payload.user_ids, &auth.user.id);
    store.update_organization(&organization, &member_ids, &auth.user.id)?;

    let response = organization_response(store, &organization.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

async fn delete_organization(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .store
        .delete_organization_as_member(&id, &auth.user.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn can_edit(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    store
        .get_organization(&id)?
        .or_not_found("Organization not found")?;
    let can_edit = store.is_organization_member(&id, &auth.user.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(CanEditResponse { can_edit })))
}

/// Lightweight id/name pairs for pickers.
async fn list_names(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let names = state
        .store
        .list_organization_names()?
        .into_iter()
        .map(|(id, name)| OrganizationName { id, name })
        .collect::<Vec<_>>();
    Ok::<_, ApiError>(Json(ApiResponse::success(names)))
}
