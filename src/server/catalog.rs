use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::server::AppState;
use crate::server::dto::CatalogResponse;
use crate::server::response::ApiResponse;
use crate::types::{ALL_CATEGORIES, POPULAR_TAGS, SortKey, SortOrder};

pub fn catalog_router() -> Router<Arc<AppState>> {
    Router::new().route("/catalog", get(catalog))
}

/// The fixed vocabularies clients build their filter UI from.
async fn catalog(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(CatalogResponse {
        categories: ALL_CATEGORIES.iter().map(|c| c.as_str()).collect(),
        popular_tags: POPULAR_TAGS.to_vec(),
        sort_keys: vec![SortKey::CreatedAt, SortKey::UpdatedAt, SortKey::Stars],
        sort_orders: vec![SortOrder::Asc, SortOrder::Desc],
    }))
}
