use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::DocumentStore,
    models::{
        combined_menu::{CombinedMenu, EditCellRequest, PreviewQuery},
        company_menu::GeneratedCompanyMenu,
        grid::CompanyMenuData,
    },
    routes::{error_response, ApiError},
    services::{
        cache::RunCache,
        combined_menus::CombinedMenuService,
        company_menus::CompanyMenuService,
        fanout::{FanOutReport, FanOutService},
    },
    AppState,
};

pub async fn get_combined_menu<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CombinedMenu>, ApiError> {
    CombinedMenuService::get(&state.store, id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_combined_menu<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let removed = CombinedMenuService::delete_cascade(&state.store, id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "deleted": true, "companyMenusDeleted": removed })))
}

pub async fn edit_cell<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<EditCellRequest>,
) -> Result<Json<CombinedMenu>, ApiError> {
    CombinedMenuService::edit_cell(&state.store, id, &body, Utc::now())
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /combined-menus/{id}/generate: fan the menu out to every active building.
pub async fn generate<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FanOutReport>, ApiError> {
    let cache = RunCache::new(state.config.cache_ttl());
    FanOutService::run(&state.store, &cache, id, state.config.projection_options())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_company_menus<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GeneratedCompanyMenu>>, ApiError> {
    CombinedMenuService::get(&state.store, id)
        .await
        .map_err(error_response)?;
    CompanyMenuService::list_for_combined_menu(&state.store, id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn preview<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Query(q): Query<PreviewQuery>,
) -> Result<Json<CompanyMenuData>, ApiError> {
    CombinedMenuService::preview(
        &state.store,
        id,
        q.building_id,
        state.config.projection_options(),
    )
    .await
    .map(Json)
    .map_err(error_response)
}
