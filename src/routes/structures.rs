use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    db::DocumentStore,
    models::structure::{
        CopyStructureRequest, StructurePair, StructureQuery, UpsertMealPlanStructureRequest,
        UpsertServiceStructureRequest,
    },
    routes::{error_response, ApiError},
    services::{
        copier::{CopyReport, StructureCopyService},
        structures::StructureService,
    },
    AppState,
};

pub async fn get_structures<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(q): Query<StructureQuery>,
) -> Result<Json<StructurePair>, ApiError> {
    StructureService::find_active_pair(&state.store, q.company_id, q.building_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn upsert_service<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<UpsertServiceStructureRequest>,
) -> Result<Json<Value>, ApiError> {
    let (id, action) = StructureService::upsert_service(
        &state.store,
        body.company_id,
        body.building_id,
        &body.week_structure,
        Utc::now(),
    )
    .await
    .map_err(error_response)?;
    Ok(Json(json!({ "id": id, "action": action })))
}

pub async fn upsert_meal_plan<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<UpsertMealPlanStructureRequest>,
) -> Result<Json<Value>, ApiError> {
    let (id, action) = StructureService::upsert_meal_plan(
        &state.store,
        body.company_id,
        body.building_id,
        &body.week_structure,
        Utc::now(),
    )
    .await
    .map_err(error_response)?;
    Ok(Json(json!({ "id": id, "action": action })))
}

/// POST /structures/copy: copy one building's structures onto its siblings.
pub async fn copy_structures<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<CopyStructureRequest>,
) -> Result<Json<CopyReport>, ApiError> {
    StructureCopyService::copy_from_building(
        &state.store,
        body.company_id,
        body.source_building_id,
        &body.target_building_ids,
        Utc::now(),
    )
    .await
    .map(Json)
    .map_err(error_response)
}
