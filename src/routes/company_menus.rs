use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::DocumentStore,
    models::{combined_menu::EditCellRequest, company_menu::GeneratedCompanyMenu},
    routes::{error_response, ApiError},
    services::company_menus::CompanyMenuService,
    AppState,
};

pub async fn get_company_menu<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedCompanyMenu>, ApiError> {
    CompanyMenuService::get(&state.store, id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn edit_cell<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<EditCellRequest>,
) -> Result<Json<Value>, ApiError> {
    let (menu, updation) = CompanyMenuService::edit_cell(&state.store, id, &body, Utc::now())
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "companyMenu": menu, "updation": updation })))
}
