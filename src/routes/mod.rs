pub mod calendar;
pub mod combined_menus;
pub mod company_menus;
pub mod health;
pub mod metrics;
pub mod structures;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::error::MenuError;

pub type ApiError = (StatusCode, Json<Value>);

/// Map a domain error onto its HTTP status and JSON body.
pub fn error_response(e: MenuError) -> ApiError {
    let status = match &e {
        MenuError::InvalidRange { .. }
        | MenuError::DateOutsideMenu { .. }
        | MenuError::InvalidStructure(_)
        | MenuError::IneligibleMenuItem(_) => StatusCode::BAD_REQUEST,
        MenuError::NotFound { .. } => StatusCode::NOT_FOUND,
        MenuError::CrossCompanyCopyRejected { .. } => StatusCode::CONFLICT,
        MenuError::MissingStructure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MenuError::PersistenceFailure(_) | MenuError::PartialPersistenceFailure { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {e}");
    }

    let body = match &e {
        MenuError::MissingStructure { missing, .. } => {
            json!({ "error": e.to_string(), "missing": missing })
        }
        MenuError::PartialPersistenceFailure {
            failed, attempted, ..
        } => json!({ "error": e.to_string(), "failed": failed, "attempted": attempted }),
        _ => json!({ "error": e.to_string() }),
    };
    (status, Json(body))
}
