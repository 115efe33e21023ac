use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecordStatus;

/// One dish of the catalog. Grid cells only ever hold its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub display_order: Option<i32>,
    #[serde(default)]
    pub status: RecordStatus,
}
