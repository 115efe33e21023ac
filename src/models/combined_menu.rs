use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{grid::CombinedMenuGrid, RecordStatus};

/// The master, company-agnostic menu for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedMenu {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub menu_data: CombinedMenuGrid,
    #[serde(default)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One edit applied to a grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum CellEdit {
    Set {
        #[serde(rename = "menuItemIds")]
        menu_item_ids: Vec<Uuid>,
    },
    Add {
        #[serde(rename = "menuItemId")]
        menu_item_id: Uuid,
    },
    Remove {
        #[serde(rename = "menuItemId")]
        menu_item_id: Uuid,
    },
}

/// Body for PUT /combined-menus/{id}/cells and PUT /company-menus/{id}/cells.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCellRequest {
    pub date: NaiveDate,
    pub service_id: Uuid,
    pub meal_plan_id: Uuid,
    pub sub_meal_plan_id: Uuid,
    #[serde(flatten)]
    pub edit: CellEdit,
}

/// Query params for GET /combined-menus/{id}/preview.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub building_id: Uuid,
}
