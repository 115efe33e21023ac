use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{grid::CompanyMenuData, RecordStatus};

/// Projected menu of one company building, snapshotted at generation time.
/// Company and building names are copied and never refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCompanyMenu {
    pub id: Uuid,
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub company_name: String,
    pub building_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub company_menu_data: CompanyMenuData,
    pub combined_menu_id: Uuid,
    #[serde(default)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// Log entry for a later edit of a generated menu cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuUpdation {
    pub id: Uuid,
    pub company_menu_id: Uuid,
    pub combined_menu_id: Uuid,
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub date: NaiveDate,
    pub service_id: Uuid,
    pub meal_plan_id: Uuid,
    pub sub_meal_plan_id: Uuid,
    pub previous_menu_item_ids: BTreeSet<Uuid>,
    pub menu_item_ids: BTreeSet<Uuid>,
    pub updated_at: DateTime<Utc>,
}
