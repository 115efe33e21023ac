pub mod calendar;
pub mod catalog;
pub mod combined_menu;
pub mod company;
pub mod company_menu;
pub mod grid;
pub mod structure;

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by every stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, RecordStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }
}
