use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::db::StoreError;

/// Which weekly structure a building is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingKind {
    ServiceStructure,
    MealPlanStructure,
    Both,
    /// Both exist but at least one fails validation.
    Invalid,
}

impl MissingKind {
    pub fn from_presence(has_service: bool, has_meal_plan: bool) -> Option<Self> {
        match (has_service, has_meal_plan) {
            (true, true) => None,
            (false, true) => Some(MissingKind::ServiceStructure),
            (true, false) => Some(MissingKind::MealPlanStructure),
            (false, false) => Some(MissingKind::Both),
        }
    }
}

impl std::fmt::Display for MissingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MissingKind::ServiceStructure => "service structure",
            MissingKind::MealPlanStructure => "meal-plan structure",
            MissingKind::Both => "service and meal-plan structures",
            MissingKind::Invalid => "well-formed structures",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Date {date} is outside the menu range {start} to {end}")]
    DateOutsideMenu {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Building {building_id} of company {company_id} has no active {missing}")]
    MissingStructure {
        company_id: Uuid,
        building_id: Uuid,
        missing: MissingKind,
    },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("{failed} of {attempted} writes failed, first error: {first}")]
    PartialPersistenceFailure {
        failed: usize,
        attempted: usize,
        first: StoreError,
    },

    #[error("Building {building_id} does not belong to company {company_id}")]
    CrossCompanyCopyRejected { building_id: Uuid, company_id: Uuid },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Menu item {0} is unknown or inactive")]
    IneligibleMenuItem(Uuid),
}

impl MenuError {
    /// Collapse the results of concurrently issued writes into one outcome.
    pub fn aggregate<T>(results: Vec<Result<T, StoreError>>) -> Result<Vec<T>, MenuError> {
        let attempted = results.len();
        let mut done = Vec::with_capacity(attempted);
        let mut failed = 0;
        let mut first = None;

        for result in results {
            match result {
                Ok(value) => done.push(value),
                Err(e) => {
                    failed += 1;
                    first.get_or_insert(e);
                }
            }
        }

        match first {
            None => Ok(done),
            Some(first) => Err(MenuError::PartialPersistenceFailure {
                failed,
                attempted,
                first,
            }),
        }
    }
}
