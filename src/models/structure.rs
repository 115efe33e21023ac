use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{calendar::WeekdayName, RecordStatus};

/// A weekly recurrence tree: one list of assignments per weekday.
/// A weekday with no key means nothing is offered that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekStructure<T> {
    days: BTreeMap<WeekdayName, Vec<T>>,
}

impl<T> Default for WeekStructure<T> {
    fn default() -> Self {
        Self {
            days: BTreeMap::new(),
        }
    }
}

impl<T> WeekStructure<T> {
    pub fn for_day(&self, weekday: WeekdayName) -> Option<&[T]> {
        self.days.get(&weekday).map(Vec::as_slice)
    }

    pub fn set_day(&mut self, weekday: WeekdayName, assignments: Vec<T>) {
        self.days.insert(weekday, assignments);
    }

    pub fn days(&self) -> impl Iterator<Item = (&WeekdayName, &Vec<T>)> {
        self.days.iter()
    }
}

impl<T> FromIterator<(WeekdayName, Vec<T>)> for WeekStructure<T> {
    fn from_iter<I: IntoIterator<Item = (WeekdayName, Vec<T>)>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubServiceRef {
    pub sub_service_id: Uuid,
}

/// Which service windows physically operate on a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAssignment {
    pub service_id: Uuid,
    #[serde(default)]
    pub sub_services: Vec<SubServiceRef>,
}

impl ServiceAssignment {
    pub fn offers_sub_service(&self, sub_service_id: Uuid) -> bool {
        self.sub_services
            .iter()
            .any(|s| s.sub_service_id == sub_service_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMealPlanRef {
    pub sub_meal_plan_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanEntry {
    pub meal_plan_id: Uuid,
    #[serde(default)]
    pub sub_meal_plans: Vec<SubMealPlanRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubServiceMealPlans {
    pub sub_service_id: Uuid,
    #[serde(default)]
    pub meal_plans: Vec<MealPlanEntry>,
}

/// Which meal-plan tiers a building is entitled to under a service on a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMealPlanAssignment {
    pub service_id: Uuid,
    #[serde(default)]
    pub sub_services: Vec<SubServiceMealPlans>,
}

pub type ServiceWeek = WeekStructure<ServiceAssignment>;
pub type MealPlanWeek = WeekStructure<ServiceMealPlanAssignment>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStructure {
    pub id: Uuid,
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub week_structure: ServiceWeek,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanStructure {
    pub id: Uuid,
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub week_structure: MealPlanWeek,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structure contents of one building, used as the source of a bulk copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSource {
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub service_structure: ServiceWeek,
    pub meal_plan_structure: MealPlanWeek,
}

/// Both active structures of one building.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructurePair {
    pub service_structure: Option<ServiceStructure>,
    pub meal_plan_structure: Option<MealPlanStructure>,
}

/// Body for PUT /structures/service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertServiceStructureRequest {
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub week_structure: ServiceWeek,
}

/// Body for PUT /structures/meal-plan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMealPlanStructureRequest {
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub week_structure: MealPlanWeek,
}

/// Body for POST /structures/copy.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyStructureRequest {
    pub company_id: Uuid,
    pub source_building_id: Uuid,
    pub target_building_ids: Vec<Uuid>,
}

/// Query params for GET /structures.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureQuery {
    pub company_id: Uuid,
    pub building_id: Uuid,
}

/// Structural checks applied once where trees enter or leave the store.
pub trait ValidateStructure {
    fn validate(&self) -> Result<(), String>;
}

fn ensure_unique<I>(ids: I, what: &str, weekday: WeekdayName) -> Result<(), String>
where
    I: IntoIterator<Item = Uuid>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(format!("duplicate {what} {id} on {weekday}"));
        }
    }
    Ok(())
}

impl ValidateStructure for ServiceWeek {
    fn validate(&self) -> Result<(), String> {
        for (weekday, services) in self.days() {
            ensure_unique(services.iter().map(|s| s.service_id), "service", *weekday)?;
            for service in services {
                ensure_unique(
                    service.sub_services.iter().map(|s| s.sub_service_id),
                    "sub-service",
                    *weekday,
                )?;
            }
        }
        Ok(())
    }
}

impl ValidateStructure for MealPlanWeek {
    fn validate(&self) -> Result<(), String> {
        for (weekday, services) in self.days() {
            ensure_unique(services.iter().map(|s| s.service_id), "service", *weekday)?;
            for service in services {
                ensure_unique(
                    service.sub_services.iter().map(|s| s.sub_service_id),
                    "sub-service",
                    *weekday,
                )?;
                for sub_service in &service.sub_services {
                    ensure_unique(
                        sub_service.meal_plans.iter().map(|m| m.meal_plan_id),
                        "meal plan",
                        *weekday,
                    )?;
                    for meal_plan in &sub_service.meal_plans {
                        ensure_unique(
                            meal_plan.sub_meal_plans.iter().map(|s| s.sub_meal_plan_id),
                            "sub-meal-plan",
                            *weekday,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}
