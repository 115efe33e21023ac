use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::{
    db::{self, Collection, DocumentStore, Filter, StoreError, WriteBatch},
    error::{MenuError, MissingKind},
    models::{
        structure::{
            MealPlanStructure, MealPlanWeek, ServiceStructure, ServiceWeek, StructurePair,
            StructureSource, ValidateStructure,
        },
        RecordStatus,
    },
    services::cache::{Clock, RunCache},
};

/// Whether an upsert touched an existing document or created one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Updated,
    Created,
}

pub(crate) fn validated<T: ValidateStructure>(week: &T) -> Result<(), MenuError> {
    week.validate().map_err(MenuError::InvalidStructure)
}

fn active_filter(company_id: Uuid, building_id: Uuid) -> Filter {
    Filter::new()
        .eq("companyId", company_id.to_string())
        .eq("buildingId", building_id.to_string())
        .eq("status", RecordStatus::Active.as_str())
}

pub struct StructureService;

impl StructureService {
    /// Every active service structure, unvalidated. Fan-out checks each one
    /// for the building it belongs to, so one malformed document never
    /// blocks the rest.
    pub async fn list_active_service<S: DocumentStore, C: Clock>(
        store: &S,
        cache: &RunCache<C>,
    ) -> Result<Vec<ServiceStructure>, MenuError> {
        let structures: Vec<ServiceStructure> =
            cache.fetch_all(store, Collection::ServiceStructures).await?;
        Ok(structures
            .into_iter()
            .filter(|s| s.status.is_active())
            .collect())
    }

    pub async fn list_active_meal_plan<S: DocumentStore, C: Clock>(
        store: &S,
        cache: &RunCache<C>,
    ) -> Result<Vec<MealPlanStructure>, MenuError> {
        let structures: Vec<MealPlanStructure> =
            cache.fetch_all(store, Collection::MealPlanStructures).await?;
        Ok(structures
            .into_iter()
            .filter(|s| s.status.is_active())
            .collect())
    }

    /// Both active structures of a building, as stored.
    pub(crate) async fn find_active_documents<S: DocumentStore>(
        store: &S,
        company_id: Uuid,
        building_id: Uuid,
    ) -> Result<StructurePair, StoreError> {
        let filter = active_filter(company_id, building_id);
        let service: Vec<ServiceStructure> =
            db::fetch_where(store, Collection::ServiceStructures, &filter).await?;
        let meal_plan: Vec<MealPlanStructure> =
            db::fetch_where(store, Collection::MealPlanStructures, &filter).await?;

        if service.len() > 1 || meal_plan.len() > 1 {
            tracing::warn!(
                "Building {building_id} has {} active service and {} active meal-plan structures; using the first",
                service.len(),
                meal_plan.len()
            );
        }

        Ok(StructurePair {
            service_structure: service.into_iter().next(),
            meal_plan_structure: meal_plan.into_iter().next(),
        })
    }

    /// Both active structures of a building, either of which may be absent.
    pub async fn find_active_pair<S: DocumentStore>(
        store: &S,
        company_id: Uuid,
        building_id: Uuid,
    ) -> Result<StructurePair, MenuError> {
        let pair = Self::find_active_documents(store, company_id, building_id).await?;
        if let Some(s) = &pair.service_structure {
            validated(&s.week_structure)?;
        }
        if let Some(m) = &pair.meal_plan_structure {
            validated(&m.week_structure)?;
        }
        Ok(pair)
    }

    /// Load a building's structures as a copy source; both must exist.
    pub async fn load_source<S: DocumentStore>(
        store: &S,
        company_id: Uuid,
        building_id: Uuid,
    ) -> Result<StructureSource, MenuError> {
        let pair = Self::find_active_pair(store, company_id, building_id).await?;
        match (pair.service_structure, pair.meal_plan_structure) {
            (Some(service), Some(meal_plan)) => Ok(StructureSource {
                company_id,
                building_id,
                service_structure: service.week_structure,
                meal_plan_structure: meal_plan.week_structure,
            }),
            (service, meal_plan) => Err(MenuError::MissingStructure {
                company_id,
                building_id,
                missing: MissingKind::from_presence(service.is_some(), meal_plan.is_some())
                    .unwrap_or(MissingKind::Both),
            }),
        }
    }

    pub async fn upsert_service<S: DocumentStore>(
        store: &S,
        company_id: Uuid,
        building_id: Uuid,
        week: &ServiceWeek,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, UpsertAction), MenuError> {
        validated(week)?;
        let mut retried = false;
        loop {
            let pair = Self::find_active_documents(store, company_id, building_id).await?;
            let mut batch = WriteBatch::new();
            let outcome = stage_service_upsert(
                &mut batch,
                pair.service_structure.as_ref(),
                company_id,
                building_id,
                week,
                now,
            )?;
            match store.commit(batch).await {
                Ok(()) => {
                    tracing::info!("Service structure {:?} for building {building_id}", outcome.1);
                    return Ok(outcome);
                }
                // A concurrent writer created the active structure first; update it instead.
                Err(StoreError::Duplicate { .. }) if !retried => retried = true,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn upsert_meal_plan<S: DocumentStore>(
        store: &S,
        company_id: Uuid,
        building_id: Uuid,
        week: &MealPlanWeek,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, UpsertAction), MenuError> {
        validated(week)?;
        let mut retried = false;
        loop {
            let pair = Self::find_active_documents(store, company_id, building_id).await?;
            let mut batch = WriteBatch::new();
            let outcome = stage_meal_plan_upsert(
                &mut batch,
                pair.meal_plan_structure.as_ref(),
                company_id,
                building_id,
                week,
                now,
            )?;
            match store.commit(batch).await {
                Ok(()) => {
                    tracing::info!("Meal-plan structure {:?} for building {building_id}", outcome.1);
                    return Ok(outcome);
                }
                Err(StoreError::Duplicate { .. }) if !retried => retried = true,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn week_update(week: Value, now: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("weekStructure".to_string(), week);
    fields.insert("updatedAt".to_string(), json!(now));
    fields
}

/// Add the write for one service structure upsert to `batch`:
/// an in-place update of `existing` when present, otherwise a new active document.
/// `week` must already be validated.
pub(crate) fn stage_service_upsert(
    batch: &mut WriteBatch,
    existing: Option<&ServiceStructure>,
    company_id: Uuid,
    building_id: Uuid,
    week: &ServiceWeek,
    now: DateTime<Utc>,
) -> Result<(Uuid, UpsertAction), StoreError> {
    match existing {
        Some(current) => {
            let body = serde_json::to_value(week)?;
            batch.update(Collection::ServiceStructures, current.id, week_update(body, now));
            Ok((current.id, UpsertAction::Updated))
        }
        None => {
            let structure = ServiceStructure {
                id: Uuid::new_v4(),
                company_id,
                building_id,
                week_structure: week.clone(),
                status: RecordStatus::Active,
                created_at: now,
                updated_at: now,
            };
            batch.create(Collection::ServiceStructures, structure.id, &structure)?;
            Ok((structure.id, UpsertAction::Created))
        }
    }
}

pub(crate) fn stage_meal_plan_upsert(
    batch: &mut WriteBatch,
    existing: Option<&MealPlanStructure>,
    company_id: Uuid,
    building_id: Uuid,
    week: &MealPlanWeek,
    now: DateTime<Utc>,
) -> Result<(Uuid, UpsertAction), StoreError> {
    match existing {
        Some(current) => {
            let body = serde_json::to_value(week)?;
            batch.update(Collection::MealPlanStructures, current.id, week_update(body, now));
            Ok((current.id, UpsertAction::Updated))
        }
        None => {
            let structure = MealPlanStructure {
                id: Uuid::new_v4(),
                company_id,
                building_id,
                week_structure: week.clone(),
                status: RecordStatus::Active,
                created_at: now,
                updated_at: now,
            };
            batch.create(Collection::MealPlanStructures, structure.id, &structure)?;
            Ok((structure.id, UpsertAction::Created))
        }
    }
}
