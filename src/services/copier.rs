//! Bulk copy of one building's weekly structures onto sibling buildings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::{self, Collection, DocumentStore, StoreError, WriteBatch},
    error::MenuError,
    models::{company::Building, structure::StructureSource},
    services::{
        metrics,
        structures::{
            stage_meal_plan_upsert, stage_service_upsert, validated, StructureService, UpsertAction,
        },
    },
};

/// What happened to one target building.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedBuilding {
    pub building_id: Uuid,
    pub service_structure_id: Uuid,
    pub service_action: UpsertAction,
    pub meal_plan_structure_id: Uuid,
    pub meal_plan_action: UpsertAction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyReport {
    pub source_building_id: Uuid,
    pub buildings: Vec<CopiedBuilding>,
}

/// Check every target against the company before anything is written.
fn resolve_targets(
    buildings: &[Building],
    company_id: Uuid,
    source_building_id: Uuid,
    target_building_ids: &[Uuid],
) -> Result<Vec<Uuid>, MenuError> {
    let by_id: HashMap<Uuid, &Building> = buildings.iter().map(|b| (b.id, b)).collect();
    let mut targets = Vec::with_capacity(target_building_ids.len());

    for id in target_building_ids {
        let building = by_id.get(id).ok_or(MenuError::NotFound {
            kind: "Building",
            id: *id,
        })?;
        if building.company_id != company_id {
            return Err(MenuError::CrossCompanyCopyRejected {
                building_id: *id,
                company_id,
            });
        }
        if *id != source_building_id && !targets.contains(id) {
            targets.push(*id);
        }
    }
    Ok(targets)
}

/// Upsert both structures of one target in a single batch. Whatever the
/// target held before is overwritten, well-formed or not.
async fn copy_to<S: DocumentStore>(
    store: &S,
    source: &StructureSource,
    building_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CopiedBuilding, StoreError> {
    let mut retried = false;
    loop {
        let existing =
            StructureService::find_active_documents(store, source.company_id, building_id).await?;

        let mut batch = WriteBatch::new();
        let (service_structure_id, service_action) = stage_service_upsert(
            &mut batch,
            existing.service_structure.as_ref(),
            source.company_id,
            building_id,
            &source.service_structure,
            now,
        )?;
        let (meal_plan_structure_id, meal_plan_action) = stage_meal_plan_upsert(
            &mut batch,
            existing.meal_plan_structure.as_ref(),
            source.company_id,
            building_id,
            &source.meal_plan_structure,
            now,
        )?;

        match store.commit(batch).await {
            Ok(()) => {
                return Ok(CopiedBuilding {
                    building_id,
                    service_structure_id,
                    service_action,
                    meal_plan_structure_id,
                    meal_plan_action,
                })
            }
            Err(StoreError::Duplicate { .. }) if !retried => {
                warn!("Structure copy to building {building_id} raced another writer, retrying");
                retried = true;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Copy `source` onto every target building of `company_id`. The source
/// building itself is skipped. Targets are written concurrently and a
/// failing target does not stop the others.
pub async fn copy_structure<S: DocumentStore>(
    store: &S,
    source: &StructureSource,
    target_building_ids: &[Uuid],
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CopyReport, MenuError> {
    if source.company_id != company_id {
        return Err(MenuError::CrossCompanyCopyRejected {
            building_id: source.building_id,
            company_id,
        });
    }

    validated(&source.service_structure)?;
    validated(&source.meal_plan_structure)?;

    let buildings: Vec<Building> = db::fetch_all(store, Collection::Buildings).await?;
    let targets = resolve_targets(&buildings, company_id, source.building_id, target_building_ids)?;

    let results = join_all(targets.iter().map(|building_id| async move {
        let res = copy_to(store, source, *building_id, now).await;
        if let Err(e) = &res {
            metrics::WRITE_FAILURES_COUNTER.with_label_values(&["copy"]).inc();
            warn!("Structure copy to building {building_id} failed: {e}");
        }
        res
    }))
    .await;

    let copied = MenuError::aggregate(results)?;

    for building in &copied {
        let action = match building.service_action {
            UpsertAction::Updated => "updated",
            UpsertAction::Created => "created",
        };
        metrics::STRUCTURES_COPIED_COUNTER
            .with_label_values(&[action])
            .inc();
        info!(
            "Copied structures of building {} to {} ({action})",
            source.building_id, building.building_id
        );
    }

    Ok(CopyReport {
        source_building_id: source.building_id,
        buildings: copied,
    })
}

pub struct StructureCopyService;

impl StructureCopyService {
    /// Load the source building's active structures, then copy them.
    pub async fn copy_from_building<S: DocumentStore>(
        store: &S,
        company_id: Uuid,
        source_building_id: Uuid,
        target_building_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<CopyReport, MenuError> {
        let source: Building = db::fetch_one(store, Collection::Buildings, source_building_id)
            .await?
            .ok_or(MenuError::NotFound {
                kind: "Building",
                id: source_building_id,
            })?;
        if source.company_id != company_id {
            return Err(MenuError::CrossCompanyCopyRejected {
                building_id: source.id,
                company_id,
            });
        }

        let source = StructureService::load_source(store, company_id, source.id).await?;
        copy_structure(store, &source, target_building_ids, company_id, now).await
    }
}
