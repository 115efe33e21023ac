//! Fan-out: one projected menu per active company building.
//!
//! Buildings lacking either active structure, or holding one that fails
//! validation, are skipped and reported, never treated as errors. Persistence of every planned menu is issued at once and
//! awaited together; documents already written are kept when others fail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::{self, Collection, DocumentStore},
    error::{MenuError, MissingKind},
    models::{
        calendar::DayEntry,
        company::{Building, Company},
        company_menu::GeneratedCompanyMenu,
        grid::CombinedMenuGrid,
        structure::{MealPlanStructure, ServiceStructure},
        RecordStatus,
    },
    services::{
        cache::{Clock, RunCache},
        calendar::expand_range,
        combined_menus::CombinedMenuService,
        metrics,
        projection::{project_with, ProjectionOptions},
        structures::{validated, StructureService},
    },
};

/// Everything one fan-out run reads.
pub struct FanOutInput<'a> {
    pub combined_menu_id: Uuid,
    pub grid: &'a CombinedMenuGrid,
    pub days: &'a [DayEntry],
    pub companies: &'a [Company],
    pub buildings: &'a [Building],
    pub service_structures: &'a [ServiceStructure],
    pub meal_plan_structures: &'a [MealPlanStructure],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedBuilding {
    pub company_id: Uuid,
    pub building_id: Uuid,
    pub building_name: String,
    pub missing: MissingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutPlan {
    pub menus: Vec<GeneratedCompanyMenu>,
    pub skipped: Vec<SkippedBuilding>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutReport {
    pub combined_menu_id: Uuid,
    pub generated: Vec<GeneratedCompanyMenu>,
    pub skipped: Vec<SkippedBuilding>,
    pub generated_count: usize,
    pub skipped_count: usize,
}

/// Decide what a run would write, without touching the store.
pub fn plan(
    input: &FanOutInput<'_>,
    options: ProjectionOptions,
    now: DateTime<Utc>,
) -> FanOutPlan {
    let (Some(first), Some(last)) = (input.days.first(), input.days.last()) else {
        return FanOutPlan::default();
    };

    let mut services: HashMap<(Uuid, Uuid), &ServiceStructure> = HashMap::new();
    for s in input.service_structures.iter().filter(|s| s.status.is_active()) {
        services.entry((s.company_id, s.building_id)).or_insert(s);
    }
    let mut meal_plans: HashMap<(Uuid, Uuid), &MealPlanStructure> = HashMap::new();
    for m in input.meal_plan_structures.iter().filter(|m| m.status.is_active()) {
        meal_plans.entry((m.company_id, m.building_id)).or_insert(m);
    }

    let mut plan = FanOutPlan::default();

    for company in input.companies.iter().filter(|c| c.status.is_active()) {
        let buildings = input
            .buildings
            .iter()
            .filter(|b| b.company_id == company.id && b.status.is_active());

        for building in buildings {
            let key = (company.id, building.id);
            let mut skip = |missing: MissingKind, reason: Option<String>| {
                info!(
                    "Fan-out: skipping building '{}' of '{}' (no active {missing})",
                    building.name, company.name
                );
                plan.skipped.push(SkippedBuilding {
                    company_id: company.id,
                    building_id: building.id,
                    building_name: building.name.clone(),
                    missing,
                    reason,
                });
            };

            let (service, meal_plan) = match (services.get(&key), meal_plans.get(&key)) {
                (Some(service), Some(meal_plan)) => (*service, *meal_plan),
                (service, meal_plan) => {
                    let missing = MissingKind::from_presence(service.is_some(), meal_plan.is_some())
                        .unwrap_or(MissingKind::Both);
                    skip(missing, None);
                    continue;
                }
            };

            let checked = validated(&service.week_structure)
                .and_then(|_| validated(&meal_plan.week_structure));
            if let Err(e) = checked {
                warn!("Fan-out: building '{}' has a malformed structure: {e}", building.name);
                skip(MissingKind::Invalid, Some(e.to_string()));
                continue;
            }

            let company_menu_data = project_with(
                options,
                input.grid,
                &service.week_structure,
                &meal_plan.week_structure,
                input.days,
            );

            plan.menus.push(GeneratedCompanyMenu {
                id: Uuid::new_v4(),
                company_id: company.id,
                building_id: building.id,
                company_name: company.name.clone(),
                building_name: building.name.clone(),
                start_date: first.date,
                end_date: last.date,
                company_menu_data,
                combined_menu_id: input.combined_menu_id,
                status: RecordStatus::Active,
                created_at: now,
            });
        }
    }

    plan
}

/// Plan the run, then persist every generated menu concurrently.
pub async fn generate_all<S: DocumentStore>(
    store: &S,
    input: &FanOutInput<'_>,
    options: ProjectionOptions,
    now: DateTime<Utc>,
) -> Result<FanOutReport, MenuError> {
    metrics::FANOUT_RUNS_COUNTER.inc();
    let FanOutPlan { menus, skipped } = plan(input, options, now);

    for s in &skipped {
        let missing = s.missing.to_string();
        metrics::SKIPPED_BUILDINGS_COUNTER
            .with_label_values(&[missing.as_str()])
            .inc();
    }

    let writes = menus.iter().map(|menu| async move {
        let res = db::insert(store, Collection::CompanyMenus, menu.id, menu).await;
        if let Err(e) = &res {
            metrics::WRITE_FAILURES_COUNTER.with_label_values(&["fanout"]).inc();
            warn!(
                "Fan-out: failed to persist menu for building '{}': {e}",
                menu.building_name
            );
        }
        res
    });
    let results = join_all(writes).await;
    MenuError::aggregate(results)?;

    metrics::COMPANY_MENUS_COUNTER.inc_by(menus.len() as f64);
    info!(
        "Fan-out for combined menu {}: {} menu(s) generated, {} building(s) skipped",
        input.combined_menu_id,
        menus.len(),
        skipped.len()
    );

    Ok(FanOutReport {
        combined_menu_id: input.combined_menu_id,
        generated_count: menus.len(),
        skipped_count: skipped.len(),
        generated: menus,
        skipped,
    })
}

pub struct FanOutService;

impl FanOutService {
    /// Load a combined menu and every active company, building and structure,
    /// then fan the menu out over its whole date range.
    pub async fn run<S: DocumentStore, C: Clock>(
        store: &S,
        cache: &RunCache<C>,
        combined_menu_id: Uuid,
        options: ProjectionOptions,
    ) -> Result<FanOutReport, MenuError> {
        let menu = CombinedMenuService::get(store, combined_menu_id).await?;
        let days = expand_range(menu.start_date, menu.end_date)?;

        let companies: Vec<Company> = cache.fetch_all(store, Collection::Companies).await?;
        let buildings: Vec<Building> = cache.fetch_all(store, Collection::Buildings).await?;
        let service_structures = StructureService::list_active_service(store, cache).await?;
        let meal_plan_structures = StructureService::list_active_meal_plan(store, cache).await?;

        info!(
            "Fan-out for '{}' ({} to {}): {} day(s), {} company(ies), {} building(s)",
            menu.name,
            menu.start_date,
            menu.end_date,
            days.len(),
            companies.len(),
            buildings.len()
        );

        let input = FanOutInput {
            combined_menu_id,
            grid: &menu.menu_data,
            days: &days,
            companies: &companies,
            buildings: &buildings,
            service_structures: &service_structures,
            meal_plan_structures: &meal_plan_structures,
        };
        let report = generate_all(store, &input, options, cache.now()).await;
        cache.invalidate(Collection::CompanyMenus);
        report
    }
}
