#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use menufan_api::{
    db::{self, Collection, MemoryDocumentStore},
    models::{
        calendar::WeekdayName,
        catalog::MenuItem,
        combined_menu::CombinedMenu,
        company::{Building, Company},
        grid::MenuGrid,
        structure::{
            MealPlanEntry, MealPlanWeek, ServiceAssignment, ServiceMealPlanAssignment,
            ServiceStructure, ServiceWeek, SubMealPlanRef, SubServiceMealPlans, SubServiceRef,
        },
        RecordStatus,
    },
    services::structures::StructureService,
};

pub const S1: Uuid = Uuid::from_u128(0x51);
pub const SS1: Uuid = Uuid::from_u128(0x551);
pub const M1: Uuid = Uuid::from_u128(0x41);
pub const M2: Uuid = Uuid::from_u128(0x42);
pub const SM1: Uuid = Uuid::from_u128(0x541);
pub const I1: Uuid = Uuid::from_u128(0x11);
pub const I2: Uuid = Uuid::from_u128(0x12);

pub const COMPANY: Uuid = Uuid::from_u128(0xa1);
pub const OTHER_COMPANY: Uuid = Uuid::from_u128(0xa2);
pub const B1: Uuid = Uuid::from_u128(0xb1);
pub const B2: Uuid = Uuid::from_u128(0xb2);
pub const B3: Uuid = Uuid::from_u128(0xb3);
pub const FOREIGN_BUILDING: Uuid = Uuid::from_u128(0xbf);
pub const COMBINED_MENU: Uuid = Uuid::from_u128(0xc0);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2025-06-02 is a Monday.
pub fn monday() -> NaiveDate {
    date(2025, 6, 2)
}

pub fn service_week(days: &[WeekdayName]) -> ServiceWeek {
    days.iter()
        .map(|day| {
            (
                *day,
                vec![ServiceAssignment {
                    service_id: S1,
                    sub_services: vec![SubServiceRef { sub_service_id: SS1 }],
                }],
            )
        })
        .collect()
}

pub fn meal_plan_week(days: &[WeekdayName], meal_plan_id: Uuid) -> MealPlanWeek {
    days.iter()
        .map(|day| {
            (
                *day,
                vec![ServiceMealPlanAssignment {
                    service_id: S1,
                    sub_services: vec![SubServiceMealPlans {
                        sub_service_id: SS1,
                        meal_plans: vec![MealPlanEntry {
                            meal_plan_id,
                            sub_meal_plans: vec![SubMealPlanRef { sub_meal_plan_id: SM1 }],
                        }],
                    }],
                }],
            )
        })
        .collect()
}

/// One company (two active buildings and an inactive one), a second company
/// with one building, an active catalog and a Monday-to-Tuesday combined menu
/// whose Monday cell S1/M1/SM1 holds {I1, I2}.
pub async fn seed(store: &MemoryDocumentStore) -> anyhow::Result<()> {
    for (id, name) in [(COMPANY, "Acme"), (OTHER_COMPANY, "Globex")] {
        let company = Company {
            id,
            name: name.into(),
            status: RecordStatus::Active,
        };
        db::insert(store, Collection::Companies, id, &company).await?;
    }

    let buildings = [
        (B1, COMPANY, "North", RecordStatus::Active),
        (B2, COMPANY, "South", RecordStatus::Active),
        (B3, COMPANY, "Annex", RecordStatus::Inactive),
        (FOREIGN_BUILDING, OTHER_COMPANY, "Harbour", RecordStatus::Active),
    ];
    for (id, company_id, name, status) in buildings {
        let building = Building {
            id,
            company_id,
            name: name.into(),
            status,
        };
        db::insert(store, Collection::Buildings, id, &building).await?;
    }

    for id in [I1, I2] {
        let item = MenuItem {
            id,
            name: format!("Dish {}", id.as_u128()),
            category: None,
            display_order: None,
            status: RecordStatus::Active,
        };
        db::insert(store, Collection::MenuItems, id, &item).await?;
    }

    let mut grid = MenuGrid::default();
    grid.set_cell(monday(), S1, M1, SM1, [I1, I2]);
    let menu = CombinedMenu {
        id: COMBINED_MENU,
        name: "Week 23".into(),
        start_date: monday(),
        end_date: date(2025, 6, 3),
        menu_data: grid,
        status: RecordStatus::Active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db::insert(store, Collection::CombinedMenus, menu.id, &menu).await?;
    Ok(())
}

/// Give a building Monday/Tuesday structures entitling it to `meal_plan_id`.
pub async fn assign_structures(
    store: &MemoryDocumentStore,
    company_id: Uuid,
    building_id: Uuid,
    meal_plan_id: Uuid,
) -> anyhow::Result<()> {
    let days = [WeekdayName::Monday, WeekdayName::Tuesday];
    StructureService::upsert_service(store, company_id, building_id, &service_week(&days), Utc::now())
        .await?;
    StructureService::upsert_meal_plan(
        store,
        company_id,
        building_id,
        &meal_plan_week(&days, meal_plan_id),
        Utc::now(),
    )
    .await?;
    Ok(())
}

/// Write an active service structure listing S1 twice on Monday, bypassing
/// the upsert validation the way an old or hand-edited document would.
pub async fn store_malformed_service_structure(
    store: &MemoryDocumentStore,
    company_id: Uuid,
    building_id: Uuid,
) -> anyhow::Result<Uuid> {
    let mut week = service_week(&[WeekdayName::Monday]);
    let mut services = week.for_day(WeekdayName::Monday).unwrap_or_default().to_vec();
    services.extend(services.clone());
    week.set_day(WeekdayName::Monday, services);

    let structure = ServiceStructure {
        id: Uuid::new_v4(),
        company_id,
        building_id,
        week_structure: week,
        status: RecordStatus::Active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db::insert(store, Collection::ServiceStructures, structure.id, &structure).await?;
    Ok(structure.id)
}
