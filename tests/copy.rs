mod helpers;

use chrono::Utc;
use helpers::*;
use menufan_api::{
    db::{Collection, Filter, MemoryDocumentStore},
    error::MenuError,
    models::{calendar::WeekdayName, structure::StructureSource},
    services::{
        copier::{copy_structure, StructureCopyService},
        structures::{StructureService, UpsertAction},
    },
};

async fn seeded() -> MemoryDocumentStore {
    let store = MemoryDocumentStore::new();
    seed(&store).await.unwrap();
    assign_structures(&store, COMPANY, B1, M1).await.unwrap();
    store
}

#[tokio::test]
async fn updates_existing_targets_in_place_and_creates_missing_ones() {
    let store = seeded().await;
    // B2 starts with different structures.
    assign_structures(&store, COMPANY, B2, M2).await.unwrap();
    let before = StructureService::find_active_pair(&store, COMPANY, B2).await.unwrap();

    let report = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2, B3], Utc::now())
        .await
        .unwrap();
    assert_eq!(report.buildings.len(), 2);

    let b2 = report.buildings.iter().find(|b| b.building_id == B2).unwrap();
    assert_eq!(b2.service_action, UpsertAction::Updated);
    assert_eq!(b2.meal_plan_action, UpsertAction::Updated);
    assert_eq!(b2.service_structure_id, before.service_structure.unwrap().id);
    assert_eq!(b2.meal_plan_structure_id, before.meal_plan_structure.unwrap().id);

    let b3 = report.buildings.iter().find(|b| b.building_id == B3).unwrap();
    assert_eq!(b3.service_action, UpsertAction::Created);
    assert_eq!(b3.meal_plan_action, UpsertAction::Created);

    let source = StructureService::load_source(&store, COMPANY, B1).await.unwrap();
    for target in [B2, B3] {
        let copied = StructureService::load_source(&store, COMPANY, target).await.unwrap();
        assert_eq!(copied.service_structure, source.service_structure);
        assert_eq!(copied.meal_plan_structure, source.meal_plan_structure);
    }
}

#[tokio::test]
async fn repeated_copies_never_duplicate() {
    let store = seeded().await;

    let first = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2], Utc::now())
        .await
        .unwrap();
    let counts = (
        store.count(Collection::ServiceStructures).await,
        store.count(Collection::MealPlanStructures).await,
    );
    let second = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2], Utc::now())
        .await
        .unwrap();

    assert_eq!(counts, (2, 2));
    assert_eq!(
        (
            store.count(Collection::ServiceStructures).await,
            store.count(Collection::MealPlanStructures).await,
        ),
        counts
    );
    assert_eq!(
        first.buildings[0].service_structure_id,
        second.buildings[0].service_structure_id
    );
    assert_eq!(second.buildings[0].service_action, UpsertAction::Updated);
}

#[tokio::test]
async fn source_building_is_never_a_target() {
    let store = seeded().await;

    let report = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B1], Utc::now())
        .await
        .unwrap();
    assert!(report.buildings.is_empty());
    assert_eq!(store.count(Collection::ServiceStructures).await, 1);
}

#[tokio::test]
async fn foreign_targets_reject_the_whole_copy() {
    let store = seeded().await;

    let err = StructureCopyService::copy_from_building(
        &store,
        COMPANY,
        B1,
        &[B2, FOREIGN_BUILDING],
        Utc::now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        MenuError::CrossCompanyCopyRejected { building_id, .. } if building_id == FOREIGN_BUILDING
    ));
    assert!(StructureService::find_active_pair(&store, COMPANY, B2)
        .await
        .unwrap()
        .service_structure
        .is_none());
}

#[tokio::test]
async fn source_from_another_company_is_rejected() {
    let store = seeded().await;
    let source = StructureService::load_source(&store, COMPANY, B1).await.unwrap();

    let err = copy_structure(&store, &source, &[FOREIGN_BUILDING], OTHER_COMPANY, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, MenuError::CrossCompanyCopyRejected { .. }));
}

#[tokio::test]
async fn source_without_structures_cannot_be_copied() {
    let store = seeded().await;

    let err = StructureCopyService::copy_from_building(&store, COMPANY, B2, &[B3], Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, MenuError::MissingStructure { .. }));
}

#[tokio::test]
async fn failing_target_keeps_the_others_and_its_own_pair_intact() {
    let store = seeded().await;
    store
        .reject_writes(
            Collection::MealPlanStructures,
            Filter::new().eq("buildingId", B3.to_string()),
        )
        .await;

    let err = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2, B3], Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MenuError::PartialPersistenceFailure {
            failed: 1,
            attempted: 2,
            ..
        }
    ));

    let b2 = StructureService::find_active_pair(&store, COMPANY, B2).await.unwrap();
    assert!(b2.service_structure.is_some() && b2.meal_plan_structure.is_some());

    // Service and meal-plan writes of one building land together or not at all.
    let b3 = StructureService::find_active_pair(&store, COMPANY, B3).await.unwrap();
    assert!(b3.service_structure.is_none());
    assert!(b3.meal_plan_structure.is_none());
}

#[tokio::test]
async fn copied_weeks_keep_weekday_keys() {
    let store = seeded().await;
    StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2], Utc::now())
        .await
        .unwrap();

    let copied = StructureService::load_source(&store, COMPANY, B2).await.unwrap();
    assert!(copied.service_structure.for_day(WeekdayName::Monday).is_some());
    assert!(copied.service_structure.for_day(WeekdayName::Wednesday).is_none());
}

#[tokio::test]
async fn malformed_target_structure_is_overwritten() {
    let store = seeded().await;
    let broken = store_malformed_service_structure(&store, COMPANY, B2).await.unwrap();

    let report = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2, B3], Utc::now())
        .await
        .unwrap();
    assert_eq!(report.buildings.len(), 2);

    let b2 = report.buildings.iter().find(|b| b.building_id == B2).unwrap();
    assert_eq!(b2.service_structure_id, broken);
    assert_eq!(b2.service_action, UpsertAction::Updated);
    assert_eq!(b2.meal_plan_action, UpsertAction::Created);

    let source = StructureService::load_source(&store, COMPANY, B1).await.unwrap();
    let copied = StructureService::load_source(&store, COMPANY, B2).await.unwrap();
    assert_eq!(copied.service_structure, source.service_structure);
}

#[tokio::test]
async fn failures_are_counted_across_all_targets() {
    let store = seeded().await;
    store
        .reject_writes(
            Collection::ServiceStructures,
            Filter::new().eq("companyId", COMPANY.to_string()),
        )
        .await;

    let err = StructureCopyService::copy_from_building(&store, COMPANY, B1, &[B2, B3], Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MenuError::PartialPersistenceFailure {
            failed: 2,
            attempted: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn malformed_source_is_rejected_before_writing() {
    let store = MemoryDocumentStore::new();
    seed(&store).await.unwrap();
    let mut source = StructureSource {
        company_id: COMPANY,
        building_id: B1,
        service_structure: service_week(&[WeekdayName::Monday]),
        meal_plan_structure: meal_plan_week(&[WeekdayName::Monday], M1),
    };
    let mut services = source.service_structure.for_day(WeekdayName::Monday).unwrap().to_vec();
    services.push(services[0].clone());
    source.service_structure.set_day(WeekdayName::Monday, services);

    let err = copy_structure(&store, &source, &[B2], COMPANY, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, MenuError::InvalidStructure(_)));
    assert_eq!(store.count(Collection::ServiceStructures).await, 0);
}
