use chrono::{DateTime, Utc};
use serde_json::Map;
use uuid::Uuid;

use crate::{
    db::{self, Collection, DocumentStore, Filter, WriteBatch},
    error::MenuError,
    models::{
        combined_menu::EditCellRequest,
        company_menu::{GeneratedCompanyMenu, MenuUpdation},
    },
    services::combined_menus::{apply_edit, ensure_active_items, ensure_in_range},
};

pub struct CompanyMenuService;

impl CompanyMenuService {
    /// Every menu generated from one combined menu, across all runs.
    pub async fn list_for_combined_menu<S: DocumentStore>(
        store: &S,
        combined_menu_id: Uuid,
    ) -> Result<Vec<GeneratedCompanyMenu>, MenuError> {
        let filter = Filter::new().eq("combinedMenuId", combined_menu_id.to_string());
        let mut menus: Vec<GeneratedCompanyMenu> =
            db::fetch_where(store, Collection::CompanyMenus, &filter).await?;
        menus.sort_by(|a, b| {
            a.company_name
                .cmp(&b.company_name)
                .then_with(|| a.building_name.cmp(&b.building_name))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(menus)
    }

    pub async fn get<S: DocumentStore>(
        store: &S,
        id: Uuid,
    ) -> Result<GeneratedCompanyMenu, MenuError> {
        db::fetch_one(store, Collection::CompanyMenus, id)
            .await?
            .ok_or(MenuError::NotFound {
                kind: "Company menu",
                id,
            })
    }

    /// Edit one cell of a generated menu. The new cell contents and the
    /// matching updation log entry are committed together.
    pub async fn edit_cell<S: DocumentStore>(
        store: &S,
        id: Uuid,
        req: &EditCellRequest,
        now: DateTime<Utc>,
    ) -> Result<(GeneratedCompanyMenu, MenuUpdation), MenuError> {
        let mut menu = Self::get(store, id).await?;
        ensure_in_range(req.date, menu.start_date, menu.end_date)?;
        ensure_active_items(store, &req.edit).await?;

        let previous = menu
            .company_menu_data
            .get_cell(req.date, req.service_id, req.meal_plan_id, req.sub_meal_plan_id)
            .clone();
        apply_edit(&mut menu.company_menu_data, req);
        let current = menu
            .company_menu_data
            .get_cell(req.date, req.service_id, req.meal_plan_id, req.sub_meal_plan_id)
            .clone();

        let updation = MenuUpdation {
            id: Uuid::new_v4(),
            company_menu_id: menu.id,
            combined_menu_id: menu.combined_menu_id,
            company_id: menu.company_id,
            building_id: menu.building_id,
            date: req.date,
            service_id: req.service_id,
            meal_plan_id: req.meal_plan_id,
            sub_meal_plan_id: req.sub_meal_plan_id,
            previous_menu_item_ids: previous,
            menu_item_ids: current,
            updated_at: now,
        };

        let mut fields = Map::new();
        fields.insert(
            "companyMenuData".to_string(),
            serde_json::to_value(&menu.company_menu_data).map_err(db::StoreError::from)?,
        );

        let mut batch = WriteBatch::new();
        batch.update(Collection::CompanyMenus, menu.id, fields);
        batch.create(Collection::MenuUpdations, updation.id, &updation)?;
        store.commit(batch).await?;

        tracing::info!(
            "Company menu {} ({}): cell on {} edited, {} -> {} item(s)",
            menu.id,
            menu.building_name,
            req.date,
            updation.previous_menu_item_ids.len(),
            updation.menu_item_ids.len()
        );
        Ok((menu, updation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::models::{
        catalog::MenuItem, combined_menu::CellEdit, grid::MenuGrid, RecordStatus,
    };
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    const S1: Uuid = Uuid::from_u128(0x51);
    const M1: Uuid = Uuid::from_u128(0x41);
    const SM1: Uuid = Uuid::from_u128(0x541);
    const I1: Uuid = Uuid::from_u128(0x11);
    const I2: Uuid = Uuid::from_u128(0x12);

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    async fn seed(store: &MemoryDocumentStore) -> GeneratedCompanyMenu {
        for id in [I1, I2] {
            let item = MenuItem {
                id,
                name: "Dish".into(),
                category: Some("Mains".into()),
                display_order: Some(1),
                status: RecordStatus::Active,
            };
            db::insert(store, Collection::MenuItems, id, &item).await.unwrap();
        }

        let mut data = MenuGrid::default();
        data.set_cell(monday(), S1, M1, SM1, [I1]);
        let menu = GeneratedCompanyMenu {
            id: Uuid::from_u128(0x900),
            company_id: Uuid::from_u128(1),
            building_id: Uuid::from_u128(10),
            company_name: "Acme".into(),
            building_name: "Tower".into(),
            start_date: monday(),
            end_date: monday(),
            company_menu_data: data,
            combined_menu_id: Uuid::from_u128(0xc0),
            status: RecordStatus::Active,
            created_at: Utc::now(),
        };
        db::insert(store, Collection::CompanyMenus, menu.id, &menu).await.unwrap();
        menu
    }

    #[tokio::test]
    async fn edit_logs_previous_and_new_items() {
        let store = MemoryDocumentStore::new();
        let menu = seed(&store).await;

        let req = EditCellRequest {
            date: monday(),
            service_id: S1,
            meal_plan_id: M1,
            sub_meal_plan_id: SM1,
            edit: CellEdit::Set {
                menu_item_ids: vec![I2],
            },
        };
        let (updated, updation) = CompanyMenuService::edit_cell(&store, menu.id, &req, Utc::now())
            .await
            .unwrap();

        assert_eq!(updation.previous_menu_item_ids, BTreeSet::from([I1]));
        assert_eq!(updation.menu_item_ids, BTreeSet::from([I2]));
        assert_eq!(updation.combined_menu_id, menu.combined_menu_id);
        assert_eq!(store.count(Collection::MenuUpdations).await, 1);

        let stored = CompanyMenuService::get(&store, menu.id).await.unwrap();
        assert_eq!(stored.company_menu_data, updated.company_menu_data);
        assert_eq!(
            stored.company_menu_data.get_cell(monday(), S1, M1, SM1),
            &BTreeSet::from([I2])
        );
    }

    #[tokio::test]
    async fn rejected_log_write_leaves_menu_untouched() {
        let store = MemoryDocumentStore::new();
        let menu = seed(&store).await;
        store
            .reject_writes(Collection::MenuUpdations, Filter::new())
            .await;

        let req = EditCellRequest {
            date: monday(),
            service_id: S1,
            meal_plan_id: M1,
            sub_meal_plan_id: SM1,
            edit: CellEdit::Remove { menu_item_id: I1 },
        };
        let err = CompanyMenuService::edit_cell(&store, menu.id, &req, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::PersistenceFailure(_)));

        let stored = CompanyMenuService::get(&store, menu.id).await.unwrap();
        assert!(stored.company_menu_data.get_cell(monday(), S1, M1, SM1).contains(&I1));
    }

    #[tokio::test]
    async fn lists_by_combined_menu() {
        let store = MemoryDocumentStore::new();
        let menu = seed(&store).await;

        let listed = CompanyMenuService::list_for_combined_menu(&store, menu.combined_menu_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(CompanyMenuService::list_for_combined_menu(&store, Uuid::nil())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn dates_outside_the_menu_name_the_real_range() {
        let store = MemoryDocumentStore::new();
        let menu = seed(&store).await;
        let tuesday = monday().succ_opt().unwrap();

        let req = EditCellRequest {
            date: tuesday,
            service_id: S1,
            meal_plan_id: M1,
            sub_meal_plan_id: SM1,
            edit: CellEdit::Remove { menu_item_id: I1 },
        };
        let err = CompanyMenuService::edit_cell(&store, menu.id, &req, Utc::now())
            .await
            .unwrap_err();
        match err {
            MenuError::DateOutsideMenu { date, start, end } => {
                assert_eq!(date, tuesday);
                assert_eq!((start, end), (monday(), monday()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.count(Collection::MenuUpdations).await, 0);
    }
}
