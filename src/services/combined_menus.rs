use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map};
use uuid::Uuid;

use crate::{
    db::{self, Collection, DocumentStore, Filter, WriteBatch},
    error::MenuError,
    models::{
        catalog::MenuItem,
        combined_menu::{CellEdit, CombinedMenu, EditCellRequest},
        company::Building,
        grid::{CompanyMenuData, MenuGrid},
    },
    services::{
        calendar::expand_range,
        projection::{project_with, ProjectionOptions},
        structures::StructureService,
    },
};

/// Apply one edit to a grid. Returns the item set of the cell afterwards.
pub fn apply_edit(grid: &mut MenuGrid, req: &EditCellRequest) -> Vec<Uuid> {
    let (date, s, m, sm) = (req.date, req.service_id, req.meal_plan_id, req.sub_meal_plan_id);
    match &req.edit {
        CellEdit::Set { menu_item_ids } => {
            grid.set_cell(date, s, m, sm, menu_item_ids.iter().copied());
        }
        CellEdit::Add { menu_item_id } => {
            grid.add_item(date, s, m, sm, *menu_item_id);
        }
        CellEdit::Remove { menu_item_id } => {
            grid.remove_item(date, s, m, sm, *menu_item_id);
        }
    }
    grid.get_cell(date, s, m, sm).iter().copied().collect()
}

/// Items an edit would introduce into a cell.
fn introduced_items(edit: &CellEdit) -> Vec<Uuid> {
    match edit {
        CellEdit::Set { menu_item_ids } => menu_item_ids.clone(),
        CellEdit::Add { menu_item_id } => vec![*menu_item_id],
        CellEdit::Remove { .. } => Vec::new(),
    }
}

/// Reject edits referencing items that are not active in the catalog.
pub(crate) async fn ensure_active_items<S: DocumentStore>(
    store: &S,
    edit: &CellEdit,
) -> Result<(), MenuError> {
    let wanted = introduced_items(edit);
    if wanted.is_empty() {
        return Ok(());
    }

    let catalog: Vec<MenuItem> = db::fetch_all(store, Collection::MenuItems).await?;
    let active: HashSet<Uuid> = catalog
        .iter()
        .filter(|item| item.status.is_active())
        .map(|item| item.id)
        .collect();

    match wanted.into_iter().find(|id| !active.contains(id)) {
        Some(id) => Err(MenuError::IneligibleMenuItem(id)),
        None => Ok(()),
    }
}

/// Edits may only touch days the menu covers.
pub(crate) fn ensure_in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> Result<(), MenuError> {
    if date < start || date > end {
        return Err(MenuError::DateOutsideMenu { date, start, end });
    }
    Ok(())
}

pub struct CombinedMenuService;

impl CombinedMenuService {
    pub async fn get<S: DocumentStore>(store: &S, id: Uuid) -> Result<CombinedMenu, MenuError> {
        db::fetch_one(store, Collection::CombinedMenus, id)
            .await?
            .ok_or(MenuError::NotFound {
                kind: "Combined menu",
                id,
            })
    }

    pub async fn edit_cell<S: DocumentStore>(
        store: &S,
        id: Uuid,
        req: &EditCellRequest,
        now: DateTime<Utc>,
    ) -> Result<CombinedMenu, MenuError> {
        let mut menu = Self::get(store, id).await?;
        ensure_in_range(req.date, menu.start_date, menu.end_date)?;
        ensure_active_items(store, &req.edit).await?;

        let items = apply_edit(&mut menu.menu_data, req);
        menu.updated_at = now;

        let mut fields = Map::new();
        fields.insert(
            "menuData".to_string(),
            serde_json::to_value(&menu.menu_data).map_err(db::StoreError::from)?,
        );
        fields.insert("updatedAt".to_string(), json!(now));
        store
            .update_fields(Collection::CombinedMenus, id, fields)
            .await?;

        tracing::debug!(
            "Combined menu {id}: cell {} {} now holds {} item(s)",
            req.date,
            req.sub_meal_plan_id,
            items.len()
        );
        Ok(menu)
    }

    /// Delete a combined menu and every menu generated from it, atomically.
    /// Returns the number of generated menus removed.
    pub async fn delete_cascade<S: DocumentStore>(
        store: &S,
        id: Uuid,
    ) -> Result<usize, MenuError> {
        let menu = Self::get(store, id).await?;
        let generated = store
            .find(
                Collection::CompanyMenus,
                &Filter::new().eq("combinedMenuId", id.to_string()),
            )
            .await?;

        let mut batch = WriteBatch::new();
        let mut removed = 0;
        for doc in &generated {
            let Some(menu_id) = doc
                .get("id")
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            else {
                continue;
            };
            batch.delete(Collection::CompanyMenus, menu_id);
            removed += 1;
        }
        batch.delete(Collection::CombinedMenus, id);
        store.commit(batch).await?;

        tracing::info!(
            "Deleted combined menu '{}' and {removed} generated menu(s)",
            menu.name
        );
        Ok(removed)
    }

    /// Project a combined menu onto one building without persisting anything.
    pub async fn preview<S: DocumentStore>(
        store: &S,
        id: Uuid,
        building_id: Uuid,
        options: ProjectionOptions,
    ) -> Result<CompanyMenuData, MenuError> {
        let menu = Self::get(store, id).await?;
        let building: Building = db::fetch_one(store, Collection::Buildings, building_id)
            .await?
            .ok_or(MenuError::NotFound {
                kind: "Building",
                id: building_id,
            })?;

        let source = StructureService::load_source(store, building.company_id, building.id).await?;
        let days = expand_range(menu.start_date, menu.end_date)?;

        Ok(project_with(
            options,
            &menu.menu_data,
            &source.service_structure,
            &source.meal_plan_structure,
            &days,
        ))
    }
}
