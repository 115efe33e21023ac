//! Sparse four-level menu grid: date → service → meal plan → sub-meal-plan → items.
//!
//! A missing key at any level reads exactly like an empty cell. Writers create
//! intermediate levels on demand and never prune them.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static NO_ITEMS: BTreeSet<Uuid> = BTreeSet::new();

/// Selected menu items for one sub-meal-plan slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCell {
    #[serde(default)]
    pub menu_item_ids: BTreeSet<Uuid>,
}

impl MenuCell {
    pub fn new(items: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            menu_item_ids: items.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.menu_item_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealPlanMenu {
    sub_meal_plans: BTreeMap<Uuid, MenuCell>,
}

impl MealPlanMenu {
    pub fn cell(&self, sub_meal_plan_id: Uuid) -> Option<&MenuCell> {
        self.sub_meal_plans.get(&sub_meal_plan_id)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Uuid, &MenuCell)> {
        self.sub_meal_plans.iter()
    }

    pub fn insert(&mut self, sub_meal_plan_id: Uuid, cell: MenuCell) {
        self.sub_meal_plans.insert(sub_meal_plan_id, cell);
    }

    pub fn is_empty(&self) -> bool {
        self.sub_meal_plans.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceMenu {
    meal_plans: BTreeMap<Uuid, MealPlanMenu>,
}

impl ServiceMenu {
    pub fn meal_plan(&self, meal_plan_id: Uuid) -> Option<&MealPlanMenu> {
        self.meal_plans.get(&meal_plan_id)
    }

    pub fn meal_plans(&self) -> impl Iterator<Item = (&Uuid, &MealPlanMenu)> {
        self.meal_plans.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayMenu {
    services: BTreeMap<Uuid, ServiceMenu>,
}

impl DayMenu {
    pub fn service(&self, service_id: Uuid) -> Option<&ServiceMenu> {
        self.services.get(&service_id)
    }

    pub fn services(&self) -> impl Iterator<Item = (&Uuid, &ServiceMenu)> {
        self.services.iter()
    }
}

/// The grid itself. Used both for the master combined menu and for each
/// projected company menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuGrid {
    days: BTreeMap<NaiveDate, DayMenu>,
}

pub type CombinedMenuGrid = MenuGrid;
pub type CompanyMenuData = MenuGrid;

impl MenuGrid {
    pub fn day(&self, date: NaiveDate) -> Option<&DayMenu> {
        self.days.get(&date)
    }

    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &DayMenu)> {
        self.days.iter()
    }

    pub fn meal_plan(
        &self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
    ) -> Option<&MealPlanMenu> {
        self.day(date)?.service(service_id)?.meal_plan(meal_plan_id)
    }

    pub fn cell(
        &self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
        sub_meal_plan_id: Uuid,
    ) -> Option<&MenuCell> {
        self.meal_plan(date, service_id, meal_plan_id)?
            .cell(sub_meal_plan_id)
    }

    /// Items selected for one slot, empty when any level of the path is absent.
    pub fn get_cell(
        &self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
        sub_meal_plan_id: Uuid,
    ) -> &BTreeSet<Uuid> {
        self.cell(date, service_id, meal_plan_id, sub_meal_plan_id)
            .map(|cell| &cell.menu_item_ids)
            .unwrap_or(&NO_ITEMS)
    }

    /// Meal-plan node for a path, created (empty) if missing.
    pub fn meal_plan_mut(
        &mut self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
    ) -> &mut MealPlanMenu {
        self.days
            .entry(date)
            .or_default()
            .services
            .entry(service_id)
            .or_default()
            .meal_plans
            .entry(meal_plan_id)
            .or_default()
    }

    fn cell_mut(
        &mut self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
        sub_meal_plan_id: Uuid,
    ) -> &mut MenuCell {
        self.meal_plan_mut(date, service_id, meal_plan_id)
            .sub_meal_plans
            .entry(sub_meal_plan_id)
            .or_default()
    }

    /// Replace the item set of one slot.
    pub fn set_cell(
        &mut self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
        sub_meal_plan_id: Uuid,
        items: impl IntoIterator<Item = Uuid>,
    ) {
        *self.cell_mut(date, service_id, meal_plan_id, sub_meal_plan_id) = MenuCell::new(items);
    }

    /// Returns false when the item was already selected.
    pub fn add_item(
        &mut self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
        sub_meal_plan_id: Uuid,
        item_id: Uuid,
    ) -> bool {
        self.cell_mut(date, service_id, meal_plan_id, sub_meal_plan_id)
            .menu_item_ids
            .insert(item_id)
    }

    /// Returns false when the item was not selected. Never creates a path.
    pub fn remove_item(
        &mut self,
        date: NaiveDate,
        service_id: Uuid,
        meal_plan_id: Uuid,
        sub_meal_plan_id: Uuid,
        item_id: Uuid,
    ) -> bool {
        self.days
            .get_mut(&date)
            .and_then(|day| day.services.get_mut(&service_id))
            .and_then(|service| service.meal_plans.get_mut(&meal_plan_id))
            .and_then(|meal_plan| meal_plan.sub_meal_plans.get_mut(&sub_meal_plan_id))
            .map(|cell| cell.menu_item_ids.remove(&item_id))
            .unwrap_or(false)
    }

    /// Every populated cell as a flat (date, service, meal plan, sub-meal-plan, cell) row.
    pub fn cells(&self) -> impl Iterator<Item = (NaiveDate, Uuid, Uuid, Uuid, &MenuCell)> {
        self.days.iter().flat_map(|(date, day)| {
            day.services.iter().flat_map(move |(service_id, service)| {
                service.meal_plans.iter().flat_map(move |(meal_plan_id, meal_plan)| {
                    meal_plan.sub_meal_plans.iter().map(move |(sub_id, cell)| {
                        (*date, *service_id, *meal_plan_id, *sub_id, cell)
                    })
                })
            })
        })
    }

    /// Union of every selected item id.
    pub fn item_ids(&self) -> BTreeSet<Uuid> {
        self.cells()
            .flat_map(|(_, _, _, _, cell)| cell.menu_item_ids.iter().copied())
            .collect()
    }

    /// Total number of selections across all cells.
    pub fn selection_count(&self) -> usize {
        self.cells().map(|(_, _, _, _, cell)| cell.menu_item_ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.selection_count() == 0
    }
}
