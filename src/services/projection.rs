//! Structure resolution: intersect a combined menu grid with one building's
//! weekly service and meal-plan structures.
//!
//! A slot survives only when its full path is present in the grid and
//! reachable in both structures for the weekday of the date being projected.
//! Structures are resolved by weekday name alone, so two dates sharing a
//! weekday always see the same structure slice. Nothing here fails: absent
//! paths simply produce no output.

use serde::Deserialize;

use crate::models::{
    calendar::DayEntry,
    grid::{CombinedMenuGrid, CompanyMenuData},
    structure::{MealPlanWeek, ServiceAssignment, ServiceWeek},
};

/// How sub-services from the meal-plan structure relate to the service structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubServiceMatching {
    /// Only the parent service has to be open in the service structure.
    #[default]
    Lenient,
    /// The sub-service must also be listed under that service.
    Strict,
}

impl std::str::FromStr for SubServiceMatching {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(SubServiceMatching::Lenient),
            "strict" => Ok(SubServiceMatching::Strict),
            other => anyhow::bail!("Unknown sub-service matching mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionOptions {
    pub sub_service_matching: SubServiceMatching,
}

/// Project with the default (lenient) sub-service matching.
pub fn project(
    grid: &CombinedMenuGrid,
    service_structure: &ServiceWeek,
    meal_plan_structure: &MealPlanWeek,
    days: &[DayEntry],
) -> CompanyMenuData {
    project_with(
        ProjectionOptions::default(),
        grid,
        service_structure,
        meal_plan_structure,
        days,
    )
}

pub fn project_with(
    options: ProjectionOptions,
    grid: &CombinedMenuGrid,
    service_structure: &ServiceWeek,
    meal_plan_structure: &MealPlanWeek,
    days: &[DayEntry],
) -> CompanyMenuData {
    let mut output = CompanyMenuData::default();

    for day in days {
        let Some(services) = service_structure.for_day(day.weekday) else {
            continue;
        };
        let Some(entitlements) = meal_plan_structure.for_day(day.weekday) else {
            continue;
        };
        if grid.day(day.date).is_none() {
            continue;
        }

        for service in services {
            // Services open for the day but without any meal-plan entitlement are dropped.
            let matching = entitlements
                .iter()
                .filter(|e| e.service_id == service.service_id);

            for entitlement in matching {
                for sub_service in &entitlement.sub_services {
                    if !sub_service_open(options, service, sub_service.sub_service_id) {
                        continue;
                    }
                    for meal_plan in &sub_service.meal_plans {
                        let Some(source) =
                            grid.meal_plan(day.date, service.service_id, meal_plan.meal_plan_id)
                        else {
                            continue;
                        };

                        let bucket = output.meal_plan_mut(
                            day.date,
                            service.service_id,
                            meal_plan.meal_plan_id,
                        );
                        for sub_meal_plan in &meal_plan.sub_meal_plans {
                            if let Some(cell) = source.cell(sub_meal_plan.sub_meal_plan_id) {
                                bucket.insert(sub_meal_plan.sub_meal_plan_id, cell.clone());
                            }
                        }
                    }
                }
            }
        }
    }

    output
}

fn sub_service_open(
    options: ProjectionOptions,
    service: &ServiceAssignment,
    sub_service_id: uuid::Uuid,
) -> bool {
    match options.sub_service_matching {
        SubServiceMatching::Lenient => true,
        SubServiceMatching::Strict => service.offers_sub_service(sub_service_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        calendar::WeekdayName,
        grid::MenuGrid,
        structure::{
            MealPlanEntry, ServiceMealPlanAssignment, SubMealPlanRef, SubServiceMealPlans,
            SubServiceRef,
        },
    };
    use crate::services::calendar::expand_range;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    const S1: Uuid = Uuid::from_u128(0x51);
    const S2: Uuid = Uuid::from_u128(0x52);
    const SS1: Uuid = Uuid::from_u128(0x551);
    const SS2: Uuid = Uuid::from_u128(0x552);
    const M1: Uuid = Uuid::from_u128(0x41);
    const M2: Uuid = Uuid::from_u128(0x42);
    const SM1: Uuid = Uuid::from_u128(0x541);
    const SM2: Uuid = Uuid::from_u128(0x542);
    const I1: Uuid = Uuid::from_u128(0x11);
    const I2: Uuid = Uuid::from_u128(0x12);
    const I3: Uuid = Uuid::from_u128(0x13);

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn service_week(days: &[WeekdayName]) -> ServiceWeek {
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

    /// One meal-plan entry per (meal plan, sub-meal-plan) pair.
    fn entitlement(service_id: Uuid, sub_service_id: Uuid, plans: &[(Uuid, Uuid)]) -> ServiceMealPlanAssignment {
        ServiceMealPlanAssignment {
            service_id,
            sub_services: vec![SubServiceMealPlans {
                sub_service_id,
                meal_plans: plans
                    .iter()
                    .map(|(meal_plan_id, sub_meal_plan_id)| MealPlanEntry {
                        meal_plan_id: *meal_plan_id,
                        sub_meal_plans: vec![SubMealPlanRef {
                            sub_meal_plan_id: *sub_meal_plan_id,
                        }],
                    })
                    .collect(),
            }],
        }
    }

    fn meal_plan_week(days: &[WeekdayName], plans: &[(Uuid, Uuid)]) -> MealPlanWeek {
        days.iter()
            .map(|day| (*day, vec![entitlement(S1, SS1, plans)]))
            .collect()
    }

    fn items(grid: &MenuGrid, d: NaiveDate, s: Uuid, m: Uuid, sm: Uuid) -> BTreeSet<Uuid> {
        grid.get_cell(d, s, m, sm).clone()
    }

    #[test]
    fn copies_fully_matched_cell() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1, I2]);

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plan_week(&[WeekdayName::Monday], &[(M1, SM1)]),
            &expand_range(date(2), date(2)).unwrap(),
        );

        assert_eq!(items(&out, date(2), S1, M1, SM1), BTreeSet::from([I1, I2]));
        assert_eq!(out.selection_count(), 2);
    }

    #[test]
    fn meal_plan_missing_from_entitlements_drops_service() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1, I2]);

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plan_week(&[WeekdayName::Monday], &[(M2, SM1)]),
            &expand_range(date(2), date(2)).unwrap(),
        );

        assert!(out.day(date(2)).map_or(true, |day| day.service(S1).is_none()));
    }

    #[test]
    fn service_absent_from_meal_plan_structure_is_dropped() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1]);

        let meal_plans: MealPlanWeek = [(
            WeekdayName::Monday,
            vec![entitlement(S2, SS1, &[(M1, SM1)])],
        )]
        .into_iter()
        .collect();

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plans,
            &expand_range(date(2), date(2)).unwrap(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn service_closed_that_weekday_yields_nothing() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(3), S1, M1, SM1, [I1]);

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plan_week(&[WeekdayName::Monday, WeekdayName::Tuesday], &[(M1, SM1)]),
            &expand_range(date(3), date(3)).unwrap(),
        );
        assert!(out.day(date(3)).is_none());
    }

    #[test]
    fn unlisted_sub_meal_plan_is_excluded() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1]);
        grid.set_cell(date(2), S1, M1, SM2, [I3]);

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plan_week(&[WeekdayName::Monday], &[(M1, SM1)]),
            &expand_range(date(2), date(2)).unwrap(),
        );

        assert_eq!(items(&out, date(2), S1, M1, SM1), BTreeSet::from([I1]));
        assert!(out.cell(date(2), S1, M1, SM2).is_none());
    }

    #[test]
    fn same_weekday_resolves_identically() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1]);
        grid.set_cell(date(9), S1, M1, SM1, [I2]);

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plan_week(&[WeekdayName::Monday], &[(M1, SM1)]),
            &expand_range(date(2), date(9)).unwrap(),
        );

        let shape = |d: NaiveDate| -> Vec<(Uuid, Uuid, Uuid)> {
            out.cells()
                .filter(|(cd, ..)| *cd == d)
                .map(|(_, s, m, sm, _)| (s, m, sm))
                .collect()
        };
        assert_eq!(shape(date(2)), shape(date(9)));
        assert_eq!(items(&out, date(9), S1, M1, SM1), BTreeSet::from([I2]));
    }

    #[test]
    fn lenient_mode_ignores_service_structure_sub_services() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1]);

        let meal_plans: MealPlanWeek = [(
            WeekdayName::Monday,
            vec![entitlement(S1, SS2, &[(M1, SM1)])],
        )]
        .into_iter()
        .collect();
        let days = expand_range(date(2), date(2)).unwrap();
        let services = service_week(&[WeekdayName::Monday]);

        let lenient = project(&grid, &services, &meal_plans, &days);
        assert_eq!(items(&lenient, date(2), S1, M1, SM1), BTreeSet::from([I1]));

        let strict = project_with(
            ProjectionOptions {
                sub_service_matching: SubServiceMatching::Strict,
            },
            &grid,
            &services,
            &meal_plans,
            &days,
        );
        assert!(strict.is_empty());
    }

    #[test]
    fn projected_cells_are_independent_copies() {
        let mut grid = MenuGrid::default();
        grid.set_cell(date(2), S1, M1, SM1, [I1]);

        let out = project(
            &grid,
            &service_week(&[WeekdayName::Monday]),
            &meal_plan_week(&[WeekdayName::Monday], &[(M1, SM1)]),
            &expand_range(date(2), date(2)).unwrap(),
        );
        grid.add_item(date(2), S1, M1, SM1, I2);

        assert_eq!(items(&out, date(2), S1, M1, SM1), BTreeSet::from([I1]));
    }

    #[test]
    fn parses_matching_mode() {
        assert_eq!("STRICT".parse::<SubServiceMatching>().unwrap(), SubServiceMatching::Strict);
        assert_eq!("lenient".parse::<SubServiceMatching>().unwrap(), SubServiceMatching::Lenient);
        assert!("loose".parse::<SubServiceMatching>().is_err());
    }
}
