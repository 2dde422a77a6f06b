//! Per-child education cost lookup.

use serde::Serialize;

use super::policy::{EducationCostTable, SchoolCost, TierCosts};
use super::types::{EducationPlan, SchoolTier, SchoolType, UniversityType};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EducationItem {
    Tuition,
    Extracurricular,
    EntranceFee,
    LivingAway,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationCost {
    pub tier: Option<SchoolTier>,
    pub total: f64,
    pub items: Vec<(EducationItem, f64)>,
}

/// Annual cost, in today's money, of a child aged `child_age` under `plan`.
pub fn education_cost(
    child_age: u32,
    plan: &EducationPlan,
    table: &EducationCostTable,
) -> EducationCost {
    let Some(tier) = SchoolTier::for_age(child_age) else {
        return EducationCost::default();
    };
    let Some(cost) = school_cost(tier, plan, table) else {
        return EducationCost {
            tier: Some(tier),
            ..EducationCost::default()
        };
    };

    let mut items = vec![
        (EducationItem::Tuition, cost.tuition),
        (EducationItem::Extracurricular, cost.extracurricular),
    ];
    if child_age == tier.entry_age() && cost.entrance_fee > 0.0 {
        items.push((EducationItem::EntranceFee, cost.entrance_fee));
    }
    if tier == SchoolTier::University && plan.lives_away {
        items.push((EducationItem::LivingAway, table.living_away_annual));
    }
    items.retain(|(_, amount)| *amount > 0.0);

    EducationCost {
        tier: Some(tier),
        total: items.iter().map(|(_, amount)| amount).sum(),
        items,
    }
}

fn school_cost(
    tier: SchoolTier,
    plan: &EducationPlan,
    table: &EducationCostTable,
) -> Option<SchoolCost> {
    let by_type = |school: SchoolType, costs: &TierCosts| match school {
        SchoolType::None => None,
        SchoolType::Public => Some(costs.public),
        SchoolType::Private => Some(costs.private),
    };
    match tier {
        SchoolTier::Preschool => by_type(plan.preschool, &table.preschool),
        SchoolTier::Elementary => by_type(plan.elementary, &table.elementary),
        SchoolTier::JuniorHigh => by_type(plan.junior_high, &table.junior_high),
        SchoolTier::HighSchool => by_type(plan.high_school, &table.high_school),
        SchoolTier::University => match plan.university {
            UniversityType::None => None,
            UniversityType::National => Some(table.national_university),
            UniversityType::PrivateArts => Some(table.private_arts_university),
            UniversityType::PrivateScience => Some(table.private_science_university),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn no_cost_outside_school_ages() {
        let table = EducationCostTable::default();
        let plan = EducationPlan::default();
        for age in [0, 1, 2, 22, 30] {
            let cost = education_cost(age, &plan, &table);
            assert_eq!(cost.tier, None);
            assert_approx(cost.total, 0.0);
            assert!(cost.items.is_empty());
        }
    }

    #[test]
    fn public_elementary_is_tuition_plus_extracurricular() {
        let table = EducationCostTable::default();
        let cost = education_cost(8, &EducationPlan::default(), &table);
        assert_eq!(cost.tier, Some(SchoolTier::Elementary));
        assert_approx(cost.total, 35.2);
        assert_eq!(cost.items.len(), 2);
    }

    #[test]
    fn entrance_fee_is_charged_in_the_first_year_only() {
        let table = EducationCostTable::default();
        let plan = EducationPlan::default();
        let first = education_cost(18, &plan, &table);
        let second = education_cost(19, &plan, &table);
        assert_approx(first.total - second.total, table.national_university.entrance_fee);
        assert!(
            first
                .items
                .iter()
                .any(|(item, _)| *item == EducationItem::EntranceFee)
        );
    }

    #[test]
    fn living_away_adds_an_allowance_at_university() {
        let table = EducationCostTable::default();
        let home = EducationPlan {
            university: UniversityType::PrivateScience,
            ..EducationPlan::default()
        };
        let away = EducationPlan {
            lives_away: true,
            ..home
        };
        let diff =
            education_cost(20, &away, &table).total - education_cost(20, &home, &table).total;
        assert_approx(diff, table.living_away_annual);
        // The allowance does not leak into high school.
        assert_approx(
            education_cost(16, &away, &table).total,
            education_cost(16, &home, &table).total,
        );
    }

    #[test]
    fn skipping_a_tier_costs_nothing_but_keeps_the_tier() {
        let table = EducationCostTable::default();
        let plan = EducationPlan {
            university: UniversityType::None,
            ..EducationPlan::default()
        };
        let cost = education_cost(19, &plan, &table);
        assert_eq!(cost.tier, Some(SchoolTier::University));
        assert_approx(cost.total, 0.0);
    }

    #[test]
    fn private_school_costs_more_at_every_tier() {
        let table = EducationCostTable::default();
        let public = EducationPlan::default();
        let private = EducationPlan {
            preschool: SchoolType::Private,
            elementary: SchoolType::Private,
            junior_high: SchoolType::Private,
            high_school: SchoolType::Private,
            university: UniversityType::PrivateArts,
            lives_away: false,
        };
        for tier in SchoolTier::ALL {
            let age = tier.entry_age() + 1;
            assert!(
                education_cost(age, &private, &table).total
                    > education_cost(age, &public, &table).total,
                "{tier:?}"
            );
        }
    }
}
