//! Salary projection and public pension estimation.

use super::policy::PensionPolicy;
use super::types::{GrowthCurve, PensionPlan, Reemployment};

const SENIORITY_INFLECTION_AGE: u32 = 50;
const PERFORMANCE_INFLECTION_AGE: u32 = 40;

impl GrowthCurve {
    /// Raise applied in the year a person turns `age`.
    pub fn effective_rate(self, nominal: f64, age: u32) -> f64 {
        match self {
            GrowthCurve::Flat => nominal,
            GrowthCurve::Seniority => {
                if age < SENIORITY_INFLECTION_AGE {
                    nominal
                } else {
                    nominal * 0.5
                }
            }
            GrowthCurve::Performance => {
                if age < PERFORMANCE_INFLECTION_AGE {
                    nominal * 1.5
                } else {
                    nominal * 0.1
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryProfile {
    pub base_salary: f64,
    pub current_age: u32,
    pub growth_rate: f64,
    pub curve: GrowthCurve,
    pub retirement_age: u32,
    pub reemployment: Option<Reemployment>,
    pub leave_return_age: Option<u32>,
}

pub fn project_salary(profile: &SalaryProfile, target_age: u32) -> f64 {
    if profile
        .leave_return_age
        .is_some_and(|return_age| target_age < return_age)
    {
        return 0.0;
    }

    if target_age >= profile.retirement_age {
        return match profile.reemployment {
            Some(reemployment) if target_age < reemployment.end_age => {
                reemployment.annual_salary.max(0.0)
            }
            _ => 0.0,
        };
    }

    if target_age <= profile.current_age {
        return profile.base_salary.max(0.0);
    }

    let mut salary = profile.base_salary.max(0.0);
    for age in (profile.current_age + 1)..=target_age {
        salary *= 1.0 + profile.curve.effective_rate(profile.growth_rate, age);
    }
    salary
}

/// Annual public pension for `plan`, adjusted for the claim age.
///
/// Without an explicit amount the pension is estimated from the salary
/// history: a basic part proportional to enrolled months plus an
/// earnings-related part of `accrual_rate` per month on the career-average
/// monthly salary. Years with no salary accrue nothing.
pub fn estimate_pension(
    plan: &PensionPlan,
    profile: &SalaryProfile,
    policy: &PensionPolicy,
) -> f64 {
    let base = match plan.annual_amount {
        Some(amount) => amount.max(0.0),
        None => {
            let mut months = 0_u32;
            let mut salary_sum = 0.0;
            let mut years = 0_u32;
            for age in plan.enrollment_start_age..profile.retirement_age {
                let salary = project_salary(profile, age);
                if salary > 0.0 {
                    months += 12;
                    salary_sum += salary;
                    years += 1;
                }
            }
            if years == 0 {
                return 0.0;
            }
            let average_monthly = salary_sum / years as f64 / 12.0;
            let full_months = policy.full_months.max(1);
            let basic =
                policy.basic_full_annual * months.min(full_months) as f64 / full_months as f64;
            basic + average_monthly * policy.accrual_rate * months as f64
        }
    };
    base * claim_age_factor(plan.claim_age, policy)
}

/// Early claims are reduced and deferred claims increased per month away
/// from the standard claim age.
pub fn claim_age_factor(claim_age: u32, policy: &PensionPolicy) -> f64 {
    let age = claim_age.clamp(policy.earliest_claim_age, policy.latest_claim_age);
    let months = (age as f64 - policy.standard_claim_age as f64) * 12.0;
    if months < 0.0 {
        (1.0 + months * policy.early_reduction_per_month).max(0.0)
    } else {
        1.0 + months * policy.deferral_increase_per_month
    }
}
