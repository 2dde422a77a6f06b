//! Income tax, resident tax and social insurance for one person-year.

use serde::Serialize;

use super::policy::{DeductionBand, TaxPolicy};

#[derive(Debug, Clone, Copy)]
pub struct TaxInput<'a> {
    pub salary: f64,
    pub pension: f64,
    pub age: u32,
    pub has_spouse: bool,
    pub spouse_income: f64,
    pub dependent_ages: &'a [u32],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deductions {
    pub salary: f64,
    pub pension: f64,
    /// Basic, social insurance, spouse and dependant deductions.
    pub personal: f64,
    pub total: f64,
    pub taxable_income: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub social_insurance: f64,
    pub income_tax: f64,
    pub resident_tax: f64,
    pub net_income: f64,
    pub deductions: Deductions,
}

impl TaxBreakdown {
    pub fn total_tax(&self) -> f64 {
        self.income_tax + self.resident_tax
    }

    pub fn total_burden(&self) -> f64 {
        self.total_tax() + self.social_insurance
    }
}

pub fn calculate_tax(input: &TaxInput<'_>, policy: &TaxPolicy) -> TaxBreakdown {
    let salary = input.salary.max(0.0);
    let pension = input.pension.max(0.0);
    let gross = salary + pension;
    if gross <= 0.0 {
        return TaxBreakdown::default();
    }

    let social_insurance = social_insurance(salary, pension, input.age, policy);
    let salary_deduction = salary_deduction(salary, policy);
    let pension_deduction = pension_deduction(pension, input.age, policy);
    let personal = personal_deductions(input, social_insurance, policy);

    let income = (salary - salary_deduction) + (pension - pension_deduction);
    let taxable_income = truncate_to_unit((income - personal).max(0.0), policy.truncation_unit);

    let income_tax = progressive_income_tax(taxable_income, policy);
    let resident_tax = taxable_income * policy.resident_tax_rate + policy.resident_per_capita;

    TaxBreakdown {
        social_insurance,
        income_tax,
        resident_tax,
        net_income: gross - social_insurance - income_tax - resident_tax,
        deductions: Deductions {
            salary: salary_deduction,
            pension: pension_deduction,
            personal,
            total: salary_deduction + pension_deduction + personal,
            taxable_income,
        },
    }
}

pub fn social_insurance(salary: f64, pension: f64, age: u32, policy: &TaxPolicy) -> f64 {
    let mut rate = policy.social_insurance_rate;
    if (policy.care_age_min..=policy.care_age_max).contains(&age) {
        rate += policy.care_insurance_rate;
    }
    salary.max(0.0) * rate + pension.max(0.0) * policy.pension_premium_rate
}

pub fn salary_deduction(salary: f64, policy: &TaxPolicy) -> f64 {
    band_deduction(salary, &policy.salary_deduction)
}

pub fn pension_deduction(pension: f64, age: u32, policy: &TaxPolicy) -> f64 {
    let bands = if age >= policy.senior_age {
        &policy.senior_pension_deduction
    } else {
        &policy.pension_deduction
    };
    band_deduction(pension, bands)
}

/// Income tax on an already-truncated taxable income, surtax included.
pub fn progressive_income_tax(taxable_income: f64, policy: &TaxPolicy) -> f64 {
    if taxable_income <= 0.0 {
        return 0.0;
    }
    let Some(bracket) = policy
        .income_tax_brackets
        .iter()
        .find(|b| b.up_to.is_none_or(|limit| taxable_income <= limit))
    else {
        return 0.0;
    };
    let base = (taxable_income * bracket.rate - bracket.subtraction).max(0.0);
    base * (1.0 + policy.reconstruction_surtax_rate)
}

fn personal_deductions(input: &TaxInput<'_>, social_insurance: f64, policy: &TaxPolicy) -> f64 {
    let spouse = if input.has_spouse && input.spouse_income <= policy.spouse_income_limit {
        policy.spouse_deduction
    } else {
        0.0
    };
    let dependants: f64 = input
        .dependent_ages
        .iter()
        .map(|&age| {
            policy
                .dependent_deductions
                .iter()
                .find(|band| band.contains(age))
                .map_or(0.0, |band| band.amount)
        })
        .sum();

    policy.basic_deduction + social_insurance + spouse + dependants
}

fn band_deduction(income: f64, bands: &[DeductionBand]) -> f64 {
    if income <= 0.0 {
        return 0.0;
    }
    let Some(band) = bands
        .iter()
        .find(|b| b.up_to.is_none_or(|limit| income <= limit))
    else {
        return 0.0;
    };
    (income * band.rate + band.add).clamp(0.0, income)
}

fn truncate_to_unit(value: f64, unit: f64) -> f64 {
    if unit <= 0.0 {
        return value;
    }
    // Guard against 12.3 / 0.1 landing on 122.99999.
    ((value / unit) + 1e-9).floor() * unit
}
