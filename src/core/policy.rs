//! Static policy tables consumed by the calculators.
//!
//! Every rate, band and cost table lives here and is passed to the engine as
//! an explicit argument, so an alternate tax year (or a test regime) is just
//! another `PolicyTables` value. Amounts are in 万円.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyTables {
    pub tax: TaxPolicy,
    pub pension: PensionPolicy,
    pub education: EducationCostTable,
}

/// One band of a piecewise-linear deduction: `income * rate + add` for
/// incomes up to `up_to` (the last band has no upper bound).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionBand {
    pub up_to: Option<f64>,
    pub rate: f64,
    pub add: f64,
}

impl DeductionBand {
    const fn new(up_to: Option<f64>, rate: f64, add: f64) -> Self {
        Self { up_to, rate, add }
    }
}

/// Progressive bracket: `taxable * rate - subtraction` for taxable income up
/// to `up_to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub up_to: Option<f64>,
    pub rate: f64,
    pub subtraction: f64,
}

impl TaxBracket {
    const fn new(up_to: Option<f64>, rate: f64, subtraction: f64) -> Self {
        Self {
            up_to,
            rate,
            subtraction,
        }
    }
}

/// Deduction for a dependant whose age falls in `min_age..=max_age`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentBand {
    pub min_age: u32,
    pub max_age: Option<u32>,
    pub amount: f64,
}

impl DependentBand {
    const fn new(min_age: u32, max_age: Option<u32>, amount: f64) -> Self {
        Self {
            min_age,
            max_age,
            amount,
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min_age && self.max_age.is_none_or(|max| age <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxPolicy {
    pub social_insurance_rate: f64,
    pub care_insurance_rate: f64,
    pub care_age_min: u32,
    pub care_age_max: u32,
    pub pension_premium_rate: f64,
    pub salary_deduction: Vec<DeductionBand>,
    pub pension_deduction: Vec<DeductionBand>,
    pub senior_pension_deduction: Vec<DeductionBand>,
    pub senior_age: u32,
    pub basic_deduction: f64,
    pub spouse_deduction: f64,
    pub spouse_income_limit: f64,
    pub dependent_deductions: Vec<DependentBand>,
    pub income_tax_brackets: Vec<TaxBracket>,
    pub reconstruction_surtax_rate: f64,
    pub resident_tax_rate: f64,
    pub resident_per_capita: f64,
    /// Taxable income is truncated to a multiple of this (1,000 yen).
    pub truncation_unit: f64,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self {
            social_insurance_rate: 0.15,
            care_insurance_rate: 0.009,
            care_age_min: 40,
            care_age_max: 64,
            pension_premium_rate: 0.08,
            salary_deduction: vec![
                DeductionBand::new(Some(162.5), 0.0, 55.0),
                DeductionBand::new(Some(180.0), 0.4, -10.0),
                DeductionBand::new(Some(360.0), 0.3, 8.0),
                DeductionBand::new(Some(660.0), 0.2, 44.0),
                DeductionBand::new(Some(850.0), 0.1, 110.0),
                DeductionBand::new(None, 0.0, 195.0),
            ],
            pension_deduction: vec![
                DeductionBand::new(Some(130.0), 0.0, 60.0),
                DeductionBand::new(Some(410.0), 0.25, 27.5),
                DeductionBand::new(Some(770.0), 0.15, 68.5),
                DeductionBand::new(Some(1000.0), 0.05, 145.5),
                DeductionBand::new(None, 0.0, 195.5),
            ],
            senior_pension_deduction: vec![
                DeductionBand::new(Some(330.0), 0.0, 110.0),
                DeductionBand::new(Some(410.0), 0.25, 27.5),
                DeductionBand::new(Some(770.0), 0.15, 68.5),
                DeductionBand::new(Some(1000.0), 0.05, 145.5),
                DeductionBand::new(None, 0.0, 195.5),
            ],
            senior_age: 65,
            basic_deduction: 48.0,
            spouse_deduction: 38.0,
            spouse_income_limit: 103.0,
            dependent_deductions: vec![
                DependentBand::new(16, Some(18), 38.0),
                DependentBand::new(19, Some(22), 63.0),
                DependentBand::new(23, Some(69), 38.0),
                DependentBand::new(70, None, 48.0),
            ],
            income_tax_brackets: vec![
                TaxBracket::new(Some(195.0), 0.05, 0.0),
                TaxBracket::new(Some(330.0), 0.10, 9.75),
                TaxBracket::new(Some(695.0), 0.20, 42.75),
                TaxBracket::new(Some(900.0), 0.23, 63.6),
                TaxBracket::new(Some(1800.0), 0.33, 153.6),
                TaxBracket::new(Some(4000.0), 0.40, 279.6),
                TaxBracket::new(None, 0.45, 479.6),
            ],
            reconstruction_surtax_rate: 0.021,
            resident_tax_rate: 0.10,
            resident_per_capita: 0.5,
            truncation_unit: 0.1,
        }
    }
}

impl TaxPolicy {
    /// A regime with no taxes, premiums or deductions at all.
    pub fn exempt() -> Self {
        Self {
            social_insurance_rate: 0.0,
            care_insurance_rate: 0.0,
            pension_premium_rate: 0.0,
            salary_deduction: Vec::new(),
            pension_deduction: Vec::new(),
            senior_pension_deduction: Vec::new(),
            basic_deduction: 0.0,
            spouse_deduction: 0.0,
            dependent_deductions: Vec::new(),
            income_tax_brackets: Vec::new(),
            reconstruction_surtax_rate: 0.0,
            resident_tax_rate: 0.0,
            resident_per_capita: 0.0,
            ..Self::default()
        }
    }
}

/// Public pension accrual constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PensionPolicy {
    /// Full basic pension per year after `full_months` of enrollment.
    pub basic_full_annual: f64,
    pub full_months: u32,
    /// Earnings-related accrual per month of enrollment, applied to the
    /// average monthly salary.
    pub accrual_rate: f64,
    pub standard_claim_age: u32,
    pub earliest_claim_age: u32,
    pub latest_claim_age: u32,
    pub early_reduction_per_month: f64,
    pub deferral_increase_per_month: f64,
}

impl Default for PensionPolicy {
    fn default() -> Self {
        Self {
            basic_full_annual: 81.6,
            full_months: 480,
            accrual_rate: 0.005481,
            standard_claim_age: 65,
            earliest_claim_age: 60,
            latest_claim_age: 75,
            early_reduction_per_month: 0.004,
            deferral_increase_per_month: 0.007,
        }
    }
}

/// Annual cost of one kind of school. `entrance_fee` is charged once in the
/// first year of the tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchoolCost {
    pub tuition: f64,
    pub extracurricular: f64,
    pub entrance_fee: f64,
}

impl SchoolCost {
    const fn new(tuition: f64, extracurricular: f64, entrance_fee: f64) -> Self {
        Self {
            tuition,
            extracurricular,
            entrance_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TierCosts {
    pub public: SchoolCost,
    pub private: SchoolCost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationCostTable {
    pub preschool: TierCosts,
    pub elementary: TierCosts,
    pub junior_high: TierCosts,
    pub high_school: TierCosts,
    pub national_university: SchoolCost,
    pub private_arts_university: SchoolCost,
    pub private_science_university: SchoolCost,
    /// Extra yearly cost when a university student lives away from home.
    pub living_away_annual: f64,
}

impl Default for EducationCostTable {
    fn default() -> Self {
        Self {
            preschool: TierCosts {
                public: SchoolCost::new(6.1, 10.4, 0.0),
                private: SchoolCost::new(13.5, 17.4, 0.0),
            },
            elementary: TierCosts {
                public: SchoolCost::new(10.5, 24.7, 0.0),
                private: SchoolCost::new(96.1, 70.6, 0.0),
            },
            junior_high: TierCosts {
                public: SchoolCost::new(18.0, 35.9, 0.0),
                private: SchoolCost::new(106.1, 37.5, 25.0),
            },
            high_school: TierCosts {
                public: SchoolCost::new(30.9, 20.4, 0.0),
                private: SchoolCost::new(75.0, 30.4, 25.0),
            },
            national_university: SchoolCost::new(53.6, 0.0, 28.2),
            private_arts_university: SchoolCost::new(93.5, 0.0, 22.6),
            private_science_university: SchoolCost::new(126.5, 0.0, 25.2),
            living_away_annual: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band_value(bands: &[DeductionBand], income: f64) -> f64 {
        let band = bands
            .iter()
            .find(|b| b.up_to.is_none_or(|limit| income <= limit))
            .expect("last band is unbounded");
        income * band.rate + band.add
    }

    #[test]
    fn default_deduction_tables_are_continuous_at_band_edges() {
        let policy = TaxPolicy::default();
        for bands in [
            &policy.salary_deduction,
            &policy.pension_deduction,
            &policy.senior_pension_deduction,
        ] {
            for band in bands.iter() {
                let Some(edge) = band.up_to else { continue };
                let below = band_value(bands, edge);
                let above = band_value(bands, edge + 1e-9);
                assert!(
                    (below - above).abs() < 1e-6,
                    "jump at {edge}: {below} vs {above}"
                );
            }
        }
    }

    #[test]
    fn dependent_band_contains_is_inclusive() {
        let band = DependentBand::new(16, Some(18), 38.0);
        assert!(!band.contains(15));
        assert!(band.contains(16));
        assert!(band.contains(18));
        assert!(!band.contains(19));
        assert!(DependentBand::new(70, None, 48.0).contains(105));
    }

    #[test]
    fn policy_tables_accept_partial_json() {
        let json = r#"{ "tax": { "residentTaxRate": 0.12 } }"#;
        let policy: PolicyTables = serde_json::from_str(json).expect("partial policy parses");
        assert!((policy.tax.resident_tax_rate - 0.12).abs() < 1e-12);
        assert_eq!(policy.tax.income_tax_brackets.len(), 7);
        assert_eq!(policy.pension, PensionPolicy::default());
    }
}
