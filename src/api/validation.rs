use crate::core::{HousingPlan, ReturnSource, SimulationInput, WithdrawalMethod};

pub const MAX_AGE: u32 = 120;
pub const MAX_TRIALS: u32 = 100_000;

/// A single problem with a [`SimulationInput`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("endAge ({end_age}) must be >= currentAge ({current_age})")]
    EndBeforeCurrent { current_age: u32, end_age: u32 },

    #[error("{field} ({age}) must be <= {max}")]
    AgeTooHigh {
        field: &'static str,
        age: u32,
        max: u32,
    },

    #[error("retirementAge ({age}) must be between 15 and 120")]
    RetirementAgeOutOfRange { age: u32 },

    #[error("{field} must be >= 0 (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be between {min} and {max} (got {value})")]
    RateOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("allocation weights must sum to a positive value")]
    AllocationWeights,

    #[error("monteCarloTrials ({trials}) must be <= {max}")]
    TooManyTrials { trials: u32, max: u32 },
}

/// Every problem found in one input, reported together.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", join_problems(.0))]
pub struct InputErrors(pub Vec<InputError>);

impl InputErrors {
    pub fn problems(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

fn join_problems(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Default)]
struct Checker {
    errors: Vec<InputError>,
}

impl Checker {
    fn non_negative(&mut self, field: &'static str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.errors.push(InputError::Negative { field, value });
        }
    }

    fn rate(&mut self, field: &'static str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.errors.push(InputError::RateOutOfRange {
                field,
                value,
                min,
                max,
            });
        }
    }

    fn age(&mut self, field: &'static str, age: u32) {
        if age > MAX_AGE {
            self.errors.push(InputError::AgeTooHigh {
                field,
                age,
                max: MAX_AGE,
            });
        }
    }
}

/// Rejects inputs the engine would accept but that cannot describe a real
/// household. The engine itself never fails.
pub fn validate_input(input: &SimulationInput) -> Result<(), InputErrors> {
    let mut check = Checker::default();
    let household = &input.household;
    let income = &input.income;
    let expenses = &input.expenses;
    let investment = &input.investment;
    let scenario = &input.scenario;

    if household.end_age < household.current_age {
        check.errors.push(InputError::EndBeforeCurrent {
            current_age: household.current_age,
            end_age: household.end_age,
        });
    }
    check.age("endAge", household.end_age);
    if !(15..=MAX_AGE).contains(&income.retirement_age) {
        check.errors.push(InputError::RetirementAgeOutOfRange {
            age: income.retirement_age,
        });
    }

    check.non_negative("annualSalary", income.annual_salary);
    check.rate("growthRate", income.growth_rate, -0.5, 0.5);
    if let Some(amount) = income.pension.annual_amount {
        check.non_negative("pension.annualAmount", amount);
    }
    if let Some(spouse) = &household.spouse {
        check.age("spouse.age", spouse.age);
        check.non_negative("spouse.annualSalary", spouse.annual_salary);
        check.rate("spouse.growthRate", spouse.growth_rate, -0.5, 0.5);
    }

    check.non_negative("living", expenses.living.monthly_total());
    check.rate(
        "retirementLivingRatio",
        expenses.retirement_living_ratio,
        0.0,
        2.0,
    );
    match &expenses.housing {
        HousingPlan::Own {
            mortgage,
            annual_maintenance,
            annual_property_tax,
        } => {
            check.non_negative("annualMaintenance", *annual_maintenance);
            check.non_negative("annualPropertyTax", *annual_property_tax);
            if let Some(mortgage) = mortgage {
                check.non_negative("mortgage.principal", mortgage.principal);
                check.rate("mortgage.annualRate", mortgage.annual_rate, 0.0, 0.2);
            }
        }
        HousingPlan::Rent {
            monthly_rent,
            renewal_fee_months,
            purchase,
            ..
        } => {
            check.non_negative("monthlyRent", *monthly_rent);
            check.non_negative("renewalFeeMonths", *renewal_fee_months);
            if let Some(purchase) = purchase {
                check.non_negative("purchase.price", purchase.price);
                check.non_negative("purchase.downPayment", purchase.down_payment);
                check.rate("purchase.closingCostRatio", purchase.closing_cost_ratio, 0.0, 1.0);
                check.rate("purchase.annualRate", purchase.annual_rate, 0.0, 0.2);
            }
        }
    }

    check.non_negative("savingsBalance", investment.savings_balance);
    check.non_negative("investmentBalance", investment.investment_balance);
    check.non_negative("monthlyContribution", investment.monthly_contribution);
    match investment.withdrawal.method {
        WithdrawalMethod::ShortfallOnly => {}
        WithdrawalMethod::FixedRate { rate } => check.rate("withdrawal.rate", rate, 0.0, 1.0),
        WithdrawalMethod::FixedAmount { annual } => {
            check.non_negative("withdrawal.annual", annual);
        }
    }
    for slice in &investment.allocation {
        check.rate("allocation.expectedReturn", slice.expected_return, -0.5, 0.5);
        check.non_negative("allocation.volatility", slice.volatility);
    }

    check.rate("inflationRate", scenario.inflation_rate, -0.1, 0.2);
    check.rate("pensionCutRatio", scenario.pension_cut_ratio, 0.0, 1.0);
    check.non_negative("spread", scenario.spread);
    if let ReturnSource::Explicit { rate } = scenario.return_source {
        check.rate("returnSource.rate", rate, -0.5, 0.5);
    } else if investment.allocation.iter().all(|s| s.weight <= 0.0) {
        check.errors.push(InputError::AllocationWeights);
    }
    for (field, rate) in [
        ("optimisticReturn", scenario.optimistic_return),
        ("pessimisticReturn", scenario.pessimistic_return),
    ] {
        if let Some(rate) = rate {
            check.rate(field, rate, -0.5, 0.5);
        }
    }
    if let Some(volatility) = scenario.volatility {
        check.non_negative("volatility", volatility);
    }
    if scenario.monte_carlo_trials > MAX_TRIALS {
        check.errors.push(InputError::TooManyTrials {
            trials: scenario.monte_carlo_trials,
            max: MAX_TRIALS,
        });
    }

    if check.errors.is_empty() {
        Ok(())
    } else {
        Err(InputErrors(check.errors))
    }
}
