mod education;
mod engine;
mod income;
mod monte_carlo;
mod mortgage;
mod policy;
mod tax;
mod types;

pub use education::{EducationCost, EducationItem, education_cost};
pub use engine::{
    ProjectionState, ScenarioContext, base_return_rate, exogenous_cash_flows, monte_carlo_params,
    run_scenario, run_simulation, scenario_return_rate, step,
};
pub use income::{SalaryProfile, claim_age_factor, estimate_pension, project_salary};
pub use monte_carlo::{MonteCarloParams, deterministic_path, run_monte_carlo};
pub use mortgage::{LoanTerms, annual_payment, principal_schedule, remaining_balance};
pub use policy::{
    DeductionBand, DependentBand, EducationCostTable, PensionPolicy, PolicyTables, SchoolCost,
    TaxBracket, TaxPolicy, TierCosts,
};
pub use tax::{
    Deductions, TaxBreakdown, TaxInput, calculate_tax, pension_deduction, progressive_income_tax,
    salary_deduction, social_insurance,
};
pub use types::*;
