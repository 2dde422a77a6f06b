use tracing::debug;

use super::education::education_cost;
use super::income::{SalaryProfile, estimate_pension, project_salary};
use super::monte_carlo::{MonteCarloParams, run_monte_carlo};
use super::mortgage::{LoanTerms, annual_payment, remaining_balance};
use super::policy::PolicyTables;
use super::tax::{TaxBreakdown, TaxInput, calculate_tax};
use super::types::{
    CarPlan, ChildBirth, HousingPlan, LifeEvent, OneOff, ReturnSource, ScenarioKind,
    ScenarioResult, SimulationInput, SimulationResult, WithdrawalMethod, YearlyRecord,
};

/// Children are claimed as dependants up to this age.
const MAX_DEPENDENT_CHILD_AGE: u32 = 22;

/// Running balances carried from one simulated year to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionState {
    pub savings: f64,
    pub investment: f64,
    pub insolvency_age: Option<u32>,
}

impl ProjectionState {
    pub fn initial(input: &SimulationInput) -> Self {
        Self {
            savings: input.investment.savings_balance,
            investment: input.investment.investment_balance,
            insolvency_age: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveLoan {
    start_age: u32,
    terms: LoanTerms,
}

/// Everything about a scenario that does not change from year to year.
#[derive(Debug, Clone)]
pub struct ScenarioContext<'a> {
    input: &'a SimulationInput,
    policy: &'a PolicyTables,
    kind: ScenarioKind,
    return_rate: f64,
    primary: SalaryProfile,
    spouse: Option<SalaryProfile>,
    primary_pension: f64,
    spouse_pension: f64,
    loan: Option<ActiveLoan>,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(input: &'a SimulationInput, policy: &'a PolicyTables, kind: ScenarioKind) -> Self {
        let household = &input.household;
        let income = &input.income;

        let primary = SalaryProfile {
            base_salary: income.annual_salary,
            current_age: household.current_age,
            growth_rate: income.growth_rate,
            curve: income.growth_curve,
            retirement_age: income.retirement_age,
            reemployment: income.reemployment,
            leave_return_age: income.leave_return_age,
        };
        let spouse = household.spouse.as_ref().map(|spouse| SalaryProfile {
            base_salary: spouse.annual_salary,
            current_age: spouse.age,
            growth_rate: spouse.growth_rate,
            curve: spouse.growth_curve,
            retirement_age: spouse.retirement_age,
            reemployment: spouse.reemployment,
            leave_return_age: spouse.leave_return_age,
        });

        let pension_factor = if pension_cut_applies(input, kind) {
            (1.0 - input.scenario.pension_cut_ratio).max(0.0)
        } else {
            1.0
        };
        let primary_pension =
            estimate_pension(&income.pension, &primary, &policy.pension) * pension_factor;
        let spouse_pension = match (&household.spouse, &spouse) {
            (Some(facts), Some(profile)) => {
                estimate_pension(&facts.pension, profile, &policy.pension) * pension_factor
            }
            _ => 0.0,
        };

        Self {
            input,
            policy,
            kind,
            return_rate: scenario_return_rate(input, kind),
            primary,
            spouse,
            primary_pension,
            spouse_pension,
            loan: resolve_loan(input),
        }
    }

    pub fn return_rate(&self) -> f64 {
        self.return_rate
    }

    fn inflator(&self, age: u32) -> f64 {
        let years = age.saturating_sub(self.input.household.current_age);
        (1.0 + self.input.scenario.inflation_rate).powi(years as i32)
    }
}

/// Runs the three deterministic scenarios and, when trials are configured,
/// the Monte Carlo pass over the standard scenario's cash flows.
pub fn run_simulation(input: &SimulationInput, policy: &PolicyTables) -> SimulationResult {
    let ((optimistic, standard), pessimistic) = rayon::join(
        || {
            rayon::join(
                || run_scenario(input, policy, ScenarioKind::Optimistic),
                || run_scenario(input, policy, ScenarioKind::Standard),
            )
        },
        || run_scenario(input, policy, ScenarioKind::Pessimistic),
    );

    let monte_carlo = (input.scenario.monte_carlo_trials > 0).then(|| {
        let params = monte_carlo_params(input, &standard);
        let result = run_monte_carlo(&params, &exogenous_cash_flows(&standard.records));
        debug!(
            trials = result.trials,
            success_rate = result.success_rate,
            volatility = result.volatility,
            "monte carlo complete"
        );
        result
    });

    SimulationResult {
        optimistic,
        standard,
        pessimistic,
        monte_carlo,
    }
}

pub fn run_scenario(
    input: &SimulationInput,
    policy: &PolicyTables,
    kind: ScenarioKind,
) -> ScenarioResult {
    let ctx = ScenarioContext::new(input, policy, kind);
    let ages = input.household.current_age..=input.household.end_age;
    let (final_state, records) = ages.fold(
        (ProjectionState::initial(input), Vec::new()),
        |(state, mut records), age| {
            let (next, record) = step(&ctx, state, age);
            records.push(record);
            (next, records)
        },
    );

    let result = summarize(&ctx, records, final_state);
    debug!(
        scenario = ?result.kind,
        return_rate = result.return_rate,
        final_assets = result.final_assets,
        insolvency_age = ?result.insolvency_age,
        "scenario complete"
    );
    result
}

pub fn base_return_rate(input: &SimulationInput) -> f64 {
    match input.scenario.return_source {
        ReturnSource::Explicit { rate } => rate,
        ReturnSource::Allocation => input.investment.weighted_return(),
    }
}

pub fn scenario_return_rate(input: &SimulationInput, kind: ScenarioKind) -> f64 {
    let base = base_return_rate(input);
    let scenario = &input.scenario;
    match kind {
        ScenarioKind::Standard => base,
        ScenarioKind::Optimistic => scenario.optimistic_return.unwrap_or(base + scenario.spread),
        ScenarioKind::Pessimistic => scenario.pessimistic_return.unwrap_or(base - scenario.spread),
    }
}

/// Net cash flow per year excluding investment return and withdrawals.
pub fn exogenous_cash_flows(records: &[YearlyRecord]) -> Vec<f64> {
    records.iter().map(|r| r.net_cashflow).collect()
}

pub fn monte_carlo_params(input: &SimulationInput, standard: &ScenarioResult) -> MonteCarloParams {
    MonteCarloParams {
        initial_assets: input.investment.initial_total(),
        start_age: input.household.current_age,
        end_age: input.household.end_age,
        mean_return: standard.return_rate,
        volatility: input
            .scenario
            .volatility
            .unwrap_or_else(|| input.investment.weighted_volatility()),
        trials: input.scenario.monte_carlo_trials,
        seed: input.scenario.seed,
    }
}

fn pension_cut_applies(input: &SimulationInput, kind: ScenarioKind) -> bool {
    let scenario = &input.scenario;
    scenario.pension_reduction
        && match kind {
            ScenarioKind::Optimistic => false,
            ScenarioKind::Standard => scenario.apply_pension_cut_to_standard,
            ScenarioKind::Pessimistic => true,
        }
}

fn resolve_loan(input: &SimulationInput) -> Option<ActiveLoan> {
    match &input.expenses.housing {
        HousingPlan::Own { mortgage, .. } => mortgage.map(|m| ActiveLoan {
            start_age: m.start_age,
            terms: LoanTerms {
                principal: m.principal,
                annual_rate: m.annual_rate,
                term_years: m.term_years,
                method: m.method,
            },
        }),
        HousingPlan::Rent { purchase, .. } => purchase.map(|plan| {
            let years = plan.age.saturating_sub(input.household.current_age);
            let inflator = (1.0 + input.scenario.inflation_rate).powi(years as i32);
            ActiveLoan {
                start_age: plan.age,
                terms: LoanTerms {
                    principal: ((plan.price - plan.down_payment) * inflator).max(0.0),
                    annual_rate: plan.annual_rate,
                    term_years: plan.term_years,
                    method: plan.method,
                },
            }
        }),
    }
}

/// One year of the projection: consumes the previous state, returns the next
/// state and the year's record.
pub fn step(
    ctx: &ScenarioContext<'_>,
    state: ProjectionState,
    age: u32,
) -> (ProjectionState, YearlyRecord) {
    let input = ctx.input;
    let household = &input.household;
    let income = &input.income;
    let expenses = &input.expenses;
    let years = age.saturating_sub(household.current_age);
    let inflator = ctx.inflator(age);
    let mut events = Vec::new();

    // Income.
    let salary = project_salary(&ctx.primary, age);
    let spouse_age = household.spouse.as_ref().map(|s| s.age + years);
    let spouse_salary = match (&ctx.spouse, spouse_age) {
        (Some(profile), Some(spouse_age)) => project_salary(profile, spouse_age),
        _ => 0.0,
    };
    let pension = if age >= income.pension.claim_age {
        ctx.primary_pension
    } else {
        0.0
    };
    let spouse_pension = match (&household.spouse, spouse_age) {
        (Some(spouse), Some(spouse_age)) if spouse_age >= spouse.pension.claim_age => {
            ctx.spouse_pension
        }
        _ => 0.0,
    };
    let side_income: f64 = income
        .side_incomes
        .iter()
        .filter(|stream| stream.is_active(age))
        .map(|stream| stream.annual_amount)
        .sum();
    let one_off_income = one_offs_at(&income.one_off_incomes, age, &mut events);

    if age == income.retirement_age {
        events.push(LifeEvent::Retirement);
    }
    if income.reemployment.is_some_and(|r| r.end_age == age) {
        events.push(LifeEvent::ReemploymentEnd);
    }
    if age == income.pension.claim_age {
        events.push(LifeEvent::PensionStart);
    }
    if let (Some(spouse), Some(spouse_age)) = (&household.spouse, spouse_age) {
        if spouse_age == spouse.retirement_age {
            events.push(LifeEvent::SpouseRetirement);
        }
        if spouse_age == spouse.pension.claim_age {
            events.push(LifeEvent::SpousePensionStart);
        }
    }

    // Expenses, in today's money inflated to this year.
    let living_ratio = if age >= income.retirement_age {
        expenses.retirement_living_ratio
    } else {
        1.0
    };
    let living_expense = expenses.living.monthly_total() * 12.0 * inflator * living_ratio;
    let (housing_expense, mortgage_balance) = housing_cost(ctx, age, inflator, &mut events);

    let mut education_expense = 0.0;
    let mut dependent_ages = Vec::with_capacity(household.children.len());
    for (idx, child) in household.children.iter().enumerate() {
        let Some(child_age) = child.age_after(years) else {
            continue;
        };
        if child_age == 0 && matches!(child.birth, ChildBirth::BornInYears(_)) {
            events.push(LifeEvent::ChildBorn { child: idx });
        }
        if child_age <= MAX_DEPENDENT_CHILD_AGE {
            dependent_ages.push(child_age);
        }
        let cost = education_cost(child_age, &child.education, &ctx.policy.education);
        if let Some(tier) = cost.tier {
            if child_age == tier.entry_age() && child.education.attends(tier) {
                events.push(LifeEvent::SchoolEntry { child: idx, tier });
            }
        }
        education_expense += cost.total * inflator;
    }

    let insurance_expense = if age < expenses.insurance.end_age {
        (expenses.insurance.monthly_life + expenses.insurance.monthly_medical) * 12.0 * inflator
    } else {
        0.0
    };
    let car_expense = car_cost(expenses.car.as_ref(), age, inflator, &mut events);
    let leisure_expense = if age < expenses.leisure.end_age {
        (expenses.leisure.annual_travel + expenses.leisure.annual_hobby) * inflator
    } else {
        0.0
    };
    let one_off_expense = one_offs_at(&expenses.one_off_expenses, age, &mut events) * inflator;

    // Taxes: each earner is assessed separately, dependants go to the primary.
    let primary_tax = calculate_tax(
        &TaxInput {
            salary,
            pension,
            age,
            has_spouse: household.spouse.is_some(),
            spouse_income: spouse_salary + spouse_pension,
            dependent_ages: &dependent_ages,
        },
        &ctx.policy.tax,
    );
    let spouse_tax = match spouse_age {
        Some(spouse_age) => calculate_tax(
            &TaxInput {
                salary: spouse_salary,
                pension: spouse_pension,
                age: spouse_age,
                has_spouse: true,
                spouse_income: salary + pension,
                dependent_ages: &[],
            },
            &ctx.policy.tax,
        ),
        None => TaxBreakdown::default(),
    };

    let social_insurance = primary_tax.social_insurance + spouse_tax.social_insurance;
    let income_tax = primary_tax.income_tax + spouse_tax.income_tax;
    let resident_tax = primary_tax.resident_tax + spouse_tax.resident_tax;
    let total_tax = social_insurance + income_tax + resident_tax;

    let earned_income =
        salary + spouse_salary + pension + spouse_pension + side_income + one_off_income;
    let total_expense = living_expense
        + housing_expense
        + education_expense
        + car_expense
        + insurance_expense
        + leisure_expense
        + one_off_expense;
    let net_cashflow = earned_income - total_tax - total_expense;

    // Asset pools. The return is earned on the balance held before this
    // year's contribution.
    let contribution_end_age = input
        .investment
        .contribution_end_age
        .unwrap_or(income.retirement_age);
    let contribution = if age < contribution_end_age {
        (input.investment.monthly_contribution * 12.0).max(0.0)
    } else {
        0.0
    };
    let investment_return = state.investment.max(0.0) * ctx.return_rate;

    let mut savings = state.savings + net_cashflow - contribution;
    let mut investment = state.investment + investment_return + contribution;

    let planned_withdrawal =
        planned_withdrawal(ctx, age, state.investment, inflator).clamp(0.0, investment.max(0.0));
    investment -= planned_withdrawal;
    savings += planned_withdrawal;

    if investment < 0.0 {
        savings += investment;
        investment = 0.0;
    }

    let mut investment_withdrawal = 0.0;
    if savings < 0.0 && investment > 0.0 {
        investment_withdrawal = (-savings).min(investment);
        investment -= investment_withdrawal;
        savings += investment_withdrawal;
    }

    let mut unfunded_deficit = 0.0;
    let mut insolvency_age = state.insolvency_age;
    if savings < 0.0 {
        if insolvency_age.is_none() {
            unfunded_deficit = savings + investment;
            insolvency_age = Some(age);
            events.push(LifeEvent::Insolvency);
        }
        savings = 0.0;
        investment = 0.0;
    }

    let record = YearlyRecord {
        age,
        spouse_age,
        salary,
        spouse_salary,
        pension,
        spouse_pension,
        side_income,
        one_off_income,
        investment_withdrawal,
        total_income: earned_income + investment_withdrawal,
        living_expense,
        housing_expense,
        education_expense,
        car_expense,
        insurance_expense,
        leisure_expense,
        one_off_expense,
        total_expense,
        social_insurance,
        income_tax,
        resident_tax,
        total_tax,
        net_cashflow,
        net_income: net_cashflow + investment_withdrawal,
        contribution,
        planned_withdrawal,
        investment_return,
        savings_start: state.savings,
        investment_start: state.investment,
        savings_balance: savings,
        investment_balance: investment,
        total_assets: savings + investment,
        unfunded_deficit,
        mortgage_balance,
        events,
    };

    let next = ProjectionState {
        savings,
        investment,
        insolvency_age,
    };
    (next, record)
}

fn planned_withdrawal(
    ctx: &ScenarioContext<'_>,
    age: u32,
    investment_start: f64,
    inflator: f64,
) -> f64 {
    let plan = &ctx.input.investment.withdrawal;
    if age < plan.start_age {
        return 0.0;
    }
    match plan.method {
        WithdrawalMethod::ShortfallOnly => 0.0,
        WithdrawalMethod::FixedRate { rate } => investment_start.max(0.0) * rate,
        WithdrawalMethod::FixedAmount { annual } => annual * inflator,
    }
}

fn one_offs_at(items: &[OneOff], age: u32, events: &mut Vec<LifeEvent>) -> f64 {
    let mut total = 0.0;
    for item in items.iter().filter(|item| item.age == age) {
        total += item.amount;
        events.push(LifeEvent::Custom {
            label: item.label.clone(),
        });
    }
    total
}

/// Housing cost for the year and the mortgage balance left at its end.
fn housing_cost(
    ctx: &ScenarioContext<'_>,
    age: u32,
    inflator: f64,
    events: &mut Vec<LifeEvent>,
) -> (f64, f64) {
    match &ctx.input.expenses.housing {
        HousingPlan::Own {
            annual_maintenance,
            annual_property_tax,
            ..
        } => {
            let (payment, balance) = loan_year(ctx.loan, age, events);
            (
                (annual_maintenance + annual_property_tax) * inflator + payment,
                balance,
            )
        }
        HousingPlan::Rent {
            monthly_rent,
            renewal_fee_months,
            renewal_interval_years,
            purchase,
        } => match purchase {
            Some(plan) if age >= plan.age => {
                let mut cost = (plan.annual_maintenance + plan.annual_property_tax) * inflator;
                if age == plan.age {
                    events.push(LifeEvent::HomePurchase);
                    cost += (plan.down_payment + plan.price * plan.closing_cost_ratio) * inflator;
                }
                let (payment, balance) = loan_year(ctx.loan, age, events);
                (cost + payment, balance)
            }
            _ => {
                let years = age.saturating_sub(ctx.input.household.current_age);
                let mut cost = monthly_rent * 12.0 * inflator;
                if *renewal_interval_years > 0 && years > 0 && years % renewal_interval_years == 0
                {
                    cost += monthly_rent * renewal_fee_months * inflator;
                }
                (cost, 0.0)
            }
        },
    }
}

fn loan_year(loan: Option<ActiveLoan>, age: u32, events: &mut Vec<LifeEvent>) -> (f64, f64) {
    let Some(loan) = loan else {
        return (0.0, 0.0);
    };
    if age < loan.start_age {
        return (0.0, 0.0);
    }
    let elapsed = age - loan.start_age;
    if loan.terms.principal > 0.0 && elapsed + 1 == loan.terms.term_years {
        events.push(LifeEvent::MortgagePaidOff);
    }
    (
        annual_payment(&loan.terms, elapsed),
        remaining_balance(&loan.terms, elapsed + 1),
    )
}

fn car_cost(car: Option<&CarPlan>, age: u32, inflator: f64, events: &mut Vec<LifeEvent>) -> f64 {
    let Some(car) = car else {
        return 0.0;
    };
    let mut cost = 0.0;
    if (car.first_purchase_age..=car.last_purchase_age).contains(&age) {
        let since_first = age - car.first_purchase_age;
        let due = match car.replacement_years {
            0 => since_first == 0,
            interval => since_first % interval == 0,
        };
        if due {
            cost += car.price * inflator;
            events.push(LifeEvent::CarReplacement);
        }
    }
    if age >= car.first_purchase_age && age < car.upkeep_end_age {
        cost += car.annual_upkeep * inflator;
    }
    cost
}

fn summarize(
    ctx: &ScenarioContext<'_>,
    records: Vec<YearlyRecord>,
    final_state: ProjectionState,
) -> ScenarioResult {
    let mut peak_assets = f64::NEG_INFINITY;
    let mut peak_age = ctx.input.household.current_age;
    let mut lifetime_income = 0.0;
    let mut lifetime_expense = 0.0;
    let mut lifetime_tax = 0.0;
    for record in &records {
        if record.total_assets > peak_assets {
            peak_assets = record.total_assets;
            peak_age = record.age;
        }
        lifetime_income += record.total_income - record.investment_withdrawal;
        lifetime_expense += record.total_expense;
        lifetime_tax += record.total_tax;
    }

    ScenarioResult {
        kind: ctx.kind,
        return_rate: ctx.return_rate,
        lifetime_income,
        lifetime_expense,
        lifetime_tax,
        peak_assets: if records.is_empty() { 0.0 } else { peak_assets },
        peak_age,
        final_assets: records.last().map_or(0.0, |r| r.total_assets),
        insolvency_age: final_state.insolvency_age,
        records,
    }
}
