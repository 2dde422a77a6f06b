use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthCurve {
    #[default]
    Flat,
    Seniority,
    Performance,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepaymentMethod {
    #[default]
    EqualPayment,
    EqualPrincipal,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WithdrawalMethod {
    #[default]
    ShortfallOnly,
    FixedRate {
        rate: f64,
    },
    /// Annual amount in today's money, inflated each year.
    FixedAmount {
        annual: f64,
    },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReturnSource {
    Explicit {
        rate: f64,
    },
    #[default]
    Allocation,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchoolType {
    None,
    #[default]
    Public,
    Private,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniversityType {
    None,
    #[default]
    National,
    PrivateArts,
    PrivateScience,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchoolTier {
    Preschool,
    Elementary,
    JuniorHigh,
    HighSchool,
    University,
}

impl SchoolTier {
    pub const ALL: [SchoolTier; 5] = [
        SchoolTier::Preschool,
        SchoolTier::Elementary,
        SchoolTier::JuniorHigh,
        SchoolTier::HighSchool,
        SchoolTier::University,
    ];

    pub fn for_age(age: u32) -> Option<SchoolTier> {
        match age {
            3..=5 => Some(SchoolTier::Preschool),
            6..=11 => Some(SchoolTier::Elementary),
            12..=14 => Some(SchoolTier::JuniorHigh),
            15..=17 => Some(SchoolTier::HighSchool),
            18..=21 => Some(SchoolTier::University),
            _ => None,
        }
    }

    pub fn entry_age(self) -> u32 {
        match self {
            SchoolTier::Preschool => 3,
            SchoolTier::Elementary => 6,
            SchoolTier::JuniorHigh => 12,
            SchoolTier::HighSchool => 15,
            SchoolTier::University => 18,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    Optimistic,
    Standard,
    Pessimistic,
}

/// Everything the engine needs for one run. Amounts are in 万円; monthly
/// figures are annualised by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationInput {
    pub household: Household,
    pub income: IncomeFacts,
    pub expenses: ExpenseFacts,
    pub investment: InvestmentFacts,
    pub scenario: ScenarioFacts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Household {
    pub current_age: u32,
    /// Last simulated age, inclusive.
    pub end_age: u32,
    pub spouse: Option<Spouse>,
    pub children: Vec<Child>,
}

impl Default for Household {
    fn default() -> Self {
        Self {
            current_age: 35,
            end_age: 95,
            spouse: Some(Spouse::default()),
            children: vec![
                Child {
                    birth: ChildBirth::CurrentAge(3),
                    education: EducationPlan::default(),
                },
                Child {
                    birth: ChildBirth::BornInYears(2),
                    education: EducationPlan {
                        high_school: SchoolType::Private,
                        university: UniversityType::PrivateArts,
                        ..EducationPlan::default()
                    },
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Spouse {
    pub age: u32,
    pub annual_salary: f64,
    pub growth_rate: f64,
    pub growth_curve: GrowthCurve,
    pub retirement_age: u32,
    pub leave_return_age: Option<u32>,
    pub reemployment: Option<Reemployment>,
    pub pension: PensionPlan,
}

impl Default for Spouse {
    fn default() -> Self {
        Self {
            age: 33,
            annual_salary: 250.0,
            growth_rate: 0.01,
            growth_curve: GrowthCurve::Flat,
            retirement_age: 60,
            leave_return_age: None,
            reemployment: None,
            pension: PensionPlan::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildBirth {
    CurrentAge(u32),
    BornInYears(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub birth: ChildBirth,
    #[serde(default)]
    pub education: EducationPlan,
}

impl Child {
    /// Age of the child `years_elapsed` years into the run, or `None` while
    /// not yet born.
    pub fn age_after(&self, years_elapsed: u32) -> Option<u32> {
        match self.birth {
            ChildBirth::CurrentAge(age) => Some(age + years_elapsed),
            ChildBirth::BornInYears(years) => years_elapsed.checked_sub(years),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationPlan {
    pub preschool: SchoolType,
    pub elementary: SchoolType,
    pub junior_high: SchoolType,
    pub high_school: SchoolType,
    pub university: UniversityType,
    pub lives_away: bool,
}

impl EducationPlan {
    pub fn attends(&self, tier: SchoolTier) -> bool {
        match tier {
            SchoolTier::Preschool => self.preschool != SchoolType::None,
            SchoolTier::Elementary => self.elementary != SchoolType::None,
            SchoolTier::JuniorHigh => self.junior_high != SchoolType::None,
            SchoolTier::HighSchool => self.high_school != SchoolType::None,
            SchoolTier::University => self.university != UniversityType::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeFacts {
    pub annual_salary: f64,
    pub growth_rate: f64,
    pub growth_curve: GrowthCurve,
    pub retirement_age: u32,
    pub reemployment: Option<Reemployment>,
    pub leave_return_age: Option<u32>,
    pub pension: PensionPlan,
    pub side_incomes: Vec<IncomeStream>,
    pub one_off_incomes: Vec<OneOff>,
}

impl Default for IncomeFacts {
    fn default() -> Self {
        Self {
            annual_salary: 500.0,
            growth_rate: 0.015,
            growth_curve: GrowthCurve::Seniority,
            retirement_age: 60,
            reemployment: Some(Reemployment {
                annual_salary: 300.0,
                end_age: 65,
            }),
            leave_return_age: None,
            pension: PensionPlan::default(),
            side_incomes: Vec::new(),
            one_off_incomes: vec![OneOff {
                label: "Retirement allowance".to_string(),
                age: 60,
                amount: 1500.0,
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reemployment {
    pub annual_salary: f64,
    /// First age with no re-employment salary.
    pub end_age: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PensionPlan {
    pub claim_age: u32,
    pub enrollment_start_age: u32,
    /// Known annual amount at the standard claim age; estimated when absent.
    pub annual_amount: Option<f64>,
}

impl Default for PensionPlan {
    fn default() -> Self {
        Self {
            claim_age: 65,
            enrollment_start_age: 22,
            annual_amount: None,
        }
    }
}

/// Recurring income paid for ages `start_age..end_age`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStream {
    pub label: String,
    pub annual_amount: f64,
    pub start_age: u32,
    pub end_age: u32,
}

impl IncomeStream {
    pub fn is_active(&self, age: u32) -> bool {
        (self.start_age..self.end_age).contains(&age)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneOff {
    pub label: String,
    pub age: u32,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpenseFacts {
    pub living: LivingExpenses,
    /// Multiplier on living costs from the retirement age onward.
    pub retirement_living_ratio: f64,
    pub housing: HousingPlan,
    pub insurance: InsurancePlan,
    pub car: Option<CarPlan>,
    pub leisure: LeisurePlan,
    pub one_off_expenses: Vec<OneOff>,
}

impl Default for ExpenseFacts {
    fn default() -> Self {
        Self {
            living: LivingExpenses::default(),
            retirement_living_ratio: 0.8,
            housing: HousingPlan::default(),
            insurance: InsurancePlan::default(),
            car: Some(CarPlan::default()),
            leisure: LeisurePlan::default(),
            one_off_expenses: Vec::new(),
        }
    }
}

/// Monthly living costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LivingExpenses {
    pub food: f64,
    pub utilities: f64,
    pub communication: f64,
    pub daily_goods: f64,
    pub other: f64,
}

impl Default for LivingExpenses {
    fn default() -> Self {
        Self {
            food: 8.0,
            utilities: 2.5,
            communication: 1.5,
            daily_goods: 1.5,
            other: 4.0,
        }
    }
}

impl LivingExpenses {
    pub fn monthly_total(&self) -> f64 {
        self.food + self.utilities + self.communication + self.daily_goods + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum HousingPlan {
    #[serde(rename_all = "camelCase")]
    Own {
        #[serde(default)]
        mortgage: Option<MortgagePlan>,
        #[serde(default)]
        annual_maintenance: f64,
        #[serde(default)]
        annual_property_tax: f64,
    },
    #[serde(rename_all = "camelCase")]
    Rent {
        monthly_rent: f64,
        /// Renewal fee, in months of rent.
        #[serde(default)]
        renewal_fee_months: f64,
        #[serde(default)]
        renewal_interval_years: u32,
        #[serde(default)]
        purchase: Option<PurchasePlan>,
    },
}

impl Default for HousingPlan {
    fn default() -> Self {
        HousingPlan::Rent {
            monthly_rent: 12.0,
            renewal_fee_months: 1.0,
            renewal_interval_years: 2,
            purchase: Some(PurchasePlan::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MortgagePlan {
    pub principal: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    pub start_age: u32,
    #[serde(default)]
    pub method: RepaymentMethod,
}

/// Deferred home purchase while renting. Price and down payment are in
/// today's money and inflate up to the purchase year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PurchasePlan {
    pub age: u32,
    pub price: f64,
    pub down_payment: f64,
    /// Closing costs as a fraction of the price.
    pub closing_cost_ratio: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    pub method: RepaymentMethod,
    pub annual_maintenance: f64,
    pub annual_property_tax: f64,
}

impl Default for PurchasePlan {
    fn default() -> Self {
        Self {
            age: 40,
            price: 4500.0,
            down_payment: 500.0,
            closing_cost_ratio: 0.07,
            annual_rate: 0.008,
            term_years: 35,
            method: RepaymentMethod::EqualPayment,
            annual_maintenance: 24.0,
            annual_property_tax: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsurancePlan {
    pub monthly_life: f64,
    pub monthly_medical: f64,
    /// First age with no premiums.
    pub end_age: u32,
}

impl Default for InsurancePlan {
    fn default() -> Self {
        Self {
            monthly_life: 1.2,
            monthly_medical: 0.5,
            end_age: 65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarPlan {
    pub price: f64,
    pub replacement_years: u32,
    pub first_purchase_age: u32,
    pub last_purchase_age: u32,
    pub annual_upkeep: f64,
    /// First age with no upkeep cost.
    pub upkeep_end_age: u32,
}

impl Default for CarPlan {
    fn default() -> Self {
        Self {
            price: 300.0,
            replacement_years: 10,
            first_purchase_age: 38,
            last_purchase_age: 68,
            annual_upkeep: 30.0,
            upkeep_end_age: 78,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeisurePlan {
    pub annual_travel: f64,
    pub annual_hobby: f64,
    pub end_age: u32,
}

impl Default for LeisurePlan {
    fn default() -> Self {
        Self {
            annual_travel: 30.0,
            annual_hobby: 12.0,
            end_age: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvestmentFacts {
    pub savings_balance: f64,
    pub investment_balance: f64,
    pub monthly_contribution: f64,
    /// First age with no contribution; defaults to the retirement age.
    pub contribution_end_age: Option<u32>,
    pub allocation: Vec<AllocationSlice>,
    pub withdrawal: WithdrawalPlan,
}

impl Default for InvestmentFacts {
    fn default() -> Self {
        Self {
            savings_balance: 600.0,
            investment_balance: 400.0,
            monthly_contribution: 5.0,
            contribution_end_age: None,
            allocation: vec![
                AllocationSlice {
                    asset_class: "Global equity".to_string(),
                    weight: 0.6,
                    expected_return: 0.06,
                    volatility: 0.18,
                },
                AllocationSlice {
                    asset_class: "Domestic bonds".to_string(),
                    weight: 0.3,
                    expected_return: 0.01,
                    volatility: 0.03,
                },
                AllocationSlice {
                    asset_class: "REIT".to_string(),
                    weight: 0.1,
                    expected_return: 0.04,
                    volatility: 0.2,
                },
            ],
            withdrawal: WithdrawalPlan::default(),
        }
    }
}

impl InvestmentFacts {
    pub fn initial_total(&self) -> f64 {
        self.savings_balance + self.investment_balance
    }

    /// Weight-averaged expected return; zero when no weight is positive.
    pub fn weighted_return(&self) -> f64 {
        self.weighted(|slice| slice.expected_return)
    }

    /// Weight-averaged volatility, ignoring correlation between classes.
    pub fn weighted_volatility(&self) -> f64 {
        self.weighted(|slice| slice.volatility)
    }

    fn weighted(&self, field: impl Fn(&AllocationSlice) -> f64) -> f64 {
        let total_weight: f64 = self.allocation.iter().map(|s| s.weight.max(0.0)).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        self.allocation
            .iter()
            .map(|s| s.weight.max(0.0) * field(s))
            .sum::<f64>()
            / total_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub asset_class: String,
    pub weight: f64,
    pub expected_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WithdrawalPlan {
    pub method: WithdrawalMethod,
    pub start_age: u32,
}

impl Default for WithdrawalPlan {
    fn default() -> Self {
        Self {
            method: WithdrawalMethod::ShortfallOnly,
            start_age: 65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioFacts {
    pub inflation_rate: f64,
    pub return_source: ReturnSource,
    /// Return offset of the optimistic and pessimistic scenarios.
    pub spread: f64,
    pub optimistic_return: Option<f64>,
    pub pessimistic_return: Option<f64>,
    pub pension_reduction: bool,
    pub pension_cut_ratio: f64,
    pub apply_pension_cut_to_standard: bool,
    /// Monte Carlo volatility; the allocation's weighted volatility if unset.
    pub volatility: Option<f64>,
    /// Zero disables the Monte Carlo pass.
    pub monte_carlo_trials: u32,
    pub seed: u64,
}

impl Default for ScenarioFacts {
    fn default() -> Self {
        Self {
            inflation_rate: 0.01,
            return_source: ReturnSource::Allocation,
            spread: 0.02,
            optimistic_return: None,
            pessimistic_return: None,
            pension_reduction: true,
            pension_cut_ratio: 0.2,
            apply_pension_cut_to_standard: false,
            volatility: None,
            monte_carlo_trials: 1_000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LifeEvent {
    Retirement,
    ReemploymentEnd,
    SpouseRetirement,
    PensionStart,
    SpousePensionStart,
    ChildBorn { child: usize },
    SchoolEntry { child: usize, tier: SchoolTier },
    HomePurchase,
    MortgagePaidOff,
    CarReplacement,
    Custom { label: String },
    Insolvency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRecord {
    pub age: u32,
    pub spouse_age: Option<u32>,

    pub salary: f64,
    pub spouse_salary: f64,
    pub pension: f64,
    pub spouse_pension: f64,
    pub side_income: f64,
    pub one_off_income: f64,
    /// Drawn from invested assets to cover a savings shortfall.
    pub investment_withdrawal: f64,
    pub total_income: f64,

    pub living_expense: f64,
    pub housing_expense: f64,
    pub education_expense: f64,
    pub car_expense: f64,
    pub insurance_expense: f64,
    pub leisure_expense: f64,
    pub one_off_expense: f64,
    pub total_expense: f64,

    pub social_insurance: f64,
    pub income_tax: f64,
    pub resident_tax: f64,
    pub total_tax: f64,

    /// Income minus taxes, premiums and expenses, before any withdrawal.
    pub net_cashflow: f64,
    /// Net cash flow with the shortfall draw added back.
    pub net_income: f64,
    pub contribution: f64,
    pub planned_withdrawal: f64,
    pub investment_return: f64,

    pub savings_start: f64,
    pub investment_start: f64,
    pub savings_balance: f64,
    pub investment_balance: f64,
    pub total_assets: f64,
    /// True negative total in the year assets ran out, zero otherwise.
    pub unfunded_deficit: f64,
    pub mortgage_balance: f64,

    pub events: Vec<LifeEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub kind: ScenarioKind,
    pub return_rate: f64,
    pub records: Vec<YearlyRecord>,
    pub lifetime_income: f64,
    pub lifetime_expense: f64,
    pub lifetime_tax: f64,
    pub peak_assets: f64,
    pub peak_age: u32,
    pub final_assets: f64,
    pub insolvency_age: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub age: u32,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub trials: u32,
    pub mean_return: f64,
    pub volatility: f64,
    pub bands: Vec<PercentileBand>,
    /// Percentage of trials that never ran out of money.
    pub success_rate: f64,
    pub failed_trials: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub optimistic: ScenarioResult,
    pub standard: ScenarioResult,
    pub pessimistic: ScenarioResult,
    pub monte_carlo: Option<MonteCarloResult>,
}
