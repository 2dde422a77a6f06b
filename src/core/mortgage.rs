//! Mortgage amortization on a monthly schedule, reported per year.

use super::types::RepaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub principal: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    pub method: RepaymentMethod,
}

impl LoanTerms {
    fn months(&self) -> u32 {
        self.term_years * 12
    }

    fn monthly_rate(&self) -> f64 {
        self.annual_rate / 12.0
    }

    fn is_degenerate(&self) -> bool {
        self.principal <= 0.0 || self.term_years == 0
    }

    fn level_monthly_payment(&self) -> f64 {
        let r = self.monthly_rate();
        let n = self.months() as f64;
        if r.abs() < 1e-12 {
            return self.principal / n;
        }
        let growth = (1.0 + r).powf(n);
        self.principal * r * growth / (growth - 1.0)
    }
}

/// Total paid during year `elapsed_years` of the loan (0 = first year).
pub fn annual_payment(loan: &LoanTerms, elapsed_years: u32) -> f64 {
    if loan.is_degenerate() || elapsed_years >= loan.term_years {
        return 0.0;
    }
    if loan.monthly_rate().abs() < 1e-12 {
        return loan.principal / loan.term_years as f64;
    }

    match loan.method {
        RepaymentMethod::EqualPayment => loan.level_monthly_payment() * 12.0,
        RepaymentMethod::EqualPrincipal => {
            let r = loan.monthly_rate();
            let slice = loan.principal / loan.months() as f64;
            let first = elapsed_years * 12;
            (first..first + 12)
                .map(|month| slice + (loan.principal - slice * month as f64) * r)
                .sum()
        }
    }
}

/// Outstanding principal at the start of year `elapsed_years`.
pub fn remaining_balance(loan: &LoanTerms, elapsed_years: u32) -> f64 {
    if loan.is_degenerate() {
        return 0.0;
    }
    let n = loan.months();
    let k = elapsed_years.saturating_mul(12).min(n) as f64;
    let r = loan.monthly_rate();

    let balance = match loan.method {
        _ if r.abs() < 1e-12 => loan.principal - loan.principal * k / n as f64,
        RepaymentMethod::EqualPayment => {
            let growth = (1.0 + r).powf(k);
            loan.principal * growth - loan.level_monthly_payment() * (growth - 1.0) / r
        }
        RepaymentMethod::EqualPrincipal => loan.principal - loan.principal / n as f64 * k,
    };
    balance.max(0.0)
}

/// Principal repaid in each year of the term.
pub fn principal_schedule(loan: &LoanTerms) -> Vec<f64> {
    (0..loan.term_years)
        .map(|year| remaining_balance(loan, year) - remaining_balance(loan, year + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn loan(method: RepaymentMethod) -> LoanTerms {
        LoanTerms {
            principal: 3000.0,
            annual_rate: 0.01,
            term_years: 35,
            method,
        }
    }

    #[test]
    fn equal_payment_matches_the_annuity_formula() {
        let l = loan(RepaymentMethod::EqualPayment);
        assert_approx_tol(annual_payment(&l, 0), 101.622_851, EPS);
        assert_approx_tol(annual_payment(&l, 34), annual_payment(&l, 0), EPS);
    }

    #[test]
    fn equal_principal_declines_over_time() {
        let l = loan(RepaymentMethod::EqualPrincipal);
        assert_approx_tol(annual_payment(&l, 0), 115.321_428, EPS);
        let mut previous = f64::INFINITY;
        for year in 0..35 {
            let payment = annual_payment(&l, year);
            assert!(payment < previous);
            previous = payment;
        }
    }

    #[test]
    fn payments_stop_outside_the_term() {
        for method in [RepaymentMethod::EqualPayment, RepaymentMethod::EqualPrincipal] {
            let l = loan(method);
            assert_eq!(annual_payment(&l, 35), 0.0);
            assert_eq!(annual_payment(&l, 80), 0.0);
            assert_approx_tol(remaining_balance(&l, 35), 0.0, EPS);
        }
    }

    #[test]
    fn zero_rate_degenerates_to_straight_line() {
        for method in [RepaymentMethod::EqualPayment, RepaymentMethod::EqualPrincipal] {
            let l = LoanTerms {
                annual_rate: 0.0,
                ..loan(method)
            };
            assert_approx_tol(annual_payment(&l, 0), 3000.0 / 35.0, EPS);
            assert_approx_tol(annual_payment(&l, 20), 3000.0 / 35.0, EPS);
            assert_approx_tol(remaining_balance(&l, 10), 3000.0 * 25.0 / 35.0, EPS);
        }
    }

    #[test]
    fn degenerate_loans_cost_nothing() {
        let zero_term = LoanTerms {
            term_years: 0,
            ..loan(RepaymentMethod::EqualPayment)
        };
        let zero_principal = LoanTerms {
            principal: 0.0,
            ..loan(RepaymentMethod::EqualPrincipal)
        };
        assert_eq!(annual_payment(&zero_term, 0), 0.0);
        assert_eq!(annual_payment(&zero_principal, 0), 0.0);
        assert!(principal_schedule(&zero_term).is_empty());
    }

    #[test]
    fn equal_payment_interest_exceeds_equal_principal_interest() {
        let level: f64 = (0..35)
            .map(|y| annual_payment(&loan(RepaymentMethod::EqualPayment), y))
            .sum();
        let declining: f64 = (0..35)
            .map(|y| annual_payment(&loan(RepaymentMethod::EqualPrincipal), y))
            .sum();
        assert!(level > declining);
        assert!(declining > 3000.0);
    }

    proptest! {
        #[test]
        fn prop_principal_components_sum_to_principal(
            principal in 1u32..20_000,
            rate_bp in 0u32..800,
            term in 1u32..50,
            equal_principal in proptest::bool::ANY
        ) {
            let l = LoanTerms {
                principal: principal as f64,
                annual_rate: rate_bp as f64 / 10_000.0,
                term_years: term,
                method: if equal_principal {
                    RepaymentMethod::EqualPrincipal
                } else {
                    RepaymentMethod::EqualPayment
                },
            };
            let repaid: f64 = principal_schedule(&l).iter().sum();
            prop_assert!((repaid - l.principal).abs() <= 1e-6 * l.principal.max(1.0));
        }

        #[test]
        fn prop_payments_cover_at_least_the_principal(
            principal in 1u32..20_000,
            rate_bp in 0u32..800,
            term in 1u32..50
        ) {
            let l = LoanTerms {
                principal: principal as f64,
                annual_rate: rate_bp as f64 / 10_000.0,
                term_years: term,
                method: RepaymentMethod::EqualPrincipal,
            };
            let paid: f64 = (0..term).map(|y| annual_payment(&l, y)).sum();
            prop_assert!(paid + 1e-6 >= l.principal);
        }
    }
}
