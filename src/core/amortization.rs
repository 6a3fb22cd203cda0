/// Monthly rates below this are repaid in straight-line installments.
const NEGLIGIBLE_MONTHLY_RATE: f64 = 1e-15;

/// Equal-installment payment for `balance` over `remaining_months` at
/// `annual_rate_percent`. A zero term owes nothing.
///
/// Evaluated as `B·r / (1 − (1+r)^−n)` through `ln_1p`/`exp_m1`, which stays
/// finite for long terms and keeps precision for tiny rates.
pub fn monthly_payment(balance: f64, annual_rate_percent: f64, remaining_months: u32) -> f64 {
    if remaining_months == 0 {
        return 0.0;
    }
    let n = remaining_months as f64;
    let r = annual_rate_percent / 100.0 / 12.0;
    if r.abs() < NEGLIGIBLE_MONTHLY_RATE {
        return balance / n;
    }
    let discounted = -(-n * r.ln_1p()).exp_m1();
    balance * r / discounted
}

/// Interest accrued on `balance` for one month.
pub fn monthly_interest(balance: f64, annual_rate_percent: f64) -> f64 {
    balance * annual_rate_percent / 1200.0
}
