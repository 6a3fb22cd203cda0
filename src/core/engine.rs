use super::amortization::{monthly_interest, monthly_payment};
use super::types::{DeductionPolicy, MonthlyDataPoint, RateBandPolicy, SimulationParameters};

/// Month of each 12-month cycle on which the annual tax benefit is settled.
const TAX_SETTLEMENT_MONTH: u32 = 6;

const RENT_CONTRACT_MONTHS: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub points: Vec<MonthlyDataPoint>,
    pub final_loan_balance: f64,
    pub final_buy_invest_asset: f64,
    pub final_rent_invest_asset: f64,
    pub final_rent_carry_over: f64,
}

#[derive(Debug)]
struct MonthlyState {
    loan_balance: f64,
    balance_at_year_end: f64,
    buy_invest_asset: f64,
    rent_invest_asset: f64,
    rent_carry_over: f64,
}

#[derive(Debug, Clone, Copy)]
struct LoanStep {
    payment: f64,
    balance: f64,
}

#[derive(Debug, Clone, Copy)]
struct RentMonth {
    rent: f64,
    one_time_charges: f64,
}

impl RentMonth {
    fn total(self) -> f64 {
        self.rent + self.one_time_charges
    }
}

pub fn project(params: &SimulationParameters) -> Projection {
    let months = params.horizon_months();
    let loan_months = params.loan_months();
    let mir = params.monthly_investment_rate();
    let principal = params.loan_principal();

    let mut state = MonthlyState {
        loan_balance: principal,
        balance_at_year_end: principal,
        buy_invest_asset: 0.0,
        rent_invest_asset: params.down_payment,
        rent_carry_over: 0.0,
    };
    let mut points = Vec::with_capacity(months as usize);

    for m in 1..=months {
        let year = m.div_ceil(12);
        let rate = interest_rate_for_year(params, year);

        let loan = step_loan(state.loan_balance, rate, loan_months.saturating_sub(m - 1));
        state.loan_balance = loan.balance;

        let management_fee = management_fee_for_year(params, year);
        let buy_monthly_cost = loan.payment + management_fee;

        let tax_benefit = if m % 12 == TAX_SETTLEMENT_MONTH {
            annual_tax_benefit(params, year, state.balance_at_year_end)
        } else {
            0.0
        };
        state.buy_invest_asset = (state.buy_invest_asset + tax_benefit) * (1.0 + mir);

        let rent = rent_for_month(params, m);
        let investable = buy_monthly_cost - rent.total() + state.rent_carry_over;
        if investable >= 0.0 {
            state.rent_invest_asset = state.rent_invest_asset * (1.0 + mir) + investable;
            state.rent_carry_over = 0.0;
        } else {
            state.rent_invest_asset *= 1.0 + mir;
            state.rent_carry_over = investable;
        }

        if m % 12 == 0 {
            state.balance_at_year_end = state.loan_balance;
        }

        let property_value = params.property_value_at(m as f64 / 12.0);
        points.push(MonthlyDataPoint {
            month: m,
            year: m as f64 / 12.0,
            interest_rate: rate,
            loan_payment: loan.payment,
            management_fee,
            buy_monthly_cost,
            rent_monthly: rent.rent,
            rent_one_time_charges: rent.one_time_charges,
            tax_benefit,
            loan_balance: state.loan_balance,
            buy_invest_asset: state.buy_invest_asset,
            rent_invest_asset: state.rent_invest_asset,
            rent_carry_over: state.rent_carry_over,
            buy_net_worth: property_value - state.loan_balance + state.buy_invest_asset,
            rent_net_worth: state.rent_invest_asset,
            property_value,
        });
    }

    Projection {
        points,
        final_loan_balance: state.loan_balance,
        final_buy_invest_asset: state.buy_invest_asset,
        final_rent_invest_asset: state.rent_invest_asset,
        final_rent_carry_over: state.rent_carry_over,
    }
}

/// Annual rate (percent) in force during 1-based `year`.
pub fn interest_rate_for_year(params: &SimulationParameters, year: u32) -> f64 {
    let band = match params.rate_band_policy {
        RateBandPolicy::FixedYearBands => match year {
            0..=3 => 0,
            4..=6 => 1,
            _ => 2,
        },
        RateBandPolicy::EqualThirdsOfHorizon => {
            let horizon = params.horizon_years.max(1);
            ((year.saturating_sub(1) * 3 / horizon) as usize).min(2)
        }
    };
    params.interest_rates[band]
}

pub fn management_fee_for_year(params: &SimulationParameters, year: u32) -> f64 {
    if year <= params.management_tier_years {
        params.management_fee_initial
    } else {
        params.management_fee_later
    }
}

/// Deduction granted for `year`, before netting against fixed-asset tax.
pub fn mortgage_deduction(
    params: &SimulationParameters,
    year: u32,
    balance_at_year_end: f64,
) -> f64 {
    if year > params.deduction_years {
        return 0.0;
    }
    match params.deduction_policy {
        DeductionPolicy::FlatAnnualAmount { amount } => amount,
        DeductionPolicy::PercentOfBalanceCapped { rate, annual_cap } => {
            (balance_at_year_end.max(0.0) * rate / 100.0).min(annual_cap)
        }
    }
}

fn annual_tax_benefit(
    params: &SimulationParameters,
    year: u32,
    balance_at_year_end: f64,
) -> f64 {
    mortgage_deduction(params, year, balance_at_year_end) - params.fixed_asset_tax
}

fn step_loan(balance: f64, rate: f64, remaining_months: u32) -> LoanStep {
    if remaining_months == 0 {
        return LoanStep {
            payment: 0.0,
            balance,
        };
    }
    let payment = monthly_payment(balance, rate, remaining_months);
    let balance = if remaining_months == 1 {
        0.0
    } else {
        (balance - (payment - monthly_interest(balance, rate))).max(0.0)
    };
    LoanStep { payment, balance }
}

fn rent_for_month(params: &SimulationParameters, month: u32) -> RentMonth {
    let contract = (month - 1) / RENT_CONTRACT_MONTHS;
    let rent = params.rent_start + contract as f64 * params.rent_increase;

    let one_time_charges = if month == 1 {
        params.rent_start * params.rent_deposit_months + params.relocation_cost
    } else if (month - 1) % RENT_CONTRACT_MONTHS == 0 {
        rent * params.renewal_fee_months + params.relocation_cost
    } else {
        0.0
    };

    RentMonth {
        rent,
        one_time_charges,
    }
}
