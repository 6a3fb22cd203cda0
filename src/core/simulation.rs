use tracing::debug;

use super::engine::project;
use super::error::SimulationError;
use super::settlement::{SaleTerms, settle};
use super::solver::{PRICE_UPPER_BOUND_MULTIPLE, break_even_rates, solve_break_even};
use super::types::{DeductionPolicy, MonthlyDataPoint, SimulationParameters, SimulationResult};

pub const MAX_HORIZON_YEARS: u32 = 100;
pub const MAX_LOAN_YEARS: u32 = 100;
/// Ceiling on each annual interest rate, in percent.
pub const MAX_INTEREST_RATE: f64 = 100.0;

/// Validates, projects, settles and solves one parameter set.
pub fn run_simulation(
    params: &SimulationParameters,
) -> Result<SimulationResult, SimulationError> {
    validate_parameters(params)?;

    let projection = project(params);
    let settlement = settle(
        params,
        projection.final_loan_balance,
        projection.final_buy_invest_asset,
        projection.final_rent_invest_asset,
    );

    let terms = SaleTerms::new(
        params,
        projection.final_loan_balance,
        projection.final_buy_invest_asset,
    );
    let root = solve_break_even(
        |price| terms.net_worth_at_sale_price(price),
        settlement.rent_net_worth,
        params.property_price * PRICE_UPPER_BOUND_MULTIPLE,
    );
    let break_even = break_even_rates(root, params.property_price, params.horizon_years);

    let final_monthly_rent = projection
        .points
        .last()
        .map(|p| p.rent_monthly)
        .unwrap_or(params.rent_start);

    let result = SimulationResult {
        month_series: projection.points,
        buy_final_net_worth: settlement.buy_net_worth,
        rent_final_net_worth: settlement.rent_net_worth,
        break_even_price: break_even.price,
        break_even_growth_rate: break_even.growth_rate,
        break_even_annual_rate: break_even.annual_rate,
        break_even_bracket: break_even.bracket,
        loan_principal: params.loan_principal(),
        final_loan_balance: projection.final_loan_balance,
        final_property_value: settlement.final_property_value,
        sale_cost: settlement.sale_cost,
        capital_gains_tax: settlement.capital_gains_tax,
        buy_invest_asset: projection.final_buy_invest_asset,
        rent_invest_asset: projection.final_rent_invest_asset,
        rent_carry_over: projection.final_rent_carry_over,
        final_monthly_rent,
    };
    ensure_finite(&result)?;

    debug!(
        months = result.month_series.len(),
        buy = result.buy_final_net_worth,
        rent = result.rent_final_net_worth,
        break_even = result.break_even_price,
        "simulation complete"
    );
    Ok(result)
}

pub fn validate_parameters(params: &SimulationParameters) -> Result<(), SimulationError> {
    if params.loan_years == 0 || params.loan_years > MAX_LOAN_YEARS {
        return Err(SimulationError::invalid(
            "loan_years",
            format!("must be between 1 and {MAX_LOAN_YEARS}"),
        ));
    }
    if params.horizon_years == 0 || params.horizon_years > MAX_HORIZON_YEARS {
        return Err(SimulationError::invalid(
            "horizon_years",
            format!("must be between 1 and {MAX_HORIZON_YEARS}"),
        ));
    }
    if !params.property_price.is_finite() || params.property_price <= 0.0 {
        return Err(SimulationError::invalid("property_price", "must be > 0"));
    }

    for (field, amount) in [
        ("transaction_cost_rate", params.transaction_cost_rate),
        ("down_payment", params.down_payment),
        ("management_fee_initial", params.management_fee_initial),
        ("management_fee_later", params.management_fee_later),
        ("fixed_asset_tax", params.fixed_asset_tax),
        ("capital_gains_exemption", params.capital_gains_exemption),
        ("rent_start", params.rent_start),
        ("rent_increase", params.rent_increase),
        ("rent_deposit_months", params.rent_deposit_months),
        ("renewal_fee_months", params.renewal_fee_months),
        ("relocation_cost", params.relocation_cost),
    ] {
        non_negative(field, amount)?;
    }

    for (idx, rate) in params.interest_rates.iter().enumerate() {
        if !(0.0..=MAX_INTEREST_RATE).contains(rate) {
            return Err(SimulationError::invalid(
                "interest_rates",
                format!(
                    "rate {} must be between 0 and {MAX_INTEREST_RATE}, got {rate}",
                    idx + 1
                ),
            ));
        }
    }

    for (field, rate) in [
        ("investment_return", params.investment_return),
        ("property_growth_rate", params.property_growth_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(SimulationError::invalid(field, "must be finite and > -100"));
        }
    }

    for (field, rate) in [
        ("sell_cost_rate", params.sell_cost_rate),
        ("capital_gains_tax_rate", params.capital_gains_tax_rate),
    ] {
        if !(0.0..100.0).contains(&rate) {
            return Err(SimulationError::invalid(field, "must be in [0, 100)"));
        }
    }
    if params.sell_cost_rate + params.capital_gains_tax_rate >= 100.0 {
        return Err(SimulationError::invalid(
            "capital_gains_tax_rate",
            "sale cost and gains tax together must stay below 100%",
        ));
    }

    match params.deduction_policy {
        DeductionPolicy::FlatAnnualAmount { amount } => {
            non_negative("mortgage_deduction", amount)?
        }
        DeductionPolicy::PercentOfBalanceCapped { rate, annual_cap } => {
            non_negative("deduction_rate", rate)?;
            if annual_cap.is_nan() || annual_cap < 0.0 {
                return Err(SimulationError::invalid("deduction_cap", "must be >= 0"));
            }
        }
    }

    if params.down_payment > params.acquisition_cost() {
        return Err(SimulationError::invalid(
            "down_payment",
            "cannot exceed price plus transaction costs",
        ));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SimulationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::invalid(field, "must be finite and >= 0"));
    }
    Ok(())
}

fn ensure_finite(result: &SimulationResult) -> Result<(), SimulationError> {
    for (field, value) in [
        ("buy_final_net_worth", result.buy_final_net_worth),
        ("rent_final_net_worth", result.rent_final_net_worth),
        ("break_even_price", result.break_even_price),
        ("break_even_growth_rate", result.break_even_growth_rate),
        ("break_even_annual_rate", result.break_even_annual_rate),
        ("final_property_value", result.final_property_value),
    ] {
        if !value.is_finite() {
            return Err(SimulationError::NonFinite { field });
        }
    }
    result.month_series.iter().try_for_each(ensure_point_finite)
}

fn ensure_point_finite(point: &MonthlyDataPoint) -> Result<(), SimulationError> {
    for (field, value) in [
        ("month_series.interest_rate", point.interest_rate),
        ("month_series.loan_payment", point.loan_payment),
        ("month_series.management_fee", point.management_fee),
        ("month_series.buy_monthly_cost", point.buy_monthly_cost),
        ("month_series.rent_monthly", point.rent_monthly),
        ("month_series.rent_one_time_charges", point.rent_one_time_charges),
        ("month_series.tax_benefit", point.tax_benefit),
        ("month_series.loan_balance", point.loan_balance),
        ("month_series.buy_invest_asset", point.buy_invest_asset),
        ("month_series.rent_invest_asset", point.rent_invest_asset),
        ("month_series.rent_carry_over", point.rent_carry_over),
        ("month_series.buy_net_worth", point.buy_net_worth),
        ("month_series.rent_net_worth", point.rent_net_worth),
        ("month_series.property_value", point.property_value),
    ] {
        if !value.is_finite() {
            return Err(SimulationError::NonFinite { field });
        }
    }
    Ok(())
}
