use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    BreakEvenBracket, DEFAULT_DEDUCTION_CAP, DEFAULT_DEDUCTION_RATE, DEFAULT_MORTGAGE_DEDUCTION,
    DEFAULT_PARAMETERS, DeductionPolicy, MonthlyDataPoint, RateBandPolicy, SimulationError,
    SimulationParameters, SimulationResult, Verdict, run_simulation, validate_parameters,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRateBandPolicy {
    FixedYearBands,
    EqualThirds,
}

impl From<CliRateBandPolicy> for RateBandPolicy {
    fn from(value: CliRateBandPolicy) -> Self {
        match value {
            CliRateBandPolicy::FixedYearBands => RateBandPolicy::FixedYearBands,
            CliRateBandPolicy::EqualThirds => RateBandPolicy::EqualThirdsOfHorizon,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDeductionPolicy {
    Flat,
    PercentOfBalance,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRateBandPolicy {
    #[serde(alias = "fixedYearBands", alias = "fixed_year_bands", alias = "fixed")]
    FixedYearBands,
    #[serde(
        alias = "equalThirds",
        alias = "equal_thirds",
        alias = "equal-thirds-of-horizon",
        alias = "equalThirdsOfHorizon"
    )]
    EqualThirds,
}

impl From<ApiRateBandPolicy> for CliRateBandPolicy {
    fn from(value: ApiRateBandPolicy) -> Self {
        match value {
            ApiRateBandPolicy::FixedYearBands => CliRateBandPolicy::FixedYearBands,
            ApiRateBandPolicy::EqualThirds => CliRateBandPolicy::EqualThirds,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDeductionPolicy {
    #[serde(alias = "flatAnnualAmount", alias = "flat_annual_amount")]
    Flat,
    #[serde(
        alias = "percentOfBalance",
        alias = "percent_of_balance",
        alias = "percentOfBalanceCapped"
    )]
    PercentOfBalance,
}

impl From<ApiDeductionPolicy> for CliDeductionPolicy {
    fn from(value: ApiDeductionPolicy) -> Self {
        match value {
            ApiDeductionPolicy::Flat => CliDeductionPolicy::Flat,
            ApiDeductionPolicy::PercentOfBalance => CliDeductionPolicy::PercentOfBalance,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    property_price: Option<f64>,
    #[serde(alias = "downPaymentRate")]
    transaction_cost_rate: Option<f64>,
    down_payment: Option<f64>,
    loan_years: Option<u32>,
    rate1: Option<f64>,
    rate2: Option<f64>,
    rate3: Option<f64>,
    rate_band_policy: Option<ApiRateBandPolicy>,

    #[serde(alias = "mgmt1")]
    management_fee_initial: Option<f64>,
    #[serde(alias = "mgmt2")]
    management_fee_later: Option<f64>,
    management_tier_years: Option<u32>,
    #[serde(alias = "fixedAssetTax")]
    fixed_tax: Option<f64>,
    deduction_policy: Option<ApiDeductionPolicy>,
    mortgage_deduction: Option<f64>,
    deduction_rate: Option<f64>,
    deduction_cap: Option<f64>,
    deduction_years: Option<u32>,

    sell_cost_rate: Option<f64>,
    capital_gains_exemption: Option<f64>,
    capital_gains_tax_rate: Option<f64>,

    rent_start: Option<f64>,
    #[serde(alias = "rentIncrease")]
    rent_hike: Option<f64>,
    rent_deposit: Option<f64>,
    renewal_fee: Option<f64>,
    relocation_cost: Option<f64>,

    #[serde(alias = "investmentReturn")]
    invest_return: Option<f64>,
    #[serde(alias = "horizonYears")]
    years: Option<u32>,
    #[serde(alias = "propertyGrowthRate")]
    final_price_growth_rate: Option<f64>,

    include_months: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "buyrent",
    about = "Buy-vs-rent net worth simulator with break-even resale price"
)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.property_price)]
    property_price: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.transaction_cost_rate,
        help = "Acquisition costs in percent of price, financed on top of the loan"
    )]
    transaction_cost_rate: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.down_payment)]
    down_payment: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.loan_years)]
    loan_years: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.interest_rates[0],
        help = "First-band annual loan rate in percent"
    )]
    rate_1: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.interest_rates[1],
        help = "Second-band annual loan rate in percent"
    )]
    rate_2: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.interest_rates[2],
        help = "Third-band annual loan rate in percent"
    )]
    rate_3: f64,
    #[arg(long, value_enum, default_value_t = CliRateBandPolicy::FixedYearBands)]
    rate_band_policy: CliRateBandPolicy,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.management_fee_initial)]
    management_fee_initial: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.management_fee_later)]
    management_fee_later: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.management_tier_years,
        help = "Years billed at the initial management fee"
    )]
    management_tier_years: u32,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.fixed_asset_tax)]
    fixed_asset_tax: f64,
    #[arg(long, value_enum, default_value_t = CliDeductionPolicy::Flat)]
    deduction_policy: CliDeductionPolicy,
    #[arg(
        long,
        default_value_t = DEFAULT_MORTGAGE_DEDUCTION,
        help = "Flat annual mortgage deduction, used with --deduction-policy=flat"
    )]
    mortgage_deduction: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_DEDUCTION_RATE,
        help = "Deduction in percent of the year-end loan balance"
    )]
    deduction_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_DEDUCTION_CAP,
        help = "Annual ceiling on the percentage deduction"
    )]
    deduction_cap: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.deduction_years)]
    deduction_years: u32,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.sell_cost_rate)]
    sell_cost_rate: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.capital_gains_exemption)]
    capital_gains_exemption: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.capital_gains_tax_rate)]
    capital_gains_tax_rate: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.rent_start)]
    rent_start: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.rent_increase,
        help = "Monthly rent added every 24 months"
    )]
    rent_increase: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.rent_deposit_months)]
    rent_deposit_months: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.renewal_fee_months)]
    renewal_fee_months: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.relocation_cost)]
    relocation_cost: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.investment_return,
        allow_negative_numbers = true
    )]
    investment_return: f64,
    #[arg(long, default_value_t = DEFAULT_PARAMETERS.horizon_years)]
    horizon_years: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_PARAMETERS.property_growth_rate,
        allow_negative_numbers = true
    )]
    property_growth_rate: f64,
    #[arg(long, help = "Print year-end rows only, without the monthly series")]
    yearly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct YearlyBreakdown {
    year: u32,
    buy_net_worth: f64,
    rent_net_worth: f64,
    property_value: f64,
    loan_balance: f64,
    loan_balance_neg: f64,
    buy_invest_asset: f64,
    rent_invest_asset: f64,
    buy_monthly_cost: f64,
    rent_monthly: f64,
}

impl From<&MonthlyDataPoint> for YearlyBreakdown {
    fn from(point: &MonthlyDataPoint) -> Self {
        Self {
            year: point.month / 12,
            buy_net_worth: point.buy_net_worth,
            rent_net_worth: point.rent_net_worth,
            property_value: point.property_value,
            loan_balance: point.loan_balance,
            loan_balance_neg: -point.loan_balance,
            buy_invest_asset: point.buy_invest_asset,
            rent_invest_asset: point.rent_invest_asset,
            buy_monthly_cost: point.buy_monthly_cost,
            rent_monthly: point.rent_monthly,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    parameters: SimulationParameters,
    verdict: Verdict,
    buy_final_net_worth: f64,
    rent_final_net_worth: f64,
    break_even_price: f64,
    break_even_growth_rate: f64,
    break_even_annual_rate: f64,
    break_even_bracket: BreakEvenBracket,
    loan_principal: f64,
    final_loan_balance: f64,
    final_property_value: f64,
    sale_cost: f64,
    capital_gains_tax: f64,
    buy_invest_asset: f64,
    rent_invest_asset: f64,
    rent_carry_over: f64,
    final_monthly_rent: f64,
    yearly: Vec<YearlyBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    month_series: Option<Vec<MonthlyDataPoint>>,
}

#[derive(Debug)]
struct ApiRequest {
    parameters: SimulationParameters,
    include_months: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_parameters(cli: &Cli) -> Result<SimulationParameters, String> {
    let deduction_policy = match cli.deduction_policy {
        CliDeductionPolicy::Flat => DeductionPolicy::FlatAnnualAmount {
            amount: cli.mortgage_deduction,
        },
        CliDeductionPolicy::PercentOfBalance => DeductionPolicy::PercentOfBalanceCapped {
            rate: cli.deduction_rate,
            annual_cap: cli.deduction_cap,
        },
    };

    let parameters = SimulationParameters {
        property_price: cli.property_price,
        transaction_cost_rate: cli.transaction_cost_rate,
        down_payment: cli.down_payment,
        loan_years: cli.loan_years,
        interest_rates: [cli.rate_1, cli.rate_2, cli.rate_3],
        rate_band_policy: cli.rate_band_policy.into(),
        management_fee_initial: cli.management_fee_initial,
        management_fee_later: cli.management_fee_later,
        management_tier_years: cli.management_tier_years,
        fixed_asset_tax: cli.fixed_asset_tax,
        deduction_policy,
        deduction_years: cli.deduction_years,
        sell_cost_rate: cli.sell_cost_rate,
        capital_gains_exemption: cli.capital_gains_exemption,
        capital_gains_tax_rate: cli.capital_gains_tax_rate,
        rent_start: cli.rent_start,
        rent_increase: cli.rent_increase,
        rent_deposit_months: cli.rent_deposit_months,
        renewal_fee_months: cli.renewal_fee_months,
        relocation_cost: cli.relocation_cost,
        investment_return: cli.investment_return,
        horizon_years: cli.horizon_years,
        property_growth_rate: cli.property_growth_rate,
    };

    validate_parameters(&parameters).map_err(|e| describe_error(&e))?;
    Ok(parameters)
}

fn flag_for_field(field: &str) -> String {
    match field {
        "interest_rates" => "--rate-1/--rate-2/--rate-3".to_string(),
        other => format!("--{}", other.replace('_', "-")),
    }
}

fn describe_error(err: &SimulationError) -> String {
    match err {
        SimulationError::InvalidParameter { field, reason } => {
            format!("{} {reason}", flag_for_field(field))
        }
        SimulationError::NonFinite { .. } => err.to_string(),
    }
}

pub fn run_cli<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let parameters = build_parameters(&cli)?;
    let result = run_simulation(&parameters).map_err(|e| describe_error(&e))?;
    let response = build_simulate_response(parameters, result, !cli.yearly);
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("Failed to encode result: {e}"))?;
    println!("{json}");
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "buy-vs-rent HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = match run_simulation(&request.parameters) {
        Ok(result) => result,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &describe_error(&err)),
    };

    let response = build_simulate_response(request.parameters, result, request.include_months);
    json_response(StatusCode::OK, response)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.property_price {
        cli.property_price = v;
    }
    if let Some(v) = payload.transaction_cost_rate {
        cli.transaction_cost_rate = v;
    }
    if let Some(v) = payload.down_payment {
        cli.down_payment = v;
    }
    if let Some(v) = payload.loan_years {
        cli.loan_years = v;
    }
    if let Some(v) = payload.rate1 {
        cli.rate_1 = v;
    }
    if let Some(v) = payload.rate2 {
        cli.rate_2 = v;
    }
    if let Some(v) = payload.rate3 {
        cli.rate_3 = v;
    }
    if let Some(v) = payload.rate_band_policy {
        cli.rate_band_policy = v.into();
    }

    if let Some(v) = payload.management_fee_initial {
        cli.management_fee_initial = v;
    }
    if let Some(v) = payload.management_fee_later {
        cli.management_fee_later = v;
    }
    if let Some(v) = payload.management_tier_years {
        cli.management_tier_years = v;
    }
    if let Some(v) = payload.fixed_tax {
        cli.fixed_asset_tax = v;
    }
    if let Some(v) = payload.deduction_policy {
        cli.deduction_policy = v.into();
    }
    if let Some(v) = payload.mortgage_deduction {
        cli.mortgage_deduction = v;
    }
    if let Some(v) = payload.deduction_rate {
        cli.deduction_rate = v;
    }
    if let Some(v) = payload.deduction_cap {
        cli.deduction_cap = v;
    }
    if let Some(v) = payload.deduction_years {
        cli.deduction_years = v;
    }

    if let Some(v) = payload.sell_cost_rate {
        cli.sell_cost_rate = v;
    }
    if let Some(v) = payload.capital_gains_exemption {
        cli.capital_gains_exemption = v;
    }
    if let Some(v) = payload.capital_gains_tax_rate {
        cli.capital_gains_tax_rate = v;
    }

    if let Some(v) = payload.rent_start {
        cli.rent_start = v;
    }
    if let Some(v) = payload.rent_hike {
        cli.rent_increase = v;
    }
    if let Some(v) = payload.rent_deposit {
        cli.rent_deposit_months = v;
    }
    if let Some(v) = payload.renewal_fee {
        cli.renewal_fee_months = v;
    }
    if let Some(v) = payload.relocation_cost {
        cli.relocation_cost = v;
    }

    if let Some(v) = payload.invest_return {
        cli.investment_return = v;
    }
    if let Some(v) = payload.years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.final_price_growth_rate {
        cli.property_growth_rate = v;
    }

    let parameters = build_parameters(&cli)?;
    Ok(ApiRequest {
        parameters,
        include_months: payload.include_months.unwrap_or(true),
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        property_price: DEFAULT_PARAMETERS.property_price,
        transaction_cost_rate: DEFAULT_PARAMETERS.transaction_cost_rate,
        down_payment: DEFAULT_PARAMETERS.down_payment,
        loan_years: DEFAULT_PARAMETERS.loan_years,
        rate_1: DEFAULT_PARAMETERS.interest_rates[0],
        rate_2: DEFAULT_PARAMETERS.interest_rates[1],
        rate_3: DEFAULT_PARAMETERS.interest_rates[2],
        rate_band_policy: CliRateBandPolicy::FixedYearBands,
        management_fee_initial: DEFAULT_PARAMETERS.management_fee_initial,
        management_fee_later: DEFAULT_PARAMETERS.management_fee_later,
        management_tier_years: DEFAULT_PARAMETERS.management_tier_years,
        fixed_asset_tax: DEFAULT_PARAMETERS.fixed_asset_tax,
        deduction_policy: CliDeductionPolicy::Flat,
        mortgage_deduction: DEFAULT_MORTGAGE_DEDUCTION,
        deduction_rate: DEFAULT_DEDUCTION_RATE,
        deduction_cap: DEFAULT_DEDUCTION_CAP,
        deduction_years: DEFAULT_PARAMETERS.deduction_years,
        sell_cost_rate: DEFAULT_PARAMETERS.sell_cost_rate,
        capital_gains_exemption: DEFAULT_PARAMETERS.capital_gains_exemption,
        capital_gains_tax_rate: DEFAULT_PARAMETERS.capital_gains_tax_rate,
        rent_start: DEFAULT_PARAMETERS.rent_start,
        rent_increase: DEFAULT_PARAMETERS.rent_increase,
        rent_deposit_months: DEFAULT_PARAMETERS.rent_deposit_months,
        renewal_fee_months: DEFAULT_PARAMETERS.renewal_fee_months,
        relocation_cost: DEFAULT_PARAMETERS.relocation_cost,
        investment_return: DEFAULT_PARAMETERS.investment_return,
        horizon_years: DEFAULT_PARAMETERS.horizon_years,
        property_growth_rate: DEFAULT_PARAMETERS.property_growth_rate,
        yearly: false,
    }
}

fn build_simulate_response(
    parameters: SimulationParameters,
    result: SimulationResult,
    include_months: bool,
) -> SimulateResponse {
    SimulateResponse {
        verdict: result.verdict(),
        yearly: result.yearly_points().map(YearlyBreakdown::from).collect(),
        buy_final_net_worth: result.buy_final_net_worth,
        rent_final_net_worth: result.rent_final_net_worth,
        break_even_price: result.break_even_price,
        break_even_growth_rate: result.break_even_growth_rate,
        break_even_annual_rate: result.break_even_annual_rate,
        break_even_bracket: result.break_even_bracket,
        loan_principal: result.loan_principal,
        final_loan_balance: result.final_loan_balance,
        final_property_value: result.final_property_value,
        sale_cost: result.sale_cost,
        capital_gains_tax: result.capital_gains_tax,
        buy_invest_asset: result.buy_invest_asset,
        rent_invest_asset: result.rent_invest_asset,
        rent_carry_over: result.rent_carry_over,
        final_monthly_rent: result.final_monthly_rent,
        month_series: include_months.then_some(result.month_series),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn default_cli_matches_default_parameters() {
        let parameters = build_parameters(&sample_cli()).expect("valid defaults");
        assert_eq!(parameters, DEFAULT_PARAMETERS);
    }

    #[test]
    fn clap_defaults_match_api_defaults() {
        let parsed = Cli::parse_from(["buyrent"]);
        let parameters = build_parameters(&parsed).expect("valid defaults");
        assert_eq!(parameters, DEFAULT_PARAMETERS);
        assert!(!parsed.yearly);
    }

    #[test]
    fn clap_parses_policies_and_negative_growth() {
        let parsed = Cli::parse_from([
            "buyrent",
            "--rate-band-policy",
            "equal-thirds",
            "--deduction-policy",
            "percent-of-balance",
            "--deduction-cap",
            "210000",
            "--property-growth-rate",
            "-1.5",
            "--yearly",
        ]);
        let parameters = build_parameters(&parsed).expect("valid inputs");
        assert_eq!(parameters.rate_band_policy, RateBandPolicy::EqualThirdsOfHorizon);
        assert_eq!(
            parameters.deduction_policy,
            DeductionPolicy::PercentOfBalanceCapped {
                rate: DEFAULT_DEDUCTION_RATE,
                annual_cap: 210_000.0,
            }
        );
        assert_approx(parameters.property_growth_rate, -1.5);
        assert!(parsed.yearly);
    }

    #[test]
    fn build_parameters_rejects_zero_loan_term() {
        let mut cli = sample_cli();
        cli.loan_years = 0;
        let err = build_parameters(&cli).expect_err("must reject zero loan term");
        assert!(err.contains("--loan-years"));
    }

    #[test]
    fn build_parameters_names_flag_for_core_validation() {
        let mut cli = sample_cli();
        cli.rent_start = -10.0;
        let err = build_parameters(&cli).expect_err("must reject negative rent");
        assert!(err.contains("--rent-start"), "{err}");

        let mut cli = sample_cli();
        cli.rate_2 = -0.5;
        let err = build_parameters(&cli).expect_err("must reject negative rate");
        assert!(err.contains("--rate-2"), "{err}");
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "propertyPrice": 90000000,
          "downPaymentRate": 6.5,
          "loanYears": 30,
          "rate1": 0.9,
          "rate2": 1.2,
          "rate3": 1.6,
          "rateBandPolicy": "equalThirds",
          "mgmt1": 35000,
          "mgmt2": 52000,
          "managementTierYears": 6,
          "fixedTax": 180000,
          "deductionPolicy": "percent-of-balance",
          "deductionRate": 0.7,
          "deductionCap": 280000,
          "sellCostRate": 3.5,
          "rentStart": 280000,
          "rentHike": 10000,
          "rentDeposit": 2,
          "renewalFee": 0.5,
          "relocationCost": 150000,
          "investReturn": 5,
          "years": 15,
          "finalPriceGrowthRate": -0.5,
          "includeMonths": false
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let p = request.parameters;

        assert_approx(p.property_price, 90_000_000.0);
        assert_approx(p.transaction_cost_rate, 6.5);
        assert_eq!(p.loan_years, 30);
        assert_eq!(p.interest_rates, [0.9, 1.2, 1.6]);
        assert_eq!(p.rate_band_policy, RateBandPolicy::EqualThirdsOfHorizon);
        assert_approx(p.management_fee_initial, 35_000.0);
        assert_approx(p.management_fee_later, 52_000.0);
        assert_eq!(p.management_tier_years, 6);
        assert_approx(p.fixed_asset_tax, 180_000.0);
        assert_eq!(
            p.deduction_policy,
            DeductionPolicy::PercentOfBalanceCapped {
                rate: 0.7,
                annual_cap: 280_000.0,
            }
        );
        assert_approx(p.sell_cost_rate, 3.5);
        assert_approx(p.rent_start, 280_000.0);
        assert_approx(p.rent_increase, 10_000.0);
        assert_approx(p.rent_deposit_months, 2.0);
        assert_approx(p.renewal_fee_months, 0.5);
        assert_approx(p.relocation_cost, 150_000.0);
        assert_approx(p.investment_return, 5.0);
        assert_eq!(p.horizon_years, 15);
        assert_approx(p.property_growth_rate, -0.5);
        assert!(!request.include_months);
    }

    #[test]
    fn api_request_from_json_defaults_when_empty() {
        let request = api_request_from_json("{}").expect("empty payload is valid");
        assert_eq!(request.parameters, DEFAULT_PARAMETERS);
        assert!(request.include_months);
    }

    #[test]
    fn api_request_from_json_rejects_invalid_horizon() {
        let err = api_request_from_json(r#"{"years": 0}"#).expect_err("zero horizon");
        assert!(err.contains("--horizon-years"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let parameters = build_parameters(&sample_cli()).expect("valid inputs");
        let result = run_simulation(&parameters).expect("valid run");
        let response = build_simulate_response(parameters, result, true);
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"verdict\""));
        assert!(json.contains("\"buyFinalNetWorth\""));
        assert!(json.contains("\"rentFinalNetWorth\""));
        assert!(json.contains("\"breakEvenPrice\""));
        assert!(json.contains("\"breakEvenAnnualRate\""));
        assert!(json.contains("\"breakEvenBracket\":\"interior\""));
        assert!(json.contains("\"loanBalanceNeg\""));
        assert!(json.contains("\"monthSeries\""));
        assert!(json.contains("\"rateBandPolicy\":\"fixed-year-bands\""));
    }

    #[test]
    fn yearly_breakdown_negates_loan_balance() {
        let parameters = build_parameters(&sample_cli()).expect("valid inputs");
        let result = run_simulation(&parameters).expect("valid run");
        let response = build_simulate_response(parameters, result, false);
        assert!(response.month_series.is_none());
        assert_eq!(response.yearly.len(), 10);
        for (idx, row) in response.yearly.iter().enumerate() {
            assert_eq!(row.year, idx as u32 + 1);
            assert_eq!(row.loan_balance_neg, -row.loan_balance);
        }
    }

    #[test]
    fn deduction_defaults_are_shared_by_cli_and_api() {
        let parsed = Cli::parse_from(["buyrent", "--deduction-policy", "percent-of-balance"]);
        let from_flags = build_parameters(&parsed).expect("valid inputs");

        let mut cli = sample_cli();
        cli.deduction_policy = CliDeductionPolicy::PercentOfBalance;
        let from_api = build_parameters(&cli).expect("valid inputs");

        let expected = DeductionPolicy::PercentOfBalanceCapped {
            rate: DEFAULT_DEDUCTION_RATE,
            annual_cap: DEFAULT_DEDUCTION_CAP,
        };
        assert_eq!(from_flags.deduction_policy, expected);
        assert_eq!(from_api.deduction_policy, expected);
    }

    #[test]
    fn query_string_uses_camel_case_keys_and_kebab_enums() {
        let uri: Uri = "http://localhost/api/simulate?propertyPrice=90000000&years=15\
                        &rateBandPolicy=equal-thirds&deductionPolicy=percent-of-balance\
                        &finalPriceGrowthRate=-0.5&includeMonths=false"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<SimulatePayload>::try_from_uri(&uri).expect("query parses");
        let request = api_request_from_payload(payload).expect("valid payload");

        assert_approx(request.parameters.property_price, 90_000_000.0);
        assert_eq!(request.parameters.horizon_years, 15);
        assert_eq!(
            request.parameters.rate_band_policy,
            RateBandPolicy::EqualThirdsOfHorizon
        );
        assert!(matches!(
            request.parameters.deduction_policy,
            DeductionPolicy::PercentOfBalanceCapped { .. }
        ));
        assert_approx(request.parameters.property_growth_rate, -0.5);
        assert!(!request.include_months);
    }

    #[tokio::test]
    async fn get_handler_runs_query_payload() {
        let uri: Uri = "http://localhost/api/simulate?years=5&includeMonths=false"
            .parse()
            .expect("valid uri");
        let query = Query::<SimulatePayload>::try_from_uri(&uri).expect("query parses");
        let response = simulate_get_handler(query).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&header::HeaderValue::from_static("application/json"))
        );
    }

    #[tokio::test]
    async fn handler_maps_invalid_payload_to_bad_request() {
        let payload = SimulatePayload {
            loan_years: Some(0),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
    }

    #[tokio::test]
    async fn handler_runs_default_payload() {
        let response = simulate_handler_impl(SimulatePayload::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
