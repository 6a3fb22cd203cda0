use serde::Serialize;

/// How the three annual interest rates are spread over the simulated years.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateBandPolicy {
    /// Years 1-3, 4-6 and 7 onwards.
    FixedYearBands,
    /// The horizon cut into three contiguous bands of (nearly) equal length.
    EqualThirdsOfHorizon,
}

/// How the annual mortgage-interest tax deduction is computed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum DeductionPolicy {
    FlatAnnualAmount {
        amount: f64,
    },
    /// `rate` percent of the loan balance at the previous year end, capped at `annual_cap`.
    #[serde(rename_all = "camelCase")]
    PercentOfBalanceCapped {
        rate: f64,
        annual_cap: f64,
    },
}

/// Full input record of one run. Rates are in percent, money in the base unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub property_price: f64,
    pub transaction_cost_rate: f64,
    pub down_payment: f64,
    pub loan_years: u32,
    pub interest_rates: [f64; 3],
    pub rate_band_policy: RateBandPolicy,
    pub management_fee_initial: f64,
    pub management_fee_later: f64,
    pub management_tier_years: u32,
    pub fixed_asset_tax: f64,
    pub deduction_policy: DeductionPolicy,
    pub deduction_years: u32,
    pub sell_cost_rate: f64,
    pub capital_gains_exemption: f64,
    pub capital_gains_tax_rate: f64,
    pub rent_start: f64,
    pub rent_increase: f64,
    pub rent_deposit_months: f64,
    pub renewal_fee_months: f64,
    pub relocation_cost: f64,
    pub investment_return: f64,
    pub horizon_years: u32,
    pub property_growth_rate: f64,
}

/// Flat annual deduction used by the default policy.
pub const DEFAULT_MORTGAGE_DEDUCTION: f64 = 315_000.0;
/// Percent of the year-end balance used when switching to the percentage policy.
pub const DEFAULT_DEDUCTION_RATE: f64 = 0.7;
pub const DEFAULT_DEDUCTION_CAP: f64 = 315_000.0;

pub const DEFAULT_PARAMETERS: SimulationParameters = SimulationParameters {
    property_price: 140_000_000.0,
    transaction_cost_rate: 7.0,
    down_payment: 0.0,
    loan_years: 35,
    interest_rates: [1.5, 1.75, 2.0],
    rate_band_policy: RateBandPolicy::FixedYearBands,
    management_fee_initial: 40_000.0,
    management_fee_later: 60_000.0,
    management_tier_years: 5,
    fixed_asset_tax: 200_000.0,
    deduction_policy: DeductionPolicy::FlatAnnualAmount {
        amount: DEFAULT_MORTGAGE_DEDUCTION,
    },
    deduction_years: 10,
    sell_cost_rate: 4.0,
    capital_gains_exemption: 30_000_000.0,
    capital_gains_tax_rate: 20.315,
    rent_start: 330_000.0,
    rent_increase: 15_000.0,
    rent_deposit_months: 1.0,
    renewal_fee_months: 1.0,
    relocation_cost: 0.0,
    investment_return: 7.0,
    horizon_years: 10,
    property_growth_rate: 0.43,
};

impl Default for SimulationParameters {
    fn default() -> Self {
        DEFAULT_PARAMETERS
    }
}

impl SimulationParameters {
    /// Price plus financed transaction costs; the cost basis for capital gains.
    pub fn acquisition_cost(&self) -> f64 {
        self.property_price * (1.0 + self.transaction_cost_rate / 100.0)
    }

    pub fn loan_principal(&self) -> f64 {
        self.acquisition_cost() - self.down_payment
    }

    pub fn horizon_months(&self) -> u32 {
        self.horizon_years * 12
    }

    pub fn loan_months(&self) -> u32 {
        self.loan_years * 12
    }

    /// Property value after `elapsed_years`, compounding on fractional years.
    pub fn property_value_at(&self, elapsed_years: f64) -> f64 {
        self.property_price * (1.0 + self.property_growth_rate / 100.0).powf(elapsed_years)
    }

    pub fn monthly_investment_rate(&self) -> f64 {
        (1.0 + self.investment_return / 100.0).powf(1.0 / 12.0) - 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDataPoint {
    pub month: u32,
    pub year: f64,
    pub interest_rate: f64,
    pub loan_payment: f64,
    pub management_fee: f64,
    pub buy_monthly_cost: f64,
    pub rent_monthly: f64,
    pub rent_one_time_charges: f64,
    pub tax_benefit: f64,
    pub loan_balance: f64,
    pub buy_invest_asset: f64,
    pub rent_invest_asset: f64,
    pub rent_carry_over: f64,
    pub buy_net_worth: f64,
    pub rent_net_worth: f64,
    pub property_value: f64,
}

/// Where the break-even root landed relative to the search interval.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakEvenBracket {
    Interior,
    /// Buying already matches renting at a sale price of zero.
    PinnedLow,
    /// Buying never catches up within the search interval.
    PinnedHigh,
}

impl BreakEvenBracket {
    pub fn is_pinned(self) -> bool {
        self != BreakEvenBracket::Interior
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Buy,
    Rent,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub winner: Strategy,
    pub advantage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub month_series: Vec<MonthlyDataPoint>,
    pub buy_final_net_worth: f64,
    pub rent_final_net_worth: f64,
    pub break_even_price: f64,
    pub break_even_growth_rate: f64,
    pub break_even_annual_rate: f64,
    pub break_even_bracket: BreakEvenBracket,
    pub loan_principal: f64,
    pub final_loan_balance: f64,
    pub final_property_value: f64,
    pub sale_cost: f64,
    pub capital_gains_tax: f64,
    pub buy_invest_asset: f64,
    pub rent_invest_asset: f64,
    pub rent_carry_over: f64,
    pub final_monthly_rent: f64,
}

impl SimulationResult {
    /// Year-end points only (`month % 12 == 0`).
    pub fn yearly_points(&self) -> impl Iterator<Item = &MonthlyDataPoint> {
        self.month_series.iter().filter(|p| p.month % 12 == 0)
    }

    /// Ties go to buying.
    pub fn verdict(&self) -> Verdict {
        let winner = if self.buy_final_net_worth >= self.rent_final_net_worth {
            Strategy::Buy
        } else {
            Strategy::Rent
        };
        Verdict {
            winner,
            advantage: (self.buy_final_net_worth - self.rent_final_net_worth).abs(),
        }
    }
}
