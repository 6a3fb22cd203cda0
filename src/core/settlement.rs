use super::types::SimulationParameters;

/// Everything about the sale that stays fixed while the sale price varies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleTerms {
    pub acquisition_cost: f64,
    pub sell_cost_rate: f64,
    pub capital_gains_exemption: f64,
    pub capital_gains_tax_rate: f64,
    pub final_loan_balance: f64,
    pub final_buy_invest_asset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub final_property_value: f64,
    pub sale_cost: f64,
    pub capital_gains_tax: f64,
    pub buy_net_worth: f64,
    pub rent_net_worth: f64,
}

impl SaleTerms {
    pub fn new(
        params: &SimulationParameters,
        final_loan_balance: f64,
        final_buy_invest_asset: f64,
    ) -> Self {
        Self {
            acquisition_cost: params.acquisition_cost(),
            sell_cost_rate: params.sell_cost_rate,
            capital_gains_exemption: params.capital_gains_exemption,
            capital_gains_tax_rate: params.capital_gains_tax_rate,
            final_loan_balance,
            final_buy_invest_asset,
        }
    }

    pub fn sale_cost(&self, sale_price: f64) -> f64 {
        sale_price * self.sell_cost_rate / 100.0
    }

    /// Tax on the gain over acquisition cost, after the exemption.
    pub fn capital_gains_tax(&self, sale_price: f64) -> f64 {
        let taxable_gain =
            (sale_price - self.acquisition_cost - self.capital_gains_exemption).max(0.0);
        taxable_gain * self.capital_gains_tax_rate / 100.0
    }

    pub fn net_worth_at_sale_price(&self, sale_price: f64) -> f64 {
        sale_price - self.sale_cost(sale_price) - self.final_loan_balance
            - self.capital_gains_tax(sale_price)
            + self.final_buy_invest_asset
    }
}

pub fn settle(
    params: &SimulationParameters,
    final_loan_balance: f64,
    final_buy_invest_asset: f64,
    final_rent_invest_asset: f64,
) -> Settlement {
    let terms = SaleTerms::new(params, final_loan_balance, final_buy_invest_asset);
    let final_property_value = params.property_value_at(params.horizon_years as f64);
    Settlement {
        final_property_value,
        sale_cost: terms.sale_cost(final_property_value),
        capital_gains_tax: terms.capital_gains_tax(final_property_value),
        buy_net_worth: terms.net_worth_at_sale_price(final_property_value),
        rent_net_worth: final_rent_invest_asset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DEFAULT_PARAMETERS;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn gain_within_exemption_is_untaxed() {
        let params = DEFAULT_PARAMETERS;
        let settlement = settle(&params, 100_000_000.0, 1_000_000.0, 50_000_000.0);
        // 140M grown 10 years at 0.43% stays below 149.8M + 30M.
        assert_eq!(settlement.capital_gains_tax, 0.0);
        assert_approx(
            settlement.sale_cost,
            settlement.final_property_value * 0.04,
        );
        assert_approx(
            settlement.buy_net_worth,
            settlement.final_property_value - settlement.sale_cost - 100_000_000.0
                + 1_000_000.0,
        );
        assert_eq!(settlement.rent_net_worth, 50_000_000.0);
    }

    #[test]
    fn gain_above_exemption_is_taxed_at_rate() {
        let params = DEFAULT_PARAMETERS;
        let terms = SaleTerms::new(&params, 0.0, 0.0);
        let sale_price = params.acquisition_cost() + 30_000_000.0 + 10_000_000.0;
        assert_approx(terms.capital_gains_tax(sale_price), 2_031_500.0);
    }

    #[test]
    fn final_value_compounds_over_full_horizon() {
        let mut params = DEFAULT_PARAMETERS;
        params.property_growth_rate = 2.0;
        params.horizon_years = 5;
        let settlement = settle(&params, 0.0, 0.0, 0.0);
        assert!((settlement.final_property_value - 140_000_000.0 * 1.02f64.powi(5)).abs() < 1e-3);
    }

    #[test]
    fn settle_matches_net_worth_at_final_value() {
        let params = DEFAULT_PARAMETERS;
        let terms = SaleTerms::new(&params, 90_000_000.0, 2_000_000.0);
        let settlement = settle(&params, 90_000_000.0, 2_000_000.0, 0.0);
        assert_eq!(
            terms.net_worth_at_sale_price(settlement.final_property_value),
            settlement.buy_net_worth
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_net_worth_increases_with_sale_price(
            low in 0u32..400_000_000,
            step in 1u32..50_000_000,
            sell_bp in 0u32..900,
            tax_bp in 0u32..5000
        ) {
            let mut params = DEFAULT_PARAMETERS;
            params.sell_cost_rate = sell_bp as f64 / 100.0;
            params.capital_gains_tax_rate = tax_bp as f64 / 100.0;
            let terms = SaleTerms::new(&params, 80_000_000.0, 1_000_000.0);
            let low = low as f64;
            let high = low + step as f64;
            prop_assert!(terms.net_worth_at_sale_price(high) > terms.net_worth_at_sale_price(low));
        }
    }
}
