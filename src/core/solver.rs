use tracing::warn;

use super::types::BreakEvenBracket;

pub const BREAK_EVEN_ITERATIONS: u32 = 60;

/// Upper end of the sale-price search, as a multiple of the purchase price.
pub const PRICE_UPPER_BOUND_MULTIPLE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakEvenRoot {
    pub price: f64,
    pub bracket: BreakEvenBracket,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakEven {
    pub price: f64,
    pub growth_rate: f64,
    pub annual_rate: f64,
    pub bracket: BreakEvenBracket,
}

/// Bisects `[0, upper_bound]` for the sale price where `net_worth_at` reaches
/// `target`. `net_worth_at` must be non-decreasing; an unreachable target
/// converges onto the nearer bound and is reported as pinned.
pub fn solve_break_even<F>(net_worth_at: F, target: f64, upper_bound: f64) -> BreakEvenRoot
where
    F: Fn(f64) -> f64,
{
    let bracket = if net_worth_at(0.0) >= target {
        BreakEvenBracket::PinnedLow
    } else if net_worth_at(upper_bound) < target {
        BreakEvenBracket::PinnedHigh
    } else {
        BreakEvenBracket::Interior
    };

    let mut lo = 0.0;
    let mut hi = upper_bound;
    for _ in 0..BREAK_EVEN_ITERATIONS {
        let mid = (lo + hi) * 0.5;
        if net_worth_at(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let price = (lo + hi) * 0.5;

    if bracket.is_pinned() {
        warn!(
            ?bracket,
            price, target, upper_bound, "break-even price pinned at search bound"
        );
    }

    BreakEvenRoot { price, bracket }
}

/// Expresses a break-even price as total and annualised growth over `years`.
pub fn break_even_rates(root: BreakEvenRoot, property_price: f64, years: u32) -> BreakEven {
    let growth_rate = (root.price / property_price - 1.0) * 100.0;
    let annual_rate =
        ((1.0 + growth_rate / 100.0).max(0.0).powf(1.0 / years.max(1) as f64) - 1.0) * 100.0;
    BreakEven {
        price: root.price,
        growth_rate,
        annual_rate,
        bracket: root.bracket,
    }
}
