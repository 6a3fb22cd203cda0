mod amortization;
mod engine;
mod error;
mod settlement;
mod simulation;
mod solver;
mod types;

pub use amortization::{monthly_interest, monthly_payment};
pub use engine::{
    Projection, interest_rate_for_year, management_fee_for_year, mortgage_deduction, project,
};
pub use error::SimulationError;
pub use settlement::{SaleTerms, Settlement, settle};
pub use simulation::{
    MAX_HORIZON_YEARS, MAX_INTEREST_RATE, MAX_LOAN_YEARS, run_simulation, validate_parameters,
};
pub use solver::{
    BREAK_EVEN_ITERATIONS, BreakEven, BreakEvenRoot, PRICE_UPPER_BOUND_MULTIPLE,
    break_even_rates, solve_break_even,
};
pub use types::{
    BreakEvenBracket, DEFAULT_DEDUCTION_CAP, DEFAULT_DEDUCTION_RATE, DEFAULT_MORTGAGE_DEDUCTION,
    DEFAULT_PARAMETERS, DeductionPolicy, MonthlyDataPoint, RateBandPolicy,
    SimulationParameters, SimulationResult, Strategy, Verdict,
};
