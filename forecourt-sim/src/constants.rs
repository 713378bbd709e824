//! Centralized balance and tuning constants for the Forecourt simulation.
//!
//! These values define the deterministic math for the daily economic tick.
//! Keeping them together ensures that balance can only be adjusted via code
//! changes reviewed in version control, rather than through external assets.

// Event engine --------------------------------------------------------------
pub(crate) const EVENT_HISTORY_CAP: usize = 5_000;
pub(crate) const EVENT_TRAFFIC_MULT_MIN: f64 = 0.1;
pub(crate) const EVENT_TRAFFIC_MULT_MAX: f64 = 2.0;
pub(crate) const EVENT_CONVERSION_MULT_MIN: f64 = 0.1;
pub(crate) const EVENT_CONVERSION_MULT_MAX: f64 = 2.0;
pub(crate) const EVENT_CAPACITY_MULT_MIN: f64 = 0.0;
pub(crate) const EVENT_CAPACITY_MULT_MAX: f64 = 2.0;
pub(crate) const EVENT_VAR_COST_MULT_MIN: f64 = 0.5;
pub(crate) const EVENT_VAR_COST_MULT_MAX: f64 = 5.0;

// Mitigation recovery caps applied after an action lifts event drag.
pub(crate) const MITIGATED_TRAFFIC_MULT_MAX: f64 = 3.0;
pub(crate) const MITIGATED_CONVERSION_MULT_MAX: f64 = 3.0;
pub(crate) const MITIGATED_CAPACITY_MULT_MAX: f64 = 3.0;

// Demand and competition -----------------------------------------------------
pub(crate) const COMPETITION_DIVERSION_RATE: f64 = 0.7;
pub(crate) const COMPETITION_FACTOR_MIN: f64 = 0.2;
pub(crate) const COMPETITION_FACTOR_MAX: f64 = 1.5;
pub(crate) const ATTRACTIVENESS_MIN: f64 = 0.5;
pub(crate) const ATTRACTIVENESS_MAX: f64 = 1.5;

// Workforce ------------------------------------------------------------------
pub(crate) const WORKFORCE_BASE_FACTOR_MIN: f64 = 0.4;
pub(crate) const WORKFORCE_BASE_FACTOR_MAX: f64 = 1.3;
pub(crate) const WORKFORCE_FINAL_FACTOR_MIN: f64 = 0.3;
pub(crate) const WORKFORCE_FINAL_FACTOR_MAX: f64 = 1.4;
pub(crate) const WORKFORCE_COVERAGE_CAP: f64 = 1.2;
pub(crate) const WORKFORCE_TRAINING_BASE: f64 = 0.8;
pub(crate) const WORKFORCE_TRAINING_SLOPE: f64 = 0.4;
pub(crate) const CATEGORY_FACTOR_MIN: f64 = 0.2;
pub(crate) const CATEGORY_FACTOR_MAX: f64 = 2.0;
pub(crate) const ROLE_FACTOR_MIN: f64 = 0.2;
pub(crate) const ROLE_FACTOR_MAX: f64 = 2.0;
pub(crate) const RECRUITING_BUDGET_UNIT: f64 = 100.0;

// Finance --------------------------------------------------------------------
pub(crate) const AUTO_REPAY_CASH_FRACTION: f64 = 0.30;
pub(crate) const DEFAULT_ASSET_LIFE_DAYS: u32 = 1_825;

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
