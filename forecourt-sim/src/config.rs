//! Engine tuning and per-store operating expense configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for engine configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("field `{field}` must be within [{min}, {max}], got {value}")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("field `{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

/// Global simulation parameters, independent of any single store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Accounting month length in days; month-end runs bonuses and resets.
    pub month_len_days: u32,
    /// Productive hours per staff member used for labor-derived capacity.
    pub hours_per_staff_per_day: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            month_len_days: 30,
            hours_per_staff_per_day: 8.0,
        }
    }
}

impl EngineConfig {
    /// Coerce out-of-range values back to workable defaults.
    pub fn sanitize(&mut self) {
        if self.month_len_days == 0 {
            self.month_len_days = 30;
        }
        if !self.hours_per_staff_per_day.is_finite() || self.hours_per_staff_per_day <= 0.0 {
            self.hours_per_staff_per_day = 8.0;
        }
    }

    /// Reject configurations that would corrupt the daily math.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero month length or non-positive hours.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.month_len_days == 0 {
            return Err(ConfigError::NonPositive {
                field: "month_len_days",
                value: 0.0,
            });
        }
        if !self.hours_per_staff_per_day.is_finite() || self.hours_per_staff_per_day <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "hours_per_staff_per_day",
                value: self.hours_per_staff_per_day,
            });
        }
        Ok(())
    }
}

/// Rent amortized evenly over the accounting month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentConfig {
    pub monthly_cost: f64,
}

impl Default for RentConfig {
    fn default() -> Self {
        Self {
            monthly_cost: 15_000.0,
        }
    }
}

/// Water and electricity charges driven by fulfilled order counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilitiesConfig {
    pub water_cost_per_wash: f64,
    pub elec_daily_base: f64,
    pub elec_cost_per_wash: f64,
    pub elec_cost_per_maint: f64,
}

impl Default for UtilitiesConfig {
    fn default() -> Self {
        Self {
            water_cost_per_wash: 1.5,
            elec_daily_base: 50.0,
            elec_cost_per_wash: 0.8,
            elec_cost_per_maint: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpexConfig {
    pub rent: RentConfig,
    pub utilities: UtilitiesConfig,
}

/// Optional per-store responses that soften active event drag, at a daily fee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MitigationConfig {
    /// Reopens a closed store at reduced capacity and inflated variable cost.
    pub use_emergency_power: bool,
    pub emergency_capacity_multiplier: f64,
    pub emergency_variable_cost_multiplier: f64,
    pub emergency_daily_cost: f64,
    /// Counteracts traffic or conversion drag with a promo push.
    pub use_promo_boost: bool,
    pub promo_traffic_boost: f64,
    pub promo_conversion_boost: f64,
    pub promo_daily_cost: f64,
    /// Buys back capacity lost to events with overtime.
    pub use_overtime_capacity: bool,
    pub overtime_capacity_boost: f64,
    pub overtime_daily_cost: f64,
}

impl Default for MitigationConfig {
    fn default() -> Self {
        Self {
            use_emergency_power: false,
            emergency_capacity_multiplier: 0.60,
            emergency_variable_cost_multiplier: 1.15,
            emergency_daily_cost: 120.0,
            use_promo_boost: false,
            promo_traffic_boost: 1.05,
            promo_conversion_boost: 1.08,
            promo_daily_cost: 80.0,
            use_overtime_capacity: false,
            overtime_capacity_boost: 1.20,
            overtime_daily_cost: 100.0,
        }
    }
}
