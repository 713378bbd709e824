//! Daily workforce lifecycle: turnover, recruiting pipeline, and the
//! capacity factors staffing imposes on fulfillment.

use std::collections::BTreeMap;

use rand::Rng;

use crate::constants::{
    CATEGORY_FACTOR_MAX, CATEGORY_FACTOR_MIN, RECRUITING_BUDGET_UNIT, ROLE_FACTOR_MAX,
    ROLE_FACTOR_MIN, WORKFORCE_BASE_FACTOR_MAX, WORKFORCE_BASE_FACTOR_MIN, WORKFORCE_COVERAGE_CAP,
    WORKFORCE_FINAL_FACTOR_MAX, WORKFORCE_FINAL_FACTOR_MIN, WORKFORCE_TRAINING_BASE,
    WORKFORCE_TRAINING_SLOPE,
};
use crate::sampling::{clamp, clamp01, poisson};
use crate::state::{PendingHire, ServiceCategory, Store};

/// What happened to a store's crew in one day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorkforceDaily {
    pub lost: u32,
    pub hired: u32,
    pub recruit_cost: f64,
    /// Multiplier applied to the store-wide capacity multiplier.
    pub capacity_factor: f64,
    pub shift_coverage: f64,
    pub overtime_cost: f64,
}

fn process_pending_hires(store: &mut Store, day: u32) -> u32 {
    let mut hired = 0;
    store.pending_hires.retain(|pending| {
        if pending.arrive_day <= day {
            hired += pending.qty;
            false
        } else {
            true
        }
    });
    hired
}

/// One independent retention roll per employee.
fn sample_turnover<R: Rng + ?Sized>(headcount: u32, rate: f64, rng: &mut R) -> u32 {
    let p = clamp01(rate);
    let mut lost = 0;
    for _ in 0..headcount {
        if rng.r#gen::<f64>() < p {
            lost += 1;
        }
    }
    lost
}

/// Advance the crew by one day and derive today's staffing capacity factor.
///
/// Order matters: pending hires land first, then turnover rolls against the
/// enlarged crew, then recruiting may queue new pending hires.
pub fn run_daily<R: Rng + ?Sized>(store: &mut Store, day: u32, rng: &mut R) -> WorkforceDaily {
    let planned = store.workforce.planned_headcount.max(1);
    let training = clamp01(store.workforce.training_level);

    let hired = process_pending_hires(store, day);
    let mut current = store.workforce.current_headcount + hired;

    let lost = sample_turnover(current, store.workforce.daily_turnover_rate, rng);
    current = current.saturating_sub(lost);

    let mut recruit_cost = 0.0;
    if store.workforce.recruiting_enabled && current < planned {
        let budget = store.workforce.recruiting_daily_budget.max(0.0);
        if budget > 0.0 {
            recruit_cost = budget;
            let hire_lambda = (budget / RECRUITING_BUDGET_UNIT)
                * store.workforce.recruiting_hire_rate_per_100_budget.max(0.0);
            let qty = poisson(rng, hire_lambda);
            if qty > 0 {
                let lead = store.workforce.recruiting_lead_days;
                store.pending_hires.push(PendingHire {
                    qty,
                    order_day: day,
                    arrive_day: day + lead,
                });
            }
        }
    }

    store.workforce.current_headcount = current;

    let staffing_ratio = f64::from(current) / f64::from(planned);
    let base_factor = clamp(
        WORKFORCE_BASE_FACTOR_MIN,
        WORKFORCE_BASE_FACTOR_MAX,
        staffing_ratio * (WORKFORCE_TRAINING_BASE + WORKFORCE_TRAINING_SLOPE * training),
    );

    let shifts = store.workforce.shifts_per_day.max(1);
    let staffing = store.workforce.staffing_per_shift.max(1);
    let required = f64::from(shifts * staffing);
    let mut coverage = (f64::from(current) / required).min(WORKFORCE_COVERAGE_CAP);
    let mut overtime_cost = 0.0;
    if coverage < 1.0 && store.workforce.overtime_shift_enabled {
        let extra = store.workforce.overtime_shift_extra_capacity.max(0.0);
        coverage = (coverage + extra).min(WORKFORCE_COVERAGE_CAP);
        overtime_cost = store.workforce.overtime_shift_daily_cost.max(0.0);
    }

    let capacity_factor = clamp(
        WORKFORCE_FINAL_FACTOR_MIN,
        WORKFORCE_FINAL_FACTOR_MAX,
        base_factor * coverage.max(0.3),
    );

    WorkforceDaily {
        lost,
        hired,
        recruit_cost,
        capacity_factor,
        shift_coverage: coverage,
        overtime_cost,
    }
}

/// Skill times shift allocation per category, each clamped to [0.2, 2.0].
/// Categories missing from the config stay neutral.
#[must_use]
pub fn category_capacity_factors(store: &Store) -> BTreeMap<ServiceCategory, f64> {
    let mut out = BTreeMap::new();
    for cat in ServiceCategory::ALL {
        let skill = store
            .workforce
            .skill_by_category
            .get(&cat)
            .copied()
            .unwrap_or(1.0)
            .max(0.0);
        let alloc = store
            .workforce
            .shift_allocation_by_category
            .get(&cat)
            .copied()
            .unwrap_or(1.0)
            .max(0.0);
        out.insert(cat, clamp(CATEGORY_FACTOR_MIN, CATEGORY_FACTOR_MAX, skill * alloc));
    }
    out
}

/// Skill times shift allocation for a payroll role, clamped to [0.2, 2.0].
#[must_use]
pub fn role_capacity_factor(store: &Store, role: &str) -> f64 {
    let skill = store
        .workforce
        .skill_by_role
        .get(role)
        .copied()
        .unwrap_or(1.0)
        .max(0.0);
    let alloc = store
        .workforce
        .shift_allocation_by_role
        .get(role)
        .copied()
        .unwrap_or(1.0)
        .max(0.0);
    clamp(ROLE_FACTOR_MIN, ROLE_FACTOR_MAX, skill * alloc)
}
