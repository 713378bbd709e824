//! Order fulfillment: capacity clamps, consumable draws, and project mixes.
//!
//! Fulfillment is where demand meets physical limits. Inventory is deducted
//! here, so callers must apply demand rationing first and treat the returned
//! counts as final.

use std::collections::BTreeMap;

use rand::Rng;

use crate::config::EngineConfig;
use crate::payroll::role_headcount;
use crate::sampling::{clamp01, weighted_index};
use crate::state::{ServiceCategory, ServiceLine, ServiceProject, Store};
use crate::workforce::role_capacity_factor;

/// Daily capacity for one line after labor derivation and event multipliers.
///
/// Lines with a labor role are capped by available role hours; a missing or
/// empty role crew means zero capacity.
#[must_use]
pub fn effective_capacity(
    store: &Store,
    line: &ServiceLine,
    cfg: &EngineConfig,
    capacity_multiplier: f64,
) -> u32 {
    let cap = line.capacity_per_day;
    let base = match &line.labor_role {
        Some(role) if line.labor_hours_per_order > 0.0 => {
            let headcount = role_headcount(store, role);
            if headcount == 0 {
                return 0;
            }
            let factor = role_capacity_factor(store, role);
            let hours = f64::from(headcount) * cfg.hours_per_staff_per_day * factor;
            let derived = (hours / line.labor_hours_per_order).floor();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let derived = derived.max(0.0) as u32;
            derived.min(cap)
        }
        _ => cap,
    };
    let scaled = (f64::from(base) * capacity_multiplier.max(0.0)).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = scaled.max(0.0) as u32;
    scaled
}

/// Shrink desired orders to what consumable inventory can support, deducting
/// the units used. Returns the feasible count.
fn apply_consumable_limit(store: &mut Store, line: &ServiceLine, desired: u32) -> u32 {
    if desired == 0 {
        return 0;
    }
    let Some(sku) = &line.consumable_sku else {
        return desired;
    };
    if line.consumable_units_per_order <= 0.0 {
        return desired;
    }
    let Some(item) = store.inventory.get_mut(sku) else {
        return 0;
    };
    if item.qty <= 0.0 {
        return 0;
    }

    let need = f64::from(desired) * line.consumable_units_per_order;
    if need <= item.qty {
        item.qty -= need;
        return desired;
    }
    let feasible = (item.qty / line.consumable_units_per_order).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let feasible = feasible.max(0.0) as u32;
    item.qty -= f64::from(feasible) * line.consumable_units_per_order;
    feasible
}

/// Turn rationed fractional demand into fulfilled integer orders per line.
///
/// Rounds, clamps to effective capacity (scaled by the event multiplier and
/// the line's workforce category factor), then draws consumables.
pub fn feasible_orders(
    store: &mut Store,
    cfg: &EngineConfig,
    demand: &BTreeMap<String, f64>,
    capacity_multiplier: f64,
    category_factors: &BTreeMap<ServiceCategory, f64>,
) -> BTreeMap<String, u32> {
    let lines: Vec<(String, ServiceLine)> = store
        .service_lines
        .iter()
        .map(|(sid, line)| (sid.clone(), line.clone()))
        .collect();

    let mut out = BTreeMap::new();
    for (sid, line) in &lines {
        let raw = demand.get(sid).copied().unwrap_or(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let desired = raw.round().max(0.0) as u32;
        let cat_factor = category_factors
            .get(&line.category)
            .copied()
            .unwrap_or(1.0)
            .max(0.0);
        let cap = effective_capacity(store, line, cfg, capacity_multiplier * cat_factor);
        let clamped = desired.min(cap);
        let fulfilled = apply_consumable_limit(store, line, clamped);
        out.insert(sid.clone(), fulfilled);
    }
    out
}

/// Shrink project orders to what part stock supports, deducting inventory.
/// Returns the feasible count and the parts COGS at weighted-average cost.
fn apply_parts_limit(store: &mut Store, project: &ServiceProject, desired: u32) -> (u32, f64) {
    if desired == 0 {
        return (0, 0.0);
    }
    if project.parts.is_empty() {
        return (desired, 0.0);
    }

    let mut feasible = desired;
    for (sku, per_order) in &project.parts {
        if *per_order <= 0.0 {
            continue;
        }
        let Some(item) = store.inventory.get(sku) else {
            return (0, 0.0);
        };
        if item.qty <= 0.0 {
            return (0, 0.0);
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let supported = (item.qty / per_order).floor().max(0.0) as u32;
        feasible = feasible.min(supported);
        if feasible == 0 {
            return (0, 0.0);
        }
    }

    let mut parts_cogs = 0.0;
    for (sku, per_order) in &project.parts {
        if *per_order <= 0.0 {
            continue;
        }
        if let Some(item) = store.inventory.get_mut(sku) {
            let used = f64::from(feasible) * per_order;
            item.qty -= used;
            parts_cogs += used * item.unit_cost;
        }
    }
    (feasible, parts_cogs)
}

/// Result of splitting one line's orders across its project catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectOutcome {
    pub orders_by_project: BTreeMap<String, u32>,
    pub revenue: f64,
    pub parts_cogs: f64,
    /// Non-inventory variable cost carried by the projects themselves.
    pub variable_cost: f64,
    pub parts_cogs_by_project: BTreeMap<String, f64>,
}

/// Resolve a line's fulfilled orders into per-project counts and economics.
///
/// Each order rolls the mix independently. Under `strict_parts`, project
/// parts come out of inventory and shortfalls cancel the unfulfillable
/// orders; otherwise parts COGS is approximated via `parts_cost_ratio`.
/// `parts_cost_reduction` discounts parts COGS (supply-chain program).
pub fn resolve_project_mix<R: Rng + ?Sized>(
    store: &mut Store,
    line: &ServiceLine,
    orders: u32,
    parts_cost_reduction: f64,
    rng: &mut R,
) -> ProjectOutcome {
    let mut out = ProjectOutcome::default();
    if orders == 0 {
        return out;
    }
    if line.project_mix.is_empty() {
        out.revenue = f64::from(orders) * line.price;
        out.parts_cogs = out.revenue * line.parts_cost_ratio;
        return out;
    }

    let weights: Vec<f64> = line.project_mix.iter().map(|(_, w)| *w).collect();
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for _ in 0..orders {
        let idx = weighted_index(rng, &weights).unwrap_or(0);
        let pid = &line.project_mix[idx].0;
        *counts.entry(pid.clone()).or_insert(0) += 1;
    }

    let reduction = clamp01(parts_cost_reduction);
    for (pid, count) in &mut counts {
        let Some(project) = store.projects.get(pid).cloned() else {
            // Unknown project: fall back to flat line pricing.
            out.revenue += f64::from(*count) * line.price;
            out.parts_cogs += f64::from(*count) * line.price * line.parts_cost_ratio;
            continue;
        };

        out.revenue += f64::from(*count) * project.price;
        out.variable_cost += f64::from(*count) * project.variable_cost;

        let cogs = if store.strict_parts {
            let (feasible, cogs) = apply_parts_limit(store, &project, *count);
            if feasible < *count {
                let missed = f64::from(*count - feasible);
                out.revenue -= missed * project.price;
                out.variable_cost -= missed * project.variable_cost;
                *count = feasible;
            }
            cogs
        } else {
            f64::from(*count) * project.price * line.parts_cost_ratio
        };
        let cogs = cogs * (1.0 - reduction);
        out.parts_cogs += cogs;
        *out.parts_cogs_by_project.entry(pid.clone()).or_insert(0.0) += cogs;
    }

    counts.retain(|_, count| *count > 0);
    out.orders_by_project = counts;
    out
}
