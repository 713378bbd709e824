//! Inventory pipeline: receipts, weighted-average costing, reorder-point
//! replenishment, and manual purchasing.

use serde::{Deserialize, Serialize};

use crate::state::{GameState, InventoryItem, PendingInbound, Store};
use crate::EngineError;

/// A receipt posted when an in-transit order lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundArrival {
    pub sku: String,
    pub name: String,
    pub qty: f64,
    pub unit_cost: f64,
    pub arrive_day: u32,
}

/// A purchase order raised by auto-replenishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentOrder {
    pub sku: String,
    pub qty: f64,
    pub unit_cost: f64,
    pub order_day: u32,
    pub arrive_day: u32,
    pub cash_out: f64,
}

/// Merge a receipt into stock at weighted-average unit cost.
pub fn add_stock(store: &mut Store, sku: &str, name: &str, unit_cost: f64, qty: f64) {
    if qty <= 0.0 {
        return;
    }
    match store.inventory.get_mut(sku) {
        Some(item) => {
            if item.qty + qty > 0.0 {
                item.unit_cost = (item.unit_cost * item.qty + unit_cost * qty) / (item.qty + qty);
            }
            item.qty += qty;
            if !name.is_empty() {
                item.name = name.to_string();
            }
        }
        None => {
            store.inventory.insert(
                sku.to_string(),
                InventoryItem {
                    sku: sku.to_string(),
                    name: name.to_string(),
                    unit_cost,
                    qty,
                },
            );
        }
    }
}

/// Land every pending inbound due on or before `day`.
pub fn process_pending_inbounds(store: &mut Store, day: u32) -> Vec<InboundArrival> {
    let mut arrivals = Vec::new();
    let pending = std::mem::take(&mut store.pending_inbounds);
    for inbound in pending {
        if inbound.arrive_day > day {
            store.pending_inbounds.push(inbound);
            continue;
        }
        if inbound.sku.is_empty() || inbound.qty <= 0.0 {
            continue;
        }
        let name = if inbound.name.is_empty() {
            inbound.sku.clone()
        } else {
            inbound.name.clone()
        };
        let unit_cost = inbound.unit_cost.max(0.0);
        add_stock(store, &inbound.sku, &name, unit_cost, inbound.qty);
        arrivals.push(InboundArrival {
            sku: inbound.sku,
            name,
            qty: inbound.qty,
            unit_cost,
            arrive_day: day,
        });
    }
    arrivals
}

/// Raise purchase orders for every enabled rule at or below its reorder
/// point, counting stock already on order. Orders are capped by available
/// chain cash; partial budgets buy partial quantities.
///
/// Returns the total committed cash and the orders raised.
pub fn auto_replenish(
    store: &mut Store,
    day: u32,
    cash_available: f64,
) -> (f64, Vec<ReplenishmentOrder>) {
    if !store.auto_replenishment_enabled || store.replenishment_rules.is_empty() {
        return (0.0, Vec::new());
    }

    let mut total_cost = 0.0;
    let mut orders = Vec::new();
    let rules: Vec<_> = store.replenishment_rules.values().cloned().collect();

    for rule in rules {
        if !rule.enabled {
            continue;
        }
        let sku = if rule.sku.is_empty() {
            continue;
        } else {
            rule.sku.clone()
        };
        let item = store.inventory.get(&sku);
        let qty_now = item.map_or(0.0, |i| i.qty);
        let on_order: f64 = store
            .pending_inbounds
            .iter()
            .filter(|p| p.sku == sku)
            .map(|p| p.qty.max(0.0))
            .sum();

        let reorder_point = rule.reorder_point.max(0.0);
        let target_stock = rule.target_stock.max(rule.safety_stock.max(0.0));
        let effective = qty_now + on_order;
        if effective > reorder_point {
            continue;
        }

        let need_qty = (target_stock - effective).max(0.0);
        if need_qty <= 0.0 {
            continue;
        }

        let mut unit_cost = rule.unit_cost.max(0.0);
        if unit_cost <= 0.0 {
            unit_cost = item.map_or(0.0, |i| i.unit_cost.max(0.0));
        }
        if unit_cost <= 0.0 {
            continue;
        }

        let est_cost = need_qty * unit_cost;
        let actual_cost = est_cost.min(cash_available.max(0.0));
        if actual_cost <= 0.0 {
            continue;
        }
        let buy_qty = actual_cost / unit_cost;
        if buy_qty <= 0.0 {
            continue;
        }

        let arrive_day = day + rule.lead_time_days;
        let name = if rule.name.is_empty() {
            item.map_or_else(|| sku.clone(), |i| i.name.clone())
        } else {
            rule.name.clone()
        };
        store.pending_inbounds.push(PendingInbound {
            sku: sku.clone(),
            name,
            qty: buy_qty,
            unit_cost,
            order_day: day,
            arrive_day,
        });
        total_cost += actual_cost;
        orders.push(ReplenishmentOrder {
            sku,
            qty: buy_qty,
            unit_cost,
            order_day: day,
            arrive_day,
            cash_out: actual_cost,
        });
    }

    (total_cost, orders)
}

/// Immediate cash purchase of stock for one store.
///
/// Spend is capped by chain cash; a partial budget buys a partial quantity.
/// Returns the cash actually spent.
///
/// # Errors
///
/// Returns [`EngineError::UnknownStore`] when `store_id` does not exist.
pub fn purchase_inventory(
    state: &mut GameState,
    store_id: &str,
    sku: &str,
    name: &str,
    unit_cost: f64,
    qty: f64,
) -> Result<f64, EngineError> {
    if !state.stores.contains_key(store_id) {
        return Err(EngineError::UnknownStore(store_id.to_string()));
    }
    if qty <= 0.0 || unit_cost < 0.0 {
        return Ok(0.0);
    }

    let total = qty * unit_cost;
    let actual = total.min(state.cash);
    if actual <= 0.0 {
        return Ok(0.0);
    }
    let bought_qty = if unit_cost > 0.0 {
        actual / unit_cost
    } else {
        0.0
    };
    state.cash -= actual;

    let store = state
        .stores
        .get_mut(store_id)
        .ok_or_else(|| EngineError::UnknownStore(store_id.to_string()))?;
    add_stock(store, sku, name, unit_cost, bought_qty);
    store.mtd_cash_out += actual;
    Ok(actual)
}
