//! Headquarters finance: credit interest, automatic draw and repayment,
//! and store closure salvage.

use crate::constants::AUTO_REPAY_CASH_FRACTION;
use crate::ledger::DayResult;
use crate::sampling::clamp01;
use crate::state::GameState;
use crate::EngineError;

/// Day-close settlement of the revolving credit line.
///
/// Interest accrues on the drawn balance first. With auto-finance on, a
/// negative cash position draws up to the remaining headroom, then a
/// positive position sweeps a fraction of cash toward repayment.
pub fn apply_credit_facility(state: &mut GameState, day_result: &mut DayResult) {
    let used = state.credit.used.max(0.0);
    let rate = state.credit.daily_interest_rate.max(0.0);
    if used > 0.0 && rate > 0.0 {
        let interest = used * rate;
        state.cash -= interest;
        day_result.finance_interest_cost = interest;
        day_result.total_net_cashflow -= interest;
    }

    if !state.credit.auto_finance {
        return;
    }

    let limit = state.credit.limit.max(0.0);
    let used = state.credit.used.max(0.0);
    let room = (limit - used).max(0.0);
    if state.cash < 0.0 && room > 0.0 {
        let draw = room.min(-state.cash);
        state.cash += draw;
        state.credit.used = used + draw;
        day_result.finance_credit_draw = draw;
    }

    let used = state.credit.used.max(0.0);
    if state.cash > 0.0 && used > 0.0 {
        let repay = used.min(state.cash * AUTO_REPAY_CASH_FRACTION);
        if repay > 0.0 {
            state.cash -= repay;
            state.credit.used = used - repay;
            day_result.finance_credit_repay = repay;
        }
    }
}

/// Close a store, salvaging inventory and assets for cash.
///
/// Inventory salvages at `inventory_salvage_rate` of carrying value and is
/// cleared; assets salvage at `asset_salvage_rate` of original capex.
/// Closing an already-closed store recovers nothing.
///
/// # Errors
///
/// Returns [`EngineError::UnknownStore`] when `store_id` does not exist.
pub fn close_store(
    state: &mut GameState,
    store_id: &str,
    inventory_salvage_rate: f64,
    asset_salvage_rate: f64,
) -> Result<f64, EngineError> {
    let store = state
        .stores
        .get_mut(store_id)
        .ok_or_else(|| EngineError::UnknownStore(store_id.to_string()))?;
    if store.status == crate::state::StoreStatus::Closed {
        return Ok(0.0);
    }
    store.status = crate::state::StoreStatus::Closed;

    let inv_rate = clamp01(inventory_salvage_rate);
    let asset_rate = clamp01(asset_salvage_rate);

    let mut recovered = 0.0;
    for item in store.inventory.values() {
        recovered += item.qty * item.unit_cost * inv_rate;
    }
    store.inventory.clear();
    for asset in &store.assets {
        recovered += asset.capex * asset_rate;
    }

    state.cash += recovered;
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Asset, InventoryItem, Store, StoreStatus};

    #[test]
    fn interest_accrues_on_drawn_balance() {
        let mut state = GameState::default();
        state.cash = 1_000.0;
        state.credit.used = 10_000.0;
        state.credit.daily_interest_rate = 0.001;
        let mut result = DayResult::new(1);
        apply_credit_facility(&mut state, &mut result);
        assert!((result.finance_interest_cost - 10.0).abs() < f64::EPSILON);
        assert!((state.cash - 990.0).abs() < f64::EPSILON);
        assert!((result.total_net_cashflow + 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn auto_finance_draws_to_cover_negative_cash() {
        let mut state = GameState::default();
        state.cash = -5_000.0;
        state.credit.limit = 20_000.0;
        state.credit.auto_finance = true;
        let mut result = DayResult::new(1);
        apply_credit_facility(&mut state, &mut result);
        assert!((result.finance_credit_draw - 5_000.0).abs() < f64::EPSILON);
        assert!((state.credit.used - 5_000.0).abs() < f64::EPSILON);
        assert!((state.cash - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn draw_is_capped_by_headroom() {
        let mut state = GameState::default();
        state.cash = -50_000.0;
        state.credit.limit = 20_000.0;
        state.credit.used = 5_000.0;
        state.credit.daily_interest_rate = 0.0;
        state.credit.auto_finance = true;
        let mut result = DayResult::new(1);
        apply_credit_facility(&mut state, &mut result);
        assert!((result.finance_credit_draw - 15_000.0).abs() < f64::EPSILON);
        assert!((state.cash + 35_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn repayment_sweeps_a_fraction_of_cash() {
        let mut state = GameState::default();
        state.cash = 10_000.0;
        state.credit.used = 50_000.0;
        state.credit.daily_interest_rate = 0.0;
        state.credit.auto_finance = true;
        let mut result = DayResult::new(1);
        apply_credit_facility(&mut state, &mut result);
        // 30% of cash, well under the drawn balance.
        assert!((result.finance_credit_repay - 3_000.0).abs() < f64::EPSILON);
        assert!((state.credit.used - 47_000.0).abs() < f64::EPSILON);
        assert!((state.cash - 7_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_store_salvages_inventory_and_assets() {
        let mut state = GameState::default();
        state.cash = 0.0;
        let mut store = Store {
            store_id: "s1".into(),
            status: StoreStatus::Open,
            ..Store::default()
        };
        store.inventory.insert(
            "oil".into(),
            InventoryItem {
                sku: "oil".into(),
                name: "Oil".into(),
                unit_cost: 10.0,
                qty: 100.0,
            },
        );
        store.assets.push(Asset {
            name: "lift".into(),
            capex: 50_000.0,
            useful_life_days: 1_825,
            in_service_day: 1,
        });
        state.stores.insert("s1".into(), store);

        let recovered = close_store(&mut state, "s1", 0.30, 0.10).unwrap();
        // 1000 * 0.30 + 50000 * 0.10
        assert!((recovered - 5_300.0).abs() < f64::EPSILON);
        assert!((state.cash - 5_300.0).abs() < f64::EPSILON);
        let store = &state.stores["s1"];
        assert_eq!(store.status, StoreStatus::Closed);
        assert!(store.inventory.is_empty());

        // Second close recovers nothing.
        let again = close_store(&mut state, "s1", 0.30, 0.10).unwrap();
        assert!((again - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_unknown_store_errors() {
        let mut state = GameState::default();
        let err = close_store(&mut state, "ghost", 0.3, 0.1).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStore(s) if s == "ghost"));
    }
}
