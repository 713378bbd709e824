//! Typed daily results: one row per store per day plus a chain rollup.
//!
//! These rows are what callers persist. The engine itself never keeps a
//! ledger; replaying the same seed regenerates identical rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::EventSummarySet;
use crate::inventory::{InboundArrival, ReplenishmentOrder};
use crate::state::{ServiceCategory, StoreStatus};

/// Mitigation actions a store can take against event drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationKind {
    EmergencyPower,
    PromoBoost,
    OvertimeCapacity,
}

/// A mitigation taken today and what it cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MitigationAction {
    pub action: MitigationKind,
    pub cost: f64,
}

/// Staffing snapshot recorded with each store's daily row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkforceBreakdown {
    pub headcount_start: u32,
    pub headcount_end: u32,
    pub lost: u32,
    pub hired: u32,
    pub recruit_cost: f64,
    pub capacity_factor: f64,
    pub shift_coverage: f64,
    pub overtime_cost: f64,
    pub category_factors: BTreeMap<ServiceCategory, f64>,
}

impl Default for WorkforceBreakdown {
    fn default() -> Self {
        Self {
            headcount_start: 0,
            headcount_end: 0,
            lost: 0,
            hired: 0,
            recruit_cost: 0.0,
            capacity_factor: 1.0,
            shift_coverage: 1.0,
            overtime_cost: 0.0,
            category_factors: BTreeMap::new(),
        }
    }
}

/// Everything that happened at one store on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStoreResult {
    pub store_id: String,
    pub store_name: String,
    pub station_id: String,
    pub status: StoreStatus,
    pub fuel_traffic: u32,
    pub visitor_traffic: u32,
    pub orders_by_service: BTreeMap<String, u32>,
    pub orders_by_project: BTreeMap<String, u32>,
    pub revenue_by_service: BTreeMap<String, f64>,
    pub gross_profit_by_service: BTreeMap<String, f64>,
    pub gross_profit_by_project: BTreeMap<String, f64>,
    pub revenue_by_category: BTreeMap<ServiceCategory, f64>,
    pub gross_profit_by_category: BTreeMap<ServiceCategory, f64>,
    pub parts_cogs_by_project: BTreeMap<String, f64>,
    pub labor_revenue: f64,
    pub parts_revenue: f64,
    pub parts_gross_profit: f64,
    pub rev_online: f64,
    pub gp_online: f64,
    pub rev_insurance: f64,
    pub gp_insurance: f64,
    pub rev_used_car: f64,
    pub gp_used_car: f64,
    pub count_used_car: u32,
    pub cost_rent: f64,
    pub cost_water: f64,
    pub cost_elec: f64,
    /// Final multipliers after events, workforce, and mitigation.
    pub store_closed: bool,
    pub traffic_multiplier: f64,
    pub conversion_multiplier: f64,
    pub capacity_multiplier: f64,
    pub variable_cost_multiplier: f64,
    pub events: EventSummarySet,
    pub mitigation_cost: f64,
    pub mitigation_actions: Vec<MitigationAction>,
    pub replenishment_cost: f64,
    pub replenishment_orders: Vec<ReplenishmentOrder>,
    pub inbound_arrivals: Vec<InboundArrival>,
    pub workforce: WorkforceBreakdown,
    pub revenue: f64,
    pub variable_cost: f64,
    pub parts_cogs: f64,
    pub labor_cost: f64,
    pub depreciation_cost: f64,
    pub fixed_overhead: f64,
    pub operating_profit: f64,
    pub cash_in: f64,
    pub cash_out: f64,
    pub net_cashflow: f64,
}

impl DayStoreResult {
    #[must_use]
    pub fn new(store_id: &str, store_name: &str, station_id: &str, status: StoreStatus) -> Self {
        Self {
            store_id: store_id.to_string(),
            store_name: store_name.to_string(),
            station_id: station_id.to_string(),
            status,
            fuel_traffic: 0,
            visitor_traffic: 0,
            orders_by_service: BTreeMap::new(),
            orders_by_project: BTreeMap::new(),
            revenue_by_service: BTreeMap::new(),
            gross_profit_by_service: BTreeMap::new(),
            gross_profit_by_project: BTreeMap::new(),
            revenue_by_category: BTreeMap::new(),
            gross_profit_by_category: BTreeMap::new(),
            parts_cogs_by_project: BTreeMap::new(),
            labor_revenue: 0.0,
            parts_revenue: 0.0,
            parts_gross_profit: 0.0,
            rev_online: 0.0,
            gp_online: 0.0,
            rev_insurance: 0.0,
            gp_insurance: 0.0,
            rev_used_car: 0.0,
            gp_used_car: 0.0,
            count_used_car: 0,
            cost_rent: 0.0,
            cost_water: 0.0,
            cost_elec: 0.0,
            store_closed: false,
            traffic_multiplier: 1.0,
            conversion_multiplier: 1.0,
            capacity_multiplier: 1.0,
            variable_cost_multiplier: 1.0,
            events: EventSummarySet::new(),
            mitigation_cost: 0.0,
            mitigation_actions: Vec::new(),
            replenishment_cost: 0.0,
            replenishment_orders: Vec::new(),
            inbound_arrivals: Vec::new(),
            workforce: WorkforceBreakdown::default(),
            revenue: 0.0,
            variable_cost: 0.0,
            parts_cogs: 0.0,
            labor_cost: 0.0,
            depreciation_cost: 0.0,
            fixed_overhead: 0.0,
            operating_profit: 0.0,
            cash_in: 0.0,
            cash_out: 0.0,
            net_cashflow: 0.0,
        }
    }
}

/// Chain-level rollup for one simulated day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DayResult {
    pub day: u32,
    pub store_results: Vec<DayStoreResult>,
    pub total_revenue: f64,
    pub total_operating_profit: f64,
    pub total_net_cashflow: f64,
    pub finance_interest_cost: f64,
    pub finance_credit_draw: f64,
    pub finance_credit_repay: f64,
}

impl DayResult {
    #[must_use]
    pub fn new(day: u32) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }
}
