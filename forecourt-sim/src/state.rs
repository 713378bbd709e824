//! Persistent world model: stations, stores, inventory, and chain state.
//!
//! Everything here serializes with serde so a save file captures the complete
//! simulation state, including the RNG cursor. Collections are `BTreeMap` so
//! iteration order is stable across runs and platforms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ancillary::AncillaryConfig;
use crate::config::{MitigationConfig, OpexConfig};
use crate::events::{ActiveEvent, EventHistoryRecord, EventTemplate};
use crate::payroll::PayrollPlan;
use crate::rng::RngJournal;

/// A fuel station hosting at most one service store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Station {
    pub station_id: String,
    pub name: String,
    pub city: String,
    pub district: String,
    pub provider: String,
    pub fuel_vehicles_per_day: u32,
    pub visitor_vehicles_per_day: u32,
    /// Relative day-to-day traffic jitter, 0.10 means +/-10%.
    pub traffic_volatility: f64,
}

impl Default for Station {
    fn default() -> Self {
        Self {
            station_id: String::new(),
            name: String::new(),
            city: String::new(),
            district: String::new(),
            provider: String::new(),
            fuel_vehicles_per_day: 600,
            visitor_vehicles_per_day: 10,
            traffic_volatility: 0.10,
        }
    }
}

/// Lifecycle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    #[default]
    Planning,
    Constructing,
    Open,
    Closed,
}

/// Service grouping used for utilities, commissions, and workforce factors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Wash,
    Maintenance,
    Detailing,
    #[default]
    Other,
}

impl ServiceCategory {
    pub const ALL: [Self; 4] = [Self::Wash, Self::Maintenance, Self::Detailing, Self::Other];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wash => "wash",
            Self::Maintenance => "maintenance",
            Self::Detailing => "detailing",
            Self::Other => "other",
        }
    }
}

/// A sellable line of service at a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLine {
    pub service_id: String,
    pub name: String,
    pub price: f64,
    /// Fraction of fuel vehicles that want this service.
    pub conversion_from_fuel: f64,
    /// Fraction of visitor vehicles that want this service.
    pub conversion_from_visitor: f64,
    pub capacity_per_day: u32,
    pub variable_cost_per_order: f64,
    pub category: ServiceCategory,
    /// Approximation for parts COGS when no project mix applies.
    pub parts_cost_ratio: f64,
    /// When set, daily capacity is additionally derived from role labor hours.
    pub labor_role: Option<String>,
    pub labor_hours_per_order: f64,
    /// When set, each order consumes inventory of this SKU.
    pub consumable_sku: Option<String>,
    pub consumable_units_per_order: f64,
    /// Weighted split of orders into catalog projects. Empty means flat pricing.
    pub project_mix: Vec<(String, f64)>,
}

impl Default for ServiceLine {
    fn default() -> Self {
        Self {
            service_id: String::new(),
            name: String::new(),
            price: 0.0,
            conversion_from_fuel: 0.0,
            conversion_from_visitor: 0.0,
            capacity_per_day: 0,
            variable_cost_per_order: 0.0,
            category: ServiceCategory::Other,
            parts_cost_ratio: 0.0,
            labor_role: None,
            labor_hours_per_order: 0.0,
            consumable_sku: None,
            consumable_units_per_order: 0.0,
            project_mix: Vec::new(),
        }
    }
}

/// A concrete job within a service line's project mix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceProject {
    pub project_id: String,
    pub name: String,
    pub price: f64,
    pub labor_hours: f64,
    /// Non-inventory variable cost per order.
    pub variable_cost: f64,
    /// SKU to quantity consumed per order.
    pub parts: BTreeMap<String, f64>,
}

/// A depreciable asset using straight-line depreciation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    pub name: String,
    pub capex: f64,
    pub useful_life_days: u32,
    pub in_service_day: u32,
}

impl Asset {
    #[must_use]
    pub fn depreciation_per_day(&self) -> f64 {
        if self.useful_life_days == 0 {
            return 0.0;
        }
        self.capex / f64::from(self.useful_life_days)
    }

    /// Daily charge, zero before service start and after full depreciation.
    #[must_use]
    pub fn depreciation_on_day(&self, day: u32) -> f64 {
        if day < self.in_service_day {
            return 0.0;
        }
        let age = day - self.in_service_day;
        if age >= self.useful_life_days {
            return 0.0;
        }
        self.depreciation_per_day()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    /// Weighted-average cost, updated on every receipt.
    pub unit_cost: f64,
    pub qty: f64,
}

/// Reorder-point policy for one SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishmentRule {
    pub sku: String,
    pub name: String,
    pub enabled: bool,
    pub reorder_point: f64,
    pub safety_stock: f64,
    pub target_stock: f64,
    pub lead_time_days: u32,
    pub unit_cost: f64,
}

impl Default for ReplenishmentRule {
    fn default() -> Self {
        Self {
            sku: String::new(),
            name: String::new(),
            enabled: true,
            reorder_point: 50.0,
            safety_stock: 80.0,
            target_stock: 150.0,
            lead_time_days: 2,
            unit_cost: 0.0,
        }
    }
}

/// Inventory in transit toward a store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingInbound {
    pub sku: String,
    pub name: String,
    pub qty: f64,
    pub unit_cost: f64,
    pub order_day: u32,
    pub arrive_day: u32,
}

/// Recruits in the hiring pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingHire {
    pub qty: u32,
    pub order_day: u32,
    pub arrive_day: u32,
}

/// Staffing plan and live headcount for a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkforceConfig {
    pub planned_headcount: u32,
    pub current_headcount: u32,
    /// 0..1, scales the staffing capacity factor.
    pub training_level: f64,
    pub daily_turnover_rate: f64,
    pub recruiting_enabled: bool,
    pub recruiting_daily_budget: f64,
    pub recruiting_lead_days: u32,
    /// Expected hires per 100 currency units of daily budget.
    pub recruiting_hire_rate_per_100_budget: f64,
    pub shifts_per_day: u32,
    pub staffing_per_shift: u32,
    pub overtime_shift_enabled: bool,
    pub overtime_shift_extra_capacity: f64,
    pub overtime_shift_daily_cost: f64,
    /// Missing categories/roles default to a neutral factor of 1.0.
    pub skill_by_category: BTreeMap<ServiceCategory, f64>,
    pub shift_allocation_by_category: BTreeMap<ServiceCategory, f64>,
    pub skill_by_role: BTreeMap<String, f64>,
    pub shift_allocation_by_role: BTreeMap<String, f64>,
}

impl Default for WorkforceConfig {
    fn default() -> Self {
        Self {
            planned_headcount: 6,
            current_headcount: 6,
            training_level: 0.5,
            daily_turnover_rate: 0.002,
            recruiting_enabled: false,
            recruiting_daily_budget: 0.0,
            recruiting_lead_days: 7,
            recruiting_hire_rate_per_100_budget: 0.20,
            shifts_per_day: 2,
            staffing_per_shift: 3,
            overtime_shift_enabled: false,
            overtime_shift_extra_capacity: 0.15,
            overtime_shift_daily_cost: 0.0,
            skill_by_category: BTreeMap::new(),
            shift_allocation_by_category: BTreeMap::new(),
            skill_by_role: BTreeMap::new(),
            shift_allocation_by_role: BTreeMap::new(),
        }
    }
}

/// One operated store attached to a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub store_id: String,
    pub name: String,
    pub station_id: String,
    pub city: String,
    pub district: String,
    pub provider: String,
    pub status: StoreStatus,
    pub operation_start_day: u32,
    pub traffic_conversion_rate: f64,
    /// 0..1, stronger competition diverts more demand.
    pub local_competition_intensity: f64,
    /// 0.5..1.5, offsets competitor diversion.
    pub attractiveness_index: f64,
    pub construction_days_remaining: u32,
    /// Hourly rate used to split project revenue into labor vs parts.
    pub labor_hour_price: f64,
    pub capex_total: f64,
    pub capex_spend_per_day: f64,
    pub capex_useful_life_days: u32,
    pub cash_balance: f64,
    pub fixed_overhead_per_day: f64,
    pub service_lines: BTreeMap<String, ServiceLine>,
    pub projects: BTreeMap<String, ServiceProject>,
    pub inventory: BTreeMap<String, InventoryItem>,
    pub assets: Vec<Asset>,
    pub payroll: PayrollPlan,
    pub workforce: WorkforceConfig,
    pub ancillary: AncillaryConfig,
    pub opex: OpexConfig,
    pub mitigation: MitigationConfig,
    pub auto_replenishment_enabled: bool,
    pub replenishment_rules: BTreeMap<String, ReplenishmentRule>,
    pub pending_inbounds: Vec<PendingInbound>,
    pub pending_hires: Vec<PendingHire>,
    /// When true, projects require inventory parts; otherwise fall back to
    /// the line's `parts_cost_ratio` approximation.
    pub strict_parts: bool,
    pub mtd_orders_by_service: BTreeMap<String, u32>,
    pub mtd_orders_by_project: BTreeMap<String, u32>,
    pub mtd_revenue: f64,
    pub mtd_variable_cost: f64,
    pub mtd_parts_cogs: f64,
    pub mtd_labor_cost: f64,
    pub mtd_depr_cost: f64,
    pub mtd_fixed_overhead: f64,
    pub mtd_operating_profit: f64,
    pub mtd_cash_in: f64,
    pub mtd_cash_out: f64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            store_id: String::new(),
            name: String::new(),
            station_id: String::new(),
            city: String::new(),
            district: String::new(),
            provider: String::new(),
            status: StoreStatus::Planning,
            operation_start_day: 1,
            traffic_conversion_rate: 1.0,
            local_competition_intensity: 0.0,
            attractiveness_index: 1.0,
            construction_days_remaining: 0,
            labor_hour_price: 120.0,
            capex_total: 0.0,
            capex_spend_per_day: 0.0,
            capex_useful_life_days: 5 * 365,
            cash_balance: 0.0,
            fixed_overhead_per_day: 0.0,
            service_lines: BTreeMap::new(),
            projects: BTreeMap::new(),
            inventory: BTreeMap::new(),
            assets: Vec::new(),
            payroll: PayrollPlan::default(),
            workforce: WorkforceConfig::default(),
            ancillary: AncillaryConfig::default(),
            opex: OpexConfig::default(),
            mitigation: MitigationConfig::default(),
            auto_replenishment_enabled: false,
            replenishment_rules: BTreeMap::new(),
            pending_inbounds: Vec::new(),
            pending_hires: Vec::new(),
            strict_parts: true,
            mtd_orders_by_service: BTreeMap::new(),
            mtd_orders_by_project: BTreeMap::new(),
            mtd_revenue: 0.0,
            mtd_variable_cost: 0.0,
            mtd_parts_cogs: 0.0,
            mtd_labor_cost: 0.0,
            mtd_depr_cost: 0.0,
            mtd_fixed_overhead: 0.0,
            mtd_operating_profit: 0.0,
            mtd_cash_in: 0.0,
            mtd_cash_out: 0.0,
        }
    }
}

impl Store {
    /// Clear all month-to-date accumulators at month rollover.
    pub fn reset_month_trackers(&mut self) {
        self.mtd_orders_by_service.clear();
        self.mtd_orders_by_project.clear();
        self.mtd_revenue = 0.0;
        self.mtd_variable_cost = 0.0;
        self.mtd_parts_cogs = 0.0;
        self.mtd_labor_cost = 0.0;
        self.mtd_depr_cost = 0.0;
        self.mtd_fixed_overhead = 0.0;
        self.mtd_operating_profit = 0.0;
        self.mtd_cash_in = 0.0;
        self.mtd_cash_out = 0.0;
    }
}

/// Headquarters revolving credit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditFacility {
    pub limit: f64,
    pub used: f64,
    pub daily_interest_rate: f64,
    /// When true, draw on negative cash and sweep repayments at day close.
    pub auto_finance: bool,
}

impl Default for CreditFacility {
    fn default() -> Self {
        Self {
            limit: 0.0,
            used: 0.0,
            daily_interest_rate: 0.0005,
            auto_finance: false,
        }
    }
}

/// Complete chain state, serializable as one save file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub day: u32,
    pub cash: f64,
    pub stations: BTreeMap<String, Station>,
    pub stores: BTreeMap<String, Store>,
    pub rng: RngJournal,
    pub credit: CreditFacility,
    pub event_templates: BTreeMap<String, EventTemplate>,
    pub active_events: Vec<ActiveEvent>,
    pub event_history: Vec<EventHistoryRecord>,
    /// Cooldown key to first day the template may fire again.
    pub event_cooldowns: BTreeMap<String, u32>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            day: 1,
            cash: 200_000.0,
            stations: BTreeMap::new(),
            stores: BTreeMap::new(),
            rng: RngJournal::new(20_260_101),
            credit: CreditFacility::default(),
            event_templates: BTreeMap::new(),
            active_events: Vec::new(),
            event_history: Vec::new(),
            event_cooldowns: BTreeMap::new(),
        }
    }
}

impl GameState {
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: RngJournal::new(seed),
            ..Self::default()
        }
    }

    /// Position within the accounting month, 1 through `month_len`.
    #[must_use]
    pub const fn month_day_index(&self, month_len: u32) -> u32 {
        let len = if month_len == 0 { 1 } else { month_len };
        ((self.day - 1) % len) + 1
    }
}
