//! Role-based payroll: daily base pay plus layered commission rules.
//!
//! Base pay accrues daily from a monthly figure. Commission rules stack; a
//! role earns every rule it has a non-zero rate for. Tier bonuses and profit
//! share settle once, on the accounting month's last day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{ServiceCategory, Store};

/// What a commission rate multiplies against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionBase {
    #[default]
    Revenue,
    GrossProfit,
}

impl CommissionBase {
    /// Gross-profit bases never pay on a loss.
    #[must_use]
    pub fn pick(self, revenue: f64, gross_profit: f64) -> f64 {
        match self {
            Self::Revenue => revenue.max(0.0),
            Self::GrossProfit => gross_profit.max(0.0),
        }
    }
}

/// Month-end bonus step: hit the order threshold, earn the bonus per head.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBonus {
    pub threshold_orders: u32,
    pub bonus: f64,
}

/// Compensation plan for one role at one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePlan {
    pub role: String,
    pub headcount: u32,
    pub base_monthly: f64,
    pub position_allowance: f64,
    /// Employer contribution rates layered on top of base pay.
    pub social_security_rate: f64,
    pub housing_fund_rate: f64,
    pub workdays_per_month: u32,
    /// Per-order piece rates keyed by service line.
    pub piece_rate: BTreeMap<String, f64>,
    /// Per-order piece rates keyed by project.
    pub piece_rate_project: BTreeMap<String, f64>,
    pub sales_commission_by_service: BTreeMap<String, f64>,
    pub gross_profit_commission_by_service: BTreeMap<String, f64>,
    pub gross_profit_commission_by_project: BTreeMap<String, f64>,
    /// Highest reached tier wins; paid per head at month-end.
    pub monthly_tier_bonus: Vec<TierBonus>,
    /// Share of positive MTD operating profit, paid at month-end.
    pub profit_share_rate: f64,
    /// Broad rates over aggregate bases.
    pub sales_commission_rate: f64,
    pub labor_commission_rate: f64,
    pub parts_commission_rate: f64,
    pub parts_commission_base: CommissionBase,
    pub wash_commission_base: CommissionBase,
    pub wash_commission_rate: f64,
    pub maintenance_commission_base: CommissionBase,
    pub maintenance_commission_rate: f64,
    pub detailing_commission_base: CommissionBase,
    pub detailing_commission_rate: f64,
}

impl Default for RolePlan {
    fn default() -> Self {
        Self {
            role: String::new(),
            headcount: 0,
            base_monthly: 0.0,
            position_allowance: 0.0,
            social_security_rate: 0.0,
            housing_fund_rate: 0.0,
            workdays_per_month: 26,
            piece_rate: BTreeMap::new(),
            piece_rate_project: BTreeMap::new(),
            sales_commission_by_service: BTreeMap::new(),
            gross_profit_commission_by_service: BTreeMap::new(),
            gross_profit_commission_by_project: BTreeMap::new(),
            monthly_tier_bonus: Vec::new(),
            profit_share_rate: 0.0,
            sales_commission_rate: 0.0,
            labor_commission_rate: 0.0,
            parts_commission_rate: 0.0,
            parts_commission_base: CommissionBase::Revenue,
            wash_commission_base: CommissionBase::Revenue,
            wash_commission_rate: 0.0,
            maintenance_commission_base: CommissionBase::Revenue,
            maintenance_commission_rate: 0.0,
            detailing_commission_base: CommissionBase::Revenue,
            detailing_commission_rate: 0.0,
        }
    }
}

impl RolePlan {
    /// Fixed daily cost for the whole role crew, employer contributions
    /// included, spread over configured workdays.
    #[must_use]
    pub fn base_daily(&self) -> f64 {
        let workdays = f64::from(self.workdays_per_month.max(1));
        let base = (self.base_monthly + self.position_allowance)
            * (1.0 + self.social_security_rate.max(0.0) + self.housing_fund_rate.max(0.0));
        base * f64::from(self.headcount) / workdays
    }
}

/// Payroll plans for a store, keyed by role name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollPlan {
    pub roles: BTreeMap<String, RolePlan>,
}

#[must_use]
pub fn role_headcount(store: &Store, role: &str) -> u32 {
    store
        .payroll
        .roles
        .get(role)
        .map_or(0, |plan| plan.headcount)
}

/// Daily bases the commission rules draw on.
#[derive(Debug, Clone, Default)]
pub struct CommissionInputs {
    pub orders_by_service: BTreeMap<String, u32>,
    pub revenue_by_service: BTreeMap<String, f64>,
    pub gross_profit_by_service: BTreeMap<String, f64>,
    pub orders_by_project: BTreeMap<String, u32>,
    pub gross_profit_by_project: BTreeMap<String, f64>,
    pub revenue_by_category: BTreeMap<ServiceCategory, f64>,
    pub gross_profit_by_category: BTreeMap<ServiceCategory, f64>,
    pub labor_revenue: f64,
    pub parts_revenue: f64,
    pub parts_gross_profit: f64,
    pub is_month_end: bool,
}

impl CommissionInputs {
    fn category_revenue(&self, cat: ServiceCategory) -> f64 {
        self.revenue_by_category.get(&cat).copied().unwrap_or(0.0)
    }

    fn category_gross_profit(&self, cat: ServiceCategory) -> f64 {
        self.gross_profit_by_category
            .get(&cat)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Total labor cost for the day across every staffed role.
#[must_use]
pub fn compute_labor_cost(store: &Store, inputs: &CommissionInputs) -> f64 {
    let revenue_total: f64 = inputs.revenue_by_category.values().sum();
    let mut total = 0.0;

    for plan in store.payroll.roles.values() {
        if plan.headcount == 0 {
            continue;
        }

        total += plan.base_daily();

        if plan.sales_commission_rate > 0.0 {
            total += revenue_total.max(0.0) * plan.sales_commission_rate;
        }

        for (cat, base, rate) in [
            (
                ServiceCategory::Wash,
                plan.wash_commission_base,
                plan.wash_commission_rate,
            ),
            (
                ServiceCategory::Maintenance,
                plan.maintenance_commission_base,
                plan.maintenance_commission_rate,
            ),
            (
                ServiceCategory::Detailing,
                plan.detailing_commission_base,
                plan.detailing_commission_rate,
            ),
        ] {
            if rate > 0.0 {
                let value =
                    base.pick(inputs.category_revenue(cat), inputs.category_gross_profit(cat));
                total += value * rate;
            }
        }

        if plan.labor_commission_rate > 0.0 {
            total += inputs.labor_revenue.max(0.0) * plan.labor_commission_rate;
        }
        if plan.parts_commission_rate > 0.0 {
            let value = plan
                .parts_commission_base
                .pick(inputs.parts_revenue, inputs.parts_gross_profit);
            total += value * plan.parts_commission_rate;
        }

        for (sid, orders) in &inputs.orders_by_service {
            if let Some(rate) = plan.piece_rate.get(sid) {
                total += f64::from(*orders) * rate * f64::from(plan.headcount);
            }
        }
        for (pid, orders) in &inputs.orders_by_project {
            if let Some(rate) = plan.piece_rate_project.get(pid) {
                total += f64::from(*orders) * rate * f64::from(plan.headcount);
            }
        }

        for (sid, revenue) in &inputs.revenue_by_service {
            if let Some(rate) = plan.sales_commission_by_service.get(sid) {
                total += revenue * rate;
            }
        }
        for (sid, gp) in &inputs.gross_profit_by_service {
            if let Some(rate) = plan.gross_profit_commission_by_service.get(sid) {
                total += gp.max(0.0) * rate;
            }
        }
        for (pid, gp) in &inputs.gross_profit_by_project {
            if let Some(rate) = plan.gross_profit_commission_by_project.get(pid) {
                total += gp.max(0.0) * rate;
            }
        }

        if inputs.is_month_end && !plan.monthly_tier_bonus.is_empty() {
            let mtd_orders: u32 = store.mtd_orders_by_service.values().sum();
            let mut best = 0.0_f64;
            for tier in &plan.monthly_tier_bonus {
                if mtd_orders >= tier.threshold_orders {
                    best = best.max(tier.bonus);
                }
            }
            total += best * f64::from(plan.headcount);
        }

        if inputs.is_month_end && plan.profit_share_rate > 0.0 {
            total += store.mtd_operating_profit.max(0.0) * plan.profit_share_rate;
        }
    }

    total
}
