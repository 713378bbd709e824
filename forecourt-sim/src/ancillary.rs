//! Ancillary revenue streams that ride on a store: online retail, insurance
//! brokerage, used-car referrals, and the supply-chain cost program.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::sampling::{clamp01, normal, poisson};
use crate::state::Store;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineBizConfig {
    pub enabled: bool,
    pub daily_orders_mean: f64,
    pub daily_orders_std: f64,
    pub avg_ticket: f64,
    pub margin_rate: f64,
}

impl Default for OnlineBizConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_orders_mean: 2.0,
            daily_orders_std: 0.5,
            avg_ticket: 200.0,
            margin_rate: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceBizConfig {
    pub enabled: bool,
    pub daily_revenue_target: f64,
    /// Std deviation as a fraction of the daily target.
    pub volatility: f64,
    pub margin_rate: f64,
}

impl Default for InsuranceBizConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_revenue_target: 128.4,
            volatility: 0.10,
            margin_rate: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsedCarBizConfig {
    pub enabled: bool,
    /// Expected deals per accounting month; daily rate is target / month_len.
    pub monthly_deal_target: f64,
    pub revenue_per_deal: f64,
    pub profit_per_deal: f64,
}

impl Default for UsedCarBizConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monthly_deal_target: 1.56,
            revenue_per_deal: 1_200.0,
            profit_per_deal: 600.0,
        }
    }
}

/// Procurement program shaving maintenance parts COGS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyChainConfig {
    pub enabled: bool,
    pub cost_reduction_rate: f64,
}

impl Default for SupplyChainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cost_reduction_rate: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AncillaryConfig {
    pub online: OnlineBizConfig,
    pub insurance: InsuranceBizConfig,
    pub used_car: UsedCarBizConfig,
    pub supply_chain: SupplyChainConfig,
}

/// Daily outcome across the three revenue streams.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AncillaryOutcome {
    pub rev_online: f64,
    pub gp_online: f64,
    pub rev_insurance: f64,
    pub gp_insurance: f64,
    pub rev_used_car: f64,
    pub gp_used_car: f64,
    pub used_car_deals: u32,
}

impl AncillaryOutcome {
    #[must_use]
    pub fn revenue(&self) -> f64 {
        self.rev_online + self.rev_insurance + self.rev_used_car
    }

    #[must_use]
    pub fn gross_profit(&self) -> f64 {
        self.gp_online + self.gp_insurance + self.gp_used_car
    }
}

/// Roll the day's ancillary streams for an open store.
pub fn simulate<R: Rng + ?Sized>(
    store: &Store,
    cfg: &EngineConfig,
    rng: &mut R,
) -> AncillaryOutcome {
    let mut out = AncillaryOutcome::default();
    let biz = &store.ancillary;

    if biz.online.enabled {
        let drawn = normal(
            rng,
            biz.online.daily_orders_mean,
            biz.online.daily_orders_std.max(0.0),
        );
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let orders = drawn.max(0.0).round() as u32;
        out.rev_online = f64::from(orders) * biz.online.avg_ticket.max(0.0);
        out.gp_online = out.rev_online * clamp01(biz.online.margin_rate);
    }

    if biz.insurance.enabled {
        let target = biz.insurance.daily_revenue_target.max(0.0);
        let std_dev = target * biz.insurance.volatility.max(0.0);
        out.rev_insurance = normal(rng, target, std_dev).max(0.0);
        out.gp_insurance = out.rev_insurance * clamp01(biz.insurance.margin_rate);
    }

    if biz.used_car.enabled {
        let month_len = cfg.month_len_days.max(1);
        let lambda = biz.used_car.monthly_deal_target.max(0.0) / f64::from(month_len);
        out.used_car_deals = poisson(rng, lambda);
        if out.used_car_deals > 0 {
            out.rev_used_car =
                f64::from(out.used_car_deals) * biz.used_car.revenue_per_deal.max(0.0);
            out.gp_used_car = f64::from(out.used_car_deals) * biz.used_car.profit_per_deal;
        }
    }

    out
}

/// Active parts COGS discount rate, zero when the program is off.
#[must_use]
pub fn supply_chain_reduction(store: &Store) -> f64 {
    if !store.ancillary.supply_chain.enabled {
        return 0.0;
    }
    clamp01(store.ancillary.supply_chain.cost_reduction_rate)
}
