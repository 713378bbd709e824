//! Station traffic sampling and demand rationing.

use std::collections::BTreeMap;

use rand::Rng;

use crate::constants::{
    ATTRACTIVENESS_MAX, ATTRACTIVENESS_MIN, COMPETITION_DIVERSION_RATE, COMPETITION_FACTOR_MAX,
    COMPETITION_FACTOR_MIN,
};
use crate::sampling::{clamp, clamp01, int_jitter};
use crate::state::{Station, Store};

/// Vehicles arriving at a station for one day, before event multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrafficSample {
    pub fuel: u32,
    pub visitor: u32,
}

/// Jitter both traffic pools symmetrically by the station's volatility.
pub fn sample_traffic<R: Rng + ?Sized>(station: &Station, rng: &mut R) -> TrafficSample {
    TrafficSample {
        fuel: jitter_count(station.fuel_vehicles_per_day, station.traffic_volatility, rng),
        visitor: jitter_count(station.visitor_vehicles_per_day, station.traffic_volatility, rng),
    }
}

fn jitter_count<R: Rng + ?Sized>(base: u32, volatility: f64, rng: &mut R) -> u32 {
    if base == 0 {
        return 0;
    }
    let v = volatility.max(0.0);
    #[allow(clippy::cast_possible_truncation)]
    let spread = (f64::from(base) * v).round() as i64;
    let jittered = i64::from(base) + int_jitter(rng, spread);
    u32::try_from(jittered.max(0)).unwrap_or(u32::MAX)
}

/// Demand capture under local competition.
///
/// Stronger competition diverts demand away; attractiveness partially
/// offsets the diversion. The product is clamped to [0.2, 1.5].
#[must_use]
pub fn competition_factor(store: &Store) -> f64 {
    let comp = clamp01(store.local_competition_intensity);
    let attract = clamp(
        ATTRACTIVENESS_MIN,
        ATTRACTIVENESS_MAX,
        store.attractiveness_index,
    );
    clamp(
        COMPETITION_FACTOR_MIN,
        COMPETITION_FACTOR_MAX,
        (1.0 - COMPETITION_DIVERSION_RATE * comp) * attract,
    )
}

/// Raw per-line demand, rationed so total orders never exceed total traffic.
///
/// Each vehicle buys at most one service; when the sum of raw conversions
/// exceeds traffic, every line scales down proportionally.
#[must_use]
pub fn rationed_demand(
    store: &Store,
    fuel_traffic: u32,
    visitor_traffic: u32,
    conversion_multiplier: f64,
) -> BTreeMap<String, f64> {
    let traffic_total = u64::from(fuel_traffic) + u64::from(visitor_traffic);
    if traffic_total == 0 || store.service_lines.is_empty() {
        return BTreeMap::new();
    }

    let factor = competition_factor(store);
    let mult = (store.traffic_conversion_rate * conversion_multiplier.max(0.0)).max(0.0);

    let mut raw = BTreeMap::new();
    for (sid, line) in &store.service_lines {
        let orders = (f64::from(fuel_traffic) * line.conversion_from_fuel
            + f64::from(visitor_traffic) * line.conversion_from_visitor)
            * mult
            * factor;
        raw.insert(sid.clone(), orders.max(0.0));
    }

    let raw_total: f64 = raw.values().sum();
    if raw_total <= 0.0 {
        return BTreeMap::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let traffic_total_f = traffic_total as f64;
    if raw_total > traffic_total_f {
        let scale = traffic_total_f / raw_total;
        for v in raw.values_mut() {
            *v *= scale;
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ServiceLine;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn wash_store() -> Store {
        let mut store = Store::default();
        store.service_lines.insert(
            "wash".into(),
            ServiceLine {
                service_id: "wash".into(),
                price: 30.0,
                conversion_from_fuel: 0.02,
                conversion_from_visitor: 0.10,
                capacity_per_day: 100,
                ..ServiceLine::default()
            },
        );
        store
    }

    #[test]
    fn zero_volatility_is_exact() {
        let station = Station {
            fuel_vehicles_per_day: 500,
            visitor_vehicles_per_day: 20,
            traffic_volatility: 0.0,
            ..Station::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let t = sample_traffic(&station, &mut rng);
        assert_eq!((t.fuel, t.visitor), (500, 20));
    }

    #[test]
    fn jitter_stays_within_volatility_band() {
        let station = Station {
            fuel_vehicles_per_day: 1_000,
            visitor_vehicles_per_day: 0,
            traffic_volatility: 0.10,
            ..Station::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            let t = sample_traffic(&station, &mut rng);
            assert!((900..=1_100).contains(&t.fuel));
            assert_eq!(t.visitor, 0);
        }
    }

    #[test]
    fn competition_factor_bounds() {
        let mut store = Store::default();
        assert!((competition_factor(&store) - 1.0).abs() < f64::EPSILON);
        store.local_competition_intensity = 1.0;
        store.attractiveness_index = 0.5;
        // (1 - 0.7) * 0.5 = 0.15, clamped up to 0.2.
        assert!((competition_factor(&store) - 0.2).abs() < f64::EPSILON);
        store.local_competition_intensity = 0.0;
        store.attractiveness_index = 9.0;
        assert!((competition_factor(&store) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn demand_follows_conversion() {
        let store = wash_store();
        let demand = rationed_demand(&store, 500, 10, 1.0);
        // 500 * 0.02 + 10 * 0.10 = 11 orders.
        assert!((demand["wash"] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn demand_rations_to_traffic() {
        let mut store = wash_store();
        if let Some(line) = store.service_lines.get_mut("wash") {
            line.conversion_from_fuel = 2.0;
        }
        let demand = rationed_demand(&store, 100, 0, 1.0);
        assert!((demand["wash"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn no_traffic_no_demand() {
        let store = wash_store();
        assert!(rationed_demand(&store, 0, 0, 1.0).is_empty());
    }
}
