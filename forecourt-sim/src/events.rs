//! Random operational events: sampling, stacking, cooldowns, and injection.
//!
//! Templates fire at day start from the primary stream. Severity maps the
//! template's effect ranges onto concrete multipliers, with "worse" meaning
//! lower for traffic, conversion, and capacity, and higher for variable cost.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    EVENT_CAPACITY_MULT_MAX, EVENT_CAPACITY_MULT_MIN, EVENT_CONVERSION_MULT_MAX,
    EVENT_CONVERSION_MULT_MIN, EVENT_HISTORY_CAP, EVENT_TRAFFIC_MULT_MAX, EVENT_TRAFFIC_MULT_MIN,
    EVENT_VAR_COST_MULT_MAX, EVENT_VAR_COST_MULT_MIN,
};
use crate::sampling::{clamp, clamp01, uniform, uniform_u32, weighted_index};
use crate::state::{GameState, Store};
use crate::EngineError;

/// Who an event template can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    Global,
    Station,
    #[default]
    Store,
}

impl EventScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Station => "station",
            Self::Store => "store",
        }
    }
}

/// How many targets a firing template selects within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStrategy {
    #[default]
    RandomOne,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Weather,
    Complaint,
    Outage,
    #[default]
    Other,
}

/// Declarative description of a recurring operational disruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTemplate {
    pub template_id: String,
    pub name: String,
    pub kind: EventKind,
    pub enabled: bool,
    pub daily_probability: f64,
    pub duration_days_min: u32,
    pub duration_days_max: u32,
    pub cooldown_days: u32,
    pub intensity_min: f64,
    pub intensity_max: f64,
    pub scope: EventScope,
    pub target_strategy: TargetStrategy,
    pub store_closed: bool,
    pub traffic_multiplier_min: f64,
    pub traffic_multiplier_max: f64,
    pub conversion_multiplier_min: f64,
    pub conversion_multiplier_max: f64,
    pub capacity_multiplier_min: f64,
    pub capacity_multiplier_max: f64,
    pub variable_cost_multiplier_min: f64,
    pub variable_cost_multiplier_max: f64,
}

impl Default for EventTemplate {
    fn default() -> Self {
        Self {
            template_id: String::new(),
            name: String::new(),
            kind: EventKind::Other,
            enabled: true,
            daily_probability: 0.01,
            duration_days_min: 1,
            duration_days_max: 3,
            cooldown_days: 7,
            intensity_min: 0.3,
            intensity_max: 1.0,
            scope: EventScope::Store,
            target_strategy: TargetStrategy::RandomOne,
            store_closed: false,
            traffic_multiplier_min: 1.0,
            traffic_multiplier_max: 1.0,
            conversion_multiplier_min: 1.0,
            conversion_multiplier_max: 1.0,
            capacity_multiplier_min: 1.0,
            capacity_multiplier_max: 1.0,
            variable_cost_multiplier_min: 1.0,
            variable_cost_multiplier_max: 1.0,
        }
    }
}

/// A sampled event currently in effect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveEvent {
    pub event_id: String,
    pub template_id: String,
    pub name: String,
    pub kind: EventKind,
    pub scope: EventScope,
    /// Empty for global scope.
    pub target_id: String,
    pub start_day: u32,
    pub end_day: u32,
    pub intensity: f64,
    pub store_closed: bool,
    pub traffic_multiplier: f64,
    pub conversion_multiplier: f64,
    pub capacity_multiplier: f64,
    pub variable_cost_multiplier: f64,
}

impl ActiveEvent {
    #[must_use]
    pub const fn is_active_on(&self, day: u32) -> bool {
        self.start_day <= day && day <= self.end_day
    }
}

/// Audit record kept after an event is sampled, capped at a rolling window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventHistoryRecord {
    pub event_id: String,
    pub template_id: String,
    pub name: String,
    pub kind: EventKind,
    pub scope: EventScope,
    pub target_id: String,
    pub start_day: u32,
    pub end_day: u32,
    pub created_day: u32,
    pub intensity: f64,
    pub store_closed: bool,
    pub traffic_multiplier: f64,
    pub conversion_multiplier: f64,
    pub capacity_multiplier: f64,
    pub variable_cost_multiplier: f64,
}

/// One line of the per-day event summary attached to store results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: String,
    pub template_id: String,
    pub name: String,
    pub kind: EventKind,
    pub scope: EventScope,
    pub target_id: String,
    pub start_day: u32,
    pub end_day: u32,
    pub closed: bool,
    pub traffic: f64,
    pub conversion: f64,
    pub capacity: f64,
    pub var_cost: f64,
}

pub type EventSummarySet = SmallVec<[EventSummary; 4]>;

/// Stacked event effects for one store on one day, after combined clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedEffects {
    pub closed: bool,
    pub traffic_multiplier: f64,
    pub conversion_multiplier: f64,
    pub capacity_multiplier: f64,
    pub variable_cost_multiplier: f64,
    pub summary: EventSummarySet,
}

impl Default for CombinedEffects {
    fn default() -> Self {
        Self {
            closed: false,
            traffic_multiplier: 1.0,
            conversion_multiplier: 1.0,
            capacity_multiplier: 1.0,
            variable_cost_multiplier: 1.0,
            summary: SmallVec::new(),
        }
    }
}

fn cooldown_key(template_id: &str, scope: EventScope, target_id: &str) -> String {
    format!("{template_id}:{}:{target_id}", scope.as_str())
}

/// Map a severity in [0, 1] onto an effect range.
///
/// With `worse_is_lower`, severity 0 yields the high end and severity 1 the
/// low end; otherwise the mapping runs low to high.
fn apply_severity_range(min_v: f64, max_v: f64, severity: f64, worse_is_lower: bool) -> f64 {
    let (lo, hi) = if max_v < min_v {
        (max_v, min_v)
    } else {
        (min_v, max_v)
    };
    let s = clamp01(severity);
    if worse_is_lower {
        hi - s * (hi - lo)
    } else {
        lo + s * (hi - lo)
    }
}

fn sample_event<R: Rng + ?Sized>(
    template: &EventTemplate,
    scope: EventScope,
    target_id: &str,
    day: u32,
    rng: &mut R,
) -> (ActiveEvent, EventHistoryRecord) {
    let dmin = template.duration_days_min.max(1);
    let dmax = template.duration_days_max.max(dmin);
    let duration = uniform_u32(rng, dmin, dmax);

    let (imin, imax) = if template.intensity_max < template.intensity_min {
        (template.intensity_max, template.intensity_min)
    } else {
        (template.intensity_min, template.intensity_max)
    };
    let intensity = uniform(rng, imin, imax);
    let severity = clamp01(intensity);

    let traffic = apply_severity_range(
        template.traffic_multiplier_min,
        template.traffic_multiplier_max,
        severity,
        true,
    );
    let conversion = apply_severity_range(
        template.conversion_multiplier_min,
        template.conversion_multiplier_max,
        severity,
        true,
    );
    let capacity = apply_severity_range(
        template.capacity_multiplier_min,
        template.capacity_multiplier_max,
        severity,
        true,
    );
    let var_cost = apply_severity_range(
        template.variable_cost_multiplier_min,
        template.variable_cost_multiplier_max,
        severity,
        false,
    );

    let tag: u32 = rng.r#gen();
    let event_id = format!("EV{day:06}_{tag:08x}");
    let end_day = day + duration - 1;

    let ev = ActiveEvent {
        event_id: event_id.clone(),
        template_id: template.template_id.clone(),
        name: template.name.clone(),
        kind: template.kind,
        scope,
        target_id: target_id.to_string(),
        start_day: day,
        end_day,
        intensity,
        store_closed: template.store_closed,
        traffic_multiplier: traffic,
        conversion_multiplier: conversion,
        capacity_multiplier: capacity,
        variable_cost_multiplier: var_cost,
    };
    let hist = EventHistoryRecord {
        event_id,
        template_id: template.template_id.clone(),
        name: template.name.clone(),
        kind: template.kind,
        scope,
        target_id: target_id.to_string(),
        start_day: day,
        end_day,
        created_day: day,
        intensity,
        store_closed: template.store_closed,
        traffic_multiplier: traffic,
        conversion_multiplier: conversion,
        capacity_multiplier: capacity,
        variable_cost_multiplier: var_cost,
    };
    (ev, hist)
}

fn push_history(state: &mut GameState, record: EventHistoryRecord) {
    state.event_history.push(record);
    if state.event_history.len() > EVENT_HISTORY_CAP {
        let excess = state.event_history.len() - EVENT_HISTORY_CAP;
        state.event_history.drain(..excess);
    }
}

fn register_cooldown(state: &mut GameState, template_id: &str, scope: EventScope, target: &str, end_day: u32, cooldown_days: u32) {
    let key = cooldown_key(template_id, scope, target);
    state.event_cooldowns.insert(key, end_day + cooldown_days + 1);
}

/// Day-start settlement: expire finished events, then roll every enabled
/// template once in template-id order so the draw sequence is reproducible.
pub fn day_start<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    let day = state.day;
    state.active_events.retain(|ev| ev.end_day >= day);

    let template_ids: Vec<String> = state.event_templates.keys().cloned().collect();
    for tid in template_ids {
        let Some(template) = state.event_templates.get(&tid).cloned() else {
            continue;
        };
        if !template.enabled || template.daily_probability <= 0.0 {
            continue;
        }
        if rng.r#gen::<f64>() >= template.daily_probability {
            continue;
        }

        let targets: Vec<String> = match template.scope {
            EventScope::Global => vec![String::new()],
            EventScope::Station => {
                if state.stations.is_empty() {
                    continue;
                }
                pick_targets(state.stations.keys(), template.target_strategy, rng)
            }
            EventScope::Store => {
                if state.stores.is_empty() {
                    continue;
                }
                pick_targets(state.stores.keys(), template.target_strategy, rng)
            }
        };

        for target in targets {
            let key = cooldown_key(&template.template_id, template.scope, &target);
            let next_ok = state.event_cooldowns.get(&key).copied().unwrap_or(1);
            if day < next_ok {
                continue;
            }
            let (ev, hist) = sample_event(&template, template.scope, &target, day, rng);
            let end_day = ev.end_day;
            state.active_events.push(ev);
            push_history(state, hist);
            register_cooldown(
                state,
                &template.template_id,
                template.scope,
                &target,
                end_day,
                template.cooldown_days,
            );
        }
    }
}

fn pick_targets<'a, R: Rng + ?Sized>(
    keys: impl Iterator<Item = &'a String>,
    strategy: TargetStrategy,
    rng: &mut R,
) -> Vec<String> {
    let all: Vec<String> = keys.cloned().collect();
    match strategy {
        TargetStrategy::All => all,
        TargetStrategy::RandomOne => {
            let weights = vec![1.0; all.len()];
            match weighted_index(rng, &weights) {
                Some(idx) => vec![all[idx].clone()],
                None => Vec::new(),
            }
        }
    }
}

/// Multiply together every active event that applies to `store`, then clamp
/// the combined multipliers so stacked events cannot run away.
#[must_use]
pub fn combine_effects_for_store(state: &GameState, store: &Store) -> CombinedEffects {
    let day = state.day;
    let mut out = CombinedEffects::default();

    for ev in &state.active_events {
        if !ev.is_active_on(day) {
            continue;
        }
        let applies = match ev.scope {
            EventScope::Global => true,
            EventScope::Station => store.station_id == ev.target_id,
            EventScope::Store => store.store_id == ev.target_id,
        };
        if !applies {
            continue;
        }

        out.closed = out.closed || ev.store_closed;
        out.traffic_multiplier *= ev.traffic_multiplier;
        out.conversion_multiplier *= ev.conversion_multiplier;
        out.capacity_multiplier *= ev.capacity_multiplier;
        out.variable_cost_multiplier *= ev.variable_cost_multiplier;
        out.summary.push(EventSummary {
            event_id: ev.event_id.clone(),
            template_id: ev.template_id.clone(),
            name: ev.name.clone(),
            kind: ev.kind,
            scope: ev.scope,
            target_id: ev.target_id.clone(),
            start_day: ev.start_day,
            end_day: ev.end_day,
            closed: ev.store_closed,
            traffic: ev.traffic_multiplier,
            conversion: ev.conversion_multiplier,
            capacity: ev.capacity_multiplier,
            var_cost: ev.variable_cost_multiplier,
        });
    }

    out.traffic_multiplier = clamp(
        EVENT_TRAFFIC_MULT_MIN,
        EVENT_TRAFFIC_MULT_MAX,
        out.traffic_multiplier,
    );
    out.conversion_multiplier = clamp(
        EVENT_CONVERSION_MULT_MIN,
        EVENT_CONVERSION_MULT_MAX,
        out.conversion_multiplier,
    );
    out.capacity_multiplier = clamp(
        EVENT_CAPACITY_MULT_MIN,
        EVENT_CAPACITY_MULT_MAX,
        out.capacity_multiplier,
    );
    out.variable_cost_multiplier = clamp(
        EVENT_VAR_COST_MULT_MIN,
        EVENT_VAR_COST_MULT_MAX,
        out.variable_cost_multiplier,
    );
    out
}

/// Force an event into the world from a template, for scenarios and ops tooling.
///
/// Rolls on an isolated stream derived from the injection coordinates, so the
/// same injection always produces the same event and the primary stream is
/// untouched. Explicit `duration_days` and `intensity` override the roll.
///
/// # Errors
///
/// Returns [`EngineError::UnknownTemplate`] when `template_id` is not loaded.
pub fn inject_from_template(
    state: &mut GameState,
    template_id: &str,
    scope: EventScope,
    target_id: &str,
    start_day: u32,
    duration_days: u32,
    intensity: Option<f64>,
) -> Result<ActiveEvent, EngineError> {
    let template = state
        .event_templates
        .get(template_id)
        .cloned()
        .ok_or_else(|| EngineError::UnknownTemplate(template_id.to_string()))?;

    let mut rng = state
        .rng
        .injection_stream(start_day, template_id, scope.as_str(), target_id);
    let (mut ev, mut hist) = sample_event(&template, scope, target_id, start_day, &mut rng);

    if duration_days > 0 {
        ev.start_day = start_day;
        ev.end_day = start_day + duration_days - 1;
        hist.start_day = ev.start_day;
        hist.end_day = ev.end_day;
    }
    if let Some(intensity) = intensity {
        let severity = clamp01(intensity);
        ev.intensity = intensity;
        hist.intensity = intensity;
        ev.traffic_multiplier = apply_severity_range(
            template.traffic_multiplier_min,
            template.traffic_multiplier_max,
            severity,
            true,
        );
        ev.conversion_multiplier = apply_severity_range(
            template.conversion_multiplier_min,
            template.conversion_multiplier_max,
            severity,
            true,
        );
        ev.capacity_multiplier = apply_severity_range(
            template.capacity_multiplier_min,
            template.capacity_multiplier_max,
            severity,
            true,
        );
        ev.variable_cost_multiplier = apply_severity_range(
            template.variable_cost_multiplier_min,
            template.variable_cost_multiplier_max,
            severity,
            false,
        );
        hist.traffic_multiplier = ev.traffic_multiplier;
        hist.conversion_multiplier = ev.conversion_multiplier;
        hist.capacity_multiplier = ev.capacity_multiplier;
        hist.variable_cost_multiplier = ev.variable_cost_multiplier;
    }

    state.active_events.push(ev.clone());
    push_history(state, hist);
    register_cooldown(
        state,
        &template.template_id,
        scope,
        target_id,
        ev.end_day,
        template.cooldown_days,
    );
    Ok(ev)
}
