//! Forecourt Simulation Engine
//!
//! Platform-agnostic core for the deterministic forecourt retail simulation:
//! a chain of auto-service stores attached to fuel stations, advanced one day
//! at a time. This crate provides all simulation mechanics without UI or
//! platform-specific dependencies.

use thiserror::Error;

pub mod ancillary;
pub mod config;
pub mod constants;
pub mod demand;
pub mod events;
pub mod finance;
pub mod fulfillment;
pub mod inventory;
pub mod ledger;
pub mod payroll;
pub mod rng;
pub mod sampling;
pub mod state;
pub mod tick;
pub mod workforce;

// Re-export commonly used types
pub use ancillary::{
    AncillaryConfig, AncillaryOutcome, InsuranceBizConfig, OnlineBizConfig, SupplyChainConfig,
    UsedCarBizConfig,
};
pub use config::{
    ConfigError, EngineConfig, MitigationConfig, OpexConfig, RentConfig, UtilitiesConfig,
};
pub use events::{
    ActiveEvent, CombinedEffects, EventHistoryRecord, EventKind, EventScope, EventSummary,
    EventSummarySet, EventTemplate, TargetStrategy,
};
pub use finance::{apply_credit_facility, close_store};
pub use inventory::{purchase_inventory, InboundArrival, ReplenishmentOrder};
pub use ledger::{
    DayResult, DayStoreResult, MitigationAction, MitigationKind, WorkforceBreakdown,
};
pub use payroll::{CommissionBase, CommissionInputs, PayrollPlan, RolePlan, TierBonus};
pub use rng::RngJournal;
pub use state::{
    Asset, CreditFacility, GameState, InventoryItem, PendingHire, PendingInbound,
    ReplenishmentRule, ServiceCategory, ServiceLine, ServiceProject, Station, Store, StoreStatus,
    WorkforceConfig,
};
pub use tick::simulate_day;
pub use workforce::WorkforceDaily;

/// Failures surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown event template `{0}`")]
    UnknownTemplate(String),
    #[error("unknown store `{0}`")]
    UnknownStore(String),
    #[error("store `{store_id}` references missing station `{station_id}`")]
    MissingStation { store_id: String, station_id: String },
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait StateStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist the chain state under a named slot
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    fn save_state(&self, slot: &str, state: &GameState) -> Result<(), Self::Error>;

    /// Load the chain state from a named slot
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    fn load_state(&self, slot: &str) -> Result<Option<GameState>, Self::Error>;

    /// Persist one day's results alongside the slot
    ///
    /// # Errors
    ///
    /// Returns an error if the results cannot be saved.
    fn append_day_result(&self, slot: &str, result: &DayResult) -> Result<(), Self::Error>;
}

/// Main engine for driving simulations against a persistence backend
pub struct SimEngine<S>
where
    S: StateStore,
{
    storage: S,
    config: EngineConfig,
}

impl<S> SimEngine<S>
where
    S: StateStore,
{
    /// Create a new engine over the provided storage backend
    pub const fn new(storage: S, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a fresh chain with the specified seed
    #[must_use]
    pub fn create_chain(&self, seed: u64) -> GameState {
        GameState::with_seed(seed)
    }

    /// Advance a slot by one day: load, tick, persist state and results.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is missing, the tick fails, or the
    /// backend cannot persist the outcome.
    pub fn step_slot(&self, slot: &str) -> Result<DayResult, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let mut state = self
            .storage
            .load_state(slot)
            .map_err(Into::into)?
            .ok_or_else(|| anyhow::anyhow!("no saved state in slot `{slot}`"))?;
        let result = tick::simulate_day(&mut state, &self.config)?;
        self.storage.save_state(slot, &state).map_err(Into::into)?;
        self.storage
            .append_day_result(slot, &result)
            .map_err(Into::into)?;
        Ok(result)
    }

    /// Save a chain state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn save_chain(&self, slot: &str, state: &GameState) -> Result<(), S::Error> {
        self.storage.save_state(slot, state)
    }

    /// Load a chain state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub fn load_chain(&self, slot: &str) -> Result<Option<GameState>, S::Error> {
        self.storage.load_state(slot)
    }
}
