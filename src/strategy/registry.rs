//! Strategy registry: explicit registration, exactly one active strategy.
//!
//! Implementations register a constructor plus a metadata descriptor at
//! program start; no runtime code loading. The registry owns at most one
//! active strategy runner at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::Result;
use crate::venue::VenueRegistry;

use super::{Parameters, Performance, Strategy, StrategyDescriptor, StrategyRunner, StrategyState};

/// Constructor signature every strategy registers.
pub type BuildFn =
    fn(Arc<VenueRegistry>, &Parameters, Arc<StrategyState>) -> Result<Box<dyn Strategy>>;

/// A registered strategy implementation: metadata plus constructor.
pub struct StrategyDefinition {
    pub descriptor: StrategyDescriptor,
    pub build: BuildFn,
}

/// Status snapshot of the active strategy, shaped for the control plane.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl ActiveStatus {
    fn inactive() -> Self {
        Self {
            active: false,
            id: None,
            name: None,
            running: None,
            parameters: None,
            performance: None,
            last_update: None,
        }
    }
}

#[derive(Default)]
pub struct StrategyRegistry {
    definitions: BTreeMap<&'static str, StrategyDefinition>,
    active: Mutex<Option<StrategyRunner>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in strategies.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(super::arbitrage::definition());
        registry.register(super::grid::definition());
        registry
    }

    pub fn register(&mut self, definition: StrategyDefinition) {
        info!(strategy = definition.descriptor.id, "Registered strategy");
        self.definitions
            .insert(definition.descriptor.id, definition);
    }

    pub fn strategy_info(&self, strategy_id: &str) -> Option<&StrategyDescriptor> {
        self.definitions.get(strategy_id).map(|d| &d.descriptor)
    }

    /// Metadata for every registered strategy; instantiates nothing.
    pub fn all_strategies_info(&self) -> Vec<&StrategyDescriptor> {
        self.definitions.values().map(|d| &d.descriptor).collect()
    }

    /// Install a new active strategy, stopping the previous one first.
    ///
    /// Construction failure returns `false`; the previous strategy has
    /// already been stopped and is not restored.
    pub async fn set_active(
        &self,
        strategy_id: &str,
        venues: Arc<VenueRegistry>,
        parameters: Parameters,
    ) -> bool {
        let mut active = self.active.lock().await;

        if let Some(runner) = active.take() {
            runner.stop().await;
        }

        let Some(definition) = self.definitions.get(strategy_id) else {
            error!(strategy = %strategy_id, "Strategy not found");
            return false;
        };

        let state = Arc::new(StrategyState::new());
        match (definition.build)(venues, &parameters, state.clone()) {
            Ok(strategy) => {
                *active = Some(StrategyRunner::new(
                    definition.descriptor.clone(),
                    parameters,
                    state,
                    strategy,
                ));
                info!(strategy = %strategy_id, "Initialized strategy");
                true
            }
            Err(e) => {
                error!(strategy = %strategy_id, error = %e, "Failed to initialize strategy");
                false
            }
        }
    }

    /// Start the active strategy. `false` when none is installed.
    pub async fn start_active(&self) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(runner) => {
                runner.start().await;
                true
            }
            None => {
                error!("No active strategy to start");
                false
            }
        }
    }

    /// Stop the active strategy. `false` when none is installed.
    pub async fn stop_active(&self) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(runner) => {
                runner.stop().await;
                true
            }
            None => {
                error!("No active strategy to stop");
                false
            }
        }
    }

    pub async fn active_status(&self) -> ActiveStatus {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(runner) => ActiveStatus {
                active: true,
                id: Some(runner.descriptor().id.to_string()),
                name: Some(runner.descriptor().name.to_string()),
                running: Some(runner.is_running()),
                parameters: Some(runner.parameters().raw().clone()),
                performance: Some(runner.state().performance()),
                last_update: runner.state().last_tick_time(),
            },
            None => ActiveStatus::inactive(),
        }
    }
}
