//! Strategy runtime: descriptors, lifecycle, scheduler, implementations.

pub mod arbitrage;
pub mod grid;
mod params;
mod registry;
mod runner;
mod state;

pub use params::{ParamKind, ParamSpec, Parameters, StrategyDescriptor};
pub use registry::{ActiveStatus, StrategyDefinition, StrategyRegistry};
pub use runner::{Strategy, StrategyRunner};
pub use state::{Performance, StrategyState};
