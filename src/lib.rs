//! gridarb - multi-venue trading bot.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/    # Pure domain types (symbols, tickers, orders, balances)
//! ├── venue/     # Venue adapters + registry (permission gate, fault boundary)
//! ├── strategy/  # Strategy runtime: descriptors, scheduler, implementations
//! ├── api/       # HTTP control plane
//! └── config.rs  # Persisted JSON configuration
//! ```
//!
//! # Features
//!
//! - `testkit` - Expose the scriptable mock venue for tests

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod strategy;
pub mod venue;

#[cfg(feature = "testkit")]
pub mod testkit;
