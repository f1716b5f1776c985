//! Venue adapters and the registry that owns them.
//!
//! Every venue, generic or bespoke, presents the same operation surface
//! ([`VenueAdapter`]). The [`VenueRegistry`] owns the live adapters, gates
//! every call on configured permission levels, and converts adapter failures
//! into neutral results so strategies observe "no data this tick" instead of
//! errors.

mod adapter;
mod factory;
mod parse;
mod registry;
pub mod tradeogre;
pub mod unified;

pub use adapter::VenueAdapter;
pub use factory::AdapterFactory;
pub use parse::decimal_or;
pub use registry::VenueRegistry;
