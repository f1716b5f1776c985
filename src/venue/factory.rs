//! Venue adapter factory.
//!
//! Maps a `venue_id` to a concrete adapter implementation.

use std::sync::Arc;

use crate::config::VenueConfig;
use crate::error::{Error, Result};

use super::tradeogre::{self, TradeOgre};
use super::unified::{self, UnifiedVenue};
use super::VenueAdapter;

pub struct AdapterFactory;

impl AdapterFactory {
    /// Create an adapter for the configured venue.
    pub fn create(config: &VenueConfig) -> Result<Arc<dyn VenueAdapter>> {
        if config.venue_id == tradeogre::VENUE_ID {
            return Ok(Arc::new(TradeOgre::new(config)));
        }

        match unified::descriptor(&config.venue_id) {
            Some(descriptor) => Ok(Arc::new(UnifiedVenue::new(descriptor, config))),
            None => Err(Error::VenueNotFound(config.venue_id.clone())),
        }
    }

    /// Venue ids an adapter implementation exists for.
    pub fn supported_venues() -> Vec<&'static str> {
        let mut venues: Vec<&'static str> =
            unified::DESCRIPTORS.iter().map(|d| d.id).collect();
        venues.push(tradeogre::VENUE_ID);
        venues
    }

    pub fn is_supported(venue_id: &str) -> bool {
        venue_id == tradeogre::VENUE_ID || unified::descriptor(venue_id).is_some()
    }
}
