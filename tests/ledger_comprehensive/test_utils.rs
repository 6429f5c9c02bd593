//! Shared fixtures for the ledger suite

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tally::{InMemoryObjectStore, ManualClock, Tally, TallyConfig};

/// Facade, its store and its clock
pub struct Fixture {
    pub store: Arc<InMemoryObjectStore>,
    pub clock: Arc<ManualClock>,
    pub tally: Tally,
}

impl Fixture {
    /// Default config with zero backoff delays
    pub fn new() -> Self {
        let mut config = TallyConfig::default();
        config.retry = config.retry.with_base_delay_ms(0).with_max_delay_ms(0);
        Self::with_config(config)
    }

    pub fn with_config(config: TallyConfig) -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let tally = Tally::with_clock(store.clone(), config, clock.clone()).unwrap();
        Self {
            store,
            clock,
            tally,
        }
    }

    /// Advance the clock so the next run gets a later key
    pub fn tick(&self) {
        self.clock.advance_ms(1_000);
    }
}
