//! Run summary

use relay_network::RelayEvent;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub steps: u32,
    /// Traffic entries that found a route.
    pub routed: usize,
    pub unroutable: usize,
    pub events: BTreeMap<&'static str, usize>,
    /// Events lost because the subscriber fell behind.
    pub lagged: u64,
}

impl Summary {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, event: &RelayEvent) {
        *self.events.entry(event.name()).or_default() += 1;
    }

    /// Consume everything currently buffered on `events`.
    pub fn drain(&mut self, events: &mut broadcast::Receiver<RelayEvent>) {
        loop {
            match events.try_recv() {
                Ok(event) => self.record(&event),
                Err(TryRecvError::Lagged(missed)) => self.lagged += missed,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.get(name).copied().unwrap_or(0)
    }
}
