//! In-memory [`BrokerTransport`] for host builds and tests.
//!
//! Records every subscribe and publish, and lets the caller play the
//! broker's side: `connect`, `disconnect` and `deliver` invoke the event
//! handler handed over in `start`, on the caller's thread.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::app::ports::{BrokerEvent, BrokerEventHandler, BrokerTransport};
use crate::error::CommsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Default)]
struct Log {
    subscribed: Vec<String>,
    published: Vec<Published>,
    starts: usize,
}

#[derive(Default)]
pub struct MemoryBroker {
    handler: Mutex<Option<BrokerEventHandler>>,
    log: Mutex<Log>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, event: BrokerEvent) -> bool {
        let handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        match handler.as_ref() {
            Some(h) => {
                h(event);
                true
            }
            None => false,
        }
    }

    /// Report a Connected transition. `false` if never started.
    pub fn connect(&self) -> bool {
        self.fire(BrokerEvent::Connected)
    }

    pub fn disconnect(&self) -> bool {
        self.fire(BrokerEvent::Disconnected)
    }

    /// Deliver an inbound message.
    pub fn deliver(&self, topic: &str, payload: &str) -> bool {
        self.fire(BrokerEvent::Message {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        })
    }

    pub fn starts(&self) -> usize {
        self.log().starts
    }

    /// Every subscribe issued so far, in order.
    pub fn subscribed(&self) -> Vec<String> {
        self.log().subscribed.clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.log().published.clone()
    }

    /// Payloads published to `topic`, oldest first.
    pub fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.log()
            .published
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        let mut log = self.log();
        log.subscribed.clear();
        log.published.clear();
    }
}

impl BrokerTransport for MemoryBroker {
    fn start(&self, on_event: BrokerEventHandler) -> Result<(), CommsError> {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(on_event);
        self.log().starts += 1;
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), CommsError> {
        self.log().subscribed.push(topic.to_owned());
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        self.log().published.push(Published {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
            retain,
        });
        Ok(())
    }
}
