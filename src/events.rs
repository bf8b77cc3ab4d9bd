// 11.0: outcome events from commands. consumers use them for notifications and audit trails.
// the EventPayload enum lists every event type.

use crate::decimal::{Collateral, Size};
use crate::store::SliceKey;
use crate::types::{Address, AssetId, Side, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Vault events
    PositionIncreased(PositionIncreasedEvent),
    VaultOperationFailed(VaultOperationFailedEvent),

    // Data events
    FetchRejected(FetchRejectedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionIncreasedEvent {
    pub account: Address,
    pub index_asset: AssetId,
    pub side: Side,
    pub size: Size,
    pub collateral: Collateral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultOperationFailedEvent {
    pub operation: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRejectedEvent {
    pub slice: SliceKey,
    pub error: String,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Stamps the payload with the next id and the current time.
    pub fn record(&mut self, payload: EventPayload) {
        let id = self.next_id();
        self.emit(Event::new(id, Timestamp::now(), payload));
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
