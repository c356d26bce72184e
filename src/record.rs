use serde::{Deserialize, Serialize};

pub type RecordId = u64;

/// One ingested data point. `timestamp` is unix time in milliseconds.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub label: String,
    pub amount: f64,
    pub timestamp: i64,
}

impl Record {
    pub fn new(id: RecordId, label: impl Into<String>, amount: f64, timestamp: i64) -> Self {
        Self {
            id,
            label: label.into(),
            amount,
            timestamp,
        }
    }
}

/// A record as held by the buffer. `seq` is the arrival position assigned on append and is
/// strictly increasing within a buffer, so it stays unique even when a feed repeats an id.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub seq: u64,
    pub record: Record,
}

impl Entry {
    pub fn id(&self) -> RecordId {
        self.record.id
    }

    pub fn amount(&self) -> f64 {
        self.record.amount
    }
}
