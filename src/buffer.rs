//! Arrival-ordered store of every record the dashboard has received.
//!
//! The buffer never reorders entries and never deduplicates by id: a feed that repeats an id
//! produces two entries. The only removal is retention eviction, which always takes the oldest
//! entries from the front so the retained entries keep their arrival order.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::record::{Entry, Record};

/// Retention policy applied at the buffer boundary after each append.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    #[default]
    Unbounded,
    /// Keep the newest `n` entries.
    MaxRecords(usize),
    /// Keep entries whose timestamp is within this many milliseconds of the newest timestamp.
    MaxAge(i64),
}

//Shared by every buffer so that no two buffer states ever carry the same generation
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct IngestionBuffer {
    inner: VecDeque<Arc<Entry>>,
    retention: Retention,
    next_seq: u64,
    evicted: u64,
    //Unique across all buffers and changes whenever the contents change, derived views are keyed
    //against this
    generation: u64,
}

impl IngestionBuffer {
    /// A `MaxRecords(0)` policy would evict every record as soon as it arrived, so it is raised
    /// to `MaxRecords(1)`.
    pub fn new(retention: Retention) -> Self {
        let retention = match retention {
            Retention::MaxRecords(0) => {
                warn!("BUFFER: Retention of zero records raised to one");
                Retention::MaxRecords(1)
            }
            other => other,
        };
        Self {
            inner: VecDeque::new(),
            retention,
            next_seq: 0,
            evicted: 0,
            generation: next_generation(),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Retention::Unbounded)
    }

    /// Appends a record and returns the arrival sequence number assigned to it.
    pub fn append(&mut self, record: Record) -> Result<u64, IngestError> {
        if !record.amount.is_finite() {
            warn!("BUFFER: Rejected record {} with amount {}", record.id, record.amount);
            return Err(IngestError::NonFiniteAmount { id: record.id });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.inner.push_back(Arc::new(Entry { seq, record }));
        self.generation = next_generation();

        self.apply_retention();
        Ok(seq)
    }

    fn apply_retention(&mut self) {
        let before = self.inner.len();
        match self.retention {
            Retention::Unbounded => {}
            Retention::MaxRecords(max) => {
                while self.inner.len() > max {
                    self.inner.pop_front();
                }
            }
            Retention::MaxAge(age) => {
                if let Some(newest) = self.inner.back().map(|e| e.record.timestamp) {
                    let cutoff = newest.saturating_sub(age);
                    while let Some(front) = self.inner.front() {
                        if front.record.timestamp >= cutoff {
                            break;
                        }
                        self.inner.pop_front();
                    }
                }
            }
        }

        let dropped = before - self.inner.len();
        if dropped > 0 {
            self.evicted += dropped as u64;
            debug!("BUFFER: Evicted {} entries under {:?}", dropped, self.retention);
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Count of records ever appended, including those since evicted.
    pub fn total_ingested(&self) -> u64 {
        self.next_seq
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn get(&self, pos: usize) -> Option<&Arc<Entry>> {
        self.inner.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.inner.iter()
    }

    /// Contiguous view of the retained entries in arrival order.
    pub fn entries(&mut self) -> &[Arc<Entry>] {
        self.inner.make_contiguous()
    }
}

impl Default for IngestionBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}
