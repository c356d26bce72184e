//! Sources produce the records that the dashboard ingests.
//!
//! Every source sits behind [FeedSource], so the synthetic [juno::Juno] generator used for
//! demonstration can be swapped for a recorded file or a real stream without the buffer, pipeline
//! or renderer knowing. Sources are lazy and single-use: nothing is produced before `subscribe`,
//! and a source that has been subscribed once cannot be subscribed again.
//!
//! Delivery is single-threaded. Timer driven sources run on a local task (`spawn_local`), so they
//! must be subscribed from inside a `tokio::task::LocalSet`. Because the task shares the thread
//! with whoever holds the [Subscription], once [Subscription::unsubscribe] returns no callback can
//! be in flight and none will follow.
pub mod juno;
pub mod manual;
pub mod replay;
pub mod ticker;

use std::cell::Cell;
use std::rc::Rc;

use log::info;
use tokio::task::JoinHandle;

use crate::error::FeedError;
use crate::record::Record;

#[derive(Debug)]
pub enum FeedEvent {
    Record(Record),
    /// Terminal, nothing is delivered after this.
    Closed(FeedError),
}

pub type Sink = Box<dyn FnMut(FeedEvent)>;

pub trait FeedSource {
    fn subscribe(&mut self, sink: Sink) -> Subscription;
}

/// Record-generation policy for timer driven feeds. Returning `None` ends the stream normally,
/// returning an error ends it with that error.
pub trait RecordGenerator {
    fn generate(&mut self, now: i64) -> Option<Result<Record, FeedError>>;
}

/// Handle returned by [FeedSource::subscribe]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    active: Rc<Cell<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    fn new(active: Rc<Cell<bool>>, task: Option<JoinHandle<()>>) -> Self {
        Self { active, task }
    }

    fn inactive() -> Self {
        Self {
            active: Rc::new(Cell::new(false)),
            task: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if self.active.replace(false) {
            info!("FEED: Unsubscribed");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sink guarded by the subscription's active flag.
struct Delivery {
    active: Rc<Cell<bool>>,
    sink: Sink,
}

impl Delivery {
    fn new(active: Rc<Cell<bool>>, sink: Sink) -> Self {
        Self { active, sink }
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn deliver(&mut self, record: Record) -> bool {
        if !self.is_active() {
            return false;
        }
        (self.sink)(FeedEvent::Record(record));
        true
    }

    fn close(&mut self, err: FeedError) {
        if !self.is_active() {
            return;
        }
        info!("FEED: Closing stream, {}", err);
        self.active.set(false);
        (self.sink)(FeedEvent::Closed(err));
    }
}

/// Refuses a second subscription on a single-use source.
fn refuse(mut sink: Sink) -> Subscription {
    sink(FeedEvent::Closed(FeedError::AlreadySubscribed));
    Subscription::inactive()
}
