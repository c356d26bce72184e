use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{refuse, Delivery, FeedSource, Sink, Subscription};
use crate::error::FeedError;
use crate::record::Record;

#[derive(Default)]
struct ManualState {
    subscribed: bool,
    delivery: Option<Delivery>,
}

/// Feed driven by an external trigger instead of a timer. Records pushed through the [Trigger]
/// are delivered synchronously to the subscriber, so the sink must not push back into the same
/// trigger.
pub struct ManualFeed {
    state: Rc<RefCell<ManualState>>,
}

/// Producer half of a [ManualFeed].
#[derive(Clone)]
pub struct Trigger {
    state: Rc<RefCell<ManualState>>,
}

impl ManualFeed {
    pub fn new() -> (Self, Trigger) {
        let state = Rc::new(RefCell::new(ManualState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            Trigger { state },
        )
    }
}

impl FeedSource for ManualFeed {
    fn subscribe(&mut self, sink: Sink) -> Subscription {
        let mut state = self.state.borrow_mut();
        if state.subscribed {
            return refuse(sink);
        }
        state.subscribed = true;

        let active = Rc::new(Cell::new(true));
        state.delivery = Some(Delivery::new(Rc::clone(&active), sink));
        Subscription::new(active, None)
    }
}

impl Trigger {
    /// Returns whether the record reached a live subscriber. The sink is released on the first
    /// push after the subscription ended.
    pub fn push(&self, record: Record) -> bool {
        let mut state = self.state.borrow_mut();
        let delivered = match state.delivery.as_mut() {
            Some(delivery) => delivery.deliver(record),
            None => false,
        };
        if !delivered {
            state.delivery = None;
        }
        delivered
    }

    /// Ends the stream and releases the sink.
    pub fn close(&self, err: FeedError) {
        let released = self.state.borrow_mut().delivery.take();
        if let Some(mut delivery) = released {
            delivery.close(err);
        }
    }
}
