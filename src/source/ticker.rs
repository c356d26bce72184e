use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use log::info;
use time::OffsetDateTime;
use tokio::time::{interval, MissedTickBehavior};

use super::{refuse, Delivery, FeedSource, RecordGenerator, Sink, Subscription};
use crate::error::FeedError;

/// Emits one generated record per fixed tick until the subscription is dropped or the generator
/// runs out.
pub struct TickerFeed<G> {
    generator: Option<G>,
    period: Duration,
}

impl<G: RecordGenerator + 'static> TickerFeed<G> {
    pub fn new(generator: G, period: Duration) -> Self {
        Self {
            generator: Some(generator),
            period,
        }
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl<G: RecordGenerator + 'static> FeedSource for TickerFeed<G> {
    fn subscribe(&mut self, sink: Sink) -> Subscription {
        let Some(mut generator) = self.generator.take() else {
            return refuse(sink);
        };

        let active = Rc::new(Cell::new(true));
        let mut delivery = Delivery::new(Rc::clone(&active), sink);
        let period = self.period;
        info!("FEED: Subscribed with tick of {:?}", period);

        let task = tokio::task::spawn_local(async move {
            let mut ticks = interval(period);
            //Late ticks are dropped rather than bunched up
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            //First tick of an interval completes immediately
            ticks.tick().await;

            loop {
                ticks.tick().await;
                if !delivery.is_active() {
                    break;
                }
                match generator.generate(now_millis()) {
                    Some(Ok(record)) => {
                        delivery.deliver(record);
                    }
                    Some(Err(err)) => {
                        delivery.close(err);
                        break;
                    }
                    None => {
                        delivery.close(FeedError::Exhausted);
                        break;
                    }
                }
            }
        });

        Subscription::new(active, Some(task))
    }
}
