//! The controller tying the buffer, pipeline and renderer together.
//!
//! [Dashboard] is the only owner of dashboard state: the buffer, the raw threshold text, the sort
//! order and the viewport. Feed events and user input both arrive as [DashboardEvent]s and are
//! applied one at a time. Appending always completes before anything is derived or rendered, and
//! deriving/rendering only read the buffer, so neither can lose records that were already
//! ingested.
use std::sync::Arc;

use log::{debug, info, warn};

use crate::buffer::{IngestionBuffer, Retention};
use crate::config::DashboardConfig;
use crate::error::FeedError;
use crate::query::{Filter, QueryPipeline, QueryStats, SortOrder, View};
use crate::record::Record;
use crate::render::{RenderStats, ViewState, Window, WindowedRenderer};
use crate::source::FeedEvent;

#[derive(Debug)]
pub enum DashboardEvent {
    Feed(FeedEvent),
    FilterInput(char),
    FilterBackspace,
    FilterClear,
    SetThreshold(String),
    ToggleSort,
    ScrollBy(f64),
    ScrollTo(f64),
    PageUp,
    PageDown,
    Home,
    End,
    Resize(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedStatus {
    Live,
    /// Terminal, the feed will not deliver again.
    Closed(String),
}

/// Everything a front end needs to draw one frame.
#[derive(Clone, Debug)]
pub struct DashboardFrame {
    pub window: Window,
    pub threshold: String,
    pub filter_active: bool,
    pub order: SortOrder,
    pub visible: usize,
    pub buffered: usize,
    pub ingested: u64,
    pub feed: FeedStatus,
    pub view_state: ViewState,
}

pub struct Dashboard {
    buffer: IngestionBuffer,
    threshold: String,
    order: SortOrder,
    pipeline: QueryPipeline,
    renderer: WindowedRenderer,
    feed: FeedStatus,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            buffer: IngestionBuffer::new(config.retention),
            threshold: config.threshold.clone(),
            order: config.sort,
            pipeline: QueryPipeline::new(),
            renderer: WindowedRenderer::new(config.row_height, config.viewport_height),
            feed: FeedStatus::Live,
        }
    }

    pub fn with_retention(retention: Retention) -> Self {
        let config = DashboardConfig {
            retention,
            ..DashboardConfig::default()
        };
        Self::new(&config)
    }

    /// Applies an event and returns whether the visible frame may have changed.
    pub fn handle(&mut self, event: DashboardEvent) -> bool {
        match event {
            DashboardEvent::Feed(FeedEvent::Record(record)) => self.ingest(record),
            DashboardEvent::Feed(FeedEvent::Closed(err)) => {
                self.close_feed(err);
                true
            }
            DashboardEvent::FilterInput(c) => {
                self.threshold.push(c);
                true
            }
            DashboardEvent::FilterBackspace => self.threshold.pop().is_some(),
            DashboardEvent::FilterClear => {
                let changed = !self.threshold.is_empty();
                self.threshold.clear();
                changed
            }
            DashboardEvent::SetThreshold(text) => {
                self.set_threshold(text);
                true
            }
            DashboardEvent::ToggleSort => {
                self.toggle_sort();
                true
            }
            DashboardEvent::ScrollBy(delta) => {
                self.renderer.scroll_by(delta);
                true
            }
            DashboardEvent::ScrollTo(offset) => {
                self.renderer.scroll_to(offset);
                true
            }
            DashboardEvent::PageUp => {
                let page = self.page_height();
                self.renderer.scroll_by(-page);
                true
            }
            DashboardEvent::PageDown => {
                let page = self.page_height();
                self.renderer.scroll_by(page);
                true
            }
            DashboardEvent::Home => {
                self.renderer.scroll_to(0.0);
                true
            }
            DashboardEvent::End => {
                //Clamped against the view length when the next window is built
                self.renderer.scroll_to(f64::MAX);
                true
            }
            DashboardEvent::Resize(height) => {
                self.renderer.resize(height);
                true
            }
        }
    }

    pub fn ingest(&mut self, record: Record) -> bool {
        match self.buffer.append(record) {
            Ok(seq) => {
                debug!("DASHBOARD: Ingested record with seq {}", seq);
                true
            }
            Err(err) => {
                warn!("DASHBOARD: Dropping record, {}", err);
                false
            }
        }
    }

    fn close_feed(&mut self, err: FeedError) {
        info!("DASHBOARD: Feed closed, {}", err);
        self.feed = FeedStatus::Closed(err.to_string());
    }

    /// Threshold text is stored as typed and only interpreted when the view is derived.
    pub fn set_threshold(&mut self, text: impl Into<String>) {
        self.threshold = text.into();
    }

    pub fn threshold(&self) -> &str {
        &self.threshold
    }

    pub fn toggle_sort(&mut self) -> SortOrder {
        self.order = self.order.next();
        debug!("DASHBOARD: Sort order now {:?}", self.order);
        self.order
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn feed_status(&self) -> &FeedStatus {
        &self.feed
    }

    pub fn buffer(&self) -> &IngestionBuffer {
        &self.buffer
    }

    fn page_height(&self) -> f64 {
        let state = self.renderer.state();
        (state.viewport_height() - state.row_height()).max(state.row_height())
    }

    /// The derived view for the current state, recomputed only when an input changed.
    pub fn view(&mut self) -> Arc<View> {
        let filter = Filter::parse(&self.threshold);
        self.pipeline.view(&self.buffer, filter, self.order)
    }

    pub fn window(&mut self) -> Window {
        let view = self.view();
        self.renderer.window(view.as_slice())
    }

    pub fn frame(&mut self) -> DashboardFrame {
        let view = self.view();
        let window = self.renderer.window(view.as_slice());
        DashboardFrame {
            window,
            threshold: self.threshold.clone(),
            filter_active: Filter::parse(&self.threshold).is_active(),
            order: self.order,
            visible: view.len(),
            buffered: self.buffer.len(),
            ingested: self.buffer.total_ingested(),
            feed: self.feed.clone(),
            view_state: *self.renderer.state(),
        }
    }

    pub fn query_stats(&self) -> QueryStats {
        self.pipeline.stats()
    }

    pub fn render_stats(&self) -> RenderStats {
        self.renderer.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, DashboardEvent, FeedStatus};
    use crate::buffer::Retention;
    use crate::config::DashboardConfig;
    use crate::error::FeedError;
    use crate::query::SortOrder;
    use crate::record::Record;
    use crate::source::FeedEvent;

    fn feed(dashboard: &mut Dashboard, id: u64, amount: f64) {
        dashboard.handle(DashboardEvent::Feed(FeedEvent::Record(Record::new(
            id,
            format!("R{id}"),
            amount,
            0,
        ))));
    }

    fn visible_ids(dashboard: &mut Dashboard) -> Vec<u64> {
        dashboard.view().iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_that_typed_threshold_filters_on_next_view() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        feed(&mut dashboard, 1, 500.0);
        feed(&mut dashboard, 2, 100.0);
        feed(&mut dashboard, 3, 900.0);

        for c in "100".chars() {
            dashboard.handle(DashboardEvent::FilterInput(c));
        }
        dashboard.handle(DashboardEvent::ToggleSort);

        assert!(dashboard.order() == SortOrder::Ascending);
        assert_eq!(visible_ids(&mut dashboard), vec![1, 3]);
    }

    #[test]
    fn test_that_new_records_flow_through_without_reset() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        dashboard.set_threshold("100");
        dashboard.toggle_sort();
        feed(&mut dashboard, 1, 500.0);
        feed(&mut dashboard, 2, 100.0);
        feed(&mut dashboard, 3, 900.0);
        assert_eq!(visible_ids(&mut dashboard), vec![1, 3]);

        feed(&mut dashboard, 4, 50.0);
        assert_eq!(visible_ids(&mut dashboard), vec![1, 3]);
        feed(&mut dashboard, 5, 600.0);
        assert_eq!(visible_ids(&mut dashboard), vec![1, 5, 3]);
        assert!(dashboard.threshold() == "100");
    }

    #[test]
    fn test_that_garbage_threshold_is_kept_but_ignored() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        feed(&mut dashboard, 1, 5.0);
        dashboard.handle(DashboardEvent::SetThreshold("12x".to_string()));

        let frame = dashboard.frame();
        assert!(frame.threshold == "12x");
        assert!(!frame.filter_active);
        assert!(frame.visible == 1);
    }

    #[test]
    fn test_that_repeated_frames_reuse_the_view() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        feed(&mut dashboard, 1, 5.0);
        dashboard.frame();
        dashboard.frame();
        dashboard.handle(DashboardEvent::ScrollBy(1.0));
        dashboard.frame();

        assert!(dashboard.query_stats().misses == 1);
        assert!(dashboard.query_stats().hits == 2);
    }

    #[test]
    fn test_that_rejected_record_does_not_disturb_existing_ones() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        feed(&mut dashboard, 1, 5.0);
        feed(&mut dashboard, 2, f64::INFINITY);
        feed(&mut dashboard, 3, 7.0);

        assert_eq!(visible_ids(&mut dashboard), vec![1, 3]);
        assert!(dashboard.buffer().total_ingested() == 2);
    }

    #[test]
    fn test_that_zero_record_retention_still_shows_the_newest_record() {
        let mut dashboard = Dashboard::with_retention(Retention::MaxRecords(0));
        assert!(dashboard.ingest(Record::new(1, "A", 5.0, 0)));
        assert!(dashboard.ingest(Record::new(2, "B", 6.0, 0)));

        assert_eq!(visible_ids(&mut dashboard), vec![2]);
    }

    #[test]
    fn test_that_feed_close_is_reported() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        dashboard.handle(DashboardEvent::Feed(FeedEvent::Closed(FeedError::Exhausted)));

        assert!(matches!(dashboard.feed_status(), FeedStatus::Closed(_)));
        assert!(matches!(dashboard.frame().feed, FeedStatus::Closed(_)));
    }

    #[test]
    fn test_that_scrolling_moves_window_and_end_is_clamped() {
        let config = DashboardConfig {
            row_height: 35.0,
            viewport_height: 400.0,
            ..DashboardConfig::default()
        };
        let mut dashboard = Dashboard::new(&config);
        for id in 0..50 {
            feed(&mut dashboard, id, id as f64);
        }

        dashboard.handle(DashboardEvent::ScrollTo(350.0));
        assert!(dashboard.frame().window.range.start == 10);

        dashboard.handle(DashboardEvent::End);
        let frame = dashboard.frame();
        assert!(frame.window.range.end == 50);
        assert!(frame.view_state.scroll_offset() == 50.0 * 35.0 - 400.0);

        dashboard.handle(DashboardEvent::Home);
        assert!(dashboard.frame().window.range.start == 0);
    }

    #[test]
    fn test_that_backspace_and_clear_edit_threshold() {
        let mut dashboard = Dashboard::with_retention(Retention::Unbounded);
        dashboard.set_threshold("250");
        assert!(dashboard.handle(DashboardEvent::FilterBackspace));
        assert!(dashboard.threshold() == "25");
        assert!(dashboard.handle(DashboardEvent::FilterClear));
        assert!(!dashboard.handle(DashboardEvent::FilterBackspace));
        assert!(dashboard.threshold().is_empty());
    }
}
