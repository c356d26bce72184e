//! Windowed rendering of a derived view.
//!
//! Only rows intersecting the viewport are materialised. Everything above and below the window is
//! represented by two spacer heights so that the scrollable extent always equals `n * row_height`.
//! The cost of producing a [Window] depends on the viewport size, never on the length of the view.
//!
//! Rows are identified by [RowKey], which leads with the record id rather than the position so
//! that a row keeps its formatted cells when filtering or sorting moves it.
pub mod terminal;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::record::{Entry, RecordId};

/// Viewport geometry. All setters clamp rather than fail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    scroll_offset: f64,
    viewport_height: f64,
    row_height: f64,
}

impl ViewState {
    pub fn new(row_height: f64, viewport_height: f64) -> Self {
        let mut state = Self {
            scroll_offset: 0.0,
            viewport_height: 0.0,
            row_height: 1.0,
        };
        state.set_row_height(row_height);
        state.set_viewport_height(viewport_height);
        state
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn set_row_height(&mut self, row_height: f64) {
        self.row_height = if row_height.is_finite() && row_height > 0.0 {
            row_height
        } else {
            1.0
        };
        //Viewport is never allowed to be shorter than one row
        self.viewport_height = self.viewport_height.max(self.row_height);
    }

    pub fn set_viewport_height(&mut self, viewport_height: f64) {
        let height = if viewport_height.is_finite() {
            viewport_height
        } else {
            0.0
        };
        self.viewport_height = height.max(self.row_height);
    }

    /// Sets the offset without knowing the content length, only the lower bound is enforced.
    pub fn set_scroll_offset(&mut self, scroll_offset: f64) {
        self.scroll_offset = if scroll_offset.is_finite() {
            scroll_offset.max(0.0)
        } else {
            0.0
        };
    }

    /// Pulls the offset back inside `[0, total_height - viewport_height]`.
    pub fn clamp_to(&mut self, len: usize) {
        let max = (self.total_height(len) - self.viewport_height).max(0.0);
        self.scroll_offset = self.scroll_offset.clamp(0.0, max);
    }

    pub fn total_height(&self, len: usize) -> f64 {
        len as f64 * self.row_height
    }

    /// Number of rows that can be partially visible at once.
    pub fn max_visible_rows(&self) -> usize {
        (self.viewport_height / self.row_height).ceil() as usize + 1
    }

    pub fn visible_range(&self, len: usize) -> Range<usize> {
        let first = (self.scroll_offset / self.row_height).floor() as usize;
        let last = ((self.scroll_offset + self.viewport_height) / self.row_height).ceil() as usize;
        let start = first.min(len);
        let end = last.min(len).max(start);
        start..end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub id: RecordId,
    pub seq: u64,
}

impl From<&Entry> for RowKey {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.record.id,
            seq: entry.seq,
        }
    }
}

/// Display text for one row.
#[derive(Clone, Debug, PartialEq)]
pub struct RowCells {
    pub id: String,
    pub label: String,
    pub amount: String,
    pub timestamp: String,
}

impl RowCells {
    pub fn format(entry: &Entry) -> Self {
        let record = &entry.record;
        let timestamp = OffsetDateTime::from_unix_timestamp_nanos(record.timestamp as i128 * 1_000_000)
            .ok()
            .and_then(|date| date.format(&Rfc3339).ok())
            .unwrap_or_else(|| record.timestamp.to_string());

        Self {
            id: record.id.to_string(),
            label: record.label.clone(),
            amount: format!("{:.2}", record.amount),
            timestamp,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderedRow {
    pub key: RowKey,
    /// Position within the derived view.
    pub index: usize,
    /// Offset of the top of the row from the top of the scrollable content.
    pub top: f64,
    pub cells: Arc<RowCells>,
}

#[derive(Clone, Debug, Default)]
pub struct Window {
    pub range: Range<usize>,
    pub top_spacer: f64,
    pub bottom_spacer: f64,
    pub total_height: f64,
    pub rows: Vec<RenderedRow>,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn build_window<F>(entries: &[Arc<Entry>], state: &ViewState, mut cells_for: F) -> Window
where
    F: FnMut(&Entry) -> Arc<RowCells>,
{
    let len = entries.len();
    let range = state.visible_range(len);
    let row_height = state.row_height();

    let rows = entries[range.clone()]
        .iter()
        .zip(range.clone())
        .map(|(entry, index)| RenderedRow {
            key: RowKey::from(entry.as_ref()),
            index,
            top: index as f64 * row_height,
            cells: cells_for(entry.as_ref()),
        })
        .collect();

    let total_height = state.total_height(len);
    let top_spacer = range.start as f64 * row_height;
    let bottom_spacer = (len - range.end) as f64 * row_height;
    Window {
        range,
        top_spacer,
        bottom_spacer,
        total_height,
        rows,
    }
}

/// Stateless rendering of `entries` for the given geometry. Out-of-range geometry is clamped.
pub fn render(
    entries: &[Arc<Entry>],
    row_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
) -> Window {
    let mut state = ViewState::new(row_height, viewport_height);
    state.set_scroll_offset(scroll_offset);
    state.clamp_to(entries.len());
    build_window(entries, &state, |entry| Arc::new(RowCells::format(entry)))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub formatted: u64,
    pub reused: u64,
}

/// Formatted cells of the rows in the last window.
#[derive(Debug, Default)]
struct RowCache {
    inner: HashMap<RowKey, Arc<RowCells>>,
}

/// Renderer that keeps the viewport state and reuses the formatted cells of rows that stay in the
/// window between frames.
#[derive(Debug)]
pub struct WindowedRenderer {
    state: ViewState,
    cache: RowCache,
    stats: RenderStats,
}

impl WindowedRenderer {
    pub fn new(row_height: f64, viewport_height: f64) -> Self {
        Self {
            state: ViewState::new(row_height, viewport_height),
            cache: RowCache::default(),
            stats: RenderStats::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn scroll_to(&mut self, offset: f64) {
        self.state.set_scroll_offset(offset);
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.state.set_scroll_offset(self.state.scroll_offset() + delta);
    }

    pub fn resize(&mut self, viewport_height: f64) {
        self.state.set_viewport_height(viewport_height);
    }

    /// Clamps the scroll position against `len` and returns the rows now in view.
    pub fn visible_range(&mut self, len: usize) -> Range<usize> {
        self.state.clamp_to(len);
        self.state.visible_range(len)
    }

    pub fn window(&mut self, entries: &[Arc<Entry>]) -> Window {
        self.state.clamp_to(entries.len());

        let mut previous = std::mem::take(&mut self.cache.inner);
        let mut current = HashMap::with_capacity(self.state.max_visible_rows());
        let stats = &mut self.stats;

        let window = build_window(entries, &self.state, |entry| {
            let key = RowKey::from(entry);
            let cells = match previous.remove(&key) {
                Some(cells) => {
                    stats.reused += 1;
                    cells
                }
                None => {
                    stats.formatted += 1;
                    Arc::new(RowCells::format(entry))
                }
            };
            current.insert(key, Arc::clone(&cells));
            cells
        });

        //Rows that left the window are dropped with `previous`
        self.cache.inner = current;
        window
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{render, RowKey, ViewState, WindowedRenderer};
    use crate::buffer::IngestionBuffer;
    use crate::query::{derive, Filter, SortOrder};
    use crate::record::{Entry, Record};

    fn entries(n: u64) -> Vec<Arc<Entry>> {
        let mut buffer = IngestionBuffer::unbounded();
        for id in 0..n {
            buffer
                .append(Record::new(id, format!("R{id}"), (id % 17) as f64, 0))
                .unwrap();
        }
        buffer.iter().cloned().collect()
    }

    #[test]
    fn test_that_visible_range_matches_viewport_scenario() {
        let rows = entries(50);

        let top = render(&rows, 35.0, 400.0, 0.0);
        assert!(top.range.start == 0);
        assert!(top.range.len() == 12);

        let scrolled = render(&rows, 35.0, 400.0, 350.0);
        assert!(scrolled.range.start == 10);
    }

    #[test]
    fn test_that_spacers_and_rows_add_up_to_total_height() {
        let rows = entries(50);
        let window = render(&rows, 35.0, 400.0, 350.0);

        let rendered = window.rows.len() as f64 * 35.0;
        assert!(window.total_height == 50.0 * 35.0);
        assert!(window.top_spacer + rendered + window.bottom_spacer == window.total_height);
        assert!(window.rows.first().unwrap().top == window.top_spacer);
    }

    #[test]
    fn test_that_empty_view_renders_nothing() {
        let window = render(&[], 35.0, 400.0, 120.0);
        assert!(window.is_empty());
        assert!(window.range.is_empty());
        assert!(window.total_height == 0.0);
        assert!(window.top_spacer == 0.0 && window.bottom_spacer == 0.0);
    }

    #[test]
    fn test_that_rendered_rows_are_bounded_regardless_of_length() {
        for (row_height, viewport) in [(35.0_f64, 400.0_f64), (1.0, 20.0), (7.5, 100.0), (10.0, 10.0)] {
            let bound = (viewport / row_height).ceil() as usize + 1;
            for n in [0, 1, 5, 100, 10_000] {
                let rows = entries(n);
                for offset in [0.0, 3.3, 17.0, 1_000.0, 1e9] {
                    let window = render(&rows, row_height, viewport, offset);
                    assert!(window.rows.len() <= bound);
                }
            }
        }
    }

    #[test]
    fn test_that_invalid_geometry_is_clamped() {
        let mut state = ViewState::new(-3.0, 0.0);
        assert!(state.row_height() == 1.0);
        assert!(state.viewport_height() == 1.0);

        state.set_row_height(35.0);
        state.set_viewport_height(10.0);
        assert!(state.viewport_height() == 35.0);

        state.set_scroll_offset(-50.0);
        assert!(state.scroll_offset() == 0.0);
        state.set_scroll_offset(f64::NAN);
        assert!(state.scroll_offset() == 0.0);
    }

    #[test]
    fn test_that_scroll_past_end_is_pulled_back() {
        let rows = entries(50);
        let window = render(&rows, 35.0, 400.0, 1e9);
        assert!(window.range.end == 50);
        assert!(window.bottom_spacer == 0.0);
        assert!(!window.is_empty());
    }

    #[test]
    fn test_that_rows_are_reused_by_key_across_reorders() {
        let mut buffer = IngestionBuffer::unbounded();
        for (id, amount) in [(1, 30.0), (2, 10.0), (3, 20.0)] {
            buffer
                .append(Record::new(id, format!("R{id}"), amount, 0))
                .unwrap();
        }
        let mut renderer = WindowedRenderer::new(1.0, 10.0);

        let arrival = derive(buffer.entries(), &Filter::All, SortOrder::None);
        let first = renderer.window(&arrival);
        assert!(renderer.stats().formatted == 3);

        let sorted = derive(buffer.entries(), &Filter::All, SortOrder::Ascending);
        let second = renderer.window(&sorted);
        assert!(renderer.stats().formatted == 3);
        assert!(renderer.stats().reused == 3);

        let keys: Vec<RowKey> = second.rows.iter().map(|r| r.key).collect();
        assert!(keys.iter().map(|k| k.id).eq([2, 3, 1]));
        let moved = first.rows.iter().find(|r| r.key.id == 1).unwrap();
        let moved_again = second.rows.iter().find(|r| r.key.id == 1).unwrap();
        assert!(Arc::ptr_eq(&moved.cells, &moved_again.cells));
    }

    #[test]
    fn test_that_duplicate_ids_render_as_separate_rows() {
        let mut buffer = IngestionBuffer::unbounded();
        buffer.append(Record::new(9, "first", 1.0, 0)).unwrap();
        buffer.append(Record::new(9, "second", 2.0, 0)).unwrap();

        let mut renderer = WindowedRenderer::new(1.0, 10.0);
        let window = renderer.window(buffer.entries());
        assert!(window.rows.len() == 2);
        assert!(window.rows[0].key != window.rows[1].key);
        assert!(window.rows[0].cells.label == "first");
        assert!(window.rows[1].cells.label == "second");
    }

    #[test]
    fn test_that_scrolling_only_formats_newly_visible_rows() {
        let rows = entries(1_000);
        let mut renderer = WindowedRenderer::new(1.0, 10.0);
        renderer.window(&rows);
        let formatted = renderer.stats().formatted;

        renderer.scroll_by(2.0);
        let window = renderer.window(&rows);
        assert!(window.range.start == 2);
        assert!(renderer.stats().formatted - formatted == 2);
    }

    #[test]
    fn test_that_timestamp_is_formatted_as_rfc3339() {
        let entry = Entry {
            seq: 0,
            record: Record::new(1, "A", 12.5, 1_700_000_000_000),
        };
        let cells = super::RowCells::format(&entry);
        assert_eq!(cells.amount, "12.50");
        assert_eq!(cells.timestamp, "2023-11-14T22:13:20Z");
    }
}
