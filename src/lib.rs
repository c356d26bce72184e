//! Live record dashboard.
//!
//! Records arrive from a [source::FeedSource] and are appended to an
//! [buffer::IngestionBuffer]. The [query::QueryPipeline] derives a filtered and sorted
//! [query::View] from the buffer, memoized against its inputs, and the
//! [render::WindowedRenderer] turns that view into the handful of rows that intersect the
//! viewport. [dashboard::Dashboard] owns all of this state and routes feed and user events into
//! it.
pub mod buffer;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod query;
pub mod record;
pub mod render;
pub mod source;
