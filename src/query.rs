//! Derivation of the filtered and sorted view shown by the dashboard.
//!
//! [derive] is a pure function of its inputs. [QueryPipeline] wraps it with a single-entry memo
//! keyed on the buffer generation, the parsed filter and the sort order, so asking for the view
//! again without any of those changing hands back the previous result without doing any work.
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::buffer::IngestionBuffer;
use crate::record::Entry;

/// Tri-state sort control. Toggling cycles `None -> Ascending -> Descending -> None`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Ascending,
            Self::Ascending => Self::Descending,
            Self::Descending => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "arrival",
            Self::Ascending => "amount asc",
            Self::Descending => "amount desc",
        }
    }
}

/// Threshold filter after interpretation of the raw user text.
#[derive(Clone, Copy, Debug, Default)]
pub enum Filter {
    #[default]
    All,
    Above(f64),
}

impl Filter {
    /// Anything that isn't a positive finite decimal disables the filter.
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(threshold) if threshold.is_finite() && threshold > 0.0 => Self::Above(threshold),
            _ => Self::All,
        }
    }

    pub fn accepts(&self, amount: f64) -> bool {
        match self {
            Self::All => true,
            Self::Above(threshold) => amount > *threshold,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Above(_))
    }
}

//Structural equality, thresholds are compared bitwise so the memo key is well-behaved
impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::All, Self::All) => true,
            (Self::Above(a), Self::Above(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Filter {}

/// Filters then stably sorts `entries`. Equal amounts keep their arrival order in both sort
/// directions.
pub fn derive<'a, I>(entries: I, filter: &Filter, order: SortOrder) -> Vec<Arc<Entry>>
where
    I: IntoIterator<Item = &'a Arc<Entry>>,
{
    let mut derived: Vec<Arc<Entry>> = entries
        .into_iter()
        .filter(|entry| filter.accepts(entry.amount()))
        .cloned()
        .collect();

    // sort_by is stable. Amounts are finite on ingest so total_cmp agrees with numeric order.
    match order {
        SortOrder::None => {}
        SortOrder::Ascending => derived.sort_by(|a, b| a.amount().total_cmp(&b.amount())),
        SortOrder::Descending => derived.sort_by(|a, b| b.amount().total_cmp(&a.amount())),
    }
    derived
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewKey {
    pub generation: u64,
    pub filter: Filter,
    pub order: SortOrder,
}

/// A derived sequence together with the inputs it was derived from.
#[derive(Debug)]
pub struct View {
    key: ViewKey,
    entries: Vec<Arc<Entry>>,
}

impl View {
    pub fn key(&self) -> ViewKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Arc<Entry>> {
        self.entries.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Arc<Entry>] {
        &self.entries
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct QueryPipeline {
    last: Option<Arc<View>>,
    stats: QueryStats,
}

impl QueryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(
        &mut self,
        buffer: &IngestionBuffer,
        filter: Filter,
        order: SortOrder,
    ) -> Arc<View> {
        let key = ViewKey {
            generation: buffer.generation(),
            filter,
            order,
        };

        if let Some(last) = &self.last {
            if last.key == key {
                self.stats.hits += 1;
                return Arc::clone(last);
            }
        }

        self.stats.misses += 1;
        let entries = derive(buffer.iter(), &filter, order);
        debug!(
            "QUERY: Derived {} of {} entries with {:?} and {:?}",
            entries.len(),
            buffer.len(),
            filter,
            order
        );

        let view = Arc::new(View { key, entries });
        self.last = Some(Arc::clone(&view));
        view
    }

    pub fn stats(&self) -> QueryStats {
        self.stats
    }
}
