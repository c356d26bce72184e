use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use super::RecordGenerator;
use crate::error::FeedError;
use crate::record::Record;

const COUNTERPARTIES: [&str; 8] = [
    "Acme Corp",
    "Globex",
    "Initech",
    "Umbrella",
    "Hooli",
    "Stark Industries",
    "Wayne Enterprises",
    "Tyrell",
];

/// Synthetic transaction generator used when no real feed is configured. Ids are sequential from
/// one, amounts are uniform over `[min, max)` rounded to cents.
pub struct Juno {
    next_id: u64,
    amount_dist: Uniform<f64>,
    label_dist: Uniform<usize>,
    rng: StdRng,
}

impl Juno {
    /// Panics if `min >= max`.
    pub fn new(min: f64, max: f64) -> Self {
        Self::with_rng(min, max, StdRng::from_entropy())
    }

    pub fn seeded(min: f64, max: f64, seed: u64) -> Self {
        Self::with_rng(min, max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min: f64, max: f64, rng: StdRng) -> Self {
        Self {
            next_id: 1,
            amount_dist: Uniform::new(min, max),
            label_dist: Uniform::new(0, COUNTERPARTIES.len()),
            rng,
        }
    }

    pub fn next_record(&mut self, now: i64) -> Record {
        let id = self.next_id;
        self.next_id += 1;

        let amount = (self.amount_dist.sample(&mut self.rng) * 100.0).round() / 100.0;
        let label = COUNTERPARTIES[self.label_dist.sample(&mut self.rng)];
        Record::new(id, label, amount, now)
    }
}

impl RecordGenerator for Juno {
    fn generate(&mut self, now: i64) -> Option<Result<Record, FeedError>> {
        Some(Ok(self.next_record(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::Juno;

    #[test]
    fn test_that_ids_are_sequential_and_amounts_in_range() {
        let mut juno = Juno::seeded(10.0, 20.0, 42);
        for expected in 1..=100 {
            let record = juno.next_record(1_000);
            assert!(record.id == expected);
            assert!(record.amount >= 10.0 && record.amount <= 20.0);
            assert!(record.timestamp == 1_000);
            assert!(!record.label.is_empty());
        }
    }

    #[test]
    fn test_that_same_seed_produces_same_stream() {
        let mut first = Juno::seeded(0.0, 1000.0, 7);
        let mut second = Juno::seeded(0.0, 1000.0, 7);
        for _ in 0..10 {
            assert_eq!(first.next_record(0), second.next_record(0));
        }
    }
}
