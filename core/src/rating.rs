use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::RatingRecord;

/// Rounded mean and count, as displayed on a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub mean: f64,
    pub count: u32,
}

/// Exact running total behind a [`RatingSummary`].
///
/// The total is never rounded, so applying single-user upserts one after
/// another yields the same mean as recomputing over the full rating set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub total: f64,
    pub count: u32,
}

impl RatingAggregate {
    /// Rebuild a running total from a displayed mean and count.
    #[must_use]
    pub fn from_mean(mean: f64, count: u32) -> Self {
        Self {
            total: mean * f64::from(count),
            count,
        }
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            round_to_tenth(self.total / f64::from(self.count))
        }
    }

    #[must_use]
    pub fn summary(&self) -> RatingSummary {
        RatingSummary {
            mean: self.mean(),
            count: self.count,
        }
    }

    /// Apply one user's new rating. `previous` is that user's earlier rating,
    /// if any; it is replaced rather than counted twice.
    #[must_use]
    pub fn upsert(self, previous: Option<u8>, value: u8) -> Self {
        match previous {
            Some(prev) if self.count > 0 => Self {
                total: self.total - f64::from(prev) + f64::from(value),
                count: self.count,
            },
            // A prior rating with no counted ratings cannot happen; start over.
            Some(_) => Self {
                total: f64::from(value),
                count: 1,
            },
            None => Self {
                total: self.total + f64::from(value),
                count: self.count + 1,
            },
        }
    }

    fn add(&mut self, value: u8) {
        self.total += f64::from(value);
        self.count += 1;
    }
}

/// Round half up to one decimal place.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean and count of every rating recorded for `recipe_id`.
#[must_use]
pub fn compute_aggregate(ratings: &[RatingRecord], recipe_id: &str) -> RatingSummary {
    let mut aggregate = RatingAggregate::default();
    for r in ratings.iter().filter(|r| r.recipe_id == recipe_id) {
        aggregate.add(r.rating);
    }
    aggregate.summary()
}

/// Group a flat rating snapshot by recipe in a single pass.
#[must_use]
pub fn aggregate_by_recipe(ratings: &[RatingRecord]) -> HashMap<String, RatingAggregate> {
    let mut by_recipe: HashMap<String, RatingAggregate> = HashMap::new();
    for r in ratings {
        by_recipe.entry(r.recipe_id.clone()).or_default().add(r.rating);
    }
    by_recipe
}

/// Update a displayed mean and count with one user's rating without
/// rescanning the rating set.
#[must_use]
pub fn upsert_and_recompute(
    previous_mean: f64,
    previous_count: u32,
    previous_value: Option<u8>,
    new_value: u8,
) -> RatingSummary {
    RatingAggregate::from_mean(previous_mean, previous_count)
        .upsert(previous_value, new_value)
        .summary()
}
