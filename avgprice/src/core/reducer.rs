use std::collections::{hash_map::Entry, HashMap};

use tracing::debug;

use super::aggregate::{AggregateMap, Aggregator, PartialAggregate};
use crate::error::Error;

/// One output row.
#[derive(Clone, Debug, PartialEq)]
pub struct AveragePrice {
    pub make: String,
    pub model: String,
    pub avg_price: f64,
}

/// Combines the per-unit maps into one.
///
/// The partial maps are consumed, so every combiner that lands in the result
/// is owned by it and never aliases a worker's map. Merge order does not
/// affect the result as long as the aggregator's combine step is associative
/// and commutative.
pub fn reduce<A, I>(aggregator: &A, partials: I) -> Result<AggregateMap<A::Combiner>, Error>
where
    A: Aggregator,
    I: IntoIterator<Item = AggregateMap<A::Combiner>>,
{
    let mut result: AggregateMap<A::Combiner> = HashMap::new();
    let mut merged_maps = 0;

    for partial in partials {
        merged_maps += 1;
        for (key, combiner) in partial {
            match result.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(combiner);
                }
                Entry::Occupied(slot) => {
                    let (key, current) = slot.remove_entry();
                    match aggregator.merge_combiners(current, combiner) {
                        Ok(merged) => {
                            result.insert(key, merged);
                        }
                        Err(source) => return Err(Error::IntegrityViolation { key, source }),
                    }
                }
            }
        }
    }

    debug!(maps = merged_maps, groups = result.len(), "partial aggregates merged");
    Ok(result)
}

/// Derives the per-group average, sorted by make then model.
pub fn averages(merged: AggregateMap<PartialAggregate>) -> Result<Vec<AveragePrice>, Error> {
    let mut rows = merged
        .into_iter()
        .map(|(key, aggr)| match aggr.average() {
            Ok(avg_price) => Ok(AveragePrice {
                make: key.make,
                model: key.model,
                avg_price,
            }),
            Err(source) => Err(Error::IntegrityViolation { key, source }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    rows.sort_by(|a, b| (&a.make, &a.model).cmp(&(&b.make, &b.model)));
    Ok(rows)
}
