use std::collections::HashMap;

use thiserror::Error;

use super::key::CompositeKey;

/// Per-key combiners, as produced by one map unit or by the merge step.
pub type AggregateMap<C = PartialAggregate> = HashMap<CompositeKey, C>;

// () -> Acc
// (V, Acc) -> Acc
// (Acc, Acc) -> Acc
pub trait Aggregator: Send + Sync + 'static {
    type Value;
    type Combiner: Send + 'static;

    fn create_combiner(&self) -> Self::Combiner;
    fn merge_value(&self, value: Self::Value, combiner: &mut Self::Combiner);
    /// Must be associative and commutative: merge order is not fixed.
    fn merge_combiners(
        &self,
        combiner1: Self::Combiner,
        combiner2: Self::Combiner,
    ) -> Result<Self::Combiner, IntegrityError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("record count overflowed while merging ({0} + {1})")]
    CountOverflow(u64, u64),

    #[error("group has no records")]
    EmptyGroup,
}

/// Running price sum and record count for one group.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartialAggregate {
    pub price_total: f64,
    pub count: u64,
}

impl PartialAggregate {
    pub fn average(&self) -> Result<f64, IntegrityError> {
        if self.count == 0 {
            return Err(IntegrityError::EmptyGroup);
        }
        Ok(self.price_total / self.count as f64)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AveragePriceAggregator;

impl Aggregator for AveragePriceAggregator {
    type Value = f64;

    type Combiner = PartialAggregate;

    fn create_combiner(&self) -> Self::Combiner {
        PartialAggregate::default()
    }

    fn merge_value(&self, price: f64, combiner: &mut PartialAggregate) {
        combiner.price_total += price;
        combiner.count += 1;
    }

    fn merge_combiners(
        &self,
        combiner1: PartialAggregate,
        combiner2: PartialAggregate,
    ) -> Result<PartialAggregate, IntegrityError> {
        let count = combiner1
            .count
            .checked_add(combiner2.count)
            .ok_or(IntegrityError::CountOverflow(combiner1.count, combiner2.count))?;
        Ok(PartialAggregate {
            price_total: combiner1.price_total + combiner2.price_total,
            count,
        })
    }
}
