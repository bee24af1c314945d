use std::collections::HashMap;

use tracing::{debug, warn};

use super::{
    aggregate::{AggregateMap, Aggregator},
    partition::Chunk,
    record::{ParseError, Record},
};
use crate::{config::MalformedPolicy, error::Error, io::FIRST_DATA_LINE};

/// What one map unit hands back to the orchestrator.
#[derive(Debug)]
pub struct MapOutput<C> {
    pub chunk: usize,
    pub aggregates: AggregateMap<C>,
    pub records: u64,
    pub blank_lines: usize,
    pub skipped_lines: usize,
}

/// Folds every record of `chunk` into per-key combiners.
///
/// Runs without shared state: the chunk is owned, the map is local and is
/// returned by value. Lines are raw bytes; a line that is not UTF-8 is
/// malformed like any other unparsable line.
pub fn map_chunk<A, L>(
    aggregator: &A,
    chunk: Chunk<L>,
    on_malformed: MalformedPolicy,
) -> Result<MapOutput<A::Combiner>, Error>
where
    A: Aggregator<Value = f64>,
    L: AsRef<[u8]>,
{
    let mut output = MapOutput {
        chunk: chunk.index,
        aggregates: HashMap::new(),
        records: 0,
        blank_lines: 0,
        skipped_lines: 0,
    };

    for (i, line) in chunk.items.iter().enumerate() {
        let parsed = match std::str::from_utf8(line.as_ref()) {
            Ok(text) if text.trim().is_empty() => {
                output.blank_lines += 1;
                continue;
            }
            Ok(text) => Record::parse(text.trim()),
            Err(e) => Err(ParseError::from(e)),
        };

        let record = match parsed {
            Ok(record) => record,
            Err(source) => {
                let line_number = chunk.offset + i + FIRST_DATA_LINE;
                match on_malformed {
                    MalformedPolicy::Abort => {
                        return Err(Error::MalformedRecord {
                            line: line_number,
                            chunk: chunk.index,
                            source,
                        })
                    }
                    MalformedPolicy::Skip => {
                        warn!(
                            line = line_number,
                            chunk = chunk.index,
                            "skipping malformed record: {}",
                            source
                        );
                        output.skipped_lines += 1;
                        continue;
                    }
                }
            }
        };

        let (key, price) = record.into_parts();
        let combiner = output
            .aggregates
            .entry(key)
            .or_insert_with(|| aggregator.create_combiner());
        aggregator.merge_value(price, combiner);
        output.records += 1;
    }

    debug!(
        chunk = output.chunk,
        lines = chunk.len(),
        groups = output.aggregates.len(),
        skipped = output.skipped_lines,
        "chunk mapped"
    );
    Ok(output)
}
