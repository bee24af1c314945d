use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use super::key::CompositeKey;

pub const MAKE_FIELD: usize = 0;
pub const MODEL_FIELD: usize = 1;
pub const PRICE_FIELD: usize = 15;

/// Minimum number of fields a data line must carry.
pub const MIN_FIELDS: usize = PRICE_FIELD + 1;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("expected at least {MIN_FIELDS} fields, found {found}")]
    TooFewFields { found: usize },

    #[error("price field {value:?} is not a finite number")]
    InvalidPrice { value: String },

    #[error("line is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("line is not valid csv: {0}")]
    Csv(#[from] csv::Error),
}

/// One parsed input row. Lives only until it is folded into an aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub make: String,
    pub model: String,
    pub price: f64,
}

impl Record {
    /// Parses a single non-blank data line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut reader = ReaderBuilder::new()
            .buffer_capacity(line.len() + 1)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());

        let mut fields = StringRecord::new();
        if !reader.read_record(&mut fields)? {
            return Err(ParseError::TooFewFields { found: 0 });
        }
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                found: fields.len(),
            });
        }

        let raw_price = &fields[PRICE_FIELD];
        let price = raw_price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| ParseError::InvalidPrice {
                value: raw_price.to_string(),
            })?;

        Ok(Record {
            make: fields[MAKE_FIELD].to_string(),
            model: fields[MODEL_FIELD].to_string(),
            price,
        })
    }

    pub fn into_parts(self) -> (CompositeKey, f64) {
        (
            CompositeKey {
                make: self.make,
                model: self.model,
            },
            self.price,
        )
    }
}
