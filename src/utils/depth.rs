//! Order-book level parsing for the wire shapes exchanges use.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Level;

use super::balance::parse_amount;

/// Levels sent as `[[rate, quantity, ...], ...]`, where each number may be a
/// JSON string or a JSON number. Extra trailing fields are ignored.
pub fn parse_levels(value: &Value, side: &str) -> Result<Vec<Level>> {
    let rows = value
        .as_array()
        .ok_or_else(|| Error::parse(side, format!("expected an array of levels, got {value}")))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let fields = row
                .as_array()
                .filter(|f| f.len() >= 2)
                .ok_or_else(|| Error::parse(side, format!("level {i} is not [rate, quantity]: {row}")))?;
            let rate = parse_amount(&fields[0])
                .ok_or_else(|| Error::parse(side, format!("level {i} has invalid rate {}", fields[0])))?;
            let quantity = parse_amount(&fields[1]).ok_or_else(|| {
                Error::parse(side, format!("level {i} has invalid quantity {}", fields[1]))
            })?;
            Ok(Level::new(rate, quantity))
        })
        .collect()
}

/// Levels flattened as `[rate0, qty0, rate1, qty1, ...]`.
pub fn parse_flat_levels(value: &Value, side: &str) -> Result<Vec<Level>> {
    let flat = value
        .as_array()
        .ok_or_else(|| Error::parse(side, format!("expected a flat array, got {value}")))?;
    if flat.len() % 2 != 0 {
        return Err(Error::parse(
            side,
            format!("flat level array has odd length {}", flat.len()),
        ));
    }

    flat.chunks(2)
        .enumerate()
        .map(|(i, chunk)| {
            match (parse_amount(&chunk[0]), parse_amount(&chunk[1])) {
                (Some(rate), Some(quantity)) => Ok(Level::new(rate, quantity)),
                _ => Err(Error::parse(side, format!("level {i} is not numeric"))),
            }
        })
        .collect()
}
