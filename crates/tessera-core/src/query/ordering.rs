//! Client-side ordering.
//!
//! Defines the total order every backend and the fallback path agree on:
//! present sort values first (compared in the requested direction), then
//! missing or null values, with record ids ascending as the tie-break.

use std::cmp::Ordering;

use serde_json::Value;

use crate::record::Record;

use super::{Direction, Sort, SortKey};

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values.
///
/// Values of different types order by type (null, bool, number, string,
/// array, object). Strings compare bytewise, which orders RFC 3339 UTC
/// timestamps chronologically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((kx, vx), (ky, vy))| kx.cmp(ky).then_with(|| compare_values(vx, vy)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compare two positions under `direction`. Missing values sort last in
/// both directions; ids always ascend.
pub fn compare_keys(a: &SortKey, b: &SortKey, direction: Direction) -> Ordering {
    let by_value = match (&a.value, &b.value) {
        (Some(x), Some(y)) => match direction {
            Direction::Ascending => compare_values(x, y),
            Direction::Descending => compare_values(x, y).reverse(),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_value.then_with(|| a.id.cmp(&b.id))
}

/// Compare two records under `sort`; unsorted queries order by id.
pub fn compare_records(a: &Record, b: &Record, sort: Option<&Sort>) -> Ordering {
    let direction = sort.map(|s| s.direction).unwrap_or_default();
    compare_keys(&a.sort_key(sort), &b.sort_key(sort), direction)
}

/// Sort records in place. The sort is stable.
pub fn sort_records(records: &mut [Record], sort: Option<&Sort>) {
    records.sort_by(|a, b| compare_records(a, b, sort));
}

/// Returns true if `record` comes strictly after `key` under `sort`.
pub fn is_after(record: &Record, key: &SortKey, sort: Option<&Sort>) -> bool {
    let direction = sort.map(|s| s.direction).unwrap_or_default();
    compare_keys(&record.sort_key(sort), key, direction) == Ordering::Greater
}

/// Drop every record up to and including `key` from an already sorted
/// slice, returning the remainder.
pub fn skip_through<'a>(records: &'a [Record], key: &SortKey, sort: Option<&Sort>) -> &'a [Record] {
    let start = records.partition_point(|r| !is_after(r, key, sort));
    &records[start..]
}
