//! Typed field values of the REST API.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use tessera_core::{Fields, Result, StoreError};

/// One field value in the API's tagged encoding, e.g.
/// `{"integerValue": "42"}` or `{"mapValue": {"fields": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    NullValue(()),
    BooleanValue(bool),
    /// 64-bit integers travel as decimal strings.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<WireValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, WireValue>,
}

/// Rewrite an RFC 3339 timestamp in the form every backend stores: UTC,
/// microsecond precision, `Z` suffix. Values in this form have a fixed
/// width, so comparing them as strings compares them in time.
pub(crate) fn canonical_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn is_canonical_timestamp(s: &str) -> bool {
    s.len() == "2024-01-01T00:00:00.000000Z".len() && canonical_timestamp(s).as_deref() == Some(s)
}

/// Strings already in canonical timestamp form are sent as
/// `timestampValue`, so values read from a timestamp field keep their type
/// in filters, cursors and writes.
impl From<&Value> for WireValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => WireValue::NullValue(()),
            Value::Bool(b) => WireValue::BooleanValue(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => WireValue::IntegerValue(i.to_string()),
                None => WireValue::DoubleValue(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) if is_canonical_timestamp(s) => WireValue::TimestampValue(s.clone()),
            Value::String(s) => WireValue::StringValue(s.clone()),
            Value::Array(items) => WireValue::ArrayValue(ArrayValue {
                values: items.iter().map(WireValue::from).collect(),
            }),
            Value::Object(map) => WireValue::MapValue(MapValue {
                fields: encode_fields(map),
            }),
        }
    }
}

impl WireValue {
    /// Convert to plain JSON.
    ///
    /// Timestamps become canonical timestamp strings (see
    /// [`canonical_timestamp`]). Bytes and references become plain strings,
    /// geo points `{"latitude", "longitude"}` objects.
    pub fn into_json(self) -> Result<Value> {
        Ok(match self {
            WireValue::NullValue(()) => Value::Null,
            WireValue::BooleanValue(b) => Value::Bool(b),
            WireValue::IntegerValue(s) => {
                let i: i64 = s.parse().map_err(|_| StoreError::InvalidData {
                    message: format!("integerValue '{}' is not a 64-bit integer", s),
                })?;
                Value::Number(i.into())
            }
            // Non-finite doubles have no JSON form.
            WireValue::DoubleValue(d) => Number::from_f64(d).map_or(Value::Null, Value::Number),
            WireValue::TimestampValue(s) => {
                Value::String(canonical_timestamp(&s).ok_or_else(|| StoreError::InvalidData {
                    message: format!("timestampValue '{}' is not an RFC 3339 timestamp", s),
                })?)
            }
            WireValue::StringValue(s)
            | WireValue::BytesValue(s)
            | WireValue::ReferenceValue(s) => Value::String(s),
            WireValue::GeoPointValue(p) => serde_json::json!({
                "latitude": p.latitude,
                "longitude": p.longitude,
            }),
            WireValue::ArrayValue(a) => Value::Array(
                a.values
                    .into_iter()
                    .map(WireValue::into_json)
                    .collect::<Result<_>>()?,
            ),
            WireValue::MapValue(m) => Value::Object(decode_fields(m.fields)?),
        })
    }
}

/// Encode a plain field map.
pub(crate) fn encode_fields(fields: &Fields) -> BTreeMap<String, WireValue> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), WireValue::from(v)))
        .collect()
}

/// Decode a field map received from the API.
pub(crate) fn decode_fields(fields: BTreeMap<String, WireValue>) -> Result<Fields> {
    fields
        .into_iter()
        .map(|(k, v)| Ok((k, v.into_json()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_nested_values_in_tagged_form() {
        let value = json!({ "count": 3, "ratio": 0.5, "tags": ["a", null], "done": false });
        let wire = serde_json::to_value(WireValue::from(&value)).unwrap();
        assert_eq!(
            wire,
            json!({ "mapValue": { "fields": {
                "count": { "integerValue": "3" },
                "done": { "booleanValue": false },
                "ratio": { "doubleValue": 0.5 },
                "tags": { "arrayValue": { "values": [
                    { "stringValue": "a" },
                    { "nullValue": null }
                ] } }
            } } })
        );
    }

    #[test]
    fn decodes_server_only_types_to_strings() {
        let wire: WireValue =
            serde_json::from_value(json!({ "timestampValue": "2024-05-01T10:00:00.123456Z" })).unwrap();
        assert_eq!(wire.into_json().unwrap(), json!("2024-05-01T10:00:00.123456Z"));

        let wire: WireValue = serde_json::from_value(json!({
            "geoPointValue": { "latitude": 51.5, "longitude": -0.1 }
        }))
        .unwrap();
        assert_eq!(
            wire.into_json().unwrap(),
            json!({ "latitude": 51.5, "longitude": -0.1 })
        );
    }

    #[test]
    fn timestamps_decode_to_one_fixed_width_form() {
        let decode = |raw: &str| {
            WireValue::TimestampValue(raw.to_string())
                .into_json()
                .unwrap()
        };
        assert_eq!(decode("2024-03-01T09:00:00Z"), json!("2024-03-01T09:00:00.000000Z"));
        assert_eq!(decode("2024-03-01T09:00:00.5Z"), json!("2024-03-01T09:00:00.500000Z"));
        assert_eq!(
            decode("2024-03-01T09:00:00.123456789Z"),
            json!("2024-03-01T09:00:00.123456Z")
        );
        assert_eq!(decode("2024-03-01T10:00:00+01:00"), json!("2024-03-01T09:00:00.000000Z"));

        let bad = WireValue::TimestampValue("yesterday".into());
        assert!(matches!(bad.into_json(), Err(StoreError::InvalidData { .. })));
    }

    #[test]
    fn canonical_timestamp_strings_encode_as_timestamps() {
        let encode = |value: Value| serde_json::to_value(WireValue::from(&value)).unwrap();
        assert_eq!(
            encode(json!("2024-03-01T09:00:00.000000Z")),
            json!({ "timestampValue": "2024-03-01T09:00:00.000000Z" })
        );
        assert_eq!(
            encode(json!("2024-03-01T09:00:00Z")),
            json!({ "stringValue": "2024-03-01T09:00:00Z" })
        );
        assert_eq!(encode(json!("2024-03-01")), json!({ "stringValue": "2024-03-01" }));
    }

    #[test]
    fn empty_containers_omit_their_members() {
        let wire: WireValue = serde_json::from_value(json!({ "arrayValue": {} })).unwrap();
        assert_eq!(wire.into_json().unwrap(), json!([]));
        let wire: WireValue = serde_json::from_value(json!({ "mapValue": {} })).unwrap();
        assert_eq!(wire.into_json().unwrap(), json!({}));
    }

    #[test]
    fn malformed_integer_is_invalid_data() {
        let wire = WireValue::IntegerValue("twelve".into());
        assert!(matches!(wire.into_json(), Err(StoreError::InvalidData { .. })));
    }
}
