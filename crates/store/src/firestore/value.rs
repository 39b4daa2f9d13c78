//! Conversion between plain JSON and Firestore's typed `Value` JSON.
//!
//! Plain → typed: integers become `integerValue` (string-encoded), other
//! numbers `doubleValue`, objects `mapValue`, arrays `arrayValue`.
//! Typed → plain: `timestampValue` and `referenceValue` come back as strings.

use serde_json::{Map, Number, Value, json};

use crate::document::Fields;
use crate::r#trait::StoreError;

pub fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect();
    Value::Object(encoded)
}

pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if n.as_u64().is_some() {
                // integerValue is int64; larger unsigned values saturate.
                json!({ "integerValue": i64::MAX.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decode the `fields` object of a Firestore document. A missing object is empty.
pub fn decode_fields(fields: Option<&Value>) -> Result<Fields, StoreError> {
    let Some(fields) = fields else {
        return Ok(Fields::new());
    };
    let map = fields
        .as_object()
        .ok_or_else(|| StoreError::Decode("document fields must be an object".to_string()))?;
    map.iter()
        .map(|(k, v)| Ok((k.clone(), decode(v)?)))
        .collect()
}

pub fn decode(value: &Value) -> Result<Value, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Decode(format!("expected typed value, got {value}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::Decode("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| bad(kind, inner)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed.map(Value::from).ok_or_else(|| bad(kind, inner))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                // NaN/Infinity arrive as strings and have no JSON number form.
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            Ok(parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| bad(kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            values
                .iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => decode_fields(inner.get("fields")).map(Value::Object),
        other => Err(StoreError::Decode(format!("unsupported value type '{other}'"))),
    }
}

fn bad(kind: &str, inner: &Value) -> StoreError {
    StoreError::Decode(format!("malformed {kind}: {inner}"))
}
