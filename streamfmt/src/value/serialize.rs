use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::value::{Value, ValueRepr};

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            ValueRepr::Bool(b) => serializer.serialize_bool(b),
            ValueRepr::I64(i) => serializer.serialize_i64(i),
            ValueRepr::F64(f) => serializer.serialize_f64(f),
            ValueRepr::None | ValueRepr::Undefined => serializer.serialize_unit(),
            ValueRepr::String(ref s) => serializer.serialize_str(s),
            ValueRepr::Seq(ref items) => {
                let mut seq = ok!(serializer.serialize_seq(Some(items.len())));
                for item in items.iter() {
                    ok!(seq.serialize_element(item));
                }
                seq.end()
            }
            ValueRepr::Map(ref entries) => {
                let mut map = ok!(serializer.serialize_map(Some(entries.len())));
                for (key, value) in entries.iter() {
                    ok!(map.serialize_entry(key, value));
                }
                map.end()
            }
        }
    }
}

/// Converts any serializable value by going through the JSON data model.
pub(crate) fn transform<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(json) => from_json(json),
        Err(_err) => {
            debug!(error = %_err, "value could not be serialized, treating as undefined");
            Value::UNDEFINED
        }
    }
}

fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::from(()),
        serde_json::Value::Bool(b) => Value::from(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map_or(Value::UNDEFINED, Value::from)
            }
        }
        serde_json::Value::String(s) => Value::from(s),
        serde_json::Value::Array(items) => items.into_iter().map(from_json).collect(),
        serde_json::Value::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| (key, from_json(value)))
            .collect(),
    }
}
