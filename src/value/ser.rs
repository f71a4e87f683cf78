//! Serde integration for [`Value`].
//!
//! Contexts are converted to a [`Value`] by round-tripping through
//! [`serde_json::Value`], which also gives the `json` directive its
//! serialization for free via the [`serde::Serialize`] impl below.

use serde::ser::{SerializeMap, SerializeSeq, Serializer};

use crate::{Error, Result, Value};

/// Convert any serializable data to a [`Value`].
pub fn to_value<S>(data: S) -> Result<Value>
where
    S: serde::Serialize,
{
    let v = serde_json::to_value(data).map_err(Error::serialize)?;
    Ok(Value::from(v))
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(list) => {
                Self::List(list.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for value in list {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    m.serialize_entry(key, value)?;
                }
                m.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_value_struct() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
            age: i64,
        }
        let v = to_value(User {
            name: "John".into(),
            age: 42,
        })
        .unwrap();
        let exp = Value::from([
            ("age".to_owned(), Value::Integer(42)),
            ("name".to_owned(), Value::from("John")),
        ]);
        assert_eq!(v, exp);
    }

    #[test]
    fn value_round_trip_json() {
        let v = Value::from([
            ("list".to_owned(), Value::from(["a", "b"])),
            ("none".to_owned(), Value::None),
        ]);
        let s = serde_json::to_string(&v).unwrap();
        assert_eq!(s, r#"{"list":["a","b"],"none":null}"#);
    }
}
