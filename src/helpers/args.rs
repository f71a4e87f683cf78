//! Conversions from [`Value`] into concrete helper argument types.

use crate::value::Map;
use crate::Value;

pub(crate) type Result<T> = std::result::Result<T, Error>;

pub(crate) enum Error {
    /// `(expected, got)`
    Type(&'static str, &'static str),
}

use crate::helpers::HelperArg;

impl HelperArg for Value {
    fn from_value(v: Value) -> Result<Self> {
        Ok(v)
    }
}

impl HelperArg for bool {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Bool(b) => Ok(b),
            v => Err(Error::Type("bool", v.human())),
        }
    }
}

impl HelperArg for i64 {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Integer(n) => Ok(n),
            v => Err(Error::Type("integer", v.human())),
        }
    }
}

impl HelperArg for f64 {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Float(n) => Ok(n),
            Value::Integer(n) => Ok(n as f64),
            v => Err(Error::Type("float", v.human())),
        }
    }
}

impl HelperArg for String {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::String(s) => Ok(s),
            v => Err(Error::Type("string", v.human())),
        }
    }
}

impl HelperArg for Vec<Value> {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::List(list) => Ok(list),
            v => Err(Error::Type("list", v.human())),
        }
    }
}

impl HelperArg for Map<String, Value> {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Map(map) => Ok(map),
            v => Err(Error::Type("map", v.human())),
        }
    }
}
