//! Builtin helpers.
//!
//! These are registered on every new engine when the `builtins` feature is
//! enabled. `encodeHTML` mirrors the one helper the original runtime always
//! carried.

use crate::helpers::HelperSet;
use crate::{fmt, Value};

pub(crate) fn register(set: &mut HelperSet) {
    set.add("encodeHTML", encode_html);
    set.add("lower", lower);
    set.add("upper", upper);
    set.add("trim", trim);
    set.add("length", length);
    set.add("first", first);
    set.add("last", last);
    set.add("reverse", reverse);
}

/// Replaces HTML-significant characters with their entity forms.
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn encode_html(s: String) -> String {
    fmt::escape(&s).into_owned()
}

/// Returns the lowercase equivalent of this string.
///
/// See [`str::to_lowercase`].
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn lower(s: String) -> String {
    s.to_lowercase()
}

/// Returns the uppercase equivalent of this string.
///
/// See [`str::to_uppercase`].
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn upper(s: String) -> String {
    s.to_uppercase()
}

/// Returns the string with leading and trailing whitespace removed.
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn trim(s: String) -> String {
    s.trim().to_owned()
}

/// Returns the number of elements in a list or map, or characters in a
/// string.
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn length(value: Value) -> Result<i64, String> {
    match value {
        Value::String(s) => Ok(s.chars().count() as i64),
        Value::List(l) => Ok(l.len() as i64),
        Value::Map(m) => Ok(m.len() as i64),
        value => Err(format!("unsupported value `{}`", value.human())),
    }
}

/// Returns the first element in a list.
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn first(mut list: Vec<Value>) -> Option<Value> {
    if list.is_empty() {
        None
    } else {
        Some(list.remove(0))
    }
}

/// Returns the last element in a list.
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn last(mut list: Vec<Value>) -> Option<Value> {
    list.pop()
}

/// Reverses a list or string.
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
pub fn reverse(value: Value) -> Result<Value, String> {
    match value {
        Value::String(string) => Ok(Value::String(string.chars().rev().collect())),
        Value::List(list) => Ok(Value::List(list.into_iter().rev().collect())),
        value => Err(format!("unsupported value `{}`", value.human())),
    }
}
