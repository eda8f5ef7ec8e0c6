//! Provides a dynamic value type abstraction.
//!
//! This module gives access to a dynamically typed value which is used by
//! the template engine during rendering.  The context a template is rendered
//! against is such a value, and so are the intermediate results of modifier
//! pipelines.
//!
//! Values are cheap to clone: strings, sequences and maps are reference
//! counted.  They are also `Send` and `Sync` so that a single context can be
//! shared between threads rendering concurrently.
//!
//! # Creating Values
//!
//! The most common way to create a value is [`Value::from_serialize`] which
//! accepts anything implementing [`Serialize`](serde::Serialize):
//!
//! ```
//! # use streamfmt::value::Value;
//! let langs = Value::from_serialize(&vec!["English", "Hindi"]);
//! ```
//!
//! Alternatively primitives convert directly via [`From`], and the
//! [`context!`](crate::context) macro builds maps.  Values also implement
//! [`Deserialize`](serde::Deserialize) so a context can be loaded straight
//! from JSON or any other serde format.
//!
//! # Absent values
//!
//! Looking up a path that does not exist never fails.  It produces the
//! special [`Value::UNDEFINED`] which renders as an empty string and is
//! false in conditions.  `null` in the input data is kept as a distinct
//! "none" value but behaves the same way.
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod deserialize;
mod serialize;

/// Describes the kind of value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValueKind {
    /// The value is undefined (absent)
    Undefined,
    /// The value is the none singleton (`null`)
    None,
    /// The value is a [`bool`]
    Bool,
    /// The value is a number
    Number,
    /// The value is a string
    String,
    /// The value is a sequence of other values
    Seq,
    /// The value is a key/value mapping
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = match *self {
            ValueKind::Undefined => "undefined",
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Seq => "sequence",
            ValueKind::Map => "map",
        };
        write!(f, "{ty}")
    }
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    Undefined,
    None,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(Arc<str>),
    Seq(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
}

/// Represents a dynamically typed value in the template engine.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl Default for Value {
    fn default() -> Value {
        Value::UNDEFINED
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::Undefined => f.write_str("undefined"),
            ValueRepr::None => f.write_str("none"),
            ValueRepr::Bool(val) => fmt::Debug::fmt(&val, f),
            ValueRepr::I64(val) => fmt::Debug::fmt(&val, f),
            ValueRepr::F64(val) => fmt::Debug::fmt(&val, f),
            ValueRepr::String(ref val) => fmt::Debug::fmt(val, f),
            ValueRepr::Seq(ref val) => f.debug_list().entries(val.iter()).finish(),
            ValueRepr::Map(ref val) => f.debug_map().entries(val.iter()).finish(),
        }
    }
}

/// Renders the value the way it appears in template output.
///
/// Sequences and maps have no textual form: they render as an empty string
/// unless reduced to a scalar first (for instance with `join`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::Undefined | ValueRepr::None => Ok(()),
            ValueRepr::Bool(val) => fmt::Display::fmt(&val, f),
            ValueRepr::I64(val) => fmt::Display::fmt(&val, f),
            ValueRepr::F64(val) => fmt::Display::fmt(&val, f),
            ValueRepr::String(ref val) => f.write_str(val),
            ValueRepr::Seq(_) | ValueRepr::Map(_) => Ok(()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ValueRepr::Undefined, ValueRepr::Undefined) => true,
            (ValueRepr::None, ValueRepr::None) => true,
            (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
            (ValueRepr::I64(a), ValueRepr::I64(b)) => a == b,
            (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
            (ValueRepr::Seq(a), ValueRepr::Seq(b)) => a == b,
            (ValueRepr::Map(a), ValueRepr::Map(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) if self.is_number() && other.is_number() => a == b,
                _ => false,
            },
        }
    }
}

impl Value {
    /// The undefined value.
    ///
    /// This is what lookups of missing paths produce.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// Creates a value from something that can be serialized.
    ///
    /// This never fails.  If the serialization itself fails (for instance
    /// because a map has non-string keys) the result is undefined.
    ///
    /// ```
    /// # use streamfmt::value::Value;
    /// let val = Value::from_serialize(&vec![1, 2, 3]);
    /// assert_eq!(val.len(), Some(3));
    /// ```
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Value {
        serialize::transform(value)
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::Undefined => ValueKind::Undefined,
            ValueRepr::None => ValueKind::None,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::I64(_) | ValueRepr::F64(_) => ValueKind::Number,
            ValueRepr::String(_) => ValueKind::String,
            ValueRepr::Seq(_) => ValueKind::Seq,
            ValueRepr::Map(_) => ValueKind::Map,
        }
    }

    /// Is this value undefined?
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined)
    }

    /// Is this value none?
    pub fn is_none(&self) -> bool {
        matches!(self.0, ValueRepr::None)
    }

    /// Is this value a number?
    pub fn is_number(&self) -> bool {
        matches!(self.0, ValueRepr::I64(_) | ValueRepr::F64(_))
    }

    /// Checks if the value is considered true in conditions.
    ///
    /// Non-empty strings, non-zero numbers, `true`, and non-empty sequences
    /// and maps are true.  Everything else, including undefined, is false.
    pub fn is_true(&self) -> bool {
        match self.0 {
            ValueRepr::Undefined | ValueRepr::None => false,
            ValueRepr::Bool(val) => val,
            ValueRepr::I64(val) => val != 0,
            ValueRepr::F64(val) => val != 0.0 && !val.is_nan(),
            ValueRepr::String(ref val) => !val.is_empty(),
            ValueRepr::Seq(ref val) => !val.is_empty(),
            ValueRepr::Map(ref val) => !val.is_empty(),
        }
    }

    /// If the value is a string, returns it.
    pub fn as_str(&self) -> Option<&str> {
        match self.0 {
            ValueRepr::String(ref val) => Some(val),
            _ => None,
        }
    }

    /// If the value is a bool, returns it.
    pub fn as_bool(&self) -> Option<bool> {
        match self.0 {
            ValueRepr::Bool(val) => Some(val),
            _ => None,
        }
    }

    /// Returns the numeric interpretation of the value.
    ///
    /// Numbers are returned as is, strings are parsed after trimming
    /// surrounding whitespace.  Everything else has no numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self.0 {
            ValueRepr::I64(val) => Some(val as f64),
            ValueRepr::F64(val) => Some(val).filter(|x| !x.is_nan()),
            ValueRepr::String(ref val) => val.trim().parse::<f64>().ok().filter(|x| !x.is_nan()),
            _ => None,
        }
    }

    /// Returns the value as integer if it is an integer or an integral float.
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            ValueRepr::I64(val) => Some(val),
            ValueRepr::F64(val) if val.fract() == 0.0 && val.abs() < i64::MAX as f64 => {
                Some(val as i64)
            }
            _ => None,
        }
    }

    /// If the value is a sequence, returns its items.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self.0 {
            ValueRepr::Seq(ref val) => Some(&val[..]),
            _ => None,
        }
    }

    /// Returns the length of strings (in characters), sequences and maps.
    pub fn len(&self) -> Option<usize> {
        match self.0 {
            ValueRepr::String(ref val) => Some(val.chars().count()),
            ValueRepr::Seq(ref val) => Some(val.len()),
            ValueRepr::Map(ref val) => Some(val.len()),
            _ => None,
        }
    }

    /// Returns the string form of a scalar.
    ///
    /// Undefined, none, sequences and maps have no string form.
    pub fn to_scalar_str(&self) -> Option<Cow<'_, str>> {
        match self.0 {
            ValueRepr::String(ref val) => Some(Cow::Borrowed(val)),
            ValueRepr::Bool(_) | ValueRepr::I64(_) | ValueRepr::F64(_) => {
                Some(Cow::Owned(self.to_string()))
            }
            _ => None,
        }
    }

    /// Looks up a single attribute.
    ///
    /// Maps are indexed by key, sequences by a numeric segment.  Missing
    /// attributes are undefined.
    pub fn get_attr(&self, key: &str) -> Value {
        match self.0 {
            ValueRepr::Map(ref map) => map.get(key).cloned().unwrap_or_default(),
            ValueRepr::Seq(ref seq) => key
                .parse::<usize>()
                .ok()
                .and_then(|idx| seq.get(idx))
                .cloned()
                .unwrap_or_default(),
            _ => Value::UNDEFINED,
        }
    }

    /// Resolves a path given as segments.
    ///
    /// ```
    /// # use streamfmt::context;
    /// let ctx = context!(stream => context!(name => "x"));
    /// assert_eq!(ctx.get_path(["stream", "name"]).as_str(), Some("x"));
    /// assert!(ctx.get_path(["stream", "missing", "deeper"]).is_undefined());
    /// ```
    pub fn get_path<I, S>(&self, segments: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut iter = segments.into_iter();
        let mut rv = match iter.next() {
            Some(first) => self.get_attr(first.as_ref()),
            None => return self.clone(),
        };
        for segment in iter {
            if rv.is_undefined() {
                break;
            }
            rv = rv.get_attr(segment.as_ref());
        }
        rv
    }

    /// Compares two values for sorting.
    ///
    /// Numbers sort numerically and before everything else, the rest sorts
    /// by string form.
    pub(crate) fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_number(), other.is_number()) {
            (true, true) => {
                let a = self.as_number().unwrap_or(0.0);
                let b = other.as_number().unwrap_or(0.0);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value(ValueRepr::None)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Value {
        Value(ValueRepr::Bool(val))
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Value {
                    Value(ValueRepr::I64(val as i64))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(val: u64) -> Value {
        match i64::try_from(val) {
            Ok(val) => Value(ValueRepr::I64(val)),
            Err(_) => Value(ValueRepr::F64(val as f64)),
        }
    }
}

impl From<usize> for Value {
    fn from(val: usize) -> Value {
        Value::from(val as u64)
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Value {
        Value(ValueRepr::F64(val as f64))
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Value {
        Value(ValueRepr::F64(val))
    }
}

impl<'a> From<&'a str> for Value {
    fn from(val: &'a str) -> Value {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl From<String> for Value {
    fn from(val: String) -> Value {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    fn from(val: Cow<'a, str>) -> Value {
        match val {
            Cow::Borrowed(val) => Value::from(val),
            Cow::Owned(val) => Value::from(val),
        }
    }
}

impl From<Arc<str>> for Value {
    fn from(val: Arc<str>) -> Value {
        Value(ValueRepr::String(val))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Value {
        match val {
            Some(val) => val.into(),
            None => Value(ValueRepr::None),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Value {
        val.into_iter().collect()
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(val: BTreeMap<String, Value>) -> Value {
        Value(ValueRepr::Map(Arc::new(val)))
    }
}

impl<V: Into<Value>> FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Value(ValueRepr::Seq(Arc::new(
            iter.into_iter().map(Into::into).collect(),
        )))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Value(ValueRepr::Map(Arc::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_truthiness() {
        assert!(!Value::UNDEFINED.is_true());
        assert!(!Value::from(()).is_true());
        assert!(!Value::from("").is_true());
        assert!(Value::from("x").is_true());
        assert!(!Value::from(0).is_true());
        assert!(Value::from(0.5).is_true());
        assert!(!Value::from(Vec::<i32>::new()).is_true());
        assert!(Value::from(vec!["a"]).is_true());
        assert!(Value::from(true).is_true());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::UNDEFINED.to_string(), "");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(2.0).to_string(), "2");
        assert_eq!(Value::from(false).to_string(), "false");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "");
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::from(" 1024 ").as_number(), Some(1024.0));
        assert_eq!(Value::from("2160p").as_number(), None);
        assert_eq!(Value::from("NaN").as_number(), None);
        assert_eq!(Value::from(true).as_number(), None);
        assert_eq!(Value::from(u64::MAX).kind(), ValueKind::Number);
    }

    #[test]
    fn test_get_attr() {
        let seq = Value::from(vec!["English", "Hindi"]);
        assert_eq!(seq.get_attr("1"), Value::from("Hindi"));
        assert!(seq.get_attr("2").is_undefined());
        assert!(seq.get_attr("x").is_undefined());
        assert!(Value::from(42).get_attr("x").is_undefined());
    }

    #[test]
    fn test_number_equality() {
        assert_eq!(Value::from(2), Value::from(2.0));
        assert!(Value::from(2) != Value::from("2"));
    }
}
