use std::borrow::Cow;

use chrono::{DateTime, Utc};

/// A borrowed view of a field, as seen by validation rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(&'a str),
    Time(DateTime<Utc>),
    /// A sequence, carried by its length.
    List(usize),
    /// A nested object; rules only see that it is present.
    Object,
}

impl Value<'_> {
    /// Textual form used by the format rules. `Null`, lists and objects
    /// render empty so format rules skip them.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Value::Str(s) => Cow::Borrowed(s),
            Value::Bool(b) => Cow::Owned(b.to_string()),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::UInt(u) => Cow::Owned(u.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
            Value::Time(t) => Cow::Owned(t.to_rfc3339()),
            Value::Null | Value::List(_) | Value::Object => Cow::Borrowed(""),
        }
    }

    /// Magnitude used by the size rules: numbers by value, strings by
    /// character count, lists by length. `None` for `Null`.
    pub fn size(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => Some(s.chars().count() as f64),
            Value::List(len) => Some(*len as f64),
            Value::Bool(_) | Value::Time(_) | Value::Object => Some(0.0),
        }
    }

    /// False for null, empty strings, zero numbers, the zero time and
    /// empty lists. Booleans are always considered present.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(_) | Value::Object => true,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Time(t) => *t != DateTime::<Utc>::default(),
            Value::List(len) => *len > 0,
        }
    }
}

/// Conversion into a [`Value`] for validation.
pub trait ToValue {
    fn to_value(&self) -> Value<'_>;
}

impl ToValue for Value<'_> {
    fn to_value(&self) -> Value<'_> {
        *self
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

macro_rules! signed_to_value {
    ($($t:ty),*) => {
        $(impl ToValue for $t {
            fn to_value(&self) -> Value<'_> {
                Value::Int(*self as i64)
            }
        })*
    };
}

macro_rules! unsigned_to_value {
    ($($t:ty),*) => {
        $(impl ToValue for $t {
            fn to_value(&self) -> Value<'_> {
                Value::UInt(*self as u64)
            }
        })*
    };
}

signed_to_value!(i8, i16, i32, i64, isize);
unsigned_to_value!(u8, u16, u32, u64, usize);

impl ToValue for f32 {
    fn to_value(&self) -> Value<'_> {
        Value::Float(*self as f64)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value<'_> {
        Value::Float(*self)
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value<'_> {
        Value::Time(*self)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value<'_> {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T> ToValue for [T] {
    fn to_value(&self) -> Value<'_> {
        Value::List(self.len())
    }
}

impl<T> ToValue for Vec<T> {
    fn to_value(&self) -> Value<'_> {
        Value::List(self.len())
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value<'_> {
        match self {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(a) => Value::List(a.len()),
            serde_json::Value::Object(_) => Value::Object,
        }
    }
}
