//! Profile values and their deferred interpretation.
//!
//! A [`Value`] is logically a string. Nothing about its type is fixed when it
//! is written; readers decide how to interpret it through [`FromValue`]. A
//! nested [`Profile`] is kept as a structured value so callers can build
//! hierarchical data without re-parsing, but it compares and serializes by
//! its command-block text exactly like a scalar holding the same text.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};

use crate::profile::Profile;

/// Text written for `true`, and implied by a bare `-Switch`.
pub const TRUE_TEXT: &str = "True";
/// Text written for `false`.
pub const FALSE_TEXT: &str = "False";

/// Accepted layouts for timestamps that are not RFC 3339.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A single profile value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Plain text; interpretation is deferred to the reader.
    Scalar(String),
    /// A nested profile, serialized as a block.
    Profile(Profile),
}

impl Value {
    /// The value as text. Nested profiles render as their command block.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Value::Scalar(s) => Cow::Borrowed(s),
            Value::Profile(p) => Cow::Owned(p.to_command_block()),
        }
    }

    /// Returns `true` if this value holds a nested profile.
    pub fn is_profile(&self) -> bool {
        matches!(self, Value::Profile(_))
    }

    /// Interpret the value as `T`.
    pub fn parse<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.text() == other.text()
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(String::new())
    }
}

/// Read-time conversion from a [`Value`].
pub trait FromValue: Sized {
    /// Human-readable type name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Convert, returning `None` if the text does not parse as `Self`.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        let text = value.text();
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") || text == "1" {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") || text == "0" {
            Some(false)
        } else {
            None
        }
    }
}

macro_rules! numeric_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> Option<Self> {
                    value.text().trim().parse().ok()
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(v.to_string())
                }
            }
        )*
    };
}

numeric_from_value!(i32, i64, u16, u32, u64, usize, f64);

impl FromValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.text().into_owned())
    }
}

impl FromValue for DateTime<Utc> {
    const TYPE_NAME: &'static str = "datetime";

    fn from_value(value: &Value) -> Option<Self> {
        let text = value.text();
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

impl FromValue for Profile {
    const TYPE_NAME: &'static str = "profile";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Profile(p) => Some(p.clone()),
            Value::Scalar(s) => Profile::parse(s).ok(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Scalar(if v { TRUE_TEXT } else { FALSE_TEXT }.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Scalar(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Scalar(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Scalar(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Scalar(v.to_rfc3339())
    }
}

impl From<Profile> for Value {
    fn from(v: Profile) -> Self {
        Value::Profile(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bool_accepts_switch_text() {
        assert_eq!(Value::from("True").parse::<bool>(), Some(true));
        assert_eq!(Value::from("false").parse::<bool>(), Some(false));
        assert_eq!(Value::from("1").parse::<bool>(), Some(true));
        assert_eq!(Value::from("maybe").parse::<bool>(), None);
    }

    #[test]
    fn bool_writes_capitalized() {
        assert_eq!(Value::from(true).text(), "True");
        assert_eq!(Value::from(false).text(), "False");
    }

    #[test]
    fn numbers_parse_with_surrounding_space() {
        assert_eq!(Value::from(" 42 ").parse::<i64>(), Some(42));
        assert_eq!(Value::from("-7").parse::<i32>(), Some(-7));
        assert_eq!(Value::from("2.5").parse::<f64>(), Some(2.5));
        assert_eq!(Value::from("x").parse::<u32>(), None);
    }

    #[test]
    fn datetime_accepts_rfc3339_and_plain() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            Value::from("2024-03-01T12:30:00Z").parse::<DateTime<Utc>>(),
            Some(expected)
        );
        assert_eq!(
            Value::from("2024-03-01 12:30:00").parse::<DateTime<Utc>>(),
            Some(expected)
        );
        let written = Value::from(expected);
        assert_eq!(written.parse::<DateTime<Utc>>(), Some(expected));
    }

    #[test]
    fn nested_profile_equals_its_text() {
        let mut inner = Profile::new();
        inner.push("-A", "1");
        inner.push("-B", "two words");
        let structured = Value::from(inner.clone());
        let scalar = Value::Scalar(inner.to_command_block());
        assert_eq!(structured, scalar);
        assert_eq!(scalar.parse::<Profile>(), Some(inner));
    }
}
