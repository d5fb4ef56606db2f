//! Scalar fields and dates.

use crate::MappingError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// A value read from and written to a single JSON scalar.
pub trait Scalar: Sized {
    /// Reads the value, failing with [`MappingError::TypeMismatch`] if the
    /// JSON type is incompatible.
    fn from_json(field: &str, value: &Value) -> Result<Self, MappingError>;

    /// Writes the value.
    fn to_json(&self) -> Value;
}

fn mismatch(field: &str, expected: &'static str, value: &Value) -> MappingError {
    MappingError::TypeMismatch {
        field: field.to_string(),
        expected,
        got: value.clone(),
    }
}

impl Scalar for String {
    fn from_json(field: &str, value: &Value) -> Result<Self, MappingError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch(field, "string", value))
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Scalar for bool {
    fn from_json(field: &str, value: &Value) -> Result<Self, MappingError> {
        value.as_bool().ok_or_else(|| mismatch(field, "boolean", value))
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Scalar for f64 {
    fn from_json(field: &str, value: &Value) -> Result<Self, MappingError> {
        value.as_f64().ok_or_else(|| mismatch(field, "number", value))
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl Scalar for f32 {
    fn from_json(field: &str, value: &Value) -> Result<Self, MappingError> {
        value
            .as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| mismatch(field, "number", value))
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

macro_rules! impl_integer_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            fn from_json(field: &str, value: &Value) -> Result<Self, MappingError> {
                value
                    .as_i64()
                    .and_then(|n| <$t>::try_from(n).ok())
                    .or_else(|| value.as_u64().and_then(|n| <$t>::try_from(n).ok()))
                    .ok_or_else(|| mismatch(field, "integer", value))
            }

            fn to_json(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

impl_integer_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// A model field that can be assigned from JSON.
///
/// Implemented for every [`Scalar`] type and for `Option` of each. A JSON
/// `null` clears an `Option` field and is a type mismatch for a required one.
pub trait Field {
    /// Assigns `value` to `self`.
    fn assign(&mut self, field: &str, value: &Value) -> Result<(), MappingError>;

    /// The JSON for `self`, or `None` when there is nothing to write.
    fn encode(&self) -> Option<Value>;
}

macro_rules! impl_field {
    ($($t:ty),*) => {$(
        impl Field for $t {
            fn assign(&mut self, field: &str, value: &Value) -> Result<(), MappingError> {
                *self = <$t as Scalar>::from_json(field, value)?;
                Ok(())
            }

            fn encode(&self) -> Option<Value> {
                Some(Scalar::to_json(self))
            }
        }

        impl Field for Option<$t> {
            fn assign(&mut self, field: &str, value: &Value) -> Result<(), MappingError> {
                *self = match value {
                    Value::Null => None,
                    value => Some(<$t as Scalar>::from_json(field, value)?),
                };
                Ok(())
            }

            fn encode(&self) -> Option<Value> {
                self.as_ref().map(Scalar::to_json)
            }
        }
    )*};
}

impl_field!(String, bool, f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Assigns `json` to `target`.
///
/// An absent value (`None`) leaves the target untouched.
///
/// # Examples
///
/// ```
/// use tether::mapping::map_field;
/// use serde_json::json;
///
/// let mut amount: Option<i64> = Some(1);
/// map_field("amount", &mut amount, None).unwrap();
/// assert_eq!(amount, Some(1));
///
/// map_field("amount", &mut amount, Some(&json!(20))).unwrap();
/// assert_eq!(amount, Some(20));
///
/// assert!(map_field("amount", &mut amount, Some(&json!("twenty"))).is_err());
/// ```
pub fn map_field<F: Field>(
    field: &str,
    target: &mut F,
    json: Option<&Value>,
) -> Result<(), MappingError> {
    match json {
        None => Ok(()),
        Some(value) => target.assign(field, value),
    }
}

/// Assigns a date read from `json` to `target`.
///
/// See [`parse_date`] for the accepted values. An absent value leaves the target
/// untouched; `null` clears it.
pub fn map_date(
    field: &str,
    target: &mut Option<DateTime<Utc>>,
    json: Option<&Value>,
    format: &str,
) -> Result<(), MappingError> {
    match json {
        None => {}
        Some(Value::Null) => *target = None,
        Some(value) => {
            *target = Some(parse_date(value, format).inspect_err(|e| {
                tracing::debug!(field = field, error = %e, "Date did not parse");
            })?)
        }
    }
    Ok(())
}

/// Reads a date from a JSON value.
///
/// A number is taken as seconds since the Unix epoch. A string is parsed with the
/// chrono `format`, first as a date-time with offset, then as a naive date-time
/// in UTC, then as a date at midnight UTC.
///
/// # Examples
///
/// ```
/// use tether::mapping::parse_date;
/// use chrono::{TimeZone, Utc};
/// use serde_json::json;
///
/// let date = parse_date(&json!("1994-08-20"), "%Y-%m-%d").unwrap();
/// assert_eq!(date, Utc.with_ymd_and_hms(1994, 8, 20, 0, 0, 0).unwrap());
///
/// let date = parse_date(&json!(1234.0), "%Y-%m-%d").unwrap();
/// assert_eq!(date.timestamp(), 1234);
/// ```
pub fn parse_date(value: &Value, format: &str) -> Result<DateTime<Utc>, MappingError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64().and_then(|seconds| {
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
            DateTime::from_timestamp(whole as i64, nanos)
        }),
        Value::String(text) => DateTime::parse_from_str(text, format)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, format)
                    .ok()
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }),
        _ => None,
    };

    parsed.ok_or_else(|| MappingError::DateFormatError {
        value: value.clone(),
        format: format.to_string(),
    })
}

/// Writes a date as a string in the given chrono `format`.
pub fn date_to_json(date: &DateTime<Utc>, format: &str) -> Value {
    Value::String(date.format(format).to_string())
}
