// Typed scalar values of odML properties
//
// A property stores a flat list of scalars that all share the property's
// dtype. Text typed in by the user is read through `DType::parse`, and
// changing the dtype of a property converts every stored scalar.

use crate::tree::error::{TreeError, TreeResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// odML data type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[default]
    String,
    Text,
    Int,
    Float,
    Boolean,
    Date,
    Time,
    DateTime,
    Url,
    Person,
}

impl DType {
    /// All dtypes, in the order a dtype chooser lists them
    pub const ALL: [DType; 10] = [
        DType::String,
        DType::Text,
        DType::Int,
        DType::Float,
        DType::Boolean,
        DType::Date,
        DType::Time,
        DType::DateTime,
        DType::Url,
        DType::Person,
    ];

    /// odML name of the dtype
    pub fn name(self) -> &'static str {
        match self {
            DType::String => "string",
            DType::Text => "text",
            DType::Int => "int",
            DType::Float => "float",
            DType::Boolean => "boolean",
            DType::Date => "date",
            DType::Time => "time",
            DType::DateTime => "datetime",
            DType::Url => "url",
            DType::Person => "person",
        }
    }

    /// Value a freshly added pseudo-value starts with
    ///
    /// Date and time types default to the current local time, truncated
    /// to whole seconds so the value round-trips through its text form.
    pub fn default_value(self) -> Scalar {
        match self {
            DType::String | DType::Text | DType::Url | DType::Person => {
                Scalar::Text(String::new())
            }
            DType::Int => Scalar::Int(0),
            DType::Float => Scalar::Float(0.0),
            DType::Boolean => Scalar::Bool(false),
            DType::Date => Scalar::Date(chrono::Local::now().date_naive()),
            DType::Time => {
                let now = chrono::Local::now().time();
                Scalar::Time(now.with_nanosecond(0).unwrap_or(now))
            }
            DType::DateTime => {
                let now = chrono::Local::now().naive_local();
                Scalar::DateTime(now.with_nanosecond(0).unwrap_or(now))
            }
        }
    }

    /// Read user supplied text as a scalar of this dtype
    pub fn parse(self, text: &str) -> TreeResult<Scalar> {
        let mismatch = || TreeError::TypeMismatch {
            dtype: self,
            text: text.to_string(),
        };
        let trimmed = text.trim();

        match self {
            DType::String | DType::Text | DType::Url | DType::Person => {
                Ok(Scalar::Text(text.to_string()))
            }
            DType::Int => trimmed.parse().map(Scalar::Int).map_err(|_| mismatch()),
            DType::Float => trimmed.parse().map(Scalar::Float).map_err(|_| mismatch()),
            DType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "t" | "yes" => Ok(Scalar::Bool(true)),
                "false" | "0" | "f" | "no" => Ok(Scalar::Bool(false)),
                _ => Err(mismatch()),
            },
            DType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(Scalar::Date)
                .map_err(|_| mismatch()),
            DType::Time => NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
                .map(Scalar::Time)
                .map_err(|_| mismatch()),
            DType::DateTime => NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
                .map(Scalar::DateTime)
                .map_err(|_| mismatch()),
        }
    }

    /// Convert a scalar of any dtype into this one
    ///
    /// Any conversion that succeeds can be converted back, so a dtype
    /// change on a property can always be reverted.
    pub fn convert(self, scalar: &Scalar) -> TreeResult<Scalar> {
        if scalar.conforms_to(self) {
            return Ok(scalar.clone());
        }
        match (scalar, self) {
            (Scalar::Bool(v), DType::Int) => Ok(Scalar::Int(i64::from(*v))),
            (Scalar::Bool(v), DType::Float) => Ok(Scalar::Float(if *v { 1.0 } else { 0.0 })),
            (Scalar::Int(v), DType::Float) => Ok(Scalar::Float(*v as f64)),
            // Whole floats only; the text form of large floats would not parse as int
            (Scalar::Float(v), DType::Int) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    Ok(Scalar::Int(*v as i64))
                } else {
                    Err(TreeError::TypeMismatch {
                        dtype: self,
                        text: scalar.to_string(),
                    })
                }
            }
            _ => self.parse(&scalar.to_string()),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .into_iter()
            .find(|dtype| dtype.name() == s.trim())
            .ok_or_else(|| TreeError::UnknownDType(s.to_string()))
    }
}

/// A single entry of a property's value list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Scalar {
    /// Whether this scalar can be stored under `dtype` without conversion
    pub fn conforms_to(&self, dtype: DType) -> bool {
        matches!(
            (self, dtype),
            (
                Scalar::Text(_),
                DType::String | DType::Text | DType::Url | DType::Person
            ) | (Scalar::Int(_), DType::Int)
                | (Scalar::Float(_), DType::Float)
                | (Scalar::Bool(_), DType::Boolean)
                | (Scalar::Date(_), DType::Date)
                | (Scalar::Time(_), DType::Time)
                | (Scalar::DateTime(_), DType::DateTime)
        )
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(text) => f.write_str(text),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
            Scalar::Time(v) => write!(f, "{}", v.format(TIME_FORMAT)),
            Scalar::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
        }
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Scalar::Text(text.to_string())
    }
}

impl From<String> for Scalar {
    fn from(text: String) -> Self {
        Scalar::Text(text)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}
