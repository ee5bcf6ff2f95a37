// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Typed cell values used by rows read from and written to tables.

mod interval;
mod time;

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
pub use interval::DayTimeInterval;
use serde::{Deserialize, Serialize};
pub use time::{TimeOfDay, between_nullable, indeterminate};

use super::PrimitiveType;
use crate::{Error, ErrorKind, Result};

/// A non-null typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    /// `boolean`
    Boolean(bool),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `double`
    Double(f64),
    /// `string`
    String(String),
    /// `time`
    Time(TimeOfDay),
    /// Microseconds since the epoch, UTC.
    TimestampTz(i64),
}

/// One row: an ordered sequence of nullable cells.
pub type Row = Vec<Option<Datum>>;

impl Datum {
    /// Creates a `boolean` value.
    pub fn bool(v: bool) -> Self {
        Self::Boolean(v)
    }

    /// Creates an `int` value.
    pub fn int(v: i32) -> Self {
        Self::Int(v)
    }

    /// Creates a `long` value.
    pub fn long(v: i64) -> Self {
        Self::Long(v)
    }

    /// Creates a `double` value.
    pub fn double(v: f64) -> Self {
        Self::Double(v)
    }

    /// Creates a `string` value.
    pub fn string(v: impl ToString) -> Self {
        Self::String(v.to_string())
    }

    /// Creates a `time` value.
    pub fn time(v: TimeOfDay) -> Self {
        Self::Time(v)
    }

    /// Parses a `TIME` literal.
    pub fn time_from_str(text: &str) -> Result<Self> {
        Ok(Self::Time(TimeOfDay::parse(text)?))
    }

    /// Creates a `timestamptz` value from microseconds since the epoch.
    pub fn timestamptz_micros(v: i64) -> Self {
        Self::TimestampTz(v)
    }

    /// Type of the value.
    pub fn data_type(&self) -> PrimitiveType {
        match self {
            Datum::Boolean(_) => PrimitiveType::Boolean,
            Datum::Int(_) => PrimitiveType::Int,
            Datum::Long(_) => PrimitiveType::Long,
            Datum::Double(_) => PrimitiveType::Double,
            Datum::String(_) => PrimitiveType::String,
            Datum::Time(_) => PrimitiveType::Time,
            Datum::TimestampTz(_) => PrimitiveType::Timestamptz,
        }
    }

    /// Converts the value to `target` using implicit coercions: integer widening,
    /// and `CAST(varchar AS time)` / `CAST(time AS varchar)`.
    pub fn coerce_to(self, target: PrimitiveType) -> Result<Datum> {
        if self.data_type() == target {
            return Ok(self);
        }
        match (self, target) {
            (Datum::Int(v), PrimitiveType::Long) => Ok(Datum::Long(v as i64)),
            (Datum::Int(v), PrimitiveType::Double) => Ok(Datum::Double(v as f64)),
            (Datum::Long(v), PrimitiveType::Int) => i32::try_from(v).map(Datum::Int).map_err(|e| {
                Error::new(ErrorKind::DataInvalid, format!("Value {v} out of range for int"))
                    .with_source(e)
            }),
            (Datum::String(s), PrimitiveType::Time) => Datum::time_from_str(&s),
            (Datum::Time(t), PrimitiveType::String) => Ok(Datum::String(t.to_string())),
            (other, target) => Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Cannot coerce {} value {other} to {target}",
                    other.data_type()
                ),
            )),
        }
    }

    /// Integral value of `int`, `long` and `timestamptz` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v as i64),
            Datum::Long(v) | Datum::TimestampTz(v) => Some(*v),
            _ => None,
        }
    }

    /// Contents of a `string` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Boolean(v) => write!(f, "{v}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Long(v) => write!(f, "{v}"),
            Datum::Double(v) => write!(f, "{v}"),
            Datum::String(v) => write!(f, "{v}"),
            Datum::Time(v) => write!(f, "{v}"),
            Datum::TimestampTz(v) => match DateTime::<Utc>::from_timestamp_micros(*v) {
                Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
                None => write!(f, "{v}"),
            },
        }
    }
}

impl From<TimeOfDay> for Datum {
    fn from(v: TimeOfDay) -> Self {
        Datum::Time(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Long(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_varchar_to_time() {
        let datum = Datum::string("03:04").coerce_to(PrimitiveType::Time).unwrap();
        assert_eq!(datum, Datum::Time(TimeOfDay::parse("03:04:00.000").unwrap()));

        let text = datum.coerce_to(PrimitiveType::String).unwrap();
        assert_eq!(text, Datum::string("03:04:00"));
    }

    #[test]
    fn test_coerce_rejects_incompatible() {
        let err = Datum::bool(true)
            .coerce_to(PrimitiveType::Time)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);

        let err = Datum::string("25:00")
            .coerce_to(PrimitiveType::Time)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedLiteral);

        let err = Datum::long(i64::MAX)
            .coerce_to(PrimitiveType::Int)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[test]
    fn test_int_widening() {
        assert_eq!(
            Datum::int(2).coerce_to(PrimitiveType::Long).unwrap(),
            Datum::long(2)
        );
    }
}
