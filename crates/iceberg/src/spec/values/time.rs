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

//! SQL `TIME` values with millisecond precision.

use std::fmt::{Display, Formatter};
use std::ops::Sub;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::interval::DayTimeInterval;
use crate::{Error, ErrorKind, Result};

pub(crate) const MILLIS_PER_SECOND: i64 = 1_000;
pub(crate) const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub(crate) const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub(crate) const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Time of day as milliseconds since midnight, in `[0, 86_400_000)`.
///
/// SQL `NULL` is modelled as `Option<TimeOfDay>::None`; see [`indeterminate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    /// Midnight.
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Creates a time from milliseconds since midnight.
    pub fn from_millis(millis: i64) -> Result<Self> {
        if !(0..MILLIS_PER_DAY).contains(&millis) {
            return Err(Error::new(
                ErrorKind::MalformedLiteral,
                format!("Time value {millis}ms is outside of a day"),
            ));
        }
        Ok(Self(millis as u32))
    }

    /// Creates a time from its fields.
    pub fn from_hms_milli(hour: u32, minute: u32, second: u32, milli: u32) -> Result<Self> {
        if hour > 23 || minute > 59 || second > 59 || milli > 999 {
            return Err(Error::new(
                ErrorKind::MalformedLiteral,
                format!("Invalid time {hour:02}:{minute:02}:{second:02}.{milli:03}"),
            ));
        }
        Ok(Self(
            hour * MILLIS_PER_HOUR as u32
                + minute * MILLIS_PER_MINUTE as u32
                + second * MILLIS_PER_SECOND as u32
                + milli,
        ))
    }

    /// Creates a time from microseconds since midnight, truncating to milliseconds.
    pub fn from_micros(micros: i64) -> Result<Self> {
        Self::from_millis(micros.div_euclid(1_000))
    }

    /// Parses `HH`, `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff` (one to three fractional digits).
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || {
            Error::new(
                ErrorKind::MalformedLiteral,
                format!("Value cannot be cast to time: {text}"),
            )
        };

        let (clock, fraction) = match text.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (text, None),
        };

        let mut fields = clock.split(':');
        let hour = parse_field(fields.next(), 1..=2).ok_or_else(malformed)?;
        let minute = match fields.next() {
            Some(f) => parse_field(Some(f), 2..=2).ok_or_else(malformed)?,
            None => 0,
        };
        let second = match fields.next() {
            Some(f) => parse_field(Some(f), 2..=2).ok_or_else(malformed)?,
            None => 0,
        };
        if fields.next().is_some() {
            return Err(malformed());
        }

        let milli = match fraction {
            // A fraction is only meaningful once seconds are present.
            Some(_) if clock.matches(':').count() != 2 => return Err(malformed()),
            Some(f) if (1..=3).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()) => {
                let digits: u32 = f.parse().map_err(|_| malformed())?;
                digits * 10u32.pow(3 - f.len() as u32)
            }
            Some(_) => return Err(malformed()),
            None => 0,
        };

        Self::from_hms_milli(hour, minute, second, milli).map_err(|_| malformed())
    }

    /// Milliseconds since midnight.
    pub fn millis(&self) -> i64 {
        self.0 as i64
    }

    /// Microseconds since midnight, the storage representation of Iceberg `time`.
    pub fn micros(&self) -> i64 {
        self.millis() * 1_000
    }

    /// Hour of day.
    pub fn hour(&self) -> u32 {
        self.0 / MILLIS_PER_HOUR as u32
    }

    /// Minute of hour.
    pub fn minute(&self) -> u32 {
        (self.0 % MILLIS_PER_HOUR as u32) / MILLIS_PER_MINUTE as u32
    }

    /// Second of minute.
    pub fn second(&self) -> u32 {
        (self.0 % MILLIS_PER_MINUTE as u32) / MILLIS_PER_SECOND as u32
    }

    /// Millisecond of second.
    pub fn milli(&self) -> u32 {
        self.0 % MILLIS_PER_SECOND as u32
    }

    /// `a - b` as a signed day-time interval.
    pub fn subtract(&self, other: &TimeOfDay) -> DayTimeInterval {
        DayTimeInterval::from_millis(self.millis() - other.millis())
    }

    /// `self BETWEEN low AND high`. Endpoints are inclusive and never reordered.
    pub fn between(&self, low: &TimeOfDay, high: &TimeOfDay) -> bool {
        low <= self && self <= high
    }
}

fn parse_field(field: Option<&str>, width: std::ops::RangeInclusive<usize>) -> Option<u32> {
    let field = field?;
    if !width.contains(&field.len()) || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// SQL `IS INDETERMINATE` for a nullable `TIME`.
pub fn indeterminate(value: Option<&TimeOfDay>) -> bool {
    value.is_none()
}

/// Three-valued `BETWEEN`: `None` when any operand is null.
pub fn between_nullable(
    value: Option<&TimeOfDay>,
    low: Option<&TimeOfDay>,
    high: Option<&TimeOfDay>,
) -> Option<bool> {
    Some(value?.between(low?, high?))
}

impl Sub for TimeOfDay {
    type Output = DayTimeInterval;

    fn sub(self, rhs: Self) -> Self::Output {
        self.subtract(&rhs)
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )?;
        if self.milli() != 0 {
            write!(f, ".{:03}", self.milli())?;
        }
        Ok(())
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TimeOfDay::parse(&text).map_err(serde::de::Error::custom)
    }
}
