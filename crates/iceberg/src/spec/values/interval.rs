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

use std::fmt::{Display, Formatter};
use std::ops::Neg;

use serde::{Deserialize, Serialize};

use super::time::{MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE, MILLIS_PER_SECOND};
use crate::{Error, ErrorKind, Result};

/// Signed day-time interval.
///
/// Every non-zero field carries the sign of the whole duration, so the tuple
/// always describes a single signed length of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DayTimeInterval {
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    millis: i64,
}

impl DayTimeInterval {
    /// Builds an interval from fields. The fields are normalized through their
    /// total so a mixed-sign input still yields a uniformly signed tuple.
    ///
    /// Fails with `DataInvalid` when the total does not fit in `i64`
    /// milliseconds.
    pub fn new(days: i64, hours: i64, minutes: i64, seconds: i64, millis: i64) -> Result<Self> {
        [
            (days, MILLIS_PER_DAY),
            (hours, MILLIS_PER_HOUR),
            (minutes, MILLIS_PER_MINUTE),
            (seconds, MILLIS_PER_SECOND),
        ]
        .into_iter()
        .try_fold(millis, |total, (value, unit)| {
            value.checked_mul(unit)?.checked_add(total)
        })
        .map(Self::from_millis)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Interval {days} {hours}:{minutes}:{seconds}.{millis} overflows milliseconds"
                ),
            )
        })
    }

    /// Decomposes a signed millisecond count.
    pub fn from_millis(total: i64) -> Self {
        // Integer division truncates toward zero, so every field keeps the sign of `total`.
        Self {
            days: total / MILLIS_PER_DAY,
            hours: (total % MILLIS_PER_DAY) / MILLIS_PER_HOUR,
            minutes: (total % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
            seconds: (total % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND,
            millis: total % MILLIS_PER_SECOND,
        }
    }

    /// Total length in milliseconds.
    pub fn to_millis(&self) -> i64 {
        self.days * MILLIS_PER_DAY
            + self.hours * MILLIS_PER_HOUR
            + self.minutes * MILLIS_PER_MINUTE
            + self.seconds * MILLIS_PER_SECOND
            + self.millis
    }

    /// Day component.
    pub fn days(&self) -> i64 {
        self.days
    }

    /// Hour component.
    pub fn hours(&self) -> i64 {
        self.hours
    }

    /// Minute component.
    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    /// Second component.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Millisecond component.
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// True when the interval is shorter than zero.
    pub fn is_negative(&self) -> bool {
        self.to_millis() < 0
    }
}

impl Neg for DayTimeInterval {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from_millis(-self.to_millis())
    }
}

/// Renders as `D HH:MM:SS.fff`, with a leading `-` for negative intervals.
impl Display for DayTimeInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(
            f,
            "{sign}{} {:02}:{:02}:{:02}.{:03}",
            self.days.abs(),
            self.hours.abs(),
            self.minutes.abs(),
            self.seconds.abs(),
            self.millis.abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sign() {
        let interval = DayTimeInterval::from_millis(-40_271_111);
        assert_eq!(
            (
                interval.days(),
                interval.hours(),
                interval.minutes(),
                interval.seconds(),
                interval.millis()
            ),
            (0, -11, -11, -11, -111)
        );
        assert_eq!(interval.to_string(), "-0 11:11:11.111");
    }

    #[test]
    fn test_negation_is_fieldwise() {
        let interval = DayTimeInterval::new(0, 11, 11, 11, 111).unwrap();
        assert_eq!(-interval, DayTimeInterval::new(0, -11, -11, -11, -111).unwrap());
        assert_eq!(-(-interval), interval);
        assert_eq!(-DayTimeInterval::default(), DayTimeInterval::default());
    }

    #[test]
    fn test_new_normalizes_fields() {
        assert_eq!(
            DayTimeInterval::new(0, 0, 0, 90, 0).unwrap(),
            DayTimeInterval::new(0, 0, 1, 30, 0).unwrap()
        );
        assert_eq!(DayTimeInterval::new(0, 25, 0, 0, 0).unwrap().days(), 1);
    }

    #[test]
    fn test_new_rejects_overflow() {
        let err = DayTimeInterval::new(i64::MAX / MILLIS_PER_DAY + 1, 0, 0, 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);

        let err = DayTimeInterval::new(0, 0, 0, i64::MAX / MILLIS_PER_SECOND, 1_000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);

        let max_days = i64::MAX / MILLIS_PER_DAY;
        assert_eq!(DayTimeInterval::new(max_days, 0, 0, 0, 0).unwrap().days(), max_days);
    }
}
