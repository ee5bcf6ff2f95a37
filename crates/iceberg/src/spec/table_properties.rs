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

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use super::DataFileFormat;
use crate::{Error, ErrorKind, Result};

/// Reads `key` from `properties`, falling back to `default` when unset.
fn parse_property<T>(properties: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = properties.get(key) else {
        return Ok(default);
    };
    value.trim().parse::<T>().map_err(|e| {
        Error::new(
            ErrorKind::DataInvalid,
            format!("Invalid value for table property {key}: {e}"),
        )
        .with_context("value", value)
    })
}

fn parse_millis(properties: &HashMap<String, String>, key: &str, default: u64) -> Result<Duration> {
    parse_property(properties, key, default).map(Duration::from_millis)
}

/// The table properties read when writing, committing and expiring.
#[derive(Debug, Clone, PartialEq)]
pub struct TableProperties {
    /// Attempts after the first failed commit.
    pub commit_num_retries: usize,
    /// First delay between commit attempts.
    pub commit_min_retry_wait: Duration,
    /// Upper bound of a single delay between commit attempts.
    pub commit_max_retry_wait: Duration,
    /// Total time spent retrying one commit.
    pub commit_total_retry_timeout: Duration,
    /// Format of new data files.
    pub write_format_default: DataFileFormat,
    /// Previous metadata files kept in the metadata log.
    pub metadata_previous_versions_max: usize,
    /// Snapshots kept per branch by expiry regardless of age.
    pub history_expire_min_snapshots_to_keep: u32,
}

impl TableProperties {
    /// `commit.retry.num-retries`
    pub const PROPERTY_COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";
    /// Default of [`Self::PROPERTY_COMMIT_NUM_RETRIES`].
    pub const PROPERTY_COMMIT_NUM_RETRIES_DEFAULT: usize = 4;
    /// `commit.retry.min-wait-ms`
    pub const PROPERTY_COMMIT_MIN_RETRY_WAIT_MS: &str = "commit.retry.min-wait-ms";
    /// Default of [`Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS`].
    pub const PROPERTY_COMMIT_MIN_RETRY_WAIT_MS_DEFAULT: u64 = 100;
    /// `commit.retry.max-wait-ms`
    pub const PROPERTY_COMMIT_MAX_RETRY_WAIT_MS: &str = "commit.retry.max-wait-ms";
    /// Default of [`Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS`], one minute.
    pub const PROPERTY_COMMIT_MAX_RETRY_WAIT_MS_DEFAULT: u64 = 60_000;
    /// `commit.retry.total-timeout-ms`
    pub const PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS: &str = "commit.retry.total-timeout-ms";
    /// Default of [`Self::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS`], thirty minutes.
    pub const PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT: u64 = 1_800_000;

    /// `write.format.default`
    pub const PROPERTY_DEFAULT_FILE_FORMAT: &str = "write.format.default";
    /// Default of [`Self::PROPERTY_DEFAULT_FILE_FORMAT`].
    pub const PROPERTY_DEFAULT_FILE_FORMAT_DEFAULT: DataFileFormat = DataFileFormat::Parquet;
    /// `write.metadata.previous-versions-max`
    pub const PROPERTY_METADATA_PREVIOUS_VERSIONS_MAX: &str =
        "write.metadata.previous-versions-max";
    /// Default of [`Self::PROPERTY_METADATA_PREVIOUS_VERSIONS_MAX`].
    pub const PROPERTY_METADATA_PREVIOUS_VERSIONS_MAX_DEFAULT: usize = 100;

    /// `history.expire.min-snapshots-to-keep`
    pub const PROPERTY_HISTORY_EXPIRE_MIN_SNAPSHOTS_TO_KEEP: &str =
        "history.expire.min-snapshots-to-keep";
    /// Default of [`Self::PROPERTY_HISTORY_EXPIRE_MIN_SNAPSHOTS_TO_KEEP`].
    pub const PROPERTY_HISTORY_EXPIRE_MIN_SNAPSHOTS_TO_KEEP_DEFAULT: u32 = 1;
}

impl Default for TableProperties {
    fn default() -> Self {
        Self {
            commit_num_retries: Self::PROPERTY_COMMIT_NUM_RETRIES_DEFAULT,
            commit_min_retry_wait: Duration::from_millis(
                Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS_DEFAULT,
            ),
            commit_max_retry_wait: Duration::from_millis(
                Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS_DEFAULT,
            ),
            commit_total_retry_timeout: Duration::from_millis(
                Self::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT,
            ),
            write_format_default: Self::PROPERTY_DEFAULT_FILE_FORMAT_DEFAULT,
            metadata_previous_versions_max: Self::PROPERTY_METADATA_PREVIOUS_VERSIONS_MAX_DEFAULT,
            history_expire_min_snapshots_to_keep:
                Self::PROPERTY_HISTORY_EXPIRE_MIN_SNAPSHOTS_TO_KEEP_DEFAULT,
        }
    }
}

impl TryFrom<&HashMap<String, String>> for TableProperties {
    type Error = Error;

    fn try_from(props: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let properties = Self {
            commit_num_retries: parse_property(
                props,
                Self::PROPERTY_COMMIT_NUM_RETRIES,
                defaults.commit_num_retries,
            )?,
            commit_min_retry_wait: parse_millis(
                props,
                Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS,
                Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS_DEFAULT,
            )?,
            commit_max_retry_wait: parse_millis(
                props,
                Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS,
                Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS_DEFAULT,
            )?,
            commit_total_retry_timeout: parse_millis(
                props,
                Self::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS,
                Self::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT,
            )?,
            write_format_default: parse_property(
                props,
                Self::PROPERTY_DEFAULT_FILE_FORMAT,
                defaults.write_format_default,
            )?,
            metadata_previous_versions_max: parse_property(
                props,
                Self::PROPERTY_METADATA_PREVIOUS_VERSIONS_MAX,
                defaults.metadata_previous_versions_max,
            )?,
            history_expire_min_snapshots_to_keep: parse_property(
                props,
                Self::PROPERTY_HISTORY_EXPIRE_MIN_SNAPSHOTS_TO_KEEP,
                defaults.history_expire_min_snapshots_to_keep,
            )?,
        };
        if properties.commit_min_retry_wait > properties.commit_max_retry_wait {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "{} must not exceed {}",
                    Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS,
                    Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS
                ),
            ));
        }
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn props(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            TableProperties::try_from(&HashMap::new()).unwrap(),
            TableProperties::default()
        );
        let defaults = TableProperties::default();
        assert_eq!(defaults.commit_min_retry_wait, Duration::from_millis(100));
        assert_eq!(defaults.write_format_default, DataFileFormat::Parquet);
        assert_eq!(defaults.history_expire_min_snapshots_to_keep, 1);
    }

    #[test]
    fn test_overrides() {
        let parsed = TableProperties::try_from(&props(&[
            ("commit.retry.num-retries", "10"),
            ("commit.retry.min-wait-ms", "1"),
            ("commit.retry.max-wait-ms", " 20 "),
            ("write.format.default", "AVRO"),
        ]))
        .unwrap();
        assert_eq!(parsed.commit_num_retries, 10);
        assert_eq!(parsed.commit_min_retry_wait, Duration::from_millis(1));
        assert_eq!(parsed.commit_max_retry_wait, Duration::from_millis(20));
        assert_eq!(parsed.write_format_default, DataFileFormat::Avro);
    }

    #[test]
    fn test_invalid_values() {
        let err = TableProperties::try_from(&props(&[("commit.retry.num-retries", "abc")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
        assert!(err.message().contains("commit.retry.num-retries"));

        let err =
            TableProperties::try_from(&props(&[("write.format.default", "csv")])).unwrap_err();
        assert!(err.message().contains("write.format.default"));

        let err = TableProperties::try_from(&props(&[("commit.retry.min-wait-ms", "120000")]))
            .unwrap_err();
        assert!(err.message().contains("must not exceed"));
    }
}
