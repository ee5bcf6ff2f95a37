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

//! Catalog and session configuration of the connector.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::io::{MIN_STREAMING_PART_SIZE, S3Config};
use crate::spec::DataFileFormat;
use crate::transaction::expire_snapshots::DEFAULT_MIN_RETENTION;
use crate::{DEFAULT_METASTORE_TIMEOUT, Error, ErrorKind, Result};

/// Data file format of new tables: `PARQUET`, `ORC` or `AVRO`.
pub const FILE_FORMAT: &str = "iceberg.file-format";
/// Catalog implementation. Only `HIVE_METASTORE` is supported.
pub const CATALOG_TYPE: &str = "iceberg.catalog.type";
/// `thrift://host:port` address of the Hive metastore.
pub const METASTORE_URI: &str = "hive.metastore.uri";
/// Timeout of each metastore call.
pub const METASTORE_TIMEOUT: &str = "hive.metastore-timeout";
/// S3 access key.
pub const S3_AWS_ACCESS_KEY: &str = "hive.s3.aws-access-key";
/// S3 secret key.
pub const S3_AWS_SECRET_KEY: &str = "hive.s3.aws-secret-key";
/// S3 endpoint, such as a MinIO address.
pub const S3_ENDPOINT: &str = "hive.s3.endpoint";
/// S3 signing region.
pub const S3_REGION: &str = "hive.s3.region";
/// Use path style addressing.
pub const S3_PATH_STYLE_ACCESS: &str = "hive.s3.path-style-access";
/// Part size of multipart uploads.
pub const S3_STREAMING_PART_SIZE: &str = "hive.s3.streaming.part-size";
/// Enables the `register_table` procedure.
pub const REGISTER_TABLE_PROCEDURE_ENABLED: &str = "iceberg.register-table-procedure.enabled";
/// Default of the `expire_snapshots_min_retention` session property.
pub const EXPIRE_SNAPSHOTS_MIN_RETENTION: &str = "iceberg.expire_snapshots.min-retention";

/// Session property overriding [`EXPIRE_SNAPSHOTS_MIN_RETENTION`].
pub const SESSION_EXPIRE_SNAPSHOTS_MIN_RETENTION: &str = "expire_snapshots_min_retention";

/// Catalog implementations the connector can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum CatalogType {
    /// Tables are registered in a Hive metastore.
    #[default]
    HiveMetastore,
}

/// A data size such as `5MB`. Units are powers of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataSize(u64);

impl DataSize {
    /// Size in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl FromStr for DataSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let invalid = || {
            Error::new(ErrorKind::DataInvalid, format!("Invalid data size: '{s}'"))
        };
        let number: f64 = number.parse().map_err(|_| invalid())?;
        let multiplier: u64 = match unit.trim() {
            "B" => 1,
            "kB" | "KB" => 1 << 10,
            "MB" => 1 << 20,
            "GB" => 1 << 30,
            "TB" => 1 << 40,
            _ => return Err(invalid()),
        };
        let bytes = number * multiplier as f64;
        if !bytes.is_finite() || bytes < 0.0 || bytes.fract() != 0.0 {
            return Err(invalid());
        }
        Ok(DataSize(bytes as u64))
    }
}

impl Display for DataSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where T::Err: Display {
    value.parse::<T>().map_err(|e| {
        Error::new(
            ErrorKind::DataInvalid,
            format!("Invalid value '{value}' for {key}: {e}"),
        )
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    parse(key, &value.to_ascii_lowercase())
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| {
        Error::new(
            ErrorKind::DataInvalid,
            format!("Invalid duration '{value}' for {key}"),
        )
        .with_source(e)
    })
}

fn parse_metastore_uri(value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| {
        Error::new(
            ErrorKind::DataInvalid,
            format!("Invalid metastore URI: {value}"),
        )
        .with_source(e)
    })?;
    if url.scheme() != "thrift" || url.host_str().is_none() || url.port().is_none() {
        return Err(Error::new(
            ErrorKind::DataInvalid,
            format!("Metastore URI must be thrift://host:port, got {value}"),
        ));
    }
    Ok(url)
}

/// Catalog configuration of the connector.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorConfig {
    /// Format of data files written to new tables.
    pub file_format: DataFileFormat,
    /// Catalog implementation.
    pub catalog_type: CatalogType,
    /// Address of the Hive metastore. Unset when the metastore is passed in
    /// directly.
    pub metastore_uri: Option<Url>,
    /// Timeout of each metastore call.
    pub metastore_timeout: Duration,
    /// Object store connection settings.
    pub s3: S3Config,
    /// Whether `register_table` may be called.
    pub register_table_procedure_enabled: bool,
    /// Shortest retention threshold `expire_snapshots` accepts, unless the
    /// session overrides it.
    pub expire_snapshots_min_retention: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            file_format: DataFileFormat::Parquet,
            catalog_type: CatalogType::HiveMetastore,
            metastore_uri: None,
            metastore_timeout: DEFAULT_METASTORE_TIMEOUT,
            s3: S3Config::default(),
            register_table_procedure_enabled: false,
            expire_snapshots_min_retention: DEFAULT_MIN_RETENTION,
        }
    }
}

impl ConnectorConfig {
    /// Parses catalog properties. Unknown keys are rejected.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        for (key, value) in properties {
            let value = value.trim();
            match key.as_str() {
                FILE_FORMAT => config.file_format = parse(key, value)?,
                CATALOG_TYPE => {
                    config.catalog_type = value.parse().map_err(|_| {
                        Error::new(
                            ErrorKind::FeatureUnsupported,
                            format!("Catalog type {value} is not supported"),
                        )
                    })?
                }
                METASTORE_URI => config.metastore_uri = Some(parse_metastore_uri(value)?),
                METASTORE_TIMEOUT => config.metastore_timeout = parse_duration(key, value)?,
                S3_AWS_ACCESS_KEY => config.s3.access_key = Some(value.to_string()),
                S3_AWS_SECRET_KEY => config.s3.secret_key = Some(value.to_string()),
                S3_ENDPOINT => config.s3.endpoint = Some(value.to_string()),
                S3_REGION => config.s3.region = value.to_string(),
                S3_PATH_STYLE_ACCESS => config.s3.path_style_access = parse_bool(key, value)?,
                S3_STREAMING_PART_SIZE => {
                    let size: DataSize = parse(key, value)?;
                    if size.bytes() < MIN_STREAMING_PART_SIZE as u64 {
                        return Err(Error::new(
                            ErrorKind::DataInvalid,
                            format!("{key} must be at least 5MB, got {value}"),
                        ));
                    }
                    config.s3.streaming_part_size = usize::try_from(size.bytes()).map_err(|e| {
                        Error::new(ErrorKind::DataInvalid, format!("{key} is too large"))
                            .with_source(e)
                    })?;
                }
                REGISTER_TABLE_PROCEDURE_ENABLED => {
                    config.register_table_procedure_enabled = parse_bool(key, value)?
                }
                EXPIRE_SNAPSHOTS_MIN_RETENTION => {
                    config.expire_snapshots_min_retention = parse_duration(key, value)?
                }
                _ => {
                    return Err(Error::new(
                        ErrorKind::DataInvalid,
                        format!("Configuration property '{key}' was not used"),
                    ));
                }
            }
        }

        Ok(config)
    }
}

/// Per-session overrides of catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProperties {
    expire_snapshots_min_retention: Option<Duration>,
}

impl SessionProperties {
    /// Session without overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses session properties. Unknown keys are rejected.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let mut session = Self::default();
        for (key, value) in properties {
            match key.as_str() {
                SESSION_EXPIRE_SNAPSHOTS_MIN_RETENTION => {
                    session.expire_snapshots_min_retention =
                        Some(parse_duration(key, value.trim())?)
                }
                _ => {
                    return Err(Error::new(
                        ErrorKind::DataInvalid,
                        format!("Session property '{key}' does not exist"),
                    ));
                }
            }
        }
        Ok(session)
    }

    /// Overrides the minimum retention of `expire_snapshots`. Zero unlocks
    /// expiring every snapshot but the current one.
    pub fn with_expire_snapshots_min_retention(mut self, min_retention: Duration) -> Self {
        self.expire_snapshots_min_retention = Some(min_retention);
        self
    }

    /// Minimum retention of `expire_snapshots` in this session.
    pub fn expire_snapshots_min_retention(&self, config: &ConnectorConfig) -> Duration {
        self.expire_snapshots_min_retention
            .unwrap_or(config.expire_snapshots_min_retention)
    }
}
