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

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::ObjectStorage;
use crate::{Error, ErrorKind, Result};

const SUPPORTED_SCHEMES: [&str; 3] = ["s3", "s3a", "s3n"];

/// Default bounds for retrying transient storage failures.
const DEFAULT_RETRY_MIN_DELAY: Duration = Duration::from_millis(50);
const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_RETRY_TOTAL_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_MAX_TIMES: usize = 5;

/// A location split into bucket and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    /// Scheme as written, such as `s3`.
    pub scheme: String,
    /// Bucket name.
    pub bucket: String,
    /// Key inside the bucket, without leading slash.
    pub key: String,
}

impl StorageLocation {
    /// Parses `scheme://bucket/key`.
    ///
    /// The key is kept verbatim, so legacy keys with doubled slashes stay
    /// addressable.
    pub fn parse(location: &str) -> Result<Self> {
        if location.contains('#') {
            return Err(invalid_location(location, "Location must not contain '#'"));
        }
        let (scheme, rest) = location
            .split_once("://")
            .ok_or_else(|| invalid_location(location, "Location has no scheme"))?;
        if !SUPPORTED_SCHEMES.contains(&scheme) {
            return Err(Error::new(
                ErrorKind::FeatureUnsupported,
                format!("Unsupported storage scheme: {scheme}"),
            )
            .with_context("location", location));
        }
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid_location(location, "Location has no bucket"));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.strip_prefix('/').unwrap_or(key).to_string(),
        })
    }

    /// Rebuilds a URI for `key` in the same bucket.
    pub fn uri_for(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, key)
    }
}

fn invalid_location(location: &str, message: &str) -> Error {
    Error::new(ErrorKind::InvalidLocation, message).with_context("location", location)
}

/// A listed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full URI of the file.
    pub location: String,
    /// Size in bytes.
    pub size: u64,
    /// Time of the last write.
    pub last_modified: DateTime<Utc>,
}

/// Summary of a batched delete over many locations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// One id per underlying request.
    pub request_ids: Vec<String>,
    /// Number of files reported deleted.
    pub deleted: usize,
}

/// FileIO implementation, used to manipulate files in underlying storage.
///
/// Transient failures are retried with exponential backoff.
#[derive(Clone, Debug)]
pub struct FileIO {
    storage: Arc<dyn ObjectStorage>,
    backoff: ExponentialBuilder,
}

impl FileIO {
    /// Wraps a storage backend with the default retry policy.
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            storage,
            backoff: ExponentialBuilder::new()
                .with_min_delay(DEFAULT_RETRY_MIN_DELAY)
                .with_max_delay(DEFAULT_RETRY_MAX_DELAY)
                .with_total_delay(Some(DEFAULT_RETRY_TOTAL_DELAY))
                .with_max_times(DEFAULT_RETRY_MAX_TIMES)
                .with_factor(2.0),
        }
    }

    /// Replaces the retry policy for transient failures.
    #[must_use]
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    async fn retry<T, F, Fut>(&self, op: &'static str, location: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        f.retry(self.backoff)
            .sleep(tokio::time::sleep)
            .when(|e: &Error| e.retryable())
            .notify(|e: &Error, delay: Duration| {
                warn!(op, location, ?delay, error = %e, "Retrying storage request");
            })
            .await
            .map_err(|e| e.with_context("location", location))
    }

    /// Reads the whole file.
    pub async fn read(&self, location: &str) -> Result<Bytes> {
        let loc = StorageLocation::parse(location)?;
        debug!(location, "Reading file");
        self.retry("read", location, || self.storage.get(&loc.bucket, &loc.key))
            .await
    }

    /// Writes the whole file, replacing existing content.
    pub async fn write(&self, location: &str, bytes: Bytes) -> Result<()> {
        let loc = StorageLocation::parse(location)?;
        debug!(location, size = bytes.len(), "Writing file");
        self.retry("write", location, || {
            self.storage.put(&loc.bucket, &loc.key, bytes.clone())
        })
        .await
    }

    /// Check file exists.
    pub async fn exists(&self, location: &str) -> Result<bool> {
        let loc = StorageLocation::parse(location)?;
        self.retry("exists", location, || self.storage.head(&loc.bucket, &loc.key))
            .await
            .map(|meta| meta.is_some())
    }

    /// Deletes one file. Missing files are not an error.
    pub async fn delete(&self, location: &str) -> Result<()> {
        let loc = StorageLocation::parse(location)?;
        debug!(location, "Deleting file");
        self.retry("delete", location, || self.storage.delete(&loc.bucket, &loc.key))
            .await
    }

    /// Lists the files under a prefix URI.
    pub async fn list(&self, prefix: &str) -> Result<Vec<FileEntry>> {
        let loc = StorageLocation::parse(prefix)?;
        let objects = self
            .retry("list", prefix, || self.storage.list(&loc.bucket, &loc.key))
            .await?;
        Ok(objects
            .into_iter()
            .map(|meta| FileEntry {
                location: loc.uri_for(&meta.key),
                size: meta.size,
                last_modified: meta.last_modified,
            })
            .collect())
    }

    /// Deletes many files, one request per bucket and per storage cap.
    pub async fn delete_batch(
        &self,
        locations: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<DeleteSummary> {
        let mut by_bucket: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for location in locations {
            let loc = StorageLocation::parse(location.as_ref())?;
            by_bucket.entry(loc.bucket).or_default().push(loc.key);
        }

        let cap = self.storage.max_keys_per_delete().max(1);
        let mut summary = DeleteSummary::default();
        for (bucket, mut keys) in by_bucket {
            keys.sort();
            keys.dedup();
            for chunk in keys.chunks(cap) {
                let outcome = self
                    .retry("delete_batch", &bucket, || {
                        self.storage.delete_batch(&bucket, chunk)
                    })
                    .await?;
                debug!(
                    %bucket,
                    request_id = %outcome.request_id,
                    count = outcome.deleted.len(),
                    "Deleted batch"
                );
                summary.deleted += outcome.deleted.len();
                summary.request_ids.push(outcome.request_id);
            }
        }
        Ok(summary)
    }
}
