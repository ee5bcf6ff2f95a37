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

//! Bucket-level object storage abstraction.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{NotificationFilter, NotificationQueue};
use crate::Result;

/// Largest number of keys S3 accepts in one `DeleteObjects` request.
pub const DEFAULT_MAX_KEYS_PER_DELETE: usize = 1000;

/// A listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Key inside the bucket.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Time of the last write.
    pub last_modified: DateTime<Utc>,
}

/// Outcome of one batched delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDeleteOutcome {
    /// Identifier of the single request that carried the batch.
    ///
    /// Backends that cannot observe the service's own request id generate one
    /// per request; see [`S3Storage`](super::S3Storage).
    pub request_id: String,
    /// Keys reported as deleted.
    pub deleted: Vec<String>,
}

/// Storage backend addressed by bucket and key.
///
/// Implementations must issue exactly one underlying request per
/// [`ObjectStorage::delete_batch`] call, and callers must not pass more than
/// [`ObjectStorage::max_keys_per_delete`] keys to it.
#[async_trait]
pub trait ObjectStorage: Debug + Send + Sync {
    /// Lists every object whose key starts with `prefix`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Writes an object, replacing any previous content.
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<()>;

    /// Reads a whole object. Missing keys fail with [`crate::ErrorKind::NotFound`].
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Returns the object's metadata, or `None` if it does not exist.
    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>>;

    /// Deletes one object. Deleting a missing key succeeds.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Deletes many objects with a single request.
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteOutcome>;

    /// Per-request cap on [`ObjectStorage::delete_batch`].
    fn max_keys_per_delete(&self) -> usize {
        DEFAULT_MAX_KEYS_PER_DELETE
    }

    /// Starts capturing bucket notifications matching `filter`.
    async fn capture_notifications(
        &self,
        bucket: &str,
        filter: NotificationFilter,
    ) -> Result<NotificationQueue>;
}
