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

//! In-memory storage with S3 semantics.
//!
//! Buckets must be created before use. Every mutating call counts as one
//! request and gets its own request id, which is attached to the bucket
//! notifications it produces, so a batched delete shows up as many events
//! sharing one id.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::notification::NotificationSink;
use super::{
    BatchDeleteOutcome, BucketNotification, DEFAULT_MAX_KEYS_PER_DELETE, NotificationFilter,
    NotificationQueue, OBJECT_CREATED_PUT, OBJECT_REMOVED_DELETE, ObjectMeta, ObjectStorage,
};
use crate::{Error, ErrorKind, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    sinks: Vec<NotificationSink>,
    next_request_id: u64,
    delete_requests: u64,
    pending_failures: usize,
}

impl MemoryState {
    fn bucket(&self, bucket: &str) -> Result<&BTreeMap<String, StoredObject>> {
        self.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))
    }

    fn bucket_mut(&mut self, bucket: &str) -> Result<&mut BTreeMap<String, StoredObject>> {
        self.buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))
    }

    /// Consumes one injected failure, if any are pending.
    fn check_injected_failure(&mut self, op: &'static str) -> Result<()> {
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(Error::new(ErrorKind::TransientIo, "Injected transient failure")
                .with_context("operation", op)
                .with_retryable(true));
        }
        Ok(())
    }

    fn request_id(&mut self) -> String {
        self.next_request_id += 1;
        format!("{:016X}", self.next_request_id)
    }

    fn publish(&mut self, events: &[BucketNotification]) {
        self.sinks
            .retain(|sink| events.iter().all(|event| sink.publish(event)));
    }
}

fn no_such_bucket(bucket: &str) -> Error {
    Error::new(ErrorKind::NotFound, "The specified bucket does not exist")
        .with_context("bucket", bucket)
}

/// Object storage held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
    max_keys_per_delete: Option<usize>,
}

impl MemoryStorage {
    /// Creates an empty storage without buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-request cap of batched deletes.
    #[must_use]
    pub fn with_max_keys_per_delete(mut self, max_keys: usize) -> Self {
        self.max_keys_per_delete = Some(max_keys.max(1));
        self
    }

    /// Creates a bucket. Creating an existing bucket is a no-op.
    pub async fn create_bucket(&self, bucket: &str) {
        self.state
            .lock()
            .await
            .buckets
            .entry(bucket.to_string())
            .or_default();
    }

    /// Makes the next `count` requests fail with a retryable error.
    pub async fn fail_next_requests(&self, count: usize) {
        self.state.lock().await.pending_failures = count;
    }

    /// Number of batched delete requests served so far.
    pub async fn delete_request_count(&self) -> u64 {
        self.state.lock().await.delete_requests
    }

    /// Overwrites the modification time of an object.
    pub async fn set_last_modified(
        &self,
        bucket: &str,
        key: &str,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let object = state.bucket_mut(bucket)?.get_mut(key).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, "Object does not exist").with_context("key", key)
        })?;
        object.last_modified = last_modified;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut state = self.state.lock().await;
        state.check_injected_failure("list")?;
        Ok(state
            .bucket(bucket)?
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectMeta {
                key: key.clone(),
                size: object.bytes.len() as u64,
                last_modified: object.last_modified,
            })
            .collect())
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_injected_failure("put")?;
        state.bucket_mut(bucket)?.insert(key.to_string(), StoredObject {
            bytes,
            last_modified: Utc::now(),
        });
        let request_id = state.request_id();
        state.publish(&[BucketNotification::new(
            OBJECT_CREATED_PUT,
            bucket,
            key,
            &request_id,
        )]);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let mut state = self.state.lock().await;
        state.check_injected_failure("get")?;
        state
            .bucket(bucket)?
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound, "Object does not exist")
                    .with_context("bucket", bucket)
                    .with_context("key", key)
            })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let mut state = self.state.lock().await;
        state.check_injected_failure("head")?;
        Ok(state.bucket(bucket)?.get(key).map(|object| ObjectMeta {
            key: key.to_string(),
            size: object.bytes.len() as u64,
            last_modified: object.last_modified,
        }))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_injected_failure("delete")?;
        let existed = state.bucket_mut(bucket)?.remove(key).is_some();
        let request_id = state.request_id();
        if existed {
            state.publish(&[BucketNotification::new(
                OBJECT_REMOVED_DELETE,
                bucket,
                key,
                &request_id,
            )]);
        }
        Ok(())
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteOutcome> {
        if keys.len() > self.max_keys_per_delete() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Batch of {} keys exceeds the limit of {} keys per request",
                    keys.len(),
                    self.max_keys_per_delete()
                ),
            ));
        }

        let mut state = self.state.lock().await;
        state.check_injected_failure("delete_batch")?;
        let objects = state.bucket_mut(bucket)?;
        // S3 reports missing keys as deleted but only notifies for real removals.
        let removed: Vec<&String> = keys
            .iter()
            .filter(|key| objects.remove(key.as_str()).is_some())
            .collect();
        let request_id = state.request_id();
        state.delete_requests += 1;
        let events: Vec<_> = removed
            .into_iter()
            .map(|key| BucketNotification::new(OBJECT_REMOVED_DELETE, bucket, key, &request_id))
            .collect();
        state.publish(&events);

        Ok(BatchDeleteOutcome {
            request_id,
            deleted: keys.to_vec(),
        })
    }

    fn max_keys_per_delete(&self) -> usize {
        self.max_keys_per_delete
            .unwrap_or(DEFAULT_MAX_KEYS_PER_DELETE)
    }

    async fn capture_notifications(
        &self,
        bucket: &str,
        filter: NotificationFilter,
    ) -> Result<NotificationQueue> {
        let mut state = self.state.lock().await;
        state.bucket(bucket)?;
        let (sink, queue) = NotificationSink::channel(bucket, filter);
        state.sinks.push(sink);
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::io::unique_request_ids;

    async fn storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.create_bucket("b").await;
        storage
    }

    #[tokio::test]
    async fn test_put_get_list() {
        let storage = storage().await;
        storage.put("b", "t/data/1", Bytes::from_static(b"one")).await.unwrap();
        storage.put("b", "t/data/2", Bytes::from_static(b"two")).await.unwrap();
        storage.put("b", "t/metadata/m", Bytes::from_static(b"m")).await.unwrap();

        assert_eq!(
            storage.get("b", "t/data/2").await.unwrap(),
            Bytes::from_static(b"two")
        );
        let keys: Vec<_> = storage
            .list("b", "t/data/")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["t/data/1", "t/data/2"]);
        assert!(storage.head("b", "t/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_bucket_and_key() {
        let storage = storage().await;
        assert_eq!(
            storage.get("b", "nope").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            storage.list("other", "").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_batch_delete_is_one_request() {
        let storage = storage().await;
        for i in 0..5 {
            storage
                .put("b", &format!("t/data/{i}"), Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        let mut queue = storage
            .capture_notifications("b", NotificationFilter::removals())
            .await
            .unwrap();

        let keys: Vec<String> = (0..5)
            .map(|i| format!("t/data/{i}"))
            .chain(["t/data/missing".to_string()])
            .collect();
        let outcome = storage.delete_batch("b", &keys).await.unwrap();

        assert_eq!(outcome.deleted.len(), 6);
        let events = queue.drain();
        assert_eq!(events.len(), 5);
        assert_eq!(unique_request_ids(&events), 1);
        assert_eq!(events[0].request_id(), Some(outcome.request_id.as_str()));
        assert_eq!(storage.delete_request_count().await, 1);
        assert!(storage.list("b", "t/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete_respects_cap() {
        let storage = MemoryStorage::new().with_max_keys_per_delete(2);
        storage.create_bucket("b").await;
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = storage.delete_batch("b", &keys).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[tokio::test]
    async fn test_injected_failures_are_retryable() {
        let storage = storage().await;
        storage.fail_next_requests(1).await;
        let err = storage
            .put("b", "k", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientIo);
        assert!(err.retryable());
        storage.put("b", "k", Bytes::from_static(b"x")).await.unwrap();
    }
}
