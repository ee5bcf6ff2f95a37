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

//! S3-compatible storage backed by `object_store`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload, WriteMultipart};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{BatchDeleteOutcome, NotificationFilter, NotificationQueue, ObjectMeta, ObjectStorage};
use crate::{Error, ErrorKind, Result};

/// Smallest part size S3 accepts for multipart uploads.
pub const MIN_STREAMING_PART_SIZE: usize = 5 * 1024 * 1024;
/// Default part size for multipart uploads.
pub const DEFAULT_STREAMING_PART_SIZE: usize = 16 * 1024 * 1024;
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Prefix of the request ids [`S3Storage`] reports for batched deletes.
pub const CLIENT_REQUEST_ID_PREFIX: &str = "client-";

/// `object_store` does not expose the `x-amz-request-id` of a `DeleteObjects`
/// call, so each batch is tagged with a fresh client-side id instead.
fn client_request_id() -> String {
    format!("{CLIENT_REQUEST_ID_PREFIX}{}", Uuid::new_v4())
}

/// Connection settings shared by every bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Custom endpoint, such as a MinIO address.
    pub endpoint: Option<String>,
    /// Signing region.
    pub region: String,
    /// Static access key.
    pub access_key: Option<String>,
    /// Static secret key.
    pub secret_key: Option<String>,
    /// Use `endpoint/bucket/key` addressing instead of virtual hosts.
    pub path_style_access: bool,
    /// Objects larger than this are written with multipart uploads.
    pub streaming_part_size: usize,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: DEFAULT_REGION.to_string(),
            access_key: None,
            secret_key: None,
            path_style_access: false,
            streaming_part_size: DEFAULT_STREAMING_PART_SIZE,
        }
    }
}

/// Storage talking to S3 or a compatible service.
///
/// Keys containing empty path segments cannot be addressed through
/// `object_store` and are written with the empty segments dropped.
#[derive(Debug)]
pub struct S3Storage {
    config: S3Config,
    clients: Mutex<HashMap<String, Arc<AmazonS3>>>,
}

impl S3Storage {
    /// Creates a storage; clients are built lazily per bucket.
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, bucket: &str) -> Result<Arc<AmazonS3>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(bucket) {
            return Ok(Arc::clone(client));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.config.region)
            .with_virtual_hosted_style_request(!self.config.path_style_access);
        if let Some(endpoint) = &self.config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(access_key) = &self.config.access_key {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &self.config.secret_key {
            builder = builder.with_secret_access_key(secret_key);
        }
        let client = Arc::new(builder.build().map_err(|e| {
            Error::new(ErrorKind::DataInvalid, "Invalid S3 configuration")
                .with_context("bucket", bucket)
                .with_source(e)
        })?);
        clients.insert(bucket.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let client = self.client(bucket).await?;
        let prefix = Path::from(prefix);
        client
            .list(Some(&prefix))
            .map_ok(|meta| ObjectMeta {
                key: meta.location.to_string(),
                size: meta.size,
                last_modified: meta.last_modified,
            })
            .map_err(Error::from)
            .try_collect()
            .await
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<()> {
        let client = self.client(bucket).await?;
        let path = Path::from(key);
        if bytes.len() > self.config.streaming_part_size {
            debug!(bucket, key, size = bytes.len(), "Writing object with multipart upload");
            let upload = client.put_multipart(&path).await?;
            let mut writer =
                WriteMultipart::new_with_chunk_size(upload, self.config.streaming_part_size);
            writer.put(bytes);
            writer.finish().await?;
        } else {
            client.put(&path, PutPayload::from(bytes)).await?;
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let client = self.client(bucket).await?;
        let result = client.get(&Path::from(key)).await?;
        Ok(result.bytes().await?)
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let client = self.client(bucket).await?;
        match client.head(&Path::from(key)).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: meta.size,
                last_modified: meta.last_modified,
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let client = self.client(bucket).await?;
        match client.delete(&Path::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
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
        let client = self.client(bucket).await?;
        let locations = futures::stream::iter(
            keys.iter()
                .map(|key| Ok(Path::from(key.as_str())))
                .collect::<Vec<_>>(),
        )
        .boxed();
        // One DeleteObjects call, since the batch fits under the S3 cap.
        let deleted: Vec<String> = client
            .delete_stream(locations)
            .map_ok(|path| path.to_string())
            .map_err(Error::from)
            .try_collect()
            .await?;
        Ok(BatchDeleteOutcome {
            request_id: client_request_id(),
            deleted,
        })
    }

    async fn capture_notifications(
        &self,
        bucket: &str,
        _filter: NotificationFilter,
    ) -> Result<NotificationQueue> {
        Err(Error::new(
            ErrorKind::FeatureUnsupported,
            "Bucket notification capture is not supported by the S3 backend",
        )
        .with_context("bucket", bucket))
    }
}
