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

//! Bucket notifications, modelled on S3 event records.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Event name of a single-object put.
pub const OBJECT_CREATED_PUT: &str = "s3:ObjectCreated:Put";
/// Event name of an object delete, batched or not.
pub const OBJECT_REMOVED_DELETE: &str = "s3:ObjectRemoved:Delete";
/// Response element correlating an event with the request that caused it.
pub const REQUEST_ID_KEY: &str = "x-amz-request-id";

/// One bucket event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketNotification {
    /// Event type, such as [`OBJECT_REMOVED_DELETE`].
    pub event_name: String,
    /// Bucket of the object.
    pub bucket: String,
    /// Key of the object.
    pub key: String,
    /// Response metadata of the originating request.
    pub response_elements: HashMap<String, String>,
}

impl BucketNotification {
    pub(crate) fn new(
        event_name: &str,
        bucket: &str,
        key: &str,
        request_id: &str,
    ) -> Self {
        Self {
            event_name: event_name.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            response_elements: HashMap::from([(
                REQUEST_ID_KEY.to_string(),
                request_id.to_string(),
            )]),
        }
    }

    /// Whether the event reports a removed object.
    pub fn is_removal(&self) -> bool {
        self.event_name.starts_with("s3:ObjectRemoved:")
    }

    /// Identifier of the request that produced the event.
    pub fn request_id(&self) -> Option<&str> {
        self.response_elements.get(REQUEST_ID_KEY).map(String::as_str)
    }
}

/// Selects which events a capture receives.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    key_prefix: Option<String>,
    event_prefix: Option<String>,
}

impl NotificationFilter {
    /// Matches every event in the bucket.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches removal events only.
    pub fn removals() -> Self {
        Self::default().with_event_prefix("s3:ObjectRemoved:")
    }

    /// Restricts the capture to keys under `prefix`.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Restricts the capture to event names starting with `prefix`.
    #[must_use]
    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = Some(prefix.into());
        self
    }

    /// Whether `event` passes the filter.
    pub fn matches(&self, event: &BucketNotification) -> bool {
        self.key_prefix
            .as_deref()
            .is_none_or(|prefix| event.key.starts_with(prefix))
            && self
                .event_prefix
                .as_deref()
                .is_none_or(|prefix| event.event_name.starts_with(prefix))
    }
}

/// Receiving end of a capture. Events queue up until drained.
#[derive(Debug)]
pub struct NotificationQueue {
    receiver: UnboundedReceiver<BucketNotification>,
}

impl NotificationQueue {
    /// Takes every event received so far, in arrival order.
    pub fn drain(&mut self) -> Vec<BucketNotification> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Number of distinct request ids among `events`.
pub fn unique_request_ids(events: &[BucketNotification]) -> usize {
    events
        .iter()
        .filter_map(BucketNotification::request_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Sending end of a capture, held by the storage that publishes events.
#[derive(Debug)]
pub(crate) struct NotificationSink {
    bucket: String,
    filter: NotificationFilter,
    sender: UnboundedSender<BucketNotification>,
}

impl NotificationSink {
    /// Creates a sink and its paired queue.
    pub(crate) fn channel(bucket: &str, filter: NotificationFilter) -> (Self, NotificationQueue) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                bucket: bucket.to_string(),
                filter,
                sender,
            },
            NotificationQueue { receiver },
        )
    }

    /// Delivers `event` if it matches. Returns false once the queue is dropped.
    pub(crate) fn publish(&self, event: &BucketNotification) -> bool {
        if self.sender.is_closed() {
            return false;
        }
        if event.bucket == self.bucket && self.filter.matches(event) {
            return self.sender.send(event.clone()).is_ok();
        }
        true
    }
}
