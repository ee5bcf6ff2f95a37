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

//! Retention policy evaluation for snapshot expiration.
//!
//! A snapshot is retained when any of the following holds:
//!
//! - it is the current snapshot or the target of a branch or tag
//! - it is among the `min-snapshots-to-keep` most recent ancestors of a branch
//! - it was committed after `now - retention_threshold`

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::spec::{TableMetadata, TableProperties};
use crate::{Error, ErrorKind};

/// Retention policy for snapshot expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Snapshots committed within this window of now are retained.
    pub retention_threshold: Duration,

    /// Minimum number of snapshots to keep per branch, counting the branch
    /// head.
    pub min_snapshots_to_keep: u32,
}

impl RetentionPolicy {
    /// Create a new retention policy with custom settings.
    pub fn new(retention_threshold: Duration, min_snapshots_to_keep: u32) -> Self {
        Self {
            retention_threshold,
            min_snapshots_to_keep: min_snapshots_to_keep.max(1),
        }
    }

    /// Builds the policy for `retention_threshold`, reading
    /// `history.expire.min-snapshots-to-keep` from the table properties.
    pub fn from_table_properties(
        retention_threshold: Duration,
        properties: &HashMap<String, String>,
    ) -> Result<Self> {
        let props = TableProperties::try_from(properties)?;
        Ok(Self::new(
            retention_threshold,
            props.history_expire_min_snapshots_to_keep,
        ))
    }

    /// Rejects a threshold shorter than the configured minimum.
    pub fn validate(&self, min_retention: Duration) -> Result<()> {
        if self.retention_threshold < min_retention {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Retention specified ({}) is shorter than the minimum retention configured in the system ({}). \
                     Minimum retention can be changed with iceberg.expire_snapshots.min-retention catalog property \
                     or expire_snapshots_min_retention session property",
                    humantime::format_duration(self.retention_threshold),
                    humantime::format_duration(min_retention),
                ),
            ));
        }
        Ok(())
    }

    /// Snapshots committed at or before the returned instant are candidates
    /// for expiry.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let threshold = chrono::Duration::from_std(self.retention_threshold).map_err(|e| {
            Error::new(ErrorKind::DataInvalid, "Retention threshold is out of range")
                .with_source(e)
        })?;
        now.checked_sub_signed(threshold).ok_or_else(|| {
            Error::new(ErrorKind::DataInvalid, "Retention threshold is out of range")
        })
    }
}

/// Result of computing retention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionResult {
    /// Snapshot IDs that should be retained (not expired).
    pub retained_snapshot_ids: HashSet<i64>,

    /// Snapshot IDs to expire, oldest first.
    pub expired_snapshot_ids: Vec<i64>,
}

/// Compute which snapshots survive an expiry with the given cutoff.
pub fn compute_retention(
    metadata: &TableMetadata,
    policy: &RetentionPolicy,
    cutoff: DateTime<Utc>,
) -> RetentionResult {
    let cutoff_ms = cutoff.timestamp_millis();
    let mut retained: HashSet<i64> = metadata.current_snapshot_id().into_iter().collect();

    for snapshot_ref in metadata.refs().values() {
        retained.insert(snapshot_ref.snapshot_id);
        if snapshot_ref.is_branch() {
            retained.extend(collect_ancestors(
                metadata,
                snapshot_ref.snapshot_id,
                policy.min_snapshots_to_keep,
            ));
        }
    }

    retained.extend(
        metadata
            .snapshots()
            .filter(|s| s.timestamp_ms() > cutoff_ms)
            .map(|s| s.snapshot_id()),
    );

    let mut expired: Vec<_> = metadata
        .snapshots()
        .filter(|s| !retained.contains(&s.snapshot_id()))
        .map(|s| (s.timestamp_ms(), s.snapshot_id()))
        .collect();
    expired.sort_unstable();

    RetentionResult {
        retained_snapshot_ids: retained,
        expired_snapshot_ids: expired.into_iter().map(|(_, id)| id).collect(),
    }
}

/// Collect N ancestors of a snapshot (including the snapshot itself).
fn collect_ancestors(metadata: &TableMetadata, snapshot_id: i64, count: u32) -> Vec<i64> {
    let mut ancestors = Vec::with_capacity(count as usize);
    let mut current_id = Some(snapshot_id);

    for _ in 0..count {
        match current_id {
            Some(id) => {
                ancestors.push(id);
                current_id = metadata
                    .snapshot_by_id(id)
                    .and_then(|s| s.parent_snapshot_id());
            }
            None => break,
        }
    }

    ancestors
}
