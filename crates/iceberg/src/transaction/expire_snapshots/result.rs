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

//! Result types for snapshot expiration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Progress event emitted during expire snapshots operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpireProgressEvent {
    /// Walking the manifests of a retained snapshot.
    AnalyzingSnapshot {
        /// Index of the snapshot being analyzed (0-based).
        index: usize,
        /// ID of the snapshot being analyzed.
        snapshot_id: i64,
    },
    /// Files have been identified for deletion.
    FilesIdentified {
        /// Number of metadata files to delete.
        metadata_files: usize,
        /// Number of manifest list files to delete.
        manifest_list_files: usize,
        /// Number of manifest files to delete.
        manifest_files: usize,
        /// Number of data files to delete.
        data_files: usize,
    },
    /// The trimmed metadata was committed.
    Committed {
        /// Location of the new metadata file.
        metadata_location: String,
    },
    /// Deleting files.
    DeletingFiles {
        /// Total number of files to delete.
        total: usize,
    },
}

/// Callback for progress events during expire snapshots.
pub type ExpireProgressCallback = Arc<dyn Fn(ExpireProgressEvent) + Send + Sync>;

/// Phase of an expiry run on one table.
///
/// The durable state of the table only changes while `Committing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExpireState {
    /// Nothing in flight.
    Idle,
    /// Computing retention, reachability and candidates.
    Scanning,
    /// Swapping in the trimmed metadata.
    Committing,
    /// Deleting unreachable files.
    Deleting,
    /// The run stopped with an error.
    Failed,
}

/// Callback for state transitions of an expiry run.
pub type ExpireStateCallback = Arc<dyn Fn(ExpireState) + Send + Sync>;

/// Result of an expire_snapshots operation.
///
/// In dry-run mode, it shows what would be deleted without making changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpireSnapshotsResult {
    /// Number of snapshots expired (removed from metadata).
    pub deleted_snapshots_count: u64,

    /// Number of metadata files deleted.
    pub deleted_metadata_files_count: u64,

    /// Number of manifest list files deleted.
    pub deleted_manifest_list_files_count: u64,

    /// Number of manifest files deleted.
    pub deleted_manifest_files_count: u64,

    /// Number of data files deleted.
    pub deleted_data_files_count: u64,

    /// Number of batched delete requests sent to storage.
    pub delete_requests_count: u64,

    /// Total bytes freed by file deletion.
    pub total_bytes_freed: u64,

    /// Execution duration in milliseconds.
    pub duration_ms: u64,

    /// Whether this run only planned.
    pub dry_run: bool,
}

impl ExpireSnapshotsResult {
    /// Create an empty result (nothing expired or deleted).
    pub fn empty(duration: Duration) -> Self {
        Self {
            duration_ms: duration.as_millis() as u64,
            ..Default::default()
        }
    }

    /// Total number of files deleted.
    pub fn total_files_deleted(&self) -> u64 {
        self.deleted_metadata_files_count
            + self.deleted_manifest_list_files_count
            + self.deleted_manifest_files_count
            + self.deleted_data_files_count
    }

    /// Returns true if the operation made any changes.
    pub fn has_changes(&self) -> bool {
        self.deleted_snapshots_count > 0 || self.total_files_deleted() > 0
    }
}
