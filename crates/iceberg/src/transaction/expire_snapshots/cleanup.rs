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

//! File cleanup for snapshot expiration.
//!
//! Candidates come from listing the table's `metadata/` and `data/`
//! directories. A listed file is deleted only when it is absent from the
//! reachable set of the retained snapshots and was last written at or before
//! the retention cutoff, so files of commits racing with the expiry survive.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, warn};

use super::result::{ExpireProgressCallback, ExpireProgressEvent};
use crate::Result;
use crate::io::FileIO;
use crate::location::{LocationMatcher, METADATA_FILE_SUFFIX, TableLocation};
use crate::spec::{ManifestFile, TableMetadata};

/// Manifest lists and manifests loaded concurrently while walking snapshots.
const LOAD_CONCURRENCY: usize = 8;

const MANIFEST_LIST_PREFIX: &str = "snap-";

/// Files identified for cleanup after snapshot expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Metadata documents, and anything else under `metadata/` that is
    /// neither a manifest list nor a manifest.
    pub metadata_files: Vec<String>,
    /// Manifest list file paths to delete.
    pub manifest_list_files: Vec<String>,
    /// Manifest file paths to delete.
    pub manifest_files: Vec<String>,
    /// Data file paths to delete.
    pub data_files: Vec<String>,
    /// Total bytes that will be freed.
    pub total_bytes: u64,
}

impl CleanupPlan {
    /// Returns true if there are no files to clean up.
    pub fn is_empty(&self) -> bool {
        self.total_files() == 0
    }

    /// Total number of files to delete.
    pub fn total_files(&self) -> usize {
        self.metadata_files.len()
            + self.manifest_list_files.len()
            + self.manifest_files.len()
            + self.data_files.len()
    }

    /// Every file in the plan.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.metadata_files
            .iter()
            .chain(&self.manifest_list_files)
            .chain(&self.manifest_files)
            .chain(&self.data_files)
            .map(String::as_str)
    }
}

/// Statistics about cleanup execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupExecutionResult {
    /// Number of metadata files deleted.
    pub deleted_metadata_files: u64,
    /// Number of manifest list files deleted.
    pub deleted_manifest_list_files: u64,
    /// Number of manifest files deleted.
    pub deleted_manifest_files: u64,
    /// Number of data files deleted.
    pub deleted_data_files: u64,
    /// Request id of every batched delete issued.
    pub request_ids: Vec<String>,
}

impl CleanupExecutionResult {
    /// Total number of files successfully deleted.
    pub fn total_deleted_files(&self) -> u64 {
        self.deleted_metadata_files
            + self.deleted_manifest_list_files
            + self.deleted_manifest_files
            + self.deleted_data_files
    }
}

/// Collects the normalized locations of every file reachable from the
/// retained snapshots: manifest lists, manifests and live data files.
pub(crate) async fn collect_reachable_files(
    file_io: &FileIO,
    metadata: &TableMetadata,
    retained_snapshot_ids: &HashSet<i64>,
    matcher: &LocationMatcher,
    progress_callback: Option<&ExpireProgressCallback>,
) -> Result<HashSet<String>> {
    let mut snapshots: Vec<_> = metadata
        .snapshots()
        .filter(|s| retained_snapshot_ids.contains(&s.snapshot_id()))
        .collect();
    snapshots.sort_by_key(|s| (s.timestamp_ms(), s.snapshot_id()));

    let mut reachable = HashSet::new();
    for (index, snapshot) in snapshots.iter().enumerate() {
        if let Some(callback) = progress_callback {
            callback(ExpireProgressEvent::AnalyzingSnapshot {
                index,
                snapshot_id: snapshot.snapshot_id(),
            });
        }
        reachable.insert(matcher.key(snapshot.manifest_list()));
    }

    let manifest_lists: Vec<_> = stream::iter(snapshots)
        .map(|snapshot| snapshot.load_manifest_list(file_io))
        .buffer_unordered(LOAD_CONCURRENCY)
        .try_collect()
        .await?;

    let mut manifests: Vec<ManifestFile> = Vec::new();
    for manifest_file in manifest_lists.into_iter().flat_map(|l| l.consume_entries()) {
        if reachable.insert(matcher.key(&manifest_file.manifest_path)) {
            manifests.push(manifest_file);
        }
    }

    let loaded: Vec<_> = stream::iter(&manifests)
        .map(|manifest_file| manifest_file.load_manifest(file_io))
        .buffer_unordered(LOAD_CONCURRENCY)
        .try_collect()
        .await?;
    for manifest in loaded {
        reachable.extend(
            manifest
                .entries()
                .iter()
                .filter(|entry| entry.is_alive())
                .map(|entry| matcher.key(entry.file_path())),
        );
    }

    debug!(
        snapshots = retained_snapshot_ids.len(),
        files = reachable.len(),
        "Collected reachable files"
    );
    Ok(reachable)
}

/// Lists the table directories and keeps every file that is neither in
/// `keep` nor newer than `cutoff`.
pub async fn compute_cleanup_plan(
    file_io: &FileIO,
    location: &TableLocation,
    keep: &HashSet<String>,
    cutoff: DateTime<Utc>,
    matcher: &LocationMatcher,
    progress_callback: Option<&ExpireProgressCallback>,
) -> Result<CleanupPlan> {
    let metadata_dir = location.metadata_dir();
    let data_dir = location.data_dir();
    let (metadata_listing, data_listing) =
        futures::try_join!(file_io.list(&metadata_dir), file_io.list(&data_dir))?;

    let mut metadata_files = BTreeSet::new();
    let mut manifest_list_files = BTreeSet::new();
    let mut manifest_files = BTreeSet::new();
    let mut data_files = BTreeSet::new();
    let mut total_bytes = 0u64;

    for entry in metadata_listing.into_iter().chain(data_listing) {
        if entry.last_modified > cutoff || keep.contains(&matcher.key(&entry.location)) {
            continue;
        }

        let inserted = if let Some(name) = entry.location.strip_prefix(&metadata_dir) {
            if name.starts_with(MANIFEST_LIST_PREFIX) {
                manifest_list_files.insert(entry.location)
            } else if name.ends_with(METADATA_FILE_SUFFIX) {
                metadata_files.insert(entry.location)
            } else if name.ends_with(".avro") {
                manifest_files.insert(entry.location)
            } else {
                metadata_files.insert(entry.location)
            }
        } else {
            data_files.insert(entry.location)
        };
        if inserted {
            total_bytes = total_bytes.saturating_add(entry.size);
        }
    }

    let plan = CleanupPlan {
        metadata_files: metadata_files.into_iter().collect(),
        manifest_list_files: manifest_list_files.into_iter().collect(),
        manifest_files: manifest_files.into_iter().collect(),
        data_files: data_files.into_iter().collect(),
        total_bytes,
    };

    if let Some(callback) = progress_callback {
        callback(ExpireProgressEvent::FilesIdentified {
            metadata_files: plan.metadata_files.len(),
            manifest_list_files: plan.manifest_list_files.len(),
            manifest_files: plan.manifest_files.len(),
            data_files: plan.data_files.len(),
        });
    }

    Ok(plan)
}

/// Execute the cleanup plan with one batched delete.
///
/// The storage splits the batch only where its per-request cap forces it.
/// An empty plan issues no request.
pub async fn execute_cleanup_plan(
    file_io: &FileIO,
    plan: &CleanupPlan,
    progress_callback: Option<&ExpireProgressCallback>,
) -> Result<CleanupExecutionResult> {
    if plan.is_empty() {
        return Ok(CleanupExecutionResult::default());
    }

    let total = plan.total_files();
    if let Some(callback) = progress_callback {
        callback(ExpireProgressEvent::DeletingFiles { total });
    }

    let summary = file_io.delete_batch(plan.all_files()).await?;
    if summary.deleted < total {
        warn!(
            planned = total,
            deleted = summary.deleted,
            "Storage reported fewer deletions than planned"
        );
    }

    Ok(CleanupExecutionResult {
        deleted_metadata_files: plan.metadata_files.len() as u64,
        deleted_manifest_list_files: plan.manifest_list_files.len() as u64,
        deleted_manifest_files: plan.manifest_files.len() as u64,
        deleted_data_files: plan.data_files.len() as u64,
        request_ids: summary.request_ids,
    })
}
