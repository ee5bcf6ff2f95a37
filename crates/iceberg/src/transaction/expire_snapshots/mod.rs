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

//! Snapshot expiration for Iceberg tables.
//!
//! An expiry run keeps the current snapshot, every branch and tag target,
//! and every snapshot committed within the retention threshold. It then:
//!
//! 1. collects the files reachable from the retained snapshots, plus the
//!    current metadata document and the metadata log entries that survive,
//! 2. lists `metadata/` and `data/` and plans the deletion of every other
//!    file last written at or before the cutoff,
//! 3. commits metadata without the expired snapshots,
//! 4. deletes the planned files in one batched request.
//!
//! Files are only deleted after the commit succeeds. A run that fails in
//! between leaves unreachable files behind for the next run. A commit that
//! loses a race is retried from step 1.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! let result = ExpireSnapshotsAction::new()
//!     .retention_threshold(Duration::from_secs(7 * 24 * 3600))
//!     .execute(&table, &catalog)
//!     .await?;
//! println!("Deleted {} files", result.total_files_deleted());
//! ```

mod cleanup;
mod result;
mod retention;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::Retryable;
use chrono::{DateTime, Utc};
pub use cleanup::{
    CleanupExecutionResult, CleanupPlan, compute_cleanup_plan, execute_cleanup_plan,
};
pub use result::{
    ExpireProgressCallback, ExpireProgressEvent, ExpireSnapshotsResult, ExpireState,
    ExpireStateCallback,
};
pub use retention::{RetentionPolicy, RetentionResult, compute_retention};
use tracing::{info, warn};

use crate::catalog::TableRequirement;
use crate::error::Result;
use crate::location::{LocationMatcher, TableLocation};
use crate::spec::TableMetadata;
use crate::table::Table;
use crate::transaction::commit_backoff;
use crate::{Catalog, TableCommit, TableIdent, TableUpdate};

/// Default lower bound on the retention threshold: 7 days.
pub const DEFAULT_MIN_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Source of the current time for an expiry run.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Planned snapshot expiration and file cleanup.
#[derive(Debug, Clone)]
pub struct ExpireSnapshotsPlan {
    cutoff: DateTime<Utc>,
    expired_snapshot_ids: Vec<i64>,
    trims_metadata_log: bool,
    cleanup_plan: CleanupPlan,
    requirements: Vec<TableRequirement>,
}

impl ExpireSnapshotsPlan {
    /// Snapshots committed at or before this instant are expired.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Snapshot IDs that will be expired, oldest first.
    pub fn expired_snapshot_ids(&self) -> &[i64] {
        &self.expired_snapshot_ids
    }

    /// Files that will be deleted after the commit.
    pub fn cleanup_plan(&self) -> &CleanupPlan {
        &self.cleanup_plan
    }

    /// Whether the table metadata changes.
    pub fn requires_commit(&self) -> bool {
        !self.expired_snapshot_ids.is_empty() || self.trims_metadata_log
    }

    /// Returns true if the run would neither commit nor delete anything.
    pub fn is_empty(&self) -> bool {
        !self.requires_commit() && self.cleanup_plan.is_empty()
    }

    fn build_updates(&self) -> Vec<TableUpdate> {
        let mut updates = Vec::new();
        if !self.expired_snapshot_ids.is_empty() {
            updates.push(TableUpdate::RemoveSnapshots {
                snapshot_ids: self.expired_snapshot_ids.clone(),
            });
        }
        if self.trims_metadata_log {
            updates.push(TableUpdate::RemoveMetadataLogEntries {
                older_than_ms: self.cutoff.timestamp_millis() + 1,
            });
        }
        updates
    }

    fn build_result(
        &self,
        duration: Duration,
        dry_run: bool,
        cleanup_result: Option<&CleanupExecutionResult>,
    ) -> ExpireSnapshotsResult {
        let plan = &self.cleanup_plan;
        let mut result = ExpireSnapshotsResult {
            deleted_snapshots_count: self.expired_snapshot_ids.len() as u64,
            deleted_metadata_files_count: plan.metadata_files.len() as u64,
            deleted_manifest_list_files_count: plan.manifest_list_files.len() as u64,
            deleted_manifest_files_count: plan.manifest_files.len() as u64,
            deleted_data_files_count: plan.data_files.len() as u64,
            total_bytes_freed: plan.total_bytes,
            duration_ms: duration.as_millis() as u64,
            dry_run,
            ..Default::default()
        };
        if let Some(cleanup_result) = cleanup_result {
            result.deleted_metadata_files_count = cleanup_result.deleted_metadata_files;
            result.deleted_manifest_list_files_count = cleanup_result.deleted_manifest_list_files;
            result.deleted_manifest_files_count = cleanup_result.deleted_manifest_files;
            result.deleted_data_files_count = cleanup_result.deleted_data_files;
            result.delete_requests_count = cleanup_result.request_ids.len() as u64;
        }
        result
    }
}

/// Action for expiring old snapshots and deleting the files only they
/// reference.
///
/// # Configuration
///
/// - `retention_threshold()`: keep snapshots committed within this window
/// - `min_retention()`: reject thresholds below this bound, `0s` unlocks all
/// - `dry_run(true)`: plan without committing or deleting
pub struct ExpireSnapshotsAction {
    retention_threshold: Duration,
    min_retention: Duration,
    clock: Clock,
    dry_run: bool,
    progress_callback: Option<ExpireProgressCallback>,
    state_callback: Option<ExpireStateCallback>,
}

impl fmt::Debug for ExpireSnapshotsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpireSnapshotsAction")
            .field("retention_threshold", &self.retention_threshold)
            .field("min_retention", &self.min_retention)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Default for ExpireSnapshotsAction {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpireSnapshotsAction {
    /// Creates an action retaining the last 7 days of snapshots.
    pub fn new() -> Self {
        Self {
            retention_threshold: DEFAULT_MIN_RETENTION,
            min_retention: DEFAULT_MIN_RETENTION,
            clock: Arc::new(Utc::now),
            dry_run: false,
            progress_callback: None,
            state_callback: None,
        }
    }

    /// Keep snapshots committed within `threshold` of now.
    pub fn retention_threshold(mut self, threshold: Duration) -> Self {
        self.retention_threshold = threshold;
        self
    }

    /// Shortest threshold accepted by [`Self::execute`] and [`Self::plan`].
    pub fn min_retention(mut self, min_retention: Duration) -> Self {
        self.min_retention = min_retention;
        self
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Plan only: nothing is committed or deleted.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Set a callback to receive progress events.
    pub fn with_progress_callback(mut self, callback: ExpireProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set a callback to receive state transitions.
    pub fn with_state_callback(mut self, callback: ExpireStateCallback) -> Self {
        self.state_callback = Some(callback);
        self
    }

    /// Compute what an expiry of `table` would commit and delete.
    pub async fn plan(&self, table: &Table) -> Result<ExpireSnapshotsPlan> {
        let metadata = table.metadata();
        let file_io = table.file_io();

        let policy =
            RetentionPolicy::from_table_properties(self.retention_threshold, metadata.properties())?;
        policy.validate(self.min_retention)?;
        let cutoff = policy.cutoff((self.clock)())?;
        let cutoff_ms = cutoff.timestamp_millis();

        let retention = compute_retention(metadata, &policy, cutoff);
        let progress = self.progress_callback.as_ref();
        let matcher = LocationMatcher::default();

        let mut keep = cleanup::collect_reachable_files(
            file_io,
            metadata,
            &retention.retained_snapshot_ids,
            &matcher,
            progress,
        )
        .await?;
        keep.insert(matcher.key(table.metadata_location_result()?));
        let mut trims_metadata_log = false;
        for entry in metadata.metadata_log() {
            if entry.timestamp_ms > cutoff_ms {
                keep.insert(matcher.key(&entry.metadata_file));
            } else {
                trims_metadata_log = true;
            }
        }

        let location = TableLocation::new(metadata.location())?;
        let cleanup_plan =
            compute_cleanup_plan(file_io, &location, &keep, cutoff, &matcher, progress).await?;

        Ok(ExpireSnapshotsPlan {
            cutoff,
            expired_snapshot_ids: retention.expired_snapshot_ids,
            trims_metadata_log,
            cleanup_plan,
            requirements: build_requirements(metadata),
        })
    }

    /// Run the expiry against the latest state of `table`.
    pub async fn execute(
        &self,
        table: &Table,
        catalog: &dyn Catalog,
    ) -> Result<ExpireSnapshotsResult> {
        let start = Instant::now();

        let backoff = commit_backoff(table.metadata())?;
        let result = (|| self.execute_once(table.identifier(), catalog, start))
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(|e| e.retryable())
            .notify(|err, delay| {
                warn!(table = %table.identifier(), %err, ?delay, "Retrying snapshot expiry");
            })
            .await;

        match &result {
            Ok(_) => self.transition(ExpireState::Idle),
            Err(_) => self.transition(ExpireState::Failed),
        }
        result
    }

    async fn execute_once(
        &self,
        ident: &TableIdent,
        catalog: &dyn Catalog,
        start: Instant,
    ) -> Result<ExpireSnapshotsResult> {
        self.transition(ExpireState::Scanning);
        let table = catalog.load_table(ident).await?;
        let plan = self.plan(&table).await?;

        if self.dry_run {
            return Ok(plan.build_result(start.elapsed(), true, None));
        }
        if plan.is_empty() {
            return Ok(ExpireSnapshotsResult::empty(start.elapsed()));
        }

        if plan.requires_commit() {
            self.transition(ExpireState::Committing);
            let commit = TableCommit::builder()
                .ident(ident.clone())
                .updates(plan.build_updates())
                .requirements(plan.requirements.clone())
                .build();
            let committed = catalog.update_table(commit).await?;
            if let Some(callback) = &self.progress_callback {
                callback(ExpireProgressEvent::Committed {
                    metadata_location: committed.metadata_location().unwrap_or_default().to_string(),
                });
            }
        }

        self.transition(ExpireState::Deleting);
        let cleanup_result = execute_cleanup_plan(
            table.file_io(),
            plan.cleanup_plan(),
            self.progress_callback.as_ref(),
        )
        .await?;

        let result = plan.build_result(start.elapsed(), false, Some(&cleanup_result));
        info!(
            table = %ident,
            expired_snapshots = result.deleted_snapshots_count,
            deleted_files = result.total_files_deleted(),
            delete_requests = result.delete_requests_count,
            "Expired snapshots"
        );
        Ok(result)
    }

    fn transition(&self, state: ExpireState) {
        if let Some(callback) = &self.state_callback {
            callback(state);
        }
    }
}

/// Pins the table and every ref, so a concurrent commit forces a re-plan.
fn build_requirements(metadata: &TableMetadata) -> Vec<TableRequirement> {
    let mut requirements = vec![TableRequirement::UuidMatch {
        uuid: metadata.uuid(),
    }];

    let mut refs: Vec<_> = metadata.refs().iter().collect();
    refs.sort_by_key(|(name, _)| name.as_str());
    for (ref_name, snap_ref) in refs {
        requirements.push(TableRequirement::RefSnapshotIdMatch {
            r#ref: ref_name.clone(),
            snapshot_id: Some(snap_ref.snapshot_id),
        });
    }

    requirements
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hms::{HiveDatabase, HiveTable, MemoryMetastore, Metastore};
    use crate::io::{FileIO, MemoryStorage};
    use crate::transaction::tests::{catalog, create_table, data_file};
    use crate::transaction::{ApplyTransactionAction, Transaction};
    use crate::{ErrorKind, HiveCatalog, LOCATION_PROPERTY, NamespaceIdent};

    async fn append(catalog: &HiveCatalog, table: &Table, rows: u64) -> Table {
        let file = data_file(table, rows).await;
        let tx = Transaction::new(table);
        let tx = tx.fast_append().add_data_files([file]).apply(tx).unwrap();
        tx.commit(catalog).await.unwrap()
    }

    async fn table_with_two_appends(catalog: &HiveCatalog) -> Table {
        let table = create_table(catalog, "t").await;
        let table = append(catalog, &table, 1).await;
        append(catalog, &table, 2).await
    }

    async fn metadata_files(table: &Table) -> Vec<String> {
        let location = TableLocation::new(table.metadata().location()).unwrap();
        table
            .file_io()
            .list(&location.metadata_dir())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.location)
            .filter(|l| l.ends_with(".metadata.json"))
            .collect()
    }

    /// A clock one second ahead, so everything written so far is older than
    /// a zero threshold.
    fn ahead() -> Clock {
        Arc::new(|| Utc::now() + chrono::Duration::seconds(1))
    }

    fn zero_retention() -> ExpireSnapshotsAction {
        ExpireSnapshotsAction::new()
            .retention_threshold(Duration::ZERO)
            .min_retention(Duration::ZERO)
            .with_clock(ahead())
    }

    #[tokio::test]
    async fn test_zero_retention_keeps_current_snapshot_only() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;
        let current = table.metadata().current_snapshot_id().unwrap();
        assert_eq!(metadata_files(&table).await.len(), 3);

        let result = zero_retention().execute(&table, &catalog).await.unwrap();

        assert_eq!(result.deleted_snapshots_count, 1);
        assert_eq!(result.deleted_metadata_files_count, 2);
        assert_eq!(result.deleted_manifest_list_files_count, 1);
        assert_eq!(result.deleted_manifest_files_count, 0);
        assert_eq!(result.deleted_data_files_count, 0);
        assert_eq!(result.delete_requests_count, 1);
        assert!(!result.dry_run);

        let table = catalog.load_table(table.identifier()).await.unwrap();
        let snapshots: Vec<_> = table.metadata().snapshots().map(|s| s.snapshot_id()).collect();
        assert_eq!(snapshots, vec![current]);
        assert_eq!(metadata_files(&table).await.len(), 2);

        // Every file the current snapshot needs is still readable.
        let snapshot = table.metadata().current_snapshot().unwrap();
        let manifests = snapshot.load_manifest_list(table.file_io()).await.unwrap();
        for manifest_file in manifests.entries() {
            let manifest = manifest_file.load_manifest(table.file_io()).await.unwrap();
            for entry in manifest.entries() {
                assert!(table.file_io().exists(entry.file_path()).await.unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;
        zero_retention().execute(&table, &catalog).await.unwrap();

        let result = ExpireSnapshotsAction::new()
            .retention_threshold(Duration::ZERO)
            .min_retention(Duration::ZERO)
            .with_clock(Arc::new(|| Utc::now() - chrono::Duration::hours(1)))
            .execute(&table, &catalog)
            .await
            .unwrap();
        assert_eq!(result.deleted_snapshots_count, 0);
        assert_eq!(result.delete_requests_count, 0);
    }

    #[tokio::test]
    async fn test_threshold_below_minimum_rejected() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;
        let location = table.metadata_location().map(str::to_string);

        let err = ExpireSnapshotsAction::new()
            .retention_threshold(Duration::from_secs(60))
            .execute(&table, &catalog)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
        assert!(err.message().contains("minimum retention"));

        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(reloaded.metadata_location().map(str::to_string), location);
    }

    #[tokio::test]
    async fn test_long_threshold_keeps_every_snapshot() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;

        let result = ExpireSnapshotsAction::new()
            .retention_threshold(Duration::from_secs(30 * 24 * 3600))
            .execute(&table, &catalog)
            .await
            .unwrap();
        assert_eq!(result, ExpireSnapshotsResult {
            duration_ms: result.duration_ms,
            ..Default::default()
        });
        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(reloaded.metadata().snapshots().len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;

        let result = zero_retention()
            .dry_run(true)
            .execute(&table, &catalog)
            .await
            .unwrap();
        assert!(result.dry_run);
        assert_eq!(result.deleted_snapshots_count, 1);
        assert_eq!(result.total_files_deleted(), 3);
        assert_eq!(result.delete_requests_count, 0);

        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(reloaded.metadata().snapshots().len(), 2);
        assert_eq!(metadata_files(&table).await.len(), 3);
    }

    #[tokio::test]
    async fn test_state_and_progress_events() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;
        let current = table.metadata().current_snapshot_id().unwrap();

        let states = Arc::new(Mutex::new(vec![]));
        let events = Arc::new(Mutex::new(vec![]));
        let (state_sink, event_sink) = (states.clone(), events.clone());
        zero_retention()
            .with_state_callback(Arc::new(move |s| state_sink.lock().unwrap().push(s)))
            .with_progress_callback(Arc::new(move |e| event_sink.lock().unwrap().push(e)))
            .execute(&table, &catalog)
            .await
            .unwrap();

        assert_eq!(states.lock().unwrap().as_slice(), &[
            ExpireState::Scanning,
            ExpireState::Committing,
            ExpireState::Deleting,
            ExpireState::Idle,
        ]);
        let events = events.lock().unwrap();
        assert_eq!(events[0], ExpireProgressEvent::AnalyzingSnapshot {
            index: 0,
            snapshot_id: current,
        });
        assert!(matches!(events[2], ExpireProgressEvent::Committed { .. }));
        assert_eq!(events[3], ExpireProgressEvent::DeletingFiles { total: 3 });
    }

    #[tokio::test]
    async fn test_failed_run_reports_failed_state() {
        let catalog = catalog().await;
        let table = table_with_two_appends(&catalog).await;
        let states = Arc::new(Mutex::new(vec![]));
        let sink = states.clone();

        ExpireSnapshotsAction::new()
            .retention_threshold(Duration::ZERO)
            .with_state_callback(Arc::new(move |s| sink.lock().unwrap().push(s)))
            .execute(&table, &catalog)
            .await
            .unwrap_err();
        assert_eq!(states.lock().unwrap().as_slice(), &[
            ExpireState::Scanning,
            ExpireState::Failed
        ]);
    }

    /// Lets another writer append to the table right before the first swap
    /// goes through, so that swap loses the race.
    #[derive(Debug, Default)]
    struct RacingMetastore {
        inner: Arc<MemoryMetastore>,
        writer: Mutex<Option<HiveCatalog>>,
        published: Mutex<Option<Table>>,
    }

    impl RacingMetastore {
        fn arm(&self, writer: HiveCatalog) {
            *self.writer.lock().unwrap() = Some(writer);
        }

        fn published(&self) -> Option<Table> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Metastore for RacingMetastore {
        async fn create_database(&self, database: HiveDatabase) -> Result<()> {
            self.inner.create_database(database).await
        }

        async fn get_database(&self, name: &str) -> Result<Option<HiveDatabase>> {
            self.inner.get_database(name).await
        }

        async fn rename_database(&self, from: &str, to: &str) -> Result<()> {
            self.inner.rename_database(from, to).await
        }

        async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
            self.inner.list_tables(database).await
        }

        async fn create_table(&self, table: HiveTable) -> Result<()> {
            self.inner.create_table(table).await
        }

        async fn get_table(&self, database: &str, name: &str) -> Result<Option<HiveTable>> {
            self.inner.get_table(database, name).await
        }

        async fn drop_table(&self, database: &str, name: &str, purge_data: bool) -> Result<()> {
            self.inner.drop_table(database, name, purge_data).await
        }

        async fn read_parameter(
            &self,
            database: &str,
            name: &str,
            key: &str,
        ) -> Result<Option<String>> {
            self.inner.read_parameter(database, name, key).await
        }

        async fn write_parameter(
            &self,
            database: &str,
            name: &str,
            key: &str,
            value: &str,
        ) -> Result<()> {
            self.inner.write_parameter(database, name, key, value).await
        }

        async fn swap_parameters(
            &self,
            database: &str,
            name: &str,
            key: &str,
            expected: Option<&str>,
            updates: HashMap<String, String>,
        ) -> Result<()> {
            let writer = self.writer.lock().unwrap().take();
            if let Some(writer) = writer {
                let ident = TableIdent::from_strs([database, name])?;
                let table = writer.load_table(&ident).await?;
                let table = append(&writer, &table, 3).await;
                *self.published.lock().unwrap() = Some(table);
            }
            self.inner
                .swap_parameters(database, name, key, expected, updates)
                .await
        }
    }

    /// A catalog over a racing metastore, and a second catalog writing to the
    /// same table directly.
    async fn racing_catalogs() -> (HiveCatalog, HiveCatalog, Arc<RacingMetastore>) {
        let storage = MemoryStorage::new();
        storage.create_bucket("b").await;
        let file_io = FileIO::new(Arc::new(storage));
        let metastore = Arc::new(RacingMetastore::default());
        let catalog = HiveCatalog::new(metastore.clone(), file_io.clone());
        let writer = HiveCatalog::new(metastore.inner.clone(), file_io);
        catalog
            .create_namespace(
                &NamespaceIdent::new("s"),
                HashMap::from([(LOCATION_PROPERTY.to_string(), "s3://b/s".to_string())]),
            )
            .await
            .unwrap();
        (catalog, writer, metastore)
    }

    #[tokio::test]
    async fn test_concurrent_append_is_replanned_and_kept() {
        let (catalog, writer, metastore) = racing_catalogs().await;
        let table = table_with_two_appends(&catalog).await;
        metastore.arm(writer);

        let result = zero_retention().execute(&table, &catalog).await.unwrap();

        let published = metastore.published().unwrap();
        let current = published.metadata().current_snapshot_id().unwrap();
        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        let snapshots: Vec<_> = reloaded
            .metadata()
            .snapshots()
            .map(|s| s.snapshot_id())
            .collect();
        assert_eq!(snapshots, vec![current]);
        assert_eq!(result.deleted_snapshots_count, 2);
        assert_eq!(result.delete_requests_count, 1);

        // Everything the concurrent writer published is still there.
        let io = reloaded.file_io();
        let snapshot = published.metadata().current_snapshot().unwrap();
        assert!(io.exists(snapshot.manifest_list()).await.unwrap());
        let manifests = snapshot.load_manifest_list(io).await.unwrap();
        assert!(!manifests.entries().is_empty());
        for manifest_file in manifests.entries() {
            assert!(io.exists(&manifest_file.manifest_path).await.unwrap());
            let manifest = manifest_file.load_manifest(io).await.unwrap();
            for entry in manifest.entries() {
                assert!(io.exists(entry.file_path()).await.unwrap());
            }
        }
    }

    #[test]
    fn test_requirements_pin_refs() {
        let metadata = crate::spec::tests::metadata_with_chain(2);
        let requirements = build_requirements(&metadata);
        assert_eq!(requirements[1], TableRequirement::RefSnapshotIdMatch {
            r#ref: "main".to_string(),
            snapshot_id: Some(2),
        });
    }
}
