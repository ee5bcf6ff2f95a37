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

//! This module contains transaction api.
//!
//! The transaction API enables changes to be made to an existing table.
//!
//! Note that this may also have side effects, such as producing new manifest
//! files.
//!
//! Below is a basic example using the "fast-append" action:
//!
//! ```ignore
//! use iceberg_hive::transaction::{ApplyTransactionAction, Transaction};
//!
//! let tx = Transaction::new(&table);
//! let action = tx.fast_append().add_data_files(data_files);
//! let tx = action.apply(tx)?;
//! let table = tx.commit(&catalog).await?;
//! ```

mod action;

pub use action::*;
pub use append::FastAppendAction;
pub use expire_snapshots::{
    CleanupExecutionResult, CleanupPlan, ExpireProgressCallback, ExpireProgressEvent,
    ExpireSnapshotsAction, ExpireSnapshotsPlan, ExpireSnapshotsResult, ExpireState,
    ExpireStateCallback, RetentionPolicy,
};
pub use update_schema::UpdateSchemaAction;
mod append;
pub mod expire_snapshots;
mod snapshot;
mod update_schema;

use std::sync::Arc;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder, RetryableWithContext};

use crate::error::Result;
use crate::spec::TableMetadata;
use crate::table::Table;
use crate::{Catalog, TableCommit, TableRequirement, TableUpdate};

/// Table transaction.
#[derive(Clone)]
pub struct Transaction {
    table: Table,
    actions: Vec<BoxedTransactionAction>,
}

impl Transaction {
    /// Creates a new transaction.
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            actions: vec![],
        }
    }

    fn update_table_metadata(table: Table, updates: &[TableUpdate]) -> Result<Table> {
        let mut metadata_builder = table.metadata().clone().into_builder(None);
        for update in updates {
            metadata_builder = update.clone().apply(metadata_builder)?;
        }

        Ok(table.with_metadata(Arc::new(metadata_builder.build()?.metadata)))
    }

    /// Applies an [`ActionCommit`] to the given [`Table`], returning a new [`Table`] with updated metadata.
    /// Also appends any derived [`TableUpdate`]s and [`TableRequirement`]s to the provided vectors.
    fn apply(
        table: Table,
        mut action_commit: ActionCommit,
        existing_updates: &mut Vec<TableUpdate>,
        existing_requirements: &mut Vec<TableRequirement>,
    ) -> Result<Table> {
        let updates = action_commit.take_updates();
        let requirements = action_commit.take_requirements();

        for requirement in &requirements {
            requirement.check(Some(table.metadata()))?;
        }

        let updated_table = Self::update_table_metadata(table, &updates)?;

        existing_updates.extend(updates);
        existing_requirements.extend(requirements);

        Ok(updated_table)
    }

    /// Update table schema.
    pub fn update_schema(&self) -> UpdateSchemaAction {
        UpdateSchemaAction::new()
    }

    /// Creates a fast append action.
    pub fn fast_append(&self) -> FastAppendAction {
        FastAppendAction::new()
    }

    /// Creates an expire snapshots action.
    ///
    /// Expiry commits and deletes files on its own schedule, so it is run with
    /// [`ExpireSnapshotsAction::execute`] rather than staged in this
    /// transaction.
    pub fn expire_snapshots(&self) -> ExpireSnapshotsAction {
        ExpireSnapshotsAction::new()
    }

    /// Commit transaction.
    ///
    /// A commit that loses a race is retried against refreshed metadata, with
    /// every staged action re-run on the new base.
    pub async fn commit(self, catalog: &dyn Catalog) -> Result<Table> {
        if self.actions.is_empty() {
            // nothing to commit
            return Ok(self.table);
        }

        let backoff = commit_backoff(self.table.metadata())?;
        let tx = self;

        (|mut tx: Transaction| async {
            let result = tx.do_commit(catalog).await;
            (tx, result)
        })
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .context(tx)
        .when(|e| e.retryable())
        .await
        .1
    }

    async fn do_commit(&mut self, catalog: &dyn Catalog) -> Result<Table> {
        let refreshed = catalog.load_table(self.table.identifier()).await?;

        if self.table.metadata() != refreshed.metadata()
            || self.table.metadata_location() != refreshed.metadata_location()
        {
            // current base is stale, use refreshed as base and re-apply transaction actions
            self.table = refreshed.clone();
        }

        let mut current_table = self.table.clone();
        let mut existing_updates: Vec<TableUpdate> = vec![];
        let mut existing_requirements: Vec<TableRequirement> = vec![];

        for action in &self.actions {
            let action_commit = Arc::clone(action).commit(&current_table).await?;
            current_table = Self::apply(
                current_table,
                action_commit,
                &mut existing_updates,
                &mut existing_requirements,
            )?;
        }

        if existing_updates.is_empty() {
            return Ok(current_table);
        }

        let table_commit = TableCommit::builder()
            .ident(self.table.identifier().to_owned())
            .updates(existing_updates)
            .requirements(existing_requirements)
            .build();

        catalog.update_table(table_commit).await
    }
}

/// Retry schedule for commits, bounded by the table's `commit.retry.*`
/// properties.
pub(crate) fn commit_backoff(metadata: &TableMetadata) -> Result<ExponentialBackoff> {
    let props = metadata.table_properties()?;
    Ok(ExponentialBuilder::new()
        .with_min_delay(props.commit_min_retry_wait)
        .with_max_delay(props.commit_max_retry_wait)
        .with_total_delay(Some(props.commit_total_retry_timeout))
        .with_max_times(props.commit_num_retries)
        .with_factor(2.0)
        .build())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hms::MemoryMetastore;
    use crate::io::{FileIO, MemoryStorage};
    use crate::location::TableLocation;
    use crate::spec::tests::test_schema;
    use crate::spec::{DataFile, DataFileFormat};
    use crate::{HiveCatalog, LOCATION_PROPERTY, NamespaceIdent, TableCreation};

    pub(crate) async fn catalog() -> HiveCatalog {
        let storage = MemoryStorage::new();
        storage.create_bucket("b").await;
        let catalog = HiveCatalog::new(
            Arc::new(MemoryMetastore::new()),
            FileIO::new(Arc::new(storage)),
        );
        catalog
            .create_namespace(
                &NamespaceIdent::new("s"),
                HashMap::from([(LOCATION_PROPERTY.to_string(), "s3://b/s".to_string())]),
            )
            .await
            .unwrap();
        catalog
    }

    pub(crate) async fn create_table(catalog: &HiveCatalog, name: &str) -> Table {
        let creation = TableCreation::builder()
            .name(name.to_string())
            .schema(test_schema())
            .properties(HashMap::from([(
                "commit.retry.min-wait-ms".to_string(),
                "1".to_string(),
            )]))
            .build();
        catalog
            .create_table(&NamespaceIdent::new("s"), creation)
            .await
            .unwrap()
    }

    /// Writes a placeholder data file into the table's data directory.
    pub(crate) async fn data_file(table: &Table, record_count: u64) -> DataFile {
        let location = TableLocation::new(table.metadata().location()).unwrap();
        let path = location.data_file(DataFileFormat::Parquet);
        let bytes = vec![0u8; 16];
        table
            .file_io()
            .write(&path, bytes.clone().into())
            .await
            .unwrap();
        DataFile::new(path, DataFileFormat::Parquet, record_count, bytes.len() as u64)
    }

    #[tokio::test]
    async fn test_commit_without_actions_returns_table() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let committed = Transaction::new(&table).commit(&catalog).await.unwrap();
        assert_eq!(committed.metadata_location(), table.metadata_location());
    }

    #[tokio::test]
    async fn test_commit_retries_after_concurrent_append() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;

        // Both transactions start from the same, empty base.
        let first = data_file(&table, 1).await;
        let second = data_file(&table, 2).await;
        let tx_a = Transaction::new(&table);
        let tx_a = tx_a.fast_append().add_data_files([first]).apply(tx_a).unwrap();
        let tx_b = Transaction::new(&table);
        let tx_b = tx_b.fast_append().add_data_files([second]).apply(tx_b).unwrap();

        tx_a.commit(&catalog).await.unwrap();
        let table = tx_b.commit(&catalog).await.unwrap();

        let metadata = table.metadata();
        assert_eq!(metadata.snapshots().len(), 2);
        let current = metadata.current_snapshot().unwrap();
        assert_eq!(current.sequence_number(), 2);
        assert!(current.parent_snapshot_id().is_some());
        assert_eq!(current.summary().additional_properties["total-records"], "3");
    }

    #[tokio::test]
    async fn test_commit_chains_actions() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let file = data_file(&table, 4).await;

        let tx = Transaction::new(&table);
        let tx = tx
            .update_schema()
            .add_column("extra", crate::spec::PrimitiveType::Long)
            .apply(tx)
            .unwrap();
        let tx = tx.fast_append().add_data_files([file]).apply(tx).unwrap();
        let table = tx.commit(&catalog).await.unwrap();

        assert_eq!(table.metadata().current_schema_id(), 1);
        assert_eq!(
            table.metadata().current_snapshot().unwrap().schema_id(),
            Some(1)
        );
        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(reloaded.metadata(), table.metadata());
    }
}
