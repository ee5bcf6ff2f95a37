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

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::spec::{DataFile, Operation};
use crate::table::Table;
use crate::transaction::action::{ActionCommit, TransactionAction};
use crate::transaction::snapshot::SnapshotProducer;
use crate::{Error, ErrorKind};

/// FastAppendAction is a transaction action for fast append data files to the table.
///
/// The new snapshot carries every manifest of its parent unchanged and adds
/// one manifest for the appended files.
#[derive(Debug, Default)]
pub struct FastAppendAction {
    commit_uuid: Option<Uuid>,
    snapshot_properties: HashMap<String, String>,
    added_data_files: Vec<DataFile>,
}

impl FastAppendAction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add data files to the snapshot.
    pub fn add_data_files(mut self, data_files: impl IntoIterator<Item = DataFile>) -> Self {
        self.added_data_files.extend(data_files);
        self
    }

    /// Set commit UUID for the snapshot.
    pub fn set_commit_uuid(mut self, commit_uuid: Uuid) -> Self {
        self.commit_uuid = Some(commit_uuid);
        self
    }

    /// Set snapshot summary properties.
    pub fn set_snapshot_properties(mut self, snapshot_properties: HashMap<String, String>) -> Self {
        self.snapshot_properties = snapshot_properties;
        self
    }
}

#[async_trait]
impl TransactionAction for FastAppendAction {
    async fn commit(self: Arc<Self>, table: &Table) -> Result<ActionCommit> {
        if self.added_data_files.is_empty() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Append requires at least one data file",
            ));
        }
        let producer = SnapshotProducer::new(
            table,
            self.commit_uuid.unwrap_or_else(Uuid::new_v4),
            self.snapshot_properties.clone(),
            self.added_data_files.clone(),
        );
        producer.validate_added_data_files()?;
        producer.commit(Operation::Append).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::{DataFileFormat, MAIN_BRANCH};
    use crate::transaction::tests::{catalog, create_table, data_file};
    use crate::transaction::{ApplyTransactionAction, Transaction};

    #[tokio::test]
    async fn test_empty_data_append_action() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let tx = Transaction::new(&table);
        let tx = tx.fast_append().apply(tx).unwrap();
        let err = tx.commit(&catalog).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[tokio::test]
    async fn test_file_outside_table_rejected() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let foreign = DataFile::new("s3://b/elsewhere/x.parquet", DataFileFormat::Parquet, 1, 1);
        let err = Arc::new(FastAppendAction::new().add_data_files([foreign]))
            .commit(&table)
            .await
            .unwrap_err();
        assert!(err.message().contains("outside the table location"));
    }

    #[tokio::test]
    async fn test_fast_append_carries_parent_manifests() {
        let catalog = catalog().await;
        let mut table = create_table(&catalog, "t").await;
        for rows in [2, 3] {
            let file = data_file(&table, rows).await;
            let tx = Transaction::new(&table);
            let tx = tx
                .fast_append()
                .set_snapshot_properties(HashMap::from([("engine-query-id".to_string(), "q".to_string())]))
                .add_data_files([file])
                .apply(tx)
                .unwrap();
            table = tx.commit(&catalog).await.unwrap();
        }

        let metadata = table.metadata();
        assert_eq!(metadata.snapshots().len(), 2);
        let current = metadata.current_snapshot().unwrap();
        assert_eq!(current.sequence_number(), 2);
        assert_eq!(
            metadata.snapshot_for_ref(MAIN_BRANCH).unwrap().snapshot_id(),
            current.snapshot_id()
        );
        let summary = &current.summary().additional_properties;
        assert_eq!(summary["added-records"], "3");
        assert_eq!(summary["total-records"], "5");
        assert_eq!(summary["total-data-files"], "2");
        assert_eq!(summary["engine-query-id"], "q");

        let manifests = current.load_manifest_list(table.file_io()).await.unwrap();
        assert_eq!(manifests.entries().len(), 2);
        assert_eq!(manifests.entries()[0].added_snapshot_id, current.snapshot_id());
        assert_eq!(manifests.entries()[0].sequence_number, 2);
        assert_eq!(manifests.entries()[1].sequence_number, 1);
    }
}
