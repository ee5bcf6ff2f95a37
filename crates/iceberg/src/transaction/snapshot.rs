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

use uuid::Uuid;

use crate::error::Result;
use crate::location::TableLocation;
use crate::spec::{
    DataFile, MAIN_BRANCH, Manifest, ManifestEntry, ManifestFile, ManifestList, Operation,
    Snapshot, SnapshotReference, Summary, generate_snapshot_id,
};
use crate::table::Table;
use crate::transaction::ActionCommit;
use crate::{Error, ErrorKind, TableRequirement, TableUpdate};

const ADDED_DATA_FILES: &str = "added-data-files";
const ADDED_RECORDS: &str = "added-records";
const ADDED_FILES_SIZE: &str = "added-files-size";
const TOTAL_DATA_FILES: &str = "total-data-files";
const TOTAL_RECORDS: &str = "total-records";
const TOTAL_FILES_SIZE: &str = "total-files-size";

/// Writes the manifest, manifest list and snapshot for one commit attempt.
///
/// Every attempt gets a fresh snapshot id and commit uuid, so the files of a
/// failed attempt never collide with those of the retry.
pub(crate) struct SnapshotProducer<'a> {
    table: &'a Table,
    snapshot_id: i64,
    commit_uuid: Uuid,
    snapshot_properties: HashMap<String, String>,
    added_data_files: Vec<DataFile>,
}

impl<'a> SnapshotProducer<'a> {
    pub(crate) fn new(
        table: &'a Table,
        commit_uuid: Uuid,
        snapshot_properties: HashMap<String, String>,
        added_data_files: Vec<DataFile>,
    ) -> Self {
        Self {
            table,
            snapshot_id: Self::generate_unique_snapshot_id(table),
            commit_uuid,
            snapshot_properties,
            added_data_files,
        }
    }

    pub(crate) fn validate_added_data_files(&self) -> Result<()> {
        for data_file in &self.added_data_files {
            data_file.file_format()?;
            if !data_file
                .file_path
                .starts_with(self.table.metadata().location())
            {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    "Data file is outside the table location",
                )
                .with_context("file", data_file.file_path.clone()));
            }
        }
        Ok(())
    }

    fn generate_unique_snapshot_id(table: &Table) -> i64 {
        loop {
            let snapshot_id = generate_snapshot_id();
            if table.metadata().snapshot_by_id(snapshot_id).is_none() {
                return snapshot_id;
            }
        }
    }

    fn summary(&self, operation: Operation) -> Summary {
        let added_records: i64 = self.added_data_files.iter().map(|f| f.record_count).sum();
        let added_size: i64 = self
            .added_data_files
            .iter()
            .map(|f| f.file_size_in_bytes)
            .sum();
        let previous = |key: &str| -> i64 {
            self.table
                .metadata()
                .current_snapshot()
                .and_then(|s| s.summary().additional_properties.get(key))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };

        let mut properties = self.snapshot_properties.clone();
        properties.extend([
            (
                ADDED_DATA_FILES.to_string(),
                self.added_data_files.len().to_string(),
            ),
            (ADDED_RECORDS.to_string(), added_records.to_string()),
            (ADDED_FILES_SIZE.to_string(), added_size.to_string()),
            (
                TOTAL_DATA_FILES.to_string(),
                (previous(TOTAL_DATA_FILES) + self.added_data_files.len() as i64).to_string(),
            ),
            (
                TOTAL_RECORDS.to_string(),
                (previous(TOTAL_RECORDS) + added_records).to_string(),
            ),
            (
                TOTAL_FILES_SIZE.to_string(),
                (previous(TOTAL_FILES_SIZE) + added_size).to_string(),
            ),
        ]);
        Summary {
            operation,
            additional_properties: properties,
        }
    }

    async fn manifest_files(
        &self,
        location: &TableLocation,
        sequence_number: i64,
    ) -> Result<Vec<ManifestFile>> {
        let mut manifests = Vec::new();
        if !self.added_data_files.is_empty() {
            let schema = self.table.current_schema_ref()?;
            let schema_json = serde_json::to_string(schema.as_ref()).map_err(|e| {
                Error::new(ErrorKind::Unexpected, "Failed to serialize schema").with_source(e)
            })?;
            let entries = self
                .added_data_files
                .iter()
                .cloned()
                .map(|f| ManifestEntry::added(self.snapshot_id, sequence_number, f))
                .collect();
            let manifest = Manifest::new(entries)
                .write(
                    self.table.file_io(),
                    &location.manifest(&self.commit_uuid, 0),
                    &schema_json,
                    self.snapshot_id,
                    sequence_number,
                )
                .await?;
            manifests.push(manifest);
        }

        if let Some(parent) = self.table.metadata().current_snapshot() {
            let existing = parent.load_manifest_list(self.table.file_io()).await?;
            manifests.extend(existing.consume_entries());
        }
        Ok(manifests)
    }

    /// Writes the new snapshot's files and returns the updates that add it
    /// to `main`.
    pub(crate) async fn commit(self, operation: Operation) -> Result<ActionCommit> {
        let metadata = self.table.metadata();
        let location = TableLocation::new(metadata.location())?;
        let base_snapshot_id = metadata.current_snapshot_id();
        let sequence_number = metadata.next_sequence_number();

        // The summary reads the parent before any file is written.
        let summary = self.summary(operation);
        let manifests = self.manifest_files(&location, sequence_number).await?;

        let manifest_list_path = location.manifest_list(self.snapshot_id, &self.commit_uuid);
        let bytes = ManifestList::new(manifests).to_avro_bytes(
            self.snapshot_id,
            base_snapshot_id,
            sequence_number,
        )?;
        self.table
            .file_io()
            .write(&manifest_list_path, bytes.into())
            .await?;

        let snapshot = Snapshot::builder()
            .snapshot_id(self.snapshot_id)
            .parent_snapshot_id(base_snapshot_id)
            .sequence_number(sequence_number)
            .timestamp_ms(chrono::Utc::now().timestamp_millis())
            .manifest_list(manifest_list_path)
            .summary(summary)
            .schema_id(Some(metadata.current_schema_id()))
            .build();

        let updates = vec![
            TableUpdate::AddSnapshot { snapshot },
            TableUpdate::SetSnapshotRef {
                ref_name: MAIN_BRANCH.to_string(),
                reference: SnapshotReference::branch(self.snapshot_id),
            },
        ];
        let requirements = vec![
            TableRequirement::UuidMatch {
                uuid: metadata.uuid(),
            },
            TableRequirement::RefSnapshotIdMatch {
                r#ref: MAIN_BRANCH.to_string(),
                snapshot_id: base_snapshot_id,
            },
        ];
        Ok(ActionCommit::new(updates, requirements))
    }
}
