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

//! Defines the [table metadata](https://iceberg.apache.org/spec/#table-metadata).
//! The main struct here is [TableMetadata] which defines the data for a table.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{
    MAIN_BRANCH, MetadataLog, Schema, SchemaRef, Snapshot, SnapshotLog, SnapshotReference,
    SnapshotRef, TableProperties,
};
use crate::error::{Error, ErrorKind, Result};

/// Reference to [`TableMetadata`].
pub type TableMetadataRef = Arc<TableMetadata>;

/// The only format version written by this crate.
pub const FORMAT_VERSION: i32 = 2;
/// Partition field ids start after this value.
const UNPARTITIONED_LAST_ASSIGNED_ID: i32 = 999;
/// Marker for "no current snapshot" in the JSON form.
const EMPTY_SNAPSHOT_ID: i64 = -1;

/// A partition spec. Tables created here have the single unpartitioned spec.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSpec {
    /// Identifier for the spec.
    pub spec_id: i32,
    /// Partition fields, kept verbatim.
    #[serde(default)]
    pub fields: Vec<serde_json::Value>,
}

/// A sort order. Tables created here have the single unsorted order.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SortOrder {
    /// Identifier for the order.
    pub order_id: i64,
    /// Sort fields, kept verbatim.
    #[serde(default)]
    pub fields: Vec<serde_json::Value>,
}

/// Fields for the version 2 of the table metadata.
///
/// Validity is checked when parsing and when building; accessors assume it.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    /// Integer Version for the format.
    format_version: i32,
    /// A UUID that identifies the table
    table_uuid: Uuid,
    /// Location tables base location
    location: String,
    /// The tables highest sequence number
    last_sequence_number: i64,
    /// Timestamp in milliseconds from the unix epoch when the table was last updated.
    last_updated_ms: i64,
    /// An integer; the highest assigned column ID for the table.
    last_column_id: i32,
    /// A list of schemas, stored as objects with schema-id.
    schemas: Vec<SchemaRef>,
    /// ID of the table's current schema.
    current_schema_id: i32,
    /// A list of partition specs, stored as full partition spec objects.
    partition_specs: Vec<PartitionSpec>,
    /// ID of the "current" spec that writers should use by default.
    default_spec_id: i32,
    /// An integer; the highest assigned partition field ID across all partition specs for the table.
    last_partition_id: i32,
    /// A string to string map of table properties.
    #[serde(default)]
    properties: HashMap<String, String>,
    /// long ID of the current table snapshot; must be the same as the current
    /// ID of the main branch in refs.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_snapshot_id"
    )]
    current_snapshot_id: Option<i64>,
    /// A list of valid snapshots.
    #[serde(default)]
    snapshots: Vec<SnapshotRef>,
    /// A list (optional) of timestamp and snapshot ID pairs that encodes changes
    /// to the current snapshot for the table.
    #[serde(default)]
    snapshot_log: Vec<SnapshotLog>,
    /// A list (optional) of timestamp and metadata file location pairs
    /// that encodes changes to the previous metadata files for the table.
    #[serde(default)]
    metadata_log: Vec<MetadataLog>,
    /// A list of sort orders, stored as full sort order objects.
    sort_orders: Vec<SortOrder>,
    /// Default sort order id of the table.
    default_sort_order_id: i64,
    /// A map of snapshot references.
    #[serde(default)]
    refs: HashMap<String, SnapshotReference>,
}

fn deserialize_snapshot_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    let id = Option::<i64>::deserialize(deserializer)?;
    Ok(id.filter(|id| *id != EMPTY_SNAPSHOT_ID))
}

impl TableMetadata {
    /// Parses a metadata document, checking it is one this crate can maintain.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let metadata: TableMetadata = serde_json::from_slice(bytes)?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(Error::new(
                ErrorKind::FeatureUnsupported,
                format!(
                    "Table format version {} is not supported",
                    metadata.format_version
                ),
            ));
        }
        if metadata.current_schema().is_none() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Current schema {} not found in table metadata",
                    metadata.current_schema_id
                ),
            ));
        }
        Ok(metadata)
    }

    /// Convert this Table Metadata into a builder for modification.
    ///
    /// `current_file_location` is the location where the current version
    /// of the metadata file is stored. This is used to update the metadata log.
    #[must_use]
    pub fn into_builder(self, current_file_location: Option<String>) -> TableMetadataBuilder {
        TableMetadataBuilder::new_from_metadata(self, current_file_location)
    }

    /// Returns format version of this metadata.
    #[inline]
    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    /// Returns uuid of current table.
    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.table_uuid
    }

    /// Returns table location.
    #[inline]
    pub fn location(&self) -> &str {
        self.location.as_str()
    }

    /// Returns last sequence number.
    #[inline]
    pub fn last_sequence_number(&self) -> i64 {
        self.last_sequence_number
    }

    /// Next sequence number for a new snapshot.
    #[inline]
    pub fn next_sequence_number(&self) -> i64 {
        self.last_sequence_number + 1
    }

    /// Returns last updated time in milliseconds.
    #[inline]
    pub fn last_updated_ms(&self) -> i64 {
        self.last_updated_ms
    }

    /// Returns the last column id.
    #[inline]
    pub fn last_column_id(&self) -> i32 {
        self.last_column_id
    }

    /// Returns schemas
    #[inline]
    pub fn schemas_iter(&self) -> impl ExactSizeIterator<Item = &SchemaRef> {
        self.schemas.iter()
    }

    /// Lookup schema by id.
    #[inline]
    pub fn schema_by_id(&self, schema_id: i32) -> Option<&SchemaRef> {
        self.schemas.iter().find(|s| s.schema_id() == schema_id)
    }

    /// Get current schema
    #[inline]
    pub fn current_schema(&self) -> Option<&SchemaRef> {
        self.schema_by_id(self.current_schema_id)
    }

    /// Get the id of the current schema
    #[inline]
    pub fn current_schema_id(&self) -> i32 {
        self.current_schema_id
    }

    /// Returns properties of table.
    #[inline]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Typed view of the table properties.
    pub fn table_properties(&self) -> Result<TableProperties> {
        TableProperties::try_from(&self.properties)
    }

    /// Returns all snapshots
    #[inline]
    pub fn snapshots(&self) -> impl ExactSizeIterator<Item = &SnapshotRef> {
        self.snapshots.iter()
    }

    /// Lookup snapshot by id.
    #[inline]
    pub fn snapshot_by_id(&self, snapshot_id: i64) -> Option<&SnapshotRef> {
        self.snapshots
            .iter()
            .find(|s| s.snapshot_id() == snapshot_id)
    }

    /// Returns snapshot history.
    #[inline]
    pub fn history(&self) -> &[SnapshotLog] {
        &self.snapshot_log
    }

    /// Returns the metadata log.
    #[inline]
    pub fn metadata_log(&self) -> &[MetadataLog] {
        &self.metadata_log
    }

    /// Get current snapshot id
    #[inline]
    pub fn current_snapshot_id(&self) -> Option<i64> {
        self.current_snapshot_id
    }

    /// Get current snapshot
    #[inline]
    pub fn current_snapshot(&self) -> Option<&SnapshotRef> {
        self.current_snapshot_id.and_then(|id| self.snapshot_by_id(id))
    }

    /// Return all references of this table.
    #[inline]
    pub fn refs(&self) -> &HashMap<String, SnapshotReference> {
        &self.refs
    }

    /// Get the snapshot for a reference
    /// Returns an option if the `ref_name` is not found
    #[inline]
    pub fn snapshot_for_ref(&self, ref_name: &str) -> Option<&SnapshotRef> {
        self.refs
            .get(ref_name)
            .and_then(|r| self.snapshot_by_id(r.snapshot_id))
    }
}

/// Manipulating table metadata.
///
/// For this builder the order of called functions matters. Functions are applied in-order.
#[derive(Debug, Clone)]
pub struct TableMetadataBuilder {
    metadata: TableMetadata,
    /// Location of the metadata file the builder started from.
    previous_location: Option<String>,
    /// Id of the schema most recently added by this builder.
    last_added_schema_id: Option<i32>,
    changed: bool,
}

/// Result of modifying or creating a `TableMetadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadataBuildResult {
    /// The new `TableMetadata`.
    pub metadata: TableMetadata,
}

impl TableMetadataBuilder {
    /// Id passed to [`Self::set_current_schema`] to select the last added schema.
    pub const LAST_ADDED: i32 = -1;

    /// Create a `TableMetadata` object from scratch.
    ///
    /// This method re-assign ids of fields in the schema, schema.id, sort_order.id and
    /// spec.id. It should only be used to create new table metadata from scratch.
    pub fn new(
        schema: Schema,
        location: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Result<Self> {
        let location = location.into();
        if location.is_empty() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Table location must not be empty",
            ));
        }
        let now = Utc::now().timestamp_millis();
        let schema = schema.with_schema_id(super::DEFAULT_SCHEMA_ID);
        let metadata = TableMetadata {
            format_version: FORMAT_VERSION,
            table_uuid: Uuid::new_v4(),
            location,
            last_sequence_number: 0,
            last_updated_ms: now,
            last_column_id: schema.highest_field_id(),
            current_schema_id: schema.schema_id(),
            schemas: vec![Arc::new(schema)],
            partition_specs: vec![PartitionSpec {
                spec_id: 0,
                fields: vec![],
            }],
            default_spec_id: 0,
            last_partition_id: UNPARTITIONED_LAST_ASSIGNED_ID,
            properties,
            current_snapshot_id: None,
            snapshots: vec![],
            snapshot_log: vec![],
            metadata_log: vec![],
            sort_orders: vec![SortOrder {
                order_id: 0,
                fields: vec![],
            }],
            default_sort_order_id: 0,
            refs: HashMap::new(),
        };
        Ok(Self {
            metadata,
            previous_location: None,
            last_added_schema_id: None,
            changed: true,
        })
    }

    fn new_from_metadata(metadata: TableMetadata, previous_location: Option<String>) -> Self {
        Self {
            metadata,
            previous_location,
            last_added_schema_id: None,
            changed: false,
        }
    }

    /// Add a schema to the table metadata.
    ///
    /// The new schema gets the next free schema id unless a schema with the
    /// same fields already exists, in which case that one is reused.
    pub fn add_schema(mut self, schema: Schema) -> Result<Self> {
        if let Some(existing) = self
            .metadata
            .schemas
            .iter()
            .find(|s| s.is_same_schema(&schema))
        {
            self.last_added_schema_id = Some(existing.schema_id());
            return Ok(self);
        }

        let schema_id = self
            .metadata
            .schemas
            .iter()
            .map(|s| s.schema_id())
            .max()
            .map_or(super::DEFAULT_SCHEMA_ID, |id| id + 1);
        let schema = schema.with_schema_id(schema_id);
        self.metadata.last_column_id = self
            .metadata
            .last_column_id
            .max(schema.highest_field_id());
        self.metadata.schemas.push(Arc::new(schema));
        self.last_added_schema_id = Some(schema_id);
        self.changed = true;
        Ok(self)
    }

    /// Set the current schema id.
    ///
    /// If `schema_id` is -1, the last added schema is set as the current schema.
    pub fn set_current_schema(mut self, mut schema_id: i32) -> Result<Self> {
        if schema_id == Self::LAST_ADDED {
            schema_id = self.last_added_schema_id.ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    "Cannot set current schema to last added schema: no schema has been added.",
                )
            })?;
        }
        if self.metadata.schema_by_id(schema_id).is_none() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Cannot set current schema to unknown schema with id: '{schema_id}'"),
            ));
        }
        if self.metadata.current_schema_id != schema_id {
            self.metadata.current_schema_id = schema_id;
            self.changed = true;
        }
        Ok(self)
    }

    /// Add a snapshot to the table metadata.
    ///
    /// # Errors
    /// - Snapshot id already exists.
    /// - Sequence number of the snapshot is not above the table's last sequence number.
    pub fn add_snapshot(mut self, snapshot: Snapshot) -> Result<Self> {
        if self.metadata.snapshot_by_id(snapshot.snapshot_id()).is_some() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Snapshot already exists for: '{}'",
                    snapshot.snapshot_id()
                ),
            ));
        }
        if snapshot.sequence_number() <= self.metadata.last_sequence_number {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Cannot add snapshot with sequence number {} older than last sequence number {}",
                    snapshot.sequence_number(),
                    self.metadata.last_sequence_number
                ),
            ));
        }

        self.metadata.last_sequence_number = snapshot.sequence_number();
        self.metadata.last_updated_ms = self.metadata.last_updated_ms.max(snapshot.timestamp_ms());
        self.metadata.snapshots.push(Arc::new(snapshot));
        self.changed = true;
        Ok(self)
    }

    /// Points `ref_name` at a snapshot. Moving `main` changes the current
    /// snapshot and appends to the snapshot log.
    pub fn set_ref(mut self, ref_name: &str, reference: SnapshotReference) -> Result<Self> {
        let snapshot = self
            .metadata
            .snapshot_by_id(reference.snapshot_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!(
                        "Cannot set '{ref_name}' to unknown snapshot: '{}'",
                        reference.snapshot_id
                    ),
                )
            })?
            .clone();

        if self.metadata.refs.get(ref_name) == Some(&reference) {
            return Ok(self);
        }

        if ref_name == MAIN_BRANCH {
            self.metadata.current_snapshot_id = Some(snapshot.snapshot_id());
            self.metadata.snapshot_log.push(SnapshotLog {
                snapshot_id: snapshot.snapshot_id(),
                timestamp_ms: snapshot.timestamp_ms(),
            });
        }
        self.metadata.refs.insert(ref_name.to_string(), reference);
        self.changed = true;
        Ok(self)
    }

    /// Convenience for moving the `main` branch.
    pub fn set_branch_snapshot(self, snapshot_id: i64) -> Result<Self> {
        self.set_ref(MAIN_BRANCH, SnapshotReference::branch(snapshot_id))
    }

    /// Remove snapshots by their ids from the table metadata.
    ///
    /// Refs pointing at removed snapshots and snapshot log entries for them are
    /// removed as well. Removing the current snapshot is rejected.
    pub fn remove_snapshots(mut self, snapshot_ids: &[i64]) -> Result<Self> {
        if let Some(current) = self.metadata.current_snapshot_id
            && snapshot_ids.contains(&current)
        {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Cannot remove current snapshot {current}"),
            ));
        }

        let before = self.metadata.snapshots.len();
        self.metadata
            .snapshots
            .retain(|s| !snapshot_ids.contains(&s.snapshot_id()));
        if self.metadata.snapshots.len() == before {
            return Ok(self);
        }

        self.metadata
            .refs
            .retain(|_, r| !snapshot_ids.contains(&r.snapshot_id));
        self.metadata
            .snapshot_log
            .retain(|entry| !snapshot_ids.contains(&entry.snapshot_id));
        self.changed = true;
        Ok(self)
    }

    /// Drops metadata log entries written before `timestamp_ms`.
    pub fn remove_metadata_log_before(mut self, timestamp_ms: i64) -> Self {
        let before = self.metadata.metadata_log.len();
        self.metadata
            .metadata_log
            .retain(|entry| entry.timestamp_ms >= timestamp_ms);
        if self.metadata.metadata_log.len() != before {
            self.changed = true;
        }
        self
    }

    /// Set properties. If a property already exists, it will be overwritten.
    pub fn set_properties(mut self, properties: HashMap<String, String>) -> Result<Self> {
        if properties.is_empty() {
            return Ok(self);
        }
        self.metadata.properties.extend(properties);
        self.changed = true;
        Ok(self)
    }

    /// Build the table metadata.
    ///
    /// When the builder started from a stored metadata file and anything
    /// changed, that file is appended to the metadata log.
    pub fn build(mut self) -> Result<TableMetadataBuildResult> {
        if self.changed {
            if let Some(previous) = self.previous_location.take() {
                self.metadata.metadata_log.push(MetadataLog {
                    metadata_file: previous,
                    timestamp_ms: self.metadata.last_updated_ms,
                });
            }
            self.metadata.last_updated_ms = self
                .metadata
                .last_updated_ms
                .max(Utc::now().timestamp_millis());
        }

        let max_size = self
            .metadata
            .table_properties()?
            .metadata_previous_versions_max
            .max(1);
        let log = &mut self.metadata.metadata_log;
        if log.len() > max_size {
            log.drain(0..log.len() - max_size);
        }

        if self.metadata.current_schema().is_none() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Current schema is missing from table metadata",
            ));
        }

        Ok(TableMetadataBuildResult {
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::{NestedField, Operation, PrimitiveType, Summary};

    pub(crate) fn test_schema() -> Schema {
        Schema::from_columns([("key", PrimitiveType::String), ("value", PrimitiveType::Int)])
            .unwrap()
    }

    pub(crate) fn snapshot(id: i64, parent: Option<i64>, seq: i64, ts: i64) -> Snapshot {
        Snapshot::builder()
            .snapshot_id(id)
            .parent_snapshot_id(parent)
            .sequence_number(seq)
            .timestamp_ms(ts)
            .manifest_list(format!("s3://b/t/metadata/snap-{id}-1-x.avro"))
            .summary(Summary {
                operation: Operation::Append,
                additional_properties: HashMap::new(),
            })
            .schema_id(Some(0))
            .build()
    }

    /// Metadata with a linear chain of snapshots `1 <- 2 <- ... <- n`, where
    /// snapshot `i` was committed at `i * 1000` ms and `n` is current.
    pub(crate) fn metadata_with_chain(n: i64) -> TableMetadata {
        let mut builder = TableMetadataBuilder::new(test_schema(), "s3://b/t", HashMap::new())
            .unwrap();
        for id in 1..=n {
            builder = builder
                .add_snapshot(snapshot(id, (id > 1).then_some(id - 1), id, id * 1000))
                .unwrap()
                .set_branch_snapshot(id)
                .unwrap();
        }
        builder.build().unwrap().metadata
    }

    #[test]
    fn test_new_metadata_json() {
        let metadata = TableMetadataBuilder::new(test_schema(), "s3://b/t", HashMap::new())
            .unwrap()
            .build()
            .unwrap()
            .metadata;
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["format-version"], 2);
        assert_eq!(json["location"], "s3://b/t");
        assert_eq!(json["last-column-id"], 2);
        assert_eq!(json["current-schema-id"], 0);
        assert_eq!(json["last-partition-id"], 999);
        assert!(json.get("current-snapshot-id").is_none());

        let parsed = TableMetadata::parse(&serde_json::to_vec(&metadata).unwrap()).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_parse_treats_minus_one_as_no_snapshot() {
        let metadata = metadata_with_chain(0);
        let mut json = serde_json::to_value(&metadata).unwrap();
        json["current-snapshot-id"] = serde_json::json!(-1);
        let parsed = TableMetadata::parse(&serde_json::to_vec(&json).unwrap()).unwrap();
        assert_eq!(parsed.current_snapshot_id(), None);
    }

    #[test]
    fn test_parse_rejects_v1_and_garbage() {
        let metadata = metadata_with_chain(0);
        let mut json = serde_json::to_value(&metadata).unwrap();
        json["format-version"] = serde_json::json!(1);
        let err = TableMetadata::parse(&serde_json::to_vec(&json).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FeatureUnsupported);

        let err = TableMetadata::parse(b"{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[test]
    fn test_snapshot_chain() {
        let metadata = metadata_with_chain(3);
        assert_eq!(metadata.current_snapshot_id(), Some(3));
        assert_eq!(metadata.last_sequence_number(), 3);
        assert_eq!(metadata.history().len(), 3);
        assert_eq!(metadata.snapshot_for_ref(MAIN_BRANCH).unwrap().snapshot_id(), 3);
    }

    #[test]
    fn test_add_snapshot_rejects_stale_sequence_number() {
        let metadata = metadata_with_chain(2);
        let err = metadata
            .into_builder(None)
            .add_snapshot(snapshot(9, Some(2), 2, 9000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[test]
    fn test_remove_snapshots() {
        let metadata = metadata_with_chain(3)
            .into_builder(None)
            .remove_snapshots(&[1, 2])
            .unwrap()
            .build()
            .unwrap()
            .metadata;
        assert_eq!(metadata.snapshots().len(), 1);
        assert_eq!(metadata.history().len(), 1);

        let err = metadata
            .into_builder(None)
            .remove_snapshots(&[3])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[test]
    fn test_metadata_log_tracks_previous_file() {
        let metadata = metadata_with_chain(1);
        let updated = metadata
            .into_builder(Some("s3://b/t/metadata/00000-a.metadata.json".to_string()))
            .set_properties(HashMap::from([("k".to_string(), "v".to_string())]))
            .unwrap()
            .build()
            .unwrap()
            .metadata;
        assert_eq!(updated.metadata_log().len(), 1);
        assert_eq!(
            updated.metadata_log()[0].metadata_file,
            "s3://b/t/metadata/00000-a.metadata.json"
        );

        // Unchanged metadata does not grow the log.
        let unchanged = updated
            .clone()
            .into_builder(Some("s3://b/t/metadata/00001-b.metadata.json".to_string()))
            .build()
            .unwrap()
            .metadata;
        assert_eq!(unchanged.metadata_log().len(), 1);

        let pruned = unchanged
            .into_builder(None)
            .remove_metadata_log_before(i64::MAX)
            .build()
            .unwrap()
            .metadata;
        assert!(pruned.metadata_log().is_empty());
    }

    #[test]
    fn test_metadata_log_is_capped() {
        let mut metadata = metadata_with_chain(0)
            .into_builder(None)
            .set_properties(HashMap::from([(
                TableProperties::PROPERTY_METADATA_PREVIOUS_VERSIONS_MAX.to_string(),
                "2".to_string(),
            )]))
            .unwrap()
            .build()
            .unwrap()
            .metadata;
        for version in 0..4 {
            metadata = metadata
                .into_builder(Some(format!("s3://b/t/metadata/{version:05}-x.metadata.json")))
                .set_properties(HashMap::from([("v".to_string(), version.to_string())]))
                .unwrap()
                .build()
                .unwrap()
                .metadata;
        }
        let files: Vec<_> = metadata
            .metadata_log()
            .iter()
            .map(|l| l.metadata_file.as_str())
            .collect();
        assert_eq!(
            files,
            vec![
                "s3://b/t/metadata/00002-x.metadata.json",
                "s3://b/t/metadata/00003-x.metadata.json"
            ]
        );
    }

    #[test]
    fn test_add_schema_and_set_current() {
        let metadata = metadata_with_chain(0);
        let evolved = metadata
            .current_schema()
            .unwrap()
            .with_added_field(NestedField::optional(3, "new_col", PrimitiveType::Int))
            .unwrap();
        let metadata = metadata
            .into_builder(None)
            .add_schema(evolved)
            .unwrap()
            .set_current_schema(TableMetadataBuilder::LAST_ADDED)
            .unwrap()
            .build()
            .unwrap()
            .metadata;
        assert_eq!(metadata.current_schema_id(), 1);
        assert_eq!(metadata.last_column_id(), 3);
        assert_eq!(metadata.schemas_iter().len(), 2);
    }
}
