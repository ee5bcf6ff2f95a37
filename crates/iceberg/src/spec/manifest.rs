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

//! Manifests and manifest lists, stored as Avro container files.
//!
//! Tables written by this crate are unpartitioned, so the records carry no
//! partition tuple or column statistics.

use std::sync::LazyLock;

use apache_avro::{Reader, Schema as AvroSchema, Writer, from_value, to_value};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::io::FileIO;

/// Format of a data file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DataFileFormat {
    /// Apache Parquet
    Parquet,
    /// Apache ORC. Accepted in configuration, never written.
    Orc,
    /// Apache Avro
    Avro,
}

impl DataFileFormat {
    /// File name extension of the format.
    pub fn extension(&self) -> &'static str {
        match self {
            DataFileFormat::Parquet => "parquet",
            DataFileFormat::Orc => "orc",
            DataFileFormat::Avro => "avro",
        }
    }
}

/// Used to track additions and deletions in ManifestEntry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ManifestStatus {
    /// Value: 0
    Existing = 0,
    /// Value: 1
    Added = 1,
    /// Value: 2
    Deleted = 2,
}

impl TryFrom<i32> for ManifestStatus {
    type Error = Error;

    fn try_from(v: i32) -> Result<ManifestStatus> {
        match v {
            0 => Ok(ManifestStatus::Existing),
            1 => Ok(ManifestStatus::Added),
            2 => Ok(ManifestStatus::Deleted),
            _ => Err(Error::new(
                ErrorKind::DataInvalid,
                format!("manifest status {v} is invalid"),
            )),
        }
    }
}

/// A data file referenced from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    /// Always 0: data. Delete files are never written.
    pub content: i32,
    /// Full URI for the file with FS scheme
    pub file_path: String,
    /// String file format name, AVRO, ORC or PARQUET
    pub file_format: String,
    /// Number of records in this file
    pub record_count: i64,
    /// Total file size in bytes
    pub file_size_in_bytes: i64,
}

impl DataFile {
    /// Describes a freshly written data file.
    pub fn new(
        file_path: impl Into<String>,
        file_format: DataFileFormat,
        record_count: u64,
        file_size_in_bytes: u64,
    ) -> Self {
        Self {
            content: 0,
            file_path: file_path.into(),
            file_format: file_format.to_string().to_uppercase(),
            record_count: record_count as i64,
            file_size_in_bytes: file_size_in_bytes as i64,
        }
    }

    /// Parsed format of the file.
    pub fn file_format(&self) -> Result<DataFileFormat> {
        self.file_format.parse().map_err(|e| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Unknown data file format {}", self.file_format),
            )
            .with_source(e)
        })
    }
}

/// A manifest is an immutable Avro file that lists data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Used to track additions and deletions.
    pub status: i32,
    /// Snapshot id where the file was added, or deleted if status is 2.
    pub snapshot_id: i64,
    /// Data sequence number of the file.
    pub sequence_number: i64,
    /// File sequence number indicating when the file was added.
    pub file_sequence_number: i64,
    /// File path, partition tuple, metrics, …
    pub data_file: DataFile,
}

impl ManifestEntry {
    /// An entry for a data file added by `snapshot_id`.
    pub fn added(snapshot_id: i64, sequence_number: i64, data_file: DataFile) -> Self {
        Self {
            status: ManifestStatus::Added as i32,
            snapshot_id,
            sequence_number,
            file_sequence_number: sequence_number,
            data_file,
        }
    }

    /// Status of the entry.
    pub fn status(&self) -> Result<ManifestStatus> {
        ManifestStatus::try_from(self.status)
    }

    /// Added or existing entries reference live files.
    pub fn is_alive(&self) -> bool {
        matches!(
            self.status(),
            Ok(ManifestStatus::Added | ManifestStatus::Existing)
        )
    }

    /// File path of the referenced data file.
    #[inline]
    pub fn file_path(&self) -> &str {
        &self.data_file.file_path
    }

    /// File size of the referenced data file.
    #[inline]
    pub fn file_size_in_bytes(&self) -> u64 {
        self.data_file.file_size_in_bytes.max(0) as u64
    }
}

const MANIFEST_ENTRY_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "manifest_entry",
  "fields": [
    {"name": "status", "type": "int", "field-id": 0},
    {"name": "snapshot_id", "type": "long", "field-id": 1},
    {"name": "sequence_number", "type": "long", "field-id": 3},
    {"name": "file_sequence_number", "type": "long", "field-id": 4},
    {"name": "data_file", "field-id": 2, "type": {
      "type": "record",
      "name": "r2",
      "fields": [
        {"name": "content", "type": "int", "field-id": 134},
        {"name": "file_path", "type": "string", "field-id": 100},
        {"name": "file_format", "type": "string", "field-id": 101},
        {"name": "record_count", "type": "long", "field-id": 103},
        {"name": "file_size_in_bytes", "type": "long", "field-id": 104}
      ]
    }}
  ]
}
"#;

const MANIFEST_FILE_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "manifest_file",
  "fields": [
    {"name": "manifest_path", "type": "string", "field-id": 500},
    {"name": "manifest_length", "type": "long", "field-id": 501},
    {"name": "partition_spec_id", "type": "int", "field-id": 502},
    {"name": "content", "type": "int", "field-id": 517},
    {"name": "sequence_number", "type": "long", "field-id": 515},
    {"name": "min_sequence_number", "type": "long", "field-id": 516},
    {"name": "added_snapshot_id", "type": "long", "field-id": 503},
    {"name": "added_files_count", "type": "int", "field-id": 504},
    {"name": "existing_files_count", "type": "int", "field-id": 505},
    {"name": "deleted_files_count", "type": "int", "field-id": 506},
    {"name": "added_rows_count", "type": "long", "field-id": 512},
    {"name": "existing_rows_count", "type": "long", "field-id": 513},
    {"name": "deleted_rows_count", "type": "long", "field-id": 514}
  ]
}
"#;

static MANIFEST_ENTRY_AVRO_SCHEMA: LazyLock<std::result::Result<AvroSchema, String>> =
    LazyLock::new(|| AvroSchema::parse_str(MANIFEST_ENTRY_SCHEMA).map_err(|e| e.to_string()));

static MANIFEST_FILE_AVRO_SCHEMA: LazyLock<std::result::Result<AvroSchema, String>> =
    LazyLock::new(|| AvroSchema::parse_str(MANIFEST_FILE_SCHEMA).map_err(|e| e.to_string()));

fn avro_schema(
    schema: &'static LazyLock<std::result::Result<AvroSchema, String>>,
) -> Result<&'static AvroSchema> {
    schema.as_ref().map_err(|e| {
        Error::new(ErrorKind::Unexpected, "Invalid built-in avro schema")
            .with_source(anyhow::anyhow!("{e}"))
    })
}

fn write_container<T: Serialize>(
    schema: &AvroSchema,
    metadata: &[(&str, String)],
    records: &[T],
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(schema, Vec::new());
    for (key, value) in metadata {
        writer.add_user_metadata(key.to_string(), value)?;
    }
    for record in records {
        writer.append(to_value(record)?)?;
    }
    Ok(writer.into_inner()?)
}

fn read_container<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<Vec<T>> {
    let reader = Reader::new(bytes)?;
    reader
        .map(|value| Ok(from_value::<T>(&value?)?))
        .collect()
}

/// A manifest: the data files added by one commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Create a manifest from its entries.
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Entries of the manifest.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Parse a manifest from the bytes of an Avro file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            entries: read_container(bytes)?,
        })
    }

    /// Encode the manifest as an Avro container file.
    pub fn to_avro_bytes(&self, schema_json: &str) -> Result<Vec<u8>> {
        write_container(
            avro_schema(&MANIFEST_ENTRY_AVRO_SCHEMA)?,
            &[
                ("schema", schema_json.to_string()),
                ("partition-spec-id", "0".to_string()),
                ("format-version", "2".to_string()),
                ("content", "data".to_string()),
            ],
            &self.entries,
        )
    }

    /// Writes the manifest to `path` and describes it for a manifest list.
    pub async fn write(
        &self,
        file_io: &FileIO,
        path: &str,
        schema_json: &str,
        snapshot_id: i64,
        sequence_number: i64,
    ) -> Result<ManifestFile> {
        let bytes = self.to_avro_bytes(schema_json)?;
        let manifest_length = bytes.len() as i64;
        file_io.write(path, bytes.into()).await?;

        let added = self
            .entries
            .iter()
            .filter(|e| e.status == ManifestStatus::Added as i32);
        Ok(ManifestFile {
            manifest_path: path.to_string(),
            manifest_length,
            partition_spec_id: 0,
            content: 0,
            sequence_number,
            min_sequence_number: self
                .entries
                .iter()
                .map(|e| e.sequence_number)
                .min()
                .unwrap_or(sequence_number),
            added_snapshot_id: snapshot_id,
            added_files_count: added.clone().count() as i32,
            existing_files_count: 0,
            deleted_files_count: 0,
            added_rows_count: added.map(|e| e.data_file.record_count).sum(),
            existing_rows_count: 0,
            deleted_rows_count: 0,
        })
    }
}

/// Entry in a manifest list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Location of the manifest file
    pub manifest_path: String,
    /// Length of the manifest file in bytes.
    pub manifest_length: i64,
    /// ID of a partition spec used to write the manifest.
    pub partition_spec_id: i32,
    /// 0: data, 1: deletes
    pub content: i32,
    /// The sequence number when the manifest was added to the table.
    pub sequence_number: i64,
    /// The minimum data sequence number of all live data or delete files.
    pub min_sequence_number: i64,
    /// ID of the snapshot where the manifest file was added
    pub added_snapshot_id: i64,
    /// Number of entries with status ADDED.
    pub added_files_count: i32,
    /// Number of entries with status EXISTING.
    pub existing_files_count: i32,
    /// Number of entries with status DELETED.
    pub deleted_files_count: i32,
    /// Number of rows in all files with status ADDED.
    pub added_rows_count: i64,
    /// Number of rows in all files with status EXISTING.
    pub existing_rows_count: i64,
    /// Number of rows in all files with status DELETED.
    pub deleted_rows_count: i64,
}

impl ManifestFile {
    /// Load the manifest this entry points to.
    pub async fn load_manifest(&self, file_io: &FileIO) -> Result<Manifest> {
        let bytes = file_io.read(&self.manifest_path).await?;
        Manifest::parse(&bytes).map_err(|e| e.with_context("manifest", self.manifest_path.clone()))
    }
}

/// Snapshots are embedded in table metadata, but the list of manifests for a
/// snapshot are stored in a separate manifest list file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestList {
    entries: Vec<ManifestFile>,
}

impl ManifestList {
    /// Create a manifest list from its entries.
    pub fn new(entries: Vec<ManifestFile>) -> Self {
        Self { entries }
    }

    /// Parse a manifest list from the bytes of an Avro file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            entries: read_container(bytes)?,
        })
    }

    /// Get the entries in the manifest list.
    pub fn entries(&self) -> &[ManifestFile] {
        &self.entries
    }

    /// Take ownership of the entries in the manifest list, consuming it
    pub fn consume_entries(self) -> impl IntoIterator<Item = ManifestFile> {
        self.entries
    }

    /// Encodes the list as an Avro container file.
    pub fn to_avro_bytes(
        &self,
        snapshot_id: i64,
        parent_snapshot_id: Option<i64>,
        sequence_number: i64,
    ) -> Result<Vec<u8>> {
        let mut metadata = vec![
            ("snapshot-id", snapshot_id.to_string()),
            ("sequence-number", sequence_number.to_string()),
            ("format-version", "2".to_string()),
        ];
        metadata.push((
            "parent-snapshot-id",
            parent_snapshot_id.map_or_else(|| "null".to_string(), |id| id.to_string()),
        ));
        write_container(
            avro_schema(&MANIFEST_FILE_AVRO_SCHEMA)?,
            &metadata,
            &self.entries,
        )
    }
}
