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

use std::str::FromStr;

use arrow_array::RecordBatch;

use super::{HistoryTable, SnapshotsTable};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

/// Separator between a table name and a metadata table type, as in
/// `"orders$snapshots"`.
pub const METADATA_TABLE_SEPARATOR: char = '$';

/// Metadata table is used to inspect a table's history and snapshots as a table.
#[derive(Debug)]
pub struct MetadataTable<'a>(&'a Table);

/// Metadata table type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumIter,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetadataTableType {
    /// [`SnapshotsTable`]
    Snapshots,
    /// [`HistoryTable`]
    History,
}

impl MetadataTableType {
    /// Returns the string representation of the metadata table type.
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    /// Returns all the metadata table types.
    pub fn all_types() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }

    /// Splits `"<table>$<type>"` into the table name and the metadata table
    /// type. Names without a separator are plain tables.
    pub fn split_table_name(name: &str) -> Result<(&str, Option<Self>)> {
        let Some((table, suffix)) = name.split_once(METADATA_TABLE_SEPARATOR) else {
            return Ok((name, None));
        };
        let ty = Self::from_str(suffix).map_err(|e| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Invalid metadata table type: {suffix}"),
            )
            .with_source(e)
        })?;
        Ok((table, Some(ty)))
    }
}

impl<'a> MetadataTable<'a> {
    /// Creates a new metadata scan.
    pub fn new(table: &'a Table) -> Self {
        Self(table)
    }

    /// Get the snapshots table.
    pub fn snapshots(&self) -> SnapshotsTable<'_> {
        SnapshotsTable::new(self.0)
    }

    /// Get the history table.
    pub fn history(&self) -> HistoryTable<'_> {
        HistoryTable::new(self.0)
    }

    /// Scans the metadata table of the given type.
    pub fn scan(&self, ty: MetadataTableType) -> Result<RecordBatch> {
        match ty {
            MetadataTableType::Snapshots => self.snapshots().scan(),
            MetadataTableType::History => self.history().scan(),
        }
    }
}
