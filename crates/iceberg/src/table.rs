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

//! Handle to a loaded Iceberg table.

use std::collections::HashMap;

use typed_builder::TypedBuilder;

use crate::inspect::MetadataTable;
use crate::io::FileIO;
use crate::scan::TableScanBuilder;
use crate::spec::{SchemaRef, TableMetadata, TableMetadataRef};
use crate::{Error, ErrorKind, Result, TableIdent};

/// A table as seen at one metadata version.
///
/// Tables are immutable snapshots of catalog state: committing a
/// [`Transaction`](crate::transaction::Transaction) yields a new `Table`
/// and leaves this one untouched.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Table {
    file_io: FileIO,
    /// Pointer the table was loaded through, as stored in the metastore.
    #[builder(default, setter(strip_option, into))]
    metadata_location: Option<String>,
    #[builder(setter(into))]
    metadata: TableMetadataRef,
    identifier: TableIdent,
}

impl Table {
    pub(crate) fn with_metadata(self, metadata: TableMetadataRef) -> Self {
        Self { metadata, ..self }
    }

    /// Catalog identifier of the table.
    pub fn identifier(&self) -> &TableIdent {
        &self.identifier
    }

    /// Metadata of this version.
    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    /// Shared handle to the metadata of this version.
    pub fn metadata_ref(&self) -> TableMetadataRef {
        self.metadata.clone()
    }

    /// The metadata pointer the table was loaded through. Legacy pointers keep
    /// their doubled slash here.
    pub fn metadata_location(&self) -> Option<&str> {
        self.metadata_location.as_deref()
    }

    /// Like [`Table::metadata_location`], failing for tables built without one.
    pub fn metadata_location_result(&self) -> Result<&str> {
        self.metadata_location().ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Table {} has no metadata location", self.identifier),
            )
        })
    }

    /// File IO over the table's object storage.
    pub fn file_io(&self) -> &FileIO {
        &self.file_io
    }

    /// Starts building a scan of the table's rows.
    pub fn scan(&self) -> TableScanBuilder<'_> {
        TableScanBuilder::new(self)
    }

    /// Metadata tables such as `$snapshots`.
    pub fn inspect(&self) -> MetadataTable<'_> {
        MetadataTable::new(self)
    }

    /// Current schema of the table.
    pub fn current_schema_ref(&self) -> Result<SchemaRef> {
        self.metadata.current_schema().cloned().ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Table {} has no current schema", self.identifier),
            )
        })
    }

    /// Table properties.
    pub fn properties(&self) -> &HashMap<String, String> {
        self.metadata.properties()
    }

    /// One table property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties().get(key).map(String::as_str)
    }
}
