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

//! Hive metastore model and the operations the catalog consumes.
//!
//! The metastore stores one mutable datum per Iceberg table: the
//! `metadata_location` table parameter. Commits swap it with
//! [`Metastore::swap_parameters`], which fails with a retryable
//! [`ErrorKind::CommitConflict`](crate::ErrorKind::CommitConflict) when the
//! observed value is stale.

mod memory;

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
pub use memory::*;

use crate::Result;

/// Table parameter holding the current metadata file.
pub const METADATA_LOCATION_PROP: &str = "metadata_location";
/// Table parameter holding the metadata file replaced by the last commit.
pub const PREVIOUS_METADATA_LOCATION_PROP: &str = "previous_metadata_location";
/// Table parameter marking the table format.
pub const TABLE_TYPE_PROP: &str = "table_type";
/// Value of [`TABLE_TYPE_PROP`] for Iceberg tables.
pub const ICEBERG_TABLE_TYPE_VALUE: &str = "ICEBERG";
/// Hive table type of Iceberg tables; dropping one never removes files.
pub const EXTERNAL_TABLE: &str = "EXTERNAL_TABLE";

/// A Hive database, exposed as a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveDatabase {
    /// Database name, lower case.
    pub name: String,
    /// Default location for tables of this database.
    pub location: Option<String>,
    /// Free-form parameters.
    pub parameters: HashMap<String, String>,
}

impl HiveDatabase {
    /// Creates a database description.
    pub fn new(name: impl Into<String>, location: Option<String>) -> Self {
        Self {
            name: name.into(),
            location,
            parameters: HashMap::new(),
        }
    }
}

/// A Hive table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveTable {
    /// Owning database.
    pub database_name: String,
    /// Table name, lower case.
    pub table_name: String,
    /// Table location.
    pub location: String,
    /// Hive table type, such as [`EXTERNAL_TABLE`].
    pub table_type: String,
    /// Table parameters.
    pub parameters: HashMap<String, String>,
}

impl HiveTable {
    /// Describes an Iceberg table whose current metadata is `metadata_location`.
    pub fn new_iceberg(
        database_name: impl Into<String>,
        table_name: impl Into<String>,
        location: impl Into<String>,
        metadata_location: impl Into<String>,
    ) -> Self {
        Self {
            database_name: database_name.into(),
            table_name: table_name.into(),
            location: location.into(),
            table_type: EXTERNAL_TABLE.to_string(),
            parameters: HashMap::from([
                (
                    TABLE_TYPE_PROP.to_string(),
                    ICEBERG_TABLE_TYPE_VALUE.to_string(),
                ),
                ("EXTERNAL".to_string(), "TRUE".to_string()),
                (METADATA_LOCATION_PROP.to_string(), metadata_location.into()),
            ]),
        }
    }

    /// Whether the entry describes an Iceberg table.
    pub fn is_iceberg(&self) -> bool {
        self.parameters
            .get(TABLE_TYPE_PROP)
            .is_some_and(|v| v.eq_ignore_ascii_case(ICEBERG_TABLE_TYPE_VALUE))
    }

    /// The current metadata pointer, verbatim.
    pub fn metadata_location(&self) -> Option<&str> {
        self.parameters
            .get(METADATA_LOCATION_PROP)
            .map(String::as_str)
    }
}

/// Operations of a Hive metastore consumed by the catalog.
///
/// Names are case-insensitive; implementations store them in lower case.
#[async_trait]
pub trait Metastore: Debug + Send + Sync {
    /// Creates a database. Fails with `NamespaceAlreadyExists` if present.
    async fn create_database(&self, database: HiveDatabase) -> Result<()>;

    /// Looks up a database.
    async fn get_database(&self, name: &str) -> Result<Option<HiveDatabase>>;

    /// Renames a database.
    async fn rename_database(&self, from: &str, to: &str) -> Result<()>;

    /// Names of all tables in a database.
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;

    /// Creates a table entry. Fails with `TableAlreadyExists` if present.
    async fn create_table(&self, table: HiveTable) -> Result<()>;

    /// Looks up a table entry.
    async fn get_table(&self, database: &str, name: &str) -> Result<Option<HiveTable>>;

    /// Removes a table entry. External tables keep their files even when
    /// `purge_data` is set.
    async fn drop_table(&self, database: &str, name: &str, purge_data: bool) -> Result<()>;

    /// Reads one table parameter.
    async fn read_parameter(&self, database: &str, name: &str, key: &str)
    -> Result<Option<String>>;

    /// Writes one table parameter unconditionally.
    async fn write_parameter(&self, database: &str, name: &str, key: &str, value: &str)
    -> Result<()>;

    /// Applies `updates` only if parameter `key` currently equals `expected`.
    async fn swap_parameters(
        &self,
        database: &str,
        name: &str,
        key: &str,
        expected: Option<&str>,
        updates: HashMap<String, String>,
    ) -> Result<()>;
}
