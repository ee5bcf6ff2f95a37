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

//! Catalog API for Apache Iceberg

mod hive;

use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use async_trait::async_trait;
pub use hive::*;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::spec::{
    Schema, Snapshot, SnapshotReference, TableMetadata, TableMetadataBuilder,
};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

/// Namespace property holding the default location of its tables.
pub const LOCATION_PROPERTY: &str = "location";

/// The catalog API for Iceberg Rust.
#[async_trait]
pub trait Catalog: Debug + Sync + Send {
    /// Create a new namespace inside the catalog.
    async fn create_namespace(
        &self,
        namespace: &NamespaceIdent,
        properties: HashMap<String, String>,
    ) -> Result<Namespace>;

    /// Get a namespace information from the catalog.
    async fn get_namespace(&self, namespace: &NamespaceIdent) -> Result<Namespace>;

    /// Check if namespace exists in catalog.
    async fn namespace_exists(&self, namespace: &NamespaceIdent) -> Result<bool>;

    /// Rename a namespace.
    async fn rename_namespace(&self, from: &NamespaceIdent, to: &NamespaceIdent) -> Result<()>;

    /// List tables from namespace.
    async fn list_tables(&self, namespace: &NamespaceIdent) -> Result<Vec<TableIdent>>;

    /// Create a new table inside the namespace.
    async fn create_table(
        &self,
        namespace: &NamespaceIdent,
        creation: TableCreation,
    ) -> Result<Table>;

    /// Load table from the catalog.
    async fn load_table(&self, table: &TableIdent) -> Result<Table>;

    /// Drop a table from the catalog. Table files are left in place.
    async fn drop_table(&self, table: &TableIdent) -> Result<()>;

    /// Check if a table exists in the catalog.
    async fn table_exists(&self, table: &TableIdent) -> Result<bool>;

    /// Register an existing table to the catalog.
    async fn register_table(&self, table: &TableIdent, metadata_location: String)
    -> Result<Table>;

    /// Update a table to the catalog.
    async fn update_table(&self, commit: TableCommit) -> Result<Table>;
}

/// NamespaceIdent represents the identifier of a namespace in the catalog.
///
/// Hive namespaces have a single level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceIdent(String);

impl NamespaceIdent {
    /// Create a namespace identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The namespace name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for NamespaceIdent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace represents a namespace in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    name: NamespaceIdent,
    properties: HashMap<String, String>,
}

impl Namespace {
    /// Create a namespace with properties.
    pub fn with_properties(name: NamespaceIdent, properties: HashMap<String, String>) -> Self {
        Self { name, properties }
    }

    /// Get the name of the namespace.
    pub fn name(&self) -> &NamespaceIdent {
        &self.name
    }

    /// Get the properties of the namespace.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Default location of tables created in the namespace.
    pub fn location(&self) -> Option<&str> {
        self.properties.get(LOCATION_PROPERTY).map(String::as_str)
    }
}

/// TableIdent represents the identifier of a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdent {
    /// Namespace of the table.
    pub namespace: NamespaceIdent,
    /// Table name.
    pub name: String,
}

impl TableIdent {
    /// Create a new table identifier.
    pub fn new(namespace: NamespaceIdent, name: String) -> Self {
        Self { namespace, name }
    }

    /// Get the namespace of the table.
    pub fn namespace(&self) -> &NamespaceIdent {
        &self.namespace
    }

    /// Get the name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Try to create table identifier from an iterator of exactly two strings.
    pub fn from_strs(iter: impl IntoIterator<Item = impl ToString>) -> Result<Self> {
        let parts: Vec<String> = iter.into_iter().map(|s| s.to_string()).collect();
        match <[String; 2]>::try_from(parts) {
            Ok([namespace, name]) if !namespace.is_empty() && !name.is_empty() => Ok(Self {
                namespace: NamespaceIdent::new(namespace),
                name,
            }),
            Ok(_) => Err(Error::new(
                ErrorKind::DataInvalid,
                "Table identifier parts must not be empty",
            )),
            Err(parts) => Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Table identifier needs a schema and a name, got {} parts",
                    parts.len()
                ),
            )),
        }
    }
}

impl Display for TableIdent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// TableCreation represents the creation of a table in the catalog.
#[derive(Debug, TypedBuilder)]
pub struct TableCreation {
    /// The name of the table.
    pub name: String,
    /// The location of the table. Defaults to a directory under the
    /// namespace location.
    #[builder(default, setter(strip_option, into))]
    pub location: Option<String>,
    /// The schema of the table.
    pub schema: Schema,
    /// The properties of the table.
    #[builder(default)]
    pub properties: HashMap<String, String>,
}

/// TableCommit represents the commit of a table in the catalog.
#[derive(Debug, TypedBuilder)]
#[builder(build_method(vis = "pub(crate)"))]
pub struct TableCommit {
    /// The table ident.
    ident: TableIdent,
    /// The requirements of the table.
    ///
    /// Commit will fail if the requirements are not met.
    requirements: Vec<TableRequirement>,
    /// The updates of the table.
    updates: Vec<TableUpdate>,
}

impl TableCommit {
    /// Return the table identifier.
    pub fn identifier(&self) -> &TableIdent {
        &self.ident
    }

    /// Take all requirements.
    pub fn take_requirements(&mut self) -> Vec<TableRequirement> {
        std::mem::take(&mut self.requirements)
    }

    /// Take all updates.
    pub fn take_updates(&mut self) -> Vec<TableUpdate> {
        std::mem::take(&mut self.updates)
    }
}

/// TableRequirement represents a requirement for a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRequirement {
    /// The table's UUID must match the requirement.
    UuidMatch {
        /// Uuid of original table.
        uuid: Uuid,
    },
    /// The table branch or tag identified by the requirement's `reference` must
    /// reference the requirement's `snapshot-id`.
    RefSnapshotIdMatch {
        /// The reference of the table to assert.
        r#ref: String,
        /// The snapshot id of the table to assert.
        /// If the id is `None`, the ref must not already exist.
        snapshot_id: Option<i64>,
    },
    /// The table's current schema id must match the requirement.
    CurrentSchemaIdMatch {
        /// Current schema id of the table to assert.
        current_schema_id: i32,
    },
    /// The table's last assigned column id must match the requirement.
    LastAssignedFieldIdMatch {
        /// The last assigned field id of the table to assert.
        last_assigned_field_id: i32,
    },
}

impl TableRequirement {
    /// Check that the requirement is met by the table metadata.
    ///
    /// Failures are retryable commit conflicts: the caller rebuilds its
    /// changes on refreshed metadata.
    pub fn check(&self, metadata: Option<&TableMetadata>) -> Result<()> {
        let Some(metadata) = metadata else {
            return Err(Error::new(
                ErrorKind::TableNotFound,
                "Requirement failed: table does not exist",
            ));
        };

        let conflict = |message: String| {
            Err(Error::new(ErrorKind::CommitConflict, message).with_retryable(true))
        };
        match self {
            TableRequirement::UuidMatch { uuid } => {
                if metadata.uuid() != *uuid {
                    return conflict(format!(
                        "Requirement failed: table uuid changed from {uuid} to {}",
                        metadata.uuid()
                    ));
                }
            }
            TableRequirement::RefSnapshotIdMatch {
                r#ref,
                snapshot_id,
            } => {
                let current = metadata.refs().get(r#ref).map(|r| r.snapshot_id);
                if current != *snapshot_id {
                    return conflict(format!(
                        "Requirement failed: branch or tag {ref} changed from {snapshot_id:?} to {current:?}"
                    ));
                }
            }
            TableRequirement::CurrentSchemaIdMatch { current_schema_id } => {
                if metadata.current_schema_id() != *current_schema_id {
                    return conflict(format!(
                        "Requirement failed: current schema changed from {current_schema_id} to {}",
                        metadata.current_schema_id()
                    ));
                }
            }
            TableRequirement::LastAssignedFieldIdMatch {
                last_assigned_field_id,
            } => {
                if metadata.last_column_id() != *last_assigned_field_id {
                    return conflict(format!(
                        "Requirement failed: last assigned field id changed from {last_assigned_field_id} to {}",
                        metadata.last_column_id()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// TableUpdate represents an update to a table in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum TableUpdate {
    /// Add a new schema to the table
    AddSchema {
        /// The schema to add.
        schema: Schema,
    },
    /// Set table's current schema. `-1` selects the last added schema.
    SetCurrentSchema {
        /// Schema ID to set as current
        schema_id: i32,
    },
    /// Add snapshot to table.
    AddSnapshot {
        /// Snapshot to add.
        snapshot: Snapshot,
    },
    /// Set table's snapshot ref.
    SetSnapshotRef {
        /// Name of snapshot reference to set.
        ref_name: String,
        /// Snapshot reference to set.
        reference: SnapshotReference,
    },
    /// Remove table's snapshots
    RemoveSnapshots {
        /// Snapshot ids to remove.
        snapshot_ids: Vec<i64>,
    },
    /// Update table's properties.
    SetProperties {
        /// Properties to update for table.
        updates: HashMap<String, String>,
    },
    /// Drop metadata log entries older than a timestamp.
    RemoveMetadataLogEntries {
        /// Entries written before this time are removed.
        older_than_ms: i64,
    },
}

impl TableUpdate {
    /// Applies the update to the table metadata builder.
    pub fn apply(self, builder: TableMetadataBuilder) -> Result<TableMetadataBuilder> {
        match self {
            TableUpdate::AddSchema { schema } => builder.add_schema(schema),
            TableUpdate::SetCurrentSchema { schema_id } => builder.set_current_schema(schema_id),
            TableUpdate::AddSnapshot { snapshot } => builder.add_snapshot(snapshot),
            TableUpdate::SetSnapshotRef {
                ref_name,
                reference,
            } => builder.set_ref(&ref_name, reference),
            TableUpdate::RemoveSnapshots { snapshot_ids } => {
                builder.remove_snapshots(&snapshot_ids)
            }
            TableUpdate::SetProperties { updates } => builder.set_properties(updates),
            TableUpdate::RemoveMetadataLogEntries { older_than_ms } => {
                Ok(builder.remove_metadata_log_before(older_than_ms))
            }
        }
    }
}
