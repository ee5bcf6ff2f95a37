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

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{EXTERNAL_TABLE, HiveDatabase, HiveTable, Metastore};
use crate::{Error, ErrorKind, Result};

#[derive(Debug)]
struct DatabaseEntry {
    database: HiveDatabase,
    tables: BTreeMap<String, HiveTable>,
}

/// A metastore held in process memory with Hive semantics.
#[derive(Debug, Default)]
pub struct MemoryMetastore {
    databases: Mutex<HashMap<String, DatabaseEntry>>,
}

impl MemoryMetastore {
    /// Creates an empty metastore.
    pub fn new() -> Self {
        Self::default()
    }
}

fn database_not_found(name: &str) -> Error {
    Error::new(
        ErrorKind::NamespaceNotFound,
        format!("Schema not found: {name}"),
    )
}

fn table_not_found(database: &str, name: &str) -> Error {
    Error::new(
        ErrorKind::TableNotFound,
        format!("Table not found: {database}.{name}"),
    )
}

fn table_mut<'a>(
    databases: &'a mut HashMap<String, DatabaseEntry>,
    database: &str,
    name: &str,
) -> Result<&'a mut HiveTable> {
    databases
        .get_mut(database)
        .ok_or_else(|| database_not_found(database))?
        .tables
        .get_mut(name)
        .ok_or_else(|| table_not_found(database, name))
}

#[async_trait]
impl Metastore for MemoryMetastore {
    async fn create_database(&self, mut database: HiveDatabase) -> Result<()> {
        database.name = database.name.to_lowercase();
        let mut databases = self.databases.lock().await;
        if databases.contains_key(&database.name) {
            return Err(Error::new(
                ErrorKind::NamespaceAlreadyExists,
                format!("Schema already exists: {}", database.name),
            ));
        }
        debug!(database = %database.name, "Creating database");
        databases.insert(database.name.clone(), DatabaseEntry {
            database,
            tables: BTreeMap::new(),
        });
        Ok(())
    }

    async fn get_database(&self, name: &str) -> Result<Option<HiveDatabase>> {
        let databases = self.databases.lock().await;
        Ok(databases
            .get(&name.to_lowercase())
            .map(|entry| entry.database.clone()))
    }

    async fn rename_database(&self, from: &str, _to: &str) -> Result<()> {
        Err(Error::new(
            ErrorKind::FeatureUnsupported,
            "Hive metastore does not support renaming schemas",
        )
        .with_context("schema", from))
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let database = database.to_lowercase();
        let databases = self.databases.lock().await;
        let entry = databases
            .get(&database)
            .ok_or_else(|| database_not_found(&database))?;
        Ok(entry.tables.keys().cloned().collect())
    }

    async fn create_table(&self, mut table: HiveTable) -> Result<()> {
        table.database_name = table.database_name.to_lowercase();
        table.table_name = table.table_name.to_lowercase();
        let mut databases = self.databases.lock().await;
        let entry = databases
            .get_mut(&table.database_name)
            .ok_or_else(|| database_not_found(&table.database_name))?;
        if entry.tables.contains_key(&table.table_name) {
            return Err(Error::new(
                ErrorKind::TableAlreadyExists,
                format!(
                    "Table already exists: {}.{}",
                    table.database_name, table.table_name
                ),
            ));
        }
        debug!(
            database = %table.database_name,
            table = %table.table_name,
            "Creating table"
        );
        entry.tables.insert(table.table_name.clone(), table);
        Ok(())
    }

    async fn get_table(&self, database: &str, name: &str) -> Result<Option<HiveTable>> {
        let databases = self.databases.lock().await;
        Ok(databases
            .get(&database.to_lowercase())
            .and_then(|entry| entry.tables.get(&name.to_lowercase()))
            .cloned())
    }

    async fn drop_table(&self, database: &str, name: &str, purge_data: bool) -> Result<()> {
        let (database, name) = (database.to_lowercase(), name.to_lowercase());
        let mut databases = self.databases.lock().await;
        let entry = databases
            .get_mut(&database)
            .ok_or_else(|| database_not_found(&database))?;
        let table = entry
            .tables
            .get(&name)
            .ok_or_else(|| table_not_found(&database, &name))?;
        if purge_data && table.table_type != EXTERNAL_TABLE {
            return Err(Error::new(
                ErrorKind::FeatureUnsupported,
                "Purging managed table data is not supported",
            ));
        }
        entry.tables.remove(&name);
        debug!(%database, table = %name, purge_data, "Dropped table");
        Ok(())
    }

    async fn read_parameter(
        &self,
        database: &str,
        name: &str,
        key: &str,
    ) -> Result<Option<String>> {
        let (database, name) = (database.to_lowercase(), name.to_lowercase());
        let databases = self.databases.lock().await;
        let table = databases
            .get(&database)
            .ok_or_else(|| database_not_found(&database))?
            .tables
            .get(&name)
            .ok_or_else(|| table_not_found(&database, &name))?;
        Ok(table.parameters.get(key).cloned())
    }

    async fn write_parameter(
        &self,
        database: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let (database, name) = (database.to_lowercase(), name.to_lowercase());
        let mut databases = self.databases.lock().await;
        table_mut(&mut databases, &database, &name)?
            .parameters
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn swap_parameters(
        &self,
        database: &str,
        name: &str,
        key: &str,
        expected: Option<&str>,
        updates: HashMap<String, String>,
    ) -> Result<()> {
        let (database, name) = (database.to_lowercase(), name.to_lowercase());
        let mut databases = self.databases.lock().await;
        let table = table_mut(&mut databases, &database, &name)?;
        let current = table.parameters.get(key).map(String::as_str);
        if current != expected {
            return Err(Error::new(
                ErrorKind::CommitConflict,
                format!("Table {database}.{name} was updated concurrently"),
            )
            .with_context("expected", expected.unwrap_or("<none>"))
            .with_context("actual", current.unwrap_or("<none>"))
            .with_retryable(true));
        }
        table.parameters.extend(updates);
        Ok(())
    }
}
