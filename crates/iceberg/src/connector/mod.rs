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

//! The connector surface consumed by a query engine.
//!
//! [`IcebergConnector`] maps the statements an engine issues against Iceberg
//! tables (`CREATE SCHEMA`, `CREATE TABLE [AS]`, `INSERT`,
//! `ALTER TABLE ... ADD COLUMN`, `ALTER TABLE ... EXECUTE EXPIRE_SNAPSHOTS`,
//! `DROP TABLE`, `SELECT`) onto the Hive catalog, the transaction layer and
//! the data file readers and writers. Results are typed rows.

mod config;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use config::*;
use tracing::{info, warn};

use crate::arrow::{record_batch_to_rows, rows_to_record_batch};
use crate::hms::{METADATA_LOCATION_PROP, Metastore};
use crate::inspect::MetadataTableType;
use crate::io::{FileIO, ObjectStorage};
use crate::location::{METADATA_FILE_SUFFIX, TableLocation, parse_metadata_version};
use crate::spec::{Datum, PrimitiveType, Row, Schema, TableProperties};
use crate::table::Table;
use crate::transaction::{
    ApplyTransactionAction, ExpireSnapshotsAction, ExpireSnapshotsResult, Transaction,
};
use crate::writer::DataFileWriterBuilder;
use crate::{
    Catalog, Error, ErrorKind, HiveCatalog, LOCATION_PROPERTY, NamespaceIdent, Result,
    TableCreation, TableIdent,
};

/// Rows returned by a query, with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a result from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the result, returning the rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Values of one column, matched case-insensitively.
    pub fn column(&self, name: &str) -> Result<Vec<Option<Datum>>> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("Column {name} not found in result"),
                )
            })?;
        Ok(self.rows.iter().map(|row| row[idx].clone()).collect())
    }

    /// Keeps only the named columns, in the given order.
    pub fn project(self, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::DataInvalid,
                            format!("Column {name} not found in result"),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns: indices.iter().map(|i| self.columns[*i].clone()).collect(),
            rows: self
                .rows
                .into_iter()
                .map(|row| indices.iter().map(|i| row[*i].clone()).collect())
                .collect(),
        })
    }
}

/// Iceberg connector backed by a Hive metastore and S3-compatible storage.
#[derive(Debug)]
pub struct IcebergConnector {
    config: ConnectorConfig,
    catalog: HiveCatalog,
}

impl IcebergConnector {
    /// Creates a connector over the given metastore and object storage.
    pub fn new(
        config: ConnectorConfig,
        metastore: Arc<dyn Metastore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let catalog = HiveCatalog::new(metastore, FileIO::new(storage))
            .with_timeout(config.metastore_timeout);
        Self { config, catalog }
    }

    /// Catalog configuration.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// The catalog tables are committed through.
    pub fn catalog(&self) -> &HiveCatalog {
        &self.catalog
    }

    /// File IO over the object storage.
    pub fn file_io(&self) -> &FileIO {
        self.catalog.file_io()
    }

    fn ident(schema: &str, table: &str) -> TableIdent {
        TableIdent::new(NamespaceIdent::new(schema), table.to_string())
    }

    /// Loads a table by schema and name.
    pub async fn load_table(&self, schema: &str, table: &str) -> Result<Table> {
        self.catalog.load_table(&Self::ident(schema, table)).await
    }

    /// `CREATE SCHEMA name [WITH (location = ...)]`.
    pub async fn create_schema(&self, name: &str, location: Option<&str>) -> Result<()> {
        let properties = location
            .map(|l| HashMap::from([(LOCATION_PROPERTY.to_string(), l.to_string())]))
            .unwrap_or_default();
        self.catalog
            .create_namespace(&NamespaceIdent::new(name), properties)
            .await?;
        Ok(())
    }

    /// `ALTER SCHEMA from RENAME TO to`.
    pub async fn rename_schema(&self, from: &str, to: &str) -> Result<()> {
        self.catalog
            .rename_namespace(&NamespaceIdent::new(from), &NamespaceIdent::new(to))
            .await
    }

    /// Names of the tables of a schema.
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        Ok(self
            .catalog
            .list_tables(&NamespaceIdent::new(schema))
            .await?
            .into_iter()
            .map(|ident| ident.name)
            .collect())
    }

    /// `CREATE TABLE schema.table (columns) [WITH (location = ...)]`.
    ///
    /// New tables write data files in the configured file format.
    pub async fn create_table<S: ToString>(
        &self,
        schema: &str,
        table: &str,
        columns: impl IntoIterator<Item = (S, PrimitiveType)>,
        location: Option<&str>,
    ) -> Result<Table> {
        let creation = TableCreation {
            name: table.to_string(),
            location: location.map(str::to_string),
            schema: Schema::from_columns(columns)?,
            properties: HashMap::from([(
                TableProperties::PROPERTY_DEFAULT_FILE_FORMAT.to_string(),
                self.config.file_format.to_string().to_uppercase(),
            )]),
        };
        self.catalog
            .create_table(&NamespaceIdent::new(schema), creation)
            .await
    }

    /// `CREATE TABLE schema.table [WITH (location = ...)] AS SELECT ...`.
    ///
    /// The table is dropped again when the rows cannot be written. Returns the
    /// number of rows written.
    pub async fn create_table_as<S: ToString>(
        &self,
        schema: &str,
        table: &str,
        columns: impl IntoIterator<Item = (S, PrimitiveType)>,
        rows: Vec<Row>,
        location: Option<&str>,
    ) -> Result<u64> {
        self.create_table(schema, table, columns, location).await?;
        match self.insert(schema, table, rows).await {
            Ok(count) => Ok(count),
            Err(e) => {
                if let Err(drop_err) = self.drop_table(schema, table).await {
                    warn!(%schema, %table, error = %drop_err, "Failed to drop table after CREATE TABLE AS failed");
                }
                Err(e)
            }
        }
    }

    /// `INSERT INTO schema.table VALUES ...`. Values are coerced to the column
    /// types. Returns the number of rows written.
    pub async fn insert(&self, schema: &str, table: &str, rows: Vec<Row>) -> Result<u64> {
        let table = self.load_table(schema, table).await?;
        if rows.is_empty() {
            return Ok(0);
        }
        let format = table.metadata().table_properties()?.write_format_default;
        let schema = table.current_schema_ref()?;
        let batch = rows_to_record_batch(&schema, &rows)?;

        let mut writer = DataFileWriterBuilder::for_table(&table, format)?.build()?;
        writer.write(batch).await?;
        let data_files = writer.close().await?;

        let tx = Transaction::new(&table);
        let tx = tx.fast_append().add_data_files(data_files).apply(tx)?;
        let table = tx.commit(&self.catalog).await?;
        info!(
            table = %table.identifier(),
            rows = rows.len(),
            %format,
            snapshot_id = ?table.metadata().current_snapshot_id(),
            "Inserted rows"
        );
        Ok(rows.len() as u64)
    }

    /// `ALTER TABLE schema.table ADD COLUMN name type`. Existing data files
    /// are not rewritten; they read the new column as null.
    pub async fn add_column(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        column_type: PrimitiveType,
    ) -> Result<()> {
        let table = self.load_table(schema, table).await?;
        let tx = Transaction::new(&table);
        let tx = tx
            .update_schema()
            .add_column(column, column_type)
            .apply(tx)?;
        tx.commit(&self.catalog).await?;
        Ok(())
    }

    /// `ALTER TABLE schema.table EXECUTE EXPIRE_SNAPSHOTS(retention_threshold => '...')`.
    pub async fn expire_snapshots(
        &self,
        schema: &str,
        table: &str,
        retention_threshold: &str,
        session: &SessionProperties,
    ) -> Result<ExpireSnapshotsResult> {
        let threshold = parse_retention_threshold(retention_threshold)?;
        let table = self.load_table(schema, table).await?;
        ExpireSnapshotsAction::new()
            .retention_threshold(threshold)
            .min_retention(session.expire_snapshots_min_retention(&self.config))
            .execute(&table, &self.catalog)
            .await
    }

    /// `DROP TABLE schema.table`. Only the metastore entry is removed; data and
    /// metadata files stay in the object store.
    pub async fn drop_table(&self, schema: &str, table: &str) -> Result<()> {
        self.catalog.drop_table(&Self::ident(schema, table)).await
    }

    /// `SELECT * FROM schema.table`. A name of the form `table$snapshots` or
    /// `table$history` selects a metadata table.
    pub async fn select(&self, schema: &str, table: &str) -> Result<QueryResult> {
        let (name, metadata_table) = MetadataTableType::split_table_name(table)?;
        let table = self.load_table(schema, name).await?;
        match metadata_table {
            Some(ty) => {
                let batch = table.inspect().scan(ty)?;
                let columns = batch
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect();
                Ok(QueryResult::new(columns, record_batch_to_rows(&batch)?))
            }
            None => {
                let scan = table.scan().build()?;
                let columns = scan
                    .schema()
                    .field_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                Ok(QueryResult::new(columns, scan.to_rows().await?))
            }
        }
    }

    /// `SELECT columns FROM schema.table`.
    pub async fn select_columns(
        &self,
        schema: &str,
        table: &str,
        columns: &[&str],
    ) -> Result<QueryResult> {
        self.select(schema, table).await?.project(columns)
    }

    /// Column names of the current schema of a table.
    pub async fn table_column_names(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let table = self.load_table(schema, table).await?;
        Ok(table
            .current_schema_ref()?
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// The `metadata_location` parameter of a table, exactly as stored in the
    /// metastore.
    pub async fn metadata_location(&self, schema: &str, table: &str) -> Result<String> {
        self.catalog
            .metadata_location(&Self::ident(schema, table))
            .await?
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("Table {schema}.{table} has no {METADATA_LOCATION_PROP}"),
                )
            })
    }

    /// `CALL system.register_table(schema, table, location [, metadata_file_name])`.
    ///
    /// Registers the table at `table_location` using the given metadata file,
    /// or the newest one under `metadata/` when none is given.
    pub async fn register_table(
        &self,
        schema: &str,
        table: &str,
        table_location: &str,
        metadata_file_name: Option<&str>,
    ) -> Result<Table> {
        if !self.config.register_table_procedure_enabled {
            return Err(Error::new(
                ErrorKind::FeatureUnsupported,
                "register_table procedure is disabled",
            ));
        }
        let location = TableLocation::new(table_location)?;
        let metadata_location = match metadata_file_name {
            Some(name) => {
                if name.is_empty() || name.contains('/') {
                    return Err(Error::new(
                        ErrorKind::DataInvalid,
                        format!("Invalid metadata file name: {name}"),
                    ));
                }
                let metadata_location = format!("{}{name}", location.metadata_dir());
                if !self.file_io().exists(&metadata_location).await? {
                    return Err(Error::new(
                        ErrorKind::NotFound,
                        format!("Metadata file does not exist: {metadata_location}"),
                    ));
                }
                metadata_location
            }
            None => self.latest_metadata_location(&location).await?,
        };
        self.catalog
            .register_table(&Self::ident(schema, table), metadata_location)
            .await
    }

    async fn latest_metadata_location(&self, location: &TableLocation) -> Result<String> {
        self.file_io()
            .list(&location.metadata_dir())
            .await?
            .into_iter()
            .map(|entry| entry.location)
            .filter(|l| l.ends_with(METADATA_FILE_SUFFIX))
            .max_by_key(|l| (parse_metadata_version(l), l.clone()))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("No metadata file found in location {}", location.as_str()),
                )
            })
    }
}

fn parse_retention_threshold(value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).map_err(|e| {
        Error::new(
            ErrorKind::DataInvalid,
            format!("Invalid retention_threshold: '{value}'"),
        )
        .with_source(e)
    })
}
