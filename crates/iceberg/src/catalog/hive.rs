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

//! Catalog backed by a Hive metastore.
//!
//! The metastore holds the `metadata_location` pointer of each table; the
//! metadata documents live in object storage. A commit writes a new document
//! and then swaps the pointer, expecting the value observed at load time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    Catalog, LOCATION_PROPERTY, Namespace, NamespaceIdent, TableCommit, TableCreation, TableIdent,
};
use crate::hms::{
    HiveDatabase, HiveTable, METADATA_LOCATION_PROP, Metastore, PREVIOUS_METADATA_LOCATION_PROP,
};
use crate::io::FileIO;
use crate::location::{TableLocation, has_doubled_slash, normalize, parse_metadata_version};
use crate::spec::{TableMetadata, TableMetadataBuilder};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

/// Timeout applied to every metastore call unless configured otherwise.
pub const DEFAULT_METASTORE_TIMEOUT: Duration = Duration::from_secs(10);

const TIMEOUT_CONTEXT: &str = "timeout";

/// Hive metastore catalog.
#[derive(Debug, Clone)]
pub struct HiveCatalog {
    metastore: Arc<dyn Metastore>,
    file_io: FileIO,
    timeout: Duration,
}

/// A loaded table together with the location its metadata was read from.
///
/// The two differ for legacy pointers with doubled slashes.
struct LoadedTable {
    pointer: String,
    resolved: String,
    metadata: TableMetadata,
}

impl HiveCatalog {
    /// Create a catalog over a metastore and the storage holding table files.
    pub fn new(metastore: Arc<dyn Metastore>, file_io: FileIO) -> Self {
        Self {
            metastore,
            file_io,
            timeout: DEFAULT_METASTORE_TIMEOUT,
        }
    }

    /// Set the timeout applied to each metastore call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The storage holding table files.
    pub fn file_io(&self) -> &FileIO {
        &self.file_io
    }

    /// The underlying metastore.
    pub fn metastore(&self) -> &Arc<dyn Metastore> {
        &self.metastore
    }

    /// The `metadata_location` parameter of a table as stored, without
    /// reading the metadata it points to.
    pub async fn metadata_location(&self, ident: &TableIdent) -> Result<Option<String>> {
        self.call(
            "read_parameter",
            self.metastore.read_parameter(
                ident.namespace().name(),
                ident.name(),
                METADATA_LOCATION_PROP,
            ),
        )
        .await
    }

    /// Runs one metastore call under the configured timeout.
    ///
    /// An elapsed timeout is not retryable: a swap may or may not have been
    /// applied.
    async fn call<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::new(
                ErrorKind::TransientIo,
                format!("Metastore call {op} timed out"),
            )
            .with_context(TIMEOUT_CONTEXT, format!("{:?}", self.timeout))
            .with_retryable(false)),
        }
    }

    async fn hive_table(&self, ident: &TableIdent) -> Result<HiveTable> {
        let table = self
            .call(
                "get_table",
                self.metastore
                    .get_table(ident.namespace().name(), ident.name()),
            )
            .await?
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::TableNotFound,
                    format!("Table not found: {ident}"),
                )
            })?;
        if !table.is_iceberg() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Table {ident} is not an Iceberg table"),
            ));
        }
        Ok(table)
    }

    /// Reads a metadata document, trying the normalized location first for
    /// legacy pointers and falling back to the raw key.
    async fn read_metadata(&self, pointer: &str) -> Result<(TableMetadata, String)> {
        let resolved = if has_doubled_slash(pointer) {
            let normalized = normalize(pointer, &[])?;
            match self.file_io.read(&normalized).await {
                Ok(bytes) => return Ok((parse_metadata(&bytes, &normalized)?, normalized)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(
                        pointer,
                        normalized = %normalized,
                        "Normalized metadata location not found, reading legacy location"
                    );
                    pointer.to_string()
                }
                Err(e) => return Err(e),
            }
        } else {
            pointer.to_string()
        };
        let bytes = self.file_io.read(&resolved).await?;
        Ok((parse_metadata(&bytes, &resolved)?, resolved))
    }

    async fn load(&self, ident: &TableIdent) -> Result<LoadedTable> {
        let hive_table = self.hive_table(ident).await?;
        let pointer = hive_table
            .metadata_location()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("Table {ident} has no {METADATA_LOCATION_PROP} parameter"),
                )
            })?
            .to_string();
        let (metadata, resolved) = self.read_metadata(&pointer).await?;
        Ok(LoadedTable {
            pointer,
            resolved,
            metadata,
        })
    }

    async fn write_metadata(&self, location: &str, metadata: &TableMetadata) -> Result<()> {
        let bytes = serde_json::to_vec(metadata)?;
        self.file_io.write(location, bytes.into()).await
    }

    /// Removes a metadata file that was written but never committed.
    async fn discard_metadata(&self, location: &str) {
        if let Err(e) = self.file_io.delete(location).await {
            warn!(location, error = %e, "Failed to delete uncommitted metadata file");
        }
    }

    fn table(&self, ident: TableIdent, location: String, metadata: TableMetadata) -> Table {
        Table::builder()
            .file_io(self.file_io.clone())
            .metadata_location(location)
            .metadata(metadata)
            .identifier(ident)
            .build()
    }
}

fn parse_metadata(bytes: &[u8], location: &str) -> Result<TableMetadata> {
    TableMetadata::parse(bytes).map_err(|e| e.with_context("metadata_location", location))
}

fn is_timeout(e: &Error) -> bool {
    e.context_value(TIMEOUT_CONTEXT).is_some()
}

#[async_trait]
impl Catalog for HiveCatalog {
    async fn create_namespace(
        &self,
        namespace: &NamespaceIdent,
        mut properties: HashMap<String, String>,
    ) -> Result<Namespace> {
        let location = properties
            .remove(LOCATION_PROPERTY)
            .map(|l| normalize(&l, &[]))
            .transpose()?;
        let mut database = HiveDatabase::new(namespace.name().to_lowercase(), location);
        database.parameters = properties;
        self.call("create_database", self.metastore.create_database(database))
            .await?;
        info!(namespace = %namespace, "Created namespace");
        self.get_namespace(namespace).await
    }

    async fn get_namespace(&self, namespace: &NamespaceIdent) -> Result<Namespace> {
        let database = self
            .call("get_database", self.metastore.get_database(namespace.name()))
            .await?
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NamespaceNotFound,
                    format!("Schema not found: {namespace}"),
                )
            })?;
        let mut properties = database.parameters;
        if let Some(location) = database.location {
            properties.insert(LOCATION_PROPERTY.to_string(), location);
        }
        Ok(Namespace::with_properties(
            NamespaceIdent::new(database.name),
            properties,
        ))
    }

    async fn namespace_exists(&self, namespace: &NamespaceIdent) -> Result<bool> {
        Ok(self
            .call("get_database", self.metastore.get_database(namespace.name()))
            .await?
            .is_some())
    }

    async fn rename_namespace(&self, from: &NamespaceIdent, to: &NamespaceIdent) -> Result<()> {
        self.call(
            "rename_database",
            self.metastore.rename_database(from.name(), to.name()),
        )
        .await
    }

    async fn list_tables(&self, namespace: &NamespaceIdent) -> Result<Vec<TableIdent>> {
        let names = self
            .call("list_tables", self.metastore.list_tables(namespace.name()))
            .await?;
        Ok(names
            .into_iter()
            .map(|name| TableIdent::new(namespace.clone(), name))
            .collect())
    }

    async fn create_table(
        &self,
        namespace: &NamespaceIdent,
        creation: TableCreation,
    ) -> Result<Table> {
        let ns = self.get_namespace(namespace).await?;
        let ident = TableIdent::new(ns.name().clone(), creation.name.to_lowercase());
        if self.table_exists(&ident).await? {
            return Err(Error::new(
                ErrorKind::TableAlreadyExists,
                format!("Table already exists: {ident}"),
            ));
        }

        let location = match &creation.location {
            Some(location) => TableLocation::new(location)?,
            None => {
                let schema_location = ns.location().ok_or_else(|| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        format!(
                            "Schema {namespace} has no location; a table location must be given"
                        ),
                    )
                })?;
                TableLocation::for_new_table(schema_location, ident.name())?
            }
        };

        let metadata =
            TableMetadataBuilder::new(creation.schema, location.as_str(), creation.properties)?
                .build()?
                .metadata;
        let metadata_location = location.metadata_file(0);
        self.write_metadata(&metadata_location, &metadata).await?;

        let hive_table = HiveTable::new_iceberg(
            ident.namespace().name(),
            ident.name(),
            location.as_str(),
            metadata_location.as_str(),
        );
        if let Err(e) = self
            .call("create_table", self.metastore.create_table(hive_table))
            .await
        {
            if !is_timeout(&e) {
                self.discard_metadata(&metadata_location).await;
            }
            return Err(e);
        }

        info!(
            table = %ident,
            location = %location.as_str(),
            metadata_location = %metadata_location,
            "Created table"
        );
        Ok(self.table(ident, metadata_location, metadata))
    }

    async fn load_table(&self, ident: &TableIdent) -> Result<Table> {
        let loaded = self.load(ident).await?;
        debug!(table = %ident, metadata_location = %loaded.resolved, "Loaded table");
        Ok(self.table(ident.clone(), loaded.pointer, loaded.metadata))
    }

    async fn drop_table(&self, ident: &TableIdent) -> Result<()> {
        self.call(
            "drop_table",
            self.metastore
                .drop_table(ident.namespace().name(), ident.name(), false),
        )
        .await?;
        info!(table = %ident, "Dropped table from metastore, files retained");
        Ok(())
    }

    async fn table_exists(&self, ident: &TableIdent) -> Result<bool> {
        Ok(self
            .call(
                "get_table",
                self.metastore
                    .get_table(ident.namespace().name(), ident.name()),
            )
            .await?
            .is_some())
    }

    async fn register_table(
        &self,
        ident: &TableIdent,
        metadata_location: String,
    ) -> Result<Table> {
        self.get_namespace(ident.namespace()).await?;
        let (metadata, _) = self.read_metadata(&metadata_location).await?;
        let location = TableLocation::new(metadata.location())?;
        let hive_table = HiveTable::new_iceberg(
            ident.namespace().name(),
            ident.name(),
            location.as_str(),
            metadata_location.as_str(),
        );
        self.call("create_table", self.metastore.create_table(hive_table))
            .await?;
        info!(table = %ident, metadata_location = %metadata_location, "Registered table");
        Ok(self.table(ident.clone(), metadata_location, metadata))
    }

    async fn update_table(&self, mut commit: TableCommit) -> Result<Table> {
        let ident = commit.identifier().clone();
        let LoadedTable {
            pointer,
            resolved,
            metadata,
        } = self.load(&ident).await?;

        for requirement in commit.take_requirements() {
            requirement.check(Some(&metadata))?;
        }

        let mut builder = metadata.into_builder(Some(resolved.clone()));
        for update in commit.take_updates() {
            builder = update.apply(builder)?;
        }
        let metadata = builder.build()?.metadata;

        let version = parse_metadata_version(&resolved).map_or(0, |v| v + 1);
        let new_location = TableLocation::new(metadata.location())?.metadata_file(version);
        self.write_metadata(&new_location, &metadata).await?;

        let updates = HashMap::from([
            (METADATA_LOCATION_PROP.to_string(), new_location.clone()),
            (PREVIOUS_METADATA_LOCATION_PROP.to_string(), pointer.clone()),
        ]);
        let swap = self
            .call(
                "swap_parameters",
                self.metastore.swap_parameters(
                    ident.namespace().name(),
                    ident.name(),
                    METADATA_LOCATION_PROP,
                    Some(&pointer),
                    updates,
                ),
            )
            .await;
        if let Err(e) = swap {
            if is_timeout(&e) {
                warn!(
                    table = %ident,
                    metadata_location = %new_location,
                    "Commit outcome unknown after metastore timeout"
                );
            } else {
                self.discard_metadata(&new_location).await;
            }
            return Err(e);
        }

        info!(
            table = %ident,
            previous = %pointer,
            metadata_location = %new_location,
            "Committed table metadata"
        );
        Ok(self.table(ident, new_location, metadata))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::TableUpdate;
    use crate::catalog::TableRequirement;
    use crate::hms::MemoryMetastore;
    use crate::io::MemoryStorage;
    use crate::spec::tests::test_schema;
    use crate::transaction::tests::data_file;
    use crate::transaction::{ApplyTransactionAction, ExpireSnapshotsAction, Transaction};

    async fn catalog() -> (HiveCatalog, Arc<MemoryMetastore>) {
        let storage = MemoryStorage::new();
        storage.create_bucket("b").await;
        let metastore = Arc::new(MemoryMetastore::new());
        let catalog = HiveCatalog::new(metastore.clone(), FileIO::new(Arc::new(storage)));
        catalog
            .create_namespace(
                &NamespaceIdent::new("s"),
                HashMap::from([(LOCATION_PROPERTY.to_string(), "s3://b/s/".to_string())]),
            )
            .await
            .unwrap();
        (catalog, metastore)
    }

    async fn create(catalog: &HiveCatalog, location: Option<&str>) -> Table {
        let creation = TableCreation::builder()
            .name("T".to_string())
            .schema(test_schema());
        let creation = match location {
            Some(location) => creation.location(location).build(),
            None => creation.build(),
        };
        catalog
            .create_table(&NamespaceIdent::new("s"), creation)
            .await
            .unwrap()
    }

    fn set_property(table: &Table, key: &str) -> TableCommit {
        TableCommit::builder()
            .ident(table.identifier().clone())
            .requirements(vec![TableRequirement::UuidMatch {
                uuid: table.metadata().uuid(),
            }])
            .updates(vec![TableUpdate::SetProperties {
                updates: HashMap::from([(key.to_string(), "v".to_string())]),
            }])
            .build()
    }

    #[tokio::test]
    async fn test_create_table_with_trailing_slash_location() {
        let (catalog, _) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t/")).await;

        assert_eq!(table.identifier().to_string(), "s.t");
        assert_eq!(table.metadata().location(), "s3://b/s/t");
        let pointer = table.metadata_location().unwrap();
        assert!(pointer.starts_with("s3://b/s/t/metadata/00000-"));
        assert!(!pointer.contains('#'));
        assert!(catalog.file_io().exists(pointer).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_table_under_schema_location() {
        let (catalog, _) = catalog().await;
        let table = create(&catalog, None).await;
        assert!(table.metadata().location().starts_with("s3://b/s/t-"));

        let err = catalog
            .create_table(
                &NamespaceIdent::new("s"),
                TableCreation::builder()
                    .name("t".to_string())
                    .schema(test_schema())
                    .build(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TableAlreadyExists);
    }

    #[tokio::test]
    async fn test_create_table_rejects_fragment() {
        let (catalog, _) = catalog().await;
        let err = catalog
            .create_table(
                &NamespaceIdent::new("s"),
                TableCreation::builder()
                    .name("t".to_string())
                    .location("s3://b/s/t#frag")
                    .schema(test_schema())
                    .build(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLocation);
    }

    #[tokio::test]
    async fn test_update_table_swaps_pointer() {
        let (catalog, metastore) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t")).await;
        let first = table.metadata_location().unwrap().to_string();

        let updated = catalog.update_table(set_property(&table, "a")).await.unwrap();
        let second = updated.metadata_location().unwrap().to_string();
        assert!(second.starts_with("s3://b/s/t/metadata/00001-"));
        assert_eq!(updated.property("a"), Some("v"));
        assert_eq!(updated.metadata().metadata_log().len(), 1);
        assert_eq!(updated.metadata().metadata_log()[0].metadata_file, first);

        assert_eq!(
            metastore
                .read_parameter("s", "t", PREVIOUS_METADATA_LOCATION_PROP)
                .await
                .unwrap(),
            Some(first)
        );
        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(reloaded.metadata_location(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn test_concurrent_pointer_change_is_a_conflict() {
        let (catalog, metastore) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t")).await;

        // Another writer replaces the table under the same name.
        metastore.drop_table("s", "t", false).await.unwrap();
        create(&catalog, Some("s3://b/s/t2")).await;

        let err = catalog
            .update_table(set_property(&table, "a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommitConflict);
        assert!(err.retryable());
    }

    #[tokio::test]
    async fn test_legacy_pointer_is_readable_and_writable() {
        let (catalog, metastore) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t")).await;
        let legacy = table
            .metadata_location()
            .unwrap()
            .replace("/metadata/", "//metadata/");
        metastore
            .write_parameter("s", "t", METADATA_LOCATION_PROP, &legacy)
            .await
            .unwrap();

        let loaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(loaded.metadata_location(), Some(legacy.as_str()));
        assert_eq!(loaded.metadata().uuid(), table.metadata().uuid());

        let updated = catalog.update_table(set_property(&loaded, "a")).await.unwrap();
        assert!(!has_doubled_slash(updated.metadata_location().unwrap()));
        assert_eq!(
            metastore
                .read_parameter("s", "t", PREVIOUS_METADATA_LOCATION_PROP)
                .await
                .unwrap(),
            Some(legacy)
        );
    }

    async fn append(catalog: &HiveCatalog, table: &Table) -> Table {
        let file = data_file(table, 1).await;
        let tx = Transaction::new(table);
        let tx = tx.fast_append().add_data_files([file]).apply(tx).unwrap();
        tx.commit(catalog).await.unwrap()
    }

    #[tokio::test]
    async fn test_metadata_stored_only_under_legacy_key() {
        let (catalog, metastore) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t")).await;
        let pointer = table.metadata_location().unwrap().to_string();
        let legacy = pointer.replace("/metadata/", "//metadata/");
        let bytes = catalog.file_io().read(&pointer).await.unwrap();
        catalog.file_io().write(&legacy, bytes).await.unwrap();
        catalog.file_io().delete(&pointer).await.unwrap();
        metastore
            .write_parameter("s", "t", METADATA_LOCATION_PROP, &legacy)
            .await
            .unwrap();

        let loaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(loaded.metadata_location(), Some(legacy.as_str()));
        assert_eq!(loaded.metadata().uuid(), table.metadata().uuid());

        let appended = append(&catalog, &loaded).await;
        assert!(!has_doubled_slash(appended.metadata_location().unwrap()));
        assert_eq!(
            metastore
                .read_parameter("s", "t", PREVIOUS_METADATA_LOCATION_PROP)
                .await
                .unwrap(),
            Some(legacy)
        );
        let appended = append(&catalog, &appended).await;

        let result = ExpireSnapshotsAction::new()
            .retention_threshold(Duration::ZERO)
            .min_retention(Duration::ZERO)
            .with_clock(Arc::new(|| chrono::Utc::now() + chrono::Duration::seconds(1)))
            .execute(&appended, &catalog)
            .await
            .unwrap();
        assert_eq!(result.deleted_snapshots_count, 1);
        assert_eq!(result.delete_requests_count, 1);

        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        let snapshot = reloaded.metadata().current_snapshot().unwrap();
        assert_eq!(snapshot.snapshot_id(), appended.metadata().current_snapshot_id().unwrap());
        assert!(catalog.file_io().exists(snapshot.manifest_list()).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_namespace_unsupported() {
        let (catalog, _) = catalog().await;
        let err = catalog
            .rename_namespace(&NamespaceIdent::new("s"), &NamespaceIdent::new("s2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FeatureUnsupported);
        assert!(err.message().contains("does not support renaming schemas"));
    }

    #[tokio::test]
    async fn test_drop_table_keeps_files() {
        let (catalog, _) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t")).await;
        catalog.drop_table(table.identifier()).await.unwrap();

        assert!(!catalog.table_exists(table.identifier()).await.unwrap());
        assert!(
            catalog
                .file_io()
                .exists(table.metadata_location().unwrap())
                .await
                .unwrap()
        );

        let registered = catalog
            .register_table(
                table.identifier(),
                table.metadata_location().unwrap().to_string(),
            )
            .await
            .unwrap();
        assert_eq!(registered.metadata().uuid(), table.metadata().uuid());
    }

    #[derive(Debug, Default)]
    struct StalledMetastore {
        inner: MemoryMetastore,
    }

    #[async_trait]
    impl Metastore for StalledMetastore {
        async fn create_database(&self, database: HiveDatabase) -> Result<()> {
            self.inner.create_database(database).await
        }

        async fn get_database(&self, _name: &str) -> Result<Option<HiveDatabase>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn rename_database(&self, from: &str, to: &str) -> Result<()> {
            self.inner.rename_database(from, to).await
        }

        async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
            self.inner.list_tables(database).await
        }

        async fn create_table(&self, table: HiveTable) -> Result<()> {
            self.inner.create_table(table).await
        }

        async fn get_table(&self, database: &str, name: &str) -> Result<Option<HiveTable>> {
            self.inner.get_table(database, name).await
        }

        async fn drop_table(&self, database: &str, name: &str, purge_data: bool) -> Result<()> {
            self.inner.drop_table(database, name, purge_data).await
        }

        async fn read_parameter(
            &self,
            _database: &str,
            _name: &str,
            _key: &str,
        ) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn write_parameter(
            &self,
            database: &str,
            name: &str,
            key: &str,
            value: &str,
        ) -> Result<()> {
            self.inner.write_parameter(database, name, key, value).await
        }

        async fn swap_parameters(
            &self,
            database: &str,
            name: &str,
            key: &str,
            expected: Option<&str>,
            updates: HashMap<String, String>,
        ) -> Result<()> {
            self.inner
                .swap_parameters(database, name, key, expected, updates)
                .await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_metastore_timeout() {
        let catalog = HiveCatalog::new(
            Arc::new(StalledMetastore::default()),
            FileIO::new(Arc::new(MemoryStorage::new())),
        )
        .with_timeout(Duration::from_secs(60));

        let err = catalog
            .get_namespace(&NamespaceIdent::new("s"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientIo);
        assert!(!err.retryable());
        assert!(is_timeout(&err));

        let err = catalog
            .metadata_location(&TableIdent::from_strs(["s", "t"]).unwrap())
            .await
            .unwrap_err();
        assert!(is_timeout(&err));
    }

    #[tokio::test]
    async fn test_metadata_location_reads_raw_pointer() {
        let (catalog, metastore) = catalog().await;
        let table = create(&catalog, Some("s3://b/s/t")).await;
        assert_eq!(
            catalog.metadata_location(table.identifier()).await.unwrap(),
            table.metadata_location().map(str::to_string)
        );

        metastore
            .write_parameter("s", "t", METADATA_LOCATION_PROP, "s3://b/s/t//metadata/x")
            .await
            .unwrap();
        assert_eq!(
            catalog.metadata_location(table.identifier()).await.unwrap(),
            Some("s3://b/s/t//metadata/x".to_string())
        );
    }
}
