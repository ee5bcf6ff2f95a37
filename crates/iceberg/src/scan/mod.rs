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

//! Table scan api.

mod reader;

use arrow_array::RecordBatch;
use futures::{StreamExt, TryStreamExt, stream};
pub use reader::read_data_file;
use tracing::debug;

use crate::arrow::record_batch_to_rows;
use crate::io::FileIO;
use crate::spec::{DataFile, Row, Schema, SchemaRef, SnapshotRef};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Builder to create table scan.
pub struct TableScanBuilder<'a> {
    table: &'a Table,
    // Defaults to none which means select all columns
    column_names: Option<Vec<String>>,
    snapshot_id: Option<i64>,
    concurrency_limit: usize,
}

impl<'a> TableScanBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            column_names: None,
            snapshot_id: None,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
        }
    }

    /// Select all columns.
    pub fn select_all(mut self) -> Self {
        self.column_names = None;
        self
    }

    /// Select some columns of the table, matched case-insensitively.
    pub fn select(mut self, column_names: impl IntoIterator<Item = impl ToString>) -> Self {
        self.column_names = Some(
            column_names
                .into_iter()
                .map(|item| item.to_string())
                .collect(),
        );
        self
    }

    /// Set the snapshot to scan. When not set, it uses current snapshot.
    pub fn snapshot_id(mut self, snapshot_id: i64) -> Self {
        self.snapshot_id = Some(snapshot_id);
        self
    }

    /// Sets the number of files read concurrently.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    /// Build the table scan.
    pub fn build(self) -> Result<TableScan> {
        let metadata = self.table.metadata();
        let (snapshot, schema) = match self.snapshot_id {
            Some(snapshot_id) => {
                let snapshot = metadata.snapshot_by_id(snapshot_id).ok_or_else(|| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        format!("Snapshot with id {snapshot_id} not found"),
                    )
                })?;
                let schema = match snapshot.schema_id() {
                    Some(id) => metadata.schema_by_id(id).cloned().ok_or_else(|| {
                        Error::new(
                            ErrorKind::DataInvalid,
                            format!("Schema {id} of snapshot {snapshot_id} not found"),
                        )
                    })?,
                    None => self.table.current_schema_ref()?,
                };
                (Some(snapshot.clone()), schema)
            }
            None => (
                metadata.current_snapshot().cloned(),
                self.table.current_schema_ref()?,
            ),
        };

        let schema = match self.column_names {
            None => schema,
            Some(names) => {
                let fields = names
                    .iter()
                    .map(|name| {
                        schema.field_by_name(name).cloned().ok_or_else(|| {
                            Error::new(
                                ErrorKind::DataInvalid,
                                format!("Column {name} not found in table"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                SchemaRef::new(Schema::new(schema.schema_id(), fields)?)
            }
        };

        Ok(TableScan {
            file_io: self.table.file_io().clone(),
            snapshot,
            schema,
            concurrency_limit: self.concurrency_limit,
        })
    }
}

/// Table scan.
#[derive(Debug)]
pub struct TableScan {
    file_io: FileIO,
    snapshot: Option<SnapshotRef>,
    schema: SchemaRef,
    concurrency_limit: usize,
}

impl TableScan {
    /// Snapshot being scanned, none for a table without data.
    pub fn snapshot(&self) -> Option<&SnapshotRef> {
        self.snapshot.as_ref()
    }

    /// Projected schema of the rows returned.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Returns the live data files of the scanned snapshot.
    pub async fn plan_files(&self) -> Result<Vec<DataFile>> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(vec![]);
        };
        let manifest_list = snapshot.load_manifest_list(&self.file_io).await?;
        let manifests = stream::iter(manifest_list.entries())
            .map(|manifest| manifest.load_manifest(&self.file_io))
            .buffered(self.concurrency_limit)
            .try_collect::<Vec<_>>()
            .await?;

        let files = manifests
            .iter()
            .flat_map(|manifest| manifest.entries())
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.data_file.clone())
            .collect::<Vec<_>>();
        debug!(
            snapshot_id = snapshot.snapshot_id(),
            files = files.len(),
            "Planned table scan"
        );
        Ok(files)
    }

    /// Reads the projected columns of every planned file.
    pub async fn to_arrow(&self) -> Result<Vec<RecordBatch>> {
        let files = self.plan_files().await?;
        let batches = stream::iter(files.iter())
            .map(|file| read_data_file(&self.file_io, file, &self.schema))
            .buffered(self.concurrency_limit)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Reads the projected columns of every planned file as rows.
    pub async fn to_rows(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for batch in self.to_arrow().await? {
            rows.extend(record_batch_to_rows(&batch)?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::HiveCatalog;
    use crate::arrow::rows_to_record_batch;
    use crate::spec::{DataFileFormat, Datum, PrimitiveType};
    use crate::transaction::tests::{catalog, create_table};
    use crate::transaction::{ApplyTransactionAction, Transaction};
    use crate::writer::DataFileWriterBuilder;

    async fn insert(catalog: &HiveCatalog, table: &Table, rows: Vec<Row>) -> Table {
        let builder = DataFileWriterBuilder::for_table(table, DataFileFormat::Parquet).unwrap();
        let mut writer = builder.build().unwrap();
        let batch = rows_to_record_batch(&table.current_schema_ref().unwrap(), &rows).unwrap();
        writer.write(batch).await.unwrap();
        let files = writer.close().await.unwrap();

        let tx = Transaction::new(table);
        let tx = tx.fast_append().add_data_files(files).apply(tx).unwrap();
        tx.commit(catalog).await.unwrap()
    }

    fn row(key: &str, value: i32) -> Row {
        vec![Some(Datum::string(key)), Some(Datum::int(value))]
    }

    #[tokio::test]
    async fn test_scan_empty_table() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let scan = table.scan().build().unwrap();
        assert!(scan.snapshot().is_none());
        assert!(scan.to_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_reads_every_snapshot_file() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let table = insert(&catalog, &table, vec![row("one", 1)]).await;
        let first = table.metadata().current_snapshot_id().unwrap();
        let table = insert(&catalog, &table, vec![row("two", 2)]).await;

        let mut rows = table.scan().build().unwrap().to_rows().await.unwrap();
        rows.sort_by_key(|row| row[0].as_ref().and_then(|d| d.as_str()).map(str::to_string));
        assert_eq!(rows, vec![row("one", 1), row("two", 2)]);

        let old = table.scan().snapshot_id(first).build().unwrap();
        assert_eq!(old.plan_files().await.unwrap().len(), 1);
        assert_eq!(old.to_rows().await.unwrap(), vec![row("one", 1)]);
    }

    #[tokio::test]
    async fn test_added_column_reads_as_null() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let table = insert(&catalog, &table, vec![row("one", 1)]).await;

        let tx = Transaction::new(&table);
        let tx = tx
            .update_schema()
            .add_column("new_col", PrimitiveType::Int)
            .apply(tx)
            .unwrap();
        let table = tx.commit(&catalog).await.unwrap();

        let rows = table
            .scan()
            .select(["VALUE", "new_col"])
            .build()
            .unwrap()
            .to_rows()
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![Some(Datum::int(1)), None]]);
    }

    #[tokio::test]
    async fn test_unknown_column_or_snapshot() {
        let catalog = catalog().await;
        let table = create_table(&catalog, "t").await;
        let err = table.scan().select(["missing"]).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
        let err = table.scan().snapshot_id(42).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }
}
