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

//! Writers that turn Arrow record batches into data files of a table.
//!
//! A writer is built for one table and one file format by
//! [`DataFileWriterBuilder`]. Batches are buffered in memory and flushed as a
//! single data file under the table's `data/` directory when the writer is
//! closed. The returned [`DataFile`]s are then committed with a fast append.

mod avro_writer;
mod parquet_writer;

use arrow_array::RecordBatch;
use async_trait::async_trait;
pub use avro_writer::{AvroWriter, avro_schema};
pub use parquet_writer::ParquetWriter;

use crate::io::FileIO;
use crate::location::TableLocation;
use crate::spec::{DataFile, DataFileFormat, SchemaRef};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

/// The writer used to write data to a table.
#[async_trait]
pub trait IcebergWriter: Send {
    /// Write a record batch. Its schema must be the writer's table schema.
    async fn write(&mut self, batch: RecordBatch) -> Result<()>;
    /// Flush buffered data and return the written data files. A writer that
    /// received no rows writes nothing.
    async fn close(&mut self) -> Result<Vec<DataFile>>;
}

/// Builds the data file writer of one table.
#[derive(Debug, Clone)]
pub struct DataFileWriterBuilder {
    file_io: FileIO,
    location: TableLocation,
    schema: SchemaRef,
    format: DataFileFormat,
}

impl DataFileWriterBuilder {
    /// Create a builder writing `format` files under `location`.
    pub fn new(
        file_io: FileIO,
        location: TableLocation,
        schema: SchemaRef,
        format: DataFileFormat,
    ) -> Self {
        Self {
            file_io,
            location,
            schema,
            format,
        }
    }

    /// Create a builder for the current schema of `table`.
    pub fn for_table(table: &Table, format: DataFileFormat) -> Result<Self> {
        Ok(Self::new(
            table.file_io().clone(),
            TableLocation::new(table.metadata().location())?,
            table.current_schema_ref()?,
            format,
        ))
    }

    /// Format of the files written.
    pub fn format(&self) -> DataFileFormat {
        self.format
    }

    /// Build a writer for a new data file.
    pub fn build(&self) -> Result<Box<dyn IcebergWriter>> {
        let path = self.location.data_file(self.format);
        match self.format {
            DataFileFormat::Parquet => Ok(Box::new(ParquetWriter::new(
                self.file_io.clone(),
                path,
                self.schema.clone(),
            ))),
            DataFileFormat::Avro => Ok(Box::new(AvroWriter::new(
                self.file_io.clone(),
                path,
                self.schema.clone(),
            ))),
            DataFileFormat::Orc => Err(Error::new(
                ErrorKind::FeatureUnsupported,
                "Writing ORC data files is not supported",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::arrow::{record_batch_to_rows, rows_to_record_batch};
    use crate::io::MemoryStorage;
    use crate::spec::{Datum, PrimitiveType, Row, Schema};

    async fn file_io() -> FileIO {
        let storage = Arc::new(MemoryStorage::new());
        storage.create_bucket("b").await;
        FileIO::new(storage)
    }

    fn schema() -> SchemaRef {
        Arc::new(
            Schema::from_columns([
                ("name", PrimitiveType::String),
                ("value", PrimitiveType::Int),
                ("at", PrimitiveType::Time),
            ])
            .unwrap(),
        )
    }

    fn rows() -> Vec<Row> {
        vec![
            vec![
                Some(Datum::string("one")),
                Some(Datum::int(1)),
                Some(Datum::time_from_str("14:15:16.432").unwrap()),
            ],
            vec![Some(Datum::string("two")), Some(Datum::int(2)), None],
        ]
    }

    async fn write_and_read(format: DataFileFormat) -> (DataFile, Vec<Row>) {
        let file_io = file_io().await;
        let builder = DataFileWriterBuilder::new(
            file_io.clone(),
            TableLocation::new("s3://b/t").unwrap(),
            schema(),
            format,
        );
        let mut writer = builder.build().unwrap();
        let batch = rows_to_record_batch(&schema(), &rows()).unwrap();
        writer.write(batch).await.unwrap();
        let mut files = writer.close().await.unwrap();
        assert_eq!(files.len(), 1);
        let file = files.remove(0);

        let batches = crate::scan::read_data_file(&file_io, &file, &schema())
            .await
            .unwrap();
        let rows = batches
            .iter()
            .flat_map(|b| record_batch_to_rows(b).unwrap())
            .collect();
        (file, rows)
    }

    #[tokio::test]
    async fn test_parquet_data_file() {
        let (file, read) = write_and_read(DataFileFormat::Parquet).await;
        assert!(file.file_path.starts_with("s3://b/t/data/"));
        assert!(file.file_path.ends_with(".parquet"));
        assert_eq!(file.file_format, "PARQUET");
        assert_eq!(file.record_count, 2);
        assert!(file.file_size_in_bytes > 0);
        assert_eq!(read, rows());
    }

    #[tokio::test]
    async fn test_avro_data_file() {
        let (file, read) = write_and_read(DataFileFormat::Avro).await;
        assert!(file.file_path.ends_with(".avro"));
        assert_eq!(file.file_format, "AVRO");
        assert_eq!(file.record_count, 2);
        assert_eq!(read, rows());
    }

    #[tokio::test]
    async fn test_orc_is_unsupported() {
        let builder = DataFileWriterBuilder::new(
            file_io().await,
            TableLocation::new("s3://b/t").unwrap(),
            schema(),
            DataFileFormat::Orc,
        );
        let err = builder.build().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FeatureUnsupported);
    }

    #[tokio::test]
    async fn test_close_without_rows_writes_nothing() {
        let file_io = file_io().await;
        for format in [DataFileFormat::Parquet, DataFileFormat::Avro] {
            let builder = DataFileWriterBuilder::new(
                file_io.clone(),
                TableLocation::new("s3://b/t").unwrap(),
                schema(),
                format,
            );
            let mut writer = builder.build().unwrap();
            assert!(writer.close().await.unwrap().is_empty());
        }
        assert!(file_io.list("s3://b/t/data/").await.unwrap().is_empty());
    }
}
