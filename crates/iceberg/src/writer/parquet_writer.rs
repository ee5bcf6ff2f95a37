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

//! The module contains [`ParquetWriter`] for writing parquet data files.

use arrow_array::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::debug;

use super::IcebergWriter;
use crate::arrow::schema_to_arrow_schema;
use crate::io::FileIO;
use crate::spec::{DataFile, DataFileFormat, SchemaRef};
use crate::{Error, ErrorKind, Result};

/// Writes buffered batches as one parquet file.
#[derive(Debug)]
pub struct ParquetWriter {
    file_io: FileIO,
    path: String,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl ParquetWriter {
    /// Create a writer for the parquet file at `path`.
    pub fn new(file_io: FileIO, path: String, schema: SchemaRef) -> Self {
        Self {
            file_io,
            path,
            schema,
            batches: Vec::new(),
        }
    }

    fn encode(&self) -> Result<(Vec<u8>, i64)> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut buf = Vec::new();
        let mut writer =
            ArrowWriter::try_new(&mut buf, schema_to_arrow_schema(&self.schema), Some(props))?;
        for batch in &self.batches {
            writer.write(batch)?;
        }
        let metadata = writer.close()?;
        Ok((buf, metadata.num_rows))
    }
}

#[async_trait]
impl IcebergWriter for ParquetWriter {
    async fn write(&mut self, batch: RecordBatch) -> Result<()> {
        if batch.num_columns() != self.schema.fields().len() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Batch has {} columns but the table has {}",
                    batch.num_columns(),
                    self.schema.fields().len()
                ),
            ));
        }
        // Field ids come from the table schema, not from the batch.
        let batch = batch.with_schema(schema_to_arrow_schema(&self.schema))?;
        if batch.num_rows() > 0 {
            self.batches.push(batch);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<Vec<DataFile>> {
        if self.batches.is_empty() {
            return Ok(vec![]);
        }
        let (buf, num_rows) = self.encode()?;
        self.batches.clear();

        let size = buf.len() as u64;
        self.file_io.write(&self.path, Bytes::from(buf)).await?;
        debug!(path = %self.path, num_rows, size, "Wrote parquet data file");

        Ok(vec![DataFile::new(
            self.path.clone(),
            DataFileFormat::Parquet,
            num_rows.max(0) as u64,
            size,
        )])
    }
}
