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

//! Reading data files into record batches of a projected schema.

use apache_avro::Reader as AvroReader;
use apache_avro::types::Value;
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions, new_null_array};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use crate::arrow::{
    column_index, rows_to_record_batch, schema_to_arrow_schema, type_to_arrow_type,
};
use crate::io::FileIO;
use crate::spec::{
    DataFile, DataFileFormat, Datum, NestedField, PrimitiveType, Row, Schema, TimeOfDay,
};
use crate::{Error, ErrorKind, Result};

/// Reads a data file, returning batches with exactly the columns of `schema`.
/// Columns missing from the file, such as ones added after it was written, are
/// filled with nulls.
pub async fn read_data_file(
    file_io: &FileIO,
    data_file: &DataFile,
    schema: &Schema,
) -> Result<Vec<RecordBatch>> {
    let bytes = file_io.read(&data_file.file_path).await?;
    debug!(path = %data_file.file_path, size = bytes.len(), "Reading data file");
    let batches = match data_file.file_format()? {
        DataFileFormat::Parquet => {
            let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)?.build()?;
            reader
                .map(|batch| project(&batch?, schema))
                .collect::<Result<Vec<_>>>()?
        }
        DataFileFormat::Avro => {
            let rows = read_avro(&bytes, schema)?;
            vec![rows_to_record_batch(schema, &rows)?]
        }
        DataFileFormat::Orc => {
            return Err(Error::new(
                ErrorKind::FeatureUnsupported,
                "Reading ORC data files is not supported",
            )
            .with_context("file", &data_file.file_path));
        }
    };
    Ok(batches)
}

fn project(batch: &RecordBatch, schema: &Schema) -> Result<RecordBatch> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| match column_index(batch.schema_ref(), field) {
            Some(idx) => batch.column(idx).clone(),
            None => new_null_array(&type_to_arrow_type(field.field_type), batch.num_rows()),
        })
        .collect::<Vec<ArrayRef>>();
    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        schema_to_arrow_schema(schema),
        columns,
        &options,
    )?)
}

fn read_avro(bytes: &[u8], schema: &Schema) -> Result<Vec<Row>> {
    let reader = AvroReader::new(bytes)?;
    let mut rows = Vec::new();
    for value in reader {
        let Value::Record(record) = value? else {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Avro data file must contain records",
            ));
        };
        let row = schema
            .fields()
            .iter()
            .map(|field| {
                record
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(&field.name))
                    .map_or(Ok(None), |(_, value)| avro_datum(field, value))
            })
            .collect::<Result<Row>>()?;
        rows.push(row);
    }
    Ok(rows)
}

fn avro_datum(field: &NestedField, value: &Value) -> Result<Option<Datum>> {
    let datum = match (field.field_type, value) {
        (_, Value::Union(_, inner)) => return avro_datum(field, inner),
        (_, Value::Null) => return Ok(None),
        (_, Value::Boolean(v)) => Datum::Boolean(*v),
        (_, Value::Int(v)) => Datum::Int(*v),
        (PrimitiveType::Time, Value::TimeMicros(v) | Value::Long(v)) => {
            Datum::Time(TimeOfDay::from_micros(*v)?)
        }
        (PrimitiveType::Timestamptz, Value::TimestampMicros(v) | Value::Long(v)) => {
            Datum::TimestampTz(*v)
        }
        (_, Value::Long(v)) => Datum::Long(*v),
        (_, Value::Double(v)) => Datum::Double(*v),
        (_, Value::String(v)) => Datum::String(v.clone()),
        (ty, other) => {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Unexpected avro value for {ty} column {}: {other:?}", field.name),
            ));
        }
    };
    Ok(Some(datum))
}
