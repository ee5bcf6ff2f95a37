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

//! The module contains [`AvroWriter`] for writing avro data files.

use apache_avro::types::Value;
use apache_avro::{Schema as AvroSchema, Writer};
use arrow_array::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use super::IcebergWriter;
use crate::arrow::record_batch_to_rows;
use crate::io::FileIO;
use crate::spec::{
    DataFile, DataFileFormat, Datum, NestedField, PrimitiveType, Row, Schema, SchemaRef,
};
use crate::{Error, ErrorKind, Result};

const RECORD_NAME: &str = "table";

fn avro_type(ty: PrimitiveType) -> JsonValue {
    match ty {
        PrimitiveType::Boolean => json!("boolean"),
        PrimitiveType::Int => json!("int"),
        PrimitiveType::Long => json!("long"),
        PrimitiveType::Double => json!("double"),
        PrimitiveType::String => json!("string"),
        PrimitiveType::Time => json!({"type": "long", "logicalType": "time-micros"}),
        PrimitiveType::Timestamptz => json!({
            "type": "long",
            "logicalType": "timestamp-micros",
            "adjust-to-utc": true
        }),
    }
}

fn avro_field(field: &NestedField) -> JsonValue {
    let ty = avro_type(field.field_type);
    if field.required {
        json!({"name": field.name, "type": ty, "field-id": field.id})
    } else {
        json!({
            "name": field.name,
            "type": ["null", ty],
            "default": null,
            "field-id": field.id
        })
    }
}

/// Avro record schema of a table schema. Optional columns are `["null", T]`
/// unions and every field carries its Iceberg `field-id`.
pub fn avro_schema(schema: &Schema) -> Result<AvroSchema> {
    let fields = schema.fields().iter().map(avro_field).collect::<Vec<_>>();
    let json = json!({"type": "record", "name": RECORD_NAME, "fields": fields});
    AvroSchema::parse(&json).map_err(|e| {
        Error::new(
            ErrorKind::DataInvalid,
            "Table schema cannot be expressed as an avro schema",
        )
        .with_source(e)
    })
}

fn avro_value(field: &NestedField, datum: Option<Datum>) -> Result<Value> {
    let value = match datum {
        None if field.required => {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("NULL value not allowed for NOT NULL column: {}", field.name),
            ));
        }
        None => return Ok(Value::Union(0, Box::new(Value::Null))),
        Some(Datum::Boolean(v)) => Value::Boolean(v),
        Some(Datum::Int(v)) => Value::Int(v),
        Some(Datum::Long(v)) => Value::Long(v),
        Some(Datum::Double(v)) => Value::Double(v),
        Some(Datum::String(v)) => Value::String(v),
        Some(Datum::Time(v)) => Value::TimeMicros(v.micros()),
        Some(Datum::TimestampTz(v)) => Value::TimestampMicros(v),
    };
    Ok(if field.required {
        value
    } else {
        Value::Union(1, Box::new(value))
    })
}

fn avro_record(schema: &Schema, row: Row) -> Result<Value> {
    let fields = schema
        .fields()
        .iter()
        .zip(row)
        .map(|(field, datum)| Ok((field.name.clone(), avro_value(field, datum)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Record(fields))
}

/// Writes buffered rows as one avro container file.
#[derive(Debug)]
pub struct AvroWriter {
    file_io: FileIO,
    path: String,
    schema: SchemaRef,
    rows: Vec<Row>,
}

impl AvroWriter {
    /// Create a writer for the avro file at `path`.
    pub fn new(file_io: FileIO, path: String, schema: SchemaRef) -> Self {
        Self {
            file_io,
            path,
            schema,
            rows: Vec::new(),
        }
    }

    fn encode(&mut self) -> Result<Vec<u8>> {
        let avro_schema = avro_schema(&self.schema)?;
        let mut writer = Writer::new(&avro_schema, Vec::new());
        for row in self.rows.drain(..) {
            writer.append(avro_record(&self.schema, row)?)?;
        }
        Ok(writer.into_inner()?)
    }
}

#[async_trait]
impl IcebergWriter for AvroWriter {
    async fn write(&mut self, batch: RecordBatch) -> Result<()> {
        let rows = record_batch_to_rows(&batch)?;
        if let Some(row) = rows.first()
            && row.len() != self.schema.fields().len()
        {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Batch has {} columns but the table has {}",
                    row.len(),
                    self.schema.fields().len()
                ),
            ));
        }
        self.rows.extend(rows);
        Ok(())
    }

    async fn close(&mut self) -> Result<Vec<DataFile>> {
        if self.rows.is_empty() {
            return Ok(vec![]);
        }
        let num_rows = self.rows.len() as u64;
        let buf = self.encode()?;

        let size = buf.len() as u64;
        self.file_io.write(&self.path, Bytes::from(buf)).await?;
        debug!(path = %self.path, num_rows, size, "Wrote avro data file");

        Ok(vec![DataFile::new(
            self.path.clone(),
            DataFileFormat::Avro,
            num_rows,
            size,
        )])
    }
}
