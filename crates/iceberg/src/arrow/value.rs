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

//! Conversion between [`Row`]s and Arrow record batches.

use std::sync::Arc;

use arrow_array::builder::{
    BooleanBuilder, Float64Builder, Int32Builder, Int64Builder, StringBuilder,
    Time64MicrosecondBuilder, TimestampMicrosecondBuilder,
};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Float64Type, Int32Type, Int64Type, Time64MicrosecondType, TimestampMicrosecondType,
};
use arrow_array::{Array, ArrayRef, RecordBatch, RecordBatchOptions};

use super::{UTC_TIME_ZONE, arrow_type_to_type, schema_to_arrow_schema};
use crate::spec::{Datum, NestedField, PrimitiveType, Row, Schema, TimeOfDay};
use crate::{Error, ErrorKind, Result};

/// Builds a record batch of `schema` from rows, coercing each value to the type
/// of its column.
pub fn rows_to_record_batch(schema: &Schema, rows: &[Row]) -> Result<RecordBatch> {
    let fields = schema.fields();
    if let Some(row) = rows.iter().find(|row| row.len() != fields.len()) {
        return Err(Error::new(
            ErrorKind::DataInvalid,
            format!(
                "Row has {} values but the table has {} columns",
                row.len(),
                fields.len()
            ),
        ));
    }

    let columns = fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let values = rows
                .iter()
                .map(|row| cell(field, row[idx].clone()))
                .collect::<Result<Vec<_>>>()?;
            Ok(build_array(field.field_type, values))
        })
        .collect::<Result<Vec<_>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    Ok(RecordBatch::try_new_with_options(
        schema_to_arrow_schema(schema),
        columns,
        &options,
    )?)
}

fn cell(field: &NestedField, value: Option<Datum>) -> Result<Option<Datum>> {
    match value {
        Some(datum) => datum.coerce_to(field.field_type).map(Some),
        None if field.required => Err(Error::new(
            ErrorKind::DataInvalid,
            format!("NULL value not allowed for NOT NULL column: {}", field.name),
        )),
        None => Ok(None),
    }
}

fn build_array(ty: PrimitiveType, values: Vec<Option<Datum>>) -> ArrayRef {
    macro_rules! build {
        ($builder:expr, $variant:ident, $conv:expr) => {{
            let mut builder = $builder;
            for value in values {
                match value {
                    Some(Datum::$variant(v)) => builder.append_value($conv(v)),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish()) as ArrayRef
        }};
    }

    match ty {
        PrimitiveType::Boolean => build!(BooleanBuilder::new(), Boolean, |v| v),
        PrimitiveType::Int => build!(Int32Builder::new(), Int, |v| v),
        PrimitiveType::Long => build!(Int64Builder::new(), Long, |v| v),
        PrimitiveType::Double => build!(Float64Builder::new(), Double, |v| v),
        PrimitiveType::String => build!(StringBuilder::new(), String, |v: String| v),
        PrimitiveType::Time => {
            build!(Time64MicrosecondBuilder::new(), Time, |v: TimeOfDay| v
                .micros())
        }
        PrimitiveType::Timestamptz => build!(
            TimestampMicrosecondBuilder::new().with_timezone(UTC_TIME_ZONE),
            TimestampTz,
            |v| v
        ),
    }
}

/// Reads every row of a record batch.
pub fn record_batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let columns = batch
        .columns()
        .iter()
        .map(|column| column_values(column.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..batch.num_rows())
        .map(|row| columns.iter().map(|values| values[row].clone()).collect())
        .collect())
}

fn column_values(array: &dyn Array) -> Result<Vec<Option<Datum>>> {
    let ty = arrow_type_to_type(array.data_type())?;
    let len = array.len();
    let datum = |idx: usize| -> Result<Option<Datum>> {
        if array.is_null(idx) {
            return Ok(None);
        }
        let value = match ty {
            PrimitiveType::Boolean => Datum::Boolean(array.as_boolean().value(idx)),
            PrimitiveType::Int => Datum::Int(array.as_primitive::<Int32Type>().value(idx)),
            PrimitiveType::Long => Datum::Long(array.as_primitive::<Int64Type>().value(idx)),
            PrimitiveType::Double => {
                Datum::Double(array.as_primitive::<Float64Type>().value(idx))
            }
            PrimitiveType::String => match array.as_string_opt::<i32>() {
                Some(strings) => Datum::string(strings.value(idx)),
                None => Datum::string(array.as_string::<i64>().value(idx)),
            },
            PrimitiveType::Time => Datum::Time(TimeOfDay::from_micros(
                array.as_primitive::<Time64MicrosecondType>().value(idx),
            )?),
            PrimitiveType::Timestamptz => Datum::TimestampTz(
                array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value(idx),
            ),
        };
        Ok(Some(value))
    };
    (0..len).map(datum).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn schema() -> Schema {
        Schema::new(0, vec![
            NestedField::optional(1, "name", PrimitiveType::String),
            NestedField::optional(2, "value", PrimitiveType::Long),
            NestedField::optional(3, "at", PrimitiveType::Time),
        ])
        .unwrap()
    }

    #[test]
    fn test_rows_to_record_batch_and_back() {
        let rows = vec![
            vec![
                Some(Datum::string("one")),
                Some(Datum::int(1)),
                Some(Datum::time_from_str("03:04:05.321").unwrap()),
            ],
            vec![Some(Datum::string("two")), None, None],
        ];

        let batch = rows_to_record_batch(&schema(), &rows).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let read = record_batch_to_rows(&batch).unwrap();
        assert_eq!(read[0][1], Some(Datum::long(1)));
        assert_eq!(read[0][2].as_ref().unwrap().to_string(), "03:04:05.321");
        assert_eq!(read[1], vec![Some(Datum::string("two")), None, None]);
    }

    #[test]
    fn test_varchar_is_cast_to_time() {
        let rows = vec![vec![None, None, Some(Datum::string("03:04"))]];
        let batch = rows_to_record_batch(&schema(), &rows).unwrap();
        let read = record_batch_to_rows(&batch).unwrap();
        assert_eq!(read[0][2].as_ref().unwrap().to_string(), "03:04:00");
    }

    #[test]
    fn test_rejects_bad_rows() {
        let err = rows_to_record_batch(&schema(), &[vec![None]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);

        let required =
            Schema::new(0, vec![NestedField::required(1, "id", PrimitiveType::Int)]).unwrap();
        let err = rows_to_record_batch(&required, &[vec![None]]).unwrap_err();
        assert!(err.message().contains("NOT NULL column: id"));
    }

    #[test]
    fn test_empty_schema_keeps_row_count() {
        let empty = Schema::new(0, vec![]).unwrap();
        let batch = rows_to_record_batch(&empty, &[vec![], vec![]]).unwrap();
        assert_eq!(batch.num_rows(), 2);
    }
}
