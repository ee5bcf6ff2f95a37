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

//! Conversion between Iceberg and Arrow schemas.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema as ArrowSchema, SchemaRef as ArrowSchemaRef, TimeUnit};
use parquet::arrow::PARQUET_FIELD_ID_META_KEY;

use crate::spec::{NestedField, PrimitiveType, Schema};
use crate::{Error, ErrorKind, Result};

/// Timezone of `timestamptz` columns.
pub const UTC_TIME_ZONE: &str = "+00:00";

/// Arrow type used to store values of `ty`.
pub fn type_to_arrow_type(ty: PrimitiveType) -> DataType {
    match ty {
        PrimitiveType::Boolean => DataType::Boolean,
        PrimitiveType::Int => DataType::Int32,
        PrimitiveType::Long => DataType::Int64,
        PrimitiveType::Double => DataType::Float64,
        PrimitiveType::String => DataType::Utf8,
        PrimitiveType::Time => DataType::Time64(TimeUnit::Microsecond),
        PrimitiveType::Timestamptz => {
            DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_TIME_ZONE.into()))
        }
    }
}

/// Iceberg type of an Arrow type written by this crate.
pub fn arrow_type_to_type(ty: &DataType) -> Result<PrimitiveType> {
    match ty {
        DataType::Boolean => Ok(PrimitiveType::Boolean),
        DataType::Int32 => Ok(PrimitiveType::Int),
        DataType::Int64 => Ok(PrimitiveType::Long),
        DataType::Float64 => Ok(PrimitiveType::Double),
        DataType::Utf8 | DataType::LargeUtf8 => Ok(PrimitiveType::String),
        DataType::Time64(TimeUnit::Microsecond) => Ok(PrimitiveType::Time),
        DataType::Timestamp(TimeUnit::Microsecond, Some(_)) => Ok(PrimitiveType::Timestamptz),
        other => Err(Error::new(
            ErrorKind::FeatureUnsupported,
            format!("Unsupported Arrow data type: {other}"),
        )),
    }
}

/// Arrow field carrying the Iceberg field id in its metadata.
pub fn field_to_arrow_field(field: &NestedField) -> Field {
    Field::new(
        &field.name,
        type_to_arrow_type(field.field_type),
        !field.required,
    )
    .with_metadata(HashMap::from([(
        PARQUET_FIELD_ID_META_KEY.to_string(),
        field.id.to_string(),
    )]))
}

/// Convert an Iceberg schema to an Arrow schema.
pub fn schema_to_arrow_schema(schema: &Schema) -> ArrowSchemaRef {
    Arc::new(ArrowSchema::new(
        schema
            .fields()
            .iter()
            .map(field_to_arrow_field)
            .collect::<Vec<_>>(),
    ))
}

/// Iceberg field id stored in an Arrow field's metadata.
pub fn field_id(field: &Field) -> Option<i32> {
    field
        .metadata()
        .get(PARQUET_FIELD_ID_META_KEY)
        .and_then(|id| id.parse().ok())
}

/// Index of the column of `arrow_schema` holding `field`: matched by field id when
/// the file carries ids, by case-insensitive name otherwise.
pub(crate) fn column_index(arrow_schema: &ArrowSchema, field: &NestedField) -> Option<usize> {
    let fields = arrow_schema.fields();
    fields
        .iter()
        .position(|f| field_id(f) == Some(field.id))
        .or_else(|| {
            fields
                .iter()
                .position(|f| field_id(f).is_none() && f.name().eq_ignore_ascii_case(&field.name))
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_schema_to_arrow_schema() {
        let schema = Schema::new(0, vec![
            NestedField::required(1, "id", PrimitiveType::Long),
            NestedField::optional(2, "at", PrimitiveType::Time),
        ])
        .unwrap();

        let arrow_schema = schema_to_arrow_schema(&schema);
        let id = arrow_schema.field(0);
        assert_eq!(id.data_type(), &DataType::Int64);
        assert!(!id.is_nullable());
        assert_eq!(field_id(id), Some(1));

        let at = arrow_schema.field(1);
        assert_eq!(at.data_type(), &DataType::Time64(TimeUnit::Microsecond));
        assert!(at.is_nullable());
        assert_eq!(field_id(at), Some(2));
    }

    #[test]
    fn test_type_round_trip() {
        for ty in [
            PrimitiveType::Boolean,
            PrimitiveType::Int,
            PrimitiveType::Long,
            PrimitiveType::Double,
            PrimitiveType::String,
            PrimitiveType::Time,
            PrimitiveType::Timestamptz,
        ] {
            assert_eq!(arrow_type_to_type(&type_to_arrow_type(ty)).unwrap(), ty);
        }
        let err = arrow_type_to_type(&DataType::Float16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FeatureUnsupported);
    }

    #[test]
    fn test_column_index_prefers_field_id() {
        let arrow_schema = ArrowSchema::new(vec![
            Field::new("renamed", DataType::Int32, true).with_metadata(HashMap::from([(
                PARQUET_FIELD_ID_META_KEY.to_string(),
                "2".to_string(),
            )])),
            Field::new("plain", DataType::Int32, true),
        ]);
        let by_id = NestedField::optional(2, "value", PrimitiveType::Int);
        let by_name = NestedField::optional(5, "PLAIN", PrimitiveType::Int);
        let missing = NestedField::optional(6, "missing", PrimitiveType::Int);

        assert_eq!(column_index(&arrow_schema, &by_id), Some(0));
        assert_eq!(column_index(&arrow_schema, &by_name), Some(1));
        assert_eq!(column_index(&arrow_schema, &missing), None);
    }
}
