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

//! This module defines schema in iceberg.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::NestedField;
use crate::{Error, ErrorKind, Result};

/// Reference to [`Schema`].
pub type SchemaRef = Arc<Schema>;

/// Default schema id of a new table.
pub const DEFAULT_SCHEMA_ID: i32 = 0;

/// A flat struct schema. Field ids and names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "struct", rename_all = "kebab-case")]
pub struct Schema {
    schema_id: i32,
    fields: Vec<NestedField>,
}

impl Schema {
    /// Create a schema, validating field ids and names.
    pub fn new(schema_id: i32, fields: Vec<NestedField>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    "Column name must not be empty",
                ));
            }
            if !ids.insert(field.id) {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Duplicate field id {}", field.id),
                ));
            }
            if !names.insert(field.name.to_lowercase()) {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Duplicate column name '{}'", field.name),
                ));
            }
        }
        Ok(Self { schema_id, fields })
    }

    /// Builds a schema from `(name, type)` pairs, assigning ids from 1. All
    /// columns are optional, as SQL `CREATE TABLE` columns are.
    pub fn from_columns<S: ToString>(
        columns: impl IntoIterator<Item = (S, super::PrimitiveType)>,
    ) -> Result<Self> {
        let fields = columns
            .into_iter()
            .enumerate()
            .map(|(idx, (name, ty))| NestedField::optional(idx as i32 + 1, name, ty))
            .collect();
        Self::new(DEFAULT_SCHEMA_ID, fields)
    }

    /// Id of this schema within the table metadata.
    pub fn schema_id(&self) -> i32 {
        self.schema_id
    }

    pub(crate) fn with_schema_id(mut self, schema_id: i32) -> Self {
        self.schema_id = schema_id;
        self
    }

    /// Top-level fields in order.
    pub fn fields(&self) -> &[NestedField] {
        &self.fields
    }

    /// Column names in schema order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Case-insensitive lookup, matching SQL identifier resolution.
    pub fn field_by_name(&self, name: &str) -> Option<&NestedField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Looks up a field by its id.
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Highest field id, or 0 for an empty schema.
    pub fn highest_field_id(&self) -> i32 {
        self.fields.iter().map(|f| f.id).max().unwrap_or(0)
    }

    /// Returns a copy of this schema with `field` appended.
    pub fn with_added_field(&self, field: NestedField) -> Result<Self> {
        let mut fields = self.fields.clone();
        fields.push(field);
        Self::new(self.schema_id, fields)
    }

    /// Same fields, ignoring the schema id.
    pub fn is_same_schema(&self, other: &Schema) -> bool {
        self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::PrimitiveType;

    #[test]
    fn test_schema_json() {
        let schema = Schema::from_columns([
            ("key", PrimitiveType::String),
            ("value", PrimitiveType::Int),
        ])
        .unwrap();

        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"{"type":"struct","schema-id":0,"fields":[{"id":1,"name":"key","required":false,"type":"string"},{"id":2,"name":"value","required":false,"type":"int"}]}"#
        );
        assert_eq!(serde_json::from_str::<Schema>(&json).unwrap(), schema);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Schema::from_columns([("col", PrimitiveType::Int), ("COL", PrimitiveType::Long)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[test]
    fn test_add_field() {
        let schema = Schema::from_columns([("col", PrimitiveType::Int)]).unwrap();
        let evolved = schema
            .with_added_field(NestedField::optional(2, "new_col", PrimitiveType::Int))
            .unwrap();
        assert_eq!(evolved.field_names(), vec!["col", "new_col"]);
        assert_eq!(evolved.highest_field_id(), 2);
        assert!(!evolved.is_same_schema(&schema));
        assert!(schema.field_by_name("COL").is_some());
    }
}
