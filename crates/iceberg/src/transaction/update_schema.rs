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

//! Schema evolution action for adding columns.

use std::sync::Arc;

use async_trait::async_trait;

use crate::spec::{NestedField, PrimitiveType, Schema};
use crate::table::Table;
use crate::transaction::action::{ActionCommit, TransactionAction};
use crate::{Error, ErrorKind, Result, TableRequirement, TableUpdate};

/// Transactional schema update action.
///
/// Columns are appended at the top level as optional fields with fresh ids,
/// so existing data files read the new columns as null.
#[derive(Debug, Default)]
pub struct UpdateSchemaAction {
    added_columns: Vec<(String, PrimitiveType)>,
}

impl UpdateSchemaAction {
    /// Create a new schema update action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an optional column to the schema.
    pub fn add_column(mut self, name: impl Into<String>, field_type: PrimitiveType) -> Self {
        self.added_columns.push((name.into(), field_type));
        self
    }

    fn apply_operations(&self, table: &Table) -> Result<Schema> {
        if self.added_columns.is_empty() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "No schema updates specified",
            ));
        }

        let mut schema = table.current_schema_ref()?.as_ref().clone();
        let mut next_field_id = table.metadata().last_column_id();
        for (name, field_type) in &self.added_columns {
            ensure_top_level_name(name)?;
            if schema.field_by_name(name).is_some() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Column '{name}' already exists"),
                ));
            }
            next_field_id += 1;
            schema = schema.with_added_field(NestedField::optional(next_field_id, name, *field_type))?;
        }
        Ok(schema)
    }
}

fn ensure_top_level_name(name: &str) -> Result<()> {
    if name.contains('.') {
        return Err(Error::new(
            ErrorKind::DataInvalid,
            format!("Nested field paths are not supported: '{name}'"),
        ));
    }
    Ok(())
}

#[async_trait]
impl TransactionAction for UpdateSchemaAction {
    async fn commit(self: Arc<Self>, table: &Table) -> Result<ActionCommit> {
        let schema = self.apply_operations(table)?;
        let metadata = table.metadata();

        let updates = vec![
            TableUpdate::AddSchema { schema },
            TableUpdate::SetCurrentSchema {
                schema_id: crate::spec::TableMetadataBuilder::LAST_ADDED,
            },
        ];
        let requirements = vec![
            TableRequirement::CurrentSchemaIdMatch {
                current_schema_id: metadata.current_schema_id(),
            },
            TableRequirement::LastAssignedFieldIdMatch {
                last_assigned_field_id: metadata.last_column_id(),
            },
        ];

        Ok(ActionCommit::new(updates, requirements))
    }
}
