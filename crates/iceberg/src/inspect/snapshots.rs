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

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_array::builder::{PrimitiveBuilder, StringBuilder};
use arrow_array::types::{Int64Type, TimestampMicrosecondType};

use crate::Result;
use crate::arrow::{UTC_TIME_ZONE, schema_to_arrow_schema};
use crate::spec::{NestedField, PrimitiveType, Schema};
use crate::table::Table;

/// Snapshots table.
///
/// | Column | Type |
/// |--------|------|
/// | `committed_at` | `timestamptz` |
/// | `snapshot_id` | `long` |
/// | `parent_id` | `long`, nullable |
/// | `operation` | `string` |
/// | `manifest_list` | `string` |
/// | `summary` | `string`, a JSON object with sorted keys |
pub struct SnapshotsTable<'a> {
    table: &'a Table,
}

impl<'a> SnapshotsTable<'a> {
    /// Create a new Snapshots table instance.
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// Returns the iceberg schema of the snapshots table.
    pub fn schema(&self) -> Result<Schema> {
        Schema::new(0, vec![
            NestedField::required(1, "committed_at", PrimitiveType::Timestamptz),
            NestedField::required(2, "snapshot_id", PrimitiveType::Long),
            NestedField::optional(3, "parent_id", PrimitiveType::Long),
            NestedField::optional(4, "operation", PrimitiveType::String),
            NestedField::optional(5, "manifest_list", PrimitiveType::String),
            NestedField::optional(6, "summary", PrimitiveType::String),
        ])
    }

    /// Scans the snapshots table.
    pub fn scan(&self) -> Result<RecordBatch> {
        let schema = schema_to_arrow_schema(&self.schema()?);

        let mut committed_at =
            PrimitiveBuilder::<TimestampMicrosecondType>::new().with_timezone(UTC_TIME_ZONE);
        let mut snapshot_id = PrimitiveBuilder::<Int64Type>::new();
        let mut parent_id = PrimitiveBuilder::<Int64Type>::new();
        let mut operation = StringBuilder::new();
        let mut manifest_list = StringBuilder::new();
        let mut summary = StringBuilder::new();

        for snapshot in self.table.metadata().snapshots() {
            committed_at.append_value(snapshot.timestamp_ms() * 1000);
            snapshot_id.append_value(snapshot.snapshot_id());
            parent_id.append_option(snapshot.parent_snapshot_id());
            operation.append_value(snapshot.summary().operation.to_string());
            manifest_list.append_value(snapshot.manifest_list());
            let properties = snapshot
                .summary()
                .additional_properties
                .iter()
                .collect::<BTreeMap<_, _>>();
            summary.append_value(serde_json::to_string(&properties)?);
        }

        Ok(RecordBatch::try_new(schema, vec![
            Arc::new(committed_at.finish()),
            Arc::new(snapshot_id.finish()),
            Arc::new(parent_id.finish()),
            Arc::new(operation.finish()),
            Arc::new(manifest_list.finish()),
            Arc::new(summary.finish()),
        ])?)
    }
}
