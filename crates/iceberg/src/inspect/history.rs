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

use std::collections::HashSet;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_array::builder::{BooleanBuilder, PrimitiveBuilder};
use arrow_array::types::{Int64Type, TimestampMicrosecondType};

use crate::Result;
use crate::arrow::{UTC_TIME_ZONE, schema_to_arrow_schema};
use crate::spec::{NestedField, PrimitiveType, Schema};
use crate::table::Table;

/// History table showing when each snapshot became current.
///
/// | Column | Type |
/// |--------|------|
/// | `made_current_at` | `timestamptz` |
/// | `snapshot_id` | `long` |
/// | `parent_id` | `long`, nullable |
/// | `is_current_ancestor` | `boolean` |
///
/// A snapshot that is no longer an ancestor of the current snapshot was rolled
/// back.
pub struct HistoryTable<'a> {
    table: &'a Table,
}

impl<'a> HistoryTable<'a> {
    /// Create a new History table instance.
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// Returns the iceberg schema of the history table.
    pub fn schema(&self) -> Result<Schema> {
        Schema::new(0, vec![
            NestedField::required(1, "made_current_at", PrimitiveType::Timestamptz),
            NestedField::required(2, "snapshot_id", PrimitiveType::Long),
            NestedField::optional(3, "parent_id", PrimitiveType::Long),
            NestedField::required(4, "is_current_ancestor", PrimitiveType::Boolean),
        ])
    }

    /// Scans the history table.
    pub fn scan(&self) -> Result<RecordBatch> {
        let schema = schema_to_arrow_schema(&self.schema()?);
        let metadata = self.table.metadata();

        let mut current_ancestors = HashSet::new();
        let mut next = metadata.current_snapshot_id();
        while let Some(id) = next {
            if !current_ancestors.insert(id) {
                break;
            }
            next = metadata
                .snapshot_by_id(id)
                .and_then(|s| s.parent_snapshot_id());
        }

        let mut made_current_at =
            PrimitiveBuilder::<TimestampMicrosecondType>::new().with_timezone(UTC_TIME_ZONE);
        let mut snapshot_id = PrimitiveBuilder::<Int64Type>::new();
        let mut parent_id = PrimitiveBuilder::<Int64Type>::new();
        let mut is_current_ancestor = BooleanBuilder::new();

        for entry in metadata.history() {
            made_current_at.append_value(entry.timestamp_ms * 1000);
            snapshot_id.append_value(entry.snapshot_id);
            parent_id.append_option(
                metadata
                    .snapshot_by_id(entry.snapshot_id)
                    .and_then(|s| s.parent_snapshot_id()),
            );
            is_current_ancestor.append_value(current_ancestors.contains(&entry.snapshot_id));
        }

        Ok(RecordBatch::try_new(schema, vec![
            Arc::new(made_current_at.finish()),
            Arc::new(snapshot_id.finish()),
            Arc::new(parent_id.finish()),
            Arc::new(is_current_ancestor.finish()),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::inspect::tests::{chain_table, check_record_batch};

    #[test]
    fn test_history_table() {
        let table = chain_table();
        let batch = table.inspect().history().scan().unwrap();
        check_record_batch(
            &batch,
            expect![[r#"
                made_current_at | snapshot_id | parent_id | is_current_ancestor
                1970-01-01 00:00:01.000 UTC | 1 | NULL | true
                1970-01-01 00:00:02.000 UTC | 2 | 1 | true
                1970-01-01 00:00:03.000 UTC | 3 | 2 | true"#]],
        );
    }
}
