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

//! End-to-end scenarios covering table locations, metadata pointers,
//! snapshot expiry and the Hive schema restrictions.

use std::collections::HashSet;

use iceberg_hive::ErrorKind;
use iceberg_hive::connector::SessionProperties;
use iceberg_hive::io::unique_request_ids;
use iceberg_hive::spec::{Datum, PrimitiveType, Row};
use iceberg_hive_integration_tests::{FILE_FORMATS, TestFixture, set_test_fixture};
use pretty_assertions::assert_eq;

fn row(name: &str, value: i32) -> Row {
    vec![Some(Datum::from(name)), Some(Datum::from(value))]
}

async fn create_names_table(fixture: &TestFixture, table: &str) {
    fixture
        .connector
        .create_table(
            &fixture.schema,
            table,
            [("name", PrimitiveType::String), ("value", PrimitiveType::Int)],
            None,
        )
        .await
        .unwrap();
}

async fn sorted_rows(fixture: &TestFixture, table: &str) -> Vec<Row> {
    let mut rows = fixture
        .connector
        .select(&fixture.schema, table)
        .await
        .unwrap()
        .into_rows();
    rows.sort_by_key(|row| row[1].as_ref().and_then(Datum::as_i64));
    rows
}

#[tokio::test]
async fn test_rename_schema_fails() {
    let fixture = set_test_fixture("test_rename_schema_fails", FILE_FORMATS[0]).await;
    let err = fixture
        .connector
        .rename_schema(&fixture.schema, "renamed_schema")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FeatureUnsupported);
    assert!(
        err.message()
            .contains("Hive metastore does not support renaming schemas"),
        "unexpected message: {err}"
    );
}

#[tokio::test]
async fn test_table_location_with_trailing_slash() {
    for format in FILE_FORMATS {
        let fixture = set_test_fixture("test_table_location_with_trailing_slash", format).await;
        let table = "test_table_location_with_trailing_slash";
        let location = format!("{}/{table}/", fixture.schema_location());

        fixture
            .connector
            .create_table_as(
                &fixture.schema,
                table,
                [("col", PrimitiveType::Int)],
                vec![vec![Some(Datum::from(1))]],
                Some(&location),
            )
            .await
            .unwrap();

        let data = fixture.data_keys(table).await;
        let metadata = fixture.metadata_keys(table).await;
        assert!(!data.is_empty(), "{format}: no data files");
        assert!(!metadata.is_empty(), "{format}: no metadata files");
        for key in data.iter().chain(&metadata) {
            assert!(!key.contains('#'), "{format}: unexpected key {key}");
            assert!(!key.contains("//"), "{format}: unexpected key {key}");
        }
        assert!(
            data.iter()
                .all(|key| key.ends_with(&format!(".{}", format.extension())))
        );

        fixture
            .connector
            .add_column(&fixture.schema, table, "new_col", PrimitiveType::Int)
            .await
            .unwrap();
        assert_eq!(
            fixture
                .connector
                .table_column_names(&fixture.schema, table)
                .await
                .unwrap(),
            vec!["col", "new_col"]
        );
        assert_eq!(
            fixture
                .connector
                .select(&fixture.schema, table)
                .await
                .unwrap()
                .into_rows(),
            vec![vec![Some(Datum::from(1)), None]]
        );
    }
}

#[tokio::test]
async fn test_metadata_location_with_double_slash() {
    for format in FILE_FORMATS {
        let fixture = set_test_fixture("test_metadata_location_with_double_slash", format).await;
        let table = "test_meta_location_double_slash";
        create_names_table(&fixture, table).await;
        fixture
            .connector
            .insert(&fixture.schema, table, vec![row("one", 1)])
            .await
            .unwrap();

        // Legacy writers stored pointers with a doubled slash.
        let location = fixture.metadata_location(table).await;
        let legacy = location.replace("/metadata/", "//metadata/");
        assert_ne!(location, legacy);
        fixture.set_metadata_location(table, &legacy).await;
        assert_eq!(fixture.metadata_location(table).await, legacy);

        assert_eq!(sorted_rows(&fixture, table).await, vec![row("one", 1)]);
        fixture
            .connector
            .insert(&fixture.schema, table, vec![row("two", 2)])
            .await
            .unwrap();
        assert_eq!(sorted_rows(&fixture, table).await, vec![
            row("one", 1),
            row("two", 2)
        ]);
        assert!(!fixture.metadata_location(table).await.contains("//metadata/"));
    }
}

#[tokio::test]
async fn test_expire_snapshots() {
    for format in FILE_FORMATS {
        let fixture = set_test_fixture("test_expire_snapshots", format).await;
        let table = "test_expiring_snapshots";
        create_names_table(&fixture, table).await;
        fixture
            .connector
            .insert(&fixture.schema, table, vec![row("one", 1)])
            .await
            .unwrap();
        fixture
            .connector
            .insert(&fixture.schema, table, vec![row("two", 2)])
            .await
            .unwrap();

        let snapshots = fixture
            .connector
            .select_columns(&fixture.schema, &format!("{table}$snapshots"), &["snapshot_id"])
            .await
            .unwrap();
        assert_eq!(snapshots.rows().len(), 2);
        let initial_metadata_files = fixture.metadata_keys(table).await.len();

        let session = SessionProperties::from_properties(&[(
            "expire_snapshots_min_retention".to_string(),
            "0s".to_string(),
        )]
        .into())
        .unwrap();
        let mut removals = fixture.capture_removals().await;
        let result = fixture
            .connector
            .expire_snapshots(&fixture.schema, table, "0s", &session)
            .await
            .unwrap();
        assert_eq!(result.deleted_snapshots_count, 1);

        let snapshots = fixture
            .connector
            .select_columns(&fixture.schema, &format!("{table}$snapshots"), &["snapshot_id"])
            .await
            .unwrap();
        assert_eq!(snapshots.rows().len(), 1);
        assert_eq!(sorted_rows(&fixture, table).await, vec![
            row("one", 1),
            row("two", 2)
        ]);
        assert!(fixture.metadata_keys(table).await.len() < initial_metadata_files);

        let events = removals.drain();
        assert!(!events.is_empty());
        assert_eq!(unique_request_ids(&events), 1);
    }
}

#[tokio::test]
async fn test_expire_snapshots_requires_unlock() {
    let fixture = set_test_fixture("test_expire_snapshots_requires_unlock", FILE_FORMATS[0]).await;
    let table = "test_expire_locked";
    create_names_table(&fixture, table).await;
    fixture
        .connector
        .insert(&fixture.schema, table, vec![row("one", 1)])
        .await
        .unwrap();

    let mut removals = fixture.capture_removals().await;
    let err = fixture
        .connector
        .expire_snapshots(&fixture.schema, table, "0s", &SessionProperties::new())
        .await
        .unwrap_err();
    assert!(err.message().contains("minimum retention"), "{err}");
    assert!(removals.drain().is_empty());
}

#[tokio::test]
async fn test_snapshots_table_tracks_commits() {
    for format in FILE_FORMATS {
        let fixture = set_test_fixture("test_snapshots_table_tracks_commits", format).await;
        let table = "test_snapshots_table";
        create_names_table(&fixture, table).await;
        for (i, name) in ["one", "two", "three"].into_iter().enumerate() {
            fixture
                .connector
                .insert(&fixture.schema, table, vec![row(name, i as i32 + 1)])
                .await
                .unwrap();
        }

        let result = fixture
            .connector
            .select(&fixture.schema, &format!("{table}$snapshots"))
            .await
            .unwrap();
        let ids = result.column("snapshot_id").unwrap();
        assert_eq!(ids.len(), 3);
        let distinct = ids
            .iter()
            .filter_map(|d| d.as_ref().and_then(Datum::as_i64))
            .collect::<HashSet<i64>>();
        assert_eq!(distinct.len(), 3);
        let parents = result.column("parent_id").unwrap();
        assert_eq!(parents[0], None);
        assert_eq!(parents[1], ids[0]);
        assert_eq!(parents[2], ids[1]);
    }
}

#[tokio::test]
async fn test_register_table_after_metastore_drop() {
    for format in FILE_FORMATS {
        let fixture = set_test_fixture("test_register_table_after_metastore_drop", format).await;
        let table = "test_register_table";
        create_names_table(&fixture, table).await;
        fixture
            .connector
            .insert(&fixture.schema, table, vec![row("one", 1)])
            .await
            .unwrap();
        let location = fixture
            .connector
            .load_table(&fixture.schema, table)
            .await
            .unwrap()
            .metadata()
            .location()
            .to_string();
        let metadata_keys = fixture.metadata_keys(table).await;

        fixture.drop_table_from_metastore(table).await;
        assert!(
            fixture
                .connector
                .list_tables(&fixture.schema)
                .await
                .unwrap()
                .is_empty()
        );
        // Files outlive the metastore entry.
        assert_eq!(fixture.list_keys(&metadata_keys[0]).await.len(), 1);

        fixture
            .connector
            .register_table(&fixture.schema, table, &location, None)
            .await
            .unwrap();
        assert_eq!(sorted_rows(&fixture, table).await, vec![row("one", 1)]);
    }
}

#[tokio::test]
async fn test_drop_table_keeps_files() {
    let fixture = set_test_fixture("test_drop_table_keeps_files", FILE_FORMATS[0]).await;
    let table = "test_drop_keeps_files";
    create_names_table(&fixture, table).await;
    fixture
        .connector
        .insert(&fixture.schema, table, vec![row("one", 1)])
        .await
        .unwrap();
    let prefix = fixture.table_prefix(table).await;
    let before = fixture.list_keys(&prefix).await;

    fixture
        .connector
        .drop_table(&fixture.schema, table)
        .await
        .unwrap();
    let err = fixture
        .connector
        .select(&fixture.schema, table)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TableNotFound);
    assert_eq!(fixture.list_keys(&prefix).await, before);
}
