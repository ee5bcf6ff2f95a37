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

//! Shared fixture for the connector smoke tests.
//!
//! Every fixture owns a fresh bucket and metastore, so tests never observe
//! each other's objects or notifications.

use std::collections::HashMap;
use std::sync::{Arc, Once};

use iceberg_hive::connector::{
    CATALOG_TYPE, ConnectorConfig, FILE_FORMAT, IcebergConnector, METASTORE_TIMEOUT,
    METASTORE_URI, REGISTER_TABLE_PROCEDURE_ENABLED, S3_AWS_ACCESS_KEY, S3_AWS_SECRET_KEY,
    S3_ENDPOINT, S3_PATH_STYLE_ACCESS, S3_REGION, S3_STREAMING_PART_SIZE,
};
use iceberg_hive::hms::{METADATA_LOCATION_PROP, MemoryMetastore, Metastore};
use iceberg_hive::io::{MemoryStorage, NotificationFilter, NotificationQueue, ObjectStorage};
use iceberg_hive::spec::DataFileFormat;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// File formats the connector writes.
pub const FILE_FORMATS: [DataFileFormat; 2] = [DataFileFormat::Parquet, DataFileFormat::Avro];

static INIT: Once = Once::new();

/// Installs a log subscriber once per test binary. `RUST_LOG` selects the level.
pub fn set_up() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Lowercases a test name and replaces characters a schema name cannot carry.
pub fn normalize_test_name(name: impl AsRef<str>) -> String {
    name.as_ref()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Connector properties as an engine would pass them.
pub fn catalog_properties(format: DataFileFormat) -> HashMap<String, String> {
    HashMap::from([
        (FILE_FORMAT.to_string(), format.to_string().to_uppercase()),
        (CATALOG_TYPE.to_string(), "HIVE_METASTORE".to_string()),
        (METASTORE_URI.to_string(), "thrift://localhost:9083".to_string()),
        (METASTORE_TIMEOUT.to_string(), "1m".to_string()),
        (S3_AWS_ACCESS_KEY.to_string(), "accesskey".to_string()),
        (S3_AWS_SECRET_KEY.to_string(), "secretkey".to_string()),
        (S3_ENDPOINT.to_string(), "http://localhost:9000".to_string()),
        (S3_REGION.to_string(), "us-east-1".to_string()),
        (S3_PATH_STYLE_ACCESS.to_string(), "true".to_string()),
        (S3_STREAMING_PART_SIZE.to_string(), "5MB".to_string()),
        (
            REGISTER_TABLE_PROCEDURE_ENABLED.to_string(),
            "true".to_string(),
        ),
    ])
}

pub struct TestFixture {
    pub storage: Arc<MemoryStorage>,
    pub metastore: Arc<MemoryMetastore>,
    pub connector: IcebergConnector,
    pub bucket: String,
    pub schema: String,
    pub format: DataFileFormat,
}

impl TestFixture {
    /// Location of the fixture's schema.
    pub fn schema_location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.schema)
    }

    /// Keys under `prefix` in the fixture's bucket.
    pub async fn list_keys(&self, prefix: &str) -> Vec<String> {
        self.storage
            .list(&self.bucket, prefix)
            .await
            .expect("Failed to list objects")
            .into_iter()
            .map(|meta| meta.key)
            .collect()
    }

    /// Key prefix of a table's directory, with trailing slash.
    pub async fn table_prefix(&self, table: &str) -> String {
        let table = self
            .connector
            .load_table(&self.schema, table)
            .await
            .expect("Failed to load table");
        let location = table.metadata().location();
        let key = location
            .strip_prefix(&format!("s3://{}/", self.bucket))
            .unwrap_or_else(|| panic!("Table location {location} is outside the test bucket"));
        format!("{}/", key.trim_end_matches('/'))
    }

    /// Keys of the data files of a table.
    pub async fn data_keys(&self, table: &str) -> Vec<String> {
        let prefix = self.table_prefix(table).await;
        self.list_keys(&format!("{prefix}data/")).await
    }

    /// Keys of the metadata files of a table.
    pub async fn metadata_keys(&self, table: &str) -> Vec<String> {
        let prefix = self.table_prefix(table).await;
        self.list_keys(&format!("{prefix}metadata/")).await
    }

    /// Starts capturing removal events in the fixture's bucket.
    pub async fn capture_removals(&self) -> NotificationQueue {
        self.storage
            .capture_notifications(&self.bucket, NotificationFilter::removals())
            .await
            .expect("Failed to capture notifications")
    }

    /// The `metadata_location` parameter of a table as stored in the metastore.
    pub async fn metadata_location(&self, table: &str) -> String {
        self.connector
            .metadata_location(&self.schema, table)
            .await
            .expect("Failed to read metadata location")
    }

    /// Overwrites the `metadata_location` parameter out of band.
    pub async fn set_metadata_location(&self, table: &str, location: &str) {
        self.metastore
            .write_parameter(&self.schema, table, METADATA_LOCATION_PROP, location)
            .await
            .expect("Failed to write metadata location");
    }

    /// Removes a table from the metastore, leaving its files in place.
    pub async fn drop_table_from_metastore(&self, table: &str) {
        self.metastore
            .drop_table(&self.schema, table, false)
            .await
            .expect("Failed to drop table from metastore");
    }
}

/// Creates a fresh bucket, metastore and schema for one test.
pub async fn set_test_fixture(func: &str, format: DataFileFormat) -> TestFixture {
    set_up();
    let bucket = format!("test-iceberg-minio-smoke-test-{}", Uuid::new_v4().simple());
    let schema = normalize_test_name(format!("{func}_{format}"));

    let storage = Arc::new(MemoryStorage::new());
    storage.create_bucket(&bucket).await;
    let metastore = Arc::new(MemoryMetastore::new());

    let config = ConnectorConfig::from_properties(&catalog_properties(format))
        .expect("Invalid connector configuration");
    let connector = IcebergConnector::new(config, metastore.clone(), storage.clone());

    let fixture = TestFixture {
        storage,
        metastore,
        connector,
        bucket,
        schema,
        format,
    };
    fixture
        .connector
        .create_schema(&fixture.schema, Some(&fixture.schema_location()))
        .await
        .expect("Failed to create schema");
    fixture
}
