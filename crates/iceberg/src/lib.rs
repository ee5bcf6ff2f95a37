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

//! Iceberg tables on S3-compatible object storage, committed through a Hive
//! metastore.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use iceberg_hive::connector::{ConnectorConfig, IcebergConnector};
//! use iceberg_hive::hms::MemoryMetastore;
//! use iceberg_hive::io::MemoryStorage;
//!
//! # async fn example() -> iceberg_hive::Result<()> {
//! let storage = Arc::new(MemoryStorage::new());
//! storage.create_bucket("warehouse").await;
//! let connector = IcebergConnector::new(
//!     ConnectorConfig::default(),
//!     Arc::new(MemoryMetastore::new()),
//!     storage,
//! );
//! connector
//!     .create_schema("sales", Some("s3://warehouse/sales"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod error;
pub use error::{Error, ErrorKind, Result};

mod catalog;
pub use catalog::*;

pub mod arrow;
pub mod connector;
pub mod hms;
pub mod inspect;
pub mod io;
pub mod location;
pub mod scan;
pub mod spec;
pub mod table;
pub mod transaction;
pub mod writer;
