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

//! File io implementation.
//!
//! # How to build `FileIO`
//!
//! [`FileIO`] wraps an [`ObjectStorage`] backend. Use [`MemoryStorage`] for
//! tests and [`S3Storage`] for S3-compatible services:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use iceberg_hive::io::{FileIO, MemoryStorage};
//!
//! let file_io = FileIO::new(Arc::new(MemoryStorage::new()));
//! ```
//!
//! # How to use `FileIO`
//!
//! All operations take full URIs such as `s3://bucket/path/to/file`. The
//! `s3`, `s3a` and `s3n` schemes are accepted.

mod file_io;
mod memory;
mod notification;
mod s3;
mod storage;

pub use file_io::*;
pub use memory::*;
pub use notification::{
    BucketNotification, NotificationFilter, NotificationQueue, OBJECT_CREATED_PUT,
    OBJECT_REMOVED_DELETE, REQUEST_ID_KEY, unique_request_ids,
};
pub use s3::*;
pub use storage::*;
