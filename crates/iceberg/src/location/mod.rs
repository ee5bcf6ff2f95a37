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

//! Table locations and the file names generated beneath them.
//!
//! Every location written by this crate goes through [`normalize`], which
//! rejects fragments and collapses accidental doubled slashes. Readers still
//! accept legacy locations such as `.../metadata//00001-x.metadata.json`.

mod matcher;

pub use matcher::*;
use uuid::Uuid;

use crate::spec::DataFileFormat;
use crate::{Error, ErrorKind, Result};

const SCHEME_SEPARATOR: &str = "://";
const METADATA_DIR: &str = "metadata";
const DATA_DIR: &str = "data";
/// Suffix of every table metadata file.
pub const METADATA_FILE_SUFFIX: &str = ".metadata.json";

/// Joins `base` and `parts` into a canonical location.
///
/// Exactly one slash separates adjacent segments, the `scheme://` separator
/// is preserved, and a trailing slash is kept only if the last supplied
/// piece ended with one.
pub fn normalize(base: &str, parts: &[&str]) -> Result<String> {
    if base.trim().is_empty() {
        return Err(Error::new(ErrorKind::InvalidLocation, "Location must not be empty"));
    }
    if let Some(bad) = std::iter::once(&base).chain(parts).find(|p| p.contains('#')) {
        return Err(
            Error::new(ErrorKind::InvalidLocation, "Location must not contain '#'")
                .with_context("location", *bad),
        );
    }

    let (scheme, path) = match base.split_once(SCHEME_SEPARATOR) {
        Some((scheme, path)) => (Some(scheme), path),
        None => (None, base),
    };
    let last = parts.last().copied().unwrap_or(base);
    let trailing_slash = last.ends_with('/');

    let segments: Vec<&str> = std::iter::once(path)
        .chain(parts.iter().copied())
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    let leading_slash = scheme.is_none() && path.starts_with('/');

    let mut out = String::with_capacity(base.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>());
    if let Some(scheme) = scheme {
        out.push_str(scheme);
        out.push_str(SCHEME_SEPARATOR);
    } else if leading_slash {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing_slash && !out.ends_with('/') {
        out.push('/');
    }
    Ok(out)
}

/// Whether the path part of `location` contains an empty segment.
pub fn has_doubled_slash(location: &str) -> bool {
    let path = location
        .split_once(SCHEME_SEPARATOR)
        .map_or(location, |(_, path)| path);
    path.contains("//")
}

/// Version encoded in a metadata file name such as `00003-<uuid>.metadata.json`.
pub fn parse_metadata_version(location: &str) -> Option<i64> {
    let file_name = location.rsplit('/').next()?;
    let stem = file_name.strip_suffix(METADATA_FILE_SUFFIX)?;
    let (version, _) = stem.split_once('-')?;
    version.parse().ok()
}

/// Base location of a table, with generators for the files it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocation {
    base: String,
}

impl TableLocation {
    /// Canonicalizes a user-supplied table location.
    pub fn new(location: &str) -> Result<Self> {
        let base = normalize(location, &[])?;
        let base = base.trim_end_matches('/').to_string();
        if !base.contains(SCHEME_SEPARATOR) {
            return Err(Error::new(
                ErrorKind::InvalidLocation,
                "Table location must be a URI with a scheme",
            )
            .with_context("location", location));
        }
        Ok(Self { base })
    }

    /// Default location of a new table under its schema's location.
    pub fn for_new_table(schema_location: &str, table_name: &str) -> Result<Self> {
        let dir = format!("{table_name}-{}", Uuid::new_v4().simple());
        Self::new(&normalize(schema_location, &[&dir])?)
    }

    /// The base location without trailing slash.
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Prefix of every metadata file, with trailing slash.
    pub fn metadata_dir(&self) -> String {
        format!("{}/{METADATA_DIR}/", self.base)
    }

    /// Prefix of every data file, with trailing slash.
    pub fn data_dir(&self) -> String {
        format!("{}/{DATA_DIR}/", self.base)
    }

    /// A fresh metadata file for `version`.
    pub fn metadata_file(&self, version: i64) -> String {
        format!(
            "{}/{METADATA_DIR}/{version:05}-{}{METADATA_FILE_SUFFIX}",
            self.base,
            Uuid::new_v4()
        )
    }

    /// A fresh manifest list for a snapshot.
    pub fn manifest_list(&self, snapshot_id: i64, commit_uuid: &Uuid) -> String {
        format!(
            "{}/{METADATA_DIR}/snap-{snapshot_id}-1-{commit_uuid}.avro",
            self.base
        )
    }

    /// The `n`th manifest written by a commit.
    pub fn manifest(&self, commit_uuid: &Uuid, n: u32) -> String {
        format!("{}/{METADATA_DIR}/{commit_uuid}-m{n}.avro", self.base)
    }

    /// A fresh data file.
    pub fn data_file(&self, format: DataFileFormat) -> String {
        format!(
            "{}/{DATA_DIR}/{}.{}",
            self.base,
            Uuid::new_v4(),
            format.extension()
        )
    }
}
