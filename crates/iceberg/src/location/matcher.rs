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

//! Comparison keys for file locations.
//!
//! Manifests may reference `s3a://bucket/t//data/f.parquet` while a listing
//! reports `s3://bucket/t/data/f.parquet`. Both reduce to the same key, so
//! expiry never mistakes a live file for an unreferenced one.

use std::collections::BTreeMap;

/// Schemes that address the same S3 objects.
const S3_SCHEMES: [&str; 3] = ["s3", "s3a", "s3n"];

/// Maps file locations to keys that compare equal across scheme aliases and
/// doubled slashes.
///
/// ```
/// use iceberg_hive::location::LocationMatcher;
///
/// let matcher = LocationMatcher::default();
/// assert_eq!(
///     matcher.key("s3a://bucket/t//data/f.parquet"),
///     matcher.key("s3://bucket/t/data/f.parquet"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct LocationMatcher {
    scheme_aliases: BTreeMap<String, String>,
}

impl Default for LocationMatcher {
    fn default() -> Self {
        Self {
            scheme_aliases: S3_SCHEMES
                .iter()
                .map(|scheme| (scheme.to_string(), "s3".to_string()))
                .collect(),
        }
    }
}

impl LocationMatcher {
    /// Treats `scheme` as an alias of `canonical`.
    #[must_use]
    pub fn with_alias(mut self, scheme: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.scheme_aliases
            .insert(scheme.into().to_lowercase(), canonical.into());
        self
    }

    /// Comparison key of `location`. Locations without a scheme only have
    /// their slashes collapsed.
    pub fn key(&self, location: &str) -> String {
        let Some((scheme, rest)) = location.split_once("://") else {
            return collapse_slashes(location);
        };
        let scheme = scheme.to_lowercase();
        let scheme = self.scheme_aliases.get(&scheme).unwrap_or(&scheme);
        let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
        format!("{scheme}://{bucket}{}", collapse_slashes(&format!("/{path}")))
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if !(c == '/' && out.ends_with('/')) {
            out.push(c);
        }
    }
    out
}
