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

/*!
 * Data Types
 */

use serde::{Deserialize, Serialize};

/// Primitive column types supported by tables of this crate.
///
/// The textual form is the Iceberg type name. SQL aliases (`integer`, `bigint`,
/// `varchar`) are accepted when parsing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum PrimitiveType {
    /// True or false
    #[strum(to_string = "boolean")]
    Boolean,
    /// 32-bit signed integer
    #[strum(to_string = "int", serialize = "integer")]
    Int,
    /// 64-bit signed integer
    #[strum(to_string = "long", serialize = "bigint")]
    Long,
    /// 64-bit IEEE 754 floating point.
    #[strum(to_string = "double")]
    Double,
    /// UTF-8 character sequences.
    #[strum(to_string = "string", serialize = "varchar")]
    String,
    /// Time of day, stored in microseconds.
    #[strum(to_string = "time")]
    Time,
    /// Timestamp in microsecond precision, with timezone
    #[strum(to_string = "timestamptz")]
    Timestamptz,
}

/// A field of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NestedField {
    /// Id unique in table schema
    pub id: i32,
    /// Field Name
    pub name: String,
    /// Optional or required
    pub required: bool,
    /// Datatype
    #[serde(rename = "type")]
    pub field_type: PrimitiveType,
    /// Fields may have an optional comment or doc string.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc: Option<String>,
}

impl NestedField {
    /// Construct a required field.
    pub fn required(id: i32, name: impl ToString, field_type: PrimitiveType) -> Self {
        Self {
            id,
            name: name.to_string(),
            required: true,
            field_type,
            doc: None,
        }
    }

    /// Construct an optional field.
    pub fn optional(id: i32, name: impl ToString, field_type: PrimitiveType) -> Self {
        Self {
            id,
            name: name.to_string(),
            required: false,
            field_type,
            doc: None,
        }
    }

    /// Set the field's doc.
    pub fn with_doc(mut self, doc: impl ToString) -> Self {
        self.doc = Some(doc.to_string());
        self
    }
}
