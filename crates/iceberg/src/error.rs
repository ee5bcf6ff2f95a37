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

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

/// Result that is a wrapper of `Result<T, iceberg_hive::Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// ErrorKind is all kinds of Error of this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A textual literal (for example a `TIME` value) could not be parsed.
    MalformedLiteral,
    /// A location URI contains a fragment or cannot be represented.
    InvalidLocation,
    /// The operation is not supported by the backing service or this crate.
    FeatureUnsupported,
    /// Iceberg data is invalid.
    ///
    /// This error is returned when we try to read a metadata document, manifest or
    /// data file that is not well formed, or when an argument is out of range.
    DataInvalid,
    /// A precondition of the operation does not hold.
    PreconditionFailed,
    /// The object or entity does not exist.
    NotFound,
    /// The schema (Hive database) does not exist.
    NamespaceNotFound,
    /// The schema (Hive database) already exists.
    NamespaceAlreadyExists,
    /// The table does not exist.
    TableNotFound,
    /// The table already exists.
    TableAlreadyExists,
    /// Object store or metastore I/O failed in a way that may succeed if repeated.
    TransientIo,
    /// The metadata pointer changed between load and commit.
    CommitConflict,
    /// Iceberg don't know what happened here, and no actions other than
    /// just returning it back. For example, the object store returned a
    /// permanent error we don't classify.
    Unexpected,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::MalformedLiteral => "MalformedLiteral",
            ErrorKind::InvalidLocation => "InvalidLocation",
            ErrorKind::FeatureUnsupported => "FeatureUnsupported",
            ErrorKind::DataInvalid => "DataInvalid",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::NamespaceNotFound => "NamespaceNotFound",
            ErrorKind::NamespaceAlreadyExists => "NamespaceAlreadyExists",
            ErrorKind::TableNotFound => "TableNotFound",
            ErrorKind::TableAlreadyExists => "TableAlreadyExists",
            ErrorKind::TransientIo => "TransientIo",
            ErrorKind::CommitConflict => "CommitConflict",
            ErrorKind::Unexpected => "Unexpected",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all functions of this crate.
///
/// ## Display
///
/// Error can be displayed in two ways:
///
/// - Via `Display`: like `err.to_string()` or `format!("{err}")`
///
/// Error will be printed in a single line:
///
/// ```shell
/// TableNotFound => Table tpch.orders does not exist, context: { schema: tpch }, source: ...
/// ```
///
/// - Via `Debug`: like `format!("{err:?}")`
///
/// Error will be printed in multi lines with more details and backtraces (if captured):
///
/// ```shell
/// TableNotFound => Table tpch.orders does not exist
///
/// Context:
///    schema: tpch
///
/// Source: ...
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,

    context: Vec<(&'static str, String)>,

    source: Option<anyhow::Error>,
    backtrace: Backtrace,

    retryable: bool,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            de.field("source", &self.source);
            de.field("retryable", &self.retryable);
            de.field("backtrace", &self.backtrace);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }
        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source: {source:#}")?;
        }

        if self.backtrace.status() == BacktraceStatus::Captured {
            writeln!(f)?;
            writeln!(f, "Backtrace:")?;
            writeln!(f, "{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),

            source: None,
            // `Backtrace::capture()` will check if backtrace has been enabled
            // internally. It's zero cost if backtrace is disabled.
            backtrace: Backtrace::capture(),

            retryable: false,
        }
    }

    /// Set retryable of the error.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set source for error.
    ///
    /// # Notes
    ///
    /// If the source has been set, we will raise a panic here.
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");

        self.source = Some(src.into());
        self
    }

    /// Return error's kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's retryable status
    #[inline]
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Return error's message.
    #[inline]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the value recorded under `key` by [`Error::with_context`].
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

macro_rules! define_from_err {
    ($source: path, $error_kind: path, $msg: expr) => {
        impl std::convert::From<$source> for crate::error::Error {
            fn from(v: $source) -> Self {
                Self::new($error_kind, $msg).with_source(v)
            }
        }
    };
}

define_from_err!(
    serde_json::Error,
    ErrorKind::DataInvalid,
    "Failed to parse json string"
);

define_from_err!(
    apache_avro::Error,
    ErrorKind::DataInvalid,
    "Failure in conversion with avro"
);

define_from_err!(
    parquet::errors::ParquetError,
    ErrorKind::DataInvalid,
    "Failed to read or write parquet"
);

define_from_err!(
    arrow_schema::ArrowError,
    ErrorKind::Unexpected,
    "Arrow Schema Error"
);

define_from_err!(uuid::Error, ErrorKind::DataInvalid, "Failed to convert uuid");

define_from_err!(
    url::ParseError,
    ErrorKind::InvalidLocation,
    "Failed to parse url"
);

define_from_err!(
    std::num::ParseIntError,
    ErrorKind::DataInvalid,
    "Failed to parse int"
);

impl From<object_store::Error> for Error {
    fn from(v: object_store::Error) -> Self {
        match v {
            object_store::Error::NotFound { .. } => {
                Error::new(ErrorKind::NotFound, "Object does not exist").with_source(v)
            }
            object_store::Error::NotSupported { .. }
            | object_store::Error::NotImplemented
            | object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => {
                Error::new(ErrorKind::Unexpected, "Object store rejected request").with_source(v)
            }
            _ => Error::new(ErrorKind::TransientIo, "Object store request failed")
                .with_source(v)
                .with_retryable(true),
        }
    }
}

/// Helper macro to check arguments.
///
///
/// Example:
///
/// Following example check `a > 0`, otherwise returns an error.
/// ```ignore
/// use iceberg_hive::ensure_data_valid;
/// ensure_data_valid!(a > 0, "{} is not positive.", a);
/// ```
#[macro_export]
macro_rules! ensure_data_valid {
    ($cond: expr, $fmt: literal, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::new($crate::error::ErrorKind::DataInvalid, format!($fmt, $($arg)*)))
        }
    };
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    use super::*;

    fn generate_error_with_backtrace_disabled() -> Error {
        Error {
            kind: ErrorKind::TableNotFound,
            message: "Table tpch.orders does not exist".to_string(),
            context: vec![("schema", "tpch".to_string())],
            source: Some(anyhow!("metastore returned no rows")),
            backtrace: Backtrace::disabled(),
            retryable: false,
        }
    }

    #[test]
    fn test_error_display_without_backtrace() {
        let s = format!("{}", generate_error_with_backtrace_disabled());
        assert_eq!(
            s,
            r#"TableNotFound, context: { schema: tpch } => Table tpch.orders does not exist, source: metastore returned no rows"#
        )
    }

    #[test]
    fn test_error_debug_without_backtrace() {
        let s = format!("{:?}", generate_error_with_backtrace_disabled());
        assert_eq!(
            s,
            r#"TableNotFound => Table tpch.orders does not exist

Context:
   schema: tpch

Source: metastore returned no rows
"#
        )
    }

    #[test]
    fn test_retryable_defaults_to_false() {
        let err = Error::new(ErrorKind::CommitConflict, "pointer moved");
        assert!(!err.retryable());
        assert!(err.with_retryable(true).retryable());
    }

    #[test]
    fn test_context_value_lookup() {
        let err = Error::new(ErrorKind::InvalidLocation, "bad")
            .with_context("location", "s3://b/t#frag");
        assert_eq!(err.context_value("location"), Some("s3://b/t#frag"));
        assert_eq!(err.context_value("missing"), None);
    }
}
