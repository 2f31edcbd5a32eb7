// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

/// The broad category of a failure. Callers match on this to tell user input
/// problems apart from remote-store failures and internal contract breaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A document's metadata block is present but malformed.
    ParseFailure,
    /// The field splitter was handed a tree the classifier should never have
    /// produced for that shape.
    ClassificationInvariantViolation,
    /// Caller-supplied input (e.g. the namespace) was rejected before any
    /// remote call was made.
    ValidationError,
    /// A call to the remote store failed.
    RemoteOperationFailure,
    /// Data read from the remote store violates an expected invariant.
    ConsistencyError,
    /// Local file I/O failed.
    Io,
    /// The configuration file or flags are invalid.
    Configuration,
    /// A value could not be encoded or decoded as JSON.
    Serialization,
}

#[derive(Debug, PartialEq)]
pub struct ErrorReport {
    kind: ErrorKind,
    message: String,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        ErrorReport {
            kind,
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure, msg)
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClassificationInvariantViolation, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, msg)
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteOperationFailure, msg)
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConsistencyError, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with some context, keeping the kind.
    pub fn context(self, ctx: impl Display) -> Self {
        ErrorReport {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport {
            kind: ErrorKind::Io,
            message: format!("I/O error: {value}"),
        }
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport {
            kind: ErrorKind::Serialization,
            message: format!("JSON error: {value}"),
        }
    }
}

impl From<serde_yaml::Error> for ErrorReport {
    fn from(value: serde_yaml::Error) -> Self {
        ErrorReport {
            kind: ErrorKind::ParseFailure,
            message: format!("Failed to parse metadata block: {value}"),
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl Error for ErrorReport {}

pub type Fallible<T> = Result<T, ErrorReport>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ErrorReport::validation("namespace is empty.");
        assert_eq!(err.to_string(), "error: namespace is empty.");
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_context_keeps_kind() {
        let err = ErrorReport::parse("bad yaml").context("notes/a.md");
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert_eq!(err.message(), "notes/a.md: bad yaml");
    }

    #[test]
    fn test_json_errors_are_not_remote_failures() {
        let err: ErrorReport = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(err.message().starts_with("JSON error:"));
    }
}
