//! Operation-level error reporting.
//!
//! Public registry operations never fail across their boundary. Instead
//! they append [`OperationError`]s to a caller-supplied [`ErrorList`] and the
//! caller decides what is fatal.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::xml::XmlError;


#[derive(Debug, Error, Diagnostic)]
pub enum OperationError {
    #[error("The configuration file {} does not exist.", path.display())]
    #[diagnostic(code(P001), help("Specify a valid configuration file path."))]
    DocumentMissing { path: PathBuf },

    #[error("The configuration file {} could not be accessed.", path.display())]
    #[diagnostic(code(P002))]
    DocumentAccess {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    #[error("The requested configuration name '{name}' is not known.")]
    #[diagnostic(code(S001), help("Specify one of the valid configuration names."))]
    UnknownConfiguration { name: String },

    #[error("The update for configuration '{name}' is not valid XML.")]
    #[diagnostic(code(S002))]
    MalformedUpdate {
        name: String,
        #[source]
        source: XmlError,
    },

    #[error("Configuration '{name}' does not support {operation}.")]
    #[diagnostic(code(M001))]
    NotSupported {
        name: String,
        operation: &'static str,
    },

    #[error("Configuration '{name}' failed to {operation}: {reason}")]
    #[diagnostic(code(M002))]
    MigrationFailed {
        name: String,
        operation: &'static str,
        reason: String,
    },

    #[error("The file {} is not a valid XML file.", path.display())]
    #[diagnostic(code(C001))]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: XmlError,
    },
}

impl OperationError {
    /// The stable code callers match on.
    pub fn code(&self) -> &'static str {
        match self {
            OperationError::DocumentMissing { .. } => "P001",
            OperationError::DocumentAccess { .. } => "P002",
            OperationError::UnknownConfiguration { .. } => "S001",
            OperationError::MalformedUpdate { .. } => "S002",
            OperationError::NotSupported { .. } => "M001",
            OperationError::MigrationFailed { .. } => "M002",
            OperationError::InvalidFile { .. } => "C001",
        }
    }
}


/// An accumulating list of operation errors.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<OperationError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: OperationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationError> {
        self.errors.iter()
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.errors.iter().any(|error| error.code() == code)
    }

    pub fn into_vec(self) -> Vec<OperationError> {
        self.errors
    }
}

impl IntoIterator for ErrorList {
    type Item = OperationError;
    type IntoIter = std::vec::IntoIter<OperationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
