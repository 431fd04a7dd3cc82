//! Error types for butterfly-csv
//!
//! Provides the error taxonomy shared by parsing, export and writing.

use std::path::PathBuf;

use crate::core::model::ElementId;

/// Main error type for butterfly-csv operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input path does not exist or is not a regular file
    #[error("Source '{}' not found or not a file", .0.display())]
    SourceNotFound(PathBuf),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The markup is not well-formed
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Input ended before the root element was closed, or had none
    #[error("Truncated document: {0}")]
    Truncated(String),

    /// A required attribute is absent
    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// An attribute is present but its text cannot be decoded
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    /// A way references a node that is not (yet) in the graph
    #[error("Way {way} references node {node}, which is not defined before it")]
    UnresolvedReference { way: ElementId, node: ElementId },

    /// A model invariant would be broken
    #[error("Invalid element: {0}")]
    InvalidElement(String),

    /// Output location is not a usable directory
    #[error("Invalid destination folder: {}", .0.display())]
    InvalidOutput(PathBuf),

    /// Destination file exists and overwriting is not allowed
    #[error("File already exists: {} (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    /// Writing one of the output tables failed
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV rendering failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(quick_xml::Error::InvalidAttr(err))
    }
}

/// Convenience result type for butterfly-csv operations
pub type Result<T> = std::result::Result<T, Error>;
