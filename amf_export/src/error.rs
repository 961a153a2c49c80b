use amf_format::SchemaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Ways an export can fail.
#[derive(Error, Debug)]
pub enum Error {
    /// Nothing was selected for export.
    #[error("no objects selected for export")]
    EmptySelection,

    /// An object has geometry the exporter can't represent.
    #[error("object `{object}` has unsupported geometry: {reason}")]
    UnsupportedGeometry { object: String, reason: String },

    /// An object (or the export settings) contain values that can't be
    /// processed, like non finite coordinates.
    #[error("object `{object}` has invalid geometry: {reason}")]
    InvalidGeometry { object: String, reason: String },

    /// The built document would break the AMF schema.
    #[error("document violates the AMF schema: {0}")]
    SchemaViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize the document.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub(crate) fn unsupported(object: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedGeometry {
            object: object.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(object: &str, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            object: object.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::SchemaViolation(err.to_string())
    }
}
