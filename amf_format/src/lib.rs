//! Reading and writing of the Additive Manufacturing File Format (AMF), the
//! XML mesh interchange format of ASTM 52915.

mod document;
mod number;
mod reader;
mod writer;

pub use document::{
    AmfDocument, Constellation, Instance, Mesh, Metadata, Object, SchemaError, Volume,
};
pub use number::format_number;
pub use reader::parse;
pub use writer::{serialize, write, WriteOptions};

/// Version of the AMF schema written in the root `version` attribute.
pub const AMF_VERSION: &str = "1.1";
