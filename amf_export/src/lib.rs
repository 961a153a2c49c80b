//! Exports scene geometry to AMF. Selected objects are collected into world
//! space triangle meshes and grouped ([`collector`]), welded ([`dedup`]), laid
//! out as an AMF document ([`document`]) and written out atomically
//! ([`export`]).

use nalgebra::Vector3;

pub mod builder;
pub mod collector;
pub mod dedup;
pub mod document;
pub mod error;
pub mod export;
pub mod geometry;
pub mod mesh;
pub mod scene;
pub mod triangulate;

pub use error::{Error, Result};
pub use export::{export, export_selection, export_to_bytes, ExportReport};

pub type Pos = Vector3<f64>;
