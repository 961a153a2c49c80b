//! Geometry sources of scene objects. Everything the exporter needs from a
//! host object is its local space polygons, so every kind of object (plain
//! meshes, instanced duplicates, anything a host can tessellate) is reduced to
//! the [`Geometry`] trait.

use std::{borrow::Cow, fmt, sync::Arc};

use nalgebra::Matrix4;

use crate::{mesh::transform_point, Pos};

/// Local space polygons of arbitrary arity. Faces index into `vertices` and
/// are wound counter-clockwise when seen from outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygons {
    pub vertices: Vec<Pos>,
    pub faces: Vec<Vec<u32>>,
}

pub trait Geometry: Send + Sync {
    fn polygons(&self) -> Cow<'_, Polygons>;
}

/// Instanced duplicate of another geometry, placed with its own offset.
#[derive(Clone)]
pub struct Instance {
    source: Arc<dyn Geometry>,
    offset: Matrix4<f64>,
}

impl Polygons {
    pub fn new(vertices: Vec<Pos>, faces: Vec<Vec<u32>>) -> Self {
        Self { vertices, faces }
    }

    pub fn from_triangles(vertices: Vec<Pos>, triangles: &[[u32; 3]]) -> Self {
        let faces = triangles.iter().map(|x| x.to_vec()).collect();
        Self { vertices, faces }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of triangles a fan or ear clipping triangulation produces.
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|x| x.len().saturating_sub(2)).sum()
    }
}

impl Geometry for Polygons {
    fn polygons(&self) -> Cow<'_, Polygons> {
        Cow::Borrowed(self)
    }
}

impl Instance {
    pub fn new(source: Arc<dyn Geometry>, offset: Matrix4<f64>) -> Self {
        Self { source, offset }
    }
}

impl Geometry for Instance {
    fn polygons(&self) -> Cow<'_, Polygons> {
        let mut polygons = self.source.polygons().into_owned();
        (polygons.vertices.iter_mut()).for_each(|v| *v = transform_point(&self.offset, v));
        Cow::Owned(polygons)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
