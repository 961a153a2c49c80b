use std::borrow::Cow;

use nalgebra::Matrix4;

use crate::Pos;

/// Triangulated geometry of one scene object, as handed to the deduplicator.
/// The collector bakes the world transform into the vertices, so meshes coming
/// out of it always have an identity transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMesh {
    name: String,
    vertices: Vec<Pos>,
    triangles: Vec<[u32; 3]>,
    transform: Matrix4<f64>,
}

/// Meshes bundled into a single AMF object.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub meshes: Vec<SourceMesh>,
}

impl SourceMesh {
    /// Creates a mesh with an identity transform.
    pub fn new(name: impl Into<String>, vertices: Vec<Pos>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            vertices,
            triangles,
            transform: Matrix4::identity(),
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertices in the local space of the mesh.
    pub fn vertices(&self) -> &[Pos] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Transforms a point according to the world transform of the mesh.
    pub fn transform_point(&self, pos: &Pos) -> Pos {
        transform_point(&self.transform, pos)
    }

    /// Vertices in world space. Borrowed when the transform is the identity.
    pub fn world_vertices(&self) -> Cow<'_, [Pos]> {
        if self.transform == Matrix4::identity() {
            return Cow::Borrowed(&self.vertices);
        }

        Cow::Owned(self.vertices.iter().map(|v| self.transform_point(v)).collect())
    }

    /// Applies the transform to every vertex and resets it to the identity.
    pub fn into_world(mut self) -> Self {
        if self.transform != Matrix4::identity() {
            let transform = self.transform;
            (self.vertices.iter_mut()).for_each(|v| *v = transform_point(&transform, v));
            self.transform = Matrix4::identity();
        }

        self
    }

    /// Get the minimum and maximum of each component of every vertex in world
    /// space. These points define the bounding box of the mesh.
    pub fn bounds(&self) -> (Pos, Pos) {
        vertex_bounds(&self.world_vertices())
    }
}

impl Group {
    pub fn new(name: impl Into<String>, meshes: Vec<SourceMesh>) -> Self {
        Self {
            name: name.into(),
            meshes,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(SourceMesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(SourceMesh::triangle_count).sum()
    }
}

/// Builds a transform that scales, then rotates (Euler angles in radians),
/// then translates.
pub fn transformation_matrix(position: Pos, scale: Pos, rotation: Pos) -> Matrix4<f64> {
    let scale = Matrix4::new_nonuniform_scaling(&scale);
    let rotation = Matrix4::from_euler_angles(rotation.x, rotation.y, rotation.z);
    let translation = Matrix4::new_translation(&position);

    translation * rotation * scale
}

pub fn transform_point(transform: &Matrix4<f64>, pos: &Pos) -> Pos {
    (transform * pos.push(1.0)).xyz()
}

/// Get the minimum and maximum of each component of every vertex.
fn vertex_bounds(vertices: &[Pos]) -> (Pos, Pos) {
    vertices.iter().fold(
        (Pos::repeat(f64::MAX), Pos::repeat(f64::MIN)),
        |(min, max), v| (min.inf(v), max.sup(v)),
    )
}
