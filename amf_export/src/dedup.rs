//! Vertex welding. Vertices closer than the merge tolerance collapse into the
//! first of them, triangles that lose an edge in the process are dropped and
//! vertices nothing references anymore are removed.

use std::{collections::HashMap, slice};

use crate::{
    error::{Error, Result},
    mesh::SourceMesh,
    Pos,
};

/// A single mesh after welding.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactMesh {
    pub vertices: Vec<Pos>,
    pub triangles: Vec<[u32; 3]>,
    /// Input vertices that were merged into an earlier one.
    pub merged: usize,
    /// Triangles dropped because two of their corners merged.
    pub dropped: usize,
    /// Distinct vertices removed because no triangle referenced them.
    pub unused: usize,
}

/// Meshes welded over one shared vertex table, with the triangles of each
/// input mesh kept apart.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactGroup {
    pub vertices: Vec<Pos>,
    /// One triangle list per input mesh, in input order.
    pub volumes: Vec<Vec<[u32; 3]>>,
    pub merged: usize,
    pub dropped: usize,
    pub unused: usize,
}

/// Spatial hash of the vertices kept so far. Cells are as wide as the
/// tolerance, so any vertex within tolerance of a point lies in the cell of
/// the point or one of its 26 neighbours. With a tolerance of zero the cells
/// are keyed by the exact coordinate bits instead.
struct VertexGrid {
    tolerance: f64,
    vertices: Vec<Pos>,
    cells: HashMap<[i64; 3], Vec<u32>>,
}

pub fn compact(mesh: &SourceMesh, tolerance: f64) -> Result<CompactMesh> {
    let group = compact_group(slice::from_ref(mesh), tolerance)?;
    let triangles = group.volumes.into_iter().next().unwrap_or_default();

    Ok(CompactMesh {
        vertices: group.vertices,
        triangles,
        merged: group.merged,
        dropped: group.dropped,
        unused: group.unused,
    })
}

/// Welds `meshes` over one shared vertex table. A triangle is dropped as
/// degenerate as soon as any two of its corners weld onto the same vertex,
/// not only when all three do. Fails with `InvalidGeometry` for a negative or
/// non finite tolerance or a non finite coordinate.
pub fn compact_group(meshes: &[SourceMesh], tolerance: f64) -> Result<CompactGroup> {
    if !(tolerance.is_finite() && tolerance >= 0.0) {
        let object = meshes.first().map_or("", |x| x.name());
        return Err(Error::invalid(
            object,
            format!("merge tolerance must be finite and not negative, got {tolerance}"),
        ));
    }

    let mut grid = VertexGrid::new(tolerance);
    let mut volumes = Vec::with_capacity(meshes.len());
    let (mut input, mut dropped) = (0, 0);

    for mesh in meshes {
        let vertices = mesh.world_vertices();
        let non_finite = vertices.iter().position(|v| v.iter().any(|c| !c.is_finite()));
        if let Some(vertex) = non_finite {
            return Err(Error::invalid(
                mesh.name(),
                format!("vertex {vertex} has a non finite coordinate"),
            ));
        }

        input += vertices.len();
        let remap = vertices.iter().map(|x| grid.insert(x)).collect::<Vec<_>>();

        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        for (i, triangle) in mesh.triangles().iter().enumerate() {
            if let Some(vertex) = triangle.iter().find(|&&x| x as usize >= remap.len()) {
                return Err(Error::unsupported(
                    mesh.name(),
                    format!(
                        "triangle {i} references vertex {vertex} but there are only {} vertices",
                        remap.len()
                    ),
                ));
            }

            let [a, b, c] = triangle.map(|x| remap[x as usize]);
            if a == b || b == c || c == a {
                dropped += 1;
                continue;
            }

            triangles.push([a, b, c]);
        }

        volumes.push(triangles);
    }

    let welded = grid.into_vertices();
    let merged = input - welded.len();

    let mut used = vec![false; welded.len()];
    for &index in volumes.iter().flatten().flatten() {
        used[index as usize] = true;
    }

    let mut new_index = vec![0; welded.len()];
    let mut vertices = Vec::with_capacity(welded.len());
    for (i, vertex) in welded.into_iter().enumerate() {
        if used[i] {
            new_index[i] = vertices.len() as u32;
            vertices.push(vertex);
        }
    }

    (volumes.iter_mut().flatten()).for_each(|x| *x = x.map(|i| new_index[i as usize]));

    Ok(CompactGroup {
        unused: used.len() - vertices.len(),
        vertices,
        volumes,
        merged,
        dropped,
    })
}

impl CompactMesh {
    /// Converts back into a world space source mesh.
    pub fn to_source(&self, name: impl Into<String>) -> SourceMesh {
        SourceMesh::new(name, self.vertices.clone(), self.triangles.clone())
    }
}

impl CompactGroup {
    pub fn triangle_count(&self) -> usize {
        self.volumes.iter().map(Vec::len).sum()
    }
}

impl VertexGrid {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            vertices: Vec::new(),
            cells: HashMap::new(),
        }
    }

    /// Index of the vertex `pos` welds to, adding it if there is none.
    fn insert(&mut self, pos: &Pos) -> u32 {
        let cell = self.cell(pos);
        if let Some(index) = self.find(pos, cell) {
            return index;
        }

        let index = self.vertices.len() as u32;
        self.vertices.push(*pos);
        self.cells.entry(cell).or_default().push(index);
        index
    }

    /// Lowest index kept vertex within tolerance of `pos`.
    fn find(&self, pos: &Pos, cell: [i64; 3]) -> Option<u32> {
        let radius = if self.tolerance == 0.0 { 0 } else { 1 };

        let mut best = None;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let key = [
                        cell[0].saturating_add(dx),
                        cell[1].saturating_add(dy),
                        cell[2].saturating_add(dz),
                    ];

                    let Some(candidates) = self.cells.get(&key) else {
                        continue;
                    };

                    for &i in candidates {
                        let close = (self.vertices[i as usize] - pos).norm() <= self.tolerance;
                        if close && best.map_or(true, |x| i < x) {
                            best = Some(i);
                        }
                    }
                }
            }
        }

        best
    }

    fn cell(&self, pos: &Pos) -> [i64; 3] {
        let quantize = |c: f64| {
            if self.tolerance == 0.0 {
                // Negative zero has to land in the cell of positive zero
                let c = if c == 0.0 { 0.0 } else { c };
                c.to_bits() as i64
            } else {
                (c / self.tolerance).floor() as i64
            }
        };

        [quantize(pos.x), quantize(pos.y), quantize(pos.z)]
    }

    fn into_vertices(self) -> Vec<Pos> {
        self.vertices
    }
}
