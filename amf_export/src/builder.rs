use std::f64::consts::TAU;

use crate::{geometry::Polygons, Pos};

/// Incrementally builds [`Polygons`], used to generate simple shapes.
pub struct MeshBuilder {
    vertices: Vec<Pos>,
    faces: Vec<Vec<u32>>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn add_vertex(&mut self, vertex: Pos) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    /// Adds a quad as a single polygon, vertices in winding order.
    pub fn add_quad(&mut self, quad: [u32; 4]) {
        self.faces.push(quad.to_vec());
    }

    pub fn add_polygon(&mut self, polygon: &[u32]) {
        self.faces.push(polygon.to_vec());
    }

    pub fn build(self) -> Polygons {
        Polygons::new(self.vertices, self.faces)
    }
}

impl MeshBuilder {
    /// Adds an axis aligned box with six quad faces.
    pub fn add_box(&mut self, min: Pos, max: Pos) {
        let base = self.vertices.len() as u32;
        for i in 0..8 {
            self.add_vertex(Pos::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            ));
        }

        for quad in [
            [0, 2, 3, 1],
            [4, 5, 7, 6],
            [0, 1, 5, 4],
            [2, 6, 7, 3],
            [0, 4, 6, 2],
            [1, 3, 7, 5],
        ] {
            self.add_quad(quad.map(|x| base + x));
        }
    }

    /// Adds a closed cylinder (or cone frustum) standing on `bottom`. The caps
    /// are single polygons with `precision` sides.
    pub fn add_vertical_cylinder(
        &mut self,
        bottom: Pos,
        height: f64,
        (bottom_radius, top_radius): (f64, f64),
        precision: u32,
    ) {
        let top = bottom + Pos::new(0.0, 0.0, height);

        let mut ring = Vec::with_capacity(precision as usize);
        for i in 0..precision {
            let angle = TAU * (i as f64) / (precision as f64);
            let normal = Pos::new(angle.sin(), angle.cos(), 0.0);

            let top = self.add_vertex(top + normal * top_radius);
            let bottom = self.add_vertex(bottom + normal * bottom_radius);
            ring.push((top, bottom));
        }

        for i in 0..ring.len() {
            let (last_top, last_bottom) = ring[(i + ring.len() - 1) % ring.len()];
            let (top, bottom) = ring[i];
            self.add_quad([last_bottom, last_top, top, bottom]);
        }

        let top_cap = ring.iter().rev().map(|x| x.0).collect::<Vec<_>>();
        let bottom_cap = ring.iter().map(|x| x.1).collect::<Vec<_>>();
        self.add_polygon(&top_cap);
        self.add_polygon(&bottom_cap);
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}
