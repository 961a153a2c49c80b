//! Ear clipping triangulation of planar polygons.
//!
//! Polygons are projected onto the coordinate plane most perpendicular to
//! their Newell normal. Ears are searched starting from the second vertex, so
//! convex polygons come out as a fan around their first vertex.

use nalgebra::Vector2;

use crate::Pos;

/// Triangulates one face, appending the triangles to `out`. Winding follows
/// the face order. Returns a short reason when the face can't be
/// triangulated.
pub fn triangulate(
    face: &[u32],
    vertices: &[Pos],
    out: &mut Vec<[u32; 3]>,
) -> Result<(), &'static str> {
    if face.len() < 3 {
        return Err("face has fewer than three vertices");
    }

    if face.iter().any(|&i| i as usize >= vertices.len()) {
        return Err("face references a vertex that doesn't exist");
    }

    if let [a, b, c] = *face {
        out.push([a, b, c]);
        return Ok(());
    }

    let normal = newell_normal(face, vertices);
    let axis = normal.iamax();
    if normal[axis] == 0.0 {
        return Err("face has no area");
    }

    // Keep the projection counter-clockwise so ears are always convex corners
    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
    let flip = normal[axis] < 0.0;
    let points = (face.iter())
        .map(|&i| {
            let p = vertices[i as usize];
            if flip {
                Vector2::new(p[v], p[u])
            } else {
                Vector2::new(p[u], p[v])
            }
        })
        .collect::<Vec<_>>();

    let mut remaining = (0..face.len()).collect::<Vec<_>>();
    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len)
            .map(|k| (k + 1) % len)
            .find(|&i| {
                let prev = remaining[(i + len - 1) % len];
                let next = remaining[(i + 1) % len];
                is_ear(&points, &remaining, [prev, remaining[i], next])
            })
            .ok_or("face is self intersecting or degenerate")?;

        let prev = remaining[(ear + len - 1) % len];
        let next = remaining[(ear + 1) % len];
        out.push([face[prev], face[remaining[ear]], face[next]]);
        remaining.remove(ear);
    }

    out.push([face[remaining[0]], face[remaining[1]], face[remaining[2]]]);
    Ok(())
}

/// Sum of the cross products of consecutive vertices. Its direction is the
/// polygon normal and its length twice the polygon area, even for concave
/// polygons.
pub fn newell_normal(face: &[u32], vertices: &[Pos]) -> Pos {
    let mut normal = Pos::zeros();
    for (i, &a) in face.iter().enumerate() {
        let a = vertices[a as usize];
        let b = vertices[face[(i + 1) % face.len()] as usize];
        normal += a.cross(&b);
    }
    normal
}

fn is_ear(points: &[Vector2<f64>], remaining: &[usize], [a, b, c]: [usize; 3]) -> bool {
    let (pa, pb, pc) = (points[a], points[b], points[c]);
    if cross(pa, pb, pc) <= 0.0 {
        return false;
    }

    // No other vertex may sit inside or on the edge of the ear, except for
    // duplicates of its own corners
    !remaining.iter().any(|&i| {
        let p = points[i];
        i != a
            && i != b
            && i != c
            && p != pa
            && p != pb
            && p != pc
            && cross(pa, pb, p) >= 0.0
            && cross(pb, pc, p) >= 0.0
            && cross(pc, pa, p) >= 0.0
    })
}

fn cross(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    (b - a).perp(&(c - a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn area(triangles: &[[u32; 3]], vertices: &[Pos]) -> f64 {
        (triangles.iter())
            .map(|t| newell_normal(t, vertices).norm() / 2.0)
            .sum()
    }

    #[test]
    fn triangle_passes_through() {
        let vertices = [Pos::zeros(), Pos::x(), Pos::y()];
        let mut out = Vec::new();
        triangulate(&[2, 0, 1], &vertices, &mut out).unwrap();
        assert_eq!(out, vec![[2, 0, 1]]);
    }

    #[test]
    fn convex_polygon_is_a_fan() {
        let vertices = [
            Pos::new(0.0, 0.0, 0.0),
            Pos::new(1.0, 0.0, 0.0),
            Pos::new(1.0, 1.0, 0.0),
            Pos::new(0.0, 1.0, 0.0),
        ];
        let mut out = Vec::new();
        triangulate(&[0, 1, 2, 3], &vertices, &mut out).unwrap();
        assert_eq!(out, vec![[0, 1, 2], [0, 2, 3]]);

        // Same quad wound the other way, projected with a flipped axis
        out.clear();
        triangulate(&[3, 2, 1, 0], &vertices, &mut out).unwrap();
        assert_eq!(out, vec![[3, 2, 1], [3, 1, 0]]);
    }

    #[test]
    fn concave_polygon() {
        // An L shape in the xz plane, its reflex corner is vertex 3
        let vertices = [
            Pos::new(0.0, 0.0, 0.0),
            Pos::new(2.0, 0.0, 0.0),
            Pos::new(2.0, 0.0, 1.0),
            Pos::new(1.0, 0.0, 1.0),
            Pos::new(1.0, 0.0, 2.0),
            Pos::new(0.0, 0.0, 2.0),
        ];
        let face = [0, 1, 2, 3, 4, 5];
        let mut out = Vec::new();
        triangulate(&face, &vertices, &mut out).unwrap();

        assert_eq!(out.len(), 4);
        assert!((area(&out, &vertices) - 3.0).abs() < 1e-12);

        // Every triangle has the same orientation as the polygon
        let normal = newell_normal(&face, &vertices);
        for triangle in &out {
            assert!(newell_normal(triangle, &vertices).dot(&normal) > 0.0);
        }
    }

    #[test]
    fn collinear_vertex_on_edge() {
        let vertices = [
            Pos::new(0.0, 0.0, 0.0),
            Pos::new(1.0, 0.0, 0.0),
            Pos::new(2.0, 0.0, 0.0),
            Pos::new(2.0, 2.0, 0.0),
            Pos::new(0.0, 2.0, 0.0),
        ];
        let mut out = Vec::new();
        triangulate(&[0, 1, 2, 3, 4], &vertices, &mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert!((area(&out, &vertices) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_broken_faces() {
        let vertices = [Pos::zeros(), Pos::x(), Pos::x() * 2.0, Pos::x() * 3.0];
        let mut out = Vec::new();
        assert!(triangulate(&[0, 1], &vertices, &mut out).is_err());
        assert!(triangulate(&[0, 1, 7], &vertices, &mut out).is_err());
        assert!(triangulate(&[0, 1, 2, 3], &vertices, &mut out).is_err());
        assert!(out.is_empty());
    }

    proptest! {
        #[test]
        fn star_polygons_keep_their_area(
            radii in proptest::collection::vec(0.2_f64..2.0, 3..24),
            spike in 0.05_f64..1.0,
        ) {
            // Alternate radii so most stars are concave
            let count = radii.len();
            let vertices = (radii.iter().enumerate())
                .map(|(i, r)| {
                    let angle = std::f64::consts::TAU * i as f64 / count as f64;
                    let r = if i % 2 == 0 { *r } else { r * spike };
                    Pos::new(r * angle.cos(), r * angle.sin(), 1.0)
                })
                .collect::<Vec<_>>();
            let face = (0..count as u32).collect::<Vec<_>>();

            let mut out = Vec::new();
            triangulate(&face, &vertices, &mut out).unwrap();
            prop_assert_eq!(out.len(), count - 2);

            let expected = newell_normal(&face, &vertices).norm() / 2.0;
            prop_assert!((area(&out, &vertices) - expected).abs() < 1e-9 * expected.max(1.0));
        }
    }
}
