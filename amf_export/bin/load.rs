use std::io::{BufRead, Seek};

use anyhow::{bail, Result};
use obj::raw::object::Polygon;

use amf_export::{geometry::Polygons, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
}

impl MeshFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        Ok(match ext.to_ascii_lowercase().as_str() {
            "stl" => MeshFormat::Stl,
            "obj" => MeshFormat::Obj,
            _ => bail!("Unsupported format: {ext}"),
        })
    }
}

/// Reads a mesh. OBJ faces are kept as polygons, the exporter triangulates
/// them.
pub fn load_mesh<T: BufRead + Seek>(mut reader: T, format: MeshFormat) -> Result<Polygons> {
    Ok(match format {
        MeshFormat::Stl => {
            let modal = stl_io::read_stl(&mut reader)?;
            Polygons::new(
                (modal.vertices.iter())
                    .map(|v| Pos::new(v[0] as f64, v[1] as f64, v[2] as f64))
                    .collect(),
                (modal.faces.iter())
                    .map(|f| f.vertices.iter().map(|&x| x as u32).collect())
                    .collect(),
            )
        }
        MeshFormat::Obj => {
            let raw = obj::raw::parse_obj(reader)?;
            Polygons::new(
                (raw.positions.iter())
                    .map(|&(x, y, z, _)| Pos::new(x as f64, y as f64, z as f64))
                    .collect(),
                raw.polygons.iter().map(polygon_indices).collect(),
            )
        }
    })
}

fn polygon_indices(polygon: &Polygon) -> Vec<u32> {
    match polygon {
        Polygon::P(v) => v.iter().map(|&x| x as u32).collect(),
        Polygon::PT(v) => v.iter().map(|x| x.0 as u32).collect(),
        Polygon::PN(v) => v.iter().map(|x| x.0 as u32).collect(),
        Polygon::PTN(v) => v.iter().map(|x| x.0 as u32).collect(),
    }
}
