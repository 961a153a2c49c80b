use std::collections::HashSet;

use common::units::Unit;
use nalgebra::Vector3;
use thiserror::Error;

use crate::AMF_VERSION;

/// In memory form of an AMF file.
#[derive(Debug, Clone, PartialEq)]
pub struct AmfDocument {
    pub unit: Unit,
    pub version: String,
    pub metadata: Vec<Metadata>,
    pub objects: Vec<Object>,
    pub constellations: Vec<Constellation>,
}

/// A `<metadata type="...">value</metadata>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub id: u32,
    pub metadata: Vec<Metadata>,
    pub mesh: Mesh,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vector3<f64>>,
    pub volumes: Vec<Volume>,
}

/// A closed region of a mesh, as triangles indexing into the mesh vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Volume {
    pub metadata: Vec<Metadata>,
    pub triangles: Vec<[u32; 3]>,
}

/// Places instances of objects (or other constellations) relative to each
/// other.
#[derive(Debug, Clone, PartialEq)]
pub struct Constellation {
    pub id: u32,
    pub metadata: Vec<Metadata>,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub object_id: u32,
    /// Translation, in document units.
    pub delta: Vector3<f64>,
    /// Rotation around each axis, in degrees.
    pub rotation: Vector3<f64>,
}

/// Ways a document can break the AMF schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("document has no objects")]
    NoObjects,
    #[error("id {0} is used more than once")]
    DuplicateId(u32),
    #[error("object {object} has no volumes")]
    NoVolumes { object: u32 },
    #[error("volume {volume} of object {object} has no triangles")]
    EmptyVolume { object: u32, volume: usize },
    #[error("object {object} references vertex {vertex} but has {count} vertices")]
    VertexOutOfRange { object: u32, vertex: u32, count: usize },
    #[error("object {object} has a non finite coordinate at vertex {vertex}")]
    NonFiniteVertex { object: u32, vertex: usize },
    #[error("constellation {constellation} has no instances")]
    EmptyConstellation { constellation: u32 },
    #[error("constellation {constellation} references unknown id {id}")]
    UnknownInstance { constellation: u32, id: u32 },
}

impl AmfDocument {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            version: AMF_VERSION.to_owned(),
            metadata: Vec::new(),
            objects: Vec::new(),
            constellations: Vec::new(),
        }
    }

    pub fn object(&self, id: u32) -> Option<&Object> {
        self.objects.iter().find(|x| x.id == id)
    }

    pub fn metadata(&self, kind: &str) -> Option<&str> {
        find_metadata(&self.metadata, kind)
    }

    pub fn vertex_count(&self) -> usize {
        self.objects.iter().map(|x| x.mesh.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(|x| x.mesh.triangle_count()).sum()
    }

    pub fn volume_count(&self) -> usize {
        self.objects.iter().map(|x| x.mesh.volumes.len()).sum()
    }

    /// Checks the structural rules of the AMF schema that the type system
    /// can't express.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.objects.is_empty() {
            return Err(SchemaError::NoObjects);
        }

        let mut ids = HashSet::new();
        let all_ids = (self.objects.iter().map(|x| x.id))
            .chain(self.constellations.iter().map(|x| x.id));
        for id in all_ids {
            if !ids.insert(id) {
                return Err(SchemaError::DuplicateId(id));
            }
        }

        for object in &self.objects {
            object.validate()?;
        }

        for constellation in &self.constellations {
            if constellation.instances.is_empty() {
                return Err(SchemaError::EmptyConstellation {
                    constellation: constellation.id,
                });
            }

            for instance in &constellation.instances {
                if !ids.contains(&instance.object_id) || instance.object_id == constellation.id {
                    return Err(SchemaError::UnknownInstance {
                        constellation: constellation.id,
                        id: instance.object_id,
                    });
                }
            }
        }

        Ok(())
    }
}

impl Object {
    pub fn new(id: u32, mesh: Mesh) -> Self {
        Self {
            id,
            metadata: Vec::new(),
            mesh,
        }
    }

    pub fn name(&self) -> Option<&str> {
        find_metadata(&self.metadata, "name")
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let id = self.id;
        if self.mesh.volumes.is_empty() {
            return Err(SchemaError::NoVolumes { object: id });
        }

        let non_finite = (self.mesh.vertices.iter()).position(|v| v.iter().any(|c| !c.is_finite()));
        if let Some(vertex) = non_finite {
            return Err(SchemaError::NonFiniteVertex { object: id, vertex });
        }

        let count = self.mesh.vertices.len();
        for (volume_idx, volume) in self.mesh.volumes.iter().enumerate() {
            if volume.triangles.is_empty() {
                return Err(SchemaError::EmptyVolume {
                    object: id,
                    volume: volume_idx,
                });
            }

            let vertex = volume.triangles.iter().flatten().find(|&&v| v as usize >= count);
            if let Some(&vertex) = vertex {
                return Err(SchemaError::VertexOutOfRange {
                    object: id,
                    vertex,
                    count,
                });
            }
        }

        Ok(())
    }
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.volumes.iter().map(|x| x.triangles.len()).sum()
    }
}

impl Volume {
    pub fn name(&self) -> Option<&str> {
        find_metadata(&self.metadata, "name")
    }
}

impl Instance {
    pub fn new(object_id: u32) -> Self {
        Self {
            object_id,
            delta: Vector3::zeros(),
            rotation: Vector3::zeros(),
        }
    }
}

impl Metadata {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

fn find_metadata<'a>(metadata: &'a [Metadata], kind: &str) -> Option<&'a str> {
    (metadata.iter())
        .find(|x| x.kind == kind)
        .map(|x| x.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_object(id: u32) -> Object {
        Object::new(
            id,
            Mesh {
                vertices: vec![Vector3::zeros(), Vector3::x(), Vector3::y()],
                volumes: vec![Volume {
                    metadata: Vec::new(),
                    triangles: vec![[0, 1, 2]],
                }],
            },
        )
    }

    #[test]
    fn valid_document() {
        let mut doc = AmfDocument::new(Unit::Millimeter);
        doc.objects.push(triangle_object(0));
        doc.objects.push(triangle_object(1));
        doc.constellations.push(Constellation {
            id: 2,
            metadata: Vec::new(),
            instances: vec![Instance::new(0), Instance::new(1)],
        });

        assert_eq!(doc.validate(), Ok(()));
        assert_eq!(doc.volume_count(), 2);
        assert_eq!(doc.vertex_count(), 6);
        assert_eq!(doc.triangle_count(), 2);
    }

    #[test]
    fn empty_document_is_invalid() {
        let doc = AmfDocument::new(Unit::Meter);
        assert_eq!(doc.validate(), Err(SchemaError::NoObjects));
        assert_eq!(doc.volume_count(), 0);
    }

    #[test]
    fn detects_broken_objects() {
        let mut doc = AmfDocument::new(Unit::Millimeter);
        doc.objects.push(triangle_object(0));
        doc.objects.push(triangle_object(0));
        assert_eq!(doc.validate(), Err(SchemaError::DuplicateId(0)));

        doc.objects[1].id = 1;
        doc.objects[1].mesh.volumes[0].triangles.push([0, 1, 3]);
        assert_eq!(
            doc.validate(),
            Err(SchemaError::VertexOutOfRange {
                object: 1,
                vertex: 3,
                count: 3
            })
        );

        doc.objects[1].mesh.volumes[0].triangles.clear();
        assert_eq!(
            doc.validate(),
            Err(SchemaError::EmptyVolume {
                object: 1,
                volume: 0
            })
        );

        doc.objects[1].mesh.volumes.clear();
        assert_eq!(doc.validate(), Err(SchemaError::NoVolumes { object: 1 }));
    }

    #[test]
    fn detects_dangling_instances() {
        let mut doc = AmfDocument::new(Unit::Millimeter);
        doc.objects.push(triangle_object(0));
        doc.constellations.push(Constellation {
            id: 1,
            metadata: Vec::new(),
            instances: vec![Instance::new(5)],
        });

        assert_eq!(
            doc.validate(),
            Err(SchemaError::UnknownInstance {
                constellation: 1,
                id: 5
            })
        );
    }
}
