//! Assembles collected groups into an [`AmfDocument`].

use amf_format::{AmfDocument, Constellation, Instance, Mesh, Metadata, Object, Volume};
use common::{config::ExportConfig, format::Layout, units::Unit};
use tracing::{debug, warn};

use crate::{
    dedup::{compact, compact_group},
    error::{Error, Result},
    mesh::Group,
    Pos,
};

/// Value of the `generator` metadata of exported documents.
pub const GENERATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Unit declared by the document.
    pub unit: Unit,
    /// Factor applied to every coordinate after welding.
    pub scale: f64,
    /// Merge tolerance, in the units of the collected meshes.
    pub tolerance: f64,
    pub layout: Layout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub objects: usize,
    pub constellations: usize,
    pub volumes: usize,
    pub vertices: usize,
    pub triangles: usize,
    /// Vertices merged into another one while welding.
    pub merged_vertices: usize,
    pub dropped_triangles: usize,
    /// Groups left out because nothing but degenerate triangles remained.
    pub dropped_groups: usize,
}

pub struct BuiltDocument {
    pub document: AmfDocument,
    pub stats: ExportStats,
}

/// Welds every group and lays the result out as AMF objects. The `metadata`
/// is attached to the document root as is.
pub fn build(groups: &[Group], metadata: &[Metadata], options: &BuildOptions) -> Result<BuiltDocument> {
    let mut builder = DocumentBuilder {
        document: AmfDocument::new(options.unit),
        stats: ExportStats::default(),
        options,
        next_id: 0,
    };
    builder.document.metadata = metadata.to_vec();

    match options.layout {
        Layout::Grouped => groups.iter().try_for_each(|x| builder.add_group(x))?,
        Layout::Constellation => builder.add_constellations(groups)?,
    }

    let BuiltDocument { document, stats } = builder.finish();
    if document.objects.is_empty() {
        return Err(Error::SchemaViolation(
            "nothing left to export, every group is empty or degenerate".into(),
        ));
    }

    document.validate()?;
    Ok(BuiltDocument { document, stats })
}

struct DocumentBuilder<'a> {
    document: AmfDocument,
    stats: ExportStats,
    options: &'a BuildOptions,
    next_id: u32,
}

impl DocumentBuilder<'_> {
    /// One object for the whole group, each mesh a named volume.
    fn add_group(&mut self, group: &Group) -> Result<()> {
        if group.meshes.is_empty() {
            warn!("Dropping group `{}`, it has no meshes", group.name);
            self.stats.dropped_groups += 1;
            return Ok(());
        }

        let compact = compact_group(&group.meshes, self.options.tolerance)?;
        self.stats.merged_vertices += compact.merged;
        self.stats.dropped_triangles += compact.dropped;

        let mut volumes = Vec::new();
        for (mesh, triangles) in group.meshes.iter().zip(compact.volumes) {
            if triangles.is_empty() {
                warn!(
                    "Dropping `{}` from group `{}`, all of its triangles are degenerate",
                    mesh.name(),
                    group.name
                );
                continue;
            }

            volumes.push(Volume {
                metadata: vec![Metadata::new("name", mesh.name())],
                triangles,
            });
        }

        if volumes.is_empty() {
            warn!("Dropping group `{}`, all of its triangles are degenerate", group.name);
            self.stats.dropped_groups += 1;
            return Ok(());
        }

        self.add_object(&group.name, &compact.vertices, volumes);
        Ok(())
    }

    /// One object per mesh, each group a constellation of its objects placed
    /// where they already are.
    fn add_constellations(&mut self, groups: &[Group]) -> Result<()> {
        let mut placed = Vec::new();
        for group in groups {
            let mut ids = Vec::new();
            for mesh in &group.meshes {
                let compact = compact(mesh, self.options.tolerance)?;
                self.stats.merged_vertices += compact.merged;
                self.stats.dropped_triangles += compact.dropped;

                if compact.triangles.is_empty() {
                    warn!(
                        "Dropping `{}` from group `{}`, all of its triangles are degenerate",
                        mesh.name(),
                        group.name
                    );
                    continue;
                }

                let volume = Volume {
                    metadata: Vec::new(),
                    triangles: compact.triangles,
                };
                ids.push(self.add_object(mesh.name(), &compact.vertices, vec![volume]));
            }

            if ids.is_empty() {
                warn!("Dropping group `{}`, it has no usable meshes", group.name);
                self.stats.dropped_groups += 1;
                continue;
            }

            placed.push((group.name.as_str(), ids));
        }

        // Constellation ids continue after the last object
        for (name, ids) in placed {
            let id = self.take_id();
            debug!("Adding constellation {id} `{name}` with {} instances", ids.len());
            self.document.constellations.push(Constellation {
                id,
                metadata: vec![Metadata::new("name", name)],
                instances: ids.into_iter().map(Instance::new).collect(),
            });
            self.stats.constellations += 1;
        }

        Ok(())
    }

    fn add_object(&mut self, name: &str, vertices: &[Pos], volumes: Vec<Volume>) -> u32 {
        let id = self.take_id();
        let scale = self.options.scale;

        let mesh = Mesh {
            vertices: vertices.iter().map(|x| x * scale).collect(),
            volumes,
        };
        debug!(
            "Adding object {id} `{name}` with {} vertices and {} triangles",
            mesh.vertices.len(),
            mesh.triangle_count()
        );

        self.stats.objects += 1;
        self.stats.volumes += mesh.volumes.len();
        self.stats.vertices += mesh.vertices.len();
        self.stats.triangles += mesh.triangle_count();

        let mut object = Object::new(id, mesh);
        object.metadata.push(Metadata::new("name", name));
        self.document.objects.push(object);
        id
    }

    fn take_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id - 1
    }

    fn finish(self) -> BuiltDocument {
        BuiltDocument {
            document: self.document,
            stats: self.stats,
        }
    }
}

impl From<&ExportConfig> for BuildOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            unit: config.unit,
            scale: config.unit_scale(),
            tolerance: config.tolerance,
            layout: config.layout,
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}
