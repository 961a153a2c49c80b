use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use common::units::Unit;

use crate::{AmfDocument, Constellation, Instance, Mesh, Metadata, Object, Volume};

/// Parses an uncompressed AMF document. Elements this crate doesn't model
/// (colors, materials, textures) are skipped.
pub fn parse(content: &str) -> Result<AmfDocument> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut parser = Parser::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => parser.start(&e)?,
            Event::Empty(e) => {
                parser.start(&e)?;
                parser.end()?;
            }
            Event::Text(e) => parser.text(&e.unescape()?)?,
            Event::CData(e) => parser.text(&String::from_utf8_lossy(&e))?,
            Event::End(_) => parser.end()?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

struct Parser {
    doc: AmfDocument,
    seen_root: bool,
    path: Vec<String>,

    object: Option<Object>,
    volume: Option<Volume>,
    vertex: Vector3<f64>,
    triangle: [u32; 3],
    constellation: Option<Constellation>,
    instance: Option<Instance>,
    metadata: Option<Metadata>,
}

impl Parser {
    fn new() -> Self {
        Self {
            doc: AmfDocument::new(Unit::Millimeter),
            seen_root: false,
            path: Vec::new(),

            object: None,
            volume: None,
            vertex: Vector3::zeros(),
            triangle: [0; 3],
            constellation: None,
            instance: None,
            metadata: None,
        }
    }

    fn start(&mut self, e: &BytesStart) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        match name.as_str() {
            "amf" => {
                self.seen_root = true;
                if let Some(unit) = attribute(e, "unit")? {
                    self.doc.unit = unit.parse().map_err(anyhow::Error::msg)?;
                }
                if let Some(version) = attribute(e, "version")? {
                    self.doc.version = version;
                }
            }
            "object" => {
                let id = id_attribute(e, "id").context("Invalid object")?;
                self.object = Some(Object::new(id, Mesh::default()));
            }
            "volume" => self.volume = Some(Volume::default()),
            "vertex" => self.vertex = Vector3::zeros(),
            "triangle" => self.triangle = [0; 3],
            "constellation" => {
                let id = id_attribute(e, "id").context("Invalid constellation")?;
                self.constellation = Some(Constellation {
                    id,
                    metadata: Vec::new(),
                    instances: Vec::new(),
                });
            }
            "instance" => {
                let id = id_attribute(e, "objectid").context("Invalid instance")?;
                self.instance = Some(Instance::new(id));
            }
            "metadata" => {
                let kind = attribute(e, "type")?.unwrap_or_default();
                self.metadata = Some(Metadata::new(kind, String::new()));
            }
            _ => {}
        }

        self.path.push(name);
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let Some(name) = self.path.last() else {
            return Ok(());
        };
        let parent = self.path.len().checked_sub(2).map(|i| self.path[i].as_str());

        match (parent, name.as_str()) {
            (_, "metadata") => {
                if let Some(metadata) = &mut self.metadata {
                    metadata.value.push_str(text);
                }
            }
            (Some("coordinates"), axis @ ("x" | "y" | "z")) => {
                let idx = axis_index(axis);
                self.vertex[idx] = parse_number(text, axis)?;
            }
            (Some("triangle"), corner @ ("v1" | "v2" | "v3")) => {
                let idx = corner.as_bytes()[1] as usize - b'1' as usize;
                self.triangle[idx] = (text.trim().parse())
                    .with_context(|| format!("Invalid vertex index `{text}` in {corner}"))?;
            }
            (Some("instance"), field) => {
                let Some(instance) = &mut self.instance else {
                    return Ok(());
                };
                match field {
                    "deltax" | "deltay" | "deltaz" => {
                        instance.delta[axis_index(&field[5..])] = parse_number(text, field)?
                    }
                    "rx" | "ry" | "rz" => {
                        instance.rotation[axis_index(&field[1..])] = parse_number(text, field)?
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let Some(name) = self.path.pop() else {
            bail!("Unbalanced closing tag");
        };

        match name.as_str() {
            "metadata" => {
                let Some(metadata) = self.metadata.take() else {
                    return Ok(());
                };
                let owner = match self.path.last().map(String::as_str) {
                    Some("amf") => Some(&mut self.doc.metadata),
                    Some("object") => self.object.as_mut().map(|x| &mut x.metadata),
                    Some("volume") => self.volume.as_mut().map(|x| &mut x.metadata),
                    Some("constellation") => self.constellation.as_mut().map(|x| &mut x.metadata),
                    _ => None,
                };
                if let Some(owner) = owner {
                    owner.push(metadata);
                }
            }
            "vertex" => {
                let object = self.object.as_mut().context("Vertex outside of an object")?;
                object.mesh.vertices.push(self.vertex);
            }
            "triangle" => {
                let volume = self.volume.as_mut().context("Triangle outside of a volume")?;
                volume.triangles.push(self.triangle);
            }
            "volume" => {
                let (Some(object), Some(volume)) = (&mut self.object, self.volume.take()) else {
                    bail!("Volume outside of an object");
                };
                object.mesh.volumes.push(volume);
            }
            "object" => {
                if let Some(object) = self.object.take() {
                    self.doc.objects.push(object);
                }
            }
            "instance" => {
                let (Some(constellation), Some(instance)) =
                    (&mut self.constellation, self.instance.take())
                else {
                    bail!("Instance outside of a constellation");
                };
                constellation.instances.push(instance);
            }
            "constellation" => {
                if let Some(constellation) = self.constellation.take() {
                    self.doc.constellations.push(constellation);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn finish(self) -> Result<AmfDocument> {
        if !self.seen_root {
            bail!("Missing <amf> root element");
        }
        if !self.path.is_empty() {
            bail!("Unexpected end of document inside <{}>", self.path.join("><"));
        }

        Ok(self.doc)
    }
}

fn attribute(e: &BytesStart, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }

    Ok(None)
}

fn id_attribute(e: &BytesStart, key: &str) -> Result<u32> {
    let value = attribute(e, key)?.with_context(|| format!("Missing `{key}` attribute"))?;
    (value.trim().parse()).with_context(|| format!("Invalid `{key}` attribute `{value}`"))
}

fn parse_number(text: &str, field: &str) -> Result<f64> {
    (text.trim().parse()).with_context(|| format!("Invalid number `{text}` in {field}"))
}

fn axis_index(axis: &str) -> usize {
    match axis {
        "x" => 0,
        "y" => 1,
        _ => 2,
    }
}
