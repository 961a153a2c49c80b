use std::io::Write;

use nalgebra::Vector3;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Result, Writer,
};

use crate::{format_number, AmfDocument, Constellation, Metadata, Object};

/// Controls the textual form of the output. The document content is the same
/// for any options, only number precision and whitespace change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Significant digits of coordinates and instance offsets.
    pub precision: usize,
    /// Spaces per nesting level, 0 writes everything on one line.
    pub indent: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            precision: 9,
            indent: 2,
        }
    }
}

/// Serializes a document into an in memory UTF-8 buffer.
pub fn serialize(doc: &AmfDocument, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write(doc, options, &mut out)?;
    Ok(out)
}

/// Writes a document as XML. Elements and attributes are always written in
/// schema order, so identical documents produce identical bytes.
pub fn write<W: Write>(doc: &AmfDocument, options: &WriteOptions, inner: W) -> Result<()> {
    let mut writer = match options.indent {
        0 => Writer::new(inner),
        indent => Writer::new_with_indent(inner, b' ', indent),
    };
    let precision = options.precision;

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("amf");
    root.push_attribute(("unit", doc.unit.name()));
    root.push_attribute(("version", doc.version.as_str()));
    writer.write_event(Event::Start(root))?;

    write_metadata(&mut writer, &doc.metadata)?;
    for object in &doc.objects {
        write_object(&mut writer, object, precision)?;
    }
    for constellation in &doc.constellations {
        write_constellation(&mut writer, constellation, precision)?;
    }

    writer.write_event(Event::End(BytesEnd::new("amf")))?;
    Ok(())
}

fn write_object<W: Write>(writer: &mut Writer<W>, object: &Object, precision: usize) -> Result<()> {
    let id = object.id.to_string();
    let mut start = BytesStart::new("object");
    start.push_attribute(("id", id.as_str()));
    writer.write_event(Event::Start(start))?;
    write_metadata(writer, &object.metadata)?;

    start_element(writer, "mesh")?;

    start_element(writer, "vertices")?;
    for vertex in &object.mesh.vertices {
        start_element(writer, "vertex")?;
        start_element(writer, "coordinates")?;
        write_vector(writer, ["x", "y", "z"], vertex, precision)?;
        end_element(writer, "coordinates")?;
        end_element(writer, "vertex")?;
    }
    end_element(writer, "vertices")?;

    for volume in &object.mesh.volumes {
        start_element(writer, "volume")?;
        write_metadata(writer, &volume.metadata)?;
        for triangle in &volume.triangles {
            start_element(writer, "triangle")?;
            for (name, vertex) in ["v1", "v2", "v3"].into_iter().zip(triangle) {
                text_element(writer, name, &vertex.to_string())?;
            }
            end_element(writer, "triangle")?;
        }
        end_element(writer, "volume")?;
    }

    end_element(writer, "mesh")?;
    end_element(writer, "object")
}

fn write_constellation<W: Write>(
    writer: &mut Writer<W>,
    constellation: &Constellation,
    precision: usize,
) -> Result<()> {
    let id = constellation.id.to_string();
    let mut start = BytesStart::new("constellation");
    start.push_attribute(("id", id.as_str()));
    writer.write_event(Event::Start(start))?;
    write_metadata(writer, &constellation.metadata)?;

    for instance in &constellation.instances {
        let object_id = instance.object_id.to_string();
        let mut start = BytesStart::new("instance");
        start.push_attribute(("objectid", object_id.as_str()));
        writer.write_event(Event::Start(start))?;
        write_vector(writer, ["deltax", "deltay", "deltaz"], &instance.delta, precision)?;
        write_vector(writer, ["rx", "ry", "rz"], &instance.rotation, precision)?;
        end_element(writer, "instance")?;
    }

    end_element(writer, "constellation")
}

fn write_metadata<W: Write>(writer: &mut Writer<W>, metadata: &[Metadata]) -> Result<()> {
    for entry in metadata {
        let mut start = BytesStart::new("metadata");
        start.push_attribute(("type", entry.kind.as_str()));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&entry.value)))?;
        end_element(writer, "metadata")?;
    }

    Ok(())
}

fn write_vector<W: Write>(
    writer: &mut Writer<W>,
    names: [&str; 3],
    vector: &Vector3<f64>,
    precision: usize,
) -> Result<()> {
    for (name, value) in names.into_iter().zip(vector.iter()) {
        text_element(writer, name, &format_number(*value, precision))?;
    }

    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    start_element(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    end_element(writer, name)
}

fn start_element<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))
}

fn end_element<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))
}

#[cfg(test)]
mod tests {
    use common::units::Unit;

    use super::*;
    use crate::{Instance, Mesh, Volume};

    fn document() -> AmfDocument {
        let mut doc = AmfDocument::new(Unit::Millimeter);
        doc.metadata.push(Metadata::new("name", "Tom & Jerry <3"));

        let mut object = Object::new(
            0,
            Mesh {
                vertices: vec![
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.5, 0.0, -0.0),
                    Vector3::new(0.0, 2.25, 0.0),
                ],
                volumes: vec![Volume {
                    metadata: vec![Metadata::new("name", "part")],
                    triangles: vec![[0, 1, 2]],
                }],
            },
        );
        object.metadata.push(Metadata::new("name", "triangle"));
        doc.objects.push(object);

        doc.constellations.push(Constellation {
            id: 1,
            metadata: Vec::new(),
            instances: vec![Instance::new(0)],
        });
        doc
    }

    #[test]
    fn compact_output() {
        let options = WriteOptions {
            precision: 6,
            indent: 0,
        };
        let xml = String::from_utf8(serialize(&document(), &options).unwrap()).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<amf unit="millimeter" version="1.1">"#));
        assert!(xml.contains(r#"<metadata type="name">Tom &amp; Jerry &lt;3</metadata>"#));
        assert!(xml.contains(
            "<vertex><coordinates><x>1.5</x><y>0</y><z>0</z></coordinates></vertex>"
        ));
        assert!(xml.contains("<triangle><v1>0</v1><v2>1</v2><v3>2</v3></triangle>"));
        assert!(xml.contains(r#"<instance objectid="0"><deltax>0</deltax>"#));
        assert!(xml.ends_with("</amf>"));

        // Schema order: metadata, objects, then constellations
        let metadata = xml.find("<metadata").unwrap();
        let object = xml.find("<object").unwrap();
        let constellation = xml.find("<constellation").unwrap();
        assert!(metadata < object && object < constellation);
    }

    #[test]
    fn output_is_deterministic() {
        let doc = document();
        let options = WriteOptions::default();
        assert_eq!(
            serialize(&doc, &options).unwrap(),
            serialize(&doc, &options).unwrap()
        );
    }

    #[test]
    fn indentation_only_changes_whitespace() {
        let doc = document();
        let pretty = serialize(&doc, &WriteOptions::default()).unwrap();
        let flat = serialize(
            &doc,
            &WriteOptions {
                indent: 0,
                ..Default::default()
            },
        )
        .unwrap();

        let strip = |bytes: Vec<u8>| {
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::trim)
                .collect::<String>()
        };
        assert_eq!(strip(pretty), strip(flat));
    }
}
