use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use amf_format::AmfDocument;

#[derive(Parser)]
struct Args {
    /// Path to the .amf file (uncompressed XML)
    input_file: PathBuf,

    /// Check the document against the structural rules of the AMF schema
    #[clap(short, long)]
    validate: bool,

    /// Print every object, volume and constellation
    #[clap(short, long)]
    objects: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let raw = fs::read_to_string(&args.input_file)
        .with_context(|| format!("Failed to read `{}`", args.input_file.display()))?;
    let doc = amf_format::parse(&raw)?;

    println!("AMF {} in {}", doc.version, doc.unit);
    for metadata in &doc.metadata {
        println!(" {}: {}", metadata.kind, metadata.value);
    }
    println!(
        "{} objects, {} volumes, {} constellations, {} vertices, {} triangles",
        doc.objects.len(),
        doc.volume_count(),
        doc.constellations.len(),
        doc.vertex_count(),
        doc.triangle_count()
    );

    if args.objects {
        print_objects(&doc);
    }

    if args.validate {
        doc.validate()?;
        println!("Document is valid");
    }

    Ok(())
}

fn print_objects(doc: &AmfDocument) {
    for object in &doc.objects {
        println!(
            "\nobject {} `{}`: {} vertices",
            object.id,
            object.name().unwrap_or_default(),
            object.mesh.vertices.len()
        );
        for (i, volume) in object.mesh.volumes.iter().enumerate() {
            println!(
                " \\ volume {i} `{}`: {} triangles",
                volume.name().unwrap_or_default(),
                volume.triangles.len()
            );
        }
    }

    for constellation in &doc.constellations {
        let ids = (constellation.instances.iter())
            .map(|x| x.object_id.to_string())
            .collect::<Vec<_>>();
        println!("\nconstellation {}: [{}]", constellation.id, ids.join(", "));
    }
}
