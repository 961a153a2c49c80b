use std::{fs::File, io::BufReader, sync::Arc};

use anyhow::{Context, Result};
use args::{Args, Model};
use clap::{CommandFactory, FromArgMatches};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use amf_export::{
    export_selection,
    geometry::Geometry,
    mesh::transformation_matrix,
    scene::{Scene, SceneObject},
};
use load::{load_mesh, MeshFormat};

mod args;
mod load;

fn main() -> Result<()> {
    let filter = filter::Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target("amf_export", LevelFilter::INFO)
        .with_target("amf_format", LevelFilter::INFO)
        .with_target("common", LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;
    let models = Model::from_matches(&matches)?;
    let config = args.export_config()?;

    let mut scene = Scene::new(args.name());
    for model in models {
        let ext = (model.path.extension())
            .with_context(|| format!("`{}` has no file extension", model.path.display()))?;
        let format = MeshFormat::from_extension(&ext.to_string_lossy())?;
        let file = File::open(&model.path)
            .with_context(|| format!("Failed to open `{}`", model.path.display()))?;
        let polygons = load_mesh(BufReader::new(file), format)?;

        let name = (model.path.file_stem())
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "Loaded `{name}`. {{ vert: {}, face: {} }}",
            polygons.vertices.len(),
            polygons.faces.len()
        );

        let transform = transformation_matrix(
            model.position,
            model.scale,
            model.rotation.map(f64::to_radians),
        );
        let mut object = SceneObject::new(name)
            .with_transform(transform)
            .with_geometry(Arc::new(polygons) as Arc<dyn Geometry>)
            .selected(true);

        if let Some(parent) = model.parent {
            let parent = match scene.find(&parent) {
                Some(id) => id,
                None => scene.add(SceneObject::new(parent)),
            };
            object = object.with_parent(parent);
        }

        scene.add(object);
    }

    println!(
        "Layout: {}. {}",
        config.layout.name(),
        config.layout.description()
    );
    let report = export_selection(&scene, &config, &[], &args.output)?;
    println!(
        "Done. {} objects, {} triangles, {} bytes. Elapsed: {:.1}s",
        report.stats.objects,
        report.stats.triangles,
        report.bytes,
        report.elapsed.as_secs_f32()
    );

    Ok(())
}
