use std::{any::Any, path::PathBuf, str::FromStr};

use anyhow::{bail, Context, Result};
use clap::{ArgMatches, Parser};
use common::{
    config::{ExportConfig, Grouping, Selection},
    format::Layout,
    units::Unit,
};
use nalgebra::{ArrayStorage, Const, Matrix, Scalar, Vector3, U1};
use num_traits::Zero;

#[derive(Debug, Parser)]
/// Exports .stl and .obj meshes into a single AMF file.
pub struct Args {
    #[arg(long)]
    /// TOML export config. Defaults to `amf_export/config.toml` in the user
    /// config directory, if it exists.
    pub config: Option<PathBuf>,

    #[arg(long)]
    /// How meshes are bundled into AMF objects: parents-any, parents-visible,
    /// parents-viewable, parents-renderable, parents-selected, all or
    /// per-object.
    pub grouping: Option<Grouping>,
    #[arg(long)]
    /// Document layout: grouped (one object per group, a volume per mesh) or
    /// constellation (one object per mesh, a constellation per group).
    pub layout: Option<Layout>,

    #[arg(long)]
    /// Unit declared in the output: meter, millimeter, micron, inch or feet.
    pub unit: Option<Unit>,
    #[arg(long, default_value_t = Unit::Millimeter)]
    /// Unit the input meshes are modeled in.
    pub source_unit: Unit,

    #[arg(long)]
    /// Vertices closer than this, in source units, are merged.
    pub tolerance: Option<f64>,
    #[arg(long)]
    /// Significant digits of written coordinates.
    pub precision: Option<usize>,

    #[arg(long)]
    /// Name stored in the document metadata. Defaults to the output file
    /// name.
    pub name: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,

    /// File to save the AMF document to.
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
#[group(required = true)]
pub struct ModelArgs {
    #[arg(long)]
    /// Path to a .stl or .obj file
    pub mesh: Vec<PathBuf>,

    #[arg(long, value_parser = vector_value_parser::<f64, 3>)]
    /// Position of the mesh origin.
    pub position: Vec<Vector3<f64>>,

    #[arg(long, value_parser = vector_value_parser::<f64, 3>)]
    /// Rotation of the mesh in degrees around the X, Y, and Z axes.
    pub rotation: Vec<Vector3<f64>>,

    #[arg(long, value_parser = vector_value_parser::<f64, 3>)]
    /// Scale of the mesh along the X, Y, and Z axes.
    pub scale: Vec<Vector3<f64>>,

    #[arg(long)]
    /// Name of an empty parent object for the mesh. Meshes sharing a parent
    /// are grouped together by the parents-* groupings.
    pub parent: Vec<String>,
}

#[derive(Debug)]
pub struct Model {
    pub path: PathBuf,
    pub position: Vector3<f64>,
    pub rotation: Vector3<f64>,
    pub scale: Vector3<f64>,
    pub parent: Option<String>,
}

impl Args {
    pub fn export_config(&self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::load_file(path)
                .with_context(|| format!("Failed to load config `{}`", path.display()))?,
            None => match dirs::config_dir() {
                Some(dir) => ExportConfig::load_or_default(&dir.join("amf_export")),
                None => ExportConfig::default(),
            },
        };

        // Every mesh given on the command line is exported
        config.selection = Selection::Selected;
        config.source_unit = self.source_unit;

        if let Some(grouping) = self.grouping {
            config.grouping = grouping;
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(unit) = self.unit {
            config.unit = unit;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }

        Ok(config)
    }

    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            (self.output.file_stem())
                .map(|x| x.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

impl Model {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// Resolves the per mesh parameters, each applies to the closest `--mesh`
    /// before it.
    pub fn from_matches(matches: &ArgMatches) -> Result<Vec<Self>> {
        let (Some(paths), Some(indices)) = (
            matches.get_many::<PathBuf>("mesh"),
            matches.indices_of("mesh"),
        ) else {
            bail!("No meshes defined");
        };

        let mut meshes = (paths.zip(indices))
            .map(|x| (x.1, Model::new(x.0.to_owned())))
            .collect::<Vec<_>>();

        fn model_parameter<T: Any + Clone + Send + Sync + 'static>(
            matches: &ArgMatches,
            meshes: &mut [(usize, Model)],
            key: &str,
            set: impl Fn(&mut Model, T),
        ) -> Result<()> {
            let (Some(instances), Some(indices)) =
                (matches.get_many::<T>(key), matches.indices_of(key))
            else {
                return Ok(());
            };

            for (instance, idx) in instances.zip(indices) {
                let mesh = (meshes.iter_mut().rfind(|x| idx > x.0))
                    .with_context(|| format!("--{key} given before any --mesh"))?;
                set(&mut mesh.1, instance.to_owned());
            }

            Ok(())
        }

        model_parameter(matches, &mut meshes, "scale", |mesh, x: Vector3<f64>| mesh.scale = x)?;
        model_parameter(matches, &mut meshes, "rotation", |mesh, x: Vector3<f64>| {
            mesh.rotation = x
        })?;
        model_parameter(matches, &mut meshes, "position", |mesh, x: Vector3<f64>| {
            mesh.position = x
        })?;
        model_parameter(matches, &mut meshes, "parent", |mesh, x: String| {
            mesh.parent = Some(x)
        })?;

        Ok(meshes.into_iter().map(|x| x.1).collect())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self {
            path: PathBuf::default(),
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
            parent: None,
        }
    }
}

fn vector_value_parser<T, const N: usize>(
    raw: &str,
) -> Result<Matrix<T, Const<N>, U1, ArrayStorage<T, N, 1>>>
where
    T: FromStr + Scalar + Zero,
    T::Err: Send + Sync + std::error::Error + 'static,
{
    let mut vec = Matrix::<T, Const<N>, U1, ArrayStorage<T, N, 1>>::zeros();

    let mut parts = raw.splitn(N, ',');
    for i in 0..N {
        let element = parts.next().context("Missing vector element")?.trim();
        vec[i] = element
            .parse()
            .context("Can't convert element from string")?;
    }

    Ok(vec)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    fn parse(args: &[&str]) -> (Args, Vec<Model>) {
        let matches = Args::command()
            .try_get_matches_from(["amf_export"].iter().chain(args))
            .unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        let models = Model::from_matches(&matches).unwrap();
        (args, models)
    }

    #[test]
    fn per_mesh_parameters() {
        let (args, models) = parse(&[
            "--mesh",
            "a.stl",
            "--scale",
            "2, 2, 2",
            "--parent",
            "base",
            "--mesh",
            "b.obj",
            "--position",
            "1,2,3",
            "out.amf",
        ]);

        assert_eq!(args.name(), "out");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].scale, Vector3::repeat(2.0));
        assert_eq!(models[0].parent.as_deref(), Some("base"));
        assert_eq!(models[0].position, Vector3::zeros());
        assert_eq!(models[1].position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(models[1].parent, None);
    }

    #[test]
    fn flags_override_config() {
        let (args, _) = parse(&[
            "--config",
            "/nonexistent/config.toml",
            "--mesh",
            "a.stl",
            "out.amf",
        ]);
        assert!(args.export_config().is_err());

        let (args, _) = parse(&[
            "--grouping",
            "per-object",
            "--unit",
            "inch",
            "--tolerance",
            "0.01",
            "--mesh",
            "a.stl",
            "out.amf",
        ]);
        let config = args.export_config().unwrap();
        assert_eq!(config.grouping, Grouping::PerObject);
        assert_eq!(config.unit, Unit::Inch);
        assert_eq!(config.source_unit, Unit::Millimeter);
        assert_eq!(config.tolerance, 0.01);
    }

    #[test]
    fn vectors() {
        let parsed = vector_value_parser::<f64, 3>("1, -2.5,3").unwrap();
        assert_eq!(parsed, Vector3::new(1.0, -2.5, 3.0));
        assert!(vector_value_parser::<f64, 3>("1, 2").is_err());
        assert!(vector_value_parser::<f64, 3>("1, x, 2").is_err());
    }
}
