//! The whole export pipeline: collect, weld and build, serialize, then
//! atomically replace the destination file.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use amf_format::{Metadata, WriteOptions};
use common::config::ExportConfig;
use tempfile::Builder;
use tracing::info;

use crate::{
    collector::collect,
    document::{build, BuildOptions, ExportStats, GENERATOR},
    error::Result,
    scene::{ObjectId, Scene},
};

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub stats: ExportStats,
    /// Size of the written document.
    pub bytes: usize,
    pub elapsed: Duration,
}

/// Serialized document of the selected objects, with the stats of the build.
/// `metadata` is appended to the root metadata after the scene name and the
/// generator.
pub fn export_to_bytes(
    scene: &Scene,
    selection: &[ObjectId],
    config: &ExportConfig,
    metadata: &[Metadata],
) -> Result<(Vec<u8>, ExportStats)> {
    let groups = collect(scene, selection, config.grouping)?;

    let mut root = vec![
        Metadata::new("name", scene.name.as_str()),
        Metadata::new("generator", GENERATOR),
    ];
    root.extend_from_slice(metadata);

    let built = build(&groups, &root, &BuildOptions::from(config))?;
    let options = WriteOptions {
        precision: config.precision,
        indent: config.indent,
    };
    let bytes = amf_format::serialize(&built.document, &options)?;

    Ok((bytes, built.stats))
}

/// Exports the selected objects to `path`. The file only appears once the
/// whole document has been written, a failed export leaves whatever was at
/// `path` untouched.
pub fn export(
    scene: &Scene,
    selection: &[ObjectId],
    config: &ExportConfig,
    metadata: &[Metadata],
    path: &Path,
) -> Result<ExportReport> {
    let start = Instant::now();
    let (bytes, stats) = export_to_bytes(scene, selection, config, metadata)?;
    write_atomic(path, &bytes)?;

    let report = ExportReport {
        path: path.to_owned(),
        stats,
        bytes: bytes.len(),
        elapsed: start.elapsed(),
    };
    info!(
        "Exported {} objects ({} vertices, {} triangles) to `{}` in {:.1}ms",
        stats.objects,
        stats.vertices,
        stats.triangles,
        path.display(),
        report.elapsed.as_secs_f64() * 1000.0
    );

    Ok(report)
}

/// Exports the objects picked by the selection strategy of the config.
pub fn export_selection(
    scene: &Scene,
    config: &ExportConfig,
    metadata: &[Metadata],
    path: &Path,
) -> Result<ExportReport> {
    let selection = scene.select(config.selection);
    export(scene, &selection, config, metadata, path)
}

/// Writes to a temporary file next to `path` and moves it over `path`. The
/// temporary file is removed if anything fails on the way. An overwritten file
/// keeps its permissions, a new one gets the same mode as any other file
/// created under the current umask.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let existing = fs::metadata(path).ok().map(|x| x.permissions());
    let mut builder = Builder::new();
    if existing.is_none() {
        default_permissions(&mut builder);
    }

    let mut file = builder.tempfile_in(dir)?;
    if let Some(permissions) = existing {
        file.as_file().set_permissions(permissions)?;
    }
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(io::Error::from)?;
    Ok(())
}

#[cfg(unix)]
fn default_permissions(builder: &mut Builder) {
    use std::os::unix::fs::PermissionsExt;
    // Masked by the umask on creation, like `File::create`
    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn default_permissions(_builder: &mut Builder) {}
