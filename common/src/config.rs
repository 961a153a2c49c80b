use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{format::Layout, units::Unit};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Which scene objects are exported.
    pub selection: Selection,
    /// How exported objects are bundled into AMF objects.
    pub grouping: Grouping,
    pub layout: Layout,

    /// Unit declared in the document. Coordinates are converted into it.
    pub unit: Unit,
    /// Unit the scene coordinates are expressed in.
    pub source_unit: Unit,

    /// Vertices closer than this distance (in source units) are merged.
    pub tolerance: f64,
    /// Significant digits used when writing coordinates.
    pub precision: usize,
    /// Spaces per indentation level in the output, 0 disables pretty printing.
    pub indent: usize,
}

/// Scene objects considered for export.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Selected,
    Visible,
    Viewable,
    Renderable,
}

/// Rule deciding which exported objects end up in the same AMF object.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Topmost parent of each exported object, whatever its state.
    #[default]
    ParentsAny,
    /// Topmost parent visible in the viewport.
    ParentsVisible,
    /// Topmost parent not hidden from viewports.
    ParentsViewable,
    /// Topmost parent not hidden from renders.
    ParentsRenderable,
    /// Topmost parent that is itself exported.
    ParentsSelected,
    /// Every exported object in a single group.
    All,
    /// No grouping, one group per object.
    PerObject,
}

impl ExportConfig {
    pub fn load_or_default(config_dir: &Path) -> Self {
        match Self::load(config_dir) {
            Ok(config) => config,
            Err(err) => {
                warn!("Failed to load config, using defaults: {}", err);
                ExportConfig::default()
            }
        }
    }

    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_file = config_dir.join(CONFIG_FILE);
        Ok(if config_file.exists() {
            let config = Self::load_file(&config_file)?;
            info!("Successfully loaded config file");
            config
        } else {
            info!("No config file found, using defaults");
            Self::default()
        })
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let file = fs::read(path)?;
        let string = String::from_utf8_lossy(&file);
        Ok(toml::from_str(&string)?)
    }

    pub fn save(&self, config_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(config_dir)?;

        let config_file = config_dir.join(CONFIG_FILE);
        let string = toml::to_string(self)?;
        fs::write(&config_file, string)?;
        Ok(config_file)
    }

    /// Factor applied to scene coordinates before they are written.
    pub fn unit_scale(&self) -> f64 {
        self.unit.scale_from(self.source_unit)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            selection: Selection::Selected,
            grouping: Grouping::ParentsAny,
            layout: Layout::Grouped,

            unit: Unit::Millimeter,
            source_unit: Unit::Meter,

            tolerance: 1e-6,
            precision: 9,
            indent: 2,
        }
    }
}

impl Selection {
    pub const ALL: [Selection; 4] = [
        Selection::Selected,
        Selection::Visible,
        Selection::Viewable,
        Selection::Renderable,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Selection::Selected => "selected",
            Selection::Visible => "visible",
            Selection::Viewable => "viewable",
            Selection::Renderable => "renderable",
        }
    }
}

impl Grouping {
    pub const ALL: [Grouping; 7] = [
        Grouping::ParentsAny,
        Grouping::ParentsVisible,
        Grouping::ParentsViewable,
        Grouping::ParentsRenderable,
        Grouping::ParentsSelected,
        Grouping::All,
        Grouping::PerObject,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Grouping::ParentsAny => "parents-any",
            Grouping::ParentsVisible => "parents-visible",
            Grouping::ParentsViewable => "parents-viewable",
            Grouping::ParentsRenderable => "parents-renderable",
            Grouping::ParentsSelected => "parents-selected",
            Grouping::All => "all",
            Grouping::PerObject => "per-object",
        }
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::ALL
            .into_iter()
            .find(|x| x.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown selection strategy `{s}`"))
    }
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace('_', "-");
        Grouping::ALL
            .into_iter()
            .find(|x| x.name().eq_ignore_ascii_case(&s))
            .ok_or_else(|| format!("Unknown grouping `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            grouping: Grouping::PerObject,
            layout: Layout::Constellation,
            unit: Unit::Inch,
            tolerance: 0.5,
            ..Default::default()
        };

        let path = config.save(dir.path()).unwrap();
        assert!(path.ends_with(CONFIG_FILE));
        assert_eq!(ExportConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "unit = \"micron\"\n").unwrap();

        let config = ExportConfig::load(dir.path()).unwrap();
        assert_eq!(config.unit, Unit::Micron);
        assert_eq!(config.tolerance, ExportConfig::default().tolerance);
    }

    #[test]
    fn broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "unit = 42").unwrap();
        assert_eq!(
            ExportConfig::load_or_default(dir.path()),
            ExportConfig::default()
        );
    }

    #[test]
    fn grouping_names() {
        for grouping in Grouping::ALL {
            assert_eq!(grouping.name().parse::<Grouping>(), Ok(grouping));
        }
        assert_eq!("parents_selected".parse(), Ok(Grouping::ParentsSelected));
    }

    #[test]
    fn millimeters_from_meters() {
        assert_eq!(ExportConfig::default().unit_scale(), 1000.0);
    }
}
