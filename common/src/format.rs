use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How groups are laid out in the AMF document.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One object per group, every mesh of the group is its own volume over a
    /// shared vertex table. This is what Slic3r and PrusaSlicer expect.
    #[default]
    Grouped,
    /// One object per mesh, and one constellation per group instancing its
    /// objects.
    Constellation,
}

impl Layout {
    pub const ALL: [Layout; 2] = [Layout::Grouped, Layout::Constellation];

    pub fn name(&self) -> &'static str {
        match self {
            Layout::Grouped => "grouped",
            Layout::Constellation => "constellation",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Layout::Grouped => "One object per group with a volume per mesh",
            Layout::Constellation => "One object per mesh, groups become constellations",
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .into_iter()
            .find(|layout| layout.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown layout `{s}`"))
    }
}
