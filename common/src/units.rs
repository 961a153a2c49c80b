use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Length units allowed by the `unit` attribute of an AMF document.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Meter,
    #[default]
    Millimeter,
    Micron,
    Inch,
    Feet,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Meter,
        Unit::Millimeter,
        Unit::Micron,
        Unit::Inch,
        Unit::Feet,
    ];

    /// How many of this unit fit in one meter.
    pub fn per_meter(&self) -> f64 {
        match self {
            Unit::Meter => 1.0,
            Unit::Millimeter => 1e3,
            Unit::Micron => 1e6,
            Unit::Inch => 39.37008,
            Unit::Feet => 3.28084,
        }
    }

    /// Factor that converts a length expressed in `source` into this unit.
    pub fn scale_from(&self, source: Unit) -> f64 {
        if *self == source {
            return 1.0;
        }

        self.per_meter() / source.per_meter()
    }

    /// Name used in the AMF `unit` attribute.
    pub fn name(&self) -> &'static str {
        match self {
            Unit::Meter => "meter",
            Unit::Millimeter => "millimeter",
            Unit::Micron => "micron",
            Unit::Inch => "inch",
            Unit::Feet => "feet",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Ok(match lower.as_str() {
            "meter" | "m" => Unit::Meter,
            "millimeter" | "mm" => Unit::Millimeter,
            "micron" | "micrometer" | "um" => Unit::Micron,
            "inch" | "in" => Unit::Inch,
            "feet" | "foot" | "ft" => Unit::Feet,
            _ => return Err(format!("Unknown unit `{s}`")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_between_units() {
        assert_eq!(Unit::Millimeter.scale_from(Unit::Meter), 1000.0);
        assert_eq!(Unit::Meter.scale_from(Unit::Meter), 1.0);
        assert_eq!(Unit::Inch.scale_from(Unit::Inch), 1.0);
        assert!((Unit::Meter.scale_from(Unit::Millimeter) - 1e-3).abs() < 1e-15);
        assert!((Unit::Inch.scale_from(Unit::Meter) - 39.37008).abs() < 1e-12);
    }

    #[test]
    fn parse_names_and_aliases() {
        for unit in Unit::ALL {
            assert_eq!(unit.name().parse::<Unit>(), Ok(unit));
        }

        assert_eq!("MM".parse::<Unit>(), Ok(Unit::Millimeter));
        assert!("furlong".parse::<Unit>().is_err());
    }

    #[test]
    fn defaults_to_millimeter() {
        assert_eq!(Unit::default(), Unit::Millimeter);
    }
}
