//! Engineering units attached to time series.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Dimensionless,
    // flow
    GallonsPerMinute,
    MillionGallonsPerDay,
    CubicFeetPerSecond,
    LitersPerSecond,
    CubicMetersPerSecond,
    // length / head
    Feet,
    Meters,
    // pressure
    Psi,
    Kilopascals,
    // concentration
    MilligramsPerLiter,
    // time
    Seconds,
    Hours,
    // power
    Kilowatts,
    Percent,
}

impl Units {
    /// Parse a unit name as written in configuration documents. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let units = match name.trim().to_ascii_lowercase().as_str() {
            "dimensionless" | "none" | "" => Units::Dimensionless,
            "gpm" => Units::GallonsPerMinute,
            "mgd" => Units::MillionGallonsPerDay,
            "cfs" => Units::CubicFeetPerSecond,
            "lps" => Units::LitersPerSecond,
            "cms" => Units::CubicMetersPerSecond,
            "ft" | "feet" => Units::Feet,
            "m" | "meters" => Units::Meters,
            "psi" => Units::Psi,
            "kpa" => Units::Kilopascals,
            "mg/l" => Units::MilligramsPerLiter,
            "s" | "seconds" => Units::Seconds,
            "hr" | "hours" => Units::Hours,
            "kw" => Units::Kilowatts,
            "%" | "percent" => Units::Percent,
            _ => return None,
        };
        Some(units)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Units::Dimensionless => "dimensionless",
            Units::GallonsPerMinute => "gpm",
            Units::MillionGallonsPerDay => "mgd",
            Units::CubicFeetPerSecond => "cfs",
            Units::LitersPerSecond => "lps",
            Units::CubicMetersPerSecond => "cms",
            Units::Feet => "ft",
            Units::Meters => "m",
            Units::Psi => "psi",
            Units::Kilopascals => "kpa",
            Units::MilligramsPerLiter => "mg/l",
            Units::Seconds => "s",
            Units::Hours => "hr",
            Units::Kilowatts => "kw",
            Units::Percent => "percent",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
