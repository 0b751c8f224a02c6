//! Length units
//!
//! Coordinates arrive as already-resolved scalars plus an optional unit tag.
//! [`LengthUnit`] scales them to the base unit (meters); choosing a unit is
//! left to the producer.

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported length units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Meters,
    Centimeters,
    Millimeters,
    Kilometers,
    Feet,
    Inches,
    Yards,
    Miles,
}

impl LengthUnit {
    /// Factor converting one of this unit to meters
    #[must_use]
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Centimeters => 0.01,
            Self::Millimeters => 0.001,
            Self::Kilometers => 1000.0,
            Self::Feet => 0.3048,
            Self::Inches => 0.0254,
            Self::Yards => 0.9144,
            Self::Miles => 1609.344,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    #[inline]
    #[must_use]
    pub fn from_meters(self, value: f64) -> f64 {
        value / self.meters_per_unit()
    }

    /// Parse an optional tag; a missing or blank tag means meters
    pub fn from_tag(tag: Option<&str>) -> Result<Self, ConversionError> {
        match tag.map(str::trim) {
            None | Some("") => Ok(Self::Meters),
            Some(tag) => tag.parse(),
        }
    }

    /// Canonical short tag
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Centimeters => "cm",
            Self::Millimeters => "mm",
            Self::Kilometers => "km",
            Self::Feet => "ft",
            Self::Inches => "in",
            Self::Yards => "yd",
            Self::Miles => "mi",
        }
    }
}

impl FromStr for LengthUnit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "m" | "meter" | "meters" | "metre" | "metres" => Self::Meters,
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
                Self::Centimeters
            }
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
                Self::Millimeters
            }
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => Self::Kilometers,
            "ft" | "foot" | "feet" => Self::Feet,
            "in" | "inch" | "inches" => Self::Inches,
            "yd" | "yard" | "yards" => Self::Yards,
            "mi" | "mile" | "miles" => Self::Miles,
            other => {
                return Err(ConversionError::invalid_input(format!(
                    "unknown length unit '{other}'"
                )))
            }
        };
        Ok(unit)
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("MM".parse::<LengthUnit>().unwrap(), LengthUnit::Millimeters);
        assert_eq!("Feet".parse::<LengthUnit>().unwrap(), LengthUnit::Feet);
    }

    #[test]
    fn missing_tag_means_meters() {
        assert_eq!(LengthUnit::from_tag(None).unwrap(), LengthUnit::Meters);
        assert_eq!(LengthUnit::from_tag(Some(" ")).unwrap(), LengthUnit::Meters);
    }

    #[test]
    fn unknown_tag_is_invalid_input() {
        let err = LengthUnit::from_tag(Some("parsec")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn scales_to_meters() {
        assert!((LengthUnit::Millimeters.to_meters(1500.0) - 1.5).abs() < 1e-12);
        assert!((LengthUnit::Feet.to_meters(10.0) - 3.048).abs() < 1e-12);
        assert!((LengthUnit::Inches.from_meters(0.0254) - 1.0).abs() < 1e-12);
    }
}
