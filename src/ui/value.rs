use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A cell count. Negative counts mean "the parent's extent minus this many cells".
    Absolute,
    /// A fraction of the parent's extent.
    Relative,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Absolute => "absolute",
            ValueKind::Relative => "relative",
        }
    }
}

impl FromStr for ValueKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(ValueKind::Absolute),
            "relative" => Ok(ValueKind::Relative),
            other => Err(LayoutError::InvalidConfiguration(format!(
                "unknown value kind {other:?} (expected \"absolute\" or \"relative\")"
            ))),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged size along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue", into = "RawValue")]
pub struct Value {
    pub magnitude: f64,
    pub kind: ValueKind,
}

impl Value {
    pub fn new(magnitude: f64, kind: ValueKind) -> Self {
        Self { magnitude, kind }
    }

    /// Build a value from an untyped kind tag, as found in configuration files.
    pub fn parse(magnitude: f64, kind: &str) -> Result<Self, LayoutError> {
        if !magnitude.is_finite() {
            return Err(LayoutError::InvalidConfiguration(format!(
                "value magnitude must be finite, got {magnitude}"
            )));
        }
        Ok(Self::new(magnitude, kind.parse()?))
    }

    pub fn absolute(cells: i32) -> Self {
        Self::new(cells as f64, ValueKind::Absolute)
    }

    pub fn relative(fraction: f64) -> Self {
        Self::new(fraction, ValueKind::Relative)
    }

    /// The whole parent extent.
    pub fn fill() -> Self {
        Self::relative(1.0)
    }

    pub fn is_relative(&self) -> bool {
        self.kind == ValueKind::Relative
    }

    /// Absolute magnitude as a whole cell count (truncated toward zero).
    pub fn cells(&self) -> i32 {
        self.magnitude as i32
    }

    /// `floor(extent * magnitude)` for relative values.
    pub fn fraction_of(&self, extent: i32) -> i32 {
        (extent as f64 * self.magnitude).floor() as i32
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawValue {
    magnitude: f64,
    #[serde(default = "default_kind")]
    kind: String,
}

fn default_kind() -> String {
    ValueKind::Absolute.as_str().to_string()
}

impl TryFrom<RawValue> for Value {
    type Error = LayoutError;

    fn try_from(raw: RawValue) -> Result<Self, Self::Error> {
        Value::parse(raw.magnitude, &raw.kind)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue {
            magnitude: value.magnitude,
            kind: value.kind.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_known_kinds() {
        assert_eq!(Value::parse(0.3, "relative").unwrap(), Value::relative(0.3));
        assert_eq!(Value::parse(12.0, "Absolute").unwrap(), Value::absolute(12));
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = Value::parse(1.0, "percent").unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("percent"));
    }

    #[test]
    fn test_relative_resolution_floors() {
        for (extent, fraction, expected) in [(100, 0.3, 30), (80, 0.7, 56), (24, 0.8, 19), (7, 0.5, 3)] {
            assert_eq!(Value::relative(fraction).fraction_of(extent), expected);
        }
        for extent in 0..200 {
            assert_eq!(Value::relative(1.0).fraction_of(extent), extent);
            assert_eq!(Value::relative(0.0).fraction_of(extent), 0);
        }
    }

    #[test]
    fn test_value_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            width: Value,
        }
        let holder: Holder = toml::from_str("width = { magnitude = 0.25, kind = \"relative\" }").unwrap();
        assert_eq!(holder.width, Value::relative(0.25));

        let bad = toml::from_str::<Holder>("width = { magnitude = 3, kind = \"ems\" }");
        assert!(bad.is_err());
    }
}
