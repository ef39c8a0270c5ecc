//! Configuration schemas, validation and file loading.
//!
//! Every device and effect type declares a static option schema. A JSON
//! mapping is checked against the schema here, once, and then deserialized
//! into the typed params struct with serde defaults filling the gaps.
//! Devices and effects never re-validate what they receive.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors raised while validating or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration must be a JSON object, got {0}")]
    NotAnObject(String),
    #[error("Unknown option '{0}'")]
    UnknownOption(String),
    #[error("Missing required option '{0}'")]
    MissingOption(&'static str),
    #[error("Option '{name}' expects {expected}")]
    WrongKind {
        name: &'static str,
        expected: &'static str,
    },
    #[error("Option '{name}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Value type and bounds of one option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    Float { min: f64, max: f64 },
    Int { min: i64, max: i64 },
    Bool,
    Text,
    /// RGB triple with each channel in `0..=255`.
    Color,
}

impl OptionKind {
    fn expected(&self) -> &'static str {
        match self {
            Self::Float { .. } => "a number",
            Self::Int { .. } => "an integer",
            Self::Bool => "a boolean",
            Self::Text => "a string",
            Self::Color => "an [r, g, b] array of numbers in 0..=255",
        }
    }
}

/// One recognised option of a device or effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub required: bool,
}

impl OptionSpec {
    pub const fn float(name: &'static str, description: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            description,
            kind: OptionKind::Float { min, max },
            required: false,
        }
    }

    pub const fn int(name: &'static str, description: &'static str, min: i64, max: i64) -> Self {
        Self {
            name,
            description,
            kind: OptionKind::Int { min, max },
            required: false,
        }
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: OptionKind::Bool,
            required: false,
        }
    }

    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: OptionKind::Text,
            required: false,
        }
    }

    pub const fn color(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: OptionKind::Color,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn check(&self, value: &Value) -> Result<(), ConfigError> {
        let wrong_kind = || ConfigError::WrongKind {
            name: self.name,
            expected: self.kind.expected(),
        };

        match self.kind {
            OptionKind::Float { min, max } => {
                let v = value.as_f64().ok_or_else(wrong_kind)?;
                self.check_range(v, min, max)
            }
            OptionKind::Int { min, max } => {
                let v = value.as_i64().ok_or_else(wrong_kind)?;
                self.check_range(v as f64, min as f64, max as f64)
            }
            OptionKind::Bool => value.as_bool().map(|_| ()).ok_or_else(wrong_kind),
            OptionKind::Text => value.as_str().map(|_| ()).ok_or_else(wrong_kind),
            OptionKind::Color => {
                let channels = value.as_array().ok_or_else(wrong_kind)?;
                if channels.len() != 3 {
                    return Err(wrong_kind());
                }
                for channel in channels {
                    let v = channel.as_f64().ok_or_else(wrong_kind)?;
                    self.check_range(v, 0.0, 255.0)?;
                }
                Ok(())
            }
        }
    }

    fn check_range(&self, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
        if value < min || value > max {
            return Err(ConfigError::OutOfRange {
                name: self.name,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Check a mapping against one or more schemas.
///
/// Keys must be known to one of the schemas; `null` counts as absent.
pub fn validate(config: &Value, schemas: &[&[OptionSpec]]) -> Result<(), ConfigError> {
    let empty = Map::new();
    let map = match config {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(ConfigError::NotAnObject(other.to_string())),
    };

    for (key, value) in map {
        let spec = schemas
            .iter()
            .flat_map(|schema| schema.iter())
            .find(|spec| spec.name == key)
            .ok_or_else(|| ConfigError::UnknownOption(key.clone()))?;
        if !value.is_null() {
            spec.check(value)?;
        }
    }

    for spec in schemas.iter().flat_map(|schema| schema.iter()) {
        if spec.required && map.get(spec.name).map_or(true, Value::is_null) {
            return Err(ConfigError::MissingOption(spec.name));
        }
    }

    Ok(())
}

/// Typed parameters backed by a static option schema.
pub trait Params: Serialize + DeserializeOwned + Default {
    const SCHEMA: &'static [OptionSpec];

    /// Validate `config` against [`Self::SCHEMA`] and deserialize it.
    fn from_config(config: &Value) -> Result<Self, ConfigError> {
        validate(config, &[Self::SCHEMA])?;
        Self::deserialize_unchecked(config)
    }

    /// Deserialize without schema checks; for mappings already validated
    /// against a combined schema.
    fn deserialize_unchecked(config: &Value) -> Result<Self, ConfigError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(strip_nulls(config))?)
    }

    /// The defaults as a JSON mapping.
    fn defaults() -> Value {
        serde_json::to_value(Self::default()).unwrap_or(Value::Null)
    }
}

fn strip_nulls(config: &Value) -> Value {
    match config {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// An effect binding in the system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEntry {
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(default)]
    pub config: Value,
}

/// A device declaration in the system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub effect: Option<EffectEntry>,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl SystemConfig {
    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        log::info!(
            "Loaded configuration from {}",
            path.as_ref().display()
        );
        Ok(config)
    }
}
