//! Configuration system
//!
//! File-backed settings in TOML or RON, selected by extension. The
//! physics tuning values that used to be scattered literals live in
//! [`PhysicsSettings`].

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Rigid-body simulation tuning
///
/// Defaults reproduce the shooting-demo feel: near-earth gravity,
/// grippy level geometry, heavily damped characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// World gravity vector
    pub gravity: [f32; 3],
    /// Surface friction for humanoid (cylinder) bodies
    pub humanoid_friction: f32,
    /// Surface friction for block (box) bodies
    pub block_friction: f32,
    /// Linear damping for humanoid bodies
    pub humanoid_linear_damping: f32,
    /// Angular damping for humanoid bodies
    pub humanoid_angular_damping: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.82, 0.0],
            humanoid_friction: 0.5,
            block_friction: 1.1,
            humanoid_linear_damping: 0.65,
            humanoid_angular_damping: 1.0,
        }
    }
}

impl Config for PhysicsSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_physics_settings() {
        let settings = PhysicsSettings::default();

        assert_eq!(settings.gravity, [0.0, -9.82, 0.0]);
        assert_eq!(settings.humanoid_friction, 0.5);
        assert_eq!(settings.block_friction, 1.1);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: PhysicsSettings = toml::from_str("gravity = [0.0, -3.7, 0.0]").unwrap();

        assert_eq!(settings.gravity, [0.0, -3.7, 0.0]);
        assert_eq!(settings.humanoid_linear_damping, 0.65);
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = PhysicsSettings {
            block_friction: 0.9,
            ..Default::default()
        };

        let text = toml::to_string_pretty(&settings).unwrap();
        let back: PhysicsSettings = toml::from_str(&text).unwrap();

        assert_eq!(back.block_friction, 0.9);
        assert_eq!(back.gravity, settings.gravity);
    }
}
