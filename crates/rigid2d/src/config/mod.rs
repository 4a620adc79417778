//! Configuration system
//!
//! Any `serde` type with a `Default` can be loaded from and saved to `.toml`
//! or `.ron` files by implementing [`Config`].

use std::path::Path;

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path)?;
        format.parse(&contents)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = Format::of(path)?.render(self)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse from a TOML string
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Format::Toml.parse(contents)
    }

    /// Parse from a RON string
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        Format::Ron.parse(contents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(self, contents: &str) -> Result<T, ConfigError> {
        match self {
            Self::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Self::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    fn render<T: Serialize>(self, value: &T) -> Result<String, ConfigError> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string())),
            Self::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
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

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    impl Config for Sample {}

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            Sample::load_from_file("settings.json"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Sample::default().save_to_file("settings"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_from_strings() {
        let from_toml = Sample::from_toml_str("name = \"a\"\ncount = 3\n").unwrap();
        let from_ron = Sample::from_ron_str("(name: \"a\", count: 3)").unwrap();
        assert_eq!(from_toml, from_ron);
        assert!(matches!(Sample::from_toml_str("count = \"x\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("rigid2d-config-{}.ron", std::process::id()));
        let sample = Sample {
            name: "world".to_string(),
            count: 7,
        };

        sample.save_to_file(&path).unwrap();
        let loaded = Sample::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, sample);
    }
}
