//! Classification and self-test options with TOML preset support.
//!
//! Options are plain values passed into every call; nothing is global.
//! They serialize to/from TOML and expose a JSON schema for settings UIs.

mod surface;

use std::path::Path;

use schemars::JsonSchema;
pub use self_test::SelfTestOptions;
use serde::{Deserialize, Serialize};
pub use surface::{Backend, SurfaceOptions};

use crate::error::SurfaceError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[surface]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Classification parameters.
    pub surface: SurfaceOptions,
    /// Synthetic self-test parameters.
    pub self_test: SelfTestOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Io`] if the file cannot be read and
    /// [`SurfaceError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, SurfaceError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::OptionsParse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, SurfaceError> {
        toml::from_str(content)
            .map_err(|e| SurfaceError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::OptionsParse`] if serialization fails and
    /// [`SurfaceError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SurfaceError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SurfaceError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn defaults() {
        let s = SurfaceOptions::default();
        assert_eq!(s.probe_radius, 1.2);
        assert_eq!(s.backend, Backend::Gpu);
        assert_eq!(s.cpu_threads, 8);
        assert_eq!(s.direction_samples, 100);
        assert_eq!(s.layer_removal_count, 0);
        assert_eq!(s.frame, 0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[surface]
probe_radius = 1.4
backend = "cpu"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.surface.probe_radius, 1.4);
        assert_eq!(opts.surface.backend, Backend::Cpu);
        // Everything else should be default
        assert_eq!(opts.surface.cpu_threads, 8);
        assert_eq!(opts.self_test, SelfTestOptions::default());
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        let err = Options::from_toml("[surface]\nbackend = \"tpu\"").unwrap_err();
        assert!(matches!(err, SurfaceError::OptionsParse(_)));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut s = SurfaceOptions {
            probe_radius: -1.0,
            ..SurfaceOptions::default()
        };
        assert!(matches!(
            s.params(),
            Err(SurfaceError::InvalidProbeRadius(_))
        ));
        s.probe_radius = 1.2;
        s.direction_samples = 0;
        assert!(matches!(
            s.params(),
            Err(SurfaceError::InvalidSampleCount(0))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir()
            .join(format!("surfdyn-options-{}", std::process::id()));
        let path = dir.join("preset.toml");
        let mut opts = Options::default();
        opts.surface.layer_removal_count = 3;
        opts.self_test.seed = 42;
        opts.save(&path).unwrap();
        let loaded = Options::load(&path).unwrap();
        assert_eq!(loaded, opts);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        assert!(props.contains_key("surface"));
        assert!(props.contains_key("self_test"));

        let surface = &props["surface"]["properties"];
        assert!(surface.get("probe_radius").is_some());
        assert!(surface.get("direction_samples").is_some());
        assert!(surface.get("frame").is_none());
    }
}
