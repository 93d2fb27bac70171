//! # Interest Configuration
//!
//! Tunables for one viewer's interest manager. Loaded once at startup from
//! TOML; every field has a default so a partial file is fine.
//!
//! ```toml
//! warmup_ticks = 30
//! debounce_ms = 3000
//! prioritization = "front_back"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// How the relevance ranker scores entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritizationScheme {
    /// Plain distance from the viewer.
    #[default]
    Distance,
    /// Distance, penalised for entities behind the camera.
    FrontBack,
    /// Presences and worn attachments first, then front/back distance.
    BestAvatarResponsiveness,
}

/// Interest manager configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterestConfig {
    /// Ticks to skip after construction so the connection can settle.
    pub warmup_ticks: u32,
    /// Camera travel (metres) that counts as significant movement.
    pub min_view_step: f32,
    /// Weight of squared velocity added to squared travel.
    pub velocity_weight: f32,
    /// Debounce window for draw-distance and camera changes.
    pub debounce_ms: u64,
    /// Floor for non-zero draw distances during recompute.
    pub min_draw_distance: f32,
    /// Priority offset keeping a root part ahead of its children.
    pub root_priority_offset: f64,
    /// Relevance scoring scheme.
    pub prioritization: PrioritizationScheme,
    /// Master switch for visibility culling.
    pub use_culling: bool,
    /// Also cull entities outside the camera's field of view.
    pub fov_culling: bool,
    /// Full field-of-view angle in degrees.
    pub fov_degrees: f32,
    /// Entities closer than this are visible regardless of FOV.
    pub near_radius: f32,
    /// Background pool threads.
    pub worker_threads: usize,
    /// Background pool queue length.
    pub worker_queue: usize,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            warmup_ticks: 30,
            min_view_step: 16.0,
            velocity_weight: 0.2,
            debounce_ms: 3000,
            min_draw_distance: 32.0,
            root_priority_offset: 10.0,
            prioritization: PrioritizationScheme::Distance,
            use_culling: true,
            fov_culling: false,
            fov_degrees: 120.0,
            near_radius: 8.0,
            worker_threads: 2,
            worker_queue: 256,
        }
    }
}

impl InterestConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`InterestConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_view_step < 0.0 {
            return Err(ConfigError::Invalid("min_view_step must be >= 0".into()));
        }
        if self.velocity_weight < 0.0 {
            return Err(ConfigError::Invalid("velocity_weight must be >= 0".into()));
        }
        if self.min_draw_distance < 0.0 {
            return Err(ConfigError::Invalid("min_draw_distance must be >= 0".into()));
        }
        if self.root_priority_offset <= 0.0 {
            return Err(ConfigError::Invalid("root_priority_offset must be > 0".into()));
        }
        if self.near_radius < 0.0 {
            return Err(ConfigError::Invalid("near_radius must be >= 0".into()));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees <= 360.0) {
            return Err(ConfigError::Invalid("fov_degrees must be in (0, 360]".into()));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid("worker_threads must be > 0".into()));
        }
        if self.worker_queue == 0 {
            return Err(ConfigError::Invalid("worker_queue must be > 0".into()));
        }
        Ok(())
    }

    /// Significant-movement threshold, squared.
    #[inline]
    #[must_use]
    pub fn min_view_step_sq(&self) -> f32 {
        self.min_view_step * self.min_view_step
    }

    /// Debounce window as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = InterestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_view_step_sq(), 256.0);
        assert_eq!(config.debounce(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_toml() {
        let config = InterestConfig::from_toml_str(
            r#"
            warmup_ticks = 5
            prioritization = "front_back"
            fov_culling = true
            "#,
        )
        .unwrap();
        assert_eq!(config.warmup_ticks, 5);
        assert_eq!(config.prioritization, PrioritizationScheme::FrontBack);
        assert!(config.fov_culling);
        assert_eq!(config.debounce_ms, 3000);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = InterestConfig::from_toml_str("worker_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = InterestConfig::from_toml_str("fov_degrees = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = InterestConfig::from_toml_str("warmup_ticks = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = InterestConfig::from_toml_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
