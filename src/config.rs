//! Engine configuration. Every field has a default, so a config file only
//! needs to name what it overrides.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sizing: SizingConfig,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub loader: LoaderConfig,
    pub thresholds: ThresholdConfig,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject values the engine cannot work with: an empty or inverted zoom
    /// range, non-positive sizes, or a node that shows no columns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vp = &self.viewport;
        for (name, min) in [
            ("zoom_min_small", vp.zoom_min_small),
            ("zoom_min_large", vp.zoom_min_large),
        ] {
            if !(min > 0.0 && min <= vp.zoom_max) {
                return Err(ConfigError::Invalid(format!(
                    "viewport.{} must be in (0, zoom_max = {}], got {}",
                    name, vp.zoom_max, min
                )));
            }
        }
        positive("viewport.max_fit_zoom", vp.max_fit_zoom)?;
        positive("viewport.width", vp.width)?;
        positive("viewport.height", vp.height)?;
        positive("sizing.detailed_width", self.sizing.detailed_width)?;
        positive("sizing.compact_width", self.sizing.compact_width)?;
        positive("sizing.row_height", self.sizing.row_height)?;
        if self.sizing.max_display_columns == 0 {
            return Err(ConfigError::Invalid(
                "sizing.max_display_columns must be at least 1".to_string(),
            ));
        }
        if self.loader.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "loader.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

/// Node rectangle dimensions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub detailed_width: f64,
    pub compact_width: f64,
    pub compact_height: f64,
    pub header_height: f64,
    pub row_height: f64,
    /// Column rows drawn before the "+N more" badge takes over.
    pub max_display_columns: usize,
    pub overflow_badge_height: f64,
    pub padding: f64,
    pub char_width: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            detailed_width: 250.0,
            compact_width: 180.0,
            compact_height: 44.0,
            header_height: 36.0,
            row_height: 22.0,
            max_display_columns: 8,
            overflow_badge_height: 20.0,
            padding: 8.0,
            char_width: 7.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub gap_x: f64,
    pub gap_y: f64,
    /// Largest node count still laid out on a circle around the anchor.
    pub max_circular_nodes: usize,
    pub min_radius: f64,
    pub base_radius: f64,
    pub radius_per_node: f64,
    pub self_loop_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap_x: 80.0,
            gap_y: 60.0,
            max_circular_nodes: 6,
            min_radius: 300.0,
            base_radius: 150.0,
            radius_per_node: 50.0,
            self_loop_offset: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub zoom_max: f64,
    pub zoom_min_large: f64,
    pub zoom_min_small: f64,
    pub fit_margin: f64,
    pub max_fit_zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom_max: 3.0,
            zoom_min_large: 0.1,
            zoom_min_small: 0.25,
            fit_margin: 80.0,
            max_fit_zoom: 1.2,
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Node count above which the diagram drops to `Compact`.
    pub compact_above: usize,
    /// Node count above which edges are drawn straight.
    pub simplify_edges_above: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            compact_above: 15,
            simplify_edges_above: 10,
        }
    }
}
