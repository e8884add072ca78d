//! Job configuration

use meshpress_core::{Error, Result};
use meshpress_simplification::{EdgeCollapseSimplifier, DEFAULT_DECIMATION_FACTOR};
use meshpress_texture::TextureOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for the edge collapse decimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifierOptions {
    /// Stop collapsing once the cheapest edge costs more than this
    pub error_threshold: Option<f64>,
    /// Never collapse edges touching the mesh boundary
    pub preserve_boundary: bool,
    /// Penalty added to edges touching the boundary
    pub boundary_weight: f64,
}

impl Default for SimplifierOptions {
    fn default() -> Self {
        let defaults = EdgeCollapseSimplifier::default();
        Self {
            error_threshold: defaults.error_threshold,
            preserve_boundary: defaults.preserve_boundary,
            boundary_weight: defaults.boundary_weight,
        }
    }
}

impl From<&SimplifierOptions> for EdgeCollapseSimplifier {
    fn from(options: &SimplifierOptions) -> Self {
        EdgeCollapseSimplifier::with_params(
            options.error_threshold,
            options.preserve_boundary,
            options.boundary_weight,
        )
    }
}

/// Everything a [`Pipeline`](crate::Pipeline) needs besides the job's paths.
///
/// Loadable from TOML; missing keys take their defaults:
///
/// ```toml
/// decimation_factor = 0.25
///
/// [texture]
/// quality = 60
/// max_size = [2048, 2048]
///
/// [simplifier]
/// preserve_boundary = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of triangles to keep, in (0, 1]
    pub decimation_factor: f64,
    pub texture: TextureOptions,
    pub simplifier: SimplifierOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decimation_factor: DEFAULT_DECIMATION_FACTOR,
            texture: TextureOptions::default(),
            simplifier: SimplifierOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::InvalidData(format!("invalid config: {e}")))
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
