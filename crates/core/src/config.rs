use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Tunable parameters of the reconstruction engine.
///
/// The pixel distances were calibrated against one dental-vendor layout
/// family; they are configuration rather than constants so other layouts can
/// be retuned without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// OCR confidence floor (0–100); tokens below it are dropped as noise.
    pub min_confidence: i32,
    /// Vertical window for attaching a token to an existing line cluster.
    pub line_tolerance_px: i32,
    /// How far to look when borrowing product text from a neighboring line.
    pub borrow_distance_px: i32,
    /// Maximum distance for pairing a quantity-only line with a price-only line.
    pub pair_distance_px: i32,
    /// Distance under which a pair is accepted without any shared word.
    pub near_pair_distance_px: i32,
    /// Window within which a candidate counts as a wrapped continuation of
    /// a neighboring candidate line rather than a row of its own.
    pub continuation_distance_px: i32,
    /// Plausible range for a bare (un-prefixed) amount to count as a total.
    pub plausible_total_min: f64,
    pub plausible_total_max: f64,
    /// Known office/clinic names to match for `office_location`.
    pub known_offices: Vec<String>,
    /// Deadline per vendor-ruleset trial during detection, in seconds.
    pub detect_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 30,
            line_tolerance_px: 15,
            borrow_distance_px: 100,
            pair_distance_px: 200,
            near_pair_distance_px: 50,
            continuation_distance_px: 30,
            plausible_total_min: 10.0,
            plausible_total_max: 1000.0,
            known_offices: vec!["Roseburg".to_string(), "Riddle".to_string()],
            detect_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }
}
