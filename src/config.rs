use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::filter::FilterOptions;
use crate::peaks::PeakOptions;
use crate::types::{Result, Window};

/// Settings for a full feature extraction run.
///
/// Every field has a default, so a configuration file only needs the values
/// it changes:
///
/// ```
/// use alm_importer::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str(r#"
///     [filter]
///     filter_na = false
///
///     [movement_window]
///     start_offset = -0.1
///     stop_offset = 0.4
/// "#).unwrap();
///
/// assert!(!config.filter.filter_na);
/// assert!(config.filter.filter_stim);
/// assert_eq!(config.movement_window.start_offset, -0.1);
/// assert_eq!(config.peaks.min_distance, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trial exclusion criteria
    pub filter: FilterOptions,
    /// Window relative to pole withdrawal
    pub pole_window: Window,
    /// Window relative to the first lick
    pub movement_window: Window,
    /// First-lick detection
    pub peaks: PeakOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            filter: FilterOptions::default(),
            pole_window: Window::POLE_OUT,
            movement_window: Window::MOVEMENT,
            peaks: PeakOptions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
