use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::boundary::BoundaryTriple;
use crate::camera_pipeline::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use crate::measurement::MeasurementHistory;

pub const DEFAULT_CONFIG_PATH: &str = "serum_config.json";

pub const DEFAULT_THRESHOLD: i32 = 128;
pub const DEFAULT_KERNEL_SIZE: i32 = 5;

/// Edge sensitivity range accepted from the UI slider.
pub const SENSITIVITY_MIN: i32 = 0;
pub const SENSITIVITY_MAX: i32 = 255;

/// Blur kernel size range accepted from the UI slider.
pub const KERNEL_MIN: i32 = 1;
pub const KERNEL_MAX: i32 = 21;

/// Rectangular region of interest in frame pixel coordinates.
/// Stored in the config file as a four-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<[i32; 4]> for Roi {
    fn from(v: [i32; 4]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            width: v[2],
            height: v[3],
        }
    }
}

impl From<Roi> for [i32; 4] {
    fn from(roi: Roi) -> Self {
        [roi.x, roi.y, roi.width, roi.height]
    }
}

impl Roi {
    pub fn full_frame() -> Self {
        Self {
            x: 0,
            y: 0,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }
}

/// Operator-tunable edge detection parameters. The high Canny threshold is
/// always twice the sensitivity and has no independent control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningParams {
    pub sensitivity: i32,
    pub kernel_size: i32,
}

impl TuningParams {
    pub fn clamped_sensitivity(&self) -> i32 {
        self.sensitivity.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX)
    }
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_THRESHOLD,
            kernel_size: DEFAULT_KERNEL_SIZE,
        }
    }
}

fn default_camera_index() -> i32 {
    0
}
fn default_threshold() -> i32 {
    DEFAULT_THRESHOLD
}
fn default_kernel_size() -> i32 {
    DEFAULT_KERNEL_SIZE
}
fn default_roi() -> Roi {
    Roi::full_frame()
}

/// On-disk configuration record. Field names and the four-integer `roi`
/// array are load-bearing: a saved file must reload to identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_camera_index")]
    pub camera_index: i32,
    #[serde(default = "default_threshold")]
    pub threshold: i32,
    #[serde(default = "default_kernel_size")]
    pub kernel_size: i32,
    #[serde(default = "default_roi")]
    pub roi: Roi,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_index: default_camera_index(),
            threshold: default_threshold(),
            kernel_size: default_kernel_size(),
            roi: default_roi(),
        }
    }
}

impl AppConfig {
    /// Load the config file, falling back to defaults when it is missing or
    /// unreadable. Load failure is recovered locally, never surfaced.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring malformed config {}: {}", path.display(), err);
                    Self::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                log::warn!("could not read config {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, json)
    }
}

/// All mutable state the update loop works with, in one place so the
/// pipeline can be driven (and tested) without a presentation layer.
pub struct AppState {
    pub config_path: PathBuf,
    pub camera_index: i32,
    pub roi: Roi,
    pub tuning: TuningParams,
    pub live_display: bool,
    pub tuning_mode: bool,
    pub edge_map: Option<Frame>,
    pub boundaries: Option<BoundaryTriple>,
    pub history: MeasurementHistory,
}

impl AppState {
    pub fn from_config(config: &AppConfig, config_path: PathBuf) -> Self {
        Self {
            config_path,
            camera_index: config.camera_index,
            roi: config.roi,
            tuning: TuningParams {
                sensitivity: config.threshold,
                kernel_size: config.kernel_size,
            },
            live_display: true,
            tuning_mode: false,
            edge_map: None,
            boundaries: None,
            history: MeasurementHistory::new(),
        }
    }

    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            camera_index: self.camera_index,
            threshold: self.tuning.sensitivity,
            kernel_size: self.tuning.kernel_size,
            roi: self.roi,
        }
    }

    /// Drop the current cycle's processed results (per-frame failure path).
    pub fn clear_processed(&mut self) {
        self.edge_map = None;
        self.boundaries = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("serovis_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn roi_serializes_as_four_integers() {
        let roi = Roi {
            x: 5,
            y: 5,
            width: 100,
            height: 200,
        };
        assert_eq!(serde_json::to_string(&roi).unwrap(), "[5,5,100,200]");

        let back: Roi = serde_json::from_str("[5,5,100,200]").unwrap();
        assert_eq!(back, roi);
    }

    #[test]
    fn config_round_trips_exactly() {
        let path = temp_config_path("roundtrip");
        let config = AppConfig {
            camera_index: 1,
            threshold: 77,
            kernel_size: 9,
            roi: Roi {
                x: 5,
                y: 5,
                width: 100,
                height: 200,
            },
        };

        config.save(&path).unwrap();
        let reloaded = AppConfig::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/serovis/config.json"));

        assert_eq!(config.camera_index, 0);
        assert_eq!(config.threshold, 128);
        assert_eq!(config.kernel_size, 5);
        assert_eq!(config.roi, Roi::full_frame());
    }

    #[test]
    fn malformed_file_loads_defaults() {
        let path = temp_config_path("malformed");
        std::fs::write(&path, "{not json").unwrap();
        let config = AppConfig::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_config_path("partial");
        std::fs::write(&path, r#"{"threshold": 42}"#).unwrap();
        let config = AppConfig::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(config.threshold, 42);
        assert_eq!(config.kernel_size, DEFAULT_KERNEL_SIZE);
        assert_eq!(config.roi, Roi::full_frame());
    }

    #[test]
    fn state_round_trips_through_config() {
        let config = AppConfig {
            camera_index: 2,
            threshold: 33,
            kernel_size: 7,
            roi: Roi {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
            },
        };
        let state = AppState::from_config(&config, PathBuf::from("x.json"));

        assert!(state.live_display);
        assert!(!state.tuning_mode);
        assert_eq!(state.to_config(), config);
    }
}
