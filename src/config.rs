//! Configuration for the obfuscation pipeline.
//!
//! Loaded from a TOML file; every field has a default so a missing or partial
//! file still yields a usable configuration.

use crate::blur::ObfuscationPass;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub obfuscation: ObfuscationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// ONNX face detector; without one only the heuristic backend is used
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Model input width in pixels
    #[serde(default = "default_input_size")]
    pub input_width: u32,

    /// Model input height in pixels
    #[serde(default = "default_input_size")]
    pub input_height: u32,

    /// IoU above which overlapping detections are merged
    #[serde(default = "default_nms_threshold")]
    pub nms_threshold: f32,

    /// Pixels added to every edge of a neural detection
    #[serde(default = "default_padding")]
    pub padding: i32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            input_width: default_input_size(),
            input_height: default_input_size(),
            nms_threshold: default_nms_threshold(),
            padding: default_padding(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum confidence for neural detections
    #[serde(default = "default_neural_min_confidence")]
    pub neural_min_confidence: f32,

    /// Minimum confidence for heuristic detections
    #[serde(default = "default_heuristic_min_confidence")]
    pub heuristic_min_confidence: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            neural_min_confidence: default_neural_min_confidence(),
            heuristic_min_confidence: default_heuristic_min_confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationConfig {
    /// Ordered transform applied to every accepted region
    #[serde(default = "ObfuscationPass::reference_schedule")]
    pub passes: Vec<ObfuscationPass>,

    /// Box blur radius used when the full schedule fails
    #[serde(default = "default_fallback_radius")]
    pub fallback_radius: u32,

    /// Number of box blur iterations in the fallback
    #[serde(default = "default_fallback_passes")]
    pub fallback_passes: u32,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            passes: ObfuscationPass::reference_schedule(),
            fallback_radius: default_fallback_radius(),
            fallback_passes: default_fallback_passes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_input_size() -> u32 {
    640
}

fn default_nms_threshold() -> f32 {
    0.3
}

fn default_padding() -> i32 {
    40
}

fn default_neural_min_confidence() -> f32 {
    0.5
}

fn default_heuristic_min_confidence() -> f32 {
    0.3
}

fn default_fallback_radius() -> u32 {
    20
}

fn default_fallback_passes() -> u32 {
    3
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path, falling back to defaults
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("facecloak")
            .join("config.toml")
    }
}
