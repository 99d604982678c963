use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analyzers: AnalyzerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Largest accepted wire frame in bytes
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,
    /// Directory for the per-run log file
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_listen_addr() -> String { "127.0.0.1:8765".to_string() }
fn default_max_frame_length() -> usize { 16 * 1024 * 1024 }
fn default_log_dir() -> String { "logs".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_frame_length: default_max_frame_length(),
            log_dir: default_log_dir(),
        }
    }
}

/// Thresholds for every exercise analyzer. Angles in degrees, positions in
/// normalized image units.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub curl: CurlConfig,
    #[serde(default)]
    pub lunge: LungeConfig,
    #[serde(default)]
    pub plank: PlankConfig,
    #[serde(default)]
    pub lateral_raise: LateralRaiseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    /// Max samples kept per rep window (~60s at 30fps)
    #[serde(default = "default_window_capacity")]
    pub capacity: usize,
}

fn default_window_capacity() -> usize { 1800 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self { capacity: default_window_capacity() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurlConfig {
    /// Both elbows above this → arms extended (down)
    #[serde(default = "default_curl_extension")]
    pub extension_threshold: f32,
    /// Both elbows below this → arms flexed (up)
    #[serde(default = "default_curl_flex")]
    pub flex_threshold: f32,
    #[serde(default = "default_curl_elbow_position")]
    pub elbow_position_threshold: f32,
    #[serde(default = "default_curl_shoulder_position")]
    pub shoulder_position_threshold: f32,
    /// Shoulder angle under this → elbow tucked against the body
    #[serde(default = "default_curl_elbow_close")]
    pub elbow_close_threshold: f32,
}

fn default_curl_extension() -> f32 { 160.0 }
fn default_curl_flex() -> f32 { 30.0 }
fn default_curl_elbow_position() -> f32 { 0.03 }
fn default_curl_shoulder_position() -> f32 { 0.02 }
fn default_curl_elbow_close() -> f32 { 20.0 }

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            extension_threshold: default_curl_extension(),
            flex_threshold: default_curl_flex(),
            elbow_position_threshold: default_curl_elbow_position(),
            shoulder_position_threshold: default_curl_shoulder_position(),
            elbow_close_threshold: default_curl_elbow_close(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LungeConfig {
    /// Forward knee below this → lunging
    #[serde(default = "default_lunge_threshold")]
    pub lunge_threshold: f32,
    /// Both knees above this → standing again
    #[serde(default = "default_standing_threshold")]
    pub standing_threshold: f32,
    #[serde(default = "default_min_front_knee")]
    pub min_front_knee_angle: f32,
    #[serde(default = "default_max_front_knee")]
    pub max_front_knee_angle: f32,
    /// Max |knee.x - ankle.x| of the front leg
    #[serde(default = "default_max_knee_over_toe")]
    pub max_knee_over_toe: f32,
}

fn default_lunge_threshold() -> f32 { 110.0 }
fn default_standing_threshold() -> f32 { 160.0 }
fn default_min_front_knee() -> f32 { 80.0 }
fn default_max_front_knee() -> f32 { 110.0 }
fn default_max_knee_over_toe() -> f32 { 0.1 }

impl Default for LungeConfig {
    fn default() -> Self {
        Self {
            lunge_threshold: default_lunge_threshold(),
            standing_threshold: default_standing_threshold(),
            min_front_knee_angle: default_min_front_knee(),
            max_front_knee_angle: default_max_front_knee(),
            max_knee_over_toe: default_max_knee_over_toe(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlankConfig {
    /// Both hips must be more visible than this to evaluate
    #[serde(default = "default_min_hip_visibility")]
    pub min_hip_visibility: f32,
    #[serde(default = "default_min_body_angle")]
    pub min_body_angle: f32,
    #[serde(default = "default_max_body_angle")]
    pub max_body_angle: f32,
}

fn default_min_hip_visibility() -> f32 { 0.9 }
fn default_min_body_angle() -> f32 { 160.0 }
fn default_max_body_angle() -> f32 { 180.0 }

impl Default for PlankConfig {
    fn default() -> Self {
        Self {
            min_hip_visibility: default_min_hip_visibility(),
            min_body_angle: default_min_body_angle(),
            max_body_angle: default_max_body_angle(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LateralRaiseConfig {
    /// Both shoulders below this → arms down, rep boundary
    #[serde(default = "default_raise_down")]
    pub down_threshold: f32,
    /// Both shoulders above this → arms up, sampled into the peak windows
    #[serde(default = "default_raise_rep")]
    pub rep_threshold: f32,
    /// Peak must reach this on both sides
    #[serde(default = "default_raise_min_lift")]
    pub min_lift_angle: f32,
    /// Peak above this on either side is overextension
    #[serde(default = "default_raise_max")]
    pub max_angle: f32,
}

fn default_raise_down() -> f32 { 30.0 }
fn default_raise_rep() -> f32 { 60.0 }
fn default_raise_min_lift() -> f32 { 80.0 }
fn default_raise_max() -> f32 { 120.0 }

impl Default for LateralRaiseConfig {
    fn default() -> Self {
        Self {
            down_threshold: default_raise_down(),
            rep_threshold: default_raise_rep(),
            min_lift_angle: default_raise_min_lift(),
            max_angle: default_raise_max(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Missing file → defaults. A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
