//! Viewer configuration
//!
//! Read from `cdvis.toml` (or the path given with `--config`). Every
//! section and field is optional; anything missing keeps its default.
//!
//! ```toml
//! [display]
//! width = 1600
//! height = 900
//! vsync = true
//! backend = "auto"   # auto, vulkan, metal, dx12, gl
//!
//! [camera]
//! fov_degrees = 70.0
//! position = [0.0, 0.0, -1.25]
//!
//! [volume]
//! threshold = 0.2
//! folder = "data/ct_head"
//!
//! [loader]
//! workers = 0        # 0 = one per core
//!
//! [xr]
//! enabled = false
//! ```

use std::path::{Path, PathBuf};

use cdvis_math::Vec3;
use cdvis_render::VolumeParameters;
use cdvis_xr::InteractionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "cdvis.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Graphics API used for the window surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Let wgpu pick the primary API of the platform
    #[default]
    Auto,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

impl Backend {
    pub fn to_wgpu(self) -> wgpu::Backends {
        match self {
            Self::Auto => wgpu::Backends::PRIMARY,
            Self::Vulkan => wgpu::Backends::VULKAN,
            Self::Metal => wgpu::Backends::METAL,
            Self::Dx12 => wgpu::Backends::DX12,
            Self::Gl => wgpu::Backends::GL,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Vulkan => write!(f, "vulkan"),
            Self::Metal => write!(f, "metal"),
            Self::Dx12 => write!(f, "dx12"),
            Self::Gl => write!(f, "gl"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "vulkan" | "vk" => Ok(Self::Vulkan),
            "metal" | "mtl" => Ok(Self::Metal),
            "dx12" | "d3d12" => Ok(Self::Dx12),
            "gl" | "opengl" | "gles" => Ok(Self::Gl),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub title: String,
    pub backend: Backend,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            vsync: true,
            title: "CDVis".to_string(),
            backend: Backend::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Start position, looking at the origin
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            near: 0.01,
            far: 50.0,
            position: [0.0, 0.0, -1.25],
        }
    }
}

/// Initial volume parameters and an optional folder to open at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub step_size: f32,
    pub density: f32,
    pub threshold: f32,
    pub exposure: f32,
    pub light_density: f32,
    pub light_intensity: f32,
    pub light_ambient: f32,
    pub light_position: [f32; 3],
    pub light_direction: [f32; 3],
    pub light_angle: f32,
    pub plane_point: [f32; 3],
    pub plane_normal: [f32; 3],
    pub display_sample_count: bool,
    pub folder: Option<PathBuf>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        let p = VolumeParameters::default();
        Self {
            step_size: p.step_size,
            density: p.density,
            threshold: p.threshold,
            exposure: p.exposure,
            light_density: p.light_density,
            light_intensity: p.light_intensity,
            light_ambient: p.light_ambient,
            light_position: p.light_position.to_array(),
            light_direction: p.light_direction.to_array(),
            light_angle: p.light_angle,
            plane_point: p.plane_point.to_array(),
            plane_normal: p.plane_normal.to_array(),
            display_sample_count: p.display_sample_count,
            folder: None,
        }
    }
}

impl VolumeConfig {
    pub fn parameters(&self) -> VolumeParameters {
        VolumeParameters {
            step_size: self.step_size,
            density: self.density,
            threshold: self.threshold,
            exposure: self.exposure,
            light_density: self.light_density,
            light_intensity: self.light_intensity,
            light_ambient: self.light_ambient,
            light_position: Vec3::from_array(self.light_position),
            light_direction: Vec3::from_array(self.light_direction),
            light_angle: self.light_angle,
            plane_point: Vec3::from_array(self.plane_point),
            plane_normal: Vec3::from_array(self.plane_normal),
            mask: false,
            display_sample_count: self.display_sample_count,
        }
        .sanitized()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Decode threads, 0 = available parallelism
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrConfig {
    /// Run a simulated device session alongside the desktop view
    pub enabled: bool,
    pub hover_radius: f32,
    pub drag_start_haptic_us: u32,
    pub drag_stop_haptic_us: u32,
}

impl Default for XrConfig {
    fn default() -> Self {
        let interaction = InteractionConfig::default();
        Self {
            enabled: false,
            hover_radius: interaction.hover_radius,
            drag_start_haptic_us: interaction.drag_start_haptic_us,
            drag_stop_haptic_us: interaction.drag_stop_haptic_us,
        }
    }
}

impl XrConfig {
    pub fn interaction(&self) -> InteractionConfig {
        InteractionConfig {
            hover_radius: self.hover_radius,
            drag_start_haptic_us: self.drag_start_haptic_us,
            drag_stop_haptic_us: self.drag_stop_haptic_us,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub camera: CameraConfig,
    pub volume: VolumeConfig,
    pub loader: LoaderConfig,
    pub xr: XrConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{}",
                self.display.width, self.display.height
            )));
        }
        if !(self.camera.near > 0.0 && self.camera.near < self.camera.far) {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes near={} far={}",
                self.camera.near, self.camera.far
            )));
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera fov {} degrees",
                self.camera.fov_degrees
            )));
        }
        Ok(())
    }

    pub fn print_summary(&self) {
        log::info!("Configuration:");
        log::info!(
            "  Window: {}x{}, vsync {}, backend {}",
            self.display.width,
            self.display.height,
            self.display.vsync,
            self.display.backend
        );
        if let Some(folder) = &self.volume.folder {
            log::info!("  Startup volume: {}", folder.display());
        }
        if self.xr.enabled {
            log::info!("  XR: simulated session, hover radius {}", self.xr.hover_radius);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("auto".parse::<Backend>().unwrap(), Backend::Auto);
        assert_eq!("Vulkan".parse::<Backend>().unwrap(), Backend::Vulkan);
        assert_eq!("d3d12".parse::<Backend>().unwrap(), Backend::Dx12);
        assert_eq!("opengl".parse::<Backend>().unwrap(), Backend::Gl);
        assert!("glide".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_display_round_trips() {
        for backend in [Backend::Auto, Backend::Vulkan, Backend::Metal, Backend::Dx12, Backend::Gl] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!((config.display.width, config.display.height), (1600, 900));
        assert!(config.display.vsync);
        assert!(!config.xr.enabled);
        assert_eq!(config.loader.workers, 0);
        assert_eq!(config.volume.parameters(), VolumeParameters::default());
        assert_eq!(config.xr.interaction(), InteractionConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [display]
            width = 800
            backend = "gl"

            [volume]
            threshold = 0.35
            folder = "scans/head"

            [xr]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.display.width, 800);
        assert_eq!(config.display.height, 900);
        assert_eq!(config.display.backend, Backend::Gl);
        assert_eq!(config.volume.parameters().threshold, 0.35);
        assert_eq!(config.volume.parameters().density, 0.5);
        assert_eq!(config.volume.folder, Some(PathBuf::from("scans/head")));
        assert!(config.xr.enabled);
        assert_eq!(config.xr.hover_radius, 0.025);
    }

    #[test]
    fn test_parameters_are_sanitized() {
        let volume = VolumeConfig {
            threshold: 4.0,
            density: -1.0,
            step_size: 0.0,
            ..VolumeConfig::default()
        };
        let p = volume.parameters();
        assert_eq!(p.threshold, 1.0);
        assert_eq!(p.density, 0.0);
        assert_eq!(p.step_size, VolumeParameters::MIN_STEP_SIZE);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("cdvis.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdvis.toml");

        std::fs::write(&path, "[camera]\nnear = 5.0\nfar = 1.0\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "[display]\nwidth = \"wide\"\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
