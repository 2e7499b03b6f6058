//! TOML configuration.
//!
//! Every section is optional; missing keys take their defaults so a partial
//! file (or none at all) is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::AssetRoot;
use crate::bullets::BulletVisualConfig;
use crate::device::GpuInit;
use crate::logging::LoggingConfig;
use crate::paint::{Color, ColorSpec};
use crate::postprocess::RadiationParams;
use crate::texture::AtlasGrid;
use crate::window::RuntimeConfig;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BastionConfig {
    pub assets: AssetsConfig,
    pub sprites: SpritesConfig,
    pub bullets: BulletsConfig,
    pub radiation: RadiationConfig,
    pub debug: DebugConfig,
    pub logging: LoggingSection,
    pub window: WindowSection,
}

impl BastionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub root: AssetRoot,
    /// Image decode worker threads.
    pub loader_threads: usize,
    pub atlases: Vec<AtlasDef>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { root: AssetRoot::default(), loader_threads: 2, atlases: Vec::new() }
    }
}

/// A sprite sheet declared in config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasDef {
    pub id: String,
    pub image: String,
    #[serde(default)]
    pub grid: AtlasGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpritesConfig {
    /// Layers in the sprite array.
    pub max_textures: u32,
    /// Edge length of each layer, in texels.
    pub texture_size: u32,
}

impl Default for SpritesConfig {
    fn default() -> Self {
        Self { max_textures: 64, texture_size: 128 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletsConfig {
    pub capacity_per_batch: u32,
    /// Bullet visuals by key.
    pub visuals: BTreeMap<String, BulletVisualConfig>,
}

impl Default for BulletsConfig {
    fn default() -> Self {
        Self { capacity_per_batch: 1024, visuals: BTreeMap::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationConfig {
    /// Data bridge key holding the current intensity.
    pub intensity_key: String,
    #[serde(flatten)]
    pub params: RadiationParams,
}

impl Default for RadiationConfig {
    fn default() -> Self {
        Self { intensity_key: "radiation.intensity".to_string(), params: RadiationParams::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub overlay: bool,
    pub poll_interval_ms: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { overlay: false, poll_interval_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `env_logger` filter string; `RUST_LOG` applies when unset.
    pub filter: Option<String>,
}

impl LoggingSection {
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig { env_filter: self.filter.clone(), ..LoggingConfig::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub clear_color: ColorSpec,
    pub vsync: bool,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "bastion".to_string(),
            width: 1280.0,
            height: 720.0,
            clear_color: ColorSpec::Hex("#14181f".to_string()),
            vsync: true,
        }
    }
}

impl WindowSection {
    pub fn runtime_config(&self) -> RuntimeConfig {
        let width = if self.width.is_finite() && self.width > 0.0 { self.width } else { 1280.0 };
        let height = if self.height.is_finite() && self.height > 0.0 { self.height } else { 720.0 };
        RuntimeConfig {
            title: self.title.clone(),
            initial_size: winit::dpi::LogicalSize::new(width, height),
        }
    }

    pub fn gpu_init(&self) -> GpuInit {
        GpuInit { vsync: self.vsync, ..GpuInit::default() }
    }

    /// Surface clear color; unparseable specs fall back to opaque black.
    pub fn clear_color(&self) -> Color {
        self.clear_color.resolve().unwrap_or_else(|| {
            log::warn!("invalid window.clear_color; using black");
            Color::from_premul(0.0, 0.0, 0.0, 1.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bullets::BulletShape;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(BastionConfig::from_toml_str("").unwrap(), BastionConfig::default());
    }

    #[test]
    fn parses_every_section() {
        let cfg = BastionConfig::from_toml_str(
            r##"
            [assets]
            root = { kind = "web", base_url = "https://cdn.example" }
            loader_threads = 4
            atlases = [{ id = "imp", image = "images/imp.png", grid = { columns = 4, rows = 2 } }]

            [sprites]
            max_textures = 16

            [bullets]
            capacity_per_batch = 256
            [bullets.visuals.arrow]
            shape = "bolt"
            core_color = "#ffffff"

            [radiation]
            intensity_key = "map.radiation"
            jitter = 5.0

            [debug]
            overlay = true

            [logging]
            filter = "bastion_engine=debug"

            [window]
            title = "siege"
            vsync = false
            "##,
        )
        .unwrap();

        assert_eq!(cfg.assets.root, AssetRoot::Web { base_url: "https://cdn.example".into() });
        assert_eq!(cfg.assets.atlases[0].grid, AtlasGrid::new(4, 2));
        assert_eq!(cfg.sprites.max_textures, 16);
        assert_eq!(cfg.sprites.texture_size, 128);
        assert_eq!(cfg.bullets.visuals["arrow"].shape, BulletShape::Bolt);
        assert_eq!(cfg.radiation.intensity_key, "map.radiation");
        assert_eq!(cfg.radiation.params.jitter, 5.0);
        assert_eq!(cfg.radiation.params.band_speed, RadiationParams::default().band_speed);
        assert!(cfg.debug.overlay);
        assert_eq!(
            cfg.logging.to_logging_config().env_filter.as_deref(),
            Some("bastion_engine=debug")
        );
        assert_eq!(cfg.window.title, "siege");
        assert!(!cfg.window.gpu_init().vsync);
        assert_eq!(cfg.window.runtime_config().initial_size.width, 1280.0);
    }

    #[test]
    fn bad_window_values_fall_back() {
        let cfg = BastionConfig::from_toml_str(
            "[window]\nwidth = -5.0\nclear_color = \"#zzzzzz\"",
        )
        .unwrap();
        assert_eq!(cfg.window.runtime_config().initial_size.width, 1280.0);
        assert_eq!(cfg.window.clear_color(), Color::from_premul(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            BastionConfig::from_toml_str("[sprites]\nmax_textures = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = BastionConfig::load_or_default("/definitely/not/here/bastion.toml").unwrap();
        assert_eq!(cfg, BastionConfig::default());
        assert!(matches!(
            BastionConfig::load("/definitely/not/here/bastion.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = BastionConfig::default().to_toml_string().unwrap();
        assert_eq!(BastionConfig::from_toml_str(&text).unwrap(), BastionConfig::default());
    }
}
