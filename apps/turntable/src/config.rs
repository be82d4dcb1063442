use crate::presets::{MaterialPreset, PresetOverrides};
use anyhow::Context;
use offrender_render::RenderOptions;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_VIEWS: u32 = 60;
pub const DEFAULT_RESOLUTION: u32 = 512;
pub const DEFAULT_FOCAL: f32 = 5000.0;

/// Turntable settings, optionally loaded from YAML. Command-line flags take
/// precedence over every field here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TurntableConfig {
    pub views: u32,
    pub resolution: u32,
    pub focal: f32,
    pub material: MaterialPreset,
    pub render: RenderOptions,
    pub preset: PresetOverrides,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            views: DEFAULT_VIEWS,
            resolution: DEFAULT_RESOLUTION,
            focal: DEFAULT_FOCAL,
            material: MaterialPreset::default(),
            render: RenderOptions::default(),
            preset: PresetOverrides::default(),
        }
    }
}

impl TurntableConfig {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("invalid turntable config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.views == 0 {
            anyhow::bail!("views must be at least 1");
        }
        if self.resolution == 0 {
            anyhow::bail!("resolution must be at least 1");
        }
        if self.focal.is_nan() || self.focal <= 0.0 {
            anyhow::bail!("focal length must be positive, got {}", self.focal);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_default() {
        let c = TurntableConfig::from_yaml("{}").unwrap();
        assert_eq!(c, TurntableConfig::default());
        assert_eq!(c.views, 60);
        assert_eq!(c.resolution, 512);
    }

    #[test]
    fn partial_yaml() {
        let text = "
views: 12
material: skin
render:
  shadows: true
preset:
  ambient_light: 0.4
";
        let c = TurntableConfig::from_yaml(text).unwrap();
        assert_eq!(c.views, 12);
        assert_eq!(c.material, MaterialPreset::Skin);
        assert!(c.render.shadows);
        assert!(c.render.cull_faces);
        assert_eq!(c.preset.ambient_light, Some(0.4));
        assert_eq!(c.focal, DEFAULT_FOCAL);
    }

    #[test]
    fn zero_views_rejected() {
        assert!(TurntableConfig::from_yaml("views: 0").is_err());
        assert!(TurntableConfig::from_yaml("focal: -1.0").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turntable.yaml");
        std::fs::write(&path, "resolution: 128\n").unwrap();
        let c = TurntableConfig::load(&path).unwrap();
        assert_eq!(c.resolution, 128);
        assert!(TurntableConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
