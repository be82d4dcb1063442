use clap::ValueEnum;
use glam::Vec3;
use offrender_common::Rgb;
use offrender_scene::Material;
use serde::Deserialize;

/// Named look for the turntable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialPreset {
    /// Matte skin tone.
    Skin,
    /// Light gray, slightly metallic.
    Geo,
    /// Vertex colors from the mesh file, default material.
    #[default]
    #[value(alias = "color")]
    #[serde(alias = "color")]
    None,
}

/// Colors, material factors, and light levels of a preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// Applied to every vertex when set.
    pub color: Option<Rgb>,
    pub metallic: Option<f32>,
    pub roughness: Option<f32>,
    pub ambient_light: f32,
    pub directional_light: f32,
    pub floor_gray: f32,
}

impl Preset {
    pub fn skin() -> Self {
        Self {
            color: Some(Vec3::new(255.0, 195.0, 174.0) / 255.0 * 0.8),
            metallic: Some(0.0),
            roughness: Some(1.0),
            ambient_light: 0.5,
            directional_light: 1.0,
            floor_gray: 1.0,
        }
    }

    /// Shares the skin floor.
    pub fn geo() -> Self {
        Self {
            color: Some(Vec3::splat(222.0 / 255.0)),
            metallic: Some(0.2),
            roughness: Some(0.8),
            ambient_light: 0.22,
            directional_light: 1.8,
            floor_gray: Self::skin().floor_gray,
        }
    }

    pub fn color() -> Self {
        Self {
            color: None,
            metallic: None,
            roughness: None,
            ambient_light: 0.8,
            directional_light: 1.0,
            floor_gray: 0.78,
        }
    }

    /// A material only when both factors are known; otherwise the renderer
    /// falls back to its default.
    pub fn material(&self) -> Option<Material> {
        match (self.metallic, self.roughness) {
            (Some(m), Some(r)) => Some(Material::metallic_roughness(m, r)),
            _ => None,
        }
    }

    pub fn with_overrides(mut self, o: &PresetOverrides) -> Self {
        if let Some(c) = o.color {
            self.color = Some(Vec3::from_array(c));
        }
        if o.metallic.is_some() {
            self.metallic = o.metallic;
        }
        if o.roughness.is_some() {
            self.roughness = o.roughness;
        }
        self.ambient_light = o.ambient_light.unwrap_or(self.ambient_light);
        self.directional_light = o.directional_light.unwrap_or(self.directional_light);
        self.floor_gray = o.floor_gray.unwrap_or(self.floor_gray);
        self
    }
}

impl From<MaterialPreset> for Preset {
    fn from(p: MaterialPreset) -> Self {
        match p {
            MaterialPreset::Skin => Self::skin(),
            MaterialPreset::Geo => Self::geo(),
            MaterialPreset::None => Self::color(),
        }
    }
}

/// Per-field replacements for a preset, read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PresetOverrides {
    pub color: Option<[f32; 3]>,
    pub metallic: Option<f32>,
    pub roughness: Option<f32>,
    pub ambient_light: Option<f32>,
    pub directional_light: Option<f32>,
    pub floor_gray: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skin_color_scaled() {
        let c = Preset::skin().color.unwrap();
        assert!((c.x - 0.8).abs() < 1e-6);
        assert!((c.y - 195.0 / 255.0 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn geo_floor_follows_skin() {
        assert_eq!(Preset::geo().floor_gray, Preset::skin().floor_gray);
        assert_eq!(Preset::geo().directional_light, 1.8);
    }

    #[test]
    fn color_preset_has_no_material() {
        let p = Preset::from(MaterialPreset::None);
        assert!(p.color.is_none());
        assert!(p.material().is_none());
        assert_eq!(p.floor_gray, 0.78);
    }

    #[test]
    fn material_from_factors() {
        let m = Preset::geo().material().unwrap();
        assert_eq!(m.metallic_factor, 0.2);
        assert_eq!(m.roughness_factor, 0.8);
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let o = PresetOverrides {
            ambient_light: Some(0.3),
            color: Some([1.0, 0.0, 0.0]),
            ..Default::default()
        };
        let p = Preset::skin().with_overrides(&o);
        assert_eq!(p.ambient_light, 0.3);
        assert_eq!(p.color, Some(Vec3::X));
        assert_eq!(p.directional_light, 1.0);
        assert_eq!(p.metallic, Some(0.0));
    }

    #[test]
    fn color_alias_parses() {
        let p = MaterialPreset::from_str("color", true).unwrap();
        assert_eq!(p, MaterialPreset::None);
        let p: MaterialPreset = serde_yaml::from_str("geo").unwrap();
        assert_eq!(p, MaterialPreset::Geo);
    }
}
