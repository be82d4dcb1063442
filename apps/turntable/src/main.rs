mod config;
mod presets;
mod stage;
mod turntable;

use anyhow::Context;
use clap::Parser;
use config::TurntableConfig;
use offrender_render_wgpu::{WgpuBackend, WgpuOffscreenRenderer};
use presets::{MaterialPreset, Preset};
use stage::Stage;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "turntable",
    version,
    about = "Render a 360-degree turntable of a mesh to PNG frames"
)]
struct Cli {
    /// OBJ mesh to render
    #[arg(long)]
    mesh_path: PathBuf,

    /// Directory the frames are written to
    #[arg(long)]
    out_dir: PathBuf,

    /// Material and lighting preset
    #[arg(long, value_enum)]
    material: Option<MaterialPreset>,

    /// Render directional shadows
    #[arg(long)]
    shadows: bool,

    /// Number of frames in a full turn [default: 60]
    #[arg(long)]
    views: Option<u32>,

    /// Frame width and height in pixels [default: 512]
    #[arg(long)]
    resolution: Option<u32>,

    /// Camera focal length in pixels [default: 5000]
    #[arg(long)]
    focal: Option<f32>,

    /// YAML file with turntable settings; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// File settings with every given flag applied on top.
    fn resolve(&self) -> anyhow::Result<TurntableConfig> {
        let mut config = match &self.config {
            Some(path) => TurntableConfig::load(path)?,
            None => TurntableConfig::default(),
        };
        if let Some(material) = self.material {
            config.material = material;
        }
        if self.shadows {
            config.render.shadows = true;
        }
        config.views = self.views.unwrap_or(config.views);
        config.resolution = self.resolution.unwrap_or(config.resolution);
        config.focal = self.focal.unwrap_or(config.focal);
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.resolve()?;
    let preset = Preset::from(config.material).with_overrides(&config.preset);
    tracing::info!(
        mesh = %cli.mesh_path.display(),
        material = ?config.material,
        views = config.views,
        resolution = config.resolution,
        shadows = config.render.shadows,
        "starting turntable"
    );

    let (mesh, _stats) = offrender_assets::load_obj(&cli.mesh_path)
        .with_context(|| format!("failed to load {}", cli.mesh_path.display()))?;
    let mut stage = Stage::new(
        mesh,
        preset.color.as_ref().map(std::slice::from_ref),
        &preset,
        config.resolution,
        config.focal,
    )
    .context("failed to build the stage")?;

    let mut renderer = WgpuOffscreenRenderer::from_env(
        WgpuBackend,
        config.resolution,
        config.resolution,
        config.render,
    )
    .context("failed to create the offscreen renderer")?;
    if let Some(id) = renderer.context_id() {
        tracing::debug!(context = %id, platform = %renderer.platform_kind(), "renderer ready");
    }

    let frames = turntable::run(&mut renderer, &mut stage, config.views, &cli.out_dir)?;
    println!("wrote {} frames to {}", frames.len(), cli.out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["turntable", "--mesh-path", "m.obj", "--out-dir", "out"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_config() {
        let config = parse(&[]).resolve().unwrap();
        assert_eq!(config, TurntableConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yaml");
        std::fs::write(&path, "views: 12\nresolution: 64\nmaterial: geo\n").unwrap();
        let path = path.to_string_lossy().into_owned();
        let config = parse(&["--config", &path, "--views", "8", "--shadows", "--material", "skin"])
            .resolve()
            .unwrap();
        assert_eq!(config.views, 8);
        assert_eq!(config.resolution, 64);
        assert_eq!(config.material, MaterialPreset::Skin);
        assert!(config.render.shadows);
    }

    #[test]
    fn material_none_and_color_alias() {
        assert_eq!(parse(&["--material", "none"]).material, Some(MaterialPreset::None));
        assert_eq!(parse(&["--material", "color"]).material, Some(MaterialPreset::None));
        let argv = ["turntable", "--mesh-path", "m", "--out-dir", "o", "--material", "chrome"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn zero_resolution_rejected() {
        assert!(parse(&["--resolution", "0"]).resolve().is_err());
    }
}
