use crate::stage::Stage;
use anyhow::Context;
use offrender_render::{ColorImage, GraphicsBackend, OffscreenRenderer, RenderFlags};
use std::path::{Path, PathBuf};

/// File name of the `view`-th frame.
pub fn frame_path(out_dir: &Path, view: u32) -> PathBuf {
    out_dir.join(format!("frame_{view:03}.png"))
}

/// Write an RGB or RGBA frame as PNG.
pub fn save_frame(color: &ColorImage, path: &Path) -> anyhow::Result<()> {
    let color_type = match color.channels {
        3 => image::ColorType::Rgb8,
        4 => image::ColorType::Rgba8,
        n => anyhow::bail!("unsupported channel count {n}"),
    };
    image::save_buffer(path, &color.data, color.width, color.height, color_type)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Render `views` frames while the subject turns a full circle about +Y.
///
/// Each step rotates the subject and rebuilds its mesh, renders, then swaps
/// the rebuilt mesh in, so frame `k` shows the rotation of step `k - 1` and
/// frame 0 is unrotated. The renderer is released and the scene cleared
/// once all frames are written.
pub fn run<B: GraphicsBackend>(
    renderer: &mut OffscreenRenderer<B>,
    stage: &mut Stage,
    views: u32,
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    if views == 0 {
        anyhow::bail!("views must be at least 1");
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let angle = 360.0 / views as f32;
    let mut frames = Vec::with_capacity(views as usize);
    for view in 0..views {
        let next = stage.rotate_subject(angle);
        let output = renderer
            .render(&stage.scene, RenderFlags::NONE)
            .with_context(|| format!("failed to render view {view}"))?;
        stage.swap_subject(next);

        let color = output
            .color()
            .context("renderer returned no color buffer")?;
        let path = frame_path(out_dir, view);
        save_frame(color, &path)?;
        tracing::debug!(view, path = %path.display(), "frame written");
        frames.push(path);
    }

    renderer.delete().context("failed to release renderer")?;
    stage.scene.clear();
    tracing::info!(frames = frames.len(), out_dir = %out_dir.display(), "turntable done");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::Preset;
    use glam::{Vec3, Vec4};
    use offrender_render::debug::DebugBackend;
    use offrender_render::{PlatformKind, RenderOptions};
    use offrender_scene::TriMesh;

    fn quad() -> TriMesh {
        TriMesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn frame_names_are_zero_padded() {
        let p = frame_path(Path::new("out"), 7);
        assert_eq!(p, Path::new("out").join("frame_007.png"));
    }

    #[test]
    fn writes_one_png_per_view() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("frames");
        let mut stage = Stage::new(quad(), None, &Preset::color(), 16, 20.0).unwrap();
        stage.scene.bg_color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let backend = DebugBackend::new(true);
        let log = backend.shared_log();
        let mut renderer =
            OffscreenRenderer::new(backend, PlatformKind::OsMesa, 16, 16, RenderOptions::default())
                .unwrap();

        let frames = run(&mut renderer, &mut stage, 4, &out_dir).unwrap();
        assert_eq!(frames.len(), 4);
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(f, &frame_path(&out_dir, i as u32));
            assert!(f.is_file());
        }
        let img = image::open(&frames[0]).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0]);

        let log = log.borrow();
        assert_eq!(log.flags.len(), 4);
        assert_eq!(log.last_mesh_count, 2);
        assert_eq!(log.events.last(), Some(&"delete_context"));
        assert!(!renderer.is_live());
        assert!(stage.scene.is_empty());
    }

    #[test]
    fn full_turn_returns_subject_home() {
        let dir = tempfile::tempdir().unwrap();
        let original = quad().vertices;
        let mut stage = Stage::new(quad(), None, &Preset::geo(), 8, 10.0).unwrap();
        let mut renderer = OffscreenRenderer::new(
            DebugBackend::new(false),
            PlatformKind::OsMesa,
            8,
            8,
            RenderOptions::default(),
        )
        .unwrap();
        run(&mut renderer, &mut stage, 60, dir.path()).unwrap();
        for (a, b) in stage.subject().vertices.iter().zip(&original) {
            assert!((*a - *b).length() < 1e-4);
        }
    }

    #[test]
    fn zero_views_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = Stage::new(quad(), None, &Preset::geo(), 8, 10.0).unwrap();
        let mut renderer = OffscreenRenderer::new(
            DebugBackend::new(true),
            PlatformKind::HiddenWindow,
            8,
            8,
            RenderOptions::default(),
        )
        .unwrap();
        assert!(run(&mut renderer, &mut stage, 0, dir.path()).is_err());
    }

    #[test]
    fn rgba_frames_keep_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        let color = ColorImage::from_rgba8(1, 1, &[10, 20, 30, 40], true);
        save_frame(&color, &path).unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 40]);
    }
}
