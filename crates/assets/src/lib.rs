//! Mesh import.
//!
//! OBJ parsing is delegated to `tobj`. All objects and groups in a file are
//! merged into one [`TriMesh`], and vertices that several groups share are
//! welded back into one vertex (same position and color). Vertices appear
//! in the order faces first reference them. `v` lines no face references
//! are dropped, so they count toward neither the vertex total nor the
//! bounds.
//!
//! Vertex colors are read from the `v x y z r g b` extension. Objects
//! without colors fall back to [`DEFAULT_VERTEX_COLOR`].

use glam::Vec3;
use offrender_scene::{DEFAULT_VERTEX_COLOR, SceneError, TriMesh};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Errors from mesh import.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ parse error: {0}")]
    Parse(#[from] tobj::LoadError),
    #[error("no geometry in {0}")]
    NoGeometry(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Summary of an imported mesh, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub objects: usize,
    pub vertices: usize,
    pub faces: usize,
    pub has_vertex_colors: bool,
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load an OBJ file into a triangle mesh.
pub fn load_obj(path: impl AsRef<Path>) -> Result<(TriMesh, ImportStats), AssetError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AssetError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("mesh file not found: {}", path.display()),
        )));
    }
    // Materials are irrelevant here; a missing .mtl only fails the second half.
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    let (mesh, stats) = merge_models(&models, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        vertices = stats.vertices,
        faces = stats.faces,
        colors = stats.has_vertex_colors,
        "mesh loaded"
    );
    Ok((mesh, stats))
}

/// Parse OBJ text from a reader. `mtllib` statements are ignored.
pub fn parse_obj(reader: &mut impl BufRead) -> Result<(TriMesh, ImportStats), AssetError> {
    let (models, _materials) =
        tobj::load_obj_buf(reader, &load_options(), |_| Ok(Default::default()))?;
    merge_models(&models, "<buffer>")
}

/// Bit pattern of a position and color; `-0.0` is folded into `0.0`.
type WeldKey = ([u32; 3], [u32; 3]);

fn weld_key(position: Vec3, color: Vec3) -> WeldKey {
    let bits = |v: Vec3| (v + Vec3::ZERO).to_array().map(f32::to_bits);
    (bits(position), bits(color))
}

fn merge_models(models: &[tobj::Model], source: &str) -> Result<(TriMesh, ImportStats), AssetError> {
    let mut vertices = Vec::new();
    let mut colors = Vec::new();
    let mut faces = Vec::new();
    let mut has_vertex_colors = false;
    let mut welded: HashMap<WeldKey, u32> = HashMap::new();

    for model in models {
        let m = &model.mesh;
        let count = m.positions.len() / 3;
        let model_colors = m.vertex_color.len() == m.positions.len() && count > 0;
        has_vertex_colors |= model_colors;

        let remap: Vec<u32> = (0..count)
            .map(|i| {
                let position = Vec3::from_slice(&m.positions[i * 3..i * 3 + 3]);
                let color = if model_colors {
                    Vec3::from_slice(&m.vertex_color[i * 3..i * 3 + 3])
                } else {
                    Vec3::splat(DEFAULT_VERTEX_COLOR)
                };
                *welded.entry(weld_key(position, color)).or_insert_with(|| {
                    vertices.push(position);
                    colors.push(color);
                    (vertices.len() - 1) as u32
                })
            })
            .collect();

        for f in m.indices.chunks_exact(3) {
            let face = faces.len();
            let corner = |k: usize| {
                remap
                    .get(f[k] as usize)
                    .copied()
                    .ok_or(SceneError::FaceIndexOutOfRange {
                        face,
                        index: f[k],
                        vertices: count,
                    })
            };
            faces.push([corner(0)?, corner(1)?, corner(2)?]);
        }
        tracing::debug!(name = %model.name, vertices = count, "merged OBJ object");
    }

    if vertices.is_empty() {
        return Err(AssetError::NoGeometry(source.to_string()));
    }

    let stats = ImportStats {
        objects: models.len(),
        vertices: vertices.len(),
        faces: faces.len(),
        has_vertex_colors,
    };
    let mesh = TriMesh::new(vertices, faces)?.with_colors(&colors)?;
    Ok((mesh, stats))
}

pub fn crate_info() -> &'static str {
    "offrender-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const CUBE_CORNER: &str = "\
o corner
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 3 2
f 1 2 4
f 1 4 3
f 2 3 4
";

    const COLORED_QUAD: &str = "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 1 1 0 0 0 1
v 0 1 0 1 1 1
f 1 2 3 4
";

    #[test]
    fn parse_plain_obj() {
        let (mesh, stats) = parse_obj(&mut Cursor::new(CUBE_CORNER)).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 4);
        assert!(!stats.has_vertex_colors);
        assert!(mesh.vertex_colors.iter().all(|c| *c == Vec3::splat(0.8)));
    }

    #[test]
    fn parse_colored_quad_triangulates() {
        let (mesh, stats) = parse_obj(&mut Cursor::new(COLORED_QUAD)).unwrap();
        assert!(stats.has_vertex_colors);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_colors[0], Vec3::X);
        assert_eq!(mesh.vertex_colors[2], Vec3::Z);
    }

    const SPLIT_QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 -5 0
g left
f 1 2 3
g right
f 1 3 4
";

    #[test]
    fn groups_sharing_an_edge_share_vertices() {
        let (mut mesh, stats) = parse_obj(&mut Cursor::new(SPLIT_QUAD)).unwrap();
        assert_eq!(stats.objects, 2);
        assert_eq!(stats.vertices, 4);
        assert_eq!(mesh.face_count(), 2);
        let (a, b) = (mesh.faces[0], mesh.faces[1]);
        assert_eq!(a[0], b[0]);
        assert_eq!(a[2], b[1]);
        // the unreferenced vertex at y = -5 is not part of the mesh
        assert_eq!(mesh.min_y(), Some(0.0));
        let colors = [Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE];
        mesh.assign_colors(&colors).unwrap();
    }

    #[test]
    fn differently_colored_twins_stay_apart() {
        let obj = "\
v 0 0 0 1 0 0
v 1 0 0 1 0 0
v 0 1 0 1 0 0
g red
f 1 2 3
g blue
v 0 0 0 0 0 1
v 1 0 0 0 0 1
v 0 1 0 0 0 1
f 4 6 5
";
        let (mesh, stats) = parse_obj(&mut Cursor::new(obj)).unwrap();
        assert_eq!(stats.vertices, 6);
        assert_eq!(mesh.vertex_colors[3], Vec3::Z);
    }

    #[test]
    fn empty_obj_has_no_geometry() {
        let err = parse_obj(&mut Cursor::new("# nothing\n")).unwrap_err();
        assert!(matches!(err, AssetError::NoGeometry(_)));
    }

    #[test]
    fn load_from_file() {
        let mut tmp = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        tmp.write_all(CUBE_CORNER.as_bytes()).unwrap();
        tmp.flush().unwrap();
        let (mesh, stats) = load_obj(tmp.path()).unwrap();
        assert_eq!(stats.objects, 1);
        assert_eq!(mesh.min_y(), Some(0.0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_obj("/definitely/not/here.obj").unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
