use crate::{DEFAULT_VERTEX_COLOR, SceneError, TriMesh};
use glam::{Vec3, Vec4};
use offrender_common::{Rgb, Rgba};

/// Metallic-roughness material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color_factor: Rgba,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    /// Draw the primitive as edge lines instead of filled triangles.
    pub wireframe: bool,
}

impl Material {
    pub fn metallic_roughness(metallic_factor: f32, roughness_factor: f32) -> Self {
        Self {
            metallic_factor,
            roughness_factor,
            ..Self::default()
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color_factor: Vec4::ONE,
            metallic_factor: 0.2,
            roughness_factor: 0.8,
            wireframe: false,
        }
    }
}

/// How a primitive's vertices are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Triangles,
    Points,
}

/// GPU-ready vertex streams plus a material.
///
/// `indices` is empty for [`PrimitiveMode::Points`].
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Rgba>,
    pub indices: Vec<[u32; 3]>,
    pub mode: PrimitiveMode,
    pub material: Material,
}

impl Primitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Unique undirected edges of the triangles, for wireframe drawing.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut edges: Vec<[u32; 2]> = self
            .indices
            .iter()
            .flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]])
            .map(|[a, b]| if a < b { [a, b] } else { [b, a] })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Centroid and unit normal of each triangle.
    pub fn face_centers_and_normals(&self) -> Vec<(Vec3, Vec3)> {
        self.indices
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|i| self.positions[i as usize]);
                ((a + b + c) / 3.0, (b - a).cross(c - a).normalize_or_zero())
            })
            .collect()
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
        )
    }
}

/// A renderable mesh: one or more primitives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

impl Mesh {
    /// Convert a triangle mesh into a single-primitive mesh.
    ///
    /// With `smooth` the vertices are shared and carry averaged normals.
    /// Otherwise every face gets its own three vertices and the face normal.
    pub fn from_trimesh(mesh: &TriMesh, smooth: bool, material: Option<Material>) -> Self {
        let material = material.unwrap_or_default();
        let primitive = if smooth {
            Primitive {
                positions: mesh.vertices.clone(),
                normals: mesh.vertex_normals(),
                colors: mesh.vertex_colors.iter().map(|c| c.extend(1.0)).collect(),
                indices: mesh.faces.clone(),
                mode: PrimitiveMode::Triangles,
                material,
            }
        } else {
            let face_normals = mesh.face_normals();
            let mut positions = Vec::with_capacity(mesh.faces.len() * 3);
            let mut normals = Vec::with_capacity(mesh.faces.len() * 3);
            let mut colors = Vec::with_capacity(mesh.faces.len() * 3);
            let mut indices = Vec::with_capacity(mesh.faces.len());
            for (face, n) in mesh.faces.iter().zip(face_normals) {
                let base = positions.len() as u32;
                for &i in face {
                    positions.push(mesh.vertices[i as usize]);
                    normals.push(n);
                    colors.push(mesh.vertex_colors[i as usize].extend(1.0));
                }
                indices.push([base, base + 1, base + 2]);
            }
            Primitive {
                positions,
                normals,
                colors,
                indices,
                mode: PrimitiveMode::Triangles,
                material,
            }
        };
        Self {
            name: None,
            primitives: vec![primitive],
        }
    }

    /// A point cloud.
    ///
    /// Colors follow [`TriMesh::assign_colors`]: one color is broadcast,
    /// otherwise there must be one per point. Without colors every point is
    /// drawn in the default gray.
    pub fn from_points(points: &[Vec3], colors: Option<&[Rgb]>) -> Result<Self, SceneError> {
        let colors: Vec<Rgba> = match colors {
            None => vec![Vec3::splat(DEFAULT_VERTEX_COLOR).extend(1.0); points.len()],
            Some([]) => return Err(SceneError::EmptyColors),
            Some([single]) => vec![single.extend(1.0); points.len()],
            Some(many) if many.len() == points.len() => {
                many.iter().map(|c| c.extend(1.0)).collect()
            }
            Some(many) => {
                return Err(SceneError::ColorCountMismatch {
                    colors: many.len(),
                    vertices: points.len(),
                });
            }
        };
        Ok(Self {
            name: None,
            primitives: vec![Primitive {
                positions: points.to_vec(),
                normals: vec![Vec3::ZERO; points.len()],
                colors,
                indices: Vec::new(),
                mode: PrimitiveMode::Points,
                material: Material::default(),
            }],
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bounds over all primitives in mesh-local space.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.primitives
            .iter()
            .filter_map(Primitive::bounds)
            .reduce(|(alo, ahi), (blo, bhi)| (alo.min(blo), ahi.max(bhi)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriMesh {
        TriMesh::new(
            vec![
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ],
            vec![[0, 1, 2], [2, 1, 3]],
        )
        .unwrap()
    }

    #[test]
    fn smooth_shares_vertices() {
        let mesh = Mesh::from_trimesh(&quad(), true, None);
        let prim = &mesh.primitives[0];
        assert_eq!(prim.vertex_count(), 4);
        assert_eq!(prim.indices.len(), 2);
        assert_eq!(prim.material, Material::default());
    }

    #[test]
    fn flat_splits_faces() {
        let mesh = Mesh::from_trimesh(&quad(), false, None);
        let prim = &mesh.primitives[0];
        assert_eq!(prim.vertex_count(), 6);
        assert_eq!(prim.indices, vec![[0, 1, 2], [3, 4, 5]]);
        assert!(prim.normals.iter().all(|n| *n == Vec3::Y));
    }

    #[test]
    fn edges_are_unique() {
        let mesh = Mesh::from_trimesh(&quad(), true, None);
        // Two triangles sharing one diagonal.
        assert_eq!(mesh.primitives[0].edges().len(), 5);
    }

    #[test]
    fn face_centers() {
        let mesh = Mesh::from_trimesh(&quad(), true, None);
        let faces = mesh.primitives[0].face_centers_and_normals();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].1, Vec3::Y);
    }

    #[test]
    fn material_passthrough() {
        let mat = Material::metallic_roughness(0.0, 1.0);
        let mesh = Mesh::from_trimesh(&quad(), true, Some(mat));
        assert_eq!(mesh.primitives[0].material.metallic_factor, 0.0);
        assert_eq!(mesh.primitives[0].material.base_color_factor, Vec4::ONE);
    }

    #[test]
    fn point_cloud_defaults() {
        let mesh = Mesh::from_points(&[Vec3::ZERO, Vec3::ONE], None)
            .unwrap()
            .with_name("pts");
        let prim = &mesh.primitives[0];
        assert_eq!(prim.mode, PrimitiveMode::Points);
        assert!(prim.indices.is_empty());
        assert_eq!(mesh.bounds(), Some((Vec3::ZERO, Vec3::ONE)));
        assert_eq!(mesh.name.as_deref(), Some("pts"));
        assert_eq!(prim.colors[1], Vec4::new(0.8, 0.8, 0.8, 1.0));
    }

    #[test]
    fn point_colors_follow_vertex_color_rules() {
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mesh = Mesh::from_points(&points, Some(&[Vec3::X])).unwrap();
        assert!(mesh.primitives[0].colors.iter().all(|c| *c == Vec4::new(1.0, 0.0, 0.0, 1.0)));

        let per_point = [Vec3::X, Vec3::Y, Vec3::Z];
        let mesh = Mesh::from_points(&points, Some(&per_point)).unwrap();
        assert_eq!(mesh.primitives[0].colors[2], Vec4::new(0.0, 0.0, 1.0, 1.0));

        let err = Mesh::from_points(&points, Some(&[Vec3::X, Vec3::Y])).unwrap_err();
        assert!(matches!(
            err,
            SceneError::ColorCountMismatch { colors: 2, vertices: 3 }
        ));
    }
}
