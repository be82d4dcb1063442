use crate::SceneError;
use glam::Vec3;
use offrender_common::{Rgb, rotate_points, rotation_y};

/// Gray applied to every vertex when a mesh carries no colors of its own.
pub const DEFAULT_VERTEX_COLOR: f32 = 0.8;

/// Indexed triangle mesh with one color per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct TriMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub vertex_colors: Vec<Rgb>,
}

impl TriMesh {
    /// Build a mesh, validating face indices. Vertices start out gray.
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Result<Self, SceneError> {
        for (face, tri) in faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(SceneError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertices: vertices.len(),
                });
            }
        }
        let vertex_colors = vec![Vec3::splat(DEFAULT_VERTEX_COLOR); vertices.len()];
        Ok(Self {
            vertices,
            faces,
            vertex_colors,
        })
    }

    /// Builder form of [`TriMesh::assign_colors`].
    pub fn with_colors(mut self, colors: &[Rgb]) -> Result<Self, SceneError> {
        self.assign_colors(colors)?;
        Ok(self)
    }

    /// Replace the vertex colors.
    ///
    /// A single color is broadcast to every vertex. Otherwise the number of
    /// colors must equal the number of vertices.
    pub fn assign_colors(&mut self, colors: &[Rgb]) -> Result<(), SceneError> {
        match colors {
            [] => Err(SceneError::EmptyColors),
            [single] => {
                self.vertex_colors = vec![*single; self.vertices.len()];
                Ok(())
            }
            many if many.len() == self.vertices.len() => {
                self.vertex_colors = many.to_vec();
                Ok(())
            }
            many => Err(SceneError::ColorCountMismatch {
                colors: many.len(),
                vertices: self.vertices.len(),
            }),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Rotate every vertex about the vertical axis through the origin.
    pub fn rotate_y(&mut self, degrees: f32) {
        rotate_points(&mut self.vertices, &rotation_y(degrees));
    }

    /// Smallest Y coordinate, or `None` for an empty mesh.
    pub fn min_y(&self) -> Option<f32> {
        self.vertices.iter().map(|v| v.y).reduce(f32::min)
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
        )
    }

    /// Unit normal of each face. Degenerate faces get a zero normal.
    pub fn face_normals(&self) -> Vec<Vec3> {
        self.faces
            .iter()
            .map(|f| self.face_cross(f).normalize_or_zero())
            .collect()
    }

    /// Area-weighted average of the adjacent face normals at each vertex.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for f in &self.faces {
            let n = self.face_cross(f);
            for &i in f {
                normals[i as usize] += n;
            }
        }
        normals.iter().map(|n| n.normalize_or_zero()).collect()
    }

    fn face_cross(&self, f: &[u32; 3]) -> Vec3 {
        let a = self.vertices[f[0] as usize];
        let b = self.vertices[f[1] as usize];
        let c = self.vertices[f[2] as usize];
        (b - a).cross(c - a)
    }
}
