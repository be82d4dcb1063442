use crate::{DirectionalLight, IntrinsicsCamera, Mesh, SceneError};
use glam::{Mat4, Vec3, Vec4};
use offrender_common::Rgba;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle to a node in a [`Scene`].
    pub struct NodeId;
}

/// What a node carries.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Mesh(Mesh),
    DirectionalLight(DirectionalLight),
    Camera(IntrinsicsCamera),
}

impl From<Mesh> for NodeContent {
    fn from(mesh: Mesh) -> Self {
        Self::Mesh(mesh)
    }
}

impl From<DirectionalLight> for NodeContent {
    fn from(light: DirectionalLight) -> Self {
        Self::DirectionalLight(light)
    }
}

impl From<IntrinsicsCamera> for NodeContent {
    fn from(camera: IntrinsicsCamera) -> Self {
        Self::Camera(camera)
    }
}

/// A posed piece of scene content. The pose maps node-local to world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub content: NodeContent,
    pub pose: Mat4,
}

/// Flat scene graph of meshes, lights, and cameras.
#[derive(Debug, Clone)]
pub struct Scene {
    pub ambient_light: Rgba,
    pub bg_color: Rgba,
    nodes: SlotMap<NodeId, Node>,
    main_camera: Option<NodeId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Vec4::ZERO)
    }
}

impl Scene {
    pub fn new(ambient_light: Rgba) -> Self {
        Self {
            ambient_light,
            bg_color: Vec4::ZERO,
            nodes: SlotMap::with_key(),
            main_camera: None,
        }
    }

    /// Add content at `pose`. The first camera added becomes the main camera.
    pub fn add(&mut self, content: impl Into<NodeContent>, pose: Mat4) -> NodeId {
        let content = content.into();
        let is_camera = matches!(content, NodeContent::Camera(_));
        let id = self.nodes.insert(Node { content, pose });
        if is_camera && self.main_camera.is_none() {
            self.main_camera = Some(id);
        }
        tracing::trace!(?id, nodes = self.nodes.len(), "node added");
        id
    }

    /// Remove a node, returning it. Removing the main camera promotes the
    /// next remaining camera, if any.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        if self.main_camera == Some(id) {
            self.main_camera = self
                .nodes
                .iter()
                .find(|(_, n)| matches!(n.content, NodeContent::Camera(_)))
                .map(|(id, _)| id);
        }
        Some(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn set_pose(&mut self, id: NodeId, pose: Mat4) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.pose = pose;
        Ok(())
    }

    pub fn set_main_camera(&mut self, id: NodeId) -> Result<(), SceneError> {
        match self.nodes.get(id) {
            None => Err(SceneError::NodeNotFound(id)),
            Some(Node {
                content: NodeContent::Camera(_),
                ..
            }) => {
                self.main_camera = Some(id);
                Ok(())
            }
            Some(_) => Err(SceneError::NotACamera(id)),
        }
    }

    /// Main camera and its pose.
    pub fn main_camera(&self) -> Option<(&IntrinsicsCamera, &Mat4)> {
        let node = self.nodes.get(self.main_camera?)?;
        match &node.content {
            NodeContent::Camera(cam) => Some((cam, &node.pose)),
            _ => None,
        }
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh, &Mat4)> {
        self.nodes.iter().filter_map(|(id, n)| match &n.content {
            NodeContent::Mesh(m) => Some((id, m, &n.pose)),
            _ => None,
        })
    }

    pub fn directional_lights(&self) -> impl Iterator<Item = (&DirectionalLight, &Mat4)> {
        self.nodes.values().filter_map(|n| match &n.content {
            NodeContent::DirectionalLight(l) => Some((l, &n.pose)),
            _ => None,
        })
    }

    /// World-space bounds of all mesh nodes.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.meshes()
            .filter_map(|(_, mesh, pose)| {
                let (lo, hi) = mesh.bounds()?;
                let corners = (0..8).map(|i| {
                    Vec3::new(
                        if i & 1 == 0 { lo.x } else { hi.x },
                        if i & 2 == 0 { lo.y } else { hi.y },
                        if i & 4 == 0 { lo.z } else { hi.z },
                    )
                });
                corners
                    .map(|c| pose.transform_point3(c))
                    .fold(None, |acc: Option<(Vec3, Vec3)>, p| match acc {
                        None => Some((p, p)),
                        Some((a, b)) => Some((a.min(p), b.max(p))),
                    })
            })
            .reduce(|(alo, ahi), (blo, bhi)| (alo.min(blo), ahi.max(bhi)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.main_camera = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriMesh;
    use offrender_common::location;

    fn unit_mesh() -> Mesh {
        let tri = TriMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
        )
        .unwrap();
        Mesh::from_trimesh(&tri, true, None)
    }

    #[test]
    fn first_camera_becomes_main() {
        let mut scene = Scene::default();
        assert!(scene.main_camera().is_none());
        let cam = IntrinsicsCamera::new(1.0, 1.0, 0.5, 0.5);
        let first = scene.add(cam, location(0.0, 0.0, 10.0));
        scene.add(cam, Mat4::IDENTITY);
        let (_, pose) = scene.main_camera().unwrap();
        assert_eq!(pose.w_axis.z, 10.0);

        scene.remove_node(first);
        let (_, pose) = scene.main_camera().unwrap();
        assert_eq!(*pose, Mat4::IDENTITY);
    }

    #[test]
    fn swap_mesh_node() {
        let mut scene = Scene::default();
        let a = scene.add(unit_mesh(), Mat4::IDENTITY);
        scene.add(DirectionalLight::default(), Mat4::IDENTITY);
        assert_eq!(scene.meshes().count(), 1);

        assert!(scene.remove_node(a).is_some());
        assert!(scene.remove_node(a).is_none());
        let b = scene.add(unit_mesh(), Mat4::IDENTITY);
        assert_ne!(a, b);
        assert_eq!(scene.meshes().count(), 1);
        assert_eq!(scene.directional_lights().count(), 1);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn set_main_camera_rejects_non_camera() {
        let mut scene = Scene::default();
        let light = scene.add(DirectionalLight::default(), Mat4::IDENTITY);
        assert!(matches!(
            scene.set_main_camera(light),
            Err(SceneError::NotACamera(_))
        ));
    }

    #[test]
    fn bounds_follow_pose() {
        let mut scene = Scene::default();
        assert!(scene.bounds().is_none());
        scene.add(unit_mesh(), location(2.0, 0.0, 0.0));
        let (lo, hi) = scene.bounds().unwrap();
        assert_eq!(lo, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(hi, Vec3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn clear_empties_scene() {
        let mut scene = Scene::default();
        scene.add(unit_mesh(), Mat4::IDENTITY);
        scene.add(IntrinsicsCamera::new(1.0, 1.0, 0.0, 0.0), Mat4::IDENTITY);
        scene.clear();
        assert!(scene.is_empty());
        assert!(scene.main_camera().is_none());
    }
}
