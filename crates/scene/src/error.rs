use crate::NodeId;

/// Errors from building or mutating scene content.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("color count mismatch: {colors} colors for {vertices} vertices")]
    ColorCountMismatch { colors: usize, vertices: usize },
    #[error("no colors supplied")]
    EmptyColors,
    #[error("face {face} references vertex {index}, but the mesh has {vertices} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        vertices: usize,
    },
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("node {0:?} is not a camera")]
    NotACamera(NodeId),
}
