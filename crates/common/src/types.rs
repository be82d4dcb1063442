use glam::{Vec3, Vec4};
use uuid::Uuid;

/// Linear RGB color with components in `[0, 1]`.
pub type Rgb = Vec3;

/// Linear RGBA color with components in `[0, 1]`.
pub type Rgba = Vec4;

/// Unique identity of a live graphics context.
///
/// A fresh id is minted every time a platform context is created, so a
/// teardown-and-recreate cycle is observable by comparing ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.8}", self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_id_uniqueness() {
        let a = ContextId::new();
        let b = ContextId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn context_id_display_is_short() {
        let id = ContextId::new();
        assert_eq!(id.to_string().len(), 8);
    }
}
