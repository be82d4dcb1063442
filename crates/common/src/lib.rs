//! Shared types and pose helpers used across the offrender crates.

pub mod pose;
pub mod types;

pub use pose::{location, rotate_points, rotation_x, rotation_y};
pub use types::{ContextId, Rgb, Rgba};

pub fn crate_info() -> &'static str {
    "offrender-common v0.1.0"
}
