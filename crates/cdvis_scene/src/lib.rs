//! # cdvis_scene - Transform Hierarchy
//!
//! The object graph every other system hangs off. Nodes live in an arena
//! and are addressed by generational [`NodeId`]s, so a destroyed node is
//! detected by any holder of its id instead of dangling.
//!
//! - [`SceneGraph`] - local TRS per node, lazily resolved world transforms
//! - [`Camera`] - view and projection derived from a node

pub mod camera;
pub mod graph;

pub use camera::*;
pub use graph::*;

pub mod prelude {
    pub use crate::camera::{Camera, CameraMatrices, Projection};
    pub use crate::graph::{Node, NodeId, SceneGraph};
    pub use cdvis_core::HandleError;
}
