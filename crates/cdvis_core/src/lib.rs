//! # cdvis_core - CDVis Core
//!
//! Zero-dependency primitives shared by every CDVis crate:
//! - generational [`Handle`]s that detect use-after-free
//! - a slot [`Arena`] that stores values behind those handles
//! - [`HandleError`] for failed lookups
//!
//! Scene nodes, GPU resources and interaction targets are all addressed
//! through handles. A handle whose slot was freed is "expired" and every
//! lookup through it fails cleanly instead of aliasing a new value.

pub mod arena;
pub mod error;
pub mod handle;

pub use arena::*;
pub use error::*;
pub use handle::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::arena::Arena;
    pub use crate::error::HandleError;
    pub use crate::handle::{Handle, HandleAllocator};
}
