//! # cdvis_xr - Controllers and Interaction
//!
//! Tracked devices and what they do to the scene:
//! - [`XrSystem`] polls an [`XrBackend`] once per frame and mirrors every
//!   device onto a scene node, converting runtime poses to left-handed
//! - [`InteractionEngine`] runs hover, activate and drag against the
//!   [`Interactable`]s handed to it
//! - [`Dial`], [`PieMenu`] and [`Tool`] are the controller widgets
//!
//! ## Frame order
//!
//! ```ignore
//! xr.begin_frame(&mut graph, rig)?;
//! engine.update(&mut graph, xr.devices_mut(), &mut interactables)?;
//! xr.end_frame()?; // flushes haptic pulses
//! ```
//!
//! No OpenXR runtime is bundled; [`SimulatedXrBackend`] replays scripted
//! device frames.

pub mod backend;
pub mod device;
pub mod dial;
pub mod interaction;
pub mod pie_menu;
pub mod system;
pub mod tools;

pub use backend::*;
pub use device::*;
pub use dial::*;
pub use interaction::*;
pub use pie_menu::*;
pub use system::*;
pub use tools::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XrError {
    #[error("XR not initialized")]
    NotInitialized,

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Scene node error: {0}")]
    Node(#[from] cdvis_core::HandleError),
}

pub type Result<T> = std::result::Result<T, XrError>;

pub mod prelude {
    pub use crate::backend::{DeviceInput, Eye, SessionState, SimulatedXrBackend, View, XrBackend};
    pub use crate::device::{Buttons, DeviceRole, TrackedDevice};
    pub use crate::dial::Dial;
    pub use crate::interaction::{
        Interactable, InteractionConfig, InteractionEngine, InteractionEvent, InteractionKind,
    };
    pub use crate::pie_menu::PieMenu;
    pub use crate::system::XrSystem;
    pub use crate::tools::{clip_plane, Tool};
    pub use crate::{Result, XrError};
}
