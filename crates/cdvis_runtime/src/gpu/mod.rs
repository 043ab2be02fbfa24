//! GPU side of the viewer: window surface and the wgpu render backend

pub mod backend;
pub mod presenter;

pub use backend::WgpuBackend;
pub use presenter::DesktopPresenter;
