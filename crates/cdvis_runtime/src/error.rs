//! Errors surfaced by the viewer binary

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] cdvis_render::RenderError),

    #[error("Shader error: {0}")]
    Shader(#[from] cdvis_shader::ShaderError),

    #[error("Volume load failed: {0}")]
    Load(#[from] cdvis_dicom::LoadError),

    #[error("XR error: {0}")]
    Xr(#[from] cdvis_xr::XrError),

    #[error("Scene node error: {0}")]
    Node(#[from] cdvis_core::HandleError),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Failed to start thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Args(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
