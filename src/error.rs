use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to load texture {path:?}: {reason}")]
    Texture { path: PathBuf, reason: String },

    #[error("effect has no pass named `{0}`")]
    UnknownPass(String),

    #[error("effect has no variable named `{0}`")]
    UnknownVariable(String),

    #[error("variable `{name}` expects {expected} bytes, got {actual}")]
    VariableSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("effect has no resource slot named `{0}`")]
    UnknownResource(String),

    #[error("resource slot `{0}` has nothing bound")]
    UnboundResource(String),

    #[error("invalid effect layout: {0}")]
    InvalidLayout(String),

    #[error("unknown sample `{0}`")]
    UnknownSample(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
