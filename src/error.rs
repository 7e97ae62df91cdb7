//! Error types for the editor
//!
//! Only startup and resource failures surface as errors. Per-frame work such
//! as picking readback or collision degrades to a safe default instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no compatible graphics adapter found")]
    AdapterNotFound(#[from] wgpu::RequestAdapterError),

    #[error("failed to request a graphics device")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create the window surface")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("surface reports no supported texture formats")]
    SurfaceUnsupported,

    #[error("cannot read texture directory {path:?}")]
    TextureDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture {path:?}")]
    TextureDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture '{label}' has {actual} bytes, expected {expected}")]
    TextureSize {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("failed to build render pipelines: {0}")]
    Pipeline(String),

    #[error("failed to create the window")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub type Result<T> = std::result::Result<T, EditorError>;
