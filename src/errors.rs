// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the preview pipeline
//!
//! Each subsystem owns a small error enum; [`AppError`] wraps them for the
//! binary and for callers that cross subsystem boundaries.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Frame source / capture subsystem errors
    Capture(CaptureError),
    /// GPU renderer errors
    Render(RenderError),
    /// Snapshot delivery or persistence errors
    Snapshot(SnapshotError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Frame source and capture loop errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No source exists for the requested camera facing
    DeviceNotFound(String),
    /// Device is busy or access was denied
    Unavailable(String),
    /// Source produced data that cannot be interpreted
    InvalidFrame(String),
    /// Source stopped delivering frames
    Disconnected,
    /// General I/O error while reading from the source
    Io(String),
}

/// Frame transform failures
///
/// Any of these causes the frame to be dropped; none is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Input buffer is shorter than `row_stride * height`
    InputTooShort { expected: usize, actual: usize },
    /// Row stride is smaller than the frame width
    InvalidStride { width: u32, row_stride: u32 },
    /// Output is not `width * height * 4` bytes
    OutputSizeMismatch { expected: usize, actual: usize },
    /// Zero-sized frame
    EmptyFrame,
    /// Transform specific failure
    Failed(String),
}

/// GPU renderer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No adapter or device could be created
    NoDevice(String),
    /// Shader module or pipeline failed validation; fatal for the session
    ShaderLink(String),
    /// Operation requires an initialized surface
    SurfaceNotReady,
    /// Render thread could not be started or exited early
    HostFailed(String),
}

/// Snapshot errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Request was superseded by a later one or the session shut down
    Cancelled,
    /// Nothing was drawn on the cycle that serviced the request
    NothingDrawn,
    /// Read-back buffer could not be mapped
    ReadbackFailed(String),
    /// Image could not be encoded or written
    SaveFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            CaptureError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CaptureError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            CaptureError::Disconnected => write!(f, "Frame source disconnected"),
            CaptureError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::InputTooShort { expected, actual } => {
                write!(f, "Input too short: expected {} bytes, got {}", expected, actual)
            }
            TransformError::InvalidStride { width, row_stride } => {
                write!(f, "Row stride {} is smaller than width {}", row_stride, width)
            }
            TransformError::OutputSizeMismatch { expected, actual } => {
                write!(f, "Output size mismatch: expected {} bytes, got {}", expected, actual)
            }
            TransformError::EmptyFrame => write!(f, "Frame has zero width or height"),
            TransformError::Failed(msg) => write!(f, "Transform failed: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NoDevice(msg) => write!(f, "No GPU device: {}", msg),
            RenderError::ShaderLink(msg) => write!(f, "Shader program failed to link: {}", msg),
            RenderError::SurfaceNotReady => write!(f, "Surface not ready"),
            RenderError::HostFailed(msg) => write!(f, "Render host failed: {}", msg),
        }
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Cancelled => write!(f, "Snapshot request was cancelled"),
            SnapshotError::NothingDrawn => write!(f, "No frame drawn yet"),
            SnapshotError::ReadbackFailed(msg) => write!(f, "Read-back failed: {}", msg),
            SnapshotError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for TransformError {}
impl std::error::Error for RenderError {}
impl std::error::Error for SnapshotError {}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        AppError::Snapshot(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err.to_string())
    }
}

impl From<image::ImageError> for SnapshotError {
    fn from(err: image::ImageError) -> Self {
        SnapshotError::SaveFailed(err.to_string())
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::SaveFailed(err.to_string())
    }
}
