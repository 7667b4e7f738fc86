//! Error types for the attachment registry, pass DAG, analyzer, resolver and builder.

use thiserror::Error;

use super::pass::PassId;

/// Errors produced by the render graph (§7 of the design).
#[derive(Error, Debug)]
pub enum GraphError {
    /// The device or host ran out of memory servicing a request.
    #[error("out of memory")]
    OutOfMemory,

    /// The requested image format is not supported by the device.
    #[error("format unsupported")]
    FormatUnsupported,

    /// A window attachment is already held by another renderer's swap-lock.
    #[error("window is already attached elsewhere")]
    WindowBusy,

    /// The fixed-point size resolution loop could not resolve every attachment.
    #[error("attachment size could not be resolved")]
    UnresolvedSize,

    /// A parent pass violated renderer-ownership or async/non-async mixing rules.
    #[error("invalid parent: {0}")]
    InvalidParent(String),

    /// A native render-pass, view, or framebuffer object failed to build.
    #[error("build failed for pass {pass:?}: {reason}")]
    BuildFailed {
        /// The pass whose chain failed to build.
        pass: PassId,
        /// Human-readable failure reason.
        reason: String,
    },

    /// An unrecoverable error; subsequent operations on the renderer are no-ops.
    #[error("fatal: {0}")]
    Fatal(String),

    /// A raw Vulkan API call failed.
    #[error("vulkan error: {0:?}")]
    Api(ash::vk::Result),
}

impl From<ash::vk::Result> for GraphError {
    fn from(value: ash::vk::Result) -> Self {
        Self::Api(value)
    }
}

/// Result alias used throughout the render graph.
pub type GraphResult<T> = Result<T, GraphError>;
