//! Error types for the transfer engine (spec §7).

use thiserror::Error;

/// Errors produced by transfer pool claim/recycle and copy submission.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The device or host ran out of memory servicing a staging allocation.
    #[error("out of memory")]
    OutOfMemory,

    /// Command buffer submission failed.
    #[error("submit failed")]
    SubmitFailed,

    /// An unrecoverable error; the pool is rolled back and left clean.
    #[error("fatal: {0}")]
    Fatal(String),

    /// A raw Vulkan API call failed.
    #[error("vulkan error: {0:?}")]
    Api(ash::vk::Result),
}

impl From<ash::vk::Result> for TransferError {
    fn from(value: ash::vk::Result) -> Self {
        Self::Api(value)
    }
}

impl From<crate::graph::GraphError> for TransferError {
    fn from(value: crate::graph::GraphError) -> Self {
        match value {
            crate::graph::GraphError::OutOfMemory => Self::OutOfMemory,
            crate::graph::GraphError::Api(e) => Self::Api(e),
            other => Self::Fatal(other.to_string()),
        }
    }
}

/// Result alias used throughout the transfer engine.
pub type TransferResult<T> = Result<T, TransferError>;
