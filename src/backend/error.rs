// Error types for the Vulkan layer
//
// Nothing here is recovered from locally: every error ends the frame loop.
// The variants exist so callers and tests can tell the failures apart.

use ash::vk;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Which stage of the program a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Device, surface, swapchain, shader or pipeline setup failed
    Initialization,
    /// Acquire, fence wait, submit or present failed mid-loop
    Frame,
    /// The validation layer reported a message
    Diagnostic,
}

#[derive(Debug, Error)]
pub enum GfxError {
    #[error("Failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("{call} failed: {result:?}")]
    Vulkan {
        call: &'static str,
        result: vk::Result,
    },

    #[error("Validation layer {0} is not installed")]
    MissingLayer(String),

    #[error("No Vulkan-capable GPU found")]
    NoPhysicalDevice,

    #[error("Physical device has no graphics queue family")]
    NoGraphicsQueue,

    #[error("Queue family {0} cannot present to the window surface")]
    PresentationUnsupported(u32),

    #[error("Surface reports no supported {0}")]
    SurfaceUnsupported(&'static str),

    #[error("Window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("Unsupported window system: {0}")]
    UnsupportedPlatform(String),

    #[error("Shader binary not found at {path:?} (shaders compiled, correct working dir?)")]
    ShaderNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Shader binary at {path:?} is not valid SPIR-V")]
    InvalidShader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Acquired image index {index} is outside the {count} frame slots")]
    ImageIndexOutOfRange { index: u32, count: usize },

    #[error("Fence of frame slot {slot} not signaled within {timeout:?}")]
    FenceTimeout { slot: usize, timeout: Duration },

    #[error("Swapchain is out of date")]
    SwapchainOutOfDate,

    #[error("Swapchain is suboptimal for the surface")]
    SwapchainSuboptimal,

    #[error("Validation layer reported {} message(s): {}", .0.len(), .0.join(" | "))]
    Validation(Vec<String>),
}

impl GfxError {
    /// Wrap a raw Vulkan result with the name of the failing call
    pub fn vulkan(call: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Vulkan { call, result }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Diagnostic,
            Self::FenceTimeout { .. }
            | Self::SwapchainOutOfDate
            | Self::SwapchainSuboptimal
            | Self::ImageIndexOutOfRange { .. } => FailureKind::Frame,
            Self::Vulkan { call, .. } if is_frame_call(call) => FailureKind::Frame,
            _ => FailureKind::Initialization,
        }
    }
}

fn is_frame_call(call: &str) -> bool {
    matches!(
        call,
        "vkAcquireNextImageKHR"
            | "vkWaitForFences"
            | "vkResetFences"
            | "vkResetCommandBuffer"
            | "vkBeginCommandBuffer"
            | "vkEndCommandBuffer"
            | "vkQueueSubmit"
            | "vkQueuePresentKHR"
    )
}

pub type GfxResult<T> = std::result::Result<T, GfxError>;
