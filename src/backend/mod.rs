// Backend module - Vulkan abstraction layer
//
// Thin owning wrappers around ash. Each wrapper releases its objects on drop,
// talks to the GPU only through `GpuDevice`, and reports failures as `GfxError`.

pub mod device;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
pub(crate) mod mock;

pub use device::VulkanDevice;
pub use error::{GfxError, GfxResult};
pub use frame::{FrameResources, FrameSlot};
pub use gpu::GpuDevice;
pub use pipeline::{RenderPass, TrianglePipeline};
pub use shader::ShaderBinaries;
pub use surface::SurfaceBinding;
pub use swapchain::Swapchain;
