// Synchronization primitives
//
// Semaphores order GPU work (acquire -> render -> present), fences let the
// CPU know when a slot's command buffer may be recorded again.

use super::error::{GfxError, GfxResult};
use super::gpu::GpuDevice;
use ash::vk;
use std::time::Duration;

/// The two semaphores of the frame protocol, shared by every frame slot
#[derive(Debug, Default, Clone, Copy)]
pub struct SemaphorePair {
    /// Signaled by acquire, waited on by the submit
    pub image_acquired: vk::Semaphore,
    /// Signaled by the submit, waited on by present
    pub render_finished: vk::Semaphore,
}

impl SemaphorePair {
    pub fn new(device: &dyn GpuDevice) -> GfxResult<Self> {
        let image_acquired = device
            .create_semaphore()
            .map_err(GfxError::vulkan("vkCreateSemaphore"))?;

        let render_finished = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(image_acquired);
                return Err(GfxError::vulkan("vkCreateSemaphore")(e));
            }
        };

        Ok(Self {
            image_acquired,
            render_finished,
        })
    }

    pub fn destroy(&self, device: &dyn GpuDevice) {
        for semaphore in [self.image_acquired, self.render_finished] {
            if semaphore != vk::Semaphore::null() {
                device.destroy_semaphore(semaphore);
            }
        }
    }
}

/// Block until `fence` is signaled. Running out of time is fatal.
pub fn wait_for_fence(
    device: &dyn GpuDevice,
    fence: vk::Fence,
    slot: usize,
    timeout_ns: u64,
) -> GfxResult<()> {
    match device.wait_for_fence(fence, timeout_ns) {
        Ok(()) => Ok(()),
        Err(vk::Result::TIMEOUT) => Err(GfxError::FenceTimeout {
            slot,
            timeout: Duration::from_nanos(timeout_ns),
        }),
        Err(e) => Err(GfxError::vulkan("vkWaitForFences")(e)),
    }
}
