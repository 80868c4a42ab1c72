// Buffered frame resources
//
// One slot per swapchain image, indexed by the image index returned from
// acquire. Each slot owns the view, framebuffer, command buffer and fence used
// to render into that image. The table is sized from the images the driver
// actually granted and never changes size afterwards.

use super::error::{GfxError, GfxResult};
use super::gpu::GpuDevice;
use super::pipeline::RenderPass;
use super::swapchain::Swapchain;
use super::sync::SemaphorePair;
use ash::vk;
use std::sync::Arc;

/// Everything needed to render into one swapchain image
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameSlot {
    /// Borrowed from the swapchain
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
    pub command_buffer: vk::CommandBuffer,
    /// Signaled once the last submission of `command_buffer` has finished
    pub fence: vk::Fence,
}

pub struct FrameResources {
    slots: Vec<FrameSlot>,
    command_pool: vk::CommandPool,
    /// Shared by all slots. Only sound while at most one frame is between
    /// acquire and present; one pair per slot is needed before frames overlap.
    semaphores: SemaphorePair,
    /// Slot of the most recently acquired image
    current: usize,
    device: Arc<dyn GpuDevice>,
}

impl FrameResources {
    /// Build one slot per swapchain image.
    ///
    /// Views and framebuffers come first (the render pass must already exist),
    /// then the command pool with one primary buffer per slot, one fence per
    /// slot created signaled, and finally the shared semaphore pair.
    pub fn new(
        device: Arc<dyn GpuDevice>,
        swapchain: &Swapchain,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
    ) -> GfxResult<Self> {
        let slot_count = swapchain.image_count();
        log::info!("Creating {} frame slots", slot_count);

        // Partially built tables are released by Drop on early return
        let mut frames = Self {
            slots: Vec::with_capacity(slot_count),
            command_pool: vk::CommandPool::null(),
            semaphores: SemaphorePair::default(),
            current: 0,
            device,
        };

        for &image in &swapchain.images {
            frames.slots.push(FrameSlot {
                image,
                ..FrameSlot::default()
            });
            let index = frames.slots.len() - 1;

            let view = create_image_view(frames.device.as_ref(), frames.slots[index].image, swapchain.format)?;
            frames.slots[index].view = view;

            let attachments = [view];
            let framebuffer_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass.handle)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            frames.slots[index].framebuffer = frames
                .device
                .create_framebuffer(&framebuffer_info)
                .map_err(GfxError::vulkan("vkCreateFramebuffer"))?;
        }

        frames.command_pool = frames
            .device
            .create_command_pool(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .map_err(GfxError::vulkan("vkCreateCommandPool"))?;

        let command_buffers = frames
            .device
            .allocate_command_buffers(frames.command_pool, slot_count as u32)
            .map_err(GfxError::vulkan("vkAllocateCommandBuffers"))?;
        for (slot, command_buffer) in frames.slots.iter_mut().zip(command_buffers) {
            slot.command_buffer = command_buffer;
        }

        // Signaled so the first wait on every slot returns immediately
        for index in 0..slot_count {
            frames.slots[index].fence = frames
                .device
                .create_fence(true)
                .map_err(GfxError::vulkan("vkCreateFence"))?;
        }

        frames.semaphores = SemaphorePair::new(frames.device.as_ref())?;

        log::debug!("Frame slots: {:?}", frames.slots);
        Ok(frames)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    #[cfg(test)]
    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    pub fn semaphores(&self) -> &SemaphorePair {
        &self.semaphores
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Record which slot the latest acquire handed out
    pub fn set_current(&mut self, image_index: u32) -> GfxResult<&FrameSlot> {
        let index = image_index as usize;
        let count = self.slots.len();
        let slot = self.slots.get(index).ok_or(GfxError::ImageIndexOutOfRange {
            index: image_index,
            count,
        })?;
        self.current = index;
        Ok(slot)
    }
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        let device = self.device.as_ref();

        for slot in &self.slots {
            if slot.framebuffer != vk::Framebuffer::null() {
                device.destroy_framebuffer(slot.framebuffer);
            }
            if slot.view != vk::ImageView::null() {
                device.destroy_image_view(slot.view);
            }
            if slot.fence != vk::Fence::null() {
                device.destroy_fence(slot.fence);
            }
        }

        if self.command_pool != vk::CommandPool::null() {
            let command_buffers: Vec<_> = self
                .slots
                .iter()
                .map(|slot| slot.command_buffer)
                .filter(|&cmd| cmd != vk::CommandBuffer::null())
                .collect();
            // Destroying the pool frees them too, this only keeps create/free paired
            if !command_buffers.is_empty() {
                device.free_command_buffers(self.command_pool, &command_buffers);
            }
            device.destroy_command_pool(self.command_pool);
        }

        self.semaphores.destroy(device);
    }
}

fn create_image_view(
    device: &dyn GpuDevice,
    image: vk::Image,
    format: vk::Format,
) -> GfxResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    device
        .create_image_view(&create_info)
        .map_err(GfxError::vulkan("vkCreateImageView"))
}
