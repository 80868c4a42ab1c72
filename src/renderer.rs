// =============================================================================
// FRAME RENDERER - One trip through the frame protocol per redraw
// =============================================================================
//
// FRAME TIMELINE:
// ┌──────────────────────────────────────────────────────────────────────────┐
// │ acquire ─> wait slot fence ─> record ─> reset fence ─> submit ─> present │
// └──────────────────────────────────────────────────────────────────────────┘
//
// The command buffer is re-recorded every frame. Any failure along the way is
// returned as-is and ends the loop; nothing is retried or recreated.

use crate::backend::sync::wait_for_fence;
use crate::backend::{FrameSlot, GfxError, GfxResult, GpuDevice};
use crate::config::GraphicsConfig;
use crate::graphics::Graphics;
use ash::vk;

/// Per-frame settings plus a running frame count
pub struct FrameRenderer {
    clear_color: [f32; 4],
    acquire_timeout_ns: u64,
    fence_timeout_ns: u64,
    frames_rendered: u64,
    // Submit waits on the image-acquired semaphore at this stage
    wait_stages: [vk::PipelineStageFlags; 1],
}

impl FrameRenderer {
    pub fn new(config: &GraphicsConfig) -> Self {
        Self {
            clear_color: config.clear_color,
            acquire_timeout_ns: config.acquire_timeout_ns,
            fence_timeout_ns: config.fence_timeout_ns,
            frames_rendered: 0,
            wait_stages: [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
        }
    }

    /// Frames presented so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render and present one frame, returning the swapchain image it used
    pub fn render_frame(&mut self, gfx: &mut Graphics) -> GfxResult<u32> {
        let device = gfx.device.as_ref();
        let semaphores = *gfx.frames.semaphores();

        // STEP 1: Acquire the next swapchain image
        let image_index = gfx
            .swapchain
            .acquire_next_image(self.acquire_timeout_ns, semaphores.image_acquired)?;
        let slot = *gfx.frames.set_current(image_index)?;
        let slot_index = gfx.frames.current();
        log::trace!("Frame {}: acquired image {}", self.frames_rendered, image_index);

        // STEP 2: Wait until the GPU is done with this slot's last submission
        wait_for_fence(device, slot.fence, slot_index, self.fence_timeout_ns)?;

        // STEP 3: Re-record the slot's command buffer
        self.record(device, gfx, &slot)?;

        // STEP 4: Submit. The fence is only reset right before it is handed back
        // to the queue, so an early return leaves it signaled.
        device
            .reset_fence(slot.fence)
            .map_err(GfxError::vulkan("vkResetFences"))?;
        device
            .queue_submit(
                slot.command_buffer,
                semaphores.image_acquired,
                self.wait_stages[0],
                semaphores.render_finished,
                slot.fence,
            )
            .map_err(GfxError::vulkan("vkQueueSubmit"))?;

        // STEP 5: Present once rendering has finished
        gfx.swapchain.present(image_index, semaphores.render_finished)?;

        let messages = device.take_diagnostics();
        if !messages.is_empty() {
            return Err(GfxError::Validation(messages));
        }

        log::trace!("Frame {}: presented image {}", self.frames_rendered, image_index);
        self.frames_rendered += 1;
        Ok(image_index)
    }

    fn record(&self, device: &dyn GpuDevice, gfx: &Graphics, slot: &FrameSlot) -> GfxResult<()> {
        let cmd = slot.command_buffer;

        device
            .reset_command_buffer(cmd)
            .map_err(GfxError::vulkan("vkResetCommandBuffer"))?;
        device
            .begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .map_err(GfxError::vulkan("vkBeginCommandBuffer"))?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(gfx.render_pass.handle)
            .framebuffer(slot.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: gfx.extent(),
            })
            .clear_values(&clear_values);

        device.cmd_begin_render_pass(cmd, &render_pass_info);
        device.cmd_bind_pipeline(cmd, gfx.pipeline.pipeline);
        // Vertices come from gl_VertexIndex
        device.cmd_draw(cmd, 3, 1, 0, 0);
        device.cmd_end_render_pass(cmd);

        device
            .end_command_buffer(cmd)
            .map_err(GfxError::vulkan("vkEndCommandBuffer"))
    }
}
