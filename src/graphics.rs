// =============================================================================
// GRAPHICS CONTEXT - Every GPU object the triangle needs, in one owner
// =============================================================================
//
// Built once after the window exists and dropped once when the loop ends.
// There is no resize path: the extent passed in at creation is used for the
// swapchain, the framebuffers and the baked-in viewport until exit.
//
// TEARDOWN ORDER:
// Fields drop top to bottom, after `Drop::drop` has waited for the GPU:
//   pipeline     shader modules -> layout -> pipeline
//   frames       per slot framebuffer/view/fence -> command buffers -> pool -> semaphores
//   render_pass
//   swapchain
//   surface
//   device       (last reference) device -> debug messenger -> instance

use crate::backend::surface::{create_surface, required_extensions};
use crate::backend::{
    FrameResources, GfxError, GfxResult, GpuDevice, RenderPass, ShaderBinaries, SurfaceBinding,
    Swapchain, TrianglePipeline, VulkanDevice,
};
use crate::config::{Config, GraphicsConfig};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

pub struct Graphics {
    pub pipeline: TrianglePipeline,
    pub frames: FrameResources,
    pub render_pass: RenderPass,
    pub swapchain: Swapchain,
    /// Kept only so the surface outlives the swapchain and is released after it
    _surface: SurfaceBinding,
    pub device: Arc<dyn GpuDevice>,
}

impl Graphics {
    /// Create the Vulkan device for `window` and everything drawn with it
    pub fn new<W>(window: &W, extent: vk::Extent2D, config: &Config) -> GfxResult<Self>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let display = window.display_handle()?.as_raw();
        let extensions = required_extensions(display)?;

        let device = VulkanDevice::new(
            &config.instance.application_name,
            &config.instance.engine_name,
            &extensions,
            config.diagnostics_enabled(),
        )?;

        let surface = create_surface(&device, display, window.window_handle()?.as_raw())?;

        Self::from_device(device, surface, extent, &config.graphics)
    }

    /// Build the swapchain, frame slots and pipeline on an existing device.
    ///
    /// Takes ownership of `surface`. The shader binaries are read before any
    /// swapchain object exists, so a missing file aborts early.
    pub fn from_device(
        device: Arc<dyn GpuDevice>,
        surface: vk::SurfaceKHR,
        extent: vk::Extent2D,
        config: &GraphicsConfig,
    ) -> GfxResult<Self> {
        let surface = SurfaceBinding::new(device.clone(), surface)?;

        let shaders = ShaderBinaries::load(config.vertex_shader.clone(), config.fragment_shader.clone())?;

        let swapchain = Swapchain::new(
            device.clone(),
            &surface,
            extent,
            config.buffering_count,
            config.preferred_present_mode(),
        )?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format)?;
        let frames = FrameResources::new(device.clone(), &swapchain, &render_pass, extent)?;
        let pipeline = TrianglePipeline::new(device.clone(), &render_pass, extent, &shaders)?;

        let graphics = Self {
            pipeline,
            frames,
            render_pass,
            swapchain,
            _surface: surface,
            device,
        };

        // Anything the validation layer said during setup is fatal as well
        let messages = graphics.device.take_diagnostics();
        if !messages.is_empty() {
            return Err(GfxError::Validation(messages));
        }

        log::info!(
            "Graphics ready: {} frame slots, {}x{}, {:?}",
            graphics.frames.len(),
            extent.width,
            extent.height,
            graphics.swapchain.present_mode
        );
        Ok(graphics)
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");
        // Nothing may be destroyed while the GPU can still touch it
        if let Err(e) = self.device.wait_idle() {
            log::error!("vkDeviceWaitIdle failed during teardown: {}", e);
        }
    }
}
