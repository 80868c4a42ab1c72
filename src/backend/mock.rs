// Recording device for tests
//
// Hands out fake handles, keeps just enough state to behave like a driver
// (fence signal state, round-robin image acquisition) and records every call
// so tests can assert on ordering and on create/destroy pairing.

use super::gpu::GpuDevice;
use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    Swapchain,
    ImageView,
    Framebuffer,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    CommandPool,
    CommandBuffer,
    Fence,
    Semaphore,
    Surface,
    Device,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(Object, u64),
    CreateSwapchain { handle: u64, min_image_count: u32 },
    CreateFence { handle: u64, signaled: bool },
    CreateFramebuffer { handle: u64, width: u32, height: u32 },
    Destroy(Object, u64),
    WaitIdle,
    Acquire { image_index: u32, semaphore: vk::Semaphore, timeout: u64 },
    WaitFence { fence: vk::Fence, timeout: u64 },
    ResetFence(vk::Fence),
    ResetCommandBuffer(vk::CommandBuffer),
    BeginCommandBuffer { cmd: vk::CommandBuffer, usage: vk::CommandBufferUsageFlags },
    BeginRenderPass {
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_value_count: u32,
    },
    BindPipeline { cmd: vk::CommandBuffer, pipeline: vk::Pipeline },
    Draw {
        cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    EndRenderPass(vk::CommandBuffer),
    EndCommandBuffer(vk::CommandBuffer),
    Submit {
        cmd: vk::CommandBuffer,
        wait: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: vk::Semaphore,
        fence: vk::Fence,
    },
    Present { image_index: u32, wait: vk::Semaphore },
}

impl Call {
    /// The object kind and raw handle if this call created something
    pub fn created(&self) -> Option<(Object, u64)> {
        match *self {
            Call::Create(object, handle) => Some((object, handle)),
            Call::CreateSwapchain { handle, .. } => Some((Object::Swapchain, handle)),
            Call::CreateFence { handle, .. } => Some((Object::Fence, handle)),
            Call::CreateFramebuffer { handle, .. } => Some((Object::Framebuffer, handle)),
            _ => None,
        }
    }
}

/// Knobs a test can turn while the device is shared behind an `Arc`
#[derive(Default)]
pub struct MockControl {
    /// Overrides acquire: `Ok(suboptimal)` or the error to return
    pub acquire_result: Option<VkResult<bool>>,
    /// Overrides present the same way
    pub present_result: Option<VkResult<bool>>,
    /// Submissions never signal their fence
    pub gpu_stalled: bool,
    /// Returned (and cleared) by the next `take_diagnostics`
    pub diagnostics: Vec<String>,
}

#[derive(Default)]
struct MockState {
    next_handle: u64,
    created: HashMap<Object, usize>,
    fences: HashMap<u64, bool>,
    images: HashMap<u64, Vec<vk::Image>>,
    next_image: u32,
}

pub struct MockDevice {
    granted_images: u32,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
    presentation: bool,
    failures: Vec<(Object, Option<usize>)>,
    state: Mutex<MockState>,
    log: Arc<Mutex<Vec<Call>>>,
    control: Arc<Mutex<MockControl>>,
}

impl MockDevice {
    /// A device whose swapchains always hold `granted_images` images
    pub fn new(granted_images: u32) -> Self {
        Self {
            granted_images,
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            presentation: true,
            failures: Vec::new(),
            state: Mutex::new(MockState {
                next_handle: 0x1000,
                ..MockState::default()
            }),
            log: Arc::new(Mutex::new(Vec::new())),
            control: Arc::new(Mutex::new(MockControl::default())),
        }
    }

    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }

    pub fn without_presentation(mut self) -> Self {
        self.presentation = false;
        self
    }

    pub fn with_stalled_gpu(self) -> Self {
        self.control.lock().gpu_stalled = true;
        self
    }

    /// Every creation of `object` fails
    pub fn failing_on(mut self, object: Object) -> Self {
        self.failures.push((object, None));
        self
    }

    /// Only the `n`th (1-based) creation of `object` fails
    pub fn failing_on_nth(mut self, object: Object, n: usize) -> Self {
        self.failures.push((object, Some(n)));
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<Call>>> {
        self.log.clone()
    }

    pub fn control(&self) -> Arc<Mutex<MockControl>> {
        self.control.clone()
    }

    fn record(&self, call: Call) {
        self.log.lock().push(call);
    }

    /// Count the creation attempt and hand out a fresh raw handle unless a
    /// configured failure applies
    fn allocate(&self, object: Object) -> VkResult<u64> {
        let mut state = self.state.lock();
        let attempt = {
            let count = state.created.entry(object).or_insert(0);
            *count += 1;
            *count
        };
        let fails = self
            .failures
            .iter()
            .any(|&(o, nth)| o == object && nth.map_or(true, |n| n == attempt));
        if fails {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        state.next_handle += 1;
        Ok(state.next_handle)
    }

    fn create<H: Handle>(&self, object: Object) -> VkResult<H> {
        let raw = self.allocate(object)?;
        self.record(Call::Create(object, raw));
        Ok(H::from_raw(raw))
    }

    fn destroy<H: Handle>(&self, object: Object, handle: H) {
        self.record(Call::Destroy(object, handle.as_raw()));
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.record(Call::Destroy(Object::Device, 0));
    }
}

impl GpuDevice for MockDevice {
    fn queue_family_index(&self) -> u32 {
        0
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.record(Call::WaitIdle);
        Ok(())
    }

    fn take_diagnostics(&self) -> Vec<String> {
        std::mem::take(&mut self.control.lock().diagnostics)
    }

    fn surface_support(&self, _surface: vk::SurfaceKHR) -> VkResult<bool> {
        Ok(self.presentation)
    }

    fn surface_capabilities(&self, _surface: vk::SurfaceKHR) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            current_extent: vk::Extent2D { width: 800, height: 600 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            max_image_array_layers: 1,
            ..Default::default()
        })
    }

    fn surface_formats(&self, _surface: vk::SurfaceKHR) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.formats.clone())
    }

    fn surface_present_modes(&self, _surface: vk::SurfaceKHR) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.present_modes.clone())
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        self.destroy(Object::Surface, surface);
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR) -> VkResult<vk::SwapchainKHR> {
        let handle = self.allocate(Object::Swapchain)?;
        {
            let mut state = self.state.lock();
            let images: Vec<vk::Image> = (0..self.granted_images)
                .map(|_| {
                    state.next_handle += 1;
                    vk::Image::from_raw(state.next_handle)
                })
                .collect();
            state.images.insert(handle, images);
            state.next_image = 0;
        }
        self.record(Call::CreateSwapchain {
            handle,
            min_image_count: info.min_image_count,
        });
        Ok(vk::SwapchainKHR::from_raw(handle))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.state
            .lock()
            .images
            .get(&swapchain.as_raw())
            .cloned()
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.state.lock().images.remove(&swapchain.as_raw());
        self.destroy(Object::Swapchain, swapchain);
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        timeout: u64,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let suboptimal = match self.control.lock().acquire_result {
            Some(Err(e)) => return Err(e),
            Some(Ok(suboptimal)) => suboptimal,
            None => false,
        };
        let image_index = {
            let mut state = self.state.lock();
            let index = state.next_image;
            state.next_image = (index + 1) % self.granted_images.max(1);
            index
        };
        self.record(Call::Acquire {
            image_index,
            semaphore: signal,
            timeout,
        });
        Ok((image_index, suboptimal))
    }

    fn queue_present(
        &self,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        self.record(Call::Present { image_index, wait });
        match self.control.lock().present_result {
            Some(result) => result,
            None => Ok(false),
        }
    }

    fn create_image_view(&self, _info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        self.create(Object::ImageView)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy(Object::ImageView, view);
    }

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo) -> VkResult<vk::Framebuffer> {
        let handle = self.allocate(Object::Framebuffer)?;
        self.record(Call::CreateFramebuffer {
            handle,
            width: info.width,
            height: info.height,
        });
        Ok(vk::Framebuffer::from_raw(handle))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroy(Object::Framebuffer, framebuffer);
    }

    fn create_render_pass(&self, _info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        self.create(Object::RenderPass)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy(Object::RenderPass, render_pass);
    }

    fn create_shader_module(&self, _code: &[u32]) -> VkResult<vk::ShaderModule> {
        self.create(Object::ShaderModule)
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.destroy(Object::ShaderModule, module);
    }

    fn create_pipeline_layout(&self, _info: &vk::PipelineLayoutCreateInfo) -> VkResult<vk::PipelineLayout> {
        self.create(Object::PipelineLayout)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.destroy(Object::PipelineLayout, layout);
    }

    fn create_graphics_pipeline(&self, _info: &vk::GraphicsPipelineCreateInfo) -> VkResult<vk::Pipeline> {
        self.create(Object::Pipeline)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.destroy(Object::Pipeline, pipeline);
    }

    fn create_command_pool(&self, _flags: vk::CommandPoolCreateFlags) -> VkResult<vk::CommandPool> {
        self.create(Object::CommandPool)
    }

    fn allocate_command_buffers(&self, _pool: vk::CommandPool, count: u32) -> VkResult<Vec<vk::CommandBuffer>> {
        (0..count).map(|_| self.create(Object::CommandBuffer)).collect()
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        for &buffer in buffers {
            self.destroy(Object::CommandBuffer, buffer);
        }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.destroy(Object::CommandPool, pool);
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record(Call::ResetCommandBuffer(cmd));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, usage: vk::CommandBufferUsageFlags) -> VkResult<()> {
        self.record(Call::BeginCommandBuffer { cmd, usage });
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record(Call::EndCommandBuffer(cmd));
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo) {
        self.record(Call::BeginRenderPass {
            cmd,
            render_pass: info.render_pass,
            framebuffer: info.framebuffer,
            extent: info.render_area.extent,
            clear_value_count: info.clear_value_count,
        });
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(Call::BindPipeline { cmd, pipeline });
    }

    fn cmd_draw(
        &self,
        cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.record(Call::Draw {
            cmd,
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.record(Call::EndRenderPass(cmd));
    }

    fn queue_submit(
        &self,
        cmd: vk::CommandBuffer,
        wait: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> VkResult<()> {
        self.record(Call::Submit {
            cmd,
            wait,
            wait_stage,
            signal,
            fence,
        });
        if !self.control.lock().gpu_stalled {
            self.state.lock().fences.insert(fence.as_raw(), true);
        }
        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let handle = self.allocate(Object::Fence)?;
        self.state.lock().fences.insert(handle, signaled);
        self.record(Call::CreateFence { handle, signaled });
        Ok(vk::Fence::from_raw(handle))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.state.lock().fences.remove(&fence.as_raw());
        self.destroy(Object::Fence, fence);
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
        self.record(Call::WaitFence { fence, timeout });
        match self.state.lock().fences.get(&fence.as_raw()) {
            Some(false) => Err(vk::Result::TIMEOUT),
            _ => Ok(()),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        self.record(Call::ResetFence(fence));
        self.state.lock().fences.insert(fence.as_raw(), false);
        Ok(())
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        self.create(Object::Semaphore)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.destroy(Object::Semaphore, semaphore);
    }
}
