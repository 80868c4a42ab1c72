// Render pass and graphics pipeline
//
// One render pass with a single color attachment (the swapchain image) and one
// fixed-function pipeline drawing a triangle synthesized in the vertex shader.
// Viewport and scissor are baked in at creation and never updated.

use super::error::{GfxError, GfxResult};
use super::gpu::GpuDevice;
use super::shader::ShaderBinaries;
use ash::vk;
use std::ffi::CStr;
use std::sync::Arc;

const ENTRY_POINT: &CStr = c"main";

/// Render pass clearing the swapchain image and leaving it ready to present
pub struct RenderPass {
    pub handle: vk::RenderPass,
    device: Arc<dyn GpuDevice>,
}

impl RenderPass {
    /// `format` must be the swapchain image format
    pub fn new(device: Arc<dyn GpuDevice>, format: vk::Format) -> GfxResult<Self> {
        // Attachment 0 is the acquired swapchain image
        let color_attachment = vk::AttachmentDescription::builder()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();

        let color_attachment_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build();

        // Single subpass, color only: no depth, input or resolve attachments
        let color_attachments = [color_attachment_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachments)
            .build();

        // The layout transition has to wait for the same stage the submit
        // waits on the image-acquired semaphore
        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build();

        let attachments = [color_attachment];
        let subpasses = [subpass];
        let dependencies = [dependency];

        let render_pass_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let handle = device
            .create_render_pass(&render_pass_info)
            .map_err(GfxError::vulkan("vkCreateRenderPass"))?;

        Ok(Self { handle, device })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        self.device.destroy_render_pass(self.handle);
    }
}

/// The single graphics pipeline and the objects it was built from
pub struct TrianglePipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    vertex_shader: vk::ShaderModule,
    fragment_shader: vk::ShaderModule,
    device: Arc<dyn GpuDevice>,
}

impl TrianglePipeline {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        shaders: &ShaderBinaries,
    ) -> GfxResult<Self> {
        // Released by Drop if any later step fails
        let mut built = Self {
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            vertex_shader: vk::ShaderModule::null(),
            fragment_shader: vk::ShaderModule::null(),
            device,
        };

        built.vertex_shader = built
            .device
            .create_shader_module(&shaders.vertex)
            .map_err(GfxError::vulkan("vkCreateShaderModule"))?;
        built.fragment_shader = built
            .device
            .create_shader_module(&shaders.fragment)
            .map_err(GfxError::vulkan("vkCreateShaderModule"))?;

        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(built.vertex_shader)
            .name(ENTRY_POINT)
            .build();

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(built.fragment_shader)
            .name(ENTRY_POINT)
            .build();

        let shader_stages = [vert_stage, frag_stage];

        // No vertex buffers: positions come from gl_VertexIndex
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport = vk::Viewport::builder()
            .x(0.0)
            .y(0.0)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0)
            .build();

        let scissor = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(extent)
            .build();

        let viewports = [viewport];
        let scissors = [scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        // One sample per pixel
        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .min_sample_shading(1.0);

        // Opaque writes to all four channels
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();

        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&color_blend_attachments);

        // Empty layout: no descriptor sets, no push constants
        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        built.layout = built
            .device
            .create_pipeline_layout(&layout_info)
            .map_err(GfxError::vulkan("vkCreatePipelineLayout"))?;

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .layout(built.layout)
            .render_pass(render_pass.handle)
            .subpass(0);

        built.pipeline = built
            .device
            .create_graphics_pipeline(&pipeline_info)
            .map_err(GfxError::vulkan("vkCreateGraphicsPipelines"))?;

        log::info!("Created triangle pipeline for {}x{}", extent.width, extent.height);
        Ok(built)
    }
}

impl Drop for TrianglePipeline {
    fn drop(&mut self) {
        let device = self.device.as_ref();
        // Teardown order: shader modules, layout, pipeline
        for module in [self.vertex_shader, self.fragment_shader] {
            if module != vk::ShaderModule::null() {
                device.destroy_shader_module(module);
            }
        }
        if self.layout != vk::PipelineLayout::null() {
            device.destroy_pipeline_layout(self.layout);
        }
        if self.pipeline != vk::Pipeline::null() {
            device.destroy_pipeline(self.pipeline);
        }
    }
}
