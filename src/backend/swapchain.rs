// Swapchain - Window presentation
//
// Manages the chain of images we render to and present to the screen.
// Created once at startup: there is no resize handling, so the extent and
// image count are fixed for the lifetime of the process.

use super::error::{GfxError, GfxResult};
use super::gpu::GpuDevice;
use super::surface::SurfaceBinding;
use ash::vk;
use std::sync::Arc;

pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    /// Owned by the swapchain, never destroyed individually
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    device: Arc<dyn GpuDevice>,
}

impl Swapchain {
    /// Create the swapchain.
    ///
    /// `requested_images` is a request only: the driver may hand back a
    /// different number of images, and `images.len()` is what every per-image
    /// table must be sized from.
    pub fn new(
        device: Arc<dyn GpuDevice>,
        surface: &SurfaceBinding,
        extent: vk::Extent2D,
        requested_images: u32,
        preferred_present_mode: Option<vk::PresentModeKHR>,
    ) -> GfxResult<Self> {
        log::info!("Creating swapchain: {}x{}", extent.width, extent.height);

        let surface_caps = device
            .surface_capabilities(surface.surface)
            .map_err(GfxError::vulkan("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;

        let present_modes = device
            .surface_present_modes(surface.surface)
            .map_err(GfxError::vulkan("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;

        let present_mode = choose_present_mode(&present_modes, preferred_present_mode)
            .ok_or(GfxError::SurfaceUnsupported("present modes"))?;
        log::info!("Present mode: {:?}", present_mode);

        let image_count = clamp_image_count(requested_images, &surface_caps);
        if image_count != requested_images {
            log::warn!(
                "Surface allows {}..={} images, requesting {} instead of {}",
                surface_caps.min_image_count,
                surface_caps.max_image_count,
                image_count,
                requested_images
            );
        }

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(surface.format.format)
            .image_color_space(surface.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let swapchain = device
            .create_swapchain(&create_info)
            .map_err(GfxError::vulkan("vkCreateSwapchainKHR"))?;

        // Wrap right away so the swapchain is released if the image query fails
        let mut chain = Self {
            swapchain,
            images: Vec::new(),
            format: surface.format.format,
            extent,
            present_mode,
            device,
        };

        chain.images = chain
            .device
            .swapchain_images(swapchain)
            .map_err(GfxError::vulkan("vkGetSwapchainImagesKHR"))?;

        if chain.images.len() as u32 != image_count {
            log::info!(
                "Requested {} swapchain images, driver granted {}",
                image_count,
                chain.images.len()
            );
        }
        log::info!("Created swapchain with {} images", chain.images.len());

        Ok(chain)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next presentable image, signaling `semaphore` once it is
    /// ready. Anything but plain success is fatal here.
    pub fn acquire_next_image(&self, timeout: u64, semaphore: vk::Semaphore) -> GfxResult<u32> {
        match self.device.acquire_next_image(self.swapchain, timeout, semaphore) {
            Ok((index, false)) => Ok(index),
            Ok((_, true)) => Err(GfxError::SwapchainSuboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GfxError::SwapchainOutOfDate),
            Err(e) => Err(GfxError::vulkan("vkAcquireNextImageKHR")(e)),
        }
    }

    /// Queue presentation of `image_index` once `wait_semaphore` is signaled
    pub fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> GfxResult<()> {
        match self.device.queue_present(self.swapchain, image_index, wait_semaphore) {
            Ok(false) => Ok(()),
            Ok(true) => Err(GfxError::SwapchainSuboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GfxError::SwapchainOutOfDate),
            Err(e) => Err(GfxError::vulkan("vkQueuePresentKHR")(e)),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.device.destroy_swapchain(self.swapchain);
    }
}

/// The preferred mode when the surface supports it, else the first reported one
fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preferred: Option<vk::PresentModeKHR>,
) -> Option<vk::PresentModeKHR> {
    preferred
        .filter(|mode| modes.contains(mode))
        .or_else(|| modes.first().copied())
}

/// `max_image_count == 0` means the surface has no upper limit
fn clamp_image_count(requested: u32, caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = requested.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count = count.min(caps.max_image_count);
    }
    count
}
