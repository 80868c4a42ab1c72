// Surface - window connection
//
// Turns the raw handles of the host window into a `VkSurfaceKHR` and fixes the
// image format used by everything drawn to it.

use super::device::VulkanDevice;
use super::error::{GfxError, GfxResult};
use super::gpu::GpuDevice;
use ash::extensions::khr;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::CStr;
use std::sync::Arc;

/// Instance extensions needed to create a surface on this window system
pub fn required_extensions(display: RawDisplayHandle) -> GfxResult<Vec<&'static CStr>> {
    let platform = match display {
        RawDisplayHandle::Windows(_) => khr::Win32Surface::name(),
        RawDisplayHandle::Xlib(_) => khr::XlibSurface::name(),
        RawDisplayHandle::Xcb(_) => khr::XcbSurface::name(),
        RawDisplayHandle::Wayland(_) => khr::WaylandSurface::name(),
        other => return Err(GfxError::UnsupportedPlatform(format!("{:?}", other))),
    };
    Ok(vec![khr::Surface::name(), platform])
}

/// Create a platform surface for the given window.
///
/// The instance must have been created with [`required_extensions`] for the
/// same display.
pub fn create_surface(
    device: &VulkanDevice,
    display: RawDisplayHandle,
    window: RawWindowHandle,
) -> GfxResult<vk::SurfaceKHR> {
    let entry = &device.entry;
    let instance = &device.instance;

    unsafe {
        match (display, window) {
            (RawDisplayHandle::Windows(_), RawWindowHandle::Win32(handle)) => {
                let hinstance = handle.hinstance.map(|h| h.get()).unwrap_or(0) as *const std::ffi::c_void;
                let hwnd = handle.hwnd.get() as *const std::ffi::c_void;
                let create_info = vk::Win32SurfaceCreateInfoKHR::builder()
                    .hinstance(hinstance)
                    .hwnd(hwnd);
                khr::Win32Surface::new(entry, instance)
                    .create_win32_surface(&create_info, None)
                    .map_err(GfxError::vulkan("vkCreateWin32SurfaceKHR"))
            }
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(handle)) => {
                let dpy = display
                    .display
                    .ok_or_else(|| GfxError::UnsupportedPlatform("Xlib without display".into()))?;
                let create_info = vk::XlibSurfaceCreateInfoKHR::builder()
                    .dpy(dpy.as_ptr() as *mut _)
                    .window(handle.window);
                khr::XlibSurface::new(entry, instance)
                    .create_xlib_surface(&create_info, None)
                    .map_err(GfxError::vulkan("vkCreateXlibSurfaceKHR"))
            }
            (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(handle)) => {
                let connection = display
                    .connection
                    .ok_or_else(|| GfxError::UnsupportedPlatform("XCB without connection".into()))?;
                let create_info = vk::XcbSurfaceCreateInfoKHR::builder()
                    .connection(connection.as_ptr() as *mut _)
                    .window(handle.window.get());
                khr::XcbSurface::new(entry, instance)
                    .create_xcb_surface(&create_info, None)
                    .map_err(GfxError::vulkan("vkCreateXcbSurfaceKHR"))
            }
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(handle)) => {
                let create_info = vk::WaylandSurfaceCreateInfoKHR::builder()
                    .display(display.display.as_ptr() as *mut _)
                    .surface(handle.surface.as_ptr() as *mut _);
                khr::WaylandSurface::new(entry, instance)
                    .create_wayland_surface(&create_info, None)
                    .map_err(GfxError::vulkan("vkCreateWaylandSurfaceKHR"))
            }
            (display, window) => Err(GfxError::UnsupportedPlatform(format!(
                "{:?} / {:?}",
                display, window
            ))),
        }
    }
}

/// A presentable surface plus the image format chosen for it.
///
/// Owns the surface: it is destroyed when the binding drops.
pub struct SurfaceBinding {
    pub surface: vk::SurfaceKHR,
    pub format: vk::SurfaceFormatKHR,
    device: Arc<dyn GpuDevice>,
}

impl SurfaceBinding {
    /// Take ownership of `surface` and pick its format.
    ///
    /// The first reported format/color space wins, there is no preference
    /// ranking. Fails if the graphics queue family cannot present to it.
    pub fn new(device: Arc<dyn GpuDevice>, surface: vk::SurfaceKHR) -> GfxResult<Self> {
        // Owned from here on, so the surface is released on every error path
        let mut binding = Self {
            surface,
            format: vk::SurfaceFormatKHR::default(),
            device,
        };

        let family = binding.device.queue_family_index();
        let supported = binding
            .device
            .surface_support(surface)
            .map_err(GfxError::vulkan("vkGetPhysicalDeviceSurfaceSupportKHR"))?;
        if !supported {
            return Err(GfxError::PresentationUnsupported(family));
        }

        let formats = binding
            .device
            .surface_formats(surface)
            .map_err(GfxError::vulkan("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;
        binding.format = *formats
            .first()
            .ok_or(GfxError::SurfaceUnsupported("formats"))?;

        log::info!(
            "Surface format: {:?} / {:?}",
            binding.format.format,
            binding.format.color_space
        );

        Ok(binding)
    }
}

impl Drop for SurfaceBinding {
    fn drop(&mut self) {
        self.device.destroy_surface(self.surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Call, MockDevice, Object};
    use ash::vk::Handle;
    use raw_window_handle::{WaylandDisplayHandle, WindowsDisplayHandle, XlibDisplayHandle};
    use std::ptr::NonNull;

    #[test]
    fn surface_extensions_follow_the_display() {
        let windows = required_extensions(RawDisplayHandle::Windows(WindowsDisplayHandle::new())).unwrap();
        assert_eq!(windows, vec![khr::Surface::name(), khr::Win32Surface::name()]);

        let xlib = required_extensions(RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0))).unwrap();
        assert_eq!(xlib, vec![khr::Surface::name(), khr::XlibSurface::name()]);

        let mut display = 0u8;
        let wayland = required_extensions(RawDisplayHandle::Wayland(WaylandDisplayHandle::new(
            NonNull::from(&mut display).cast(),
        )))
        .unwrap();
        assert_eq!(wayland[1], khr::WaylandSurface::name());
    }

    #[test]
    fn first_reported_format_is_chosen() {
        let mock = MockDevice::new(3).with_formats(vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ]);
        let binding = SurfaceBinding::new(Arc::new(mock), vk::SurfaceKHR::from_raw(1)).unwrap();
        assert_eq!(binding.format.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn surface_without_formats_is_rejected_and_released() {
        let mock = MockDevice::new(3).with_formats(vec![]);
        let log = mock.log();
        let err = SurfaceBinding::new(Arc::new(mock), vk::SurfaceKHR::from_raw(7)).err().unwrap();
        assert!(matches!(err, GfxError::SurfaceUnsupported("formats")));
        assert!(log.lock().contains(&Call::Destroy(Object::Surface, 7)));
    }

    #[test]
    fn queue_without_presentation_support_is_rejected() {
        let mock = MockDevice::new(3).without_presentation();
        let err = SurfaceBinding::new(Arc::new(mock), vk::SurfaceKHR::from_raw(1)).err().unwrap();
        assert!(matches!(err, GfxError::PresentationUnsupported(0)));
    }
}
