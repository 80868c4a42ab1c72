// =============================================================================
// VULKAN TRIANGLE RENDERER
// =============================================================================
//
// Opens one fixed-size window and draws a single hardcoded triangle into it
// every frame, exercising the full acquire/record/submit/present contract.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  App (winit event loop, window, FPS title)                      │
// │    └── FrameRenderer (per-frame protocol)                       │
// │          └── Graphics (owns every GPU object, teardown order)   │
// │                └── backend (device, swapchain, frames, pipeline)│
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW:
// 1. Acquire swapchain image
// 2. Wait for the fence of that image's slot
// 3. Record the slot's command buffer
// 4. Submit, then present
//
// Any failure is fatal: the loop exits and the process returns non-zero.
//
// =============================================================================

mod backend;
mod config;
mod graphics;
mod renderer;

use anyhow::{Context, Result};
use ash::vk;
use config::Config;
use graphics::Graphics;
use renderer::FrameRenderer;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // A broken config.toml falls back to defaults, reported once logging is up
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_logging(&config);
    log::info!("Starting Vulkan triangle renderer");
    match load_error {
        Some(e) => log::warn!("Failed to load {}: {:#}. Using defaults.", config::CONFIG_PATH, e),
        None => log::debug!("Config: {:?}", config),
    }
    log::info!(
        "Window: {}x{}, {} buffered images requested",
        config.window.width,
        config.window.height,
        config.graphics.buffering_count
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => {
            log::info!("Exited cleanly");
            Ok(())
        }
    }
}

/// `RUST_LOG` wins over the filter from config
fn init_logging(config: &Config) {
    let env = env_logger::Env::default().default_filter_or(config.debug.log_filter.as_str());
    env_logger::Builder::from_env(env).init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Window plus the GPU state drawn into it.
///
/// IMPORTANT: `graphics` is declared before `window` so the surface is gone
/// before the window it was created from.
struct App {
    config: Config,
    renderer: FrameRenderer,
    graphics: Option<Graphics>,
    window: Option<Window>,

    /// First fatal error; turned into the process exit status
    fatal: Option<anyhow::Error>,

    // FPS tracking
    frame_count: u32,
    last_fps_update: Instant,
    last_frame_time: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        let now = Instant::now();
        Self {
            renderer: FrameRenderer::new(&config.graphics),
            config,
            graphics: None,
            window: None,
            fatal: None,
            frame_count: 0,
            last_fps_update: now,
            last_frame_time: now,
        }
    }

    fn init_graphics(&self, window: &Window) -> Result<Graphics> {
        let size = window.inner_size();
        let extent = vk::Extent2D {
            width: size.width,
            height: size.height,
        };
        Graphics::new(window, extent, &self.config).context("Failed to initialize Vulkan")
    }

    /// Record the error, stop the loop and release the GPU objects right away
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
        self.graphics = None;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };

        match self.renderer.render_frame(graphics) {
            Ok(_) => self.update_fps(),
            Err(e) => {
                let kind = e.kind();
                let error = anyhow::Error::new(e)
                    .context(format!("{:?} failure after {} frames", kind, self.renderer.frames_rendered()));
                self.fail(event_loop, error);
            }
        }
    }

    // =========================================================================
    // FPS TRACKING
    // =========================================================================

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        // Refresh the title once per second
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;
            if let Some(window) = &self.window {
                window.set_title(&format!(
                    "{} - {:.0} FPS ({:.2}ms)",
                    self.config.window.title,
                    fps,
                    frame_time * 1000.0
                ));
            }
            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        // Fixed size: there is no swapchain recreation
        let attributes = Window::default_attributes()
            .with_title(&self.config.window.title)
            .with_inner_size(PhysicalSize::new(self.config.window.width, self.config.window.height))
            .with_resizable(false);

        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window"));
                return;
            }
        };

        match self.init_graphics(&window) {
            Ok(graphics) => self.graphics = Some(graphics),
            Err(e) => {
                self.fail(event_loop, e);
                return;
            }
        }

        log::info!("Vulkan initialized successfully!");
        self.last_fps_update = Instant::now();
        self.last_frame_time = self.last_fps_update;
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            // Framebuffers and viewport keep their creation size
            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}, ignored", size.width, size.height);
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    /// Request continuous redraws
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if event_loop.exiting() {
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Tear down while the window still exists
        if self.graphics.take().is_some() {
            log::info!("Cleanup complete after {} frames", self.renderer.frames_rendered());
        }
    }
}
