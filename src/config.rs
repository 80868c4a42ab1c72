// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every value the renderer needs is read once here and handed explicitly to
// the constructors that use it. Missing file or missing keys fall back to
// defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub instance: InstanceConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

/// Window settings. The drawable size is fixed for the process lifetime.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Triangle".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Names reported to the Vulkan driver
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub application_name: String,
    pub engine_name: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: "Vulkan Triangle".to_string(),
            engine_name: "Dummy Engine".to_string(),
        }
    }
}

/// Graphics settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Requested swapchain image count
    pub buffering_count: u32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub clear_color: [f32; 4],
    pub acquire_timeout_ns: u64,
    pub fence_timeout_ns: u64,
    /// Preferred present mode; `None` takes the first one the surface reports
    pub present_mode: Option<String>,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            buffering_count: 3,
            vertex_shader: PathBuf::from("shaders/triangle.vert.spv"),
            fragment_shader: PathBuf::from("shaders/triangle.frag.spv"),
            clear_color: [0.0, 0.0, 0.0, 0.0],
            acquire_timeout_ns: 0,
            fence_timeout_ns: 1_000_000_000,
            present_mode: None,
        }
    }
}

impl GraphicsConfig {
    /// Get the preferred present mode as Vulkan enum
    pub fn preferred_present_mode(&self) -> Option<ash::vk::PresentModeKHR> {
        let mode = self.present_mode.as_deref()?;
        match mode.to_lowercase().as_str() {
            "immediate" => Some(ash::vk::PresentModeKHR::IMMEDIATE),
            "mailbox" => Some(ash::vk::PresentModeKHR::MAILBOX),
            "fifo" => Some(ash::vk::PresentModeKHR::FIFO),
            "fifo_relaxed" => Some(ash::vk::PresentModeKHR::FIFO_RELAXED),
            _ => {
                log::warn!("Unknown present mode '{}', using the first supported one", mode);
                None
            }
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Register the validation callback (debug builds only)
    pub validation_layers: bool,
    pub show_fps: bool,
    /// Default `env_logger` filter, `RUST_LOG` takes precedence
    pub log_filter: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            show_fps: true,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory.
    ///
    /// Runs before the logger exists, so a broken file is reported through the
    /// error instead of a log line. The caller decides whether to fall back.
    pub fn load() -> Result<Self> {
        Self::load_from_path(CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // A missing file is not an error, every key has a default
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            anyhow::bail!(
                "window size must be non-zero, got {}x{}",
                self.window.width,
                self.window.height
            );
        }
        if self.graphics.buffering_count == 0 {
            anyhow::bail!("graphics.buffering_count must be at least 1");
        }
        if self.graphics.fence_timeout_ns == 0 {
            anyhow::bail!("graphics.fence_timeout_ns must be non-zero");
        }
        Ok(())
    }

    /// Diagnostics are only ever registered in debug builds
    pub fn diagnostics_enabled(&self) -> bool {
        cfg!(debug_assertions) && self.debug.validation_layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.graphics.buffering_count, 3);
        assert_eq!(config.graphics.acquire_timeout_ns, 0);
        assert_eq!(config.graphics.fence_timeout_ns, 1_000_000_000);
        assert_eq!(config.graphics.vertex_shader, PathBuf::from("shaders/triangle.vert.spv"));
        assert_eq!(config.graphics.fragment_shader, PathBuf::from("shaders/triangle.frag.spv"));
        assert_eq!(config.graphics.clear_color, [0.0; 4]);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::parse(
            r#"
            [window]
            width = 1024

            [instance]
            engine_name = "Test Engine"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.instance.engine_name, "Test Engine");
        assert_eq!(config.instance.application_name, "Vulkan Triangle");
    }

    #[test]
    fn zero_buffering_count_is_rejected() {
        let err = Config::parse("[graphics]\nbuffering_count = 0").unwrap_err();
        assert!(format!("{:#}", err).contains("buffering_count"));
    }

    #[test]
    fn zero_extent_is_rejected() {
        assert!(Config::parse("[window]\nheight = 0").is_err());
    }

    #[test]
    fn present_mode_override_parses_case_insensitively() {
        let config = Config::parse("[graphics]\npresent_mode = \"Mailbox\"").unwrap();
        assert_eq!(
            config.graphics.preferred_present_mode(),
            Some(ash::vk::PresentModeKHR::MAILBOX)
        );

        let config = Config::parse("[graphics]\npresent_mode = \"vsync-please\"").unwrap();
        assert_eq!(config.graphics.preferred_present_mode(), None);
    }

    #[test]
    fn invalid_file_is_an_error_not_defaults() {
        let path = std::env::temp_dir().join(format!("triangle-renderer-{}-zero-width.toml", std::process::id()));
        std::fs::write(&path, "[window]\nwidth = 0\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Invalid config file"), "{}", message);
        assert!(message.contains("window size must be non-zero"), "{}", message);

        std::fs::write(&path, "[window\nwidth = 1024\n").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.graphics.buffering_count, 3);
    }
}
