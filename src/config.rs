use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::summary::DEFAULT_HIGHLIGHTS;

/// Top-level configuration for a phasetrace run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging verbosity (trace, debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Record layout of the phase files. Default: auto.
    #[serde(default)]
    pub schema: SchemaChoice,

    /// Extension phase files must carry. Default: "csv".
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Entries reported from each end of the sorted table. Default: 5.
    #[serde(default = "default_highlights")]
    pub highlights: usize,

    /// Fold phases on the rayon thread pool. Default: false.
    #[serde(default)]
    pub parallel: bool,

    /// Chart output configuration.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Schema selection. `Auto` reads the first phase file's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SchemaChoice {
    #[default]
    Auto,
    Stride,
    Proxy,
}

/// Chart output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Write the SVG chart. Default: true.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Chart file name, written inside the trace directory.
    /// Default: "alloc_trace.svg".
    #[serde(default = "default_render_file_name")]
    pub file_name: String,

    /// Upper bound on labelled x-axis ticks. Default: 32.
    #[serde(default = "default_max_tick_labels")]
    pub max_tick_labels: usize,

    /// Image width in pixels. Default: 1200.
    #[serde(default = "default_render_width")]
    pub width: u32,

    /// Image height in pixels. Default: 1000.
    #[serde(default = "default_render_height")]
    pub height: u32,
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_extension() -> String {
    "csv".to_string()
}

fn default_highlights() -> usize {
    DEFAULT_HIGHLIGHTS
}

fn default_true() -> bool {
    true
}

fn default_render_file_name() -> String {
    "alloc_trace.svg".to_string()
}

fn default_max_tick_labels() -> usize {
    32
}

fn default_render_width() -> u32 {
    1200
}

fn default_render_height() -> u32 {
    1000
}

// --- Default trait impls ---

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            schema: SchemaChoice::default(),
            extension: default_extension(),
            highlights: default_highlights(),
            parallel: false,
            render: RenderConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: default_render_file_name(),
            max_tick_labels: default_max_tick_labels(),
            width: default_render_width(),
            height: default_render_height(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            bail!("extension must not be empty");
        }

        if self.extension.starts_with('.') {
            bail!("extension must not start with '.': {}", self.extension);
        }

        if self.highlights == 0 {
            bail!("highlights must be positive");
        }

        let render = &self.render;
        if render.file_name.is_empty() {
            bail!("render.file_name must not be empty");
        }

        if render.file_name.contains(['/', '\\']) {
            bail!(
                "render.file_name must be a bare file name: {}",
                render.file_name
            );
        }

        if render.max_tick_labels == 0 {
            bail!("render.max_tick_labels must be positive");
        }

        if render.width == 0 || render.height == 0 {
            bail!("render.width and render.height must be positive");
        }

        Ok(())
    }
}
