use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_VERTEX_SHADER: &str = include_str!("../assets/shaders/backdrop.vert.glsl");
const DEFAULT_FRAGMENT_SHADER: &str = include_str!("../assets/shaders/backdrop.frag.glsl");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GLSL vertex shader; the embedded one is used when unset.
    #[serde(default)]
    pub vertex_shader: Option<PathBuf>,

    #[serde(default)]
    pub fragment_shader: Option<PathBuf>,

    #[serde(default = "default_pointer_ease_ms")]
    pub pointer_ease_ms: u64,

    #[serde(default = "default_time_offset_ms")]
    pub time_offset_ms: u64,

    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: f32,

    #[serde(default)]
    pub scroll_limit: Option<f32>,

    #[serde(default = "default_layer")]
    pub layer: Layer,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    #[serde(default = "default_cursor_size")]
    pub cursor_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Background,
    Bottom,
    Top,
    Overlay,
}

#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            pointer_ease_ms: default_pointer_ease_ms(),
            time_offset_ms: default_time_offset_ms(),
            scroll_speed: default_scroll_speed(),
            scroll_limit: None,
            layer: default_layer(),
            namespace: default_namespace(),
            clear_color: default_clear_color(),
            cursor_size: default_cursor_size(),
        }
    }
}

fn default_pointer_ease_ms() -> u64 {
    300
}

fn default_time_offset_ms() -> u64 {
    6000
}

fn default_scroll_speed() -> f32 {
    1.0
}

fn default_layer() -> Layer {
    Layer::Background
}

fn default_namespace() -> String {
    "backdrop".to_string()
}

fn default_clear_color() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_cursor_size() -> u32 {
    24
}

impl Config {
    /// `$BACKDROP_CONFIG`, else `<config dir>/backdrop/config.toml`.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os("BACKDROP_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join("backdrop").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// A missing file means defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn pointer_ease(&self) -> Duration {
        Duration::from_millis(self.pointer_ease_ms)
    }

    pub fn time_offset(&self) -> Duration {
        Duration::from_millis(self.time_offset_ms)
    }

    pub fn shader_sources(&self) -> Result<ShaderSources> {
        Ok(ShaderSources {
            vertex: read_shader(self.vertex_shader.as_deref(), DEFAULT_VERTEX_SHADER)?,
            fragment: read_shader(self.fragment_shader.as_deref(), DEFAULT_FRAGMENT_SHADER)?,
        })
    }
}

fn read_shader(path: Option<&Path>, fallback: &str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shader {}", path.display())),
        None => Ok(fallback.to_string()),
    }
}
