/// Operating system module, just enough window to present into.
pub mod os;

/// Graphics module, shared types and the Direct3D 12 backend.
pub mod gfx;

/// Fence based CPU / GPU frame synchronisation.
pub mod sync;

/// Shader source loading and compilation.
pub mod shader;

/// CPU side image data for textures (procedural checkerboard, png, jpg, bmp, tga).
pub mod image;

/// Sample lifecycle (`init`, `tick`, `quit`) and the runner which drives it.
pub mod sample;

/// Use bitmask for flags
#[macro_use]
extern crate bitflags;

use serde::{Deserialize, Serialize};

/// Generic errors for modules to define their own
pub struct Error {
    pub msg: String,
}

/// Generic debug for errors
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for Error {}

// conversion for windows-rs win32 errors
#[cfg(target_os = "windows")]
impl From<windows::core::Error> for Error {
    fn from(err: windows::core::Error) -> Error {
        Error {
            msg: format!("{} ({:#010x})", err.message(), err.code().0),
        }
    }
}

// std errors
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error {
            msg: format!("dx12_samples:: io: {}", err)
        }
    }
}

// config errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error {
            msg: format!("dx12_samples:: config: {}", err)
        }
    }
}

/// Information to create a sample, which creates an app, window, device and swap chain.
/// Loaded from json with any missing fields taking their defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SampleInfo {
    /// name for the app and window title
    pub name: String,
    /// window rect {pos_x pos_y, width, height}
    pub window_rect: os::Rect<i32>,
    /// number of buffers in the swap chain (2 for double buffered, 3 for tripple etc)
    pub num_buffers: u32,
    /// minimum feature level the device must support
    pub feature_level: gfx::FeatureLevel,
    /// clear colour of the back buffer
    pub clear_colour: gfx::ClearColour,
    /// sync interval passed to present, 0 disables vsync
    pub sync_interval: u32,
    /// enables the d3d12 debug layer, defaults to on for debug builds
    pub debug_layer: bool,
    /// enables gpu based validation, only used when `debug_layer` is on
    pub gpu_based_validation: bool,
    /// directory containing the hlsl files
    pub shader_dir: String,
    /// shader files above this size in bytes are rejected
    pub max_shader_size: usize,
    /// size of the generated checkerboard texture
    pub texture_size: u32,
    /// optional image file to use instead of the checkerboard
    pub texture_file: Option<String>,
}

impl Default for SampleInfo {
    fn default() -> Self {
        SampleInfo {
            name: "dx12-samples".to_string(),
            window_rect: os::Rect {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            },
            num_buffers: 2,
            feature_level: gfx::FeatureLevel::Level12_0,
            clear_colour: gfx::ClearColour {
                r: 0.0,
                g: 0.2,
                b: 0.4,
                a: 1.0,
            },
            sync_interval: 1,
            debug_layer: cfg!(debug_assertions),
            gpu_based_validation: true,
            shader_dir: "shaders".to_string(),
            max_shader_size: shader::DEFAULT_MAX_SHADER_SIZE,
            texture_size: 256,
            texture_file: None,
        }
    }
}

impl SampleInfo {
    /// Loads sample info from a json file, a missing file gives the defaults with `name` applied.
    pub fn load(path: &std::path::Path, name: &str) -> Result<Self, Error> {
        if !path.exists() {
            tracing::info!("dx12_samples:: no config at {}, using defaults", path.display());
            return Ok(SampleInfo {
                name: name.to_string(),
                ..Default::default()
            });
        }
        let data = std::fs::read(path)?;
        let mut info: SampleInfo = serde_json::from_slice(&data)?;
        if info.name == SampleInfo::default().name {
            info.name = name.to_string();
        }
        info.validate()?;
        tracing::info!("dx12_samples:: loaded config from {}", path.display());
        Ok(info)
    }

    /// Loads sample info from the path passed as the first command line argument,
    /// or `<name>.json` in the working directory.
    pub fn from_args(name: &str) -> Result<Self, Error> {
        let path = std::env::args()
            .nth(1)
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from(format!("{}.json", name)));
        Self::load(&path, name)
    }

    /// Checks values which would otherwise fail deep inside device creation.
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_buffers < 2 || self.num_buffers > 16 {
            return Err(Error {
                msg: format!("dx12_samples:: num_buffers must be in 2..=16, got {}", self.num_buffers)
            });
        }
        if self.window_rect.width <= 0 || self.window_rect.height <= 0 {
            return Err(Error {
                msg: format!(
                    "dx12_samples:: window size must be positive, got {}x{}",
                    self.window_rect.width, self.window_rect.height)
            });
        }
        if self.texture_size < 8 {
            return Err(Error {
                msg: format!("dx12_samples:: texture_size must be at least 8, got {}", self.texture_size)
            });
        }
        Ok(())
    }

    /// Path of a shader file within `shader_dir`.
    pub fn shader_path(&self, file: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.shader_dir).join(file)
    }

    /// Width over height of the window, used to keep the geometry square.
    pub fn aspect(&self) -> f32 {
        self.window_rect.width as f32 / self.window_rect.height as f32
    }
}
