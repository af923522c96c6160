/// Implements this interface with a Direct3D12 backend.
#[cfg(target_os = "windows")]
pub mod d3d12;

use serde::{Deserialize, Serialize};
use crate::os;

/// Structure to specify viewport coordinates on a `CmdBuf`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Top left x coordinate.
    pub x: f32,
    /// Top left y coordinate.
    pub y: f32,
    /// Width of the viewport rectangle.
    pub width: f32,
    /// Height of the viewport rectangle (Y is down).
    pub height: f32,
    /// Minimum depth of the viewport. Ranges between 0 and 1.
    pub min_depth: f32,
    /// Maximum depth of the viewport. Ranges between 0 and 1.
    pub max_depth: f32,
}

/// Structure to specify scissor rect coordinates on a `CmdBuf`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScissorRect {
    /// Left x coordinate.
    pub left: i32,
    /// Top y coordinate.
    pub top: i32,
    /// Right x coordinate.
    pub right: i32,
    /// Bottom y coordinate.
    pub bottom: i32,
}

/// Colour the back buffer is cleared to at the start of each frame.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct ClearColour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColour {
    pub fn as_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Minimum hardware feature level a device is created with.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FeatureLevel {
    Level11_0,
    Level11_1,
    Level12_0,
    Level12_1,
}

/// Version used to serialise a root signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RootSignatureVersion {
    Version1_0,
    Version1_1,
}

impl RootSignatureVersion {
    /// Picks the version to serialise with from the result of a feature query,
    /// a failed query falls back to 1.0 which every device supports.
    pub fn select<E>(highest_supported: Result<RootSignatureVersion, E>) -> RootSignatureVersion {
        highest_supported.unwrap_or(RootSignatureVersion::Version1_0)
    }
}

bitflags! {
    /// Device creation flags.
    pub struct DeviceFlags: u8 {
        /// Enable the d3d12 debug layer, must happen before the device is created.
        const DEBUG_LAYER = 1 << 0;
        /// Enable gpu based validation, requires `DEBUG_LAYER`.
        const GPU_BASED_VALIDATION = 1 << 1;
    }
}

/// Information to create a device.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// Minimum feature level an adapter must support to be selected.
    pub feature_level: FeatureLevel,
    pub flags: DeviceFlags,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        DeviceInfo {
            feature_level: FeatureLevel::Level12_0,
            flags: DeviceFlags::empty(),
        }
    }
}

impl From<&crate::SampleInfo> for DeviceInfo {
    fn from(info: &crate::SampleInfo) -> Self {
        let mut flags = DeviceFlags::empty();
        if info.debug_layer {
            flags |= DeviceFlags::DEBUG_LAYER;
            if info.gpu_based_validation {
                flags |= DeviceFlags::GPU_BASED_VALIDATION;
            }
        }
        DeviceInfo {
            feature_level: info.feature_level,
            flags,
        }
    }
}

/// Information to create a swap chain.
#[derive(Copy, Clone, Debug)]
pub struct SwapChainInfo {
    /// Number of back buffers, 2 for double buffered, 3 for tripple.
    pub num_buffers: u32,
    /// Back buffer size in pixels.
    pub width: u32,
    pub height: u32,
    pub clear_colour: ClearColour,
}

/// Information about the adapter a device was created on.
#[derive(Clone, Debug)]
pub struct AdapterInfo {
    pub name: String,
    pub dedicated_video_memory: usize,
    pub feature_level: FeatureLevel,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} MB, {:?})", self.name, self.dedicated_video_memory / (1024 * 1024), self.feature_level)
    }
}

/// Texture and vertex element formats used by the samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Unknown,
    RGBA8n,
    RG32f,
    RGB32f,
    RGBA32f,
    R32u,
}

impl Format {
    /// Size of one element in bytes, 0 for `Unknown`.
    pub fn size_bytes(&self) -> usize {
        match self {
            Format::Unknown => 0,
            Format::RGBA8n => 4,
            Format::RG32f => 8,
            Format::RGB32f => 12,
            Format::RGBA32f => 16,
            Format::R32u => 4,
        }
    }
}

/// Describes one element of a vertex in an input layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputElementInfo {
    pub semantic: String,
    pub index: u32,
    pub format: Format,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
}

impl InputElementInfo {
    fn per_vertex(semantic: &str, format: Format, aligned_byte_offset: u32) -> Self {
        InputElementInfo {
            semantic: semantic.to_string(),
            index: 0,
            format,
            input_slot: 0,
            aligned_byte_offset,
        }
    }
}

/// Input layout matching `ColourVertex`.
pub fn colour_vertex_layout() -> Vec<InputElementInfo> {
    vec![
        InputElementInfo::per_vertex("POSITION", Format::RGB32f, 0),
        InputElementInfo::per_vertex("COLOR", Format::RGBA32f, 12),
    ]
}

/// Input layout matching `TexturedVertex`.
pub fn textured_vertex_layout() -> Vec<InputElementInfo> {
    vec![
        InputElementInfo::per_vertex("POSITION", Format::RGB32f, 0),
        InputElementInfo::per_vertex("COLOR", Format::RGBA32f, 12),
        InputElementInfo::per_vertex("TEXCOORD", Format::RG32f, 28),
    ]
}

/// Describes how a buffer will be bound.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// Information to create an upload heap buffer.
#[derive(Copy, Clone, Debug)]
pub struct BufferInfo {
    pub usage: BufferUsage,
    /// Size of one vertex, or of one index (2 or 4).
    pub stride: usize,
}

/// Root signature layouts the samples use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RootSignatureInfo {
    /// No parameters, input assembler only.
    Empty,
    /// One shader resource view table at t0 and a static point sampler at s0.
    SingleTexture,
}

/// Vertex with a position and colour, used by the triangle.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColourVertex {
    pub position: [f32; 3],
    pub colour: [f32; 4],
}

/// Vertex with a position, colour and texture coordinate, used by the textured quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub colour: [f32; 4],
    pub uv: [f32; 2],
}

/// Indices for the two triangles of `quad_vertices`.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// A red, green, blue triangle covering a quarter of the screen, y scaled by `aspect` to stay square.
pub fn triangle_vertices(aspect: f32) -> [ColourVertex; 3] {
    [
        ColourVertex {
            position: [0.0, 0.25 * aspect, 0.0],
            colour: [1.0, 0.0, 0.0, 1.0],
        },
        ColourVertex {
            position: [0.25, -0.25 * aspect, 0.0],
            colour: [0.0, 1.0, 0.0, 1.0],
        },
        ColourVertex {
            position: [-0.25, -0.25 * aspect, 0.0],
            colour: [0.0, 0.0, 1.0, 1.0],
        },
    ]
}

/// A quad with corners top left, top right, bottom right, bottom left, y scaled by `aspect`.
pub fn quad_vertices(aspect: f32) -> [TexturedVertex; 4] {
    [
        TexturedVertex {
            position: [-0.25, 0.25 * aspect, 0.0],
            colour: [1.0, 0.0, 0.0, 1.0],
            uv: [0.0, 1.0],
        },
        TexturedVertex {
            position: [0.25, 0.25 * aspect, 0.0],
            colour: [0.0, 1.0, 0.0, 1.0],
            uv: [1.0, 1.0],
        },
        TexturedVertex {
            position: [0.25, -0.25 * aspect, 0.0],
            colour: [0.0, 0.0, 1.0, 1.0],
            uv: [1.0, 0.0],
        },
        TexturedVertex {
            position: [-0.25, -0.25 * aspect, 0.0],
            colour: [1.0, 1.0, 0.0, 1.0],
            uv: [0.0, 0.0],
        },
    ]
}

impl From<os::Rect<i32>> for Viewport {
    fn from(rect: os::Rect<i32>) -> Viewport {
        Viewport {
            x: rect.x as f32,
            y: rect.y as f32,
            width: rect.width as f32,
            height: rect.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl From<os::Rect<i32>> for ScissorRect {
    fn from(rect: os::Rect<i32>) -> ScissorRect {
        ScissorRect {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width,
            bottom: rect.y + rect.height,
        }
    }
}

/// Take any sized type and return a u8 slice. This can be useful to pass vertex or index `data` to `Device::create_buffer`.
pub fn as_u8_slice<T: Sized>(p: &T) -> &[u8] {
    unsafe {
        ::std::slice::from_raw_parts(
            (p as *const T) as *const u8,
            ::std::mem::size_of::<T>(),
        )
    }
}
