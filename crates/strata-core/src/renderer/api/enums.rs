// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Symbolic enums for pipeline configuration.
//!
//! Every enum here is fieldless so that translation tables can index a fixed array
//! with `value as usize`. The `COUNT` constant of each enum sizes those arrays.

/// A factor in a blend equation, determining how much a source or destination color contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    /// The factor is `0.0`.
    Zero,
    /// The factor is `1.0`.
    #[default]
    One,
    /// The factor is the source color.
    SrcColor,
    /// The factor is `1.0 - src.rgb`.
    OneMinusSrcColor,
    /// The factor is the destination color.
    DstColor,
    /// The factor is `1.0 - dst.rgb`.
    OneMinusDstColor,
    /// The factor is the source alpha component (`src.a`).
    SrcAlpha,
    /// The factor is `min(src.a, 1.0 - dst.a)`.
    SrcAlphaSaturate,
    /// The factor is `1.0 - src.a`.
    OneMinusSrcAlpha,
    /// The factor is the destination alpha component (`dst.a`).
    DstAlpha,
    /// The factor is `1.0 - dst.a`.
    OneMinusDstAlpha,
    /// The factor is the constant blend color.
    ConstantColor,
    /// The factor is `1.0 - constant`.
    OneMinusConstantColor,
}

impl BlendFactor {
    /// Number of variants.
    pub const COUNT: usize = 13;
}

/// The operation used to combine source and destination colors in a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// The result is `source + destination`.
    #[default]
    Add,
    /// The result is `source - destination`.
    Subtract,
    /// The result is `destination - source`.
    ReverseSubtract,
    /// The result is `min(source, destination)`.
    Min,
    /// The result is `max(source, destination)`.
    Max,
}

impl BlendOperation {
    /// Number of variants.
    pub const COUNT: usize = 5;
}

/// The comparison function used for depth and stencil testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// The test passes if the new value is less than the existing value.
    #[default]
    Less,
    /// The test passes if the new value is equal to the existing value.
    Equal,
    /// The test passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// The test passes if the new value is greater than the existing value.
    Greater,
    /// The test passes if the new value is not equal to the existing value.
    NotEqual,
    /// The test passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    Always,
}

impl CompareFunction {
    /// Number of variants.
    pub const COUNT: usize = 8;
}

/// An operation to perform on a stencil buffer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the existing stencil value.
    #[default]
    Keep,
    /// Set the stencil value to 0.
    Zero,
    /// Replace the stencil value with the reference value.
    Replace,
    /// Increment the stencil value, clamping at the maximum value.
    IncrementClamp,
    /// Increment the stencil value, wrapping to 0 on overflow.
    IncrementWrap,
    /// Decrement the stencil value, clamping at 0.
    DecrementClamp,
    /// Decrement the stencil value, wrapping to the maximum value on underflow.
    DecrementWrap,
    /// Bitwise invert the stencil value.
    Invert,
}

impl StencilOperation {
    /// Number of variants.
    pub const COUNT: usize = 8;
}

/// Defines which faces of a triangle to cull (not render).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling is performed.
    None,
    /// Cull back-facing triangles.
    #[default]
    Back,
    /// Cull front-facing triangles.
    Front,
    /// Cull both faces; only points and lines are drawn.
    FrontAndBack,
}

impl CullMode {
    /// Number of variants.
    pub const COUNT: usize = 4;
}

/// Defines how vertices are connected to form a geometric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Vertices are rendered as a list of isolated points.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a closed line loop.
    LineLoop,
    /// Vertices form a connected line strip.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected triangle strip.
    TriangleStrip,
    /// Vertices form a triangle fan around the first vertex.
    TriangleFan,
}

impl PrimitiveTopology {
    /// Number of variants.
    pub const COUNT: usize = 7;
}

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Coordinates wrap around.
    #[default]
    Repeat,
    /// Coordinates are clamped to the edge texel.
    ClampToEdge,
    /// Coordinates wrap around, mirrored on every repetition.
    MirrorRepeat,
}

impl AddressMode {
    /// Number of variants.
    pub const COUNT: usize = 3;
}

/// Texture minification/magnification filter.
///
/// The mipmap variants are only meaningful for minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Bilinear filtering.
    #[default]
    Linear,
    /// Nearest texel of the nearest mip level.
    NearestMipmapNearest,
    /// Nearest texel, blended between two mip levels.
    NearestMipmapLinear,
    /// Bilinear filtering of the nearest mip level.
    LinearMipmapNearest,
    /// Trilinear filtering.
    LinearMipmapLinear,
}

impl FilterMode {
    /// Number of variants.
    pub const COUNT: usize = 6;

    /// Returns `true` if this filter samples from mip levels.
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, FilterMode::Nearest | FilterMode::Linear)
    }
}

/// The binding target kind of a texture.
///
/// A texture unit has an independent binding slot for each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    /// A 2D texture.
    #[default]
    D2,
    /// A cube map with six 2D faces.
    Cube,
    /// A volume texture. Only available on the modern tier.
    D3,
}

impl TextureTarget {
    /// Number of variants.
    pub const COUNT: usize = 3;

    /// Number of faces uploaded for this target.
    pub fn face_count(&self) -> usize {
        match self {
            TextureTarget::Cube => 6,
            TextureTarget::D2 | TextureTarget::D3 => 1,
        }
    }
}

/// The data type of the elements of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 8-bit unsigned indices.
    Uint8,
    /// 16-bit unsigned indices.
    #[default]
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

impl IndexFormat {
    /// Number of variants.
    pub const COUNT: usize = 3;

    /// The size in bytes of a single index.
    pub fn bytes_per_index(&self) -> u32 {
        match self {
            IndexFormat::Uint8 => 1,
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Expected update frequency of a buffer's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten occasionally.
    Dynamic,
    /// Rewritten every frame.
    Stream,
    /// Written by the GPU (transform feedback), read by the GPU.
    GpuDynamic,
}

impl BufferUsage {
    /// Number of variants.
    pub const COUNT: usize = 4;
}

/// The pixel format of a texture or renderbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    #[default]
    Rgba8,
    /// 16-bit floating point RGBA.
    Rgba16F,
    /// 32-bit floating point RGBA.
    Rgba32F,
    /// Single 32-bit floating point channel. Modern tier only.
    R32F,
    /// Depth only.
    Depth,
    /// Packed depth and stencil.
    DepthStencil,
}

impl PixelFormat {
    /// Number of variants.
    pub const COUNT: usize = 7;

    /// Returns `true` for depth and depth/stencil formats.
    pub fn is_depth(&self) -> bool {
        matches!(self, PixelFormat::Depth | PixelFormat::DepthStencil)
    }

    /// Returns `true` for floating point color formats.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            PixelFormat::Rgba16F | PixelFormat::Rgba32F | PixelFormat::R32F
        )
    }

    /// Bytes per pixel of tightly packed level-0 data.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgba16F => 8,
            PixelFormat::Rgba32F => 16,
            PixelFormat::R32F => 4,
            PixelFormat::Depth => 4,
            PixelFormat::DepthStencil => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_match_last_discriminant() {
        assert_eq!(BlendFactor::OneMinusConstantColor as usize + 1, BlendFactor::COUNT);
        assert_eq!(BlendOperation::Max as usize + 1, BlendOperation::COUNT);
        assert_eq!(CompareFunction::Always as usize + 1, CompareFunction::COUNT);
        assert_eq!(StencilOperation::Invert as usize + 1, StencilOperation::COUNT);
        assert_eq!(CullMode::FrontAndBack as usize + 1, CullMode::COUNT);
        assert_eq!(PrimitiveTopology::TriangleFan as usize + 1, PrimitiveTopology::COUNT);
        assert_eq!(AddressMode::MirrorRepeat as usize + 1, AddressMode::COUNT);
        assert_eq!(FilterMode::LinearMipmapLinear as usize + 1, FilterMode::COUNT);
        assert_eq!(TextureTarget::D3 as usize + 1, TextureTarget::COUNT);
        assert_eq!(IndexFormat::Uint32 as usize + 1, IndexFormat::COUNT);
        assert_eq!(BufferUsage::GpuDynamic as usize + 1, BufferUsage::COUNT);
        assert_eq!(PixelFormat::DepthStencil as usize + 1, PixelFormat::COUNT);
    }

    #[test]
    fn index_sizes() {
        assert_eq!(IndexFormat::Uint8.bytes_per_index(), 1);
        assert_eq!(IndexFormat::Uint16.bytes_per_index(), 2);
        assert_eq!(IndexFormat::Uint32.bytes_per_index(), 4);
    }

    #[test]
    fn mipmap_filters() {
        assert!(!FilterMode::Linear.uses_mipmaps());
        assert!(FilterMode::LinearMipmapLinear.uses_mipmaps());
    }
}
