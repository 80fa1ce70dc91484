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

//! Translation of the symbolic pipeline enums into native GL tokens.
//!
//! The per-variant mappings live in [`IntoGl`] impls. [`EnumTables`] flattens them
//! into fixed arrays once per context generation, resolving the few tokens that
//! depend on the tier, so the hot paths translate with a single index.

use std::collections::HashMap;

use strata_core::renderer::api::{
    AddressMode, BlendFactor, BlendOperation, BufferUsage, ClearFlags, CompareFunction,
    ContextTier, CullMode, FilterMode, IndexFormat, PixelFormat, PrimitiveTopology,
    StencilOperation, TextureTarget, UniformType, VertexDataType,
};

/// `EXT_texture_filter_anisotropic` texture parameter.
pub const TEXTURE_MAX_ANISOTROPY_EXT: u32 = 0x84FE;
/// `EXT_texture_filter_anisotropic` limit query.
pub const MAX_TEXTURE_MAX_ANISOTROPY_EXT: u32 = 0x84FF;
/// `OES_texture_half_float` pixel type. Differs from the core `HALF_FLOAT` token.
pub const HALF_FLOAT_OES: u32 = 0x8D61;

/// A local extension trait converting engine enums into native GL tokens.
pub trait IntoGl {
    /// Returns the native token.
    fn into_gl(self) -> u32;
}

impl IntoGl for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            BlendFactor::Zero => glow::ZERO,
            BlendFactor::One => glow::ONE,
            BlendFactor::SrcColor => glow::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            BlendFactor::DstColor => glow::DST_COLOR,
            BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
            BlendFactor::SrcAlpha => glow::SRC_ALPHA,
            BlendFactor::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
            BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstAlpha => glow::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
            BlendFactor::ConstantColor => glow::CONSTANT_COLOR,
            BlendFactor::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
        }
    }
}

impl IntoGl for BlendOperation {
    fn into_gl(self) -> u32 {
        match self {
            BlendOperation::Add => glow::FUNC_ADD,
            BlendOperation::Subtract => glow::FUNC_SUBTRACT,
            BlendOperation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
            // Same values as the EXT_blend_minmax tokens.
            BlendOperation::Min => glow::MIN,
            BlendOperation::Max => glow::MAX,
        }
    }
}

impl IntoGl for CompareFunction {
    fn into_gl(self) -> u32 {
        match self {
            CompareFunction::Never => glow::NEVER,
            CompareFunction::Less => glow::LESS,
            CompareFunction::Equal => glow::EQUAL,
            CompareFunction::LessEqual => glow::LEQUAL,
            CompareFunction::Greater => glow::GREATER,
            CompareFunction::NotEqual => glow::NOTEQUAL,
            CompareFunction::GreaterEqual => glow::GEQUAL,
            CompareFunction::Always => glow::ALWAYS,
        }
    }
}

impl IntoGl for StencilOperation {
    fn into_gl(self) -> u32 {
        match self {
            StencilOperation::Keep => glow::KEEP,
            StencilOperation::Zero => glow::ZERO,
            StencilOperation::Replace => glow::REPLACE,
            StencilOperation::IncrementClamp => glow::INCR,
            StencilOperation::IncrementWrap => glow::INCR_WRAP,
            StencilOperation::DecrementClamp => glow::DECR,
            StencilOperation::DecrementWrap => glow::DECR_WRAP,
            StencilOperation::Invert => glow::INVERT,
        }
    }
}

impl IntoGl for CullMode {
    fn into_gl(self) -> u32 {
        match self {
            // Never passed to the native cull-face call.
            CullMode::None => 0,
            CullMode::Back => glow::BACK,
            CullMode::Front => glow::FRONT,
            CullMode::FrontAndBack => glow::FRONT_AND_BACK,
        }
    }
}

impl IntoGl for PrimitiveTopology {
    fn into_gl(self) -> u32 {
        match self {
            PrimitiveTopology::PointList => glow::POINTS,
            PrimitiveTopology::LineList => glow::LINES,
            PrimitiveTopology::LineLoop => glow::LINE_LOOP,
            PrimitiveTopology::LineStrip => glow::LINE_STRIP,
            PrimitiveTopology::TriangleList => glow::TRIANGLES,
            PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
            PrimitiveTopology::TriangleFan => glow::TRIANGLE_FAN,
        }
    }
}

impl IntoGl for AddressMode {
    fn into_gl(self) -> u32 {
        match self {
            AddressMode::Repeat => glow::REPEAT,
            AddressMode::ClampToEdge => glow::CLAMP_TO_EDGE,
            AddressMode::MirrorRepeat => glow::MIRRORED_REPEAT,
        }
    }
}

impl IntoGl for FilterMode {
    fn into_gl(self) -> u32 {
        match self {
            FilterMode::Nearest => glow::NEAREST,
            FilterMode::Linear => glow::LINEAR,
            FilterMode::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            FilterMode::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            FilterMode::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
            FilterMode::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }
}

impl IntoGl for TextureTarget {
    fn into_gl(self) -> u32 {
        match self {
            TextureTarget::D2 => glow::TEXTURE_2D,
            TextureTarget::Cube => glow::TEXTURE_CUBE_MAP,
            TextureTarget::D3 => glow::TEXTURE_3D,
        }
    }
}

impl IntoGl for IndexFormat {
    fn into_gl(self) -> u32 {
        match self {
            IndexFormat::Uint8 => glow::UNSIGNED_BYTE,
            IndexFormat::Uint16 => glow::UNSIGNED_SHORT,
            IndexFormat::Uint32 => glow::UNSIGNED_INT,
        }
    }
}

impl IntoGl for VertexDataType {
    fn into_gl(self) -> u32 {
        match self {
            VertexDataType::Int8 => glow::BYTE,
            VertexDataType::Uint8 => glow::UNSIGNED_BYTE,
            VertexDataType::Int16 => glow::SHORT,
            VertexDataType::Uint16 => glow::UNSIGNED_SHORT,
            VertexDataType::Int32 => glow::INT,
            VertexDataType::Uint32 => glow::UNSIGNED_INT,
            VertexDataType::Float32 => glow::FLOAT,
            VertexDataType::Float16 => glow::HALF_FLOAT,
        }
    }
}

impl IntoGl for ClearFlags {
    fn into_gl(self) -> u32 {
        let mut mask = 0;
        if self.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if self.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if self.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        mask
    }
}

/// The native description of a pixel format on a given tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelTokens {
    /// Internal format passed to `tex_image_*`.
    pub internal_format: u32,
    /// Client data format.
    pub format: u32,
    /// Client data type.
    pub ty: u32,
    /// Internal format for renderbuffer storage. Legacy float formats have none.
    pub renderbuffer_format: u32,
}

fn pixel_tokens(format: PixelFormat, tier: ContextTier) -> PixelTokens {
    let modern = tier.is_modern();
    let (internal_format, fmt, ty, renderbuffer_format) = match format {
        PixelFormat::Rgb8 => (
            if modern { glow::RGB8 } else { glow::RGB },
            glow::RGB,
            glow::UNSIGNED_BYTE,
            if modern { glow::RGB8 } else { glow::RGB565 },
        ),
        PixelFormat::Rgba8 => (
            if modern { glow::RGBA8 } else { glow::RGBA },
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            if modern { glow::RGBA8 } else { glow::RGBA4 },
        ),
        PixelFormat::Rgba16F => (
            if modern { glow::RGBA16F } else { glow::RGBA },
            glow::RGBA,
            if modern { glow::HALF_FLOAT } else { HALF_FLOAT_OES },
            if modern { glow::RGBA16F } else { 0 },
        ),
        PixelFormat::Rgba32F => (
            if modern { glow::RGBA32F } else { glow::RGBA },
            glow::RGBA,
            glow::FLOAT,
            if modern { glow::RGBA32F } else { 0 },
        ),
        PixelFormat::R32F => (
            if modern { glow::R32F } else { glow::LUMINANCE },
            if modern { glow::RED } else { glow::LUMINANCE },
            glow::FLOAT,
            if modern { glow::R32F } else { 0 },
        ),
        PixelFormat::Depth => (
            if modern {
                glow::DEPTH_COMPONENT32F
            } else {
                glow::DEPTH_COMPONENT
            },
            glow::DEPTH_COMPONENT,
            if modern { glow::FLOAT } else { glow::UNSIGNED_SHORT },
            if modern {
                glow::DEPTH_COMPONENT32F
            } else {
                glow::DEPTH_COMPONENT16
            },
        ),
        PixelFormat::DepthStencil => (
            if modern {
                glow::DEPTH24_STENCIL8
            } else {
                glow::DEPTH_STENCIL
            },
            glow::DEPTH_STENCIL,
            glow::UNSIGNED_INT_24_8,
            if modern {
                glow::DEPTH24_STENCIL8
            } else {
                glow::DEPTH_STENCIL
            },
        ),
    };
    PixelTokens {
        internal_format,
        format: fmt,
        ty,
        renderbuffer_format,
    }
}

fn buffer_usage(usage: BufferUsage, tier: ContextTier) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Stream => glow::STREAM_DRAW,
        BufferUsage::GpuDynamic if tier.is_modern() => glow::DYNAMIC_COPY,
        BufferUsage::GpuDynamic => glow::DYNAMIC_DRAW,
    }
}

fn build<T: Copy + IntoGl, const N: usize>(variants: [T; N]) -> [u32; N] {
    variants.map(T::into_gl)
}

/// Native token lookup tables for one context generation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumTables {
    tier: ContextTier,
    blend_factor: [u32; BlendFactor::COUNT],
    blend_equation: [u32; BlendOperation::COUNT],
    compare: [u32; CompareFunction::COUNT],
    stencil_op: [u32; StencilOperation::COUNT],
    cull_face: [u32; CullMode::COUNT],
    primitive: [u32; PrimitiveTopology::COUNT],
    address: [u32; AddressMode::COUNT],
    filter: [u32; FilterMode::COUNT],
    texture_target: [u32; TextureTarget::COUNT],
    index_type: [u32; IndexFormat::COUNT],
    vertex_type: [u32; VertexDataType::COUNT],
    usage: [u32; BufferUsage::COUNT],
    pixel: [PixelTokens; PixelFormat::COUNT],
    uniform_types: HashMap<u32, UniformType>,
}

impl EnumTables {
    /// Builds the tables for a context of the given tier.
    pub fn new(tier: ContextTier) -> Self {
        use strata_core::renderer::api::{
            AddressMode as A, BlendFactor as F, BlendOperation as O, CompareFunction as C,
            CullMode as M, FilterMode as Fm, PrimitiveTopology as P, StencilOperation as S,
        };

        let blend_factor = build([
            F::Zero,
            F::One,
            F::SrcColor,
            F::OneMinusSrcColor,
            F::DstColor,
            F::OneMinusDstColor,
            F::SrcAlpha,
            F::SrcAlphaSaturate,
            F::OneMinusSrcAlpha,
            F::DstAlpha,
            F::OneMinusDstAlpha,
            F::ConstantColor,
            F::OneMinusConstantColor,
        ]);
        let blend_equation = build([O::Add, O::Subtract, O::ReverseSubtract, O::Min, O::Max]);
        let compare = build([
            C::Never,
            C::Less,
            C::Equal,
            C::LessEqual,
            C::Greater,
            C::NotEqual,
            C::GreaterEqual,
            C::Always,
        ]);
        let stencil_op = build([
            S::Keep,
            S::Zero,
            S::Replace,
            S::IncrementClamp,
            S::IncrementWrap,
            S::DecrementClamp,
            S::DecrementWrap,
            S::Invert,
        ]);
        let cull_face = build([M::None, M::Back, M::Front, M::FrontAndBack]);
        let primitive = build([
            P::PointList,
            P::LineList,
            P::LineLoop,
            P::LineStrip,
            P::TriangleList,
            P::TriangleStrip,
            P::TriangleFan,
        ]);
        let address = build([A::Repeat, A::ClampToEdge, A::MirrorRepeat]);
        let filter = build([
            Fm::Nearest,
            Fm::Linear,
            Fm::NearestMipmapNearest,
            Fm::NearestMipmapLinear,
            Fm::LinearMipmapNearest,
            Fm::LinearMipmapLinear,
        ]);
        let texture_target = build([TextureTarget::D2, TextureTarget::Cube, TextureTarget::D3]);
        let index_type = build([IndexFormat::Uint8, IndexFormat::Uint16, IndexFormat::Uint32]);
        let mut vertex_type = build([
            VertexDataType::Int8,
            VertexDataType::Uint8,
            VertexDataType::Int16,
            VertexDataType::Uint16,
            VertexDataType::Int32,
            VertexDataType::Uint32,
            VertexDataType::Float32,
            VertexDataType::Float16,
        ]);
        if !tier.is_modern() {
            vertex_type[VertexDataType::Float16 as usize] = HALF_FLOAT_OES;
        }
        let usage = [
            BufferUsage::Static,
            BufferUsage::Dynamic,
            BufferUsage::Stream,
            BufferUsage::GpuDynamic,
        ]
        .map(|usage| buffer_usage(usage, tier));
        let pixel = [
            PixelFormat::Rgb8,
            PixelFormat::Rgba8,
            PixelFormat::Rgba16F,
            PixelFormat::Rgba32F,
            PixelFormat::R32F,
            PixelFormat::Depth,
            PixelFormat::DepthStencil,
        ]
        .map(|format| pixel_tokens(format, tier));

        Self {
            tier,
            blend_factor,
            blend_equation,
            compare,
            stencil_op,
            cull_face,
            primitive,
            address,
            filter,
            texture_target,
            index_type,
            vertex_type,
            usage,
            pixel,
            uniform_types: uniform_type_map(tier),
        }
    }

    /// The tier the tables were built for.
    pub fn tier(&self) -> ContextTier {
        self.tier
    }

    /// Native blend factor.
    #[inline]
    pub fn blend_factor(&self, factor: BlendFactor) -> u32 {
        self.blend_factor[factor as usize]
    }

    /// Native blend equation.
    #[inline]
    pub fn blend_equation(&self, op: BlendOperation) -> u32 {
        self.blend_equation[op as usize]
    }

    /// Native comparison function.
    #[inline]
    pub fn compare(&self, func: CompareFunction) -> u32 {
        self.compare[func as usize]
    }

    /// Native stencil operation.
    #[inline]
    pub fn stencil_op(&self, op: StencilOperation) -> u32 {
        self.stencil_op[op as usize]
    }

    /// Native cull face. `CullMode::None` has no face and maps to 0.
    #[inline]
    pub fn cull_face(&self, mode: CullMode) -> u32 {
        self.cull_face[mode as usize]
    }

    /// Native primitive mode.
    #[inline]
    pub fn primitive(&self, topology: PrimitiveTopology) -> u32 {
        self.primitive[topology as usize]
    }

    /// Native wrap mode.
    #[inline]
    pub fn address(&self, mode: AddressMode) -> u32 {
        self.address[mode as usize]
    }

    /// Native filter.
    #[inline]
    pub fn filter(&self, mode: FilterMode) -> u32 {
        self.filter[mode as usize]
    }

    /// Native texture target.
    #[inline]
    pub fn texture_target(&self, target: TextureTarget) -> u32 {
        self.texture_target[target as usize]
    }

    /// Native index type.
    #[inline]
    pub fn index_type(&self, format: IndexFormat) -> u32 {
        self.index_type[format as usize]
    }

    /// Native vertex component type.
    #[inline]
    pub fn vertex_type(&self, ty: VertexDataType) -> u32 {
        self.vertex_type[ty as usize]
    }

    /// Native buffer usage hint.
    #[inline]
    pub fn usage(&self, usage: BufferUsage) -> u32 {
        self.usage[usage as usize]
    }

    /// Native pixel tokens.
    #[inline]
    pub fn pixel(&self, format: PixelFormat) -> PixelTokens {
        self.pixel[format as usize]
    }

    /// Native clear mask.
    #[inline]
    pub fn clear_mask(&self, flags: ClearFlags) -> u32 {
        flags.into_gl()
    }

    /// Maps a reflected native uniform type back to the engine type.
    pub fn uniform_type(&self, native: u32) -> Option<UniformType> {
        self.uniform_types.get(&native).copied()
    }
}

fn uniform_type_map(tier: ContextTier) -> HashMap<u32, UniformType> {
    let mut map = HashMap::from([
        (glow::BOOL, UniformType::Bool),
        (glow::INT, UniformType::Int),
        (glow::FLOAT, UniformType::Float),
        (glow::FLOAT_VEC2, UniformType::Vec2),
        (glow::FLOAT_VEC3, UniformType::Vec3),
        (glow::FLOAT_VEC4, UniformType::Vec4),
        (glow::INT_VEC2, UniformType::IVec2),
        (glow::INT_VEC3, UniformType::IVec3),
        (glow::INT_VEC4, UniformType::IVec4),
        (glow::BOOL_VEC2, UniformType::BVec2),
        (glow::BOOL_VEC3, UniformType::BVec3),
        (glow::BOOL_VEC4, UniformType::BVec4),
        (glow::FLOAT_MAT2, UniformType::Mat2),
        (glow::FLOAT_MAT3, UniformType::Mat3),
        (glow::FLOAT_MAT4, UniformType::Mat4),
        (glow::SAMPLER_2D, UniformType::Texture2D),
        (glow::SAMPLER_CUBE, UniformType::TextureCube),
    ]);
    if tier.is_modern() {
        map.insert(glow::SAMPLER_3D, UniformType::Texture3D);
        map.insert(glow::SAMPLER_2D_SHADOW, UniformType::Texture2DShadow);
        map.insert(glow::SAMPLER_CUBE_SHADOW, UniformType::TextureCubeShadow);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_match_per_variant_mapping() {
        let tables = EnumTables::new(ContextTier::Modern);
        assert_eq!(
            tables.blend_factor(BlendFactor::OneMinusSrcAlpha),
            glow::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(tables.compare(CompareFunction::LessEqual), glow::LEQUAL);
        assert_eq!(
            tables.stencil_op(StencilOperation::DecrementWrap),
            glow::DECR_WRAP
        );
        assert_eq!(tables.primitive(PrimitiveTopology::TriangleFan), glow::TRIANGLE_FAN);
        assert_eq!(tables.cull_face(CullMode::FrontAndBack), glow::FRONT_AND_BACK);
        assert_eq!(tables.address(AddressMode::MirrorRepeat), glow::MIRRORED_REPEAT);
        assert_eq!(tables.index_type(IndexFormat::Uint32), glow::UNSIGNED_INT);
    }

    #[test]
    fn half_float_token_depends_on_tier() {
        let modern = EnumTables::new(ContextTier::Modern);
        let legacy = EnumTables::new(ContextTier::Legacy);
        assert_eq!(modern.pixel(PixelFormat::Rgba16F).ty, glow::HALF_FLOAT);
        assert_eq!(legacy.pixel(PixelFormat::Rgba16F).ty, HALF_FLOAT_OES);
        assert_eq!(legacy.pixel(PixelFormat::Rgba16F).internal_format, glow::RGBA);
        assert_eq!(legacy.vertex_type(VertexDataType::Float16), HALF_FLOAT_OES);
    }

    #[test]
    fn clear_mask_combines_bits() {
        let tables = EnumTables::new(ContextTier::Legacy);
        assert_eq!(
            tables.clear_mask(ClearFlags::COLOR | ClearFlags::DEPTH),
            glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT
        );
        assert_eq!(tables.clear_mask(ClearFlags::NONE), 0);
    }

    #[test]
    fn shadow_samplers_are_modern_only() {
        let modern = EnumTables::new(ContextTier::Modern);
        let legacy = EnumTables::new(ContextTier::Legacy);
        assert_eq!(
            modern.uniform_type(glow::SAMPLER_2D_SHADOW),
            Some(UniformType::Texture2DShadow)
        );
        assert_eq!(legacy.uniform_type(glow::SAMPLER_2D_SHADOW), None);
        assert_eq!(legacy.uniform_type(glow::FLOAT_MAT4), Some(UniformType::Mat4));
    }

    #[test]
    fn gpu_dynamic_usage_falls_back_on_legacy() {
        assert_eq!(
            EnumTables::new(ContextTier::Modern).usage(BufferUsage::GpuDynamic),
            glow::DYNAMIC_COPY
        );
        assert_eq!(
            EnumTables::new(ContextTier::Legacy).usage(BufferUsage::GpuDynamic),
            glow::DYNAMIC_DRAW
        );
    }
}
