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

//! Capabilities of a native context, probed once per context generation.

/// The feature level of the underlying context.
///
/// The tier gates which native entry points exist: the modern tier has vertex
/// arrays, instancing, multisampled renderbuffers, blits, 3D textures and transform
/// feedback natively; the legacy tier reaches some of them through extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContextTier {
    /// A GL ES 2.0 / WebGL 1 class context.
    Legacy,
    /// A GL ES 3.0 / WebGL 2 class context.
    #[default]
    Modern,
}

impl ContextTier {
    /// Returns `true` for the modern tier.
    pub fn is_modern(&self) -> bool {
        matches!(self, ContextTier::Modern)
    }
}

/// Extensions resolved at probe time.
///
/// Each field holds the name that the context accepted, out of the ordered list
/// of historical and vendor-prefixed names tried for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedExtensions {
    /// Anisotropic filtering.
    pub texture_filter_anisotropic: Option<String>,
    /// Float color attachments (modern tier).
    pub color_buffer_float: Option<String>,
    /// Half-float color attachments (legacy tier).
    pub color_buffer_half_float: Option<String>,
    /// Linear filtering of float textures.
    pub texture_float_linear: Option<String>,
    /// Float textures (legacy tier).
    pub texture_float: Option<String>,
    /// Half-float textures (legacy tier).
    pub texture_half_float: Option<String>,
    /// Instanced drawing (legacy tier).
    pub instanced_arrays: Option<String>,
    /// Vertex array objects (legacy tier).
    pub vertex_array_object: Option<String>,
    /// Depth textures (legacy tier).
    pub depth_texture: Option<String>,
    /// 32-bit indices (legacy tier).
    pub element_index_uint: Option<String>,
    /// Min/max blend equations (legacy tier).
    pub blend_minmax: Option<String>,
    /// Multiple render targets (legacy tier).
    pub draw_buffers: Option<String>,
    /// Shader derivatives (legacy tier).
    pub standard_derivatives: Option<String>,
    /// Explicit texture LOD in fragment shaders (legacy tier).
    pub shader_texture_lod: Option<String>,
    /// S3TC/DXT compressed textures.
    pub compressed_texture_s3tc: Option<String>,
    /// ETC1 compressed textures.
    pub compressed_texture_etc1: Option<String>,
    /// ETC2 compressed textures.
    pub compressed_texture_etc: Option<String>,
    /// PVRTC compressed textures.
    pub compressed_texture_pvrtc: Option<String>,
    /// ASTC compressed textures.
    pub compressed_texture_astc: Option<String>,
    /// Context loss simulation hook.
    pub lose_context: Option<String>,
}

/// Capability flags and limits of a native context.
///
/// Missing extensions never fail the probe; they turn the dependent flags off.
/// The expensive high-precision float test is not part of this struct: the device
/// evaluates it lazily on first access.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capabilities {
    /// The context tier.
    pub tier: ContextTier,
    /// Extensions that resolved.
    pub extensions: ResolvedExtensions,

    /// Largest 2D texture dimension.
    pub max_texture_size: u32,
    /// Largest cube map face dimension.
    pub max_cube_map_size: u32,
    /// Largest 3D texture dimension (0 on the legacy tier).
    pub max_volume_size: u32,
    /// Largest renderbuffer dimension.
    pub max_renderbuffer_size: u32,
    /// Fragment shader texture units.
    pub max_textures: u32,
    /// Texture units across all stages; sizes the binding table.
    pub max_combined_textures: u32,
    /// Vertex shader texture units.
    pub max_vertex_textures: u32,
    /// Vertex shader uniform vectors.
    pub max_vertex_uniform_vectors: u32,
    /// Fragment shader uniform vectors.
    pub max_fragment_uniform_vectors: u32,
    /// Vertex attribute locations.
    pub max_vertex_attributes: u32,
    /// Simultaneous draw buffers.
    pub max_draw_buffers: u32,
    /// Color attachments per framebuffer.
    pub max_color_attachments: u32,
    /// Largest multisample count (1 when multisampling is unavailable).
    pub max_samples: u32,
    /// Largest anisotropy (1.0 when the extension is missing).
    pub max_anisotropy: f32,

    /// Instanced draws are available.
    pub supports_instancing: bool,
    /// Vertex array objects are available.
    pub supports_vertex_arrays: bool,
    /// Multisampled renderbuffers and resolve blits are available.
    pub supports_msaa: bool,
    /// Multiple render targets are available.
    pub supports_mrt: bool,
    /// 3D textures are available.
    pub supports_volume_textures: bool,
    /// Transform feedback is available.
    pub supports_transform_feedback: bool,
    /// Depth textures are available.
    pub supports_depth_texture: bool,
    /// 32-bit indices are available.
    pub supports_uint_indices: bool,
    /// Min/max blend equations are available.
    pub supports_blend_minmax: bool,
    /// Shader derivatives are available.
    pub supports_standard_derivatives: bool,
    /// Explicit texture LOD is available.
    pub supports_texture_lod: bool,
    /// Float textures can be sampled.
    pub supports_texture_float: bool,
    /// Half-float textures can be sampled.
    pub supports_texture_half_float: bool,
    /// Float textures can be linearly filtered.
    pub supports_texture_float_linear: bool,

    /// Float textures can be rendered into (render self-test).
    pub texture_float_renderable: bool,
    /// Half-float textures can be rendered into (render self-test).
    pub texture_half_float_renderable: bool,
    /// Half-float textures accept data uploads (upload self-test).
    pub texture_half_float_updatable: bool,
}

impl Capabilities {
    /// Returns `true` if the context is on the modern tier.
    pub fn is_modern(&self) -> bool {
        self.tier.is_modern()
    }
}
