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

//! Capability probing and renderability self-tests.

use std::ops::{Deref, DerefMut};

use strata_core::renderer::api::{
    Capabilities, ContextTier, DeviceSettings, NativeBuffer, NativeFramebuffer, NativeProgram,
    NativeTexture, NativeVertexArray, ResolvedExtensions,
};
use strata_core::renderer::traits::{AttributeBinding, NativeContext};
use strata_core::renderer::RenderError;

use super::conversions::{HALF_FLOAT_OES, MAX_TEXTURE_MAX_ANISOTROPY_EXT};

const ANISOTROPIC: &[&str] = &[
    "EXT_texture_filter_anisotropic",
    "WEBKIT_EXT_texture_filter_anisotropic",
];
const COLOR_BUFFER_FLOAT: &[&str] = &["EXT_color_buffer_float"];
const COLOR_BUFFER_HALF_FLOAT: &[&str] = &["EXT_color_buffer_half_float"];
const TEXTURE_FLOAT_LINEAR: &[&str] = &["OES_texture_float_linear"];
const TEXTURE_FLOAT: &[&str] = &["OES_texture_float"];
const TEXTURE_HALF_FLOAT: &[&str] = &["OES_texture_half_float"];
const INSTANCED_ARRAYS: &[&str] = &["ANGLE_instanced_arrays"];
const VERTEX_ARRAY_OBJECT: &[&str] = &["OES_vertex_array_object"];
const DEPTH_TEXTURE: &[&str] = &[
    "WEBGL_depth_texture",
    "WEBKIT_WEBGL_depth_texture",
    "MOZ_WEBGL_depth_texture",
];
const ELEMENT_INDEX_UINT: &[&str] = &["OES_element_index_uint"];
const BLEND_MINMAX: &[&str] = &["EXT_blend_minmax"];
const DRAW_BUFFERS: &[&str] = &["WEBGL_draw_buffers", "EXT_draw_buffers"];
const STANDARD_DERIVATIVES: &[&str] = &["OES_standard_derivatives"];
const SHADER_TEXTURE_LOD: &[&str] = &["EXT_shader_texture_lod"];
const COMPRESSED_S3TC: &[&str] = &[
    "WEBGL_compressed_texture_s3tc",
    "WEBKIT_WEBGL_compressed_texture_s3tc",
    "EXT_texture_compression_s3tc",
];
const COMPRESSED_ETC1: &[&str] = &["WEBGL_compressed_texture_etc1"];
const COMPRESSED_ETC: &[&str] = &["WEBGL_compressed_texture_etc"];
const COMPRESSED_PVRTC: &[&str] = &[
    "WEBGL_compressed_texture_pvrtc",
    "WEBKIT_WEBGL_compressed_texture_pvrtc",
];
const COMPRESSED_ASTC: &[&str] = &["WEBGL_compressed_texture_astc"];
const LOSE_CONTEXT: &[&str] = &["WEBGL_lose_context"];

/// Returns the first name in `names` the context supports.
fn resolve<C: NativeContext>(ctx: &mut C, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find(|name| ctx.supports_extension(name))
        .map(|name| name.to_string())
}

fn parameter<C: NativeContext>(ctx: &mut C, parameter: u32) -> u32 {
    ctx.get_parameter_i32(parameter).max(0) as u32
}

fn resolve_extensions<C: NativeContext>(ctx: &mut C, tier: ContextTier) -> ResolvedExtensions {
    let mut ext = ResolvedExtensions {
        texture_filter_anisotropic: resolve(ctx, ANISOTROPIC),
        texture_float_linear: resolve(ctx, TEXTURE_FLOAT_LINEAR),
        compressed_texture_s3tc: resolve(ctx, COMPRESSED_S3TC),
        compressed_texture_etc1: resolve(ctx, COMPRESSED_ETC1),
        compressed_texture_etc: resolve(ctx, COMPRESSED_ETC),
        compressed_texture_pvrtc: resolve(ctx, COMPRESSED_PVRTC),
        compressed_texture_astc: resolve(ctx, COMPRESSED_ASTC),
        lose_context: resolve(ctx, LOSE_CONTEXT),
        ..Default::default()
    };

    if tier.is_modern() {
        ext.color_buffer_float = resolve(ctx, COLOR_BUFFER_FLOAT);
    } else {
        ext.color_buffer_half_float = resolve(ctx, COLOR_BUFFER_HALF_FLOAT);
        ext.texture_float = resolve(ctx, TEXTURE_FLOAT);
        ext.texture_half_float = resolve(ctx, TEXTURE_HALF_FLOAT);
        ext.instanced_arrays = resolve(ctx, INSTANCED_ARRAYS);
        ext.vertex_array_object = resolve(ctx, VERTEX_ARRAY_OBJECT);
        ext.depth_texture = resolve(ctx, DEPTH_TEXTURE);
        ext.element_index_uint = resolve(ctx, ELEMENT_INDEX_UINT);
        ext.blend_minmax = resolve(ctx, BLEND_MINMAX);
        ext.draw_buffers = resolve(ctx, DRAW_BUFFERS);
        ext.standard_derivatives = resolve(ctx, STANDARD_DERIVATIVES);
        ext.shader_texture_lod = resolve(ctx, SHADER_TEXTURE_LOD);
    }
    ext
}

/// Probes the context once.
///
/// Fails only if the context has no usable baseline. Missing extensions turn the
/// dependent flags off.
pub fn probe<C: NativeContext>(
    ctx: &mut C,
    settings: &DeviceSettings,
) -> Result<Capabilities, RenderError> {
    let tier = if settings.prefer_modern_tier {
        ctx.tier()
    } else {
        ContextTier::Legacy
    };
    let modern = tier.is_modern();

    let max_texture_size = parameter(ctx, glow::MAX_TEXTURE_SIZE);
    if max_texture_size == 0 {
        return Err(RenderError::InitializationFailed(
            "the native context reports no texture support".to_string(),
        ));
    }

    let extensions = resolve_extensions(ctx, tier);

    let mut caps = Capabilities {
        tier,
        max_texture_size,
        max_cube_map_size: parameter(ctx, glow::MAX_CUBE_MAP_TEXTURE_SIZE),
        max_renderbuffer_size: parameter(ctx, glow::MAX_RENDERBUFFER_SIZE),
        max_textures: parameter(ctx, glow::MAX_TEXTURE_IMAGE_UNITS),
        max_combined_textures: parameter(ctx, glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
        max_vertex_textures: parameter(ctx, glow::MAX_VERTEX_TEXTURE_IMAGE_UNITS),
        max_vertex_uniform_vectors: parameter(ctx, glow::MAX_VERTEX_UNIFORM_VECTORS),
        max_fragment_uniform_vectors: parameter(ctx, glow::MAX_FRAGMENT_UNIFORM_VECTORS),
        max_vertex_attributes: parameter(ctx, glow::MAX_VERTEX_ATTRIBS),
        ..Default::default()
    };

    if let Some(cap) = settings.max_texture_units_override {
        caps.max_combined_textures = caps.max_combined_textures.min(cap);
        caps.max_textures = caps.max_textures.min(cap);
    }
    if caps.max_combined_textures == 0 {
        return Err(RenderError::InitializationFailed(
            "the native context reports no texture units".to_string(),
        ));
    }

    caps.max_anisotropy = if extensions.texture_filter_anisotropic.is_some() {
        ctx.get_parameter_f32(MAX_TEXTURE_MAX_ANISOTROPY_EXT).max(1.0)
    } else {
        1.0
    };

    if modern {
        caps.max_volume_size = parameter(ctx, glow::MAX_3D_TEXTURE_SIZE);
        caps.max_samples = parameter(ctx, glow::MAX_SAMPLES).max(1);
        caps.max_draw_buffers = parameter(ctx, glow::MAX_DRAW_BUFFERS).max(1);
        caps.max_color_attachments = parameter(ctx, glow::MAX_COLOR_ATTACHMENTS).max(1);
    } else {
        caps.max_samples = 1;
        if extensions.draw_buffers.is_some() {
            caps.max_draw_buffers = parameter(ctx, glow::MAX_DRAW_BUFFERS).max(1);
            caps.max_color_attachments = parameter(ctx, glow::MAX_COLOR_ATTACHMENTS).max(1);
        } else {
            caps.max_draw_buffers = 1;
            caps.max_color_attachments = 1;
        }
    }

    caps.supports_instancing = modern || extensions.instanced_arrays.is_some();
    caps.supports_vertex_arrays = modern || extensions.vertex_array_object.is_some();
    caps.supports_msaa = modern && caps.max_samples > 1;
    caps.supports_mrt = caps.max_draw_buffers > 1;
    caps.supports_volume_textures = modern && caps.max_volume_size > 0;
    caps.supports_transform_feedback = modern;
    caps.supports_depth_texture = modern || extensions.depth_texture.is_some();
    caps.supports_uint_indices = modern || extensions.element_index_uint.is_some();
    caps.supports_blend_minmax = modern || extensions.blend_minmax.is_some();
    caps.supports_standard_derivatives = modern || extensions.standard_derivatives.is_some();
    caps.supports_texture_lod = modern || extensions.shader_texture_lod.is_some();
    caps.supports_texture_float = modern || extensions.texture_float.is_some();
    caps.supports_texture_half_float = modern || extensions.texture_half_float.is_some();
    caps.supports_texture_float_linear = extensions.texture_float_linear.is_some();

    if modern {
        caps.texture_float_renderable = extensions.color_buffer_float.is_some();
        caps.texture_half_float_renderable = extensions.color_buffer_float.is_some();
        caps.texture_half_float_updatable = true;
    } else {
        caps.texture_float_renderable =
            caps.supports_texture_float && test_renderable(ctx, glow::FLOAT);
        caps.texture_half_float_renderable =
            caps.supports_texture_half_float && test_renderable(ctx, HALF_FLOAT_OES);
        caps.texture_half_float_updatable =
            caps.supports_texture_half_float && test_half_float_updatable(ctx);
    }

    caps.extensions = extensions;

    log::info!(
        "Context capabilities: {:?} tier, {} texture units, max texture {}, float renderable: {}, instancing: {}, vertex arrays: {}",
        caps.tier,
        caps.max_combined_textures,
        caps.max_texture_size,
        caps.texture_float_renderable,
        caps.supports_instancing,
        caps.supports_vertex_arrays,
    );
    if !caps.supports_vertex_arrays {
        log::warn!("Vertex array objects unavailable; attributes will be wired per draw.");
    }

    Ok(caps)
}

/// Native objects created for a self-test, deleted on drop whatever the outcome.
pub(crate) struct Scratch<'a, C: NativeContext> {
    ctx: &'a mut C,
    textures: Vec<NativeTexture>,
    framebuffers: Vec<NativeFramebuffer>,
    buffers: Vec<NativeBuffer>,
    vertex_arrays: Vec<NativeVertexArray>,
    programs: Vec<NativeProgram>,
}

impl<'a, C: NativeContext> Scratch<'a, C> {
    pub fn new(ctx: &'a mut C) -> Self {
        Self {
            ctx,
            textures: Vec::new(),
            framebuffers: Vec::new(),
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            programs: Vec::new(),
        }
    }

    /// A 2D texture with nearest filtering and edge clamping, left bound on the
    /// active unit.
    pub fn texture(
        &mut self,
        size: i32,
        internal_format: u32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) -> Result<NativeTexture, String> {
        let texture = self.ctx.create_texture()?;
        self.textures.push(texture);
        self.ctx.bind_texture(glow::TEXTURE_2D, Some(texture));
        for (parameter, value) in [
            (glow::TEXTURE_MIN_FILTER, glow::NEAREST),
            (glow::TEXTURE_MAG_FILTER, glow::NEAREST),
            (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
        ] {
            self.ctx
                .tex_parameter_i32(glow::TEXTURE_2D, parameter, value as i32);
        }
        self.ctx.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            internal_format as i32,
            size,
            size,
            format,
            ty,
            pixels,
        );
        Ok(texture)
    }

    /// A framebuffer with `texture` as its color attachment, left bound.
    pub fn framebuffer(&mut self, texture: NativeTexture) -> Result<NativeFramebuffer, String> {
        let framebuffer = self.ctx.create_framebuffer()?;
        self.framebuffers.push(framebuffer);
        self.ctx
            .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        self.ctx.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(texture),
            0,
        );
        Ok(framebuffer)
    }

    pub fn program(&mut self, vertex: &str, fragment: &str) -> Result<NativeProgram, String> {
        let attributes = [AttributeBinding {
            name: "vertex_position",
            location: 0,
        }];
        let linked = self.ctx.link_program(vertex, fragment, &attributes, &[])?;
        self.programs.push(linked.program);
        Ok(linked.program)
    }

    /// A full-screen quad wired to attribute location 0.
    pub fn quad(&mut self, use_vertex_array: bool) -> Result<(), String> {
        if use_vertex_array {
            let vertex_array = self.ctx.create_vertex_array()?;
            self.vertex_arrays.push(vertex_array);
            self.ctx.bind_vertex_array(Some(vertex_array));
        }
        let buffer = self.ctx.create_buffer()?;
        self.buffers.push(buffer);
        self.ctx.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        self.ctx.buffer_data(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_VERTICES),
            glow::STATIC_DRAW,
        );
        self.ctx
            .vertex_attrib_pointer(0, 2, glow::FLOAT, false, 0, 0);
        self.ctx.enable_vertex_attrib_array(0);
        Ok(())
    }
}

impl<C: NativeContext> Deref for Scratch<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<C: NativeContext> DerefMut for Scratch<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<C: NativeContext> Drop for Scratch<'_, C> {
    fn drop(&mut self) {
        for vertex_array in self.vertex_arrays.drain(..) {
            self.ctx.delete_vertex_array(vertex_array);
        }
        for buffer in self.buffers.drain(..) {
            self.ctx.delete_buffer(buffer);
        }
        for program in self.programs.drain(..) {
            self.ctx.delete_program(program);
        }
        for framebuffer in self.framebuffers.drain(..) {
            self.ctx.delete_framebuffer(framebuffer);
        }
        for texture in self.textures.drain(..) {
            self.ctx.delete_texture(texture);
        }
    }
}

/// Triangle-strip quad covering clip space.
pub(crate) const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Checks whether a 2×2 RGBA texture of `pixel_type` is a complete color attachment.
pub fn test_renderable<C: NativeContext>(ctx: &mut C, pixel_type: u32) -> bool {
    let mut scratch = Scratch::new(ctx);
    let complete = (|| -> Result<bool, String> {
        let texture = scratch.texture(2, glow::RGBA, glow::RGBA, pixel_type, None)?;
        scratch.framebuffer(texture)?;
        Ok(scratch.check_framebuffer_status(glow::FRAMEBUFFER) == glow::FRAMEBUFFER_COMPLETE)
    })()
    .unwrap_or(false);
    scratch.bind_texture(glow::TEXTURE_2D, None);
    scratch.bind_framebuffer(glow::FRAMEBUFFER, None);
    complete
}

/// Checks whether uploading half-float data raises a native error.
pub fn test_half_float_updatable<C: NativeContext>(ctx: &mut C) -> bool {
    // Drain stale errors so only the upload is judged.
    for _ in 0..16 {
        if ctx.get_error() == glow::NO_ERROR {
            break;
        }
    }
    let mut scratch = Scratch::new(ctx);
    let data = [0u8; 2 * 2 * 4 * 2];
    let uploaded = scratch
        .texture(2, glow::RGBA, glow::RGBA, HALF_FLOAT_OES, Some(&data))
        .is_ok();
    let clean = scratch.get_error() == glow::NO_ERROR;
    scratch.bind_texture(glow::TEXTURE_2D, None);
    uploaded && clean
}

const PRECISION_VS: &str = "attribute vec2 vertex_position;
void main(void) {
    gl_Position = vec4(vertex_position, 0.5, 1.0);
}
";

const PRECISION_WRITE_FS: &str = "precision highp float;
void main(void) {
    gl_FragColor = vec4(2147483648.0);
}
";

const PRECISION_PACK_FS: &str = "precision highp float;
uniform sampler2D source;
vec4 packFloat(float depth) {
    const vec4 bit_shift = vec4(256.0 * 256.0 * 256.0, 256.0 * 256.0, 256.0, 1.0);
    const vec4 bit_mask = vec4(0.0, 1.0 / 256.0, 1.0 / 256.0, 1.0 / 256.0);
    vec4 res = mod(depth * bit_shift * vec4(255), vec4(256)) / vec4(255);
    res -= res.xxyz * bit_mask;
    return res;
}
void main(void) {
    float c = texture2D(source, vec2(0.5)).x;
    float diff = abs(c - 2147483648.0) / 2147483648.0;
    gl_FragColor = packFloat(diff);
}
";

/// Renders a large reference value into a float texture, packs the round-trip
/// error into RGBA8, reads it back and checks that the error is zero.
///
/// `float_format` is the internal format of the float attachment: sized `RGBA32F`
/// on modern contexts, plain `RGBA` on legacy ones.
///
/// Leaves program, framebuffer, texture, vertex-array and attribute bindings
/// changed; the caller resynchronizes them. Unit 0 must be active.
pub fn test_float_high_precision<C: NativeContext>(
    ctx: &mut C,
    float_format: u32,
    use_vertex_array: bool,
) -> bool {
    let mut scratch = Scratch::new(ctx);
    let pixels = (|| -> Result<[u8; 4], String> {
        scratch.quad(use_vertex_array)?;

        let float_texture = scratch.texture(1, float_format, glow::RGBA, glow::FLOAT, None)?;
        scratch.framebuffer(float_texture)?;
        let write = scratch.program(PRECISION_VS, PRECISION_WRITE_FS)?;
        scratch.use_program(Some(write));
        scratch.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);

        let packed = scratch.texture(1, glow::RGBA, glow::RGBA, glow::UNSIGNED_BYTE, None)?;
        scratch.framebuffer(packed)?;
        scratch.bind_texture(glow::TEXTURE_2D, Some(float_texture));
        let pack = scratch.program(PRECISION_VS, PRECISION_PACK_FS)?;
        scratch.use_program(Some(pack));
        scratch.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);

        let mut pixels = [0u8; 4];
        scratch.read_pixels(0, 0, 1, 1, glow::RGBA, glow::UNSIGNED_BYTE, &mut pixels);
        Ok(pixels)
    })();

    match pixels {
        Ok(p) => {
            let [x, y, z, w] = p.map(|byte| f32::from(byte) / 255.0);
            let diff = x / (256.0 * 256.0 * 256.0) + y / (256.0 * 256.0) + z / 256.0 + w;
            diff == 0.0
        }
        Err(err) => {
            log::warn!("High precision float self-test could not run: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall, ObjectKind};

    #[test]
    fn zero_texture_size_is_fatal() {
        let mut ctx = HeadlessContext::modern().with_parameter(glow::MAX_TEXTURE_SIZE, 0);
        let result = probe(&mut ctx, &DeviceSettings::default());
        assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
    }

    #[test]
    fn extensions_resolve_to_first_supported_name() {
        let mut ctx = HeadlessContext::legacy()
            .with_extension("MOZ_WEBGL_depth_texture")
            .with_extension("WEBKIT_WEBGL_depth_texture");
        let caps = probe(&mut ctx, &DeviceSettings::default()).unwrap();
        assert_eq!(
            caps.extensions.depth_texture.as_deref(),
            Some("WEBKIT_WEBGL_depth_texture")
        );
        assert!(caps.supports_depth_texture);
    }

    #[test]
    fn legacy_without_extensions_degrades() {
        let mut ctx = HeadlessContext::legacy();
        let caps = probe(&mut ctx, &DeviceSettings::default()).unwrap();
        assert!(!caps.supports_instancing);
        assert!(!caps.supports_vertex_arrays);
        assert!(!caps.texture_float_renderable);
        assert!(!caps.texture_half_float_updatable);
        assert_eq!(caps.max_samples, 1);
        assert_eq!(caps.max_anisotropy, 1.0);
    }

    #[test]
    fn legacy_float_renderability_comes_from_self_test() {
        let mut renderable = HeadlessContext::legacy()
            .with_extension("OES_texture_float")
            .with_float_renderable(true);
        let mut unrenderable = HeadlessContext::legacy()
            .with_extension("OES_texture_float")
            .with_float_renderable(false);
        assert!(probe(&mut renderable, &DeviceSettings::default()).unwrap().texture_float_renderable);
        assert!(!probe(&mut unrenderable, &DeviceSettings::default()).unwrap().texture_float_renderable);
        assert_eq!(renderable.live_objects(ObjectKind::Texture), 0);
        assert_eq!(renderable.live_objects(ObjectKind::Framebuffer), 0);
    }

    #[test]
    fn half_float_update_test_reads_error() {
        let mut ctx = HeadlessContext::legacy()
            .with_extension("OES_texture_half_float")
            .with_half_float_updatable(false);
        let caps = probe(&mut ctx, &DeviceSettings::default()).unwrap();
        assert!(caps.supports_texture_half_float);
        assert!(!caps.texture_half_float_updatable);
    }

    #[test]
    fn texture_unit_override_caps_limits() {
        let mut ctx = HeadlessContext::modern();
        let settings = DeviceSettings {
            max_texture_units_override: Some(4),
            ..Default::default()
        };
        let caps = probe(&mut ctx, &settings).unwrap();
        assert_eq!(caps.max_combined_textures, 4);
    }

    #[test]
    fn high_precision_test_releases_everything() {
        let mut exact = HeadlessContext::modern();
        assert!(test_float_high_precision(&mut exact, glow::RGBA32F, true));
        assert_eq!(
            exact.count(|call| matches!(
                call,
                NativeCall::TexImage { internal_format, ty: glow::FLOAT, .. }
                    if *internal_format == glow::RGBA32F as i32
            )),
            1
        );
        for kind in [
            ObjectKind::Texture,
            ObjectKind::Framebuffer,
            ObjectKind::Buffer,
            ObjectKind::VertexArray,
            ObjectKind::Program,
        ] {
            assert_eq!(exact.live_objects(kind), 0, "{kind:?} leaked");
        }

        let mut lossy = HeadlessContext::modern().with_read_back([0, 0, 3, 0]);
        assert!(!test_float_high_precision(&mut lossy, glow::RGBA32F, true));
        assert_eq!(lossy.live_objects(ObjectKind::Texture), 0);
    }
}
