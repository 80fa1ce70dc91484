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

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroU32;

use strata_core::renderer::api::{
    ActiveUniform, ContextTier, LinkedProgram, NativeBuffer, NativeFramebuffer, NativeProgram,
    NativeRenderbuffer, NativeTexture, NativeUniformLocation, NativeVertexArray,
};
use strata_core::renderer::traits::{AttributeBinding, NativeContext};

use super::call::NativeCall;
use crate::graphics::gl::conversions::{HALF_FLOAT_OES, MAX_TEXTURE_MAX_ANISOTROPY_EXT};

/// The kind of a native object allocated by the headless context.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Texture,
    Buffer,
    VertexArray,
    Framebuffer,
    Renderbuffer,
    Program,
}

#[derive(Debug, Clone, Copy, Default)]
struct TextureImage {
    ty: u32,
}

#[derive(Debug, Clone, Default)]
struct FramebufferAttachments {
    color: Option<NativeTexture>,
    color_renderbuffer: bool,
    depth: bool,
}

/// A [`NativeContext`] that executes nothing and records every call.
///
/// It allocates handles, tracks live objects, and emulates just enough behavior for
/// the device's probing paths: parameter queries, extension lookup, framebuffer
/// completeness by pixel type, upload errors by pixel type, pixel read-back from a
/// configurable pattern, and uniform reflection from `uniform <type> <name>;`
/// declarations. A source containing `#error` fails to link.
#[derive(Debug)]
pub struct HeadlessContext {
    tier: ContextTier,
    extensions: HashSet<String>,
    parameters: HashMap<u32, i32>,
    float_parameters: HashMap<u32, f32>,
    renderable_types: HashSet<u32>,
    rejected_upload_types: HashSet<u32>,
    read_back: [u8; 4],
    drawing_buffer: (u32, u32),
    lost: bool,

    calls: Vec<NativeCall>,
    errors: VecDeque<u32>,
    next_handle: u32,
    live: HashMap<u32, ObjectKind>,
    buffer_budget: Option<usize>,

    active_unit: u32,
    bound_textures: HashMap<(u32, u32), NativeTexture>,
    texture_images: HashMap<NativeTexture, TextureImage>,
    bound_framebuffer: Option<NativeFramebuffer>,
    framebuffers: HashMap<NativeFramebuffer, FramebufferAttachments>,
}

impl HeadlessContext {
    /// Creates a context of the given tier with typical limits and no extensions.
    pub fn new(tier: ContextTier) -> Self {
        let mut parameters = HashMap::from([
            (glow::MAX_TEXTURE_SIZE, 4096),
            (glow::MAX_CUBE_MAP_TEXTURE_SIZE, 4096),
            (glow::MAX_RENDERBUFFER_SIZE, 4096),
            (glow::MAX_TEXTURE_IMAGE_UNITS, 16),
            (glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS, 32),
            (glow::MAX_VERTEX_TEXTURE_IMAGE_UNITS, 16),
            (glow::MAX_VERTEX_UNIFORM_VECTORS, 256),
            (glow::MAX_FRAGMENT_UNIFORM_VECTORS, 224),
            (glow::MAX_VERTEX_ATTRIBS, 16),
        ]);
        if tier.is_modern() {
            parameters.insert(glow::MAX_3D_TEXTURE_SIZE, 2048);
            parameters.insert(glow::MAX_DRAW_BUFFERS, 8);
            parameters.insert(glow::MAX_COLOR_ATTACHMENTS, 8);
            parameters.insert(glow::MAX_SAMPLES, 4);
        }

        Self {
            tier,
            extensions: HashSet::new(),
            parameters,
            float_parameters: HashMap::new(),
            renderable_types: HashSet::from([glow::UNSIGNED_BYTE]),
            rejected_upload_types: HashSet::new(),
            read_back: [0; 4],
            drawing_buffer: (800, 600),
            lost: false,
            calls: Vec::new(),
            errors: VecDeque::new(),
            next_handle: 1,
            live: HashMap::new(),
            buffer_budget: None,
            active_unit: 0,
            bound_textures: HashMap::new(),
            texture_images: HashMap::new(),
            bound_framebuffer: None,
            framebuffers: HashMap::new(),
        }
    }

    /// A modern-tier context with float color buffers and anisotropic filtering.
    pub fn modern() -> Self {
        Self::new(ContextTier::Modern)
            .with_extension("EXT_color_buffer_float")
            .with_extension("OES_texture_float_linear")
            .with_anisotropy(16.0)
            .with_float_renderable(true)
            .with_half_float_renderable(true)
    }

    /// A legacy-tier context with no extensions at all.
    pub fn legacy() -> Self {
        Self::new(ContextTier::Legacy)
    }

    /// Makes an extension available.
    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.insert(name.to_string());
        self
    }

    /// Overrides an integer parameter.
    pub fn with_parameter(mut self, parameter: u32, value: i32) -> Self {
        self.parameters.insert(parameter, value);
        self
    }

    /// Exposes anisotropic filtering with the given maximum.
    pub fn with_anisotropy(mut self, max: f32) -> Self {
        self.extensions
            .insert("EXT_texture_filter_anisotropic".to_string());
        self.float_parameters
            .insert(MAX_TEXTURE_MAX_ANISOTROPY_EXT, max);
        self
    }

    /// Controls whether 32-bit float color attachments are complete.
    pub fn with_float_renderable(mut self, renderable: bool) -> Self {
        self.set_renderable(glow::FLOAT, renderable);
        self
    }

    /// Controls whether half-float color attachments are complete.
    pub fn with_half_float_renderable(mut self, renderable: bool) -> Self {
        self.set_renderable(glow::HALF_FLOAT, renderable);
        self.set_renderable(HALF_FLOAT_OES, renderable);
        self
    }

    /// Controls whether uploading half-float data raises an error.
    pub fn with_half_float_updatable(mut self, updatable: bool) -> Self {
        for ty in [glow::HALF_FLOAT, HALF_FLOAT_OES] {
            if updatable {
                self.rejected_upload_types.remove(&ty);
            } else {
                self.rejected_upload_types.insert(ty);
            }
        }
        self
    }

    /// Sets the RGBA pattern every `read_pixels` call returns.
    pub fn with_read_back(mut self, rgba: [u8; 4]) -> Self {
        self.read_back = rgba;
        self
    }

    /// Sets the default framebuffer size.
    pub fn with_drawing_buffer_size(mut self, width: u32, height: u32) -> Self {
        self.drawing_buffer = (width, height);
        self
    }

    fn set_renderable(&mut self, ty: u32, renderable: bool) {
        if renderable {
            self.renderable_types.insert(ty);
        } else {
            self.renderable_types.remove(&ty);
        }
    }

    /// Marks the context lost or restored. A restored context forgets every object.
    pub fn set_context_lost(&mut self, lost: bool) {
        self.lost = lost;
        if !lost {
            self.live.clear();
            self.bound_textures.clear();
            self.texture_images.clear();
            self.framebuffers.clear();
            self.bound_framebuffer = None;
            self.active_unit = 0;
            self.errors.clear();
        }
    }

    /// Changes the default framebuffer size, as a host resize would.
    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        self.drawing_buffer = (width, height);
    }

    /// Caps the number of live buffers; creating one more fails. `None` lifts the cap.
    pub fn set_buffer_budget(&mut self, budget: Option<usize>) {
        self.buffer_budget = budget;
    }

    /// Queues an error for the next `get_error`.
    pub fn push_error(&mut self, error: u32) {
        self.errors.push_back(error);
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Counts the recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Counts the recorded calls equal to `call`.
    pub fn count_of(&self, call: &NativeCall) -> usize {
        self.count(|recorded| recorded == call)
    }

    /// Number of live objects of a kind.
    pub fn live_objects(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|live| **live == kind).count()
    }

    fn record(&mut self, call: NativeCall) {
        self.calls.push(call);
    }

    fn allocate(&mut self, kind: ObjectKind) -> Result<NonZeroU32, String> {
        if self.lost {
            return Err("context lost".to_string());
        }
        let over_budget = self
            .buffer_budget
            .is_some_and(|budget| budget <= self.live_objects(ObjectKind::Buffer));
        if kind == ObjectKind::Buffer && over_budget {
            return Err("out of memory".to_string());
        }
        let handle = NonZeroU32::new(self.next_handle).ok_or("handle space exhausted")?;
        self.next_handle += 1;
        self.live.insert(handle.get(), kind);
        Ok(handle)
    }

    fn release(&mut self, handle: u32) {
        self.live.remove(&handle);
    }

    fn reflect_uniforms(sources: [&str; 2]) -> Vec<ActiveUniform> {
        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for line in sources.iter().flat_map(|source| source.lines()) {
            let mut tokens = line
                .trim()
                .trim_end_matches(';')
                .split_whitespace()
                .filter(|token| !matches!(*token, "lowp" | "mediump" | "highp"));
            if tokens.next() != Some("uniform") {
                continue;
            }
            let (Some(type_name), Some(declarator)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            let Some(native_type) = glsl_type_token(type_name) else {
                continue;
            };
            let (name, array_size) = match declarator.split_once('[') {
                Some((name, rest)) => (
                    name,
                    rest.trim_end_matches(']').parse::<u32>().unwrap_or(1),
                ),
                None => (declarator, 1),
            };
            if uniforms.iter().any(|uniform| uniform.name == name) {
                continue;
            }
            let location = NativeUniformLocation(uniforms.len() as u32);
            uniforms.push(ActiveUniform {
                name: name.to_string(),
                native_type,
                array_size,
                location,
            });
        }
        uniforms
    }
}

fn glsl_type_token(name: &str) -> Option<u32> {
    Some(match name {
        "bool" => glow::BOOL,
        "int" => glow::INT,
        "float" => glow::FLOAT,
        "vec2" => glow::FLOAT_VEC2,
        "vec3" => glow::FLOAT_VEC3,
        "vec4" => glow::FLOAT_VEC4,
        "ivec2" => glow::INT_VEC2,
        "ivec3" => glow::INT_VEC3,
        "ivec4" => glow::INT_VEC4,
        "bvec2" => glow::BOOL_VEC2,
        "bvec3" => glow::BOOL_VEC3,
        "bvec4" => glow::BOOL_VEC4,
        "mat2" => glow::FLOAT_MAT2,
        "mat3" => glow::FLOAT_MAT3,
        "mat4" => glow::FLOAT_MAT4,
        "sampler2D" => glow::SAMPLER_2D,
        "samplerCube" => glow::SAMPLER_CUBE,
        "sampler3D" => glow::SAMPLER_3D,
        "sampler2DShadow" => glow::SAMPLER_2D_SHADOW,
        "samplerCubeShadow" => glow::SAMPLER_CUBE_SHADOW,
        _ => return None,
    })
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::modern()
    }
}

impl NativeContext for HeadlessContext {
    fn tier(&self) -> ContextTier {
        self.tier
    }

    fn supports_extension(&mut self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn get_parameter_i32(&mut self, parameter: u32) -> i32 {
        self.parameters.get(&parameter).copied().unwrap_or(0)
    }

    fn get_parameter_f32(&mut self, parameter: u32) -> f32 {
        self.float_parameters
            .get(&parameter)
            .copied()
            .unwrap_or(0.0)
    }

    fn get_error(&mut self) -> u32 {
        self.errors.pop_front().unwrap_or(glow::NO_ERROR)
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.drawing_buffer
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn enable(&mut self, capability: u32) {
        self.record(NativeCall::Enable(capability));
    }

    fn disable(&mut self, capability: u32) {
        self.record(NativeCall::Disable(capability));
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.record(NativeCall::BlendFunc { src, dst });
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(NativeCall::BlendFuncSeparate {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        });
    }

    fn blend_equation(&mut self, mode: u32) {
        self.record(NativeCall::BlendEquation(mode));
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        self.record(NativeCall::BlendEquationSeparate {
            rgb: mode_rgb,
            alpha: mode_alpha,
        });
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(NativeCall::BlendColor([r, g, b, a]));
    }

    fn depth_func(&mut self, func: u32) {
        self.record(NativeCall::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.record(NativeCall::DepthMask(write));
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.record(NativeCall::ColorMask([r, g, b, a]));
    }

    fn cull_face(&mut self, face: u32) {
        self.record(NativeCall::CullFace(face));
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        self.record(NativeCall::StencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        self.record(NativeCall::StencilFuncSeparate {
            face,
            func,
            reference,
            mask,
        });
    }

    fn stencil_op(&mut self, fail: u32, depth_fail: u32, pass: u32) {
        self.record(NativeCall::StencilOp {
            fail,
            depth_fail,
            pass,
        });
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        self.record(NativeCall::StencilOpSeparate {
            face,
            fail,
            depth_fail,
            pass,
        });
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.record(NativeCall::StencilMask(mask));
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        self.record(NativeCall::StencilMaskSeparate { face, mask });
    }

    fn polygon_offset(&mut self, slope: f32, constant: f32) {
        self.record(NativeCall::PolygonOffset { slope, constant });
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(NativeCall::Viewport([x, y, width, height]));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(NativeCall::Scissor([x, y, width, height]));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(NativeCall::ClearColor([r, g, b, a]));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(NativeCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.record(NativeCall::ClearStencil(stencil));
    }

    fn clear(&mut self, mask: u32) {
        self.record(NativeCall::Clear(mask));
    }

    fn create_texture(&mut self) -> Result<NativeTexture, String> {
        let texture = NativeTexture(self.allocate(ObjectKind::Texture)?);
        self.record(NativeCall::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: NativeTexture) {
        self.release(texture.get());
        self.texture_images.remove(&texture);
        self.bound_textures.retain(|_, bound| *bound != texture);
        self.record(NativeCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
        self.record(NativeCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: u32, texture: Option<NativeTexture>) {
        match texture {
            Some(texture) => {
                self.bound_textures.insert((self.active_unit, target), texture);
            }
            None => {
                self.bound_textures.remove(&(self.active_unit, target));
            }
        }
        self.record(NativeCall::BindTexture { target, texture });
    }

    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32) {
        self.record(NativeCall::TexParameterI32 {
            target,
            parameter,
            value,
        });
    }

    fn tex_parameter_f32(&mut self, target: u32, parameter: u32, value: f32) {
        self.record(NativeCall::TexParameterF32 {
            target,
            parameter,
            value,
        });
    }

    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        let bind_target = if (glow::TEXTURE_CUBE_MAP_POSITIVE_X..=glow::TEXTURE_CUBE_MAP_NEGATIVE_Z)
            .contains(&target)
        {
            glow::TEXTURE_CUBE_MAP
        } else {
            target
        };
        if pixels.is_some() && self.rejected_upload_types.contains(&ty) {
            self.errors.push_back(glow::INVALID_OPERATION);
        } else if let Some(texture) = self.bound_textures.get(&(self.active_unit, bind_target)) {
            self.texture_images.insert(*texture, TextureImage { ty });
        }
        self.record(NativeCall::TexImage {
            target,
            level,
            internal_format,
            width,
            height,
            depth: 1,
            format,
            ty,
            has_data: pixels.is_some(),
        });
    }

    fn tex_image_3d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        if let Some(texture) = self.bound_textures.get(&(self.active_unit, target)) {
            self.texture_images.insert(*texture, TextureImage { ty });
        }
        self.record(NativeCall::TexImage {
            target,
            level,
            internal_format,
            width,
            height,
            depth,
            format,
            ty,
            has_data: pixels.is_some(),
        });
    }

    fn generate_mipmap(&mut self, target: u32) {
        self.record(NativeCall::GenerateMipmap(target));
    }

    fn create_buffer(&mut self) -> Result<NativeBuffer, String> {
        let buffer = NativeBuffer(self.allocate(ObjectKind::Buffer)?);
        self.record(NativeCall::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: NativeBuffer) {
        self.release(buffer.get());
        self.record(NativeCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<NativeBuffer>) {
        self.record(NativeCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.record(NativeCall::BufferData {
            target,
            size: data.len(),
            usage,
        });
    }

    fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<NativeBuffer>) {
        self.record(NativeCall::BindBufferBase {
            target,
            index,
            buffer,
        });
    }

    fn create_vertex_array(&mut self) -> Result<NativeVertexArray, String> {
        let vertex_array = NativeVertexArray(self.allocate(ObjectKind::VertexArray)?);
        self.record(NativeCall::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn delete_vertex_array(&mut self, vertex_array: NativeVertexArray) {
        self.release(vertex_array.get());
        self.record(NativeCall::DeleteVertexArray(vertex_array));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<NativeVertexArray>) {
        self.record(NativeCall::BindVertexArray(vertex_array));
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.record(NativeCall::EnableVertexAttribArray(location));
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.record(NativeCall::DisableVertexAttribArray(location));
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record(NativeCall::VertexAttribPointer {
            location,
            components,
            ty,
            normalized,
            stride,
            offset,
        });
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        self.record(NativeCall::VertexAttribDivisor { location, divisor });
    }

    fn link_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        _attributes: &[AttributeBinding<'_>],
        _feedback_varyings: &[String],
    ) -> Result<LinkedProgram, String> {
        if vertex_source.contains("#error") || fragment_source.contains("#error") {
            return Err("ERROR: 0:1: '#error' : compilation terminated".to_string());
        }
        let program = NativeProgram(self.allocate(ObjectKind::Program)?);
        self.record(NativeCall::LinkProgram(program));
        Ok(LinkedProgram {
            program,
            uniforms: Self::reflect_uniforms([vertex_source, fragment_source]),
        })
    }

    fn delete_program(&mut self, program: NativeProgram) {
        self.release(program.get());
        self.record(NativeCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<NativeProgram>) {
        self.record(NativeCall::UseProgram(program));
    }

    fn uniform_i32(&mut self, location: NativeUniformLocation, components: u32, values: &[i32]) {
        self.record(NativeCall::UniformI32 {
            location,
            components,
            values: values.to_vec(),
        });
    }

    fn uniform_f32(&mut self, location: NativeUniformLocation, components: u32, values: &[f32]) {
        self.record(NativeCall::UniformF32 {
            location,
            components,
            values: values.to_vec(),
        });
    }

    fn uniform_matrix_f32(&mut self, location: NativeUniformLocation, dimension: u32, values: &[f32]) {
        self.record(NativeCall::UniformMatrix {
            location,
            dimension,
            values: values.to_vec(),
        });
    }

    fn begin_transform_feedback(&mut self, primitive_mode: u32) {
        self.record(NativeCall::BeginTransformFeedback(primitive_mode));
    }

    fn end_transform_feedback(&mut self) {
        self.record(NativeCall::EndTransformFeedback);
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.record(NativeCall::DrawArrays { mode, first, count });
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.record(NativeCall::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: i32) {
        self.record(NativeCall::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    ) {
        self.record(NativeCall::DrawElementsInstanced {
            mode,
            count,
            index_type,
            offset,
            instances,
        });
    }

    fn create_framebuffer(&mut self) -> Result<NativeFramebuffer, String> {
        let framebuffer = NativeFramebuffer(self.allocate(ObjectKind::Framebuffer)?);
        self.framebuffers
            .insert(framebuffer, FramebufferAttachments::default());
        self.record(NativeCall::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn delete_framebuffer(&mut self, framebuffer: NativeFramebuffer) {
        self.release(framebuffer.get());
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
        self.record(NativeCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<NativeFramebuffer>) {
        if target != glow::READ_FRAMEBUFFER {
            self.bound_framebuffer = framebuffer;
        }
        self.record(NativeCall::BindFramebuffer {
            target,
            framebuffer,
        });
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<NativeTexture>,
        level: i32,
    ) {
        if let Some(attachments) = self
            .bound_framebuffer
            .and_then(|bound| self.framebuffers.get_mut(&bound))
        {
            if attachment == glow::COLOR_ATTACHMENT0 {
                attachments.color = texture;
            } else {
                attachments.depth = texture.is_some();
            }
        }
        self.record(NativeCall::FramebufferTexture2D {
            target,
            attachment,
            texture_target,
            texture,
            level,
        });
    }

    fn create_renderbuffer(&mut self) -> Result<NativeRenderbuffer, String> {
        let renderbuffer = NativeRenderbuffer(self.allocate(ObjectKind::Renderbuffer)?);
        self.record(NativeCall::CreateRenderbuffer(renderbuffer));
        Ok(renderbuffer)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: NativeRenderbuffer) {
        self.release(renderbuffer.get());
        self.record(NativeCall::DeleteRenderbuffer(renderbuffer));
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<NativeRenderbuffer>) {
        self.record(NativeCall::BindRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, internal_format: u32, width: i32, height: i32) {
        self.record(NativeCall::RenderbufferStorage {
            samples: 0,
            internal_format,
            width,
            height,
        });
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        self.record(NativeCall::RenderbufferStorage {
            samples,
            internal_format,
            width,
            height,
        });
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<NativeRenderbuffer>,
    ) {
        if let Some(attachments) = self
            .bound_framebuffer
            .and_then(|bound| self.framebuffers.get_mut(&bound))
        {
            if attachment == glow::COLOR_ATTACHMENT0 {
                attachments.color_renderbuffer = renderbuffer.is_some();
            } else {
                attachments.depth = renderbuffer.is_some();
            }
        }
        self.record(NativeCall::FramebufferRenderbuffer {
            target,
            attachment,
            renderbuffer,
        });
    }

    fn check_framebuffer_status(&mut self, _target: u32) -> u32 {
        let Some(bound) = self.bound_framebuffer else {
            return glow::FRAMEBUFFER_COMPLETE;
        };
        let Some(attachments) = self.framebuffers.get(&bound) else {
            return glow::FRAMEBUFFER_UNSUPPORTED;
        };
        match attachments.color {
            Some(texture) => {
                let ty = self
                    .texture_images
                    .get(&texture)
                    .map(|image| image.ty)
                    .unwrap_or(glow::UNSIGNED_BYTE);
                if self.renderable_types.contains(&ty) {
                    glow::FRAMEBUFFER_COMPLETE
                } else {
                    glow::FRAMEBUFFER_UNSUPPORTED
                }
            }
            None if attachments.color_renderbuffer || attachments.depth => {
                glow::FRAMEBUFFER_COMPLETE
            }
            None => glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
        }
    }

    fn blit_framebuffer(
        &mut self,
        src: (i32, i32, i32, i32),
        dst: (i32, i32, i32, i32),
        mask: u32,
        filter: u32,
    ) {
        self.record(NativeCall::BlitFramebuffer {
            src,
            dst,
            mask,
            filter,
        });
    }

    fn invalidate_framebuffer(&mut self, target: u32, attachments: &[u32]) {
        self.record(NativeCall::InvalidateFramebuffer {
            target,
            attachments: attachments.to_vec(),
        });
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: &mut [u8],
    ) {
        for (byte, value) in pixels.iter_mut().zip(self.read_back.iter().cycle()) {
            *byte = *value;
        }
        self.record(NativeCall::ReadPixels {
            x,
            y,
            width,
            height,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflects_uniform_declarations() {
        let vertex = "uniform mat4 matrix_model;\nuniform highp vec3 light_dir[4];\n";
        let fragment = "precision mediump float;\nuniform sampler2D texture_diffuse;\nuniform mat4 matrix_model;\n";
        let uniforms = HeadlessContext::reflect_uniforms([vertex, fragment]);
        assert_eq!(uniforms.len(), 3);
        assert_eq!(uniforms[0].native_type, glow::FLOAT_MAT4);
        assert_eq!(uniforms[1].name, "light_dir");
        assert_eq!(uniforms[1].array_size, 4);
        assert_eq!(uniforms[2].native_type, glow::SAMPLER_2D);
    }

    #[test]
    fn framebuffer_completeness_follows_pixel_type() {
        let mut ctx = HeadlessContext::legacy();
        let texture = ctx.create_texture().unwrap();
        ctx.bind_texture(glow::TEXTURE_2D, Some(texture));
        ctx.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA as i32,
            2,
            2,
            glow::RGBA,
            glow::FLOAT,
            None,
        );
        let framebuffer = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        ctx.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(texture),
            0,
        );
        assert_eq!(
            ctx.check_framebuffer_status(glow::FRAMEBUFFER),
            glow::FRAMEBUFFER_UNSUPPORTED
        );
    }

    #[test]
    fn rejected_upload_raises_error() {
        let mut ctx = HeadlessContext::legacy().with_half_float_updatable(false);
        ctx.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA as i32,
            1,
            1,
            glow::RGBA,
            HALF_FLOAT_OES,
            Some(&[0; 8]),
        );
        assert_eq!(ctx.get_error(), glow::INVALID_OPERATION);
        assert_eq!(ctx.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn error_directive_fails_link() {
        let mut ctx = HeadlessContext::modern();
        assert!(ctx.link_program("#error broken", "", &[], &[]).is_err());
        assert_eq!(ctx.live_objects(ObjectKind::Program), 0);
    }
}
