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

//! A [`NativeContext`] over a real OpenGL / OpenGL ES context, through `glow`.
//!
//! Every native call is `unsafe` in `glow`: it requires the wrapped context to be
//! current on the calling thread. [`GlowContext`] is not `Send`-bound to a thread by
//! the type system, so creating it is the point where the caller takes on that
//! obligation.

use std::fmt;

use anyhow::{bail, Context as _};
use glow::HasContext;
use strata_core::renderer::api::{
    ActiveUniform, ContextTier, LinkedProgram, NativeBuffer, NativeFramebuffer, NativeProgram,
    NativeRenderbuffer, NativeTexture, NativeUniformLocation, NativeVertexArray,
};
use strata_core::renderer::traits::{AttributeBinding, NativeContext};

/// Error code reported once the context has been lost.
const CONTEXT_LOST: u32 = 0x0507;

/// A native OpenGL (3.3+) or OpenGL ES (2.0+) context.
pub struct GlowContext {
    gl: glow::Context,
    tier: ContextTier,
    size: (u32, u32),
    lost: bool,
}

impl fmt::Debug for GlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowContext")
            .field("tier", &self.tier)
            .field("size", &self.size)
            .field("lost", &self.lost)
            .finish_non_exhaustive()
    }
}

impl GlowContext {
    /// Wraps a current `glow` context whose default framebuffer is `size` pixels.
    ///
    /// The tier is taken from the context version: OpenGL ES 3.0 or desktop
    /// OpenGL 3.3 and above are modern, OpenGL ES 2.0 is legacy.
    pub fn new(gl: glow::Context, size: (u32, u32)) -> anyhow::Result<Self> {
        let version = gl.version();
        let tier = match (version.is_embedded, version.major, version.minor) {
            (true, 3.., _) => ContextTier::Modern,
            (true, 2, _) => ContextTier::Legacy,
            (false, 4.., _) | (false, 3, 3..) => ContextTier::Modern,
            (embedded, major, minor) => bail!(
                "unsupported {} {major}.{minor} context",
                if embedded { "OpenGL ES" } else { "OpenGL" }
            ),
        };
        log::info!(
            "Wrapping {} {}.{} context ({:?} tier): {}",
            if version.is_embedded { "OpenGL ES" } else { "OpenGL" },
            version.major,
            version.minor,
            tier,
            version.vendor_info
        );
        Ok(Self {
            gl,
            tier,
            size,
            lost: false,
        })
    }

    /// Records a host-side resize of the default framebuffer.
    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Marks the context lost or restored, for hosts that learn about it out of band.
    pub fn set_context_lost(&mut self, lost: bool) {
        self.lost = lost;
    }

    /// The wrapped `glow` context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    unsafe fn compile(&self, stage: u32, source: &str) -> Result<glow::Shader, String> {
        let shader = self.gl.create_shader(stage)?;
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if self.gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(shader);
            self.gl.delete_shader(shader);
            Err(log)
        }
    }

    unsafe fn reflect(&self, program: glow::Program) -> Vec<ActiveUniform> {
        let count = self.gl.get_active_uniforms(program);
        (0..count)
            .filter_map(|index| {
                let uniform = self.gl.get_active_uniform(program, index)?;
                let location = self.gl.get_uniform_location(program, &uniform.name)?;
                Some(ActiveUniform {
                    name: uniform.name.trim_end_matches("[0]").to_string(),
                    native_type: uniform.utype,
                    array_size: uniform.size.max(1) as u32,
                    location: NativeUniformLocation(location.0),
                })
            })
            .collect()
    }
}

fn uniform_location(location: NativeUniformLocation) -> glow::UniformLocation {
    glow::NativeUniformLocation(location.0)
}

impl NativeContext for GlowContext {
    fn tier(&self) -> ContextTier {
        self.tier
    }

    fn supports_extension(&mut self, name: &str) -> bool {
        let extensions = self.gl.supported_extensions();
        extensions.contains(name) || extensions.contains(&format!("GL_{name}"))
    }

    fn get_parameter_i32(&mut self, parameter: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(parameter) }
    }

    fn get_parameter_f32(&mut self, parameter: u32) -> f32 {
        unsafe { self.gl.get_parameter_f32(parameter) }
    }

    fn get_error(&mut self) -> u32 {
        let error = unsafe { self.gl.get_error() };
        if error == CONTEXT_LOST {
            self.lost = true;
        }
        error
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn enable(&mut self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }

    fn disable(&mut self, capability: u32) {
        unsafe { self.gl.disable(capability) }
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        unsafe { self.gl.blend_func(src, dst) }
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe {
            self.gl
                .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
        }
    }

    fn blend_equation(&mut self, mode: u32) {
        unsafe { self.gl.blend_equation(mode) }
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        unsafe { self.gl.blend_equation_separate(mode_rgb, mode_alpha) }
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.blend_color(r, g, b, a) }
    }

    fn depth_func(&mut self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }

    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { self.gl.color_mask(r, g, b, a) }
    }

    fn cull_face(&mut self, face: u32) {
        unsafe { self.gl.cull_face(face) }
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func(func, reference, mask) }
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func_separate(face, func, reference, mask) }
    }

    fn stencil_op(&mut self, fail: u32, depth_fail: u32, pass: u32) {
        unsafe { self.gl.stencil_op(fail, depth_fail, pass) }
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        unsafe { self.gl.stencil_op_separate(face, fail, depth_fail, pass) }
    }

    fn stencil_mask(&mut self, mask: u32) {
        unsafe { self.gl.stencil_mask(mask) }
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        unsafe { self.gl.stencil_mask_separate(face, mask) }
    }

    fn polygon_offset(&mut self, slope: f32, constant: f32) {
        unsafe { self.gl.polygon_offset(slope, constant) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear_depth(&mut self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) }
    }

    fn clear_stencil(&mut self, stencil: i32) {
        unsafe { self.gl.clear_stencil(stencil) }
    }

    fn clear(&mut self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn create_texture(&mut self) -> Result<NativeTexture, String> {
        let texture = unsafe { self.gl.create_texture()? };
        Ok(NativeTexture(texture.0))
    }

    fn delete_texture(&mut self, texture: NativeTexture) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.0)) }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&mut self, target: u32, texture: Option<NativeTexture>) {
        let texture = texture.map(|texture| glow::NativeTexture(texture.0));
        unsafe { self.gl.bind_texture(target, texture) }
    }

    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn tex_parameter_f32(&mut self, target: u32, parameter: u32, value: f32) {
        unsafe { self.gl.tex_parameter_f32(target, parameter, value) }
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
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
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
        unsafe {
            self.gl.tex_image_3d(
                target,
                level,
                internal_format,
                width,
                height,
                depth,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn generate_mipmap(&mut self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn create_buffer(&mut self) -> Result<NativeBuffer, String> {
        let buffer = unsafe { self.gl.create_buffer()? };
        Ok(NativeBuffer(buffer.0))
    }

    fn delete_buffer(&mut self, buffer: NativeBuffer) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer.0)) }
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<NativeBuffer>) {
        let buffer = buffer.map(|buffer| glow::NativeBuffer(buffer.0));
        unsafe { self.gl.bind_buffer(target, buffer) }
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<NativeBuffer>) {
        let buffer = buffer.map(|buffer| glow::NativeBuffer(buffer.0));
        unsafe { self.gl.bind_buffer_base(target, index, buffer) }
    }

    fn create_vertex_array(&mut self) -> Result<NativeVertexArray, String> {
        let vertex_array = unsafe { self.gl.create_vertex_array()? };
        Ok(NativeVertexArray(vertex_array.0))
    }

    fn delete_vertex_array(&mut self, vertex_array: NativeVertexArray) {
        unsafe {
            self.gl
                .delete_vertex_array(glow::NativeVertexArray(vertex_array.0))
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<NativeVertexArray>) {
        let vertex_array = vertex_array.map(|vertex_array| glow::NativeVertexArray(vertex_array.0));
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) }
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
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(location, components, ty, normalized, stride, offset)
        }
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) }
    }

    fn link_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        attributes: &[AttributeBinding<'_>],
        feedback_varyings: &[String],
    ) -> Result<LinkedProgram, String> {
        unsafe {
            let vertex = self.compile(glow::VERTEX_SHADER, vertex_source)?;
            let fragment = match self.compile(glow::FRAGMENT_SHADER, fragment_source) {
                Ok(fragment) => fragment,
                Err(log) => {
                    self.gl.delete_shader(vertex);
                    return Err(log);
                }
            };
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            for attribute in attributes {
                self.gl
                    .bind_attrib_location(program, attribute.location, attribute.name);
            }
            if !feedback_varyings.is_empty() {
                let varyings: Vec<&str> = feedback_varyings.iter().map(String::as_str).collect();
                self.gl
                    .transform_feedback_varyings(program, &varyings, glow::INTERLEAVED_ATTRIBS);
            }
            self.gl.link_program(program);

            for shader in [vertex, fragment] {
                self.gl.detach_shader(program, shader);
                self.gl.delete_shader(shader);
            }
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }

            Ok(LinkedProgram {
                program: NativeProgram(program.0),
                uniforms: self.reflect(program),
            })
        }
    }

    fn delete_program(&mut self, program: NativeProgram) {
        unsafe { self.gl.delete_program(glow::NativeProgram(program.0)) }
    }

    fn use_program(&mut self, program: Option<NativeProgram>) {
        let program = program.map(|program| glow::NativeProgram(program.0));
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_i32(&mut self, location: NativeUniformLocation, components: u32, values: &[i32]) {
        let location = uniform_location(location);
        let location = Some(&location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_i32_slice(location, values),
                2 => self.gl.uniform_2_i32_slice(location, values),
                3 => self.gl.uniform_3_i32_slice(location, values),
                _ => self.gl.uniform_4_i32_slice(location, values),
            }
        }
    }

    fn uniform_f32(&mut self, location: NativeUniformLocation, components: u32, values: &[f32]) {
        let location = uniform_location(location);
        let location = Some(&location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_f32_slice(location, values),
                2 => self.gl.uniform_2_f32_slice(location, values),
                3 => self.gl.uniform_3_f32_slice(location, values),
                _ => self.gl.uniform_4_f32_slice(location, values),
            }
        }
    }

    fn uniform_matrix_f32(&mut self, location: NativeUniformLocation, dimension: u32, values: &[f32]) {
        let location = uniform_location(location);
        let location = Some(&location);
        unsafe {
            match dimension {
                2 => self.gl.uniform_matrix_2_f32_slice(location, false, values),
                3 => self.gl.uniform_matrix_3_f32_slice(location, false, values),
                _ => self.gl.uniform_matrix_4_f32_slice(location, false, values),
            }
        }
    }

    fn begin_transform_feedback(&mut self, primitive_mode: u32) {
        unsafe { self.gl.begin_transform_feedback(primitive_mode) }
    }

    fn end_transform_feedback(&mut self) {
        unsafe { self.gl.end_transform_feedback() }
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, index_type, offset) }
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.gl
                .draw_elements_instanced(mode, count, index_type, offset, instances)
        }
    }

    fn create_framebuffer(&mut self) -> Result<NativeFramebuffer, String> {
        let framebuffer = unsafe { self.gl.create_framebuffer()? };
        Ok(NativeFramebuffer(framebuffer.0))
    }

    fn delete_framebuffer(&mut self, framebuffer: NativeFramebuffer) {
        unsafe {
            self.gl
                .delete_framebuffer(glow::NativeFramebuffer(framebuffer.0))
        }
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<NativeFramebuffer>) {
        let framebuffer = framebuffer.map(|framebuffer| glow::NativeFramebuffer(framebuffer.0));
        unsafe { self.gl.bind_framebuffer(target, framebuffer) }
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<NativeTexture>,
        level: i32,
    ) {
        let texture = texture.map(|texture| glow::NativeTexture(texture.0));
        unsafe {
            self.gl
                .framebuffer_texture_2d(target, attachment, texture_target, texture, level)
        }
    }

    fn create_renderbuffer(&mut self) -> Result<NativeRenderbuffer, String> {
        let renderbuffer = unsafe { self.gl.create_renderbuffer()? };
        Ok(NativeRenderbuffer(renderbuffer.0))
    }

    fn delete_renderbuffer(&mut self, renderbuffer: NativeRenderbuffer) {
        unsafe {
            self.gl
                .delete_renderbuffer(glow::NativeRenderbuffer(renderbuffer.0))
        }
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<NativeRenderbuffer>) {
        let renderbuffer =
            renderbuffer.map(|renderbuffer| glow::NativeRenderbuffer(renderbuffer.0));
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer) }
    }

    fn renderbuffer_storage(&mut self, internal_format: u32, width: i32, height: i32) {
        unsafe {
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal_format, width, height)
        }
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        unsafe {
            self.gl.renderbuffer_storage_multisample(
                glow::RENDERBUFFER,
                samples,
                internal_format,
                width,
                height,
            )
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<NativeRenderbuffer>,
    ) {
        let renderbuffer =
            renderbuffer.map(|renderbuffer| glow::NativeRenderbuffer(renderbuffer.0));
        unsafe {
            self.gl
                .framebuffer_renderbuffer(target, attachment, glow::RENDERBUFFER, renderbuffer)
        }
    }

    fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn blit_framebuffer(
        &mut self,
        src: (i32, i32, i32, i32),
        dst: (i32, i32, i32, i32),
        mask: u32,
        filter: u32,
    ) {
        unsafe {
            self.gl.blit_framebuffer(
                src.0, src.1, src.2, src.3, dst.0, dst.1, dst.2, dst.3, mask, filter,
            )
        }
    }

    fn invalidate_framebuffer(&mut self, target: u32, attachments: &[u32]) {
        unsafe { self.gl.invalidate_framebuffer(target, attachments) }
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    ) {
        unsafe {
            self.gl.read_pixels(
                x,
                y,
                width,
                height,
                format,
                ty,
                glow::PixelPackData::Slice(Some(pixels)),
            )
        }
    }
}

/// Creates a [`GlowContext`] from a loader, as windowing crates expose one.
///
/// # Safety
///
/// The GL context the loader resolves against must be current on this thread and
/// stay current for the lifetime of the returned value.
pub unsafe fn from_loader<F>(loader: F, size: (u32, u32)) -> anyhow::Result<GlowContext>
where
    F: FnMut(&str) -> *const std::ffi::c_void,
{
    let gl = glow::Context::from_loader_function(loader);
    GlowContext::new(gl, size).context("wrapping the loaded GL context")
}
