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

//! The native operation interface the device drives.

use crate::renderer::api::{
    ContextTier, LinkedProgram, NativeBuffer, NativeFramebuffer, NativeProgram,
    NativeRenderbuffer, NativeTexture, NativeUniformLocation, NativeVertexArray,
};
use std::fmt::Debug;

/// A vertex attribute name bound to a fixed location before linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding<'a> {
    /// The attribute name in the vertex source.
    pub name: &'a str,
    /// The location to bind it to.
    pub location: u32,
}

/// A GL-class native graphics context.
///
/// Tokens (`u32` parameters named after GL enums) are native values produced by the
/// device's translation tables; implementations pass them through untouched. The
/// interface is deliberately thin: it carries no caching and no validation, so that
/// every call the device makes is observable one-to-one.
///
/// Texture units are passed as zero-based indices; the implementation adds the
/// base unit token itself.
pub trait NativeContext: Debug {
    // --- Context information ---

    /// The feature tier of the context.
    fn tier(&self) -> ContextTier;

    /// Returns `true` if the named extension is available (and enables it where the
    /// platform requires enabling).
    fn supports_extension(&mut self, name: &str) -> bool;

    /// Queries an integer parameter. Unknown parameters report 0.
    fn get_parameter_i32(&mut self, parameter: u32) -> i32;

    /// Queries a float parameter. Unknown parameters report 0.0.
    fn get_parameter_f32(&mut self, parameter: u32) -> f32;

    /// Pops the oldest recorded error, or 0 (`NO_ERROR`).
    fn get_error(&mut self) -> u32;

    /// The size in pixels of the default framebuffer.
    fn drawing_buffer_size(&self) -> (u32, u32);

    /// Returns `true` if the context has been lost.
    fn is_context_lost(&self) -> bool;

    // --- Fixed-function state ---

    /// Enables a capability.
    fn enable(&mut self, capability: u32);
    /// Disables a capability.
    fn disable(&mut self, capability: u32);
    /// Sets the blend factors for all channels.
    fn blend_func(&mut self, src: u32, dst: u32);
    /// Sets the blend factors for color and alpha independently.
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    /// Sets the blend equation for all channels.
    fn blend_equation(&mut self, mode: u32);
    /// Sets the blend equation for color and alpha independently.
    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32);
    /// Sets the constant blend color.
    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    /// Sets the depth comparison function.
    fn depth_func(&mut self, func: u32);
    /// Enables or disables depth writes.
    fn depth_mask(&mut self, write: bool);
    /// Sets the color write mask.
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    /// Selects the face culled when culling is enabled.
    fn cull_face(&mut self, face: u32);
    /// Sets the stencil function for both faces.
    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32);
    /// Sets the stencil function for one face.
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32);
    /// Sets the stencil operations for both faces.
    fn stencil_op(&mut self, fail: u32, depth_fail: u32, pass: u32);
    /// Sets the stencil operations for one face.
    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, pass: u32);
    /// Sets the stencil write mask for both faces.
    fn stencil_mask(&mut self, mask: u32);
    /// Sets the stencil write mask for one face.
    fn stencil_mask_separate(&mut self, face: u32, mask: u32);
    /// Sets the depth bias factors.
    fn polygon_offset(&mut self, slope: f32, constant: f32);
    /// Sets the viewport.
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// Sets the scissor rectangle.
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// Sets the clear color.
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    /// Sets the clear depth.
    fn clear_depth(&mut self, depth: f32);
    /// Sets the clear stencil value.
    fn clear_stencil(&mut self, stencil: i32);
    /// Clears the buffers selected by `mask`.
    fn clear(&mut self, mask: u32);

    // --- Textures ---

    /// Creates a texture object.
    fn create_texture(&mut self) -> Result<NativeTexture, String>;
    /// Deletes a texture object.
    fn delete_texture(&mut self, texture: NativeTexture);
    /// Makes a texture unit active.
    fn active_texture(&mut self, unit: u32);
    /// Binds a texture to a target of the active unit.
    fn bind_texture(&mut self, target: u32, texture: Option<NativeTexture>);
    /// Sets an integer parameter of the texture bound to `target`.
    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32);
    /// Sets a float parameter of the texture bound to `target`.
    fn tex_parameter_f32(&mut self, target: u32, parameter: u32, value: f32);
    /// Specifies a 2D image (or cube face) of the bound texture.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// Specifies a 3D image of the bound texture.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// Generates the mip chain of the texture bound to `target`.
    fn generate_mipmap(&mut self, target: u32);

    // --- Buffers and vertex arrays ---

    /// Creates a buffer object.
    fn create_buffer(&mut self) -> Result<NativeBuffer, String>;
    /// Deletes a buffer object.
    fn delete_buffer(&mut self, buffer: NativeBuffer);
    /// Binds a buffer to a target.
    fn bind_buffer(&mut self, target: u32, buffer: Option<NativeBuffer>);
    /// Uploads data to the buffer bound to `target`.
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    /// Binds a buffer to an indexed binding point.
    fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<NativeBuffer>);
    /// Creates a vertex array object.
    fn create_vertex_array(&mut self) -> Result<NativeVertexArray, String>;
    /// Deletes a vertex array object.
    fn delete_vertex_array(&mut self, vertex_array: NativeVertexArray);
    /// Binds a vertex array object.
    fn bind_vertex_array(&mut self, vertex_array: Option<NativeVertexArray>);
    /// Enables an attribute location.
    fn enable_vertex_attrib_array(&mut self, location: u32);
    /// Disables an attribute location.
    fn disable_vertex_attrib_array(&mut self, location: u32);
    /// Wires an attribute location to the bound array buffer.
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    /// Sets the per-instance step rate of an attribute location.
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32);

    // --- Programs ---

    /// Compiles and links a program, binding attributes before the link.
    ///
    /// On failure the error carries the compile or link log.
    fn link_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        attributes: &[AttributeBinding<'_>],
        feedback_varyings: &[String],
    ) -> Result<LinkedProgram, String>;
    /// Deletes a program.
    fn delete_program(&mut self, program: NativeProgram);
    /// Makes a program current.
    fn use_program(&mut self, program: Option<NativeProgram>);
    /// Sets an integer uniform (or array of vectors) with `components` per element.
    fn uniform_i32(&mut self, location: NativeUniformLocation, components: u32, values: &[i32]);
    /// Sets a float uniform (or array of vectors) with `components` per element.
    fn uniform_f32(&mut self, location: NativeUniformLocation, components: u32, values: &[f32]);
    /// Sets a square matrix uniform of the given dimension.
    fn uniform_matrix_f32(&mut self, location: NativeUniformLocation, dimension: u32, values: &[f32]);
    /// Starts capturing transform feedback.
    fn begin_transform_feedback(&mut self, primitive_mode: u32);
    /// Stops capturing transform feedback.
    fn end_transform_feedback(&mut self);

    // --- Draws ---

    /// Draws non-indexed primitives.
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    /// Draws non-indexed primitives, several instances.
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);
    /// Draws indexed primitives; `offset` is in bytes.
    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: i32);
    /// Draws indexed primitives, several instances; `offset` is in bytes.
    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    );

    // --- Framebuffers ---

    /// Creates a framebuffer object.
    fn create_framebuffer(&mut self) -> Result<NativeFramebuffer, String>;
    /// Deletes a framebuffer object.
    fn delete_framebuffer(&mut self, framebuffer: NativeFramebuffer);
    /// Binds a framebuffer; `None` selects the default framebuffer.
    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<NativeFramebuffer>);
    /// Attaches a texture level to the bound framebuffer.
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<NativeTexture>,
        level: i32,
    );
    /// Creates a renderbuffer object.
    fn create_renderbuffer(&mut self) -> Result<NativeRenderbuffer, String>;
    /// Deletes a renderbuffer object.
    fn delete_renderbuffer(&mut self, renderbuffer: NativeRenderbuffer);
    /// Binds a renderbuffer.
    fn bind_renderbuffer(&mut self, renderbuffer: Option<NativeRenderbuffer>);
    /// Allocates storage for the bound renderbuffer.
    fn renderbuffer_storage(&mut self, internal_format: u32, width: i32, height: i32);
    /// Allocates multisampled storage for the bound renderbuffer.
    fn renderbuffer_storage_multisample(
        &mut self,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );
    /// Attaches a renderbuffer to the bound framebuffer.
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<NativeRenderbuffer>,
    );
    /// Returns the completeness status of the bound framebuffer.
    fn check_framebuffer_status(&mut self, target: u32) -> u32;
    /// Copies a rectangle from the read framebuffer to the draw framebuffer.
    #[allow(clippy::too_many_arguments)]
    fn blit_framebuffer(
        &mut self,
        src: (i32, i32, i32, i32),
        dst: (i32, i32, i32, i32),
        mask: u32,
        filter: u32,
    );
    /// Hints that the listed attachments' contents are no longer needed.
    fn invalidate_framebuffer(&mut self, target: u32, attachments: &[u32]);
    /// Reads pixels from the bound read framebuffer into `pixels`.
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    );
}
