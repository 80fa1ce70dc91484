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

//! Draw submission, clears, render passes, render-target copies and read-back.

use strata_core::event::DeviceEvent;
use strata_core::renderer::api::{
    BufferUsage, ClearFlags, ClearOptions, CullMode, NativeFramebuffer, PipelineState, PixelFormat,
    Primitive, PrimitiveTopology, Rect, RenderPass, RenderTargetId, ShaderDefinition, ShaderId,
    TextureId, TextureTarget, UniformValue, VertexBufferId, VertexDataType, VertexElement, VertexFormat,
    VertexSemantic,
};
use strata_core::renderer::traits::NativeContext;
use strata_core::renderer::{RenderError, ResourceError};

use super::bindings::texture_mipmapped;
use super::capabilities::QUAD_VERTICES;
use super::device::{backend_error, unknown_resource, GlDevice};

const COPY_VERTEX_SOURCE: &str = "attribute vec2 vertex_position;
varying vec2 uv;
void main() {
    gl_Position = vec4(vertex_position, 0.5, 1.0);
    uv = vertex_position * 0.5 + 0.5;
}
";

const COPY_FRAGMENT_SOURCE: &str = "precision mediump float;
varying vec2 uv;
uniform sampler2D source;
void main() {
    gl_FragColor = texture2D(source, uv);
}
";

/// Name of the scope entry the copy shader samples from.
const COPY_SOURCE_UNIFORM: &str = "source";

impl<C: NativeContext> GlDevice<C> {
    // --- Frame ---

    /// Starts a frame: checks for a context loss or a resized drawing buffer and
    /// resets the per-frame statistics.
    pub fn frame_start(&mut self) {
        self.sync_context_state();
        if !self.lost {
            let (width, height) = self.ctx.drawing_buffer_size();
            self.resize(width, height);
        }
        self.stats.reset_frame();
        self.stats.frame_number += 1;
    }

    /// Ends a frame, dropping any vertex buffers queued but never drawn.
    pub fn frame_end(&mut self) {
        if self.in_pass {
            log::warn!("Frame ended inside a render pass.");
        }
        self.active.vertex_buffers.clear();
    }

    /// Records a new drawing buffer size and notifies listeners. No-op if unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.backbuffer == (width, height) {
            return;
        }
        self.backbuffer = (width, height);
        log::debug!("Drawing buffer resized to {width}x{height}.");
        self.events.emit(DeviceEvent::Resized { width, height });
    }

    // --- Draws ---

    /// Selects the buffer transform feedback captures into, or `None` to stop.
    pub fn set_transform_feedback_buffer(
        &mut self,
        id: Option<VertexBufferId>,
    ) -> Result<(), RenderError> {
        if let Some(id) = id {
            if !self.vertex_buffers.contains_key(&id) {
                return Err(unknown_resource("vertex buffer", id));
            }
            if !self.capabilities.supports_transform_feedback {
                return Err(RenderError::InvalidOperation(
                    "transform feedback needs a modern context".to_string(),
                ));
            }
        }
        self.active.transform_feedback = id;
        Ok(())
    }

    /// Draws with the current shader, buffers and state.
    ///
    /// Unless `keep_buffers` is set, the queued vertex buffers are resolved to a
    /// layout first. Any nonzero `instances` count issues an instanced draw. Nothing is
    /// drawn while the context is lost or when no shader is set.
    pub fn draw(
        &mut self,
        primitive: &Primitive,
        instances: u32,
        keep_buffers: bool,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Ok(());
        }
        let Some(shader) = self.active.shader else {
            log::warn!("Draw skipped: no shader set.");
            return Ok(());
        };
        let instanced = instances > 0;
        if instanced && !self.capabilities.supports_instancing {
            return Err(RenderError::InvalidOperation(
                "instanced draws are not supported by this context".to_string(),
            ));
        }
        let index = if primitive.indexed {
            let id = self.active.index_buffer.ok_or_else(|| {
                RenderError::InvalidOperation("indexed draw without an index buffer".to_string())
            })?;
            let record = self
                .index_buffers
                .get(&id)
                .ok_or_else(|| unknown_resource("index buffer", id))?;
            Some(record.format)
        } else {
            None
        };

        if !keep_buffers {
            self.set_buffers()?;
        }

        let Some(record) = self.shaders.get_mut(&shader) else {
            return Err(unknown_resource("shader", shader));
        };
        let mut uniforms = std::mem::take(&mut record.uniforms);
        let mut samplers = std::mem::take(&mut record.samplers);
        self.commit_samplers(&mut samplers);
        self.commit_uniforms(&mut uniforms);
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.uniforms = uniforms;
            record.samplers = samplers;
        }

        let mode = self.tables.primitive(primitive.topology);
        let feedback = self
            .active
            .transform_feedback
            .filter(|_| self.capabilities.supports_transform_feedback)
            .and_then(|id| self.vertex_buffers.get(&id))
            .and_then(|record| record.native);
        if let Some(buffer) = feedback {
            self.ctx
                .bind_buffer_base(glow::TRANSFORM_FEEDBACK_BUFFER, 0, Some(buffer));
            self.ctx.begin_transform_feedback(mode);
        }

        let count = primitive.count as i32;
        match (index, instanced) {
            (Some(format), false) => {
                let offset = (primitive.base * format.bytes_per_index()) as i32;
                self.ctx
                    .draw_elements(mode, count, self.tables.index_type(format), offset);
            }
            (Some(format), true) => {
                let offset = (primitive.base * format.bytes_per_index()) as i32;
                self.ctx.draw_elements_instanced(
                    mode,
                    count,
                    self.tables.index_type(format),
                    offset,
                    instances as i32,
                );
            }
            (None, false) => self.ctx.draw_arrays(mode, primitive.base as i32, count),
            (None, true) => {
                self.ctx
                    .draw_arrays_instanced(mode, primitive.base as i32, count, instances as i32)
            }
        }

        if feedback.is_some() {
            self.ctx.end_transform_feedback();
            self.ctx
                .bind_buffer_base(glow::TRANSFORM_FEEDBACK_BUFFER, 0, None);
        }

        self.stats.draw_calls += 1;
        self.stats.primitives += u64::from(primitive.count) * u64::from(instances.max(1));
        Ok(())
    }

    /// Clears the selected buffers of the current render target.
    ///
    /// Clearing writes through the write masks, so the masks of the cleared buffers
    /// are enabled first and stay enabled.
    pub fn clear(&mut self, options: &ClearOptions) {
        if self.lost || options.flags.is_empty() {
            return;
        }
        if options.flags.contains(ClearFlags::COLOR) {
            self.set_clear_color(options.color);
            self.set_color_write([true; 4]);
        }
        if options.flags.contains(ClearFlags::DEPTH) {
            self.set_clear_depth(options.depth);
            self.set_depth_write(true);
        }
        if options.flags.contains(ClearFlags::STENCIL) {
            self.set_clear_stencil(options.stencil);
        }
        self.ctx.clear(self.tables.clear_mask(options.flags));
    }

    // --- Render targets and passes ---

    /// Selects the render target for subsequent passes; `None` is the backbuffer.
    pub fn set_render_target(&mut self, id: Option<RenderTargetId>) -> Result<(), RenderError> {
        if let Some(id) = id {
            if !self.render_targets.contains_key(&id) {
                return Err(unknown_resource("render target", id));
            }
        }
        self.active.render_target = id;
        Ok(())
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<NativeFramebuffer>) {
        if self.bindings.framebuffer != framebuffer {
            self.ctx.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            self.bindings.framebuffer = framebuffer;
            self.stats.render_target_switches += 1;
        }
    }

    /// Binds the framebuffer of the current render target, building it on first use.
    fn update_begin(&mut self) -> Result<(), RenderError> {
        let framebuffer = match self.active.render_target {
            None => None,
            Some(id) => {
                self.ensure_render_target(id)?;
                self.render_targets
                    .get(&id)
                    .and_then(|record| record.draw_framebuffer())
            }
        };
        self.bind_framebuffer(framebuffer);
        Ok(())
    }

    fn update_end(&mut self) {
        // Leaving a vertex array bound lets unrelated buffer uploads rewire it.
        if self.capabilities.supports_vertex_arrays {
            self.set_vertex_array(None);
        }
    }

    fn ensure_render_target(&mut self, id: RenderTargetId) -> Result<(), RenderError> {
        let initialized = self
            .render_targets
            .get(&id)
            .ok_or_else(|| unknown_resource("render target", id))?
            .framebuffer
            .is_some();
        if initialized {
            Ok(())
        } else {
            self.init_render_target(id)
        }
    }

    /// Builds the framebuffer(s) of a render target and leaves its draw framebuffer bound.
    fn init_render_target(&mut self, id: RenderTargetId) -> Result<(), RenderError> {
        let (desc, width, height) = match self.render_targets.get(&id) {
            Some(record) => (record.desc.clone(), record.width as i32, record.height as i32),
            None => return Err(unknown_resource("render target", id)),
        };

        // Attachments need native storage; prepare them on the unit reserved for it.
        let unit = self.last_texture_unit();
        let attachment = |device: &mut Self, texture: TextureId| -> Result<_, RenderError> {
            device.set_texture(texture, unit)?;
            let record = device
                .textures
                .get(&texture)
                .ok_or_else(|| unknown_resource("texture", texture))?;
            if record.desc.target == TextureTarget::D3 {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "render target '{}' cannot attach a 3D texture",
                    desc.name
                ))
                .into());
            }
            let face_target = match record.desc.target {
                TextureTarget::Cube => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
                _ => glow::TEXTURE_2D,
            };
            Ok((record.native, face_target, record.desc.format))
        };
        let color = match desc.color_buffer {
            Some(texture) => Some(attachment(self, texture)?),
            None => None,
        };
        let depth = match desc.depth_buffer {
            Some(texture) => Some(attachment(self, texture)?),
            None => None,
        };

        let framebuffer = self.ctx.create_framebuffer().map_err(backend_error)?;
        self.bind_framebuffer(Some(framebuffer));

        if let Some((texture, face_target, _)) = color {
            self.ctx.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                face_target,
                texture,
                0,
            );
        }
        let mut depth_renderbuffer = None;
        if let Some((texture, face_target, format)) = depth {
            let point = if format == PixelFormat::DepthStencil {
                glow::DEPTH_STENCIL_ATTACHMENT
            } else {
                glow::DEPTH_ATTACHMENT
            };
            self.ctx
                .framebuffer_texture_2d(glow::FRAMEBUFFER, point, face_target, texture, 0);
        } else if desc.depth {
            let renderbuffer = self.ctx.create_renderbuffer().map_err(backend_error)?;
            self.ctx.bind_renderbuffer(Some(renderbuffer));
            let (internal_format, point) = if desc.stencil {
                let internal = if self.capabilities.is_modern() {
                    glow::DEPTH24_STENCIL8
                } else {
                    glow::DEPTH_STENCIL
                };
                (internal, glow::DEPTH_STENCIL_ATTACHMENT)
            } else {
                (glow::DEPTH_COMPONENT16, glow::DEPTH_ATTACHMENT)
            };
            self.ctx
                .renderbuffer_storage(internal_format, width, height);
            self.ctx
                .framebuffer_renderbuffer(glow::FRAMEBUFFER, point, Some(renderbuffer));
            self.ctx.bind_renderbuffer(None);
            depth_renderbuffer = Some(renderbuffer);
        }
        self.check_framebuffer(&desc.name);

        let mut msaa = None;
        if self.capabilities.supports_msaa && desc.samples > 1 {
            let samples = desc.samples as i32;
            let msaa_framebuffer = self.ctx.create_framebuffer().map_err(backend_error)?;
            self.bind_framebuffer(Some(msaa_framebuffer));

            let mut color_renderbuffer = None;
            if let Some((_, _, format)) = color {
                let renderbuffer = self.ctx.create_renderbuffer().map_err(backend_error)?;
                self.ctx.bind_renderbuffer(Some(renderbuffer));
                self.ctx.renderbuffer_storage_multisample(
                    samples,
                    self.tables.pixel(format).renderbuffer_format,
                    width,
                    height,
                );
                self.ctx.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    Some(renderbuffer),
                );
                color_renderbuffer = Some(renderbuffer);
            }
            let mut depth_renderbuffer = None;
            if desc.depth || depth.is_some() {
                let with_stencil = desc.stencil
                    || depth.is_some_and(|(_, _, format)| format == PixelFormat::DepthStencil);
                let (internal_format, point) = if with_stencil {
                    (glow::DEPTH24_STENCIL8, glow::DEPTH_STENCIL_ATTACHMENT)
                } else {
                    (glow::DEPTH_COMPONENT32F, glow::DEPTH_ATTACHMENT)
                };
                let renderbuffer = self.ctx.create_renderbuffer().map_err(backend_error)?;
                self.ctx.bind_renderbuffer(Some(renderbuffer));
                self.ctx
                    .renderbuffer_storage_multisample(samples, internal_format, width, height);
                self.ctx
                    .framebuffer_renderbuffer(glow::FRAMEBUFFER, point, Some(renderbuffer));
                depth_renderbuffer = Some(renderbuffer);
            }
            self.ctx.bind_renderbuffer(None);
            self.check_framebuffer(&desc.name);
            msaa = Some((msaa_framebuffer, color_renderbuffer, depth_renderbuffer));
        }

        if let Some(record) = self.render_targets.get_mut(&id) {
            record.framebuffer = Some(framebuffer);
            record.depth_renderbuffer = depth_renderbuffer;
            if let Some((framebuffer, color, depth)) = msaa {
                record.msaa_framebuffer = Some(framebuffer);
                record.msaa_color_renderbuffer = color;
                record.msaa_depth_renderbuffer = depth;
            }
        }
        log::debug!(
            "Render target '{}' initialized ({width}x{height}, {} samples).",
            desc.name,
            desc.samples
        );
        Ok(())
    }

    fn check_framebuffer(&mut self, name: &str) {
        let status = self.ctx.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            log::error!("Render target '{name}' is incomplete (status {status:#x}).");
        }
    }

    /// Begins a render pass: binds its target, covers it with the viewport and
    /// scissor, and performs the requested clears.
    ///
    /// Passes do not nest. While the context is lost the pass is recorded as started
    /// so that the matching `end_pass` stays balanced, but nothing is issued.
    pub fn start_pass(&mut self, pass: &RenderPass) -> Result<(), RenderError> {
        if self.in_pass {
            return Err(RenderError::InvalidOperation(format!(
                "render pass '{}' started inside another pass",
                pass.name
            )));
        }
        if self.lost {
            self.in_pass = true;
            return Ok(());
        }

        let previous_target = self.active.render_target;
        self.set_render_target(pass.render_target)?;
        if let Err(err) = self.update_begin() {
            self.active.render_target = previous_target;
            return Err(err);
        }
        self.in_pass = true;
        log::trace!("Render pass '{}' started.", pass.name);

        let (width, height) = self.current_target_size();
        let full = Rect::new(0, 0, width as i32, height as i32);
        self.set_viewport(full);
        self.set_scissor(full);

        if pass.has_clears() {
            self.clear(&ClearOptions::from(pass));
        }
        Ok(())
    }

    /// Ends a render pass: discards what the pass does not store, resolves
    /// multisampled color, and regenerates mipmaps when asked.
    pub fn end_pass(&mut self, pass: &RenderPass) -> Result<(), RenderError> {
        if !self.in_pass {
            return Err(RenderError::InvalidOperation(format!(
                "render pass '{}' ended without being started",
                pass.name
            )));
        }
        self.in_pass = false;
        if self.lost {
            return Ok(());
        }
        self.update_end();

        let Some(id) = self.active.render_target else {
            return Ok(());
        };
        let Some(record) = self.render_targets.get(&id) else {
            return Err(unknown_resource("render target", id));
        };
        let multisampled = record.is_multisampled();
        let color_buffer = record.desc.color_buffer;
        let draw_framebuffer = record.draw_framebuffer();
        let color_ops = pass.color_ops;
        let depth_ops = pass.depth_stencil_ops;

        if self.capabilities.is_modern() {
            let mut invalid = Vec::new();
            if !(color_ops.store || color_ops.resolve) && color_buffer.is_some() {
                invalid.push(glow::COLOR_ATTACHMENT0);
            }
            if !depth_ops.store_depth {
                invalid.push(glow::DEPTH_ATTACHMENT);
            }
            if !depth_ops.store_stencil {
                invalid.push(glow::STENCIL_ATTACHMENT);
            }
            if !invalid.is_empty() {
                self.bind_framebuffer(draw_framebuffer);
                self.ctx.invalidate_framebuffer(glow::FRAMEBUFFER, &invalid);
            }
        }

        if multisampled && color_ops.resolve && color_buffer.is_some() {
            self.resolve_render_target(id, true, false)?;
        }

        if color_ops.mipmaps {
            if let Some(texture) = color_buffer {
                self.generate_target_mipmaps(texture)?;
            }
        }
        log::trace!("Render pass '{}' ended.", pass.name);
        Ok(())
    }

    fn generate_target_mipmaps(
        &mut self,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        let Some(record) = self.textures.get(&texture) else {
            return Err(unknown_resource("texture", texture));
        };
        if !texture_mipmapped(record, &self.capabilities) {
            return Ok(());
        }
        let target = record.desc.target;
        let unit = self.last_texture_unit();
        self.set_texture(texture, unit)?;
        self.active_texture(unit);
        self.ctx.generate_mipmap(self.tables.texture_target(target));
        Ok(())
    }

    /// Copies the multisampled contents of a render target into its single-sampled
    /// attachments. No-op for targets that are not multisampled.
    pub fn resolve_render_target(
        &mut self,
        id: RenderTargetId,
        color: bool,
        depth: bool,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::DeviceLost);
        }
        let record = self
            .render_targets
            .get(&id)
            .ok_or_else(|| unknown_resource("render target", id))?;
        let (Some(source), Some(destination)) = (record.msaa_framebuffer, record.framebuffer) else {
            return Ok(());
        };
        let (width, height) = (record.width as i32, record.height as i32);
        let mut mask = 0;
        if color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if depth && record.desc.depth_buffer.is_some() {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if mask == 0 {
            return Ok(());
        }

        self.ctx
            .bind_framebuffer(glow::READ_FRAMEBUFFER, Some(source));
        self.ctx
            .bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(destination));
        self.ctx.blit_framebuffer(
            (0, 0, width, height),
            (0, 0, width, height),
            mask,
            glow::NEAREST,
        );
        self.ctx
            .bind_framebuffer(glow::FRAMEBUFFER, self.bindings.framebuffer);
        Ok(())
    }

    /// Copies color and/or depth from one render target to another. `None` on either
    /// side is the backbuffer.
    ///
    /// Modern contexts blit. Legacy contexts draw a textured quad, which can only
    /// copy color from a target with a color texture.
    pub fn copy_render_target(
        &mut self,
        source: Option<RenderTargetId>,
        destination: Option<RenderTargetId>,
        color: bool,
        depth: bool,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::DeviceLost);
        }
        if self.in_pass {
            return Err(RenderError::InvalidOperation(
                "render targets cannot be copied inside a render pass".to_string(),
            ));
        }
        let invalid = |msg: &str| Err(RenderError::InvalidOperation(msg.to_string()));
        let color_of = |device: &Self, id: Option<RenderTargetId>| {
            id.and_then(|id| device.render_targets.get(&id))
                .and_then(|record| record.desc.color_buffer)
                .and_then(|texture| device.textures.get(&texture))
                .map(|record| record.desc.format)
        };
        let has_depth = |device: &Self, id: Option<RenderTargetId>| match id {
            None => device.settings.depth,
            Some(id) => device
                .render_targets
                .get(&id)
                .is_some_and(|record| record.desc.depth || record.desc.depth_buffer.is_some()),
        };
        for id in [source, destination].into_iter().flatten() {
            if !self.render_targets.contains_key(&id) {
                return Err(unknown_resource("render target", id));
            }
        }

        if color {
            let (src, dst) = (color_of(self, source), color_of(self, destination));
            if (source.is_some() && src.is_none()) || (destination.is_some() && dst.is_none()) {
                return invalid("color copy between targets without color buffers");
            }
            if let (Some(src), Some(dst)) = (src, dst) {
                if src != dst {
                    return invalid("color copy between different pixel formats");
                }
            }
        }
        if depth {
            if !self.capabilities.is_modern() {
                return invalid("depth copies need a modern context");
            }
            if !has_depth(self, source) || !has_depth(self, destination) {
                return invalid("depth copy between targets without depth");
            }
        }
        if !color && !depth {
            return Ok(());
        }

        if self.capabilities.is_modern() {
            self.blit_render_target(source, destination, color, depth)
        } else {
            self.draw_copy(source, destination)
        }
    }

    fn blit_render_target(
        &mut self,
        source: Option<RenderTargetId>,
        destination: Option<RenderTargetId>,
        color: bool,
        depth: bool,
    ) -> Result<(), RenderError> {
        let extent = |device: &mut Self, id: Option<RenderTargetId>| -> Result<_, RenderError> {
            match id {
                None => Ok((None, device.backbuffer)),
                Some(id) => {
                    device.ensure_render_target(id)?;
                    let record = device
                        .render_targets
                        .get(&id)
                        .ok_or_else(|| unknown_resource("render target", id))?;
                    Ok((record.framebuffer, (record.width, record.height)))
                }
            }
        };
        let (read, (src_width, src_height)) = extent(self, source)?;
        let (draw, (dst_width, dst_height)) = extent(self, destination)?;

        let mut mask = 0;
        if color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        self.ctx.bind_framebuffer(glow::READ_FRAMEBUFFER, read);
        self.ctx.bind_framebuffer(glow::DRAW_FRAMEBUFFER, draw);
        self.ctx.blit_framebuffer(
            (0, 0, src_width as i32, src_height as i32),
            (0, 0, dst_width as i32, dst_height as i32),
            mask,
            glow::NEAREST,
        );
        self.ctx
            .bind_framebuffer(glow::FRAMEBUFFER, self.bindings.framebuffer);
        Ok(())
    }

    /// Color copy by drawing the source texture over the destination.
    fn draw_copy(
        &mut self,
        source: Option<RenderTargetId>,
        destination: Option<RenderTargetId>,
    ) -> Result<(), RenderError> {
        let Some(texture) = source
            .and_then(|id| self.render_targets.get(&id))
            .and_then(|record| record.desc.color_buffer)
        else {
            return Err(RenderError::InvalidOperation(
                "the backbuffer cannot be a copy source on a legacy context".to_string(),
            ));
        };
        let shader = self.copy_shader()?;
        let quad = self.quad_buffer()?;

        let saved_state = self.state;
        let saved_shader = self.active.shader;
        let saved_target = self.active.render_target;
        let saved_queue = std::mem::take(&mut self.active.vertex_buffers);

        let result = self.draw_copy_quad(texture, destination, shader, quad);

        self.active.vertex_buffers = saved_queue;
        self.active.render_target = saved_target;
        let restored = self.update_begin();
        self.restore_state(&saved_state);
        match saved_shader {
            Some(shader) => {
                self.set_shader(shader);
            }
            None => self.active.shader = None,
        }
        result.and(restored)
    }

    fn draw_copy_quad(
        &mut self,
        texture: TextureId,
        destination: Option<RenderTargetId>,
        shader: ShaderId,
        quad: VertexBufferId,
    ) -> Result<(), RenderError> {
        self.set_render_target(destination)?;
        self.update_begin()?;
        let (width, height) = self.current_target_size();
        let full = Rect::new(0, 0, width as i32, height as i32);
        self.set_viewport(full);
        self.set_scissor(full);
        self.set_blending(false);
        self.set_depth_test(false);
        self.set_stencil_test(false);
        self.set_cull_mode(CullMode::None);
        self.set_color_write([true; 4]);

        self.set_uniform(COPY_SOURCE_UNIFORM, UniformValue::Texture(texture));
        if !self.set_shader(shader) {
            return Err(RenderError::InvalidOperation(
                "the copy shader failed to link".to_string(),
            ));
        }
        self.set_vertex_buffer(quad);
        self.draw(
            &Primitive::vertices(PrimitiveTopology::TriangleStrip, 0, 4),
            0,
            false,
        )?;
        self.update_end();
        Ok(())
    }

    /// Puts back the state fields a copy or self-test may have changed.
    fn restore_state(&mut self, saved: &PipelineState) {
        self.set_blending(saved.blend.enabled);
        self.set_depth_test(saved.depth.test);
        self.set_stencil_test(saved.stencil.enabled);
        self.set_cull_mode(saved.cull_mode);
        self.set_color_write(saved.color_write);
        self.set_viewport(saved.viewport);
        self.set_scissor(saved.scissor);
    }

    fn copy_shader(&mut self) -> Result<ShaderId, RenderError> {
        if let Some(shader) = self.copy_shader {
            return Ok(shader);
        }
        let shader = self.create_shader(ShaderDefinition::new(
            "CopyRenderTarget",
            COPY_VERTEX_SOURCE,
            COPY_FRAGMENT_SOURCE,
        ))?;
        self.copy_shader = Some(shader);
        Ok(shader)
    }

    fn quad_buffer(&mut self) -> Result<VertexBufferId, RenderError> {
        if let Some(quad) = self.quad_buffer {
            return Ok(quad);
        }
        let format = VertexFormat::new(vec![VertexElement::new(
            VertexSemantic::Position,
            2,
            VertexDataType::Float32,
        )]);
        let quad = self.create_vertex_buffer(
            format,
            BufferUsage::Static,
            bytemuck::cast_slice(&QUAD_VERTICES),
        )?;
        self.quad_buffer = Some(quad);
        Ok(quad)
    }

    // --- Read-back ---

    /// Reads RGBA8 pixels from the bound framebuffer into `pixels`.
    pub fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        pixels: &mut [u8],
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::DeviceLost);
        }
        let needed = width as usize * height as usize * 4;
        if pixels.len() < needed {
            return Err(RenderError::InvalidOperation(format!(
                "read-back of {width}x{height} pixels needs {needed} bytes, got {}",
                pixels.len()
            )));
        }
        self.ctx.read_pixels(
            x,
            y,
            width as i32,
            height as i32,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            &mut pixels[..needed],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall, ObjectKind};
    use strata_core::renderer::api::{RenderTargetDescriptor, TextureDescriptor};

    fn color_target(device: &mut GlDevice<HeadlessContext>, samples: u32) -> RenderTargetId {
        let color = device
            .create_texture(TextureDescriptor {
                width: 16,
                height: 16,
                mipmaps: false,
                ..Default::default()
            })
            .unwrap();
        device
            .create_render_target(RenderTargetDescriptor {
                color_buffer: Some(color),
                samples,
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn pass_binds_target_lazily_once() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let target = color_target(&mut device, 1);
        let pass = RenderPass::new("offscreen", Some(target));

        for _ in 0..2 {
            device.start_pass(&pass).unwrap();
            device.end_pass(&pass).unwrap();
        }
        assert_eq!(device.context().live_objects(ObjectKind::Framebuffer), 1);
        assert_eq!(device.state().viewport, Rect::new(0, 0, 16, 16));
    }

    #[test]
    fn unbalanced_end_pass_is_an_error() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        assert!(device.end_pass(&RenderPass::new("main", None)).is_err());
    }

    #[test]
    fn multisampled_pass_resolves() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let target = color_target(&mut device, 4);
        let pass = RenderPass::new("msaa", Some(target));
        device.start_pass(&pass).unwrap();
        device.end_pass(&pass).unwrap();
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::BlitFramebuffer { .. })),
            1
        );
        assert_eq!(device.context().live_objects(ObjectKind::Framebuffer), 2);
    }

    #[test]
    fn unstored_depth_is_invalidated() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let target = color_target(&mut device, 1);
        let pass = RenderPass::new("color only", Some(target));
        device.start_pass(&pass).unwrap();
        device.end_pass(&pass).unwrap();
        assert_eq!(
            device.context().count_of(&NativeCall::InvalidateFramebuffer {
                target: glow::FRAMEBUFFER,
                attachments: vec![glow::DEPTH_ATTACHMENT, glow::STENCIL_ATTACHMENT],
            }),
            1
        );
    }

    #[test]
    fn unstored_but_resolved_color_is_kept() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let target = color_target(&mut device, 1);
        let mut pass = RenderPass::new("resolved", Some(target));
        pass.color_ops.store = false;
        device.start_pass(&pass).unwrap();
        device.end_pass(&pass).unwrap();
        assert_eq!(
            device.context().count_of(&NativeCall::InvalidateFramebuffer {
                target: glow::FRAMEBUFFER,
                attachments: vec![glow::DEPTH_ATTACHMENT, glow::STENCIL_ATTACHMENT],
            }),
            1
        );

        pass.color_ops.resolve = false;
        device.start_pass(&pass).unwrap();
        device.end_pass(&pass).unwrap();
        assert_eq!(
            device.context().count_of(&NativeCall::InvalidateFramebuffer {
                target: glow::FRAMEBUFFER,
                attachments: vec![
                    glow::COLOR_ATTACHMENT0,
                    glow::DEPTH_ATTACHMENT,
                    glow::STENCIL_ATTACHMENT
                ],
            }),
            1
        );
    }

    #[test]
    fn failed_start_pass_leaves_device_idle() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let unknown = RenderPass::new("unknown", Some(RenderTargetId::next()));
        assert!(matches!(
            device.start_pass(&unknown),
            Err(RenderError::ResourceError(_))
        ));
        assert!(!device.in_pass());

        let main = RenderPass::new("main", None);
        device.start_pass(&main).unwrap();
        device.end_pass(&main).unwrap();
    }

    #[test]
    fn read_pixels_checks_buffer() {
        let mut device =
            GlDevice::new(HeadlessContext::modern().with_read_back([1, 2, 3, 4])).unwrap();
        let mut small = [0u8; 4];
        assert!(device.read_pixels(0, 0, 2, 2, &mut small).is_err());
        let mut pixels = [0u8; 16];
        device.read_pixels(0, 0, 2, 2, &mut pixels).unwrap();
        assert_eq!(&pixels[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn modern_copy_blits() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let source = color_target(&mut device, 1);
        device
            .copy_render_target(Some(source), None, true, false)
            .unwrap();
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::BlitFramebuffer { .. })),
            1
        );
    }

    #[test]
    fn copy_inside_pass_is_rejected() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let source = color_target(&mut device, 1);
        device.start_pass(&RenderPass::new("main", None)).unwrap();
        assert!(matches!(
            device.copy_render_target(Some(source), None, true, false),
            Err(RenderError::InvalidOperation(_))
        ));
    }
}
