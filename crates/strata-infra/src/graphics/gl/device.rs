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

//! The device struct, its construction, and the lifetime of the resources it tracks.

use std::collections::HashMap;
use std::fmt::Debug;

use flume::Receiver;
use strata_core::event::{DeviceEvent, DeviceEvents};
use strata_core::renderer::api::{
    BufferUsage, Capabilities, CullMode, DeviceSettings, DeviceStats, IndexBufferId, IndexFormat,
    NativeBuffer, NativeProgram, NativeTexture, PipelineState, PixelFormat, Rect,
    RenderTargetDescriptor, RenderTargetId, ShaderDefinition, ShaderId, TextureDescriptor,
    TextureId, TextureSampling, TextureTarget, UniformScope, UniformValue, VertexBufferId,
    VertexFormat,
};
use strata_core::renderer::traits::NativeContext;
use strata_core::renderer::{RenderError, ResourceError};

use super::bindings::BindingCache;
use super::capabilities;
use super::conversions::EnumTables;
use super::resources::{
    IndexBufferRecord, RenderTargetRecord, ShaderRecord, TextureRecord, VertexBufferRecord,
};

/// Per-draw selections: what the next draw uses.
#[derive(Debug, Default)]
pub(crate) struct ActiveResources {
    pub shader: Option<ShaderId>,
    pub index_buffer: Option<IndexBufferId>,
    /// Vertex buffers queued for the next draw, in attribute wiring order.
    pub vertex_buffers: Vec<VertexBufferId>,
    pub render_target: Option<RenderTargetId>,
    pub transform_feedback: Option<VertexBufferId>,
}

/// A GL-class graphics device over a [`NativeContext`].
///
/// The device owns the context, a shadow of its global pipeline state, the binding
/// tables, and the registries of every GPU-backed resource created through it. All
/// native calls go through its setters, which compare against the shadow and only
/// issue a call on an actual change.
///
/// Engine code refers to resources with the typed ids returned by the `create_*`
/// methods. Ids are process-unique: an id from another device resolves to nothing
/// and the operation fails with [`ResourceError::NotFound`].
#[derive(Debug)]
pub struct GlDevice<C: NativeContext> {
    pub(crate) ctx: C,
    pub(crate) settings: DeviceSettings,
    pub(crate) capabilities: Capabilities,
    pub(crate) tables: EnumTables,

    pub(crate) state: PipelineState,
    pub(crate) bindings: BindingCache,
    pub(crate) active: ActiveResources,
    pub(crate) in_pass: bool,
    pub(crate) lost: bool,
    pub(crate) generation: u64,
    pub(crate) backbuffer: (u32, u32),

    pub(crate) textures: HashMap<TextureId, TextureRecord>,
    pub(crate) vertex_buffers: HashMap<VertexBufferId, VertexBufferRecord>,
    pub(crate) index_buffers: HashMap<IndexBufferId, IndexBufferRecord>,
    pub(crate) shaders: HashMap<ShaderId, ShaderRecord>,
    pub(crate) render_targets: HashMap<RenderTargetId, RenderTargetRecord>,

    pub(crate) scope: UniformScope,
    pub(crate) stats: DeviceStats,
    pub(crate) events: DeviceEvents,
    pub(crate) high_precision: Option<bool>,
    pub(crate) copy_shader: Option<ShaderId>,
    pub(crate) quad_buffer: Option<VertexBufferId>,
}

impl<C: NativeContext> GlDevice<C> {
    /// Creates a device with default settings.
    pub fn new(ctx: C) -> Result<Self, RenderError> {
        Self::with_settings(ctx, DeviceSettings::default())
    }

    /// Creates a device, probing the context and establishing the baseline state.
    ///
    /// Fails with [`RenderError::InitializationFailed`] if the context is already
    /// lost or reports no usable baseline.
    pub fn with_settings(mut ctx: C, settings: DeviceSettings) -> Result<Self, RenderError> {
        if ctx.is_context_lost() {
            return Err(RenderError::InitializationFailed(
                "the native context is lost".to_string(),
            ));
        }

        let capabilities = capabilities::probe(&mut ctx, &settings)?;
        let tables = EnumTables::new(capabilities.tier);
        let backbuffer = ctx.drawing_buffer_size();
        let bindings = BindingCache::new(capabilities.max_combined_textures);

        let mut device = Self {
            ctx,
            settings,
            capabilities,
            tables,
            state: PipelineState::default(),
            bindings,
            active: ActiveResources::default(),
            in_pass: false,
            lost: false,
            generation: 0,
            backbuffer,
            textures: HashMap::new(),
            vertex_buffers: HashMap::new(),
            index_buffers: HashMap::new(),
            shaders: HashMap::new(),
            render_targets: HashMap::new(),
            scope: UniformScope::new(),
            stats: DeviceStats::default(),
            events: DeviceEvents::new(),
            high_precision: None,
            copy_shader: None,
            quad_buffer: None,
        };
        device.apply_baseline_state();

        log::info!(
            "GL device created: {:?} tier, {}x{} drawing buffer.",
            device.capabilities.tier,
            backbuffer.0,
            backbuffer.1
        );
        Ok(device)
    }

    // --- Accessors ---

    /// The native context.
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Mutable access to the native context.
    ///
    /// Calls made through it bypass the shadow state; use it for host-side work such
    /// as simulating a loss, not for rendering.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// The settings the device was created with.
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// The capabilities probed for the current context generation.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The native token tables for the current context generation.
    pub fn tables(&self) -> &EnumTables {
        &self.tables
    }

    /// The shadow pipeline state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Statistics of the current frame.
    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    /// Returns `true` between a context loss and the matching restore.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Number of context losses seen so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` between `start_pass` and `end_pass`.
    pub fn in_pass(&self) -> bool {
        self.in_pass
    }

    /// The size of the default framebuffer.
    pub fn backbuffer_size(&self) -> (u32, u32) {
        self.backbuffer
    }

    /// The uniform scope shaders read their inputs from.
    pub fn scope(&self) -> &UniformScope {
        &self.scope
    }

    /// Mutable access to the uniform scope.
    pub fn scope_mut(&mut self) -> &mut UniformScope {
        &mut self.scope
    }

    /// Sets a named uniform in the scope. Shaders pick it up on their next draw.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.scope.set(name, value);
    }

    /// Registers a listener for lost/restored/resized events.
    pub fn subscribe(&mut self) -> Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// The size of the current render target, or of the backbuffer.
    pub(crate) fn current_target_size(&self) -> (u32, u32) {
        self.active
            .render_target
            .and_then(|id| self.render_targets.get(&id))
            .map(|record| (record.width, record.height))
            .unwrap_or(self.backbuffer)
    }

    pub(crate) fn last_texture_unit(&self) -> u32 {
        self.bindings.texture_units.len().saturating_sub(1) as u32
    }

    /// Whether float textures keep full 32-bit precision through a render round trip.
    ///
    /// Runs the round-trip self-test on first access and caches the answer until the
    /// context is lost. Reports `false` without testing when float textures are not
    /// renderable or the settings disable the test.
    pub fn texture_float_high_precision(&mut self) -> bool {
        if let Some(result) = self.high_precision {
            return result;
        }
        if self.lost {
            return false;
        }
        let result = if self.settings.probe_high_precision
            && self.capabilities.texture_float_renderable
        {
            self.run_high_precision_test()
        } else {
            false
        };
        self.high_precision = Some(result);
        result
    }

    fn run_high_precision_test(&mut self) -> bool {
        let saved = self.state;

        // The test draws; route the state it needs through the shadow.
        self.set_blending(false);
        self.set_depth_test(false);
        self.set_stencil_test(false);
        self.set_cull_mode(CullMode::None);
        self.set_color_write([true; 4]);
        self.set_raster(true);
        self.set_viewport(Rect::new(0, 0, 1, 1));
        self.set_scissor(Rect::new(0, 0, 1, 1));
        self.active_texture(0);

        let use_vertex_array = self.capabilities.supports_vertex_arrays;
        let float_format = self.tables.pixel(PixelFormat::Rgba32F).internal_format;
        let result =
            capabilities::test_float_high_precision(&mut self.ctx, float_format, use_vertex_array);

        // Put back the bindings the test changed behind the shadow's back.
        self.ctx
            .bind_framebuffer(glow::FRAMEBUFFER, self.bindings.framebuffer);
        self.ctx.use_program(self.bindings.program);
        let texture = self
            .bindings
            .texture_units
            .first()
            .and_then(|slots| slots[TextureTarget::D2 as usize]);
        self.ctx.bind_texture(glow::TEXTURE_2D, texture);
        if use_vertex_array {
            self.ctx.bind_vertex_array(self.bindings.vertex_array);
        } else if self.bindings.enabled_attributes & 1 == 0 {
            self.ctx.disable_vertex_attrib_array(0);
        }

        self.set_blending(saved.blend.enabled);
        self.set_depth_test(saved.depth.test);
        self.set_stencil_test(saved.stencil.enabled);
        self.set_cull_mode(saved.cull_mode);
        self.set_color_write(saved.color_write);
        self.set_raster(saved.raster);
        self.set_viewport(saved.viewport);
        self.set_scissor(saved.scissor);

        log::info!("High precision float textures: {result}.");
        result
    }

    // --- Textures ---

    /// Registers a texture. The native object is created on first use.
    pub fn create_texture(&mut self, desc: TextureDescriptor) -> Result<TextureId, RenderError> {
        self.validate_texture(&desc)?;
        let id = TextureId::next();
        log::debug!(
            "Texture '{}' registered as {:?} ({}x{}x{} {:?}).",
            desc.name,
            id,
            desc.width,
            desc.height,
            desc.depth,
            desc.format
        );
        self.textures.insert(id, TextureRecord::new(desc));
        Ok(id)
    }

    fn validate_texture(&self, desc: &TextureDescriptor) -> Result<(), RenderError> {
        let caps = &self.capabilities;
        let invalid = |msg: String| -> Result<(), RenderError> {
            log::error!("Texture '{}' rejected: {msg}", desc.name);
            Err(ResourceError::InvalidDescriptor(msg).into())
        };

        if desc.width == 0 || desc.height == 0 || desc.depth == 0 {
            return invalid("dimensions must be non-zero".to_string());
        }
        match desc.target {
            TextureTarget::D3 if !caps.supports_volume_textures => {
                return invalid("3D textures are not supported".to_string());
            }
            TextureTarget::Cube if desc.width != desc.height => {
                return invalid("cube faces must be square".to_string());
            }
            TextureTarget::D2 | TextureTarget::Cube if desc.depth != 1 => {
                return invalid("only 3D textures have depth".to_string());
            }
            _ => {}
        }
        let max = match desc.target {
            TextureTarget::D2 => caps.max_texture_size,
            TextureTarget::Cube => caps.max_cube_map_size,
            TextureTarget::D3 => caps.max_volume_size,
        };
        if desc.width > max || desc.height > max || desc.depth > max.max(1) {
            return invalid(format!("dimensions exceed the limit of {max}"));
        }
        let supported = match desc.format {
            PixelFormat::Depth | PixelFormat::DepthStencil => caps.supports_depth_texture,
            PixelFormat::Rgba16F => caps.supports_texture_half_float,
            PixelFormat::Rgba32F | PixelFormat::R32F => caps.supports_texture_float,
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => true,
        };
        if !supported {
            return invalid(format!("{:?} textures are not supported", desc.format));
        }
        Ok(())
    }

    /// Replaces the level-0 data of one face (`0` for 2D and 3D textures).
    ///
    /// The upload happens the next time the texture is set on a unit.
    pub fn write_texture(
        &mut self,
        id: TextureId,
        face: usize,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let record = self
            .textures
            .get_mut(&id)
            .ok_or_else(|| unknown_resource("texture", id))?;
        if face >= record.faces.len() {
            return Err(RenderError::InvalidOperation(format!(
                "face {face} out of range for texture '{}'",
                record.desc.name
            )));
        }
        let expected = record.byte_size();
        if data.len() != expected {
            return Err(ResourceError::InvalidDescriptor(format!(
                "texture '{}' expects {expected} bytes per face, got {}",
                record.desc.name,
                data.len()
            ))
            .into());
        }
        record.faces[face] = Some(data.to_vec());
        record.needs_upload = true;
        Ok(())
    }

    /// Changes the sampling parameters of a texture.
    pub fn set_texture_sampling(
        &mut self,
        id: TextureId,
        sampling: TextureSampling,
    ) -> Result<(), RenderError> {
        let record = self
            .textures
            .get_mut(&id)
            .ok_or_else(|| unknown_resource("texture", id))?;
        if record.desc.sampling != sampling {
            record.desc.sampling = sampling;
            record.parameters_dirty = true;
        }
        Ok(())
    }

    /// Destroys a texture, unbinding it everywhere.
    pub fn destroy_texture(&mut self, id: TextureId) -> Result<(), RenderError> {
        let record = self
            .textures
            .remove(&id)
            .ok_or_else(|| unknown_resource("texture", id))?;
        if let Some(native) = record.native {
            // Deleting a bound texture unbinds it natively from every unit.
            for slots in &mut self.bindings.texture_units {
                for slot in slots.iter_mut() {
                    if *slot == Some(native) {
                        *slot = None;
                    }
                }
            }
            if !self.lost {
                self.ctx.delete_texture(native);
            }
        }
        log::debug!("Texture '{}' destroyed.", record.desc.name);
        Ok(())
    }

    /// The native handle of a texture, if it has one in this context generation.
    pub fn texture_native(&self, id: TextureId) -> Option<NativeTexture> {
        self.textures.get(&id).and_then(|record| record.native)
    }

    // --- Vertex and index buffers ---

    /// Creates a vertex buffer and uploads its data.
    pub fn create_vertex_buffer(
        &mut self,
        format: VertexFormat,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<VertexBufferId, RenderError> {
        if format.elements().is_empty() || format.stride() == 0 {
            return Err(
                ResourceError::InvalidDescriptor("vertex format has no elements".to_string())
                    .into(),
            );
        }
        if data.len() % format.stride() as usize != 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "vertex data of {} bytes is not a multiple of the {}-byte stride",
                data.len(),
                format.stride()
            ))
            .into());
        }
        if format.instancing() && !self.capabilities.supports_instancing {
            return Err(ResourceError::InvalidDescriptor(
                "instanced vertex formats require instancing support".to_string(),
            )
            .into());
        }

        let id = VertexBufferId::next();
        let mut record = VertexBufferRecord {
            format,
            usage,
            data: data.to_vec(),
            native: None,
            vertex_array: None,
        };
        if !self.lost {
            upload_vertex_buffer(&mut self.ctx, &self.tables, &mut record)?;
        }
        log::trace!(
            "Vertex buffer {id:?} created ({} vertices).",
            record.vertex_count()
        );
        self.vertex_buffers.insert(id, record);
        Ok(id)
    }

    /// Replaces the contents of a vertex buffer. The length must stay a multiple of
    /// the stride.
    pub fn write_vertex_buffer(
        &mut self,
        id: VertexBufferId,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let record = self
            .vertex_buffers
            .get_mut(&id)
            .ok_or_else(|| unknown_resource("vertex buffer", id))?;
        if data.len() % record.format.stride() as usize != 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "vertex data of {} bytes is not a multiple of the {}-byte stride",
                data.len(),
                record.format.stride()
            ))
            .into());
        }
        record.data = data.to_vec();
        if !self.lost {
            upload_vertex_buffer(&mut self.ctx, &self.tables, record)?;
        }
        Ok(())
    }

    /// Destroys a vertex buffer and every vertex array built from it.
    pub fn destroy_vertex_buffer(&mut self, id: VertexBufferId) -> Result<(), RenderError> {
        let record = self
            .vertex_buffers
            .remove(&id)
            .ok_or_else(|| unknown_resource("vertex buffer", id))?;

        let mut stale: Vec<_> = record.vertex_array.into_iter().collect();
        self.bindings.vertex_arrays.retain(|key, vertex_array| {
            let uses = key.iter().any(|(buffer, _)| *buffer == id);
            if uses {
                stale.push(*vertex_array);
            }
            !uses
        });
        if self
            .bindings
            .vertex_array
            .is_some_and(|bound| stale.contains(&bound))
        {
            self.bindings.vertex_array = None;
        }
        self.active.vertex_buffers.retain(|queued| *queued != id);
        if self.active.transform_feedback == Some(id) {
            self.active.transform_feedback = None;
        }

        if !self.lost {
            for vertex_array in stale {
                self.ctx.delete_vertex_array(vertex_array);
            }
            if let Some(native) = record.native {
                self.ctx.delete_buffer(native);
            }
        }
        Ok(())
    }

    /// Creates an index buffer and uploads its data.
    pub fn create_index_buffer(
        &mut self,
        format: IndexFormat,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<IndexBufferId, RenderError> {
        if format == IndexFormat::Uint32 && !self.capabilities.supports_uint_indices {
            return Err(ResourceError::InvalidDescriptor(
                "32-bit indices are not supported".to_string(),
            )
            .into());
        }
        if data.len() % format.bytes_per_index() as usize != 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "index data of {} bytes does not hold whole {format:?} indices",
                data.len()
            ))
            .into());
        }

        let id = IndexBufferId::next();
        let mut record = IndexBufferRecord {
            format,
            usage,
            data: data.to_vec(),
            native: None,
        };
        if !self.lost {
            self.unbind_vertex_array_for_index_upload();
            upload_index_buffer(&mut self.ctx, &self.tables, &mut record)?;
        }
        self.index_buffers.insert(id, record);
        Ok(id)
    }

    /// Replaces the contents of an index buffer.
    pub fn write_index_buffer(&mut self, id: IndexBufferId, data: &[u8]) -> Result<(), RenderError> {
        let format = self
            .index_buffers
            .get(&id)
            .map(|record| record.format)
            .ok_or_else(|| unknown_resource("index buffer", id))?;
        if data.len() % format.bytes_per_index() as usize != 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "index data of {} bytes does not hold whole {format:?} indices",
                data.len()
            ))
            .into());
        }
        if !self.lost {
            self.unbind_vertex_array_for_index_upload();
        }
        if let Some(record) = self.index_buffers.get_mut(&id) {
            record.data = data.to_vec();
            if !self.lost {
                upload_index_buffer(&mut self.ctx, &self.tables, record)?;
            }
        }
        Ok(())
    }

    /// Destroys an index buffer.
    pub fn destroy_index_buffer(&mut self, id: IndexBufferId) -> Result<(), RenderError> {
        let record = self
            .index_buffers
            .remove(&id)
            .ok_or_else(|| unknown_resource("index buffer", id))?;
        if self.active.index_buffer == Some(id) {
            self.active.index_buffer = None;
        }
        if let (Some(native), false) = (record.native, self.lost) {
            self.ctx.delete_buffer(native);
        }
        Ok(())
    }

    /// The element-array binding is vertex-array state: uploading through it while a
    /// vertex array is bound would rewire that array.
    pub(crate) fn unbind_vertex_array_for_index_upload(&mut self) {
        if self.capabilities.supports_vertex_arrays {
            self.set_vertex_array(None);
        }
    }

    /// The native handle of a vertex buffer.
    pub fn vertex_buffer_native(&self, id: VertexBufferId) -> Option<NativeBuffer> {
        self.vertex_buffers.get(&id).and_then(|record| record.native)
    }

    /// The native handle of an index buffer.
    pub fn index_buffer_native(&self, id: IndexBufferId) -> Option<NativeBuffer> {
        self.index_buffers.get(&id).and_then(|record| record.native)
    }

    // --- Shaders ---

    /// Registers a shader. It is compiled and linked on first use.
    pub fn create_shader(&mut self, definition: ShaderDefinition) -> Result<ShaderId, RenderError> {
        if definition.vertex_source.trim().is_empty() || definition.fragment_source.trim().is_empty()
        {
            return Err(ResourceError::InvalidDescriptor(format!(
                "shader '{}' is missing a stage",
                definition.name
            ))
            .into());
        }
        let id = ShaderId::next();
        log::debug!("Shader '{}' registered as {id:?}.", definition.name);
        self.shaders.insert(id, ShaderRecord::new(definition));
        Ok(id)
    }

    /// Destroys a shader.
    pub fn destroy_shader(&mut self, id: ShaderId) -> Result<(), RenderError> {
        let record = self
            .shaders
            .remove(&id)
            .ok_or_else(|| unknown_resource("shader", id))?;
        if self.active.shader == Some(id) {
            self.active.shader = None;
        }
        if let Some(program) = record.program {
            if self.bindings.program == Some(program) {
                self.bindings.program = None;
            }
            if !self.lost {
                self.ctx.delete_program(program);
            }
        }
        Ok(())
    }

    /// The native program of a shader, once linked.
    pub fn shader_native(&self, id: ShaderId) -> Option<NativeProgram> {
        self.shaders.get(&id).and_then(|record| record.program)
    }

    /// Returns `true` if the shader failed to link in the current context generation.
    pub fn shader_failed(&self, id: ShaderId) -> bool {
        self.shaders.get(&id).is_some_and(|record| record.failed)
    }

    // --- Render targets ---

    /// Registers a render target. Its framebuffer is created on first use.
    ///
    /// The size comes from the color buffer, else the depth buffer, else the
    /// descriptor.
    pub fn create_render_target(
        &mut self,
        desc: RenderTargetDescriptor,
    ) -> Result<RenderTargetId, RenderError> {
        let attachment_size = |id: Option<TextureId>| -> Result<Option<(u32, u32)>, RenderError> {
            match id {
                None => Ok(None),
                Some(id) => self
                    .textures
                    .get(&id)
                    .map(|record| Some((record.desc.width, record.desc.height)))
                    .ok_or_else(|| unknown_resource("texture", id)),
            }
        };
        let color_size = attachment_size(desc.color_buffer)?;
        let depth_size = attachment_size(desc.depth_buffer)?;

        if let Some(depth) = desc.depth_buffer.and_then(|id| self.textures.get(&id)) {
            if !depth.desc.format.is_depth() {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "render target '{}' uses a non-depth texture as depth buffer",
                    desc.name
                ))
                .into());
            }
        }
        if let (Some(color), Some(depth)) = (color_size, depth_size) {
            if color != depth {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "render target '{}' has mismatched attachment sizes",
                    desc.name
                ))
                .into());
            }
        }
        let (width, height) = color_size
            .or(depth_size)
            .unwrap_or((desc.width, desc.height));
        if width == 0 || height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "render target '{}' has an empty extent",
                desc.name
            ))
            .into());
        }

        let mut desc = desc;
        if desc.samples > 1 && !self.capabilities.supports_msaa {
            log::warn!(
                "Render target '{}' requested {} samples; multisampling is unavailable.",
                desc.name,
                desc.samples
            );
            desc.samples = 1;
        }
        desc.samples = desc.samples.clamp(1, self.capabilities.max_samples.max(1));

        let id = RenderTargetId::next();
        log::debug!(
            "Render target '{}' registered as {id:?} ({width}x{height}).",
            desc.name
        );
        self.render_targets
            .insert(id, RenderTargetRecord::new(desc, width, height));
        Ok(id)
    }

    /// Destroys a render target and its framebuffers. Attached textures survive.
    pub fn destroy_render_target(&mut self, id: RenderTargetId) -> Result<(), RenderError> {
        let record = self
            .render_targets
            .remove(&id)
            .ok_or_else(|| unknown_resource("render target", id))?;
        if self.active.render_target == Some(id) {
            self.active.render_target = None;
        }
        let framebuffers = [record.framebuffer, record.msaa_framebuffer];
        if framebuffers.contains(&self.bindings.framebuffer) && self.bindings.framebuffer.is_some()
        {
            // Deleting the bound framebuffer reverts to the default one.
            self.bindings.framebuffer = None;
        }
        if !self.lost {
            for framebuffer in framebuffers.into_iter().flatten() {
                self.ctx.delete_framebuffer(framebuffer);
            }
            for renderbuffer in [
                record.depth_renderbuffer,
                record.msaa_color_renderbuffer,
                record.msaa_depth_renderbuffer,
            ]
            .into_iter()
            .flatten()
            {
                self.ctx.delete_renderbuffer(renderbuffer);
            }
        }
        log::debug!("Render target '{}' destroyed.", record.desc.name);
        Ok(())
    }

    /// The extent of a render target.
    pub fn render_target_size(&self, id: RenderTargetId) -> Option<(u32, u32)> {
        self.render_targets
            .get(&id)
            .map(|record| (record.width, record.height))
    }
}

/// Logs and builds the error for an id this device does not know.
pub(crate) fn unknown_resource(kind: &str, id: impl Debug) -> RenderError {
    log::error!("Unknown {kind} {id:?}: destroyed, or created by another device.");
    RenderError::ResourceError(ResourceError::NotFound)
}

pub(crate) fn backend_error(err: String) -> RenderError {
    RenderError::ResourceError(ResourceError::BackendError(err))
}

pub(crate) fn upload_vertex_buffer<C: NativeContext>(
    ctx: &mut C,
    tables: &EnumTables,
    record: &mut VertexBufferRecord,
) -> Result<(), RenderError> {
    let native = match record.native {
        Some(native) => native,
        None => {
            let native = ctx.create_buffer().map_err(backend_error)?;
            record.native = Some(native);
            native
        }
    };
    ctx.bind_buffer(glow::ARRAY_BUFFER, Some(native));
    ctx.buffer_data(glow::ARRAY_BUFFER, &record.data, tables.usage(record.usage));
    Ok(())
}

/// The caller must have unbound any vertex array.
pub(crate) fn upload_index_buffer<C: NativeContext>(
    ctx: &mut C,
    tables: &EnumTables,
    record: &mut IndexBufferRecord,
) -> Result<(), RenderError> {
    let native = match record.native {
        Some(native) => native,
        None => {
            let native = ctx.create_buffer().map_err(backend_error)?;
            record.native = Some(native);
            native
        }
    };
    ctx.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(native));
    ctx.buffer_data(
        glow::ELEMENT_ARRAY_BUFFER,
        &record.data,
        tables.usage(record.usage),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall, ObjectKind};
    use strata_core::renderer::api::{VertexDataType, VertexElement, VertexSemantic};

    fn position_format() -> VertexFormat {
        VertexFormat::new(vec![VertexElement::new(
            VertexSemantic::Position,
            3,
            VertexDataType::Float32,
        )])
    }

    #[test]
    fn lost_context_fails_construction() {
        let mut ctx = HeadlessContext::modern();
        ctx.set_context_lost(true);
        assert!(matches!(
            GlDevice::new(ctx),
            Err(RenderError::InitializationFailed(_))
        ));
    }

    #[test]
    fn baseline_covers_drawing_buffer() {
        let device = GlDevice::new(HeadlessContext::modern().with_drawing_buffer_size(320, 200))
            .unwrap();
        assert_eq!(device.state().viewport, Rect::new(0, 0, 320, 200));
        assert_eq!(device.state().scissor, Rect::new(0, 0, 320, 200));
        assert_eq!(
            device.context().count_of(&NativeCall::Viewport([0, 0, 320, 200])),
            1
        );
    }

    #[test]
    fn texture_validation() {
        let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
        let volume = TextureDescriptor {
            target: TextureTarget::D3,
            depth: 4,
            ..Default::default()
        };
        assert!(matches!(
            device.create_texture(volume),
            Err(RenderError::ResourceError(ResourceError::InvalidDescriptor(_)))
        ));
        let float = TextureDescriptor {
            format: PixelFormat::Rgba32F,
            ..Default::default()
        };
        assert!(device.create_texture(float).is_err());
        assert!(device.create_texture(TextureDescriptor::default()).is_ok());
    }

    #[test]
    fn write_texture_checks_size() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let id = device.create_texture(TextureDescriptor::default()).unwrap();
        assert!(device.write_texture(id, 0, &[0u8; 4 * 4 * 4]).is_ok());
        assert!(device.write_texture(id, 0, &[0u8; 3]).is_err());
        assert!(device.write_texture(id, 1, &[0u8; 4 * 4 * 4]).is_err());
    }

    #[test]
    fn foreign_ids_are_not_found() {
        let mut first = GlDevice::new(HeadlessContext::modern()).unwrap();
        let mut second = GlDevice::new(HeadlessContext::modern()).unwrap();
        let id = first.create_texture(TextureDescriptor::default()).unwrap();
        assert_eq!(
            second.destroy_texture(id),
            Err(RenderError::ResourceError(ResourceError::NotFound))
        );
    }

    #[test]
    fn vertex_buffers_upload_eagerly_and_delete_on_destroy() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let id = device
            .create_vertex_buffer(position_format(), BufferUsage::Static, &[0u8; 36])
            .unwrap();
        assert!(device.vertex_buffer_native(id).is_some());
        assert_eq!(device.context().live_objects(ObjectKind::Buffer), 1);

        device.destroy_vertex_buffer(id).unwrap();
        assert_eq!(device.context().live_objects(ObjectKind::Buffer), 0);
        assert!(device.destroy_vertex_buffer(id).is_err());
    }

    #[test]
    fn misaligned_vertex_data_is_rejected() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        assert!(device
            .create_vertex_buffer(position_format(), BufferUsage::Static, &[0u8; 10])
            .is_err());
    }

    #[test]
    fn uint_indices_need_support() {
        let mut legacy = GlDevice::new(HeadlessContext::legacy()).unwrap();
        assert!(legacy
            .create_index_buffer(IndexFormat::Uint32, BufferUsage::Static, &[0u8; 12])
            .is_err());
        let mut modern = GlDevice::new(HeadlessContext::modern()).unwrap();
        assert!(modern
            .create_index_buffer(IndexFormat::Uint32, BufferUsage::Static, &[0u8; 12])
            .is_ok());
    }

    #[test]
    fn render_target_takes_color_buffer_size() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let color = device
            .create_texture(TextureDescriptor {
                width: 64,
                height: 32,
                ..Default::default()
            })
            .unwrap();
        let target = device
            .create_render_target(RenderTargetDescriptor {
                color_buffer: Some(color),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(device.render_target_size(target), Some((64, 32)));
    }

    #[test]
    fn msaa_request_is_clamped() {
        let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
        let target = device
            .create_render_target(RenderTargetDescriptor {
                samples: 4,
                width: 8,
                height: 8,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(device.render_targets[&target].desc.samples, 1);
    }

    #[test]
    fn high_precision_is_cached() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        assert!(device.texture_float_high_precision());
        let links = device
            .context()
            .count(|call| matches!(call, NativeCall::LinkProgram(_)));
        assert!(device.texture_float_high_precision());
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::LinkProgram(_))),
            links
        );
        assert_eq!(device.context().live_objects(ObjectKind::Program), 0);
    }

    #[test]
    fn high_precision_uses_a_sized_float_format_on_modern_contexts() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        device.context_mut().clear_calls();
        assert!(device.texture_float_high_precision());
        let float_images = |internal: u32| {
            device.context().count(|call| {
                matches!(call, NativeCall::TexImage { internal_format, ty: glow::FLOAT, .. }
                    if *internal_format == internal as i32)
            })
        };
        assert_eq!(float_images(glow::RGBA32F), 1);
        assert_eq!(float_images(glow::RGBA), 0);
    }

    #[test]
    fn high_precision_keeps_shadow_state() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let before = *device.state();
        device.texture_float_high_precision();
        assert_eq!(*device.state(), before);
    }
}
