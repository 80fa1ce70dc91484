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

//! The resource binding manager: texture units, vertex layouts and the active program.

use ahash::AHashMap;
use strata_core::renderer::api::{
    AddressMode, Capabilities, FilterMode, IndexBufferId, NativeFramebuffer, NativeProgram,
    NativeTexture, NativeVertexArray, PixelFormat, ShaderId, TextureId, TextureTarget,
    VertexBufferId, Version,
};
use strata_core::renderer::traits::{AttributeBinding, NativeContext};
use strata_core::renderer::{RenderError, ShaderError};

use super::conversions::{EnumTables, TEXTURE_MAX_ANISOTROPY_EXT};
use super::device::{backend_error, unknown_resource, GlDevice};
use super::resources::{SamplerInput, TextureRecord, UniformInput, VertexBufferRecord};

/// Key of a multi-buffer vertex array: each buffer with its format signature, in order.
pub(crate) type VertexArrayKey = Vec<(VertexBufferId, u64)>;

/// What the context currently has bound, as far as the device knows.
#[derive(Debug)]
pub(crate) struct BindingCache {
    /// Per unit, the texture bound to each target kind, indexed by [`TextureTarget`].
    pub texture_units: Vec<[Option<NativeTexture>; TextureTarget::COUNT]>,
    pub active_unit: u32,
    pub vertex_array: Option<NativeVertexArray>,
    /// Layouts of multi-buffer draws. Single-buffer layouts live on the buffer.
    pub vertex_arrays: AHashMap<VertexArrayKey, NativeVertexArray>,
    pub framebuffer: Option<NativeFramebuffer>,
    pub program: Option<NativeProgram>,
    /// Attribute locations enabled by direct wiring, one bit each.
    pub enabled_attributes: u32,
}

impl BindingCache {
    pub fn new(texture_units: u32) -> Self {
        Self {
            texture_units: vec![[None; TextureTarget::COUNT]; texture_units as usize],
            active_unit: 0,
            vertex_array: None,
            vertex_arrays: AHashMap::new(),
            framebuffer: None,
            program: None,
            enabled_attributes: 0,
        }
    }
}

impl<C: NativeContext> GlDevice<C> {
    // --- Textures ---

    /// Makes `unit` the active texture unit. No-op if it already is.
    pub fn active_texture(&mut self, unit: u32) {
        if self.lost || self.bindings.active_unit == unit {
            return;
        }
        self.ctx.active_texture(unit);
        self.bindings.active_unit = unit;
    }

    /// Binds a native texture to `target` on the active unit, unless it is already
    /// bound there.
    pub fn bind_texture(&mut self, target: TextureTarget, texture: Option<NativeTexture>) {
        if self.lost {
            return;
        }
        let unit = self.bindings.active_unit as usize;
        let Some(slots) = self.bindings.texture_units.get_mut(unit) else {
            log::error!("Texture unit {unit} is out of range.");
            return;
        };
        if slots[target as usize] == texture {
            return;
        }
        slots[target as usize] = texture;
        self.ctx.bind_texture(self.tables.texture_target(target), texture);
        self.stats.texture_binds += 1;
    }

    /// Binds a native texture on `unit`, activating the unit only if a bind is needed.
    pub fn bind_texture_on_unit(
        &mut self,
        target: TextureTarget,
        texture: Option<NativeTexture>,
        unit: u32,
    ) {
        if self.lost {
            return;
        }
        let Some(slots) = self.bindings.texture_units.get(unit as usize) else {
            log::error!("Texture unit {unit} is out of range.");
            return;
        };
        if slots[target as usize] != texture {
            self.active_texture(unit);
            self.bind_texture(target, texture);
        }
    }

    /// Makes a texture available on `unit`.
    ///
    /// Creates the native texture on first use. Pending parameter changes or data
    /// uploads need the unit active and the texture bound, so they force both before
    /// being applied; otherwise only a missing bind is issued.
    pub fn set_texture(&mut self, id: TextureId, unit: u32) -> Result<(), RenderError> {
        if self.lost {
            return Ok(());
        }
        if unit as usize >= self.bindings.texture_units.len() {
            return Err(RenderError::InvalidOperation(format!(
                "texture unit {unit} is out of range"
            )));
        }

        let record = self
            .textures
            .get_mut(&id)
            .ok_or_else(|| unknown_resource("texture", id))?;
        let native = match record.native {
            Some(native) => native,
            None => {
                let native = self.ctx.create_texture().map_err(backend_error)?;
                record.native = Some(native);
                log::trace!("Native texture created for '{}'.", record.desc.name);
                native
            }
        };
        let target = record.desc.target;
        let dirty = record.needs_upload || record.parameters_dirty;

        if dirty {
            self.active_texture(unit);
            self.bind_texture(target, Some(native));
            if let Some(record) = self.textures.get_mut(&id) {
                apply_texture_updates(&mut self.ctx, &self.tables, &self.capabilities, record);
            }
        } else {
            self.bind_texture_on_unit(target, Some(native), unit);
        }
        Ok(())
    }

    // --- Vertex and index buffers ---

    /// Queues a vertex buffer for the next draw.
    pub fn set_vertex_buffer(&mut self, id: VertexBufferId) {
        self.active.vertex_buffers.push(id);
    }

    /// Selects the index buffer for indexed draws.
    pub fn set_index_buffer(&mut self, id: Option<IndexBufferId>) {
        self.active.index_buffer = id;
    }

    pub(crate) fn set_vertex_array(&mut self, vertex_array: Option<NativeVertexArray>) {
        if self.bindings.vertex_array != vertex_array {
            self.ctx.bind_vertex_array(vertex_array);
            self.bindings.vertex_array = vertex_array;
            self.stats.vertex_array_binds += 1;
        }
    }

    /// Resolves the queued vertex buffers to a layout, binds it, and empties the queue.
    ///
    /// A single buffer uses the layout it owns; several buffers go through the keyed
    /// cache. The index buffer is always rebound afterwards.
    pub fn set_buffers(&mut self) -> Result<(), RenderError> {
        if self.lost {
            return Ok(());
        }
        let buffers = std::mem::take(&mut self.active.vertex_buffers);

        if self.capabilities.supports_vertex_arrays {
            let vertex_array = match buffers.as_slice() {
                [] => None,
                [single] => Some(self.buffer_vertex_array(*single)?),
                many => Some(self.cached_vertex_array(many)?),
            };
            self.set_vertex_array(vertex_array);
        } else {
            self.wire_attributes_directly(&buffers)?;
        }

        // Vertex arrays do not reliably capture this binding across implementations.
        let index = self
            .active
            .index_buffer
            .and_then(|id| self.index_buffers.get(&id))
            .and_then(|record| record.native);
        self.ctx.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, index);
        Ok(())
    }

    fn buffer_vertex_array(&mut self, id: VertexBufferId) -> Result<NativeVertexArray, RenderError> {
        let record = self
            .vertex_buffers
            .get(&id)
            .ok_or_else(|| unknown_resource("vertex buffer", id))?;
        if let Some(vertex_array) = record.vertex_array {
            return Ok(vertex_array);
        }
        let vertex_array = self.create_vertex_array(&[id])?;
        if let Some(record) = self.vertex_buffers.get_mut(&id) {
            record.vertex_array = Some(vertex_array);
        }
        Ok(vertex_array)
    }

    fn cached_vertex_array(
        &mut self,
        buffers: &[VertexBufferId],
    ) -> Result<NativeVertexArray, RenderError> {
        let key = buffers
            .iter()
            .map(|id| {
                self.vertex_buffers
                    .get(id)
                    .map(|record| (*id, record.format.signature()))
                    .ok_or_else(|| unknown_resource("vertex buffer", *id))
            })
            .collect::<Result<VertexArrayKey, _>>()?;
        if let Some(vertex_array) = self.bindings.vertex_arrays.get(&key) {
            return Ok(*vertex_array);
        }
        let vertex_array = self.create_vertex_array(buffers)?;
        self.bindings.vertex_arrays.insert(key, vertex_array);
        Ok(vertex_array)
    }

    /// Builds a vertex array wiring each buffer's attributes to their canonical
    /// locations. The index buffer is kept out of the captured state.
    fn create_vertex_array(
        &mut self,
        buffers: &[VertexBufferId],
    ) -> Result<NativeVertexArray, RenderError> {
        let vertex_array = self.ctx.create_vertex_array().map_err(backend_error)?;
        self.ctx.bind_vertex_array(Some(vertex_array));
        self.ctx.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

        let mut locations = 0u32;
        for id in buffers {
            let Some(record) = self.vertex_buffers.get(id) else {
                continue;
            };
            self.ctx.bind_buffer(glow::ARRAY_BUFFER, record.native);
            locations |= wire_attributes(&mut self.ctx, &self.tables, record, false);
        }

        self.ctx.bind_vertex_array(None);
        self.bindings.vertex_array = None;

        if locations & 1 == 0 {
            log::warn!(
                "No vertex attribute is mapped to location 0; some drivers render nothing in that case."
            );
        }
        log::debug!(
            "Vertex array built for {} buffer(s), attribute mask {locations:#06x}.",
            buffers.len()
        );
        Ok(vertex_array)
    }

    /// Wires attributes straight into the context when vertex arrays are unavailable,
    /// disabling locations left over from the previous draw.
    fn wire_attributes_directly(&mut self, buffers: &[VertexBufferId]) -> Result<(), RenderError> {
        let mut locations = 0u32;
        let reset_divisors = self.capabilities.supports_instancing;
        for id in buffers {
            let record = self
                .vertex_buffers
                .get(id)
                .ok_or_else(|| unknown_resource("vertex buffer", *id))?;
            self.ctx.bind_buffer(glow::ARRAY_BUFFER, record.native);
            locations |= wire_attributes(&mut self.ctx, &self.tables, record, reset_divisors);
        }

        let stale = self.bindings.enabled_attributes & !locations;
        for location in (0..u32::BITS).filter(|bit| stale & (1 << bit) != 0) {
            self.ctx.disable_vertex_attrib_array(location);
        }
        self.bindings.enabled_attributes = locations;
        Ok(())
    }

    // --- Shaders ---

    /// Makes a shader current, linking it on first use.
    ///
    /// Returns `false` if the shader is unknown or failed to link. A link failure is
    /// sticky for the context generation: later calls fail without retrying.
    pub fn set_shader(&mut self, id: ShaderId) -> bool {
        if self.lost {
            return false;
        }
        let Some(record) = self.shaders.get(&id) else {
            log::error!("Unknown shader {id:?}: destroyed, or created by another device.");
            return false;
        };
        if record.failed {
            return false;
        }
        if record.program.is_none() {
            if let Err(err) = self.link_shader(id) {
                log::error!("{err}");
                return false;
            }
        }

        let program = self.shaders.get(&id).and_then(|record| record.program);
        self.active.shader = Some(id);
        if self.bindings.program != program {
            self.ctx.use_program(program);
            self.bindings.program = program;
            self.stats.shader_switches += 1;
        }
        true
    }

    /// Links a shader and resolves its inputs against the uniform scope.
    pub(crate) fn link_shader(&mut self, id: ShaderId) -> Result<(), RenderError> {
        let Self {
            ctx,
            shaders,
            tables,
            scope,
            ..
        } = self;
        let record = shaders
            .get_mut(&id)
            .ok_or_else(|| unknown_resource("shader", id))?;

        let linked = {
            let definition = &record.definition;
            let attributes: Vec<AttributeBinding<'_>> = definition
                .attributes
                .iter()
                .map(|(name, semantic)| AttributeBinding {
                    name,
                    location: semantic.location(),
                })
                .collect();
            ctx.link_program(
                &definition.vertex_source,
                &definition.fragment_source,
                &attributes,
                &definition.feedback_varyings,
            )
        };

        let linked = match linked {
            Ok(linked) => linked,
            Err(log) => {
                record.failed = true;
                return Err(ShaderError::LinkFailed {
                    name: record.definition.name.clone(),
                    log,
                }
                .into());
            }
        };

        record.program = Some(linked.program);
        record.uniforms.clear();
        record.samplers.clear();
        for uniform in linked.uniforms {
            let Some(ty) = tables.uniform_type(uniform.native_type) else {
                log::warn!(
                    "Shader '{}': uniform '{}' has unsupported type {:#x}.",
                    record.definition.name,
                    uniform.name,
                    uniform.native_type
                );
                continue;
            };
            // Arrays reflect as `name[0]`; the scope knows them by their bare name.
            let name = uniform.name.trim_end_matches("[0]").to_string();
            let scope_id = scope.resolve(&name);
            if ty.is_sampler() {
                record.samplers.push(SamplerInput {
                    name,
                    scope_id,
                    ty,
                    location: uniform.location,
                    units: Vec::new(),
                });
            } else {
                record.uniforms.push(UniformInput {
                    name,
                    scope_id,
                    ty,
                    array_size: uniform.array_size,
                    location: uniform.location,
                    version: Version::default(),
                    scalar: None,
                });
            }
        }

        log::debug!(
            "Shader '{}' linked: {} uniforms, {} samplers.",
            record.definition.name,
            record.uniforms.len(),
            record.samplers.len()
        );
        Ok(())
    }
}

/// Points each element of the buffer's format at its canonical location.
///
/// The buffer must be bound to the array target. Returns the locations wired, one bit
/// each.
fn wire_attributes<C: NativeContext>(
    ctx: &mut C,
    tables: &EnumTables,
    record: &VertexBufferRecord,
    reset_divisors: bool,
) -> u32 {
    let format = &record.format;
    let stride = format.stride() as i32;
    let mut locations = 0u32;
    for element in format.elements() {
        let location = element.semantic.location();
        ctx.vertex_attrib_pointer(
            location,
            element.components as i32,
            tables.vertex_type(element.data_type),
            element.normalize,
            stride,
            element.offset as i32,
        );
        ctx.enable_vertex_attrib_array(location);
        if format.instancing() {
            ctx.vertex_attrib_divisor(location, 1);
        } else if reset_divisors {
            ctx.vertex_attrib_divisor(location, 0);
        }
        locations |= 1 << location;
    }
    locations
}

fn without_mipmaps(filter: FilterMode) -> FilterMode {
    match filter {
        FilterMode::Nearest | FilterMode::NearestMipmapNearest | FilterMode::NearestMipmapLinear => {
            FilterMode::Nearest
        }
        FilterMode::Linear | FilterMode::LinearMipmapNearest | FilterMode::LinearMipmapLinear => {
            FilterMode::Linear
        }
    }
}

/// Whether the texture gets a mip chain: requested, not depth, and either a
/// power-of-two size or a modern context.
pub(crate) fn texture_mipmapped(record: &TextureRecord, caps: &Capabilities) -> bool {
    let desc = &record.desc;
    desc.mipmaps && !desc.format.is_depth() && (desc.is_pot() || caps.is_modern())
}

/// Applies pending sampling parameters and data. The texture must be bound on the
/// active unit.
fn apply_texture_updates<C: NativeContext>(
    ctx: &mut C,
    tables: &EnumTables,
    caps: &Capabilities,
    record: &mut TextureRecord,
) {
    let desc = &record.desc;
    let gl_target = tables.texture_target(desc.target);
    let mipmapped = texture_mipmapped(record, caps);

    if record.parameters_dirty {
        let sampling = desc.sampling;
        let mut min_filter = sampling.min_filter;
        let mut mag_filter = without_mipmaps(sampling.mag_filter);
        if !mipmapped {
            min_filter = without_mipmaps(min_filter);
        }
        let unfilterable = matches!(desc.format, PixelFormat::Rgba32F | PixelFormat::R32F)
            && !caps.supports_texture_float_linear;
        if unfilterable {
            min_filter = if mipmapped {
                FilterMode::NearestMipmapNearest
            } else {
                FilterMode::Nearest
            };
            mag_filter = FilterMode::Nearest;
        }
        // Legacy contexts only sample non-power-of-two textures with edge clamping.
        let clamp_only = !caps.is_modern() && !desc.is_pot();
        let address = |mode: AddressMode| {
            if clamp_only {
                tables.address(AddressMode::ClampToEdge)
            } else {
                tables.address(mode)
            }
        };

        ctx.tex_parameter_i32(
            gl_target,
            glow::TEXTURE_MIN_FILTER,
            tables.filter(min_filter) as i32,
        );
        ctx.tex_parameter_i32(
            gl_target,
            glow::TEXTURE_MAG_FILTER,
            tables.filter(mag_filter) as i32,
        );
        ctx.tex_parameter_i32(gl_target, glow::TEXTURE_WRAP_S, address(sampling.address_u) as i32);
        ctx.tex_parameter_i32(gl_target, glow::TEXTURE_WRAP_T, address(sampling.address_v) as i32);
        if desc.target == TextureTarget::D3 && caps.is_modern() {
            ctx.tex_parameter_i32(
                gl_target,
                glow::TEXTURE_WRAP_R,
                address(sampling.address_w) as i32,
            );
        }
        if caps.extensions.texture_filter_anisotropic.is_some() {
            let anisotropy = sampling.anisotropy.clamp(1.0, caps.max_anisotropy.max(1.0));
            ctx.tex_parameter_f32(gl_target, TEXTURE_MAX_ANISOTROPY_EXT, anisotropy);
        }
        if caps.is_modern() && desc.format.is_depth() {
            match sampling.compare {
                Some(func) => {
                    ctx.tex_parameter_i32(
                        gl_target,
                        glow::TEXTURE_COMPARE_MODE,
                        glow::COMPARE_REF_TO_TEXTURE as i32,
                    );
                    ctx.tex_parameter_i32(
                        gl_target,
                        glow::TEXTURE_COMPARE_FUNC,
                        tables.compare(func) as i32,
                    );
                }
                None => {
                    ctx.tex_parameter_i32(gl_target, glow::TEXTURE_COMPARE_MODE, glow::NONE as i32);
                }
            }
        }
        record.parameters_dirty = false;
    }

    if record.needs_upload {
        let tokens = tables.pixel(desc.format);
        let (width, height) = (desc.width as i32, desc.height as i32);
        match desc.target {
            TextureTarget::D2 | TextureTarget::Cube => {
                let face_target = |face: usize| match desc.target {
                    TextureTarget::Cube => glow::TEXTURE_CUBE_MAP_POSITIVE_X + face as u32,
                    _ => glow::TEXTURE_2D,
                };
                for (face, data) in record.faces.iter().enumerate() {
                    ctx.tex_image_2d(
                        face_target(face),
                        0,
                        tokens.internal_format as i32,
                        width,
                        height,
                        tokens.format,
                        tokens.ty,
                        data.as_deref(),
                    );
                }
            }
            TextureTarget::D3 => {
                ctx.tex_image_3d(
                    glow::TEXTURE_3D,
                    0,
                    tokens.internal_format as i32,
                    width,
                    height,
                    desc.depth as i32,
                    tokens.format,
                    tokens.ty,
                    record.faces.first().and_then(|data| data.as_deref()),
                );
            }
        }
        if mipmapped && record.faces.iter().any(Option::is_some) {
            ctx.generate_mipmap(gl_target);
        }
        record.needs_upload = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall};
    use strata_core::renderer::api::{
        BufferUsage, ShaderDefinition, TextureDescriptor, VertexDataType, VertexElement,
        VertexFormat, VertexSemantic,
    };

    fn device() -> GlDevice<HeadlessContext> {
        GlDevice::new(HeadlessContext::modern()).unwrap()
    }

    #[test]
    fn active_texture_dedupes() {
        let mut device = device();
        device.context_mut().clear_calls();
        device.active_texture(3);
        device.active_texture(3);
        assert_eq!(device.context().count_of(&NativeCall::ActiveTexture(3)), 1);
    }

    #[test]
    fn bind_on_unit_skips_activation_when_bound() {
        let mut device = device();
        let id = device.create_texture(TextureDescriptor::default()).unwrap();
        device.set_texture(id, 2).unwrap();
        device.active_texture(0);
        device.context_mut().clear_calls();

        device.set_texture(id, 2).unwrap();
        assert!(device.context().calls().is_empty());
    }

    #[test]
    fn first_set_texture_uploads_once() {
        let mut device = device();
        let id = device.create_texture(TextureDescriptor::default()).unwrap();
        device.write_texture(id, 0, &[255u8; 64]).unwrap();
        device.set_texture(id, 0).unwrap();
        device.set_texture(id, 0).unwrap();
        let uploads = device
            .context()
            .count(|call| matches!(call, NativeCall::TexImage { has_data: true, .. }));
        assert_eq!(uploads, 1);
        assert_eq!(
            device
                .context()
                .count_of(&NativeCall::GenerateMipmap(glow::TEXTURE_2D)),
            1
        );
    }

    #[test]
    fn legacy_npot_texture_clamps_and_drops_mips() {
        let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
        let id = device
            .create_texture(TextureDescriptor {
                width: 3,
                height: 5,
                ..Default::default()
            })
            .unwrap();
        device.set_texture(id, 0).unwrap();
        let ctx = device.context();
        assert_eq!(
            ctx.count_of(&NativeCall::TexParameterI32 {
                target: glow::TEXTURE_2D,
                parameter: glow::TEXTURE_WRAP_S,
                value: glow::CLAMP_TO_EDGE as i32,
            }),
            1
        );
        assert_eq!(
            ctx.count_of(&NativeCall::TexParameterI32 {
                target: glow::TEXTURE_2D,
                parameter: glow::TEXTURE_MIN_FILTER,
                value: glow::LINEAR as i32,
            }),
            1
        );
    }

    #[test]
    fn anisotropy_is_clamped() {
        let mut device = device();
        let mut desc = TextureDescriptor::default();
        desc.sampling.anisotropy = 64.0;
        let id = device.create_texture(desc).unwrap();
        device.set_texture(id, 0).unwrap();
        assert_eq!(
            device.context().count_of(&NativeCall::TexParameterF32 {
                target: glow::TEXTURE_2D,
                parameter: TEXTURE_MAX_ANISOTROPY_EXT,
                value: 16.0,
            }),
            1
        );
    }

    #[test]
    fn sticky_link_failure() {
        let mut device = device();
        let shader = device
            .create_shader(ShaderDefinition::new("broken", "#error\n", "void main() {}"))
            .unwrap();
        assert!(!device.set_shader(shader));
        assert!(device.shader_failed(shader));
        assert!(!device.set_shader(shader));
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::LinkProgram(_))),
            0
        );
    }

    #[test]
    fn use_program_only_on_change() {
        let mut device = device();
        let shader = device
            .create_shader(ShaderDefinition::new("plain", "void main() {}", "void main() {}"))
            .unwrap();
        assert!(device.set_shader(shader));
        assert!(device.set_shader(shader));
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::UseProgram(Some(_)))),
            1
        );
        assert_eq!(device.stats().shader_switches, 1);
    }

    #[test]
    fn direct_wiring_disables_stale_locations() {
        let ctx = HeadlessContext::legacy();
        let mut device = GlDevice::new(ctx).unwrap();
        let wide = VertexFormat::new(vec![
            VertexElement::new(VertexSemantic::Position, 3, VertexDataType::Float32),
            VertexElement::new(VertexSemantic::Normal, 3, VertexDataType::Float32),
        ]);
        let narrow = VertexFormat::new(vec![VertexElement::new(
            VertexSemantic::Position,
            3,
            VertexDataType::Float32,
        )]);
        let a = device
            .create_vertex_buffer(wide, BufferUsage::Static, &[0u8; 24])
            .unwrap();
        let b = device
            .create_vertex_buffer(narrow, BufferUsage::Static, &[0u8; 12])
            .unwrap();

        device.set_vertex_buffer(a);
        device.set_buffers().unwrap();
        device.set_vertex_buffer(b);
        device.set_buffers().unwrap();
        assert_eq!(
            device
                .context()
                .count_of(&NativeCall::DisableVertexAttribArray(1)),
            1
        );
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::CreateVertexArray(_))),
            0
        );
    }
}
