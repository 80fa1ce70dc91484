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

//! Device-side records of GPU-backed resources.
//!
//! Each record keeps the engine-level description of a resource together with the
//! native handles built from it. Losing the context drops the handles and keeps the
//! description, which is all a rebuild needs.

use strata_core::renderer::api::{
    BufferUsage, IndexFormat, NativeBuffer, NativeFramebuffer, NativeProgram,
    NativeRenderbuffer, NativeTexture, NativeUniformLocation, NativeVertexArray,
    RenderTargetDescriptor, ScopeId, ShaderDefinition, TextureDescriptor, UniformType, Version,
    VertexFormat,
};
use strata_core::renderer::traits::GpuResource;

#[derive(Debug)]
pub(crate) struct TextureRecord {
    pub desc: TextureDescriptor,
    pub native: Option<NativeTexture>,
    /// Level-0 data per face. `None` allocates storage without contents.
    pub faces: Vec<Option<Vec<u8>>>,
    pub needs_upload: bool,
    pub parameters_dirty: bool,
}

impl TextureRecord {
    pub fn new(desc: TextureDescriptor) -> Self {
        let faces = vec![None; desc.target.face_count()];
        Self {
            desc,
            native: None,
            faces,
            needs_upload: true,
            parameters_dirty: true,
        }
    }

    pub fn byte_size(&self) -> usize {
        (self.desc.width * self.desc.height * self.desc.depth.max(1)) as usize
            * self.desc.format.bytes_per_pixel() as usize
    }
}

impl GpuResource for TextureRecord {
    fn lose_context(&mut self) {
        self.native = None;
        self.needs_upload = true;
        self.parameters_dirty = true;
    }

    fn has_native_handle(&self) -> bool {
        self.native.is_some()
    }
}

#[derive(Debug)]
pub(crate) struct VertexBufferRecord {
    pub format: VertexFormat,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
    pub native: Option<NativeBuffer>,
    /// The layout object used when this buffer is drawn alone. Never in the keyed cache.
    pub vertex_array: Option<NativeVertexArray>,
}

impl VertexBufferRecord {
    pub fn vertex_count(&self) -> usize {
        match self.format.stride() {
            0 => 0,
            stride => self.data.len() / stride as usize,
        }
    }
}

impl GpuResource for VertexBufferRecord {
    fn lose_context(&mut self) {
        self.native = None;
        self.vertex_array = None;
    }

    fn has_native_handle(&self) -> bool {
        self.native.is_some()
    }
}

#[derive(Debug)]
pub(crate) struct IndexBufferRecord {
    pub format: IndexFormat,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
    pub native: Option<NativeBuffer>,
}

impl GpuResource for IndexBufferRecord {
    fn lose_context(&mut self) {
        self.native = None;
    }

    fn has_native_handle(&self) -> bool {
        self.native.is_some()
    }
}

/// The last scalar committed for a uniform, for value-equality short-circuiting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CommittedScalar {
    Int(i32),
    Float(f32),
}

#[derive(Debug, Clone)]
pub(crate) struct UniformInput {
    pub name: String,
    pub scope_id: ScopeId,
    pub ty: UniformType,
    pub array_size: u32,
    pub location: NativeUniformLocation,
    pub version: Version,
    pub scalar: Option<CommittedScalar>,
}

#[derive(Debug, Clone)]
pub(crate) struct SamplerInput {
    pub name: String,
    pub scope_id: ScopeId,
    pub ty: UniformType,
    pub location: NativeUniformLocation,
    /// Texture units last committed to the sampler.
    pub units: Vec<i32>,
}

#[derive(Debug)]
pub(crate) struct ShaderRecord {
    pub definition: ShaderDefinition,
    pub program: Option<NativeProgram>,
    /// Sticky until the context generation ends.
    pub failed: bool,
    pub uniforms: Vec<UniformInput>,
    pub samplers: Vec<SamplerInput>,
}

impl ShaderRecord {
    pub fn new(definition: ShaderDefinition) -> Self {
        Self {
            definition,
            program: None,
            failed: false,
            uniforms: Vec::new(),
            samplers: Vec::new(),
        }
    }
}

impl GpuResource for ShaderRecord {
    fn lose_context(&mut self) {
        self.program = None;
        self.failed = false;
        self.uniforms.clear();
        self.samplers.clear();
    }

    fn has_native_handle(&self) -> bool {
        self.program.is_some()
    }
}

#[derive(Debug)]
pub(crate) struct RenderTargetRecord {
    pub desc: RenderTargetDescriptor,
    pub width: u32,
    pub height: u32,
    pub framebuffer: Option<NativeFramebuffer>,
    pub depth_renderbuffer: Option<NativeRenderbuffer>,
    pub msaa_framebuffer: Option<NativeFramebuffer>,
    pub msaa_color_renderbuffer: Option<NativeRenderbuffer>,
    pub msaa_depth_renderbuffer: Option<NativeRenderbuffer>,
}

impl RenderTargetRecord {
    pub fn new(desc: RenderTargetDescriptor, width: u32, height: u32) -> Self {
        Self {
            desc,
            width,
            height,
            framebuffer: None,
            depth_renderbuffer: None,
            msaa_framebuffer: None,
            msaa_color_renderbuffer: None,
            msaa_depth_renderbuffer: None,
        }
    }

    /// The framebuffer draws go to: the multisampled one when present.
    pub fn draw_framebuffer(&self) -> Option<NativeFramebuffer> {
        self.msaa_framebuffer.or(self.framebuffer)
    }

    pub fn is_multisampled(&self) -> bool {
        self.msaa_framebuffer.is_some()
    }
}

impl GpuResource for RenderTargetRecord {
    fn lose_context(&mut self) {
        self.framebuffer = None;
        self.depth_renderbuffer = None;
        self.msaa_framebuffer = None;
        self.msaa_color_renderbuffer = None;
        self.msaa_depth_renderbuffer = None;
    }

    fn has_native_handle(&self) -> bool {
        self.framebuffer.is_some()
    }
}
