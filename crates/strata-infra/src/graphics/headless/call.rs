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

use strata_core::renderer::api::{
    NativeBuffer, NativeFramebuffer, NativeProgram, NativeRenderbuffer, NativeTexture,
    NativeUniformLocation, NativeVertexArray,
};

/// One native call recorded by the [`HeadlessContext`](super::HeadlessContext).
///
/// Queries (`get_parameter_*`, `get_error`, `check_framebuffer_status`) are not
/// recorded; everything that would change native state is.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Enable(u32),
    Disable(u32),
    BlendFunc {
        src: u32,
        dst: u32,
    },
    BlendFuncSeparate {
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    },
    BlendEquation(u32),
    BlendEquationSeparate {
        rgb: u32,
        alpha: u32,
    },
    BlendColor([f32; 4]),
    DepthFunc(u32),
    DepthMask(bool),
    ColorMask([bool; 4]),
    CullFace(u32),
    StencilFunc {
        func: u32,
        reference: i32,
        mask: u32,
    },
    StencilFuncSeparate {
        face: u32,
        func: u32,
        reference: i32,
        mask: u32,
    },
    StencilOp {
        fail: u32,
        depth_fail: u32,
        pass: u32,
    },
    StencilOpSeparate {
        face: u32,
        fail: u32,
        depth_fail: u32,
        pass: u32,
    },
    StencilMask(u32),
    StencilMaskSeparate {
        face: u32,
        mask: u32,
    },
    PolygonOffset {
        slope: f32,
        constant: f32,
    },
    Viewport([i32; 4]),
    Scissor([i32; 4]),
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),

    CreateTexture(NativeTexture),
    DeleteTexture(NativeTexture),
    ActiveTexture(u32),
    BindTexture {
        target: u32,
        texture: Option<NativeTexture>,
    },
    TexParameterI32 {
        target: u32,
        parameter: u32,
        value: i32,
    },
    TexParameterF32 {
        target: u32,
        parameter: u32,
        value: f32,
    },
    TexImage {
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        has_data: bool,
    },
    GenerateMipmap(u32),

    CreateBuffer(NativeBuffer),
    DeleteBuffer(NativeBuffer),
    BindBuffer {
        target: u32,
        buffer: Option<NativeBuffer>,
    },
    BufferData {
        target: u32,
        size: usize,
        usage: u32,
    },
    BindBufferBase {
        target: u32,
        index: u32,
        buffer: Option<NativeBuffer>,
    },
    CreateVertexArray(NativeVertexArray),
    DeleteVertexArray(NativeVertexArray),
    BindVertexArray(Option<NativeVertexArray>),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        location: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribDivisor {
        location: u32,
        divisor: u32,
    },

    LinkProgram(NativeProgram),
    DeleteProgram(NativeProgram),
    UseProgram(Option<NativeProgram>),
    UniformI32 {
        location: NativeUniformLocation,
        components: u32,
        values: Vec<i32>,
    },
    UniformF32 {
        location: NativeUniformLocation,
        components: u32,
        values: Vec<f32>,
    },
    UniformMatrix {
        location: NativeUniformLocation,
        dimension: u32,
        values: Vec<f32>,
    },
    BeginTransformFeedback(u32),
    EndTransformFeedback,

    DrawArrays {
        mode: u32,
        first: i32,
        count: i32,
    },
    DrawArraysInstanced {
        mode: u32,
        first: i32,
        count: i32,
        instances: i32,
    },
    DrawElements {
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
    },
    DrawElementsInstanced {
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    },

    CreateFramebuffer(NativeFramebuffer),
    DeleteFramebuffer(NativeFramebuffer),
    BindFramebuffer {
        target: u32,
        framebuffer: Option<NativeFramebuffer>,
    },
    FramebufferTexture2D {
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<NativeTexture>,
        level: i32,
    },
    CreateRenderbuffer(NativeRenderbuffer),
    DeleteRenderbuffer(NativeRenderbuffer),
    BindRenderbuffer(Option<NativeRenderbuffer>),
    RenderbufferStorage {
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    },
    FramebufferRenderbuffer {
        target: u32,
        attachment: u32,
        renderbuffer: Option<NativeRenderbuffer>,
    },
    BlitFramebuffer {
        src: (i32, i32, i32, i32),
        dst: (i32, i32, i32, i32),
        mask: u32,
        filter: u32,
    },
    InvalidateFramebuffer {
        target: u32,
        attachments: Vec<u32>,
    },
    ReadPixels {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
}

impl NativeCall {
    /// Returns `true` for the four draw variants.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            NativeCall::DrawArrays { .. }
                | NativeCall::DrawArraysInstanced { .. }
                | NativeCall::DrawElements { .. }
                | NativeCall::DrawElementsInstanced { .. }
        )
    }
}
