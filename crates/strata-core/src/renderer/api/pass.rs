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

//! Descriptors for render passes.

use super::flags::ClearFlags;
use super::resource::RenderTargetId;

/// Load/store behavior of the color attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorOps {
    /// Clear to `clear_value` at the start of the pass instead of loading.
    pub clear: bool,
    /// The clear color.
    pub clear_value: [f32; 4],
    /// Keep the results at the end of the pass.
    pub store: bool,
    /// Resolve multisampled contents into the color texture at the end of the pass.
    pub resolve: bool,
    /// Regenerate the color texture's mip chain at the end of the pass.
    pub mipmaps: bool,
}

impl Default for ColorOps {
    fn default() -> Self {
        Self {
            clear: false,
            clear_value: [0.0, 0.0, 0.0, 1.0],
            store: true,
            resolve: true,
            mipmaps: false,
        }
    }
}

/// Load/store behavior of the depth/stencil attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilOps {
    /// Clear depth at the start of the pass.
    pub clear_depth: bool,
    /// The clear depth.
    pub clear_depth_value: f32,
    /// Keep depth at the end of the pass.
    pub store_depth: bool,
    /// Clear stencil at the start of the pass.
    pub clear_stencil: bool,
    /// The clear stencil value.
    pub clear_stencil_value: u32,
    /// Keep stencil at the end of the pass.
    pub store_stencil: bool,
}

impl Default for DepthStencilOps {
    fn default() -> Self {
        Self {
            clear_depth: false,
            clear_depth_value: 1.0,
            store_depth: false,
            clear_stencil: false,
            clear_stencil_value: 0,
            store_stencil: false,
        }
    }
}

/// A bounded span of rendering work against one render target.
///
/// Created by the caller per pass and consumed by `start_pass` / `end_pass`; the device
/// does not retain it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPass {
    /// Debug name.
    pub name: String,
    /// The target, or `None` for the backbuffer.
    pub render_target: Option<RenderTargetId>,
    /// Color attachment operations.
    pub color_ops: ColorOps,
    /// Depth/stencil attachment operations.
    pub depth_stencil_ops: DepthStencilOps,
    /// Sample count of the target (informational).
    pub samples: u32,
}

impl RenderPass {
    /// Creates a pass drawing into `render_target` with default operations.
    pub fn new(name: &str, render_target: Option<RenderTargetId>) -> Self {
        Self {
            name: name.to_string(),
            render_target,
            samples: 1,
            ..Default::default()
        }
    }

    /// Returns `true` if any attachment is cleared at the start of the pass.
    pub fn has_clears(&self) -> bool {
        self.color_ops.clear || self.depth_stencil_ops.clear_depth || self.depth_stencil_ops.clear_stencil
    }
}

/// Parameters of an explicit clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearOptions {
    /// Which buffers to clear.
    pub flags: ClearFlags,
    /// The clear color.
    pub color: [f32; 4],
    /// The clear depth.
    pub depth: f32,
    /// The clear stencil value.
    pub stencil: u32,
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

impl From<&RenderPass> for ClearOptions {
    fn from(pass: &RenderPass) -> Self {
        let mut flags = ClearFlags::NONE;
        if pass.color_ops.clear {
            flags |= ClearFlags::COLOR;
        }
        if pass.depth_stencil_ops.clear_depth {
            flags |= ClearFlags::DEPTH;
        }
        if pass.depth_stencil_ops.clear_stencil {
            flags |= ClearFlags::STENCIL;
        }
        Self {
            flags,
            color: pass.color_ops.clear_value,
            depth: pass.depth_stencil_ops.clear_depth_value,
            stencil: pass.depth_stencil_ops.clear_stencil_value,
        }
    }
}
