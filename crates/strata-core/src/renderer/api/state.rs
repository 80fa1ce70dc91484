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

//! The shadow copy of global pipeline state.
//!
//! [`PipelineState`] mirrors what the native context would report if queried. It is
//! plain data: the device owns one instance and every setter is the single writer of
//! the fields it covers.

use super::enums::{BlendFactor, BlendOperation, CompareFunction, CullMode, StencilOperation};

/// A rectangle in framebuffer pixels, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Creates a new rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Blend configuration, color and alpha channels.
///
/// `separate_function` and `separate_equation` record whether the last native call
/// was the separate-alpha variant. Switching variant is a state change even when the
/// color values are unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    /// Whether blending is enabled.
    pub enabled: bool,
    /// Source factor for the color channels.
    pub color_src: BlendFactor,
    /// Destination factor for the color channels.
    pub color_dst: BlendFactor,
    /// Source factor for the alpha channel.
    pub alpha_src: BlendFactor,
    /// Destination factor for the alpha channel.
    pub alpha_dst: BlendFactor,
    /// Whether the factors were last set through the separate entry point.
    pub separate_function: bool,
    /// Equation for the color channels.
    pub color_op: BlendOperation,
    /// Equation for the alpha channel.
    pub alpha_op: BlendOperation,
    /// Whether the equations were last set through the separate entry point.
    pub separate_equation: bool,
    /// The constant blend color.
    pub constant: [f32; 4],
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            color_src: BlendFactor::One,
            color_dst: BlendFactor::Zero,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::Zero,
            separate_function: false,
            color_op: BlendOperation::Add,
            alpha_op: BlendOperation::Add,
            separate_equation: false,
            constant: [0.0; 4],
        }
    }
}

/// Depth test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Whether the depth test is enabled.
    pub test: bool,
    /// The depth comparison function.
    pub func: CompareFunction,
    /// Whether depth writes are enabled.
    pub write: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: true,
            func: CompareFunction::LessEqual,
            write: true,
        }
    }
}

/// Stencil configuration for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceState {
    /// The comparison function.
    pub func: CompareFunction,
    /// The reference value.
    pub reference: u32,
    /// The mask applied to both the reference and the stored value before comparing.
    pub read_mask: u32,
    /// Operation when the stencil test fails.
    pub fail: StencilOperation,
    /// Operation when the stencil test passes and the depth test fails.
    pub depth_fail: StencilOperation,
    /// Operation when both tests pass.
    pub pass: StencilOperation,
    /// Bits of the stencil buffer that may be written.
    pub write_mask: u32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            func: CompareFunction::Always,
            reference: 0,
            read_mask: 0xFF,
            fail: StencilOperation::Keep,
            depth_fail: StencilOperation::Keep,
            pass: StencilOperation::Keep,
            write_mask: 0xFF,
        }
    }
}

/// Stencil configuration, front and back faces tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StencilState {
    /// Whether the stencil test is enabled.
    pub enabled: bool,
    /// Front-face configuration.
    pub front: StencilFaceState,
    /// Back-face configuration.
    pub back: StencilFaceState,
}

/// Depth bias (polygon offset) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBiasState {
    /// Whether depth bias is applied.
    pub enabled: bool,
    /// Constant bias, in depth buffer units.
    pub constant: f32,
    /// Slope-scaled bias.
    pub slope: f32,
}

/// Values written by a clear operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    /// The clear color.
    pub color: [f32; 4],
    /// The clear depth.
    pub depth: f32,
    /// The clear stencil value.
    pub stencil: u32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 0.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// The full shadow of global pipeline state.
///
/// [`PipelineState::default`] is the baseline every device establishes, explicitly,
/// on creation and after every context restore. It deliberately differs from raw
/// native defaults in a few fields (depth test and culling on, `LessEqual` depth).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// Blend configuration.
    pub blend: BlendState,
    /// Depth configuration.
    pub depth: DepthState,
    /// Stencil configuration.
    pub stencil: StencilState,
    /// Requested cull mode.
    pub cull_mode: CullMode,
    /// The face last passed to the native cull-face call. Never `CullMode::None`.
    pub cull_face: CullMode,
    /// Color channel write mask, RGBA.
    pub color_write: [bool; 4],
    /// Whether alpha-to-coverage is enabled.
    pub alpha_to_coverage: bool,
    /// Whether rasterization is enabled. `false` discards all fragments.
    pub raster: bool,
    /// Depth bias configuration.
    pub depth_bias: DepthBiasState,
    /// Clear values.
    pub clear: ClearValues,
    /// Current viewport.
    pub viewport: Rect,
    /// Current scissor rectangle.
    pub scissor: Rect,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            blend: BlendState::default(),
            depth: DepthState::default(),
            stencil: StencilState::default(),
            cull_mode: CullMode::Back,
            cull_face: CullMode::Back,
            color_write: [true; 4],
            alpha_to_coverage: false,
            raster: true,
            depth_bias: DepthBiasState::default(),
            clear: ClearValues::default(),
            viewport: Rect::default(),
            scissor: Rect::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_values() {
        let state = PipelineState::default();
        assert!(!state.blend.enabled);
        assert!(state.depth.test);
        assert!(state.depth.write);
        assert_eq!(state.depth.func, CompareFunction::LessEqual);
        assert_eq!(state.cull_mode, CullMode::Back);
        assert_eq!(state.stencil.front, state.stencil.back);
        assert_eq!(state.stencil.front.write_mask, 0xFF);
        assert_eq!(state.clear.depth, 1.0);
        assert!(state.raster);
    }
}
