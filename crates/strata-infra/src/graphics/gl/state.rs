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

//! Pipeline-state setters.
//!
//! Every setter compares its arguments with the shadow [`PipelineState`] and issues
//! native calls only on a real change. While the context is lost they do nothing,
//! and the baseline is re-established on restore.
//!
//! [`PipelineState`]: strata_core::renderer::api::PipelineState

use strata_core::renderer::api::{
    BlendFactor, BlendOperation, CompareFunction, CullMode, PipelineState, Rect, StencilFaceState,
    StencilOperation,
};
use strata_core::renderer::traits::NativeContext;

use super::device::GlDevice;

fn toggle<C: NativeContext>(ctx: &mut C, capability: u32, enabled: bool) {
    if enabled {
        ctx.enable(capability);
    } else {
        ctx.disable(capability);
    }
}

impl<C: NativeContext> GlDevice<C> {
    /// Issues every baseline call unconditionally and resets the shadow to match.
    ///
    /// Native defaults are never relied upon: the baseline differs from them (depth
    /// test and back-face culling on) and a restored context may not honor them.
    pub(crate) fn apply_baseline_state(&mut self) {
        let (width, height) = self.ctx.drawing_buffer_size();
        let full = Rect::new(0, 0, width as i32, height as i32);
        self.state = PipelineState {
            viewport: full,
            scissor: full,
            ..PipelineState::default()
        };

        let state = self.state;
        let tables = &self.tables;
        let ctx = &mut self.ctx;

        toggle(ctx, glow::BLEND, state.blend.enabled);
        ctx.blend_func(
            tables.blend_factor(state.blend.color_src),
            tables.blend_factor(state.blend.color_dst),
        );
        ctx.blend_equation(tables.blend_equation(state.blend.color_op));
        let [r, g, b, a] = state.blend.constant;
        ctx.blend_color(r, g, b, a);

        let [r, g, b, a] = state.color_write;
        ctx.color_mask(r, g, b, a);

        toggle(ctx, glow::CULL_FACE, state.cull_mode != CullMode::None);
        ctx.cull_face(tables.cull_face(state.cull_face));

        toggle(ctx, glow::DEPTH_TEST, state.depth.test);
        ctx.depth_func(tables.compare(state.depth.func));
        ctx.depth_mask(state.depth.write);

        let stencil = state.stencil.front;
        toggle(ctx, glow::STENCIL_TEST, state.stencil.enabled);
        ctx.stencil_func(
            tables.compare(stencil.func),
            stencil.reference as i32,
            stencil.read_mask,
        );
        ctx.stencil_op(
            tables.stencil_op(stencil.fail),
            tables.stencil_op(stencil.depth_fail),
            tables.stencil_op(stencil.pass),
        );
        ctx.stencil_mask(stencil.write_mask);

        toggle(ctx, glow::SAMPLE_ALPHA_TO_COVERAGE, state.alpha_to_coverage);
        toggle(ctx, glow::POLYGON_OFFSET_FILL, state.depth_bias.enabled);
        ctx.polygon_offset(state.depth_bias.slope, state.depth_bias.constant);
        if tables.tier().is_modern() {
            toggle(ctx, glow::RASTERIZER_DISCARD, !state.raster);
        }

        let [r, g, b, a] = state.clear.color;
        ctx.clear_color(r, g, b, a);
        ctx.clear_depth(state.clear.depth);
        ctx.clear_stencil(state.clear.stencil as i32);

        // The scissor is always on; a full-extent rectangle stands in for "off".
        ctx.enable(glow::SCISSOR_TEST);
        ctx.viewport(full.x, full.y, full.width, full.height);
        ctx.scissor(full.x, full.y, full.width, full.height);

        log::debug!("Baseline pipeline state applied over {width}x{height}.");
    }

    // --- Blending ---

    /// Enables or disables blending.
    pub fn set_blending(&mut self, enabled: bool) {
        if self.lost || self.state.blend.enabled == enabled {
            return;
        }
        toggle(&mut self.ctx, glow::BLEND, enabled);
        self.state.blend.enabled = enabled;
        self.stats.state_changes += 1;
    }

    /// Sets the same blend factors for color and alpha.
    pub fn set_blend_function(&mut self, src: BlendFactor, dst: BlendFactor) {
        let blend = &self.state.blend;
        if self.lost
            || (!blend.separate_function
                && blend.color_src == src
                && blend.color_dst == dst
                && blend.alpha_src == src
                && blend.alpha_dst == dst)
        {
            return;
        }
        self.ctx
            .blend_func(self.tables.blend_factor(src), self.tables.blend_factor(dst));
        let blend = &mut self.state.blend;
        blend.color_src = src;
        blend.color_dst = dst;
        blend.alpha_src = src;
        blend.alpha_dst = dst;
        blend.separate_function = false;
        self.stats.state_changes += 1;
    }

    /// Sets independent blend factors for color and alpha.
    pub fn set_blend_function_separate(
        &mut self,
        color_src: BlendFactor,
        color_dst: BlendFactor,
        alpha_src: BlendFactor,
        alpha_dst: BlendFactor,
    ) {
        let blend = &self.state.blend;
        if self.lost
            || (blend.separate_function
                && blend.color_src == color_src
                && blend.color_dst == color_dst
                && blend.alpha_src == alpha_src
                && blend.alpha_dst == alpha_dst)
        {
            return;
        }
        let tables = &self.tables;
        self.ctx.blend_func_separate(
            tables.blend_factor(color_src),
            tables.blend_factor(color_dst),
            tables.blend_factor(alpha_src),
            tables.blend_factor(alpha_dst),
        );
        let blend = &mut self.state.blend;
        blend.color_src = color_src;
        blend.color_dst = color_dst;
        blend.alpha_src = alpha_src;
        blend.alpha_dst = alpha_dst;
        blend.separate_function = true;
        self.stats.state_changes += 1;
    }

    fn blend_operation_supported(&self, op: BlendOperation) -> bool {
        let minmax = matches!(op, BlendOperation::Min | BlendOperation::Max);
        if minmax && !self.capabilities.supports_blend_minmax {
            log::warn!("Blend operation {op:?} is not supported by this context; ignored.");
            return false;
        }
        true
    }

    /// Sets the same blend equation for color and alpha.
    pub fn set_blend_equation(&mut self, op: BlendOperation) {
        let blend = &self.state.blend;
        if self.lost
            || (!blend.separate_equation && blend.color_op == op && blend.alpha_op == op)
            || !self.blend_operation_supported(op)
        {
            return;
        }
        self.ctx.blend_equation(self.tables.blend_equation(op));
        let blend = &mut self.state.blend;
        blend.color_op = op;
        blend.alpha_op = op;
        blend.separate_equation = false;
        self.stats.state_changes += 1;
    }

    /// Sets independent blend equations for color and alpha.
    pub fn set_blend_equation_separate(&mut self, color_op: BlendOperation, alpha_op: BlendOperation) {
        let blend = &self.state.blend;
        if self.lost
            || (blend.separate_equation && blend.color_op == color_op && blend.alpha_op == alpha_op)
            || !self.blend_operation_supported(color_op)
            || !self.blend_operation_supported(alpha_op)
        {
            return;
        }
        self.ctx.blend_equation_separate(
            self.tables.blend_equation(color_op),
            self.tables.blend_equation(alpha_op),
        );
        let blend = &mut self.state.blend;
        blend.color_op = color_op;
        blend.alpha_op = alpha_op;
        blend.separate_equation = true;
        self.stats.state_changes += 1;
    }

    /// Sets the constant blend color.
    pub fn set_blend_color(&mut self, color: [f32; 4]) {
        if self.lost || self.state.blend.constant == color {
            return;
        }
        let [r, g, b, a] = color;
        self.ctx.blend_color(r, g, b, a);
        self.state.blend.constant = color;
        self.stats.state_changes += 1;
    }

    // --- Depth ---

    /// Enables or disables the depth test.
    pub fn set_depth_test(&mut self, enabled: bool) {
        if self.lost || self.state.depth.test == enabled {
            return;
        }
        toggle(&mut self.ctx, glow::DEPTH_TEST, enabled);
        self.state.depth.test = enabled;
        self.stats.state_changes += 1;
    }

    /// Whether depth testing is enabled.
    pub fn depth_test(&self) -> bool {
        self.state.depth.test
    }

    /// Sets the depth comparison function.
    pub fn set_depth_func(&mut self, func: CompareFunction) {
        if self.lost || self.state.depth.func == func {
            return;
        }
        self.ctx.depth_func(self.tables.compare(func));
        self.state.depth.func = func;
        self.stats.state_changes += 1;
    }

    /// Enables or disables depth writes.
    pub fn set_depth_write(&mut self, write: bool) {
        if self.lost || self.state.depth.write == write {
            return;
        }
        self.ctx.depth_mask(write);
        self.state.depth.write = write;
        self.stats.state_changes += 1;
    }

    /// Whether depth writes are enabled.
    pub fn depth_write(&self) -> bool {
        self.state.depth.write
    }

    /// Enables depth bias (polygon offset) on filled primitives.
    pub fn set_depth_bias(&mut self, enabled: bool) {
        if self.lost || self.state.depth_bias.enabled == enabled {
            return;
        }
        toggle(&mut self.ctx, glow::POLYGON_OFFSET_FILL, enabled);
        self.state.depth_bias.enabled = enabled;
        self.stats.state_changes += 1;
    }

    /// Sets the constant and slope-scaled depth bias.
    pub fn set_depth_bias_values(&mut self, constant: f32, slope: f32) {
        let bias = &self.state.depth_bias;
        if self.lost || (bias.constant == constant && bias.slope == slope) {
            return;
        }
        self.ctx.polygon_offset(slope, constant);
        self.state.depth_bias.constant = constant;
        self.state.depth_bias.slope = slope;
        self.stats.state_changes += 1;
    }

    // --- Rasterization ---

    /// Sets the color write mask, RGBA.
    pub fn set_color_write(&mut self, mask: [bool; 4]) {
        if self.lost || self.state.color_write == mask {
            return;
        }
        let [r, g, b, a] = mask;
        self.ctx.color_mask(r, g, b, a);
        self.state.color_write = mask;
        self.stats.state_changes += 1;
    }

    /// Sets the cull mode.
    ///
    /// Culling is enabled or disabled only when crossing `CullMode::None`, and the
    /// native face is set only when it differs from the last one passed.
    pub fn set_cull_mode(&mut self, mode: CullMode) {
        if self.lost || self.state.cull_mode == mode {
            return;
        }
        if mode == CullMode::None {
            self.ctx.disable(glow::CULL_FACE);
            self.stats.state_changes += 1;
        } else {
            if self.state.cull_mode == CullMode::None {
                self.ctx.enable(glow::CULL_FACE);
                self.stats.state_changes += 1;
            }
            if self.state.cull_face != mode {
                self.ctx.cull_face(self.tables.cull_face(mode));
                self.state.cull_face = mode;
                self.stats.state_changes += 1;
            }
        }
        self.state.cull_mode = mode;
    }

    /// The current cull mode.
    pub fn cull_mode(&self) -> CullMode {
        self.state.cull_mode
    }

    /// Enables or disables alpha-to-coverage.
    pub fn set_alpha_to_coverage(&mut self, enabled: bool) {
        if self.lost || self.state.alpha_to_coverage == enabled {
            return;
        }
        toggle(&mut self.ctx, glow::SAMPLE_ALPHA_TO_COVERAGE, enabled);
        self.state.alpha_to_coverage = enabled;
        self.stats.state_changes += 1;
    }

    /// Enables or disables rasterization. Discarding needs the modern tier; on a
    /// legacy context the request is ignored and rasterization stays on.
    pub fn set_raster(&mut self, enabled: bool) {
        if self.lost || self.state.raster == enabled {
            return;
        }
        if !self.capabilities.is_modern() {
            log::warn!("Rasterizer discard needs a modern context; ignored.");
            return;
        }
        toggle(&mut self.ctx, glow::RASTERIZER_DISCARD, !enabled);
        self.state.raster = enabled;
        self.stats.state_changes += 1;
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, rect: Rect) {
        if self.lost || self.state.viewport == rect {
            return;
        }
        self.ctx.viewport(rect.x, rect.y, rect.width, rect.height);
        self.state.viewport = rect;
        self.stats.state_changes += 1;
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor(&mut self, rect: Rect) {
        if self.lost || self.state.scissor == rect {
            return;
        }
        self.ctx.scissor(rect.x, rect.y, rect.width, rect.height);
        self.state.scissor = rect;
        self.stats.state_changes += 1;
    }

    // --- Stencil ---

    /// Enables or disables the stencil test.
    pub fn set_stencil_test(&mut self, enabled: bool) {
        if self.lost || self.state.stencil.enabled == enabled {
            return;
        }
        toggle(&mut self.ctx, glow::STENCIL_TEST, enabled);
        self.state.stencil.enabled = enabled;
        self.stats.state_changes += 1;
    }

    /// Sets the stencil function of both faces.
    pub fn set_stencil_func(&mut self, func: CompareFunction, reference: u32, read_mask: u32) {
        let matches = |face: &StencilFaceState| {
            face.func == func && face.reference == reference && face.read_mask == read_mask
        };
        let stencil = &self.state.stencil;
        if self.lost || (matches(&stencil.front) && matches(&stencil.back)) {
            return;
        }
        self.ctx
            .stencil_func(self.tables.compare(func), reference as i32, read_mask);
        for face in [&mut self.state.stencil.front, &mut self.state.stencil.back] {
            face.func = func;
            face.reference = reference;
            face.read_mask = read_mask;
        }
        self.stats.state_changes += 1;
    }

    /// Sets the stencil function of front faces only.
    pub fn set_stencil_func_front(&mut self, func: CompareFunction, reference: u32, read_mask: u32) {
        self.stencil_func_face(glow::FRONT, func, reference, read_mask);
    }

    /// Sets the stencil function of back faces only.
    pub fn set_stencil_func_back(&mut self, func: CompareFunction, reference: u32, read_mask: u32) {
        self.stencil_func_face(glow::BACK, func, reference, read_mask);
    }

    fn stencil_func_face(&mut self, face: u32, func: CompareFunction, reference: u32, read_mask: u32) {
        if self.lost {
            return;
        }
        let state = if face == glow::FRONT {
            &mut self.state.stencil.front
        } else {
            &mut self.state.stencil.back
        };
        if state.func == func && state.reference == reference && state.read_mask == read_mask {
            return;
        }
        state.func = func;
        state.reference = reference;
        state.read_mask = read_mask;
        self.ctx.stencil_func_separate(
            face,
            self.tables.compare(func),
            reference as i32,
            read_mask,
        );
        self.stats.state_changes += 1;
    }

    /// Sets the stencil operations and write mask of both faces.
    pub fn set_stencil_operation(
        &mut self,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
        write_mask: u32,
    ) {
        if self.lost {
            return;
        }
        let stencil = self.state.stencil;
        let ops_match = |face: &StencilFaceState| {
            face.fail == fail && face.depth_fail == depth_fail && face.pass == pass
        };
        if !(ops_match(&stencil.front) && ops_match(&stencil.back)) {
            self.ctx.stencil_op(
                self.tables.stencil_op(fail),
                self.tables.stencil_op(depth_fail),
                self.tables.stencil_op(pass),
            );
            for face in [&mut self.state.stencil.front, &mut self.state.stencil.back] {
                face.fail = fail;
                face.depth_fail = depth_fail;
                face.pass = pass;
            }
            self.stats.state_changes += 1;
        }
        if stencil.front.write_mask != write_mask || stencil.back.write_mask != write_mask {
            self.ctx.stencil_mask(write_mask);
            self.state.stencil.front.write_mask = write_mask;
            self.state.stencil.back.write_mask = write_mask;
            self.stats.state_changes += 1;
        }
    }

    /// Sets the stencil operations and write mask of front faces only.
    pub fn set_stencil_operation_front(
        &mut self,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
        write_mask: u32,
    ) {
        self.stencil_operation_face(glow::FRONT, fail, depth_fail, pass, write_mask);
    }

    /// Sets the stencil operations and write mask of back faces only.
    pub fn set_stencil_operation_back(
        &mut self,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
        write_mask: u32,
    ) {
        self.stencil_operation_face(glow::BACK, fail, depth_fail, pass, write_mask);
    }

    fn stencil_operation_face(
        &mut self,
        face: u32,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
        write_mask: u32,
    ) {
        if self.lost {
            return;
        }
        let state = if face == glow::FRONT {
            &mut self.state.stencil.front
        } else {
            &mut self.state.stencil.back
        };
        let ops_changed = state.fail != fail || state.depth_fail != depth_fail || state.pass != pass;
        let mask_changed = state.write_mask != write_mask;
        state.fail = fail;
        state.depth_fail = depth_fail;
        state.pass = pass;
        state.write_mask = write_mask;

        if ops_changed {
            self.ctx.stencil_op_separate(
                face,
                self.tables.stencil_op(fail),
                self.tables.stencil_op(depth_fail),
                self.tables.stencil_op(pass),
            );
            self.stats.state_changes += 1;
        }
        if mask_changed {
            self.ctx.stencil_mask_separate(face, write_mask);
            self.stats.state_changes += 1;
        }
    }

    // --- Clear values ---

    /// Sets the clear color.
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        if self.lost || self.state.clear.color == color {
            return;
        }
        let [r, g, b, a] = color;
        self.ctx.clear_color(r, g, b, a);
        self.state.clear.color = color;
        self.stats.state_changes += 1;
    }

    /// Sets the clear depth.
    pub fn set_clear_depth(&mut self, depth: f32) {
        if self.lost || self.state.clear.depth == depth {
            return;
        }
        self.ctx.clear_depth(depth);
        self.state.clear.depth = depth;
        self.stats.state_changes += 1;
    }

    /// Sets the clear stencil value.
    pub fn set_clear_stencil(&mut self, stencil: u32) {
        if self.lost || self.state.clear.stencil == stencil {
            return;
        }
        self.ctx.clear_stencil(stencil as i32);
        self.state.clear.stencil = stencil;
        self.stats.state_changes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall};

    fn device() -> GlDevice<HeadlessContext> {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        device.context_mut().clear_calls();
        device
    }

    #[test]
    fn baseline_is_explicit() {
        let device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let ctx = device.context();
        assert_eq!(ctx.count_of(&NativeCall::Enable(glow::DEPTH_TEST)), 1);
        assert_eq!(ctx.count_of(&NativeCall::Enable(glow::CULL_FACE)), 1);
        assert_eq!(ctx.count_of(&NativeCall::Disable(glow::BLEND)), 1);
        assert_eq!(ctx.count_of(&NativeCall::DepthFunc(glow::LEQUAL)), 1);
        assert_eq!(ctx.count_of(&NativeCall::CullFace(glow::BACK)), 1);
        assert_eq!(device.state().depth.func, CompareFunction::LessEqual);
    }

    #[test]
    fn repeated_setter_is_one_call() {
        let mut device = device();
        device.set_blending(true);
        device.set_blending(true);
        assert_eq!(device.context().count_of(&NativeCall::Enable(glow::BLEND)), 1);
        assert_eq!(device.stats().state_changes, 1);
    }

    #[test]
    fn separate_switch_counts_as_change() {
        let mut device = device();
        device.set_blend_function_separate(
            BlendFactor::One,
            BlendFactor::Zero,
            BlendFactor::One,
            BlendFactor::Zero,
        );
        device.set_blend_function(BlendFactor::One, BlendFactor::Zero);
        let ctx = device.context();
        assert_eq!(ctx.count(|call| matches!(call, NativeCall::BlendFuncSeparate { .. })), 1);
        assert_eq!(ctx.count(|call| matches!(call, NativeCall::BlendFunc { .. })), 1);
    }

    #[test]
    fn minmax_requires_support() {
        let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
        device.context_mut().clear_calls();
        device.set_blend_equation(BlendOperation::Max);
        assert!(device.context().calls().is_empty());
        assert_eq!(device.state().blend.color_op, BlendOperation::Add);
    }

    #[test]
    fn cull_face_only_on_face_change() {
        let mut device = device();
        device.set_cull_mode(CullMode::None);
        device.set_cull_mode(CullMode::Back);
        let ctx = device.context();
        assert_eq!(ctx.count_of(&NativeCall::Disable(glow::CULL_FACE)), 1);
        assert_eq!(ctx.count_of(&NativeCall::Enable(glow::CULL_FACE)), 1);
        assert_eq!(ctx.count(|call| matches!(call, NativeCall::CullFace(_))), 0);
    }

    #[test]
    fn front_stencil_leaves_back_alone() {
        let mut device = device();
        device.set_stencil_func_front(CompareFunction::Equal, 1, 0xFF);
        assert_eq!(device.state().stencil.front.func, CompareFunction::Equal);
        assert_eq!(device.state().stencil.back.func, CompareFunction::Always);

        // Both faces now differ from the request, so the combined call is issued.
        device.set_stencil_func(CompareFunction::Equal, 1, 0xFF);
        assert_eq!(
            device.context().count_of(&NativeCall::StencilFunc {
                func: glow::EQUAL,
                reference: 1,
                mask: 0xFF,
            }),
            1
        );
        device.set_stencil_func(CompareFunction::Equal, 1, 0xFF);
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::StencilFunc { .. })),
            1
        );
    }

    #[test]
    fn stencil_mask_tracked_separately_from_ops() {
        let mut device = device();
        device.set_stencil_operation(
            StencilOperation::Keep,
            StencilOperation::Keep,
            StencilOperation::Keep,
            0x0F,
        );
        let ctx = device.context();
        assert_eq!(ctx.count(|call| matches!(call, NativeCall::StencilOp { .. })), 0);
        assert_eq!(ctx.count_of(&NativeCall::StencilMask(0x0F)), 1);
    }

    #[test]
    fn setters_are_silent_while_lost() {
        let mut device = device();
        device.lost = true;
        device.set_depth_test(false);
        device.set_viewport(Rect::new(0, 0, 1, 1));
        assert!(device.context().calls().is_empty());
        assert!(device.depth_test());
    }

    #[test]
    fn legacy_ignores_raster_discard() {
        let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
        device.set_raster(false);
        assert!(device.state().raster);
        assert_eq!(
            device
                .context()
                .count_of(&NativeCall::Enable(glow::RASTERIZER_DISCARD)),
            0
        );
    }
}
