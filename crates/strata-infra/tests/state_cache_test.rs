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

use approx::assert_relative_eq;
use strata_core::renderer::api::{
    BlendFactor, CompareFunction, CullMode, NativeTexture, StencilOperation, TextureDescriptor,
};
use strata_infra::graphics::headless::{HeadlessContext, NativeCall};
use strata_infra::GlDevice;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_repeated_state_reaches_the_context_once() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.set_depth_test(false);
    device.set_depth_test(false);
    device.set_blend_function(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    device.set_blend_function(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    device.set_depth_func(CompareFunction::Always);
    device.set_depth_func(CompareFunction::Always);

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(ctx.count_of(&NativeCall::Disable(glow::DEPTH_TEST)), 1);
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::BlendFunc { .. })),
        1
    );
    assert_eq!(ctx.count_of(&NativeCall::DepthFunc(glow::ALWAYS)), 1);
    assert!(!device.depth_test(), "The shadow state must follow the setter");
}

#[test]
fn test_cull_mode_toggles_only_when_crossing_none() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    assert_eq!(device.cull_mode(), CullMode::Back);
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.set_cull_mode(CullMode::None);
    device.set_cull_mode(CullMode::Front);
    device.set_cull_mode(CullMode::FrontAndBack);
    device.set_cull_mode(CullMode::None);
    device.set_cull_mode(CullMode::FrontAndBack);

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(ctx.count_of(&NativeCall::Disable(glow::CULL_FACE)), 2);
    assert_eq!(ctx.count_of(&NativeCall::Enable(glow::CULL_FACE)), 2);
    assert_eq!(ctx.count_of(&NativeCall::CullFace(glow::FRONT)), 1);
    // The face was already FRONT_AND_BACK when culling came back on.
    assert_eq!(ctx.count_of(&NativeCall::CullFace(glow::FRONT_AND_BACK)), 1);
    assert_eq!(device.cull_mode(), CullMode::FrontAndBack);
}

#[test]
fn test_stencil_operation_with_mask_on_both_faces() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.set_stencil_test(true);
    device.set_stencil_operation(
        StencilOperation::Keep,
        StencilOperation::Keep,
        StencilOperation::Replace,
        0x0f,
    );
    device.set_stencil_operation(
        StencilOperation::Keep,
        StencilOperation::Keep,
        StencilOperation::Replace,
        0x0f,
    );

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(ctx.count_of(&NativeCall::Enable(glow::STENCIL_TEST)), 1);
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::StencilOp { .. })),
        1
    );
    assert_eq!(ctx.count_of(&NativeCall::StencilMask(0x0f)), 1);
}

#[test]
fn test_texture_binds_are_deduplicated_per_unit() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let first = device.create_texture(TextureDescriptor::default()).unwrap();
    let second = device.create_texture(TextureDescriptor::default()).unwrap();

    // --- 2. ACT ---
    device.set_texture(first, 0).unwrap();
    device.set_texture(first, 0).unwrap();
    device.set_texture(second, 1).unwrap();
    device.set_texture(first, 0).unwrap();
    device.set_texture(second, 0).unwrap();

    // --- 3. ASSERT ---
    let first_native = device.texture_native(first);
    let second_native = device.texture_native(second);
    assert!(first_native.is_some() && second_native.is_some());

    let ctx = device.context();
    let binds_of = |texture: Option<NativeTexture>| {
        ctx.count(|call| {
            matches!(call, NativeCall::BindTexture { texture: bound, .. } if *bound == texture)
        })
    };
    assert_eq!(binds_of(first_native), 1, "Rebinding on the same unit is a no-op");
    assert_eq!(binds_of(second_native), 2, "One bind per unit the texture lands on");
    assert!(device.set_texture(first, 4096).is_err());
}

#[test]
fn test_depth_bias_values_are_tracked_in_the_shadow_state() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.set_depth_bias(true);
    device.set_depth_bias_values(0.5, 1.25);
    device.set_depth_bias_values(0.5, 1.25);

    // --- 3. ASSERT ---
    let bias = device.state().depth_bias;
    assert!(bias.enabled);
    assert_relative_eq!(bias.constant, 0.5);
    assert_relative_eq!(bias.slope, 1.25);
    assert_eq!(
        device
            .context()
            .count(|call| matches!(call, NativeCall::PolygonOffset { .. })),
        1
    );
    assert_eq!(
        device.context().count_of(&NativeCall::Enable(glow::POLYGON_OFFSET_FILL)),
        1
    );
}
