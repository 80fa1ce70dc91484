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
    BufferUsage, ClearFlags, ClearOptions, IndexFormat, Primitive, PrimitiveTopology,
    RenderPass, RenderTargetDescriptor, RenderTargetId, ShaderDefinition, TextureDescriptor,
    UniformValue, VertexBufferId, VertexDataType, VertexElement, VertexFormat, VertexSemantic,
};
use strata_core::renderer::RenderError;
use strata_infra::graphics::headless::{HeadlessContext, NativeCall};
use strata_infra::GlDevice;

const PLAIN_VERTEX: &str = "attribute vec3 vertex_position;\nvoid main() {}";
const PLAIN_FRAGMENT: &str = "void main() {}";

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn buffer(
    device: &mut GlDevice<HeadlessContext>,
    semantic: VertexSemantic,
    vertices: usize,
) -> VertexBufferId {
    let format = VertexFormat::new(vec![VertexElement::new(
        semantic,
        3,
        VertexDataType::Float32,
    )]);
    let data = vec![0u8; vertices * format.stride() as usize];
    device
        .create_vertex_buffer(format, BufferUsage::Static, &data)
        .unwrap()
}

fn triangles() -> Primitive {
    Primitive::vertices(PrimitiveTopology::TriangleList, 0, 3)
}

fn color_target(device: &mut GlDevice<HeadlessContext>, name: &str) -> RenderTargetId {
    let color = device
        .create_texture(TextureDescriptor {
            name: name.to_string(),
            mipmaps: false,
            ..Default::default()
        })
        .unwrap();
    device
        .create_render_target(RenderTargetDescriptor {
            name: name.to_string(),
            color_buffer: Some(color),
            depth: false,
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn test_indexed_instanced_draw_uses_byte_offsets() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let shader = device
        .create_shader(ShaderDefinition::new("plain", PLAIN_VERTEX, PLAIN_FRAGMENT))
        .unwrap();
    let vertices = buffer(&mut device, VertexSemantic::Position, 4);
    let indices = device
        .create_index_buffer(IndexFormat::Uint16, BufferUsage::Static, &[0u8; 12])
        .unwrap();
    device.frame_start();

    // --- 2. ACT ---
    assert!(device.set_shader(shader));
    device.set_vertex_buffer(vertices);
    device.set_index_buffer(Some(indices));
    device
        .draw(
            &Primitive::indices(PrimitiveTopology::TriangleList, 3, 3),
            4,
            false,
        )
        .unwrap();

    // --- 3. ASSERT ---
    assert_eq!(
        device.context().count_of(&NativeCall::DrawElementsInstanced {
            mode: glow::TRIANGLES,
            count: 3,
            index_type: glow::UNSIGNED_SHORT,
            offset: 6,
            instances: 4,
        }),
        1
    );
    assert_eq!(device.stats().draw_calls, 1);
    assert_eq!(device.stats().primitives, 12);
}

#[test]
fn test_single_instance_count_still_draws_instanced() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let shader = device
        .create_shader(ShaderDefinition::new("plain", PLAIN_VERTEX, PLAIN_FRAGMENT))
        .unwrap();
    let vertices = buffer(&mut device, VertexSemantic::Position, 3);
    let indices = device
        .create_index_buffer(IndexFormat::Uint16, BufferUsage::Static, &[0u8; 6])
        .unwrap();
    assert!(device.set_shader(shader));
    device.set_vertex_buffer(vertices);
    device.set_index_buffer(Some(indices));
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    let primitive = Primitive::indices(PrimitiveTopology::TriangleList, 0, 3);
    device.draw(&primitive, 1, false).unwrap();
    device.draw(&primitive, 0, true).unwrap();

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(
        ctx.count_of(&NativeCall::DrawElementsInstanced {
            mode: glow::TRIANGLES,
            count: 3,
            index_type: glow::UNSIGNED_SHORT,
            offset: 0,
            instances: 1,
        }),
        1
    );
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::DrawElements { .. })),
        1,
        "A zero instance count selects the plain variant"
    );
}

#[test]
fn test_rejected_pass_does_not_block_the_next_one() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let target = color_target(&mut device, "kept");
    let stray = RenderPass::new("stray", Some(RenderTargetId::next()));
    let main = RenderPass::new("main", None);

    // --- 2. ACT ---
    let rejected = device.start_pass(&stray);

    // --- 3. ASSERT ---
    assert!(rejected.is_err());
    assert!(!device.in_pass());
    device.start_pass(&main).unwrap();
    device.end_pass(&main).unwrap();
    let offscreen = RenderPass::new("offscreen", Some(target));
    device.start_pass(&offscreen).unwrap();
    device.end_pass(&offscreen).unwrap();
}

#[test]
fn test_vertex_array_cache_reuses_multi_buffer_layouts() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let shader = device
        .create_shader(ShaderDefinition::new("plain", PLAIN_VERTEX, PLAIN_FRAGMENT))
        .unwrap();
    let positions = buffer(&mut device, VertexSemantic::Position, 3);
    let normals = buffer(&mut device, VertexSemantic::Normal, 3);
    assert!(device.set_shader(shader));
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    for _ in 0..3 {
        device.set_vertex_buffer(positions);
        device.set_vertex_buffer(normals);
        device.draw(&triangles(), 0, false).unwrap();
    }
    for _ in 0..2 {
        device.set_vertex_buffer(positions);
        device.draw(&triangles(), 0, false).unwrap();
    }

    // --- 3. ASSERT ---
    // One keyed layout for the pair, one owned layout for the single buffer.
    let ctx = device.context();
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::CreateVertexArray(_))),
        2
    );
    assert_eq!(ctx.count(NativeCall::is_draw), 5);
}

#[test]
fn test_legacy_context_wires_attributes_without_vertex_arrays() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
    let shader = device
        .create_shader(ShaderDefinition::new("plain", PLAIN_VERTEX, PLAIN_FRAGMENT))
        .unwrap();
    let positions = buffer(&mut device, VertexSemantic::Position, 3);
    let normals = buffer(&mut device, VertexSemantic::Normal, 3);
    assert!(device.set_shader(shader));
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.set_vertex_buffer(positions);
    device.set_vertex_buffer(normals);
    device.draw(&triangles(), 0, false).unwrap();
    device.set_vertex_buffer(positions);
    device.draw(&triangles(), 0, false).unwrap();

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::CreateVertexArray(_))),
        0
    );
    assert!(ctx.count_of(&NativeCall::EnableVertexAttribArray(1)) >= 1);
    assert_eq!(
        ctx.count_of(&NativeCall::DisableVertexAttribArray(1)),
        1,
        "The normal location is left over from the first draw"
    );
    assert_eq!(ctx.count_of(&NativeCall::DisableVertexAttribArray(0)), 0);
}

#[test]
fn test_draw_without_shader_is_skipped() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    let result = device.draw(&triangles(), 0, false);

    // --- 3. ASSERT ---
    assert!(result.is_ok());
    assert_eq!(device.context().count(NativeCall::is_draw), 0);
}

#[test]
fn test_uniforms_commit_only_after_the_scope_changes() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let shader = device
        .create_shader(ShaderDefinition::new(
            "tinted",
            PLAIN_VERTEX,
            "uniform vec4 tint;\nvoid main() {}",
        ))
        .unwrap();
    let tint = UniformValue::Floats(vec![1.0, 0.0, 0.0, 1.0]);
    device.set_uniform("tint", tint.clone());
    assert!(device.set_shader(shader));
    device.context_mut().clear_calls();
    let primitive = triangles();
    let tint_commits = |device: &GlDevice<HeadlessContext>| {
        device
            .context()
            .count(|call| matches!(call, NativeCall::UniformF32 { components: 4, .. }))
    };

    // --- 2. ACT & 3. ASSERT ---
    device.draw(&primitive, 0, false).unwrap();
    device.draw(&primitive, 0, false).unwrap();
    assert_eq!(tint_commits(&device), 1, "An unchanged scope entry is not recommitted");

    // Writing the entry again bumps its version, even with an equal value.
    device.set_uniform("tint", tint);
    device.draw(&primitive, 0, false).unwrap();
    assert_eq!(tint_commits(&device), 2);
}

#[test]
fn test_clear_enables_the_write_masks_it_needs() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    device.set_color_write([false; 4]);
    device.set_depth_write(false);
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.clear(&ClearOptions {
        flags: ClearFlags::COLOR,
        color: [1.0, 0.0, 0.0, 1.0],
        ..Default::default()
    });

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(ctx.count_of(&NativeCall::ColorMask([true; 4])), 1);
    assert_eq!(ctx.count_of(&NativeCall::ClearColor([1.0, 0.0, 0.0, 1.0])), 1);
    assert_eq!(ctx.count_of(&NativeCall::Clear(glow::COLOR_BUFFER_BIT)), 1);
    assert!(!device.depth_write(), "Depth was not cleared, so its mask stays off");
}

#[test]
fn test_passes_do_not_nest() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let outer = RenderPass::new("outer", None);
    let inner = RenderPass::new("inner", None);

    // --- 2. ACT ---
    device.start_pass(&outer).unwrap();
    let nested = device.start_pass(&inner);

    // --- 3. ASSERT ---
    assert!(matches!(nested, Err(RenderError::InvalidOperation(_))));
    assert!(device.in_pass());
    device.end_pass(&outer).unwrap();
    assert!(!device.in_pass());
}

#[test]
fn test_legacy_copy_draws_a_quad_and_restores_state() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::legacy()).unwrap();
    let source = color_target(&mut device, "source");
    let destination = color_target(&mut device, "destination");
    let state_before = *device.state();
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device
        .copy_render_target(Some(source), Some(destination), true, false)
        .unwrap();

    // --- 3. ASSERT ---
    let ctx = device.context();
    assert_eq!(
        ctx.count_of(&NativeCall::DrawArrays {
            mode: glow::TRIANGLE_STRIP,
            first: 0,
            count: 4,
        }),
        1
    );
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::BlitFramebuffer { .. })),
        0
    );
    let state_after = device.state();
    assert_eq!(state_after.depth.test, state_before.depth.test);
    assert_eq!(state_after.cull_mode, state_before.cull_mode);
    assert_eq!(state_after.viewport, state_before.viewport);
    assert!(
        device
            .copy_render_target(Some(source), Some(destination), false, true)
            .is_err(),
        "Depth copies need the modern tier"
    );
}
