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
    BufferUsage, CullMode, Primitive, PrimitiveTopology, RenderPass, ShaderDefinition,
    TextureDescriptor, VertexDataType, VertexElement, VertexFormat, VertexSemantic,
};
use strata_core::renderer::RenderError;
use strata_core::DeviceEvent;
use strata_infra::graphics::headless::{HeadlessContext, NativeCall, ObjectKind};
use strata_infra::GlDevice;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_loss_and_restore_round_trip() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let events = device.subscribe();
    let texture = device.create_texture(TextureDescriptor::default()).unwrap();
    let shader = device
        .create_shader(ShaderDefinition::new(
            "plain",
            "attribute vec3 vertex_position;\nvoid main() {}",
            "void main() {}",
        ))
        .unwrap();
    let buffer = device
        .create_vertex_buffer(
            VertexFormat::new(vec![VertexElement::new(
                VertexSemantic::Position,
                3,
                VertexDataType::Float32,
            )]),
            BufferUsage::Static,
            &[0u8; 36],
        )
        .unwrap();
    device.set_texture(texture, 0).unwrap();
    assert!(device.set_shader(shader));
    device.set_cull_mode(CullMode::None);

    // --- 2. ACT: lose the context ---
    device.context_mut().set_context_lost(true);
    device.frame_start();
    device.context_mut().clear_calls();

    // Everything the caller does while lost is absorbed.
    device.set_depth_test(false);
    device.set_vertex_buffer(buffer);
    device
        .draw(&Primitive::vertices(PrimitiveTopology::TriangleList, 0, 3), 0, false)
        .unwrap();
    let pass = RenderPass::new("lost", None);
    device.start_pass(&pass).unwrap();
    device.end_pass(&pass).unwrap();

    // --- 3. ASSERT: nothing reached the lost context ---
    assert!(device.is_lost());
    assert!(device.context().calls().is_empty());
    assert_eq!(
        device.read_pixels(0, 0, 1, 1, &mut [0u8; 4]),
        Err(RenderError::DeviceLost)
    );

    // --- 2. ACT: restore it ---
    device.context_mut().set_context_lost(false);
    device.frame_start();

    // --- 3. ASSERT: caches rebuilt, resources come back ---
    assert!(!device.is_lost());
    assert!(!device.in_pass());
    assert_eq!(device.cull_mode(), CullMode::Back, "Restore re-applies the baseline");
    let fresh = GlDevice::new(HeadlessContext::modern()).unwrap();
    assert_eq!(device.state(), fresh.state());
    assert_eq!(device.capabilities(), fresh.capabilities());
    assert_eq!(device.tables(), fresh.tables());
    assert!(device.vertex_buffer_native(buffer).is_some());
    assert!(device.texture_native(texture).is_none(), "Textures come back lazily");
    assert!(device.shader_native(shader).is_none(), "Programs relink lazily");

    device.context_mut().clear_calls();
    device.set_texture(texture, 0).unwrap();
    assert!(device.set_shader(shader));
    let ctx = device.context();
    assert_eq!(
        ctx.count(|call| matches!(call, NativeCall::TexImage { .. })),
        1,
        "The texture is uploaded again from the kept description"
    );
    assert_eq!(ctx.live_objects(ObjectKind::Texture), 1);
    assert_eq!(ctx.live_objects(ObjectKind::Program), 1);

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(received, vec![DeviceEvent::Lost, DeviceEvent::Restored]);
    assert_eq!(device.generation(), 1);
}

#[test]
fn test_pass_started_before_loss_stays_balanced() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let pass = RenderPass::new("interrupted", None);
    device.start_pass(&pass).unwrap();

    // --- 2. ACT ---
    device.lose_context();
    let ended = device.end_pass(&pass);

    // --- 3. ASSERT ---
    assert!(ended.is_ok());
    assert!(!device.in_pass());
    assert!(matches!(
        device.end_pass(&pass),
        Err(RenderError::InvalidOperation(_))
    ));
}

#[test]
fn test_destroying_resources_while_lost_deletes_nothing() {
    // --- 1. ARRANGE ---
    init();
    let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
    let texture = device.create_texture(TextureDescriptor::default()).unwrap();
    device.set_texture(texture, 0).unwrap();
    device.context_mut().set_context_lost(true);
    device.sync_context_state();
    device.context_mut().clear_calls();

    // --- 2. ACT ---
    device.destroy_texture(texture).unwrap();

    // --- 3. ASSERT ---
    assert!(device.context().calls().is_empty());
    assert!(matches!(
        device.destroy_texture(texture),
        Err(RenderError::ResourceError(_))
    ));
}
