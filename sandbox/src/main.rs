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

use anyhow::Context;
use strata_core::renderer::api::{
    BufferUsage, ColorOps, Primitive, PrimitiveTopology, RenderPass, RenderTargetDescriptor,
    ShaderDefinition, TextureDescriptor, UniformValue, VertexDataType, VertexElement,
    VertexFormat, VertexSemantic,
};
use strata_infra::{init_logging, GlDevice, HeadlessContext, LoggingConfig};

const VERTEX_SOURCE: &str = "attribute vec3 vertex_position;
uniform mat4 matrix_model;
void main() { gl_Position = matrix_model * vec4(vertex_position, 1.0); }";

const FRAGMENT_SOURCE: &str = "precision mediump float;
uniform vec4 tint;
void main() { gl_FragColor = tint; }";

const TRIANGLE: [f32; 9] = [-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0];

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut device = GlDevice::new(HeadlessContext::modern()).context("creating the device")?;
    let events = device.subscribe();
    log::info!("Capabilities: {:#?}", device.capabilities());

    let color = device.create_texture(TextureDescriptor {
        name: "offscreen".to_string(),
        width: 256,
        height: 256,
        mipmaps: false,
        ..Default::default()
    })?;
    let offscreen = device.create_render_target(RenderTargetDescriptor {
        name: "offscreen".to_string(),
        color_buffer: Some(color),
        ..Default::default()
    })?;
    let shader = device.create_shader(ShaderDefinition::new(
        "tinted",
        VERTEX_SOURCE,
        FRAGMENT_SOURCE,
    ))?;
    let triangle = device.create_vertex_buffer(
        VertexFormat::new(vec![VertexElement::new(
            VertexSemantic::Position,
            3,
            VertexDataType::Float32,
        )]),
        BufferUsage::Static,
        bytemuck::cast_slice(&TRIANGLE),
    )?;

    for frame in 0..3 {
        if frame == 1 {
            log::info!("Simulating a context loss.");
            device.context_mut().set_context_lost(true);
        }
        if frame == 2 {
            device.context_mut().set_context_lost(false);
        }

        device.frame_start();
        let pass = RenderPass {
            color_ops: ColorOps {
                clear: true,
                clear_value: [0.1, 0.1, 0.1, 1.0],
                ..Default::default()
            },
            ..RenderPass::new("offscreen", Some(offscreen))
        };
        device.start_pass(&pass)?;
        device.set_uniform("matrix_model", UniformValue::Floats(IDENTITY.to_vec()));
        device.set_uniform("tint", UniformValue::Floats(vec![1.0, 0.5, 0.0, 1.0]));
        if device.set_shader(shader) {
            device.set_vertex_buffer(triangle);
            device.draw(&Primitive::vertices(PrimitiveTopology::TriangleList, 0, 3), 0, false)?;
        }
        device.end_pass(&pass)?;

        if !device.is_lost() {
            device.copy_render_target(Some(offscreen), None, true, false)?;
            let mut pixel = [0u8; 4];
            device.read_pixels(0, 0, 1, 1, &mut pixel)?;
            log::info!("Frame {frame}: first backbuffer pixel {pixel:?}.");
        }
        device.frame_end();
        log::info!("Frame {frame}: {:?}", device.stats());
    }

    for event in events.try_iter() {
        log::info!("Device event: {event:?}");
    }
    Ok(())
}
