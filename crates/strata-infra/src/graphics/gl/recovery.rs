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

//! Context loss and restore.
//!
//! A loss invalidates every native handle at once. Records keep their descriptions
//! and drop their handles; a restore re-probes the context, re-establishes the
//! baseline state and rebuilds the buffers. Textures, programs and framebuffers are
//! rebuilt lazily on first use.

use strata_core::event::DeviceEvent;
use strata_core::renderer::traits::{GpuResource, NativeContext};
use strata_core::renderer::RenderError;

use super::bindings::BindingCache;
use super::capabilities;
use super::conversions::EnumTables;
use super::device::{upload_index_buffer, upload_vertex_buffer, GlDevice};

impl<C: NativeContext> GlDevice<C> {
    /// Reacts to a lost native context. Every handle is forgotten, never deleted.
    pub fn lose_context(&mut self) {
        if self.lost {
            return;
        }
        self.lost = true;
        self.generation += 1;

        self.textures.values_mut().for_each(GpuResource::lose_context);
        self.vertex_buffers.values_mut().for_each(GpuResource::lose_context);
        self.index_buffers.values_mut().for_each(GpuResource::lose_context);
        self.shaders.values_mut().for_each(GpuResource::lose_context);
        self.render_targets.values_mut().for_each(GpuResource::lose_context);

        self.bindings = BindingCache::new(self.capabilities.max_combined_textures);
        self.high_precision = None;
        self.active.vertex_buffers.clear();

        log::info!(
            "Graphics context lost (generation {}); {} textures, {} buffers, {} shaders kept for rebuild.",
            self.generation,
            self.textures.len(),
            self.vertex_buffers.len() + self.index_buffers.len(),
            self.shaders.len()
        );
        self.events.emit(DeviceEvent::Lost);
    }

    /// Rebuilds the device against a restored native context.
    ///
    /// Fails with [`RenderError::DeviceLost`] if the context is still lost, and with
    /// [`RenderError::InitializationFailed`] if the restored context has no usable
    /// baseline; the device stays lost in both cases.
    pub fn restore_context(&mut self) -> Result<(), RenderError> {
        if !self.lost {
            return Ok(());
        }
        if self.ctx.is_context_lost() {
            return Err(RenderError::DeviceLost);
        }

        self.capabilities = capabilities::probe(&mut self.ctx, &self.settings)?;
        self.tables = EnumTables::new(self.capabilities.tier);
        self.bindings = BindingCache::new(self.capabilities.max_combined_textures);
        self.backbuffer = self.ctx.drawing_buffer_size();
        self.lost = false;
        self.in_pass = false;
        self.active.shader = None;
        self.apply_baseline_state();

        // A buffer that fails to upload stays without a handle; the rest still come back.
        let mut failed = 0;
        for (id, record) in self.vertex_buffers.iter_mut() {
            if let Err(err) = upload_vertex_buffer(&mut self.ctx, &self.tables, record) {
                log::error!("Vertex buffer {id:?} could not be rebuilt: {err}");
                failed += 1;
            }
        }
        // No vertex array exists yet in the new context, so index uploads are safe.
        for (id, record) in self.index_buffers.iter_mut() {
            if let Err(err) = upload_index_buffer(&mut self.ctx, &self.tables, record) {
                log::error!("Index buffer {id:?} could not be rebuilt: {err}");
                failed += 1;
            }
        }

        log::info!(
            "Graphics context restored (generation {}): {:?} tier, {failed} buffers not rebuilt.",
            self.generation,
            self.capabilities.tier
        );
        self.events.emit(DeviceEvent::Restored);
        Ok(())
    }

    /// Polls the native context and runs the loss or restore transition it implies.
    pub fn sync_context_state(&mut self) {
        match (self.ctx.is_context_lost(), self.lost) {
            (true, false) => self.lose_context(),
            (false, true) => {
                if let Err(err) = self.restore_context() {
                    log::error!("Failed to restore the graphics context: {err}");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall, ObjectKind};
    use strata_core::renderer::api::{
        BufferUsage, ShaderDefinition, TextureDescriptor, VertexDataType, VertexElement,
        VertexFormat, VertexSemantic,
    };

    fn lose(device: &mut GlDevice<HeadlessContext>) {
        device.context_mut().set_context_lost(true);
        device.sync_context_state();
    }

    fn restore(device: &mut GlDevice<HeadlessContext>) {
        device.context_mut().set_context_lost(false);
        device.sync_context_state();
    }

    #[test]
    fn loss_forgets_handles_without_deleting() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let texture = device.create_texture(TextureDescriptor::default()).unwrap();
        device.set_texture(texture, 0).unwrap();
        device.context_mut().clear_calls();

        lose(&mut device);
        assert!(device.is_lost());
        assert_eq!(device.generation(), 1);
        assert!(device.texture_native(texture).is_none());
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::DeleteTexture(_))),
            0
        );
        // Still usable as a no-op.
        device.destroy_texture(texture).unwrap();
    }

    #[test]
    fn restore_reuploads_buffers_and_baseline() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let format = VertexFormat::new(vec![VertexElement::new(
            VertexSemantic::Position,
            3,
            VertexDataType::Float32,
        )]);
        let buffer = device
            .create_vertex_buffer(format, BufferUsage::Static, &[0u8; 36])
            .unwrap();
        lose(&mut device);
        assert!(device.vertex_buffer_native(buffer).is_none());

        device.context_mut().clear_calls();
        restore(&mut device);
        assert!(!device.is_lost());
        assert!(device.vertex_buffer_native(buffer).is_some());
        assert_eq!(device.context().live_objects(ObjectKind::Buffer), 1);
        assert_eq!(
            device.context().count_of(&NativeCall::Enable(glow::DEPTH_TEST)),
            1
        );
    }

    #[test]
    fn restore_survives_a_failed_buffer_upload() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let events = device.subscribe();
        let format = VertexFormat::new(vec![VertexElement::new(
            VertexSemantic::Position,
            3,
            VertexDataType::Float32,
        )]);
        let buffers: Vec<_> = (0..3)
            .map(|_| {
                device
                    .create_vertex_buffer(format.clone(), BufferUsage::Static, &[0u8; 36])
                    .unwrap()
            })
            .collect();
        lose(&mut device);

        device.context_mut().set_buffer_budget(Some(2));
        restore(&mut device);

        assert!(!device.is_lost());
        let rebuilt = buffers
            .iter()
            .filter(|&&id| device.vertex_buffer_native(id).is_some())
            .count();
        assert_eq!(rebuilt, 2);
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(received, vec![DeviceEvent::Lost, DeviceEvent::Restored]);
    }

    #[test]
    fn failed_link_is_retried_after_restore() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let shader = device
            .create_shader(ShaderDefinition::new("broken", "#error\n", "void main() {}"))
            .unwrap();
        assert!(!device.set_shader(shader));
        lose(&mut device);
        restore(&mut device);
        assert!(!device.shader_failed(shader));
    }

    #[test]
    fn restore_while_still_lost_fails() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        lose(&mut device);
        assert_eq!(device.restore_context(), Err(RenderError::DeviceLost));
        assert!(device.is_lost());
    }
}
