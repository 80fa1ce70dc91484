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

//! Per-frame device statistics.

/// Counters for the work the device submitted since the last `frame_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    /// A sequential counter for started frames.
    pub frame_number: u64,
    /// Native draw calls issued.
    pub draw_calls: u32,
    /// Primitives submitted, instances included.
    pub primitives: u64,
    /// Times the active program changed.
    pub shader_switches: u32,
    /// Vertex array (or direct attribute) bindings performed.
    pub vertex_array_binds: u32,
    /// Native texture binds performed.
    pub texture_binds: u32,
    /// Times the bound framebuffer changed.
    pub render_target_switches: u32,
    /// Native pipeline-state calls issued by the state cache.
    pub state_changes: u32,
}

impl DeviceStats {
    /// Clears the per-frame counters, keeping the frame number.
    pub fn reset_frame(&mut self) {
        *self = Self {
            frame_number: self.frame_number,
            ..Default::default()
        };
    }
}
