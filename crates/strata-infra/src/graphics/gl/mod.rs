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

//! The GL-class device: one implementation of the render-state cache and command
//! submission engine, driving any [`NativeContext`](strata_core::renderer::traits::NativeContext).
//!
//! The device is split across files by concern, all contributing `impl` blocks to
//! [`GlDevice`]:
//!
//! - `device`: construction, accessors, resource lifetime.
//! - `state`: the pipeline-state setters.
//! - `bindings`: textures, vertex arrays, shaders.
//! - `uniforms`: per-type uniform commits.
//! - `draw`: draws, clears, passes, copies, read-back.
//! - `recovery`: context loss and restore.

pub mod capabilities;
pub mod conversions;

mod bindings;
mod device;
mod draw;
mod recovery;
mod resources;
mod state;
mod uniforms;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub mod glow_backend;

pub use conversions::{
    EnumTables, IntoGl, PixelTokens, HALF_FLOAT_OES, MAX_TEXTURE_MAX_ANISOTROPY_EXT,
    TEXTURE_MAX_ANISOTROPY_EXT,
};
pub use device::GlDevice;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub use glow_backend::GlowContext;
