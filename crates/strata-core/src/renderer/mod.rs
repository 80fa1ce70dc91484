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

//! Provides the public, backend-agnostic rendering contracts for Strata.
//!
//! This module defines the "common language" shared by the device layer and the
//! engine above it: symbolic enums, the shadow [`PipelineState`], resource
//! descriptors and the [`NativeContext`] trait.
//!
//! The 'what' lives here; the 'how' (the state cache, the binding manager, the
//! draw/pass orchestrator and the concrete native contexts) is implemented in
//! `strata-infra`.

pub mod api;
pub mod error;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{RenderError, ResourceError, ShaderError};
pub use self::traits::{GpuResource, NativeContext};
