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

//! # Strata Infra
//!
//! Concrete implementations of the contracts defined in `strata-core`: the GL-class
//! [`GlDevice`](graphics::gl::GlDevice) with its render-state cache, binding manager,
//! pass orchestrator and context-loss recovery, the [`HeadlessContext`] used for
//! tests and CI, and (behind the `native` feature) a native context on top of `glow`.
//!
//! [`HeadlessContext`]: graphics::headless::HeadlessContext

#![warn(missing_docs)]

pub mod graphics;
pub mod logging;

pub use graphics::gl::GlDevice;
pub use graphics::headless::HeadlessContext;
pub use logging::{init_logging, LoggingConfig};
