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

//! Opaque native object handles handed out by a [`NativeContext`].
//!
//! Handles are only meaningful for the context generation that created them. After
//! a context loss every handle is forgotten; none is ever deleted against the new
//! context.
//!
//! [`NativeContext`]: crate::renderer::traits::NativeContext

use std::num::NonZeroU32;

macro_rules! native_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// Returns the raw handle value.
            pub fn get(&self) -> u32 {
                self.0.get()
            }
        }
    };
}

native_handle!(
    /// A native texture object.
    NativeTexture
);
native_handle!(
    /// A native buffer object.
    NativeBuffer
);
native_handle!(
    /// A native vertex array (attribute layout) object.
    NativeVertexArray
);
native_handle!(
    /// A native framebuffer object.
    NativeFramebuffer
);
native_handle!(
    /// A native renderbuffer object.
    NativeRenderbuffer
);
native_handle!(
    /// A native linked program object.
    NativeProgram
);

/// The location of a uniform within a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeUniformLocation(pub u32);

/// A uniform reported active by the native linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// The uniform name, without any `[0]` array suffix.
    pub name: String,
    /// The native type token of the uniform.
    pub native_type: u32,
    /// Number of array elements (1 for non-arrays).
    pub array_size: u32,
    /// The uniform location.
    pub location: NativeUniformLocation,
}

/// The result of a successful native compile and link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProgram {
    /// The program object.
    pub program: NativeProgram,
    /// Every active uniform, samplers included.
    pub uniforms: Vec<ActiveUniform>,
}
