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

//! Resource identifiers and descriptors.
//!
//! The engine refers to GPU-backed resources through typed ids. Ids are unique across
//! all devices in the process, so an id handed out by one device is never resolved by
//! another.

use std::sync::atomic::{AtomicU64, Ordering};

use super::enums::{
    AddressMode, CompareFunction, FilterMode, IndexFormat, PixelFormat, PrimitiveTopology,
    TextureTarget,
};
use super::vertex::VertexSemantic;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! resource_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocates a new process-unique id.
            pub fn next() -> Self {
                Self(next_resource_id())
            }
        }
    };
}

resource_id!(
    /// Identifies a texture.
    TextureId
);
resource_id!(
    /// Identifies a vertex buffer.
    VertexBufferId
);
resource_id!(
    /// Identifies an index buffer.
    IndexBufferId
);
resource_id!(
    /// Identifies a shader.
    ShaderId
);
resource_id!(
    /// Identifies a render target.
    RenderTargetId
);

/// Sampling parameters of a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSampling {
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter. Mipmap variants are treated as their base filter.
    pub mag_filter: FilterMode,
    /// Address mode along U.
    pub address_u: AddressMode,
    /// Address mode along V.
    pub address_v: AddressMode,
    /// Address mode along W (3D textures).
    pub address_w: AddressMode,
    /// Requested anisotropy, clamped to the device maximum.
    pub anisotropy: f32,
    /// Depth comparison on read, for shadow samplers. Modern tier only.
    pub compare: Option<CompareFunction>,
}

impl Default for TextureSampling {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            anisotropy: 1.0,
            compare: None,
        }
    }
}

/// Describes a texture to create.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Debug name.
    pub name: String,
    /// Target kind.
    pub target: TextureTarget,
    /// Pixel format.
    pub format: PixelFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels (3D textures), otherwise 1.
    pub depth: u32,
    /// Whether a mip chain is generated.
    pub mipmaps: bool,
    /// Sampling parameters.
    pub sampling: TextureSampling,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            name: String::from("Untitled"),
            target: TextureTarget::D2,
            format: PixelFormat::Rgba8,
            width: 4,
            height: 4,
            depth: 1,
            mipmaps: true,
            sampling: TextureSampling::default(),
        }
    }
}

impl TextureDescriptor {
    /// Returns `true` if both dimensions are powers of two.
    pub fn is_pot(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }
}

/// Describes a render target: which textures it draws into and what it allocates itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetDescriptor {
    /// Debug name.
    pub name: String,
    /// Color texture, if any.
    pub color_buffer: Option<TextureId>,
    /// Depth (or depth/stencil) texture, if any. Takes precedence over `depth`.
    pub depth_buffer: Option<TextureId>,
    /// Allocate a depth renderbuffer when no depth texture is given.
    pub depth: bool,
    /// Allocate stencil alongside depth.
    pub stencil: bool,
    /// Multisample count. Values above 1 need the modern tier.
    pub samples: u32,
    /// Extent used when the target has no color buffer to take it from.
    pub width: u32,
    /// Extent used when the target has no color buffer to take it from.
    pub height: u32,
}

impl Default for RenderTargetDescriptor {
    fn default() -> Self {
        Self {
            name: String::from("Untitled"),
            color_buffer: None,
            depth_buffer: None,
            depth: true,
            stencil: false,
            samples: 1,
            width: 1,
            height: 1,
        }
    }
}

/// Source code of a shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDefinition {
    /// Debug name.
    pub name: String,
    /// Vertex stage source.
    pub vertex_source: String,
    /// Fragment stage source.
    pub fragment_source: String,
    /// Vertex attribute names and the semantic each one is bound to.
    pub attributes: Vec<(String, VertexSemantic)>,
    /// Transform-feedback varyings to capture, if any.
    pub feedback_varyings: Vec<String>,
}

impl ShaderDefinition {
    /// Creates a definition with the position attribute bound to `vertex_position`.
    pub fn new(name: &str, vertex_source: &str, fragment_source: &str) -> Self {
        Self {
            name: name.to_string(),
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
            attributes: vec![("vertex_position".to_string(), VertexSemantic::Position)],
            feedback_varyings: Vec::new(),
        }
    }

    /// Adds an attribute binding.
    pub fn with_attribute(mut self, name: &str, semantic: VertexSemantic) -> Self {
        self.attributes.push((name.to_string(), semantic));
        self
    }
}

/// A range of vertices or indices to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    /// How vertices are assembled.
    pub topology: PrimitiveTopology,
    /// First vertex, or first index when `indexed`.
    pub base: u32,
    /// Number of vertices or indices.
    pub count: u32,
    /// Draw through the bound index buffer.
    pub indexed: bool,
}

impl Primitive {
    /// A non-indexed draw of `count` vertices starting at `base`.
    pub fn vertices(topology: PrimitiveTopology, base: u32, count: u32) -> Self {
        Self {
            topology,
            base,
            count,
            indexed: false,
        }
    }

    /// An indexed draw of `count` indices starting at index `base`.
    pub fn indices(topology: PrimitiveTopology, base: u32, count: u32) -> Self {
        Self {
            topology,
            base,
            count,
            indexed: true,
        }
    }
}

/// Layout of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLayout {
    /// Index type.
    pub format: IndexFormat,
    /// Number of indices.
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TextureId::next();
        let b = TextureId::next();
        let c = VertexBufferId::next();
        assert_ne!(a, b);
        assert_ne!(a.0, c.0);
        assert_ne!(b.0, c.0);
    }

    #[test]
    fn pot_detection() {
        let mut desc = TextureDescriptor::default();
        assert!(desc.is_pot());
        desc.width = 3;
        assert!(!desc.is_pot());
    }
}
