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

//! Vertex formats: which attributes a vertex buffer holds and how they are laid out.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The meaning of a vertex attribute.
///
/// Each semantic maps to a fixed shader attribute location (see
/// [`VertexSemantic::location`]), so any vertex buffer can feed any shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Vertex position.
    Position,
    /// Vertex normal.
    Normal,
    /// Tangent with handedness in `w`.
    Tangent,
    /// Skinning weights.
    BlendWeight,
    /// Skinning bone indices.
    BlendIndices,
    /// Vertex color.
    Color,
    /// Texture coordinate set `0..=7`.
    TexCoord(u8),
    /// Generic attribute `0..=15`, aliasing the fixed locations.
    Attr(u8),
}

impl VertexSemantic {
    /// The shader attribute location this semantic is bound to.
    pub fn location(&self) -> u32 {
        match self {
            VertexSemantic::Position => 0,
            VertexSemantic::Normal => 1,
            VertexSemantic::BlendWeight => 2,
            VertexSemantic::BlendIndices => 3,
            VertexSemantic::Color => 4,
            VertexSemantic::TexCoord(set) => 5 + u32::from((*set).min(7)),
            VertexSemantic::Tangent => 13,
            VertexSemantic::Attr(index) => u32::from((*index).min(15)),
        }
    }
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexDataType {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// 32-bit float.
    #[default]
    Float32,
    /// 16-bit float.
    Float16,
}

impl VertexDataType {
    /// Number of variants.
    pub const COUNT: usize = 8;

    /// The size in bytes of one component.
    pub fn size(&self) -> u32 {
        match self {
            VertexDataType::Int8 | VertexDataType::Uint8 => 1,
            VertexDataType::Int16 | VertexDataType::Uint16 | VertexDataType::Float16 => 2,
            VertexDataType::Int32 | VertexDataType::Uint32 | VertexDataType::Float32 => 4,
        }
    }
}

/// A single attribute within an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// What the attribute means.
    pub semantic: VertexSemantic,
    /// Number of components (1 to 4).
    pub components: u32,
    /// Component type.
    pub data_type: VertexDataType,
    /// Whether integer data is normalized to `[0, 1]` / `[-1, 1]`.
    pub normalize: bool,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

impl VertexElement {
    /// Creates an element; the offset is assigned by [`VertexFormat::new`].
    pub fn new(semantic: VertexSemantic, components: u32, data_type: VertexDataType) -> Self {
        Self {
            semantic,
            components,
            data_type,
            normalize: false,
            offset: 0,
        }
    }

    /// Marks the element as normalized.
    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    /// Size in bytes of the element.
    pub fn size(&self) -> u32 {
        self.components * self.data_type.size()
    }
}

/// The interleaved layout of the vertices in a vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    stride: u32,
    instancing: bool,
    signature: u64,
}

impl VertexFormat {
    /// Creates an interleaved format, packing elements in order with 4-byte alignment.
    pub fn new(elements: Vec<VertexElement>) -> Self {
        let mut offset = 0;
        let elements: Vec<VertexElement> = elements
            .into_iter()
            .map(|mut element| {
                element.offset = offset;
                offset += (element.size() + 3) & !3;
                element
            })
            .collect();
        Self::from_parts(elements, offset, false)
    }

    /// Creates a format whose attributes advance once per instance instead of per vertex.
    pub fn instanced(elements: Vec<VertexElement>) -> Self {
        let format = Self::new(elements);
        Self::from_parts(format.elements, format.stride, true)
    }

    fn from_parts(elements: Vec<VertexElement>, stride: u32, instancing: bool) -> Self {
        let mut hasher = DefaultHasher::new();
        elements.hash(&mut hasher);
        stride.hash(&mut hasher);
        instancing.hash(&mut hasher);
        Self {
            elements,
            stride,
            instancing,
            signature: hasher.finish(),
        }
    }

    /// The attributes of the format.
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Byte distance between consecutive vertices.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Whether attributes advance per instance.
    pub fn instancing(&self) -> bool {
        self.instancing
    }

    /// A content-derived signature of the attribute layout.
    ///
    /// Two formats with the same elements, stride and step mode share a signature.
    pub fn signature(&self) -> u64 {
        self.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_uv() -> Vec<VertexElement> {
        vec![
            VertexElement::new(VertexSemantic::Position, 3, VertexDataType::Float32),
            VertexElement::new(VertexSemantic::TexCoord(0), 2, VertexDataType::Float32),
        ]
    }

    #[test]
    fn offsets_and_stride() {
        let format = VertexFormat::new(position_uv());
        assert_eq!(format.elements()[0].offset, 0);
        assert_eq!(format.elements()[1].offset, 12);
        assert_eq!(format.stride(), 20);
    }

    #[test]
    fn packed_bytes_are_aligned() {
        let format = VertexFormat::new(vec![
            VertexElement::new(VertexSemantic::Color, 3, VertexDataType::Uint8).normalized(),
            VertexElement::new(VertexSemantic::Position, 3, VertexDataType::Float32),
        ]);
        assert_eq!(format.elements()[1].offset, 4);
        assert_eq!(format.stride(), 16);
    }

    #[test]
    fn signatures_follow_content() {
        let a = VertexFormat::new(position_uv());
        let b = VertexFormat::new(position_uv());
        let instanced = VertexFormat::instanced(position_uv());
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), instanced.signature());
    }

    #[test]
    fn semantic_locations() {
        assert_eq!(VertexSemantic::Position.location(), 0);
        assert_eq!(VertexSemantic::TexCoord(1).location(), 6);
        assert_eq!(VertexSemantic::TexCoord(7).location(), 12);
        assert_eq!(VertexSemantic::Attr(15).location(), 15);
    }
}
