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

//! Uniform types, values, and the versioned scope shaders read them from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::resource::TextureId;

/// The data type of a shader uniform, as reflected from a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `ivec2`
    IVec2,
    /// `ivec3`
    IVec3,
    /// `ivec4`
    IVec4,
    /// `bvec2`
    BVec2,
    /// `bvec3`
    BVec3,
    /// `bvec4`
    BVec4,
    /// `mat2`
    Mat2,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Texture2D,
    /// `samplerCube`
    TextureCube,
    /// `sampler3D`
    Texture3D,
    /// `sampler2DShadow`
    Texture2DShadow,
    /// `samplerCubeShadow`
    TextureCubeShadow,
}

impl UniformType {
    /// Number of variants.
    pub const COUNT: usize = 20;

    /// Returns `true` for sampler types.
    pub fn is_sampler(&self) -> bool {
        matches!(
            self,
            UniformType::Texture2D
                | UniformType::TextureCube
                | UniformType::Texture3D
                | UniformType::Texture2DShadow
                | UniformType::TextureCubeShadow
        )
    }

    /// Number of scalar components per element.
    pub fn components(&self) -> u32 {
        match self {
            UniformType::Bool | UniformType::Int | UniformType::Float => 1,
            UniformType::Vec2 | UniformType::IVec2 | UniformType::BVec2 => 2,
            UniformType::Vec3 | UniformType::IVec3 | UniformType::BVec3 => 3,
            UniformType::Vec4 | UniformType::IVec4 | UniformType::BVec4 | UniformType::Mat2 => 4,
            UniformType::Mat3 => 9,
            UniformType::Mat4 => 16,
            _ => 1,
        }
    }
}

/// A value stored in the uniform scope.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i32),
    /// A float.
    Float(f32),
    /// Packed floats: vectors, matrices, and arrays of them.
    Floats(Vec<f32>),
    /// Packed integers: integer/boolean vectors and arrays of them.
    Ints(Vec<i32>),
    /// A single texture, for a scalar sampler.
    Texture(TextureId),
    /// Several textures, for a sampler array.
    Textures(Vec<TextureId>),
}

static NEXT_VERSION_ID: AtomicU64 = AtomicU64::new(1);

/// A change stamp: a process-unique id plus a revision bumped on every write.
///
/// Two versions are equal only if they come from the same scope entry and the entry
/// has not been written since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    /// Identifies the scope entry that produced the version. `0` means never set.
    pub global_id: u64,
    /// Number of writes to that entry.
    pub revision: u32,
}

impl Version {
    fn fresh() -> Self {
        Self {
            global_id: NEXT_VERSION_ID.fetch_add(1, Ordering::Relaxed),
            revision: 0,
        }
    }
}

/// An index into a [`UniformScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// A named slot of the uniform scope.
#[derive(Debug, Clone)]
pub struct ScopeEntry {
    /// The uniform name.
    pub name: String,
    /// The current value, if one was ever set.
    pub value: Option<UniformValue>,
    /// The current version.
    pub version: Version,
}

/// The name-to-value store shader inputs resolve against.
///
/// Entries are created on first lookup and never removed, so a [`ScopeId`] stays
/// valid for the lifetime of the scope.
#[derive(Debug, Default)]
pub struct UniformScope {
    entries: Vec<ScopeEntry>,
    by_name: HashMap<String, ScopeId>,
}

impl UniformScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the named entry, creating an empty entry if needed.
    pub fn resolve(&mut self, name: &str) -> ScopeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = ScopeId(self.entries.len());
        self.entries.push(ScopeEntry {
            name: name.to_string(),
            value: None,
            version: Version::fresh(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Sets the named entry, bumping its revision.
    pub fn set(&mut self, name: &str, value: UniformValue) -> ScopeId {
        let id = self.resolve(name);
        self.set_by_id(id, value);
        id
    }

    /// Sets an entry by id, bumping its revision.
    pub fn set_by_id(&mut self, id: ScopeId, value: UniformValue) {
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.value = Some(value);
            entry.version.revision = entry.version.revision.wrapping_add(1);
        }
    }

    /// Returns an entry by id.
    pub fn entry(&self, id: ScopeId) -> Option<&ScopeEntry> {
        self.entries.get(id.0)
    }

    /// Returns the current value of the named entry.
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.by_name
            .get(name)
            .and_then(|id| self.entries[id.0].value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_bumps_revision() {
        let mut scope = UniformScope::new();
        let id = scope.resolve("uTime");
        let before = scope.entry(id).unwrap().version;
        scope.set("uTime", UniformValue::Float(1.0));
        let after = scope.entry(id).unwrap().version;
        assert_eq!(before.global_id, after.global_id);
        assert_eq!(after.revision, before.revision + 1);
        assert_eq!(scope.get("uTime"), Some(&UniformValue::Float(1.0)));
    }

    #[test]
    fn entries_have_distinct_global_ids() {
        let mut scope = UniformScope::new();
        let a = scope.resolve("a");
        let b = scope.resolve("b");
        assert_ne!(
            scope.entry(a).unwrap().version,
            scope.entry(b).unwrap().version
        );
        assert_eq!(scope.resolve("a"), a);
    }

    #[test]
    fn sampler_types() {
        assert!(UniformType::TextureCube.is_sampler());
        assert!(!UniformType::Mat4.is_sampler());
        assert_eq!(UniformType::Mat3.components(), 9);
    }
}
