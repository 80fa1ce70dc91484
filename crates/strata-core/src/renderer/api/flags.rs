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

//! Small bitflag sets used by clear and pass operations.

use std::ops::{BitOr, BitOrAssign};

/// Flags selecting which buffers of the current render target are cleared.
///
/// Multiple buffers can be combined using bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClearFlags {
    bits: u32,
}

impl ClearFlags {
    /// Nothing is cleared.
    pub const NONE: Self = Self { bits: 0 };
    /// The color buffer.
    pub const COLOR: Self = Self { bits: 1 << 0 };
    /// The depth buffer.
    pub const DEPTH: Self = Self { bits: 1 << 1 };
    /// The stencil buffer.
    pub const STENCIL: Self = Self { bits: 1 << 2 };
    /// Every buffer.
    pub const ALL: Self = Self {
        bits: Self::COLOR.bits | Self::DEPTH.bits | Self::STENCIL.bits,
    };

    /// Creates a new set of clear flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if every flag of `other` is set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl BitOr for ClearFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for ClearFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_contains() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(flags.contains(ClearFlags::DEPTH));
        assert!(!flags.contains(ClearFlags::STENCIL));
        assert!(!flags.contains(ClearFlags::ALL));
        assert!(ClearFlags::ALL.contains(flags));
    }

    #[test]
    fn empty_flags() {
        assert!(ClearFlags::NONE.is_empty());
        assert!(ClearFlags::default().is_empty());
        let mut flags = ClearFlags::NONE;
        flags |= ClearFlags::STENCIL;
        assert_eq!(flags.bits(), 4);
    }
}
