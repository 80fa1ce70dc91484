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

/// The loss/re-acquire contract of a GPU-backed resource.
///
/// A resource owns its native handles. On context loss it forgets them without
/// deleting anything (the objects died with the context) and keeps its engine-level
/// description, so the next use can rebuild them against the new context.
pub trait GpuResource {
    /// Forgets every native handle owned by the resource.
    fn lose_context(&mut self);

    /// Returns `true` while the resource holds live native handles.
    fn has_native_handle(&self) -> bool;
}
