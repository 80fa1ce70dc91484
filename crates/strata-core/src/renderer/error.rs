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

//! Defines the hierarchy of error types for the device layer.

use crate::renderer::api::resource::ShaderId;
use std::fmt;

/// An error related to linking or activating a shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// The native compiler or linker rejected the program.
    LinkFailed {
        /// The debug name of the shader.
        name: String,
        /// The info log reported by the native context.
        log: String,
    },
    /// The shader already failed to link in the current context generation.
    PreviouslyFailed {
        /// The ID of the failed shader.
        id: ShaderId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LinkFailed { name, log } => {
                write!(f, "Shader link failed for '{name}': {log}")
            }
            ShaderError::PreviouslyFailed { id } => {
                write!(f, "Shader {id:?} failed to link earlier in this context")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU-backed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// The ID is unknown to this device: never created here, or already destroyed.
    NotFound,
    /// The native handle behind a resource is missing.
    InvalidHandle,
    /// The descriptor or data passed in is inconsistent with the resource.
    InvalidDescriptor(String),
    /// An error originating from the native context.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid native resource handle."),
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid resource descriptor: {msg}")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error raised by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No usable baseline context could be obtained. Not recoverable.
    InitializationFailed(String),
    /// The caller violated a precondition; the operation was aborted.
    InvalidOperation(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The native context is lost; the call was absorbed.
    DeviceLost,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics device: {msg}")
            }
            RenderError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::DeviceLost => write!(f, "The graphics context is lost."),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(ResourceError::Shader(err))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::LinkFailed {
            name: "Copy".to_string(),
            log: "undeclared identifier".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader link failed for 'Copy': undeclared identifier"
        );
    }

    #[test]
    fn render_error_chains_to_shader_error() {
        let render_err: RenderError = ShaderError::PreviouslyFailed { id: ShaderId(7) }.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Shader resource error: Shader ShaderId(7) failed to link earlier in this context"
        );
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }

    #[test]
    fn invalid_operation_has_no_source() {
        let err = RenderError::InvalidOperation("nested pass".to_string());
        assert_eq!(format!("{err}"), "Invalid operation: nested pass");
        assert!(err.source().is_none());
    }
}
