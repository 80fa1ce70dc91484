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

//! Options the device is created with.

use serde::{Deserialize, Serialize};

/// Options requested when the device and its context are created.
///
/// These are the externally forced options that survive a context loss: the restore
/// path re-applies them instead of re-reading anything from the lost context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Request a multisampled backbuffer.
    pub antialias: bool,
    /// Request an alpha channel in the backbuffer.
    pub alpha: bool,
    /// Request a depth buffer in the backbuffer.
    pub depth: bool,
    /// Request a stencil buffer in the backbuffer.
    pub stencil: bool,
    /// Keep the backbuffer contents after presentation.
    pub preserve_drawing_buffer: bool,
    /// Use the modern tier when the context offers it.
    pub prefer_modern_tier: bool,
    /// Caps the number of texture units the binding table tracks.
    pub max_texture_units_override: Option<u32>,
    /// Run the high-precision float self-test on first access instead of assuming `false`.
    pub probe_high_precision: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
            depth: true,
            stencil: true,
            preserve_drawing_buffer: false,
            prefer_modern_tier: true,
            max_texture_units_override: None,
            probe_high_precision: true,
        }
    }
}

impl DeviceSettings {
    /// Parses settings from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = DeviceSettings::from_json(r#"{ "antialias": false }"#).unwrap();
        assert!(!settings.antialias);
        assert!(settings.stencil);
        assert!(settings.prefer_modern_tier);
        assert_eq!(settings.max_texture_units_override, None);
    }

    #[test]
    fn json_round_trip() {
        let settings = DeviceSettings {
            max_texture_units_override: Some(8),
            ..Default::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(DeviceSettings::from_json(&json).unwrap(), settings);
    }
}
