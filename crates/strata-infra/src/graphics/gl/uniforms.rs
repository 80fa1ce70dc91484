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

//! Committing shader inputs from the uniform scope.

use strata_core::renderer::api::{UniformType, UniformValue};
use strata_core::renderer::traits::NativeContext;

use super::device::GlDevice;
use super::resources::{CommittedScalar, SamplerInput, UniformInput};

/// Issues the native call for one uniform. Returns `false` if the value does not fit
/// the uniform's type.
fn commit_uniform<C: NativeContext>(
    ctx: &mut C,
    input: &mut UniformInput,
    value: &UniformValue,
) -> bool {
    let location = input.location;
    let components = input.ty.components();
    let scalar = match (input.ty, value) {
        (UniformType::Bool, UniformValue::Bool(value)) => Some(CommittedScalar::Int(*value as i32)),
        (UniformType::Bool | UniformType::Int, UniformValue::Int(value)) => {
            Some(CommittedScalar::Int(*value))
        }
        (UniformType::Float, UniformValue::Float(value)) => Some(CommittedScalar::Float(*value)),
        _ => None,
    };

    if let Some(scalar) = scalar {
        if input.scalar == Some(scalar) {
            return true;
        }
        match scalar {
            CommittedScalar::Int(value) => ctx.uniform_i32(location, 1, &[value]),
            CommittedScalar::Float(value) => ctx.uniform_f32(location, 1, &[value]),
        }
        input.scalar = Some(scalar);
        return true;
    }

    // Vectors, matrices and arrays: no value comparison, the version check suffices.
    // Values past the declared array length are dropped.
    let whole = |len: usize| len >= components as usize && len % components as usize == 0;
    let declared = components as usize * input.array_size.max(1) as usize;
    let fit = |len: usize| len.min(declared);
    match (input.ty, value) {
        (
            UniformType::Float | UniformType::Vec2 | UniformType::Vec3 | UniformType::Vec4,
            UniformValue::Floats(values),
        ) if whole(values.len()) => {
            ctx.uniform_f32(location, components, &values[..fit(values.len())])
        }
        (
            UniformType::Int
            | UniformType::Bool
            | UniformType::IVec2
            | UniformType::IVec3
            | UniformType::IVec4
            | UniformType::BVec2
            | UniformType::BVec3
            | UniformType::BVec4,
            UniformValue::Ints(values),
        ) if whole(values.len()) => {
            ctx.uniform_i32(location, components, &values[..fit(values.len())])
        }
        (UniformType::Mat2, UniformValue::Floats(values)) if whole(values.len()) => {
            ctx.uniform_matrix_f32(location, 2, &values[..fit(values.len())])
        }
        (UniformType::Mat3, UniformValue::Floats(values)) if whole(values.len()) => {
            ctx.uniform_matrix_f32(location, 3, &values[..fit(values.len())])
        }
        (UniformType::Mat4, UniformValue::Floats(values)) if whole(values.len()) => {
            ctx.uniform_matrix_f32(location, 4, &values[..fit(values.len())])
        }
        _ => return false,
    }
    input.scalar = None;
    true
}

impl<C: NativeContext> GlDevice<C> {
    /// Commits every uniform whose scope entry changed since it was last committed.
    pub(crate) fn commit_uniforms(&mut self, inputs: &mut [UniformInput]) {
        for input in inputs {
            let Some(entry) = self.scope.entry(input.scope_id) else {
                continue;
            };
            if entry.version == input.version {
                continue;
            }
            input.version = entry.version;
            let Some(value) = &entry.value else {
                continue;
            };
            if !commit_uniform(&mut self.ctx, input, value) {
                log::warn!(
                    "Uniform '{}' is declared {:?} but the scope holds {value:?}; not committed.",
                    input.name,
                    input.ty
                );
            }
        }
    }

    /// Binds the textures of every sampler to successive units and commits the unit
    /// numbers when they changed.
    pub(crate) fn commit_samplers(&mut self, samplers: &mut [SamplerInput]) {
        let feedback_texture = self
            .active
            .render_target
            .and_then(|id| self.render_targets.get(&id))
            .and_then(|record| record.desc.color_buffer);
        let max_units = self.bindings.texture_units.len() as u32;
        let mut unit = 0u32;

        for sampler in samplers {
            let textures = match self.scope.entry(sampler.scope_id).and_then(|e| e.value.as_ref()) {
                Some(UniformValue::Texture(id)) => vec![*id],
                Some(UniformValue::Textures(ids)) => ids.clone(),
                Some(other) => {
                    log::warn!(
                        "Sampler '{}' expects textures but the scope holds {other:?}.",
                        sampler.name
                    );
                    continue;
                }
                None => continue,
            };

            let mut units = Vec::with_capacity(textures.len());
            for texture in textures {
                if unit >= max_units {
                    log::error!(
                        "Sampler '{}' needs more than the {max_units} available texture units.",
                        sampler.name
                    );
                    break;
                }
                if Some(texture) == feedback_texture {
                    log::error!(
                        "Texture {texture:?} is bound to sampler '{}' while being rendered to; skipped.",
                        sampler.name
                    );
                } else if let Err(err) = self.set_texture(texture, unit) {
                    log::warn!("Sampler '{}': {err}", sampler.name);
                }
                units.push(unit as i32);
                unit += 1;
            }

            if !units.is_empty() && sampler.units != units {
                self.ctx.uniform_i32(sampler.location, 1, &units);
                sampler.units = units;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessContext, NativeCall};
    use strata_core::renderer::api::{
        NativeUniformLocation, ScopeId, ShaderDefinition, TextureDescriptor, Version,
    };

    fn input(ty: UniformType) -> UniformInput {
        UniformInput {
            name: "u".to_string(),
            scope_id: ScopeId(0),
            ty,
            array_size: 1,
            location: NativeUniformLocation(0),
            version: Version::default(),
            scalar: None,
        }
    }

    #[test]
    fn equal_scalars_are_not_reissued() {
        let mut ctx = HeadlessContext::modern();
        let mut input = input(UniformType::Float);
        assert!(commit_uniform(&mut ctx, &mut input, &UniformValue::Float(0.5)));
        assert!(commit_uniform(&mut ctx, &mut input, &UniformValue::Float(0.5)));
        assert_eq!(
            ctx.count(|call| matches!(call, NativeCall::UniformF32 { .. })),
            1
        );
    }

    #[test]
    fn matrices_always_reissue() {
        let mut ctx = HeadlessContext::modern();
        let mut input = input(UniformType::Mat4);
        let identity = UniformValue::Floats(vec![0.0; 16]);
        assert!(commit_uniform(&mut ctx, &mut input, &identity));
        assert!(commit_uniform(&mut ctx, &mut input, &identity));
        assert_eq!(
            ctx.count(|call| matches!(call, NativeCall::UniformMatrix { dimension: 4, .. })),
            2
        );
    }

    #[test]
    fn arrays_are_cut_to_the_declared_length() {
        let mut ctx = HeadlessContext::modern();
        let mut input = UniformInput {
            array_size: 2,
            ..input(UniformType::Vec2)
        };
        let values = UniformValue::Floats(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(commit_uniform(&mut ctx, &mut input, &values));
        assert_eq!(
            ctx.count(|call| matches!(
                call,
                NativeCall::UniformF32 { components: 2, values, .. } if values.len() == 4
            )),
            1
        );
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut ctx = HeadlessContext::modern();
        let mut input = input(UniformType::Vec3);
        assert!(!commit_uniform(&mut ctx, &mut input, &UniformValue::Floats(vec![1.0; 2])));
        assert!(!commit_uniform(&mut ctx, &mut input, &UniformValue::Int(1)));
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn sampler_units_commit_once() {
        let mut device = GlDevice::new(HeadlessContext::modern()).unwrap();
        let shader = device
            .create_shader(ShaderDefinition::new(
                "textured",
                "void main() {}",
                "uniform sampler2D diffuse;\nuniform sampler2D normal;\nvoid main() {}",
            ))
            .unwrap();
        let a = device.create_texture(TextureDescriptor::default()).unwrap();
        let b = device.create_texture(TextureDescriptor::default()).unwrap();
        device.set_uniform("diffuse", UniformValue::Texture(a));
        device.set_uniform("normal", UniformValue::Texture(b));
        assert!(device.set_shader(shader));

        let mut samplers = std::mem::take(&mut device.shaders.get_mut(&shader).unwrap().samplers);
        device.commit_samplers(&mut samplers);
        device.commit_samplers(&mut samplers);

        assert_eq!(samplers[0].units, vec![0]);
        assert_eq!(samplers[1].units, vec![1]);
        assert_eq!(
            device
                .context()
                .count(|call| matches!(call, NativeCall::UniformI32 { .. })),
            2
        );
        assert!(device.texture_native(b).is_some());
    }
}
