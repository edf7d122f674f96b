//! Shader selection inputs and the per-shader uniform caches.
//!
//! Programs are compiled and linked elsewhere. The engine asks a [ShaderManager] for
//! the program that matches the current state and then keeps, per program, the last
//! value it uploaded to each uniform so that unchanged uniforms are never re-sent.

use std::collections::HashMap;

use crate::{
    device::{ProgramId, UniformLocation},
    style::{Rgba8, SpecialEffect},
    tracked::StateVec3,
};

/// Effect state used for untextured draws.
pub const NO_TEXTURE_EFFECT_STATE: i32 = 4;

/// Light mode in which the dynamic light color is uploaded as a uniform.
pub const DLIGHT_UNIFORM_LIGHT_MODE: i32 = 8;

/// Identifies one compiled shader variant. Uniform caches are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Locations of the uniforms the engine manages. A variant that was compiled without
/// a uniform has `None` for it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UniformLocations {
    pub fog_enabled: Option<UniformLocation>,
    pub texture_mode: Option<UniformLocation>,
    pub camera_pos: Option<UniformLocation>,
    pub light_parms: Option<UniformLocation>,
    pub fog_color: Option<UniformLocation>,
    pub glow_top_color: Option<UniformLocation>,
    pub glow_bottom_color: Option<UniformLocation>,
    pub dlight_color: Option<UniformLocation>,
    pub timer: Option<UniformLocation>,
}

/// A linked shader variant.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderProgram {
    pub id: ShaderId,
    pub program: ProgramId,
    pub uniforms: UniformLocations,
}

/// The state dimensions a [ShaderContainer] picks a variant by.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VariantKey {
    pub colormap: i32,
    pub glow: bool,
    pub timer: f32,
    pub light: bool,
}

/// A family of variants of one shader.
pub trait ShaderContainer {
    /// Picks the variant for `key`, if this family has one.
    fn resolve(&self, key: &VariantKey) -> Option<&ShaderProgram>;
}

/// Source of shader programs.
pub trait ShaderManager {
    #[allow(missing_docs)]
    type Container: ShaderContainer;

    /// The variant family for an effect state index.
    fn container(&self, effect_state: i32) -> Option<&Self::Container>;

    /// The fixed shader for a special effect.
    fn effect(&self, effect: SpecialEffect) -> Option<&ShaderProgram>;
}

/// Table-backed [ShaderContainer].
///
/// Normal variants are indexed by `glow + 2 * light`. Any special colormap selects the
/// colormap variant. The timer is not a selection dimension here; warp shaders read it
/// from their timer uniform.
#[derive(Debug, Clone, Default)]
pub struct ShaderVariants {
    base: [Option<ShaderProgram>; 4],
    colormap: Option<ShaderProgram>,
}

impl ShaderVariants {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(missing_docs)]
    pub fn with_variant(mut self, glow: bool, light: bool, program: ShaderProgram) -> Self {
        self.base[variant_index(glow, light)] = Some(program);
        self
    }

    #[allow(missing_docs)]
    pub fn with_colormap_variant(mut self, program: ShaderProgram) -> Self {
        self.colormap = Some(program);
        self
    }
}

fn variant_index(glow: bool, light: bool) -> usize {
    glow as usize + 2 * light as usize
}

impl ShaderContainer for ShaderVariants {
    fn resolve(&self, key: &VariantKey) -> Option<&ShaderProgram> {
        if key.colormap > 0 {
            self.colormap.as_ref()
        } else {
            self.base[variant_index(key.glow, key.light)].as_ref()
        }
    }
}

/// Table-backed [ShaderManager].
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    containers: Vec<Option<ShaderVariants>>,
    effects: HashMap<SpecialEffect, ShaderProgram>,
}

impl ShaderLibrary {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the variant family used for `effect_state`.
    pub fn set_container(&mut self, effect_state: usize, variants: ShaderVariants) {
        if self.containers.len() <= effect_state {
            self.containers.resize(effect_state + 1, None);
        }
        self.containers[effect_state] = Some(variants);
    }

    #[allow(missing_docs)]
    pub fn set_effect(&mut self, effect: SpecialEffect, program: ShaderProgram) {
        self.effects.insert(effect, program);
    }
}

impl ShaderManager for ShaderLibrary {
    type Container = ShaderVariants;

    fn container(&self, effect_state: i32) -> Option<&ShaderVariants> {
        let index = usize::try_from(effect_state).ok()?;
        self.containers.get(index)?.as_ref()
    }

    fn effect(&self, effect: SpecialEffect) -> Option<&ShaderProgram> {
        self.effects.get(&effect)
    }
}

/// The values last uploaded to one program's managed uniforms.
///
/// `None` means nothing has been uploaded yet, so the first use always uploads.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniformCache {
    pub(crate) fog_enabled: Option<i32>,
    pub(crate) texture_mode: Option<i32>,
    pub(crate) camera_pos: StateVec3,
    pub(crate) fog_color: Option<Rgba8>,
    /// Bit pattern of the timer, so a NaN timer still compares equal to itself.
    pub(crate) timer: Option<u32>,
}

/// Uniform caches for every program the engine has used.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniformCaches {
    caches: HashMap<ShaderId, UniformCache>,
}

impl UniformCaches {
    pub(crate) fn get_mut(&mut self, id: ShaderId) -> &mut UniformCache {
        self.caches.entry(id).or_default()
    }
}
