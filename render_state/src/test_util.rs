//! Fixtures shared by the unit tests.

use std::rc::Rc;

use crate::{
    config::RenderStateConfig,
    device::{ProgramId, RecordingDevice, TextureId, UniformLocation},
    material::{LayeredMaterial, Material, Texture},
    shader::{ShaderId, ShaderLibrary, ShaderProgram, ShaderVariants, UniformLocations},
    style::SpecialEffect,
    RenderState,
};

pub(crate) type TestEngine = RenderState<RecordingDevice, ShaderLibrary>;

pub(crate) const FOG_ENABLED: UniformLocation = UniformLocation(0);
pub(crate) const TEXTURE_MODE: UniformLocation = UniformLocation(1);
pub(crate) const CAMERA_POS: UniformLocation = UniformLocation(2);
pub(crate) const LIGHT_PARMS: UniformLocation = UniformLocation(3);
pub(crate) const FOG_COLOR: UniformLocation = UniformLocation(4);
pub(crate) const GLOW_TOP_COLOR: UniformLocation = UniformLocation(5);
pub(crate) const GLOW_BOTTOM_COLOR: UniformLocation = UniformLocation(6);
pub(crate) const DLIGHT_COLOR: UniformLocation = UniformLocation(7);
pub(crate) const TIMER: UniformLocation = UniformLocation(8);

pub(crate) fn program_id(id: u32) -> ProgramId {
    ProgramId(100 + id)
}

/// A program exposing every managed uniform.
pub(crate) fn program(id: u32) -> ShaderProgram {
    ShaderProgram {
        id: ShaderId(id),
        program: program_id(id),
        uniforms: UniformLocations {
            fog_enabled: Some(FOG_ENABLED),
            texture_mode: Some(TEXTURE_MODE),
            camera_pos: Some(CAMERA_POS),
            light_parms: Some(LIGHT_PARMS),
            fog_color: Some(FOG_COLOR),
            glow_top_color: Some(GLOW_TOP_COLOR),
            glow_bottom_color: Some(GLOW_BOTTOM_COLOR),
            dlight_color: Some(DLIGHT_COLOR),
            timer: Some(TIMER),
        },
    }
}

/// Family 0 has every variant (ids 0 to 3, colormap 9), family 1 only its base
/// variant (10), the untextured family only its base variant (40). Only the sphere
/// map effect has a shader (20).
pub(crate) fn library() -> ShaderLibrary {
    let mut library = ShaderLibrary::new();
    library.set_container(
        0,
        ShaderVariants::new()
            .with_variant(false, false, program(0))
            .with_variant(true, false, program(1))
            .with_variant(false, true, program(2))
            .with_variant(true, true, program(3))
            .with_colormap_variant(program(9)),
    );
    library.set_container(1, ShaderVariants::new().with_variant(false, false, program(10)));
    library.set_container(4, ShaderVariants::new().with_variant(false, false, program(40)));
    library.set_effect(SpecialEffect::SphereMap, program(20));
    library
}

pub(crate) fn engine_with_config(config: RenderStateConfig) -> TestEngine {
    RenderState::new(RecordingDevice::new(), library(), config)
}

pub(crate) fn engine() -> TestEngine {
    engine_with_config(RenderStateConfig::default())
}

/// A single-layer material.
pub(crate) fn material(id: TextureId, render_target: bool) -> Rc<dyn Material> {
    let texture = Texture {
        id,
        render_target,
        ..Default::default()
    };
    Rc::new(LayeredMaterial::new(Rc::new(texture)))
}
