//! The render state engine.
//!
//! Drawing code writes a [RequestedState] through the mutators on [RenderState]. Before
//! each draw, [RenderState::apply] compares it against a mirror of what the device was
//! last told and issues only the calls needed to bring the device up to date. The
//! device is never queried, so the mirror must only ever be written by this module.
//!
//! State that changes rarely (depth clamp, stencil, culling, clears, scissor, ...) is
//! not buffered and goes straight to the device, see the setters in `fixed`.

use std::{mem, rc::Rc};

use bitflags::bitflags;
use derivative::Derivative;

use crate::{
    buffers::{BufferBinding, BufferMirror},
    config::RenderStateConfig,
    device::{BufferId, ClampMode, GraphicsDevice, ProgramId, VertexAttrib},
    gl,
    material::{
        same_material, Material, MaterialBind, MaterialCache, Texture, TextureFlags, TextureMode,
    },
    shader::{
        ShaderContainer, ShaderManager, ShaderProgram, UniformCaches, VariantKey,
        DLIGHT_UNIFORM_LIGHT_MODE, NO_TEXTURE_EFFECT_STATE,
    },
    style::{DepthBias, RenderStyle, Rgba8, SpecialEffect, Topology},
    tables::{self, BlendState},
    tracked::StateVec3,
};

mod fixed;

const LOG2E: f32 = 1.442692;

bitflags! {
    /// Parts of the requested state written since the last [RenderState::apply].
    ///
    /// Only [DirtyFlags::MATERIAL] and [DirtyFlags::BIAS] gate work. Everything else is
    /// compared against the mirror on every apply.
    #[derive(Default)]
    pub struct DirtyFlags: u32 {
        const STYLE    = 0x01;
        const MATERIAL = 0x02;
        const BIAS     = 0x04;
        const BUFFERS  = 0x08;
        const SHADER   = 0x10;
    }
}

/// The state drawing code asks for.
#[allow(missing_docs)]
#[derive(Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct RequestedState {
    pub render_style: RenderStyle,
    pub bias: DepthBias,

    pub material: Option<Rc<dyn Material>>,
    pub clamp: ClampMode,
    pub translation: i32,
    /// Shader family to use instead of the material's own, if non-negative.
    #[derivative(Default(value = "-1"))]
    pub override_shader: i32,

    pub buffers: BufferBinding,

    #[derivative(Default(value = "[1.0; 4]"))]
    pub color: [f32; 4],
    pub normal: [f32; 4],
    pub glow_top: [f32; 4],
    pub glow_bottom: [f32; 4],
    pub dyn_light: [f32; 3],
    pub glow_enabled: bool,

    pub fog_enabled: bool,
    pub fog_color: Rgba8,
    /// Light level factor, light distance, and fog density (already scaled for `exp2`).
    pub light_parms: [f32; 3],
    /// Index into the light buffer, or negative for no dynamic lights.
    #[derivative(Default(value = "-1"))]
    pub light_index: i32,

    pub special_effect: SpecialEffect,
    pub split_enabled: bool,
    #[derivative(Default(value = "true"))]
    pub texture_enabled: bool,
    pub texture_mode: TextureMode,
    pub texture_flags: TextureFlags,
    #[derivative(Default(value = "true"))]
    pub brightmap_enabled: bool,
    pub texture_clamp: bool,
    pub colormap_special: i32,
    pub shader_timer: f32,
    pub camera_pos: StateVec3,
}

impl RequestedState {
    fn colormap(&self) -> i32 {
        if self.colormap_special > 0 {
            self.colormap_special
        } else {
            0
        }
    }
}

#[derive(Debug, Clone)]
struct BoundMaterial {
    material: Rc<dyn Material>,
    clamp: ClampMode,
    translation: i32,
}

/// What the device was last told. `None` means unknown.
#[derive(Debug, Derivative)]
#[derivative(Default)]
struct MirroredState {
    render_style: Option<RenderStyle>,
    blend: Option<BlendState>,
    split_enabled: Option<bool>,

    material: Option<BoundMaterial>,
    bound_units: u32,
    effect_state: i32,
    temp_texture_mode: TextureMode,

    buffers: BufferMirror,

    program: Option<Option<ProgramId>>,
    uniforms: UniformCaches,

    #[derivative(Default(value = "true"))]
    depth_clamp: bool,
    #[derivative(Default(value = "1"))]
    draw_buffers: u32,
}

/// A render state engine driving one graphics device.
#[derive(Debug)]
pub struct RenderState<D, S> {
    device: D,
    shaders: S,
    config: RenderStateConfig,
    requested: RequestedState,
    mirror: MirroredState,
    dirty: DirtyFlags,
}

impl<D: GraphicsDevice, S: ShaderManager> RenderState<D, S> {
    /// Creates an engine for a freshly created device context.
    pub fn new(device: D, shaders: S, config: RenderStateConfig) -> Self {
        let mut state = Self {
            device,
            shaders,
            config,
            requested: RequestedState::default(),
            mirror: MirroredState::default(),
            dirty: DirtyFlags::empty(),
        };
        state.reset();
        state
    }

    /// Forgets everything known about the device and restores the default requested
    /// state. Call once after the context is (re)created.
    pub fn reset(&mut self) {
        tracing::debug!("resetting render state");
        self.requested = RequestedState::default();
        self.mirror = MirroredState::default();
        self.dirty = DirtyFlags::all();
    }

    #[allow(missing_docs)]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device. Anything changed behind the engine's back must be
    /// restored before the next apply, or followed by [RenderState::reset].
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[allow(missing_docs)]
    pub fn shaders(&self) -> &S {
        &self.shaders
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &RenderStateConfig {
        &self.config
    }

    #[allow(missing_docs)]
    pub fn requested(&self) -> &RequestedState {
        &self.requested
    }

    /// Parts of the requested state written since the last apply.
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// The blend state last sent to the device, if any.
    pub fn current_blend(&self) -> Option<BlendState> {
        self.mirror.blend
    }

    /// Consumes the engine, returning the device and shader manager.
    pub fn into_parts(self) -> (D, S) {
        (self.device, self.shaders)
    }

    // Mutators

    /// Sets how subsequent draws blend into the framebuffer.
    pub fn set_render_style(&mut self, style: RenderStyle) {
        self.requested.render_style = style;
        self.dirty |= DirtyFlags::STYLE;
    }

    /// Sets the polygon offset for subsequent draws.
    pub fn set_depth_bias(&mut self, factor: f32, units: f32) {
        self.requested.bias = DepthBias { factor, units };
        self.dirty |= DirtyFlags::BIAS;
    }

    #[allow(missing_docs)]
    pub fn clear_depth_bias(&mut self) {
        self.set_depth_bias(0.0, 0.0);
    }

    /// Requests a material for the next draws. The texture flags follow the material's
    /// layers.
    pub fn set_material(
        &mut self,
        material: Option<Rc<dyn Material>>,
        clamp: ClampMode,
        translation: i32,
        override_shader: i32,
    ) {
        self.requested.texture_flags = material
            .as_ref()
            .map(|m| m.layer_flags())
            .unwrap_or_default();
        self.requested.material = material;
        self.requested.clamp = clamp;
        self.requested.translation = translation;
        self.requested.override_shader = override_shader;
        self.dirty |= DirtyFlags::MATERIAL | DirtyFlags::SHADER;
    }

    /// Requests the material for `texture`, creating it in `cache` on first use.
    pub fn set_texture(
        &mut self,
        cache: &mut MaterialCache,
        texture: &Rc<Texture>,
        clamp: ClampMode,
        translation: i32,
        override_shader: i32,
    ) {
        let material: Rc<dyn Material> = cache.validate_texture(texture);
        self.set_material(Some(material), clamp, translation, override_shader);
    }

    /// Requests a vertex buffer with a byte offset for each binding point.
    pub fn set_vertex_buffer(&mut self, buffer: Option<BufferId>, offset0: i32, offset1: i32) {
        self.requested.buffers.vertex = buffer;
        self.requested.buffers.offsets = [offset0, offset1];
        self.dirty |= DirtyFlags::BUFFERS;
    }

    #[allow(missing_docs)]
    pub fn set_index_buffer(&mut self, buffer: Option<BufferId>) {
        self.requested.buffers.index = buffer;
        self.dirty |= DirtyFlags::BUFFERS;
    }

    /// Sets the constant vertex color.
    pub fn set_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.requested.color = [r, g, b, a];
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Sets the constant vertex normal.
    pub fn set_normal(&mut self, x: f32, y: f32, z: f32) {
        self.requested.normal = [x, y, z, 0.0];
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Sets the top and bottom glow colors used when glow is enabled.
    pub fn set_glow_params(&mut self, top: [f32; 4], bottom: [f32; 4]) {
        self.requested.glow_top = top;
        self.requested.glow_bottom = bottom;
        self.dirty |= DirtyFlags::SHADER;
    }

    #[allow(missing_docs)]
    pub fn enable_glow(&mut self, on: bool) {
        self.requested.glow_enabled = on;
        self.dirty |= DirtyFlags::SHADER;
    }

    #[allow(missing_docs)]
    pub fn set_dyn_light(&mut self, r: f32, g: f32, b: f32) {
        self.requested.dyn_light = [r, g, b];
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Sets the fog color, and the fog density unless `density` is negative.
    pub fn set_fog(&mut self, color: Rgba8, density: f32) {
        self.requested.fog_color = color;
        if density >= 0.0 {
            self.requested.light_parms[2] = density * (-LOG2E / 64000.0);
        }
        self.dirty |= DirtyFlags::SHADER;
    }

    #[allow(missing_docs)]
    pub fn enable_fog(&mut self, on: bool) {
        self.requested.fog_enabled = on;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Sets the light level factor and the light distance.
    pub fn set_light_parms(&mut self, factor: f32, distance: f32) {
        self.requested.light_parms[1] = factor;
        self.requested.light_parms[0] = distance;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Selects the dynamic light list, or none with a negative index.
    pub fn set_light_index(&mut self, index: i32) {
        self.requested.light_index = index;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Replaces normal shader selection with a fixed effect shader.
    pub fn set_special_effect(&mut self, effect: SpecialEffect) {
        self.requested.special_effect = effect;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Enables the two clip planes that split a sector's geometry.
    pub fn enable_split(&mut self, on: bool) {
        self.requested.split_enabled = on;
        self.dirty |= DirtyFlags::STYLE;
    }

    #[allow(missing_docs)]
    pub fn enable_texture(&mut self, on: bool) {
        self.requested.texture_enabled = on;
        self.dirty |= DirtyFlags::SHADER;
    }

    #[allow(missing_docs)]
    pub fn set_texture_mode(&mut self, mode: TextureMode) {
        self.requested.texture_mode = mode;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Overrides the texture flags taken from the current material.
    pub fn set_texture_flags(&mut self, flags: TextureFlags) {
        self.requested.texture_flags = flags;
        self.dirty |= DirtyFlags::SHADER;
    }

    #[allow(missing_docs)]
    pub fn enable_brightmap(&mut self, on: bool) {
        self.requested.brightmap_enabled = on;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Clamps texture lookups vertically in the shader.
    pub fn set_texture_clamp(&mut self, on: bool) {
        self.requested.texture_clamp = on;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Selects a special colormap. Values of 0 or below mean the default colormap.
    pub fn set_colormap_special(&mut self, colormap: i32) {
        self.requested.colormap_special = colormap;
        self.dirty |= DirtyFlags::SHADER;
    }

    #[allow(missing_docs)]
    pub fn set_shader_timer(&mut self, timer: f32) {
        self.requested.shader_timer = timer;
        self.dirty |= DirtyFlags::SHADER;
    }

    /// Sets the camera position in world coordinates.
    pub fn set_camera_pos(&mut self, x: f32, y: f32, z: f32) {
        self.requested.camera_pos.set_xyz(x, y, z);
        self.dirty |= DirtyFlags::SHADER;
    }

    // Apply

    /// Brings the device up to date with the requested state.
    pub fn apply(&mut self) {
        self.apply_state();
        self.apply_buffers();
        self.apply_shader();
        self.dirty = DirtyFlags::empty();
    }

    /// Applies blend mode, split planes, material, and depth bias.
    pub fn apply_state(&mut self) {
        let style = self.requested.render_style;
        if self.mirror.render_style.map(RenderStyle::as_u32) != Some(style.as_u32()) {
            self.apply_blend_mode();
            self.mirror.render_style = Some(style);
        }
        self.dirty.remove(DirtyFlags::STYLE);

        let split = self.requested.split_enabled;
        if self.mirror.split_enabled != Some(split) {
            self.toggle(gl::CLIP_DISTANCE0 + 3, split);
            self.toggle(gl::CLIP_DISTANCE0 + 4, split);
            self.mirror.split_enabled = Some(split);
        }

        if self.dirty.contains(DirtyFlags::MATERIAL) {
            let material = self.requested.material.clone();
            self.apply_material(
                material.as_ref(),
                self.requested.clamp,
                self.requested.translation,
                self.requested.override_shader,
            );
            self.dirty.remove(DirtyFlags::MATERIAL);
        }

        if self.dirty.contains(DirtyFlags::BIAS) {
            let bias = self.requested.bias;
            self.toggle(gl::POLYGON_OFFSET_FILL, !bias.is_zero());
            self.device.polygon_offset(bias.factor, bias.units);
            self.dirty.remove(DirtyFlags::BIAS);
        }
    }

    /// Sends the blend function and equation for the requested render style.
    pub fn apply_blend_mode(&mut self) {
        let blend = tables::blend_state(self.requested.render_style);
        self.device.blend_func(blend.src, blend.dst);
        self.device.blend_equation(blend.equation);
        self.mirror.blend = Some(blend);
    }

    /// Binds `material` unless it is already bound with the same clamp mode and
    /// translation. Does nothing without a material.
    pub fn apply_material(
        &mut self,
        material: Option<&Rc<dyn Material>>,
        clamp: ClampMode,
        translation: i32,
        override_shader: i32,
    ) {
        let material = match material {
            Some(material) => material,
            None => return,
        };
        if let Some(bound) = &self.mirror.material {
            if same_material(&bound.material, material)
                && bound.clamp == clamp
                && bound.translation == translation
            {
                return;
            }
        }
        self.mirror.material = Some(BoundMaterial {
            material: Rc::clone(material),
            clamp,
            translation,
        });

        let params = MaterialBind {
            colormap: self.requested.colormap(),
            clamp,
            translation,
            override_shader,
        };
        tracing::debug!("binding material {material:?} ({clamp:?}, translation {translation})");
        let units = material.bind(&mut self.device, &params);
        for unit in units..self.mirror.bound_units {
            self.device.unbind_texture(unit);
        }
        self.mirror.bound_units = units;

        self.mirror.effect_state = if override_shader >= 0 {
            override_shader
        } else {
            material.shader_index()
        };
        let render_target = material
            .source()
            .map_or(false, |source| source.is_render_target());
        self.mirror.temp_texture_mode = if render_target {
            TextureMode::Opaque
        } else {
            TextureMode::Normal
        };
    }

    /// Forgets the bound material so the next request binds it again.
    pub fn clear_last_material(&mut self) {
        self.mirror.material = None;
    }

    /// Binds the requested vertex and index buffers if they changed.
    ///
    /// Panics if the vertex binding changed but no vertex buffer is set.
    pub fn apply_buffers(&mut self) {
        self.mirror
            .buffers
            .apply(&mut self.device, &self.requested.buffers);
        self.dirty.remove(DirtyFlags::BUFFERS);
    }

    /// Forgets the bound buffers so the next apply binds them again.
    pub fn reset_vertex_buffer(&mut self) {
        self.mirror.buffers.forget();
    }

    /// Selects and binds the shader for the requested state and uploads changed
    /// uniforms. Returns false if no shader matches, in which case no program is bound.
    pub fn apply_shader(&mut self) -> bool {
        let Self {
            device,
            shaders,
            config,
            requested,
            mirror,
            dirty,
        } = self;

        let shader = select_shader(shaders, requested, mirror.effect_state);
        let found = match shader {
            Some(shader) => {
                bind_program(device, mirror, Some(shader.program));
                sync_uniforms(device, mirror, config, requested, shader);
                true
            }
            None => {
                bind_program(device, mirror, None);
                false
            }
        };

        device.vertex_attrib_4f(VertexAttrib::Color, requested.color);
        device.vertex_attrib_4f(VertexAttrib::Normal, requested.normal);
        dirty.remove(DirtyFlags::SHADER);
        found
    }

    /// The value of the texture mode uniform: the mode in the low bits and
    /// [TextureFlags] above.
    pub fn texture_mode_and_flags(&self) -> i32 {
        texture_mode_and_flags(&self.requested, self.mirror.temp_texture_mode)
    }

    // Draws

    /// Draws `count` vertices starting at `first`, applying state first if `apply`.
    pub fn draw(&mut self, topology: Topology, first: i32, count: i32, apply: bool) {
        if apply {
            self.apply();
        }
        self.device
            .draw_arrays(tables::topology(topology), first, count);
    }

    /// Draws `count` indices starting at index `first` of the bound index buffer,
    /// applying state first if `apply`.
    pub fn draw_indexed(&mut self, topology: Topology, first: i32, count: i32, apply: bool) {
        if apply {
            self.apply();
        }
        let first = usize::try_from(first).expect("negative first index");
        self.device.draw_elements(
            tables::topology(topology),
            count,
            gl::UNSIGNED_INT,
            first * mem::size_of::<u32>(),
        );
    }
}

fn select_shader<'s, S: ShaderManager>(
    shaders: &'s S,
    requested: &RequestedState,
    effect_state: i32,
) -> Option<&'s ShaderProgram> {
    if requested.special_effect != SpecialEffect::None {
        let shader = shaders.effect(requested.special_effect);
        if shader.is_none() {
            tracing::debug!("no shader for effect {:?}", requested.special_effect);
        }
        return shader;
    }

    let effect_state = if requested.texture_enabled {
        effect_state
    } else {
        NO_TEXTURE_EFFECT_STATE
    };
    let key = VariantKey {
        colormap: requested.colormap(),
        glow: requested.glow_enabled,
        timer: requested.shader_timer,
        light: requested.light_index >= 0,
    };
    let shader = shaders
        .container(effect_state)
        .and_then(|container| container.resolve(&key));
    if shader.is_none() {
        tracing::debug!("no shader for effect state {effect_state} with {key:?}");
    }
    shader
}

fn bind_program(
    device: &mut impl GraphicsDevice,
    mirror: &mut MirroredState,
    program: Option<ProgramId>,
) {
    if mirror.program != Some(program) {
        tracing::trace!("switching program to {program:?}");
        device.use_program(program);
        mirror.program = Some(program);
    }
}

fn sync_uniforms(
    device: &mut impl GraphicsDevice,
    mirror: &mut MirroredState,
    config: &RenderStateConfig,
    requested: &RequestedState,
    shader: &ShaderProgram,
) {
    let locations = &shader.uniforms;
    let fog = fog_code(requested, config);
    let texture_mode = texture_mode_and_flags(requested, mirror.temp_texture_mode);
    let fog_color = Rgba8 {
        a: 0,
        ..requested.fog_color
    };
    let cache = mirror.uniforms.get_mut(shader.id);

    if let Some(location) = locations.fog_enabled {
        if cache.fog_enabled != Some(fog) {
            device.uniform_1i(location, fog);
            cache.fog_enabled = Some(fog);
        }
    }

    if let Some(location) = locations.texture_mode {
        if cache.texture_mode != Some(texture_mode) {
            device.uniform_1i(location, texture_mode);
            cache.texture_mode = Some(texture_mode);
        }
    }

    if let Some(location) = locations.camera_pos {
        if cache.camera_pos.update(&requested.camera_pos) {
            device.uniform_3f(location, cache.camera_pos.value());
        }
    }

    if let Some(location) = locations.fog_color {
        if cache.fog_color != Some(fog_color) {
            device.uniform_4f(location, fog_color.to_rgb0());
            cache.fog_color = Some(fog_color);
        }
    }

    if requested.glow_enabled {
        if let (Some(top), Some(bottom)) =
            (locations.glow_top_color, locations.glow_bottom_color)
        {
            device.uniform_4f(top, requested.glow_top);
            device.uniform_4f(bottom, requested.glow_bottom);
        }
    }

    if requested.light_index >= 0 && config.light_mode == DLIGHT_UNIFORM_LIGHT_MODE {
        if let Some(location) = locations.dlight_color {
            device.uniform_3f(location, requested.dyn_light);
        }
    }

    if let Some(location) = locations.timer {
        let bits = requested.shader_timer.to_bits();
        if cache.timer != Some(bits) {
            device.uniform_1f(location, requested.shader_timer);
            cache.timer = Some(bits);
        }
    }

    if locations.light_parms.is_some() {
        let [distance, factor, density] = requested.light_parms;
        device.vertex_attrib_4f(VertexAttrib::FogParams, [distance, factor, density, 0.0]);
    }
}

// Negative marks black fog, which the shader can take a cheaper path for.
fn fog_code(requested: &RequestedState, config: &RenderStateConfig) -> i32 {
    if !requested.fog_enabled {
        0
    } else if requested.fog_color.is_black() {
        -config.fog_mode
    } else {
        config.fog_mode
    }
}

fn texture_mode_and_flags(requested: &RequestedState, temp_texture_mode: TextureMode) -> i32 {
    let mode = if requested.texture_mode == TextureMode::Normal
        && temp_texture_mode == TextureMode::Opaque
    {
        TextureMode::Opaque
    } else {
        requested.texture_mode
    };
    let mut flags = requested.texture_flags;
    if !requested.brightmap_enabled {
        flags.remove(TextureFlags::BRIGHTMAP | TextureFlags::GLOWMAP);
    }
    if requested.texture_clamp {
        flags.insert(TextureFlags::CLAMP_Y);
    }
    i32::from(mode) | flags.bits()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        device::{DeviceCall, TextureId},
        style::{StyleAlpha, StyleFlags, StyleOp},
        test_util::*,
    };

    fn textured_engine() -> (TestEngine, Rc<dyn Material>) {
        let mut engine = engine();
        engine.set_vertex_buffer(Some(BufferId(1)), 0, 0);
        let material = material(TextureId(10), false);
        engine.set_material(Some(Rc::clone(&material)), ClampMode::None, 0, -1);
        (engine, material)
    }

    #[test]
    fn test_first_apply_issues_every_state_call() {
        let (mut engine, _) = textured_engine();
        engine.apply();
        let calls = engine.device_mut().take_calls();

        assert!(calls.contains(&DeviceCall::BlendFunc {
            src: gl::SRC_ALPHA,
            dst: gl::ONE_MINUS_SRC_ALPHA,
        }));
        assert!(calls.contains(&DeviceCall::Disable(gl::CLIP_DISTANCE0 + 3)));
        assert!(calls.contains(&DeviceCall::Disable(gl::POLYGON_OFFSET_FILL)));
        assert!(calls.contains(&DeviceCall::BindVertexBuffer {
            buffer: BufferId(1),
            offsets: [0, 0],
        }));
        assert!(calls.contains(&DeviceCall::UseProgram(Some(program_id(0)))));
        assert!(calls.contains(&DeviceCall::Uniform1i(FOG_ENABLED, 0)));
        assert!(calls.contains(&DeviceCall::Uniform1i(TEXTURE_MODE, 0)));
        assert!(calls.contains(&DeviceCall::Uniform4f(FOG_COLOR, [0.0; 4])));
        assert!(calls.contains(&DeviceCall::Uniform1f(TIMER, 0.0)));
        assert_eq!(engine.dirty(), DirtyFlags::empty());
    }

    #[test]
    fn test_second_apply_is_idempotent() {
        let (mut engine, _) = textured_engine();
        engine.enable_fog(true);
        engine.set_fog(Rgba8::rgb(64, 32, 16), 10.0);
        engine.set_camera_pos(1.0, 2.0, 3.0);
        engine.enable_split(true);
        engine.set_depth_bias(1.0, 4.0);
        engine.apply();
        engine.device_mut().take_calls();

        engine.apply();
        assert!(engine.device().state_calls().is_empty());
        let density = 10.0 * (-LOG2E / 64000.0);
        assert_eq!(
            engine.device().calls(),
            &[
                DeviceCall::VertexAttrib4f(VertexAttrib::FogParams, [0.0, 0.0, density, 0.0]),
                DeviceCall::VertexAttrib4f(VertexAttrib::Color, [1.0; 4]),
                DeviceCall::VertexAttrib4f(VertexAttrib::Normal, [0.0; 4]),
            ]
        );
    }

    #[test]
    fn test_blend_mode_scenario() {
        let mut engine = engine();
        let style = RenderStyle::new(StyleOp::Add, StyleAlpha::One, StyleAlpha::InvSrc);
        engine.set_render_style(style);
        engine.apply_state();
        assert_eq!(
            engine.device_mut().take_calls(),
            vec![
                DeviceCall::BlendFunc {
                    src: gl::ONE,
                    dst: gl::ONE_MINUS_SRC_ALPHA,
                },
                DeviceCall::BlendEquation(gl::FUNC_ADD),
                DeviceCall::Disable(gl::CLIP_DISTANCE0 + 3),
                DeviceCall::Disable(gl::CLIP_DISTANCE0 + 4),
                DeviceCall::Disable(gl::POLYGON_OFFSET_FILL),
                DeviceCall::PolygonOffset {
                    factor: 0.0,
                    units: 0.0,
                },
            ]
        );
        assert_eq!(
            engine.current_blend(),
            Some(BlendState {
                src: gl::ONE,
                dst: gl::ONE_MINUS_SRC_ALPHA,
                equation: gl::FUNC_ADD,
            })
        );

        engine.apply_state();
        assert!(engine.device().calls().is_empty());
    }

    #[test]
    fn test_fuzz_style() {
        let mut engine = engine();
        engine.apply_state();
        engine.device_mut().take_calls();

        let style = RenderStyle::new(StyleOp::Fuzz, StyleAlpha::Zero, StyleAlpha::SrcCol);
        engine.set_render_style(style);
        engine.apply_state();
        assert_eq!(
            engine.device_mut().take_calls(),
            vec![
                DeviceCall::BlendFunc {
                    src: gl::DST_COLOR,
                    dst: gl::ONE_MINUS_SRC_ALPHA,
                },
                DeviceCall::BlendEquation(gl::FUNC_ADD),
            ]
        );
    }

    #[test]
    fn test_style_flags_take_part_in_comparison() {
        let mut engine = engine();
        engine.apply_state();
        engine.device_mut().take_calls();

        engine.set_render_style(RenderStyle::NORMAL.with_flags(StyleFlags::FORCE_ALPHA));
        engine.apply_state();
        assert_eq!(engine.device().calls().len(), 2);
    }

    #[test]
    fn test_split_toggles_both_planes() {
        let mut engine = engine();
        engine.apply_state();
        engine.device_mut().take_calls();

        engine.enable_split(true);
        engine.apply_state();
        assert_eq!(
            engine.device_mut().take_calls(),
            vec![
                DeviceCall::Enable(gl::CLIP_DISTANCE0 + 3),
                DeviceCall::Enable(gl::CLIP_DISTANCE0 + 4),
            ]
        );
    }

    #[test]
    fn test_depth_bias() {
        let mut engine = engine();
        engine.apply_state();
        engine.device_mut().take_calls();

        engine.set_depth_bias(-1.0, -128.0);
        engine.apply_state();
        engine.apply_state();
        assert_eq!(
            engine.device_mut().take_calls(),
            vec![
                DeviceCall::Enable(gl::POLYGON_OFFSET_FILL),
                DeviceCall::PolygonOffset {
                    factor: -1.0,
                    units: -128.0,
                },
            ]
        );

        engine.clear_depth_bias();
        engine.apply_state();
        assert_eq!(
            engine.device_mut().take_calls(),
            vec![
                DeviceCall::Disable(gl::POLYGON_OFFSET_FILL),
                DeviceCall::PolygonOffset {
                    factor: 0.0,
                    units: 0.0,
                },
            ]
        );
    }

    fn used_program(engine: &TestEngine, id: u32) -> bool {
        engine
            .device()
            .calls()
            .contains(&DeviceCall::UseProgram(Some(program_id(id))))
    }

    fn texture_binds(engine: &TestEngine) -> usize {
        engine
            .device()
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::BindTexture { .. }))
            .count()
    }

    #[test]
    fn test_identical_material_binds_once() {
        let (mut engine, material) = textured_engine();
        for _ in 0..4 {
            engine.set_material(Some(Rc::clone(&material)), ClampMode::None, 0, -1);
            engine.apply();
        }
        assert_eq!(texture_binds(&engine), 1);

        engine.set_material(Some(Rc::clone(&material)), ClampMode::XY, 0, -1);
        engine.apply();
        engine.set_material(Some(Rc::clone(&material)), ClampMode::XY, 5, -1);
        engine.apply();
        assert_eq!(texture_binds(&engine), 3);

        engine.clear_last_material();
        engine.set_material(Some(material), ClampMode::XY, 5, -1);
        engine.apply();
        assert_eq!(texture_binds(&engine), 4);
    }

    #[test]
    fn test_set_texture_uses_cached_material() {
        let mut engine = engine();
        let mut cache = MaterialCache::new();
        let texture = Rc::new(Texture {
            id: TextureId(3),
            glowmap: Some(TextureId(4)),
            ..Default::default()
        });
        engine.set_texture(&mut cache, &texture, ClampMode::None, 0, -1);
        engine.apply_state();
        engine.set_texture(&mut cache, &texture, ClampMode::None, 0, -1);
        engine.apply_state();

        assert_eq!(texture_binds(&engine), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(engine.requested().texture_flags, TextureFlags::GLOWMAP);
    }

    #[test]
    fn test_missing_material_is_skipped() {
        let mut engine = engine();
        engine.set_material(None, ClampMode::None, 0, -1);
        engine.apply_state();
        assert_eq!(texture_binds(&engine), 0);
        assert_eq!(engine.requested().texture_flags, TextureFlags::empty());
    }

    #[test]
    fn test_leftover_texture_units_are_unbound() {
        let mut engine = engine();
        let mut cache = MaterialCache::new();
        let layered = Rc::new(Texture {
            id: TextureId(1),
            brightmap: Some(TextureId(2)),
            detailmap: Some(TextureId(3)),
            ..Default::default()
        });
        let plain = Rc::new(Texture {
            id: TextureId(5),
            ..Default::default()
        });

        engine.set_texture(&mut cache, &layered, ClampMode::None, 0, -1);
        engine.apply_state();
        engine.device_mut().take_calls();
        engine.set_texture(&mut cache, &plain, ClampMode::None, 0, -1);
        engine.apply_state();

        assert_eq!(
            engine.device().calls(),
            &[
                DeviceCall::BindTexture {
                    unit: 0,
                    texture: TextureId(5),
                    clamp: ClampMode::None,
                    translation: 0,
                },
                DeviceCall::UnbindTexture(1),
                DeviceCall::UnbindTexture(2),
            ]
        );
    }

    #[test]
    fn test_shader_family_selection() {
        let mut engine = engine();
        engine.set_vertex_buffer(Some(BufferId(1)), 0, 0);
        let mut cache = MaterialCache::new();
        let texture = Rc::new(Texture {
            id: TextureId(7),
            shader_index: 1,
            ..Default::default()
        });

        engine.set_texture(&mut cache, &texture, ClampMode::None, 0, -1);
        engine.apply();
        assert!(used_program(&engine, 10));

        engine.device_mut().take_calls();
        engine.set_texture(&mut cache, &texture, ClampMode::X, 0, 0);
        engine.apply();
        assert!(used_program(&engine, 0));

        engine.device_mut().take_calls();
        engine.enable_texture(false);
        engine.apply();
        assert!(used_program(&engine, 40));
    }

    #[test]
    fn test_variant_dimensions() {
        let (mut engine, _) = textured_engine();
        engine.enable_glow(true);
        engine.apply();
        assert!(used_program(&engine, 1));

        engine.set_light_index(0);
        engine.apply();
        assert!(used_program(&engine, 3));

        engine.set_colormap_special(2);
        engine.apply();
        assert!(used_program(&engine, 9));
    }

    #[test]
    fn test_special_effect_and_missing_shader() {
        let (mut engine, _) = textured_engine();
        engine.set_special_effect(SpecialEffect::SphereMap);
        assert!(engine.apply_shader());
        assert!(used_program(&engine, 20));

        engine.device_mut().take_calls();
        engine.set_special_effect(SpecialEffect::Burn);
        assert!(!engine.apply_shader());
        assert!(!engine.apply_shader());
        assert_eq!(
            engine.device().state_calls(),
            vec![&DeviceCall::UseProgram(None)]
        );
    }

    #[test]
    fn test_black_fog_negates_fog_mode() {
        let (mut engine, _) = textured_engine();
        engine.enable_fog(true);
        engine.set_fog(Rgba8::BLACK, -1.0);
        engine.apply();
        assert!(engine.device().calls().contains(&DeviceCall::Uniform1i(FOG_ENABLED, -1)));

        engine.device_mut().take_calls();
        engine.set_fog(Rgba8::rgb(255, 0, 51), -1.0);
        engine.apply();
        assert_eq!(
            engine.device().state_calls(),
            vec![
                &DeviceCall::Uniform1i(FOG_ENABLED, 1),
                &DeviceCall::Uniform4f(FOG_COLOR, [1.0, 0.0, 0.2, 0.0]),
            ]
        );
    }

    #[test]
    fn test_fog_color_alpha_is_ignored() {
        let (mut engine, _) = textured_engine();
        engine.set_fog(Rgba8::rgb(1, 2, 3), -1.0);
        engine.apply();
        engine.device_mut().take_calls();

        engine.set_fog(Rgba8 { a: 0, ..Rgba8::rgb(1, 2, 3) }, -1.0);
        engine.apply();
        assert!(engine.device().state_calls().is_empty());
    }

    #[test]
    fn test_camera_pos_push_gating() {
        let (mut engine, _) = textured_engine();
        engine.set_camera_pos(1.0, 2.0, 3.0);
        engine.apply();
        engine.apply();
        let pushes = |engine: &TestEngine| {
            engine
                .device()
                .calls()
                .iter()
                .filter(|c| matches!(c, DeviceCall::Uniform3f(l, _) if *l == CAMERA_POS))
                .count()
        };
        assert_eq!(pushes(&engine), 1);
        assert!(engine
            .device()
            .calls()
            .contains(&DeviceCall::Uniform3f(CAMERA_POS, [1.0, 3.0, 2.0])));

        engine.set_camera_pos(1.0, 2.0, 3.0);
        engine.apply();
        assert_eq!(pushes(&engine), 2);
    }

    #[test]
    fn test_uniform_caches_are_per_program() {
        let (mut engine, _) = textured_engine();
        engine.apply();
        engine.enable_glow(true);
        engine.apply();
        engine.device_mut().take_calls();

        engine.enable_glow(false);
        engine.apply();
        assert_eq!(
            engine.device().state_calls(),
            vec![&DeviceCall::UseProgram(Some(program_id(0)))]
        );
    }

    #[test]
    fn test_stream_uniforms() {
        let mut engine = engine_with_config(RenderStateConfig {
            light_mode: DLIGHT_UNIFORM_LIGHT_MODE,
            ..Default::default()
        });
        engine.set_vertex_buffer(Some(BufferId(1)), 0, 0);
        engine.enable_glow(true);
        engine.set_glow_params([1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]);
        engine.set_light_index(2);
        engine.set_dyn_light(0.5, 0.5, 0.5);
        engine.apply();
        engine.device_mut().take_calls();

        engine.apply();
        assert_eq!(
            engine.device().state_calls(),
            vec![
                &DeviceCall::Uniform4f(GLOW_TOP_COLOR, [1.0, 0.0, 0.0, 1.0]),
                &DeviceCall::Uniform4f(GLOW_BOTTOM_COLOR, [0.0, 0.0, 1.0, 1.0]),
                &DeviceCall::Uniform3f(DLIGHT_COLOR, [0.5, 0.5, 0.5]),
            ]
        );
    }

    #[test]
    fn test_dlight_needs_light_mode() {
        let (mut engine, _) = textured_engine();
        engine.set_light_index(2);
        engine.apply();
        assert!(!engine
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::Uniform3f(l, _) if *l == DLIGHT_COLOR)));
    }

    #[test]
    fn test_timer_uniform() {
        let (mut engine, _) = textured_engine();
        engine.apply();
        engine.device_mut().take_calls();
        engine.set_shader_timer(0.25);
        engine.apply();
        engine.apply();
        assert_eq!(
            engine.device().state_calls(),
            vec![&DeviceCall::Uniform1f(TIMER, 0.25)]
        );
    }

    #[test]
    fn test_nan_timer_is_not_resent() {
        let (mut engine, _) = textured_engine();
        engine.set_shader_timer(f32::NAN);
        engine.apply();
        assert!(engine
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::Uniform1f(l, t) if *l == TIMER && t.is_nan())));

        engine.device_mut().take_calls();
        engine.apply();
        assert!(engine.device().state_calls().is_empty());
    }

    #[test]
    fn test_canvas_texture_mode_reaches_uniform_in_same_apply() {
        let mut engine = engine();
        engine.set_vertex_buffer(Some(BufferId(1)), 0, 0);
        engine.set_material(Some(material(TextureId(3), true)), ClampMode::None, 0, -1);
        engine.apply();
        assert!(engine
            .device()
            .calls()
            .contains(&DeviceCall::Uniform1i(TEXTURE_MODE, TextureMode::Opaque as i32)));
    }

    #[test]
    fn test_light_parms_attribute() {
        let (mut engine, _) = textured_engine();
        engine.set_light_parms(0.75, 3.0);
        engine.set_fog(Rgba8::BLACK, 64000.0);
        engine.apply();
        let attrib = engine.device().calls().iter().find_map(|c| match c {
            DeviceCall::VertexAttrib4f(VertexAttrib::FogParams, v) => Some(*v),
            _ => None,
        });
        let [distance, factor, density, w] = attrib.unwrap();
        assert_eq!((distance, factor, w), (3.0, 0.75, 0.0));
        assert!((density + LOG2E).abs() < 1e-5);
    }

    #[test]
    fn test_texture_mode_and_flags() {
        let mut engine = engine();
        let mut cache = MaterialCache::new();
        let canvas = Rc::new(Texture {
            id: TextureId(2),
            render_target: true,
            brightmap: Some(TextureId(3)),
            ..Default::default()
        });
        engine.set_texture(&mut cache, &canvas, ClampMode::CamTex, 0, -1);
        engine.apply_state();
        assert_eq!(
            engine.texture_mode_and_flags(),
            TextureMode::Opaque as i32 | TextureFlags::BRIGHTMAP.bits()
        );

        engine.enable_brightmap(false);
        engine.set_texture_clamp(true);
        assert_eq!(
            engine.texture_mode_and_flags(),
            TextureMode::Opaque as i32 | TextureFlags::CLAMP_Y.bits()
        );

        engine.set_texture_mode(TextureMode::Stencil);
        engine.set_texture_flags(TextureFlags::DETAILMAP);
        assert_eq!(
            engine.texture_mode_and_flags(),
            TextureMode::Stencil as i32
                | TextureFlags::DETAILMAP.bits()
                | TextureFlags::CLAMP_Y.bits()
        );
    }

    #[test]
    fn test_vertex_offset_rebind() {
        let mut engine = engine();
        engine.set_vertex_buffer(Some(BufferId(4)), 0, 0);
        engine.apply_buffers();
        engine.set_vertex_buffer(Some(BufferId(4)), 0, 16);
        engine.apply_buffers();
        engine.apply_buffers();
        assert_eq!(
            engine.device().calls(),
            &[
                DeviceCall::BindVertexBuffer {
                    buffer: BufferId(4),
                    offsets: [0, 0],
                },
                DeviceCall::BindVertexBuffer {
                    buffer: BufferId(4),
                    offsets: [0, 16],
                },
            ]
        );

        engine.reset_vertex_buffer();
        engine.apply_buffers();
        assert_eq!(engine.device().calls().len(), 3);
    }

    #[test]
    fn test_draw_calls() {
        let (mut engine, _) = textured_engine();
        engine.draw(Topology::TriangleFan, 3, 6, true);
        assert_eq!(
            engine.device().calls().last(),
            Some(&DeviceCall::DrawArrays {
                mode: gl::TRIANGLE_FAN,
                first: 3,
                count: 6,
            })
        );

        engine.device_mut().take_calls();
        engine.draw_indexed(Topology::Triangles, 2, 9, false);
        assert_eq!(
            engine.device().calls(),
            &[DeviceCall::DrawElements {
                mode: gl::TRIANGLES,
                count: 9,
                index_type: gl::UNSIGNED_INT,
                offset: 8,
            }]
        );
    }

    #[test]
    fn test_reset_forces_full_reapply() {
        let (mut engine, material) = textured_engine();
        engine.apply();
        let first = engine.device_mut().take_calls();

        engine.reset();
        engine.set_vertex_buffer(Some(BufferId(1)), 0, 0);
        engine.set_material(Some(material), ClampMode::None, 0, -1);
        engine.apply();
        let second = engine.device_mut().take_calls();

        assert_eq!(first, second);
    }
}
