//! The boundary between the render state engine and the graphics API.
//!
//! Everything the engine does to the GPU goes through [GraphicsDevice]. Enum
//! parameters are raw GL values from [crate::gl].

use std::{collections::HashSet, mem};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A texture object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureId(pub u32);

/// A vertex or index buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// A linked GPU program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// A uniform location within a program.
///
/// Locations are always non-negative; an absent uniform is `None` wherever a location
/// is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub i32);

impl UniformLocation {
    /// Converts a raw location as returned by the driver, where negative means absent.
    pub fn from_raw(raw: i32) -> Option<Self> {
        (raw >= 0).then_some(Self(raw))
    }
}

/// Generic vertex attribute slots that the engine writes constant values to.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum VertexAttrib {
    Vertex = 0,
    TexCoord = 1,
    Color = 2,
    Vertex2 = 3,
    Normal = 4,
    Normal2 = 5,
    FogParams = 6,
}

/// Texture edge sampling applied when a texture is bound.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ClampMode {
    None = 0,
    X = 1,
    Y = 2,
    XY = 3,
    NoFilter = 4,
    NoFilterX = 5,
    NoFilterY = 6,
    NoFilterXY = 7,
    XYNoMip = 8,
    CamTex = 9,
}

impl Default for ClampMode {
    fn default() -> Self {
        Self::None
    }
}

/// A stateful graphics API.
///
/// Calls are assumed to complete synchronously (or be queued by the driver) and never
/// fail from the engine's point of view.
#[allow(missing_docs)]
pub trait GraphicsDevice {
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn is_enabled(&self, cap: u32) -> bool;

    fn blend_func(&mut self, src: u32, dst: u32);
    fn blend_equation(&mut self, mode: u32);
    fn polygon_offset(&mut self, factor: f32, units: f32);

    fn depth_mask(&mut self, on: bool);
    fn depth_func(&mut self, func: u32);
    fn depth_range(&mut self, near: f32, far: f32);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32);
    fn stencil_op(&mut self, stencil_fail: u32, depth_fail: u32, depth_pass: u32);
    fn front_face(&mut self, mode: u32);

    fn clear_depth(&mut self, depth: f64);
    fn clear_stencil(&mut self, stencil: i32);
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&mut self, mask: u32);

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn draw_buffers(&mut self, buffers: &[u32]);

    fn bind_texture(&mut self, unit: u32, texture: TextureId, clamp: ClampMode, translation: i32);
    fn unbind_texture(&mut self, unit: u32);

    /// Binds a vertex buffer and its attribute layout, with one byte offset per binding
    /// point.
    fn bind_vertex_buffer(&mut self, buffer: BufferId, offsets: [i32; 2]);
    fn bind_index_buffer(&mut self, buffer: BufferId);

    fn use_program(&mut self, program: Option<ProgramId>);
    fn uniform_1i(&mut self, location: UniformLocation, v: i32);
    fn uniform_1f(&mut self, location: UniformLocation, v: f32);
    fn uniform_3f(&mut self, location: UniformLocation, v: [f32; 3]);
    fn uniform_4f(&mut self, location: UniformLocation, v: [f32; 4]);
    fn vertex_attrib_4f(&mut self, attrib: VertexAttrib, v: [f32; 4]);

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: usize);
}

/// One call made on a [RecordingDevice].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Enable(u32),
    Disable(u32),
    BlendFunc { src: u32, dst: u32 },
    BlendEquation(u32),
    PolygonOffset { factor: f32, units: f32 },
    DepthMask(bool),
    DepthFunc(u32),
    DepthRange { near: f32, far: f32 },
    ColorMask([bool; 4]),
    StencilFunc { func: u32, reference: i32, mask: u32 },
    StencilOp([u32; 3]),
    FrontFace(u32),
    ClearDepth(f64),
    ClearStencil(i32),
    ClearColor([f32; 4]),
    Clear(u32),
    Scissor([i32; 4]),
    Viewport([i32; 4]),
    DrawBuffers(Vec<u32>),
    BindTexture {
        unit: u32,
        texture: TextureId,
        clamp: ClampMode,
        translation: i32,
    },
    UnbindTexture(u32),
    BindVertexBuffer { buffer: BufferId, offsets: [i32; 2] },
    BindIndexBuffer(BufferId),
    UseProgram(Option<ProgramId>),
    Uniform1i(UniformLocation, i32),
    Uniform1f(UniformLocation, f32),
    Uniform3f(UniformLocation, [f32; 3]),
    Uniform4f(UniformLocation, [f32; 4]),
    VertexAttrib4f(VertexAttrib, [f32; 4]),
    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawElements {
        mode: u32,
        count: i32,
        index_type: u32,
        offset: usize,
    },
}

impl DeviceCall {
    /// Whether this call writes a per-draw vertex attribute rather than device state.
    pub fn is_vertex_attrib(&self) -> bool {
        matches!(self, DeviceCall::VertexAttrib4f(..))
    }
}

/// A [GraphicsDevice] that records every call instead of issuing it.
///
/// Useful for tests and for dumping the command stream a frame produces.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    enabled: HashSet<u32>,
}

impl RecordingDevice {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `cap` already enabled, as drivers do for e.g. multisampling.
    pub fn with_enabled(mut self, cap: u32) -> Self {
        self.enabled.insert(cap);
        self
    }

    #[allow(missing_docs)]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Returns and forgets the calls recorded so far.
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        mem::take(&mut self.calls)
    }

    /// Recorded calls excluding per-draw vertex attribute writes.
    pub fn state_calls(&self) -> Vec<&DeviceCall> {
        self.calls.iter().filter(|c| !c.is_vertex_attrib()).collect()
    }

    fn push(&mut self, call: DeviceCall) {
        self.calls.push(call);
    }
}

impl GraphicsDevice for RecordingDevice {
    fn enable(&mut self, cap: u32) {
        self.enabled.insert(cap);
        self.push(DeviceCall::Enable(cap));
    }

    fn disable(&mut self, cap: u32) {
        self.enabled.remove(&cap);
        self.push(DeviceCall::Disable(cap));
    }

    fn is_enabled(&self, cap: u32) -> bool {
        self.enabled.contains(&cap)
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.push(DeviceCall::BlendFunc { src, dst });
    }

    fn blend_equation(&mut self, mode: u32) {
        self.push(DeviceCall::BlendEquation(mode));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.push(DeviceCall::PolygonOffset { factor, units });
    }

    fn depth_mask(&mut self, on: bool) {
        self.push(DeviceCall::DepthMask(on));
    }

    fn depth_func(&mut self, func: u32) {
        self.push(DeviceCall::DepthFunc(func));
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        self.push(DeviceCall::DepthRange { near, far });
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.push(DeviceCall::ColorMask([r, g, b, a]));
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        self.push(DeviceCall::StencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn stencil_op(&mut self, stencil_fail: u32, depth_fail: u32, depth_pass: u32) {
        self.push(DeviceCall::StencilOp([stencil_fail, depth_fail, depth_pass]));
    }

    fn front_face(&mut self, mode: u32) {
        self.push(DeviceCall::FrontFace(mode));
    }

    fn clear_depth(&mut self, depth: f64) {
        self.push(DeviceCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.push(DeviceCall::ClearStencil(stencil));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.push(DeviceCall::ClearColor([r, g, b, a]));
    }

    fn clear(&mut self, mask: u32) {
        self.push(DeviceCall::Clear(mask));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.push(DeviceCall::Scissor([x, y, width, height]));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.push(DeviceCall::Viewport([x, y, width, height]));
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        self.push(DeviceCall::DrawBuffers(buffers.to_vec()));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId, clamp: ClampMode, translation: i32) {
        self.push(DeviceCall::BindTexture {
            unit,
            texture,
            clamp,
            translation,
        });
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.push(DeviceCall::UnbindTexture(unit));
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId, offsets: [i32; 2]) {
        self.push(DeviceCall::BindVertexBuffer { buffer, offsets });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.push(DeviceCall::BindIndexBuffer(buffer));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.push(DeviceCall::UseProgram(program));
    }

    fn uniform_1i(&mut self, location: UniformLocation, v: i32) {
        self.push(DeviceCall::Uniform1i(location, v));
    }

    fn uniform_1f(&mut self, location: UniformLocation, v: f32) {
        self.push(DeviceCall::Uniform1f(location, v));
    }

    fn uniform_3f(&mut self, location: UniformLocation, v: [f32; 3]) {
        self.push(DeviceCall::Uniform3f(location, v));
    }

    fn uniform_4f(&mut self, location: UniformLocation, v: [f32; 4]) {
        self.push(DeviceCall::Uniform4f(location, v));
    }

    fn vertex_attrib_4f(&mut self, attrib: VertexAttrib, v: [f32; 4]) {
        self.push(DeviceCall::VertexAttrib4f(attrib, v));
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.push(DeviceCall::DrawArrays { mode, first, count });
    }

    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: usize) {
        self.push(DeviceCall::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }
}
