//! Render styles and the fixed-function selectors that drawing code passes in.
//!
//! Each selector enum converts from its raw integer with `TryFrom`, so call sites
//! holding legacy integer values get an error instead of an out-of-bounds table read.

#![allow(missing_docs)]

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Source or destination blend factor selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StyleAlpha {
    Zero = 0,
    One = 1,
    Src = 2,
    InvSrc = 3,
    SrcCol = 4,
    InvSrcCol = 5,
    DstCol = 6,
    InvDstCol = 7,
    Dst = 8,
    InvDst = 9,
}

impl StyleAlpha {
    pub const COUNT: u8 = 10;
}

/// Blend operation selector.
///
/// Every operation from [StyleOp::Fuzz] upward is a fuzz variant, which ignores the
/// style's blend factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StyleOp {
    None = 0,
    Add = 1,
    Sub = 2,
    RevSub = 3,
    Fuzz = 4,
    FuzzOrAdd = 5,
    FuzzOrSub = 6,
    FuzzOrRevSub = 7,
    Shadow = 8,
}

bitflags! {
    /// Extra render style flags. These take no part in blend state, but they do
    /// take part in style comparison.
    #[derive(Default)]
    pub struct StyleFlags: u8 {
        const ZERO_ALPHA     = 0x01;
        const ALPHA1         = 0x02;
        const INVERSE_ALPHA  = 0x04;
        const COLOR_IS_FIXED = 0x08;
        const INVERT_OVERLAY = 0x10;
        const RED_IS_ALPHA   = 0x20;
        const FORCE_ALPHA    = 0x40;
    }
}

/// A render style: how a primitive is blended into the framebuffer.
///
/// Styles are compared through their packed [RenderStyle::as_u32] form, one byte per
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderStyle {
    pub blend_op: u8,
    pub src_alpha: u8,
    pub dest_alpha: u8,
    pub flags: u8,
}

impl RenderStyle {
    /// Normal translucent drawing.
    pub const NORMAL: Self = Self {
        blend_op: StyleOp::Add as u8,
        src_alpha: StyleAlpha::Src as u8,
        dest_alpha: StyleAlpha::InvSrc as u8,
        flags: StyleFlags::ALPHA1.bits(),
    };

    pub fn new(op: StyleOp, src: StyleAlpha, dest: StyleAlpha) -> Self {
        Self {
            blend_op: op.into(),
            src_alpha: src.into(),
            dest_alpha: dest.into(),
            flags: 0,
        }
    }

    pub fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags.bits();
        self
    }

    pub fn as_u32(self) -> u32 {
        u32::from_le_bytes([self.blend_op, self.src_alpha, self.dest_alpha, self.flags])
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// An 8-bit RGBA color as produced by palette lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// True if the color channels are all zero, whatever the alpha.
    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Normalized color channels with alpha forced to 0.
    pub fn to_rgb0(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            0.0,
        ]
    }
}

/// Polygon offset applied to subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBias {
    pub factor: f32,
    pub units: f32,
}

impl DepthBias {
    pub fn is_zero(&self) -> bool {
        self.factor == 0.0 && self.units == 0.0
    }
}

/// Primitive topology for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Topology {
    Points = 0,
    Lines = 1,
    Triangles = 2,
    TriangleFan = 3,
    TriangleStrip = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DepthFunc {
    Less = 0,
    LEqual = 1,
    Always = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StencilOp {
    Keep = 0,
    Increment = 1,
    Decrement = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CullMode {
    None = 0,
    Ccw = 1,
    Cw = 2,
}

impl Default for CullMode {
    fn default() -> Self {
        Self::None
    }
}

bitflags! {
    /// Mask side effects of [set_stencil](crate::RenderState::set_stencil).
    pub struct StencilFlags: u32 {
        const COLOR_MASK_OFF = 0x1;
        const DEPTH_MASK_OFF = 0x2;
    }
}

bitflags! {
    /// Framebuffer attachments cleared by [clear](crate::RenderState::clear).
    pub struct ClearTargets: u32 {
        const DEPTH   = 0x1;
        const STENCIL = 0x2;
        const COLOR   = 0x4;
    }
}

/// Special full-screen or surface effects that replace normal shader selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SpecialEffect {
    None = 0,
    FogBoundary = 1,
    SphereMap = 2,
    Burn = 3,
    Stencil = 4,
}

impl Default for SpecialEffect {
    fn default() -> Self {
        Self::None
    }
}
