//! Fixed lookup tables from selectors to GL enum values.

#![allow(missing_docs)]

use crate::{
    gl,
    style::{DepthFunc, RenderStyle, StencilOp, StyleAlpha, Topology},
};

const BLEND_FACTORS: [u32; StyleAlpha::COUNT as usize] = [
    gl::ZERO,
    gl::ONE,
    gl::SRC_ALPHA,
    gl::ONE_MINUS_SRC_ALPHA,
    gl::SRC_COLOR,
    gl::ONE_MINUS_SRC_COLOR,
    gl::DST_COLOR,
    gl::ONE_MINUS_DST_COLOR,
    gl::DST_ALPHA,
    gl::ONE_MINUS_DST_ALPHA,
];

// None entries are fuzz styles.
const BLEND_EQUATIONS: [Option<u32>; 16] = [
    Some(0),
    Some(gl::FUNC_ADD),
    Some(gl::FUNC_SUBTRACT),
    Some(gl::FUNC_REVERSE_SUBTRACT),
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
];

const TOPOLOGIES: [u32; 5] = [
    gl::POINTS,
    gl::LINES,
    gl::TRIANGLES,
    gl::TRIANGLE_FAN,
    gl::TRIANGLE_STRIP,
];

const DEPTH_FUNCS: [u32; 3] = [gl::LESS, gl::LEQUAL, gl::ALWAYS];

const STENCIL_OPS: [u32; 3] = [gl::KEEP, gl::INCR, gl::DECR];

/// Device blend function and equation for a render style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src: u32,
    pub dst: u32,
    pub equation: u32,
}

impl BlendState {
    /// The state every fuzz style uses.
    pub const FUZZ: Self = Self {
        src: gl::DST_COLOR,
        dst: gl::ONE_MINUS_SRC_ALPHA,
        equation: gl::FUNC_ADD,
    };
}

/// Looks up the blend state for `style`.
///
/// Selectors outside their tables are a caller bug and assert in debug builds; release
/// builds wrap them into range.
pub fn blend_state(style: RenderStyle) -> BlendState {
    debug_assert!(
        style.src_alpha < StyleAlpha::COUNT && style.dest_alpha < StyleAlpha::COUNT,
        "blend factor selector out of range: {:?}",
        style
    );
    debug_assert!(style.blend_op < 16, "blend op out of range: {:?}", style);

    let src = BLEND_FACTORS[(style.src_alpha % StyleAlpha::COUNT) as usize];
    let dst = BLEND_FACTORS[(style.dest_alpha % StyleAlpha::COUNT) as usize];
    match BLEND_EQUATIONS[(style.blend_op & 15) as usize] {
        Some(equation) => BlendState { src, dst, equation },
        None => BlendState::FUZZ,
    }
}

pub fn topology(t: Topology) -> u32 {
    TOPOLOGIES[t as usize]
}

pub fn depth_func(f: DepthFunc) -> u32 {
    DEPTH_FUNCS[f as usize]
}

pub fn stencil_op(op: StencilOp) -> u32 {
    STENCIL_OPS[op as usize]
}
