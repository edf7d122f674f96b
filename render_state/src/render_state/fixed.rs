//! Fixed-function state that is not buffered but sent to the device immediately.

#![allow(missing_docs)]

use crate::{
    device::GraphicsDevice,
    gl,
    shader::ShaderManager,
    style::{ClearTargets, CullMode, DepthFunc, StencilFlags, StencilOp},
    tables,
};

use super::RenderState;

const DRAW_BUFFERS: [u32; 3] = [
    gl::COLOR_ATTACHMENT0,
    gl::COLOR_ATTACHMENT1,
    gl::COLOR_ATTACHMENT2,
];

impl<D: GraphicsDevice, S: ShaderManager> RenderState<D, S> {
    pub(super) fn toggle(&mut self, cap: u32, on: bool) {
        if on {
            self.device.enable(cap);
        } else {
            self.device.disable(cap);
        }
    }

    /// Enables or disables depth clamping, returning whether it was enabled before.
    pub fn set_depth_clamp(&mut self, on: bool) -> bool {
        let previous = self.mirror.depth_clamp;
        self.toggle(gl::DEPTH_CLAMP, on);
        self.mirror.depth_clamp = on;
        previous
    }

    pub fn set_depth_mask(&mut self, on: bool) {
        self.device.depth_mask(on);
    }

    pub fn set_depth_func(&mut self, func: DepthFunc) {
        self.device.depth_func(tables::depth_func(func));
    }

    pub fn set_depth_range(&mut self, min: f32, max: f32) {
        self.device.depth_range(min, max);
    }

    pub fn set_color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.device.color_mask(r, g, b, a);
    }

    /// Tests against the stencil value `stencil_base + offset` and applies `op` where
    /// the test and depth test pass. The sum wraps on overflow.
    ///
    /// With `flags`, the color and depth masks are also set from them.
    pub fn set_stencil(&mut self, offset: i32, op: StencilOp, flags: Option<StencilFlags>) {
        self.device
            .stencil_func(gl::EQUAL, self.config.stencil_base.wrapping_add(offset), !0);
        self.device
            .stencil_op(gl::KEEP, gl::KEEP, tables::stencil_op(op));

        if let Some(flags) = flags {
            let color = !flags.contains(StencilFlags::COLOR_MASK_OFF);
            self.device.color_mask(color, color, color, color);
            self.device
                .depth_mask(!flags.contains(StencilFlags::DEPTH_MASK_OFF));
        }
    }

    pub fn set_culling(&mut self, mode: CullMode) {
        match mode {
            CullMode::None => self.device.disable(gl::CULL_FACE),
            CullMode::Ccw | CullMode::Cw => {
                self.device.enable(gl::CULL_FACE);
                let front = if mode == CullMode::Ccw { gl::CCW } else { gl::CW };
                self.device.front_face(front);
            }
        }
    }

    pub fn enable_clip_distance(&mut self, num: u32, on: bool) {
        self.toggle(gl::CLIP_DISTANCE0 + num, on);
    }

    /// Clears the given attachments to depth 1, stencil 0 and opaque black.
    pub fn clear(&mut self, targets: ClearTargets) {
        let mut mask = 0;
        if targets.contains(ClearTargets::DEPTH) {
            mask |= gl::DEPTH_BUFFER_BIT;
            self.device.clear_depth(1.0);
        }
        if targets.contains(ClearTargets::STENCIL) {
            mask |= gl::STENCIL_BUFFER_BIT;
            self.device.clear_stencil(0);
        }
        if targets.contains(ClearTargets::COLOR) {
            mask |= gl::COLOR_BUFFER_BIT;
            self.device.clear_color(0.0, 0.0, 0.0, 1.0);
        }
        self.device.clear(mask);
    }

    pub fn enable_stencil(&mut self, on: bool) {
        self.toggle(gl::STENCIL_TEST, on);
    }

    /// Restricts drawing to a rectangle. A width of -1 or less disables the scissor
    /// test.
    pub fn set_scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width > -1 {
            self.device.enable(gl::SCISSOR_TEST);
            self.device.scissor(x, y, width, height);
        } else {
            self.device.disable(gl::SCISSOR_TEST);
        }
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.device.viewport(x, y, width, height);
    }

    pub fn enable_depth_test(&mut self, on: bool) {
        self.toggle(gl::DEPTH_TEST, on);
    }

    pub fn enable_multisampling(&mut self, on: bool) {
        self.toggle(gl::MULTISAMPLE, on);
    }

    pub fn enable_line_smooth(&mut self, on: bool) {
        self.toggle(gl::LINE_SMOOTH, on);
    }

    /// Sets the number of color attachments written, up to the configured maximum.
    pub fn enable_draw_buffers(&mut self, count: u32, apply: bool) {
        let count = count
            .min(self.config.max_draw_buffers)
            .min(DRAW_BUFFERS.len() as u32);
        if self.mirror.draw_buffers != count {
            self.device.draw_buffers(&DRAW_BUFFERS[..count as usize]);
            self.mirror.draw_buffers = count;
        }
        if apply {
            self.apply();
        }
    }

    /// Fills the viewport with black using the currently bound full-screen quad.
    pub fn clear_screen(&mut self) {
        let multisample = self.device.is_enabled(gl::MULTISAMPLE);

        self.set_color(0.0, 0.0, 0.0, 1.0);
        self.apply();

        self.device.disable(gl::MULTISAMPLE);
        self.device.disable(gl::DEPTH_TEST);
        self.device.draw_arrays(gl::TRIANGLE_STRIP, 0, 4);
        self.device.enable(gl::DEPTH_TEST);
        if multisample {
            self.device.enable(gl::MULTISAMPLE);
        }
    }
}
