//! Vertex and index buffer bindings.

use crate::device::{BufferId, GraphicsDevice};

/// The buffers drawing code wants bound for the next draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferBinding {
    /// Vertex buffer. Must be set before any draw that applies state.
    pub vertex: Option<BufferId>,
    /// Byte offset into the vertex buffer for each of the two binding points.
    pub offsets: [i32; 2],
    #[allow(missing_docs)]
    pub index: Option<BufferId>,
}

/// The buffers last bound on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct BufferMirror {
    vertex: Option<BufferId>,
    offsets: [i32; 2],
    index: Option<BufferId>,
}

impl BufferMirror {
    /// Binds whatever in `requested` differs from what is bound.
    ///
    /// Panics if the vertex binding changed to no buffer at all.
    pub(crate) fn apply(&mut self, device: &mut impl GraphicsDevice, requested: &BufferBinding) {
        if requested.vertex != self.vertex || requested.offsets != self.offsets {
            let buffer = requested
                .vertex
                .expect("vertex binding changed without a vertex buffer");
            device.bind_vertex_buffer(buffer, requested.offsets);
            self.vertex = Some(buffer);
            self.offsets = requested.offsets;
        }
        if requested.index != self.index {
            if let Some(buffer) = requested.index {
                device.bind_index_buffer(buffer);
            }
            self.index = requested.index;
        }
    }

    /// Forgets both bound buffers so the next apply rebinds them.
    pub(crate) fn forget(&mut self) {
        self.vertex = None;
        self.index = None;
    }
}
