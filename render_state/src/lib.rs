//! Render state tracking for a stateful graphics API.
//!
//! Drawing code describes the state it wants through [RenderState]. Before each draw
//! the engine compares that against a mirror of the device state and issues only the
//! calls that actually change something. The device itself is abstracted by
//! [GraphicsDevice]; [RecordingDevice] records calls instead of issuing them.
//!
//! Shader programs and materials are owned elsewhere and reached through the
//! [ShaderManager] and [Material] traits. [ShaderLibrary] and [MaterialCache] are
//! simple implementations of those boundaries.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub use buffers::BufferBinding;
pub use config::*;
pub use device::*;
pub use error::*;
pub use material::*;
pub use render_state::*;
pub use shader::{
    ShaderContainer, ShaderId, ShaderLibrary, ShaderManager, ShaderProgram, ShaderVariants,
    UniformLocations, VariantKey, DLIGHT_UNIFORM_LIGHT_MODE, NO_TEXTURE_EFFECT_STATE,
};
pub use style::*;
pub use tables::BlendState;
pub use tracked::*;

mod buffers;
mod config;
pub mod device;
mod error;
pub mod gl;
pub mod material;
mod render_state;
pub mod shader;
pub mod style;
pub mod tables;
#[cfg(test)]
mod test_util;
mod tracked;
