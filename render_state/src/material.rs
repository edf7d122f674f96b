//! Materials: the texture layers bound for one drawable surface.
//!
//! The engine only sees materials through the narrow [Material] and [TextureSource]
//! traits. [LayeredMaterial] is the concrete representation, built and cached per
//! texture by [MaterialCache].

use std::{collections::HashMap, fmt, rc::Rc};

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::device::{ClampMode, GraphicsDevice, TextureId};

/// How the fragment shader interprets texel data.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum TextureMode {
    Normal = 0,
    Stencil = 1,
    Opaque = 2,
    Inverse = 3,
    AlphaTexture = 4,
    ClampY = 5,
    InvertOpaque = 6,
    FogLayer = 7,
}

impl Default for TextureMode {
    fn default() -> Self {
        Self::Normal
    }
}

bitflags! {
    /// Flags packed above the [TextureMode] in the texture mode uniform.
    #[derive(Default)]
    pub struct TextureFlags: i32 {
        const BRIGHTMAP = 0x10000;
        const DETAILMAP = 0x20000;
        const GLOWMAP   = 0x40000;
        const CLAMP_Y   = 0x80000;
    }
}

/// Parameters a material is bound with.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialBind {
    pub colormap: i32,
    pub clamp: ClampMode,
    pub translation: i32,
    pub override_shader: i32,
}

/// Read access to the texture a material was created from.
pub trait TextureSource {
    /// True if the texture is rendered to at runtime (a camera or canvas texture)
    /// rather than loaded from image data.
    fn is_render_target(&self) -> bool;
}

/// A bindable material.
///
/// Identity matters: the engine skips rebinding when the same `Rc` is requested again
/// with the same clamp mode and translation.
pub trait Material: fmt::Debug {
    /// Binds every layer to consecutive texture units starting at 0 and returns the
    /// number of units used.
    fn bind(&self, device: &mut dyn GraphicsDevice, params: &MaterialBind) -> u32;

    /// Shader family to use when the draw does not override it.
    fn shader_index(&self) -> i32 {
        0
    }

    /// Which optional layers this material provides.
    fn layer_flags(&self) -> TextureFlags {
        TextureFlags::empty()
    }

    #[allow(missing_docs)]
    fn source(&self) -> Option<&dyn TextureSource>;
}

/// Returns true if `a` and `b` are the same material object.
pub fn same_material(a: &Rc<dyn Material>, b: &Rc<dyn Material>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// A game texture and the auxiliary maps that belong to it.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Texture {
    pub id: TextureId,
    pub render_target: bool,
    pub shader_index: i32,
    pub brightmap: Option<TextureId>,
    pub detailmap: Option<TextureId>,
    pub glowmap: Option<TextureId>,
}

impl TextureSource for Texture {
    fn is_render_target(&self) -> bool {
        self.render_target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MaterialLayer {
    texture: TextureId,
    clamp: ClampMode,
}

/// A material made of a base texture followed by its optional map layers.
#[derive(Debug)]
pub struct LayeredMaterial {
    source: Rc<Texture>,
    layers: Vec<MaterialLayer>,
    layer_flags: TextureFlags,
}

impl LayeredMaterial {
    /// Builds the layer list for `source`.
    pub fn new(source: Rc<Texture>) -> Self {
        let mut layers = Vec::new();
        let mut layer_flags = TextureFlags::empty();
        for (map, flag) in [
            (source.brightmap, TextureFlags::BRIGHTMAP),
            (source.detailmap, TextureFlags::DETAILMAP),
            (source.glowmap, TextureFlags::GLOWMAP),
        ] {
            if let Some(texture) = map {
                layers.push(MaterialLayer {
                    texture,
                    clamp: ClampMode::None,
                });
                layer_flags |= flag;
            }
        }
        Self {
            source,
            layers,
            layer_flags,
        }
    }

    /// Number of texture units this material occupies.
    pub fn num_layers(&self) -> usize {
        self.layers.len() + 1
    }
}

impl Material for LayeredMaterial {
    fn bind(&self, device: &mut dyn GraphicsDevice, params: &MaterialBind) -> u32 {
        device.bind_texture(0, self.source.id, params.clamp, params.translation);
        for (i, layer) in self.layers.iter().enumerate() {
            device.bind_texture(i as u32 + 1, layer.texture, layer.clamp, 0);
        }
        self.num_layers() as u32
    }

    fn shader_index(&self) -> i32 {
        self.source.shader_index
    }

    fn layer_flags(&self) -> TextureFlags {
        self.layer_flags
    }

    fn source(&self) -> Option<&dyn TextureSource> {
        Some(self.source.as_ref())
    }
}

/// Creates materials for textures on first use and hands out the same material after.
#[derive(Debug, Default)]
pub struct MaterialCache {
    materials: HashMap<TextureId, Rc<LayeredMaterial>>,
}

impl MaterialCache {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the material for `texture`, creating it if needed.
    pub fn validate_texture(&mut self, texture: &Rc<Texture>) -> Rc<LayeredMaterial> {
        let material = self.materials.entry(texture.id).or_insert_with(|| {
            tracing::debug!("creating material for texture {:?}", texture.id);
            Rc::new(LayeredMaterial::new(Rc::clone(texture)))
        });
        Rc::clone(material)
    }

    /// Drops every cached material.
    pub fn flush(&mut self) {
        self.materials.clear();
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
