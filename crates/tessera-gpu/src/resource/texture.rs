use std::cell::Cell;
use std::rc::Rc;

use crate::format::Format;
use crate::gl::{consts as gl, GlTexture};

use super::{ResourceBase, ResourceId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    D2Array,
    D3,
    Cube,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const RENDER_TARGET = 1 << 1;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub dimension: TextureDimension,
    pub pixel_format: Format,
    pub width: u32,
    pub height: u32,
    /// Depth for 3D textures, layer count for arrays, 6 for cubes.
    pub depth_or_array_layers: u32,
    pub mip_level_count: u32,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    pub fn new_2d(pixel_format: Format, width: u32, height: u32, mip_level_count: u32) -> Self {
        Self {
            dimension: TextureDimension::D2,
            pixel_format,
            width,
            height,
            depth_or_array_layers: 1,
            mip_level_count,
            usage: TextureUsage::SAMPLED,
        }
    }

    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }
}

#[derive(Debug)]
pub(crate) struct TextureInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: TextureDescriptor,
    /// `None` for the onscreen texture, which is the default framebuffer.
    pub(crate) gl_texture: Option<GlTexture>,
    pub(crate) gl_target: u32,
    pub(crate) immutable: bool,
    pub(crate) npot: bool,
    pub(crate) mipmaps_generated: Cell<bool>,
    /// Sampler whose parameters were last written to this texture (WebGL1).
    pub(crate) last_sampler: Cell<Option<ResourceId>>,
}

/// Sampled image.
#[derive(Debug, Clone)]
pub struct Texture(pub(crate) Rc<TextureInner>);

resource_handle!(Texture, destroy_texture);

impl Texture {
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.0.descriptor
    }

    pub fn width(&self) -> u32 {
        self.0.descriptor.width
    }

    pub fn height(&self) -> u32 {
        self.0.descriptor.height
    }

    pub fn format(&self) -> Format {
        self.0.descriptor.pixel_format
    }

    pub fn mip_level_count(&self) -> u32 {
        self.0.descriptor.mip_level_count
    }

    pub fn is_immutable(&self) -> bool {
        self.0.immutable
    }

    /// Width or height is not a power of two.
    pub fn is_npot(&self) -> bool {
        self.0.npot
    }

    pub fn mipmaps_generated(&self) -> bool {
        self.0.mipmaps_generated.get()
    }

    /// The swap-chain texture (renders to the default framebuffer).
    pub fn is_onscreen(&self) -> bool {
        self.0.gl_texture.is_none()
    }

    pub(crate) fn gl_texture(&self) -> Option<GlTexture> {
        self.0.gl_texture
    }

    pub(crate) fn gl_target(&self) -> u32 {
        self.0.gl_target
    }
}

pub(crate) fn texture_target(dimension: TextureDimension) -> u32 {
    match dimension {
        TextureDimension::D2 => gl::TEXTURE_2D,
        TextureDimension::D2Array => gl::TEXTURE_2D_ARRAY,
        TextureDimension::D3 => gl::TEXTURE_3D,
        TextureDimension::Cube => gl::TEXTURE_CUBE_MAP,
    }
}

pub(crate) fn is_npot(width: u32, height: u32) -> bool {
    !width.is_power_of_two() || !height.is_power_of_two()
}

/// Size of `level` along one axis.
pub(crate) fn mip_size(size: u32, level: u32) -> u32 {
    (size >> level).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npot_detection() {
        assert!(!is_npot(256, 64));
        assert!(is_npot(100, 64));
        assert!(is_npot(64, 3));
    }

    #[test]
    fn mip_sizes_clamp_to_one() {
        assert_eq!(mip_size(256, 0), 256);
        assert_eq!(mip_size(256, 3), 32);
        assert_eq!(mip_size(5, 4), 1);
    }

    #[test]
    fn targets() {
        assert_eq!(texture_target(TextureDimension::Cube), gl::TEXTURE_CUBE_MAP);
        assert_eq!(texture_target(TextureDimension::D2Array), gl::TEXTURE_2D_ARRAY);
    }
}
