use std::rc::Rc;

use crate::format::Format;
use crate::gl::GlRenderbuffer;

use super::texture::Texture;
use super::ResourceBase;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderTargetDescriptor {
    pub pixel_format: Format,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

impl RenderTargetDescriptor {
    pub fn new(pixel_format: Format, width: u32, height: u32) -> Self {
        Self {
            pixel_format,
            width,
            height,
            sample_count: 1,
        }
    }
}

/// What a render target draws into.
#[derive(Debug)]
pub(crate) enum RenderTargetBacking {
    /// Owned renderbuffer, multisampled when `sample_count > 1`.
    Renderbuffer(GlRenderbuffer),
    /// Level 0 of a texture owned by the caller.
    Texture(Texture),
}

#[derive(Debug)]
pub(crate) struct RenderTargetInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: RenderTargetDescriptor,
    pub(crate) backing: RenderTargetBacking,
}

/// Attachment of a render pass.
#[derive(Debug, Clone)]
pub struct RenderTarget(pub(crate) Rc<RenderTargetInner>);

resource_handle!(RenderTarget, destroy_render_target);

impl RenderTarget {
    pub fn descriptor(&self) -> &RenderTargetDescriptor {
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

    pub fn sample_count(&self) -> u32 {
        self.0.descriptor.sample_count
    }

    /// Backing texture, if the target wraps one.
    pub fn texture(&self) -> Option<&Texture> {
        match &self.0.backing {
            RenderTargetBacking::Texture(t) => Some(t),
            RenderTargetBacking::Renderbuffer(_) => None,
        }
    }

    /// Draws into the default framebuffer.
    pub fn is_onscreen(&self) -> bool {
        self.texture().is_some_and(Texture::is_onscreen)
    }

    pub(crate) fn backing(&self) -> &RenderTargetBacking {
        &self.0.backing
    }

    /// The target and anything it wraps are still alive.
    pub(crate) fn ensure_alive(&self) -> crate::error::Result<()> {
        self.0.base.ensure_alive()?;
        if let Some(texture) = self.texture() {
            texture.0.base.ensure_alive()?;
        }
        Ok(())
    }
}
