use std::rc::Rc;

use crate::gl::GlSampler;
use crate::megastate::CompareFunction;

use super::ResourceBase;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MipmapFilterMode {
    NoMip,
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub wrap_s: AddressMode,
    pub wrap_t: AddressMode,
    pub wrap_r: AddressMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mipmap_filter: MipmapFilterMode,
    pub min_lod: f32,
    pub max_lod: f32,
    /// Ignored without `EXT_texture_filter_anisotropic`.
    pub max_anisotropy: u16,
    /// Depth comparison sampling (WebGL2).
    pub compare_function: Option<CompareFunction>,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            wrap_s: AddressMode::ClampToEdge,
            wrap_t: AddressMode::ClampToEdge,
            wrap_r: AddressMode::ClampToEdge,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mipmap_filter: MipmapFilterMode::NoMip,
            min_lod: 0.0,
            max_lod: 100.0,
            max_anisotropy: 1,
            compare_function: None,
        }
    }
}

impl SamplerDescriptor {
    /// Parameters usable on a WebGL1 NPOT texture: edge clamping and no
    /// mipmap filtering.
    pub(crate) fn npot_compatible(&self) -> Self {
        Self {
            wrap_s: AddressMode::ClampToEdge,
            wrap_t: AddressMode::ClampToEdge,
            wrap_r: AddressMode::ClampToEdge,
            mipmap_filter: MipmapFilterMode::NoMip,
            ..*self
        }
    }
}

#[derive(Debug)]
pub(crate) struct SamplerInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: SamplerDescriptor,
    /// Native sampler object; `None` on WebGL1 where the parameters are
    /// written to each bound texture instead.
    pub(crate) gl_sampler: Option<GlSampler>,
}

#[derive(Debug, Clone)]
pub struct Sampler(pub(crate) Rc<SamplerInner>);

resource_handle!(Sampler, destroy_sampler);

impl Sampler {
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.0.descriptor
    }

    pub(crate) fn gl_sampler(&self) -> Option<GlSampler> {
        self.0.gl_sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npot_forces_clamp_and_no_mips() {
        let d = SamplerDescriptor {
            wrap_s: AddressMode::Repeat,
            wrap_t: AddressMode::MirroredRepeat,
            mipmap_filter: MipmapFilterMode::Linear,
            mag_filter: FilterMode::Nearest,
            ..SamplerDescriptor::default()
        };
        let n = d.npot_compatible();
        assert_eq!(n.wrap_s, AddressMode::ClampToEdge);
        assert_eq!(n.wrap_t, AddressMode::ClampToEdge);
        assert_eq!(n.mipmap_filter, MipmapFilterMode::NoMip);
        assert_eq!(n.mag_filter, FilterMode::Nearest);
    }
}
