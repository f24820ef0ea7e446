use std::rc::Rc;

use super::binding_layout::BindingLayoutDescriptor;
use super::buffer::Buffer;
use super::sampler::Sampler;
use super::texture::Texture;
use super::ResourceBase;

/// A uniform buffer range bound to one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferBinding {
    pub buffer: Option<Buffer>,
    pub byte_offset: u32,
    pub byte_size: u32,
}

impl BufferBinding {
    pub fn new(buffer: &Buffer, byte_offset: u32, byte_size: u32) -> Self {
        Self {
            buffer: Some(buffer.clone()),
            byte_offset,
            byte_size,
        }
    }
}

/// A texture and sampler bound to one unit. Missing halves unbind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplerBinding {
    pub texture: Option<Texture>,
    pub sampler: Option<Sampler>,
}

impl SamplerBinding {
    pub fn new(texture: &Texture, sampler: &Sampler) -> Self {
        Self {
            texture: Some(texture.clone()),
            sampler: Some(sampler.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingsDescriptor {
    pub binding_layout: BindingLayoutDescriptor,
    pub uniform_buffer_bindings: Vec<BufferBinding>,
    pub sampler_bindings: Vec<SamplerBinding>,
}

#[derive(Debug)]
pub(crate) struct BindingsInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: BindingsDescriptor,
}

/// Resources of one bind group.
#[derive(Debug, Clone)]
pub struct Bindings(pub(crate) Rc<BindingsInner>);

resource_handle!(Bindings, destroy_bindings);

impl Bindings {
    pub fn layout(&self) -> BindingLayoutDescriptor {
        self.0.descriptor.binding_layout
    }

    pub fn uniform_buffer_bindings(&self) -> &[BufferBinding] {
        &self.0.descriptor.uniform_buffer_bindings
    }

    pub fn sampler_bindings(&self) -> &[SamplerBinding] {
        &self.0.descriptor.sampler_bindings
    }
}
