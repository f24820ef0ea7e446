//! Vertex input: layouts and bound buffer sets.

use std::rc::Rc;

use crate::format::translate::NativeVertexFormat;
use crate::format::Format;
use crate::gl::{GlBuffer, GlVertexArray};

use super::buffer::Buffer;
use super::ResourceBase;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    /// Needs instancing support.
    Instance,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttributeDescriptor {
    pub location: u32,
    pub format: Format,
    pub buffer_index: u32,
    pub buffer_byte_offset: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InputLayoutBufferDescriptor {
    pub byte_stride: u32,
    pub step_mode: VertexStepMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputLayoutDescriptor {
    pub vertex_attribute_descriptors: Vec<VertexAttributeDescriptor>,
    /// Indexed by `buffer_index`; `None` leaves a hole.
    pub vertex_buffer_descriptors: Vec<Option<InputLayoutBufferDescriptor>>,
    pub index_buffer_format: Option<Format>,
}

#[derive(Debug)]
pub(crate) struct InputLayoutInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: InputLayoutDescriptor,
    /// Translated attribute formats, parallel to the attribute descriptors.
    pub(crate) native_formats: Vec<NativeVertexFormat>,
    /// `drawElements` type and bytes per index.
    pub(crate) index_type: Option<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct InputLayout(pub(crate) Rc<InputLayoutInner>);

resource_handle!(InputLayout, destroy_input_layout);

impl InputLayout {
    pub fn descriptor(&self) -> &InputLayoutDescriptor {
        &self.0.descriptor
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferBinding {
    pub buffer: Buffer,
    pub byte_offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBufferBinding {
    pub buffer: Buffer,
    pub byte_offset: u32,
}

/// One `vertexAttribPointer` setup, replayed on bind without VAOs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct AttributeSetup {
    pub(crate) location: u32,
    pub(crate) buffer: GlBuffer,
    pub(crate) format: NativeVertexFormat,
    pub(crate) stride: i32,
    pub(crate) offset: i32,
    pub(crate) divisor: u32,
}

#[derive(Debug)]
pub(crate) struct InputStateInner {
    pub(crate) base: ResourceBase,
    pub(crate) layout: InputLayout,
    pub(crate) vertex_buffers: Vec<Option<VertexBufferBinding>>,
    pub(crate) index_buffer: Option<IndexBufferBinding>,
    /// Prebuilt VAO, when the context has them.
    pub(crate) vao: Option<GlVertexArray>,
    /// Attribute setup for contexts without VAOs.
    pub(crate) attributes: Vec<AttributeSetup>,
    pub(crate) index_gl_buffer: Option<GlBuffer>,
    pub(crate) index_type: Option<u32>,
    pub(crate) index_stride: u32,
    pub(crate) index_byte_offset: u32,
}

/// Buffers bound to an input layout.
#[derive(Debug, Clone)]
pub struct InputState(pub(crate) Rc<InputStateInner>);

resource_handle!(InputState, destroy_input_state);

impl InputState {
    pub fn layout(&self) -> &InputLayout {
        &self.0.layout
    }

    pub fn vertex_buffers(&self) -> &[Option<VertexBufferBinding>] {
        &self.0.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&IndexBufferBinding> {
        self.0.index_buffer.as_ref()
    }

    pub(crate) fn vao(&self) -> Option<GlVertexArray> {
        self.0.vao
    }

    /// `(type, stride, byte offset)` of the bound index buffer.
    pub(crate) fn index_info(&self) -> Option<(u32, u32, u32)> {
        self.0
            .index_type
            .map(|ty| (ty, self.0.index_stride, self.0.index_byte_offset))
    }
}
