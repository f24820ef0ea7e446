//! Resource handles.
//!
//! Every resource is a cheap-clone handle around an `Rc` inner value that
//! carries a [`ResourceBase`] and the state the device needs to re-issue
//! native calls. Handles compare by identity. The device owns the native
//! objects; callers release them with [`Resource::destroy`].

/// Implements identity equality and [`Resource`] for a handle whose inner
/// value has a `base` field. `$destroy` is the device method releasing it.
macro_rules! resource_handle {
    ($handle:ident, $destroy:ident) => {
        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                std::rc::Rc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $handle {}

        impl $crate::resource::Resource for $handle {
            fn base(&self) -> &$crate::resource::ResourceBase {
                &self.0.base
            }

            fn destroy(&self, device: &mut $crate::device::Device) -> $crate::error::Result<()> {
                device.$destroy(self)
            }
        }
    };
}

pub mod binding_layout;
pub mod bindings;
pub mod buffer;
pub mod input;
pub mod pipeline;
pub mod program;
pub mod query_pool;
pub mod readback;
pub mod render_target;
pub mod sampler;
pub mod shader_scan;
pub mod texture;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::device::Device;
use crate::error::{ensure_precondition, Result};

pub use binding_layout::{BindingLayoutDescriptor, BindingLayoutTable, BindingLayoutTableEntry};
pub use bindings::{Bindings, BindingsDescriptor, BufferBinding, SamplerBinding};
pub use buffer::{Buffer, BufferDescriptor, BufferFrequencyHint, BufferUsage};
pub use input::{
    IndexBufferBinding, InputLayout, InputLayoutBufferDescriptor, InputLayoutDescriptor, InputState,
    VertexAttributeDescriptor, VertexBufferBinding, VertexStepMode,
};
pub use pipeline::{ComputePipeline, ComputePipelineDescriptor, PrimitiveTopology, RenderPipeline, RenderPipelineDescriptor};
pub use program::{Program, ProgramCompileState, ProgramDescriptor};
pub use query_pool::{QueryPool, QueryPoolType};
pub use readback::{Readback, ReadbackFuture};
pub use render_target::{RenderTarget, RenderTargetDescriptor};
pub use sampler::{AddressMode, FilterMode, MipmapFilterMode, Sampler, SamplerDescriptor};
pub use shader_scan::{scan_shader_bindings, ShaderBindings, ShaderSampler};
pub use texture::{Texture, TextureDescriptor, TextureDimension, TextureUsage};

static NEXT_RESOURCE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique resource identifier. Never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl ResourceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Buffer,
    Texture,
    RenderTarget,
    Sampler,
    Program,
    Bindings,
    InputLayout,
    InputState,
    RenderPipeline,
    ComputePipeline,
    Readback,
    QueryPool,
}

/// Identity and lifetime state shared by every resource kind.
#[derive(Debug)]
pub struct ResourceBase {
    id: ResourceId,
    ty: ResourceType,
    name: RefCell<Option<String>>,
    destroyed: Cell<bool>,
}

impl ResourceBase {
    pub(crate) fn new(ty: ResourceType) -> Self {
        Self {
            id: ResourceId::next(),
            ty,
            name: RefCell::new(None),
            destroyed: Cell::new(false),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.ty
    }

    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub(crate) fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = Some(name.to_string());
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Fails when the resource was already destroyed.
    pub(crate) fn ensure_alive(&self) -> Result<()> {
        ensure_precondition!(!self.destroyed.get(), "{:?} {} used after destroy", self.ty, self.label());
        Ok(())
    }

    /// Flags the resource destroyed. A second call is a precondition error.
    pub(crate) fn mark_destroyed(&self) -> Result<()> {
        ensure_precondition!(!self.destroyed.get(), "{:?} {} destroyed twice", self.ty, self.label());
        self.destroyed.set(true);
        Ok(())
    }

    pub(crate) fn label(&self) -> String {
        match &*self.name.borrow() {
            Some(name) => format!("{} ({name})", self.id),
            None => self.id.to_string(),
        }
    }
}

/// Operations shared by every resource handle.
pub trait Resource {
    fn base(&self) -> &ResourceBase;

    fn id(&self) -> ResourceId {
        self.base().id()
    }

    fn name(&self) -> Option<String> {
        self.base().name()
    }

    fn resource_type(&self) -> ResourceType {
        self.base().resource_type()
    }

    fn is_destroyed(&self) -> bool {
        self.base().is_destroyed()
    }

    /// Releases the native objects behind this resource.
    ///
    /// Must be called exactly once, on the device that created it.
    fn destroy(&self, device: &mut Device) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let a = ResourceBase::new(ResourceType::Buffer);
        let b = ResourceBase::new(ResourceType::Texture);
        assert!(b.id() > a.id());
    }

    #[test]
    fn double_destroy_is_precondition() {
        let base = ResourceBase::new(ResourceType::Sampler);
        assert!(base.mark_destroyed().is_ok());
        let err = base.mark_destroyed().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
        assert!(base.ensure_alive().is_err());
    }

    #[test]
    fn label_includes_name() {
        let base = ResourceBase::new(ResourceType::Program);
        base.set_name("blit");
        assert!(base.label().ends_with("(blit)"));
        assert_eq!(base.name().as_deref(), Some("blit"));
    }
}
