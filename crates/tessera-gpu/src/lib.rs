//! Tessera GPU device layer.
//!
//! A backend-agnostic device API (buffers, textures, samplers, programs,
//! pipelines, render passes, readbacks, queries) translated onto WebGL1 and
//! WebGL2 contexts. Rendering is recorded into [`RenderPass`] command streams
//! and replayed through a state cache that only issues the native calls
//! needed to move from the current state to the requested one.

pub mod caps;
pub mod config;
pub mod device;
pub mod error;
pub mod format;
pub mod gl;
pub mod leak;
pub mod logging;
pub mod megastate;
pub mod pass;
pub mod resource;

pub use caps::{Capabilities, DeviceLimits, VendorInfo};
pub use config::DeviceConfig;
pub use device::Device;
pub use error::{ErrorKind, GpuError, Result};
pub use format::Format;
pub use leak::LeakReport;
pub use logging::{init_logging, LoggingConfig};
pub use megastate::{
    AttachmentState, BlendFactor, BlendMode, ChannelBlendState, ChannelWriteMask, Color, CompareFunction, CullMode,
    FrontFace, MegaStateDescriptor, StencilOp,
};
pub use pass::{ColorAttachment, DebugPointer, DepthStencilAttachment, RenderPass, RenderPassDescriptor};
pub use resource::{
    AddressMode, BindingLayoutDescriptor, Bindings, BindingsDescriptor, Buffer, BufferBinding, BufferDescriptor,
    BufferFrequencyHint, BufferUsage, ComputePipeline, ComputePipelineDescriptor, FilterMode, IndexBufferBinding,
    InputLayout, InputLayoutBufferDescriptor, InputLayoutDescriptor, InputState, MipmapFilterMode, PrimitiveTopology,
    Program, ProgramCompileState, ProgramDescriptor, QueryPool, QueryPoolType, Readback, ReadbackFuture, RenderPipeline,
    RenderPipelineDescriptor, RenderTarget, RenderTargetDescriptor, Resource, ResourceId, ResourceType, Sampler,
    SamplerBinding, SamplerDescriptor, Texture, TextureDescriptor, TextureDimension, TextureUsage,
    VertexAttributeDescriptor, VertexBufferBinding, VertexStepMode,
};
