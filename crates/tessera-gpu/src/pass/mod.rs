//! Render pass recording.

pub mod command;
mod pool;
mod render_pass;

pub use command::{Command, DebugPointer};
pub(crate) use pool::RenderPassPool;
pub use render_pass::{AttachmentExtent, ColorAttachment, DepthStencilAttachment, RenderPass, RenderPassDescriptor};
