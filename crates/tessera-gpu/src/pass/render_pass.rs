use crate::error::{ensure_precondition, Result};
use crate::megastate::Color;
use crate::resource::{Bindings, InputState, QueryPool, RenderPipeline, RenderTarget, Texture};

use super::command::{Command, CommandStream, DebugPointer};

// ── descriptor ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttachment {
    pub target: RenderTarget,
    /// Single-sample texture the target is resolved (or copied) into at the
    /// end of the pass.
    pub resolve_to: Option<Texture>,
    /// Clear color, or `None` to keep the previous contents.
    pub clear: Option<Color>,
}

impl ColorAttachment {
    pub fn new(target: &RenderTarget) -> Self {
        Self {
            target: target.clone(),
            resolve_to: None,
            clear: None,
        }
    }

    pub fn cleared(target: &RenderTarget, color: Color) -> Self {
        Self {
            clear: Some(color),
            ..Self::new(target)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilAttachment {
    pub target: RenderTarget,
    pub resolve_to: Option<Texture>,
    pub depth_clear: Option<f32>,
    pub stencil_clear: Option<u8>,
}

impl DepthStencilAttachment {
    pub fn new(target: &RenderTarget) -> Self {
        Self {
            target: target.clone(),
            resolve_to: None,
            depth_clear: None,
            stencil_clear: None,
        }
    }
}

/// Attachments and load behavior of a render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPassDescriptor {
    /// Slot `i` renders to draw buffer `i`; `None` leaves a hole.
    pub color_attachments: Vec<Option<ColorAttachment>>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
    pub occlusion_query_pool: Option<QueryPool>,
}

/// Size and sample count shared by all attachments of a pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttachmentExtent {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

impl RenderPassDescriptor {
    pub fn new(color_attachments: Vec<Option<ColorAttachment>>) -> Self {
        Self {
            color_attachments,
            ..Self::default()
        }
    }

    /// All render targets, color first.
    pub fn targets(&self) -> impl Iterator<Item = &RenderTarget> {
        self.color_attachments
            .iter()
            .flatten()
            .map(|a| &a.target)
            .chain(self.depth_stencil_attachment.iter().map(|a| &a.target))
    }

    /// All resolve textures.
    pub fn resolve_textures(&self) -> impl Iterator<Item = &Texture> {
        self.color_attachments
            .iter()
            .flatten()
            .filter_map(|a| a.resolve_to.as_ref())
            .chain(self.depth_stencil_attachment.iter().filter_map(|a| a.resolve_to.as_ref()))
    }

    /// Checks attachment consistency and returns the shared extent, or
    /// `None` for a pass without attachments.
    pub fn validate(&self, max_color_attachments: u32) -> Result<Option<AttachmentExtent>> {
        ensure_precondition!(
            self.color_attachments.len() as u32 <= max_color_attachments,
            "{} color attachments requested, limit is {max_color_attachments}",
            self.color_attachments.len()
        );

        let mut extent: Option<AttachmentExtent> = None;
        for target in self.targets() {
            target.ensure_alive()?;
            let this = AttachmentExtent {
                width: target.width(),
                height: target.height(),
                sample_count: target.sample_count(),
            };
            match extent {
                None => extent = Some(this),
                Some(first) => ensure_precondition!(
                    first == this,
                    "attachment {} is {}x{}x{}, expected {}x{}x{}",
                    target.0.base.label(),
                    this.width,
                    this.height,
                    this.sample_count,
                    first.width,
                    first.height,
                    first.sample_count
                ),
            }
        }

        if let Some(depth) = &self.depth_stencil_attachment {
            ensure_precondition!(
                depth.target.format().is_depth(),
                "{:?} is not a depth/stencil format",
                depth.target.format()
            );
            ensure_precondition!(!depth.target.is_onscreen(), "the onscreen texture has no depth attachment");
        }
        for attachment in self.color_attachments.iter().flatten() {
            ensure_precondition!(
                !attachment.target.format().is_depth(),
                "{:?} cannot be a color attachment",
                attachment.target.format()
            );
        }

        for texture in self.resolve_textures() {
            texture.0.base.ensure_alive()?;
            if let Some(e) = extent {
                ensure_precondition!(
                    texture.width() == e.width && texture.height() == e.height,
                    "resolve texture {} is {}x{}, attachments are {}x{}",
                    texture.0.base.label(),
                    texture.width(),
                    texture.height(),
                    e.width,
                    e.height
                );
            }
        }
        if let Some(pool) = &self.occlusion_query_pool {
            pool.0.base.ensure_alive()?;
        }
        Ok(extent)
    }
}

// ── pass ──────────────────────────────────────────────────────────────────

/// Recorded render pass.
///
/// Obtained from [`Device::create_render_pass`](crate::Device::create_render_pass)
/// and consumed by [`Device::submit_pass`](crate::Device::submit_pass).
/// Encoder calls only record; nothing reaches the native context before
/// submission.
#[derive(Debug)]
pub struct RenderPass {
    pub(crate) device_id: u64,
    pub(crate) descriptor: RenderPassDescriptor,
    pub(crate) extent: Option<AttachmentExtent>,
    pub(crate) stream: CommandStream,
}

impl RenderPass {
    pub(crate) fn empty() -> Self {
        Self {
            device_id: 0,
            descriptor: RenderPassDescriptor::default(),
            extent: None,
            stream: CommandStream::default(),
        }
    }

    /// Rearms a pooled pass for a new recording.
    pub(crate) fn begin(&mut self, device_id: u64, descriptor: RenderPassDescriptor, extent: Option<AttachmentExtent>) {
        self.stream.reset();
        self.device_id = device_id;
        self.extent = extent;
        self.descriptor = descriptor.clone();
        self.stream.push(Command::SetRenderPassParameters(descriptor));
    }

    /// Drops references to recorded objects; keeps the stream allocations.
    pub(crate) fn reset(&mut self) {
        self.stream.reset();
        self.descriptor = RenderPassDescriptor::default();
        self.extent = None;
        self.device_id = 0;
    }

    pub fn descriptor(&self) -> &RenderPassDescriptor {
        &self.descriptor
    }

    /// Width and height of the attachments, if any.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.extent.map(|e| (e.width, e.height))
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.stream.push(Command::SetViewport { x, y, width, height });
    }

    /// Enables the scissor test for the given rectangle. The test is reset
    /// at the start of every pass.
    pub fn set_scissor(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.stream.push(Command::SetScissor { x, y, width, height });
    }

    pub fn set_pipeline(&mut self, pipeline: &RenderPipeline) {
        self.stream.push(Command::SetPipeline(pipeline.clone()));
    }

    /// Binds `bindings` to `group`. `dynamic_byte_offsets` holds one offset
    /// per uniform buffer, added to the binding's own offset.
    pub fn set_bindings(&mut self, group: u32, bindings: &Bindings, dynamic_byte_offsets: &[u32]) -> Result<()> {
        let expected = bindings.layout().num_uniform_buffers as usize;
        ensure_precondition!(
            dynamic_byte_offsets.len() == expected,
            "bindings {} need {expected} dynamic offsets, got {}",
            bindings.0.base.label(),
            dynamic_byte_offsets.len()
        );
        self.stream.push(Command::SetBindings {
            group,
            bindings: bindings.clone(),
            dynamic_byte_offsets: dynamic_byte_offsets.to_vec(),
        });
        Ok(())
    }

    pub fn set_input_state(&mut self, input_state: Option<&InputState>) {
        self.stream.push(Command::SetInputState(input_state.cloned()));
    }

    pub fn set_stencil_ref(&mut self, value: u8) {
        self.stream.push(Command::SetStencilRef(value));
    }

    pub fn set_debug_pointer(&mut self, pointer: DebugPointer) {
        self.stream.push(Command::SetDebugPointer(pointer));
    }

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.stream.push(Command::Draw { vertex_count, first_vertex });
    }

    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32) {
        self.stream.push(Command::DrawIndexed { index_count, first_index });
    }

    pub fn draw_indexed_instanced(&mut self, index_count: u32, first_index: u32, instance_count: u32) {
        self.stream.push(Command::DrawIndexedInstanced { index_count, first_index, instance_count });
    }

    /// Starts occlusion query `index` of the pass's query pool.
    pub fn begin_occlusion_query(&mut self, index: u32) {
        self.stream.push(Command::BeginOcclusionQuery(index));
    }

    pub fn end_occlusion_query(&mut self) {
        self.stream.push(Command::EndOcclusionQuery);
    }

    pub(crate) fn end(&mut self) {
        if !self.stream.is_ended() {
            self.stream.push(Command::End);
        }
    }
}
