use std::rc::Rc;

use crate::format::Format;
use crate::megastate::MegaStateDescriptor;

use super::binding_layout::{BindingLayoutDescriptor, BindingLayoutTable};
use super::input::InputLayout;
use super::program::{Program, ProgramCompileState};
use super::ResourceBase;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPipelineDescriptor {
    pub program: Program,
    pub topology: PrimitiveTopology,
    pub mega_state: MegaStateDescriptor,
    /// One entry per bind group, in group order.
    pub binding_layouts: Vec<BindingLayoutDescriptor>,
    pub input_layout: Option<InputLayout>,
    pub color_attachment_formats: Vec<Option<Format>>,
    pub depth_stencil_attachment_format: Option<Format>,
    pub sample_count: u32,
}

impl RenderPipelineDescriptor {
    /// Triangle list with default state, one color attachment and no
    /// vertex input.
    pub fn new(program: &Program, color_format: Format) -> Self {
        Self {
            program: program.clone(),
            topology: PrimitiveTopology::Triangles,
            mega_state: MegaStateDescriptor::default(),
            binding_layouts: Vec::new(),
            input_layout: None,
            color_attachment_formats: vec![Some(color_format)],
            depth_stencil_attachment_format: None,
            sample_count: 1,
        }
    }
}

#[derive(Debug)]
pub(crate) struct RenderPipelineInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: RenderPipelineDescriptor,
    pub(crate) binding_table: BindingLayoutTable,
    /// `drawArrays` / `drawElements` mode.
    pub(crate) draw_mode: u32,
}

#[derive(Debug, Clone)]
pub struct RenderPipeline(pub(crate) Rc<RenderPipelineInner>);

resource_handle!(RenderPipeline, destroy_render_pipeline);

impl RenderPipeline {
    pub fn descriptor(&self) -> &RenderPipelineDescriptor {
        &self.0.descriptor
    }

    pub fn program(&self) -> &Program {
        &self.0.descriptor.program
    }

    pub fn mega_state(&self) -> &MegaStateDescriptor {
        &self.0.descriptor.mega_state
    }

    pub fn binding_table(&self) -> &BindingLayoutTable {
        &self.0.binding_table
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            self.0.descriptor.program.compile_state(),
            ProgramCompileState::NeedsBind | ProgramCompileState::ReadyToUse
        )
    }

    pub(crate) fn draw_mode(&self) -> u32 {
        self.0.draw_mode
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputePipelineDescriptor {
    pub program: Program,
    pub binding_layouts: Vec<BindingLayoutDescriptor>,
}

#[derive(Debug)]
pub(crate) struct ComputePipelineInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: ComputePipelineDescriptor,
}

/// A compute program and its layout. WebGL cannot dispatch it.
#[derive(Debug, Clone)]
pub struct ComputePipeline(pub(crate) Rc<ComputePipelineInner>);

resource_handle!(ComputePipeline, destroy_compute_pipeline);

impl ComputePipeline {
    pub fn program(&self) -> &Program {
        &self.0.descriptor.program
    }

    pub fn binding_layouts(&self) -> &[BindingLayoutDescriptor] {
        &self.0.descriptor.binding_layouts
    }
}
