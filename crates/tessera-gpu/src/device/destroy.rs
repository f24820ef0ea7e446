//! Resource teardown.
//!
//! Every `destroy_*` flags the resource, unregisters it from leak tracking,
//! deletes its native objects and drops any cache entry that still refers
//! to them. Destroying twice is a precondition error.

use crate::error::{ensure_precondition, Result};
use crate::resource::render_target::RenderTargetBacking;
use crate::resource::{
    Bindings, Buffer, ComputePipeline, InputLayout, InputState, Program, QueryPool, Readback, RenderPipeline,
    RenderTarget, ResourceBase, Sampler, Texture,
};

use super::Device;

impl Device {
    fn retire(&mut self, base: &ResourceBase) -> Result<()> {
        base.mark_destroyed()?;
        self.tracker.untrack(base.id());
        Ok(())
    }

    pub(crate) fn destroy_buffer(&mut self, buffer: &Buffer) -> Result<()> {
        self.retire(&buffer.0.base)?;
        let mut ctx = self.ctx.borrow_mut();
        for native in buffer.native_pages() {
            ctx.delete_buffer(native);
            self.state.forget_buffer(native);
        }
        Ok(())
    }

    pub(crate) fn destroy_texture(&mut self, texture: &Texture) -> Result<()> {
        ensure_precondition!(!texture.is_onscreen(), "the onscreen texture is owned by the device");
        self.retire(&texture.0.base)?;
        if let Some(native) = texture.gl_texture() {
            self.ctx.borrow_mut().delete_texture(native);
            self.state.forget_texture(native);
            if self.read_attachment == Some(native) {
                self.read_attachment = None;
            }
        }
        Ok(())
    }

    pub(crate) fn destroy_sampler(&mut self, sampler: &Sampler) -> Result<()> {
        self.retire(&sampler.0.base)?;
        if let Some(native) = sampler.gl_sampler() {
            self.ctx.borrow_mut().delete_sampler(native);
            self.state.forget_sampler(native);
        }
        Ok(())
    }

    pub(crate) fn destroy_program(&mut self, program: &Program) -> Result<()> {
        self.retire(&program.0.base)?;
        if let Some(native) = program.release_native(&mut *self.ctx.borrow_mut()) {
            self.state.forget_program(native);
        }
        Ok(())
    }

    pub(crate) fn destroy_bindings(&mut self, bindings: &Bindings) -> Result<()> {
        self.retire(&bindings.0.base)
    }

    pub(crate) fn destroy_input_layout(&mut self, layout: &InputLayout) -> Result<()> {
        self.retire(&layout.0.base)
    }

    pub(crate) fn destroy_input_state(&mut self, state: &InputState) -> Result<()> {
        self.retire(&state.0.base)?;
        if let Some(vao) = state.vao() {
            self.ctx.borrow_mut().delete_vertex_array(vao);
            self.state.forget_vertex_array(vao);
        }
        Ok(())
    }

    pub(crate) fn destroy_render_pipeline(&mut self, pipeline: &RenderPipeline) -> Result<()> {
        self.retire(&pipeline.0.base)
    }

    pub(crate) fn destroy_compute_pipeline(&mut self, pipeline: &ComputePipeline) -> Result<()> {
        self.retire(&pipeline.0.base)
    }

    /// Texture-backed targets leave their texture alive.
    pub(crate) fn destroy_render_target(&mut self, target: &RenderTarget) -> Result<()> {
        self.retire(&target.0.base)?;
        if let RenderTargetBacking::Renderbuffer(rb) = target.backing() {
            self.ctx.borrow_mut().delete_renderbuffer(*rb);
            self.state.forget_renderbuffer(*rb);
        }
        Ok(())
    }

    pub(crate) fn destroy_query_pool(&mut self, pool: &QueryPool) -> Result<()> {
        self.retire(&pool.0.base)?;
        let mut ctx = self.ctx.borrow_mut();
        for query in &pool.0.queries {
            ctx.delete_query(*query);
        }
        Ok(())
    }

    /// A future still waiting on this readback resolves to an error.
    pub(crate) fn destroy_readback(&mut self, readback: &Readback) -> Result<()> {
        self.retire(&readback.0.base)?;
        if let Some(buffer) = readback.pack_buffer() {
            self.ctx.borrow_mut().delete_buffer(buffer);
        }
        Ok(())
    }
}
