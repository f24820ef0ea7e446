use crate::caps::{Capabilities, DeviceLimits, VendorInfo};
use crate::error::{GpuError, Result};
use crate::format::translate::is_texture_format_supported;
use crate::format::Format;
use crate::pass::{RenderPass, RenderPassDescriptor};
use crate::resource::{Program, ProgramCompileState, ProgramDescriptor, QueryPool, RenderPipeline, RenderTarget, RenderTargetDescriptor};

use super::Device;

impl Device {
    // ── introspection ────────────────────────────────────────────────────

    pub fn query_limits(&self) -> DeviceLimits {
        self.limits
    }

    pub fn query_vendor_info(&self) -> &VendorInfo {
        &self.vendor
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// `false` once the native context is lost.
    pub fn query_platform_available(&self) -> bool {
        !self.ctx.borrow().is_context_lost()
    }

    pub fn query_texture_format_supported(&self, format: Format) -> bool {
        is_texture_format_supported(format, &self.caps)
    }

    pub fn query_render_pass<'a>(&self, pass: &'a RenderPass) -> &'a RenderPassDescriptor {
        pass.descriptor()
    }

    pub fn query_render_target<'a>(&self, target: &'a RenderTarget) -> &'a RenderTargetDescriptor {
        target.descriptor()
    }

    /// Polls the pipeline's program once and reports whether it can be
    /// bound without stalling.
    pub fn query_pipeline_ready(&mut self, pipeline: &RenderPipeline) -> Result<bool> {
        pipeline.0.base.ensure_alive()?;
        let program = pipeline.program();
        program.0.base.ensure_alive()?;
        let state = program.advance(
            &mut *self.ctx.borrow_mut(),
            self.caps.parallel_shader_compile,
            self.config.shader_debug,
        );
        Ok(matches!(state, ProgramCompileState::NeedsBind | ProgramCompileState::ReadyToUse))
    }

    /// Result of occlusion query `index`: `Some(true)` when any sample
    /// passed, `None` while the result is not available yet.
    pub fn query_occlusion_result(&mut self, pool: &QueryPool, index: u32) -> Result<Option<bool>> {
        pool.0.base.ensure_alive()?;
        let Some(query) = pool.query(index) else {
            return Err(GpuError::Precondition(format!(
                "query {index} is out of range for pool {} of {}",
                pool.0.base.label(),
                pool.len()
            )));
        };
        let mut ctx = self.ctx.borrow_mut();
        if !ctx.query_result_available(query) {
            return Ok(None);
        }
        Ok(Some(ctx.query_result(query) != 0))
    }

    // ── hot reload ───────────────────────────────────────────────────────

    /// Recompiles `program` from new sources. Pipelines using the program
    /// pick up the new code on their next bind.
    pub fn program_patched(&mut self, program: &Program, descriptor: ProgramDescriptor) -> Result<()> {
        program.0.base.ensure_alive()?;
        self.check_sampler_units(&descriptor)?;
        let mut guard = self.ctx.borrow_mut();
        let ctx = &mut *guard;
        if let Some(old) = program.release_native(ctx) {
            self.state.forget_program(old);
        }
        program.replace_sources(descriptor);
        program.compile(ctx)?;
        if !self.caps.parallel_shader_compile {
            program.advance(ctx, false, self.config.shader_debug);
        }
        log::debug!("program {} patched", program.0.base.label());
        Ok(())
    }
}
