//! Render pass replay.
//!
//! A submitted pass is read front to back exactly once. Every state change
//! goes through the cache; draws apply the pending viewport right before
//! they are issued.

use crate::error::{ensure_precondition, ensure_supported, GpuError, Result};
use crate::format::translate::{
    depth_stencil_attachment, translate_address_mode, translate_mag_filter, translate_min_filter,
};
use crate::gl::{consts as gl, GlContext};
use crate::pass::{Command, RenderPass, RenderPassDescriptor};
use crate::resource::binding_layout::BindingLayoutTableEntry;
use crate::resource::buffer::BufferPage;
use crate::resource::render_target::RenderTargetBacking;
use crate::resource::{
    Bindings, InputState, MipmapFilterMode, Program, ProgramCompileState, QueryPool, RenderPipeline, RenderTarget,
    Resource, Sampler, Texture,
};

use super::cache::AttachedImage;
use super::create::apply_attribute;
use super::Device;

/// Per-submission replay state.
#[derive(Default)]
struct Replay {
    pipeline: Option<RenderPipeline>,
    input_state: Option<InputState>,
    /// Viewport applied at the next draw.
    viewport: [i32; 4],
    size: (u32, u32),
    descriptor: Option<RenderPassDescriptor>,
    query_pool: Option<QueryPool>,
    /// Target of the occlusion query in progress.
    open_query: Option<u32>,
    /// Bindings per group, re-applied when an emulated-UBO pipeline changes.
    groups: Vec<Option<(Bindings, Vec<u32>)>>,
}

impl Device {
    /// Replays `pass` on the native context and returns it to the pool.
    ///
    /// Passes recorded for another device are rejected untouched.
    pub fn submit_pass(&mut self, mut pass: RenderPass) -> Result<()> {
        ensure_precondition!(
            pass.device_id == self.id,
            "render pass was created by device {}, submitted to device {}",
            pass.device_id,
            self.id
        );
        pass.end();
        self.debug_pointer = None;

        let result = self.replay(&pass);
        self.pass_pool.release(pass);
        if let Err(e) = &result {
            match &self.debug_pointer {
                Some(pointer) => log::error!("render pass failed after {pointer:?}: {e}"),
                None => log::error!("render pass failed: {e}"),
            }
        }
        result
    }

    fn replay(&mut self, pass: &RenderPass) -> Result<()> {
        let ctx_handle = self.context();
        let mut guard = ctx_handle.borrow_mut();
        let ctx = &mut *guard;
        let mut replay = Replay::default();

        for command in pass.stream.reader() {
            match command? {
                Command::SetRenderPassParameters(descriptor) => self.begin_pass(ctx, &mut replay, descriptor)?,
                Command::SetViewport { x, y, width, height } => {
                    replay.viewport = [x.round() as i32, y.round() as i32, width.round() as i32, height.round() as i32];
                }
                Command::SetScissor { x, y, width, height } => {
                    self.state.set_scissor_enabled(ctx, true);
                    self.state
                        .set_scissor(ctx, [x.round() as i32, y.round() as i32, width.round() as i32, height.round() as i32]);
                }
                Command::SetPipeline(pipeline) => self.set_pipeline(ctx, &mut replay, pipeline)?,
                Command::SetBindings { group, bindings, dynamic_byte_offsets } => {
                    self.set_bindings(ctx, &mut replay, group, bindings, dynamic_byte_offsets)?;
                }
                Command::SetInputState(state) => self.set_input_state(ctx, &mut replay, state)?,
                Command::SetStencilRef(value) => self.state.set_stencil_ref(ctx, value),
                Command::SetDebugPointer(pointer) => self.debug_pointer = Some(pointer),
                Command::Draw { vertex_count, first_vertex } => {
                    let mode = self.prepare_draw(ctx, &replay)?;
                    ctx.draw_arrays(mode, first_vertex as i32, vertex_count as i32);
                }
                Command::DrawIndexed { index_count, first_index } => {
                    let mode = self.prepare_draw(ctx, &replay)?;
                    let (ty, offset) = index_offset(&replay, first_index)?;
                    ctx.draw_elements(mode, index_count as i32, ty, offset);
                }
                Command::DrawIndexedInstanced { index_count, first_index, instance_count } => {
                    ensure_supported!(self.caps.instancing, "instanced draws need ANGLE_instanced_arrays");
                    let mode = self.prepare_draw(ctx, &replay)?;
                    let (ty, offset) = index_offset(&replay, first_index)?;
                    ctx.draw_elements_instanced(mode, index_count as i32, ty, offset, instance_count as i32);
                }
                Command::BeginOcclusionQuery(index) => {
                    ensure_precondition!(replay.open_query.is_none(), "occlusion queries cannot nest");
                    let Some(pool) = &replay.query_pool else {
                        return Err(GpuError::Precondition("pass has no occlusion query pool".into()));
                    };
                    pool.base().ensure_alive()?;
                    let query = pool.query(index).ok_or_else(|| {
                        GpuError::Precondition(format!("query {index} is out of range for a pool of {}", pool.len()))
                    })?;
                    let target = pool.query_type().gl_target();
                    ctx.begin_query(target, query);
                    replay.open_query = Some(target);
                }
                Command::EndOcclusionQuery => {
                    let Some(target) = replay.open_query.take() else {
                        return Err(GpuError::Precondition("no occlusion query in progress".into()));
                    };
                    ctx.end_query(target);
                }
                Command::End => {
                    self.end_pass(ctx, &mut replay)?;
                    break;
                }
            }
        }
        Ok(())
    }

    // ── pass parameters ──────────────────────────────────────────────────

    fn begin_pass(&mut self, ctx: &mut dyn GlContext, replay: &mut Replay, descriptor: RenderPassDescriptor) -> Result<()> {
        let extent = descriptor.validate(self.limits.max_color_attachments)?;
        let onscreen = descriptor.targets().any(RenderTarget::is_onscreen);
        ensure_precondition!(
            !onscreen || descriptor.targets().all(RenderTarget::is_onscreen),
            "a pass cannot mix the onscreen texture with offscreen targets"
        );
        let size = match extent {
            Some(e) => (e.width, e.height),
            None => (self.onscreen.width(), self.onscreen.height()),
        };

        if onscreen {
            self.state.bind_draw_framebuffer(ctx, None);
        } else {
            self.state.bind_draw_framebuffer(ctx, Some(self.render_framebuffer));
            let slots = self.limits.max_color_attachments.max(1) as usize;
            let mut draw_buffers = Vec::with_capacity(descriptor.color_attachments.len().max(1));
            for i in 0..slots {
                let image = descriptor
                    .color_attachments
                    .get(i)
                    .and_then(Option::as_ref)
                    .and_then(|a| attached_image(&a.target));
                self.state.attach_color(ctx, i, image);
                if i < descriptor.color_attachments.len() {
                    draw_buffers.push(if image.is_some() { gl::COLOR_ATTACHMENT0 + i as u32 } else { gl::NONE });
                }
            }
            if draw_buffers.is_empty() {
                draw_buffers.push(gl::NONE);
            }
            self.state.set_draw_buffers(ctx, &draw_buffers);

            let depth = descriptor.depth_stencil_attachment.as_ref().and_then(|a| {
                attached_image(&a.target).map(|image| (depth_stencil_attachment(a.target.format()), image))
            });
            self.state.attach_depth_stencil(ctx, depth);

            let target = if self.caps.webgl2 { gl::DRAW_FRAMEBUFFER } else { gl::FRAMEBUFFER };
            let status = ctx.check_framebuffer_status(target);
            ensure_supported!(
                status == gl::FRAMEBUFFER_COMPLETE,
                "attachment combination is not renderable (status {status:#x})"
            );
        }

        self.state.set_scissor_enabled(ctx, false);
        self.clear_attachments(ctx, &descriptor);

        *replay = Replay {
            viewport: [0, 0, size.0 as i32, size.1 as i32],
            size,
            query_pool: descriptor.occlusion_query_pool.clone(),
            descriptor: Some(descriptor),
            ..Replay::default()
        };
        Ok(())
    }

    fn clear_attachments(&mut self, ctx: &mut dyn GlContext, descriptor: &RenderPassDescriptor) {
        let mut mask = 0;

        if self.caps.webgl2 {
            for (i, attachment) in descriptor.color_attachments.iter().enumerate() {
                if let Some(color) = attachment.as_ref().and_then(|a| a.clear) {
                    self.state.force_color_write_for_clear(ctx, i);
                    ctx.clear_buffer_fv(gl::COLOR, i as i32, &color.to_array());
                }
            }
        } else {
            let mut colors = descriptor.color_attachments.iter().flatten().filter_map(|a| a.clear);
            if let Some(color) = colors.next() {
                if colors.any(|c| c != color) {
                    log::warn!("WebGL1 clears every draw buffer to the first clear color");
                }
                for i in 0..descriptor.color_attachments.len().max(1) {
                    self.state.force_color_write_for_clear(ctx, i);
                }
                ctx.clear_color(color.r, color.g, color.b, color.a);
                mask |= gl::COLOR_BUFFER_BIT;
            }
        }

        if let Some(ds) = &descriptor.depth_stencil_attachment {
            if let Some(depth) = ds.depth_clear {
                self.state.force_depth_write(ctx);
                ctx.clear_depth(depth);
                mask |= gl::DEPTH_BUFFER_BIT;
            }
            if let Some(stencil) = ds.stencil_clear {
                if ds.target.format().has_stencil() {
                    self.state.force_stencil_write(ctx);
                    ctx.clear_stencil(stencil as i32);
                    mask |= gl::STENCIL_BUFFER_BIT;
                }
            }
        }

        if mask != 0 {
            ctx.clear(mask);
        }
    }

    // ── pipeline ─────────────────────────────────────────────────────────

    fn set_pipeline(&mut self, ctx: &mut dyn GlContext, replay: &mut Replay, pipeline: RenderPipeline) -> Result<()> {
        pipeline.base().ensure_alive()?;
        let program = pipeline.program();
        program.base().ensure_alive()?;

        let mut state = program.compile_state();
        if state == ProgramCompileState::Compiling {
            state = program.advance(ctx, self.caps.parallel_shader_compile, self.config.shader_debug);
        }
        ensure_precondition!(
            matches!(state, ProgramCompileState::NeedsBind | ProgramCompileState::ReadyToUse),
            "pipeline {} bound while its program is {state:?}",
            pipeline.0.base.label()
        );
        if state == ProgramCompileState::NeedsBind {
            self.finish_bind(ctx, program)?;
        }

        self.state.use_program(ctx, program.gl_program());
        self.state.apply_mega_state(ctx, pipeline.mega_state());
        replay.pipeline = Some(pipeline.clone());

        if !self.caps.uniform_buffers {
            // Emulated blocks are program uniforms; the new program needs
            // the bound data again.
            let groups = std::mem::take(&mut replay.groups);
            for (group, bound) in groups.iter().enumerate() {
                let Some((bindings, offsets)) = bound else { continue };
                if let Some(entry) = matching_entry(&pipeline, group as u32, bindings) {
                    self.apply_uniform_buffers(ctx, &pipeline, &entry, bindings, offsets)?;
                }
            }
            replay.groups = groups;
        }
        Ok(())
    }

    /// Resolves block bindings and sampler units of a freshly compiled
    /// program and marks it ready.
    fn finish_bind(&mut self, ctx: &mut dyn GlContext, program: &Program) -> Result<()> {
        let Some(native) = program.gl_program() else {
            return Err(GpuError::Native(format!("program {} has no native object", program.0.base.label())));
        };
        let bindings = program.scan_bindings();

        if self.caps.uniform_buffers {
            for (binding, name) in bindings.uniform_blocks.iter().enumerate() {
                let index = ctx.uniform_block_index(native, name);
                if index != gl::INVALID_INDEX {
                    ctx.uniform_block_binding(native, index, binding as u32);
                }
            }
        } else {
            let locations = bindings
                .uniform_blocks
                .iter()
                .map(|name| ctx.uniform_location(native, name))
                .collect();
            program.set_emulated_blocks(locations);
        }

        self.state.use_program(ctx, Some(native));
        for (sampler, first_unit) in bindings.sampler_units() {
            if let Some(location) = ctx.uniform_location(native, &sampler.name) {
                let units: Vec<i32> = (first_unit..first_unit.saturating_add(sampler.array_size)).map(|u| u as i32).collect();
                ctx.uniform_1iv(location, &units);
            }
        }

        program.set_state(ProgramCompileState::ReadyToUse);
        log::debug!(
            "program {} bound: {} block(s), {} sampler unit(s)",
            program.0.base.label(),
            bindings.uniform_blocks.len(),
            bindings.num_sampler_units()
        );
        Ok(())
    }

    // ── bindings ─────────────────────────────────────────────────────────

    fn set_bindings(
        &mut self,
        ctx: &mut dyn GlContext,
        replay: &mut Replay,
        group: u32,
        bindings: Bindings,
        dynamic_byte_offsets: Vec<u32>,
    ) -> Result<()> {
        bindings.base().ensure_alive()?;
        let Some(pipeline) = replay.pipeline.clone() else {
            return Err(GpuError::Precondition("bindings set before a pipeline".into()));
        };
        let Some(entry) = matching_entry(&pipeline, group, &bindings) else {
            return Err(GpuError::Precondition(format!(
                "bindings {} do not match group {group} of pipeline {}",
                bindings.0.base.label(),
                pipeline.0.base.label()
            )));
        };

        self.apply_uniform_buffers(ctx, &pipeline, &entry, &bindings, &dynamic_byte_offsets)?;
        self.apply_samplers(ctx, &entry, &bindings)?;

        let slot = group as usize;
        if replay.groups.len() <= slot {
            replay.groups.resize(slot + 1, None);
        }
        replay.groups[slot] = Some((bindings, dynamic_byte_offsets));
        Ok(())
    }

    fn apply_uniform_buffers(
        &mut self,
        ctx: &mut dyn GlContext,
        pipeline: &RenderPipeline,
        entry: &BindingLayoutTableEntry,
        bindings: &Bindings,
        dynamic_byte_offsets: &[u32],
    ) -> Result<()> {
        let count = entry.num_uniform_buffers as usize;
        for (i, binding) in bindings.uniform_buffer_bindings()[..count].iter().enumerate() {
            let Some(buffer) = &binding.buffer else { continue };
            buffer.base().ensure_alive()?;
            let slot = entry.first_uniform_buffer + i as u32;
            let dynamic = dynamic_byte_offsets.get(i).copied().unwrap_or(0);
            let Some(offset) = binding.byte_offset.checked_add(dynamic) else {
                return Err(GpuError::Precondition(format!(
                    "uniform buffer offset {} + dynamic offset {dynamic} overflows",
                    binding.byte_offset
                )));
            };
            let (page, in_page) = buffer.page_range(offset, binding.byte_size)?;

            match buffer.page(page) {
                Some(BufferPage::Native(native)) => {
                    let alignment = self.limits.uniform_buffer_offset_alignment;
                    ensure_precondition!(
                        in_page % alignment == 0,
                        "uniform buffer offset {offset} is not a multiple of {alignment}"
                    );
                    self.state
                        .bind_uniform_buffer_range(ctx, slot, *native, in_page as i32, binding.byte_size as i32);
                }
                Some(BufferPage::Shadow(shadow)) => {
                    ensure_precondition!(
                        binding.byte_size % 16 == 0 && in_page % 16 == 0,
                        "emulated uniform ranges are whole vec4s, got {}+{}",
                        offset,
                        binding.byte_size
                    );
                    if let Some(location) = pipeline.program().emulated_block_location(slot) {
                        let shadow = shadow.borrow();
                        let start = in_page as usize;
                        let bytes = &shadow[start..start + binding.byte_size as usize];
                        let values: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
                        ctx.uniform_4fv(location, &values);
                    }
                }
                None => return Err(GpuError::Native(format!("buffer page {page} is missing"))),
            }
        }
        Ok(())
    }

    fn apply_samplers(&mut self, ctx: &mut dyn GlContext, entry: &BindingLayoutTableEntry, bindings: &Bindings) -> Result<()> {
        let count = entry.num_samplers as usize;
        for (i, binding) in bindings.sampler_bindings()[..count].iter().enumerate() {
            let unit = entry.first_sampler + i as u32;
            let Some(texture) = &binding.texture else {
                self.state.bind_texture(ctx, unit, gl::TEXTURE_2D, None);
                continue;
            };
            texture.base().ensure_alive()?;
            let Some(native) = texture.gl_texture() else {
                return Err(GpuError::Precondition("the onscreen texture cannot be sampled".into()));
            };
            self.state.bind_texture(ctx, unit, texture.gl_target(), Some(native));

            match &binding.sampler {
                Some(sampler) => {
                    sampler.base().ensure_alive()?;
                    if self.caps.sampler_objects {
                        self.state.bind_sampler(ctx, unit, sampler.gl_sampler());
                    } else {
                        self.state.active_texture(ctx, unit);
                        self.apply_sampler_parameters(ctx, texture, sampler);
                    }
                }
                None => self.state.bind_sampler(ctx, unit, None),
            }
        }
        Ok(())
    }

    /// Writes sampler parameters to the texture bound on the active unit
    /// (contexts without sampler objects).
    fn apply_sampler_parameters(&self, ctx: &mut dyn GlContext, texture: &Texture, sampler: &Sampler) {
        if texture.0.last_sampler.get() == Some(sampler.id()) {
            return;
        }
        let mut d = if texture.is_npot() {
            sampler.descriptor().npot_compatible()
        } else {
            *sampler.descriptor()
        };
        if texture.mip_level_count() == 1 {
            d.mipmap_filter = MipmapFilterMode::NoMip;
        }

        let target = texture.gl_target();
        ctx.tex_parameter_i32(target, gl::TEXTURE_WRAP_S, translate_address_mode(d.wrap_s) as i32);
        ctx.tex_parameter_i32(target, gl::TEXTURE_WRAP_T, translate_address_mode(d.wrap_t) as i32);
        ctx.tex_parameter_i32(target, gl::TEXTURE_MIN_FILTER, translate_min_filter(d.min_filter, d.mipmap_filter) as i32);
        ctx.tex_parameter_i32(target, gl::TEXTURE_MAG_FILTER, translate_mag_filter(d.mag_filter) as i32);
        if self.caps.anisotropic_filtering && d.max_anisotropy > 1 {
            ctx.tex_parameter_f32(target, gl::TEXTURE_MAX_ANISOTROPY_EXT, d.max_anisotropy as f32);
        }
        texture.0.last_sampler.set(Some(sampler.id()));
    }

    // ── vertex input ─────────────────────────────────────────────────────

    fn set_input_state(&mut self, ctx: &mut dyn GlContext, replay: &mut Replay, state: Option<InputState>) -> Result<()> {
        match &state {
            Some(input) => {
                input.base().ensure_alive()?;
                match input.vao() {
                    Some(vao) => self.state.bind_vertex_array(ctx, Some(vao)),
                    None => self.replay_attributes(ctx, input),
                }
            }
            None if self.caps.vertex_arrays => self.state.bind_vertex_array(ctx, None),
            None => self.disable_attributes(ctx, 0),
        }
        replay.input_state = state;
        Ok(())
    }

    /// Re-issues the attribute setup of an input state without a VAO.
    fn replay_attributes(&mut self, ctx: &mut dyn GlContext, input: &InputState) {
        let mut enabled = 0u32;
        for setup in &input.0.attributes {
            apply_attribute(ctx, setup);
            if setup.divisor == 0 && self.caps.instancing {
                ctx.vertex_attrib_divisor(setup.location, 0);
            }
            enabled |= 1u32.checked_shl(setup.location).unwrap_or(0);
        }
        self.disable_attributes(ctx, enabled);
        ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, input.0.index_gl_buffer);
    }

    /// Disables every enabled attribute not in `keep`.
    fn disable_attributes(&mut self, ctx: &mut dyn GlContext, keep: u32) {
        let stale = self.enabled_attributes & !keep;
        for location in (0..32).filter(|l| stale & (1 << l) != 0) {
            ctx.disable_vertex_attrib_array(location);
        }
        self.enabled_attributes = keep;
    }

    // ── draws ────────────────────────────────────────────────────────────

    /// Applies the pending viewport and returns the draw mode.
    fn prepare_draw(&mut self, ctx: &mut dyn GlContext, replay: &Replay) -> Result<u32> {
        let Some(pipeline) = &replay.pipeline else {
            return Err(GpuError::Precondition("draw without a pipeline".into()));
        };
        self.state.set_viewport(ctx, replay.viewport);
        Ok(pipeline.draw_mode())
    }

    // ── end of pass ──────────────────────────────────────────────────────

    fn end_pass(&mut self, ctx: &mut dyn GlContext, replay: &mut Replay) -> Result<()> {
        if let Some(target) = replay.open_query.take() {
            log::warn!("occlusion query still open at the end of the pass");
            ctx.end_query(target);
        }
        let Some(descriptor) = replay.descriptor.take() else {
            return Ok(());
        };

        for attachment in descriptor.color_attachments.iter().flatten() {
            if let Some(texture) = &attachment.resolve_to {
                self.resolve(ctx, &attachment.target, texture, gl::COLOR_BUFFER_BIT, gl::COLOR_ATTACHMENT0, replay.size)?;
            }
        }
        if let Some(ds) = &descriptor.depth_stencil_attachment {
            if let Some(texture) = &ds.resolve_to {
                let format = ds.target.format();
                let mask = if format.has_stencil() {
                    gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT
                } else {
                    gl::DEPTH_BUFFER_BIT
                };
                self.resolve(ctx, &ds.target, texture, mask, depth_stencil_attachment(format), replay.size)?;
            }
        }
        Ok(())
    }

    /// Blits `source` into `dest` through the read and resolve
    /// framebuffers, detaching both afterwards.
    fn resolve(
        &mut self,
        ctx: &mut dyn GlContext,
        source: &RenderTarget,
        dest: &Texture,
        mask: u32,
        point: u32,
        size: (u32, u32),
    ) -> Result<()> {
        dest.base().ensure_alive()?;
        let Some(resolve_framebuffer) = self.resolve_framebuffer else {
            return Err(GpuError::Unsupported("resolves need WebGL2".into()));
        };

        let source_image = attached_image(source);
        match source_image {
            None => self.state.bind_read_framebuffer(ctx, None),
            Some(image) => {
                self.state.bind_read_framebuffer(ctx, Some(self.read_framebuffer));
                attach_image(ctx, gl::READ_FRAMEBUFFER, point, image, true);
                self.read_attachment = None;
            }
        }
        let dest_image = dest.gl_texture().map(|texture| AttachedImage::Texture {
            target: dest.gl_target(),
            texture,
        });
        match dest_image {
            None => self.state.bind_draw_framebuffer(ctx, None),
            Some(image) => {
                self.state.bind_draw_framebuffer(ctx, Some(resolve_framebuffer));
                attach_image(ctx, gl::DRAW_FRAMEBUFFER, point, image, true);
            }
        }

        let rect = [0, 0, size.0 as i32, size.1 as i32];
        ctx.blit_framebuffer(rect, rect, mask, gl::NEAREST);

        if let Some(image) = source_image {
            attach_image(ctx, gl::READ_FRAMEBUFFER, point, image, false);
        }
        if let Some(image) = dest_image {
            attach_image(ctx, gl::DRAW_FRAMEBUFFER, point, image, false);
        }
        Ok(())
    }
}

/// Image behind a render target; `None` for the onscreen texture.
fn attached_image(target: &RenderTarget) -> Option<AttachedImage> {
    match target.backing() {
        RenderTargetBacking::Renderbuffer(rb) => Some(AttachedImage::Renderbuffer(*rb)),
        RenderTargetBacking::Texture(texture) => texture.gl_texture().map(|native| AttachedImage::Texture {
            target: texture.gl_target(),
            texture: native,
        }),
    }
}

/// Attaches (or detaches) `image` at `point` of the framebuffer bound to
/// `target`, bypassing the render framebuffer mirror.
fn attach_image(ctx: &mut dyn GlContext, target: u32, point: u32, image: AttachedImage, attach: bool) {
    match image {
        AttachedImage::Texture { target: tex_target, texture } => {
            ctx.framebuffer_texture_2d(target, point, tex_target, attach.then_some(texture), 0);
        }
        AttachedImage::Renderbuffer(rb) => ctx.framebuffer_renderbuffer(target, point, attach.then_some(rb)),
    }
}

/// Table entry of `group` when its counts match `bindings`.
fn matching_entry(pipeline: &RenderPipeline, group: u32, bindings: &Bindings) -> Option<BindingLayoutTableEntry> {
    let entry = *pipeline.binding_table().entry(group)?;
    let layout = bindings.layout();
    (entry.num_uniform_buffers == layout.num_uniform_buffers && entry.num_samplers == layout.num_samplers)
        .then_some(entry)
}

/// Index type and byte offset of `first_index` in the bound index buffer.
fn index_offset(replay: &Replay, first_index: u32) -> Result<(u32, i32)> {
    let (ty, stride, offset) = replay
        .input_state
        .as_ref()
        .and_then(InputState::index_info)
        .ok_or_else(|| GpuError::Precondition("indexed draw without an index buffer".into()))?;
    let byte_offset = offset as u64 + first_index as u64 * stride as u64;
    let byte_offset = i32::try_from(byte_offset).map_err(|_| {
        GpuError::Precondition(format!("first index {first_index} puts the index offset out of range"))
    })?;
    Ok((ty, byte_offset))
}
