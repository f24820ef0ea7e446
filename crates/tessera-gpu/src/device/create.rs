use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{ensure_precondition, ensure_supported, GpuError, Result};
use crate::format::translate::{
    translate_address_mode, translate_compare, translate_index_format, translate_mag_filter, translate_min_filter,
    translate_renderbuffer_format, translate_texture_format, translate_topology, translate_vertex_format,
};
use crate::gl::{consts as gl, GlBuffer, GlContext};
use crate::pass::{RenderPass, RenderPassDescriptor};
use crate::resource::bindings::BindingsInner;
use crate::resource::buffer::{buffer_gl_usage, buffer_target, BufferInner, BufferPage};
use crate::resource::input::{AttributeSetup, InputLayoutInner, InputStateInner};
use crate::resource::pipeline::{ComputePipelineInner, RenderPipelineInner};
use crate::resource::query_pool::QueryPoolInner;
use crate::resource::readback::ReadbackInner;
use crate::resource::render_target::{RenderTargetBacking, RenderTargetInner};
use crate::resource::sampler::SamplerInner;
use crate::resource::texture::{is_npot, mip_size, texture_target, TextureInner};
use crate::resource::{
    BindingLayoutTable, Bindings, BindingsDescriptor, Buffer, BufferDescriptor, BufferUsage, ComputePipeline,
    ComputePipelineDescriptor, IndexBufferBinding, InputLayout, InputLayoutDescriptor, InputState, Program,
    ProgramDescriptor, QueryPool, QueryPoolType, Readback, RenderPipeline, RenderPipelineDescriptor, RenderTarget,
    RenderTargetDescriptor, ResourceBase, ResourceType, Sampler, SamplerDescriptor, Texture, TextureDescriptor,
    TextureDimension, TextureUsage, VertexBufferBinding, VertexStepMode, scan_shader_bindings,
};

use super::Device;

impl Device {
    // ── buffers ──────────────────────────────────────────────────────────

    /// Creates a buffer of `descriptor.byte_size` zeroed bytes.
    ///
    /// Uniform buffers on contexts without UBOs are emulated: their pages
    /// live in CPU memory and are uploaded as `vec4` arrays at bind time.
    pub fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<Buffer> {
        ensure_precondition!(descriptor.byte_size > 0, "buffers cannot be empty");
        ensure_precondition!(!descriptor.usage.is_empty(), "buffer usage cannot be empty");

        let uniform = descriptor.usage.contains(BufferUsage::UNIFORM);
        let emulated = uniform && !self.caps.uniform_buffers;
        let page_byte_size = if uniform {
            self.limits.uniform_buffer_page_size
        } else {
            descriptor.byte_size
        };
        let page_count = descriptor.byte_size.div_ceil(page_byte_size);
        let target = buffer_target(descriptor.usage);

        let pages = if emulated {
            (0..page_count)
                .map(|i| {
                    let len = page_len(descriptor.byte_size, page_byte_size, i);
                    BufferPage::Shadow(RefCell::new(vec![0; len as usize]))
                })
                .collect()
        } else {
            let mut guard = self.ctx.borrow_mut();
            let ctx = &mut *guard;
            if target == gl::ELEMENT_ARRAY_BUFFER {
                // Index bindings are VAO state.
                self.state.bind_vertex_array(ctx, None);
            }
            let usage = buffer_gl_usage(descriptor.hint);
            let mut pages = Vec::with_capacity(page_count as usize);
            for i in 0..page_count {
                let buffer = ctx
                    .create_buffer()
                    .ok_or_else(|| GpuError::Native("createBuffer returned null".into()))?;
                ctx.bind_buffer(target, Some(buffer));
                ctx.buffer_data_size(target, page_len(descriptor.byte_size, page_byte_size, i) as i32, usage);
                pages.push(BufferPage::Native(buffer));
            }
            ctx.bind_buffer(target, None);
            pages
        };

        let base = ResourceBase::new(ResourceType::Buffer);
        self.register(&base);
        log::debug!(
            "buffer {}: {} bytes, {:?}, {} page(s){}",
            base.id(),
            descriptor.byte_size,
            descriptor.usage,
            page_count,
            if emulated { ", emulated" } else { "" }
        );

        Ok(Buffer(Rc::new(BufferInner {
            base,
            byte_size: descriptor.byte_size,
            usage: descriptor.usage,
            hint: descriptor.hint,
            page_byte_size,
            pages,
            target,
        })))
    }

    // ── textures ─────────────────────────────────────────────────────────

    pub fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<Texture> {
        let d = descriptor;
        ensure_precondition!(d.width > 0 && d.height > 0, "texture size {}x{} is empty", d.width, d.height);
        ensure_precondition!(
            d.width.max(d.height) <= self.limits.max_texture_size,
            "texture size {}x{} exceeds the {} limit",
            d.width,
            d.height,
            self.limits.max_texture_size
        );
        ensure_precondition!(d.mip_level_count >= 1, "textures need at least one mip level");
        ensure_precondition!(d.depth_or_array_layers >= 1, "textures need at least one layer");
        match d.dimension {
            TextureDimension::D2 => {}
            TextureDimension::D2Array | TextureDimension::D3 => {
                ensure_supported!(self.caps.texture_3d, "{:?} textures need WebGL2", d.dimension);
            }
            TextureDimension::Cube => {
                ensure_precondition!(d.depth_or_array_layers == 6, "cube textures have 6 layers");
                ensure_precondition!(d.width == d.height, "cube faces must be square");
            }
        }

        let native = translate_texture_format(d.pixel_format, &self.caps)?;
        let target = texture_target(d.dimension);

        let gl_texture = {
            let mut guard = self.ctx.borrow_mut();
            let ctx = &mut *guard;
            let texture = ctx
                .create_texture()
                .ok_or_else(|| GpuError::Native("createTexture returned null".into()))?;
            self.state.bind_texture(ctx, 0, target, Some(texture));

            if self.caps.tex_storage {
                let levels = d.mip_level_count as i32;
                match d.dimension {
                    TextureDimension::D2 | TextureDimension::Cube => {
                        ctx.tex_storage_2d(target, levels, native.internal_format, d.width as i32, d.height as i32);
                    }
                    TextureDimension::D2Array | TextureDimension::D3 => ctx.tex_storage_3d(
                        target,
                        levels,
                        native.internal_format,
                        d.width as i32,
                        d.height as i32,
                        d.depth_or_array_layers as i32,
                    ),
                }
            } else if !d.pixel_format.is_compressed() {
                // WebGL1 compressed levels are allocated on upload.
                let faces = if d.dimension == TextureDimension::Cube { 6 } else { 1 };
                for level in 0..d.mip_level_count {
                    for face in 0..faces {
                        let face_target = if faces == 6 { gl::TEXTURE_CUBE_MAP_POSITIVE_X + face } else { target };
                        ctx.tex_image_2d(
                            face_target,
                            level as i32,
                            native.internal_format as i32,
                            mip_size(d.width, level) as i32,
                            mip_size(d.height, level) as i32,
                            native.format,
                            native.ty,
                            None,
                        );
                    }
                }
            }
            texture
        };

        let base = ResourceBase::new(ResourceType::Texture);
        self.register(&base);
        Ok(Texture(Rc::new(TextureInner {
            base,
            descriptor: *d,
            gl_texture: Some(gl_texture),
            gl_target: target,
            immutable: self.caps.tex_storage,
            npot: is_npot(d.width, d.height),
            mipmaps_generated: Cell::new(false),
            last_sampler: Cell::new(None),
        })))
    }

    // ── samplers ─────────────────────────────────────────────────────────

    /// Creates a sampler. On WebGL1 no native object exists; the parameters
    /// are written to textures when they are bound with this sampler.
    pub fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> Result<Sampler> {
        ensure_precondition!(
            descriptor.min_lod <= descriptor.max_lod,
            "sampler lod range {}..{} is inverted",
            descriptor.min_lod,
            descriptor.max_lod
        );

        let gl_sampler = if self.caps.sampler_objects {
            let mut ctx = self.ctx.borrow_mut();
            let s = ctx
                .create_sampler()
                .ok_or_else(|| GpuError::Native("createSampler returned null".into()))?;
            let d = descriptor;
            ctx.sampler_parameter_i32(s, gl::TEXTURE_WRAP_S, translate_address_mode(d.wrap_s) as i32);
            ctx.sampler_parameter_i32(s, gl::TEXTURE_WRAP_T, translate_address_mode(d.wrap_t) as i32);
            ctx.sampler_parameter_i32(s, gl::TEXTURE_WRAP_R, translate_address_mode(d.wrap_r) as i32);
            ctx.sampler_parameter_i32(s, gl::TEXTURE_MIN_FILTER, translate_min_filter(d.min_filter, d.mipmap_filter) as i32);
            ctx.sampler_parameter_i32(s, gl::TEXTURE_MAG_FILTER, translate_mag_filter(d.mag_filter) as i32);
            ctx.sampler_parameter_f32(s, gl::TEXTURE_MIN_LOD, d.min_lod);
            ctx.sampler_parameter_f32(s, gl::TEXTURE_MAX_LOD, d.max_lod);
            if let Some(compare) = d.compare_function {
                ctx.sampler_parameter_i32(s, gl::TEXTURE_COMPARE_MODE, gl::COMPARE_REF_TO_TEXTURE as i32);
                ctx.sampler_parameter_i32(s, gl::TEXTURE_COMPARE_FUNC, translate_compare(compare) as i32);
            }
            if self.caps.anisotropic_filtering && d.max_anisotropy > 1 {
                ctx.sampler_parameter_f32(s, gl::TEXTURE_MAX_ANISOTROPY_EXT, d.max_anisotropy as f32);
            }
            Some(s)
        } else {
            None
        };

        let base = ResourceBase::new(ResourceType::Sampler);
        self.register(&base);
        Ok(Sampler(Rc::new(SamplerInner {
            base,
            descriptor: *descriptor,
            gl_sampler,
        })))
    }

    // ── programs ─────────────────────────────────────────────────────────

    /// Creates a program and issues its compile and link right away.
    ///
    /// Without `KHR_parallel_shader_compile` the program is considered
    /// compiled immediately; otherwise readiness is polled by
    /// [`Device::query_pipeline_ready`].
    pub fn create_program(&mut self, descriptor: &ProgramDescriptor) -> Result<Program> {
        self.check_sampler_units(descriptor)?;
        let base = ResourceBase::new(ResourceType::Program);
        let program = Program::new(base, descriptor.clone());
        {
            let mut ctx = self.ctx.borrow_mut();
            program.compile(&mut *ctx)?;
            if !self.caps.parallel_shader_compile {
                program.advance(&mut *ctx, false, self.config.shader_debug);
            }
        }
        self.register(&program.0.base);
        Ok(program)
    }

    /// Sampler uniforms of both stages must fit the combined texture units.
    pub(super) fn check_sampler_units(&self, descriptor: &ProgramDescriptor) -> Result<()> {
        let bindings = scan_shader_bindings([descriptor.vertex_source.as_str(), descriptor.fragment_source.as_str()]);
        let units = bindings.num_sampler_units();
        ensure_precondition!(
            units <= self.limits.max_texture_units,
            "program samplers need {units} texture units, device has {}",
            self.limits.max_texture_units
        );
        Ok(())
    }

    // ── bindings ─────────────────────────────────────────────────────────

    pub fn create_bindings(&mut self, descriptor: &BindingsDescriptor) -> Result<Bindings> {
        let layout = descriptor.binding_layout;
        ensure_precondition!(
            descriptor.uniform_buffer_bindings.len() >= layout.num_uniform_buffers as usize,
            "layout declares {} uniform buffers, {} bound",
            layout.num_uniform_buffers,
            descriptor.uniform_buffer_bindings.len()
        );
        ensure_precondition!(
            descriptor.sampler_bindings.len() >= layout.num_samplers as usize,
            "layout declares {} samplers, {} bound",
            layout.num_samplers,
            descriptor.sampler_bindings.len()
        );

        let uniform_buffers = &descriptor.uniform_buffer_bindings[..layout.num_uniform_buffers as usize];
        for binding in uniform_buffers {
            if let Some(buffer) = &binding.buffer {
                buffer.0.base.ensure_alive()?;
                ensure_precondition!(
                    buffer.usage().contains(BufferUsage::UNIFORM),
                    "buffer {} is bound as uniform buffer without UNIFORM usage",
                    buffer.0.base.label()
                );
            }
        }
        for binding in &descriptor.sampler_bindings[..layout.num_samplers as usize] {
            if let Some(texture) = &binding.texture {
                texture.0.base.ensure_alive()?;
            }
            if let Some(sampler) = &binding.sampler {
                sampler.0.base.ensure_alive()?;
            }
        }

        let base = ResourceBase::new(ResourceType::Bindings);
        self.register(&base);
        Ok(Bindings(Rc::new(BindingsInner {
            base,
            descriptor: descriptor.clone(),
        })))
    }

    // ── vertex input ─────────────────────────────────────────────────────

    pub fn create_input_layout(&mut self, descriptor: &InputLayoutDescriptor) -> Result<InputLayout> {
        let mut native_formats = Vec::with_capacity(descriptor.vertex_attribute_descriptors.len());
        for attribute in &descriptor.vertex_attribute_descriptors {
            ensure_precondition!(
                attribute.location < self.limits.max_vertex_attributes,
                "attribute location {} exceeds the {} limit",
                attribute.location,
                self.limits.max_vertex_attributes
            );
            let buffer = descriptor
                .vertex_buffer_descriptors
                .get(attribute.buffer_index as usize)
                .copied()
                .flatten();
            ensure_precondition!(
                buffer.is_some(),
                "attribute {} reads vertex buffer {}, which the layout does not describe",
                attribute.location,
                attribute.buffer_index
            );
            native_formats.push(translate_vertex_format(attribute.format, &self.caps)?);
        }
        for buffer in descriptor.vertex_buffer_descriptors.iter().flatten() {
            if buffer.step_mode == VertexStepMode::Instance {
                ensure_supported!(self.caps.instancing, "per-instance vertex buffers need ANGLE_instanced_arrays");
            }
        }

        let index_type = descriptor
            .index_buffer_format
            .map(|f| translate_index_format(f, &self.caps).map(|ty| (ty, f.pixel_byte_size())))
            .transpose()?;

        let base = ResourceBase::new(ResourceType::InputLayout);
        self.register(&base);
        Ok(InputLayout(Rc::new(InputLayoutInner {
            base,
            descriptor: descriptor.clone(),
            native_formats,
            index_type,
        })))
    }

    /// Binds buffers to an input layout.
    ///
    /// With vertex array objects the attribute setup is recorded into a VAO
    /// once; otherwise it is replayed every time the state is bound.
    pub fn create_input_state(
        &mut self,
        layout: &InputLayout,
        vertex_buffers: &[Option<VertexBufferBinding>],
        index_buffer: Option<IndexBufferBinding>,
    ) -> Result<InputState> {
        layout.0.base.ensure_alive()?;
        let layout_descriptor = &layout.0.descriptor;

        for binding in vertex_buffers.iter().flatten() {
            binding.buffer.0.base.ensure_alive()?;
            ensure_precondition!(
                binding.buffer.usage().contains(BufferUsage::VERTEX),
                "buffer {} is bound as vertex buffer without VERTEX usage",
                binding.buffer.0.base.label()
            );
        }
        if let Some(binding) = &index_buffer {
            binding.buffer.0.base.ensure_alive()?;
            ensure_precondition!(
                binding.buffer.usage().contains(BufferUsage::INDEX),
                "buffer {} is bound as index buffer without INDEX usage",
                binding.buffer.0.base.label()
            );
            ensure_precondition!(
                layout.0.index_type.is_some(),
                "input layout {} has no index format",
                layout.0.base.label()
            );
        }

        let mut attributes = Vec::with_capacity(layout_descriptor.vertex_attribute_descriptors.len());
        for (attribute, format) in layout_descriptor
            .vertex_attribute_descriptors
            .iter()
            .zip(&layout.0.native_formats)
        {
            let index = attribute.buffer_index as usize;
            let Some(buffer_layout) = layout_descriptor.vertex_buffer_descriptors.get(index).copied().flatten() else {
                continue;
            };
            let binding = vertex_buffers.get(index).and_then(Option::as_ref).ok_or_else(|| {
                GpuError::Precondition(format!(
                    "attribute {} reads vertex buffer {index}, which is not bound",
                    attribute.location
                ))
            })?;
            let buffer = native_buffer(&binding.buffer)?;
            let offset = i32::try_from(binding.byte_offset as u64 + attribute.buffer_byte_offset as u64).map_err(|_| {
                GpuError::Precondition(format!("attribute {} byte offset is out of range", attribute.location))
            })?;
            attributes.push(AttributeSetup {
                location: attribute.location,
                buffer,
                format: *format,
                stride: buffer_layout.byte_stride as i32,
                offset,
                divisor: match buffer_layout.step_mode {
                    VertexStepMode::Vertex => 0,
                    VertexStepMode::Instance => 1,
                },
            });
        }

        let index_gl_buffer = index_buffer.as_ref().map(|b| native_buffer(&b.buffer)).transpose()?;
        let (index_type, index_stride) = match (&index_buffer, layout.0.index_type) {
            (Some(_), Some((ty, stride))) => (Some(ty), stride),
            _ => (None, 0),
        };
        let index_byte_offset = index_buffer.as_ref().map_or(0, |b| b.byte_offset);

        let vao = if self.caps.vertex_arrays {
            let mut guard = self.ctx.borrow_mut();
            let ctx = &mut *guard;
            let vao = ctx
                .create_vertex_array()
                .ok_or_else(|| GpuError::Native("createVertexArray returned null".into()))?;
            self.state.bind_vertex_array(ctx, Some(vao));
            for setup in &attributes {
                apply_attribute(ctx, setup);
            }
            ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, index_gl_buffer);
            self.state.bind_vertex_array(ctx, None);
            ctx.bind_buffer(gl::ARRAY_BUFFER, None);
            Some(vao)
        } else {
            None
        };

        let base = ResourceBase::new(ResourceType::InputState);
        self.register(&base);
        Ok(InputState(Rc::new(InputStateInner {
            base,
            layout: layout.clone(),
            vertex_buffers: vertex_buffers.to_vec(),
            index_buffer,
            vao,
            attributes,
            index_gl_buffer,
            index_type,
            index_stride,
            index_byte_offset,
        })))
    }

    // ── pipelines ────────────────────────────────────────────────────────

    pub fn create_render_pipeline(&mut self, descriptor: &RenderPipelineDescriptor) -> Result<RenderPipeline> {
        descriptor.program.0.base.ensure_alive()?;
        if let Some(layout) = &descriptor.input_layout {
            layout.0.base.ensure_alive()?;
        }

        let binding_table = BindingLayoutTable::new(&descriptor.binding_layouts);
        binding_table.check_limits(&self.limits)?;

        ensure_precondition!(
            descriptor.color_attachment_formats.len() as u32 <= self.limits.max_color_attachments,
            "pipeline declares {} color attachments, limit is {}",
            descriptor.color_attachment_formats.len(),
            self.limits.max_color_attachments
        );
        ensure_precondition!(descriptor.sample_count >= 1, "sample count must be at least 1");
        if descriptor.sample_count > 1 {
            ensure_supported!(self.caps.multisampled_renderbuffers, "multisampling needs WebGL2");
        }
        ensure_supported!(
            !descriptor.mega_state.uses_min_max() || self.caps.blend_minmax,
            "min/max blending needs EXT_blend_minmax"
        );

        let attachments = &descriptor.mega_state.attachments_state;
        if !self.caps.indexed_blend && attachments.windows(2).any(|w| w[0] != w[1]) {
            log::warn!("per-attachment blend state needs OES_draw_buffers_indexed; attachment 0 applies to all");
        }

        let base = ResourceBase::new(ResourceType::RenderPipeline);
        self.register(&base);
        Ok(RenderPipeline(Rc::new(RenderPipelineInner {
            base,
            descriptor: descriptor.clone(),
            binding_table,
            draw_mode: translate_topology(descriptor.topology),
        })))
    }

    /// Creates a compute pipeline. WebGL has no compute stage; the pipeline
    /// only carries its program and layouts.
    pub fn create_compute_pipeline(&mut self, descriptor: &ComputePipelineDescriptor) -> Result<ComputePipeline> {
        descriptor.program.0.base.ensure_alive()?;
        let base = ResourceBase::new(ResourceType::ComputePipeline);
        self.register(&base);
        Ok(ComputePipeline(Rc::new(ComputePipelineInner {
            base,
            descriptor: descriptor.clone(),
        })))
    }

    // ── render targets ───────────────────────────────────────────────────

    /// Creates a renderbuffer-backed render target.
    pub fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> Result<RenderTarget> {
        let d = descriptor;
        ensure_precondition!(d.width > 0 && d.height > 0, "render target size {}x{} is empty", d.width, d.height);
        ensure_precondition!(d.sample_count >= 1, "sample count must be at least 1");
        if d.sample_count > 1 {
            ensure_supported!(self.caps.multisampled_renderbuffers, "multisampled render targets need WebGL2");
            ensure_precondition!(
                d.sample_count <= self.limits.max_samples,
                "{} samples requested, limit is {}",
                d.sample_count,
                self.limits.max_samples
            );
        }
        let internal_format = translate_renderbuffer_format(d.pixel_format, &self.caps)?;

        let renderbuffer = {
            let mut ctx = self.ctx.borrow_mut();
            let rb = ctx
                .create_renderbuffer()
                .ok_or_else(|| GpuError::Native("createRenderbuffer returned null".into()))?;
            ctx.bind_renderbuffer(Some(rb));
            if d.sample_count > 1 {
                ctx.renderbuffer_storage_multisample(
                    d.sample_count as i32,
                    internal_format,
                    d.width as i32,
                    d.height as i32,
                );
            } else {
                ctx.renderbuffer_storage(internal_format, d.width as i32, d.height as i32);
            }
            ctx.bind_renderbuffer(None);
            rb
        };

        let base = ResourceBase::new(ResourceType::RenderTarget);
        self.register(&base);
        Ok(RenderTarget(Rc::new(RenderTargetInner {
            base,
            descriptor: *d,
            backing: RenderTargetBacking::Renderbuffer(renderbuffer),
        })))
    }

    /// Wraps a 2D texture (or the onscreen texture) as a render target.
    pub fn create_render_target_from_texture(&mut self, texture: &Texture) -> Result<RenderTarget> {
        texture.0.base.ensure_alive()?;
        ensure_precondition!(
            texture.is_onscreen() || texture.descriptor().usage.contains(TextureUsage::RENDER_TARGET),
            "texture {} lacks RENDER_TARGET usage",
            texture.0.base.label()
        );
        ensure_precondition!(
            texture.descriptor().dimension == TextureDimension::D2,
            "only 2D textures can be render targets"
        );

        let base = ResourceBase::new(ResourceType::RenderTarget);
        self.register(&base);
        Ok(RenderTarget(Rc::new(RenderTargetInner {
            base,
            descriptor: RenderTargetDescriptor::new(texture.format(), texture.width(), texture.height()),
            backing: RenderTargetBacking::Texture(texture.clone()),
        })))
    }

    // ── readback / queries ───────────────────────────────────────────────

    /// Creates a staging area for reads of up to `byte_size` bytes.
    pub fn create_readback(&mut self, byte_size: u32) -> Result<Readback> {
        ensure_precondition!(byte_size > 0, "readbacks cannot be empty");

        let pack_buffer = if self.caps.fence_sync {
            let mut ctx = self.ctx.borrow_mut();
            let buffer = ctx
                .create_buffer()
                .ok_or_else(|| GpuError::Native("createBuffer returned null".into()))?;
            ctx.bind_buffer(gl::PIXEL_PACK_BUFFER, Some(buffer));
            ctx.buffer_data_size(gl::PIXEL_PACK_BUFFER, byte_size as i32, gl::STREAM_READ);
            ctx.bind_buffer(gl::PIXEL_PACK_BUFFER, None);
            Some(buffer)
        } else {
            None
        };

        let base = ResourceBase::new(ResourceType::Readback);
        self.register(&base);
        Ok(Readback(Rc::new(ReadbackInner {
            base,
            byte_size,
            pack_buffer,
            pending: Cell::new(false),
        })))
    }

    pub fn create_query_pool(&mut self, ty: QueryPoolType, count: u32) -> Result<QueryPool> {
        ensure_supported!(self.caps.occlusion_queries, "occlusion queries need WebGL2");
        ensure_precondition!(count > 0, "query pools cannot be empty");

        let queries = {
            let mut ctx = self.ctx.borrow_mut();
            (0..count)
                .map(|_| {
                    ctx.create_query()
                        .ok_or_else(|| GpuError::Native("createQuery returned null".into()))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let base = ResourceBase::new(ResourceType::QueryPool);
        self.register(&base);
        Ok(QueryPool(Rc::new(QueryPoolInner { base, ty, queries })))
    }

    // ── passes ───────────────────────────────────────────────────────────

    /// Starts recording a render pass.
    ///
    /// Attachments are validated here so mismatches surface at the call
    /// site rather than at submission.
    pub fn create_render_pass(&mut self, descriptor: RenderPassDescriptor) -> Result<RenderPass> {
        let extent = descriptor.validate(self.limits.max_color_attachments)?;
        if descriptor.resolve_textures().next().is_some() {
            ensure_supported!(self.caps.blit_framebuffer, "resolve textures need WebGL2");
        }
        let mut pass = self.pass_pool.acquire();
        pass.begin(self.id, descriptor, extent);
        Ok(pass)
    }
}

/// Length of page `index` of a buffer of `byte_size` bytes.
fn page_len(byte_size: u32, page_byte_size: u32, index: u32) -> u32 {
    (byte_size - index * page_byte_size).min(page_byte_size)
}

fn native_buffer(buffer: &Buffer) -> Result<GlBuffer> {
    buffer.platform_buffer(0).ok_or_else(|| {
        GpuError::Precondition(format!("buffer {} has no native storage", buffer.0.base.label()))
    })
}

/// Issues the `vertexAttrib*` calls of one attribute.
pub(super) fn apply_attribute(ctx: &mut dyn GlContext, setup: &AttributeSetup) {
    ctx.bind_buffer(gl::ARRAY_BUFFER, Some(setup.buffer));
    ctx.enable_vertex_attrib_array(setup.location);
    let f = setup.format;
    if f.integer {
        ctx.vertex_attrib_i_pointer(setup.location, f.size, f.ty, setup.stride, setup.offset);
    } else {
        ctx.vertex_attrib_pointer(setup.location, f.size, f.ty, f.normalized, setup.stride, setup.offset);
    }
    if setup.divisor != 0 {
        ctx.vertex_attrib_divisor(setup.location, setup.divisor);
    }
}
