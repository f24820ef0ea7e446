//! Recording native context.
//!
//! Every state-changing call is appended to a call log as a [`GlCall`].
//! Getters are answered from a small simulation (buffer storage, shader
//! outcomes, fences, queries) and are not logged.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;

use super::consts as gl;
use super::{
    GlBuffer, GlContext, GlFramebuffer, GlProgram, GlQuery, GlRenderbuffer, GlSampler, GlShader,
    GlSync, GlTexture, GlUniformLocation, GlVertexArray,
};

/// One recorded native call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    PixelStore(u32, i32),

    CreateBuffer(GlBuffer),
    DeleteBuffer(GlBuffer),
    BindBuffer(u32, Option<GlBuffer>),
    BindBufferRange { target: u32, index: u32, buffer: Option<GlBuffer>, offset: i32, size: i32 },
    BufferData { target: u32, size: i32, usage: u32 },
    BufferSubData { target: u32, offset: i32, data: Vec<u8> },
    GetBufferSubData { target: u32, offset: i32, len: usize },

    CreateTexture(GlTexture),
    DeleteTexture(GlTexture),
    ActiveTexture(u32),
    BindTexture(u32, Option<GlTexture>),
    TexParameterI(u32, u32, i32),
    TexParameterF(u32, u32, f32),
    TexStorage2d { target: u32, levels: i32, internal_format: u32, width: i32, height: i32 },
    TexStorage3d { target: u32, levels: i32, internal_format: u32, width: i32, height: i32, depth: i32 },
    TexImage2d { target: u32, level: i32, internal_format: i32, width: i32, height: i32, format: u32, ty: u32, len: Option<usize> },
    TexSubImage2d { target: u32, level: i32, width: i32, height: i32, format: u32, ty: u32, len: usize },
    TexSubImage3d { target: u32, level: i32, width: i32, height: i32, depth: i32, format: u32, ty: u32, len: usize },
    CompressedTexImage2d { target: u32, level: i32, internal_format: u32, width: i32, height: i32, len: usize },
    CompressedTexSubImage2d { target: u32, level: i32, width: i32, height: i32, format: u32, len: usize },
    CompressedTexSubImage3d { target: u32, level: i32, width: i32, height: i32, depth: i32, format: u32, len: usize },
    GenerateMipmap(u32),

    CreateSampler(GlSampler),
    DeleteSampler(GlSampler),
    BindSampler(u32, Option<GlSampler>),
    SamplerParameterI(GlSampler, u32, i32),
    SamplerParameterF(GlSampler, u32, f32),

    CreateRenderbuffer(GlRenderbuffer),
    DeleteRenderbuffer(GlRenderbuffer),
    BindRenderbuffer(Option<GlRenderbuffer>),
    RenderbufferStorage { internal_format: u32, width: i32, height: i32 },
    RenderbufferStorageMultisample { samples: i32, internal_format: u32, width: i32, height: i32 },
    CreateFramebuffer(GlFramebuffer),
    DeleteFramebuffer(GlFramebuffer),
    BindFramebuffer(u32, Option<GlFramebuffer>),
    FramebufferTexture2d { target: u32, attachment: u32, tex_target: u32, texture: Option<GlTexture>, level: i32 },
    FramebufferRenderbuffer { target: u32, attachment: u32, renderbuffer: Option<GlRenderbuffer> },
    DrawBuffers(Vec<u32>),
    BlitFramebuffer { src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32 },

    CreateShader(GlShader, u32),
    ShaderSource(GlShader, String),
    CompileShader(GlShader),
    DeleteShader(GlShader),
    CreateProgram(GlProgram),
    AttachShader(GlProgram, GlShader),
    LinkProgram(GlProgram),
    DeleteProgram(GlProgram),
    UseProgram(Option<GlProgram>),
    UniformBlockBinding(GlProgram, u32, u32),
    Uniform1iv(GlUniformLocation, Vec<i32>),
    Uniform4fv(GlUniformLocation, Vec<f32>),

    CreateVertexArray(GlVertexArray),
    DeleteVertexArray(GlVertexArray),
    BindVertexArray(Option<GlVertexArray>),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer { location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32 },
    VertexAttribIPointer { location: u32, size: i32, ty: u32, stride: i32, offset: i32 },
    VertexAttribDivisor(u32, u32),

    Enable(u32),
    Disable(u32),
    EnableI(u32, u32),
    DisableI(u32, u32),
    ColorMask(bool, bool, bool, bool),
    ColorMaskI(u32, bool, bool, bool, bool),
    BlendEquationSeparate(u32, u32),
    BlendEquationSeparateI(u32, u32, u32),
    BlendFuncSeparate(u32, u32, u32, u32),
    BlendFuncSeparateI(u32, u32, u32, u32, u32),
    BlendColor(f32, f32, f32, f32),
    DepthFunc(u32),
    DepthMask(bool),
    StencilFunc(u32, i32, u32),
    StencilOp(u32, u32, u32),
    StencilMask(u32),
    CullFace(u32),
    FrontFace(u32),
    PolygonOffset(f32, f32),
    Viewport(i32, i32, i32, i32),
    Scissor(i32, i32, i32, i32),
    ClearColor(f32, f32, f32, f32),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),
    ClearBufferFv(u32, i32, Vec<f32>),
    ClearBufferFi(u32, i32, f32, i32),

    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawElements { mode: u32, count: i32, ty: u32, offset: i32 },
    DrawElementsInstanced { mode: u32, count: i32, ty: u32, offset: i32, instances: i32 },

    CreateQuery(GlQuery),
    DeleteQuery(GlQuery),
    BeginQuery(u32, GlQuery),
    EndQuery(u32),
    FenceSync(GlSync),
    DeleteSync(GlSync),
    ReadPixels { x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32 },
    ReadPixelsToPackBuffer { x: i32, y: i32, width: i32, height: i32, offset: i32 },

    PushDebugGroup(String),
    PopDebugGroup,
}

impl GlCall {
    /// Returns `true` for calls that change fixed-function or binding state
    /// (as opposed to object creation, uploads and draws).
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            GlCall::ActiveTexture(_)
                | GlCall::BindTexture(..)
                | GlCall::BindSampler(..)
                | GlCall::BindBufferRange { .. }
                | GlCall::BindFramebuffer(..)
                | GlCall::BindVertexArray(_)
                | GlCall::UseProgram(_)
                | GlCall::Enable(_)
                | GlCall::Disable(_)
                | GlCall::EnableI(..)
                | GlCall::DisableI(..)
                | GlCall::ColorMask(..)
                | GlCall::ColorMaskI(..)
                | GlCall::BlendEquationSeparate(..)
                | GlCall::BlendEquationSeparateI(..)
                | GlCall::BlendFuncSeparate(..)
                | GlCall::BlendFuncSeparateI(..)
                | GlCall::BlendColor(..)
                | GlCall::DepthFunc(_)
                | GlCall::DepthMask(_)
                | GlCall::StencilFunc(..)
                | GlCall::StencilOp(..)
                | GlCall::StencilMask(_)
                | GlCall::CullFace(_)
                | GlCall::FrontFace(_)
                | GlCall::PolygonOffset(..)
                | GlCall::DrawBuffers(_)
        )
    }

    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            GlCall::DrawArrays { .. } | GlCall::DrawElements { .. } | GlCall::DrawElementsInstanced { .. }
        )
    }
}

#[derive(Debug, Default)]
struct ProgramSim {
    shaders: Vec<GlShader>,
    linked: bool,
    link_ok: bool,
    pending_polls: u32,
    block_indices: HashMap<String, u32>,
}

/// Native context that records calls instead of talking to a driver.
///
/// Construct with [`RecordingContext::webgl2`] or [`RecordingContext::webgl1`]
/// and adjust the simulated driver with the `with_*` builders.
#[derive(Debug)]
pub struct RecordingContext {
    webgl2: bool,
    lost: bool,
    extensions: HashSet<String>,
    parameters: HashMap<u32, i32>,
    strings: HashMap<u32, String>,
    next_handle: u32,
    calls: Vec<GlCall>,

    buffers: HashMap<GlBuffer, Vec<u8>>,
    bound_buffers: HashMap<u32, GlBuffer>,

    shader_sources: HashMap<GlShader, String>,
    programs: HashMap<GlProgram, ProgramSim>,
    failing_marker: Option<String>,
    compile_polls: u32,

    syncs: HashMap<GlSync, u32>,
    sync_polls: u32,
    occlusion_result: u32,
    pixel_fill: u8,
    framebuffer_status: u32,
}

impl RecordingContext {
    /// A WebGL2 context with the common desktop-browser extension set.
    pub fn webgl2() -> Self {
        let mut ctx = Self::bare(true);
        for ext in [
            super::extensions::COLOR_BUFFER_FLOAT,
            super::extensions::COMPRESSED_S3TC,
            super::extensions::COMPRESSED_S3TC_SRGB,
            super::extensions::COMPRESSED_RGTC,
            super::extensions::TEXTURE_NORM16,
            super::extensions::ANISOTROPIC_FILTERING,
        ] {
            ctx.extensions.insert(ext.to_string());
        }
        ctx.parameters.insert(gl::MAX_UNIFORM_BUFFER_BINDINGS, 24);
        ctx.parameters.insert(gl::MAX_UNIFORM_BLOCK_SIZE, 65536);
        ctx.parameters.insert(gl::UNIFORM_BUFFER_OFFSET_ALIGNMENT, 256);
        ctx.parameters.insert(gl::MAX_SAMPLES, 4);
        ctx.parameters.insert(gl::MAX_DRAW_BUFFERS, 8);
        ctx.parameters.insert(gl::MAX_COLOR_ATTACHMENTS, 8);
        ctx.strings.insert(gl::VERSION, "WebGL 2.0 (recording)".to_string());
        ctx.strings.insert(gl::SHADING_LANGUAGE_VERSION, "WebGL GLSL ES 3.00".to_string());
        ctx
    }

    /// A WebGL1 context without any extension.
    pub fn webgl1() -> Self {
        let mut ctx = Self::bare(false);
        ctx.strings.insert(gl::VERSION, "WebGL 1.0 (recording)".to_string());
        ctx.strings.insert(gl::SHADING_LANGUAGE_VERSION, "WebGL GLSL ES 1.0".to_string());
        ctx
    }

    fn bare(webgl2: bool) -> Self {
        let mut parameters = HashMap::new();
        parameters.insert(gl::MAX_TEXTURE_SIZE, 4096);
        parameters.insert(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, 16);
        parameters.insert(gl::MAX_VERTEX_ATTRIBS, 16);

        let mut strings = HashMap::new();
        strings.insert(gl::VENDOR, "tessera".to_string());
        strings.insert(gl::RENDERER, "recording context".to_string());

        Self {
            webgl2,
            lost: false,
            extensions: HashSet::new(),
            parameters,
            strings,
            next_handle: 0,
            calls: Vec::new(),
            buffers: HashMap::new(),
            bound_buffers: HashMap::new(),
            shader_sources: HashMap::new(),
            programs: HashMap::new(),
            failing_marker: None,
            compile_polls: 0,
            syncs: HashMap::new(),
            sync_polls: 0,
            occlusion_result: 1,
            pixel_fill: 0,
            framebuffer_status: gl::FRAMEBUFFER_COMPLETE,
        }
    }

    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.insert(name.to_string());
        self
    }

    pub fn without_extension(mut self, name: &str) -> Self {
        self.extensions.remove(name);
        self
    }

    pub fn with_parameter(mut self, pname: u32, value: i32) -> Self {
        self.parameters.insert(pname, value);
        self
    }

    /// Shaders whose source contains `marker` fail to compile.
    pub fn with_failing_shader_marker(mut self, marker: &str) -> Self {
        self.failing_marker = Some(marker.to_string());
        self
    }

    /// Number of `COMPLETION_STATUS_KHR` polls that report "still compiling"
    /// for each linked program.
    pub fn with_compile_polls(mut self, polls: u32) -> Self {
        self.compile_polls = polls;
        self
    }

    /// Number of `clientWaitSync` polls that time out before a fence signals.
    pub fn with_sync_polls(mut self, polls: u32) -> Self {
        self.sync_polls = polls;
        self
    }

    pub fn with_occlusion_result(mut self, result: u32) -> Self {
        self.occlusion_result = result;
        self
    }

    /// Byte value written by `readPixels`.
    pub fn with_pixel_fill(mut self, fill: u8) -> Self {
        self.pixel_fill = fill;
        self
    }

    pub fn with_framebuffer_status(mut self, status: u32) -> Self {
        self.framebuffer_status = status;
        self
    }

    pub fn lose_context(&mut self) {
        self.lost = true;
    }

    /// Recorded calls in issue order.
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Drains the call log.
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count_calls(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(*c)).count()
    }

    /// Simulated contents of a native buffer.
    pub fn buffer_contents(&self, buffer: GlBuffer) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    fn push(&mut self, call: GlCall) {
        self.calls.push(call);
    }

    fn next(&mut self) -> Option<NonZeroU32> {
        if self.lost {
            return None;
        }
        self.next_handle += 1;
        NonZeroU32::new(self.next_handle)
    }

    fn bound_storage(&mut self, target: u32) -> Option<&mut Vec<u8>> {
        let buffer = self.bound_buffers.get(&target).copied()?;
        self.buffers.get_mut(&buffer)
    }
}

impl GlContext for RecordingContext {
    fn is_webgl2(&self) -> bool {
        self.webgl2
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        self.parameters.get(&pname).copied().unwrap_or(0)
    }

    fn get_parameter_string(&self, pname: u32) -> Option<String> {
        self.strings.get(&pname).cloned()
    }

    fn pixel_store_i32(&mut self, pname: u32, value: i32) {
        self.push(GlCall::PixelStore(pname, value));
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Option<GlBuffer> {
        let buffer = GlBuffer(self.next()?);
        self.buffers.insert(buffer, Vec::new());
        self.push(GlCall::CreateBuffer(buffer));
        Some(buffer)
    }

    fn delete_buffer(&mut self, buffer: GlBuffer) {
        self.buffers.remove(&buffer);
        self.bound_buffers.retain(|_, b| *b != buffer);
        self.push(GlCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<GlBuffer>) {
        match buffer {
            Some(b) => self.bound_buffers.insert(target, b),
            None => self.bound_buffers.remove(&target),
        };
        self.push(GlCall::BindBuffer(target, buffer));
    }

    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: Option<GlBuffer>, offset: i32, size: i32) {
        self.push(GlCall::BindBufferRange { target, index, buffer, offset, size });
    }

    fn buffer_data_size(&mut self, target: u32, size: i32, usage: u32) {
        if let Some(storage) = self.bound_storage(target) {
            *storage = vec![0; size.max(0) as usize];
        }
        self.push(GlCall::BufferData { target, size, usage });
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        if let Some(storage) = self.bound_storage(target) {
            let start = offset.max(0) as usize;
            let end = (start + data.len()).min(storage.len());
            if start < end {
                storage[start..end].copy_from_slice(&data[..end - start]);
            }
        }
        self.push(GlCall::BufferSubData { target, offset, data: data.to_vec() });
    }

    fn get_buffer_sub_data(&mut self, target: u32, offset: i32, dst: &mut [u8]) {
        if let Some(storage) = self.bound_storage(target) {
            let start = (offset.max(0) as usize).min(storage.len());
            let end = (start + dst.len()).min(storage.len());
            dst[..end - start].copy_from_slice(&storage[start..end]);
        }
        self.push(GlCall::GetBufferSubData { target, offset, len: dst.len() });
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Option<GlTexture> {
        let texture = GlTexture(self.next()?);
        self.push(GlCall::CreateTexture(texture));
        Some(texture)
    }

    fn delete_texture(&mut self, texture: GlTexture) {
        self.push(GlCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.push(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: u32, texture: Option<GlTexture>) {
        self.push(GlCall::BindTexture(target, texture));
    }

    fn tex_parameter_i32(&mut self, target: u32, pname: u32, value: i32) {
        self.push(GlCall::TexParameterI(target, pname, value));
    }

    fn tex_parameter_f32(&mut self, target: u32, pname: u32, value: f32) {
        self.push(GlCall::TexParameterF(target, pname, value));
    }

    fn tex_storage_2d(&mut self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32) {
        self.push(GlCall::TexStorage2d { target, levels, internal_format, width, height });
    }

    fn tex_storage_3d(&mut self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32, depth: i32) {
        self.push(GlCall::TexStorage3d { target, levels, internal_format, width, height, depth });
    }

    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        let len = pixels.map(<[u8]>::len);
        self.push(GlCall::TexImage2d { target, level, internal_format, width, height, format, ty, len });
    }

    fn tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        _x: i32,
        _y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        self.push(GlCall::TexSubImage2d { target, level, width, height, format, ty, len: pixels.len() });
    }

    fn tex_sub_image_3d(
        &mut self,
        target: u32,
        level: i32,
        _x: i32,
        _y: i32,
        _z: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        self.push(GlCall::TexSubImage3d { target, level, width, height, depth, format, ty, len: pixels.len() });
    }

    fn compressed_tex_image_2d(&mut self, target: u32, level: i32, internal_format: u32, width: i32, height: i32, data: &[u8]) {
        self.push(GlCall::CompressedTexImage2d { target, level, internal_format, width, height, len: data.len() });
    }

    fn compressed_tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        _x: i32,
        _y: i32,
        width: i32,
        height: i32,
        format: u32,
        data: &[u8],
    ) {
        self.push(GlCall::CompressedTexSubImage2d { target, level, width, height, format, len: data.len() });
    }

    fn compressed_tex_sub_image_3d(
        &mut self,
        target: u32,
        level: i32,
        _x: i32,
        _y: i32,
        _z: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        data: &[u8],
    ) {
        self.push(GlCall::CompressedTexSubImage3d { target, level, width, height, depth, format, len: data.len() });
    }

    fn generate_mipmap(&mut self, target: u32) {
        self.push(GlCall::GenerateMipmap(target));
    }

    // ── samplers ──────────────────────────────────────────────────────────

    fn create_sampler(&mut self) -> Option<GlSampler> {
        let sampler = GlSampler(self.next()?);
        self.push(GlCall::CreateSampler(sampler));
        Some(sampler)
    }

    fn delete_sampler(&mut self, sampler: GlSampler) {
        self.push(GlCall::DeleteSampler(sampler));
    }

    fn bind_sampler(&mut self, unit: u32, sampler: Option<GlSampler>) {
        self.push(GlCall::BindSampler(unit, sampler));
    }

    fn sampler_parameter_i32(&mut self, sampler: GlSampler, pname: u32, value: i32) {
        self.push(GlCall::SamplerParameterI(sampler, pname, value));
    }

    fn sampler_parameter_f32(&mut self, sampler: GlSampler, pname: u32, value: f32) {
        self.push(GlCall::SamplerParameterF(sampler, pname, value));
    }

    // ── renderbuffers / framebuffers ──────────────────────────────────────

    fn create_renderbuffer(&mut self) -> Option<GlRenderbuffer> {
        let rb = GlRenderbuffer(self.next()?);
        self.push(GlCall::CreateRenderbuffer(rb));
        Some(rb)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: GlRenderbuffer) {
        self.push(GlCall::DeleteRenderbuffer(renderbuffer));
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<GlRenderbuffer>) {
        self.push(GlCall::BindRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, internal_format: u32, width: i32, height: i32) {
        self.push(GlCall::RenderbufferStorage { internal_format, width, height });
    }

    fn renderbuffer_storage_multisample(&mut self, samples: i32, internal_format: u32, width: i32, height: i32) {
        self.push(GlCall::RenderbufferStorageMultisample { samples, internal_format, width, height });
    }

    fn create_framebuffer(&mut self) -> Option<GlFramebuffer> {
        let fb = GlFramebuffer(self.next()?);
        self.push(GlCall::CreateFramebuffer(fb));
        Some(fb)
    }

    fn delete_framebuffer(&mut self, framebuffer: GlFramebuffer) {
        self.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<GlFramebuffer>) {
        self.push(GlCall::BindFramebuffer(target, framebuffer));
    }

    fn framebuffer_texture_2d(&mut self, target: u32, attachment: u32, tex_target: u32, texture: Option<GlTexture>, level: i32) {
        self.push(GlCall::FramebufferTexture2d { target, attachment, tex_target, texture, level });
    }

    fn framebuffer_renderbuffer(&mut self, target: u32, attachment: u32, renderbuffer: Option<GlRenderbuffer>) {
        self.push(GlCall::FramebufferRenderbuffer { target, attachment, renderbuffer });
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        self.push(GlCall::DrawBuffers(buffers.to_vec()));
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        self.push(GlCall::BlitFramebuffer { src, dst, mask, filter });
    }

    fn check_framebuffer_status(&mut self, _target: u32) -> u32 {
        self.framebuffer_status
    }

    // ── shaders / programs ────────────────────────────────────────────────

    fn create_shader(&mut self, ty: u32) -> Option<GlShader> {
        let shader = GlShader(self.next()?);
        self.push(GlCall::CreateShader(shader, ty));
        Some(shader)
    }

    fn shader_source(&mut self, shader: GlShader, source: &str) {
        self.shader_sources.insert(shader, source.to_string());
        self.push(GlCall::ShaderSource(shader, source.to_string()));
    }

    fn compile_shader(&mut self, shader: GlShader) {
        self.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&mut self, shader: GlShader) -> bool {
        match (&self.failing_marker, self.shader_sources.get(&shader)) {
            (Some(marker), Some(src)) => !src.contains(marker.as_str()),
            _ => true,
        }
    }

    fn shader_info_log(&mut self, shader: GlShader) -> String {
        if self.shader_compile_status(shader) {
            String::new()
        } else {
            "ERROR: 0:1: simulated compile failure".to_string()
        }
    }

    fn delete_shader(&mut self, shader: GlShader) {
        self.shader_sources.remove(&shader);
        self.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Option<GlProgram> {
        let program = GlProgram(self.next()?);
        self.programs.insert(program, ProgramSim::default());
        self.push(GlCall::CreateProgram(program));
        Some(program)
    }

    fn attach_shader(&mut self, program: GlProgram, shader: GlShader) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.shaders.push(shader);
        }
        self.push(GlCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: GlProgram) {
        let shaders = self.programs.get(&program).map(|p| p.shaders.clone()).unwrap_or_default();
        let link_ok = shaders.iter().all(|s| self.shader_compile_status(*s));
        let polls = self.compile_polls;
        if let Some(p) = self.programs.get_mut(&program) {
            p.linked = true;
            p.link_ok = link_ok;
            p.pending_polls = polls;
        }
        self.push(GlCall::LinkProgram(program));
    }

    fn program_link_status(&mut self, program: GlProgram) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked && p.link_ok)
    }

    fn program_completion_status(&mut self, program: GlProgram) -> bool {
        match self.programs.get_mut(&program) {
            Some(p) if p.pending_polls > 0 => {
                p.pending_polls -= 1;
                false
            }
            Some(p) => p.linked,
            None => false,
        }
    }

    fn program_info_log(&mut self, program: GlProgram) -> String {
        if self.program_link_status(program) {
            String::new()
        } else {
            "ERROR: simulated link failure".to_string()
        }
    }

    fn delete_program(&mut self, program: GlProgram) {
        self.programs.remove(&program);
        self.push(GlCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<GlProgram>) {
        self.push(GlCall::UseProgram(program));
    }

    fn uniform_block_index(&mut self, program: GlProgram, name: &str) -> u32 {
        let Some(p) = self.programs.get_mut(&program) else {
            return gl::INVALID_INDEX;
        };
        let next = p.block_indices.len() as u32;
        *p.block_indices.entry(name.to_string()).or_insert(next)
    }

    fn uniform_block_binding(&mut self, program: GlProgram, index: u32, binding: u32) {
        self.push(GlCall::UniformBlockBinding(program, index, binding));
    }

    fn uniform_location(&mut self, program: GlProgram, _name: &str) -> Option<GlUniformLocation> {
        if !self.programs.contains_key(&program) {
            return None;
        }
        self.next().map(GlUniformLocation)
    }

    fn uniform_1iv(&mut self, location: GlUniformLocation, values: &[i32]) {
        self.push(GlCall::Uniform1iv(location, values.to_vec()));
    }

    fn uniform_4fv(&mut self, location: GlUniformLocation, values: &[f32]) {
        self.push(GlCall::Uniform4fv(location, values.to_vec()));
    }

    // ── vertex input ──────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Option<GlVertexArray> {
        let vao = GlVertexArray(self.next()?);
        self.push(GlCall::CreateVertexArray(vao));
        Some(vao)
    }

    fn delete_vertex_array(&mut self, vao: GlVertexArray) {
        self.push(GlCall::DeleteVertexArray(vao));
    }

    fn bind_vertex_array(&mut self, vao: Option<GlVertexArray>) {
        self.push(GlCall::BindVertexArray(vao));
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.push(GlCall::EnableVertexAttribArray(location));
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.push(GlCall::DisableVertexAttribArray(location));
    }

    fn vertex_attrib_pointer(&mut self, location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        self.push(GlCall::VertexAttribPointer { location, size, ty, normalized, stride, offset });
    }

    fn vertex_attrib_i_pointer(&mut self, location: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        self.push(GlCall::VertexAttribIPointer { location, size, ty, stride, offset });
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        self.push(GlCall::VertexAttribDivisor(location, divisor));
    }

    // ── fixed function state ──────────────────────────────────────────────

    fn enable(&mut self, cap: u32) {
        self.push(GlCall::Enable(cap));
    }

    fn disable(&mut self, cap: u32) {
        self.push(GlCall::Disable(cap));
    }

    fn enable_i(&mut self, cap: u32, index: u32) {
        self.push(GlCall::EnableI(cap, index));
    }

    fn disable_i(&mut self, cap: u32, index: u32) {
        self.push(GlCall::DisableI(cap, index));
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.push(GlCall::ColorMask(r, g, b, a));
    }

    fn color_mask_i(&mut self, index: u32, r: bool, g: bool, b: bool, a: bool) {
        self.push(GlCall::ColorMaskI(index, r, g, b, a));
    }

    fn blend_equation_separate(&mut self, rgb: u32, alpha: u32) {
        self.push(GlCall::BlendEquationSeparate(rgb, alpha));
    }

    fn blend_equation_separate_i(&mut self, index: u32, rgb: u32, alpha: u32) {
        self.push(GlCall::BlendEquationSeparateI(index, rgb, alpha));
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.push(GlCall::BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn blend_func_separate_i(&mut self, index: u32, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.push(GlCall::BlendFuncSeparateI(index, src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.push(GlCall::BlendColor(r, g, b, a));
    }

    fn depth_func(&mut self, func: u32) {
        self.push(GlCall::DepthFunc(func));
    }

    fn depth_mask(&mut self, flag: bool) {
        self.push(GlCall::DepthMask(flag));
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        self.push(GlCall::StencilFunc(func, reference, mask));
    }

    fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        self.push(GlCall::StencilOp(fail, zfail, zpass));
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.push(GlCall::StencilMask(mask));
    }

    fn cull_face(&mut self, mode: u32) {
        self.push(GlCall::CullFace(mode));
    }

    fn front_face(&mut self, mode: u32) {
        self.push(GlCall::FrontFace(mode));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.push(GlCall::PolygonOffset(factor, units));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.push(GlCall::Viewport(x, y, width, height));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.push(GlCall::Scissor(x, y, width, height));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.push(GlCall::ClearColor(r, g, b, a));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.push(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.push(GlCall::ClearStencil(stencil));
    }

    fn clear(&mut self, mask: u32) {
        self.push(GlCall::Clear(mask));
    }

    fn clear_buffer_fv(&mut self, buffer: u32, draw_buffer: i32, values: &[f32]) {
        self.push(GlCall::ClearBufferFv(buffer, draw_buffer, values.to_vec()));
    }

    fn clear_buffer_fi(&mut self, buffer: u32, draw_buffer: i32, depth: f32, stencil: i32) {
        self.push(GlCall::ClearBufferFi(buffer, draw_buffer, depth, stencil));
    }

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.push(GlCall::DrawArrays { mode, first, count });
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.push(GlCall::DrawElements { mode, count, ty, offset });
    }

    fn draw_elements_instanced(&mut self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32) {
        self.push(GlCall::DrawElementsInstanced { mode, count, ty, offset, instances });
    }

    // ── queries / sync / readback ─────────────────────────────────────────

    fn create_query(&mut self) -> Option<GlQuery> {
        let query = GlQuery(self.next()?);
        self.push(GlCall::CreateQuery(query));
        Some(query)
    }

    fn delete_query(&mut self, query: GlQuery) {
        self.push(GlCall::DeleteQuery(query));
    }

    fn begin_query(&mut self, target: u32, query: GlQuery) {
        self.push(GlCall::BeginQuery(target, query));
    }

    fn end_query(&mut self, target: u32) {
        self.push(GlCall::EndQuery(target));
    }

    fn query_result_available(&mut self, _query: GlQuery) -> bool {
        true
    }

    fn query_result(&mut self, _query: GlQuery) -> u32 {
        self.occlusion_result
    }

    fn fence_sync(&mut self) -> Option<GlSync> {
        let sync = GlSync(self.next()?);
        self.syncs.insert(sync, self.sync_polls);
        self.push(GlCall::FenceSync(sync));
        Some(sync)
    }

    fn client_wait_sync(&mut self, sync: GlSync, _flags: u32, _timeout: u32) -> u32 {
        match self.syncs.get_mut(&sync) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                gl::TIMEOUT_EXPIRED
            }
            Some(_) => gl::ALREADY_SIGNALED,
            None => gl::WAIT_FAILED,
        }
    }

    fn delete_sync(&mut self, sync: GlSync) {
        self.syncs.remove(&sync);
        self.push(GlCall::DeleteSync(sync));
    }

    fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32, dst: &mut [u8]) {
        dst.fill(self.pixel_fill);
        self.push(GlCall::ReadPixels { x, y, width, height, format, ty });
    }

    fn read_pixels_to_pack_buffer(&mut self, x: i32, y: i32, width: i32, height: i32, _format: u32, _ty: u32, offset: i32) {
        let fill = self.pixel_fill;
        let len = (width.max(0) * height.max(0) * 4) as usize;
        if let Some(storage) = self.bound_storage(gl::PIXEL_PACK_BUFFER) {
            let start = (offset.max(0) as usize).min(storage.len());
            let end = (start + len).min(storage.len());
            storage[start..end].fill(fill);
        }
        self.push(GlCall::ReadPixelsToPackBuffer { x, y, width, height, offset });
    }

    fn push_debug_group(&mut self, label: &str) {
        self.push(GlCall::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.push(GlCall::PopDebugGroup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_storage_round_trips_through_bound_target() {
        let mut ctx = RecordingContext::webgl2();
        let b = ctx.create_buffer().unwrap();
        ctx.bind_buffer(gl::COPY_WRITE_BUFFER, Some(b));
        ctx.buffer_data_size(gl::COPY_WRITE_BUFFER, 8, gl::STATIC_DRAW);
        ctx.buffer_sub_data(gl::COPY_WRITE_BUFFER, 2, &[1, 2, 3]);
        assert_eq!(ctx.buffer_contents(b).unwrap(), &[0, 0, 1, 2, 3, 0, 0, 0]);

        let mut out = [0u8; 4];
        ctx.get_buffer_sub_data(gl::COPY_WRITE_BUFFER, 1, &mut out);
        assert_eq!(out, [0, 1, 2, 3]);
    }

    #[test]
    fn lost_context_refuses_allocation() {
        let mut ctx = RecordingContext::webgl1();
        ctx.lose_context();
        assert!(ctx.create_texture().is_none());
        assert!(ctx.is_context_lost());
    }

    #[test]
    fn completion_status_honors_poll_budget() {
        let mut ctx = RecordingContext::webgl2().with_compile_polls(2);
        let p = ctx.create_program().unwrap();
        ctx.link_program(p);
        assert!(!ctx.program_completion_status(p));
        assert!(!ctx.program_completion_status(p));
        assert!(ctx.program_completion_status(p));
    }

    #[test]
    fn failing_marker_breaks_compile_and_link() {
        let mut ctx = RecordingContext::webgl2().with_failing_shader_marker("#error");
        let s = ctx.create_shader(gl::VERTEX_SHADER).unwrap();
        ctx.shader_source(s, "void main() {}\n#error broken");
        let p = ctx.create_program().unwrap();
        ctx.attach_shader(p, s);
        ctx.link_program(p);
        assert!(!ctx.shader_compile_status(s));
        assert!(!ctx.program_link_status(p));
        assert!(!ctx.shader_info_log(s).is_empty());
    }

    #[test]
    fn fences_signal_after_configured_polls() {
        let mut ctx = RecordingContext::webgl2().with_sync_polls(1);
        let s = ctx.fence_sync().unwrap();
        assert_eq!(ctx.client_wait_sync(s, 0, 0), gl::TIMEOUT_EXPIRED);
        assert_eq!(ctx.client_wait_sync(s, 0, 0), gl::ALREADY_SIGNALED);
    }
}
