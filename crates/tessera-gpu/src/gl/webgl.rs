//! web-sys backend.
//!
//! Native objects live in per-kind tables keyed by the integer handles the
//! device sees. WebGL1 entry points that only exist as extensions are routed
//! through the extension objects enabled at construction.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AngleInstancedArrays, OesDrawBuffersIndexed, OesVertexArrayObject, WebGl2RenderingContext, WebGlBuffer,
    WebGlFramebuffer, WebGlProgram, WebGlQuery, WebGlRenderbuffer, WebGlRenderingContext, WebGlSampler, WebGlShader,
    WebGlSync, WebGlTexture, WebGlUniformLocation, WebGlVertexArrayObject, WebglDrawBuffers,
};

use super::consts as gl;
use super::extensions as ext;
use super::{
    GlBuffer, GlContext, GlFramebuffer, GlProgram, GlQuery, GlRenderbuffer, GlSampler, GlShader, GlSync, GlTexture,
    GlUniformLocation, GlVertexArray,
};

/// Extensions enabled when present.
const KNOWN_EXTENSIONS: [&str; 17] = [
    ext::VERTEX_ARRAY_OBJECT,
    ext::INSTANCED_ARRAYS,
    ext::DRAW_BUFFERS,
    ext::DRAW_BUFFERS_INDEXED,
    ext::DEPTH_TEXTURE,
    ext::TEXTURE_FLOAT,
    ext::TEXTURE_HALF_FLOAT,
    ext::ELEMENT_INDEX_UINT,
    ext::BLEND_MINMAX,
    ext::TEXTURE_NORM16,
    ext::COLOR_BUFFER_FLOAT,
    ext::COMPRESSED_S3TC,
    ext::COMPRESSED_S3TC_SRGB,
    ext::COMPRESSED_RGTC,
    ext::PARALLEL_SHADER_COMPILE,
    ext::ANISOTROPIC_FILTERING,
    ext::DEBUG_RENDERER_INFO,
];

/// JS objects addressed by integer handles.
struct Table<T> {
    next: u32,
    items: HashMap<u32, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next: 0,
            items: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn insert(&mut self, item: T) -> Option<NonZeroU32> {
        self.next = self.next.checked_add(1)?;
        let id = NonZeroU32::new(self.next)?;
        self.items.insert(id.get(), item);
        Some(id)
    }

    fn get(&self, id: NonZeroU32) -> Option<&T> {
        self.items.get(&id.get())
    }

    fn remove(&mut self, id: NonZeroU32) -> Option<T> {
        self.items.remove(&id.get())
    }
}

enum Backend {
    WebGl2(WebGl2RenderingContext),
    WebGl1 {
        gl: WebGlRenderingContext,
        vao: Option<OesVertexArrayObject>,
        instancing: Option<AngleInstancedArrays>,
        draw_buffers: Option<WebglDrawBuffers>,
    },
}

/// Calls a method both context types share.
macro_rules! both {
    ($self:ident, $gl:ident => $body:expr) => {
        match &$self.backend {
            Backend::WebGl2($gl) => $body,
            Backend::WebGl1 { gl: $gl, .. } => $body,
        }
    };
}

/// Native context over a browser `WebGLRenderingContext` or
/// `WebGL2RenderingContext`.
pub struct WebGlContext {
    backend: Backend,
    extensions: HashSet<String>,
    draw_buffers_indexed: Option<OesDrawBuffersIndexed>,

    buffers: Table<WebGlBuffer>,
    textures: Table<WebGlTexture>,
    samplers: Table<WebGlSampler>,
    renderbuffers: Table<WebGlRenderbuffer>,
    framebuffers: Table<WebGlFramebuffer>,
    shaders: Table<WebGlShader>,
    programs: Table<WebGlProgram>,
    uniforms: Table<WebGlUniformLocation>,
    vertex_arrays: Table<WebGlVertexArrayObject>,
    queries: Table<WebGlQuery>,
    syncs: Table<WebGlSync>,
}

impl std::fmt::Debug for WebGlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGlContext")
            .field("webgl2", &self.is_webgl2())
            .field("extensions", &self.extensions)
            .finish()
    }
}

fn enable_extensions(get: impl Fn(&str) -> Option<js_sys::Object>) -> (HashSet<String>, HashMap<&'static str, js_sys::Object>) {
    let mut names = HashSet::new();
    let mut objects = HashMap::new();
    for name in KNOWN_EXTENSIONS {
        if let Some(object) = get(name) {
            names.insert(name.to_string());
            objects.insert(name, object);
        }
    }
    (names, objects)
}

impl WebGlContext {
    pub fn webgl2(gl: WebGl2RenderingContext) -> Self {
        let (extensions, mut objects) = enable_extensions(|name| gl.get_extension(name).ok().flatten());
        let draw_buffers_indexed = objects.remove(ext::DRAW_BUFFERS_INDEXED).map(JsCast::unchecked_into);
        log::debug!("WebGL2 context, {} extension(s)", extensions.len());
        Self::with_backend(Backend::WebGl2(gl), extensions, draw_buffers_indexed)
    }

    pub fn webgl1(gl: WebGlRenderingContext) -> Self {
        let (extensions, mut objects) = enable_extensions(|name| gl.get_extension(name).ok().flatten());
        let draw_buffers_indexed = objects.remove(ext::DRAW_BUFFERS_INDEXED).map(JsCast::unchecked_into);
        let backend = Backend::WebGl1 {
            vao: objects.remove(ext::VERTEX_ARRAY_OBJECT).map(JsCast::unchecked_into),
            instancing: objects.remove(ext::INSTANCED_ARRAYS).map(JsCast::unchecked_into),
            draw_buffers: objects.remove(ext::DRAW_BUFFERS).map(JsCast::unchecked_into),
            gl,
        };
        log::debug!("WebGL1 context, {} extension(s)", extensions.len());
        Self::with_backend(backend, extensions, draw_buffers_indexed)
    }

    fn with_backend(
        backend: Backend,
        extensions: HashSet<String>,
        draw_buffers_indexed: Option<OesDrawBuffersIndexed>,
    ) -> Self {
        Self {
            backend,
            extensions,
            draw_buffers_indexed,
            buffers: Table::default(),
            textures: Table::default(),
            samplers: Table::default(),
            renderbuffers: Table::default(),
            framebuffers: Table::default(),
            shaders: Table::default(),
            programs: Table::default(),
            uniforms: Table::default(),
            vertex_arrays: Table::default(),
            queries: Table::default(),
            syncs: Table::default(),
        }
    }

    fn webgl2_only(&self, call: &str) -> Option<&WebGl2RenderingContext> {
        match &self.backend {
            Backend::WebGl2(gl) => Some(gl),
            Backend::WebGl1 { .. } => {
                log::error!("{call} called on a WebGL1 context");
                None
            }
        }
    }

    fn buffer(&self, handle: Option<GlBuffer>) -> Option<&WebGlBuffer> {
        handle.and_then(|h| self.buffers.get(h.0))
    }

    fn texture(&self, handle: Option<GlTexture>) -> Option<&WebGlTexture> {
        handle.and_then(|h| self.textures.get(h.0))
    }

    fn program(&self, handle: GlProgram) -> Option<&WebGlProgram> {
        self.programs.get(handle.0)
    }

    fn shader(&self, handle: GlShader) -> Option<&WebGlShader> {
        self.shaders.get(handle.0)
    }
}

fn report(call: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        log::error!("{call} failed: {e:?}");
    }
}

impl GlContext for WebGlContext {
    // ── context ───────────────────────────────────────────────────────────

    fn is_webgl2(&self) -> bool {
        matches!(self.backend, Backend::WebGl2(_))
    }

    fn is_context_lost(&self) -> bool {
        both!(self, g => g.is_context_lost())
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        both!(self, g => g.get_parameter(pname))
            .ok()
            .and_then(|v| v.as_f64())
            .map_or(0, |v| v as i32)
    }

    fn get_parameter_string(&self, pname: u32) -> Option<String> {
        both!(self, g => g.get_parameter(pname)).ok().and_then(|v| v.as_string())
    }

    fn pixel_store_i32(&mut self, pname: u32, value: i32) {
        both!(self, g => g.pixel_storei(pname, value))
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Option<GlBuffer> {
        let buffer = both!(self, g => g.create_buffer())?;
        self.buffers.insert(buffer).map(GlBuffer)
    }

    fn delete_buffer(&mut self, buffer: GlBuffer) {
        let native = self.buffers.remove(buffer.0);
        both!(self, g => g.delete_buffer(native.as_ref()))
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<GlBuffer>) {
        let native = self.buffer(buffer);
        both!(self, g => g.bind_buffer(target, native))
    }

    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: Option<GlBuffer>, offset: i32, size: i32) {
        let native = self.buffer(buffer);
        if let Some(g) = self.webgl2_only("bindBufferRange") {
            g.bind_buffer_range_with_i32_and_i32(target, index, native, offset, size);
        }
    }

    fn buffer_data_size(&mut self, target: u32, size: i32, usage: u32) {
        both!(self, g => g.buffer_data_with_i32(target, size, usage))
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        both!(self, g => g.buffer_sub_data_with_i32_and_u8_array(target, offset, data))
    }

    fn get_buffer_sub_data(&mut self, target: u32, offset: i32, dst: &mut [u8]) {
        if let Some(g) = self.webgl2_only("getBufferSubData") {
            g.get_buffer_sub_data_with_i32_and_u8_array(target, offset, dst);
        }
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Option<GlTexture> {
        let texture = both!(self, g => g.create_texture())?;
        self.textures.insert(texture).map(GlTexture)
    }

    fn delete_texture(&mut self, texture: GlTexture) {
        let native = self.textures.remove(texture.0);
        both!(self, g => g.delete_texture(native.as_ref()))
    }

    fn active_texture(&mut self, unit: u32) {
        both!(self, g => g.active_texture(unit))
    }

    fn bind_texture(&mut self, target: u32, texture: Option<GlTexture>) {
        let native = self.texture(texture);
        both!(self, g => g.bind_texture(target, native))
    }

    fn tex_parameter_i32(&mut self, target: u32, pname: u32, value: i32) {
        both!(self, g => g.tex_parameteri(target, pname, value))
    }

    fn tex_parameter_f32(&mut self, target: u32, pname: u32, value: f32) {
        both!(self, g => g.tex_parameterf(target, pname, value))
    }

    fn tex_storage_2d(&mut self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32) {
        if let Some(g) = self.webgl2_only("texStorage2D") {
            g.tex_storage_2d(target, levels, internal_format, width, height);
        }
    }

    fn tex_storage_3d(&mut self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32, depth: i32) {
        if let Some(g) = self.webgl2_only("texStorage3D") {
            g.tex_storage_3d(target, levels, internal_format, width, height, depth);
        }
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
        let result = both!(self, g => g.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            target, level, internal_format, width, height, 0, format, ty, pixels,
        ));
        report("texImage2D", result);
    }

    fn tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        let result = both!(self, g => g.tex_sub_image_2d_with_i32_and_i32_and_u32_and_type_and_opt_u8_array(
            target, level, x, y, width, height, format, ty, Some(pixels),
        ));
        report("texSubImage2D", result);
    }

    fn tex_sub_image_3d(
        &mut self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        z: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        if let Some(g) = self.webgl2_only("texSubImage3D") {
            let result =
                g.tex_sub_image_3d_with_opt_u8_array(target, level, x, y, z, width, height, depth, format, ty, Some(pixels));
            report("texSubImage3D", result);
        }
    }

    fn compressed_tex_image_2d(&mut self, target: u32, level: i32, internal_format: u32, width: i32, height: i32, data: &[u8]) {
        both!(self, g => g.compressed_tex_image_2d_with_u8_array(target, level, internal_format, width, height, 0, data))
    }

    fn compressed_tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        data: &[u8],
    ) {
        both!(self, g => g.compressed_tex_sub_image_2d_with_u8_array(target, level, x, y, width, height, format, data))
    }

    fn compressed_tex_sub_image_3d(
        &mut self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        z: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        data: &[u8],
    ) {
        if let Some(g) = self.webgl2_only("compressedTexSubImage3D") {
            g.compressed_tex_sub_image_3d_with_u8_array(target, level, x, y, z, width, height, depth, format, data);
        }
    }

    fn generate_mipmap(&mut self, target: u32) {
        both!(self, g => g.generate_mipmap(target))
    }

    // ── samplers (WebGL2) ─────────────────────────────────────────────────

    fn create_sampler(&mut self) -> Option<GlSampler> {
        let sampler = self.webgl2_only("createSampler")?.create_sampler()?;
        self.samplers.insert(sampler).map(GlSampler)
    }

    fn delete_sampler(&mut self, sampler: GlSampler) {
        let native = self.samplers.remove(sampler.0);
        if let Some(g) = self.webgl2_only("deleteSampler") {
            g.delete_sampler(native.as_ref());
        }
    }

    fn bind_sampler(&mut self, unit: u32, sampler: Option<GlSampler>) {
        let native = sampler.and_then(|s| self.samplers.get(s.0));
        if let Some(g) = self.webgl2_only("bindSampler") {
            g.bind_sampler(unit, native);
        }
    }

    fn sampler_parameter_i32(&mut self, sampler: GlSampler, pname: u32, value: i32) {
        if let (Some(g), Some(native)) = (self.webgl2_only("samplerParameteri"), self.samplers.get(sampler.0)) {
            g.sampler_parameteri(native, pname, value);
        }
    }

    fn sampler_parameter_f32(&mut self, sampler: GlSampler, pname: u32, value: f32) {
        if let (Some(g), Some(native)) = (self.webgl2_only("samplerParameterf"), self.samplers.get(sampler.0)) {
            g.sampler_parameterf(native, pname, value);
        }
    }

    // ── renderbuffers / framebuffers ──────────────────────────────────────

    fn create_renderbuffer(&mut self) -> Option<GlRenderbuffer> {
        let renderbuffer = both!(self, g => g.create_renderbuffer())?;
        self.renderbuffers.insert(renderbuffer).map(GlRenderbuffer)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: GlRenderbuffer) {
        let native = self.renderbuffers.remove(renderbuffer.0);
        both!(self, g => g.delete_renderbuffer(native.as_ref()))
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<GlRenderbuffer>) {
        let native = renderbuffer.and_then(|r| self.renderbuffers.get(r.0));
        both!(self, g => g.bind_renderbuffer(gl::RENDERBUFFER, native))
    }

    fn renderbuffer_storage(&mut self, internal_format: u32, width: i32, height: i32) {
        both!(self, g => g.renderbuffer_storage(gl::RENDERBUFFER, internal_format, width, height))
    }

    fn renderbuffer_storage_multisample(&mut self, samples: i32, internal_format: u32, width: i32, height: i32) {
        if let Some(g) = self.webgl2_only("renderbufferStorageMultisample") {
            g.renderbuffer_storage_multisample(gl::RENDERBUFFER, samples, internal_format, width, height);
        }
    }

    fn create_framebuffer(&mut self) -> Option<GlFramebuffer> {
        let framebuffer = both!(self, g => g.create_framebuffer())?;
        self.framebuffers.insert(framebuffer).map(GlFramebuffer)
    }

    fn delete_framebuffer(&mut self, framebuffer: GlFramebuffer) {
        let native = self.framebuffers.remove(framebuffer.0);
        both!(self, g => g.delete_framebuffer(native.as_ref()))
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<GlFramebuffer>) {
        let native = framebuffer.and_then(|f| self.framebuffers.get(f.0));
        both!(self, g => g.bind_framebuffer(target, native))
    }

    fn framebuffer_texture_2d(&mut self, target: u32, attachment: u32, tex_target: u32, texture: Option<GlTexture>, level: i32) {
        let native = self.texture(texture);
        both!(self, g => g.framebuffer_texture_2d(target, attachment, tex_target, native, level))
    }

    fn framebuffer_renderbuffer(&mut self, target: u32, attachment: u32, renderbuffer: Option<GlRenderbuffer>) {
        let native = renderbuffer.and_then(|r| self.renderbuffers.get(r.0));
        both!(self, g => g.framebuffer_renderbuffer(target, attachment, gl::RENDERBUFFER, native))
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        let array: js_sys::Array = buffers.iter().map(|b| JsValue::from(*b)).collect();
        match &self.backend {
            Backend::WebGl2(g) => g.draw_buffers(&array),
            Backend::WebGl1 { draw_buffers: Some(e), .. } => e.draw_buffers_webgl(&array),
            Backend::WebGl1 { draw_buffers: None, .. } => log::error!("drawBuffers without WEBGL_draw_buffers"),
        }
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        if let Some(g) = self.webgl2_only("blitFramebuffer") {
            g.blit_framebuffer(
                src[0],
                src[1],
                src[0] + src[2],
                src[1] + src[3],
                dst[0],
                dst[1],
                dst[0] + dst[2],
                dst[1] + dst[3],
                mask,
                filter,
            );
        }
    }

    fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        both!(self, g => g.check_framebuffer_status(target))
    }

    // ── shaders / programs ────────────────────────────────────────────────

    fn create_shader(&mut self, ty: u32) -> Option<GlShader> {
        let shader = both!(self, g => g.create_shader(ty))?;
        self.shaders.insert(shader).map(GlShader)
    }

    fn shader_source(&mut self, shader: GlShader, source: &str) {
        if let Some(native) = self.shader(shader) {
            both!(self, g => g.shader_source(native, source))
        }
    }

    fn compile_shader(&mut self, shader: GlShader) {
        if let Some(native) = self.shader(shader) {
            both!(self, g => g.compile_shader(native))
        }
    }

    fn shader_compile_status(&mut self, shader: GlShader) -> bool {
        self.shader(shader).is_some_and(|native| {
            both!(self, g => g.get_shader_parameter(native, gl::COMPILE_STATUS))
                .as_bool()
                .unwrap_or(false)
        })
    }

    fn shader_info_log(&mut self, shader: GlShader) -> String {
        self.shader(shader)
            .and_then(|native| both!(self, g => g.get_shader_info_log(native)))
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: GlShader) {
        let native = self.shaders.remove(shader.0);
        both!(self, g => g.delete_shader(native.as_ref()))
    }

    fn create_program(&mut self) -> Option<GlProgram> {
        let program = both!(self, g => g.create_program())?;
        self.programs.insert(program).map(GlProgram)
    }

    fn attach_shader(&mut self, program: GlProgram, shader: GlShader) {
        if let (Some(p), Some(s)) = (self.program(program), self.shader(shader)) {
            both!(self, g => g.attach_shader(p, s))
        }
    }

    fn link_program(&mut self, program: GlProgram) {
        if let Some(p) = self.program(program) {
            both!(self, g => g.link_program(p))
        }
    }

    fn program_link_status(&mut self, program: GlProgram) -> bool {
        self.program(program).is_some_and(|p| {
            both!(self, g => g.get_program_parameter(p, gl::LINK_STATUS))
                .as_bool()
                .unwrap_or(false)
        })
    }

    fn program_completion_status(&mut self, program: GlProgram) -> bool {
        self.program(program).is_none_or(|p| {
            both!(self, g => g.get_program_parameter(p, gl::COMPLETION_STATUS_KHR))
                .as_bool()
                .unwrap_or(true)
        })
    }

    fn program_info_log(&mut self, program: GlProgram) -> String {
        self.program(program)
            .and_then(|p| both!(self, g => g.get_program_info_log(p)))
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: GlProgram) {
        let native = self.programs.remove(program.0);
        both!(self, g => g.delete_program(native.as_ref()))
    }

    fn use_program(&mut self, program: Option<GlProgram>) {
        let native = program.and_then(|p| self.program(p));
        both!(self, g => g.use_program(native))
    }

    fn uniform_block_index(&mut self, program: GlProgram, name: &str) -> u32 {
        match (self.webgl2_only("getUniformBlockIndex"), self.program(program)) {
            (Some(g), Some(p)) => g.get_uniform_block_index(p, name),
            _ => gl::INVALID_INDEX,
        }
    }

    fn uniform_block_binding(&mut self, program: GlProgram, index: u32, binding: u32) {
        if let (Some(g), Some(p)) = (self.webgl2_only("uniformBlockBinding"), self.program(program)) {
            g.uniform_block_binding(p, index, binding);
        }
    }

    fn uniform_location(&mut self, program: GlProgram, name: &str) -> Option<GlUniformLocation> {
        let p = self.program(program)?;
        let location = both!(self, g => g.get_uniform_location(p, name))?;
        self.uniforms.insert(location).map(GlUniformLocation)
    }

    fn uniform_1iv(&mut self, location: GlUniformLocation, values: &[i32]) {
        let native = self.uniforms.get(location.0);
        both!(self, g => g.uniform1iv_with_i32_array(native, values))
    }

    fn uniform_4fv(&mut self, location: GlUniformLocation, values: &[f32]) {
        let native = self.uniforms.get(location.0);
        both!(self, g => g.uniform4fv_with_f32_array(native, values))
    }

    // ── vertex input ──────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Option<GlVertexArray> {
        let vao = match &self.backend {
            Backend::WebGl2(g) => g.create_vertex_array(),
            Backend::WebGl1 { vao: Some(e), .. } => e.create_vertex_array_oes(),
            Backend::WebGl1 { vao: None, .. } => None,
        }?;
        self.vertex_arrays.insert(vao).map(GlVertexArray)
    }

    fn delete_vertex_array(&mut self, vao: GlVertexArray) {
        let native = self.vertex_arrays.remove(vao.0);
        match &self.backend {
            Backend::WebGl2(g) => g.delete_vertex_array(native.as_ref()),
            Backend::WebGl1 { vao: Some(e), .. } => e.delete_vertex_array_oes(native.as_ref()),
            Backend::WebGl1 { vao: None, .. } => {}
        }
    }

    fn bind_vertex_array(&mut self, vao: Option<GlVertexArray>) {
        let native = vao.and_then(|v| self.vertex_arrays.get(v.0));
        match &self.backend {
            Backend::WebGl2(g) => g.bind_vertex_array(native),
            Backend::WebGl1 { vao: Some(e), .. } => e.bind_vertex_array_oes(native),
            Backend::WebGl1 { vao: None, .. } => log::error!("bindVertexArray without OES_vertex_array_object"),
        }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        both!(self, g => g.enable_vertex_attrib_array(location))
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        both!(self, g => g.disable_vertex_attrib_array(location))
    }

    fn vertex_attrib_pointer(&mut self, location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        both!(self, g => g.vertex_attrib_pointer_with_i32(location, size, ty, normalized, stride, offset))
    }

    fn vertex_attrib_i_pointer(&mut self, location: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        if let Some(g) = self.webgl2_only("vertexAttribIPointer") {
            g.vertex_attrib_i_pointer_with_i32(location, size, ty, stride, offset);
        }
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        match &self.backend {
            Backend::WebGl2(g) => g.vertex_attrib_divisor(location, divisor),
            Backend::WebGl1 { instancing: Some(e), .. } => e.vertex_attrib_divisor_angle(location, divisor),
            Backend::WebGl1 { instancing: None, .. } => log::error!("vertexAttribDivisor without ANGLE_instanced_arrays"),
        }
    }

    // ── fixed function state ──────────────────────────────────────────────

    fn enable(&mut self, cap: u32) {
        both!(self, g => g.enable(cap))
    }

    fn disable(&mut self, cap: u32) {
        both!(self, g => g.disable(cap))
    }

    fn enable_i(&mut self, cap: u32, index: u32) {
        if let Some(e) = &self.draw_buffers_indexed {
            e.enable_i_oes(cap, index);
        }
    }

    fn disable_i(&mut self, cap: u32, index: u32) {
        if let Some(e) = &self.draw_buffers_indexed {
            e.disable_i_oes(cap, index);
        }
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        both!(self, ctx => ctx.color_mask(r, g, b, a))
    }

    fn color_mask_i(&mut self, index: u32, r: bool, g: bool, b: bool, a: bool) {
        if let Some(e) = &self.draw_buffers_indexed {
            e.color_mask_i_oes(index, r, g, b, a);
        }
    }

    fn blend_equation_separate(&mut self, rgb: u32, alpha: u32) {
        both!(self, g => g.blend_equation_separate(rgb, alpha))
    }

    fn blend_equation_separate_i(&mut self, index: u32, rgb: u32, alpha: u32) {
        if let Some(e) = &self.draw_buffers_indexed {
            e.blend_equation_separate_i_oes(index, rgb, alpha);
        }
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        both!(self, g => g.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha))
    }

    fn blend_func_separate_i(&mut self, index: u32, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        if let Some(e) = &self.draw_buffers_indexed {
            e.blend_func_separate_i_oes(index, src_rgb, dst_rgb, src_alpha, dst_alpha);
        }
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        both!(self, ctx => ctx.blend_color(r, g, b, a))
    }

    fn depth_func(&mut self, func: u32) {
        both!(self, g => g.depth_func(func))
    }

    fn depth_mask(&mut self, flag: bool) {
        both!(self, g => g.depth_mask(flag))
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        both!(self, g => g.stencil_func(func, reference, mask))
    }

    fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        both!(self, g => g.stencil_op(fail, zfail, zpass))
    }

    fn stencil_mask(&mut self, mask: u32) {
        both!(self, g => g.stencil_mask(mask))
    }

    fn cull_face(&mut self, mode: u32) {
        both!(self, g => g.cull_face(mode))
    }

    fn front_face(&mut self, mode: u32) {
        both!(self, g => g.front_face(mode))
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        both!(self, g => g.polygon_offset(factor, units))
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        both!(self, g => g.viewport(x, y, width, height))
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        both!(self, g => g.scissor(x, y, width, height))
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        both!(self, ctx => ctx.clear_color(r, g, b, a))
    }

    fn clear_depth(&mut self, depth: f32) {
        both!(self, g => g.clear_depth(depth))
    }

    fn clear_stencil(&mut self, stencil: i32) {
        both!(self, g => g.clear_stencil(stencil))
    }

    fn clear(&mut self, mask: u32) {
        both!(self, g => g.clear(mask))
    }

    fn clear_buffer_fv(&mut self, buffer: u32, draw_buffer: i32, values: &[f32]) {
        if let Some(g) = self.webgl2_only("clearBufferfv") {
            g.clear_bufferfv_with_f32_array(buffer, draw_buffer, values);
        }
    }

    fn clear_buffer_fi(&mut self, buffer: u32, draw_buffer: i32, depth: f32, stencil: i32) {
        if let Some(g) = self.webgl2_only("clearBufferfi") {
            g.clear_bufferfi(buffer, draw_buffer, depth, stencil);
        }
    }

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        both!(self, g => g.draw_arrays(mode, first, count))
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        both!(self, g => g.draw_elements_with_i32(mode, count, ty, offset))
    }

    fn draw_elements_instanced(&mut self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32) {
        match &self.backend {
            Backend::WebGl2(g) => g.draw_elements_instanced_with_i32(mode, count, ty, offset, instances),
            Backend::WebGl1 { instancing: Some(e), .. } => {
                e.draw_elements_instanced_angle_with_i32(mode, count, ty, offset, instances)
            }
            Backend::WebGl1 { instancing: None, .. } => log::error!("instanced draw without ANGLE_instanced_arrays"),
        }
    }

    // ── queries / sync / readback ─────────────────────────────────────────

    fn create_query(&mut self) -> Option<GlQuery> {
        let query = self.webgl2_only("createQuery")?.create_query()?;
        self.queries.insert(query).map(GlQuery)
    }

    fn delete_query(&mut self, query: GlQuery) {
        let native = self.queries.remove(query.0);
        if let Some(g) = self.webgl2_only("deleteQuery") {
            g.delete_query(native.as_ref());
        }
    }

    fn begin_query(&mut self, target: u32, query: GlQuery) {
        if let (Some(g), Some(q)) = (self.webgl2_only("beginQuery"), self.queries.get(query.0)) {
            g.begin_query(target, q);
        }
    }

    fn end_query(&mut self, target: u32) {
        if let Some(g) = self.webgl2_only("endQuery") {
            g.end_query(target);
        }
    }

    fn query_result_available(&mut self, query: GlQuery) -> bool {
        match (self.webgl2_only("getQueryParameter"), self.queries.get(query.0)) {
            (Some(g), Some(q)) => g.get_query_parameter(q, gl::QUERY_RESULT_AVAILABLE).as_bool().unwrap_or(false),
            _ => false,
        }
    }

    fn query_result(&mut self, query: GlQuery) -> u32 {
        match (self.webgl2_only("getQueryParameter"), self.queries.get(query.0)) {
            (Some(g), Some(q)) => g
                .get_query_parameter(q, gl::QUERY_RESULT)
                .as_f64()
                .map_or(0, |v| v as u32),
            _ => 0,
        }
    }

    fn fence_sync(&mut self) -> Option<GlSync> {
        let sync = self
            .webgl2_only("fenceSync")?
            .fence_sync(gl::SYNC_GPU_COMMANDS_COMPLETE, 0)?;
        self.syncs.insert(sync).map(GlSync)
    }

    fn client_wait_sync(&mut self, sync: GlSync, flags: u32, timeout: u32) -> u32 {
        match (self.webgl2_only("clientWaitSync"), self.syncs.get(sync.0)) {
            (Some(g), Some(s)) => g.client_wait_sync_with_u32(s, flags, timeout),
            _ => gl::WAIT_FAILED,
        }
    }

    fn delete_sync(&mut self, sync: GlSync) {
        let native = self.syncs.remove(sync.0);
        if let Some(g) = self.webgl2_only("deleteSync") {
            g.delete_sync(native.as_ref());
        }
    }

    fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32, dst: &mut [u8]) {
        let result = both!(self, g => g.read_pixels_with_opt_u8_array(x, y, width, height, format, ty, Some(&mut *dst)));
        report("readPixels", result);
    }

    fn read_pixels_to_pack_buffer(&mut self, x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32, offset: i32) {
        if let Some(g) = self.webgl2_only("readPixels") {
            report("readPixels", g.read_pixels_with_i32(x, y, width, height, format, ty, offset));
        }
    }
}
