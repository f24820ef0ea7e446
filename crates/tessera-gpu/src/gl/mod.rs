//! Native context seam.
//!
//! The device never talks to a browser API directly. Every native call goes
//! through [`GlContext`], a WebGL-shaped trait with plain integer handles.
//! Two implementations ship with the crate:
//! - [`RecordingContext`]: records every call, simulates buffer storage,
//!   fences, queries and shader outcomes (tests, tooling, the probe binary)
//! - `WebGlContext`: the web-sys backend (`webgl` feature, wasm32 only)
//!
//! On WebGL1 contexts, implementations route vertex-array, instancing and
//! draw-buffer calls through `OES_vertex_array_object`,
//! `ANGLE_instanced_arrays` and `WEBGL_draw_buffers`. The device only issues
//! such calls when the matching capability was resolved at construction.

pub mod consts;
mod recording;
#[cfg(all(target_arch = "wasm32", feature = "webgl"))]
mod webgl;

use std::num::NonZeroU32;

pub use recording::{GlCall, RecordingContext};
#[cfg(all(target_arch = "wasm32", feature = "webgl"))]
pub use webgl::WebGlContext;

macro_rules! native_handles {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub NonZeroU32);
        )*
    };
}

native_handles!(
    /// Native buffer object.
    GlBuffer,
    /// Native texture object.
    GlTexture,
    /// Native sampler object (WebGL2).
    GlSampler,
    GlShader,
    GlProgram,
    GlFramebuffer,
    GlRenderbuffer,
    /// Native vertex array object (WebGL2 or `OES_vertex_array_object`).
    GlVertexArray,
    GlQuery,
    GlSync,
    GlUniformLocation,
);

/// Extension names queried at device construction.
pub mod extensions {
    pub const VERTEX_ARRAY_OBJECT: &str = "OES_vertex_array_object";
    pub const INSTANCED_ARRAYS: &str = "ANGLE_instanced_arrays";
    pub const DRAW_BUFFERS: &str = "WEBGL_draw_buffers";
    pub const DRAW_BUFFERS_INDEXED: &str = "OES_draw_buffers_indexed";
    pub const DEPTH_TEXTURE: &str = "WEBGL_depth_texture";
    pub const TEXTURE_FLOAT: &str = "OES_texture_float";
    pub const TEXTURE_HALF_FLOAT: &str = "OES_texture_half_float";
    pub const ELEMENT_INDEX_UINT: &str = "OES_element_index_uint";
    pub const BLEND_MINMAX: &str = "EXT_blend_minmax";
    pub const TEXTURE_NORM16: &str = "EXT_texture_norm16";
    pub const COLOR_BUFFER_FLOAT: &str = "EXT_color_buffer_float";
    pub const COMPRESSED_S3TC: &str = "WEBGL_compressed_texture_s3tc";
    pub const COMPRESSED_S3TC_SRGB: &str = "WEBGL_compressed_texture_s3tc_srgb";
    pub const COMPRESSED_RGTC: &str = "EXT_texture_compression_rgtc";
    pub const PARALLEL_SHADER_COMPILE: &str = "KHR_parallel_shader_compile";
    pub const ANISOTROPIC_FILTERING: &str = "EXT_texture_filter_anisotropic";
    pub const DEBUG_RENDERER_INFO: &str = "WEBGL_debug_renderer_info";
}

/// WebGL-shaped native context.
///
/// Handles returned by `create_*` stay valid until the matching `delete_*`.
/// `None` from a `create_*` call means the context could not allocate the
/// object (usually a lost context).
pub trait GlContext {
    // ── context ───────────────────────────────────────────────────────────

    fn is_webgl2(&self) -> bool;
    fn is_context_lost(&self) -> bool;
    fn has_extension(&self, name: &str) -> bool;
    fn get_parameter_i32(&self, pname: u32) -> i32;
    fn get_parameter_string(&self, pname: u32) -> Option<String>;
    fn pixel_store_i32(&mut self, pname: u32, value: i32);

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Option<GlBuffer>;
    fn delete_buffer(&mut self, buffer: GlBuffer);
    fn bind_buffer(&mut self, target: u32, buffer: Option<GlBuffer>);
    fn bind_buffer_range(
        &mut self,
        target: u32,
        index: u32,
        buffer: Option<GlBuffer>,
        offset: i32,
        size: i32,
    );
    fn buffer_data_size(&mut self, target: u32, size: i32, usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]);
    fn get_buffer_sub_data(&mut self, target: u32, offset: i32, dst: &mut [u8]);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Option<GlTexture>;
    fn delete_texture(&mut self, texture: GlTexture);
    /// `unit` is the absolute enum (`TEXTURE0 + n`).
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: u32, texture: Option<GlTexture>);
    fn tex_parameter_i32(&mut self, target: u32, pname: u32, value: i32);
    fn tex_parameter_f32(&mut self, target: u32, pname: u32, value: f32);
    fn tex_storage_2d(&mut self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32);
    fn tex_storage_3d(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    fn compressed_tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        data: &[u8],
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    fn generate_mipmap(&mut self, target: u32);

    // ── samplers (WebGL2) ─────────────────────────────────────────────────

    fn create_sampler(&mut self) -> Option<GlSampler>;
    fn delete_sampler(&mut self, sampler: GlSampler);
    /// `unit` is the texture unit index (not the `TEXTURE0` enum).
    fn bind_sampler(&mut self, unit: u32, sampler: Option<GlSampler>);
    fn sampler_parameter_i32(&mut self, sampler: GlSampler, pname: u32, value: i32);
    fn sampler_parameter_f32(&mut self, sampler: GlSampler, pname: u32, value: f32);

    // ── renderbuffers / framebuffers ──────────────────────────────────────

    fn create_renderbuffer(&mut self) -> Option<GlRenderbuffer>;
    fn delete_renderbuffer(&mut self, renderbuffer: GlRenderbuffer);
    fn bind_renderbuffer(&mut self, renderbuffer: Option<GlRenderbuffer>);
    fn renderbuffer_storage(&mut self, internal_format: u32, width: i32, height: i32);
    fn renderbuffer_storage_multisample(
        &mut self,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );
    fn create_framebuffer(&mut self) -> Option<GlFramebuffer>;
    fn delete_framebuffer(&mut self, framebuffer: GlFramebuffer);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<GlFramebuffer>);
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        tex_target: u32,
        texture: Option<GlTexture>,
        level: i32,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<GlRenderbuffer>,
    );
    fn draw_buffers(&mut self, buffers: &[u32]);
    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32);
    fn check_framebuffer_status(&mut self, target: u32) -> u32;

    // ── shaders / programs ────────────────────────────────────────────────

    fn create_shader(&mut self, ty: u32) -> Option<GlShader>;
    fn shader_source(&mut self, shader: GlShader, source: &str);
    fn compile_shader(&mut self, shader: GlShader);
    fn shader_compile_status(&mut self, shader: GlShader) -> bool;
    fn shader_info_log(&mut self, shader: GlShader) -> String;
    fn delete_shader(&mut self, shader: GlShader);
    fn create_program(&mut self) -> Option<GlProgram>;
    fn attach_shader(&mut self, program: GlProgram, shader: GlShader);
    fn link_program(&mut self, program: GlProgram);
    fn program_link_status(&mut self, program: GlProgram) -> bool;
    /// `KHR_parallel_shader_compile` completion status.
    fn program_completion_status(&mut self, program: GlProgram) -> bool;
    fn program_info_log(&mut self, program: GlProgram) -> String;
    fn delete_program(&mut self, program: GlProgram);
    fn use_program(&mut self, program: Option<GlProgram>);
    fn uniform_block_index(&mut self, program: GlProgram, name: &str) -> u32;
    fn uniform_block_binding(&mut self, program: GlProgram, index: u32, binding: u32);
    fn uniform_location(&mut self, program: GlProgram, name: &str) -> Option<GlUniformLocation>;
    fn uniform_1iv(&mut self, location: GlUniformLocation, values: &[i32]);
    fn uniform_4fv(&mut self, location: GlUniformLocation, values: &[f32]);

    // ── vertex input ──────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Option<GlVertexArray>;
    fn delete_vertex_array(&mut self, vao: GlVertexArray);
    fn bind_vertex_array(&mut self, vao: Option<GlVertexArray>);
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn disable_vertex_attrib_array(&mut self, location: u32);
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn vertex_attrib_i_pointer(&mut self, location: u32, size: i32, ty: u32, stride: i32, offset: i32);
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32);

    // ── fixed function state ──────────────────────────────────────────────

    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    /// `OES_draw_buffers_indexed`
    fn enable_i(&mut self, cap: u32, index: u32);
    fn disable_i(&mut self, cap: u32, index: u32);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn color_mask_i(&mut self, index: u32, r: bool, g: bool, b: bool, a: bool);
    fn blend_equation_separate(&mut self, rgb: u32, alpha: u32);
    fn blend_equation_separate_i(&mut self, index: u32, rgb: u32, alpha: u32);
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn blend_func_separate_i(
        &mut self,
        index: u32,
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    );
    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, flag: bool);
    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32);
    fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32);
    fn stencil_mask(&mut self, mask: u32);
    fn cull_face(&mut self, mode: u32);
    fn front_face(&mut self, mode: u32);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn clear(&mut self, mask: u32);
    fn clear_buffer_fv(&mut self, buffer: u32, draw_buffer: i32, values: &[f32]);
    fn clear_buffer_fi(&mut self, buffer: u32, draw_buffer: i32, depth: f32, stencil: i32);

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32);
    fn draw_elements_instanced(&mut self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32);

    // ── queries / sync / readback ─────────────────────────────────────────

    fn create_query(&mut self) -> Option<GlQuery>;
    fn delete_query(&mut self, query: GlQuery);
    fn begin_query(&mut self, target: u32, query: GlQuery);
    fn end_query(&mut self, target: u32);
    fn query_result_available(&mut self, query: GlQuery) -> bool;
    fn query_result(&mut self, query: GlQuery) -> u32;
    fn fence_sync(&mut self) -> Option<GlSync>;
    fn client_wait_sync(&mut self, sync: GlSync, flags: u32, timeout: u32) -> u32;
    fn delete_sync(&mut self, sync: GlSync);
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        dst: &mut [u8],
    );
    /// Reads into the buffer bound to `PIXEL_PACK_BUFFER`.
    #[allow(clippy::too_many_arguments)]
    fn read_pixels_to_pack_buffer(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        offset: i32,
    );

    // ── debug markers ─────────────────────────────────────────────────────

    fn push_debug_group(&mut self, _label: &str) {}
    fn pop_debug_group(&mut self) {}
}
