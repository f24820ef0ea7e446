//! Context capabilities.
//!
//! Resolved once when a [`Device`](crate::Device) is created; every
//! WebGL1/WebGL2 difference in the crate dispatches on these flags instead of
//! asking the context again.

use crate::gl::{consts as gl, extensions, GlContext};

/// Feature flags of the native context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub webgl2: bool,
    /// Native uniform buffer objects. Without them uniform buffers are
    /// emulated with `vec4` uniform arrays.
    pub uniform_buffers: bool,
    pub vertex_arrays: bool,
    pub instancing: bool,
    pub multiple_render_targets: bool,
    /// Per-attachment blend and write-mask state.
    pub indexed_blend: bool,
    pub sampler_objects: bool,
    /// Immutable texture storage (`texStorage*`).
    pub tex_storage: bool,
    pub texture_3d: bool,
    pub float_textures: bool,
    pub half_float_textures: bool,
    pub color_buffer_float: bool,
    pub depth_texture: bool,
    pub element_index_uint: bool,
    pub blend_minmax: bool,
    pub norm16: bool,
    pub s3tc: bool,
    pub s3tc_srgb: bool,
    pub rgtc: bool,
    pub anisotropic_filtering: bool,
    pub parallel_shader_compile: bool,
    pub occlusion_queries: bool,
    pub fence_sync: bool,
    pub multisampled_renderbuffers: bool,
    pub blit_framebuffer: bool,
    pub integer_textures: bool,
    pub srgb_textures: bool,
}

impl Capabilities {
    pub fn resolve(ctx: &dyn GlContext) -> Self {
        let webgl2 = ctx.is_webgl2();
        let ext = |name: &str| ctx.has_extension(name);

        Self {
            webgl2,
            uniform_buffers: webgl2,
            vertex_arrays: webgl2 || ext(extensions::VERTEX_ARRAY_OBJECT),
            instancing: webgl2 || ext(extensions::INSTANCED_ARRAYS),
            multiple_render_targets: webgl2 || ext(extensions::DRAW_BUFFERS),
            indexed_blend: webgl2 && ext(extensions::DRAW_BUFFERS_INDEXED),
            sampler_objects: webgl2,
            tex_storage: webgl2,
            texture_3d: webgl2,
            float_textures: webgl2 || ext(extensions::TEXTURE_FLOAT),
            half_float_textures: webgl2 || ext(extensions::TEXTURE_HALF_FLOAT),
            color_buffer_float: webgl2 && ext(extensions::COLOR_BUFFER_FLOAT),
            depth_texture: webgl2 || ext(extensions::DEPTH_TEXTURE),
            element_index_uint: webgl2 || ext(extensions::ELEMENT_INDEX_UINT),
            blend_minmax: webgl2 || ext(extensions::BLEND_MINMAX),
            norm16: webgl2 && ext(extensions::TEXTURE_NORM16),
            s3tc: ext(extensions::COMPRESSED_S3TC),
            s3tc_srgb: ext(extensions::COMPRESSED_S3TC_SRGB),
            rgtc: ext(extensions::COMPRESSED_RGTC),
            anisotropic_filtering: ext(extensions::ANISOTROPIC_FILTERING),
            parallel_shader_compile: ext(extensions::PARALLEL_SHADER_COMPILE),
            occlusion_queries: webgl2,
            fence_sync: webgl2,
            multisampled_renderbuffers: webgl2,
            blit_framebuffer: webgl2,
            integer_textures: webgl2,
            srgb_textures: webgl2,
        }
    }
}

/// Numeric limits of the native context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_vertex_attributes: u32,
    /// Uniform buffer slots. On WebGL1 this is the emulated slot count.
    pub max_uniform_buffers: u32,
    pub uniform_buffer_page_size: u32,
    pub uniform_buffer_offset_alignment: u32,
    pub max_color_attachments: u32,
    pub max_samples: u32,
}

/// Emulated uniform-buffer slots on contexts without UBOs.
const EMULATED_UNIFORM_BUFFERS: u32 = 8;
/// Shadow page size for emulated uniform buffers.
const EMULATED_PAGE_SIZE: u32 = 16 * 1024;
pub(crate) const UNIFORM_PAGE_SIZE: u32 = 64 * 1024;

impl DeviceLimits {
    pub fn resolve(ctx: &dyn GlContext, caps: &Capabilities) -> Self {
        let param = |pname| ctx.get_parameter_i32(pname).max(0) as u32;

        let (max_uniform_buffers, uniform_buffer_page_size, uniform_buffer_offset_alignment) =
            if caps.uniform_buffers {
                (
                    param(gl::MAX_UNIFORM_BUFFER_BINDINGS),
                    param(gl::MAX_UNIFORM_BLOCK_SIZE).min(UNIFORM_PAGE_SIZE).max(1),
                    param(gl::UNIFORM_BUFFER_OFFSET_ALIGNMENT).max(1),
                )
            } else {
                (EMULATED_UNIFORM_BUFFERS, EMULATED_PAGE_SIZE, 16)
            };

        let max_color_attachments = if caps.multiple_render_targets {
            param(gl::MAX_COLOR_ATTACHMENTS).min(param(gl::MAX_DRAW_BUFFERS)).max(1)
        } else {
            1
        };

        Self {
            max_texture_size: param(gl::MAX_TEXTURE_SIZE),
            max_texture_units: param(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
            max_vertex_attributes: param(gl::MAX_VERTEX_ATTRIBS),
            max_uniform_buffers,
            uniform_buffer_page_size,
            uniform_buffer_offset_alignment,
            max_color_attachments,
            max_samples: if caps.multisampled_renderbuffers { param(gl::MAX_SAMPLES).max(1) } else { 1 },
        }
    }
}

/// Driver identification strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub shading_language_version: String,
    /// `WEBGL_debug_renderer_info` renderer, when exposed.
    pub unmasked_renderer: Option<String>,
}

impl VendorInfo {
    pub fn resolve(ctx: &dyn GlContext) -> Self {
        let string = |pname| ctx.get_parameter_string(pname).unwrap_or_default();
        let unmasked_renderer = if ctx.has_extension(extensions::DEBUG_RENDERER_INFO) {
            ctx.get_parameter_string(gl::UNMASKED_RENDERER_WEBGL)
        } else {
            None
        };

        Self {
            vendor: string(gl::VENDOR),
            renderer: string(gl::RENDERER),
            version: string(gl::VERSION),
            shading_language_version: string(gl::SHADING_LANGUAGE_VERSION),
            unmasked_renderer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::RecordingContext;

    #[test]
    fn webgl1_without_extensions_is_minimal() {
        let ctx = RecordingContext::webgl1();
        let caps = Capabilities::resolve(&ctx);
        assert!(!caps.webgl2);
        assert!(!caps.vertex_arrays);
        assert!(!caps.instancing);
        assert!(!caps.multiple_render_targets);
        assert!(!caps.uniform_buffers);
        assert!(!caps.depth_texture);
    }

    #[test]
    fn webgl1_extensions_enable_features() {
        let ctx = RecordingContext::webgl1()
            .with_extension(extensions::VERTEX_ARRAY_OBJECT)
            .with_extension(extensions::INSTANCED_ARRAYS)
            .with_extension(extensions::DRAW_BUFFERS);
        let caps = Capabilities::resolve(&ctx);
        assert!(caps.vertex_arrays);
        assert!(caps.instancing);
        assert!(caps.multiple_render_targets);
        assert!(!caps.indexed_blend);
    }

    #[test]
    fn indexed_blend_needs_extension() {
        let plain = Capabilities::resolve(&RecordingContext::webgl2());
        assert!(!plain.indexed_blend);
        let ext = RecordingContext::webgl2().with_extension(extensions::DRAW_BUFFERS_INDEXED);
        assert!(Capabilities::resolve(&ext).indexed_blend);
    }

    #[test]
    fn limits_on_webgl1_use_emulated_uniform_slots() {
        let ctx = RecordingContext::webgl1();
        let caps = Capabilities::resolve(&ctx);
        let limits = DeviceLimits::resolve(&ctx, &caps);
        assert_eq!(limits.max_uniform_buffers, EMULATED_UNIFORM_BUFFERS);
        assert_eq!(limits.max_color_attachments, 1);
        assert_eq!(limits.max_samples, 1);
    }

    #[test]
    fn limits_on_webgl2_come_from_context() {
        let ctx = RecordingContext::webgl2();
        let caps = Capabilities::resolve(&ctx);
        let limits = DeviceLimits::resolve(&ctx, &caps);
        assert_eq!(limits.max_uniform_buffers, 24);
        assert_eq!(limits.uniform_buffer_page_size, UNIFORM_PAGE_SIZE);
        assert_eq!(limits.max_color_attachments, 8);
        assert_eq!(limits.max_texture_size, 4096);
    }

    #[test]
    fn vendor_strings_resolved() {
        let info = VendorInfo::resolve(&RecordingContext::webgl2());
        assert_eq!(info.vendor, "tessera");
        assert!(info.version.starts_with("WebGL 2.0"));
        assert_eq!(info.unmasked_renderer, None);
    }
}
