//! Descriptor enums to WebGL enums.
//!
//! Texture translation is total over [`Format`]: every format either maps
//! to a native triple or reports [`GpuError::Unsupported`] because the
//! context lacks WebGL2 or an extension. Renderbuffer, vertex and index
//! translation reject formats that make no sense for their use with
//! [`GpuError::Precondition`].

use crate::caps::Capabilities;
use crate::error::{ensure_precondition, ensure_supported, GpuError, Result};
use crate::gl::consts as gl;
use crate::megastate::{BlendFactor, BlendMode, CompareFunction, CullMode, FrontFace, StencilOp};
use crate::resource::pipeline::PrimitiveTopology;
use crate::resource::sampler::{AddressMode, FilterMode, MipmapFilterMode};

use super::{ComponentType, Format};

/// Native texture format triple for `texImage*` / `texStorage*`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NativeFormat {
    pub internal_format: u32,
    pub format: u32,
    /// Component type; `NONE` for compressed formats.
    pub ty: u32,
}

impl NativeFormat {
    const fn new(internal_format: u32, format: u32, ty: u32) -> Self {
        Self { internal_format, format, ty }
    }
}

// ── textures ──────────────────────────────────────────────────────────────

pub fn translate_texture_format(format: Format, caps: &Capabilities) -> Result<NativeFormat> {
    if format.is_compressed() {
        return translate_compressed(format, caps);
    }
    if format.is_depth() {
        return translate_depth(format, caps);
    }
    if format.component_type() == ComponentType::PackedU16 {
        return Ok(translate_packed(format, caps));
    }

    let ty = translate_component_type(format.component_type(), caps)?;
    if caps.webgl2 {
        translate_sized(format, ty, caps)
    } else {
        translate_unsized(format, ty)
    }
}

/// `true` when [`translate_texture_format`] succeeds on `caps`.
pub fn is_texture_format_supported(format: Format, caps: &Capabilities) -> bool {
    translate_texture_format(format, caps).is_ok()
}

fn translate_compressed(format: Format, caps: &Capabilities) -> Result<NativeFormat> {
    use Format::*;
    let (internal, available, ext) = match format {
        Bc1 => (gl::COMPRESSED_RGBA_S3TC_DXT1_EXT, caps.s3tc, "WEBGL_compressed_texture_s3tc"),
        Bc2 => (gl::COMPRESSED_RGBA_S3TC_DXT3_EXT, caps.s3tc, "WEBGL_compressed_texture_s3tc"),
        Bc3 => (gl::COMPRESSED_RGBA_S3TC_DXT5_EXT, caps.s3tc, "WEBGL_compressed_texture_s3tc"),
        Bc1Srgb => (gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT, caps.s3tc_srgb, "WEBGL_compressed_texture_s3tc_srgb"),
        Bc2Srgb => (gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT, caps.s3tc_srgb, "WEBGL_compressed_texture_s3tc_srgb"),
        Bc3Srgb => (gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT, caps.s3tc_srgb, "WEBGL_compressed_texture_s3tc_srgb"),
        Bc4Unorm => (gl::COMPRESSED_RED_RGTC1_EXT, caps.rgtc, "EXT_texture_compression_rgtc"),
        Bc4Snorm => (gl::COMPRESSED_SIGNED_RED_RGTC1_EXT, caps.rgtc, "EXT_texture_compression_rgtc"),
        Bc5Unorm => (gl::COMPRESSED_RED_GREEN_RGTC2_EXT, caps.rgtc, "EXT_texture_compression_rgtc"),
        Bc5Snorm => (gl::COMPRESSED_SIGNED_RED_GREEN_RGTC2_EXT, caps.rgtc, "EXT_texture_compression_rgtc"),
        other => return Err(GpuError::Native(format!("{other:?} flagged compressed without a block encoding"))),
    };
    ensure_supported!(available, "{format:?} needs {ext}");
    Ok(NativeFormat::new(internal, internal, gl::NONE))
}

fn translate_depth(format: Format, caps: &Capabilities) -> Result<NativeFormat> {
    match format {
        Format::D24S8 if caps.webgl2 => Ok(NativeFormat::new(
            gl::DEPTH24_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
        )),
        Format::D24S8 => {
            ensure_supported!(caps.depth_texture, "D24S8 textures need WEBGL_depth_texture");
            Ok(NativeFormat::new(gl::DEPTH_STENCIL, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8))
        }
        Format::D24 if caps.webgl2 => Ok(NativeFormat::new(
            gl::DEPTH_COMPONENT24,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_INT,
        )),
        Format::D24 => {
            ensure_supported!(caps.depth_texture, "D24 textures need WEBGL_depth_texture");
            Ok(NativeFormat::new(gl::DEPTH_COMPONENT, gl::DEPTH_COMPONENT, gl::UNSIGNED_INT))
        }
        Format::D32F => {
            ensure_supported!(caps.webgl2, "D32F needs WebGL2");
            Ok(NativeFormat::new(gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT))
        }
        Format::D32FS8 => {
            ensure_supported!(caps.webgl2, "D32FS8 needs WebGL2");
            Ok(NativeFormat::new(
                gl::DEPTH32F_STENCIL8,
                gl::DEPTH_STENCIL,
                gl::FLOAT_32_UNSIGNED_INT_24_8_REV,
            ))
        }
        other => Err(GpuError::Native(format!("{other:?} flagged depth without a depth encoding"))),
    }
}

fn translate_packed(format: Format, caps: &Capabilities) -> NativeFormat {
    let (sized, unsized_format, ty) = match format {
        Format::U16Rgba5551 => (gl::RGB5_A1, gl::RGBA, gl::UNSIGNED_SHORT_5_5_5_1),
        Format::U16Rgb565 => (gl::RGB565, gl::RGB, gl::UNSIGNED_SHORT_5_6_5),
        _ => (gl::RGBA4, gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4),
    };
    let internal = if caps.webgl2 { sized } else { unsized_format };
    NativeFormat::new(internal, unsized_format, ty)
}

fn translate_component_type(ty: ComponentType, caps: &Capabilities) -> Result<u32> {
    Ok(match ty {
        ComponentType::U8 => gl::UNSIGNED_BYTE,
        ComponentType::S8 => gl::BYTE,
        ComponentType::U16 => gl::UNSIGNED_SHORT,
        ComponentType::S16 => gl::SHORT,
        ComponentType::U32 => gl::UNSIGNED_INT,
        ComponentType::S32 => gl::INT,
        ComponentType::F16 if caps.webgl2 => gl::HALF_FLOAT,
        ComponentType::F16 => {
            ensure_supported!(caps.half_float_textures, "half-float textures need OES_texture_half_float");
            gl::HALF_FLOAT_OES
        }
        ComponentType::F32 => {
            ensure_supported!(caps.float_textures, "float textures need OES_texture_float");
            gl::FLOAT
        }
        ComponentType::PackedU16 | ComponentType::Block | ComponentType::DepthStencil => {
            return Err(GpuError::Native(format!("{ty:?} has no plain component type")));
        }
    })
}

fn channel_format(components: u32, integer: bool) -> u32 {
    match (components, integer) {
        (1, false) => gl::RED,
        (2, false) => gl::RG,
        (3, false) => gl::RGB,
        (_, false) => gl::RGBA,
        (1, true) => gl::RED_INTEGER,
        (2, true) => gl::RG_INTEGER,
        (3, true) => gl::RGB_INTEGER,
        (_, true) => gl::RGBA_INTEGER,
    }
}

fn translate_sized(format: Format, ty: u32, caps: &Capabilities) -> Result<NativeFormat> {
    use Format::*;

    if format == Alpha {
        return Ok(NativeFormat::new(gl::ALPHA, gl::ALPHA, ty));
    }

    let internal = match format {
        U8R => gl::R8,
        U8Rg => gl::RG8,
        U8Rgb | U8RgbRt => gl::RGB8,
        U8Rgba | U8RgbaRt => gl::RGBA8,
        U8RgbSrgb => gl::SRGB8,
        U8RgbaSrgb | U8RgbaRtSrgb => gl::SRGB8_ALPHA8,
        S8R => gl::R8_SNORM,
        S8Rg => gl::RG8_SNORM,
        S8Rgb => gl::RGB8_SNORM,
        S8Rgba => gl::RGBA8_SNORM,
        U16R => gl::R16UI,
        U16Rg => gl::RG16UI,
        U16Rgba => gl::RGBA16UI,
        S16R => gl::R16I,
        S16Rg => gl::RG16I,
        S16Rgba => gl::RGBA16I,
        U16RNorm | U16RgNorm | U16RgbaNorm | S16RNorm | S16RgNorm | S16RgbaNorm => {
            ensure_supported!(caps.norm16, "{format:?} needs EXT_texture_norm16");
            match format {
                U16RNorm => gl::R16_EXT,
                U16RgNorm => gl::RG16_EXT,
                U16RgbaNorm => gl::RGBA16_EXT,
                S16RNorm => gl::R16_SNORM_EXT,
                S16RgNorm => gl::RG16_SNORM_EXT,
                _ => gl::RGBA16_SNORM_EXT,
            }
        }
        U32R => gl::R32UI,
        U32Rg => gl::RG32UI,
        U32Rgba => gl::RGBA32UI,
        S32R => gl::R32I,
        S32Rg => gl::RG32I,
        S32Rgba => gl::RGBA32I,
        F16R => gl::R16F,
        F16Rg => gl::RG16F,
        F16Rgb => gl::RGB16F,
        F16Rgba => gl::RGBA16F,
        F32R => gl::R32F,
        F32Rg => gl::RG32F,
        F32Rgb => gl::RGB32F,
        F32Rgba => gl::RGBA32F,
        other => return Err(GpuError::Native(format!("{other:?} missing from the sized format table"))),
    };

    // sRGB formats upload through the plain RGB(A) channel layout.
    let channels = channel_format(format.component_count(), format.is_integer());
    Ok(NativeFormat::new(internal, channels, ty))
}

fn translate_unsized(format: Format, ty: u32) -> Result<NativeFormat> {
    use Format::*;

    ensure_supported!(!format.is_srgb(), "{format:?} needs WebGL2");
    ensure_supported!(!format.is_integer(), "integer format {format:?} needs WebGL2");

    let fmt = match format {
        Alpha => gl::ALPHA,
        U8R => gl::LUMINANCE,
        U8Rg => gl::LUMINANCE_ALPHA,
        U8Rgb | U8RgbRt => gl::RGB,
        U8Rgba | U8RgbaRt => gl::RGBA,
        F16R | F32R => gl::LUMINANCE,
        F16Rg | F32Rg => gl::LUMINANCE_ALPHA,
        F16Rgb | F32Rgb => gl::RGB,
        F16Rgba | F32Rgba => gl::RGBA,
        _ => return Err(GpuError::Unsupported(format!("{format:?} needs WebGL2"))),
    };
    Ok(NativeFormat::new(fmt, fmt, ty))
}

// ── renderbuffers ─────────────────────────────────────────────────────────

/// Internal format for `renderbufferStorage*`.
pub fn translate_renderbuffer_format(format: Format, caps: &Capabilities) -> Result<u32> {
    ensure_precondition!(!format.is_compressed(), "{format:?} cannot back a renderbuffer");

    if caps.webgl2 {
        if matches!(format.component_type(), ComponentType::F16 | ComponentType::F32) {
            ensure_supported!(caps.color_buffer_float, "{format:?} render targets need EXT_color_buffer_float");
        }
        return translate_texture_format(format, caps).map(|n| n.internal_format);
    }

    Ok(match format {
        Format::D24S8 => gl::DEPTH_STENCIL,
        Format::D24 => gl::DEPTH_COMPONENT16,
        Format::U8Rgba | Format::U8RgbaRt | Format::U16Rgba4444 => gl::RGBA4,
        Format::U8Rgb | Format::U8RgbRt | Format::U16Rgb565 => gl::RGB565,
        Format::U16Rgba5551 => gl::RGB5_A1,
        other => return Err(GpuError::Unsupported(format!("{other:?} renderbuffers need WebGL2"))),
    })
}

/// Framebuffer attachment point for a depth/stencil format.
pub fn depth_stencil_attachment(format: Format) -> u32 {
    if format.has_stencil() {
        gl::DEPTH_STENCIL_ATTACHMENT
    } else {
        gl::DEPTH_ATTACHMENT
    }
}

// ── vertex input ──────────────────────────────────────────────────────────

/// Arguments of `vertexAttrib(I)Pointer` for one attribute format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NativeVertexFormat {
    pub size: i32,
    pub ty: u32,
    pub normalized: bool,
    /// Use `vertexAttribIPointer`.
    pub integer: bool,
}

pub fn translate_vertex_format(format: Format, caps: &Capabilities) -> Result<NativeVertexFormat> {
    let component = format.component_type();
    ensure_precondition!(
        !matches!(component, ComponentType::PackedU16 | ComponentType::Block | ComponentType::DepthStencil),
        "{format:?} is not a vertex format"
    );
    ensure_precondition!(format != Format::Alpha && !format.is_srgb(), "{format:?} is not a vertex format");

    let ty = match component {
        ComponentType::F16 => {
            ensure_supported!(caps.webgl2, "half-float vertex attributes need WebGL2");
            gl::HALF_FLOAT
        }
        ComponentType::U32 | ComponentType::S32 if !caps.webgl2 => {
            return Err(GpuError::Unsupported(format!("{format:?} vertex attributes need WebGL2")));
        }
        other => translate_component_type(other, caps)?,
    };

    Ok(NativeVertexFormat {
        size: format.component_count() as i32,
        ty,
        normalized: format.flags().contains(super::FormatFlags::NORMALIZED),
        integer: format.is_integer() && caps.webgl2,
    })
}

/// Element type for `drawElements`.
pub fn translate_index_format(format: Format, caps: &Capabilities) -> Result<u32> {
    match format {
        Format::U16R => Ok(gl::UNSIGNED_SHORT),
        Format::U32R => {
            ensure_supported!(caps.element_index_uint, "32-bit indices need OES_element_index_uint");
            Ok(gl::UNSIGNED_INT)
        }
        other => Err(GpuError::Precondition(format!("{other:?} is not an index format"))),
    }
}

// ── pipeline state ────────────────────────────────────────────────────────

pub fn translate_topology(topology: PrimitiveTopology) -> u32 {
    match topology {
        PrimitiveTopology::Points => gl::POINTS,
        PrimitiveTopology::Lines => gl::LINES,
        PrimitiveTopology::LineStrip => gl::LINE_STRIP,
        PrimitiveTopology::Triangles => gl::TRIANGLES,
        PrimitiveTopology::TriangleStrip => gl::TRIANGLE_STRIP,
    }
}

pub fn translate_compare(func: CompareFunction) -> u32 {
    match func {
        CompareFunction::Never => gl::NEVER,
        CompareFunction::Less => gl::LESS,
        CompareFunction::Equal => gl::EQUAL,
        CompareFunction::LessEqual => gl::LEQUAL,
        CompareFunction::Greater => gl::GREATER,
        CompareFunction::NotEqual => gl::NOTEQUAL,
        CompareFunction::GreaterEqual => gl::GEQUAL,
        CompareFunction::Always => gl::ALWAYS,
    }
}

pub fn translate_blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => gl::ZERO,
        BlendFactor::One => gl::ONE,
        BlendFactor::Src => gl::SRC_COLOR,
        BlendFactor::OneMinusSrc => gl::ONE_MINUS_SRC_COLOR,
        BlendFactor::Dst => gl::DST_COLOR,
        BlendFactor::OneMinusDst => gl::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => gl::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => gl::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => gl::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => gl::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => gl::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::ConstantAlpha => gl::CONSTANT_ALPHA,
        BlendFactor::OneMinusConstantAlpha => gl::ONE_MINUS_CONSTANT_ALPHA,
        BlendFactor::SrcAlphaSaturate => gl::SRC_ALPHA_SATURATE,
    }
}

pub fn translate_blend_mode(mode: BlendMode) -> u32 {
    match mode {
        BlendMode::Add => gl::FUNC_ADD,
        BlendMode::Subtract => gl::FUNC_SUBTRACT,
        BlendMode::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
        BlendMode::Min => gl::MIN,
        BlendMode::Max => gl::MAX,
    }
}

pub fn translate_stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => gl::KEEP,
        StencilOp::Zero => gl::ZERO,
        StencilOp::Replace => gl::REPLACE,
        StencilOp::Invert => gl::INVERT,
        StencilOp::IncrementClamp => gl::INCR,
        StencilOp::DecrementClamp => gl::DECR,
        StencilOp::IncrementWrap => gl::INCR_WRAP,
        StencilOp::DecrementWrap => gl::DECR_WRAP,
    }
}

/// `None` means face culling is disabled.
pub fn translate_cull_mode(mode: CullMode) -> Option<u32> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(gl::FRONT),
        CullMode::Back => Some(gl::BACK),
        CullMode::FrontAndBack => Some(gl::FRONT_AND_BACK),
    }
}

pub fn translate_front_face(face: FrontFace) -> u32 {
    match face {
        FrontFace::Ccw => gl::CCW,
        FrontFace::Cw => gl::CW,
    }
}

// ── sampling ──────────────────────────────────────────────────────────────

pub fn translate_address_mode(mode: AddressMode) -> u32 {
    match mode {
        AddressMode::ClampToEdge => gl::CLAMP_TO_EDGE,
        AddressMode::Repeat => gl::REPEAT,
        AddressMode::MirroredRepeat => gl::MIRRORED_REPEAT,
    }
}

pub fn translate_mag_filter(filter: FilterMode) -> u32 {
    match filter {
        FilterMode::Nearest => gl::NEAREST,
        FilterMode::Linear => gl::LINEAR,
    }
}

pub fn translate_min_filter(filter: FilterMode, mipmap: MipmapFilterMode) -> u32 {
    match (filter, mipmap) {
        (FilterMode::Nearest, MipmapFilterMode::NoMip) => gl::NEAREST,
        (FilterMode::Linear, MipmapFilterMode::NoMip) => gl::LINEAR,
        (FilterMode::Nearest, MipmapFilterMode::Nearest) => gl::NEAREST_MIPMAP_NEAREST,
        (FilterMode::Linear, MipmapFilterMode::Nearest) => gl::LINEAR_MIPMAP_NEAREST,
        (FilterMode::Nearest, MipmapFilterMode::Linear) => gl::NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, MipmapFilterMode::Linear) => gl::LINEAR_MIPMAP_LINEAR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gl::{extensions, RecordingContext};

    fn webgl2_full() -> Capabilities {
        let mut ctx = RecordingContext::webgl2();
        for ext in [extensions::COMPRESSED_S3TC, extensions::COMPRESSED_S3TC_SRGB, extensions::COMPRESSED_RGTC] {
            ctx = ctx.with_extension(ext);
        }
        Capabilities::resolve(&ctx)
    }

    fn webgl1_plain() -> Capabilities {
        Capabilities::resolve(&RecordingContext::webgl1())
    }

    // ── totality ──────────────────────────────────────────────────────────

    #[test]
    fn every_format_translates_on_full_webgl2() {
        let caps = webgl2_full();
        for format in Format::ALL {
            let native = translate_texture_format(format, &caps);
            assert!(native.is_ok(), "{format:?}: {native:?}");
        }
    }

    #[test]
    fn webgl1_only_reports_unsupported() {
        let caps = webgl1_plain();
        for format in Format::ALL {
            if let Err(e) = translate_texture_format(format, &caps) {
                assert_eq!(e.kind(), ErrorKind::Unsupported, "{format:?}: {e}");
            }
        }
    }

    #[test]
    fn compressed_needs_extension() {
        let caps = Capabilities::resolve(&RecordingContext::webgl2().without_extension(extensions::COMPRESSED_S3TC));
        let err = translate_texture_format(Format::Bc1, &caps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let ok = translate_texture_format(Format::Bc1, &webgl2_full()).unwrap();
        assert_eq!(ok.internal_format, gl::COMPRESSED_RGBA_S3TC_DXT1_EXT);
    }

    // ── depth ─────────────────────────────────────────────────────────────

    #[test]
    fn depth_formats_use_dedicated_enums() {
        let caps = webgl2_full();
        assert_eq!(
            translate_texture_format(Format::D24S8, &caps).unwrap(),
            NativeFormat::new(gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8)
        );
        assert_eq!(
            translate_texture_format(Format::D32F, &caps).unwrap(),
            NativeFormat::new(gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT)
        );
        assert_eq!(
            translate_texture_format(Format::D32FS8, &caps).unwrap().ty,
            gl::FLOAT_32_UNSIGNED_INT_24_8_REV
        );
    }

    #[test]
    fn webgl1_depth_needs_depth_texture() {
        assert!(translate_texture_format(Format::D24S8, &webgl1_plain()).is_err());

        let caps = Capabilities::resolve(&RecordingContext::webgl1().with_extension(extensions::DEPTH_TEXTURE));
        assert_eq!(
            translate_texture_format(Format::D24S8, &caps).unwrap(),
            NativeFormat::new(gl::DEPTH_STENCIL, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8)
        );
        assert!(translate_texture_format(Format::D32F, &caps).is_err());
    }

    // ── color ─────────────────────────────────────────────────────────────

    #[test]
    fn webgl1_uses_luminance_for_one_and_two_channels() {
        let caps = webgl1_plain();
        assert_eq!(translate_texture_format(Format::U8R, &caps).unwrap().format, gl::LUMINANCE);
        assert_eq!(translate_texture_format(Format::U8Rg, &caps).unwrap().format, gl::LUMINANCE_ALPHA);
        assert_eq!(
            translate_texture_format(Format::U8Rgba, &caps).unwrap(),
            NativeFormat::new(gl::RGBA, gl::RGBA, gl::UNSIGNED_BYTE)
        );
    }

    #[test]
    fn integer_formats_use_integer_channels() {
        let n = translate_texture_format(Format::U32Rg, &webgl2_full()).unwrap();
        assert_eq!(n, NativeFormat::new(gl::RG32UI, gl::RG_INTEGER, gl::UNSIGNED_INT));
    }

    #[test]
    fn srgb_uploads_as_rgba() {
        let n = translate_texture_format(Format::U8RgbaSrgb, &webgl2_full()).unwrap();
        assert_eq!(n, NativeFormat::new(gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE));
    }

    #[test]
    fn half_float_on_webgl1_uses_oes_type() {
        let caps = Capabilities::resolve(&RecordingContext::webgl1().with_extension(extensions::TEXTURE_HALF_FLOAT));
        assert_eq!(translate_texture_format(Format::F16Rgba, &caps).unwrap().ty, gl::HALF_FLOAT_OES);
        assert!(translate_texture_format(Format::F32Rgba, &caps).is_err());
    }

    // ── renderbuffer / vertex / index ─────────────────────────────────────

    #[test]
    fn webgl1_renderbuffers() {
        let caps = webgl1_plain();
        assert_eq!(translate_renderbuffer_format(Format::U8RgbaRt, &caps).unwrap(), gl::RGBA4);
        assert_eq!(translate_renderbuffer_format(Format::D24, &caps).unwrap(), gl::DEPTH_COMPONENT16);
        assert_eq!(translate_renderbuffer_format(Format::D24S8, &caps).unwrap(), gl::DEPTH_STENCIL);
        assert!(translate_renderbuffer_format(Format::D32F, &caps).is_err());
    }

    #[test]
    fn float_renderbuffers_need_color_buffer_float() {
        let caps = Capabilities::resolve(&RecordingContext::webgl2().without_extension(extensions::COLOR_BUFFER_FLOAT));
        assert!(translate_renderbuffer_format(Format::F16Rgba, &caps).is_err());
        assert_eq!(translate_renderbuffer_format(Format::F16Rgba, &webgl2_full()).unwrap(), gl::RGBA16F);
    }

    #[test]
    fn vertex_formats() {
        let caps = webgl2_full();
        let f = translate_vertex_format(Format::F32Rgb, &caps).unwrap();
        assert_eq!((f.size, f.ty, f.normalized, f.integer), (3, gl::FLOAT, false, false));

        let n = translate_vertex_format(Format::U8Rgba, &caps).unwrap();
        assert!(n.normalized && !n.integer);

        let i = translate_vertex_format(Format::U16Rg, &caps).unwrap();
        assert!(i.integer);

        let e = translate_vertex_format(Format::D24, &caps).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn index_formats() {
        assert_eq!(translate_index_format(Format::U16R, &webgl1_plain()).unwrap(), gl::UNSIGNED_SHORT);
        assert!(translate_index_format(Format::U32R, &webgl1_plain()).is_err());
        assert_eq!(translate_index_format(Format::U32R, &webgl2_full()).unwrap(), gl::UNSIGNED_INT);
        assert_eq!(
            translate_index_format(Format::F32R, &webgl2_full()).unwrap_err().kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn min_filter_table() {
        assert_eq!(translate_min_filter(FilterMode::Linear, MipmapFilterMode::NoMip), gl::LINEAR);
        assert_eq!(
            translate_min_filter(FilterMode::Linear, MipmapFilterMode::Linear),
            gl::LINEAR_MIPMAP_LINEAR
        );
        assert_eq!(translate_cull_mode(CullMode::None), None);
    }
}
