//! Pixel and vertex formats.
//!
//! [`Format`] is API-agnostic; [`translate`] maps it (and the other
//! descriptor enums) onto WebGL enums for a given set of capabilities.

pub mod translate;

bitflags::bitflags! {
    /// Per-format properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatFlags: u8 {
        /// Integer components are read as normalized floats.
        const NORMALIZED = 1 << 0;
        const SRGB = 1 << 1;
        const DEPTH = 1 << 2;
        const STENCIL = 1 << 3;
        /// Only meant for render targets (renderbuffer-friendly layout).
        const RENDER_TARGET = 1 << 4;
        const COMPRESSED = 1 << 5;
    }
}

/// Storage type of a single component.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    F16,
    F32,
    /// Several components packed into one 16-bit word.
    PackedU16,
    /// 4x4 block compression.
    Block,
    DepthStencil,
}

impl ComponentType {
    pub fn byte_size(self) -> u32 {
        match self {
            ComponentType::U8 | ComponentType::S8 => 1,
            ComponentType::U16 | ComponentType::S16 | ComponentType::F16 => 2,
            ComponentType::U32 | ComponentType::S32 | ComponentType::F32 => 4,
            ComponentType::PackedU16 => 2,
            ComponentType::Block | ComponentType::DepthStencil => 0,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ComponentType::U8
                | ComponentType::S8
                | ComponentType::U16
                | ComponentType::S16
                | ComponentType::U32
                | ComponentType::S32
        )
    }
}

/// Pixel format of textures, render targets and vertex attributes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    /// Single 8-bit alpha channel.
    Alpha,

    U8R,
    U8Rg,
    U8Rgb,
    U8Rgba,
    U8RgbSrgb,
    U8RgbaSrgb,

    S8R,
    S8Rg,
    S8Rgb,
    S8Rgba,

    U16R,
    U16Rg,
    U16Rgba,
    U16RNorm,
    U16RgNorm,
    U16RgbaNorm,

    S16R,
    S16Rg,
    S16Rgba,
    S16RNorm,
    S16RgNorm,
    S16RgbaNorm,

    U32R,
    U32Rg,
    U32Rgba,

    S32R,
    S32Rg,
    S32Rgba,

    F16R,
    F16Rg,
    F16Rgb,
    F16Rgba,

    F32R,
    F32Rg,
    F32Rgb,
    F32Rgba,

    U16Rgba5551,
    U16Rgb565,
    U16Rgba4444,

    Bc1,
    Bc1Srgb,
    Bc2,
    Bc2Srgb,
    Bc3,
    Bc3Srgb,
    Bc4Unorm,
    Bc4Snorm,
    Bc5Unorm,
    Bc5Snorm,

    D24,
    D24S8,
    D32F,
    D32FS8,

    U8RgbRt,
    U8RgbaRt,
    U8RgbaRtSrgb,
}

impl Format {
    pub const ALL: [Format; 57] = [
        Format::Alpha,
        Format::U8R,
        Format::U8Rg,
        Format::U8Rgb,
        Format::U8Rgba,
        Format::U8RgbSrgb,
        Format::U8RgbaSrgb,
        Format::S8R,
        Format::S8Rg,
        Format::S8Rgb,
        Format::S8Rgba,
        Format::U16R,
        Format::U16Rg,
        Format::U16Rgba,
        Format::U16RNorm,
        Format::U16RgNorm,
        Format::U16RgbaNorm,
        Format::S16R,
        Format::S16Rg,
        Format::S16Rgba,
        Format::S16RNorm,
        Format::S16RgNorm,
        Format::S16RgbaNorm,
        Format::U32R,
        Format::U32Rg,
        Format::U32Rgba,
        Format::S32R,
        Format::S32Rg,
        Format::S32Rgba,
        Format::F16R,
        Format::F16Rg,
        Format::F16Rgb,
        Format::F16Rgba,
        Format::F32R,
        Format::F32Rg,
        Format::F32Rgb,
        Format::F32Rgba,
        Format::U16Rgba5551,
        Format::U16Rgb565,
        Format::U16Rgba4444,
        Format::Bc1,
        Format::Bc1Srgb,
        Format::Bc2,
        Format::Bc2Srgb,
        Format::Bc3,
        Format::Bc3Srgb,
        Format::Bc4Unorm,
        Format::Bc4Snorm,
        Format::Bc5Unorm,
        Format::Bc5Snorm,
        Format::D24,
        Format::D24S8,
        Format::D32F,
        Format::D32FS8,
        Format::U8RgbRt,
        Format::U8RgbaRt,
        Format::U8RgbaRtSrgb,
    ];

    pub fn component_type(self) -> ComponentType {
        use Format::*;
        match self {
            Alpha | U8R | U8Rg | U8Rgb | U8Rgba | U8RgbSrgb | U8RgbaSrgb => ComponentType::U8,
            U8RgbRt | U8RgbaRt | U8RgbaRtSrgb => ComponentType::U8,
            S8R | S8Rg | S8Rgb | S8Rgba => ComponentType::S8,
            U16R | U16Rg | U16Rgba | U16RNorm | U16RgNorm | U16RgbaNorm => ComponentType::U16,
            S16R | S16Rg | S16Rgba | S16RNorm | S16RgNorm | S16RgbaNorm => ComponentType::S16,
            U32R | U32Rg | U32Rgba => ComponentType::U32,
            S32R | S32Rg | S32Rgba => ComponentType::S32,
            F16R | F16Rg | F16Rgb | F16Rgba => ComponentType::F16,
            F32R | F32Rg | F32Rgb | F32Rgba => ComponentType::F32,
            U16Rgba5551 | U16Rgb565 | U16Rgba4444 => ComponentType::PackedU16,
            Bc1 | Bc1Srgb | Bc2 | Bc2Srgb | Bc3 | Bc3Srgb | Bc4Unorm | Bc4Snorm | Bc5Unorm
            | Bc5Snorm => ComponentType::Block,
            D24 | D24S8 | D32F | D32FS8 => ComponentType::DepthStencil,
        }
    }

    pub fn component_count(self) -> u32 {
        use Format::*;
        match self {
            Alpha | U8R | S8R | U16R | U16RNorm | S16R | S16RNorm | U32R | S32R | F16R | F32R => 1,
            Bc4Unorm | Bc4Snorm | D24 | D32F => 1,
            U8Rg | S8Rg | U16Rg | U16RgNorm | S16Rg | S16RgNorm | U32Rg | S32Rg | F16Rg | F32Rg => 2,
            Bc5Unorm | Bc5Snorm | D24S8 | D32FS8 => 2,
            U8Rgb | U8RgbSrgb | U8RgbRt | S8Rgb | F16Rgb | F32Rgb | U16Rgb565 => 3,
            _ => 4,
        }
    }

    pub fn flags(self) -> FormatFlags {
        use Format::*;
        match self {
            Alpha | U8R | U8Rg | U8Rgb | U8Rgba | S8R | S8Rg | S8Rgb | S8Rgba => {
                FormatFlags::NORMALIZED
            }
            U16RNorm | U16RgNorm | U16RgbaNorm | S16RNorm | S16RgNorm | S16RgbaNorm => {
                FormatFlags::NORMALIZED
            }
            U16Rgba5551 | U16Rgb565 | U16Rgba4444 => FormatFlags::NORMALIZED,
            U8RgbSrgb | U8RgbaSrgb => FormatFlags::NORMALIZED | FormatFlags::SRGB,
            Bc1 | Bc2 | Bc3 | Bc4Unorm | Bc4Snorm | Bc5Unorm | Bc5Snorm => {
                FormatFlags::NORMALIZED | FormatFlags::COMPRESSED
            }
            Bc1Srgb | Bc2Srgb | Bc3Srgb => {
                FormatFlags::NORMALIZED | FormatFlags::SRGB | FormatFlags::COMPRESSED
            }
            D24 | D32F => FormatFlags::DEPTH,
            D24S8 | D32FS8 => FormatFlags::DEPTH | FormatFlags::STENCIL,
            U8RgbRt | U8RgbaRt => FormatFlags::NORMALIZED | FormatFlags::RENDER_TARGET,
            U8RgbaRtSrgb => FormatFlags::NORMALIZED | FormatFlags::SRGB | FormatFlags::RENDER_TARGET,
            _ => FormatFlags::empty(),
        }
    }

    pub fn is_compressed(self) -> bool {
        self.flags().contains(FormatFlags::COMPRESSED)
    }

    pub fn is_depth(self) -> bool {
        self.flags().contains(FormatFlags::DEPTH)
    }

    pub fn has_stencil(self) -> bool {
        self.flags().contains(FormatFlags::STENCIL)
    }

    pub fn is_srgb(self) -> bool {
        self.flags().contains(FormatFlags::SRGB)
    }

    /// Integer format sampled without normalization.
    pub fn is_integer(self) -> bool {
        self.component_type().is_integer() && !self.flags().contains(FormatFlags::NORMALIZED)
    }

    /// Bytes per 4x4 block for compressed formats.
    pub fn block_byte_size(self) -> Option<u32> {
        use Format::*;
        match self {
            Bc1 | Bc1Srgb | Bc4Unorm | Bc4Snorm => Some(8),
            Bc2 | Bc2Srgb | Bc3 | Bc3Srgb | Bc5Unorm | Bc5Snorm => Some(16),
            _ => None,
        }
    }

    /// Bytes per pixel of an uncompressed format.
    pub fn pixel_byte_size(self) -> u32 {
        match self.component_type() {
            ComponentType::PackedU16 => 2,
            ComponentType::Block => 0,
            ComponentType::DepthStencil => match self {
                Format::D32FS8 => 8,
                _ => 4,
            },
            ty => ty.byte_size() * self.component_count(),
        }
    }

    /// Tightly packed byte size of one 2D image of this format.
    pub fn image_byte_size(self, width: u32, height: u32) -> u32 {
        match self.block_byte_size() {
            Some(block) => width.div_ceil(4) * height.div_ceil(4) * block,
            None => width * height * self.pixel_byte_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_every_variant_once() {
        let mut seen = std::collections::HashSet::new();
        for f in Format::ALL {
            seen.insert(f);
        }
        assert_eq!(seen.len(), 57);
    }

    #[test]
    fn integer_vs_normalized() {
        assert!(Format::U16R.is_integer());
        assert!(!Format::U16RNorm.is_integer());
        assert!(!Format::U8Rgba.is_integer());
        assert!(!Format::F32R.is_integer());
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(Format::U8Rgba.pixel_byte_size(), 4);
        assert_eq!(Format::F32Rgb.pixel_byte_size(), 12);
        assert_eq!(Format::U16Rgb565.pixel_byte_size(), 2);
        assert_eq!(Format::D32FS8.pixel_byte_size(), 8);
        assert_eq!(Format::Bc1.image_byte_size(8, 8), 32);
        assert_eq!(Format::Bc3.image_byte_size(5, 5), 64);
        assert_eq!(Format::U8Rgba.image_byte_size(2, 3), 24);
    }

    #[test]
    fn depth_flags() {
        assert!(Format::D24S8.is_depth() && Format::D24S8.has_stencil());
        assert!(Format::D32F.is_depth() && !Format::D32F.has_stencil());
        assert!(!Format::U8Rgba.is_depth());
    }
}
