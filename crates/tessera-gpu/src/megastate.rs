//! Fixed-function pipeline state.
//!
//! A [`MegaStateDescriptor`] is everything a draw needs besides program,
//! bindings and vertex input. Pipelines own one; the device cache mirrors
//! one and only issues native calls for fields that differ.

bitflags::bitflags! {
    /// Color channels written by a color attachment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelWriteMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const RGB = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL = Self::RGB.bits() | Self::ALPHA.bits();
    }
}

impl ChannelWriteMask {
    pub(crate) fn as_bools(self) -> (bool, bool, bool, bool) {
        (
            self.contains(Self::RED),
            self.contains(Self::GREEN),
            self.contains(Self::BLUE),
            self.contains(Self::ALPHA),
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Add,
    Subtract,
    ReverseSubtract,
    /// WebGL1 needs `EXT_blend_minmax`.
    Min,
    Max,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    Dst,
    OneMinusDst,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    fn uses_constant(self) -> bool {
        matches!(
            self,
            BlendFactor::ConstantColor
                | BlendFactor::OneMinusConstantColor
                | BlendFactor::ConstantAlpha
                | BlendFactor::OneMinusConstantAlpha
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChannelBlendState {
    pub blend_mode: BlendMode,
    pub blend_src_factor: BlendFactor,
    pub blend_dst_factor: BlendFactor,
}

impl ChannelBlendState {
    /// `src * 1 + dst * 0`: blending off.
    pub const REPLACE: Self = Self {
        blend_mode: BlendMode::Add,
        blend_src_factor: BlendFactor::One,
        blend_dst_factor: BlendFactor::Zero,
    };

    pub const fn new(blend_mode: BlendMode, blend_src_factor: BlendFactor, blend_dst_factor: BlendFactor) -> Self {
        Self { blend_mode, blend_src_factor, blend_dst_factor }
    }

    pub fn is_replace(&self) -> bool {
        *self == Self::REPLACE
    }

    pub(crate) fn uses_constant(&self) -> bool {
        self.blend_src_factor.uses_constant() || self.blend_dst_factor.uses_constant()
    }
}

impl Default for ChannelBlendState {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// Write mask and blend state of one color attachment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentState {
    pub channel_write_mask: ChannelWriteMask,
    pub rgb_blend_state: ChannelBlendState,
    pub alpha_blend_state: ChannelBlendState,
}

impl AttachmentState {
    /// Premultiplied-alpha "over" blending on all channels.
    pub fn premultiplied_over() -> Self {
        let over = ChannelBlendState::new(BlendMode::Add, BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
        Self {
            channel_write_mask: ChannelWriteMask::ALL,
            rgb_blend_state: over,
            alpha_blend_state: over,
        }
    }

    pub fn blend_enabled(&self) -> bool {
        !(self.rgb_blend_state.is_replace() && self.alpha_blend_state.is_replace())
    }

    pub(crate) fn uses_blend_constant(&self) -> bool {
        self.blend_enabled() && (self.rgb_blend_state.uses_constant() || self.alpha_blend_state.uses_constant())
    }

    pub(crate) fn uses_min_max(&self) -> bool {
        [self.rgb_blend_state, self.alpha_blend_state]
            .iter()
            .any(|s| matches!(s.blend_mode, BlendMode::Min | BlendMode::Max))
    }
}

impl Default for AttachmentState {
    fn default() -> Self {
        Self {
            channel_write_mask: ChannelWriteMask::ALL,
            rgb_blend_state: ChannelBlendState::REPLACE,
            alpha_blend_state: ChannelBlendState::REPLACE,
        }
    }
}

/// Linear RGBA color.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT_BLACK: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const OPAQUE_BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const OPAQUE_WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

/// Fixed-function state of a render pipeline.
///
/// `attachments_state` holds one entry per color attachment. Without
/// per-attachment blend support only index 0 is applied, to every
/// attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct MegaStateDescriptor {
    pub attachments_state: Vec<AttachmentState>,
    pub blend_constant: Color,
    pub depth_compare: CompareFunction,
    pub depth_write: bool,
    pub stencil_compare: CompareFunction,
    pub stencil_write: bool,
    pub stencil_pass_op: StencilOp,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_offset: bool,
}

impl Default for MegaStateDescriptor {
    fn default() -> Self {
        Self {
            attachments_state: vec![AttachmentState::default()],
            blend_constant: Color::TRANSPARENT_BLACK,
            depth_compare: CompareFunction::LessEqual,
            depth_write: true,
            stencil_compare: CompareFunction::Always,
            stencil_write: false,
            stencil_pass_op: StencilOp::Keep,
            cull_mode: CullMode::None,
            front_face: FrontFace::Ccw,
            polygon_offset: false,
        }
    }
}

impl MegaStateDescriptor {
    /// Default state with `count` identical color attachments.
    pub fn with_attachments(count: usize, state: AttachmentState) -> Self {
        Self {
            attachments_state: vec![state; count],
            ..Self::default()
        }
    }

    /// State applied to color attachment `index`.
    ///
    /// Missing entries fall back to the first one.
    pub fn attachment(&self, index: usize) -> AttachmentState {
        self.attachments_state
            .get(index)
            .or_else(|| self.attachments_state.first())
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn uses_min_max(&self) -> bool {
        self.attachments_state.iter().any(AttachmentState::uses_min_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let m = MegaStateDescriptor::default();
        assert_eq!(m.attachments_state.len(), 1);
        assert_eq!(m.attachments_state[0].channel_write_mask, ChannelWriteMask::ALL);
        assert!(!m.attachments_state[0].blend_enabled());
        assert_eq!(m.depth_compare, CompareFunction::LessEqual);
        assert!(m.depth_write);
        assert_eq!(m.stencil_compare, CompareFunction::Always);
    }

    #[test]
    fn over_blending_is_enabled() {
        let a = AttachmentState::premultiplied_over();
        assert!(a.blend_enabled());
        assert!(!a.uses_blend_constant());
        assert!(!a.uses_min_max());
    }

    #[test]
    fn attachment_falls_back_to_first() {
        let mut m = MegaStateDescriptor::default();
        m.attachments_state[0].channel_write_mask = ChannelWriteMask::RGB;
        assert_eq!(m.attachment(3).channel_write_mask, ChannelWriteMask::RGB);
    }

    #[test]
    fn write_mask_bools() {
        assert_eq!(ChannelWriteMask::RGB.as_bools(), (true, true, true, false));
        assert_eq!(ChannelWriteMask::ALL.bits(), 0b1111);
    }
}
