//! Mirror of the native context's bound state.
//!
//! Every binding and fixed-function change the device makes goes through
//! [`CachedDeviceState`]. Each setter compares against the mirror and only
//! calls into the context when the value differs, so re-applying identical
//! state is a native no-op. The mirror is only valid while nothing else
//! touches the context.

use crate::caps::Capabilities;
use crate::format::translate::{
    translate_blend_factor, translate_blend_mode, translate_compare, translate_cull_mode, translate_front_face,
    translate_stencil_op,
};
use crate::gl::{
    consts as gl, GlBuffer, GlContext, GlFramebuffer, GlProgram, GlRenderbuffer, GlSampler, GlTexture, GlVertexArray,
};
use crate::megastate::{
    AttachmentState, ChannelBlendState, ChannelWriteMask, Color, CompareFunction, CullMode, FrontFace,
    MegaStateDescriptor, StencilOp,
};

/// Blend and mask state of one draw buffer as the context sees it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct CachedAttachment {
    mask: ChannelWriteMask,
    blend: bool,
    rgb: ChannelBlendState,
    alpha: ChannelBlendState,
}

impl Default for CachedAttachment {
    fn default() -> Self {
        Self {
            mask: ChannelWriteMask::ALL,
            blend: false,
            rgb: ChannelBlendState::REPLACE,
            alpha: ChannelBlendState::REPLACE,
        }
    }
}

/// Image attached to a framebuffer attachment point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum AttachedImage {
    Texture { target: u32, texture: GlTexture },
    Renderbuffer(GlRenderbuffer),
}

#[derive(Debug)]
pub(crate) struct CachedDeviceState {
    webgl2: bool,
    indexed_blend: bool,
    multiple_render_targets: bool,

    attachments: Vec<CachedAttachment>,
    blend_constant: Color,
    depth_compare: CompareFunction,
    depth_write: bool,
    stencil_compare: CompareFunction,
    stencil_ref: u8,
    stencil_write: bool,
    stencil_pass_op: StencilOp,
    cull_mode: CullMode,
    /// Face last passed to `cullFace`; survives culling being disabled.
    cull_face: u32,
    front_face: FrontFace,
    polygon_offset: bool,

    scissor_enabled: bool,
    scissor: Option<[i32; 4]>,
    viewport: Option<[i32; 4]>,

    program: Option<GlProgram>,
    vertex_array: Option<GlVertexArray>,
    active_texture: u32,
    textures: Vec<Option<(u32, GlTexture)>>,
    samplers: Vec<Option<GlSampler>>,
    uniform_buffers: Vec<Option<(GlBuffer, i32, i32)>>,

    draw_framebuffer: Option<GlFramebuffer>,
    read_framebuffer: Option<GlFramebuffer>,
    /// Draw buffers of the device's render framebuffer.
    draw_buffers: Vec<u32>,
    /// Images attached to the device's render framebuffer.
    color_images: Vec<Option<AttachedImage>>,
    depth_image: Option<(u32, AttachedImage)>,
}

impl CachedDeviceState {
    pub(crate) fn new(caps: &Capabilities, texture_units: u32, uniform_buffers: u32, color_attachments: u32) -> Self {
        let attachment_slots = if caps.indexed_blend { color_attachments.max(1) } else { 1 };
        Self {
            webgl2: caps.webgl2,
            indexed_blend: caps.indexed_blend,
            multiple_render_targets: caps.multiple_render_targets,
            attachments: vec![CachedAttachment::default(); attachment_slots as usize],
            blend_constant: Color::TRANSPARENT_BLACK,
            depth_compare: CompareFunction::LessEqual,
            depth_write: true,
            stencil_compare: CompareFunction::Always,
            stencil_ref: 0,
            stencil_write: false,
            stencil_pass_op: StencilOp::Keep,
            cull_mode: CullMode::None,
            cull_face: gl::BACK,
            front_face: FrontFace::Ccw,
            polygon_offset: false,
            scissor_enabled: false,
            scissor: None,
            viewport: None,
            program: None,
            vertex_array: None,
            active_texture: 0,
            textures: vec![None; texture_units as usize],
            samplers: vec![None; texture_units as usize],
            uniform_buffers: vec![None; uniform_buffers as usize],
            draw_framebuffer: None,
            read_framebuffer: None,
            draw_buffers: vec![gl::COLOR_ATTACHMENT0],
            color_images: vec![None; color_attachments.max(1) as usize],
            depth_image: None,
        }
    }

    /// Issues the whole mirrored state so the context matches it.
    pub(crate) fn force_apply(&self, ctx: &mut dyn GlContext) {
        ctx.enable(gl::DEPTH_TEST);
        ctx.enable(gl::STENCIL_TEST);
        ctx.disable(gl::SCISSOR_TEST);
        ctx.disable(gl::CULL_FACE);
        ctx.disable(gl::POLYGON_OFFSET_FILL);
        ctx.polygon_offset(1.0, 1.0);

        if self.indexed_blend {
            for (i, a) in self.attachments.iter().enumerate() {
                let i = i as u32;
                let (r, g, b, al) = a.mask.as_bools();
                ctx.color_mask_i(i, r, g, b, al);
                if a.blend {
                    ctx.enable_i(gl::BLEND, i);
                } else {
                    ctx.disable_i(gl::BLEND, i);
                }
                ctx.blend_equation_separate_i(i, translate_blend_mode(a.rgb.blend_mode), translate_blend_mode(a.alpha.blend_mode));
                ctx.blend_func_separate_i(
                    i,
                    translate_blend_factor(a.rgb.blend_src_factor),
                    translate_blend_factor(a.rgb.blend_dst_factor),
                    translate_blend_factor(a.alpha.blend_src_factor),
                    translate_blend_factor(a.alpha.blend_dst_factor),
                );
            }
        } else {
            let a = self.attachments[0];
            let (r, g, b, al) = a.mask.as_bools();
            ctx.color_mask(r, g, b, al);
            if a.blend {
                ctx.enable(gl::BLEND);
            } else {
                ctx.disable(gl::BLEND);
            }
            ctx.blend_equation_separate(translate_blend_mode(a.rgb.blend_mode), translate_blend_mode(a.alpha.blend_mode));
            ctx.blend_func_separate(
                translate_blend_factor(a.rgb.blend_src_factor),
                translate_blend_factor(a.rgb.blend_dst_factor),
                translate_blend_factor(a.alpha.blend_src_factor),
                translate_blend_factor(a.alpha.blend_dst_factor),
            );
        }

        let [r, g, b, a] = self.blend_constant.to_array();
        ctx.blend_color(r, g, b, a);
        ctx.depth_func(translate_compare(self.depth_compare));
        ctx.depth_mask(self.depth_write);
        ctx.stencil_func(translate_compare(self.stencil_compare), self.stencil_ref as i32, 0xFF);
        ctx.stencil_mask(if self.stencil_write { 0xFF } else { 0 });
        ctx.stencil_op(gl::KEEP, gl::KEEP, translate_stencil_op(self.stencil_pass_op));
        ctx.cull_face(self.cull_face);
        ctx.front_face(translate_front_face(self.front_face));
        ctx.active_texture(gl::TEXTURE0 + self.active_texture);
    }

    // ── fixed function ───────────────────────────────────────────────────

    /// Applies a pipeline's fixed-function state.
    ///
    /// Without per-attachment blend control, attachment 0 of `mega` applies
    /// to every draw buffer.
    pub(crate) fn apply_mega_state(&mut self, ctx: &mut dyn GlContext, mega: &MegaStateDescriptor) {
        if self.indexed_blend {
            let count = mega.attachments_state.len().clamp(1, self.attachments.len());
            for i in 0..count {
                self.apply_attachment(ctx, i, mega.attachment(i));
            }
        } else {
            self.apply_attachment(ctx, 0, mega.attachment(0));
        }

        let uses_constant = mega.attachments_state.iter().any(AttachmentState::uses_blend_constant);
        if uses_constant && self.blend_constant != mega.blend_constant {
            let [r, g, b, a] = mega.blend_constant.to_array();
            ctx.blend_color(r, g, b, a);
            self.blend_constant = mega.blend_constant;
        }

        if self.depth_compare != mega.depth_compare {
            ctx.depth_func(translate_compare(mega.depth_compare));
            self.depth_compare = mega.depth_compare;
        }
        self.set_depth_write(ctx, mega.depth_write);

        if self.stencil_compare != mega.stencil_compare {
            self.stencil_compare = mega.stencil_compare;
            self.issue_stencil_func(ctx);
        }
        self.set_stencil_write(ctx, mega.stencil_write);
        if self.stencil_pass_op != mega.stencil_pass_op {
            ctx.stencil_op(gl::KEEP, gl::KEEP, translate_stencil_op(mega.stencil_pass_op));
            self.stencil_pass_op = mega.stencil_pass_op;
        }

        self.set_cull_mode(ctx, mega.cull_mode);
        if self.front_face != mega.front_face {
            ctx.front_face(translate_front_face(mega.front_face));
            self.front_face = mega.front_face;
        }
        if self.polygon_offset != mega.polygon_offset {
            if mega.polygon_offset {
                ctx.enable(gl::POLYGON_OFFSET_FILL);
            } else {
                ctx.disable(gl::POLYGON_OFFSET_FILL);
            }
            self.polygon_offset = mega.polygon_offset;
        }
    }

    fn apply_attachment(&mut self, ctx: &mut dyn GlContext, slot: usize, desired: AttachmentState) {
        self.set_color_mask(ctx, slot, desired.channel_write_mask);

        let indexed = self.indexed_blend;
        let index = slot as u32;
        let current = self.attachments[slot];
        let blend = desired.blend_enabled();

        if current.blend != blend {
            match (indexed, blend) {
                (true, true) => ctx.enable_i(gl::BLEND, index),
                (true, false) => ctx.disable_i(gl::BLEND, index),
                (false, true) => ctx.enable(gl::BLEND),
                (false, false) => ctx.disable(gl::BLEND),
            }
            self.attachments[slot].blend = blend;
        }
        if !blend {
            return;
        }

        let (rgb, alpha) = (desired.rgb_blend_state, desired.alpha_blend_state);
        if current.rgb.blend_mode != rgb.blend_mode || current.alpha.blend_mode != alpha.blend_mode {
            let (m_rgb, m_alpha) = (translate_blend_mode(rgb.blend_mode), translate_blend_mode(alpha.blend_mode));
            if indexed {
                ctx.blend_equation_separate_i(index, m_rgb, m_alpha);
            } else {
                ctx.blend_equation_separate(m_rgb, m_alpha);
            }
        }
        let factors = |s: ChannelBlendState| (s.blend_src_factor, s.blend_dst_factor);
        if factors(current.rgb) != factors(rgb) || factors(current.alpha) != factors(alpha) {
            let args = (
                translate_blend_factor(rgb.blend_src_factor),
                translate_blend_factor(rgb.blend_dst_factor),
                translate_blend_factor(alpha.blend_src_factor),
                translate_blend_factor(alpha.blend_dst_factor),
            );
            if indexed {
                ctx.blend_func_separate_i(index, args.0, args.1, args.2, args.3);
            } else {
                ctx.blend_func_separate(args.0, args.1, args.2, args.3);
            }
        }
        self.attachments[slot].rgb = rgb;
        self.attachments[slot].alpha = alpha;
    }

    fn set_color_mask(&mut self, ctx: &mut dyn GlContext, slot: usize, mask: ChannelWriteMask) {
        let slot = if self.indexed_blend { slot.min(self.attachments.len() - 1) } else { 0 };
        if self.attachments[slot].mask == mask {
            return;
        }
        let (r, g, b, a) = mask.as_bools();
        if self.indexed_blend {
            ctx.color_mask_i(slot as u32, r, g, b, a);
        } else {
            ctx.color_mask(r, g, b, a);
        }
        self.attachments[slot].mask = mask;
    }

    /// Enables writes to every channel of draw buffer `slot` before a clear.
    pub(crate) fn force_color_write_for_clear(&mut self, ctx: &mut dyn GlContext, slot: usize) {
        self.set_color_mask(ctx, slot, ChannelWriteMask::ALL);
    }

    pub(crate) fn force_depth_write(&mut self, ctx: &mut dyn GlContext) {
        self.set_depth_write(ctx, true);
    }

    pub(crate) fn force_stencil_write(&mut self, ctx: &mut dyn GlContext) {
        self.set_stencil_write(ctx, true);
    }

    fn set_depth_write(&mut self, ctx: &mut dyn GlContext, write: bool) {
        if self.depth_write != write {
            ctx.depth_mask(write);
            self.depth_write = write;
        }
    }

    fn set_stencil_write(&mut self, ctx: &mut dyn GlContext, write: bool) {
        if self.stencil_write != write {
            ctx.stencil_mask(if write { 0xFF } else { 0 });
            self.stencil_write = write;
        }
    }

    pub(crate) fn set_stencil_ref(&mut self, ctx: &mut dyn GlContext, value: u8) {
        if self.stencil_ref != value {
            self.stencil_ref = value;
            self.issue_stencil_func(ctx);
        }
    }

    fn issue_stencil_func(&self, ctx: &mut dyn GlContext) {
        ctx.stencil_func(translate_compare(self.stencil_compare), self.stencil_ref as i32, 0xFF);
    }

    fn set_cull_mode(&mut self, ctx: &mut dyn GlContext, mode: CullMode) {
        if self.cull_mode == mode {
            return;
        }
        match translate_cull_mode(mode) {
            None => ctx.disable(gl::CULL_FACE),
            Some(face) => {
                if self.cull_mode == CullMode::None {
                    ctx.enable(gl::CULL_FACE);
                }
                if self.cull_face != face {
                    ctx.cull_face(face);
                    self.cull_face = face;
                }
            }
        }
        self.cull_mode = mode;
    }

    pub(crate) fn set_scissor_enabled(&mut self, ctx: &mut dyn GlContext, enabled: bool) {
        if self.scissor_enabled != enabled {
            if enabled {
                ctx.enable(gl::SCISSOR_TEST);
            } else {
                ctx.disable(gl::SCISSOR_TEST);
            }
            self.scissor_enabled = enabled;
        }
    }

    pub(crate) fn set_scissor(&mut self, ctx: &mut dyn GlContext, rect: [i32; 4]) {
        if self.scissor != Some(rect) {
            ctx.scissor(rect[0], rect[1], rect[2], rect[3]);
            self.scissor = Some(rect);
        }
    }

    pub(crate) fn set_viewport(&mut self, ctx: &mut dyn GlContext, rect: [i32; 4]) {
        if self.viewport != Some(rect) {
            ctx.viewport(rect[0], rect[1], rect[2], rect[3]);
            self.viewport = Some(rect);
        }
    }

    // ── objects ──────────────────────────────────────────────────────────

    pub(crate) fn use_program(&mut self, ctx: &mut dyn GlContext, program: Option<GlProgram>) {
        if self.program != program {
            ctx.use_program(program);
            self.program = program;
        }
    }

    pub(crate) fn bind_vertex_array(&mut self, ctx: &mut dyn GlContext, vao: Option<GlVertexArray>) {
        if self.vertex_array != vao {
            ctx.bind_vertex_array(vao);
            self.vertex_array = vao;
        }
    }

    pub(crate) fn active_texture(&mut self, ctx: &mut dyn GlContext, unit: u32) {
        if self.active_texture != unit {
            ctx.active_texture(gl::TEXTURE0 + unit);
            self.active_texture = unit;
        }
    }

    /// Binds `texture` to `unit`. `None` unbinds whatever the unit holds.
    pub(crate) fn bind_texture(&mut self, ctx: &mut dyn GlContext, unit: u32, target: u32, texture: Option<GlTexture>) {
        let Some(slot) = self.textures.get(unit as usize).copied() else {
            return;
        };
        let desired = texture.map(|t| (target, t));
        if slot == desired {
            return;
        }
        let unbind_target = slot.map_or(target, |(t, _)| t);
        self.active_texture(ctx, unit);
        ctx.bind_texture(if texture.is_some() { target } else { unbind_target }, texture);
        self.textures[unit as usize] = desired;
    }

    pub(crate) fn bind_sampler(&mut self, ctx: &mut dyn GlContext, unit: u32, sampler: Option<GlSampler>) {
        if !self.webgl2 {
            return;
        }
        let Some(slot) = self.samplers.get_mut(unit as usize) else {
            return;
        };
        if *slot != sampler {
            ctx.bind_sampler(unit, sampler);
            *slot = sampler;
        }
    }

    pub(crate) fn bind_uniform_buffer_range(
        &mut self,
        ctx: &mut dyn GlContext,
        slot: u32,
        buffer: GlBuffer,
        offset: i32,
        size: i32,
    ) {
        let Some(cached) = self.uniform_buffers.get_mut(slot as usize) else {
            return;
        };
        let desired = Some((buffer, offset, size));
        if *cached != desired {
            ctx.bind_buffer_range(gl::UNIFORM_BUFFER, slot, Some(buffer), offset, size);
            *cached = desired;
        }
    }

    pub(crate) fn bind_draw_framebuffer(&mut self, ctx: &mut dyn GlContext, framebuffer: Option<GlFramebuffer>) {
        if self.draw_framebuffer == framebuffer {
            return;
        }
        if self.webgl2 {
            ctx.bind_framebuffer(gl::DRAW_FRAMEBUFFER, framebuffer);
        } else {
            ctx.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
            self.read_framebuffer = framebuffer;
        }
        self.draw_framebuffer = framebuffer;
    }

    pub(crate) fn bind_read_framebuffer(&mut self, ctx: &mut dyn GlContext, framebuffer: Option<GlFramebuffer>) {
        if self.read_framebuffer == framebuffer {
            return;
        }
        if self.webgl2 {
            ctx.bind_framebuffer(gl::READ_FRAMEBUFFER, framebuffer);
        } else {
            ctx.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
            self.draw_framebuffer = framebuffer;
        }
        self.read_framebuffer = framebuffer;
    }

    /// Framebuffer target matching the bound draw framebuffer.
    fn draw_target(&self) -> u32 {
        if self.webgl2 {
            gl::DRAW_FRAMEBUFFER
        } else {
            gl::FRAMEBUFFER
        }
    }

    /// Attaches `image` to color attachment `index` of the bound render
    /// framebuffer.
    pub(crate) fn attach_color(&mut self, ctx: &mut dyn GlContext, index: usize, image: Option<AttachedImage>) {
        let Some(current) = self.color_images.get(index).copied() else {
            return;
        };
        if current == image {
            return;
        }
        let attachment = gl::COLOR_ATTACHMENT0 + index as u32;
        attach(ctx, self.draw_target(), attachment, current, image);
        self.color_images[index] = image;
    }

    /// Attaches `image` at `attachment` (depth or depth-stencil), detaching
    /// any previous depth image.
    pub(crate) fn attach_depth_stencil(&mut self, ctx: &mut dyn GlContext, image: Option<(u32, AttachedImage)>) {
        if self.depth_image == image {
            return;
        }
        let target = self.draw_target();
        if let Some((point, old)) = self.depth_image {
            if image.map(|(p, _)| p) != Some(point) {
                attach(ctx, target, point, Some(old), None);
            }
        }
        if let Some((point, new)) = image {
            let previous = self.depth_image.filter(|(p, _)| *p == point).map(|(_, i)| i);
            attach(ctx, target, point, previous, Some(new));
        }
        self.depth_image = image;
    }

    /// Sets the draw buffers of the bound render framebuffer.
    pub(crate) fn set_draw_buffers(&mut self, ctx: &mut dyn GlContext, buffers: &[u32]) {
        if !self.multiple_render_targets || self.draw_buffers == buffers {
            return;
        }
        ctx.draw_buffers(buffers);
        self.draw_buffers.clear();
        self.draw_buffers.extend_from_slice(buffers);
    }

    // ── invalidation ─────────────────────────────────────────────────────

    pub(crate) fn forget_texture(&mut self, texture: GlTexture) {
        for slot in &mut self.textures {
            if matches!(slot, Some((_, t)) if *t == texture) {
                *slot = None;
            }
        }
        for image in &mut self.color_images {
            if matches!(image, Some(AttachedImage::Texture { texture: t, .. }) if *t == texture) {
                *image = None;
            }
        }
        if matches!(self.depth_image, Some((_, AttachedImage::Texture { texture: t, .. })) if t == texture) {
            self.depth_image = None;
        }
    }

    pub(crate) fn forget_renderbuffer(&mut self, renderbuffer: GlRenderbuffer) {
        for image in &mut self.color_images {
            if *image == Some(AttachedImage::Renderbuffer(renderbuffer)) {
                *image = None;
            }
        }
        if matches!(self.depth_image, Some((_, AttachedImage::Renderbuffer(r))) if r == renderbuffer) {
            self.depth_image = None;
        }
    }

    pub(crate) fn forget_sampler(&mut self, sampler: GlSampler) {
        for slot in &mut self.samplers {
            if *slot == Some(sampler) {
                *slot = None;
            }
        }
    }

    pub(crate) fn forget_buffer(&mut self, buffer: GlBuffer) {
        for slot in &mut self.uniform_buffers {
            if matches!(slot, Some((b, _, _)) if *b == buffer) {
                *slot = None;
            }
        }
    }

    pub(crate) fn forget_program(&mut self, program: GlProgram) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    pub(crate) fn forget_vertex_array(&mut self, vao: GlVertexArray) {
        if self.vertex_array == Some(vao) {
            self.vertex_array = None;
        }
    }
}

fn attach(ctx: &mut dyn GlContext, target: u32, attachment: u32, old: Option<AttachedImage>, new: Option<AttachedImage>) {
    match new {
        Some(AttachedImage::Texture { target: tex_target, texture }) => {
            ctx.framebuffer_texture_2d(target, attachment, tex_target, Some(texture), 0);
        }
        Some(AttachedImage::Renderbuffer(rb)) => ctx.framebuffer_renderbuffer(target, attachment, Some(rb)),
        None => match old {
            Some(AttachedImage::Texture { target: tex_target, .. }) => {
                ctx.framebuffer_texture_2d(target, attachment, tex_target, None, 0);
            }
            Some(AttachedImage::Renderbuffer(_)) => ctx.framebuffer_renderbuffer(target, attachment, None),
            None => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{extensions, GlCall, RecordingContext};
    use crate::megastate::{BlendFactor, BlendMode};
    use std::num::NonZeroU32;

    fn cache(ctx: &RecordingContext) -> CachedDeviceState {
        let caps = Capabilities::resolve(ctx);
        CachedDeviceState::new(&caps, 16, 24, 8)
    }

    fn handle(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn blended() -> MegaStateDescriptor {
        MegaStateDescriptor {
            attachments_state: vec![AttachmentState::premultiplied_over()],
            depth_compare: CompareFunction::Less,
            cull_mode: CullMode::Back,
            ..MegaStateDescriptor::default()
        }
    }

    // ── minimality ───────────────────────────────────────────────────────

    #[test]
    fn default_state_is_a_no_op() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        c.apply_mega_state(&mut ctx, &MegaStateDescriptor::default());
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn repeating_state_issues_nothing() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        c.apply_mega_state(&mut ctx, &blended());
        assert!(!ctx.calls().is_empty());
        ctx.clear_calls();
        c.apply_mega_state(&mut ctx, &blended());
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn only_changed_fields_are_issued() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        c.apply_mega_state(&mut ctx, &blended());
        ctx.clear_calls();

        let changed = MegaStateDescriptor {
            depth_write: false,
            ..blended()
        };
        c.apply_mega_state(&mut ctx, &changed);
        assert_eq!(ctx.calls(), &[GlCall::DepthMask(false)]);
    }

    #[test]
    fn enabling_blend_sets_equation_and_function() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        c.apply_mega_state(&mut ctx, &MegaStateDescriptor::with_attachments(1, AttachmentState::premultiplied_over()));
        assert_eq!(
            ctx.calls(),
            &[
                GlCall::Enable(gl::BLEND),
                GlCall::BlendFuncSeparate(gl::ONE, gl::ONE_MINUS_SRC_ALPHA, gl::ONE, gl::ONE_MINUS_SRC_ALPHA),
            ]
        );
    }

    #[test]
    fn cull_toggle_keeps_face() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        c.apply_mega_state(&mut ctx, &blended());
        c.apply_mega_state(&mut ctx, &MegaStateDescriptor::default());
        ctx.clear_calls();
        c.apply_mega_state(&mut ctx, &blended());
        assert_eq!(ctx.count_calls(|call| matches!(call, GlCall::CullFace(_))), 0);
        assert_eq!(ctx.count_calls(|call| *call == GlCall::Enable(gl::CULL_FACE)), 1);
    }

    #[test]
    fn blend_constant_only_when_used() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let constant = ChannelBlendState::new(BlendMode::Add, BlendFactor::ConstantColor, BlendFactor::Zero);
        let mut mega = MegaStateDescriptor {
            blend_constant: Color::OPAQUE_WHITE,
            ..MegaStateDescriptor::default()
        };
        c.apply_mega_state(&mut ctx, &mega);
        assert_eq!(ctx.count_calls(|call| matches!(call, GlCall::BlendColor(..))), 0);

        mega.attachments_state[0].rgb_blend_state = constant;
        c.apply_mega_state(&mut ctx, &mega);
        assert_eq!(ctx.count_calls(|call| matches!(call, GlCall::BlendColor(..))), 1);
    }

    // ── per-attachment blend ─────────────────────────────────────────────

    #[test]
    fn indexed_blend_uses_indexed_calls() {
        let mut ctx = RecordingContext::webgl2().with_extension(extensions::DRAW_BUFFERS_INDEXED);
        let mut c = cache(&ctx);
        let mega = MegaStateDescriptor {
            attachments_state: vec![AttachmentState::default(), AttachmentState::premultiplied_over()],
            ..MegaStateDescriptor::default()
        };
        c.apply_mega_state(&mut ctx, &mega);
        assert_eq!(ctx.count_calls(|call| *call == GlCall::EnableI(gl::BLEND, 1)), 1);
        assert_eq!(ctx.count_calls(|call| matches!(call, GlCall::Enable(gl::BLEND))), 0);
    }

    #[test]
    fn without_indexed_blend_first_attachment_applies() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let mega = MegaStateDescriptor {
            attachments_state: vec![AttachmentState::default(), AttachmentState::premultiplied_over()],
            ..MegaStateDescriptor::default()
        };
        c.apply_mega_state(&mut ctx, &mega);
        assert!(ctx.calls().is_empty());
    }

    // ── bindings ─────────────────────────────────────────────────────────

    #[test]
    fn texture_binds_are_cached_per_unit() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let t = GlTexture(handle(5));
        c.bind_texture(&mut ctx, 3, gl::TEXTURE_2D, Some(t));
        c.bind_texture(&mut ctx, 3, gl::TEXTURE_2D, Some(t));
        assert_eq!(
            ctx.calls(),
            &[GlCall::ActiveTexture(gl::TEXTURE0 + 3), GlCall::BindTexture(gl::TEXTURE_2D, Some(t))]
        );
    }

    #[test]
    fn forgetting_a_texture_forces_a_rebind() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let t = GlTexture(handle(5));
        c.bind_texture(&mut ctx, 0, gl::TEXTURE_2D, Some(t));
        c.forget_texture(t);
        ctx.clear_calls();
        c.bind_texture(&mut ctx, 0, gl::TEXTURE_2D, Some(t));
        assert_eq!(ctx.calls(), &[GlCall::BindTexture(gl::TEXTURE_2D, Some(t))]);
    }

    #[test]
    fn uniform_ranges_compare_offset_and_size() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let b = GlBuffer(handle(2));
        c.bind_uniform_buffer_range(&mut ctx, 0, b, 0, 256);
        c.bind_uniform_buffer_range(&mut ctx, 0, b, 0, 256);
        c.bind_uniform_buffer_range(&mut ctx, 0, b, 256, 256);
        assert_eq!(ctx.count_calls(|call| matches!(call, GlCall::BindBufferRange { .. })), 2);
    }

    #[test]
    fn webgl1_framebuffer_binding_covers_read_and_draw() {
        let mut ctx = RecordingContext::webgl1();
        let mut c = cache(&ctx);
        let fb = GlFramebuffer(handle(9));
        c.bind_draw_framebuffer(&mut ctx, Some(fb));
        c.bind_read_framebuffer(&mut ctx, Some(fb));
        assert_eq!(ctx.calls(), &[GlCall::BindFramebuffer(gl::FRAMEBUFFER, Some(fb))]);
    }

    #[test]
    fn attachments_are_reissued_only_on_change() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let image = AttachedImage::Renderbuffer(GlRenderbuffer(handle(4)));
        c.attach_color(&mut ctx, 0, Some(image));
        c.attach_color(&mut ctx, 0, Some(image));
        c.attach_color(&mut ctx, 0, None);
        assert_eq!(
            ctx.calls(),
            &[
                GlCall::FramebufferRenderbuffer {
                    target: gl::DRAW_FRAMEBUFFER,
                    attachment: gl::COLOR_ATTACHMENT0,
                    renderbuffer: Some(GlRenderbuffer(handle(4))),
                },
                GlCall::FramebufferRenderbuffer {
                    target: gl::DRAW_FRAMEBUFFER,
                    attachment: gl::COLOR_ATTACHMENT0,
                    renderbuffer: None,
                },
            ]
        );
    }

    #[test]
    fn clear_forces_masks_through_the_cache() {
        let mut ctx = RecordingContext::webgl2();
        let mut c = cache(&ctx);
        let masked = MegaStateDescriptor {
            attachments_state: vec![AttachmentState {
                channel_write_mask: ChannelWriteMask::RGB,
                ..AttachmentState::default()
            }],
            depth_write: false,
            ..MegaStateDescriptor::default()
        };
        c.apply_mega_state(&mut ctx, &masked);
        ctx.clear_calls();
        c.force_color_write_for_clear(&mut ctx, 0);
        c.force_depth_write(&mut ctx);
        c.force_color_write_for_clear(&mut ctx, 0);
        assert_eq!(ctx.calls(), &[GlCall::ColorMask(true, true, true, true), GlCall::DepthMask(true)]);
    }
}
