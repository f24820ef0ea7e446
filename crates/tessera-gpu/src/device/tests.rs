use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::error::ErrorKind;
use crate::gl::{extensions, GlCall, RecordingContext};
use crate::megastate::Color;
use crate::pass::{ColorAttachment, RenderPassDescriptor};
use crate::resource::{
    BindingLayoutDescriptor, BindingsDescriptor, Buffer, BufferBinding, BufferDescriptor, BufferUsage, IndexBufferBinding,
    InputLayoutBufferDescriptor, InputLayoutDescriptor, ProgramCompileState, ProgramDescriptor, QueryPoolType,
    RenderPipeline, RenderPipelineDescriptor, RenderTarget, RenderTargetDescriptor, Resource, SamplerDescriptor, VertexAttributeDescriptor,
    VertexBufferBinding, VertexStepMode,
};

const VS: &str = "attribute vec2 a_pos;\nvoid main() { gl_Position = vec4(a_pos, 0.0, 1.0); }\n";
const FS: &str = "precision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }\n";
const FS_BOUND: &str = "#version 300 es\nprecision mediump float;\n\
    uniform Globals { vec4 tint; };\n\
    uniform sampler2D u_tex;\n\
    out vec4 o_color;\n\
    void main() { o_color = tint * texture(u_tex, vec2(0.5)); }\n";
const FS_EMULATED: &str = "precision mediump float;\nuniform vec4 Globals[2];\n\
    void main() { gl_FragColor = Globals[0] + Globals[1]; }\n";

fn device_on(ctx: RecordingContext, config: DeviceConfig) -> (Rc<RefCell<RecordingContext>>, Device) {
    let ctx = Rc::new(RefCell::new(ctx));
    let device = Device::new(Rc::clone(&ctx), config).unwrap();
    (ctx, device)
}

fn webgl2() -> (Rc<RefCell<RecordingContext>>, Device) {
    device_on(RecordingContext::webgl2(), DeviceConfig::default())
}

fn offscreen_pass_setup(device: &mut Device, fs: &str) -> (RenderTarget, RenderPipeline) {
    let program = device.create_program(&ProgramDescriptor::new(VS, fs)).unwrap();
    let target = device
        .create_render_target(&RenderTargetDescriptor::new(Format::U8RgbaRt, 64, 64))
        .unwrap();
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(&program, Format::U8RgbaRt))
        .unwrap();
    (target, pipeline)
}

fn single_target(target: &RenderTarget) -> RenderPassDescriptor {
    RenderPassDescriptor::new(vec![Some(ColorAttachment::new(target))])
}

// ── replay ────────────────────────────────────────────────────────────────

#[test]
fn viewport_is_applied_once_before_the_draw() {
    let (ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS);

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.set_viewport(1.0, 2.0, 3.0, 4.0);
    pass.draw(6, 0);

    ctx.borrow_mut().clear_calls();
    device.submit_pass(pass).unwrap();

    let calls = ctx.borrow().calls().to_vec();
    let viewports: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, GlCall::Viewport(..)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(viewports.len(), 1);
    assert_eq!(calls[viewports[0]], GlCall::Viewport(1, 2, 3, 4));

    let draw = calls.iter().position(|c| c.is_draw()).unwrap();
    assert_eq!(calls[draw], GlCall::DrawArrays { mode: gl::TRIANGLES, first: 0, count: 6 });
    assert!(viewports[0] < draw);
}

#[test]
fn identical_passes_skip_redundant_state() {
    let (ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS);

    for round in 0..2 {
        let mut pass = device.create_render_pass(single_target(&target)).unwrap();
        pass.set_pipeline(&pipeline);
        pass.draw(3, 0);

        ctx.borrow_mut().clear_calls();
        device.submit_pass(pass).unwrap();

        let ctx = ctx.borrow();
        assert_eq!(ctx.count_calls(GlCall::is_draw), 1);
        if round == 1 {
            assert_eq!(ctx.count_calls(GlCall::is_state_change), 0, "{:?}", ctx.calls());
            assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::FramebufferRenderbuffer { .. })), 0);
        }
    }
}

#[test]
fn first_bind_resolves_blocks_and_sampler_units() {
    let (ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS_BOUND);
    assert_eq!(pipeline.program().compile_state(), ProgramCompileState::NeedsBind);

    for _ in 0..2 {
        let mut pass = device.create_render_pass(single_target(&target)).unwrap();
        pass.set_pipeline(&pipeline);
        pass.draw(3, 0);
        device.submit_pass(pass).unwrap();
    }

    let ctx = ctx.borrow();
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::UniformBlockBinding(_, 0, 0))), 1);
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::Uniform1iv(_, units) if units == &[0])), 1);
    assert_eq!(pipeline.program().compile_state(), ProgramCompileState::ReadyToUse);
}

#[test]
fn color_clear_uses_clear_buffer_on_webgl2() {
    let (ctx, mut device) = webgl2();
    let (target, _) = offscreen_pass_setup(&mut device, FS);
    let color = Color::new(0.25, 0.5, 0.75, 1.0);

    let pass = device
        .create_render_pass(RenderPassDescriptor::new(vec![Some(ColorAttachment::cleared(&target, color))]))
        .unwrap();
    ctx.borrow_mut().clear_calls();
    device.submit_pass(pass).unwrap();

    let ctx = ctx.borrow();
    assert_eq!(
        ctx.count_calls(|c| c == &GlCall::ClearBufferFv(gl::COLOR, 0, vec![0.25, 0.5, 0.75, 1.0])),
        1
    );
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::Clear(_))), 0);
}

#[test]
fn indexed_draw_offsets_by_first_index() {
    let (ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS);

    let vertices = device
        .create_buffer(&BufferDescriptor::new(48, BufferUsage::VERTEX))
        .unwrap();
    let indices = device.create_buffer(&BufferDescriptor::new(12, BufferUsage::INDEX)).unwrap();
    let layout = device
        .create_input_layout(&InputLayoutDescriptor {
            vertex_attribute_descriptors: vec![VertexAttributeDescriptor {
                location: 0,
                format: Format::F32Rg,
                buffer_index: 0,
                buffer_byte_offset: 0,
            }],
            vertex_buffer_descriptors: vec![Some(InputLayoutBufferDescriptor {
                byte_stride: 8,
                step_mode: VertexStepMode::Vertex,
            })],
            index_buffer_format: Some(Format::U16R),
        })
        .unwrap();
    let input = device
        .create_input_state(
            &layout,
            &[Some(VertexBufferBinding { buffer: vertices, byte_offset: 0 })],
            Some(IndexBufferBinding { buffer: indices, byte_offset: 0 }),
        )
        .unwrap();

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.set_input_state(Some(&input));
    pass.draw_indexed(3, 2);
    ctx.borrow_mut().clear_calls();
    device.submit_pass(pass).unwrap();

    assert_eq!(
        ctx.borrow()
            .count_calls(|c| c == &GlCall::DrawElements { mode: gl::TRIANGLES, count: 3, ty: gl::UNSIGNED_SHORT, offset: 4 }),
        1
    );
}

#[test]
fn indexed_draw_without_index_buffer_fails() {
    let (_ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS);

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.draw_indexed(3, 0);
    let err = device.submit_pass(pass).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn multisampled_target_resolves_with_a_blit() {
    let (ctx, mut device) = webgl2();
    let program = device.create_program(&ProgramDescriptor::new(VS, FS)).unwrap();
    let msaa = device
        .create_render_target(&RenderTargetDescriptor {
            sample_count: 4,
            ..RenderTargetDescriptor::new(Format::U8RgbaRt, 32, 32)
        })
        .unwrap();
    let resolved = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8RgbaRt, 32, 32, 1))
        .unwrap();
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            sample_count: 4,
            ..RenderPipelineDescriptor::new(&program, Format::U8RgbaRt)
        })
        .unwrap();

    let attachment = ColorAttachment {
        resolve_to: Some(resolved.clone()),
        ..ColorAttachment::new(&msaa)
    };
    let mut pass = device.create_render_pass(RenderPassDescriptor::new(vec![Some(attachment)])).unwrap();
    pass.set_pipeline(&pipeline);
    pass.draw(3, 0);
    ctx.borrow_mut().clear_calls();
    device.submit_pass(pass).unwrap();

    let ctx = ctx.borrow();
    assert_eq!(
        ctx.count_calls(|c| c
            == &GlCall::BlitFramebuffer {
                src: [0, 0, 32, 32],
                dst: [0, 0, 32, 32],
                mask: gl::COLOR_BUFFER_BIT,
                filter: gl::NEAREST,
            }),
        1
    );
    // Source and destination are detached after the blit.
    assert_eq!(
        ctx.count_calls(|c| matches!(c, GlCall::FramebufferTexture2d { target: gl::DRAW_FRAMEBUFFER, texture: None, .. })),
        1
    );
}

#[test]
fn occlusion_query_wraps_draws() {
    let (ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS);
    let pool = device.create_query_pool(QueryPoolType::OcclusionConservative, 2).unwrap();

    let descriptor = RenderPassDescriptor {
        occlusion_query_pool: Some(pool.clone()),
        ..single_target(&target)
    };
    let mut pass = device.create_render_pass(descriptor).unwrap();
    pass.set_pipeline(&pipeline);
    pass.begin_occlusion_query(1);
    pass.draw(3, 0);
    pass.end_occlusion_query();
    device.submit_pass(pass).unwrap();

    let target_enum = gl::ANY_SAMPLES_PASSED_CONSERVATIVE;
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::BeginQuery(t, _) if *t == target_enum)), 1);
    assert_eq!(ctx.borrow().count_calls(|c| c == &GlCall::EndQuery(target_enum)), 1);
    assert_eq!(device.query_occlusion_result(&pool, 1).unwrap(), Some(true));
    assert!(device.query_occlusion_result(&pool, 2).is_err());
}

// ── passes and ownership ──────────────────────────────────────────────────

#[test]
fn mismatched_attachments_are_rejected_at_creation() {
    let (_ctx, mut device) = webgl2();
    let a = device
        .create_render_target(&RenderTargetDescriptor::new(Format::U8RgbaRt, 64, 64))
        .unwrap();
    let b = device
        .create_render_target(&RenderTargetDescriptor::new(Format::U8RgbaRt, 32, 32))
        .unwrap();

    let err = device
        .create_render_pass(RenderPassDescriptor::new(vec![
            Some(ColorAttachment::new(&a)),
            Some(ColorAttachment::new(&b)),
        ]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn pass_from_another_device_is_rejected() {
    let (_ctx_a, mut device_a) = webgl2();
    let (ctx_b, mut device_b) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device_a, FS);

    let mut pass = device_a.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.draw(3, 0);

    ctx_b.borrow_mut().clear_calls();
    let err = device_b.submit_pass(pass).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(ctx_b.borrow().calls().is_empty());
}

#[test]
fn onscreen_pass_draws_to_the_default_framebuffer() {
    let (ctx, mut device) = webgl2();
    device.configure_swap_chain(800, 600);
    let program = device.create_program(&ProgramDescriptor::new(VS, FS)).unwrap();
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(&program, Format::U8RgbaRt))
        .unwrap();
    let target = device.create_render_target_from_texture(&device.onscreen_texture()).unwrap();

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    assert_eq!(pass.size(), Some((800, 600)));
    pass.set_pipeline(&pipeline);
    pass.draw(3, 0);
    ctx.borrow_mut().clear_calls();
    device.submit_pass(pass).unwrap();

    let ctx = ctx.borrow();
    assert_eq!(ctx.count_calls(|c| c == &GlCall::Viewport(0, 0, 800, 600)), 1);
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::FramebufferRenderbuffer { .. })), 0);
    assert!(device.onscreen_texture().destroy(&mut device).is_err());
}

// ── resources ─────────────────────────────────────────────────────────────

#[test]
fn uniform_buffers_are_paged() {
    let (ctx, mut device) = webgl2();
    let page = device.query_limits().uniform_buffer_page_size;

    ctx.borrow_mut().clear_calls();
    let buffer = device
        .create_buffer(&BufferDescriptor::new(page * 2 + 16, BufferUsage::UNIFORM))
        .unwrap();
    assert_eq!(buffer.page_count(), 3);
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::CreateBuffer(_))), 3);

    assert_eq!(buffer.page_range(page + 256, 64).unwrap(), (1, 256));
    assert!(buffer.page_range(page - 16, 32).is_err());
    assert_ne!(buffer.platform_buffer(0), buffer.platform_buffer(page));
}

#[test]
fn double_destroy_is_a_precondition_error() {
    let (_ctx, mut device) = webgl2();
    let sampler = device.create_sampler(&SamplerDescriptor::default()).unwrap();
    sampler.destroy(&mut device).unwrap();
    let err = sampler.destroy(&mut device).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(sampler.is_destroyed());
}

#[test]
fn leak_check_reports_live_resources() {
    let (_ctx, mut device) = device_on(RecordingContext::webgl2(), DeviceConfig::debug());
    let buffers: Vec<Buffer> = (0..3)
        .map(|_| device.create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX)).unwrap())
        .collect();
    device.set_resource_name(&buffers[1], "survivor");
    buffers[0].destroy(&mut device).unwrap();
    buffers[2].destroy(&mut device).unwrap();

    let leaks = device.check_for_leaks();
    assert_eq!(leaks.len(), 1);
    assert_eq!(leaks[0].id, buffers[1].id());
    assert_eq!(leaks[0].name.as_deref(), Some("survivor"));

    buffers[1].destroy(&mut device).unwrap();
    assert!(device.check_for_leaks().is_empty());
}

#[test]
fn dropping_the_device_deletes_its_framebuffers() {
    let (ctx, device) = webgl2();
    ctx.borrow_mut().clear_calls();
    drop(device);
    // render, read and resolve
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::DeleteFramebuffer(_))), 3);
}

#[test]
fn dropping_on_a_lost_context_issues_no_calls() {
    let (ctx, device) = webgl2();
    ctx.borrow_mut().lose_context();
    ctx.borrow_mut().clear_calls();
    drop(device);
    assert!(ctx.borrow().calls().is_empty());
}

#[test]
fn dropping_while_the_context_is_borrowed_does_not_panic() {
    let (ctx, device) = device_on(RecordingContext::webgl2(), DeviceConfig::debug());
    let guard = ctx.borrow();
    drop(device);
    assert!(guard.calls().iter().all(|c| !matches!(c, GlCall::DeleteFramebuffer(_))));
}

#[test]
fn parallel_compile_reports_ready_after_polling() {
    let ctx = RecordingContext::webgl2()
        .with_extension(extensions::PARALLEL_SHADER_COMPILE)
        .with_compile_polls(2);
    let (_ctx, mut device) = device_on(ctx, DeviceConfig::default());
    let program = device.create_program(&ProgramDescriptor::new(VS, FS)).unwrap();
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(&program, Format::U8RgbaRt))
        .unwrap();
    assert_eq!(program.compile_state(), ProgramCompileState::Compiling);

    let polls: Vec<bool> = (0..3).map(|_| device.query_pipeline_ready(&pipeline).unwrap()).collect();
    assert_eq!(polls, [false, false, true]);
}

#[test]
fn failing_shader_never_becomes_ready() {
    let ctx = RecordingContext::webgl2().with_failing_shader_marker("BROKEN");
    let (_ctx, mut device) = device_on(ctx, DeviceConfig::debug());
    let program = device
        .create_program(&ProgramDescriptor::new(VS, "void main() { BROKEN }"))
        .unwrap();
    assert_eq!(program.compile_state(), ProgramCompileState::Failed);

    let (target, _) = offscreen_pass_setup(&mut device, FS);
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(&program, Format::U8RgbaRt))
        .unwrap();
    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.draw(3, 0);
    assert_eq!(device.submit_pass(pass).unwrap_err().kind(), ErrorKind::Precondition);
}

#[test]
fn patched_program_is_rebound() {
    let (ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS_BOUND);
    let program = pipeline.program().clone();

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.draw(3, 0);
    device.submit_pass(pass).unwrap();

    ctx.borrow_mut().clear_calls();
    device.program_patched(&program, ProgramDescriptor::new(VS, FS_BOUND)).unwrap();
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::DeleteProgram(_))), 1);
    assert_eq!(program.compile_state(), ProgramCompileState::NeedsBind);

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.draw(3, 0);
    device.submit_pass(pass).unwrap();
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::UniformBlockBinding(..))), 1);
    assert_eq!(program.compile_state(), ProgramCompileState::ReadyToUse);
}

// ── WebGL1 ────────────────────────────────────────────────────────────────

#[test]
fn emulated_uniform_buffer_uploads_vec4_array() {
    let (ctx, mut device) = device_on(RecordingContext::webgl1(), DeviceConfig::default());
    assert!(!device.capabilities().uniform_buffers);
    device.configure_swap_chain(64, 64);

    let program = device.create_program(&ProgramDescriptor::new(VS, FS_EMULATED)).unwrap();
    let layout = BindingLayoutDescriptor {
        num_uniform_buffers: 1,
        num_samplers: 0,
    };
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            binding_layouts: vec![layout],
            ..RenderPipelineDescriptor::new(&program, Format::U8RgbaRt)
        })
        .unwrap();

    let buffer = device
        .create_buffer(&BufferDescriptor::new(32, BufferUsage::UNIFORM))
        .unwrap();
    assert!(buffer.is_emulated());
    let values = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    device.upload_buffer_pod(&buffer, 0, &values).unwrap();

    let bindings = device
        .create_bindings(&BindingsDescriptor {
            binding_layout: layout,
            uniform_buffer_bindings: vec![BufferBinding::new(&buffer, 0, 32)],
            sampler_bindings: Vec::new(),
        })
        .unwrap();
    let target = device.create_render_target_from_texture(&device.onscreen_texture()).unwrap();

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.set_bindings(0, &bindings, &[0]).unwrap();
    pass.draw(3, 0);
    ctx.borrow_mut().clear_calls();
    device.submit_pass(pass).unwrap();

    let ctx = ctx.borrow();
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::Uniform4fv(_, v) if v == &values)), 1);
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::BindBufferRange { .. })), 0);
}

#[test]
fn npot_texture_skips_mipmaps_on_webgl1() {
    let (ctx, mut device) = device_on(RecordingContext::webgl1(), DeviceConfig::default());
    let texture = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8Rgba, 3, 5, 2))
        .unwrap();
    assert!(texture.is_npot());

    device.upload_texture_data(&texture, 0, &[&[0u8; 3 * 5 * 4]]).unwrap();
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::GenerateMipmap(_))), 0);
    assert!(!texture.mipmaps_generated());

    let pot = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8Rgba, 4, 4, 3))
        .unwrap();
    device.upload_texture_data(&pot, 0, &[&[0u8; 4 * 4 * 4]]).unwrap();
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::GenerateMipmap(_))), 1);
    assert!(pot.mipmaps_generated());
}

#[test]
fn upload_rejects_wrong_level_size() {
    let (_ctx, mut device) = webgl2();
    let texture = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8Rgba, 4, 4, 1))
        .unwrap();
    let err = device.upload_texture_data(&texture, 0, &[&[0u8; 10]]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

// ── readback ──────────────────────────────────────────────────────────────

#[test]
fn texture_readback_waits_for_the_fence() {
    let ctx = RecordingContext::webgl2().with_sync_polls(2).with_pixel_fill(7);
    let (ctx, mut device) = device_on(ctx, DeviceConfig::default());
    let texture = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8Rgba, 4, 4, 1))
        .unwrap();
    let readback = device.create_readback(64).unwrap();

    let future = device.read_texture(&readback, &texture, 0, 0, 4, 4).unwrap();
    assert!(readback.is_pending());
    assert!(device.read_texture(&readback, &texture, 0, 0, 4, 4).is_err());

    let data = pollster::block_on(future).unwrap();
    assert_eq!(data, vec![7u8; 64]);
    assert!(!readback.is_pending());
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::FenceSync(_))), 1);
}

#[test]
fn texture_readback_is_synchronous_on_webgl1() {
    let ctx = RecordingContext::webgl1().with_pixel_fill(3);
    let (ctx, mut device) = device_on(ctx, DeviceConfig::default());
    let texture = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8Rgba, 4, 4, 1))
        .unwrap();
    let readback = device.create_readback(16).unwrap();

    let future = device.read_texture(&readback, &texture, 1, 1, 2, 2).unwrap();
    assert_eq!(pollster::block_on(future).unwrap(), vec![3u8; 16]);
    let ctx = ctx.borrow();
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::ReadPixels { width: 2, height: 2, .. })), 1);
    assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::FenceSync(_))), 0);
}

#[test]
fn buffer_readback_returns_uploaded_bytes() {
    let (_ctx, mut device) = webgl2();
    let buffer = device
        .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX | BufferUsage::COPY_SRC))
        .unwrap();
    device.upload_buffer_data(&buffer, 4, &[1, 2, 3, 4]).unwrap();
    let readback = device.create_readback(16).unwrap();

    let future = device.read_buffer(&readback, &buffer, 2, 8).unwrap();
    assert_eq!(pollster::block_on(future).unwrap(), vec![0, 0, 1, 2, 3, 4, 0, 0]);
}

// ── argument ranges ───────────────────────────────────────────────────────

#[test]
fn texture_read_past_the_edge_is_a_precondition_error() {
    let (ctx, mut device) = webgl2();
    let texture = device
        .create_texture(&TextureDescriptor::new_2d(Format::U8Rgba, 4, 4, 1))
        .unwrap();
    let readback = device.create_readback(64).unwrap();
    ctx.borrow_mut().clear_calls();

    for (x, y, w, h) in [(u32::MAX, 0, 1, 1), (0, u32::MAX, 1, 1), (1, 0, u32::MAX, 1), (3, 3, 2, 2)] {
        let err = device.read_texture(&readback, &texture, x, y, w, h).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
    assert!(!readback.is_pending());
    assert!(ctx.borrow().calls().is_empty());
}

#[test]
fn index_offset_past_i32_is_a_precondition_error() {
    let (_ctx, mut device) = webgl2();
    let (target, pipeline) = offscreen_pass_setup(&mut device, FS);
    let indices = device.create_buffer(&BufferDescriptor::new(12, BufferUsage::INDEX)).unwrap();
    let layout = device
        .create_input_layout(&InputLayoutDescriptor {
            vertex_attribute_descriptors: Vec::new(),
            vertex_buffer_descriptors: Vec::new(),
            index_buffer_format: Some(Format::U16R),
        })
        .unwrap();
    let input = device
        .create_input_state(&layout, &[], Some(IndexBufferBinding { buffer: indices, byte_offset: 0 }))
        .unwrap();

    for instanced in [false, true] {
        let mut pass = device.create_render_pass(single_target(&target)).unwrap();
        pass.set_pipeline(&pipeline);
        pass.set_input_state(Some(&input));
        if instanced {
            pass.draw_indexed_instanced(3, u32::MAX, 2);
        } else {
            pass.draw_indexed(3, u32::MAX);
        }
        let err = device.submit_pass(pass).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
}

#[test]
fn dynamic_offset_overflow_is_a_precondition_error() {
    let (_ctx, mut device) = webgl2();
    let program = device.create_program(&ProgramDescriptor::new(VS, FS_BOUND)).unwrap();
    let layout = BindingLayoutDescriptor {
        num_uniform_buffers: 1,
        num_samplers: 0,
    };
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            binding_layouts: vec![layout],
            ..RenderPipelineDescriptor::new(&program, Format::U8RgbaRt)
        })
        .unwrap();
    let target = device
        .create_render_target(&RenderTargetDescriptor::new(Format::U8RgbaRt, 64, 64))
        .unwrap();
    let buffer = device
        .create_buffer(&BufferDescriptor::new(512, BufferUsage::UNIFORM))
        .unwrap();
    let bindings = device
        .create_bindings(&BindingsDescriptor {
            binding_layout: layout,
            uniform_buffer_bindings: vec![BufferBinding::new(&buffer, 256, 64)],
            sampler_bindings: Vec::new(),
        })
        .unwrap();

    let mut pass = device.create_render_pass(single_target(&target)).unwrap();
    pass.set_pipeline(&pipeline);
    pass.set_bindings(0, &bindings, &[u32::MAX]).unwrap();
    pass.draw(3, 0);
    let err = device.submit_pass(pass).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn attribute_offset_past_i32_is_a_precondition_error() {
    let (_ctx, mut device) = webgl2();
    let vertices = device.create_buffer(&BufferDescriptor::new(48, BufferUsage::VERTEX)).unwrap();
    let layout = device
        .create_input_layout(&InputLayoutDescriptor {
            vertex_attribute_descriptors: vec![VertexAttributeDescriptor {
                location: 0,
                format: Format::F32Rg,
                buffer_index: 0,
                buffer_byte_offset: u32::MAX,
            }],
            vertex_buffer_descriptors: vec![Some(InputLayoutBufferDescriptor {
                byte_stride: 8,
                step_mode: VertexStepMode::Vertex,
            })],
            index_buffer_format: None,
        })
        .unwrap();
    let err = device
        .create_input_state(&layout, &[Some(VertexBufferBinding { buffer: vertices, byte_offset: 8 })], None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn sampler_arrays_beyond_the_texture_units_are_rejected() {
    let (ctx, mut device) = webgl2();
    let units = device.query_limits().max_texture_units;
    let fs = format!(
        "precision mediump float;\nuniform sampler2D u_tex[{}];\nvoid main() {{ gl_FragColor = vec4(1.0); }}\n",
        units + 1
    );
    ctx.borrow_mut().clear_calls();
    let err = device.create_program(&ProgramDescriptor::new(VS, fs)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::CreateProgram(_))), 0);

    let huge = "precision mediump float;\nuniform sampler2D u_a[4294967295];\nuniform sampler2D u_b[2];\n\
        void main() { gl_FragColor = vec4(1.0); }\n";
    let err = device.create_program(&ProgramDescriptor::new(VS, huge)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);

    let fits = format!("precision mediump float;\nuniform sampler2D u_tex[{units}];\nvoid main() {{ gl_FragColor = vec4(1.0); }}\n");
    assert!(device.create_program(&ProgramDescriptor::new(VS, fits)).is_ok());
}

#[test]
fn patching_in_too_many_samplers_keeps_the_old_program() {
    let (ctx, mut device) = webgl2();
    let program = device.create_program(&ProgramDescriptor::new(VS, FS)).unwrap();
    let fs = "precision mediump float;\nuniform sampler2D u_tex[4096];\nvoid main() { gl_FragColor = vec4(1.0); }\n";
    ctx.borrow_mut().clear_calls();
    let err = device.program_patched(&program, ProgramDescriptor::new(VS, fs)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(ctx.borrow().count_calls(|c| matches!(c, GlCall::DeleteProgram(_))), 0);
}
