use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context as _;
use bytemuck::{Pod, Zeroable};
use tessera_gpu::gl::{GlCall, RecordingContext};
use tessera_gpu::{
    BufferDescriptor, BufferUsage, Color, ColorAttachment, Device, DeviceConfig, Format, InputLayoutBufferDescriptor,
    InputLayoutDescriptor, LoggingConfig, ProgramDescriptor, RenderPassDescriptor, RenderPipelineDescriptor,
    Resource, TextureDescriptor, TextureUsage, VertexAttributeDescriptor, VertexBufferBinding,
    VertexStepMode, init_logging,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;

const VERTEX_SHADER: &str = "attribute vec2 a_pos;\n\
    attribute vec4 a_color;\n\
    varying vec4 v_color;\n\
    void main() { v_color = a_color; gl_Position = vec4(a_pos, 0.0, 1.0); }\n";

const FRAGMENT_SHADER: &str = "precision mediump float;\n\
    varying vec4 v_color;\n\
    void main() { gl_FragColor = v_color; }\n";

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
    color: [f32; 4],
}

const TRIANGLE: [Vertex; 3] = [
    Vertex { pos: [-0.5, -0.5], color: [1.0, 0.0, 0.0, 1.0] },
    Vertex { pos: [0.5, -0.5], color: [0.0, 1.0, 0.0, 1.0] },
    Vertex { pos: [0.0, 0.5], color: [0.0, 0.0, 1.0, 1.0] },
];

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::verbose());

    let webgl1 = std::env::args().skip(1).any(|arg| arg == "--webgl1");
    let ctx = Rc::new(RefCell::new(if webgl1 {
        RecordingContext::webgl1()
    } else {
        RecordingContext::webgl2()
    }));
    let mut device = Device::new(Rc::clone(&ctx), DeviceConfig::debug()).context("device creation failed")?;

    let vendor = device.query_vendor_info();
    println!("renderer : {} ({})", vendor.renderer, vendor.version);
    println!("limits   : {:?}", device.query_limits());

    // ── resources ─────────────────────────────────────────────────────────

    let stride = std::mem::size_of::<Vertex>() as u32;
    let vertices = device.create_buffer(&BufferDescriptor::new(stride * 3, BufferUsage::VERTEX))?;
    device.set_resource_name(&vertices, "triangle vertices");
    device.upload_buffer_pod(&vertices, 0, &TRIANGLE)?;

    let layout = device.create_input_layout(&InputLayoutDescriptor {
        vertex_attribute_descriptors: vec![
            VertexAttributeDescriptor {
                location: 0,
                format: Format::F32Rg,
                buffer_index: 0,
                buffer_byte_offset: 0,
            },
            VertexAttributeDescriptor {
                location: 1,
                format: Format::F32Rgba,
                buffer_index: 0,
                buffer_byte_offset: 8,
            },
        ],
        vertex_buffer_descriptors: vec![Some(InputLayoutBufferDescriptor {
            byte_stride: stride,
            step_mode: VertexStepMode::Vertex,
        })],
        index_buffer_format: None,
    })?;
    let input = device.create_input_state(
        &layout,
        &[Some(VertexBufferBinding { buffer: vertices.clone(), byte_offset: 0 })],
        None,
    )?;

    let program = device.create_program(&ProgramDescriptor::new(VERTEX_SHADER, FRAGMENT_SHADER))?;
    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor::new(&program, Format::U8RgbaRt))?;

    let color = device.create_texture(
        &TextureDescriptor::new_2d(Format::U8Rgba, WIDTH, HEIGHT, 1).with_usage(TextureUsage::RENDER_TARGET),
    )?;
    let target = device.create_render_target_from_texture(&color)?;
    let readback = device.create_readback(WIDTH * HEIGHT * 4)?;

    // ── frame ─────────────────────────────────────────────────────────────

    ctx.borrow_mut().clear_calls();

    let clear = Color::new(0.1, 0.1, 0.1, 1.0);
    let mut pass = device.create_render_pass(RenderPassDescriptor::new(vec![Some(ColorAttachment::cleared(
        &target, clear,
    ))]))?;
    pass.set_pipeline(&pipeline);
    pass.set_input_state(Some(&input));
    pass.draw(3, 0);
    device.submit_pass(pass)?;

    let future = device.read_texture(&readback, &color, 0, 0, WIDTH, HEIGHT)?;
    let pixels = pollster::block_on(future)?;
    println!("readback : {} bytes", pixels.len());

    let ctx_ref = ctx.borrow();
    println!();
    println!("native calls ({}):", ctx_ref.calls().len());
    for call in ctx_ref.calls() {
        println!("  {call:?}");
    }
    println!(
        "draws {} / state changes {}",
        ctx_ref.count_calls(GlCall::is_draw),
        ctx_ref.count_calls(GlCall::is_state_change)
    );
    drop(ctx_ref);

    // ── teardown ──────────────────────────────────────────────────────────

    // The vertex buffer is left alive on purpose so the leak report has
    // something to show.
    for resource in [&input as &dyn Resource, &layout, &pipeline, &program, &target, &color, &readback] {
        resource.destroy(&mut device)?;
    }

    let leaks = device.check_for_leaks();
    println!();
    println!("leaked resources: {}", leaks.len());
    for leak in &leaks {
        println!("  {:?} #{:?} {}", leak.resource_type, leak.id, leak.name.as_deref().unwrap_or("<unnamed>"));
    }

    vertices.destroy(&mut device)?;
    Ok(())
}
