//! Render pass command stream.
//!
//! A pass is recorded into three parallel streams: opcodes and integer
//! operands, float operands, and object references. Every [`Command`] has
//! one writer arm in [`CommandStream::push`] and one reader arm in
//! [`CommandReader`], and both consume exactly the same shape.

use std::fmt;
use std::rc::Rc;

use crate::error::{GpuError, Result};
use crate::resource::{Bindings, InputState, RenderPipeline};

use super::render_pass::RenderPassDescriptor;

/// Opaque marker attached to subsequent draws for debugging.
#[derive(Clone)]
pub struct DebugPointer(pub Rc<dyn fmt::Debug>);

impl DebugPointer {
    pub fn new(value: impl fmt::Debug + 'static) -> Self {
        Self(Rc::new(value))
    }
}

impl PartialEq for DebugPointer {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for DebugPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One recorded pass command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetRenderPassParameters(RenderPassDescriptor),
    SetViewport { x: f32, y: f32, width: f32, height: f32 },
    SetScissor { x: f32, y: f32, width: f32, height: f32 },
    SetBindings { group: u32, bindings: Bindings, dynamic_byte_offsets: Vec<u32> },
    SetPipeline(RenderPipeline),
    SetInputState(Option<InputState>),
    SetStencilRef(u8),
    SetDebugPointer(DebugPointer),
    Draw { vertex_count: u32, first_vertex: u32 },
    DrawIndexed { index_count: u32, first_index: u32 },
    DrawIndexedInstanced { index_count: u32, first_index: u32, instance_count: u32 },
    BeginOcclusionQuery(u32),
    EndOcclusionQuery,
    End,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
enum Opcode {
    SetRenderPassParameters = 1,
    SetViewport,
    SetScissor,
    SetBindings,
    SetPipeline,
    SetInputState,
    SetStencilRef,
    SetDebugPointer,
    Draw,
    DrawIndexed,
    DrawIndexedInstanced,
    BeginOcclusionQuery,
    EndOcclusionQuery,
    End,
}

impl Opcode {
    const ALL: [Opcode; 14] = [
        Opcode::SetRenderPassParameters,
        Opcode::SetViewport,
        Opcode::SetScissor,
        Opcode::SetBindings,
        Opcode::SetPipeline,
        Opcode::SetInputState,
        Opcode::SetStencilRef,
        Opcode::SetDebugPointer,
        Opcode::Draw,
        Opcode::DrawIndexed,
        Opcode::DrawIndexedInstanced,
        Opcode::BeginOcclusionQuery,
        Opcode::EndOcclusionQuery,
        Opcode::End,
    ];

    fn from_u32(v: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| *op as u32 == v)
    }
}

/// Entry of the object stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PassObject {
    Descriptor(Box<RenderPassDescriptor>),
    Bindings(Bindings),
    Pipeline(RenderPipeline),
    InputState(InputState),
    DebugPointer(DebugPointer),
}

/// Growable three-stream command buffer.
#[derive(Debug, Default)]
pub(crate) struct CommandStream {
    ops: Vec<u32>,
    floats: Vec<f32>,
    objects: Vec<PassObject>,
}

impl CommandStream {
    pub(crate) fn push(&mut self, command: Command) {
        match command {
            Command::SetRenderPassParameters(descriptor) => {
                self.op(Opcode::SetRenderPassParameters);
                self.objects.push(PassObject::Descriptor(Box::new(descriptor)));
            }
            Command::SetViewport { x, y, width, height } => {
                self.op(Opcode::SetViewport);
                self.floats.extend_from_slice(&[x, y, width, height]);
            }
            Command::SetScissor { x, y, width, height } => {
                self.op(Opcode::SetScissor);
                self.floats.extend_from_slice(&[x, y, width, height]);
            }
            Command::SetBindings { group, bindings, dynamic_byte_offsets } => {
                self.op(Opcode::SetBindings);
                self.ops.push(group);
                self.ops.push(dynamic_byte_offsets.len() as u32);
                self.ops.extend_from_slice(&dynamic_byte_offsets);
                self.objects.push(PassObject::Bindings(bindings));
            }
            Command::SetPipeline(pipeline) => {
                self.op(Opcode::SetPipeline);
                self.objects.push(PassObject::Pipeline(pipeline));
            }
            Command::SetInputState(state) => {
                self.op(Opcode::SetInputState);
                self.ops.push(state.is_some() as u32);
                if let Some(state) = state {
                    self.objects.push(PassObject::InputState(state));
                }
            }
            Command::SetStencilRef(value) => {
                self.op(Opcode::SetStencilRef);
                self.ops.push(value as u32);
            }
            Command::SetDebugPointer(pointer) => {
                self.op(Opcode::SetDebugPointer);
                self.objects.push(PassObject::DebugPointer(pointer));
            }
            Command::Draw { vertex_count, first_vertex } => {
                self.op(Opcode::Draw);
                self.ops.extend_from_slice(&[vertex_count, first_vertex]);
            }
            Command::DrawIndexed { index_count, first_index } => {
                self.op(Opcode::DrawIndexed);
                self.ops.extend_from_slice(&[index_count, first_index]);
            }
            Command::DrawIndexedInstanced { index_count, first_index, instance_count } => {
                self.op(Opcode::DrawIndexedInstanced);
                self.ops.extend_from_slice(&[index_count, first_index, instance_count]);
            }
            Command::BeginOcclusionQuery(index) => {
                self.op(Opcode::BeginOcclusionQuery);
                self.ops.push(index);
            }
            Command::EndOcclusionQuery => self.op(Opcode::EndOcclusionQuery),
            Command::End => self.op(Opcode::End),
        }
    }

    fn op(&mut self, op: Opcode) {
        self.ops.push(op as u32);
    }

    pub(crate) fn reader(&self) -> CommandReader<'_> {
        CommandReader {
            stream: self,
            op: 0,
            float: 0,
            object: 0,
            failed: false,
        }
    }

    /// Drops all commands and keeps the allocations.
    pub(crate) fn reset(&mut self) {
        self.ops.clear();
        self.floats.clear();
        self.objects.clear();
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Capacity of the three streams.
    #[cfg(test)]
    pub(crate) fn capacity(&self) -> (usize, usize, usize) {
        (self.ops.capacity(), self.floats.capacity(), self.objects.capacity())
    }

    /// Objects referenced by the stream.
    #[cfg(test)]
    pub(crate) fn objects(&self) -> &[PassObject] {
        &self.objects
    }

    /// Last opcode is `End`.
    pub(crate) fn is_ended(&self) -> bool {
        self.ops.last() == Some(&(Opcode::End as u32))
    }
}

/// Decodes a [`CommandStream`] in recording order.
///
/// A truncated or corrupt stream yields one [`GpuError::Native`] and then
/// stops.
pub(crate) struct CommandReader<'a> {
    stream: &'a CommandStream,
    op: usize,
    float: usize,
    object: usize,
    failed: bool,
}

impl CommandReader<'_> {
    fn u32(&mut self) -> Result<u32> {
        let v = self.stream.ops.get(self.op).copied().ok_or_else(|| corrupt("integer stream truncated"))?;
        self.op += 1;
        Ok(v)
    }

    fn rect(&mut self) -> Result<[f32; 4]> {
        let end = self.float + 4;
        let v = self
            .stream
            .floats
            .get(self.float..end)
            .ok_or_else(|| corrupt("float stream truncated"))?;
        self.float = end;
        Ok([v[0], v[1], v[2], v[3]])
    }

    fn object(&mut self) -> Result<PassObject> {
        let v = self.stream.objects.get(self.object).cloned().ok_or_else(|| corrupt("object stream truncated"))?;
        self.object += 1;
        Ok(v)
    }

    fn read(&mut self) -> Result<Command> {
        let raw = self.u32()?;
        let op = Opcode::from_u32(raw).ok_or_else(|| corrupt(&format!("unknown opcode {raw}")))?;

        Ok(match op {
            Opcode::SetRenderPassParameters => match self.object()? {
                PassObject::Descriptor(d) => Command::SetRenderPassParameters(*d),
                other => return Err(mismatch(op, &other)),
            },
            Opcode::SetViewport => {
                let [x, y, width, height] = self.rect()?;
                Command::SetViewport { x, y, width, height }
            }
            Opcode::SetScissor => {
                let [x, y, width, height] = self.rect()?;
                Command::SetScissor { x, y, width, height }
            }
            Opcode::SetBindings => {
                let group = self.u32()?;
                let count = self.u32()?;
                let dynamic_byte_offsets = (0..count).map(|_| self.u32()).collect::<Result<Vec<_>>>()?;
                match self.object()? {
                    PassObject::Bindings(bindings) => Command::SetBindings { group, bindings, dynamic_byte_offsets },
                    other => return Err(mismatch(op, &other)),
                }
            }
            Opcode::SetPipeline => match self.object()? {
                PassObject::Pipeline(p) => Command::SetPipeline(p),
                other => return Err(mismatch(op, &other)),
            },
            Opcode::SetInputState => match self.u32()? {
                0 => Command::SetInputState(None),
                _ => match self.object()? {
                    PassObject::InputState(s) => Command::SetInputState(Some(s)),
                    other => return Err(mismatch(op, &other)),
                },
            },
            Opcode::SetStencilRef => Command::SetStencilRef(self.u32()? as u8),
            Opcode::SetDebugPointer => match self.object()? {
                PassObject::DebugPointer(p) => Command::SetDebugPointer(p),
                other => return Err(mismatch(op, &other)),
            },
            Opcode::Draw => Command::Draw {
                vertex_count: self.u32()?,
                first_vertex: self.u32()?,
            },
            Opcode::DrawIndexed => Command::DrawIndexed {
                index_count: self.u32()?,
                first_index: self.u32()?,
            },
            Opcode::DrawIndexedInstanced => Command::DrawIndexedInstanced {
                index_count: self.u32()?,
                first_index: self.u32()?,
                instance_count: self.u32()?,
            },
            Opcode::BeginOcclusionQuery => Command::BeginOcclusionQuery(self.u32()?),
            Opcode::EndOcclusionQuery => Command::EndOcclusionQuery,
            Opcode::End => Command::End,
        })
    }
}

impl Iterator for CommandReader<'_> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.op >= self.stream.ops.len() {
            return None;
        }
        let command = self.read();
        self.failed = command.is_err();
        Some(command)
    }
}

fn corrupt(what: &str) -> GpuError {
    GpuError::Native(format!("corrupt command stream: {what}"))
}

fn mismatch(op: Opcode, found: &PassObject) -> GpuError {
    let kind = match found {
        PassObject::Descriptor(_) => "descriptor",
        PassObject::Bindings(_) => "bindings",
        PassObject::Pipeline(_) => "pipeline",
        PassObject::InputState(_) => "input state",
        PassObject::DebugPointer(_) => "debug pointer",
    };
    corrupt(&format!("{op:?} found a {kind} in the object stream"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(stream: &CommandStream) -> Vec<Command> {
        stream.reader().collect::<Result<Vec<_>>>().unwrap()
    }

    // ── fixed cases ──────────────────────────────────────────────────────

    #[test]
    fn viewport_and_draw() {
        let mut s = CommandStream::default();
        s.push(Command::SetViewport { x: 1.0, y: 2.0, width: 3.0, height: 4.0 });
        s.push(Command::Draw { vertex_count: 6, first_vertex: 0 });
        s.push(Command::End);
        assert_eq!(
            decode(&s),
            vec![
                Command::SetViewport { x: 1.0, y: 2.0, width: 3.0, height: 4.0 },
                Command::Draw { vertex_count: 6, first_vertex: 0 },
                Command::End,
            ]
        );
        assert!(s.is_ended());
    }

    #[test]
    fn debug_pointers_compare_by_identity() {
        let a = DebugPointer::new("draw quad");
        let b = DebugPointer::new("draw quad");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);

        let mut s = CommandStream::default();
        s.push(Command::SetDebugPointer(a.clone()));
        assert_eq!(decode(&s), vec![Command::SetDebugPointer(a)]);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut s = CommandStream::default();
        for i in 0..64 {
            s.push(Command::Draw { vertex_count: i, first_vertex: 0 });
            s.push(Command::SetScissor { x: 0.0, y: 0.0, width: 1.0, height: 1.0 });
        }
        let before = s.capacity();
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), before);
        assert_eq!(s.reader().count(), 0);
    }

    #[test]
    fn unknown_opcode_is_native_error() {
        let mut s = CommandStream::default();
        s.ops.push(999);
        s.ops.push(Opcode::End as u32);
        let results: Vec<_> = s.reader().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().kind(), crate::error::ErrorKind::Native);
    }

    #[test]
    fn truncated_operands_are_native_error() {
        let mut s = CommandStream::default();
        s.op(Opcode::DrawIndexedInstanced);
        s.ops.push(3);
        let err = s.reader().next().unwrap().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_object_is_native_error() {
        let mut s = CommandStream::default();
        s.op(Opcode::SetPipeline);
        assert!(s.reader().next().unwrap().is_err());
    }

    // ── symmetry ─────────────────────────────────────────────────────────

    fn coord() -> impl Strategy<Value = f32> {
        -1.0e6f32..1.0e6f32
    }

    fn plain_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (coord(), coord(), coord(), coord())
                .prop_map(|(x, y, width, height)| Command::SetViewport { x, y, width, height }),
            (coord(), coord(), coord(), coord())
                .prop_map(|(x, y, width, height)| Command::SetScissor { x, y, width, height }),
            Just(Command::SetInputState(None)),
            any::<u8>().prop_map(Command::SetStencilRef),
            (any::<u32>(), any::<u32>())
                .prop_map(|(vertex_count, first_vertex)| Command::Draw { vertex_count, first_vertex }),
            (any::<u32>(), any::<u32>())
                .prop_map(|(index_count, first_index)| Command::DrawIndexed { index_count, first_index }),
            (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(index_count, first_index, instance_count)| {
                Command::DrawIndexedInstanced { index_count, first_index, instance_count }
            }),
            any::<u32>().prop_map(Command::BeginOcclusionQuery),
            Just(Command::EndOcclusionQuery),
            Just(Command::End),
        ]
    }

    /// Objects referenced by generated commands, created on a recording device.
    struct Objects {
        _device: crate::device::Device,
        descriptors: Vec<RenderPassDescriptor>,
        pipelines: Vec<RenderPipeline>,
        bindings: Vec<Bindings>,
        inputs: Vec<InputState>,
        pointers: Vec<DebugPointer>,
    }

    impl Objects {
        fn new() -> Self {
            use crate::config::DeviceConfig;
            use crate::format::Format;
            use crate::gl::RecordingContext;
            use crate::megastate::Color;
            use crate::pass::ColorAttachment;
            use crate::resource::{
                BindingLayoutDescriptor, BindingsDescriptor, BufferBinding, BufferDescriptor, BufferUsage,
                InputLayoutBufferDescriptor, InputLayoutDescriptor, ProgramDescriptor, RenderPipelineDescriptor,
                RenderTargetDescriptor, VertexAttributeDescriptor, VertexBufferBinding, VertexStepMode,
            };

            const VS: &str = "attribute vec2 a_pos;\nvoid main() { gl_Position = vec4(a_pos, 0.0, 1.0); }\n";
            const FS: &str = "precision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }\n";

            let ctx = std::rc::Rc::new(std::cell::RefCell::new(RecordingContext::webgl2()));
            let mut device = crate::device::Device::new(ctx, DeviceConfig::default()).unwrap();

            let target = device
                .create_render_target(&RenderTargetDescriptor::new(Format::U8RgbaRt, 16, 16))
                .unwrap();
            let red = Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
            let descriptors = vec![
                RenderPassDescriptor::new(vec![Some(ColorAttachment::new(&target))]),
                RenderPassDescriptor::new(vec![Some(ColorAttachment::cleared(&target, red))]),
            ];

            let program = device.create_program(&ProgramDescriptor::new(VS, FS)).unwrap();
            let layout = BindingLayoutDescriptor {
                num_uniform_buffers: 1,
                num_samplers: 0,
            };
            let pipelines = vec![
                device
                    .create_render_pipeline(&RenderPipelineDescriptor::new(&program, Format::U8RgbaRt))
                    .unwrap(),
                device
                    .create_render_pipeline(&RenderPipelineDescriptor {
                        binding_layouts: vec![layout],
                        ..RenderPipelineDescriptor::new(&program, Format::U8RgbaRt)
                    })
                    .unwrap(),
            ];

            let uniforms = device
                .create_buffer(&BufferDescriptor::new(1024, BufferUsage::UNIFORM))
                .unwrap();
            let bindings = [0, 256, 512]
                .into_iter()
                .map(|offset| {
                    device
                        .create_bindings(&BindingsDescriptor {
                            binding_layout: layout,
                            uniform_buffer_bindings: vec![BufferBinding::new(&uniforms, offset, 64)],
                            sampler_bindings: Vec::new(),
                        })
                        .unwrap()
                })
                .collect();

            let vertices = device
                .create_buffer(&BufferDescriptor::new(64, BufferUsage::VERTEX))
                .unwrap();
            let input_layout = device
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
                    index_buffer_format: None,
                })
                .unwrap();
            let inputs = [0, 16]
                .into_iter()
                .map(|byte_offset| {
                    device
                        .create_input_state(
                            &input_layout,
                            &[Some(VertexBufferBinding { buffer: vertices.clone(), byte_offset })],
                            None,
                        )
                        .unwrap()
                })
                .collect();

            Self {
                _device: device,
                descriptors,
                pipelines,
                bindings,
                inputs,
                pointers: vec![DebugPointer::new("opaque"), DebugPointer::new(42u32)],
            }
        }
    }

    /// A command that references an entry of [`Objects`] by index.
    #[derive(Debug, Clone)]
    enum Step {
        Plain(Command),
        Parameters(usize),
        Pipeline(usize),
        Bindings { group: u32, which: usize, offsets: Vec<u32> },
        Input(Option<usize>),
        Pointer(usize),
    }

    impl Step {
        fn command(&self, objects: &Objects) -> Command {
            let pick = |i: usize, len: usize| i % len;
            match self {
                Step::Plain(c) => c.clone(),
                Step::Parameters(i) => {
                    Command::SetRenderPassParameters(objects.descriptors[pick(*i, objects.descriptors.len())].clone())
                }
                Step::Pipeline(i) => Command::SetPipeline(objects.pipelines[pick(*i, objects.pipelines.len())].clone()),
                Step::Bindings { group, which, offsets } => Command::SetBindings {
                    group: *group,
                    bindings: objects.bindings[pick(*which, objects.bindings.len())].clone(),
                    dynamic_byte_offsets: offsets.clone(),
                },
                Step::Input(i) => {
                    Command::SetInputState(i.map(|i| objects.inputs[pick(i, objects.inputs.len())].clone()))
                }
                Step::Pointer(i) => Command::SetDebugPointer(objects.pointers[pick(*i, objects.pointers.len())].clone()),
            }
        }
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => plain_command().prop_map(Step::Plain),
            1 => any::<usize>().prop_map(Step::Parameters),
            1 => any::<usize>().prop_map(Step::Pipeline),
            2 => (0u32..4, any::<usize>(), prop::collection::vec(any::<u32>(), 0..8))
                .prop_map(|(group, which, offsets)| Step::Bindings { group, which, offsets }),
            1 => prop::option::of(any::<usize>()).prop_map(Step::Input),
            1 => any::<usize>().prop_map(Step::Pointer),
        ]
    }

    proptest! {
        #[test]
        fn reader_returns_what_the_writer_wrote(steps in prop::collection::vec(step(), 0..64)) {
            let objects = Objects::new();
            let commands: Vec<Command> = steps.iter().map(|s| s.command(&objects)).collect();
            let mut s = CommandStream::default();
            for c in &commands {
                s.push(c.clone());
            }
            let referenced = steps.iter().filter(|s| !matches!(s, Step::Plain(_) | Step::Input(None))).count();
            prop_assert_eq!(s.objects().len(), referenced);
            prop_assert_eq!(decode(&s), commands);
        }
    }
}
