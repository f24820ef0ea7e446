//! Programs and their compile state machine.
//!
//! ```text
//! NeedsCompile ─compile()─▶ Compiling ─advance()─▶ NeedsBind ─first bind─▶ ReadyToUse
//!                               │
//!                               └─ shader_debug and a compile/link error ─▶ Failed
//! ```
//!
//! Compile and link are issued as soon as the program is created. With
//! `KHR_parallel_shader_compile` the device polls completion; without it
//! the program counts as compiled right away.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{GpuError, Result};
use crate::gl::{consts as gl, GlContext, GlProgram, GlShader, GlUniformLocation};

use super::shader_scan::{scan_shader_bindings, ShaderBindings};
use super::ResourceBase;

/// GLSL sources, already specialized for the target context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDescriptor {
    pub vertex_source: String,
    pub fragment_source: String,
}

impl ProgramDescriptor {
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramCompileState {
    NeedsCompile,
    Compiling,
    NeedsBind,
    ReadyToUse,
    /// Compile or link failed; the program never becomes ready.
    Failed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ProgramNative {
    pub(crate) program: GlProgram,
    pub(crate) vertex: GlShader,
    pub(crate) fragment: GlShader,
}

#[derive(Debug)]
pub(crate) struct ProgramInner {
    pub(crate) base: ResourceBase,
    pub(crate) descriptor: RefCell<ProgramDescriptor>,
    pub(crate) native: Cell<Option<ProgramNative>>,
    pub(crate) state: Cell<ProgramCompileState>,
    pub(crate) bindings: RefCell<ShaderBindings>,
    /// Uniform-array locations of emulated uniform blocks, by binding point.
    pub(crate) emulated_blocks: RefCell<Vec<Option<GlUniformLocation>>>,
}

#[derive(Debug, Clone)]
pub struct Program(pub(crate) Rc<ProgramInner>);

resource_handle!(Program, destroy_program);

impl Program {
    pub(crate) fn new(base: ResourceBase, descriptor: ProgramDescriptor) -> Self {
        Self(Rc::new(ProgramInner {
            base,
            descriptor: RefCell::new(descriptor),
            native: Cell::new(None),
            state: Cell::new(ProgramCompileState::NeedsCompile),
            bindings: RefCell::new(ShaderBindings::default()),
            emulated_blocks: RefCell::new(Vec::new()),
        }))
    }

    pub fn compile_state(&self) -> ProgramCompileState {
        self.0.state.get()
    }

    pub fn descriptor(&self) -> ProgramDescriptor {
        self.0.descriptor.borrow().clone()
    }

    /// Bindings found when the program was first bound.
    pub fn shader_bindings(&self) -> ShaderBindings {
        self.0.bindings.borrow().clone()
    }

    pub(crate) fn gl_program(&self) -> Option<GlProgram> {
        self.0.native.get().map(|n| n.program)
    }

    pub(crate) fn emulated_block_location(&self, slot: u32) -> Option<GlUniformLocation> {
        self.0.emulated_blocks.borrow().get(slot as usize).copied().flatten()
    }

    /// Issues compile and link for the current sources.
    pub(crate) fn compile(&self, ctx: &mut dyn GlContext) -> Result<()> {
        let descriptor = self.0.descriptor.borrow();
        let vertex = compile_shader(ctx, gl::VERTEX_SHADER, &descriptor.vertex_source)?;
        let fragment = compile_shader(ctx, gl::FRAGMENT_SHADER, &descriptor.fragment_source)?;
        let program = ctx
            .create_program()
            .ok_or_else(|| GpuError::Native("createProgram returned null".into()))?;
        ctx.attach_shader(program, vertex);
        ctx.attach_shader(program, fragment);
        ctx.link_program(program);

        self.0.native.set(Some(ProgramNative { program, vertex, fragment }));
        self.0.state.set(ProgramCompileState::Compiling);
        Ok(())
    }

    /// Polls a compiling program. Returns the state after polling.
    pub(crate) fn advance(&self, ctx: &mut dyn GlContext, parallel_compile: bool, shader_debug: bool) -> ProgramCompileState {
        if self.0.state.get() != ProgramCompileState::Compiling {
            return self.0.state.get();
        }
        let Some(native) = self.0.native.get() else {
            return self.0.state.get();
        };

        if parallel_compile && !ctx.program_completion_status(native.program) {
            return ProgramCompileState::Compiling;
        }

        let next = if shader_debug && !self.check_status(ctx, native) {
            ProgramCompileState::Failed
        } else {
            ProgramCompileState::NeedsBind
        };
        self.0.state.set(next);
        next
    }

    fn check_status(&self, ctx: &mut dyn GlContext, native: ProgramNative) -> bool {
        let label = self.0.base.label();
        let mut ok = true;

        for (stage, shader) in [("vertex", native.vertex), ("fragment", native.fragment)] {
            if !ctx.shader_compile_status(shader) {
                let source = match stage {
                    "vertex" => self.0.descriptor.borrow().vertex_source.clone(),
                    _ => self.0.descriptor.borrow().fragment_source.clone(),
                };
                log::error!(
                    "{stage} shader of program {label} failed to compile:\n{}\n{}",
                    ctx.shader_info_log(shader),
                    numbered(&source)
                );
                ok = false;
            }
        }

        if ok && !ctx.program_link_status(native.program) {
            log::error!("program {label} failed to link:\n{}", ctx.program_info_log(native.program));
            ok = false;
        }
        ok
    }

    /// Freezes the scanned bindings. The caller finishes the bind-time setup
    /// and flips the state to [`ProgramCompileState::ReadyToUse`].
    pub(crate) fn scan_bindings(&self) -> ShaderBindings {
        let descriptor = self.0.descriptor.borrow();
        let bindings = scan_shader_bindings([descriptor.vertex_source.as_str(), descriptor.fragment_source.as_str()]);
        *self.0.bindings.borrow_mut() = bindings.clone();
        bindings
    }

    pub(crate) fn set_emulated_blocks(&self, locations: Vec<Option<GlUniformLocation>>) {
        *self.0.emulated_blocks.borrow_mut() = locations;
    }

    pub(crate) fn set_state(&self, state: ProgramCompileState) {
        self.0.state.set(state);
    }

    /// Deletes the native objects; returns the deleted program.
    pub(crate) fn release_native(&self, ctx: &mut dyn GlContext) -> Option<GlProgram> {
        let native = self.0.native.take()?;
        ctx.delete_shader(native.vertex);
        ctx.delete_shader(native.fragment);
        ctx.delete_program(native.program);
        Some(native.program)
    }

    pub(crate) fn replace_sources(&self, descriptor: ProgramDescriptor) {
        *self.0.descriptor.borrow_mut() = descriptor;
        *self.0.bindings.borrow_mut() = ShaderBindings::default();
        self.0.emulated_blocks.borrow_mut().clear();
        self.0.state.set(ProgramCompileState::NeedsCompile);
    }
}

fn compile_shader(ctx: &mut dyn GlContext, ty: u32, source: &str) -> Result<GlShader> {
    let shader = ctx
        .create_shader(ty)
        .ok_or_else(|| GpuError::Native("createShader returned null".into()))?;
    ctx.shader_source(shader, source);
    ctx.compile_shader(shader);
    Ok(shader)
}

/// Source with line numbers, for compile error logs.
fn numbered(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:4}  {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingContext};
    use crate::resource::ResourceType;

    fn program(vs: &str, fs: &str) -> Program {
        Program::new(ResourceBase::new(ResourceType::Program), ProgramDescriptor::new(vs, fs))
    }

    #[test]
    fn compile_issues_shaders_and_link() {
        let mut ctx = RecordingContext::webgl2();
        let p = program("void main() {}", "void main() {}");
        p.compile(&mut ctx).unwrap();
        assert_eq!(p.compile_state(), ProgramCompileState::Compiling);
        assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::CompileShader(_))), 2);
        assert_eq!(ctx.count_calls(|c| matches!(c, GlCall::LinkProgram(_))), 1);
    }

    #[test]
    fn synchronous_compile_advances_immediately() {
        let mut ctx = RecordingContext::webgl2();
        let p = program("void main() {}", "void main() {}");
        p.compile(&mut ctx).unwrap();
        assert_eq!(p.advance(&mut ctx, false, true), ProgramCompileState::NeedsBind);
    }

    #[test]
    fn parallel_compile_waits_for_completion() {
        let mut ctx = RecordingContext::webgl2().with_compile_polls(1);
        let p = program("void main() {}", "void main() {}");
        p.compile(&mut ctx).unwrap();
        assert_eq!(p.advance(&mut ctx, true, false), ProgramCompileState::Compiling);
        assert_eq!(p.advance(&mut ctx, true, false), ProgramCompileState::NeedsBind);
    }

    #[test]
    fn shader_debug_detects_failure() {
        let mut ctx = RecordingContext::webgl2().with_failing_shader_marker("BROKEN");
        let p = program("void main() {}", "BROKEN");
        p.compile(&mut ctx).unwrap();
        assert_eq!(p.advance(&mut ctx, false, true), ProgramCompileState::Failed);
        assert_eq!(p.advance(&mut ctx, false, true), ProgramCompileState::Failed);
    }

    #[test]
    fn failure_unnoticed_without_shader_debug() {
        let mut ctx = RecordingContext::webgl2().with_failing_shader_marker("BROKEN");
        let p = program("void main() {}", "BROKEN");
        p.compile(&mut ctx).unwrap();
        assert_eq!(p.advance(&mut ctx, false, false), ProgramCompileState::NeedsBind);
    }

    #[test]
    fn numbered_lines() {
        assert_eq!(numbered("a\nb"), "   1  a\n   2  b");
    }
}
