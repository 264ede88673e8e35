//! Undefined-framebuffer pass (spec §4.7): GL gives no contents guarantee for
//! a freshly presented EGL surface, or for any frame after a swap that
//! doesn't preserve buffers. Paint a recognizable pattern into such frames so
//! replay output doesn't silently show driver garbage.

use crate::auxil::FastHashSet;
use crate::command::catalog::GlCommand;
use crate::command::{Cmd, CmdFlags};
use crate::error::Result;
use crate::ids::{BufferId, CmdId, ProgramId, ShaderId, ThreadId, VertexArrayId};
use crate::state::context::Context;
use crate::transform::{Transformer, Writer};

const GL_BLEND: u32 = 0x0BE2;
const GL_CULL_FACE: u32 = 0x0B44;
const GL_DEPTH_TEST: u32 = 0x0B71;
const GL_SCISSOR_TEST: u32 = 0x0C11;
const GL_STENCIL_TEST: u32 = 0x0B90;

const TWEAKED_CAPS: [u32; 5] = [GL_BLEND, GL_CULL_FACE, GL_DEPTH_TEST, GL_SCISSOR_TEST, GL_STENCIL_TEST];

const CHECKERBOARD_VERTEX_SOURCE: &str = "attribute vec2 aPos; varying vec2 vPos; void main() { vPos = aPos; gl_Position = vec4(aPos, 0.0, 1.0); }";
const CHECKERBOARD_FRAGMENT_SOURCE: &str =
    "precision mediump float; varying vec2 vPos; void main() { float c = mod(floor(vPos.x * 8.0) + floor(vPos.y * 8.0), 2.0); gl_FragColor = vec4(vec3(c), 1.0); }";

fn quad_vertices() -> Vec<u8> {
    let verts: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
    verts.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Records which of [`TWEAKED_CAPS`] were enabled before the paint pass, to
/// restore afterward instead of assuming a default-disabled state.
struct CapTweaker {
    was_enabled: Vec<u32>,
}

impl CapTweaker {
    fn record(ctx: &Context) -> Self {
        CapTweaker { was_enabled: TWEAKED_CAPS.iter().copied().filter(|c| ctx.enabled.contains(c)).collect() }
    }

    fn disable_all(&self, out: &mut Writer<'_>, thread: ThreadId, id: CmdId, seq: &mut u32) -> Result<()> {
        for &cap in &TWEAKED_CAPS {
            *seq += 1;
            out.mutate_and_write(id.derive(*seq), Cmd::new(thread, GlCommand::Disable(cap)))?;
        }
        Ok(())
    }

    fn revert(&self, out: &mut Writer<'_>, thread: ThreadId, id: CmdId, seq: &mut u32) -> Result<()> {
        for &cap in &self.was_enabled {
            *seq += 1;
            out.mutate_and_write(id.derive(*seq), Cmd::new(thread, GlCommand::Enable(cap)))?;
        }
        Ok(())
    }
}

/// Emits the checkerboard paint sequence for one undefined presentation
/// (spec §4.7 steps 1-5).
fn paint_undefined(out: &mut Writer<'_>, thread: ThreadId, id: CmdId) -> Result<()> {
    let ctx = match out.state().gles.current() {
        Some(c) => c,
        None => return Ok(()),
    };
    let tweaker = CapTweaker::record(ctx);
    let mut seq = 0u32;

    tweaker.disable_all(out, thread, id, &mut seq)?;

    let vertex_shader = ShaderId(out.state().alloc_scratch_id());
    let fragment_shader = ShaderId(out.state().alloc_scratch_id());
    let program = ProgramId(out.state().alloc_scratch_id());
    let vao = VertexArrayId(out.state().alloc_scratch_id());
    let vbo = BufferId(out.state().alloc_scratch_id());

    let mut emit = |out: &mut Writer<'_>, seq: &mut u32, cmd: GlCommand| -> Result<()> {
        *seq += 1;
        out.mutate_and_write(id.derive(*seq), Cmd::new(thread, cmd))
    };

    emit(out, &mut seq, GlCommand::CreateShader { shader: vertex_shader, stage: crate::command::catalog::ShaderStage::Vertex })?;
    emit(out, &mut seq, GlCommand::ShaderSource { shader: vertex_shader, source: CHECKERBOARD_VERTEX_SOURCE.into() })?;
    emit(out, &mut seq, GlCommand::CompileShader(vertex_shader))?;
    emit(out, &mut seq, GlCommand::CreateShader { shader: fragment_shader, stage: crate::command::catalog::ShaderStage::Fragment })?;
    emit(out, &mut seq, GlCommand::ShaderSource { shader: fragment_shader, source: CHECKERBOARD_FRAGMENT_SOURCE.into() })?;
    emit(out, &mut seq, GlCommand::CompileShader(fragment_shader))?;
    emit(out, &mut seq, GlCommand::CreateProgram(program))?;
    emit(out, &mut seq, GlCommand::AttachShader { program, shader: vertex_shader })?;
    emit(out, &mut seq, GlCommand::AttachShader { program, shader: fragment_shader })?;
    emit(out, &mut seq, GlCommand::LinkProgram(program))?;
    emit(out, &mut seq, GlCommand::UseProgram(Some(program)))?;

    emit(out, &mut seq, GlCommand::GenVertexArrays(vec![vao]))?;
    emit(out, &mut seq, GlCommand::BindVertexArray(vao))?;
    emit(out, &mut seq, GlCommand::GenBuffers(vec![vbo]))?;
    emit(out, &mut seq, GlCommand::BindBuffer { target: crate::command::catalog::BufferTarget::Array, buffer: vbo })?;

    let tmp = out.state().memory.alloc(quad_vertices());
    seq += 1;
    out.mutate_and_write(
        id.derive(seq),
        Cmd::new(thread, GlCommand::BufferData { target: crate::command::catalog::BufferTarget::Array, size: tmp.data().len() as u64, data: Some(tmp.ptr()), usage: 0x88E4 }),
    )?;

    emit(out, &mut seq, GlCommand::EnableVertexAttribArray(0))?;
    emit(
        out,
        &mut seq,
        GlCommand::DrawArrays { mode: crate::command::catalog::DrawMode::TriangleStrip, first: 0, count: 4 },
    )?;

    tweaker.revert(out, thread, id, &mut seq)
}

#[derive(Default)]
pub struct UndefinedFramebufferPass {
    seen_surfaces: FastHashSet<u64>,
}

impl UndefinedFramebufferPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for UndefinedFramebufferPass {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        let thread = cmd.thread;

        if let GlCommand::MakeCurrent { surface: Some(surface), .. } = &cmd.kind {
            let is_new = self.seen_surfaces.insert(*surface);
            out.mutate_and_write(id, cmd)?;
            if is_new {
                paint_undefined(out, thread, id)?;
            }
            return Ok(());
        }

        let is_partial_swap = cmd.flags.contains(CmdFlags::PARTIAL_SWAP);
        let is_start_of_frame = cmd.flags.contains(CmdFlags::START_OF_FRAME);
        let preserve_on_swap = out.state().gles.current().map(|c| c.info.preserve_on_swap).unwrap_or(true);

        if is_start_of_frame && !is_partial_swap && !preserve_on_swap {
            out.mutate_and_write(id, cmd)?;
            paint_undefined(out, thread, id)
        } else {
            out.mutate_and_write(id, cmd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GlobalState;
    use crate::builder::RecordingBuilder;
    use crate::command::catalog::WindowSystem;
    use crate::ids::ContextId;
    use crate::memory::MemoryModel;
    use crate::transform::TransformChain;

    fn setup() -> GlobalState {
        let mut global = GlobalState::new(MemoryModel::new(8, true));
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.make_current(ThreadId(0), Some(ContextId(1)));
        global
    }

    #[test]
    fn first_makecurrent_on_a_surface_paints_a_checkerboard() {
        let mut global = setup();
        let mut chain = TransformChain::new(vec![Box::new(UndefinedFramebufferPass::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let cmd = Cmd::new(ThreadId(0), GlCommand::MakeCurrent { ws: WindowSystem::Egl, context: Some(ContextId(1)), surface: Some(42) });
        chain.transform_one(&mut global, &mut builder, CmdId::real(1), cmd, &mut sink).unwrap();

        assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::DrawArrays { .. })));
        assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::LinkProgram(_))));
    }

    #[test]
    fn second_makecurrent_on_the_same_surface_does_not_repaint() {
        let mut global = setup();
        let mut chain = TransformChain::new(vec![Box::new(UndefinedFramebufferPass::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let cmd = Cmd::new(ThreadId(0), GlCommand::MakeCurrent { ws: WindowSystem::Egl, context: Some(ContextId(1)), surface: Some(42) });
        chain.transform_one(&mut global, &mut builder, CmdId::real(1), cmd.clone(), &mut sink).unwrap();
        seen.clear();
        chain.transform_one(&mut global, &mut builder, CmdId::real(2), cmd, &mut sink).unwrap();

        assert!(!seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::DrawArrays { .. })));
    }

    #[test]
    fn swap_buffers_with_damage_never_triggers_a_repaint() {
        let mut global = setup();
        global.gles.context_mut(ContextId(1)).unwrap().info.preserve_on_swap = false;
        let mut chain = TransformChain::new(vec![Box::new(UndefinedFramebufferPass::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let cmd = Cmd::new(ThreadId(0), GlCommand::SwapBuffersWithDamage { ws: WindowSystem::Egl, rects: vec![] });
        chain.transform_one(&mut global, &mut builder, CmdId::real(1), cmd, &mut sink).unwrap();

        assert!(!seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::DrawArrays { .. })));
    }
}
