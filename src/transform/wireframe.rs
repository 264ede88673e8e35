//! Wireframe passes (spec §4.9): `wireframe` rewrites polygon mode for every
//! draw targeting a given framebuffer; `wireframeOverlay` inserts a second,
//! wireframe redraw of the scene on top of the original at a chosen point.

use crate::command::catalog::GlCommand;
use crate::command::Cmd;
use crate::error::Result;
use crate::ids::{CmdId, ContextId, FramebufferId};
use crate::transform::{Transformer, Writer};

const GL_FRONT_AND_BACK: u32 = 0x0408;
const GL_LINE: u32 = 0x1B01;
const GL_FILL: u32 = 0x1B02;
const GL_DEPTH_TEST: u32 = 0x0B71;
const GL_CULL_FACE: u32 = 0x0B44;

fn is_draw(cmd: &Cmd) -> bool {
    cmd.flags.contains(crate::command::CmdFlags::DRAW)
}

/// Rewrites every draw targeting `fb` in `ctx` to `GL_LINE` polygon mode
/// (spec §4.9 `wireframe`). Draws on other framebuffers, or in other
/// contexts, pass through unchanged.
pub struct WireframePass {
    ctx: ContextId,
    fb: FramebufferId,
}

impl WireframePass {
    pub fn new(ctx: ContextId, fb: FramebufferId) -> Self {
        WireframePass { ctx, fb }
    }

    fn targets_nominated_fb(&self, out: &mut Writer<'_>) -> bool {
        out.state()
            .gles
            .context(self.ctx)
            .map(|c| c.bound.draw_framebuffer == self.fb)
            .unwrap_or(false)
    }
}

impl Transformer for WireframePass {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        let thread = cmd.thread;
        if is_draw(&cmd) && self.targets_nominated_fb(out) {
            out.mutate_and_write(id.derive(1), Cmd::new(thread, GlCommand::PolygonMode { mode: GL_LINE }))?;
            out.mutate_and_write(id, cmd)?;
            out.mutate_and_write(id.derive(2), Cmd::new(thread, GlCommand::PolygonMode { mode: GL_FILL }))
        } else {
            out.mutate_and_write(id, cmd)
        }
    }
}

/// Inserts a second wireframe pass over the scene at `target_cmd_id` (spec
/// §4.9 `wireframeOverlay`): depth test stays on (so the overlay only shows
/// where it's in front of or level with what's already drawn) but face
/// culling is disabled so back-facing wireframe edges remain visible.
pub struct WireframeOverlayPass {
    target: CmdId,
    replayed: Vec<(CmdId, Cmd)>,
    done: bool,
}

impl WireframeOverlayPass {
    pub fn new(target: CmdId) -> Self {
        WireframeOverlayPass { target, replayed: Vec::new(), done: false }
    }

    fn emit_overlay(&mut self, out: &mut Writer<'_>) -> Result<()> {
        if self.done || self.replayed.is_empty() {
            return Ok(());
        }
        self.done = true;
        let thread = self.replayed[0].1.thread;
        let base = self.target;

        out.mutate_and_write(base.derive(1000), Cmd::new(thread, GlCommand::Enable(GL_DEPTH_TEST)))?;
        out.mutate_and_write(base.derive(1001), Cmd::new(thread, GlCommand::Disable(GL_CULL_FACE)))?;
        out.mutate_and_write(base.derive(1002), Cmd::new(thread, GlCommand::PolygonMode { mode: GL_LINE }))?;

        let replayed = std::mem::take(&mut self.replayed);
        for (i, (_, cmd)) in replayed.into_iter().enumerate() {
            out.mutate_and_write(base.derive(1003 + i as u32), cmd)?;
        }

        out.mutate_and_write(base.derive(2000), Cmd::new(thread, GlCommand::PolygonMode { mode: GL_FILL }))
    }
}

impl Transformer for WireframeOverlayPass {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        if is_draw(&cmd) && id <= self.target {
            self.replayed.push((id, cmd.clone()));
        }
        out.mutate_and_write(id, cmd)?;
        if id == self.target {
            self.emit_overlay(out)?;
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Writer<'_>) -> Result<()> {
        self.emit_overlay(out)
    }
}

#[allow(dead_code)]
fn front_and_back() -> u32 {
    GL_FRONT_AND_BACK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GlobalState;
    use crate::builder::RecordingBuilder;
    use crate::command::catalog::{DrawMode, WindowSystem};
    use crate::ids::ThreadId;
    use crate::memory::MemoryModel;
    use crate::transform::TransformChain;

    fn setup() -> GlobalState {
        let mut global = GlobalState::new(MemoryModel::new(8, true));
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.make_current(ThreadId(0), Some(ContextId(1)));
        global
    }

    #[test]
    fn draw_on_nominated_framebuffer_is_wrapped_in_polygon_mode() {
        let mut global = setup();
        let mut chain = TransformChain::new(vec![Box::new(WireframePass::new(ContextId(1), FramebufferId(7)))]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        global.gles.context_mut(ContextId(1)).unwrap().bound.draw_framebuffer = FramebufferId(7);
        let draw = Cmd::new(ThreadId(0), GlCommand::DrawArrays { mode: DrawMode::Triangles, first: 0, count: 3 });
        chain.transform_one(&mut global, &mut builder, CmdId::real(1), draw, &mut sink).unwrap();

        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0].1.kind, GlCommand::PolygonMode { mode } if mode == GL_LINE));
        assert!(matches!(seen[1].1.kind, GlCommand::DrawArrays { .. }));
        assert!(matches!(seen[2].1.kind, GlCommand::PolygonMode { mode } if mode == GL_FILL));
    }

    #[test]
    fn draw_on_another_framebuffer_passes_through() {
        let mut global = setup();
        let mut chain = TransformChain::new(vec![Box::new(WireframePass::new(ContextId(1), FramebufferId(7)))]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        global.gles.context_mut(ContextId(1)).unwrap().bound.draw_framebuffer = FramebufferId(3);
        let draw = Cmd::new(ThreadId(0), GlCommand::DrawArrays { mode: DrawMode::Triangles, first: 0, count: 3 });
        chain.transform_one(&mut global, &mut builder, CmdId::real(1), draw, &mut sink).unwrap();

        assert_eq!(seen.len(), 1);
    }
}
