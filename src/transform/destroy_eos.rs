//! End-of-stream resource destruction (spec §4.8). Trace capture ends with
//! whatever the application still has live; without explicit teardown a
//! replay leaks driver resources across repeated playback. On `flush`,
//! unbind every thread's context, then walk every initialized context once
//! and delete what it owns -- shared objects (buffers, textures, ...) are
//! deleted through exactly one context in its share group so they're
//! removed exactly once.

use crate::command::catalog::GlCommand;
use crate::command::Cmd;
use crate::error::Result;
use crate::ids::{CmdId, ContextId, RenderbufferId, ThreadId};
use crate::transform::{Transformer, Writer};

/// Virtual renderbuffer ids at or above this are backbuffer/EGL-surface
/// stand-ins, not real GL objects, and must not be deleted (spec §4.8).
const VIRTUAL_RENDERBUFFER_BASE: u32 = 0xF000_0000;

fn is_real_renderbuffer(id: RenderbufferId) -> bool {
    id.0 < VIRTUAL_RENDERBUFFER_BASE
}

#[derive(Default)]
pub struct DestroyEndOfStreamPass {
    next_derive: u32,
}

impl DestroyEndOfStreamPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_derive += 1;
        self.next_derive
    }

    fn unbind_all_threads(&mut self, out: &mut Writer<'_>, at: CmdId) -> Result<()> {
        let threads = out.state().gles.threads_with_current();
        for thread in threads {
            let seq = self.next();
            out.mutate_and_write(
                at.derive(seq),
                Cmd::new(thread, GlCommand::MakeCurrent { ws: crate::command::catalog::WindowSystem::Egl, context: None, surface: None }),
            )?;
        }
        Ok(())
    }

    /// Destroys one context's objects on `thread`, which must already have
    /// it current. Shared tables (buffers, textures, renderbuffers, shaders,
    /// programs) are only emitted for the first context a share group is
    /// visited through; `destroyed_shared` tracks that across the whole
    /// pass by the `Rc` pointer identity of the shared-object group.
    fn destroy_context(&mut self, out: &mut Writer<'_>, at: CmdId, thread: ThreadId, ctx: ContextId, destroy_shared: bool) -> Result<()> {
        if destroy_shared {
            let (renderbuffers, textures, buffers, shaders, programs) = {
                let c = out.state().gles.context(ctx).unwrap();
                let shared = c.shared.borrow();
                let renderbuffers: Vec<_> = shared.renderbuffers.keys_sorted().into_iter().filter(|&id| is_real_renderbuffer(id)).collect();
                let textures = shared.textures.keys_sorted();
                let buffers = shared.buffers.keys_sorted();
                let shaders = shared.shaders.keys_sorted();
                let programs = shared.programs.keys_sorted();
                (renderbuffers, textures, buffers, shaders, programs)
            };

            if !renderbuffers.is_empty() {
                let seq = self.next();
                out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteRenderbuffers(renderbuffers)))?;
            }
            if !textures.is_empty() {
                let seq = self.next();
                out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteTextures(textures)))?;
            }
            if !buffers.is_empty() {
                let seq = self.next();
                out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteBuffers(buffers)))?;
            }
            for shader in shaders {
                let seq = self.next();
                out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteShader(shader)))?;
            }
            for program in programs {
                let seq = self.next();
                out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteProgram(program)))?;
            }
        }

        let (framebuffers, vertex_arrays, queries) = {
            let c = out.state().gles.context(ctx).unwrap();
            (c.objects.framebuffers.keys_sorted(), c.objects.vertex_arrays.keys_sorted(), c.objects.queries.keys_sorted())
        };
        if !framebuffers.is_empty() {
            let seq = self.next();
            out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteFramebuffers(framebuffers)))?;
        }
        if !vertex_arrays.is_empty() {
            let seq = self.next();
            out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteVertexArrays(vertex_arrays)))?;
        }
        if !queries.is_empty() {
            let seq = self.next();
            out.mutate_and_write(at.derive(seq), Cmd::new(thread, GlCommand::DeleteQueries(queries)))?;
        }
        Ok(())
    }
}

impl Transformer for DestroyEndOfStreamPass {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        out.mutate_and_write(id, cmd)
    }

    fn flush(&mut self, out: &mut Writer<'_>) -> Result<()> {
        let base = CmdId::real(u64::MAX);
        self.unbind_all_threads(out, base)?;

        let contexts: Vec<ContextId> = out
            .state()
            .gles
            .contexts_iter()
            .filter(|c| c.info.initialized)
            .map(|c| c.id)
            .collect();

        let teardown_thread = ThreadId(0);
        let mut destroyed_groups: Vec<*const std::cell::RefCell<crate::state::objects::SharedObjects>> = Vec::new();

        for ctx in contexts {
            let seq = self.next();
            out.mutate_and_write(
                base.derive(seq),
                Cmd::new(teardown_thread, GlCommand::MakeCurrent { ws: crate::command::catalog::WindowSystem::Egl, context: Some(ctx), surface: None }),
            )?;

            let ptr = {
                let c = out.state().gles.context(ctx).unwrap();
                std::rc::Rc::as_ptr(&c.shared)
            };
            let first_in_group = !destroyed_groups.contains(&ptr);
            if first_in_group {
                destroyed_groups.push(ptr);
            }

            self.destroy_context(out, base, teardown_thread, ctx, first_in_group)?;
        }

        let seq = self.next();
        out.mutate_and_write(
            base.derive(seq),
            Cmd::new(teardown_thread, GlCommand::MakeCurrent { ws: crate::command::catalog::WindowSystem::Egl, context: None, surface: None }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GlobalState;
    use crate::builder::RecordingBuilder;
    use crate::command::catalog::{BufferTarget, WindowSystem};
    use crate::ids::BufferId;
    use crate::memory::MemoryModel;
    use crate::transform::TransformChain;

    fn setup() -> GlobalState {
        GlobalState::new(MemoryModel::new(8, true))
    }

    #[test]
    fn flush_unbinds_every_thread_and_deletes_owned_objects() {
        let mut global = setup();
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.make_current(ThreadId(0), Some(ContextId(1)));
        global
            .gles
            .context_mut(ContextId(1))
            .unwrap()
            .shared
            .borrow_mut()
            .buffers
            .add(BufferId(5), crate::state::objects::Buffer { id: BufferId(5), data: vec![], size: 0, usage: 0 });

        let mut chain = TransformChain::new(vec![Box::new(DestroyEndOfStreamPass::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));
        chain.flush(&mut global, &mut builder, &mut sink).unwrap();

        assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::DeleteBuffers(ref v) if v == &vec![BufferId(5)])));
        let unbind_count = seen.iter().filter(|(_, c)| matches!(c.kind, GlCommand::MakeCurrent { context: None, .. })).count();
        assert!(unbind_count >= 2);
    }

    #[test]
    fn shared_objects_are_deleted_exactly_once_across_a_share_group() {
        let mut global = setup();
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.create_context(WindowSystem::Egl, ContextId(2), Some(ContextId(1)));
        global
            .gles
            .context_mut(ContextId(1))
            .unwrap()
            .shared
            .borrow_mut()
            .buffers
            .add(BufferId(9), crate::state::objects::Buffer { id: BufferId(9), data: vec![], size: 0, usage: 0 });

        let mut chain = TransformChain::new(vec![Box::new(DestroyEndOfStreamPass::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));
        chain.flush(&mut global, &mut builder, &mut sink).unwrap();

        let delete_count = seen.iter().filter(|(_, c)| matches!(c.kind, GlCommand::DeleteBuffers(_))).count();
        assert_eq!(delete_count, 1);
        let _ = BufferTarget::Array;
    }

    #[test]
    fn virtual_renderbuffers_are_never_deleted() {
        let mut global = setup();
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.context_mut(ContextId(1)).unwrap().shared.borrow_mut().renderbuffers.add(
            RenderbufferId(VIRTUAL_RENDERBUFFER_BASE + 1),
            crate::state::objects::Renderbuffer { id: RenderbufferId(VIRTUAL_RENDERBUFFER_BASE + 1), width: 0, height: 0, internal_format: 0, samples: 0 },
        );

        let mut chain = TransformChain::new(vec![Box::new(DestroyEndOfStreamPass::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));
        chain.flush(&mut global, &mut builder, &mut sink).unwrap();

        assert!(!seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::DeleteRenderbuffers(_))));
    }
}
