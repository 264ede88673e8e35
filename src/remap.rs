//! Identifier remapping from capture-time object ids to replay-time ones
//! (spec §4.3).
//!
//! Every typed id computes a [`RemapKey`] that uniquely identifies the
//! object within whichever table currently owns it. Two commands that touch
//! the same live object at different points in the stream must agree on the
//! key (spec §8 invariant 3) even though the raw capture id never changes;
//! the key additionally captures *which* share-group or context table the id
//! is resolved against, which is what lets EGL-image redirection (spec
//! scenario 5) and per-program uniform scoping work.

use crate::command::{Cmd, GlCommand};
use crate::error::{Error, Result};
use crate::ids::*;
use crate::memory::Pointer;
use crate::state::GlesState;
use std::rc::Rc;

/// Identifies the concrete table a key resolves against: either a
/// shared-object group (buffers, textures, ...; keyed by the `Rc`'s address,
/// stable for the lifetime of the share group) or a single context's
/// per-context tables (vertex arrays, framebuffers, ...).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TableRef {
    Shared(usize),
    Context(ContextId),
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RemapKey {
    Buffer(TableRef, BufferId),
    Texture(TableRef, TextureId),
    Renderbuffer(TableRef, RenderbufferId),
    Shader(TableRef, ShaderId),
    Program(TableRef, ProgramId),
    Sampler(TableRef, SamplerId),
    Sync(TableRef, SyncId),
    VertexArray(TableRef, VertexArrayId),
    Framebuffer(TableRef, FramebufferId),
    Query(TableRef, QueryId),
    TransformFeedback(TableRef, TransformFeedbackId),
    Pipeline(TableRef, PipelineId),
    UniformLocation(TableRef, ProgramId, i32),
    UniformBlockIndex(TableRef, ProgramId, u32),
}

fn shared_ref(state: &GlesState, ctx: ContextId) -> Result<TableRef> {
    let ctx = state
        .context(ctx)
        .ok_or_else(|| Error::Infrastructure(format!("no context {:?}", ctx)))?;
    Ok(TableRef::Shared(Rc::as_ptr(&ctx.shared) as usize))
}

fn current_context(state: &GlesState) -> Result<ContextId> {
    state
        .current_context
        .ok_or_else(|| Error::Infrastructure("no current context for remap".into()))
}

/// `BufferId::NULL`/other-id `0` is never remapped (spec §4.3, §3
/// invariants): callers should check `id.is_null()` before calling this and
/// pass the sentinel straight through.
pub fn remap_buffer(id: BufferId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Buffer(shared_ref(state, ctx)?, id))
}

/// Redirects through an EGL-image back-reference when one is present and the
/// command isn't a delete (spec §4.3, scenario 5).
pub fn remap_texture(id: TextureId, cmd: &Cmd, state: &GlesState) -> Result<RemapKey> {
    let ctx_id = current_context(state)?;
    let ctx = state.context(ctx_id).unwrap();
    let is_delete = matches!(cmd.kind, GlCommand::DeleteTextures(_));

    if !is_delete {
        let backref = ctx.shared.borrow().textures.get(id).and_then(|t| t.egl_image);
        if let Some(backref) = backref {
            let target_ctx = state
                .context(backref.target_context)
                .ok_or(Error::CannotFindEglReplacementContext(backref.target_context.0))?;
            if !target_ctx.shared.borrow().textures.contains(backref.target_texture) {
                return Err(Error::CannotFindEglReplacementTexture(backref.target_texture.0));
            }
            let table = TableRef::Shared(Rc::as_ptr(&target_ctx.shared) as usize);
            return Ok(RemapKey::Texture(table, backref.target_texture));
        }
    }

    Ok(RemapKey::Texture(shared_ref(state, ctx_id)?, id))
}

pub fn remap_renderbuffer(id: RenderbufferId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Renderbuffer(shared_ref(state, ctx)?, id))
}

pub fn remap_shader(id: ShaderId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Shader(shared_ref(state, ctx)?, id))
}

pub fn remap_program(id: ProgramId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Program(shared_ref(state, ctx)?, id))
}

pub fn remap_sampler(id: SamplerId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Sampler(shared_ref(state, ctx)?, id))
}

pub fn remap_sync(id: SyncId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Sync(shared_ref(state, ctx)?, id))
}

/// Per-context (non-shareable) tables key directly on the context id.
pub fn remap_vertex_array(id: VertexArrayId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::VertexArray(TableRef::Context(ctx), id))
}

pub fn remap_framebuffer(id: FramebufferId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Framebuffer(TableRef::Context(ctx), id))
}

pub fn remap_query(id: QueryId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Query(TableRef::Context(ctx), id))
}

pub fn remap_transform_feedback(id: TransformFeedbackId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::TransformFeedback(TableRef::Context(ctx), id))
}

pub fn remap_pipeline(id: PipelineId, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    Ok(RemapKey::Pipeline(TableRef::Context(ctx), id))
}

/// The program a uniform-location/uniform-block-index command targets:
/// query commands carry an explicit program argument; everything else
/// targets the currently bound program (spec §4.3).
fn owning_program(cmd: &Cmd, state: &GlesState) -> Result<ProgramId> {
    let explicit = match &cmd.kind {
        GlCommand::GetActiveUniform { program, .. }
        | GlCommand::GetUniformLocation { program, .. }
        | GlCommand::GetActiveUniformBlockName { program, .. }
        | GlCommand::GetActiveUniformBlockiv { program, .. }
        | GlCommand::GetUniformBlockIndex { program, .. }
        | GlCommand::UniformBlockBinding { program, .. } => Some(*program),
        _ => None,
    };
    if let Some(p) = explicit {
        return Ok(p);
    }
    let ctx_id = current_context(state)?;
    state
        .context(ctx_id)
        .and_then(|c| c.bound.program)
        .ok_or_else(|| Error::DataUnavailable(crate::error::DataUnavailable::NoProgramBound))
}

pub fn remap_uniform_location(location: i32, cmd: &Cmd, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    let program = owning_program(cmd, state)?;
    Ok(RemapKey::UniformLocation(shared_ref(state, ctx)?, program, location))
}

pub fn remap_uniform_block_index(index: u32, cmd: &Cmd, state: &GlesState) -> Result<RemapKey> {
    let ctx = current_context(state)?;
    let program = owning_program(cmd, state)?;
    Ok(RemapKey::UniformBlockIndex(shared_ref(state, ctx)?, program, index))
}

/// Which bound buffer target governs how a pointer-typed argument is
/// interpreted at replay time (spec §4.3).
#[derive(Copy, Clone, Debug)]
pub enum PointerRole {
    Indices,
    Vertex,
    PixelUnpack,
}

/// `AbsolutePointer(addr)` when the address is `0` or a GL buffer is bound
/// on the relevant target; otherwise `ObservedPointer`, which tells the
/// replay engine to materialize the captured observation bytes at `addr`
/// into its own address space (spec §4.3).
pub fn translate_pointer(
    role: PointerRole,
    ctx: &crate::state::Context,
    pointer: Pointer,
    len: u64,
) -> crate::builder::ReplayPointer {
    use crate::builder::ReplayPointer;

    let buffer_bound = match role {
        PointerRole::Indices => !ctx.bound.element_array_buffer.is_null(),
        PointerRole::Vertex => !ctx.bound.array_buffer.is_null(),
        PointerRole::PixelUnpack => !ctx.bound.pixel_unpack_buffer.is_null(),
    };

    if pointer.is_null() || buffer_bound {
        ReplayPointer::Absolute(pointer.addr)
    } else {
        ReplayPointer::Observed {
            pool: pointer.pool,
            addr: pointer.addr,
            len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::catalog::WindowSystem;
    use crate::ids::ThreadId;

    fn state_with_context() -> (GlesState, ContextId) {
        let mut s = GlesState::new();
        let id = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, id, None);
        s.make_current(ThreadId(0), Some(id));
        s.refresh_current_context(ThreadId(0));
        (s, id)
    }

    #[test]
    fn null_buffer_is_not_remapped_by_caller_convention() {
        assert!(BufferId::NULL.is_null());
    }

    #[test]
    fn buffer_key_stable_across_two_commands_on_same_context() {
        let (state, _) = state_with_context();
        let k1 = remap_buffer(BufferId(5), &state).unwrap();
        let k2 = remap_buffer(BufferId(5), &state).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn egl_image_redirects_to_target_context_texture() {
        let mut s = GlesState::new();
        let a = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, a, None);
        let b = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, b, None);
        s.context_mut(b).unwrap().shared.borrow_mut().textures.add(
            TextureId(7),
            crate::state::objects::Texture::default(),
        );
        s.context_mut(a).unwrap().shared.borrow_mut().textures.add(
            TextureId(3),
            crate::state::objects::Texture {
                id: TextureId(3),
                egl_image: Some(crate::state::objects::EglImageBackref {
                    target_context: b,
                    target_texture: TextureId(7),
                }),
                ..Default::default()
            },
        );
        s.make_current(ThreadId(0), Some(a));
        s.refresh_current_context(ThreadId(0));

        let cmd = Cmd::new(ThreadId(0), GlCommand::BindTexture {
            target: crate::command::catalog::TextureTarget::Texture2D,
            texture: TextureId(3),
        });
        let key = remap_texture(TextureId(3), &cmd, &s).unwrap();
        let expected_table = TableRef::Shared(Rc::as_ptr(&s.context(b).unwrap().shared) as usize);
        assert_eq!(key, RemapKey::Texture(expected_table, TextureId(7)));
    }

    #[test]
    fn missing_egl_replacement_context_is_an_error() {
        let mut s = GlesState::new();
        let a = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, a, None);
        s.context_mut(a).unwrap().shared.borrow_mut().textures.add(
            TextureId(3),
            crate::state::objects::Texture {
                id: TextureId(3),
                egl_image: Some(crate::state::objects::EglImageBackref {
                    target_context: ContextId(999),
                    target_texture: TextureId(7),
                }),
                ..Default::default()
            },
        );
        s.make_current(ThreadId(0), Some(a));
        s.refresh_current_context(ThreadId(0));
        let cmd = Cmd::new(ThreadId(0), GlCommand::BindTexture {
            target: crate::command::catalog::TextureTarget::Texture2D,
            texture: TextureId(3),
        });
        let err = remap_texture(TextureId(3), &cmd, &s).unwrap_err();
        assert!(matches!(err, Error::CannotFindEglReplacementContext(999)));
    }
}
