//! The GLES state mutator (spec §4.2): `pre_mutate` plus the per-command
//! state-transition function shared by capture interpretation, DCE and
//! replay emission.

use crate::arena::GlobalState;
use crate::builder::{Builder, ReplayOp};
use crate::command::catalog::{BufferTarget, FramebufferTarget, GlCommand, WindowSystem};
use crate::error::{Error, Result};
use crate::ids::CmdId;
use crate::command::Cmd;
use crate::state::objects::{
    Buffer, Framebuffer, FramebufferAttachment, Program, Renderbuffer, Texture, VertexArray,
};

/// Step 1-3 of spec §4.2: set the current context from the command's
/// thread, reject `gl*` commands with none bound, refresh cached version
/// info (a no-op here since `Info` lives directly on `Context`, not in a
/// separate cache).
pub fn pre_mutate(global: &mut GlobalState, id: CmdId, cmd: &Cmd) -> Result<()> {
    global.gles.refresh_current_context(cmd.thread);

    let is_gl_call = cmd.name().starts_with("gl");
    if is_gl_call && global.gles.current_context.is_none() {
        global.push_message(log::Level::Error, format!("no context bound for {}", cmd.name()));
        return Err(Error::NoContextBound(id));
    }
    Ok(())
}

fn forward(builder: &mut Option<&mut dyn Builder>, cmd: &Cmd) {
    if let Some(b) = builder {
        b.call(cmd);
    }
}

/// Applies `cmd` to `global`'s GLES state and, if a builder is supplied,
/// emits the equivalent replay instruction(s) (spec §4.2).
pub fn mutate(global: &mut GlobalState, id: CmdId, cmd: &Cmd, mut builder: Option<&mut dyn Builder>) -> Result<()> {
    pre_mutate(global, id, cmd)?;

    match &cmd.kind {
        GlCommand::CreateContext { ws, context, share } => {
            global.gles.create_context(*ws, *context, *share);
            if let Some(state) = cmd.static_context_state() {
                if let Some(ctx) = global.gles.context_mut(*context) {
                    ctx.info.supported_version = state.version;
                }
            }
            forward(&mut builder, cmd);
            if let Some(b) = builder.as_deref_mut() {
                b.replay_op(ReplayOp::CreateRenderer(*context));
            }
        }

        GlCommand::MakeCurrent { context, .. } => {
            global.gles.make_current(cmd.thread, *context);
            forward(&mut builder, cmd);
            if let Some(b) = builder.as_deref_mut() {
                match context {
                    Some(c) => b.replay_op(ReplayOp::BindRenderer(*c)),
                    None => {
                        if let Some(prev) = global.gles.current_context {
                            b.replay_op(ReplayOp::UnbindRenderer(prev));
                        }
                    }
                }
            }
            if let (Some(c), Some(dyn_state)) = (context, cmd.dynamic_context_state()) {
                if let Some(ctx) = global.gles.context_mut(*c) {
                    ctx.backbuffer.width = dyn_state.backbuffer_width;
                    ctx.backbuffer.height = dyn_state.backbuffer_height;
                    ctx.info.preserve_on_swap = dyn_state.preserve_buffers_on_swap;
                }
                if let Some(b) = builder.as_deref_mut() {
                    b.replay_op(ReplayOp::ChangeBackbuffer {
                        context: *c,
                        width: dyn_state.backbuffer_width,
                        height: dyn_state.backbuffer_height,
                        preserve_on_swap: dyn_state.preserve_buffers_on_swap,
                    });
                }
            }
        }

        GlCommand::SwapBuffers { .. } | GlCommand::SwapBuffersWithDamage { .. } => {
            forward(&mut builder, cmd);
        }

        // --- buffers ---------------------------------------------------
        GlCommand::GenBuffers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().buffers.add(
                        id,
                        Buffer { id, data: Vec::new(), size: 0, usage: 0 },
                    );
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteBuffers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().buffers.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BindBuffer { target, buffer } => {
            with_current(global, |ctx| bind_buffer_target(ctx, *target, *buffer))?;
            forward(&mut builder, cmd);
        }
        GlCommand::BufferData { target, size, .. } => {
            with_current(global, |ctx| {
                let buffer_id = bound_buffer(ctx, *target);
                if let Some(buf) = ctx.shared.borrow_mut().buffers.get_mut(buffer_id) {
                    buf.size = *size;
                    buf.data = vec![0u8; *size as usize];
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BufferSubData { .. } | GlCommand::CopyBufferSubData { .. } => {
            forward(&mut builder, cmd);
        }
        GlCommand::BindBufferRange { target, index, buffer, .. }
        | GlCommand::BindBufferBase { target, index, buffer } => {
            with_current(global, |ctx| {
                if *target == BufferTarget::Uniform {
                    let idx = *index as usize;
                    if idx < ctx.bound.uniform_buffers.len() {
                        ctx.bound.uniform_buffers[idx] = *buffer;
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }

        // --- vertex arrays -------------------------------------------------
        GlCommand::GenVertexArrays(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.vertex_arrays.add(id, VertexArray::new(id));
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteVertexArrays(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.vertex_arrays.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BindVertexArray(id) => {
            with_current(global, |ctx| ctx.bound.vertex_array = *id)?;
            forward(&mut builder, cmd);
        }
        GlCommand::EnableVertexAttribArray(index) => {
            with_current(global, |ctx| {
                let vao = ctx.bound.vertex_array;
                if let Some(va) = ctx.objects.vertex_arrays.get_mut(vao) {
                    if let Some(a) = va.attribs.get_mut(*index as usize) {
                        a.enabled = true;
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DisableVertexAttribArray(index) => {
            with_current(global, |ctx| {
                let vao = ctx.bound.vertex_array;
                if let Some(va) = ctx.objects.vertex_arrays.get_mut(vao) {
                    if let Some(a) = va.attribs.get_mut(*index as usize) {
                        a.enabled = false;
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::VertexAttribPointerCmd(p) => {
            with_current(global, |ctx| {
                let array_buffer = ctx.bound.array_buffer;
                let vao = ctx.bound.vertex_array;
                if let Some(va) = ctx.objects.vertex_arrays.get_mut(vao) {
                    if let Some(a) = va.attribs.get_mut(p.index as usize) {
                        a.size = p.size;
                        a.gl_type = p.attrib_type;
                        a.normalized = p.normalized;
                        a.stride = p.stride;
                        a.pointer = p.pointer.addr;
                    }
                    if let Some(b) = va.bindings.get_mut(p.index as usize) {
                        b.buffer = array_buffer;
                    }
                    if array_buffer.is_null() && !p.pointer.is_null() {
                        va.client_vertex_attribs.insert(p.index, *p);
                    } else {
                        va.client_vertex_attribs.remove(&p.index);
                    }
                }
            })?;
            // Deliberately not forwarded here: the compat vertex-array pass
            // (spec §4.5.1) owns emission for attributes backed by client
            // memory, rewriting the pointer before it reaches the builder.
        }
        GlCommand::VertexAttribDivisor { index, divisor } => {
            with_current(global, |ctx| {
                let vao = ctx.bound.vertex_array;
                if let Some(va) = ctx.objects.vertex_arrays.get_mut(vao) {
                    if let Some(b) = va.bindings.get_mut(*index as usize) {
                        b.divisor = *divisor;
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }

        GlCommand::DrawArrays { .. }
        | GlCommand::DrawElements { .. }
        | GlCommand::DrawRangeElements { .. }
        | GlCommand::DrawArraysInstanced { .. }
        | GlCommand::DrawElementsInstanced { .. }
        | GlCommand::DrawArraysIndirect { .. }
        | GlCommand::DrawElementsIndirect { .. } => {
            forward(&mut builder, cmd);
        }

        // --- textures --------------------------------------------------
        GlCommand::GenTextures(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().textures.add(id, Texture { id, ..Default::default() });
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteTextures(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().textures.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BindTexture { texture, .. } => {
            with_current(global, |ctx| {
                let unit = ctx.bound.texture_unit as usize;
                if unit < ctx.bound.texture_2d.len() {
                    ctx.bound.texture_2d[unit] = *texture;
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::TexImage2D(desc) => {
            with_current(global, |ctx| {
                let texture = bound_texture(ctx);
                let target = desc.target.normalized();
                if let Some(tex) = ctx.shared.borrow_mut().textures.get_mut(texture) {
                    tex.kind = Some(target);
                    let level = tex.levels.entry(desc.level).or_default();
                    level.insert(
                        0,
                        crate::state::objects::TextureLevel {
                            width: desc.width,
                            height: desc.height,
                            depth: 1,
                            sized_format: desc.internal_format,
                            samples: 0,
                        },
                    );
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::TexStorage2D { levels, internal_format, width, height, .. } => {
            with_current(global, |ctx| {
                let texture = bound_texture(ctx);
                if let Some(tex) = ctx.shared.borrow_mut().textures.get_mut(texture) {
                    for lvl in 0..*levels {
                        let mip_w = (*width >> lvl).max(1);
                        let mip_h = (*height >> lvl).max(1);
                        tex.levels.entry(lvl).or_default().insert(
                            0,
                            crate::state::objects::TextureLevel {
                                width: mip_w,
                                height: mip_h,
                                depth: 1,
                                sized_format: *internal_format,
                                samples: 0,
                            },
                        );
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::TexSubImage2D { .. }
        | GlCommand::CompressedTexImage2D { .. }
        | GlCommand::CompressedTexSubImage2D { .. } => {
            forward(&mut builder, cmd);
        }
        GlCommand::TexParameterSwizzle { value, .. } => {
            with_current(global, |ctx| {
                let texture = bound_texture(ctx);
                if let Some(tex) = ctx.shared.borrow_mut().textures.get_mut(texture) {
                    tex.swizzle.r = *value;
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::TexParameteri { .. } => {
            forward(&mut builder, cmd);
        }

        // --- renderbuffers / framebuffers -------------------------------
        GlCommand::GenRenderbuffers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().renderbuffers.add(
                        id,
                        Renderbuffer { id, width: 0, height: 0, internal_format: 0, samples: 0 },
                    );
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteRenderbuffers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    if !id.is_virtual() {
                        ctx.shared.borrow_mut().renderbuffers.remove(*id);
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BindRenderbuffer(id) => {
            with_current(global, |ctx| ctx.bound.renderbuffer = *id)?;
            forward(&mut builder, cmd);
        }
        GlCommand::RenderbufferStorage { internal_format, width, height } => {
            with_current(global, |ctx| {
                let rb = ctx.bound.renderbuffer;
                if let Some(r) = ctx.shared.borrow_mut().renderbuffers.get_mut(rb) {
                    r.internal_format = *internal_format;
                    r.width = *width;
                    r.height = *height;
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::GenFramebuffers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.framebuffers.add(id, Framebuffer::new(id));
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteFramebuffers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.framebuffers.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BindFramebuffer { target, framebuffer } => {
            with_current(global, |ctx| match target {
                FramebufferTarget::Draw => ctx.bound.draw_framebuffer = *framebuffer,
                FramebufferTarget::Read => ctx.bound.read_framebuffer = *framebuffer,
                FramebufferTarget::DrawAndRead => {
                    ctx.bound.draw_framebuffer = *framebuffer;
                    ctx.bound.read_framebuffer = *framebuffer;
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::FramebufferTexture2D { target, attachment, texture, level, .. } => {
            with_current(global, |ctx| {
                let fb_id = framebuffer_target_id(ctx, *target);
                if let Some(fb) = ctx.objects.framebuffers.get_mut(fb_id) {
                    let slot = attachment_slot(fb, *attachment);
                    slot.kind = crate::state::objects::AttachmentKind::Texture;
                    slot.texture = *texture;
                    slot.texture_level = *level;
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::FramebufferRenderbuffer { target, attachment, renderbuffer } => {
            with_current(global, |ctx| {
                let fb_id = framebuffer_target_id(ctx, *target);
                if let Some(fb) = ctx.objects.framebuffers.get_mut(fb_id) {
                    let slot = attachment_slot(fb, *attachment);
                    slot.kind = crate::state::objects::AttachmentKind::Renderbuffer;
                    slot.renderbuffer = *renderbuffer;
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BlitFramebuffer { .. }
        | GlCommand::ReadBuffer(_)
        | GlCommand::ReadPixels { .. }
        | GlCommand::InvalidateFramebuffer { .. } => {
            forward(&mut builder, cmd);
        }

        // --- shaders / programs ------------------------------------------
        GlCommand::CreateShader { shader, stage } => {
            with_current(global, |ctx| {
                ctx.shared.borrow_mut().shaders.add(*shader, (*stage, String::new()));
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::ShaderSource { shader, source } => {
            with_current(global, |ctx| {
                if let Some(s) = ctx.shared.borrow_mut().shaders.get_mut(*shader) {
                    s.1 = source.clone();
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::CompileShader(_) => forward(&mut builder, cmd),
        GlCommand::DeleteShader(id) => {
            with_current(global, |ctx| {
                ctx.shared.borrow_mut().shaders.remove(*id);
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::CreateProgram(id) => {
            with_current(global, |ctx| {
                ctx.shared.borrow_mut().programs.add(*id, Program { id: *id, ..Default::default() });
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::AttachShader { .. } => forward(&mut builder, cmd),
        GlCommand::LinkProgram(id) | GlCommand::ProgramBinary { program: id, .. } => {
            with_current(global, |ctx| {
                if let Some(p) = ctx.shared.borrow_mut().programs.get_mut(*id) {
                    p.link_status = true;
                    if let Some(info) = cmd.program_info() {
                        p.active_attributes = info
                            .active_attributes
                            .iter()
                            .map(|a| (a.name.clone(), a.location))
                            .collect();
                        p.active_uniform_blocks = info.active_uniform_blocks.clone();
                    }
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteProgram(id) => {
            with_current(global, |ctx| {
                ctx.shared.borrow_mut().programs.remove(*id);
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::UseProgram(id) => {
            with_current(global, |ctx| ctx.bound.program = *id)?;
            forward(&mut builder, cmd);
        }
        GlCommand::BindAttribLocation { .. }
        | GlCommand::GetActiveUniform { .. }
        | GlCommand::GetUniformLocation { .. }
        | GlCommand::GetActiveUniformBlockName { .. }
        | GlCommand::GetActiveUniformBlockiv { .. }
        | GlCommand::GetUniformBlockIndex { .. }
        | GlCommand::UniformBlockBinding { .. } => {
            forward(&mut builder, cmd);
        }

        // --- misc objects --------------------------------------------------
        GlCommand::GenSamplers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().samplers.add(id, ());
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteSamplers(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.shared.borrow_mut().samplers.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::GenQueries(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.queries.add(id, ());
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteQueries(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.queries.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::GenTransformFeedbacks(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.transform_feedbacks.add(id, ());
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteTransformFeedbacks(ids) => {
            with_current(global, |ctx| {
                for &id in ids {
                    ctx.objects.transform_feedbacks.remove(id);
                }
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::FenceSync(id) => {
            with_current(global, |ctx| {
                ctx.shared.borrow_mut().syncs.add(*id, ());
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::DeleteSync(id) => {
            with_current(global, |ctx| {
                ctx.shared.borrow_mut().syncs.remove(*id);
            })?;
            forward(&mut builder, cmd);
        }

        // --- misc state ------------------------------------------------
        GlCommand::Enable(cap) => {
            with_current(global, |ctx| {
                ctx.enabled.insert(*cap);
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::Disable(cap) => {
            with_current(global, |ctx| {
                ctx.enabled.remove(cap);
            })?;
            forward(&mut builder, cmd);
        }
        GlCommand::BlendFunc { .. }
        | GlCommand::Viewport { .. }
        | GlCommand::Scissor { .. }
        | GlCommand::Clear(_)
        | GlCommand::PixelStorei { .. }
        | GlCommand::PolygonMode { .. } => {
            forward(&mut builder, cmd);
        }
        GlCommand::ActiveTexture(unit) => {
            with_current(global, |ctx| ctx.bound.texture_unit = *unit)?;
            forward(&mut builder, cmd);
        }

        GlCommand::Other { .. } => forward(&mut builder, cmd),
    }

    Ok(())
}

fn with_current(global: &mut GlobalState, f: impl FnOnce(&mut crate::state::Context)) -> Result<()> {
    let ctx_id = global
        .gles
        .current_context
        .ok_or_else(|| Error::Infrastructure("mutate dispatched with no current context".into()))?;
    let ctx = global
        .gles
        .context_mut(ctx_id)
        .ok_or_else(|| Error::Infrastructure(format!("dangling current context {:?}", ctx_id)))?;
    f(ctx);
    Ok(())
}

fn bind_buffer_target(ctx: &mut crate::state::Context, target: BufferTarget, buffer: crate::ids::BufferId) {
    match target {
        BufferTarget::Array => ctx.bound.array_buffer = buffer,
        BufferTarget::ElementArray => ctx.bound.element_array_buffer = buffer,
        BufferTarget::PixelUnpack => ctx.bound.pixel_unpack_buffer = buffer,
        BufferTarget::PixelPack => ctx.bound.pixel_pack_buffer = buffer,
        BufferTarget::CopyRead => ctx.bound.copy_read_buffer = buffer,
        BufferTarget::CopyWrite => ctx.bound.copy_write_buffer = buffer,
        BufferTarget::Uniform | BufferTarget::TransformFeedback => {}
    }
}

fn bound_buffer(ctx: &crate::state::Context, target: BufferTarget) -> crate::ids::BufferId {
    match target {
        BufferTarget::Array => ctx.bound.array_buffer,
        BufferTarget::ElementArray => ctx.bound.element_array_buffer,
        BufferTarget::PixelUnpack => ctx.bound.pixel_unpack_buffer,
        BufferTarget::PixelPack => ctx.bound.pixel_pack_buffer,
        BufferTarget::CopyRead => ctx.bound.copy_read_buffer,
        BufferTarget::CopyWrite => ctx.bound.copy_write_buffer,
        BufferTarget::Uniform | BufferTarget::TransformFeedback => crate::ids::BufferId::NULL,
    }
}

fn bound_texture(ctx: &crate::state::Context) -> crate::ids::TextureId {
    let unit = ctx.bound.texture_unit as usize;
    ctx.bound.texture_2d.get(unit).copied().unwrap_or_default()
}

fn framebuffer_target_id(ctx: &crate::state::Context, target: FramebufferTarget) -> crate::ids::FramebufferId {
    match target {
        FramebufferTarget::Draw | FramebufferTarget::DrawAndRead => ctx.bound.draw_framebuffer,
        FramebufferTarget::Read => ctx.bound.read_framebuffer,
    }
}

fn attachment_slot(
    fb: &mut Framebuffer,
    attachment: crate::command::catalog::Attachment,
) -> &mut FramebufferAttachment {
    use crate::command::catalog::Attachment;
    match attachment {
        Attachment::Color(i) => &mut fb.color_attachments[i as usize % fb.color_attachments.len()],
        Attachment::Depth => &mut fb.depth_attachment,
        Attachment::Stencil => &mut fb.stencil_attachment,
        Attachment::DepthStencil => &mut fb.depth_attachment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Cmd, Extra, GlesVersion, StaticContextState};
    use crate::ids::{ContextId, ThreadId};
    use crate::memory::MemoryModel;

    fn new_global() -> GlobalState {
        GlobalState::new(MemoryModel::new(8, true))
    }

    #[test]
    fn create_context_then_bind_buffer_requires_current_context() {
        let mut g = new_global();
        let thread = ThreadId(0);
        let id = CmdId::real(0);
        let cmd = Cmd::new(thread, GlCommand::CreateContext {
            ws: WindowSystem::Egl,
            context: ContextId(1),
            share: None,
        })
        .with_extra(Extra::StaticContextState(StaticContextState {
            version: GlesVersion { major: 3, minor: 0 },
        }));
        mutate(&mut g, id, &cmd, None).unwrap();

        let make_current = Cmd::new(thread, GlCommand::MakeCurrent {
            ws: WindowSystem::Egl,
            context: Some(ContextId(1)),
            surface: Some(1),
        });
        mutate(&mut g, CmdId::real(1), &make_current, None).unwrap();

        let gen = Cmd::new(thread, GlCommand::GenBuffers(vec![crate::ids::BufferId(1)]));
        mutate(&mut g, CmdId::real(2), &gen, None).unwrap();

        let ctx = g.gles.current().unwrap();
        assert!(ctx.shared.borrow().buffers.contains(crate::ids::BufferId(1)));
    }

    #[test]
    fn gl_call_with_no_context_is_rejected() {
        let mut g = new_global();
        let cmd = Cmd::new(ThreadId(0), GlCommand::GenBuffers(vec![crate::ids::BufferId(1)]));
        let err = mutate(&mut g, CmdId::real(0), &cmd, None).unwrap_err();
        assert!(matches!(err, Error::NoContextBound(_)));
    }
}
