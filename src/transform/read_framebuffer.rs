//! Framebuffer/texture readback (spec §4.6): holds a list of `{at: CmdId,
//! work}` tasks. Each real command drains and runs every task whose target
//! id has already passed before the command is forwarded, so a readback
//! scheduled against an earlier id still observes every state mutation up to
//! (but not including) its target.

use crate::command::catalog::{FramebufferTarget, GlCommand};
use crate::command::Cmd;
use crate::error::{DataUnavailable, Error, Result};
use crate::ids::{CmdId, FramebufferId, ThreadId};
use crate::state::context::Context;
use crate::state::objects::{AttachmentKind, Framebuffer, FramebufferAttachment};
use crate::transform::{Transformer, Writer};

const GL_PACK_ALIGNMENT: u32 = 0x0D05;
const GL_PACK_ROW_LENGTH: u32 = 0x0D02;
const GL_FRONT: u32 = 0x0404;
const GL_COLOR_ATTACHMENT0: u32 = 0x8CE0;
const GL_COLOR_BUFFER_BIT: u32 = 0x4000;
const GL_LINEAR: u32 = 0x2601;
const GL_RGBA8: u32 = 0x8058;
const GL_RGBA: u32 = 0x1908;
const GL_DEPTH_COMPONENT: u32 = 0x1902;
const GL_DEPTH_COMPONENT24: u32 = 0x81A6;
const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_FLOAT: u32 = 0x1406;

/// A readback result (spec §4.6 `postColorData`'s delivered image).
#[derive(Clone, Debug)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub sized_format: u32,
    pub bytes: Vec<u8>,
}

pub type ResultSink = Box<dyn FnOnce(Result<Image>) + Send>;

type Task = Box<dyn FnOnce(&mut Writer<'_>) -> Result<()>>;

struct ScheduledTask {
    at: CmdId,
    task: Task,
}

fn component_size(component_type: u32) -> u32 {
    if component_type == GL_FLOAT {
        4
    } else {
        1
    }
}

fn format_byte_size(format: u32, component_type: u32, width: u32, height: u32) -> u64 {
    let channels: u32 = match format {
        GL_DEPTH_COMPONENT => 1,
        _ => 4,
    };
    u64::from(width) * u64::from(height) * u64::from(channels) * u64::from(component_size(component_type))
}

fn attachment_dims(ctx: &Context, att: &FramebufferAttachment) -> Result<(u32, u32, u32)> {
    match att.kind {
        AttachmentKind::Texture => {
            let tex = ctx
                .shared
                .borrow()
                .textures
                .get(att.texture)
                .and_then(|t| t.levels.get(&att.texture_level))
                .and_then(|layers| layers.get(&0))
                .copied()
                .ok_or(DataUnavailable::FramebufferUnavailable)?;
            Ok((tex.width, tex.height, tex.sized_format))
        }
        AttachmentKind::Renderbuffer => {
            let rb = ctx
                .shared
                .borrow()
                .renderbuffers
                .get(att.renderbuffer)
                .copied()
                .ok_or(DataUnavailable::FramebufferUnavailable)?;
            Ok((rb.width, rb.height, rb.internal_format))
        }
        AttachmentKind::None => Err(DataUnavailable::FramebufferUnavailable.into()),
    }
}

fn resolve_color_source(ctx: &Context, fb: FramebufferId, buffer_index: u32) -> Result<(u32, u32, u32)> {
    if fb.is_null() {
        return Ok((ctx.backbuffer.width, ctx.backbuffer.height, GL_RGBA8));
    }
    let fb_obj: &Framebuffer = ctx.objects.framebuffers.get(fb).ok_or(DataUnavailable::FramebufferUnavailable)?;
    let att = fb_obj
        .color_attachments
        .get(buffer_index as usize)
        .ok_or(DataUnavailable::FramebufferUnavailable)?;
    attachment_dims(ctx, att)
}

fn resolve_depth_source(ctx: &Context, fb: FramebufferId) -> Result<(u32, u32)> {
    if fb.is_null() {
        return Ok((ctx.backbuffer.width, ctx.backbuffer.height));
    }
    let fb_obj: &Framebuffer = ctx.objects.framebuffers.get(fb).ok_or(DataUnavailable::FramebufferUnavailable)?;
    let (w, h, _) = attachment_dims(ctx, &fb_obj.depth_attachment)?;
    Ok((w, h))
}

/// Records the pack-storage state a readback overrides and restores it
/// afterward (spec §4.6 "tweaker").
struct PackStorageTweaker;

impl PackStorageTweaker {
    fn apply(out: &mut Writer<'_>, thread: ThreadId, id: CmdId) -> Result<()> {
        out.mutate_and_write(id.derive(1), Cmd::new(thread, GlCommand::PixelStorei { pname: GL_PACK_ALIGNMENT, value: 1 }))?;
        out.mutate_and_write(id.derive(2), Cmd::new(thread, GlCommand::PixelStorei { pname: GL_PACK_ROW_LENGTH, value: 0 }))
    }

    fn revert(out: &mut Writer<'_>, thread: ThreadId, id: CmdId) -> Result<()> {
        out.mutate_and_write(id.derive(3), Cmd::new(thread, GlCommand::PixelStorei { pname: GL_PACK_ALIGNMENT, value: 4 }))?;
        out.mutate_and_write(id.derive(4), Cmd::new(thread, GlCommand::PixelStorei { pname: GL_PACK_ROW_LENGTH, value: 0 }))
    }
}

fn post_color_data(
    out: &mut Writer<'_>,
    thread: ThreadId,
    id: CmdId,
    width: u32,
    height: u32,
    format: u32,
    component_type: u32,
    sized_format: u32,
    result: ResultSink,
) -> Result<()> {
    PackStorageTweaker::apply(out, thread, id)?;

    let len = format_byte_size(format, component_type, width, height);
    let addr = out.builder().reserve_memory(len);
    out.mutate_and_write(
        id.derive(5),
        Cmd::new(thread, GlCommand::ReadPixels { x: 0, y: 0, width, height, format, component_type }),
    )?;
    out.builder().post(
        addr,
        len,
        Box::new(move |bytes| {
            result(Ok(Image { width, height, sized_format, bytes: bytes.to_vec() }));
        }),
    );

    PackStorageTweaker::revert(out, thread, id)
}

#[derive(Default)]
pub struct ReadFramebufferPass {
    tasks: Vec<ScheduledTask>,
}

impl ReadFramebufferPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn schedule(&mut self, at: CmdId, task: Task) {
        self.tasks.push(ScheduledTask { at, task });
    }

    /// spec §4.6 `color(id, thread, outW, outH, fb, bufferIdx, result)`.
    pub fn request_color(
        &mut self,
        at: CmdId,
        thread: ThreadId,
        out_width: u32,
        out_height: u32,
        fb: FramebufferId,
        buffer_index: u32,
        result: ResultSink,
    ) {
        self.schedule(
            at,
            Box::new(move |out| read_color(out, thread, at, out_width, out_height, fb, buffer_index, result)),
        );
    }

    /// spec §4.6 `depth(id, thread, fb, result)`.
    pub fn request_depth(&mut self, at: CmdId, thread: ThreadId, fb: FramebufferId, result: ResultSink) {
        self.schedule(at, Box::new(move |out| read_depth(out, thread, at, fb, result)));
    }

    fn drain_before(&mut self, id: CmdId, out: &mut Writer<'_>) -> Result<()> {
        let mut ready = Vec::new();
        let mut remaining = Vec::new();
        for t in self.tasks.drain(..) {
            if t.at < id {
                ready.push(t);
            } else {
                remaining.push(t);
            }
        }
        ready.sort_by_key(|t| t.at);
        self.tasks = remaining;
        for t in ready {
            (t.task)(out)?;
        }
        Ok(())
    }
}

fn read_color(
    out: &mut Writer<'_>,
    thread: ThreadId,
    id: CmdId,
    out_width: u32,
    out_height: u32,
    fb: FramebufferId,
    buffer_index: u32,
    result: ResultSink,
) -> Result<()> {
    let ctx_id = out.state().gles.current_for_thread(thread).ok_or(Error::NoContextBound(id))?;
    let ctx = out.state().gles.context(ctx_id).ok_or(Error::NoContextBound(id))?;
    let (in_width, in_height, sized_format) = match resolve_color_source(ctx, fb, buffer_index) {
        Ok(v) => v,
        Err(e) => {
            result(Err(e));
            return Ok(());
        }
    };

    out.mutate_and_write(id.derive(1), Cmd::new(thread, GlCommand::BindFramebuffer { target: FramebufferTarget::Read, framebuffer: fb }))?;
    let read_buffer = if fb.is_null() { GL_FRONT } else { GL_COLOR_ATTACHMENT0 + buffer_index };
    out.mutate_and_write(id.derive(2), Cmd::new(thread, GlCommand::ReadBuffer(read_buffer)))?;

    if (in_width, in_height) == (out_width, out_height) {
        return post_color_data(out, thread, id, out_width, out_height, GL_RGBA, GL_UNSIGNED_BYTE, sized_format, result);
    }

    // Reset the scissor box to the full source rect so a stale capture-time
    // scissor can't clip the blit's source region (spec §8 scenario 6).
    out.mutate_and_write(
        id.derive(3),
        Cmd::new(thread, GlCommand::Scissor { x: 0, y: 0, width: in_width, height: in_height }),
    )?;

    let scratch_rb = out.state().alloc_scratch_id();
    let scratch_fb = out.state().alloc_scratch_id();

    out.mutate_and_write(
        id.derive(10),
        Cmd::new(thread, GlCommand::GenRenderbuffers(vec![crate::ids::RenderbufferId(scratch_rb)])),
    )?;
    out.mutate_and_write(id.derive(11), Cmd::new(thread, GlCommand::BindRenderbuffer(crate::ids::RenderbufferId(scratch_rb))))?;
    out.mutate_and_write(
        id.derive(12),
        Cmd::new(thread, GlCommand::RenderbufferStorage { internal_format: sized_format, width: out_width, height: out_height }),
    )?;
    out.mutate_and_write(
        id.derive(13),
        Cmd::new(thread, GlCommand::GenFramebuffers(vec![crate::ids::FramebufferId(scratch_fb)])),
    )?;
    out.mutate_and_write(
        id.derive(14),
        Cmd::new(thread, GlCommand::BindFramebuffer { target: FramebufferTarget::Draw, framebuffer: crate::ids::FramebufferId(scratch_fb) }),
    )?;
    out.mutate_and_write(
        id.derive(15),
        Cmd::new(
            thread,
            GlCommand::FramebufferRenderbuffer {
                target: FramebufferTarget::Draw,
                attachment: crate::command::catalog::Attachment::Color(0),
                renderbuffer: crate::ids::RenderbufferId(scratch_rb),
            },
        ),
    )?;
    out.mutate_and_write(
        id.derive(16),
        Cmd::new(
            thread,
            GlCommand::BlitFramebuffer {
                src: (0, 0, in_width as i32, in_height as i32),
                dst: (0, 0, out_width as i32, out_height as i32),
                mask: GL_COLOR_BUFFER_BIT,
                filter: GL_LINEAR,
            },
        ),
    )?;
    out.mutate_and_write(
        id.derive(17),
        Cmd::new(thread, GlCommand::BindFramebuffer { target: FramebufferTarget::Read, framebuffer: crate::ids::FramebufferId(scratch_fb) }),
    )?;

    post_color_data(out, thread, id, out_width, out_height, GL_RGBA, GL_UNSIGNED_BYTE, sized_format, result)
}

fn read_depth(out: &mut Writer<'_>, thread: ThreadId, id: CmdId, fb: FramebufferId, result: ResultSink) -> Result<()> {
    let ctx_id = out.state().gles.current_for_thread(thread).ok_or(Error::NoContextBound(id))?;
    let ctx = out.state().gles.context(ctx_id).ok_or(Error::NoContextBound(id))?;
    let (width, height) = match resolve_depth_source(ctx, fb) {
        Ok(v) => v,
        Err(e) => {
            result(Err(e));
            return Ok(());
        }
    };

    out.mutate_and_write(id.derive(1), Cmd::new(thread, GlCommand::BindFramebuffer { target: FramebufferTarget::Read, framebuffer: fb }))?;
    post_color_data(out, thread, id, width, height, GL_DEPTH_COMPONENT, GL_FLOAT, GL_DEPTH_COMPONENT24, result)
}

impl Transformer for ReadFramebufferPass {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        if !id.is_derived() {
            self.drain_before(id, out)?;
        }
        out.mutate_and_write(id, cmd)
    }

    fn flush(&mut self, out: &mut Writer<'_>) -> Result<()> {
        let mut ready: Vec<ScheduledTask> = self.tasks.drain(..).collect();
        ready.sort_by_key(|t| t.at);
        for t in ready {
            (t.task)(out)?;
        }
        Ok(())
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
    use std::sync::{Arc, Mutex};

    fn setup() -> GlobalState {
        let mut global = GlobalState::new(MemoryModel::new(8, true));
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.make_current(ThreadId(0), Some(ContextId(1)));
        global.gles.context_mut(ContextId(1)).unwrap().backbuffer.width = 64;
        global.gles.context_mut(ContextId(1)).unwrap().backbuffer.height = 64;
        global
    }

    #[test]
    fn default_framebuffer_same_size_reads_directly_without_blit() {
        let mut global = setup();
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let delivered: Arc<Mutex<Option<Result<Image>>>> = Arc::new(Mutex::new(None));
        let delivered_clone = delivered.clone();

        let mut pass = ReadFramebufferPass::new();
        pass.request_color(
            CmdId::real(0),
            ThreadId(0),
            64,
            64,
            FramebufferId::NULL,
            0,
            Box::new(move |img| *delivered_clone.lock().unwrap() = Some(img)),
        );

        let mut chain = TransformChain::new(vec![Box::new(pass)]);
        chain.flush(&mut global, &mut builder, &mut sink).unwrap();

        assert!(builder.calls.iter().any(|c| matches!(c.kind, GlCommand::ReadPixels { .. })));
        assert_eq!(builder.posts.len(), 1);
        assert!(delivered.lock().unwrap().is_none(), "RecordingBuilder::post drops its callback without invoking it");
    }

    #[test]
    fn scaled_readback_inserts_a_blit_through_a_scratch_framebuffer() {
        let mut global = setup();
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let mut pass = ReadFramebufferPass::new();
        pass.request_color(CmdId::real(0), ThreadId(0), 32, 32, FramebufferId::NULL, 0, Box::new(|_| {}));

        let mut chain = TransformChain::new(vec![Box::new(pass)]);
        chain.flush(&mut global, &mut builder, &mut sink).unwrap();

        assert!(builder.calls.iter().any(|c| matches!(c.kind, GlCommand::BlitFramebuffer { .. })));
        assert!(builder.calls.iter().any(|c| matches!(c.kind, GlCommand::ReadPixels { .. })));
        // the scissor box is reset to the full 64x64 source rect before the
        // blit, so a stale capture-time scissor can't clip it.
        assert!(builder
            .calls
            .iter()
            .any(|c| matches!(c.kind, GlCommand::Scissor { x: 0, y: 0, width: 64, height: 64 })));
    }
}
