//! Uniform-buffer offset alignment (spec §4.5.2).
//!
//! Target devices advertise a minimum `UNIFORM_BUFFER_OFFSET_ALIGNMENT`.
//! `glBindBufferRange(UNIFORM_BUFFER, ...)` calls whose offset isn't a
//! multiple of it get redirected through a scratch copy so the replayed
//! binding is always aligned.

use crate::auxil::FastHashMap;
use crate::command::catalog::{BufferTarget, GlCommand};
use crate::command::Cmd;
use crate::error::Result;
use crate::ids::{BufferId, CmdId, ContextId};
use crate::transform::{Transformer, Writer};

const GL_DYNAMIC_COPY: u32 = 0x88_2A;

#[derive(Clone, Copy, Debug)]
struct AlignedAlias {
    scratch: BufferId,
    index: u32,
    offset: u64,
    size: u64,
}

#[derive(Default)]
pub struct UboAlignCompat {
    /// `(context, index) -> scratch buffer` (spec §4.5.2 step 1).
    scratch_by_index: FastHashMap<(ContextId, u32), BufferId>,
    scratch_capacity: FastHashMap<BufferId, u64>,
    /// Original buffer id -> every scratch alias currently bound from it.
    aliases: FastHashMap<BufferId, Vec<AlignedAlias>>,
}

impl UboAlignCompat {
    pub fn new() -> Self {
        Self::default()
    }

    fn alignment(out: &mut Writer<'_>) -> u32 {
        out.state()
            .gles
            .current()
            .map(|c| c.info.constants.uniform_buffer_offset_alignment)
            .unwrap_or(256)
    }

    fn scratch_for(&mut self, out: &mut Writer<'_>, ctx: ContextId, thread: crate::ids::ThreadId, index: u32, seq: &mut u32, id: CmdId) -> Result<BufferId> {
        if let Some(&s) = self.scratch_by_index.get(&(ctx, index)) {
            return Ok(s);
        }
        let s = BufferId(out.state().alloc_scratch_id());
        out.mutate_and_write(id.derive(next(seq)), Cmd::new(thread, GlCommand::GenBuffers(vec![s])))?;
        self.scratch_by_index.insert((ctx, index), s);
        self.scratch_capacity.insert(s, 0);
        Ok(s)
    }

    /// Emits the full realign sequence (spec §4.5.2 step 2) binding
    /// `scratch` as the replacement for `original` at `(target, index,
    /// offset, size)`.
    fn emit_realign(
        &mut self,
        out: &mut Writer<'_>,
        thread: crate::ids::ThreadId,
        seq: &mut u32,
        id: CmdId,
        target: BufferTarget,
        index: u32,
        original: BufferId,
        scratch: BufferId,
        offset: u64,
        size: u64,
    ) -> Result<()> {
        let prev_copy_write = out.state().gles.current().map(|c| c.bound.copy_write_buffer).unwrap_or_default();

        out.mutate_and_write(
            id.derive(next(seq)),
            Cmd::new(thread, GlCommand::BindBuffer { target: BufferTarget::CopyWrite, buffer: scratch }),
        )?;
        if self.scratch_capacity.get(&scratch).copied().unwrap_or(0) < size {
            out.mutate_and_write(
                id.derive(next(seq)),
                Cmd::new(thread, GlCommand::BufferData {
                    target: BufferTarget::CopyWrite,
                    size,
                    data: None,
                    usage: GL_DYNAMIC_COPY,
                }),
            )?;
            self.scratch_capacity.insert(scratch, size);
        }
        out.mutate_and_write(id.derive(next(seq)), Cmd::new(thread, GlCommand::BindBuffer { target, buffer: original }))?;
        out.mutate_and_write(
            id.derive(next(seq)),
            Cmd::new(thread, GlCommand::CopyBufferSubData {
                read_target: target,
                write_target: BufferTarget::CopyWrite,
                read_offset: offset,
                write_offset: 0,
                size,
            }),
        )?;
        out.mutate_and_write(
            id.derive(next(seq)),
            Cmd::new(thread, GlCommand::BindBufferRange { target, index, buffer: scratch, offset: 0, size }),
        )?;
        out.mutate_and_write(
            id.derive(next(seq)),
            Cmd::new(thread, GlCommand::BindBuffer { target: BufferTarget::CopyWrite, buffer: prev_copy_write }),
        )?;
        Ok(())
    }

    fn bound_buffer_for_modify(out: &mut Writer<'_>, target: BufferTarget) -> Option<BufferId> {
        let ctx = out.state().gles.current()?;
        Some(match target {
            BufferTarget::Array => ctx.bound.array_buffer,
            BufferTarget::ElementArray => ctx.bound.element_array_buffer,
            BufferTarget::PixelUnpack => ctx.bound.pixel_unpack_buffer,
            BufferTarget::PixelPack => ctx.bound.pixel_pack_buffer,
            BufferTarget::CopyRead => ctx.bound.copy_read_buffer,
            BufferTarget::CopyWrite => ctx.bound.copy_write_buffer,
            BufferTarget::Uniform | BufferTarget::TransformFeedback => return None,
        })
    }
}

fn next(seq: &mut u32) -> u32 {
    *seq += 1;
    *seq
}

impl Transformer for UboAlignCompat {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        match cmd.kind {
            GlCommand::BindBufferRange {
                target: BufferTarget::Uniform,
                index,
                buffer,
                offset,
                size,
            } => {
                let alignment = Self::alignment(out) as u64;
                if offset % alignment == 0 {
                    return out.mutate_and_write(id, cmd);
                }
                let ctx_id = match out.state().gles.current_context {
                    Some(c) => c,
                    None => return out.mutate_and_write(id, cmd),
                };
                let thread = cmd.thread;
                let mut seq = 0u32;
                let scratch = self.scratch_for(out, ctx_id, thread, index, &mut seq, id)?;
                self.emit_realign(out, thread, &mut seq, id, BufferTarget::Uniform, index, buffer, scratch, offset, size)?;
                self.aliases
                    .entry(buffer)
                    .or_default()
                    .push(AlignedAlias { scratch, index, offset, size });
                Ok(())
            }
            GlCommand::BufferData { target, .. } | GlCommand::BufferSubData { target, .. } => {
                let bound = Self::bound_buffer_for_modify(out, target);
                out.mutate_and_write(id, cmd.clone())?;
                if let Some(original) = bound {
                    if let Some(aliases) = self.aliases.get(&original).cloned() {
                        let thread = cmd.thread;
                        let mut seq = 0u32;
                        for alias in aliases {
                            self.emit_realign(
                                out,
                                thread,
                                &mut seq,
                                id,
                                BufferTarget::Uniform,
                                alias.index,
                                original,
                                alias.scratch,
                                alias.offset,
                                alias.size,
                            )?;
                        }
                    }
                }
                Ok(())
            }
            _ => out.mutate_and_write(id, cmd),
        }
    }
}
