//! Client-memory vertex arrays → buffer objects (spec §4.5.1).
//!
//! Desktop GL core profiles require vertex (and index) data to live in
//! buffer objects. Attribute pointers that reference client memory are
//! remembered (by the mutator, in `VertexArray::client_vertex_attribs`) but
//! not emitted; this pass materializes them into scratch buffers at each
//! draw call that actually uses them.

use crate::arena::GlobalState;
use crate::auxil::merge_ranges;
use crate::command::catalog::{BufferTarget, GlCommand, IndexType, VertexAttribPointer};
use crate::command::{Cmd, CmdFlags};
use crate::error::{Error, Result};
use crate::externs::IndexLimits;
use crate::ids::{BufferId, CmdId};
use crate::memory::{Pointer, Slice};
use crate::state::objects::MAX_VERTEX_ATTRIBS;
use crate::transform::{Transformer, Writer};

enum IndexSpec {
    None,
    Elements { indices: Pointer, index_type: IndexType, explicit_range: Option<(u32, u32)> },
}

pub struct VertexArrayCompat<L: IndexLimits> {
    index_limits: L,
}

impl<L: IndexLimits> VertexArrayCompat<L> {
    pub fn new(index_limits: L) -> Self {
        VertexArrayCompat { index_limits }
    }

    fn index_bounds(&self, global: &GlobalState, spec: &IndexSpec, count: u32) -> (u64, u64) {
        match spec {
            IndexSpec::None => (0, 0),
            IndexSpec::Elements { indices, index_type, explicit_range } => {
                if let Some((first, end)) = explicit_range {
                    return (*first as u64, (*end - *first) as u64);
                }
                let sizeof = index_type.size_bytes() as u64;
                let bytes = global
                    .memory
                    .read(Slice { base: *indices, count: count as u64, elem_size: sizeof })
                    .unwrap_or_default();
                self.index_limits.index_limits(&bytes, sizeof as u8, global.memory.little_endian)
            }
        }
    }

    /// Emits scratch buffers for every client-memory attribute in the
    /// current VAO whose range the draw touches, then rewrites each
    /// affected `glVertexAttribPointer` to reference the new buffer (spec
    /// §4.5.1).
    fn emit_client_attribs(
        &self,
        out: &mut Writer<'_>,
        id: CmdId,
        seq: &mut u32,
        thread: crate::ids::ThreadId,
        first: u64,
        count: u64,
    ) -> Result<()> {
        let ctx_id = out
            .state()
            .gles
            .current_context
            .ok_or_else(|| Error::Infrastructure("no current context".into()))?;

        let client: Vec<(u32, VertexAttribPointer)> = {
            let ctx = out.state().gles.context(ctx_id).unwrap();
            let vao = ctx.bound.vertex_array;
            match ctx.objects.vertex_arrays.get(vao) {
                Some(va) => (0..MAX_VERTEX_ATTRIBS)
                    .filter(|&i| va.attribs[i].enabled && va.client_vertex_attribs.contains_key(&(i as u32)))
                    .map(|i| (i as u32, va.client_vertex_attribs[&(i as u32)]))
                    .collect(),
                None => Vec::new(),
            }
        };
        if client.is_empty() {
            return Ok(());
        }

        let mut per_attrib_range = Vec::new();
        for (index, p) in &client {
            let elem_size = p.size * p.attrib_type.size_bytes();
            let stride = if p.stride == 0 { elem_size } else { p.stride };
            let size = (first + count.max(1) - 1) * stride as u64 + elem_size as u64;
            per_attrib_range.push((*index, *p, p.pointer.addr, p.pointer.addr + size));
        }
        let merge_input: Vec<(u64, u64)> = per_attrib_range.iter().map(|(_, _, s, e)| (*s, *e)).collect();
        let merged = merge_ranges(merge_input);
        let pool = client[0].1.pointer.pool;

        for (range_start, range_end) in &merged {
            let len = range_end - range_start;
            let scratch_id = BufferId(out.state().alloc_scratch_id());

            out.mutate_and_write(id.derive(next(seq)), Cmd::new(thread, GlCommand::GenBuffers(vec![scratch_id])))?;
            out.mutate_and_write(
                id.derive(next(seq)),
                Cmd::new(thread, GlCommand::BindBuffer { target: BufferTarget::Array, buffer: scratch_id }),
            )?;
            out.mutate_and_write(
                id.derive(next(seq)),
                Cmd::new(thread, GlCommand::BufferData {
                    target: BufferTarget::Array,
                    size: len,
                    data: Some(Pointer { addr: *range_start, pool }),
                    usage: 0,
                }),
            )?;

            for (_index, p, start, end) in &per_attrib_range {
                if *start < *range_start || *end > *range_end {
                    continue;
                }
                let mut rewritten = *p;
                rewritten.pointer = Pointer { addr: *start - *range_start, pool };
                out.mutate_and_write(id.derive(next(seq)), Cmd::new(thread, GlCommand::VertexAttribPointerCmd(rewritten)))?;
            }
        }
        Ok(())
    }

    fn handle_draw(
        &mut self,
        id: CmdId,
        cmd: Cmd,
        out: &mut Writer<'_>,
        vertex_first: u64,
        vertex_count: u64,
        index_spec: IndexSpec,
    ) -> Result<()> {
        let thread = cmd.thread;
        let mut seq = 0u32;
        self.emit_client_attribs(out, id, &mut seq, thread, vertex_first, vertex_count)?;

        let rewritten = match index_spec {
            IndexSpec::Elements { indices, index_type, .. } => {
                let element_buffer_bound = out
                    .state()
                    .gles
                    .current()
                    .map(|c| !c.bound.element_array_buffer.is_null())
                    .unwrap_or(true);
                if element_buffer_bound || indices.is_null() {
                    cmd
                } else {
                    let len = vertex_count.max(1) * index_type.size_bytes() as u64;
                    let scratch_id = BufferId(out.state().alloc_scratch_id());
                    out.mutate_and_write(id.derive(next(&mut seq)), Cmd::new(thread, GlCommand::GenBuffers(vec![scratch_id])))?;
                    out.mutate_and_write(
                        id.derive(next(&mut seq)),
                        Cmd::new(thread, GlCommand::BindBuffer { target: BufferTarget::ElementArray, buffer: scratch_id }),
                    )?;
                    out.mutate_and_write(
                        id.derive(next(&mut seq)),
                        Cmd::new(thread, GlCommand::BufferData {
                            target: BufferTarget::ElementArray,
                            size: len,
                            data: Some(indices),
                            usage: 0,
                        }),
                    )?;
                    clone_with_null_indices(&cmd)
                }
            }
            IndexSpec::None => cmd,
        };

        out.mutate_and_write(id, rewritten)
    }
}

fn next(seq: &mut u32) -> u32 {
    *seq += 1;
    *seq
}

fn clone_with_null_indices(cmd: &Cmd) -> Cmd {
    let mut copy = cmd.clone();
    match &mut copy.kind {
        GlCommand::DrawElements { indices, .. }
        | GlCommand::DrawRangeElements { indices, .. }
        | GlCommand::DrawElementsInstanced { indices, .. } => {
            *indices = Pointer::NULL;
        }
        _ => {}
    }
    copy
}

fn has_disallowed_divisor(out: &mut Writer<'_>) -> bool {
    out.state()
        .gles
        .current()
        .and_then(|ctx| ctx.objects.vertex_arrays.get(ctx.bound.vertex_array))
        .map(|va| {
            (0..MAX_VERTEX_ATTRIBS).any(|i| {
                va.attribs[i].enabled
                    && va.client_vertex_attribs.contains_key(&(i as u32))
                    && va.bindings[i].divisor != 0
            })
        })
        .unwrap_or(false)
}

impl<L: IndexLimits> Transformer for VertexArrayCompat<L> {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        match cmd.kind.clone() {
            GlCommand::DrawArrays { first, count, .. } => {
                self.handle_draw(id, cmd, out, first as u64, count as u64, IndexSpec::None)
            }
            GlCommand::DrawElements { count, index_type, indices, .. } => {
                let spec = IndexSpec::Elements { indices, index_type, explicit_range: None };
                let (first, c) = self.index_bounds(out.state(), &spec, count);
                self.handle_draw(id, cmd, out, first, c, spec)
            }
            GlCommand::DrawRangeElements { start, end, index_type, indices, .. } => {
                let spec = IndexSpec::Elements { indices, index_type, explicit_range: Some((start, end)) };
                self.handle_draw(id, cmd, out, start as u64, (end - start) as u64, spec)
            }
            GlCommand::DrawArraysInstanced { first, count, .. } => {
                if has_disallowed_divisor(out) {
                    return Err(Error::CmdAborted(id, "client-memory attribute with nonzero instance divisor".into()));
                }
                self.handle_draw(id, cmd, out, first as u64, count as u64, IndexSpec::None)
            }
            GlCommand::DrawElementsInstanced { count, index_type, indices, .. } => {
                if has_disallowed_divisor(out) {
                    return Err(Error::CmdAborted(id, "client-memory attribute with nonzero instance divisor".into()));
                }
                let spec = IndexSpec::Elements { indices, index_type, explicit_range: None };
                let (first, c) = self.index_bounds(out.state(), &spec, count);
                self.handle_draw(id, cmd, out, first, c, spec)
            }
            GlCommand::DrawArraysIndirect { .. } | GlCommand::DrawElementsIndirect { .. } => {
                Err(Error::Unimplemented(cmd.name()))
            }
            _ if cmd.flags.contains(CmdFlags::DRAW) => out.mutate_and_write(id, cmd),
            _ => out.mutate_and_write(id, cmd),
        }
    }
}
