//! The opaque sink the transform chain emits into (spec §6 "Builder sink").
//!
//! The core never inspects the builder's internal format; it only calls the
//! operations this module names. A real deployment wires this to the replay
//! virtual machine's instruction encoder. Tests use [`RecordingBuilder`].

use crate::command::Cmd;
use crate::ids::ContextId;
use crate::memory::PoolId;

/// Where a pointer-typed command argument resolves to at replay time (spec
/// §4.3): either a raw address in the replay engine's own space, or an
/// instruction to materialize captured observation bytes first.
#[derive(Clone, Debug)]
pub enum ReplayPointer {
    Absolute(u64),
    Observed { pool: PoolId, addr: u64, len: u64 },
}

pub type PostCallback = Box<dyn FnOnce(&[u8]) + Send>;

/// Instructions beyond plain GL calls that the mutator or a transform may
/// need to emit (spec §4.2, §4.6, §4.8).
#[derive(Clone, Debug)]
pub enum ReplayOp {
    CreateRenderer(ContextId),
    BindRenderer(ContextId),
    UnbindRenderer(ContextId),
    ChangeBackbuffer {
        context: ContextId,
        width: u32,
        height: u32,
        preserve_on_swap: bool,
    },
}

/// The sink a [`crate::transform::Writer`] forwards finished commands and
/// replay-only instructions into.
pub trait Builder {
    /// Emit one GL call equivalent to `cmd` for replay.
    fn call(&mut self, cmd: &Cmd);
    /// Schedule a postback: `len` bytes starting at `addr` in the replay
    /// engine's address space will be delivered to `callback` once
    /// available (spec §4.6 `postColorData`).
    fn post(&mut self, addr: u64, len: u64, callback: PostCallback);
    /// Reserve `len` bytes of replay-side memory, returning their address.
    fn reserve_memory(&mut self, len: u64) -> u64;
    /// Emit a non-GL replay instruction (spec §4.2, §4.8).
    fn replay_op(&mut self, op: ReplayOp);
}

/// Test/inspection double: records every call and op in order instead of
/// handing them to a real replay VM.
#[derive(Default)]
pub struct RecordingBuilder {
    pub calls: Vec<Cmd>,
    pub ops: Vec<ReplayOp>,
    pub posts: Vec<(u64, u64)>,
    next_reserved: u64,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self {
            next_reserved: 1,
            ..Default::default()
        }
    }
}

impl Builder for RecordingBuilder {
    fn call(&mut self, cmd: &Cmd) {
        self.calls.push(cmd.clone());
    }

    fn post(&mut self, addr: u64, len: u64, callback: PostCallback) {
        self.posts.push((addr, len));
        // No bytes are actually available in the recording double; callers
        // that need the delivered value should inspect `posts` instead.
        drop(callback);
    }

    fn reserve_memory(&mut self, len: u64) -> u64 {
        let addr = self.next_reserved;
        self.next_reserved += len.max(1);
        addr
    }

    fn replay_op(&mut self, op: ReplayOp) {
        self.ops.push(op);
    }
}
