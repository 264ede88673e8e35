//! Process-wide mutable state for one replay invocation (spec §3
//! `GlobalState`).
//!
//! The teacher crate relies on an OS-backed `GlContext` plus Rust's own
//! allocator for everything else. We have no live driver to lean on, so the
//! arena is explicit: one [`CmdArena`] per replay, everything allocated in
//! it drops together when the replay does (spec §9 "Arena-allocated state").

use crate::command::Cmd;
use crate::ids::SCRATCH_ID_BASE;
use crate::memory::MemoryModel;
use crate::state::GlesState;
use std::cell::Cell;

/// A stable handle into a [`CmdArena`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CmdHandle(usize);

/// Holds every command a transform has cloned or newly constructed during a
/// replay. Using index-based handles instead of borrowed references avoids
/// self-referential lifetimes while keeping the "one lifetime, drop at the
/// end" arena property the source relies on.
#[derive(Default)]
pub struct CmdArena {
    items: Vec<Cmd>,
}

impl CmdArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, cmd: Cmd) -> CmdHandle {
        self.items.push(cmd);
        CmdHandle(self.items.len() - 1)
    }

    pub fn get(&self, handle: CmdHandle) -> &Cmd {
        &self.items[handle.0]
    }

    pub fn get_mut(&mut self, handle: CmdHandle) -> &mut Cmd {
        &mut self.items[handle.0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A message raised by the mutator/transforms for the host to surface to the
/// user (spec §7, e.g. `ErrNoContextBound`).
#[derive(Clone, Debug)]
pub struct Message {
    pub severity: log::Level,
    pub text: String,
}

/// Process-wide state the whole transform chain shares (spec §3
/// `GlobalState`). Owned by the sink [`crate::transform::Writer`].
pub struct GlobalState {
    pub arena: CmdArena,
    pub memory: MemoryModel,
    pub gles: GlesState,
    messages: Vec<Message>,
    next_scratch_buffer_id: Cell<u32>,
}

impl GlobalState {
    pub fn new(memory: MemoryModel) -> Self {
        GlobalState {
            arena: CmdArena::new(),
            memory,
            gles: GlesState::new(),
            messages: Vec::new(),
            next_scratch_buffer_id: Cell::new(SCRATCH_ID_BASE),
        }
    }

    /// Allocate the next compat-layer scratch object id. Ids are drawn from
    /// a disjoint high range and decrement, guaranteeing they never collide
    /// with an id present in the capture (spec §3, invariant 5 in §8).
    pub fn alloc_scratch_id(&self) -> u32 {
        let id = self.next_scratch_buffer_id.get();
        self.next_scratch_buffer_id.set(id - 1);
        id
    }

    pub fn push_message(&mut self, severity: log::Level, text: impl Into<String>) {
        let text = text.into();
        match severity {
            log::Level::Error => log::error!("{}", text),
            log::Level::Warn => log::warn!("{}", text),
            log::Level::Info => log::info!("{}", text),
            log::Level::Debug => log::debug!("{}", text),
            log::Level::Trace => log::trace!("{}", text),
        }
        self.messages.push(Message { severity, text });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_ids_decrement_and_never_collide_with_low_application_ids() {
        let state = GlobalState::new(MemoryModel::new(8, true));
        let a = state.alloc_scratch_id();
        let b = state.alloc_scratch_id();
        assert_eq!(a, SCRATCH_ID_BASE);
        assert_eq!(b, SCRATCH_ID_BASE - 1);
        assert!(a > 0xFFFF);
    }
}
