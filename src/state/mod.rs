//! Typed GLES state: contexts, current-context-per-thread, window-system
//! context registries, shared-object groups (spec §3 `GLES State`).

pub mod context;
pub mod objects;

pub use context::Context;

use crate::auxil::FastHashMap;
use crate::command::catalog::WindowSystem;
use crate::ids::{ContextId, ThreadId};
use objects::SharedObjects;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
pub struct GlesState {
    /// Every context that has been created, keyed by its stable id.
    contexts: FastHashMap<ContextId, Context>,
    /// Which context is current on each logical thread (spec
    /// `Contexts: thread -> Context`).
    current_by_thread: FastHashMap<ThreadId, ContextId>,
    /// Which window-system registry each created context belongs to. A
    /// context appears in at most one (spec §3 invariant).
    registry_of: FastHashMap<ContextId, WindowSystem>,
    next_context_id: u32,
    /// The context current for the command presently being mutated, set by
    /// `pre_mutate` (spec §4.2).
    pub current_context: Option<ContextId>,
}

impl GlesState {
    pub fn new() -> Self {
        Self {
            next_context_id: 1,
            ..Default::default()
        }
    }

    pub fn alloc_context_id(&mut self) -> ContextId {
        let id = ContextId(self.next_context_id);
        self.next_context_id += 1;
        id
    }

    pub fn create_context(
        &mut self,
        ws: WindowSystem,
        id: ContextId,
        share: Option<ContextId>,
    ) {
        let shared = match share.and_then(|s| self.contexts.get(&s)) {
            Some(other) => other.shared.clone(),
            None => Rc::new(RefCell::new(SharedObjects::default())),
        };
        let mut ctx = Context::new(id, shared);
        ctx.info.initialized = true;
        self.contexts.insert(id, ctx);
        self.registry_of.insert(id, ws);
    }

    pub fn registry_of(&self, id: ContextId) -> Option<WindowSystem> {
        self.registry_of.get(&id).copied()
    }

    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(&id)
    }

    pub fn context_mut(&mut self, id: ContextId) -> Option<&mut Context> {
        self.contexts.get_mut(&id)
    }

    pub fn contexts_iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    pub fn contexts_iter_mut(&mut self) -> impl Iterator<Item = &mut Context> {
        self.contexts.values_mut()
    }

    pub fn remove_context(&mut self, id: ContextId) -> Option<Context> {
        self.registry_of.remove(&id);
        self.current_by_thread.retain(|_, c| *c != id);
        self.contexts.remove(&id)
    }

    /// `*MakeCurrent`: bind (or unbind, with `context = None`) a context on
    /// a thread.
    pub fn make_current(&mut self, thread: ThreadId, context: Option<ContextId>) {
        match context {
            Some(c) => {
                self.current_by_thread.insert(thread, c);
            }
            None => {
                self.current_by_thread.remove(&thread);
            }
        }
    }

    pub fn current_for_thread(&self, thread: ThreadId) -> Option<ContextId> {
        self.current_by_thread.get(&thread).copied()
    }

    /// Sets `current_context` from the thread of the command about to be
    /// mutated (spec §4.2 `pre_mutate` step 1).
    pub fn refresh_current_context(&mut self, thread: ThreadId) {
        self.current_context = self.current_for_thread(thread);
    }

    pub fn current(&self) -> Option<&Context> {
        self.current_context.and_then(|id| self.contexts.get(&id))
    }

    pub fn current_mut(&mut self) -> Option<&mut Context> {
        let id = self.current_context?;
        self.contexts.get_mut(&id)
    }

    pub fn threads_with_current(&self) -> Vec<ThreadId> {
        self.current_by_thread.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_appears_in_one_registry() {
        let mut s = GlesState::new();
        let id = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, id, None);
        assert_eq!(s.registry_of(id), Some(WindowSystem::Egl));
    }

    #[test]
    fn sharing_contexts_share_object_tables() {
        let mut s = GlesState::new();
        let a = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, a, None);
        let b = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, b, Some(a));
        let same_group = Rc::ptr_eq(&s.context(a).unwrap().shared, &s.context(b).unwrap().shared);
        assert!(same_group);
    }

    #[test]
    fn make_current_tracks_per_thread() {
        let mut s = GlesState::new();
        let a = s.alloc_context_id();
        s.create_context(WindowSystem::Egl, a, None);
        s.make_current(ThreadId(1), Some(a));
        assert_eq!(s.current_for_thread(ThreadId(1)), Some(a));
        s.make_current(ThreadId(1), None);
        assert_eq!(s.current_for_thread(ThreadId(1)), None);
    }
}
