//! Typed object identifiers and command identifiers (spec §3, §4.3).
//!
//! Typed ids are nominally distinct newtypes so remapping can dispatch on the
//! id's type the way the source's open-world virtual dispatch did (spec §9
//! "Variant objects for IDs").

use std::fmt;

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            /// Id `0` is always the default/unbound sentinel and is never
            /// remapped (spec §3 invariants).
            pub const NULL: $name = $name(0);

            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                $name(v)
            }
        }
    };
}

typed_id!(BufferId);
typed_id!(TextureId);
typed_id!(FramebufferId);
typed_id!(RenderbufferId);
typed_id!(ShaderId);
typed_id!(ProgramId);
typed_id!(VertexArrayId);
typed_id!(SamplerId);
typed_id!(QueryId);
typed_id!(TransformFeedbackId);
typed_id!(SyncId);
typed_id!(PipelineId);
typed_id!(ContextId);

/// A location within a program's active uniforms; carries the owning program
/// because locations are only unique per-program (spec §4.3).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub location: i32,
}

/// A uniform block index within a program; same program-scoping as above.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct UniformBlockIndex {
    pub program: ProgramId,
    pub index: u32,
}

/// Virtual renderbuffer ids at or above this value model window-system
/// backbuffer attachments; they are never passed to `glDeleteRenderbuffers`
/// (spec §3 invariants).
pub const VIRTUAL_RENDERBUFFER_BASE: u32 = 0xF000_0000;

/// Compatibility-layer scratch buffer ids begin here and count down, so they
/// never collide with application ids, which start low (spec §3, §5).
pub const SCRATCH_ID_BASE: u32 = 0xFFFF_0000;

impl RenderbufferId {
    pub fn is_virtual(self) -> bool {
        self.0 >= VIRTUAL_RENDERBUFFER_BASE
    }
}

/// Thread identity as carried by the capture: a logical datum that selects
/// the current GL context, not a real OS thread (spec §5).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ThreadId(pub u32);

/// A command identifier: a real, monotonically increasing stream position,
/// plus a `seq` that is `0` for the real command itself and `>0` for each
/// transform-injected ("derived") command attached to it, in emission order
/// (spec §3 "Derived ids").
///
/// Ordering is lexicographic on `(real, seq)`, which satisfies the spec's
/// requirements: derived ids never collide with real ids (no other real
/// command can share `real`), relative order among derived commands attached
/// to the same real id is preserved, and `is_derived()` distinguishes them.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct CmdId {
    pub real: u64,
    pub seq: u32,
}

impl CmdId {
    pub fn real(real: u64) -> Self {
        CmdId { real, seq: 0 }
    }

    pub fn is_derived(self) -> bool {
        self.seq != 0
    }

    /// Construct the next derived id attached to this command's real id.
    pub fn derive(self, seq: u32) -> Self {
        CmdId {
            real: self.real,
            seq,
        }
    }
}

/// A variable-length path identifying a command or a nested sub-command
/// (e.g. one GL call recorded inside a replayed command buffer). Spec §3
/// `SubCmdIdx`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct SubCmdIdx(pub Vec<u32>);

impl SubCmdIdx {
    pub fn top(i: u32) -> Self {
        SubCmdIdx(vec![i])
    }

    pub fn child(&self, i: u32) -> Self {
        let mut v = self.0.clone();
        v.push(i);
        SubCmdIdx(v)
    }

    pub fn is_prefix_of(&self, other: &SubCmdIdx) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

/// A trie over `SubCmdIdx` supporting membership and prefix queries (spec
/// §3). Small and specialised rather than a general crate: indices rarely
/// run more than 2-3 levels deep (command -> sub-command-buffer -> GL call).
#[derive(Default, Debug)]
pub struct SubCmdIdxTrie {
    present: bool,
    children: std::collections::BTreeMap<u32, SubCmdIdxTrie>,
}

impl SubCmdIdxTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, idx: &SubCmdIdx) {
        let mut node = self;
        for &i in &idx.0 {
            node = node.children.entry(i).or_default();
        }
        node.present = true;
    }

    pub fn contains(&self, idx: &SubCmdIdx) -> bool {
        let mut node = self;
        for &i in &idx.0 {
            match node.children.get(&i) {
                Some(n) => node = n,
                None => return false,
            }
        }
        node.present
    }

    /// True if any inserted index has `idx` as a prefix (or is `idx` itself).
    pub fn has_prefix_match(&self, idx: &SubCmdIdx) -> bool {
        let mut node = self;
        for &i in &idx.0 {
            match node.children.get(&i) {
                Some(n) => node = n,
                None => return false,
            }
        }
        node.present || !node.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_id_ordering() {
        let a = CmdId::real(5);
        let b = a.derive(1);
        let c = a.derive(2);
        let d = CmdId::real(6);
        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
        assert!(!a.is_derived());
        assert!(b.is_derived());
    }

    #[test]
    fn null_ids_never_remap() {
        assert!(BufferId::NULL.is_null());
        assert!(!BufferId(1).is_null());
    }

    #[test]
    fn trie_membership_and_prefix() {
        let mut trie = SubCmdIdxTrie::new();
        trie.insert(&SubCmdIdx(vec![3, 0, 0, 1]));
        assert!(trie.contains(&SubCmdIdx(vec![3, 0, 0, 1])));
        assert!(!trie.contains(&SubCmdIdx(vec![3, 0, 0])));
        assert!(trie.has_prefix_match(&SubCmdIdx(vec![3, 0])));
        assert!(!trie.has_prefix_match(&SubCmdIdx(vec![3, 1])));
    }

    #[test]
    fn virtual_renderbuffer_threshold() {
        assert!(RenderbufferId(VIRTUAL_RENDERBUFFER_BASE).is_virtual());
        assert!(!RenderbufferId(VIRTUAL_RENDERBUFFER_BASE - 1).is_virtual());
    }
}
