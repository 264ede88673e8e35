//! The dependency graph the back-propagation pass walks (spec §3 "Behavior",
//! §4.4): one [`Behavior`] per command (or sub-command) records which state
//! addresses it reads, writes, or read-modify-writes.

use crate::auxil::{FastHashMap, FastHashSet};
use crate::ids::SubCmdIdx;
use crate::transform::dce::liveness_tree::{LivenessTree, StateAddr};

/// Index into [`Footprint::machines`], naming which [`Machine`] interprets a
/// behavior's addresses.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct MachineId(pub usize);

/// One command's (or sub-command's) observed effect on state, in the address
/// space its [`Machine`] defines.
#[derive(Clone, Debug, Default)]
pub struct Behavior {
    pub owner: SubCmdIdx,
    pub reads: FastHashSet<StateAddr>,
    pub writes: FastHashSet<StateAddr>,
    /// Addresses both read and written by this behavior (e.g. counters,
    /// blend accumulation): a later consumer keeps the whole chain alive,
    /// unlike a plain write which fully overrides its predecessors.
    pub modifies: FastHashSet<StateAddr>,
    /// Set when the owning command was aborted at capture time (spec
    /// `CmdAborted`); such behaviors are skipped during back-propagation.
    pub aborted: bool,
    /// Forces this behavior alive regardless of what consumes it, e.g. a
    /// command with an externally visible side effect.
    pub keep_alive: bool,
    pub machine: MachineId,
}

impl Behavior {
    pub fn new(owner: SubCmdIdx, machine: MachineId) -> Self {
        Behavior { owner, machine, ..Default::default() }
    }
}

/// The data a [`Machine`] operates on: the recorded behaviors and the
/// liveness tree tracking which addresses are currently needed. Machines are
/// kept separate (see `dce::mod::DceEngine`) so this can be borrowed
/// immutably and mutably without aliasing a `Vec<Box<dyn Machine>>`.
#[derive(Default)]
pub struct Footprint {
    pub behaviors: Vec<Behavior>,
    pub first_behavior: FastHashMap<SubCmdIdx, usize>,
    pub tree: LivenessTree,
}

impl Footprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, behavior: Behavior) -> usize {
        let bi = self.behaviors.len();
        self.first_behavior.insert(behavior.owner.clone(), bi);
        self.behaviors.push(behavior);
        bi
    }
}

/// Interprets one address space's reads/writes for the back-propagation pass
/// (spec §4.4a: a memory machine for buffer/texture contents, a GL-state
/// machine for everything else).
pub trait Machine {
    /// Is the state this behavior writes currently needed?
    fn is_alive(&self, bi: usize, footprint: &Footprint) -> bool;

    /// This behavior is alive: record that its writes are now satisfied and
    /// its reads are newly needed. Returns additional behavior indices that
    /// must be forced alive as a result (usually just `bi`).
    fn record_behavior_effects(&mut self, bi: usize, footprint: &mut Footprint) -> Vec<usize>;

    /// A request names this behavior directly (it produces an externally
    /// observed result, e.g. a framebuffer read): mark its writes needed.
    fn framebuffer_request(&mut self, bi: usize, footprint: &mut Footprint);

    /// Reset between independent replay runs.
    fn clear(&mut self);
}
