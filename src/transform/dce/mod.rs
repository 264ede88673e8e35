//! Dead-code elimination (spec §4.4): back-propagates liveness from a set of
//! requested [`SubCmdIdx`]s through recorded [`Behavior`]s, in reverse
//! command order, and returns the subset still needed to produce them.

pub mod footprint;
pub mod liveness_tree;
pub mod machines;

use crate::auxil::FastHashSet;
use crate::ids::SubCmdIdx;
use footprint::{Behavior, Footprint, Machine};

/// Owns the recorded [`Footprint`] plus the machines that interpret it.
/// Machines are split out from `Footprint` itself (rather than embedded) so
/// `run` can hold a `&mut Footprint` and a `&mut dyn Machine` at once without
/// borrowing through a shared container.
pub struct DceEngine {
    pub footprint: Footprint,
    machines: Vec<Box<dyn Machine>>,
}

impl DceEngine {
    pub fn new(machines: Vec<Box<dyn Machine>>) -> Self {
        DceEngine { footprint: Footprint::new(), machines }
    }

    pub fn push(&mut self, behavior: Behavior) -> usize {
        self.footprint.push(behavior)
    }

    pub fn clear(&mut self) {
        self.footprint = Footprint::new();
        for m in &mut self.machines {
            m.clear();
        }
    }

    /// Runs the back-propagation pass for the given requested indices (spec
    /// §4.4 steps 1-3), returning the live behaviors' owning `SubCmdIdx`s in
    /// original (ascending behavior-index) order.
    ///
    /// Falls back to returning every top-level command up to the highest
    /// requested one, unchanged, if a requested index names a behavior past
    /// the end of the recorded footprint (the footprint wasn't fully
    /// recorded, e.g. the capture was truncated mid-frame).
    pub fn run(&mut self, requested: &[SubCmdIdx]) -> Vec<SubCmdIdx> {
        let n = self.footprint.behaviors.len();
        let mut live = vec![false; n];
        let mut end_behavior_index: usize = 0;
        let mut saw_unresolved = false;

        for idx in requested {
            match self.footprint.first_behavior.get(idx).copied() {
                Some(bi) => {
                    end_behavior_index = end_behavior_index.max(bi);
                    live[bi] = true;
                    let mi = self.footprint.behaviors[bi].machine.0;
                    self.machines[mi].framebuffer_request(bi, &mut self.footprint);
                }
                None => saw_unresolved = true,
            }
        }

        if saw_unresolved || end_behavior_index >= n {
            let end_cmd_index = requested.iter().filter_map(|idx| idx.0.first().copied()).max().unwrap_or(0);
            return (0..=end_cmd_index).map(SubCmdIdx::top).collect();
        }

        for bi in (0..=end_behavior_index).rev() {
            if self.footprint.behaviors[bi].aborted {
                continue;
            }
            let mi = self.footprint.behaviors[bi].machine.0;
            let alive = live[bi]
                || self.footprint.behaviors[bi].keep_alive
                || self.machines[mi].is_alive(bi, &self.footprint);
            if !alive {
                continue;
            }
            let forced = self.machines[mi].record_behavior_effects(bi, &mut self.footprint);
            for f in forced {
                if f < n {
                    live[f] = true;
                }
            }
        }

        let mut owners: Vec<(usize, SubCmdIdx)> =
            self.footprint.first_behavior.iter().map(|(idx, &bi)| (bi, idx.clone())).collect();
        owners.sort_by_key(|(bi, _)| *bi);
        owners.into_iter().filter(|(bi, _)| live[*bi]).map(|(_, idx)| idx).collect()
    }
}

/// Collects the set of addresses touched by a list of `SubCmdIdx` behaviors,
/// for callers building a request set from e.g. "everything this framebuffer
/// read depends on".
pub fn owners_of(footprint: &Footprint, indices: &[SubCmdIdx]) -> FastHashSet<SubCmdIdx> {
    indices.iter().filter(|i| footprint.first_behavior.contains_key(i)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dce::footprint::MachineId;
    use crate::transform::dce::machines::MemoryMachine;

    fn behavior(owner: &[u32], reads: &[u64], writes: &[u64]) -> Behavior {
        let mut b = Behavior::new(SubCmdIdx(owner.to_vec()), MachineId(0));
        b.reads = reads.iter().copied().collect();
        b.writes = writes.iter().copied().collect();
        b
    }

    /// Builds the exact dependency graph from the worked DCE example: ten
    /// behaviors, the last six nested under top-level command 3.
    fn build_engine() -> DceEngine {
        let mut engine = DceEngine::new(vec![Box::new(MemoryMachine::new())]);
        engine.push(behavior(&[0], &[], &[1, 2, 3]));
        engine.push(behavior(&[1], &[], &[2, 3]));
        engine.push(behavior(&[2], &[], &[4]));
        engine.push(behavior(&[3, 0, 0, 0], &[2], &[5]));
        engine.push(behavior(&[3, 0, 0, 1], &[3], &[6]));
        engine.push(behavior(&[3, 0, 0, 2], &[4], &[7]));
        engine.push(behavior(&[3, 0, 0, 3], &[5, 6, 7], &[8]));
        engine.push(behavior(&[3, 0, 0, 4], &[8], &[9]));
        engine.push(behavior(&[3, 0, 1, 0], &[8, 9], &[10]));
        engine.push(behavior(&[4], &[10], &[]));
        engine
    }

    #[test]
    fn requesting_the_final_consumer_keeps_everything_but_the_dead_first_write() {
        let mut engine = build_engine();
        let live = engine.run(&[SubCmdIdx::top(4)]);
        let expected = vec![
            SubCmdIdx::top(1),
            SubCmdIdx::top(2),
            SubCmdIdx(vec![3, 0, 0, 0]),
            SubCmdIdx(vec![3, 0, 0, 1]),
            SubCmdIdx(vec![3, 0, 0, 2]),
            SubCmdIdx(vec![3, 0, 0, 3]),
            SubCmdIdx(vec![3, 0, 0, 4]),
            SubCmdIdx(vec![3, 0, 1, 0]),
            SubCmdIdx::top(4),
        ];
        assert_eq!(live, expected);
    }

    #[test]
    fn requesting_one_nested_behavior_only_keeps_its_own_dependency_chain() {
        let mut engine = build_engine();
        let live = engine.run(&[SubCmdIdx(vec![3, 0, 0, 1])]);
        let expected = vec![SubCmdIdx::top(1), SubCmdIdx(vec![3, 0, 0, 1])];
        assert_eq!(live, expected);
    }

    #[test]
    fn unresolved_request_falls_back_to_emitting_everything_up_to_it() {
        let mut engine = build_engine();
        let live = engine.run(&[SubCmdIdx::top(20)]);
        assert_eq!(live.len(), 21);
        assert_eq!(live[0], SubCmdIdx::top(0));
        assert_eq!(live[20], SubCmdIdx::top(20));
    }
}
