//! Concrete [`Machine`] implementations (spec §4.4a): a memory machine for
//! buffer/texture/client-memory contents, and a GL-state machine for
//! everything hanging off context/object state (bindings, pipeline state,
//! uniform values).

use crate::transform::dce::footprint::{Footprint, Machine};

/// Addresses are byte ranges flattened to a single integer key by the
/// transform that records them (spec §4.4: "memory machine"). Plain
/// overwrite semantics: once a write is consumed, everything it depended on
/// for that write is no longer needed on its account alone.
#[derive(Default)]
pub struct MemoryMachine;

impl MemoryMachine {
    pub fn new() -> Self {
        MemoryMachine
    }
}

impl Machine for MemoryMachine {
    fn is_alive(&self, bi: usize, footprint: &Footprint) -> bool {
        footprint.behaviors[bi].writes.iter().any(|&a| footprint.tree.is_live(a))
    }

    fn record_behavior_effects(&mut self, bi: usize, footprint: &mut Footprint) -> Vec<usize> {
        let (writes, reads) = {
            let b = &footprint.behaviors[bi];
            (b.writes.clone(), b.reads.clone())
        };
        for w in writes {
            footprint.tree.mark_dead(w);
        }
        for r in reads {
            footprint.tree.mark_live(r);
        }
        vec![bi]
    }

    fn framebuffer_request(&mut self, bi: usize, footprint: &mut Footprint) {
        let writes = footprint.behaviors[bi].writes.clone();
        for w in writes {
            footprint.tree.mark_live(w);
        }
    }

    fn clear(&mut self) {}
}

/// GL object/context state: bindings, pipeline toggles, uniform values.
/// Differs from [`MemoryMachine`] only in how `modifies` behaves: a
/// read-modify-write keeps its input address live rather than killing it,
/// since the next-earlier producer is still needed to reconstruct the
/// pre-modify value.
#[derive(Default)]
pub struct GlStateMachine;

impl GlStateMachine {
    pub fn new() -> Self {
        GlStateMachine
    }
}

impl Machine for GlStateMachine {
    fn is_alive(&self, bi: usize, footprint: &Footprint) -> bool {
        let b = &footprint.behaviors[bi];
        b.writes.iter().chain(b.modifies.iter()).any(|&a| footprint.tree.is_live(a))
    }

    fn record_behavior_effects(&mut self, bi: usize, footprint: &mut Footprint) -> Vec<usize> {
        let (writes, modifies, reads) = {
            let b = &footprint.behaviors[bi];
            (b.writes.clone(), b.modifies.clone(), b.reads.clone())
        };
        for w in writes {
            footprint.tree.mark_dead(w);
        }
        for m in modifies {
            footprint.tree.mark_live(m);
        }
        for r in reads {
            footprint.tree.mark_live(r);
        }
        vec![bi]
    }

    fn framebuffer_request(&mut self, bi: usize, footprint: &mut Footprint) {
        let writes = footprint.behaviors[bi].writes.clone();
        for w in writes {
            footprint.tree.mark_live(w);
        }
    }

    fn clear(&mut self) {}
}
