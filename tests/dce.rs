//! Dead-code-elimination scenarios beyond the worked memory-machine example:
//! GL-state read-modify-write semantics, `keep_alive`, and aborted behaviors.

use gles_replay::ids::SubCmdIdx;
use gles_replay::transform::dce::footprint::{Behavior, MachineId};
use gles_replay::transform::dce::machines::GlStateMachine;
use gles_replay::transform::dce::DceEngine;

fn behavior(owner: u32, reads: &[u64], writes: &[u64]) -> Behavior {
    let mut b = Behavior::new(SubCmdIdx::top(owner), MachineId(0));
    b.reads = reads.iter().copied().collect();
    b.writes = writes.iter().copied().collect();
    b
}

fn modifying_behavior(owner: u32, modifies: &[u64]) -> Behavior {
    let mut b = Behavior::new(SubCmdIdx::top(owner), MachineId(0));
    b.modifies = modifies.iter().copied().collect();
    b
}

/// A state address is produced, read-modify-written in place (e.g. a
/// blend-accumulation counter), then consumed. The RMW step must not sever
/// the chain to its producer the way a plain write would.
#[test]
fn read_modify_write_keeps_its_producer_alive() {
    let mut engine = DceEngine::new(vec![Box::new(GlStateMachine::new())]);
    engine.push(behavior(0, &[], &[1])); // produces address 1
    engine.push(modifying_behavior(1, &[1])); // reads-and-rewrites address 1
    engine.push(behavior(2, &[1], &[])); // consumes address 1

    let live = engine.run(&[SubCmdIdx::top(2)]);
    assert_eq!(live, vec![SubCmdIdx::top(0), SubCmdIdx::top(1), SubCmdIdx::top(2)]);
}

/// An unrelated write is dropped once nothing downstream of it is live.
#[test]
fn an_unconsumed_write_is_dropped() {
    let mut engine = DceEngine::new(vec![Box::new(GlStateMachine::new())]);
    engine.push(behavior(0, &[], &[1])); // never read by anything requested
    engine.push(behavior(1, &[], &[2]));
    engine.push(behavior(2, &[2], &[]));

    let live = engine.run(&[SubCmdIdx::top(2)]);
    assert_eq!(live, vec![SubCmdIdx::top(1), SubCmdIdx::top(2)]);
}

/// `keep_alive` forces a behavior to survive even though nothing requested
/// depends on it, e.g. a command with an externally visible side effect.
#[test]
fn keep_alive_survives_even_when_unreferenced() {
    let mut engine = DceEngine::new(vec![Box::new(GlStateMachine::new())]);
    let mut forced = behavior(0, &[], &[99]);
    forced.keep_alive = true;
    engine.push(forced);
    engine.push(behavior(1, &[], &[])); // the actually requested command

    let live = engine.run(&[SubCmdIdx::top(1)]);
    assert_eq!(live, vec![SubCmdIdx::top(0), SubCmdIdx::top(1)]);
}

/// A behavior recorded as aborted at capture time is skipped during
/// back-propagation even if its writes would otherwise make it live.
#[test]
fn aborted_behaviors_are_never_resurrected() {
    let mut engine = DceEngine::new(vec![Box::new(GlStateMachine::new())]);
    let mut aborted = behavior(0, &[], &[5]);
    aborted.aborted = true;
    engine.push(aborted);
    engine.push(behavior(1, &[5], &[])); // would have consumed address 5 if it existed

    let live = engine.run(&[SubCmdIdx::top(1)]);
    assert_eq!(live, vec![SubCmdIdx::top(1)]);
}
