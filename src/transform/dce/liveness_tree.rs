//! The liveness tree (spec §4.4): a forest over state addresses where a
//! newer write on an ancestor overrides an older mark on a descendant,
//! giving O(depth) "mark a whole subtree live/dead" via a single parent
//! write.

use crate::auxil::FastHashMap;

pub type StateAddr = u64;

struct Node {
    live: bool,
    any_live: bool,
    timestamp: u64,
    parent: Option<StateAddr>,
}

impl Node {
    fn fresh() -> Self {
        Node { live: false, any_live: false, timestamp: 0, parent: None }
    }
}

#[derive(Default)]
pub struct LivenessTree {
    nodes: FastHashMap<StateAddr, Node>,
    clock: u64,
}

impl LivenessTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `addr`'s parent in the state-address forest (e.g. a buffer
    /// range's owning buffer, or a uniform's owning program).
    pub fn set_parent(&mut self, addr: StateAddr, parent: StateAddr) {
        self.nodes.entry(addr).or_insert_with(Node::fresh).parent = Some(parent);
    }

    fn bump(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn mark_live(&mut self, addr: StateAddr) {
        let ts = self.bump();
        let node = self.nodes.entry(addr).or_insert_with(Node::fresh);
        node.live = true;
        node.any_live = true;
        node.timestamp = ts;
    }

    pub fn mark_dead(&mut self, addr: StateAddr) {
        let ts = self.bump();
        let node = self.nodes.entry(addr).or_insert_with(Node::fresh);
        node.live = false;
        node.timestamp = ts;
    }

    /// Climbs ancestors; the result is the `live` value of the highest
    /// ancestor whose timestamp exceeds the node's own, so a later mark on an
    /// ancestor overrides an earlier one on a descendant.
    pub fn is_live(&self, addr: StateAddr) -> bool {
        let mut best = self.nodes.get(&addr).map(|n| (n.live, n.timestamp)).unwrap_or((false, 0));
        let mut current = addr;
        loop {
            let parent = match self.nodes.get(&current).and_then(|n| n.parent) {
                Some(p) => p,
                None => break,
            };
            if let Some(pn) = self.nodes.get(&parent) {
                if pn.timestamp > best.1 {
                    best = (pn.live, pn.timestamp);
                }
            }
            current = parent;
        }
        best.0
    }

    pub fn any_live(&self, addr: StateAddr) -> bool {
        self.nodes.get(&addr).map(|n| n.any_live).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_address_is_dead() {
        let tree = LivenessTree::new();
        assert!(!tree.is_live(1));
    }

    #[test]
    fn mark_live_then_dead() {
        let mut tree = LivenessTree::new();
        tree.mark_live(1);
        assert!(tree.is_live(1));
        tree.mark_dead(1);
        assert!(!tree.is_live(1));
    }

    #[test]
    fn later_parent_write_overrides_earlier_child_mark() {
        let mut tree = LivenessTree::new();
        tree.set_parent(2, 1);
        tree.mark_live(2);
        tree.mark_dead(1);
        assert!(!tree.is_live(2));
    }

    #[test]
    fn earlier_parent_write_does_not_override_later_child_mark() {
        let mut tree = LivenessTree::new();
        tree.set_parent(2, 1);
        tree.mark_dead(1);
        tree.mark_live(2);
        assert!(tree.is_live(2));
    }
}
