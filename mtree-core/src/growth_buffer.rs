use crate::types::NodeId;

/// Growth bookkeeping for one node during a single growth pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GrowthState {
    /// Length grown since the pass started.
    pub growth: f32,
    /// Length the node's branch should reach in this pass.
    pub goal: f32,
    /// Radius of the branch when the pass started.
    pub start_radius: f32,
}

impl GrowthState {
    /// Fraction of the goal reached, in `[0, 1]`.
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.goal > 0.0 {
            (self.growth / self.goal).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// A side table of [`GrowthState`] per node, scoped to one growth pass.
///
/// Entry `i` belongs to node `i`; nodes that are not part of the pass have
/// no entry. The table is dropped when the pass ends, so skeleton nodes
/// never carry transient growth fields.
#[derive(Debug, Default)]
pub struct GrowthBuffer {
    states: Vec<Option<GrowthState>>,
}

impl GrowthBuffer {
    /// Creates a buffer with room for `len` nodes and no entries.
    pub fn with_len(len: usize) -> Self {
        Self {
            states: vec![None; len],
        }
    }

    /// Records the state of `id`, growing the buffer for nodes appended
    /// during the pass.
    pub fn set(&mut self, id: NodeId, state: GrowthState) {
        if id >= self.states.len() {
            self.states.resize(id + 1, None);
        }
        self.states[id] = Some(state);
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<GrowthState> {
        self.states.get(id).copied().flatten()
    }
}
