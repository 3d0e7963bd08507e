use crate::{
    error::TreeError,
    node::SkeletonNode,
    types::{Creator, NodeId},
};

/// Arena-backed skeleton: every node lives in `nodes` and refers to its
/// children by index. The tree starts empty; a trunk or stroke import sets
/// the root, and every later operation only appends nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkeletonTree {
    nodes: Vec<SkeletonNode>,
    root: Option<NodeId>,
}

/// One visit of a pre-order [`Walk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkStep {
    pub node: NodeId,
    pub parent: Option<NodeId>,
    /// Position of `node` in its parent's child list; 0 for the root and for
    /// branch continuations.
    pub child_index: usize,
}

/// Depth-first pre-order traversal using an explicit stack, so deep
/// skeletons never hit recursion limits. Continuations are visited before
/// side branches.
#[derive(Debug)]
pub struct Walk<'a> {
    tree: &'a SkeletonTree,
    stack: Vec<WalkStep>,
}

impl Iterator for Walk<'_> {
    type Item = WalkStep;

    fn next(&mut self) -> Option<WalkStep> {
        let step = self.stack.pop()?;
        let children = &self.tree.nodes[step.node].children;
        self.stack
            .extend(children.iter().enumerate().rev().map(|(i, &child)| WalkStep {
                node: child,
                parent: Some(step.node),
                child_index: i,
            }));
        Some(step)
    }
}

impl SkeletonTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns the root, or [`TreeError::EmptyTree`] if none was set yet.
    pub fn require_root(&self) -> Result<NodeId, TreeError> {
        self.root.ok_or(TreeError::EmptyTree)
    }

    pub fn nodes(&self) -> &[SkeletonNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&SkeletonNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SkeletonNode {
        &mut self.nodes[id]
    }

    /// Discards any existing skeleton and starts a new one at `node`.
    pub fn set_root(&mut self, node: SkeletonNode) -> NodeId {
        if !self.nodes.is_empty() {
            tracing::debug!(discarded = self.nodes.len(), "replacing existing skeleton");
        }
        self.nodes.clear();
        self.nodes.push(node);
        self.root = Some(0);
        0
    }

    /// Appends `node` as the continuation (first child) of `parent`.
    pub fn push_continuation(
        &mut self,
        parent: NodeId,
        mut node: SkeletonNode,
    ) -> Result<NodeId, TreeError> {
        if !self.nodes[parent].children.is_empty() {
            return Err(TreeError::ContinuationExists { parent });
        }
        node.is_branch_origin = false;
        Ok(self.push_child(parent, node))
    }

    /// Appends `node` as the origin of a new side branch on `parent`.
    pub fn push_branch(
        &mut self,
        parent: NodeId,
        mut node: SkeletonNode,
    ) -> Result<NodeId, TreeError> {
        if self.nodes[parent].children.is_empty() {
            return Err(TreeError::MissingContinuation { parent });
        }
        node.is_branch_origin = true;
        Ok(self.push_child(parent, node))
    }

    fn push_child(&mut self, parent: NodeId, node: SkeletonNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Pre-order traversal from the root. Empty for an empty tree.
    pub fn walk(&self) -> Walk<'_> {
        let stack = self
            .root
            .map(|root| WalkStep {
                node: root,
                parent: None,
                child_index: 0,
            })
            .into_iter()
            .collect();
        Walk { tree: self, stack }
    }

    /// Childless nodes created by `selection`, in pre-order.
    pub fn grow_candidates(&self, selection: Creator) -> Vec<NodeId> {
        self.walk()
            .map(|step| step.node)
            .filter(|&id| {
                let node = &self.nodes[id];
                node.is_extremity() && node.creator == selection
            })
            .collect()
    }

    /// Recomputes `position_in_branch` for every node.
    ///
    /// Each branch is walked along its continuation chain; side children
    /// start new branches at distance 0. The last node of a branch gets 1,
    /// and a branch of zero length puts its other nodes at 0.
    pub fn set_positions_in_branches(&mut self) {
        let Some(root) = self.root else {
            return;
        };

        let mut branch_starts = vec![root];
        let mut chain: Vec<(NodeId, f32)> = Vec::new();

        while let Some(start) = branch_starts.pop() {
            chain.clear();
            chain.push((start, 0.0));
            let mut current = start;
            let mut distance = 0.0;

            while let Some(next) = self.nodes[current].continuation() {
                branch_starts.extend(self.nodes[current].side_children().iter().rev());
                distance += self.nodes[current]
                    .position
                    .distance(self.nodes[next].position);
                chain.push((next, distance));
                current = next;
            }

            let branch_length = distance;
            for &(id, d) in &chain {
                let node = &mut self.nodes[id];
                node.position_in_branch = if node.is_extremity() {
                    1.0
                } else if branch_length == 0.0 {
                    0.0
                } else {
                    d / branch_length
                };
            }
        }
    }

    /// Nodes created by `selection` that can host a split and whose
    /// `position_in_branch` lies in `[start, end]`, paired with that
    /// position remapped onto `[0, 1]` over the window.
    ///
    /// Relies on positions refreshed by [`Self::set_positions_in_branches`].
    pub fn split_candidates(&self, selection: Creator, start: f32, end: f32) -> Vec<(NodeId, f32)> {
        self.walk()
            .filter_map(|step| {
                let node = &self.nodes[step.node];
                let p = node.position_in_branch;
                let eligible =
                    node.is_splittable() && node.creator == selection && p >= start && p <= end;
                eligible.then(|| {
                    let t = if end <= start {
                        0.0
                    } else {
                        (p - start) / (end - start)
                    };
                    (step.node, t)
                })
            })
            .collect()
    }
}
