use crate::types::{Creator, NodeId};
use glam::Vec3;

/// One segment endpoint of a skeleton.
///
/// The first entry of `children` always continues the same branch; any
/// further entries are the origins of side branches. [`SkeletonTree`]
/// enforces this through [`SkeletonTree::push_continuation`] and
/// [`SkeletonTree::push_branch`].
///
/// [`SkeletonTree`]: crate::tree::SkeletonTree
/// [`SkeletonTree::push_continuation`]: crate::tree::SkeletonTree::push_continuation
/// [`SkeletonTree::push_branch`]: crate::tree::SkeletonTree::push_branch
#[derive(Clone, Debug, PartialEq)]
pub struct SkeletonNode {
    /// Position in local space.
    pub position: Vec3,
    /// Unit direction in local space.
    pub direction: Vec3,
    pub radius: f32,
    pub creator: Creator,
    pub children: Vec<NodeId>,
    /// Set on the first node of a branch; such nodes are never split.
    pub is_branch_origin: bool,
    pub can_spawn_leaf: bool,
    /// Normalized distance along the current branch, 0 at its start and
    /// 1 at its end. Refreshed by
    /// [`crate::tree::SkeletonTree::set_positions_in_branches`].
    pub position_in_branch: f32,
    /// Bone this node is bound to, filled by armature reduction.
    pub bone_name: Option<String>,
}

impl SkeletonNode {
    pub fn new(position: Vec3, direction: Vec3, radius: f32, creator: Creator) -> Self {
        Self {
            position,
            direction,
            radius,
            creator,
            children: Vec::with_capacity(2),
            is_branch_origin: false,
            can_spawn_leaf: true,
            position_in_branch: 0.0,
            bone_name: None,
        }
    }

    /// `true` if the node ends a branch (it has no children).
    #[inline]
    pub fn is_extremity(&self) -> bool {
        self.children.is_empty()
    }

    /// The child continuing this node's branch, if any.
    #[inline]
    pub fn continuation(&self) -> Option<NodeId> {
        self.children.first().copied()
    }

    /// Children that start new branches.
    #[inline]
    pub fn side_children(&self) -> &[NodeId] {
        self.children.get(1..).unwrap_or(&[])
    }

    /// A node can host a split fork if it sits inside a branch: exactly one
    /// child and not the start of a branch itself.
    #[inline]
    pub fn is_splittable(&self) -> bool {
        self.children.len() == 1 && !self.is_branch_origin
    }
}
