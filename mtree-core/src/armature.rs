//! Reduction of the skeleton to a coarser bone hierarchy.

use crate::{error::TreeError, tree::SkeletonTree};
use glam::Vec3;

/// One bone: a node and its continuation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bone {
    pub head: Vec3,
    pub tail: Vec3,
    pub head_radius: f32,
    pub tail_radius: f32,
    /// Index of the parent bone, counted across all groups.
    pub parent: Option<usize>,
}

/// Bones grouped by branch, in creation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Armature {
    pub groups: Vec<Vec<Bone>>,
}

impl Armature {
    pub fn bone_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// All bones in index order.
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.groups.iter().flatten()
    }
}

impl SkeletonTree {
    /// Builds one bone for every node thicker than `min_radius` that has a
    /// child. Thinner nodes share the bone of their closest boned ancestor.
    /// Side branches thick enough to carry bones open a new group.
    ///
    /// Also records on every node the name of the bone it is bound to.
    pub fn armature_data(&mut self, min_radius: f32) -> Result<Armature, TreeError> {
        self.require_root()?;

        let steps: Vec<_> = self.walk().collect();
        let mut bone_of = vec![None; self.len()];
        let mut armature = Armature {
            groups: vec![Vec::new()],
        };
        let mut next_bone = 0usize;

        for step in steps {
            let inherited = step.parent.and_then(|p| bone_of[p]);
            let node = &self.nodes()[step.node];
            if step.child_index > 0 && node.radius > min_radius {
                armature.groups.push(Vec::new());
            }

            let bone = match node.continuation() {
                Some(child) if node.radius > min_radius => {
                    let child = &self.nodes()[child];
                    let bone = Bone {
                        head: node.position,
                        tail: child.position,
                        head_radius: node.radius,
                        tail_radius: child.radius,
                        parent: inherited,
                    };
                    if let Some(group) = armature.groups.last_mut() {
                        group.push(bone);
                    }
                    next_bone += 1;
                    Some(next_bone - 1)
                }
                _ => inherited,
            };

            bone_of[step.node] = bone;
            self.node_mut(step.node).bone_name = bone.map(|i| format!("bone_{i}"));
        }

        tracing::debug!(
            bones = next_bone,
            groups = armature.groups.len(),
            "reduced skeleton to armature"
        );
        Ok(armature)
    }
}
