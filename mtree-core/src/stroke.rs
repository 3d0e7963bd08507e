//! Skeleton import from hand-drawn strokes.
//!
//! Each stroke becomes a chain of nodes. Split descriptors graft a stroke
//! onto a node of another one; the grafted stroke contributes every point
//! but its first, which only marks where it was drawn from.

use std::collections::VecDeque;

use crate::{
    error::{TreeError, ensure},
    node::SkeletonNode,
    tree::SkeletonTree,
    types::{Creator, NodeId},
};
use glam::Vec3;

/// Radius damping applied to grafted strokes relative to their parent.
const GRAFT_RADIUS_FACTOR: f32 = 0.9;

/// Grafts stroke `child_stroke` onto point `node_index` of `parent_stroke`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrokeSplit {
    pub parent_stroke: usize,
    pub node_index: usize,
    pub child_stroke: usize,
}

impl SkeletonTree {
    /// Replaces the skeleton with one built from `strokes`.
    ///
    /// Only the strokes before the first one with fewer than two points are
    /// used. Stroke 0 is the trunk; the others are only reachable through
    /// `splits`. Radii taper from 1 to 0 along each stroke, then are scaled
    /// top-down: continuations keep the factor of their branch, which is
    /// `base_radius` for the trunk and 0.9 times the fork node's new radius
    /// for a grafted stroke.
    pub fn from_strokes(
        strokes: &[Vec<Vec3>],
        splits: &[StrokeSplit],
        base_radius: f32,
        creator: Creator,
    ) -> Result<SkeletonTree, TreeError> {
        let base_ok = base_radius.is_finite() && base_radius >= 0.0;
        ensure(base_ok, "base_radius", "must be finite and not negative")?;

        let usable = strokes
            .iter()
            .position(|s| s.len() < 2)
            .unwrap_or(strokes.len());
        if usable < strokes.len() {
            tracing::warn!(
                stroke = usable,
                dropped = strokes.len() - usable,
                "stroke with fewer than two points, ignoring it and the strokes after it"
            );
        }
        if usable == 0 {
            return Err(TreeError::InvalidStroke {
                index: 0,
                reason: "needs at least two points",
            });
        }
        let strokes = &strokes[..usable];

        let grafts = graft_table(strokes, splits)?;

        let mut tree = SkeletonTree::new();
        let mut stem = stroke_node(&strokes[0], 0, creator);
        stem.is_branch_origin = true;
        let root = tree.set_root(stem);

        let mut import = StrokeImport {
            strokes,
            grafts,
            creator,
            queue: VecDeque::new(),
        };
        import.queue_grafts(0, 0, root);
        import.extend(&mut tree, 0, root)?;
        let mut chains = 1usize;
        while let Some((stroke, parent)) = import.queue.pop_front() {
            import.extend(&mut tree, stroke, parent)?;
            chains += 1;
        }

        tree.rescale_radii(base_radius);
        tracing::debug!(strokes = chains, nodes = tree.len(), "imported strokes");
        Ok(tree)
    }

    fn rescale_radii(&mut self, base_radius: f32) {
        let steps: Vec<_> = self.walk().collect();
        let mut factors = vec![base_radius; self.len()];
        for step in steps {
            let factor = factors[step.node];
            let radius = {
                let node = self.node_mut(step.node);
                node.radius *= factor;
                node.radius
            };
            let children = self.nodes()[step.node].children.clone();
            for (i, child) in children.into_iter().enumerate() {
                factors[child] = if i == 0 {
                    factor
                } else {
                    radius * GRAFT_RADIUS_FACTOR
                };
            }
        }
    }
}

/// State of one [`SkeletonTree::from_strokes`] call.
struct StrokeImport<'a> {
    strokes: &'a [Vec<Vec3>],
    /// Per stroke, the `(point, child stroke)` pairs grafted onto it.
    grafts: Vec<Vec<(usize, usize)>>,
    creator: Creator,
    /// Strokes waiting to be attached, with the node they attach to.
    queue: VecDeque<(usize, NodeId)>,
}

impl StrokeImport<'_> {
    /// Appends every point of `stroke` but the first below `parent` and
    /// queues the strokes grafted onto the new nodes.
    fn extend(
        &mut self,
        tree: &mut SkeletonTree,
        stroke: usize,
        parent: NodeId,
    ) -> Result<(), TreeError> {
        let strokes = self.strokes;
        let points = &strokes[stroke];
        let mut last = parent;
        for j in 1..points.len() {
            let node = stroke_node(points, j, self.creator);
            last = if tree.nodes()[last].is_extremity() {
                tree.push_continuation(last, node)?
            } else {
                tree.push_branch(last, node)?
            };
            self.queue_grafts(stroke, j, last);
        }
        Ok(())
    }

    fn queue_grafts(&mut self, stroke: usize, point: usize, node: NodeId) {
        for &(at, child) in &self.grafts[stroke] {
            if at == point {
                self.queue.push_back((child, node));
            }
        }
    }
}

/// Node for point `j` of a stroke, with its radius before rescaling.
fn stroke_node(points: &[Vec3], j: usize, creator: Creator) -> SkeletonNode {
    let n = points.len();
    let direction = if j + 1 < n {
        points[j + 1] - points[j]
    } else {
        points[j] - points[j - 1]
    };
    let radius = 1.0 - j as f32 / (n - 1) as f32;
    SkeletonNode::new(points[j], direction.normalize_or(Vec3::Z), radius, creator)
}

/// Per stroke, the `(point, child stroke)` pairs grafted onto it, after
/// checking every descriptor.
fn graft_table(
    strokes: &[Vec<Vec3>],
    splits: &[StrokeSplit],
) -> Result<Vec<Vec<(usize, usize)>>, TreeError> {
    let mut grafts = vec![Vec::new(); strokes.len()];
    let mut grafted = vec![false; strokes.len()];
    for split in splits {
        let Some(parent) = strokes.get(split.parent_stroke) else {
            return Err(TreeError::InvalidStroke {
                index: split.parent_stroke,
                reason: "split refers to a missing parent stroke",
            });
        };
        if split.node_index >= parent.len() {
            return Err(TreeError::InvalidStroke {
                index: split.parent_stroke,
                reason: "split node index is past the end of the stroke",
            });
        }
        if split.child_stroke >= strokes.len() {
            return Err(TreeError::InvalidStroke {
                index: split.child_stroke,
                reason: "split refers to a missing child stroke",
            });
        }
        if split.child_stroke == 0 {
            return Err(TreeError::InvalidStroke {
                index: 0,
                reason: "the first stroke cannot be grafted",
            });
        }
        if std::mem::replace(&mut grafted[split.child_stroke], true) {
            return Err(TreeError::InvalidStroke {
                index: split.child_stroke,
                reason: "stroke is grafted more than once",
            });
        }
        grafts[split.parent_stroke].push((split.node_index, split.child_stroke));
    }
    Ok(grafts)
}
