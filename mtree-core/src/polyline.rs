use crate::{error::TreeError, tree::SkeletonTree};
use glam::Vec3;

/// Points and radii of one branch, ready to be lofted into a surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BranchPolyline {
    pub points: Vec<Vec3>,
    /// One radius per point.
    pub radii: Vec<f32>,
}

impl SkeletonTree {
    /// One polyline per branch, in pre-order.
    ///
    /// A side branch starts at its parent's position so the lofted
    /// surface stays attached to the branch it forks from.
    pub fn branch_polylines(&self) -> Result<Vec<BranchPolyline>, TreeError> {
        self.require_root()?;
        let nodes = self.nodes();
        let mut polylines: Vec<BranchPolyline> = Vec::new();

        for step in self.walk() {
            let node = &nodes[step.node];
            let point = match step.parent {
                Some(parent) if step.child_index > 0 => {
                    polylines.push(BranchPolyline::default());
                    nodes[parent].position
                }
                Some(_) => node.position,
                None => {
                    polylines.push(BranchPolyline::default());
                    node.position
                }
            };
            if let Some(line) = polylines.last_mut() {
                line.points.push(point);
                line.radii.push(node.radius);
            }
        }
        Ok(polylines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{node::SkeletonNode, types::Creator};

    fn node(x: f32, z: f32, radius: f32) -> SkeletonNode {
        SkeletonNode::new(Vec3::new(x, 0.0, z), Vec3::Z, radius, Creator::new(0))
    }

    #[test]
    fn one_polyline_per_branch() {
        let mut tree = SkeletonTree::new();
        let root = tree.set_root(node(0.0, 0.0, 1.0));
        let a = tree.push_continuation(root, node(0.0, 1.0, 0.8)).unwrap();
        tree.push_continuation(a, node(0.0, 2.0, 0.6)).unwrap();
        let side = tree.push_branch(a, node(1.0, 1.5, 0.4)).unwrap();
        tree.push_continuation(side, node(2.0, 2.0, 0.2)).unwrap();

        let lines = tree.branch_polylines().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].points,
            vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 2.0)]
        );
        assert_eq!(lines[0].radii, vec![1.0, 0.8, 0.6]);
        // The side branch starts on its parent.
        assert_eq!(
            lines[1].points,
            vec![Vec3::new(0.0, 0.0, 1.0), Vec3::new(2.0, 0.0, 2.0)]
        );
        assert_eq!(lines[1].radii, vec![0.4, 0.2]);
    }

    #[test]
    fn polylines_need_a_root() {
        assert!(matches!(
            SkeletonTree::new().branch_polylines(),
            Err(TreeError::EmptyTree)
        ));
    }
}
