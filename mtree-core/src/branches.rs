//! Composite passes built from split and grow: side branches and roots.

use crate::{
    error::TreeError,
    grow::{GrowParams, GrowthReport},
    node::SkeletonNode,
    split::SplitParams,
    tree::SkeletonTree,
    types::Creator,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fork angle used while growing branches out of their split origins.
const BRANCH_FORK_ANGLE: f32 = 0.3;
/// Fork radius factor used while growing branches.
const BRANCH_FORK_RADIUS: f32 = 0.9;

const ROOT_FORK_ANGLE: f32 = 0.5;
const ROOT_FORK_RADIUS: f32 = 0.6;
/// Negative gravity lifts roots slightly back toward the surface.
const ROOT_GRAVITY: f32 = -0.1;
/// Keeps roots on the underside of the floor plane.
const ROOT_FLOOR_AVOIDANCE: f32 = -1.0;

/// Parameters of [`SkeletonTree::add_branches`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchParams {
    /// Number of split sites.
    pub amount: usize,
    /// Opening angle of new branches.
    pub angle: f32,
    pub max_split_number: u32,
    /// Radius of a new branch relative to its parent.
    pub radius: f32,
    /// Radius at branch ends relative to the branch base.
    pub end_radius: f32,
    /// Lowest branch-relative position where branches may start.
    pub start: f32,
    pub length: f32,
    pub shape_start: f32,
    pub shape_end: f32,
    pub shape_convexity: f32,
    pub resolution: f32,
    pub randomness: f32,
    pub split_proba: f32,
    pub split_flatten: f32,
    pub gravity_strength: f32,
    pub floor_avoidance: f32,
    pub can_spawn_leaf: bool,
}

impl Default for BranchParams {
    fn default() -> Self {
        Self {
            amount: 20,
            angle: 0.6,
            max_split_number: 3,
            radius: 0.6,
            end_radius: 0.0,
            start: 0.1,
            length: 7.0,
            shape_start: 1.0,
            shape_end: 1.0,
            shape_convexity: 0.3,
            resolution: 1.0,
            randomness: 0.15,
            split_proba: 0.1,
            split_flatten: 0.5,
            gravity_strength: 0.3,
            floor_avoidance: 1.0,
            can_spawn_leaf: true,
        }
    }
}

impl BranchParams {
    /// Checks both halves of the pass before either touches the tree.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.split_params().validate()?;
        self.grow_params().validate()
    }

    pub fn split_params(&self) -> SplitParams {
        SplitParams {
            amount: self.amount,
            angle: self.angle,
            max_split_number: self.max_split_number,
            radius: self.radius,
            start: self.start,
            end: 1.0,
            flatten: self.split_flatten,
        }
    }

    pub fn grow_params(&self) -> GrowParams {
        GrowParams {
            length: self.length,
            shape_start: self.shape_start,
            shape_end: self.shape_end,
            shape_convexity: self.shape_convexity,
            resolution: self.resolution,
            randomness: self.randomness,
            split_proba: self.split_proba,
            split_angle: BRANCH_FORK_ANGLE,
            split_radius: BRANCH_FORK_RADIUS,
            split_flatten: self.split_flatten,
            end_radius: self.end_radius,
            gravity_strength: self.gravity_strength,
            floor_avoidance: self.floor_avoidance,
            can_spawn_leaf: self.can_spawn_leaf,
        }
    }
}

/// Parameters of [`SkeletonTree::roots`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootParams {
    pub length: f32,
    pub resolution: f32,
    pub split_proba: f32,
    pub randomness: f32,
}

impl Default for RootParams {
    fn default() -> Self {
        Self {
            length: 14.0,
            resolution: 2.0,
            split_proba: 0.2,
            randomness: 0.2,
        }
    }
}

impl RootParams {
    pub fn grow_params(&self) -> GrowParams {
        GrowParams {
            length: self.length,
            shape_start: 1.0,
            shape_end: 1.0,
            shape_convexity: 0.0,
            resolution: self.resolution,
            randomness: self.randomness,
            split_proba: self.split_proba,
            split_angle: ROOT_FORK_ANGLE,
            split_radius: ROOT_FORK_RADIUS,
            split_flatten: 0.0,
            end_radius: 0.0,
            gravity_strength: ROOT_GRAVITY,
            floor_avoidance: ROOT_FLOOR_AVOIDANCE,
            can_spawn_leaf: false,
        }
    }
}

impl SkeletonTree {
    /// One branching pass: splits the nodes created by `selection`, then
    /// grows new branches out of the fresh forks.
    ///
    /// The forks are tagged with the split-origin phase of `creator`, so
    /// the grow half extends exactly them; the grown nodes carry `creator`.
    pub fn add_branches(
        &mut self,
        params: &BranchParams,
        creator: Creator,
        selection: Creator,
        rng: &mut impl Rng,
    ) -> Result<GrowthReport, TreeError> {
        params.validate()?;
        let split_origin = creator.split_origin();
        self.split(&params.split_params(), split_origin, selection, rng)?;
        self.grow(&params.grow_params(), creator, split_origin, rng)
    }

    /// Grows roots below the trunk base.
    ///
    /// Does nothing when the trunk has no segments. Otherwise a root origin
    /// pointing opposite the trunk is attached to the trunk base as a side
    /// branch and grown downward, kept under the floor plane.
    pub fn roots(
        &mut self,
        params: &RootParams,
        creator: Creator,
        rng: &mut impl Rng,
    ) -> Result<GrowthReport, TreeError> {
        let grow_params = params.grow_params();
        grow_params.validate()?;
        let root = self.require_root()?;
        let stem = &self.nodes()[root];
        if stem.is_extremity() {
            tracing::debug!("trunk has no length, skipping roots");
            return Ok(GrowthReport::default());
        }

        let origin = SkeletonNode::new(
            stem.position,
            -stem.direction,
            stem.radius,
            creator.root_origin(),
        );
        self.push_branch(root, origin)?;
        self.grow(&grow_params, creator, creator.root_origin(), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        trunk::TrunkParams,
        types::{Phase, seeded_rng},
    };

    fn trunk(length: f32) -> SkeletonTree {
        let mut tree = SkeletonTree::new();
        let params = TrunkParams {
            length,
            resolution: 1.0,
            ..TrunkParams::default()
        };
        tree.add_trunk(&params, Creator::new(0), &mut seeded_rng(1)).unwrap();
        tree
    }

    #[test]
    fn add_branches_grows_out_of_split_origins() {
        let mut tree = trunk(10.0);
        let params = BranchParams {
            amount: 4,
            max_split_number: 1,
            length: 3.0,
            resolution: 2.0,
            floor_avoidance: 0.0,
            ..BranchParams::default()
        };
        let report = tree
            .add_branches(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(6))
            .unwrap();

        let origins: Vec<_> = tree
            .nodes()
            .iter()
            .filter(|n| n.creator == Creator::new(1).split_origin())
            .collect();
        assert_eq!(origins.len(), 4);
        assert_eq!(report.candidates, 4);
        assert!(report.nodes_added > 0);
        // Every fork was extended by the grow half.
        assert!(origins.iter().all(|n| !n.is_extremity()));
        let grown = tree
            .nodes()
            .iter()
            .filter(|n| n.creator == Creator::new(1))
            .count();
        assert_eq!(grown, report.nodes_added);
    }

    #[test]
    fn branch_passes_chain_through_creators() {
        let mut tree = trunk(12.0);
        let first = BranchParams {
            amount: 5,
            length: 4.0,
            ..BranchParams::default()
        };
        tree.add_branches(&first, Creator::new(1), Creator::new(0), &mut seeded_rng(2))
            .unwrap();
        let before = tree.len();
        let second = BranchParams {
            amount: 6,
            length: 2.0,
            ..BranchParams::default()
        };
        tree.add_branches(&second, Creator::new(2), Creator::new(1), &mut seeded_rng(3))
            .unwrap();
        assert!(tree.len() >= before);
        // Second-level forks only sit on first-level branches.
        for node in tree.nodes() {
            for &child in node.side_children() {
                if tree.nodes()[child].creator == Creator::new(2).split_origin() {
                    assert_eq!(node.creator, Creator::new(1));
                }
            }
        }
    }

    #[test]
    fn roots_on_zero_length_trunk_are_a_no_op() {
        let mut tree = trunk(0.0);
        let before = tree.clone();
        let report = tree
            .roots(&RootParams::default(), Creator::new(3), &mut seeded_rng(9))
            .unwrap();
        assert_eq!(report, GrowthReport::default());
        assert_eq!(tree, before);
    }

    #[test]
    fn roots_hang_from_the_trunk_base_as_second_child() {
        let mut tree = trunk(5.0);
        let params = RootParams {
            length: 3.0,
            ..RootParams::default()
        };
        let report = tree
            .roots(&params, Creator::new(3), &mut seeded_rng(9))
            .unwrap();

        let root = tree.require_root().unwrap();
        let stem = &tree.nodes()[root];
        assert_eq!(stem.children.len(), 2);
        let origin = &tree.nodes()[stem.children[1]];
        assert!(origin.is_branch_origin);
        assert_eq!(origin.creator.phase, Phase::RootOrigin);
        assert_eq!(origin.direction, -stem.direction);

        assert!(report.nodes_added > 0);
        for node in tree.nodes().iter().filter(|n| n.creator == Creator::new(3)) {
            assert!(!node.can_spawn_leaf);
            assert!((node.direction.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn negative_end_radius_leaves_the_tree_untouched() {
        let mut tree = trunk(10.0);
        let before = tree.clone();
        let params = BranchParams {
            end_radius: -1.0,
            ..BranchParams::default()
        };
        let result =
            tree.add_branches(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(1));
        assert!(matches!(
            result,
            Err(TreeError::InvalidParameter { name: "end_radius", .. })
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn negative_root_length_leaves_the_tree_untouched() {
        let mut tree = trunk(5.0);
        let before = tree.clone();
        let params = RootParams {
            length: -1.0,
            ..RootParams::default()
        };
        let result = tree.roots(&params, Creator::new(1), &mut seeded_rng(1));
        assert!(matches!(
            result,
            Err(TreeError::InvalidParameter { name: "length", .. })
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn composite_passes_require_a_root() {
        let mut tree = SkeletonTree::new();
        assert!(matches!(
            tree.roots(&RootParams::default(), Creator::new(1), &mut seeded_rng(1)),
            Err(TreeError::EmptyTree)
        ));
        assert!(matches!(
            tree.add_branches(
                &BranchParams::default(),
                Creator::new(1),
                Creator::new(0),
                &mut seeded_rng(1)
            ),
            Err(TreeError::EmptyTree)
        ));
    }
}
