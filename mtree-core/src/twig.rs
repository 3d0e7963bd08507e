use crate::{
    branches::BranchParams,
    error::{TreeError, ensure, ensure_resolution},
    grow::GrowParams,
    leaves::LeafCandidate,
    node::SkeletonNode,
    tree::SkeletonTree,
    types::Creator,
};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of [`SkeletonTree::twig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwigParams {
    /// Largest radius of a node carrying a leaf; the stem starts at a tenth of it.
    pub radius: f32,
    pub length: f32,
    /// Number of side twigs.
    pub branch_number: usize,
    pub randomness: f32,
    pub resolution: f32,
    pub gravity_strength: f32,
    pub flatten: f32,
}

impl Default for TwigParams {
    fn default() -> Self {
        Self {
            radius: 0.15,
            length: 3.0,
            branch_number: 6,
            randomness: 0.7,
            resolution: 8.0,
            gravity_strength: 4.0,
            flatten: 0.6,
        }
    }
}

impl TwigParams {
    pub fn validate(&self) -> Result<(), TreeError> {
        ensure_resolution(self.resolution)?;
        ensure(self.radius > 0.0, "radius", "must be positive")?;
        let length_ok = self.length.is_finite() && self.length >= 0.0;
        ensure(length_ok, "length", "must be finite and not negative")
    }

    fn stem_params(&self) -> GrowParams {
        GrowParams {
            length: 1.0,
            shape_start: 1.0,
            shape_end: 1.0,
            shape_convexity: 0.0,
            resolution: self.resolution,
            randomness: self.randomness / 2.0 / self.resolution,
            split_proba: 0.0,
            split_angle: 0.2,
            split_radius: 0.0,
            split_flatten: 0.0,
            end_radius: 0.0,
            gravity_strength: 0.1,
            floor_avoidance: 0.0,
            can_spawn_leaf: true,
        }
    }

    fn branch_params(&self) -> BranchParams {
        BranchParams {
            amount: self.branch_number,
            angle: 0.5,
            max_split_number: 2,
            radius: 0.7,
            end_radius: 0.1,
            start: 0.0,
            length: self.length * 0.7,
            shape_start: 0.5,
            shape_end: 0.5,
            shape_convexity: 0.0,
            resolution: self.resolution,
            randomness: self.randomness / self.resolution,
            split_proba: 0.1 / self.resolution,
            split_flatten: self.flatten,
            gravity_strength: self.gravity_strength / self.resolution,
            floor_avoidance: 0.0,
            can_spawn_leaf: true,
        }
    }
}

/// A small leafy branch built by [`SkeletonTree::twig`].
#[derive(Clone, Debug)]
pub struct Twig {
    pub tree: SkeletonTree,
    /// Branch ends thin enough to carry a leaf.
    pub leaves: Vec<LeafCandidate>,
}

impl SkeletonTree {
    /// Builds a twig: a horizontal stem along +x grown by one unit, then
    /// one branching pass over it.
    pub fn twig(params: &TwigParams, rng: &mut impl Rng) -> Result<Twig, TreeError> {
        params.validate()?;

        let mut tree = SkeletonTree::new();
        tree.set_root(SkeletonNode::new(
            Vec3::ZERO,
            Vec3::X,
            params.radius * 0.1,
            Creator::new(0),
        ));
        tree.grow(&params.stem_params(), Creator::new(1), Creator::new(0), rng)?;
        tree.add_branches(&params.branch_params(), Creator::new(2), Creator::new(1), rng)?;

        let mut leaves = tree.leaf_candidates(params.radius)?;
        leaves.retain(|c| c.is_extremity);
        tracing::debug!(nodes = tree.len(), leaves = leaves.len(), "built twig");
        Ok(Twig { tree, leaves })
    }
}
