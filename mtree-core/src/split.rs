use std::f32::consts::TAU;

use crate::{
    error::{TreeError, ensure},
    geometry::{fork_position, random_tangent},
    node::SkeletonNode,
    tree::SkeletonTree,
    types::Creator,
};
use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of [`SkeletonTree::split`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    /// Number of split sites requested.
    pub amount: usize,
    /// Fork angle, as a lerp factor toward the fork tangent.
    pub angle: f32,
    /// Largest number of forks at one site.
    pub max_split_number: u32,
    /// Fork radius relative to the split node.
    pub radius: f32,
    /// Window of branch-relative positions eligible for splitting.
    pub start: f32,
    pub end: f32,
    /// How much fork tangents are pushed toward horizontal.
    pub flatten: f32,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            amount: 20,
            angle: 0.6,
            max_split_number: 3,
            radius: 0.6,
            start: 0.3,
            end: 1.0,
            flatten: 0.0,
        }
    }
}

impl SplitParams {
    pub fn validate(&self) -> Result<(), TreeError> {
        let forks_ok = self.max_split_number >= 1;
        ensure(forks_ok, "max_split_number", "must allow at least one fork")?;
        ensure(self.radius >= 0.0, "radius", "must not be negative")
    }
}

impl SkeletonTree {
    /// Forks the skeleton at randomly sampled sites.
    ///
    /// For each site:
    ///
    /// 1. Draws the site without replacement from the single-child,
    ///    non-origin nodes created by `selection` whose branch position
    ///    lies in the `start..end` window. Asking for more sites than exist
    ///    processes all of them.
    /// 2. Draws between one and `max_split_number` forks.
    /// 3. Picks a random tangent, flattened toward horizontal by `flatten`,
    ///    and rotates it evenly around the node direction for each fork.
    /// 4. Adds each fork as a side branch, opening less toward the end of
    ///    the window and sized `radius` times the site radius.
    ///
    /// ### Parameters
    /// - `params` - Split parameters, validated before anything is added.
    /// - `creator` - Tag given to every fork.
    /// - `selection` - Tag of the nodes eligible as sites.
    /// - `rng` - Source of the site, fork count and tangent draws.
    ///
    /// ### Returns
    /// The number of sites split, or [`TreeError::EmptyTree`] if the tree
    /// has no root.
    pub fn split(
        &mut self,
        params: &SplitParams,
        creator: Creator,
        selection: Creator,
        rng: &mut impl Rng,
    ) -> Result<usize, TreeError> {
        params.validate()?;
        self.require_root()?;

        self.set_positions_in_branches();
        let candidates = self.split_candidates(selection, params.start, params.end);
        let amount = params.amount.min(candidates.len());
        if amount < params.amount {
            tracing::debug!(
                requested = params.amount,
                available = candidates.len(),
                "clamped split sites"
            );
        }

        let picked = rand::seq::index::sample(rng, candidates.len(), amount);
        for index in picked.iter() {
            let (id, t) = candidates[index];
            let forks = rng.random_range(1..=params.max_split_number);

            let (position, direction, radius, next_position) = {
                let node = &self.nodes()[id];
                let next = node
                    .continuation()
                    .ok_or(TreeError::MissingContinuation { parent: id })?;
                (
                    node.position,
                    node.direction,
                    node.radius,
                    self.nodes()[next].position,
                )
            };

            let tangent = random_tangent(direction, rng);
            let flat = Vec3::new(tangent.x, tangent.y, 0.0);
            let mut tangent = tangent.lerp(flat, params.flatten).normalize_or_zero();
            let rotation = Quat::from_axis_angle(direction, TAU / forks as f32);

            for _ in 0..forks {
                let fork_direction = direction
                    .lerp(tangent, params.angle * (1.0 - t / 2.0))
                    .normalize_or(direction);
                let mut fork = SkeletonNode::new(
                    fork_position(position, next_position, direction, radius, tangent),
                    fork_direction,
                    radius * params.radius,
                    creator,
                );
                fork.position_in_branch = t;
                fork.can_spawn_leaf = false;
                self.push_branch(id, fork)?;
                tangent = rotation * tangent;
            }
        }

        tracing::debug!(creator = creator.id, sites = amount, "split branches");
        Ok(amount)
    }
}
