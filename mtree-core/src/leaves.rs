//! Leaf candidate extraction and oriented leaf placements.

use crate::{error::TreeError, tree::SkeletonTree};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A spot on the skeleton where a leaf may be attached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeafCandidate {
    pub position: Vec3,
    /// Node direction at an extremity, otherwise the unit vector toward
    /// the continuation.
    pub direction: Vec3,
    /// Length of the segment starting at `position`; at an extremity, the
    /// length of the node direction.
    pub length: f32,
    pub radius: f32,
    pub is_extremity: bool,
}

impl LeafCandidate {
    /// `count` candidates spread evenly inside the segment, excluding its
    /// end points.
    fn interpolate(&self, count: usize) -> impl Iterator<Item = LeafCandidate> + '_ {
        (0..count).map(move |i| LeafCandidate {
            position: self.position
                + self.direction * self.length * (i + 1) as f32 / (count + 2) as f32,
            ..*self
        })
    }
}

/// Parameters of [`SkeletonTree::leaf_placements`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafParams {
    /// Number of leaves requested; ignored with `extremity_only`.
    pub number: usize,
    /// Downward pull applied to side leaves.
    pub weight: f32,
    /// Only nodes at most this thick carry leaves.
    pub max_radius: f32,
    /// Lean of side leaves away from their segment.
    pub spread: f32,
    /// How much the vertical component of side leaves is removed.
    pub flatten: f32,
    pub extremity_only: bool,
}

impl Default for LeafParams {
    fn default() -> Self {
        Self {
            number: 500,
            weight: 0.2,
            max_radius: 0.1,
            spread: 0.2,
            flatten: 0.2,
            extremity_only: false,
        }
    }
}

/// An oriented frame for one leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeafPlacement {
    pub position: Vec3,
    pub direction: Vec3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub is_extremity: bool,
}

impl SkeletonTree {
    /// Every node thin enough and allowed to spawn a leaf, in pre-order.
    pub fn leaf_candidates(&self, max_radius: f32) -> Result<Vec<LeafCandidate>, TreeError> {
        self.require_root()?;
        let nodes = self.nodes();
        let candidates = self
            .walk()
            .map(|step| &nodes[step.node])
            .filter(|node| node.radius <= max_radius && node.can_spawn_leaf)
            .map(|node| {
                let (direction, length) = match node.continuation() {
                    None => (node.direction, node.direction.length()),
                    Some(next) => {
                        let toward = nodes[next].position - node.position;
                        let length = toward.length();
                        let direction = if length != 0.0 { toward / length } else { toward };
                        (direction, length)
                    }
                };
                LeafCandidate {
                    position: node.position,
                    direction,
                    length,
                    radius: node.radius,
                    is_extremity: node.is_extremity(),
                }
            })
            .collect();
        Ok(candidates)
    }

    /// Picks `number` leaf candidates.
    ///
    /// If more are requested than the skeleton offers, extra candidates are
    /// interpolated along the inner segments first; extremities never
    /// produce extra candidates. When that pool is empty fewer than
    /// `number` are returned. With `extremity_only`, every extremity is
    /// returned and `number` is ignored.
    pub fn sample_leaf_candidates(
        &self,
        number: usize,
        max_radius: f32,
        extremity_only: bool,
        rng: &mut impl Rng,
    ) -> Result<Vec<LeafCandidate>, TreeError> {
        let mut candidates = self.leaf_candidates(max_radius)?;
        if extremity_only {
            candidates.retain(|c| c.is_extremity);
            return Ok(candidates);
        }

        if number > candidates.len() {
            let inner = candidates.iter().filter(|c| !c.is_extremity).count();
            if inner == 0 {
                tracing::warn!(
                    requested = number,
                    available = candidates.len(),
                    "no inner segments to place extra leaves on"
                );
            } else {
                let factor = number / inner;
                let extra: Vec<LeafCandidate> = candidates
                    .iter()
                    .filter(|c| !c.is_extremity)
                    .flat_map(|c| c.interpolate(factor))
                    .collect();
                candidates.extend(extra);
            }
        }

        let amount = number.min(candidates.len());
        let picked = rand::seq::index::sample(rng, candidates.len(), amount);
        Ok(picked.iter().map(|i| candidates[i]).collect())
    }

    /// Samples leaf candidates and orients a frame for each.
    ///
    /// Extremity leaves keep the branch direction. Side leaves lean toward
    /// a horizontal tangent of random sign, are flattened and pulled down
    /// by `weight`.
    pub fn leaf_placements(
        &self,
        params: &LeafParams,
        rng: &mut impl Rng,
    ) -> Result<Vec<LeafPlacement>, TreeError> {
        let candidates = self.sample_leaf_candidates(
            params.number,
            params.max_radius,
            params.extremity_only,
            rng,
        )?;

        let placements: Vec<LeafPlacement> = candidates
            .into_iter()
            .map(|c| {
                let fallback = c.direction.normalize_or(Vec3::Z);
                let mut direction = fallback;
                if !c.is_extremity {
                    let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
                    let tangent = Vec3::Z.cross(direction).normalize_or_zero() * sign;
                    direction = direction.lerp(tangent, params.spread);
                    direction.z *= 1.0 - params.flatten;
                    direction.z -= params.weight;
                    direction = direction.normalize_or(fallback);
                }
                let x_axis = direction.any_orthonormal_vector();
                LeafPlacement {
                    position: c.position,
                    direction,
                    x_axis,
                    y_axis: direction.cross(x_axis),
                    is_extremity: c.is_extremity,
                }
            })
            .collect();

        tracing::debug!(leaves = placements.len(), "placed leaves");
        Ok(placements)
    }
}
