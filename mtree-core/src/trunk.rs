use crate::{
    error::{TreeError, ensure, ensure_resolution},
    geometry::random_tangent,
    node::SkeletonNode,
    tree::SkeletonTree,
    types::Creator,
};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Remaining lengths below this fraction of a step are float drift, not
/// another segment.
const LENGTH_EPSILON: f32 = 1e-4;

/// Parameters of [`SkeletonTree::add_trunk`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrunkParams {
    /// Length along the skeleton curve.
    pub length: f32,
    /// Radius at the base.
    pub radius: f32,
    /// Radius at the top.
    pub end_radius: f32,
    /// Exponent of the radius taper.
    pub shape: f32,
    /// Segments per unit length.
    pub resolution: f32,
    /// Tangential disturbance per segment.
    pub randomness: f32,
    /// Pull back toward the vertical axis.
    pub axis_attraction: f32,
}

impl Default for TrunkParams {
    fn default() -> Self {
        Self {
            length: 25.0,
            radius: 0.5,
            end_radius: 0.0,
            shape: 1.0,
            resolution: 1.0,
            randomness: 0.1,
            axis_attraction: 0.25,
        }
    }
}

impl TrunkParams {
    pub fn validate(&self) -> Result<(), TreeError> {
        ensure_resolution(self.resolution)?;
        let length_ok = self.length.is_finite() && self.length >= 0.0;
        ensure(length_ok, "length", "must be finite and not negative")?;
        ensure(self.radius >= 0.0, "radius", "must not be negative")?;
        ensure(self.end_radius >= 0.0, "end_radius", "must not be negative")?;
        ensure(self.shape >= 0.0, "shape", "must not be negative")
    }
}

impl SkeletonTree {
    /// Replaces the skeleton with a trunk: a single chain of nodes rising
    /// from the origin.
    ///
    /// Each step moves along the previous direction by `1 / resolution`
    /// (the last step is shortened so the total length is exact). The new
    /// direction is the previous one perturbed by a random tangent, then
    /// pulled back toward the vertical axis. The radius goes from `radius`
    /// to `end_radius` following `(remaining / length)^shape`.
    pub fn add_trunk(
        &mut self,
        params: &TrunkParams,
        creator: Creator,
        rng: &mut impl Rng,
    ) -> Result<(), TreeError> {
        params.validate()?;

        let mut stem = SkeletonNode::new(Vec3::ZERO, Vec3::Z, params.radius, creator);
        stem.is_branch_origin = true;
        let mut extremity = self.set_root(stem);

        let mut remaining = params.length;
        let mut resolution = params.resolution;
        let mut segments = 0usize;
        let tolerance = LENGTH_EPSILON * (1.0 / params.resolution).min(params.length);

        while remaining > tolerance {
            if remaining < 1.0 / resolution {
                resolution = 1.0 / remaining;
            }

            let (position, previous) = {
                let node = &self.nodes()[extremity];
                (node.position, node.direction)
            };

            let tangent = random_tangent(previous, rng);
            let mut direction = previous + tangent * params.randomness / resolution;
            let lift = if direction.z.abs() > f32::EPSILON {
                1.0 / direction.z
            } else {
                0.0
            };
            direction += Vec3::new(-position.x, -position.y, lift) * params.axis_attraction;
            let direction = direction.normalize_or(previous);

            let t = if params.length > 0.0 {
                remaining / params.length
            } else {
                0.0
            };
            let radius = params.radius * t.powf(params.shape) + (1.0 - t) * params.end_radius;

            let position = position + previous / resolution;
            let node = SkeletonNode::new(position, direction, radius, creator);
            extremity = self.push_continuation(extremity, node)?;
            segments += 1;

            let next_remaining = remaining - 1.0 / resolution;
            // Once f32 can no longer shrink the remainder the trunk is done.
            if next_remaining >= remaining {
                tracing::debug!(remaining, "trunk step below float precision, stopping");
                break;
            }
            remaining = next_remaining;
        }

        tracing::debug!(creator = creator.id, segments, "built trunk");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::seeded_rng;

    fn straight(length: f32, resolution: f32) -> TrunkParams {
        TrunkParams {
            length,
            radius: 1.0,
            end_radius: 0.2,
            shape: 1.0,
            resolution,
            randomness: 0.0,
            axis_attraction: 1.0,
        }
    }

    #[test]
    fn straight_trunk_is_vertical_chain_with_linear_radius() {
        let mut tree = SkeletonTree::new();
        tree.add_trunk(&straight(10.0, 1.0), Creator::new(0), &mut seeded_rng(1))
            .unwrap();

        assert_eq!(tree.len(), 11);
        let root = tree.require_root().unwrap();
        assert!(tree.nodes()[root].is_branch_origin);
        assert_eq!(tree.nodes()[root].radius, 1.0);

        let chain: Vec<_> = tree.walk().map(|s| &tree.nodes()[s.node]).collect();
        for (k, node) in chain.iter().enumerate() {
            assert!(node.children.len() <= 1);
            assert!((node.position - Vec3::new(0.0, 0.0, k as f32)).length() < 1e-4);
            assert!((node.direction - Vec3::Z).length() < 1e-5);
            if k > 0 {
                let t = (11 - k) as f32 / 10.0;
                let expected = 1.0 * t + (1.0 - t) * 0.2;
                assert!((node.radius - expected).abs() < 1e-5, "node {k}");
            }
        }
        assert!(chain.last().unwrap().is_extremity());
    }

    #[test]
    fn last_step_is_shortened_to_exact_length() {
        let mut tree = SkeletonTree::new();
        tree.add_trunk(&straight(2.5, 1.0), Creator::new(0), &mut seeded_rng(1))
            .unwrap();
        // Steps end at 1 and 2, then a half step ends at 2.5.
        let tip = tree.walk().last().unwrap().node;
        assert_eq!(tree.len(), 4);
        assert!((tree.nodes()[tip].position.z - 2.5).abs() < 1e-4);
    }

    #[test]
    fn radius_is_monotonic_for_any_shape() {
        for shape in [0.5, 1.0, 2.0, 3.0] {
            let mut tree = SkeletonTree::new();
            let params = TrunkParams {
                shape,
                end_radius: 0.0,
                ..straight(12.0, 2.0)
            };
            tree.add_trunk(&params, Creator::new(0), &mut seeded_rng(5)).unwrap();
            let radii: Vec<f32> = tree.walk().map(|s| tree.nodes()[s.node].radius).collect();
            assert!(radii.windows(2).all(|w| w[1] <= w[0] + 1e-6), "shape {shape}");
        }
    }

    #[test]
    fn random_trunk_keeps_unit_directions_and_is_reproducible() {
        let params = TrunkParams {
            randomness: 0.4,
            axis_attraction: 0.1,
            ..TrunkParams::default()
        };
        let mut a = SkeletonTree::new();
        let mut b = SkeletonTree::new();
        a.add_trunk(&params, Creator::new(0), &mut seeded_rng(42)).unwrap();
        b.add_trunk(&params, Creator::new(0), &mut seeded_rng(42)).unwrap();
        assert_eq!(a, b);
        assert!(a.nodes().iter().all(|n| (n.direction.length() - 1.0).abs() < 1e-4));
    }

    #[test]
    fn zero_length_trunk_is_just_the_root() {
        let mut tree = SkeletonTree::new();
        tree.add_trunk(&straight(0.0, 1.0), Creator::new(0), &mut seeded_rng(1))
            .unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn tiny_trunk_still_gets_its_segment() {
        let mut tree = SkeletonTree::new();
        tree.add_trunk(&straight(1e-4, 1.0), Creator::new(0), &mut seeded_rng(1)).unwrap();
        assert_eq!(tree.len(), 2);
        let tip = tree.walk().last().unwrap().node;
        assert!((tree.nodes()[tip].position.z - 1e-4).abs() < 1e-7);
    }

    #[test]
    fn trunk_beyond_float_precision_terminates() {
        let mut tree = SkeletonTree::new();
        tree.add_trunk(&straight(1e9, 1.0), Creator::new(0), &mut seeded_rng(1)).unwrap();
        // 1e9 - 1 rounds back to 1e9, so a single segment is built.
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn invalid_resolution_is_rejected() {
        let mut tree = SkeletonTree::new();
        let err = tree
            .add_trunk(&straight(5.0, 0.0), Creator::new(0), &mut seeded_rng(1))
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidParameter { name: "resolution", .. }));
        assert!(tree.is_empty());
    }
}
