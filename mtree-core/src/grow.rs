//! Iterative growth of selected branch ends.
//!
//! Every selected extremity receives a target length from a quadratic
//! shape profile, then the pass extends branches one resolution step at a
//! time through a FIFO queue, forking with some probability, until every
//! branch reached its target or was stopped by floor avoidance.

use std::collections::VecDeque;

use crate::{
    error::{TreeError, ensure, ensure_resolution},
    geometry::{fork_position, random_tangent},
    growth_buffer::{GrowthBuffer, GrowthState},
    node::SkeletonNode,
    tree::SkeletonTree,
    types::{Creator, NodeId},
};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest growth target a candidate receives.
const MIN_GROWTH_GOAL: f32 = 0.001;
/// Gravity is applied at a tenth of its nominal strength per segment.
const GRAVITY_SCALE: f32 = 0.1;
/// Closest distance to the floor used by floor avoidance.
const MIN_FLOOR_DISTANCE: f32 = 0.01;
const FLOOR_AVOIDANCE_GAIN: f32 = 0.3;
const FLOOR_ABANDON_THRESHOLD: f32 = 0.1;

/// Parameters of [`SkeletonTree::grow`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowParams {
    pub length: f32,
    /// Length factor at branch-relative position 0.
    pub shape_start: f32,
    /// Length factor at branch-relative position 1.
    pub shape_end: f32,
    /// Bulge of the length profile at mid-branch.
    pub shape_convexity: f32,
    /// Segments per unit length.
    pub resolution: f32,
    pub randomness: f32,
    /// Probability of forking at each step.
    pub split_proba: f32,
    pub split_angle: f32,
    /// Radius of a fork relative to its parent branch.
    pub split_radius: f32,
    /// How much forks are pushed toward horizontal.
    pub split_flatten: f32,
    /// Radius at the end of growth relative to the start radius.
    pub end_radius: f32,
    pub gravity_strength: f32,
    /// Positive keeps branches above the floor, negative keeps them below.
    pub floor_avoidance: f32,
    pub can_spawn_leaf: bool,
}

impl Default for GrowParams {
    fn default() -> Self {
        Self {
            length: 7.0,
            shape_start: 1.0,
            shape_end: 1.0,
            shape_convexity: 0.3,
            resolution: 1.0,
            randomness: 0.15,
            split_proba: 0.1,
            split_angle: 0.3,
            split_radius: 0.9,
            split_flatten: 0.5,
            end_radius: 0.0,
            gravity_strength: 0.3,
            floor_avoidance: 1.0,
            can_spawn_leaf: true,
        }
    }
}

impl GrowParams {
    pub fn validate(&self) -> Result<(), TreeError> {
        ensure_resolution(self.resolution)?;
        let length_ok = self.length.is_finite() && self.length >= 0.0;
        ensure(length_ok, "length", "must be finite and not negative")?;
        ensure(self.split_radius >= 0.0, "split_radius", "must not be negative")?;
        ensure(self.end_radius >= 0.0, "end_radius", "must not be negative")
    }

    /// Length profile `y(x) = start + (end - start)·x - 4·convexity·x·(x - 1)`,
    /// with `x` the position along the parent branch.
    pub fn shape_length(&self, x: f32) -> f32 {
        -4.0 * self.shape_convexity * x * (x - 1.0)
            + x * self.shape_end
            + (1.0 - x) * self.shape_start
    }
}

/// Why a branch stopped during a growth pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// The branch grew its full target length.
    GoalReached,
    /// The next segment pointed too steeply at the floor and was abandoned.
    FloorAvoidance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Termination {
    /// Last node of the stopped branch.
    pub node: NodeId,
    pub reason: TerminationReason,
}

/// Outcome of a growth pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GrowthReport {
    pub candidates: usize,
    pub nodes_added: usize,
    pub terminations: Vec<Termination>,
}

impl GrowthReport {
    pub fn count(&self, reason: TerminationReason) -> usize {
        self.terminations.iter().filter(|t| t.reason == reason).count()
    }
}

impl SkeletonTree {
    /// Grows every extremity created by `selection`; new nodes are tagged
    /// with `creator`.
    ///
    /// The pass runs as follows:
    ///
    /// 1. Collects the extremities created by `selection`, in pre-order.
    /// 2. Gives each one a growth goal of `length` times
    ///    [`GrowParams::shape_length`] at its `position_in_branch`, and
    ///    records its radius as the radius the taper starts from.
    /// 3. Pops nodes from a FIFO queue. Each node grows one segment of
    ///    `1 / resolution` along its direction, bent by a random tangent,
    ///    gravity and floor avoidance. With probability `split_proba` a
    ///    node that is not a branch origin also grows a fork.
    /// 4. Requeues every new node until its branch has reached its goal.
    ///
    /// A branch steering too steeply into the floor is abandoned. This is
    /// recorded in the report as [`TerminationReason::FloorAvoidance`].
    ///
    /// ### Parameters
    /// - `params` - Growth parameters, validated before anything is added.
    /// - `creator` - Tag given to every new node.
    /// - `selection` - Tag of the extremities to extend.
    /// - `rng` - Source of every random draw of the pass.
    ///
    /// ### Returns
    /// A [`GrowthReport`] listing how many candidates were grown, how many
    /// nodes were added and why each branch stopped, or
    /// [`TreeError::EmptyTree`] if the tree has no root.
    pub fn grow(
        &mut self,
        params: &GrowParams,
        creator: Creator,
        selection: Creator,
        rng: &mut impl Rng,
    ) -> Result<GrowthReport, TreeError> {
        params.validate()?;
        self.require_root()?;

        let candidates = self.grow_candidates(selection);
        let step = 1.0 / params.resolution;

        let mut buffer = GrowthBuffer::with_len(self.len());
        for &id in &candidates {
            let node = &self.nodes()[id];
            let goal = (params.length * params.shape_length(node.position_in_branch))
                .max(MIN_GROWTH_GOAL);
            buffer.set(
                id,
                GrowthState {
                    growth: 0.0,
                    goal,
                    start_radius: node.radius,
                },
            );
        }

        let mut pass = GrowthPass {
            params,
            creator,
            step,
            buffer,
            queue: candidates.iter().copied().collect(),
            report: GrowthReport {
                candidates: candidates.len(),
                ..GrowthReport::default()
            },
        };
        while let Some(id) = pass.queue.pop_front() {
            pass.extend(self, id, rng)?;
        }

        let report = pass.report;
        tracing::debug!(
            creator = creator.id,
            candidates = report.candidates,
            nodes_added = report.nodes_added,
            abandoned = report.count(TerminationReason::FloorAvoidance),
            "grew branches"
        );
        Ok(report)
    }
}

/// State of one [`SkeletonTree::grow`] call.
struct GrowthPass<'a> {
    params: &'a GrowParams,
    creator: Creator,
    step: f32,
    buffer: GrowthBuffer,
    queue: VecDeque<NodeId>,
    report: GrowthReport,
}

impl GrowthPass<'_> {
    /// Extends one queued node by one segment, or two when it forks.
    fn extend(
        &mut self,
        tree: &mut SkeletonTree,
        id: NodeId,
        rng: &mut impl Rng,
    ) -> Result<(), TreeError> {
        let Some(state) = self.buffer.get(id) else {
            return Ok(());
        };
        let params = self.params;
        let (position, direction, radius, is_origin) = {
            let node = &tree.nodes()[id];
            (node.position, node.direction, node.radius, node.is_branch_origin)
        };

        // A branch origin always continues straight away; forks come later.
        let draw: f32 = rng.random();
        let children_number = if draw < params.split_proba && !is_origin {
            2
        } else {
            1
        };

        let mut tangent = random_tangent(direction, rng);
        if tangent.z < 0.0 || children_number > 1 {
            tangent.z *= 1.0 - params.split_flatten;
            tangent = tangent.normalize_or_zero();
        }

        let deviation = if children_number == 1 {
            params.randomness
        } else {
            params.split_angle
        };

        let mut continuation_position = None;
        for i in 0..children_number {
            let offset = (i as f32 - 0.5) * 2.0;
            let mut child_direction = direction.lerp(tangent * offset, deviation);
            child_direction +=
                Vec3::NEG_Z * params.gravity_strength * GRAVITY_SCALE / params.resolution;

            if params.floor_avoidance != 0.0 {
                let side = if params.floor_avoidance < 0.0 { -1.0 } else { 1.0 };
                let distance_from_floor = position.z.abs().max(MIN_FLOOR_DISTANCE);
                let toward_floor = (-child_direction.z * side).max(0.0);
                let strength = toward_floor * FLOOR_AVOIDANCE_GAIN / distance_from_floor
                    * params.floor_avoidance;

                if strength > FLOOR_ABANDON_THRESHOLD * (1.0 + params.floor_avoidance) {
                    tracing::trace!(node = id, strength, "branch abandoned near floor");
                    self.report.terminations.push(Termination {
                        node: id,
                        reason: TerminationReason::FloorAvoidance,
                    });
                    break;
                }
                child_direction += Vec3::Z * strength;
            }
            let child_direction = child_direction.normalize_or(direction);

            let child_position = match continuation_position {
                None => position + child_direction * self.step,
                Some(next) => fork_position(position, next, direction, radius, tangent),
            };

            let next_growth = state.growth + self.step;
            // Once f32 can no longer advance the counter the branch is done.
            let growth = if next_growth > state.growth {
                next_growth.min(state.goal)
            } else {
                state.goal
            };

            let progress = state.progress();
            let mut child_radius =
                state.start_radius * ((1.0 - progress) + params.end_radius * progress);
            let mut child_start_radius = state.start_radius;
            if i > 0 {
                child_radius *= params.split_radius;
                child_start_radius *= params.split_radius;
            }

            let mut child =
                SkeletonNode::new(child_position, child_direction, child_radius, self.creator);
            child.can_spawn_leaf = params.can_spawn_leaf;
            let child_id = if i == 0 {
                continuation_position = Some(child_position);
                tree.push_continuation(id, child)?
            } else {
                tree.push_branch(id, child)?
            };
            self.report.nodes_added += 1;

            self.buffer.set(
                child_id,
                GrowthState {
                    growth,
                    goal: state.goal,
                    start_radius: child_start_radius,
                },
            );
            if growth < state.goal {
                self.queue.push_back(child_id);
            } else {
                self.report.terminations.push(Termination {
                    node: child_id,
                    reason: TerminationReason::GoalReached,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::seeded_rng;
    use proptest::prelude::*;

    fn calm() -> GrowParams {
        GrowParams {
            length: 5.0,
            shape_start: 1.0,
            shape_end: 1.0,
            shape_convexity: 0.0,
            resolution: 1.0,
            randomness: 0.0,
            split_proba: 0.0,
            split_angle: 0.3,
            split_radius: 0.9,
            split_flatten: 0.0,
            end_radius: 0.0,
            gravity_strength: 0.0,
            floor_avoidance: 0.0,
            can_spawn_leaf: true,
        }
    }

    fn seed_tree(position: Vec3, direction: Vec3) -> SkeletonTree {
        let mut tree = SkeletonTree::new();
        tree.set_root(SkeletonNode::new(position, direction, 1.0, Creator::new(0)));
        tree
    }

    #[test]
    fn shape_length_interpolates_with_convexity() {
        let p = GrowParams {
            shape_start: 1.0,
            shape_end: 3.0,
            shape_convexity: 0.5,
            ..calm()
        };
        assert_eq!(p.shape_length(0.0), 1.0);
        assert_eq!(p.shape_length(1.0), 3.0);
        assert!((p.shape_length(0.5) - (2.0 + 0.5)).abs() < 1e-6);
    }

    #[test]
    fn straight_growth_reaches_goal_with_tapered_radius() {
        let mut tree = seed_tree(Vec3::ZERO, Vec3::Z);
        let report = tree
            .grow(&calm(), Creator::new(1), Creator::new(0), &mut seeded_rng(2))
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.nodes_added, 5);
        assert_eq!(report.count(TerminationReason::GoalReached), 1);
        assert_eq!(tree.len(), 6);

        let chain: Vec<_> = tree.walk().skip(1).map(|s| &tree.nodes()[s.node]).collect();
        let expected = [1.0, 0.8, 0.6, 0.4, 0.2];
        for (k, (node, r)) in chain.iter().zip(expected).enumerate() {
            assert_eq!(node.creator, Creator::new(1));
            assert!((node.position.z - (k + 1) as f32).abs() < 1e-5);
            assert!((node.radius - r).abs() < 1e-5, "segment {k}");
        }
    }

    /// Nodes of the continuation chain starting below `id`.
    fn chain_below(tree: &SkeletonTree, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(next) = tree.nodes()[current].continuation() {
            chain.push(next);
            current = next;
        }
        chain
    }

    #[test]
    fn growth_goal_follows_the_shape_profile() {
        let mut tree = SkeletonTree::new();
        let root = tree.set_root(SkeletonNode::new(Vec3::ZERO, Vec3::Z, 1.0, Creator::new(5)));
        let mut low = SkeletonNode::new(Vec3::Z, Vec3::Z, 1.0, Creator::new(0));
        low.position_in_branch = 0.0;
        let low = tree.push_continuation(root, low).unwrap();
        let mut high = SkeletonNode::new(Vec3::X, Vec3::X, 1.0, Creator::new(0));
        high.position_in_branch = 1.0;
        let high = tree.push_branch(root, high).unwrap();

        let params = GrowParams {
            length: 2.0,
            shape_start: 1.0,
            shape_end: 3.0,
            ..calm()
        };
        tree.grow(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(3)).unwrap();

        for (start, x) in [(low, 0.0), (high, 1.0)] {
            let goal = params.length * params.shape_length(x);
            let chain = chain_below(&tree, start);
            let tip = chain[chain.len() - 1];
            let grown = tree.nodes()[start].position.distance(tree.nodes()[tip].position);
            assert!((grown - goal).abs() <= 1.0 / params.resolution, "x = {x}");
            assert_eq!(chain.len(), goal as usize);
        }
    }

    #[test]
    fn negative_end_radius_is_rejected() {
        let mut tree = seed_tree(Vec3::ZERO, Vec3::Z);
        let params = GrowParams {
            end_radius: -1.0,
            ..calm()
        };
        let err = tree
            .grow(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(1))
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidParameter { name: "end_radius", .. }));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn only_selected_extremities_grow() {
        let mut tree = seed_tree(Vec3::ZERO, Vec3::Z);
        let report = tree
            .grow(&calm(), Creator::new(1), Creator::new(7), &mut seeded_rng(2))
            .unwrap();
        assert_eq!(report.candidates, 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn certain_split_forks_every_non_origin_node() {
        let mut tree = seed_tree(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        let params = GrowParams {
            split_proba: 1.0,
            length: 2.0,
            ..calm()
        };
        tree.grow(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(9))
            .unwrap();

        let root = tree.require_root().unwrap();
        let root_node = &tree.nodes()[root];
        assert_eq!(root_node.children.len(), 2);
        let fork = &tree.nodes()[root_node.children[1]];
        assert!(fork.is_branch_origin);
        assert!((fork.radius - 0.9).abs() < 1e-5);
        // The fork starts halfway along the first segment, one radius off axis.
        let first = &tree.nodes()[root_node.children[0]];
        let offset = fork.position - (root_node.position + first.position) / 2.0;
        assert!((offset.length() - 1.0).abs() < 1e-4);
        assert!(offset.dot(Vec3::Z).abs() < 1e-4);
        // Forks are origins, so they only continue.
        assert_eq!(fork.children.len(), 1);
    }

    #[test]
    fn floor_avoidance_abandons_branch_heading_into_floor() {
        let mut tree = seed_tree(Vec3::new(0.0, 0.0, 0.5), Vec3::NEG_Z);
        let params = GrowParams {
            floor_avoidance: 1.0,
            ..calm()
        };
        let report = tree
            .grow(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(4))
            .unwrap();
        assert_eq!(report.nodes_added, 0);
        assert_eq!(
            report.terminations,
            vec![Termination {
                node: 0,
                reason: TerminationReason::FloorAvoidance
            }]
        );
    }

    #[test]
    fn inverted_floor_avoidance_never_abandons() {
        let mut tree = seed_tree(Vec3::new(0.0, 0.0, -0.5), Vec3::NEG_Z);
        let params = GrowParams {
            floor_avoidance: -1.0,
            ..calm()
        };
        let report = tree
            .grow(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(4))
            .unwrap();
        assert_eq!(report.count(TerminationReason::FloorAvoidance), 0);
        assert_eq!(report.nodes_added, 5);
    }

    #[test]
    fn grow_on_empty_tree_is_invalid_state() {
        let mut tree = SkeletonTree::new();
        let err = tree
            .grow(&calm(), Creator::new(1), Creator::new(0), &mut seeded_rng(1))
            .unwrap_err();
        assert!(matches!(err, TreeError::EmptyTree));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn growth_is_deterministic_and_keeps_invariants(
            seed in any::<u64>(),
            split_proba in 0.0f32..0.6,
            randomness in 0.0f32..0.8,
            gravity in -1.0f32..1.0,
        ) {
            let params = GrowParams {
                length: 4.0,
                resolution: 2.0,
                split_proba,
                randomness,
                gravity_strength: gravity,
                floor_avoidance: 1.0,
                ..calm()
            };
            let run = || {
                let mut tree = seed_tree(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
                let report = tree
                    .grow(&params, Creator::new(1), Creator::new(0), &mut seeded_rng(seed))
                    .unwrap();
                (tree, report)
            };
            let (a, report) = run();
            let (b, _) = run();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(report.nodes_added + 1, a.len());

            for node in a.nodes() {
                prop_assert!((node.direction.length() - 1.0).abs() < 1e-4);
                if let Some(first) = node.continuation() {
                    prop_assert!(!a.nodes()[first].is_branch_origin);
                }
                if node.children.len() > 1 {
                    prop_assert!(!node.is_branch_origin);
                }
            }
        }
    }
}
