use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Identifier for a node in a [`crate::tree::SkeletonTree`].
///
/// This is an index into the tree's node arena, and is only meaningful
/// within the lifetime of a given `SkeletonTree` instance.
pub type NodeId = usize;

/// Random number generator used by every growth operation.
///
/// ChaCha8 produces the same stream on every platform, so a seed plus a
/// set of parameters always reproduces the same skeleton.
pub type TreeRng = rand_chacha::ChaCha8Rng;

/// Creates the generator for one top-level operation.
pub fn seeded_rng(seed: u64) -> TreeRng {
    TreeRng::seed_from_u64(seed)
}

/// Which part of an operation produced a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Regular output of the operation (trunk, grown segments).
    #[default]
    Primary,
    /// Fork points created by the split half of a branching pass.
    SplitOrigin,
    /// The single node that seeds root growth below the trunk base.
    RootOrigin,
}

/// Tag linking a node to the operation that created it.
///
/// Later operations select the nodes they extend by comparing tags, so
/// the phase keeps split origins and root origins apart from the regular
/// output of the same operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Creator {
    pub id: i32,
    pub phase: Phase,
}

impl Creator {
    pub const fn new(id: i32) -> Self {
        Self {
            id,
            phase: Phase::Primary,
        }
    }

    /// The same operation, tagged as the origin of its split forks.
    pub const fn split_origin(self) -> Self {
        Self {
            id: self.id,
            phase: Phase::SplitOrigin,
        }
    }

    /// The same operation, tagged as the origin of its roots.
    pub const fn root_origin(self) -> Self {
        Self {
            id: self.id,
            phase: Phase::RootOrigin,
        }
    }
}
