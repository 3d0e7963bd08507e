//! Procedural tree skeleton growth.
//!
//! Main components:
//! - [`tree`]: the node arena, traversal and candidate selection.
//! - [`trunk`], [`grow`], [`split`], [`branches`]: growth operations.
//! - [`leaves`], [`armature`], [`polyline`]: data extracted for leaf
//!   scattering, rigging and meshing.
//! - [`stroke`]: skeleton import from drawn strokes.
//! - [`twig`]: small leafy branches.
//! - [`recipe`]: RON-serializable sequences of operations.
//! - [`types`]: shared type aliases, creator tags and the seeded RNG.

pub mod armature;
pub mod branches;
pub mod error;
pub mod geometry;
pub mod grow;
pub mod growth_buffer;
pub mod leaves;
pub mod node;
pub mod polyline;
pub mod recipe;
pub mod split;
pub mod stroke;
pub mod tree;
pub mod trunk;
pub mod twig;
pub mod types;

pub use error::TreeError;
pub use node::SkeletonNode;
pub use recipe::{Operation, Recipe, RecipeStep};
pub use tree::SkeletonTree;
pub use types::{Creator, NodeId, Phase, TreeRng, seeded_rng};
