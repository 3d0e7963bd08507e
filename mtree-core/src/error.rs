//! Error types for skeleton operations.

use crate::types::NodeId;

/// Errors returned by tree operations and recipe handling.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The operation needs a root node, but no trunk was built or imported.
    #[error("operation requires a tree with a root node")]
    EmptyTree,

    /// A parameter would make the operation loop forever or divide by zero.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },

    /// Tried to append a continuation to a node that already has one.
    #[error("node {parent} already has a continuation child")]
    ContinuationExists { parent: NodeId },

    /// Tried to start a side branch on a node without a continuation child.
    #[error("node {parent} has no continuation child to branch from")]
    MissingContinuation { parent: NodeId },

    /// Stroke data or a split descriptor cannot be turned into a skeleton.
    #[error("invalid stroke {index}: {reason}")]
    InvalidStroke { index: usize, reason: &'static str },

    /// A recipe step reads from a step that does not run before it.
    #[error("recipe step {step} reads from step {input}, which does not run before it")]
    InvalidRecipeInput { step: usize, input: usize },

    /// Failed to read a recipe file from disk.
    #[error("failed to read recipe: {0}")]
    RecipeRead(#[source] std::io::Error),

    /// Failed to write a recipe file to disk.
    #[error("failed to write recipe: {0}")]
    RecipeWrite(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse recipe: {0}")]
    RecipeParse(#[source] ron::error::SpannedError),

    /// Failed to serialize a recipe to RON.
    #[error("failed to serialize recipe: {0}")]
    RecipeSerialize(#[source] ron::Error),
}

/// Returns [`TreeError::InvalidParameter`] unless `ok` holds.
pub(crate) fn ensure(ok: bool, name: &'static str, reason: &'static str) -> Result<(), TreeError> {
    if ok {
        Ok(())
    } else {
        Err(TreeError::InvalidParameter { name, reason })
    }
}

/// Checks a resolution (segments per unit length) used as a step divisor.
pub(crate) fn ensure_resolution(resolution: f32) -> Result<(), TreeError> {
    ensure(
        resolution.is_finite() && resolution > 0.0,
        "resolution",
        "must be a positive finite number",
    )
}
