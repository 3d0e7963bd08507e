//! Serializable sequences of growth operations.
//!
//! A recipe is a list of steps run in order on one skeleton. Step `i`
//! tags its nodes with creator id `i` and extends the nodes created by the
//! step named in its `input` (step 0 when omitted). Every step reseeds the
//! generator, so editing one step leaves the random draws of the others
//! untouched.
//!
//! Recipes are stored as RON:
//!
//! ```ron
//! (
//!     steps: [
//!         (seed: 1, operation: Trunk((length: 10.0))),
//!         (seed: 2, input: Some(0), operation: Branches((amount: 8))),
//!     ],
//! )
//! ```

use std::path::Path;

use crate::{
    branches::{BranchParams, RootParams},
    error::TreeError,
    grow::GrowParams,
    split::SplitParams,
    tree::SkeletonTree,
    trunk::TrunkParams,
    types::{Creator, seeded_rng},
};
use serde::{Deserialize, Serialize};

/// One operation of a recipe with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Trunk(TrunkParams),
    Branches(BranchParams),
    Split(SplitParams),
    Grow(GrowParams),
    Roots(RootParams),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Trunk(_) => "trunk",
            Operation::Branches(_) => "branches",
            Operation::Split(_) => "split",
            Operation::Grow(_) => "grow",
            Operation::Roots(_) => "roots",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub seed: u64,
    /// Step whose nodes this one extends; step 0 when `None`.
    #[serde(default)]
    pub input: Option<usize>,
    pub operation: Operation,
}

impl RecipeStep {
    pub fn new(seed: u64, input: Option<usize>, operation: Operation) -> Self {
        Self {
            seed,
            input,
            operation,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub steps: Vec<RecipeStep>,
}

impl Default for Recipe {
    /// A trunk, two levels of branches and roots.
    fn default() -> Self {
        Self {
            steps: vec![
                RecipeStep::new(1, None, Operation::Trunk(TrunkParams::default())),
                RecipeStep::new(1, Some(0), Operation::Branches(BranchParams::default())),
                RecipeStep::new(
                    1,
                    Some(1),
                    Operation::Branches(BranchParams {
                        amount: 60,
                        length: 3.0,
                        start: 0.2,
                        ..BranchParams::default()
                    }),
                ),
                RecipeStep::new(1, None, Operation::Roots(RootParams::default())),
            ],
        }
    }
}

impl Recipe {
    pub fn from_ron_str(source: &str) -> Result<Self, TreeError> {
        ron::from_str(source).map_err(TreeError::RecipeParse)
    }

    pub fn to_ron_string(&self) -> Result<String, TreeError> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(4);
        ron::ser::to_string_pretty(self, pretty).map_err(TreeError::RecipeSerialize)
    }

    /// Reads a recipe from a RON file.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let contents = std::fs::read_to_string(path).map_err(TreeError::RecipeRead)?;
        let recipe = Self::from_ron_str(&contents)?;
        tracing::info!(path = %path.display(), steps = recipe.steps.len(), "loaded recipe");
        Ok(recipe)
    }

    /// Writes the recipe as RON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), TreeError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(TreeError::RecipeWrite)?;
        }
        let serialized = self.to_ron_string()?;
        std::fs::write(path, serialized).map_err(TreeError::RecipeWrite)
    }

    /// Runs every step on a fresh skeleton.
    ///
    /// The first step has to build a root, so it is normally a trunk;
    /// anything else fails with [`TreeError::EmptyTree`].
    pub fn evaluate(&self) -> Result<SkeletonTree, TreeError> {
        let mut tree = SkeletonTree::new();
        for (index, step) in self.steps.iter().enumerate() {
            let input = step.input.unwrap_or(0);
            if step.input.is_some() && input >= index {
                return Err(TreeError::InvalidRecipeInput { step: index, input });
            }
            let creator = Creator::new(creator_id(index)?);
            let selection = Creator::new(creator_id(input)?);
            let mut rng = seeded_rng(step.seed);

            let before = tree.len();
            match &step.operation {
                Operation::Trunk(params) => tree.add_trunk(params, creator, &mut rng)?,
                Operation::Branches(params) => {
                    tree.add_branches(params, creator, selection, &mut rng)?;
                }
                Operation::Split(params) => {
                    tree.split(params, creator, selection, &mut rng)?;
                }
                Operation::Grow(params) => {
                    tree.grow(params, creator, selection, &mut rng)?;
                }
                Operation::Roots(params) => {
                    tree.roots(params, creator, &mut rng)?;
                }
            }
            tracing::debug!(
                step = index,
                operation = step.operation.name(),
                nodes_added = tree.len().saturating_sub(before),
                "evaluated recipe step"
            );
        }
        Ok(tree)
    }
}

fn creator_id(step: usize) -> Result<i32, TreeError> {
    i32::try_from(step).map_err(|_| TreeError::InvalidParameter {
        name: "steps",
        reason: "too many recipe steps",
    })
}
