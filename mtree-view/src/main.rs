//! Application entry point for the tree skeleton viewer.
//!
//! This binary sets up logging and eframe/egui, then delegates all
//! interactive logic and rendering to [`Viewer`] from the `viewer` module.

mod viewer;

use std::path::PathBuf;

use mtree_core::Recipe;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use viewer::Viewer;

const DEFAULT_LOG_FILTER: &str = "info,mtree_core=debug";

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

/// Starts the native eframe application.
///
/// The first command line argument, if any, is a RON recipe file. Without
/// it, or if it cannot be read, the default recipe is shown.
fn main() -> eframe::Result<()> {
    init_logging();

    let recipe_path = std::env::args_os().nth(1).map(PathBuf::from);
    let recipe = match recipe_path.as_deref().map(Recipe::load) {
        Some(Ok(recipe)) => recipe,
        Some(Err(err)) => {
            tracing::error!(%err, "falling back to the default recipe");
            Recipe::default()
        }
        None => Recipe::default(),
    };

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Tree Skeleton",
        options,
        Box::new(move |_cc| Ok(Box::new(Viewer::new(recipe, recipe_path)))),
    )
}
