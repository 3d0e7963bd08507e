//! Interactive side view of a tree skeleton built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns a [`Recipe`], the skeleton
//! it evaluates to and the data extracted from it, and implements
//! [`eframe::App`] to edit the recipe and draw the result projected on
//! the x/z plane.

use std::{ops::RangeInclusive, path::PathBuf};

use eframe::App;
use glam::{Vec2, Vec3};
use mtree_core::{
    Operation, Phase, Recipe, RecipeStep, SkeletonTree,
    armature::Armature,
    branches::BranchParams,
    leaves::{LeafParams, LeafPlacement},
    seeded_rng,
};

/// Radius under which nodes stop producing bones.
const DEFAULT_BONE_RADIUS: f32 = 0.05;

/// Main application state for the viewer.
///
/// ### Fields
/// - `recipe` - Steps being edited; the skeleton is rebuilt from it.
/// - `recipe_path` - File the recipe was loaded from, used by "Save".
/// - `tree` - Last successfully evaluated skeleton.
/// - `armature` - Bones reduced from `tree`.
/// - `leaves` - Leaf frames sampled on `tree`.
/// - `last_error` - Message of the last failed evaluation, if any.
///
/// - `auto_regenerate` - Rebuild as soon as a parameter changes.
/// - `zoom` - Pixels per world unit.
/// - `pan` - Screen-space pan offset in pixels.
pub struct Viewer {
    recipe: Recipe,
    recipe_path: Option<PathBuf>,
    tree: SkeletonTree,
    armature: Armature,
    leaves: Vec<LeafPlacement>,
    last_error: Option<String>,

    leaf_params: LeafParams,
    leaf_seed: u64,
    bone_radius: f32,

    auto_regenerate: bool,
    show_leaves: bool,
    show_bones: bool,
    zoom: f32,
    pan: egui::Vec2,
}

impl Viewer {
    /// Creates a viewer for `recipe` and evaluates it once.
    pub fn new(recipe: Recipe, recipe_path: Option<PathBuf>) -> Self {
        let mut viewer = Self {
            recipe,
            recipe_path,
            tree: SkeletonTree::new(),
            armature: Armature::default(),
            leaves: Vec::new(),
            last_error: None,
            leaf_params: LeafParams::default(),
            leaf_seed: 1,
            bone_radius: DEFAULT_BONE_RADIUS,
            auto_regenerate: true,
            show_leaves: true,
            show_bones: false,
            zoom: 12.0,
            pan: egui::vec2(0.0, 200.0),
        };
        viewer.regenerate();
        viewer
    }

    /// Evaluates the recipe and refreshes the extracted data.
    ///
    /// On failure the previous skeleton stays on screen and the error is
    /// shown in the status bar.
    fn regenerate(&mut self) {
        let result = self.recipe.evaluate().and_then(|mut tree| {
            let armature = tree.armature_data(self.bone_radius)?;
            let leaves = tree.leaf_placements(&self.leaf_params, &mut seeded_rng(self.leaf_seed))?;
            Ok((tree, armature, leaves))
        });

        match result {
            Ok((tree, armature, leaves)) => {
                self.tree = tree;
                self.armature = armature;
                self.leaves = leaves;
                self.last_error = None;
            }
            Err(err) => {
                tracing::warn!(%err, "recipe evaluation failed");
                self.last_error = Some(err.to_string());
            }
        }
    }

    /// Restores the default recipe and camera.
    fn reset(&mut self) {
        self.recipe = Recipe::default();
        self.leaf_params = LeafParams::default();
        self.leaf_seed = 1;
        self.bone_radius = DEFAULT_BONE_RADIUS;
        self.zoom = 12.0;
        self.pan = egui::vec2(0.0, 200.0);
        self.regenerate();
    }

    fn save(&mut self) {
        let Some(path) = &self.recipe_path else {
            return;
        };
        match self.recipe.save(path) {
            Ok(()) => tracing::info!(path = %path.display(), "saved recipe"),
            Err(err) => self.last_error = Some(err.to_string()),
        }
    }

    /// Side view: x to the right, z up.
    fn project(p: Vec3) -> Vec2 {
        Vec2::new(p.x, p.z)
    }

    /// Converts a world-space position to screen-space.
    ///
    /// World coordinates are scaled by `zoom`, offset by `pan`, and then
    /// centered inside the given `rect`. The y-axis is flipped so that
    /// positive y goes up in world space.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        egui::pos2(
            center.x + p.x * self.zoom + self.pan.x,
            center.y - p.y * self.zoom + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`].
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (center.y - p.y + self.pan.y) / self.zoom;
        Vec2::new(x, y)
    }

    /// Labeled [`egui::DragValue`]; returns `true` if the value changed.
    fn labeled_drag<N: egui::emath::Numeric>(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut N,
        range: RangeInclusive<N>,
        speed: f64,
    ) -> bool {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed))
                .changed()
        })
        .inner
    }

    /// Parameter widgets for one operation; returns `true` if any changed.
    fn operation_ui(ui: &mut egui::Ui, operation: &mut Operation) -> bool {
        let mut changed = false;
        match operation {
            Operation::Trunk(p) => {
                changed |= Self::labeled_drag(ui, "length:", &mut p.length, 0.0..=100.0, 0.1);
                changed |= Self::labeled_drag(ui, "radius:", &mut p.radius, 0.0..=5.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "end_radius:", &mut p.end_radius, 0.0..=5.0, 0.01);
                changed |= Self::labeled_drag(ui, "shape:", &mut p.shape, 0.0..=5.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "resolution:", &mut p.resolution, 0.1..=10.0, 0.05);
                changed |=
                    Self::labeled_drag(ui, "randomness:", &mut p.randomness, 0.0..=2.0, 0.01);
                changed |= Self::labeled_drag(
                    ui,
                    "axis_attraction:",
                    &mut p.axis_attraction,
                    0.0..=2.0,
                    0.01,
                );
            }
            Operation::Branches(p) => {
                changed |= Self::labeled_drag(ui, "amount:", &mut p.amount, 0..=500, 1.0);
                changed |= Self::labeled_drag(ui, "angle:", &mut p.angle, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "max_split:", &mut p.max_split_number, 1..=8, 0.1);
                changed |= Self::labeled_drag(ui, "radius:", &mut p.radius, 0.0..=1.0, 0.01);
                changed |= Self::labeled_drag(ui, "start:", &mut p.start, 0.0..=1.0, 0.01);
                changed |= Self::labeled_drag(ui, "length:", &mut p.length, 0.0..=50.0, 0.1);
                changed |=
                    Self::labeled_drag(ui, "resolution:", &mut p.resolution, 0.1..=10.0, 0.05);
                changed |=
                    Self::labeled_drag(ui, "randomness:", &mut p.randomness, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "split_proba:", &mut p.split_proba, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "gravity:", &mut p.gravity_strength, -5.0..=5.0, 0.05);
                changed |=
                    Self::labeled_drag(ui, "floor:", &mut p.floor_avoidance, -1.0..=1.0, 0.01);
            }
            Operation::Split(p) => {
                changed |= Self::labeled_drag(ui, "amount:", &mut p.amount, 0..=500, 1.0);
                changed |= Self::labeled_drag(ui, "angle:", &mut p.angle, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "max_split:", &mut p.max_split_number, 1..=8, 0.1);
                changed |= Self::labeled_drag(ui, "radius:", &mut p.radius, 0.0..=1.0, 0.01);
                changed |= Self::labeled_drag(ui, "start:", &mut p.start, 0.0..=1.0, 0.01);
                changed |= Self::labeled_drag(ui, "end:", &mut p.end, 0.0..=1.0, 0.01);
            }
            Operation::Grow(p) => {
                changed |= Self::labeled_drag(ui, "length:", &mut p.length, 0.0..=50.0, 0.1);
                changed |=
                    Self::labeled_drag(ui, "resolution:", &mut p.resolution, 0.1..=10.0, 0.05);
                changed |=
                    Self::labeled_drag(ui, "randomness:", &mut p.randomness, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "split_proba:", &mut p.split_proba, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "gravity:", &mut p.gravity_strength, -5.0..=5.0, 0.05);
            }
            Operation::Roots(p) => {
                changed |= Self::labeled_drag(ui, "length:", &mut p.length, 0.0..=50.0, 0.1);
                changed |=
                    Self::labeled_drag(ui, "resolution:", &mut p.resolution, 0.1..=10.0, 0.05);
                changed |=
                    Self::labeled_drag(ui, "split_proba:", &mut p.split_proba, 0.0..=1.0, 0.01);
                changed |=
                    Self::labeled_drag(ui, "randomness:", &mut p.randomness, 0.0..=1.0, 0.01);
            }
        }
        changed
    }

    /// Builds the top panel UI (regenerate, reset, save, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Regenerate").clicked() {
                    self.regenerate();
                }
                ui.checkbox(&mut self.auto_regenerate, "auto");

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                if self.recipe_path.is_some() && ui.button("Save").clicked() {
                    self.save();
                }

                ui.separator();
                ui.checkbox(&mut self.show_leaves, "leaves");
                ui.checkbox(&mut self.show_bones, "bones");

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.5..=100.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (counts and last error).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("leaves = {}", self.leaves.len()));
                ui.label(format!("bones = {}", self.armature.bone_count()));
                ui.label(format!("nodes = {}", self.tree.len()));
                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });
        });
    }

    /// Builds the right-hand panel listing the recipe steps.
    fn ui_recipe_panel(&mut self, ctx: &egui::Context) {
        let mut changed = false;
        egui::SidePanel::right("recipe_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Recipe");
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (index, step) in self.recipe.steps.iter_mut().enumerate() {
                        egui::CollapsingHeader::new(format!(
                            "{index}: {}",
                            step.operation.name()
                        ))
                        .id_salt(index)
                        .show(ui, |ui| {
                            changed |=
                                Self::labeled_drag(ui, "seed:", &mut step.seed, 0..=u64::MAX, 1.0);
                            if index > 0 {
                                let mut input = step.input.unwrap_or(0);
                                if Self::labeled_drag(ui, "input:", &mut input, 0..=index - 1, 0.1)
                                {
                                    step.input = Some(input);
                                    changed = true;
                                }
                            }
                            changed |= Self::operation_ui(ui, &mut step.operation);
                        });
                    }

                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.button("+ Branches").clicked() {
                            let input = self.recipe.steps.len().checked_sub(1);
                            self.recipe.steps.push(RecipeStep::new(
                                1,
                                input,
                                Operation::Branches(BranchParams::default()),
                            ));
                            changed = true;
                        }
                        if self.recipe.steps.len() > 1 && ui.button("Remove last").clicked() {
                            self.recipe.steps.pop();
                            changed = true;
                        }
                    });

                    ui.separator();
                    ui.label("Leaves");
                    changed |= Self::labeled_drag(
                        ui,
                        "number:",
                        &mut self.leaf_params.number,
                        0..=10_000,
                        1.0,
                    );
                    changed |= Self::labeled_drag(
                        ui,
                        "max_radius:",
                        &mut self.leaf_params.max_radius,
                        0.0..=1.0,
                        0.005,
                    );
                    changed |= ui
                        .checkbox(&mut self.leaf_params.extremity_only, "extremities only")
                        .changed();
                    changed |=
                        Self::labeled_drag(ui, "seed:", &mut self.leaf_seed, 0..=u64::MAX, 1.0);

                    ui.separator();
                    ui.label("Armature");
                    changed |= Self::labeled_drag(
                        ui,
                        "bone radius:",
                        &mut self.bone_radius,
                        0.0..=2.0,
                        0.005,
                    );
                });
            });

        if changed && self.auto_regenerate {
            self.regenerate();
        }
    }

    fn edge_color(phase: Phase) -> egui::Color32 {
        match phase {
            Phase::RootOrigin => egui::Color32::from_rgb(120, 90, 60),
            Phase::SplitOrigin => egui::Color32::LIGHT_YELLOW,
            Phase::Primary => egui::Color32::from_rgb(200, 170, 130),
        }
    }

    /// Builds the central panel where the skeleton is drawn.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(0.5, 100.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            // Floor line.
            let floor_y = self.world_to_screen(Vec2::ZERO, rect).y;
            painter.line_segment(
                [egui::pos2(rect.left(), floor_y), egui::pos2(rect.right(), floor_y)],
                egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
            );

            let nodes = self.tree.nodes();
            for node in nodes {
                let a = self.world_to_screen(Self::project(node.position), rect);
                for &child in &node.children {
                    let child = &nodes[child];
                    let b = self.world_to_screen(Self::project(child.position), rect);
                    let width = (child.radius * 2.0 * self.zoom).max(1.0);
                    painter.line_segment(
                        [a, b],
                        egui::Stroke::new(width, Self::edge_color(child.creator.phase)),
                    );
                }
            }

            if self.show_bones {
                let stroke = egui::Stroke::new(1.5, egui::Color32::LIGHT_BLUE);
                for bone in self.armature.bones() {
                    let a = self.world_to_screen(Self::project(bone.head), rect);
                    let b = self.world_to_screen(Self::project(bone.tail), rect);
                    painter.line_segment([a, b], stroke);
                    painter.circle_filled(a, 2.5, egui::Color32::LIGHT_BLUE);
                }
            }

            if self.show_leaves {
                let leaf_size = 0.3;
                let stroke = egui::Stroke::new(2.0, egui::Color32::from_rgb(90, 170, 60));
                for leaf in &self.leaves {
                    let a = self.world_to_screen(Self::project(leaf.position), rect);
                    let b = self.world_to_screen(
                        Self::project(leaf.position + leaf.direction * leaf_size),
                        rect,
                    );
                    painter.line_segment([a, b], stroke);
                }
            }
        });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_recipe_panel(ctx);
        self.ui_central_panel(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtree_core::{grow::GrowParams, trunk::TrunkParams};

    fn test_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::new(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    fn small_recipe() -> Recipe {
        Recipe {
            steps: vec![
                RecipeStep::new(
                    1,
                    None,
                    Operation::Trunk(TrunkParams {
                        length: 6.0,
                        ..TrunkParams::default()
                    }),
                ),
                RecipeStep::new(
                    2,
                    Some(0),
                    Operation::Branches(BranchParams {
                        amount: 3,
                        length: 2.0,
                        ..BranchParams::default()
                    }),
                ),
            ],
        }
    }

    #[test]
    fn world_to_screen_and_back_is_roundtrip() {
        let mut viewer = Viewer::new(small_recipe(), None);
        viewer.zoom = 2.0;
        viewer.pan = egui::vec2(15.0, -7.0);
        let rect = test_rect();

        for p in [Vec2::ZERO, Vec2::new(10.0, -5.0), Vec2::new(-3.5, 8.25)] {
            let back = viewer.screen_to_world(viewer.world_to_screen(p, rect), rect);
            assert!((back - p).length() < 1e-4, "p={p:?}, back={back:?}");
        }
    }

    #[test]
    fn side_view_drops_depth() {
        assert_eq!(Viewer::project(Vec3::new(1.0, 7.0, 3.0)), Vec2::new(1.0, 3.0));
    }

    #[test]
    fn new_viewer_evaluates_its_recipe() {
        let viewer = Viewer::new(small_recipe(), None);
        assert!(viewer.last_error.is_none());
        assert!(viewer.tree.len() > 7);
        assert!(viewer.armature.bone_count() > 0);
    }

    #[test]
    fn failed_evaluation_keeps_previous_skeleton() {
        let mut viewer = Viewer::new(small_recipe(), None);
        let before = viewer.tree.clone();

        viewer.recipe.steps.push(RecipeStep::new(
            3,
            Some(5),
            Operation::Grow(GrowParams::default()),
        ));
        viewer.regenerate();

        assert!(viewer.last_error.is_some());
        assert_eq!(viewer.tree, before);
    }

    #[test]
    fn reset_restores_default_recipe() {
        let mut viewer = Viewer::new(small_recipe(), None);
        viewer.zoom = 3.0;
        viewer.last_error = Some("stale".to_string());

        viewer.reset();

        assert_eq!(viewer.recipe, Recipe::default());
        assert_eq!(viewer.zoom, 12.0);
        assert!(viewer.last_error.is_none());
        assert!(!viewer.tree.is_empty());
    }
}
