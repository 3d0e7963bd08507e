//! Vector helpers shared by the growth operations.
//!
//! Every renormalization falls back to a caller-chosen direction, so a
//! zero-length vector means "no direction change" rather than NaN.

use glam::Vec3;
use rand::Rng;

/// Returns a random unit vector orthogonal to `direction`.
///
/// Always draws exactly three values from `rng`, so the random stream stays
/// aligned regardless of the geometry.
pub fn random_tangent(direction: Vec3, rng: &mut impl Rng) -> Vec3 {
    let axis = direction.normalize_or(Vec3::Z);
    let sample = Vec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    );
    axis.cross(sample)
        .try_normalize()
        .unwrap_or_else(|| axis.any_orthonormal_vector())
}

/// Unit component of `v` orthogonal to the unit vector `axis`, or zero if
/// `v` is parallel to it.
pub fn orthogonal_component(v: Vec3, axis: Vec3) -> Vec3 {
    (v - v.project_onto_normalized(axis)).normalize_or_zero()
}

/// Fork offset shared by growth forks and split forks: halfway along the
/// parent segment, pushed out by the parent radius along the part of
/// `tangent` orthogonal to the parent direction.
pub fn fork_position(
    parent_position: Vec3,
    continuation_position: Vec3,
    parent_direction: Vec3,
    parent_radius: f32,
    tangent: Vec3,
) -> Vec3 {
    (parent_position + continuation_position) / 2.0
        + orthogonal_component(tangent, parent_direction) * parent_radius
}
