// src/leveling/solver.rs
//! Geometry of auto-leveling, free of any ECS state.
//!
//! The base is imagined rotated about its pivot until its up axis opposes
//! gravity. Each leg's mount is carried along by that rotation and the ground
//! is probed straight down from where it would end up. The differences
//! between those distances are what the legs must make up.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::leg::AdjustableLeg;
use crate::part::Pose;
use crate::surface::{ProbeHit, SurfaceProbe};

/// Distance substituted for a probe that found no ground. Far beyond any
/// leg's travel, so a leg over a hole is driven to full extension.
pub const MISS_DISTANCE: f32 = 100.0;

/// Indexed access to legs the controller observes but does not own.
pub trait LegAccess {
    fn leg(&self, handle: Entity) -> Option<&AdjustableLeg>;
    fn leg_mut(&mut self, handle: Entity) -> Option<&mut AdjustableLeg>;
}

impl LegAccess for Query<'_, '_, &mut AdjustableLeg> {
    fn leg(&self, handle: Entity) -> Option<&AdjustableLeg> {
        self.get(handle).ok()
    }

    fn leg_mut(&mut self, handle: Entity) -> Option<&mut AdjustableLeg> {
        self.get_mut(handle).ok().map(Mut::into_inner)
    }
}

impl LegAccess for HashMap<Entity, AdjustableLeg> {
    fn leg(&self, handle: Entity) -> Option<&AdjustableLeg> {
        self.get(&handle)
    }

    fn leg_mut(&mut self, handle: Entity) -> Option<&mut AdjustableLeg> {
        self.get_mut(&handle)
    }
}

/// Rotation taking the base's `up` onto the direction opposite `down`.
pub fn leveling_rotation(up: Vec3, down: Vec3) -> Quat {
    match (up.try_normalize(), (-down).try_normalize()) {
        (Some(from), Some(to)) => Quat::from_rotation_arc(from, to),
        _ => Quat::IDENTITY,
    }
}

/// Where `mount` would be if the base were rotated by `rotation` about `pivot`.
pub fn leveled_anchor(mount: Vec3, pivot: Vec3, rotation: Quat) -> Vec3 {
    pivot + rotation * (mount - pivot)
}

/// Probe once per mount from its leveled anchor, straight down.
pub fn sample_anchors(anchors: &[Vec3], down: Vec3, probe: &SurfaceProbe) -> Vec<ProbeHit> {
    anchors.iter().map(|&a| probe.cast(a, down)).collect()
}

/// Per-leg targets: `bias` plus how much farther each leg is from the ground
/// than the closest one. Relative differences are kept exactly.
pub fn plan_targets(distances: &[f32], bias: f32) -> Vec<f32> {
    let Some(closest) = distances.iter().copied().reduce(f32::min) else {
        return Vec::new();
    };
    distances.iter().map(|d| bias + (d - closest)).collect()
}

/// Angle in degrees between the base's up axis and local "up" (away from
/// the body's center). Zero means level.
pub fn level_angle(pivot: &Pose, down: Vec3) -> f32 {
    pivot.up().angle_between(-down).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{StaticSurfaces, SurfaceLayers, SurfacePlane};

    #[test]
    fn rotation_undoes_base_tilt() {
        let tilt = Quat::from_rotation_z(0.3) * Quat::from_rotation_x(-0.2);
        let rot = leveling_rotation(tilt * Vec3::Y, Vec3::NEG_Y);
        assert!(((rot * tilt) * Vec3::Y - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn rotation_is_identity_when_level() {
        let rot = leveling_rotation(Vec3::Y, Vec3::NEG_Y);
        assert!(rot.angle_between(Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn anchor_rotates_about_pivot() {
        let pivot = Vec3::new(0.0, 3.0, 0.0);
        let rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let a = leveled_anchor(Vec3::new(1.0, 3.0, 0.0), pivot, rot);
        assert!((a - Vec3::new(0.0, 4.0, 0.0)).length() < 1e-5);
        assert_eq!(leveled_anchor(pivot, pivot, rot), pivot);
    }

    #[test]
    fn plan_keeps_relative_differences() {
        let targets = plan_targets(&[2.0, 2.5, 2.25, 3.0], 0.1);
        let expected = [0.1, 0.6, 0.35, 1.1];
        for (t, e) in targets.iter().zip(expected) {
            assert!((t - e).abs() < 1e-6);
        }
    }

    #[test]
    fn plan_for_no_legs_is_empty() {
        assert!(plan_targets(&[], 0.5).is_empty());
    }

    #[test]
    fn sampling_reports_raw_probe_results() {
        let probe = SurfaceProbe::new(
            StaticSurfaces::default().with_plane(SurfacePlane::horizontal(0.0, SurfaceLayers::TERRAIN)),
        );
        let hits = sample_anchors(&[Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 50.0, 0.0)], Vec3::NEG_Y, &probe);
        assert!(hits[0].is_hit());
        assert_eq!(hits[1], ProbeHit::Miss);
    }

    #[test]
    fn level_angle_measures_tilt() {
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_x(10f32.to_radians()));
        assert!((level_angle(&pose, Vec3::NEG_Y) - 10.0).abs() < 1e-3);
        assert!(level_angle(&Pose::IDENTITY, Vec3::NEG_Y).abs() < 1e-3);
    }
}
