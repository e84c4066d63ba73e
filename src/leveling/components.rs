// src/leveling/components.rs
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::leg::FRACTION_MAX;
use crate::leveling::solver::{
    leveled_anchor, leveling_rotation, level_angle, plan_targets, sample_anchors, LegAccess,
    MISS_DISTANCE,
};
use crate::part::{GravityWell, Pose, VesselSituation};
use crate::surface::{ProbeHit, SurfaceProbe};

/// How far a leg may sit from where the base last put it before it counts
/// as moved by hand.
const BASELINE_TOLERANCE: f32 = 1e-4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BaseStatus {
    /// Waiting for leg discovery and pivot resolution.
    #[default]
    Pending,
    Active,
    /// Pivot could not be resolved; every operation is a no-op.
    Disabled,
}

/// What one auto-level pass decided for one leg.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegSolution {
    pub leg: Entity,
    /// Mount position after the hypothetical leveling rotation
    pub anchor: Vec3,
    pub probe: ProbeHit,
    /// Probe distance, or [`MISS_DISTANCE`] on a miss
    pub sampled: f32,
    /// Distance pushed to the leg, before the leg's own clamping
    pub target: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelingSolution {
    pub rotation: Quat,
    pub legs: Vec<LegSolution>,
}

/// Coordinates the adjustable legs of one part so the part sits level.
///
/// Legs are held as entity handles: the base pushes targets into them but
/// each leg still owns and integrates its own state.
#[derive(Component, Clone, Debug)]
#[require(LevelAngle, VesselSituation)]
pub struct LevelingBase {
    pub pivot_name: String,
    /// Offset, in percent of the longest leg, that auto-level settles at.
    pub minimum_auto_level_fraction: f32,
    /// Auto-leveling allowed on this part.
    pub automated: bool,
    pub deployed: bool,
    linked_offset_fraction: f32,
    previous_offset: f32,
    max_leg_distance: f32,
    legs: Vec<Entity>,
    /// Per-leg distance with the linked offset taken out, parallel to `legs`.
    baselines: Vec<f32>,
    pivot: Option<Entity>,
    status: BaseStatus,
    last_solution: Option<LevelingSolution>,
}

/// The part of a base that survives save/load.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelingPersisted {
    pub automated: bool,
    pub deployed: bool,
    pub linked_offset_fraction: f32,
    pub previous_offset: f32,
    pub max_leg_distance: f32,
}

/// Published each frame: tilt of the pivot in degrees, `None` when the
/// vessel is not resting on anything.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct LevelAngle(pub Option<f32>);

impl std::fmt::Display for LevelAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(deg) => write!(f, "{deg:.1}°"),
            None => write!(f, "N/A"),
        }
    }
}

impl LevelingBase {
    pub fn new(pivot_name: impl Into<String>) -> Self {
        Self {
            pivot_name: pivot_name.into(),
            minimum_auto_level_fraction: 10.0,
            automated: true,
            deployed: false,
            linked_offset_fraction: 0.0,
            previous_offset: 0.0,
            max_leg_distance: 0.0,
            legs: Vec::new(),
            baselines: Vec::new(),
            pivot: None,
            status: BaseStatus::Pending,
            last_solution: None,
        }
    }

    pub fn with_minimum_auto_level_fraction(mut self, fraction: f32) -> Self {
        self.minimum_auto_level_fraction = fraction.clamp(0.0, FRACTION_MAX);
        self
    }

    pub fn with_automated(mut self, automated: bool) -> Self {
        self.automated = automated;
        self
    }

    pub fn status(&self) -> BaseStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == BaseStatus::Active
    }

    pub fn legs(&self) -> &[Entity] {
        &self.legs
    }

    pub fn pivot(&self) -> Option<Entity> {
        self.pivot
    }

    pub fn linked_offset_fraction(&self) -> f32 {
        self.linked_offset_fraction
    }

    pub fn previous_offset(&self) -> f32 {
        self.previous_offset
    }

    pub fn max_leg_distance(&self) -> f32 {
        self.max_leg_distance
    }

    pub fn last_solution(&self) -> Option<&LevelingSolution> {
        self.last_solution.as_ref()
    }

    /// Bind the discovered legs and resolved pivot. The leg list is fixed
    /// from here on; `max_leg_distance` is the longest leg's max distance.
    pub fn attach<L: LegAccess>(&mut self, pivot: Entity, legs: Vec<Entity>, access: &L) {
        self.max_leg_distance = legs
            .iter()
            .filter_map(|&h| access.leg(h))
            .map(|l| l.max_distance())
            .fold(0.0, f32::max);
        self.legs = legs;
        self.rebase(access);
        self.pivot = Some(pivot);
        self.status = BaseStatus::Active;
    }

    /// Read every leg's baseline back from where it is commanded now.
    fn rebase<L: LegAccess>(&mut self, access: &L) {
        self.baselines = self
            .legs
            .iter()
            .map(|&h| access.leg(h).map_or(0.0, |l| l.extension_distance() - self.previous_offset))
            .collect();
    }

    pub fn disable(&mut self) {
        self.status = BaseStatus::Disabled;
    }

    /// Level the part: push a target distance to every leg so that, with the
    /// pivot's up axis turned against gravity, all feet touch the ground at
    /// `minimum_auto_level_fraction` of the longest leg.
    ///
    /// Returns `None` (and changes nothing) when inactive or legless.
    pub fn auto_level<L: LegAccess>(
        &mut self,
        pivot: Pose,
        gravity: &GravityWell,
        probe: &SurfaceProbe,
        access: &mut L,
    ) -> Option<&LevelingSolution> {
        if !self.is_active() {
            return None;
        }
        let mounts: Vec<(usize, Entity, Vec3)> = self
            .legs
            .iter()
            .enumerate()
            .filter_map(|(i, &h)| access.leg(h).map(|l| (i, h, l.mount_position())))
            .collect();
        if mounts.is_empty() {
            return None;
        }

        // 1) Rotation that would bring the base level
        let down = gravity.down_from(pivot.position);
        let rotation = leveling_rotation(pivot.up(), down);

        // 2) Probe from each leg's leveled anchor
        let anchors: Vec<Vec3> = mounts
            .iter()
            .map(|&(_, _, m)| leveled_anchor(m, pivot.position, rotation))
            .collect();
        let probes = sample_anchors(&anchors, down, probe);
        let sampled: Vec<f32> = probes.iter().map(|p| p.distance_or(MISS_DISTANCE)).collect();

        // 3) Keep the differences, settle at the minimum offset
        let bias = self.minimum_auto_level_fraction / FRACTION_MAX * self.max_leg_distance;
        let targets = plan_targets(&sampled, bias);

        let mut legs = Vec::with_capacity(mounts.len());
        for (i, &(slot, handle, _)) in mounts.iter().enumerate() {
            if let Some(leg) = access.leg_mut(handle) {
                leg.set_extension_distance(targets[i]);
            }
            // unclamped, so a leg that saturates keeps its share of the solution
            if let Some(baseline) = self.baselines.get_mut(slot) {
                *baseline = targets[i] - bias;
            }
            legs.push(LegSolution {
                leg: handle,
                anchor: anchors[i],
                probe: probes[i],
                sampled: sampled[i],
                target: targets[i],
            });
        }

        // 4) The linked offset now describes the bias just applied
        self.linked_offset_fraction = self.minimum_auto_level_fraction;
        self.previous_offset = bias;
        self.last_solution = Some(LevelingSolution { rotation, legs });
        self.last_solution.as_ref()
    }

    /// Slide all legs together. Each leg goes to its baseline plus the new
    /// offset, so the offset replaces the previous one rather than stacking
    /// on it and the leveling differences are untouched.
    ///
    /// The offset is capped where the first leg would hit its max distance;
    /// `linked_offset_fraction` records what was actually applied. Legs whose
    /// baseline alone is past their max (over a hole) do not cap it.
    pub fn set_linked_offset<L: LegAccess>(&mut self, fraction: f32, access: &mut L) {
        if !self.is_active() || fraction.is_nan() {
            return;
        }

        // 1) A leg commanded on its own since the last base command keeps
        //    that command as its new baseline
        for (&handle, baseline) in self.legs.iter().zip(self.baselines.iter_mut()) {
            let Some(leg) = access.leg(handle) else { continue };
            let expected =
                (*baseline + self.previous_offset).clamp(leg.min_distance(), leg.max_distance());
            if (leg.extension_distance() - expected).abs() > BASELINE_TOLERANCE {
                *baseline = leg.extension_distance() - self.previous_offset;
            }
        }

        // 2) Largest offset every leg can still take
        let requested = fraction.clamp(0.0, FRACTION_MAX) / FRACTION_MAX * self.max_leg_distance;
        let ceiling = self
            .legs
            .iter()
            .zip(&self.baselines)
            .filter_map(|(&h, &b)| access.leg(h).map(|l| l.max_distance() - b))
            .filter(|headroom| *headroom >= 0.0)
            .fold(f32::INFINITY, f32::min);
        let new_offset = requested.min(ceiling).max(0.0);
        let fraction = if new_offset < requested && self.max_leg_distance > 0.0 {
            new_offset / self.max_leg_distance * FRACTION_MAX
        } else {
            fraction.clamp(0.0, FRACTION_MAX)
        };

        for (&handle, &baseline) in self.legs.iter().zip(&self.baselines) {
            if let Some(leg) = access.leg_mut(handle) {
                leg.set_extension_distance(baseline + new_offset);
            }
        }

        self.linked_offset_fraction = fraction;
        self.previous_offset = new_offset;
    }

    /// Command every leg to zero extension.
    pub fn retract<L: LegAccess>(&mut self, access: &mut L) {
        if !self.is_active() {
            return;
        }
        for &handle in &self.legs {
            if let Some(leg) = access.leg_mut(handle) {
                leg.set_extension_fraction(0.0);
            }
        }
        self.linked_offset_fraction = 0.0;
        self.previous_offset = 0.0;
        self.rebase(access);
    }

    /// Tilt of the pivot away from local up, in degrees. `None` while the
    /// vessel is not on a surface or the base is inactive.
    pub fn compute_level_angle(
        &self,
        pivot: Pose,
        gravity: &GravityWell,
        situation: VesselSituation,
    ) -> Option<f32> {
        if !self.is_active() || !situation.is_grounded() {
            return None;
        }
        Some(level_angle(&pivot, gravity.down_from(pivot.position)))
    }

    pub fn persisted(&self) -> LevelingPersisted {
        LevelingPersisted {
            automated: self.automated,
            deployed: self.deployed,
            linked_offset_fraction: self.linked_offset_fraction,
            previous_offset: self.previous_offset,
            max_leg_distance: self.max_leg_distance,
        }
    }

    /// Restore saved state. Call before the first tick; a later `attach`
    /// recomputes `max_leg_distance` from the legs actually present.
    pub fn restore(&mut self, saved: LevelingPersisted) {
        self.automated = saved.automated;
        self.deployed = saved.deployed;
        self.linked_offset_fraction = saved.linked_offset_fraction.clamp(0.0, FRACTION_MAX);
        self.previous_offset = saved.previous_offset;
        self.max_leg_distance = saved.max_leg_distance;
    }
}
