// src/leg/components.rs
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const FRACTION_MIN: f32 = 0.0;
pub const FRACTION_MAX: f32 = 100.0;

/// One extensible leg: a linear actuator driven by a 0–100% command.
///
/// `extension_fraction` is the persisted command. `extension_goal` is the
/// absolute distance it maps to and is recomputed on every write, so it is
/// never stale. `current_position` chases the goal at `rate` units per
/// second through [`advance`](Self::advance).
#[derive(Component, Clone, Debug)]
pub struct AdjustableLeg {
    pub display_name: String,
    pub leg_id: String,
    min_distance: f32,
    max_distance: f32,
    rate: f32,
    extension_fraction: f32,
    extension_goal: f32,
    current_position: f32,
    mount_position: Vec3,
    surface_normal: Vec3,
    ui_visible: bool,
}

/// The part of a leg that survives save/load.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegPersisted {
    pub extension_fraction: f32,
}

impl AdjustableLeg {
    /// Bounds are reordered if given backwards; a negative rate is treated as 0.
    pub fn new(leg_id: impl Into<String>, min_distance: f32, max_distance: f32, rate: f32) -> Self {
        let leg_id = leg_id.into();
        let (min_distance, max_distance) = if min_distance <= max_distance {
            (min_distance, max_distance)
        } else {
            (max_distance, min_distance)
        };
        Self {
            display_name: leg_id.clone(),
            leg_id,
            min_distance,
            max_distance,
            rate: rate.max(0.0),
            extension_fraction: FRACTION_MIN,
            extension_goal: min_distance,
            current_position: min_distance,
            mount_position: Vec3::ZERO,
            surface_normal: Vec3::Y,
            ui_visible: true,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Start at a given command, already settled there.
    pub fn with_extension_fraction(mut self, fraction: f32) -> Self {
        self.set_extension_fraction(fraction);
        self.snap_to_goal();
        self
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn travel(&self) -> f32 {
        self.max_distance - self.min_distance
    }

    pub fn extension_fraction(&self) -> f32 {
        self.extension_fraction
    }

    /// The commanded absolute distance, not where the leg physically is yet.
    pub fn extension_distance(&self) -> f32 {
        self.extension_goal
    }

    pub fn current_position(&self) -> f32 {
        self.current_position
    }

    pub fn is_settled(&self) -> bool {
        self.current_position == self.extension_goal
    }

    /// Set the command as a percentage of travel. Clamped to [0,100]; NaN is ignored.
    pub fn set_extension_fraction(&mut self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(FRACTION_MIN, FRACTION_MAX);
        self.extension_fraction = fraction;
        self.extension_goal = self.travel() * (fraction / FRACTION_MAX) + self.min_distance;
    }

    /// Set the command as an absolute distance. Clamped to `[min, max]`.
    pub fn set_extension_distance(&mut self, distance: f32) {
        if distance.is_nan() {
            return;
        }
        let distance = distance.clamp(self.min_distance, self.max_distance);
        let travel = self.travel();
        let fraction = if travel > 0.0 {
            (distance - self.min_distance) / travel * FRACTION_MAX
        } else {
            FRACTION_MIN
        };
        self.set_extension_fraction(fraction);
    }

    /// Move toward the goal by at most `rate * dt`, never past it.
    pub fn advance(&mut self, dt: f32) {
        let max_step = (self.rate * dt).max(0.0);
        let delta = self.extension_goal - self.current_position;
        if delta.abs() <= max_step {
            self.current_position = self.extension_goal;
        } else {
            self.current_position += delta.signum() * max_step;
        }
    }

    pub fn snap_to_goal(&mut self) {
        self.current_position = self.extension_goal;
    }

    /// World-space anchor of the un-extended leg.
    pub fn mount_position(&self) -> Vec3 {
        self.mount_position
    }

    pub fn set_mount_position(&mut self, position: Vec3) {
        self.mount_position = position;
    }

    /// Normal the foot should align with. Zero or non-finite normals are ignored.
    pub fn set_surface_normal(&mut self, normal: Vec3) {
        if let Some(n) = normal.try_normalize() {
            self.surface_normal = n;
        }
    }

    pub fn surface_normal(&self) -> Vec3 {
        self.surface_normal
    }

    pub fn set_ui_visibility(&mut self, visible: bool) {
        self.ui_visible = visible;
    }

    pub fn ui_visible(&self) -> bool {
        self.ui_visible
    }

    pub fn persisted(&self) -> LegPersisted {
        LegPersisted { extension_fraction: self.extension_fraction }
    }

    /// Restore saved state; the leg comes back settled at its goal.
    pub fn restore(&mut self, saved: LegPersisted) {
        self.set_extension_fraction(saved.extension_fraction);
        self.snap_to_goal();
    }
}

/// Model transform names a leg is configured with, resolved at setup.
#[derive(Component, Clone, Debug)]
pub struct LegRigNames {
    pub extender: String,
    pub base: String,
    pub foot: Option<String>,
}

/// Resolved model transforms of an active leg.
#[derive(Component, Clone, Copy, Debug)]
pub struct LegRig {
    pub extender: Entity,
    pub base: Entity,
    pub foot: Option<Entity>,
    /// Extender local translation at zero extension.
    pub zero_position: Vec3,
}

/// A leg whose rig failed to resolve. It keeps accepting commands but never moves.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct LegDisabled;

/// Tilts a leg's foot toward the ground it is standing on, at a bounded
/// angular rate and independently of extension.
#[derive(Component, Clone, Copy, Debug)]
pub struct FootOrienter {
    /// Degrees per second
    pub angular_rate: f32,
    current_normal: Vec3,
}

impl Default for FootOrienter {
    fn default() -> Self {
        Self::new(90.0)
    }
}

impl FootOrienter {
    pub fn new(angular_rate: f32) -> Self {
        Self { angular_rate: angular_rate.max(0.0), current_normal: Vec3::Y }
    }

    pub fn current_normal(&self) -> Vec3 {
        self.current_normal
    }

    /// Rotate the current normal toward `target` by at most `angular_rate * dt`.
    pub fn advance(&mut self, target: Vec3, dt: f32) {
        let Some(target) = target.try_normalize() else { return };
        let max_step = (self.angular_rate * dt).max(0.0).to_radians();
        let angle = self.current_normal.angle_between(target);
        if angle <= max_step {
            self.current_normal = target;
            return;
        }
        let axis = self
            .current_normal
            .cross(target)
            .try_normalize()
            .unwrap_or_else(|| self.current_normal.any_orthogonal_vector());
        self.current_normal = (Quat::from_axis_angle(axis, max_step) * self.current_normal).normalize();
    }

    /// Foot rotation relative to a parent whose world rotation is `parent`.
    pub fn local_rotation(&self, parent: Quat) -> Quat {
        let world = Quat::from_rotation_arc(parent * Vec3::Y, self.current_normal) * parent;
        parent.inverse() * world
    }
}
