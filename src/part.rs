// src/part.rs
//! What a part module needs to know about the part it lives on: its named
//! model transforms, whether the vessel is sitting on something, and where
//! "down" is.

use bevy::prelude::*;
use std::collections::HashMap;

/// Named model transforms of a part.
///
/// The host registers every transform of the part's model here once, when the
/// part is spawned. Modules resolve the names they were configured with at
/// setup and keep the typed [`Entity`] handles from then on.
#[derive(Component, Clone, Debug, Default)]
pub struct PartModel {
    transforms: HashMap<String, Entity>,
}

impl PartModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, name: impl Into<String>, entity: Entity) -> Self {
        self.insert(name, entity);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entity: Entity) {
        self.transforms.insert(name.into(), entity);
    }

    pub fn find(&self, name: &str) -> Result<Entity, RigError> {
        self.transforms
            .get(name)
            .copied()
            .ok_or_else(|| RigError::MissingTransform { name: name.to_string() })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RigError {
    #[error("could not find model transform '{name}'")]
    MissingTransform { name: String },
    #[error("module is not attached to a part with a model")]
    NoPartModel,
}

/// Position and orientation of a transform in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self { position: Vec3::ZERO, rotation: Quat::IDENTITY };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_global(global: &GlobalTransform) -> Self {
        let (_, rotation, position) = global.to_scale_rotation_translation();
        Self { position, rotation }
    }

    /// Local +Y in world space.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

/// Where the vessel carrying a part currently is.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VesselSituation {
    #[default]
    Landed,
    Splashed,
    Prelaunch,
    Flying,
    SubOrbital,
    Orbiting,
}

impl VesselSituation {
    /// Resting on a surface, so leveling has something to level against.
    pub fn is_grounded(self) -> bool {
        matches!(self, Self::Landed | Self::Splashed | Self::Prelaunch)
    }
}

/// The body everything is falling toward.
#[derive(Resource, Clone, Copy, Debug)]
pub struct GravityWell {
    pub center: Vec3,
}

impl Default for GravityWell {
    /// A Kerbin-sized body centered straight below the origin.
    fn default() -> Self {
        Self { center: Vec3::new(0.0, -600_000.0, 0.0) }
    }
}

impl GravityWell {
    /// Unit vector from `point` toward the body's center.
    pub fn down_from(&self, point: Vec3) -> Vec3 {
        (self.center - point).try_normalize().unwrap_or(Vec3::NEG_Y)
    }
}
