use bevy::prelude::*;

/// A command for a leveling base, from a UI button/slider or the host.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct LevelingRequest {
    pub base: Entity,
    pub action: LevelingAction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelingAction {
    /// Compute and push a level solution to every leg.
    AutoLevel,
    /// Slide every leg together, as a percentage of the longest leg.
    SetLinkedOffset(f32),
    /// Deploy the legs: an auto-level that also marks the base deployed.
    Deploy,
    /// Send every leg back to zero extension.
    Retract,
    /// Allow or forbid auto-leveling on this base.
    SetAutomated(bool),
}

impl LevelingRequest {
    pub fn new(base: Entity, action: LevelingAction) -> Self {
        Self { base, action }
    }
}

/// A command for a single leg's slider.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct LegRequest {
    pub leg: Entity,
    pub action: LegAction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegAction {
    SetFraction(f32),
    SetDistance(f32),
}

impl LegRequest {
    pub fn new(leg: Entity, action: LegAction) -> Self {
        Self { leg, action }
    }
}
