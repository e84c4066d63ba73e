// src/leveling/mod.rs

mod components;
mod plugin;
mod solver;
mod systems;

pub use components::{
    BaseStatus, LegSolution, LevelAngle, LevelingBase, LevelingPersisted, LevelingSolution,
};
pub use plugin::LevelingPlugin;
pub use solver::{
    leveled_anchor, leveling_rotation, level_angle, plan_targets, sample_anchors, LegAccess,
    MISS_DISTANCE,
};
pub use systems::{
    discover_leveling_legs, handle_leveling_requests, publish_level_angle, AUTO_LEVEL_DISABLED,
};
