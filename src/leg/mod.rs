// src/leg/mod.rs

mod components;
mod plugin;
mod systems;

pub use components::{
    AdjustableLeg, FootOrienter, LegDisabled, LegPersisted, LegRig, LegRigNames, FRACTION_MAX,
    FRACTION_MIN,
};
pub use plugin::LegPlugin;
pub use systems::{
    advance_legs, drive_leg_transforms, handle_leg_requests, orient_feet, setup_legs,
    sync_leg_mounts,
};
