//! Part modules for deployable surface bases: extensible landing legs that
//! seek a commanded extension, and a leveling base that coordinates them so
//! the part sits level on uneven ground.

use bevy::prelude::*;

pub mod actions;
pub mod config;
pub mod heightmap_data;
pub mod leg;
pub mod leveling;
pub mod part;
pub mod setup;
pub mod surface;
pub mod ui;

#[cfg(test)]
mod test_utils;

pub use actions::{LegAction, LegRequest, LevelingAction, LevelingRequest};
pub use leg::{AdjustableLeg, FootOrienter, LegPlugin};
pub use leveling::{LevelAngle, LevelingBase, LevelingPlugin};
pub use part::{GravityWell, PartModel, Pose, VesselSituation};
pub use surface::{ProbeHit, RaycastHost, SurfaceProbe};

/// Ordering for everything this crate runs.
///
/// `Update`: `Setup` → `Sync` → `Control` → `Observe`.
/// `FixedUpdate`: `Actuate` → `Apply`.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum HabUtilsSet {
    /// Resolve model transforms, discover legs
    Setup,
    /// Copy model poses into module state
    Sync,
    /// Apply UI / host commands
    Control,
    /// Publish read-only state
    Observe,
    /// Integrate motion
    Actuate,
    /// Write module state back onto the model
    Apply,
}

/// Set ordering and the shared resources every module plugin relies on.
/// Safe to apply more than once.
pub(crate) fn configure_shared(app: &mut App) {
    app.configure_sets(
        Update,
        (
            HabUtilsSet::Setup,
            HabUtilsSet::Sync,
            HabUtilsSet::Control,
            HabUtilsSet::Observe,
        )
            .chain(),
    )
    .configure_sets(FixedUpdate, (HabUtilsSet::Actuate, HabUtilsSet::Apply).chain())
    // host-provided; these defaults only fill in what the host didn't
    .init_resource::<SurfaceProbe>()
    .init_resource::<GravityWell>();
}

/// Everything: legs, leveling bases and screen messages.
pub struct HabUtilsPlugin;

impl Plugin for HabUtilsPlugin {
    fn build(&self, app: &mut App) {
        configure_shared(app);
        app.add_plugins((ui::ScreenMessagePlugin, LegPlugin, LevelingPlugin));
    }
}
