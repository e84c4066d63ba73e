use bevy::prelude::*;

use crate::actions::LegRequest;
use crate::leg::systems::{
    advance_legs, drive_leg_transforms, handle_leg_requests, orient_feet, setup_legs,
    sync_leg_mounts,
};
use crate::HabUtilsSet;

pub struct LegPlugin;

impl Plugin for LegPlugin {
    fn build(&self, app: &mut App) {
        crate::configure_shared(app);
        app.add_event::<LegRequest>()
            // Frame: resolve rigs, refresh anchors, take UI commands
            .add_systems(Update, setup_legs.in_set(HabUtilsSet::Setup))
            .add_systems(Update, sync_leg_mounts.in_set(HabUtilsSet::Sync))
            .add_systems(Update, handle_leg_requests.in_set(HabUtilsSet::Control))
            // Fixed tick: motion, then write back to the model
            .add_systems(
                FixedUpdate,
                (advance_legs, orient_feet).in_set(HabUtilsSet::Actuate),
            )
            .add_systems(FixedUpdate, drive_leg_transforms.in_set(HabUtilsSet::Apply));
    }
}
