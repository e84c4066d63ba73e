use bevy::prelude::*;

use crate::actions::LevelingRequest;
use crate::leg::LegPlugin;
use crate::ui::ScreenMessagePlugin;
use crate::leveling::systems::{
    discover_leveling_legs, handle_leveling_requests, publish_level_angle,
};
use crate::HabUtilsSet;

pub struct LevelingPlugin;

impl Plugin for LevelingPlugin {
    fn build(&self, app: &mut App) {
        crate::configure_shared(app);
        if !app.is_plugin_added::<LegPlugin>() {
            app.add_plugins(LegPlugin);
        }
        if !app.is_plugin_added::<ScreenMessagePlugin>() {
            app.add_plugins(ScreenMessagePlugin);
        }
        app.add_event::<LevelingRequest>()
            .add_systems(Update, discover_leveling_legs.in_set(HabUtilsSet::Setup))
            // per-leg slider commands land first, then base-wide commands
            .add_systems(
                Update,
                handle_leveling_requests
                    .in_set(HabUtilsSet::Control)
                    .after(crate::leg::handle_leg_requests),
            )
            .add_systems(Update, publish_level_angle.in_set(HabUtilsSet::Observe));
    }
}
