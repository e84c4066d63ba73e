use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::time::Duration;

use habutils::setup::{spawn_demo_scene, DemoLander};
use habutils::{AdjustableLeg, HabUtilsPlugin, HabUtilsSet, LevelAngle, LevelingAction, LevelingRequest};

/// Frame the lander deploys on, once transforms have propagated.
const DEPLOY_FRAME: u32 = 10;
/// Frame the legs are raised together.
const RAISE_FRAME: u32 = 200;
const REPORT_EVERY: u32 = 60;
const RUN_FRAMES: u32 = 420;

fn main() -> AppExit {
    App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))),
            LogPlugin::default(),
            TransformPlugin,
        ))
        .add_plugins(HabUtilsPlugin)
        .add_systems(Startup, spawn_demo_scene)
        .add_systems(Update, drive_demo.before(HabUtilsSet::Control))
        .add_systems(Update, report_lander.after(HabUtilsSet::Observe))
        .run()
}

/// Scripted commands: deploy, raise, then quit.
fn drive_demo(
    mut frame: Local<u32>,
    lander: Option<Res<DemoLander>>,
    mut requests: EventWriter<LevelingRequest>,
    mut exit: EventWriter<AppExit>,
) {
    *frame += 1;
    let Some(lander) = lander else {
        error!("[Demo] no lander spawned");
        exit.write(AppExit::error());
        return;
    };

    match *frame {
        DEPLOY_FRAME => {
            info!("[Demo] deploying");
            requests.write(LevelingRequest::new(lander.part, LevelingAction::Deploy));
        }
        RAISE_FRAME => {
            info!("[Demo] raising legs to 40%");
            requests.write(LevelingRequest::new(lander.part, LevelingAction::SetLinkedOffset(40.0)));
        }
        RUN_FRAMES => {
            exit.write(AppExit::Success);
        }
        _ => {}
    }
}

fn report_lander(
    mut frame: Local<u32>,
    lander: Option<Res<DemoLander>>,
    legs: Query<&AdjustableLeg>,
    angles: Query<&LevelAngle>,
) {
    *frame += 1;
    let Some(lander) = lander else { return };
    if *frame % REPORT_EVERY != 0 {
        return;
    }

    let angle = angles.get(lander.part).copied().unwrap_or_default();
    info!("[Demo] frame {}: level angle {}", *frame, angle);
    for leg in lander.legs.iter().filter_map(|&e| legs.get(e).ok()) {
        info!(
            "[Demo]   {:<16} {:.3} -> {:.3} ({:.1}%)",
            leg.display_name,
            leg.current_position(),
            leg.extension_distance(),
            leg.extension_fraction()
        );
    }
}
