//! Test app builders and part spawning.

use bevy::prelude::*;
use std::time::Duration;

use crate::leg::{AdjustableLeg, FootOrienter, LegRigNames};
use crate::leveling::LevelingBase;
use crate::part::PartModel;
use crate::surface::{StaticSurfaces, SurfaceLayers, SurfacePlane, SurfaceProbe};
use crate::HabUtilsPlugin;

/// Extender rest position relative to its leg base.
pub const EXTENDER_REST: Vec3 = Vec3::new(0.0, -0.25, 0.0);

/// App with the crate plugins, a manual clock and flat terrain at y = 0.
/// Fixed-step systems only run through [`tick`].
pub fn test_app() -> App {
    let mut app = App::new();
    app.init_resource::<Time>();
    app.add_plugins(HabUtilsPlugin);
    app.insert_resource(flat_ground(0.0));
    app.finish();
    app.cleanup();
    app
}

pub fn flat_ground(y: f32) -> SurfaceProbe {
    SurfaceProbe::new(
        StaticSurfaces::default().with_plane(SurfacePlane::horizontal(y, SurfaceLayers::TERRAIN)),
    )
}

/// Advance the clock by `dt` seconds and run one fixed step.
pub fn tick(app: &mut App, dt: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(dt));
    app.world_mut().run_schedule(FixedUpdate);
}

pub struct Lander {
    pub part: Entity,
    pub pivot: Entity,
    pub legs: Vec<Entity>,
    pub extenders: Vec<Entity>,
    pub feet: Vec<Entity>,
}

/// Four mounts on a 1x1 square, one unit below the part origin.
pub fn square_mounts() -> Vec<Vec3> {
    vec![
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
    ]
}

/// Spawn a part at `pose` with a pivot at its origin and one leg per mount
/// (local offsets). Global transforms are written directly since tests run
/// without transform propagation.
pub fn spawn_lander(world: &mut World, pose: Transform, mounts: &[Vec3], max_distance: f32) -> Lander {
    let part_global = GlobalTransform::from(pose);
    let part = world.spawn((pose, part_global)).id();
    let pivot = world
        .spawn((Transform::IDENTITY, part_global, ChildOf(part)))
        .id();

    let mut model = PartModel::new().with_transform("Pivot", pivot);
    let mut lander = Lander { part, pivot, legs: vec![], extenders: vec![], feet: vec![] };

    for (i, &mount) in mounts.iter().enumerate() {
        let base_local = Transform::from_translation(mount);
        let base_global = part_global.mul_transform(base_local);
        let base = world.spawn((base_local, base_global, ChildOf(part))).id();

        let ext_local = Transform::from_translation(EXTENDER_REST);
        let ext_global = base_global.mul_transform(ext_local);
        let extender = world.spawn((ext_local, ext_global, ChildOf(base))).id();
        let foot = world
            .spawn((Transform::IDENTITY, ext_global, ChildOf(extender)))
            .id();

        let id = format!("Leg{:02}", i + 1);
        model.insert(format!("{id}Base"), base);
        model.insert(format!("{id}Extender"), extender);
        model.insert(format!("{id}Foot"), foot);

        let leg = world
            .spawn((
                AdjustableLeg::new(&id, 0.0, max_distance, 1.0),
                LegRigNames {
                    extender: format!("{id}Extender"),
                    base: format!("{id}Base"),
                    foot: Some(format!("{id}Foot")),
                },
                FootOrienter::new(90.0),
                ChildOf(part),
            ))
            .id();

        lander.legs.push(leg);
        lander.extenders.push(extender);
        lander.feet.push(foot);
    }

    world
        .entity_mut(part)
        .insert((model, LevelingBase::new("Pivot")));
    lander
}

pub fn leg<'a>(app: &'a App, entity: Entity) -> &'a AdjustableLeg {
    app.world().get::<AdjustableLeg>(entity).unwrap()
}

pub fn base(app: &App, entity: Entity) -> &LevelingBase {
    app.world().get::<LevelingBase>(entity).unwrap()
}
