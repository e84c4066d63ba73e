use bevy::prelude::*;

use crate::config::{attach_part_modules, PartDef};
use crate::heightmap_data::HeightmapTerrain;
use crate::part::{GravityWell, PartModel};
use crate::surface::SurfaceProbe;

pub const TERRAIN_SEED: u64 = 7;

/// A small lander with one leg per corner. Transform names match what
/// [`spawn_demo_scene`] builds for the model.
pub const LANDER_RON: &str = r#"
(
    name: "lander",
    legs: [
        (leg_id: "Leg01", display_name: Some("Fore Port"), extender_transform: "Leg01Extender",
         base_transform: "Leg01Base", foot_transform: Some("Leg01Foot"), extender_max: 1.5, extension_rate: 0.5),
        (leg_id: "Leg02", display_name: Some("Fore Starboard"), extender_transform: "Leg02Extender",
         base_transform: "Leg02Base", foot_transform: Some("Leg02Foot"), extender_max: 1.5, extension_rate: 0.5),
        (leg_id: "Leg03", display_name: Some("Aft Starboard"), extender_transform: "Leg03Extender",
         base_transform: "Leg03Base", foot_transform: Some("Leg03Foot"), extender_max: 1.5, extension_rate: 0.5),
        (leg_id: "Leg04", display_name: Some("Aft Port"), extender_transform: "Leg04Extender",
         base_transform: "Leg04Base", foot_transform: Some("Leg04Foot"), extender_max: 1.5, extension_rate: 0.5),
    ],
    leveling: Some((pivot_transform: "Pivot", minimum_auto_level_fraction: 10.0)),
)
"#;

/// Leg mount corners, relative to the part origin.
const CORNERS: [Vec3; 4] = [
    Vec3::new(-1.2, -0.5, 1.2),
    Vec3::new(1.2, -0.5, 1.2),
    Vec3::new(1.2, -0.5, -1.2),
    Vec3::new(-1.2, -0.5, -1.2),
];

/// Extender rest offset below its mount.
const EXTENDER_REST: Vec3 = Vec3::new(0.0, -0.3, 0.0);

/// Height of the part origin above the ground under it.
const HOVER: f32 = 1.6;

/// Handles to the demo part, for driving and reporting.
#[derive(Resource, Debug, Clone)]
pub struct DemoLander {
    pub part: Entity,
    pub legs: Vec<Entity>,
}

pub fn spawn_demo_scene(mut commands: Commands) {
    // 1) Terrain
    let terrain = HeightmapTerrain::procedural(TERRAIN_SEED, UVec2::splat(65), Vec2::splat(64.0), 2.0);
    let ground = terrain.sample_height(0.0, 0.0).unwrap_or(0.0);
    commands.insert_resource(SurfaceProbe::new(terrain));
    commands.insert_resource(GravityWell::default());

    let def = match PartDef::from_ron_str(LANDER_RON) {
        Ok(def) => def,
        Err(err) => {
            error!("[Demo] lander definition rejected: {}", err);
            return;
        }
    };

    // 2) Part + model transforms, slightly pitched as if set down on a slope
    let part = commands
        .spawn((
            Name::new(def.name.clone()),
            Transform::from_xyz(0.0, ground + HOVER, 0.0)
                .with_rotation(Quat::from_rotation_x(4f32.to_radians())),
        ))
        .id();

    let pivot = commands
        .spawn((Name::new("Pivot"), Transform::IDENTITY, ChildOf(part)))
        .id();
    let mut model = PartModel::new().with_transform("Pivot", pivot);

    for (i, corner) in CORNERS.iter().enumerate() {
        let id = format!("Leg{:02}", i + 1);
        let base = commands
            .spawn((Name::new(format!("{id}Base")), Transform::from_translation(*corner), ChildOf(part)))
            .id();
        let extender = commands
            .spawn((Name::new(format!("{id}Extender")), Transform::from_translation(EXTENDER_REST), ChildOf(base)))
            .id();
        let foot = commands
            .spawn((Name::new(format!("{id}Foot")), Transform::IDENTITY, ChildOf(extender)))
            .id();
        model.insert(format!("{id}Base"), base);
        model.insert(format!("{id}Extender"), extender);
        model.insert(format!("{id}Foot"), foot);
    }
    commands.entity(part).insert(model);

    // 3) Modules from the definition
    let legs = attach_part_modules(&mut commands, part, &def);
    info!("[Demo] spawned '{}' with {} legs at ground height {:.2}", def.name, legs.len(), ground);
    commands.insert_resource(DemoLander { part, legs });
}
