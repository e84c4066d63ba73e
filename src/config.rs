// src/config.rs
//! Data-driven part definitions (`*.part.ron`) + loader.

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::leg::{AdjustableLeg, FootOrienter, LegRigNames};
use crate::leveling::LevelingBase;

// ---------- Public plugin to register asset+loader ----------

/// Registers [`PartDef`] as an asset. Needs `AssetPlugin`.
pub struct PartDefAssetPlugin;

impl Plugin for PartDefAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<PartDef>().register_asset_loader(PartDefLoader);
    }
}

// ---------- Module definitions (data form) ----------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegDef {
    /// Stable name used to address the leg.
    pub leg_id: String,

    /// Label shown next to the leg's slider. Defaults to `leg_id`.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Model transform that slides when the leg extends.
    pub extender_transform: String,

    /// Model transform the leg is mounted at.
    pub base_transform: String,

    /// Model transform of the foot; no foot alignment if absent.
    #[serde(default)]
    pub foot_transform: Option<String>,

    #[serde(default = "default_extender_min")]
    pub extender_min: f32,

    #[serde(default = "default_extender_max")]
    pub extender_max: f32,

    /// Units per second.
    #[serde(default = "default_extension_rate")]
    pub extension_rate: f32,

    /// Degrees per second.
    #[serde(default = "default_foot_rate")]
    pub foot_angular_rate: f32,
}

fn default_extender_min() -> f32 {
    0.0
}
fn default_extender_max() -> f32 {
    1.0
}
fn default_extension_rate() -> f32 {
    1.0
}
fn default_foot_rate() -> f32 {
    90.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelingDef {
    /// Model transform leveling is computed around.
    pub pivot_transform: String,

    #[serde(default = "default_min_auto_level")]
    pub minimum_auto_level_fraction: f32,

    #[serde(default = "default_automated")]
    pub automated: bool,
}

fn default_min_auto_level() -> f32 {
    10.0
}
fn default_automated() -> bool {
    true
}

// ---------- Part definition asset ----------

#[derive(Asset, TypePath, Clone, Debug, Serialize, Deserialize)]
pub struct PartDef {
    pub name: String,

    #[serde(default)]
    pub legs: Vec<LegDef>,

    #[serde(default)]
    pub leveling: Option<LevelingDef>,
}

impl PartDef {
    pub fn from_ron_str(src: &str) -> Result<Self, PartDefLoadError> {
        Self::from_ron_bytes(src.as_bytes())
    }

    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, PartDefLoadError> {
        let def: PartDef =
            ron::de::from_bytes(bytes).map_err(|e| PartDefLoadError::Ron(e.to_string()))?;
        def.validate()?;
        Ok(def)
    }

    pub fn validate(&self) -> Result<(), PartDefLoadError> {
        let mut seen = HashSet::with_capacity(self.legs.len());
        for leg in &self.legs {
            if !seen.insert(leg.leg_id.as_str()) {
                return Err(PartDefLoadError::DuplicateLegId {
                    part: self.name.clone(),
                    leg_id: leg.leg_id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl LegDef {
    pub fn build(&self) -> (AdjustableLeg, LegRigNames) {
        let leg = AdjustableLeg::new(&self.leg_id, self.extender_min, self.extender_max, self.extension_rate)
            .with_display_name(self.display_name.clone().unwrap_or_else(|| self.leg_id.clone()));
        let names = LegRigNames {
            extender: self.extender_transform.clone(),
            base: self.base_transform.clone(),
            foot: self.foot_transform.clone(),
        };
        (leg, names)
    }
}

impl LevelingDef {
    pub fn build(&self) -> LevelingBase {
        LevelingBase::new(&self.pivot_transform)
            .with_minimum_auto_level_fraction(self.minimum_auto_level_fraction)
            .with_automated(self.automated)
    }
}

/// Attach the modules a definition describes to an already spawned part.
/// Each leg becomes a child entity of `part`; a leveling base goes on `part`
/// itself. Returns the leg entities in definition order.
pub fn attach_part_modules(commands: &mut Commands, part: Entity, def: &PartDef) -> Vec<Entity> {
    let legs = def
        .legs
        .iter()
        .map(|leg_def| {
            let (leg, names) = leg_def.build();
            let mut leg_entity = commands.spawn((
                Name::new(format!("{}/{}", def.name, leg_def.leg_id)),
                leg,
                names,
                ChildOf(part),
            ));
            if leg_def.foot_transform.is_some() {
                leg_entity.insert(FootOrienter::new(leg_def.foot_angular_rate));
            }
            leg_entity.id()
        })
        .collect();

    if let Some(leveling) = &def.leveling {
        commands.entity(part).insert(leveling.build());
    }

    legs
}

// ---------- Asset loader for `.part.ron` ----------

#[derive(Default)]
pub struct PartDefLoader;

impl AssetLoader for PartDefLoader {
    type Asset = PartDef;
    type Settings = ();
    type Error = PartDefLoadError;

    fn extensions(&self) -> &[&str] {
        &["part.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        PartDef::from_ron_bytes(&bytes)
    }
}

// ---------- Loader errors ----------

#[derive(thiserror::Error, Debug)]
pub enum PartDefLoadError {
    #[error("I/O while reading part definition: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("Duplicate leg id '{leg_id}' in part '{part}'")]
    DuplicateLegId { part: String, leg_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::asset::{AssetPlugin, LoadState};
    use std::time::Duration;

    const LANDER: &str = r#"
        (
            name: "lander",
            legs: [
                (
                    leg_id: "Leg01",
                    display_name: Some("Fore"),
                    extender_transform: "Leg01Extender",
                    base_transform: "Leg01Base",
                    foot_transform: Some("Leg01Foot"),
                    extender_max: 1.5,
                    extension_rate: 0.5,
                ),
                (
                    leg_id: "Leg02",
                    extender_transform: "Leg02Extender",
                    base_transform: "Leg02Base",
                ),
            ],
            leveling: Some((pivot_transform: "Pivot", minimum_auto_level_fraction: 20.0)),
        )
    "#;

    #[test]
    fn parses_with_defaults() {
        let def = PartDef::from_ron_str(LANDER).unwrap();
        assert_eq!(def.legs.len(), 2);

        let (fore, names) = def.legs[0].build();
        assert_eq!(fore.display_name, "Fore");
        assert_eq!(fore.max_distance(), 1.5);
        assert_eq!(fore.rate(), 0.5);
        assert_eq!(names.foot.as_deref(), Some("Leg01Foot"));

        let (aft, names) = def.legs[1].build();
        assert_eq!(aft.display_name, "Leg02");
        assert_eq!((aft.min_distance(), aft.max_distance(), aft.rate()), (0.0, 1.0, 1.0));
        assert!(names.foot.is_none());

        let base = def.leveling.as_ref().unwrap().build();
        assert_eq!(base.pivot_name, "Pivot");
        assert_eq!(base.minimum_auto_level_fraction, 20.0);
        assert!(base.automated);
    }

    #[test]
    fn rejects_duplicate_leg_ids() {
        let src = r#"(
            name: "twins",
            legs: [
                (leg_id: "A", extender_transform: "E1", base_transform: "B1"),
                (leg_id: "A", extender_transform: "E2", base_transform: "B2"),
            ],
        )"#;
        match PartDef::from_ron_str(src) {
            Err(PartDefLoadError::DuplicateLegId { part, leg_id }) => {
                assert_eq!(part, "twins");
                assert_eq!(leg_id, "A");
            }
            other => panic!("expected duplicate id error, got {other:?}"),
        }
    }

    #[test]
    fn reports_ron_errors() {
        assert!(matches!(PartDef::from_ron_str("(name: )"), Err(PartDefLoadError::Ron(_))));
    }

    #[test]
    fn attaches_legs_as_children_and_base_on_part() {
        let def = PartDef::from_ron_str(LANDER).unwrap();
        let mut world = World::new();
        let part = world.spawn_empty().id();

        let legs = {
            let mut commands = world.commands();
            attach_part_modules(&mut commands, part, &def)
        };
        world.flush();

        assert_eq!(legs.len(), 2);
        assert!(world.get::<LevelingBase>(part).is_some());
        for &leg in &legs {
            assert_eq!(world.get::<ChildOf>(leg).map(|c| c.parent()), Some(part));
            assert!(world.get::<AdjustableLeg>(leg).is_some());
        }
        assert!(world.get::<FootOrienter>(legs[0]).is_some());
        assert!(world.get::<FootOrienter>(legs[1]).is_none());
    }

    /// Write `src` as `<name>.part.ron` into a scratch asset folder and load
    /// it through the asset server, polling until the load settles.
    fn load_through_server(name: &str, src: &str) -> (App, Handle<PartDef>, LoadState) {
        let dir = std::env::temp_dir().join(format!("habutils-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{name}.part.ron")), src).unwrap();

        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            AssetPlugin { file_path: dir.to_string_lossy().into_owned(), ..default() },
            PartDefAssetPlugin,
        ));
        app.finish();
        app.cleanup();

        let handle: Handle<PartDef> = app
            .world()
            .resource::<AssetServer>()
            .load(format!("{name}.part.ron"));
        let mut state = LoadState::Loading;
        for _ in 0..500 {
            app.update();
            state = app.world().resource::<AssetServer>().load_state(&handle);
            if matches!(state, LoadState::Loaded | LoadState::Failed(_)) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        std::fs::remove_dir_all(&dir).ok();
        (app, handle, state)
    }

    #[test]
    fn asset_server_loads_part_definitions() {
        let (app, handle, state) = load_through_server("lander", LANDER);
        assert!(matches!(state, LoadState::Loaded), "state was {state:?}");

        let def = app.world().resource::<Assets<PartDef>>().get(&handle).unwrap();
        assert_eq!(def.name, "lander");
        assert_eq!(def.legs.len(), 2);
        assert_eq!(def.legs[0].extender_max, 1.5);
    }

    #[test]
    fn asset_server_rejects_invalid_definitions() {
        let src = r#"(
            name: "twins",
            legs: [
                (leg_id: "A", extender_transform: "E1", base_transform: "B1"),
                (leg_id: "A", extender_transform: "E2", base_transform: "B2"),
            ],
        )"#;
        let (app, handle, state) = load_through_server("twins", src);
        assert!(matches!(state, LoadState::Failed(_)), "state was {state:?}");
        assert!(app.world().resource::<Assets<PartDef>>().get(&handle).is_none());
    }
}
