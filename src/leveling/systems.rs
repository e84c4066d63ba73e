// src/leveling/systems.rs

use bevy::prelude::*;

use crate::actions::{LevelingAction, LevelingRequest};
use crate::leg::AdjustableLeg;
use crate::leveling::components::{BaseStatus, LevelAngle, LevelingBase};
use crate::part::{GravityWell, PartModel, Pose, VesselSituation};
use crate::surface::SurfaceProbe;
use crate::ui::ScreenMessage;

pub const AUTO_LEVEL_DISABLED: &str = "Auto-leveling is disabled for this part";

/// One-time discovery: resolve the pivot and collect the legs mounted on the
/// same part. A missing pivot disables the base (logged once, here).
pub fn discover_leveling_legs(
    mut bases: Query<(Entity, &mut LevelingBase, Option<&PartModel>)>,
    leg_modules: Query<(Entity, &ChildOf), With<AdjustableLeg>>,
    mut legs: Query<&mut AdjustableLeg>,
) {
    for (part, mut base, model) in &mut bases {
        if base.status() != BaseStatus::Pending {
            continue;
        }

        let pivot = match model.map(|m| m.find(&base.pivot_name)) {
            Some(Ok(pivot)) => pivot,
            Some(Err(err)) => {
                error!("[LevelingBase] {:?}: {}; leveling disabled", part, err);
                base.disable();
                continue;
            }
            None => {
                error!("[LevelingBase] {:?}: part has no model; leveling disabled", part);
                base.disable();
                continue;
            }
        };

        // 1) Legs on this part, in a stable order
        let mut found: Vec<(String, Entity)> = leg_modules
            .iter()
            .filter(|(_, child_of)| child_of.parent() == part)
            .filter_map(|(e, _)| legs.get(e).ok().map(|l| (l.leg_id.clone(), e)))
            .collect();
        found.sort();
        let handles: Vec<Entity> = found.into_iter().map(|(_, e)| e).collect();

        base.attach(pivot, handles, &legs);

        // 2) Automated bases drive their legs; hide the per-leg sliders
        let automated = base.automated;
        for &h in base.legs() {
            if let Ok(mut leg) = legs.get_mut(h) {
                leg.set_ui_visibility(!automated);
            }
        }

        info!(
            "[LevelingBase] {:?}: {} legs attached, max leg distance {:.2}",
            part,
            base.legs().len(),
            base.max_leg_distance()
        );
    }
}

/// Applies UI/host commands to leveling bases.
pub fn handle_leveling_requests(
    mut requests: EventReader<LevelingRequest>,
    probe: Res<SurfaceProbe>,
    gravity: Res<GravityWell>,
    mut bases: Query<&mut LevelingBase>,
    globals: Query<&GlobalTransform>,
    mut legs: Query<&mut AdjustableLeg>,
    mut messages: EventWriter<ScreenMessage>,
) {
    for req in requests.read() {
        let Ok(mut base) = bases.get_mut(req.base) else {
            warn!("[LevelingBase] request for unknown base {:?}", req.base);
            continue;
        };
        match base.status() {
            BaseStatus::Active => {}
            BaseStatus::Pending => {
                warn!("[LevelingBase] {:?} not ready, dropping {:?}", req.base, req.action);
                continue;
            }
            BaseStatus::Disabled => continue,
        }

        match req.action {
            LevelingAction::AutoLevel | LevelingAction::Deploy => {
                if !base.automated {
                    warn!("[LevelingBase] {:?}: {}", req.base, AUTO_LEVEL_DISABLED);
                    messages.write(ScreenMessage::new(AUTO_LEVEL_DISABLED));
                    continue;
                }
                let Some(pivot) = base.pivot().and_then(|p| globals.get(p).ok()) else {
                    error!("[LevelingBase] {:?}: pivot transform vanished; leveling disabled", req.base);
                    base.disable();
                    continue;
                };
                let pivot = Pose::from_global(pivot);
                let leveled = base
                    .auto_level(pivot, &gravity, &probe, &mut legs)
                    .map(|s| (s.legs.len(), s.legs.iter().filter(|l| !l.probe.is_hit()).count()));
                let Some((count, misses)) = leveled else {
                    warn!("[LevelingBase] {:?}: no legs to level", req.base);
                    continue;
                };
                if misses > 0 {
                    warn!("[LevelingBase] {:?}: {} legs found no ground", req.base, misses);
                }
                info!(
                    "[LevelingBase] {:?}: leveled {} legs, offset {:.1}%",
                    req.base,
                    count,
                    base.linked_offset_fraction()
                );
                if req.action == LevelingAction::Deploy {
                    base.deployed = true;
                }
            }
            LevelingAction::SetLinkedOffset(fraction) => {
                base.set_linked_offset(fraction, &mut legs);
            }
            LevelingAction::Retract => {
                base.retract(&mut legs);
                base.deployed = false;
            }
            LevelingAction::SetAutomated(on) => {
                base.automated = on;
                for &h in base.legs() {
                    if let Ok(mut leg) = legs.get_mut(h) {
                        leg.set_ui_visibility(!on);
                    }
                }
            }
        }
    }
}

/// Publishes each base's tilt for the UI.
pub fn publish_level_angle(
    gravity: Res<GravityWell>,
    mut bases: Query<(&LevelingBase, &VesselSituation, &mut LevelAngle)>,
    globals: Query<&GlobalTransform>,
) {
    for (base, situation, mut angle) in &mut bases {
        let value = base
            .pivot()
            .and_then(|p| globals.get(p).ok())
            .and_then(|g| base.compute_level_angle(Pose::from_global(g), &gravity, *situation));
        if angle.0 != value {
            angle.0 = value;
        }
    }
}
