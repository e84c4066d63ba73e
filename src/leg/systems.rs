// src/leg/systems.rs

use bevy::prelude::*;

use crate::actions::{LegAction, LegRequest};
use crate::leg::components::{AdjustableLeg, FootOrienter, LegDisabled, LegRig, LegRigNames};
use crate::part::{GravityWell, PartModel, RigError};
use crate::surface::SurfaceProbe;

fn resolve_rig(
    names: &LegRigNames,
    model: Option<&PartModel>,
) -> Result<(Entity, Entity, Option<Entity>), RigError> {
    let model = model.ok_or(RigError::NoPartModel)?;
    let extender = model.find(&names.extender)?;
    let base = model.find(&names.base)?;
    let foot = names.foot.as_deref().map(|n| model.find(n)).transpose()?;
    Ok((extender, base, foot))
}

/// Resolves each new leg's model transforms against its part.
/// Success snaps the extender to the (possibly restored) goal; failure
/// logs once and leaves the leg motionless.
pub fn setup_legs(
    mut commands: Commands,
    mut legs: Query<
        (Entity, &mut AdjustableLeg, &LegRigNames, Option<&ChildOf>),
        (Without<LegRig>, Without<LegDisabled>),
    >,
    models: Query<&PartModel>,
    globals: Query<&GlobalTransform>,
    mut transforms: Query<&mut Transform>,
) {
    for (entity, mut leg, names, child_of) in &mut legs {
        let model = child_of.and_then(|c| models.get(c.parent()).ok());

        let (extender, base, foot) = match resolve_rig(names, model) {
            Ok(rig) => rig,
            Err(err) => {
                error!("[AdjustableLeg] {}: {}", leg.leg_id, err);
                commands.entity(entity).insert(LegDisabled);
                continue;
            }
        };

        let Ok(mut extender_tf) = transforms.get_mut(extender) else {
            error!("[AdjustableLeg] {}: extender '{}' has no Transform", leg.leg_id, names.extender);
            commands.entity(entity).insert(LegDisabled);
            continue;
        };
        let zero_position = extender_tf.translation;

        // 1) Loaded legs start where they were saved, no visible travel
        leg.snap_to_goal();
        extender_tf.translation = zero_position + Vec3::Y * leg.current_position();

        // 2) Anchor for the leveling base
        if let Ok(base_global) = globals.get(base) {
            leg.set_mount_position(base_global.translation());
        }

        commands.entity(entity).insert(LegRig { extender, base, foot, zero_position });
        debug!("[AdjustableLeg] {} ready", leg.leg_id);
    }
}

/// Copies each leg's base transform into its mount position.
pub fn sync_leg_mounts(
    mut legs: Query<(&mut AdjustableLeg, &LegRig)>,
    globals: Query<&GlobalTransform>,
) {
    for (mut leg, rig) in &mut legs {
        if let Ok(g) = globals.get(rig.base) {
            let p = g.translation();
            if leg.mount_position() != p {
                leg.set_mount_position(p);
            }
        }
    }
}

/// Applies per-leg UI commands.
pub fn handle_leg_requests(
    mut requests: EventReader<LegRequest>,
    mut legs: Query<&mut AdjustableLeg>,
) {
    for req in requests.read() {
        let Ok(mut leg) = legs.get_mut(req.leg) else {
            warn!("[AdjustableLeg] request for unknown leg {:?}", req.leg);
            continue;
        };
        match req.action {
            LegAction::SetFraction(f) => leg.set_extension_fraction(f),
            LegAction::SetDistance(d) => leg.set_extension_distance(d),
        }
    }
}

/// Moves every active leg toward its goal using the scaled fixed-step delta.
pub fn advance_legs(time: Res<Time>, mut legs: Query<&mut AdjustableLeg, With<LegRig>>) {
    let dt = time.delta_secs();
    for mut leg in &mut legs {
        if !leg.is_settled() {
            leg.advance(dt);
        }
    }
}

/// Probes the ground under each foot and turns the foot toward it.
pub fn orient_feet(
    time: Res<Time>,
    probe: Res<SurfaceProbe>,
    gravity: Res<GravityWell>,
    mut legs: Query<(&mut AdjustableLeg, &mut FootOrienter, &LegRig)>,
    globals: Query<&GlobalTransform>,
) {
    let dt = time.delta_secs();
    for (mut leg, mut foot, rig) in &mut legs {
        let Some(foot_entity) = rig.foot else { continue };
        let Ok(g) = globals.get(foot_entity) else { continue };

        let origin = g.translation();
        let down = gravity.down_from(origin);
        let normal = probe.cast(origin, down).normal_or(-down);
        leg.set_surface_normal(normal);
        foot.advance(leg.surface_normal(), dt);
    }
}

/// Writes leg state back onto the model: extender travel and foot tilt.
pub fn drive_leg_transforms(
    legs: Query<(&AdjustableLeg, &LegRig, Option<&FootOrienter>)>,
    globals: Query<&GlobalTransform>,
    mut transforms: Query<&mut Transform>,
) {
    for (leg, rig, foot) in &legs {
        if let Ok(mut tf) = transforms.get_mut(rig.extender) {
            let target = rig.zero_position + Vec3::Y * leg.current_position();
            if tf.translation != target {
                tf.translation = target;
            }
        }

        let (Some(foot), Some(foot_entity)) = (foot, rig.foot) else { continue };
        // the foot hangs off the extender, which carries the part's rotation
        let parent = globals
            .get(rig.extender)
            .map(|g| g.to_scale_rotation_translation().1)
            .unwrap_or(Quat::IDENTITY);
        if let Ok(mut tf) = transforms.get_mut(foot_entity) {
            tf.rotation = foot.local_rotation(parent);
        }
    }
}
