// src/surface.rs
//! Ground probing shared by legs (foot alignment) and leveling bases
//! (distance sampling). The host world is reached through [`RaycastHost`];
//! [`SurfaceProbe`] restricts every cast to ground-like colliders so a part
//! never sees itself or the vessel it belongs to.

use bevy::prelude::*;
use std::sync::Arc;

/// Max probe length in world units. Long enough to reach the ground under a
/// fully extended leg, short enough to ignore terrain far below a hovering
/// vessel.
pub const PROBE_RANGE: f32 = 5.0;

// ---------- Collider categories ----------

/// Bitmask of collider categories known to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SurfaceLayers(pub u32);

impl SurfaceLayers {
    pub const NONE: Self = Self(0);
    pub const TERRAIN: Self = Self(1 << 0);
    /// Static world geometry: buildings, launch pads, rocks.
    pub const SCENERY: Self = Self(1 << 1);
    pub const PART: Self = Self(1 << 2);
    pub const VESSEL: Self = Self(1 << 3);
    pub const OTHER: Self = Self(1 << 4);
    /// Everything a leg is allowed to stand on.
    pub const GROUND: Self = Self(Self::TERRAIN.0 | Self::SCENERY.0);

    pub fn any(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

// ---------- Host seam ----------

/// Raw intersection reported by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub normal: Vec3,
    /// Category of the collider that was hit.
    pub layer: SurfaceLayers,
}

/// The host's bounded raycast. Implementations must only consider colliders
/// whose category overlaps `layers` and return the nearest one.
pub trait RaycastHost: Send + Sync + 'static {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        layers: SurfaceLayers,
    ) -> Option<RayHit>;
}

// ---------- Probe ----------

/// Outcome of a ground probe. A miss is an ordinary result, not an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProbeHit {
    Hit { distance: f32, normal: Vec3 },
    Miss,
}

impl ProbeHit {
    pub fn is_hit(self) -> bool {
        matches!(self, ProbeHit::Hit { .. })
    }

    /// Hit distance, or `sentinel` on a miss.
    pub fn distance_or(self, sentinel: f32) -> f32 {
        match self {
            ProbeHit::Hit { distance, .. } => distance,
            ProbeHit::Miss => sentinel,
        }
    }

    /// Hit normal, or `up` on a miss.
    pub fn normal_or(self, up: Vec3) -> Vec3 {
        match self {
            ProbeHit::Hit { normal, .. } => normal,
            ProbeHit::Miss => up,
        }
    }
}

/// Terrain-only bounded raycast, shared as a resource.
#[derive(Resource, Clone)]
pub struct SurfaceProbe {
    host: Arc<dyn RaycastHost>,
    range: f32,
}

impl Default for SurfaceProbe {
    /// A probe over an empty world: every cast misses.
    fn default() -> Self {
        Self::new(StaticSurfaces::default())
    }
}

impl SurfaceProbe {
    pub fn new(host: impl RaycastHost) -> Self {
        Self { host: Arc::new(host), range: PROBE_RANGE }
    }

    /// Cast from `origin` along `direction` against ground-like colliders.
    /// A zero or non-finite direction is a miss.
    pub fn cast(&self, origin: Vec3, direction: Vec3) -> ProbeHit {
        let Ok(dir) = Dir3::new(direction) else {
            return ProbeHit::Miss;
        };
        match self.host.raycast(origin, dir, self.range, SurfaceLayers::GROUND) {
            Some(hit)
                if hit.layer.any(SurfaceLayers::GROUND)
                    && hit.distance >= 0.0
                    && hit.distance <= self.range =>
            {
                ProbeHit::Hit {
                    distance: hit.distance,
                    normal: hit.normal.try_normalize().unwrap_or(-dir.as_vec3()),
                }
            }
            _ => ProbeHit::Miss,
        }
    }
}

// ---------- Static plane host ----------

/// One infinite, one-sided plane collider.
#[derive(Clone, Copy, Debug)]
pub struct SurfacePlane {
    pub point: Vec3,
    pub normal: Vec3,
    pub layer: SurfaceLayers,
}

impl SurfacePlane {
    /// Horizontal plane at height `y` facing +Y.
    pub fn horizontal(y: f32, layer: SurfaceLayers) -> Self {
        Self { point: Vec3::new(0.0, y, 0.0), normal: Vec3::Y, layer }
    }
}

/// A host made of flat planes: launch pads, test rigs, or an empty world.
#[derive(Clone, Debug, Default)]
pub struct StaticSurfaces {
    pub planes: Vec<SurfacePlane>,
}

impl StaticSurfaces {
    pub fn with_plane(mut self, plane: SurfacePlane) -> Self {
        self.planes.push(plane);
        self
    }
}

impl RaycastHost for StaticSurfaces {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        layers: SurfaceLayers,
    ) -> Option<RayHit> {
        let dir = direction.as_vec3();
        let mut best: Option<RayHit> = None;

        for plane in self.planes.iter().filter(|p| layers.any(p.layer)) {
            let Some(n) = plane.normal.try_normalize() else {
                continue;
            };
            let denom = dir.dot(n);
            // back faces and grazing rays never hit
            if denom >= -f32::EPSILON {
                continue;
            }
            let t = (plane.point - origin).dot(n) / denom;
            if t < 0.0 || t > max_distance {
                continue;
            }
            if best.is_none_or(|b| t < b.distance) {
                best = Some(RayHit { distance: t, normal: n, layer: plane.layer });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_at(y: f32) -> StaticSurfaces {
        StaticSurfaces::default().with_plane(SurfacePlane::horizontal(y, SurfaceLayers::TERRAIN))
    }

    #[test]
    fn probe_hits_terrain_below() {
        let probe = SurfaceProbe::new(ground_at(0.0));
        let hit = probe.cast(Vec3::new(3.0, 2.0, -1.0), Vec3::NEG_Y);
        match hit {
            ProbeHit::Hit { distance, normal } => {
                assert!((distance - 2.0).abs() < 1e-5);
                assert!((normal - Vec3::Y).length() < 1e-5);
            }
            ProbeHit::Miss => panic!("expected a hit"),
        }
    }

    #[test]
    fn probe_ignores_part_and_vessel_colliders() {
        let host = ground_at(0.0)
            .with_plane(SurfacePlane::horizontal(1.5, SurfaceLayers::PART))
            .with_plane(SurfacePlane::horizontal(1.0, SurfaceLayers::VESSEL));
        let probe = SurfaceProbe::new(host);
        let d = probe.cast(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y).distance_or(-1.0);
        assert!((d - 2.0).abs() < 1e-5);
    }

    #[test]
    fn scenery_counts_as_ground() {
        let host = ground_at(0.0).with_plane(SurfacePlane::horizontal(0.5, SurfaceLayers::SCENERY));
        let probe = SurfaceProbe::new(host);
        let d = probe.cast(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y).distance_or(-1.0);
        assert!((d - 1.5).abs() < 1e-5);
    }

    #[test]
    fn probe_misses_beyond_range() {
        let probe = SurfaceProbe::new(ground_at(0.0));
        let hit = probe.cast(Vec3::new(0.0, PROBE_RANGE + 1.0, 0.0), Vec3::NEG_Y);
        assert_eq!(hit, ProbeHit::Miss);
        assert_eq!(hit.distance_or(42.0), 42.0);
        assert_eq!(hit.normal_or(Vec3::Y), Vec3::Y);
    }

    #[test]
    fn degenerate_direction_is_a_miss() {
        let probe = SurfaceProbe::new(ground_at(0.0));
        assert_eq!(probe.cast(Vec3::Y, Vec3::ZERO), ProbeHit::Miss);
    }

    #[test]
    fn empty_world_always_misses() {
        let probe = SurfaceProbe::default();
        assert!(!probe.cast(Vec3::ZERO, Vec3::NEG_Y).is_hit());
    }
}
