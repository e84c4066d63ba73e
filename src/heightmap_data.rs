// src/heightmap_data.rs
use bevy::math::{UVec2, Vec2};
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::sync::Arc;

use crate::surface::{RayHit, RaycastHost, SurfaceLayers};

/// Bisection steps once a ray has crossed the surface.
const BISECT_STEPS: usize = 16;

/// Height-field terrain sampled on a regular XZ grid.
#[derive(Clone)]
pub struct HeightmapTerrain {
    /// Size of the terrain in world units (X,Z)
    pub size: Vec2,
    /// World-space XZ of the min corner
    pub origin: Vec2,
    /// World height of a normalized sample of 0.0
    pub base_height: f32,
    /// World meters per full normalized height (1.0)
    pub height_scale: f32,
    /// Grid samples along X and Z (at least 2x2)
    pub resolution: UVec2,
    /// Normalized heights in [0,1], row-major (z rows of x samples)
    heights: Arc<Vec<f32>>,
}

#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    #[error("could not read heightmap image: {0}")]
    Image(#[from] image::ImageError),
    #[error("heightmap must be at least 2x2 samples, got {0}x{1}")]
    TooSmall(u32, u32),
    #[error("expected {expected} height samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },
}

impl HeightmapTerrain {
    /// Wrap a normalized height grid. Values are clamped into [0,1].
    pub fn from_samples(
        resolution: UVec2,
        samples: Vec<f32>,
        size: Vec2,
        height_scale: f32,
    ) -> Result<Self, TerrainError> {
        if resolution.x < 2 || resolution.y < 2 {
            return Err(TerrainError::TooSmall(resolution.x, resolution.y));
        }
        let expected = (resolution.x * resolution.y) as usize;
        if samples.len() != expected {
            return Err(TerrainError::SampleCount { expected, actual: samples.len() });
        }
        let heights = samples.into_iter().map(|h| h.clamp(0.0, 1.0)).collect();

        Ok(Self {
            size,
            // center the map so (0,0) is in the middle
            origin: -size * 0.5,
            base_height: 0.0,
            height_scale,
            resolution,
            heights: Arc::new(heights),
        })
    }

    /// Load a grayscale heightmap (8 or 16 bit) from disk.
    pub fn from_image(
        path: impl AsRef<Path>,
        size: Vec2,
        height_scale: f32,
    ) -> Result<Self, TerrainError> {
        let img = image::open(path)?.to_luma16();
        let resolution = UVec2::new(img.width(), img.height());
        let samples = img.pixels().map(|p| p.0[0] as f32 / u16::MAX as f32).collect();
        Self::from_samples(resolution, samples, size, height_scale)
    }

    /// Perfectly flat terrain at world height `height`.
    pub fn flat(size: Vec2, height: f32) -> Self {
        Self {
            size,
            origin: -size * 0.5,
            base_height: height,
            height_scale: 0.0,
            resolution: UVec2::splat(2),
            heights: Arc::new(vec![0.0; 4]),
        }
    }

    /// Rolling terrain built from a deterministic set of smooth bumps.
    /// Identical seeds give identical terrain.
    pub fn procedural(seed: u64, resolution: UVec2, size: Vec2, height_scale: f32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let res = resolution.max(UVec2::splat(2));

        // (center, radius, amplitude) in normalized grid space
        let bumps: Vec<(Vec2, f32, f32)> = (0..12)
            .map(|_| {
                let c = Vec2::new(rng.random::<f32>(), rng.random::<f32>());
                let r = rng.random_range(0.08..0.35);
                let a = rng.random_range(-1.0..1.0);
                (c, r, a)
            })
            .collect();

        let mut raw = Vec::with_capacity((res.x * res.y) as usize);
        for z in 0..res.y {
            for x in 0..res.x {
                let p = Vec2::new(x as f32 / (res.x - 1) as f32, z as f32 / (res.y - 1) as f32);
                let h: f32 = bumps
                    .iter()
                    .map(|(c, r, a)| a * (-(p.distance_squared(*c)) / (r * r)).exp())
                    .sum();
                raw.push(h);
            }
        }

        // Normalize into [0,1]
        let (lo, hi) = raw
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        let span = (hi - lo).max(f32::EPSILON);
        let heights = raw.into_iter().map(|h| (h - lo) / span).collect();

        Self {
            size,
            origin: -size * 0.5,
            base_height: 0.0,
            height_scale,
            resolution: res,
            heights: Arc::new(heights),
        }
    }

    #[inline]
    fn get_clamped(&self, x: i32, z: i32) -> f32 {
        let xi = x.clamp(0, self.resolution.x as i32 - 1) as u32;
        let zi = z.clamp(0, self.resolution.y as i32 - 1) as u32;
        self.heights[(zi * self.resolution.x + xi) as usize]
    }

    /// Bilinear-sample the terrain height (world units) at (world_x, world_z).
    /// Returns None outside the terrain.
    pub fn sample_height(&self, world_x: f32, world_z: f32) -> Option<f32> {
        let lx = world_x - self.origin.x;
        let lz = world_z - self.origin.y;
        if lx < 0.0 || lz < 0.0 || lx > self.size.x || lz > self.size.y {
            return None;
        }

        let max_x = self.resolution.x as i32 - 1;
        let max_z = self.resolution.y as i32 - 1;
        let px = (lx / self.size.x).clamp(0.0, 1.0) * max_x as f32;
        let pz = (lz / self.size.y).clamp(0.0, 1.0) * max_z as f32;

        let x0 = px.floor() as i32;
        let z0 = pz.floor() as i32;
        let dx = px - x0 as f32;
        let dz = pz - z0 as f32;

        let s00 = self.get_clamped(x0, z0);
        let s10 = self.get_clamped(x0 + 1, z0);
        let s01 = self.get_clamped(x0, z0 + 1);
        let s11 = self.get_clamped(x0 + 1, z0 + 1);

        let a = s00 * (1.0 - dx) + s10 * dx;
        let b = s01 * (1.0 - dx) + s11 * dx;
        let norm = a * (1.0 - dz) + b * dz;

        Some(self.base_height + norm * self.height_scale)
    }

    /// Surface normal from central differences, one grid cell wide.
    pub fn sample_normal(&self, world_x: f32, world_z: f32) -> Option<Vec3> {
        let (dx, dz) = self.cell_size();
        let h = |x: f32, z: f32| {
            let x = x.clamp(self.origin.x, self.origin.x + self.size.x);
            let z = z.clamp(self.origin.y, self.origin.y + self.size.y);
            self.sample_height(x, z)
        };
        // bail if the center itself is off the map
        self.sample_height(world_x, world_z)?;

        let dhdx = (h(world_x + dx, world_z)? - h(world_x - dx, world_z)?) / (2.0 * dx);
        let dhdz = (h(world_x, world_z + dz)? - h(world_x, world_z - dz)?) / (2.0 * dz);
        Some(Vec3::new(-dhdx, 1.0, -dhdz).normalize())
    }

    fn cell_size(&self) -> (f32, f32) {
        let dx = self.size.x / (self.resolution.x - 1) as f32;
        let dz = self.size.y / (self.resolution.y - 1) as f32;
        (dx.max(1e-3), dz.max(1e-3))
    }

    /// Height of `p` above the terrain directly beneath it, if on the map.
    fn clearance(&self, p: Vec3) -> Option<f32> {
        self.sample_height(p.x, p.z).map(|g| p.y - g)
    }
}

impl RaycastHost for HeightmapTerrain {
    /// March along the ray in half-cell steps until it drops below the
    /// surface, then bisect for the crossing point.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        layers: SurfaceLayers,
    ) -> Option<RayHit> {
        if !layers.any(SurfaceLayers::TERRAIN) || max_distance <= 0.0 {
            return None;
        }
        let dir = direction.as_vec3();

        let hit_at = |t: f32| {
            let p = origin + dir * t;
            let normal = self.sample_normal(p.x, p.z).unwrap_or(Vec3::Y);
            RayHit { distance: t, normal, layer: SurfaceLayers::TERRAIN }
        };

        // 1) Starting underground counts as touching
        if self.clearance(origin).is_some_and(|c| c <= 0.0) {
            return Some(hit_at(0.0));
        }

        // 2) March
        let (cx, cz) = self.cell_size();
        let step = (cx.min(cz) * 0.5).min(max_distance);
        let mut t_low = 0.0;
        let mut t_high = None;
        let mut t = 0.0;
        while t < max_distance {
            t = (t + step).min(max_distance);
            match self.clearance(origin + dir * t) {
                Some(c) if c <= 0.0 => {
                    t_high = Some(t);
                    break;
                }
                _ => t_low = t,
            }
        }
        let mut t_high = t_high?;

        // 3) Bisect between the last point above ground and the first below
        for _ in 0..BISECT_STEPS {
            let t_mid = (t_low + t_high) * 0.5;
            match self.clearance(origin + dir * t_mid) {
                Some(c) if c <= 0.0 => t_high = t_mid,
                _ => t_low = t_mid,
            }
        }

        Some(hit_at(t_high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightmapTerrain {
        // Height rises 1 unit per unit of X across a 10x10 patch.
        let res = UVec2::new(11, 11);
        let samples = (0..11)
            .flat_map(|_z| (0..11).map(|x| x as f32 / 10.0))
            .collect();
        HeightmapTerrain::from_samples(res, samples, Vec2::splat(10.0), 10.0).unwrap()
    }

    #[test]
    fn flat_terrain_samples_constant_height() {
        let t = HeightmapTerrain::flat(Vec2::splat(100.0), 3.0);
        assert_eq!(t.sample_height(0.0, 0.0), Some(3.0));
        assert_eq!(t.sample_height(49.0, -49.0), Some(3.0));
        assert_eq!(t.sample_height(51.0, 0.0), None);
    }

    #[test]
    fn ramp_normal_leans_against_slope() {
        let t = ramp();
        let n = t.sample_normal(0.0, 0.0).unwrap();
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        assert!((n - expected).length() < 1e-3, "normal was {n:?}");
    }

    #[test]
    fn raycast_finds_flat_ground() {
        let t = HeightmapTerrain::flat(Vec2::splat(100.0), 1.0);
        let hit = t
            .raycast(Vec3::new(2.0, 3.5, 2.0), Dir3::NEG_Y, 5.0, SurfaceLayers::GROUND)
            .unwrap();
        assert!((hit.distance - 2.5).abs() < 1e-3);
        assert_eq!(hit.layer, SurfaceLayers::TERRAIN);
        assert!((hit.normal - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn raycast_on_ramp_matches_sampled_height() {
        let t = ramp();
        let ground = t.sample_height(1.3, 0.0).unwrap();
        let hit = t
            .raycast(Vec3::new(1.3, ground + 2.0, 0.0), Dir3::NEG_Y, 5.0, SurfaceLayers::GROUND)
            .unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-3);
    }

    #[test]
    fn raycast_respects_range_and_layers() {
        let t = HeightmapTerrain::flat(Vec2::splat(100.0), 0.0);
        let origin = Vec3::new(0.0, 6.0, 0.0);
        assert!(t.raycast(origin, Dir3::NEG_Y, 5.0, SurfaceLayers::GROUND).is_none());
        assert!(t.raycast(origin, Dir3::NEG_Y, 10.0, SurfaceLayers::PART).is_none());
        assert!(t.raycast(origin, Dir3::NEG_Y, 10.0, SurfaceLayers::TERRAIN).is_some());
    }

    #[test]
    fn loads_grayscale_png() {
        let dir = std::env::temp_dir().join(format!("habutils-heightmap-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("step.png");
        // left column low, right column high
        let img = image::GrayImage::from_fn(3, 2, |x, _| image::Luma([if x == 2 { 255 } else { 0 }]));
        img.save(&path).unwrap();

        let t = HeightmapTerrain::from_image(&path, Vec2::new(4.0, 2.0), 10.0).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(t.resolution, UVec2::new(3, 2));
        assert!(t.sample_height(-2.0, 0.0).unwrap().abs() < 1e-4);
        assert!((t.sample_height(2.0, 0.0).unwrap() - 10.0).abs() < 1e-3);
        assert!((t.sample_height(1.0, 0.0).unwrap() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn missing_image_is_an_error() {
        let missing = std::env::temp_dir().join("habutils-no-such-heightmap.png");
        assert!(matches!(
            HeightmapTerrain::from_image(missing, Vec2::ONE, 1.0),
            Err(TerrainError::Image(_))
        ));
    }

    #[test]
    fn procedural_terrain_is_deterministic() {
        let a = HeightmapTerrain::procedural(7, UVec2::splat(33), Vec2::splat(64.0), 4.0);
        let b = HeightmapTerrain::procedural(7, UVec2::splat(33), Vec2::splat(64.0), 4.0);
        let c = HeightmapTerrain::procedural(8, UVec2::splat(33), Vec2::splat(64.0), 4.0);
        let probe = |t: &HeightmapTerrain| t.sample_height(5.0, -3.0).unwrap();
        assert_eq!(probe(&a), probe(&b));
        assert_ne!(probe(&a), probe(&c));
        assert!((0.0..=4.0).contains(&probe(&a)));
    }

    #[test]
    fn rejects_bad_sample_grids() {
        let tiny = HeightmapTerrain::from_samples(UVec2::new(1, 4), vec![0.0; 4], Vec2::ONE, 1.0);
        assert!(matches!(tiny, Err(TerrainError::TooSmall(1, 4))));
        let short = HeightmapTerrain::from_samples(UVec2::new(2, 2), vec![0.0; 3], Vec2::ONE, 1.0);
        assert!(matches!(short, Err(TerrainError::SampleCount { expected: 4, actual: 3 })));
    }
}
