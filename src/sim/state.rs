//! Simulation state and core entity types
//!
//! `SimulationState` is the single owner of every live ball plus the static
//! layout. Nothing here is global: the frame driver owns one and passes it by
//! reference into each step.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::Layout;
use super::spatial::SpatialHash;
use crate::config::SimConfig;
use crate::hex_to_rgba;

/// Palette for pointer-spawned balls
pub const BALL_PALETTE: [u32; 8] = [
    0xE94822, 0xF2910A, 0xEFD510, 0x00D4AA, 0x6C5CE7, 0xFD79A8, 0xC0C0C0, 0xFFD700,
];
/// Ambient stream and demonstration balls
pub const STREAM_COLOR: u32 = 0xC0C0C0;
/// The single highlighted ball in a demonstration
pub const MARKER_COLOR: u32 = 0xFFD700;

/// Color tag carried by each ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyColor {
    /// Index into `BALL_PALETTE`
    Palette(u8),
    Stream,
    Marker,
}

impl BodyColor {
    /// Pick a random palette color
    pub fn random(rng: &mut Pcg32) -> Self {
        BodyColor::Palette(rng.random_range(0..BALL_PALETTE.len()) as u8)
    }

    pub fn hex(&self) -> u32 {
        match self {
            BodyColor::Palette(i) => BALL_PALETTE[*i as usize % BALL_PALETTE.len()],
            BodyColor::Stream => STREAM_COLOR,
            BodyColor::Marker => MARKER_COLOR,
        }
    }

    pub fn rgba(&self, alpha: f32) -> [f32; 4] {
        hex_to_rgba(self.hex(), alpha)
    }
}

/// Lifecycle phase of a ball within one substep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPhase {
    /// Falling through the peg field or the funnel
    Airborne,
    /// Inside a bucket; `settled` once resting on the floor
    Bucketed { bucket: usize, settled: bool },
}

/// A ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: BodyColor,
    /// Resting on its bucket's floor
    pub on_floor: bool,
    /// Bucket this ball was classified into during the last substep
    pub bucket: Option<usize>,
    /// Seconds of accumulated decay time while bucketed
    pub time_in_bucket: f32,
}

impl Body {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, radius: f32, color: BodyColor) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            color,
            on_floor: false,
            bucket: None,
            time_in_bucket: 0.0,
        }
    }

    pub fn phase(&self) -> BodyPhase {
        match self.bucket {
            None => BodyPhase::Airborne,
            Some(bucket) => BodyPhase::Bucketed {
                bucket,
                settled: self.on_floor,
            },
        }
    }

    /// Reset bucket bookkeeping when the ball is back in the air
    pub fn mark_airborne(&mut self) {
        self.bucket = None;
        self.on_floor = false;
        self.time_in_bucket = 0.0;
    }

    /// Render opacity: 1 until the fade window, then down to 0 at removal
    pub fn opacity(&self, config: &SimConfig) -> f32 {
        if self.bucket.is_none() {
            return 1.0;
        }
        let fade_start = config.decay_threshold - config.fade_duration;
        if config.fade_duration <= 0.0 {
            return if self.time_in_bucket < config.decay_threshold { 1.0 } else { 0.0 };
        }
        (1.0 - (self.time_in_bucket - fade_start).max(0.0) / config.fade_duration).clamp(0.0, 1.0)
    }
}

/// Per-substep scratch buffers, reused across frames to avoid reallocating
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    /// Broad-phase grid over airborne balls
    pub grid: SpatialHash,
    /// Body indices per bucket, rebuilt every substep
    pub bucket_members: Vec<Vec<usize>>,
}

impl Scratch {
    /// Clear member lists, keeping their allocations
    pub fn reset_buckets(&mut self, bucket_count: usize) {
        self.bucket_members.resize_with(bucket_count, Vec::new);
        for members in &mut self.bucket_members {
            members.clear();
        }
    }
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Static pegs, buckets and funnel for the current viewport
    pub layout: Layout,
    /// Live balls in spawn order
    pub bodies: Vec<Body>,
    /// Substeps integrated so far
    pub time_ticks: u64,
    pub(crate) scratch: Scratch,
    next_id: u32,
}

impl SimulationState {
    /// Create an empty board for the given viewport
    pub fn new(width: f32, height: f32, seed: u64, config: &SimConfig) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            layout: Layout::generate(width, height, config),
            bodies: Vec::new(),
            time_ticks: 0,
            scratch: Scratch::default(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.layout.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.layout.height
    }

    /// Add a ball and return its id
    pub fn add_body(&mut self, pos: Vec2, vel: Vec2, color: BodyColor, config: &SimConfig) -> u32 {
        let id = self.next_entity_id();
        self.bodies.push(Body::new(id, pos, vel, config.body_radius, color));
        id
    }

    /// Rebuild the static layout for a new viewport
    ///
    /// Live balls are kept and immediately reclassified against the new buckets.
    pub fn resize(&mut self, width: f32, height: f32, config: &SimConfig) {
        self.layout = Layout::generate(width, height, config);
        self.reclassify();
    }

    /// Re-derive each ball's bucket from its current position
    pub fn reclassify(&mut self) {
        let layout = &self.layout;
        for body in &mut self.bodies {
            if layout.is_airborne(body.pos.y, body.radius) {
                body.mark_airborne();
            } else {
                body.bucket = layout.bucket_index_for_x(body.pos.x);
            }
        }
    }

    /// Apply a new radius to every live ball so all balls stay identical
    pub fn set_body_radius(&mut self, radius: f32) {
        for body in &mut self.bodies {
            body.radius = radius;
        }
    }

    /// Number of balls currently classified into each bucket
    pub fn bucket_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.layout.buckets.len()];
        for bucket in self.bodies.iter().filter_map(|b| b.bucket) {
            if let Some(count) = counts.get_mut(bucket) {
                *count += 1;
            }
        }
        counts
    }

    /// Remove every ball
    pub fn clear_bodies(&mut self) {
        self.bodies.clear();
    }
}
