//! Pachinko Board - a real-time Galton board particle simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, broad/narrow phase, integrator, spawning)
//! - `driver`: Frame pacing and the external command queue
//! - `snapshot`: Read-only render views handed to whatever draws the board
//! - `config`: Data-driven tuning of every physics constant

pub mod config;
pub mod driver;
pub mod sim;
pub mod snapshot;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{DecayPolicy, SimConfig};
pub use driver::{Command, FrameDriver};
pub use snapshot::{BodyInstance, RenderSnapshot};

/// Fixed layout proportions and physics defaults
pub mod consts {
    /// Downward acceleration (pixels/s²)
    pub const GRAVITY: f32 = 1800.0;
    /// Velocity retained per 1/60 s while airborne
    pub const AIR_DRAG: f32 = 0.995;
    /// Velocity retained per 1/60 s while resting on a bucket floor
    pub const GROUND_DRAG: f32 = 0.965;
    /// Restitution off world walls, bucket walls and bucket floors
    pub const BOUNCE: f32 = 0.33;
    /// Restitution off pegs (bouncier than the floor)
    pub const PEG_BOUNCE: f32 = 0.7;

    /// Largest wall-clock delta a single frame may integrate
    pub const MAX_FRAME_DT: f32 = 1.0 / 30.0;
    /// Substeps per frame
    pub const SUBSTEPS: u32 = 2;
    /// Reference rate the drag factors are expressed against
    pub const DRAG_REFERENCE_HZ: f32 = 60.0;

    /// Ball and peg sizes
    pub const BALL_RADIUS: f32 = 7.0;
    pub const PEG_RADIUS: f32 = 6.0;
    pub const PEG_SPACING: f32 = 32.0;

    /// Spatial hash cell size as a multiple of ball radius
    pub const GRID_CELL_RADII: f32 = 3.0;

    /// Peg lattice starts this far from the top/left edge
    pub const PEG_MARGIN_START: f32 = 40.0;
    /// Peg lattice stops this far from the right/bottom limit
    pub const PEG_MARGIN_END: f32 = 20.0;
    /// Pegs occupy the top 84% of the viewport
    pub const PEG_BOARD_FRACTION: f32 = 0.84;
    /// Bucket row starts at 85% of the viewport height
    pub const BUCKET_ROW_FRACTION: f32 = 0.85;
    /// Buckets are 15% of the viewport tall
    pub const BUCKET_HEIGHT_FRACTION: f32 = 0.15;

    /// Bottom edge of the off-screen funnel (just above the visible top)
    pub const FUNNEL_BOTTOM_Y: f32 = -10.0;
    /// Funnel mouth half-width as a fraction of viewport width
    pub const FUNNEL_MOUTH_FRACTION: f32 = 0.35;
    /// Funnel mouth never reaches closer than this to a side wall
    pub const FUNNEL_EDGE_MARGIN: f32 = 10.0;

    /// Pointer spawns are never placed above this y
    pub const POINTER_MIN_Y: f32 = 40.0;

    /// Demonstration batch size
    pub const DEMO_BATCH: u32 = 100;
    /// Seconds between ambient stream batches
    pub const STREAM_INTERVAL: f32 = 0.26;

    /// Seconds a bucketed ball lives before it is culled
    pub const DECAY_THRESHOLD: f32 = 3.0;
    /// Seconds of fade-out before culling
    pub const FADE_DURATION: f32 = 1.5;
}

/// Frame-rate independent drag: `factor` is the retention per 1/60 s
#[inline]
pub fn pow_drag(factor: f32, dt: f32) -> f32 {
    factor.powf(dt * consts::DRAG_REFERENCE_HZ)
}

/// Convert a `#RRGGBB` hex value into RGBA components in [0, 1]
#[inline]
pub const fn hex_to_rgba(hex: u32, alpha: f32) -> [f32; 4] {
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
        alpha,
    ]
}
