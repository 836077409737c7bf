//! Deterministic simulation module
//!
//! All board physics lives here. This module must be pure and deterministic:
//! - Frame deltas are split into a fixed number of substeps
//! - Seeded RNG only
//! - Stable iteration order (by body index, removal preserves order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod geometry;
pub mod spatial;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, Surface, ball_circle_collision, ball_segment_collision};
pub use geometry::{Bucket, Layout, Peg, Segment, bucket_count};
pub use spatial::SpatialHash;
pub use spawn::{AmbientStream, run_demo, spawn_at_pointer, spawn_body, spawn_from_funnel};
pub use state::{
    BALL_PALETTE, Body, BodyColor, BodyPhase, MARKER_COLOR, STREAM_COLOR, SimulationState,
};
pub use tick::{is_at_rest, step, substep};
