//! Read-only render views
//!
//! Whatever draws the board gets copies, never references into the live
//! state: a `RenderSnapshot` for general consumers (serializable for a JS
//! host) and a flat `BodyInstance` buffer a GPU pipeline can upload as-is.

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use crate::config::SimConfig;
use crate::sim::geometry::{Peg, Segment};
use crate::sim::state::SimulationState;

// ============================================================================
// GPU DATA (must match the instance layout in the consuming shader)
// ============================================================================

/// One ball, ready for instanced drawing
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BodyInstance {
    pub position: [f32; 2], // offset 0
    pub radius: f32,        // offset 8
    pub opacity: f32,       // offset 12
    pub color: [f32; 4],    // offset 16, linear RGBA, alpha already faded
}

/// Build the instance buffer for every live ball, in body order
pub fn body_instances(state: &SimulationState, config: &SimConfig) -> Vec<BodyInstance> {
    state
        .bodies
        .iter()
        .map(|body| {
            let opacity = body.opacity(config);
            BodyInstance {
                position: body.pos.to_array(),
                radius: body.radius,
                opacity,
                color: body.color.rgba(opacity),
            }
        })
        .collect()
}

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: [f32; 4],
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Balls classified into this bucket
    pub count: usize,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub width: f32,
    pub height: f32,
    pub bodies: Vec<BodyView>,
    pub pegs: Vec<Peg>,
    pub buckets: Vec<BucketView>,
    /// Funnel walls, only populated when `render_funnel` is set
    pub funnel: Vec<Segment>,
}

impl RenderSnapshot {
    pub fn capture(state: &SimulationState, config: &SimConfig) -> Self {
        let layout = &state.layout;
        let counts = state.bucket_counts();

        Self {
            width: layout.width,
            height: layout.height,
            bodies: state
                .bodies
                .iter()
                .map(|body| {
                    let opacity = body.opacity(config);
                    BodyView {
                        id: body.id,
                        x: body.pos.x,
                        y: body.pos.y,
                        radius: body.radius,
                        color: body.color.rgba(1.0),
                        opacity,
                    }
                })
                .collect(),
            pegs: layout.pegs.clone(),
            buckets: layout
                .buckets
                .iter()
                .zip(counts)
                .map(|(bucket, count)| BucketView {
                    x: bucket.origin.x,
                    y: bucket.origin.y,
                    width: bucket.width,
                    height: bucket.height,
                    count,
                })
                .collect(),
            funnel: if config.render_funnel {
                layout.funnel.clone()
            } else {
                Vec::new()
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Sum of all bucket counts
    pub fn bucketed(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::sim::state::BodyColor;

    fn populated() -> (SimulationState, SimConfig) {
        let config = SimConfig::default();
        let mut state = SimulationState::new(800.0, 600.0, 3, &config);
        state.add_body(Vec2::new(400.0, 590.0), Vec2::ZERO, BodyColor::Marker, &config);
        state.add_body(Vec2::new(100.0, 100.0), Vec2::ZERO, BodyColor::Stream, &config);
        state.reclassify();
        (state, config)
    }

    #[test]
    fn test_instance_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<BodyInstance>(), 32);
        let (state, config) = populated();
        let instances = body_instances(&state, &config);
        let bytes: &[u8] = bytemuck::cast_slice(&instances);
        assert_eq!(bytes.len(), 64);
    }

    #[test]
    fn test_instances_carry_faded_color() {
        let (mut state, config) = populated();
        state.bodies[0].time_in_bucket = config.decay_threshold - config.fade_duration * 0.5;
        let instances = body_instances(&state, &config);

        assert_eq!(instances[0].position, [400.0, 590.0]);
        assert!((instances[0].opacity - 0.5).abs() < 1e-4);
        assert!((instances[0].color[3] - 0.5).abs() < 1e-4);
        assert_eq!(instances[1].opacity, 1.0);
    }

    #[test]
    fn test_snapshot_counts_buckets_and_hides_funnel() {
        let (state, config) = populated();
        let snapshot = RenderSnapshot::capture(&state, &config);

        assert_eq!(snapshot.bodies.len(), 2);
        assert_eq!(snapshot.pegs.len(), state.layout.pegs.len());
        assert_eq!(snapshot.buckets.len(), state.layout.buckets.len());
        assert_eq!(snapshot.bucketed(), 1);
        assert!(snapshot.funnel.is_empty());

        let debug = SimConfig {
            render_funnel: true,
            ..Default::default()
        };
        assert_eq!(RenderSnapshot::capture(&state, &debug).funnel.len(), 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let (state, config) = populated();
        let json = RenderSnapshot::capture(&state, &config)
            .to_json()
            .expect("snapshot serializes");
        assert!(json.contains("\"buckets\""));
        assert!(json.contains("\"count\":1"));
    }
}
