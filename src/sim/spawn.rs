//! Spawn controller
//!
//! Three sources feed the board: pointer presses, the ambient stream and the
//! demonstration batch. Every ball enters either through the off-screen
//! funnel or at a validated point above the bucket row.

use glam::Vec2;
use rand::Rng;

use super::state::{BodyColor, SimulationState};
use crate::config::SimConfig;
use crate::consts::{FUNNEL_BOTTOM_Y, POINTER_MIN_Y};

/// Add one ball at `pos` with a random horizontal ejection velocity
///
/// A `None` color picks from the palette.
pub fn spawn_body(
    state: &mut SimulationState,
    config: &SimConfig,
    pos: Vec2,
    color: Option<BodyColor>,
) -> u32 {
    let vx = (state.rng.random::<f32>() - 0.5) * config.spawn_speed;
    let color = match color {
        Some(color) => color,
        None => BodyColor::random(&mut state.rng),
    };
    state.add_body(pos, Vec2::new(vx, 0.0), color, config)
}

/// Drop `count` balls just inside the funnel mouth
pub fn spawn_from_funnel(
    state: &mut SimulationState,
    config: &SimConfig,
    count: u32,
    color: Option<BodyColor>,
) {
    let cx = state.layout.center_x();
    let spread = (config.funnel_gap * 0.6).max(8.0);
    for _ in 0..count {
        let x = cx + (state.rng.random::<f32>() - 0.5) * spread;
        let y = FUNNEL_BOTTOM_Y - 2.0 - state.rng.random::<f32>() * 8.0;
        spawn_body(state, config, Vec2::new(x, y), color);
    }
    log::debug!("Spawned {count} from funnel ({} live)", state.bodies.len());
}

/// Handle a pointer press at screen coordinates; returns how many balls spawned
///
/// Presses near the top edge go through the funnel; presses inside the
/// bucket row are ignored.
pub fn spawn_at_pointer(state: &mut SimulationState, config: &SimConfig, x: f32, y: f32) -> usize {
    if !x.is_finite() || !y.is_finite() {
        return 0;
    }
    if y < config.pointer_funnel_zone {
        spawn_from_funnel(state, config, 1, None);
        return 1;
    }
    if !state.layout.is_airborne(y, config.body_radius) {
        return 0;
    }

    let r = config.body_radius;
    let jitter = (state.rng.random::<f32>() - 0.5) * config.pointer_jitter;
    let width = state.width();
    let x = if width >= 2.0 * r {
        (x + jitter).clamp(r, width - r)
    } else {
        width * 0.5
    };
    spawn_body(state, config, Vec2::new(x, y.max(POINTER_MIN_Y)), None);
    1
}

/// Clear the board and drop the demonstration batch plus one marker ball
pub fn run_demo(state: &mut SimulationState, config: &SimConfig) {
    state.clear_bodies();
    spawn_from_funnel(state, config, config.demo_batch, Some(BodyColor::Stream));
    spawn_from_funnel(state, config, 1, Some(BodyColor::Marker));
    log::info!("Demonstration: {} balls released", config.demo_batch + 1);
}

/// Recurring funnel spawner driven by simulated time
#[derive(Debug, Clone, Default)]
pub struct AmbientStream {
    active: bool,
    /// Seconds since the last batch
    elapsed: f32,
}

impl AmbientStream {
    /// Fire one batch immediately and begin the cadence
    ///
    /// Starting an already running stream does nothing.
    pub fn start(&mut self, state: &mut SimulationState, config: &SimConfig) {
        if self.active {
            return;
        }
        self.active = true;
        self.elapsed = 0.0;
        self.emit(state, config);
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.elapsed = 0.0;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Accumulate `dt` and fire every batch that came due
    pub fn advance(&mut self, state: &mut SimulationState, config: &SimConfig, dt: f32) {
        if !self.active || !(dt > 0.0) || !(config.stream_interval > 0.0) {
            return;
        }
        self.elapsed += dt;
        while self.elapsed >= config.stream_interval {
            self.elapsed -= config.stream_interval;
            self.emit(state, config);
        }
    }

    fn emit(&self, state: &mut SimulationState, config: &SimConfig) {
        if config.stream_batch > 0 {
            spawn_from_funnel(state, config, config.stream_batch, Some(BodyColor::Stream));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (SimulationState, SimConfig) {
        let config = SimConfig::default();
        (SimulationState::new(800.0, 600.0, 17, &config), config)
    }

    #[test]
    fn test_funnel_spawns_start_inside_mouth() {
        let (mut state, config) = board();
        spawn_from_funnel(&mut state, &config, 50, None);
        assert_eq!(state.bodies.len(), 50);

        let cx = state.layout.center_x();
        let half_spread = (config.funnel_gap * 0.6).max(8.0) * 0.5;
        for body in &state.bodies {
            assert!((body.pos.x - cx).abs() <= half_spread);
            assert!(body.pos.y < FUNNEL_BOTTOM_Y && body.pos.y >= FUNNEL_BOTTOM_Y - 10.0);
            assert!(body.vel.x.abs() <= config.spawn_speed * 0.5);
            assert_eq!(body.vel.y, 0.0);
            assert_eq!(body.radius, config.body_radius);
            assert!(matches!(body.color, BodyColor::Palette(_)));
        }
    }

    #[test]
    fn test_pointer_near_top_uses_funnel() {
        let (mut state, config) = board();
        assert_eq!(spawn_at_pointer(&mut state, &config, 30.0, 10.0), 1);
        assert!(state.bodies[0].pos.y < 0.0);
        assert!((state.bodies[0].pos.x - state.layout.center_x()).abs() < config.funnel_gap);
    }

    #[test]
    fn test_pointer_in_field_spawns_near_press() {
        let (mut state, config) = board();
        assert_eq!(spawn_at_pointer(&mut state, &config, 300.0, 200.0), 1);
        let body = &state.bodies[0];
        assert!((body.pos.x - 300.0).abs() <= config.pointer_jitter * 0.5);
        assert_eq!(body.pos.y, 200.0);

        // Left edge press is clamped inside the world
        spawn_at_pointer(&mut state, &config, 0.0, 300.0);
        assert!(state.bodies[1].pos.x >= config.body_radius);
    }

    #[test]
    fn test_pointer_in_bucket_row_is_ignored() {
        let (mut state, config) = board();
        let y = state.layout.bucket_y;
        assert_eq!(spawn_at_pointer(&mut state, &config, 400.0, y), 0);
        assert_eq!(spawn_at_pointer(&mut state, &config, 400.0, 599.0), 0);
        assert_eq!(spawn_at_pointer(&mut state, &config, f32::NAN, 200.0), 0);
        assert!(state.bodies.is_empty());
    }

    #[test]
    fn test_demo_replaces_existing_balls() {
        let (mut state, config) = board();
        spawn_from_funnel(&mut state, &config, 7, None);
        run_demo(&mut state, &config);

        assert_eq!(state.bodies.len(), config.demo_batch as usize + 1);
        let markers = state
            .bodies
            .iter()
            .filter(|b| b.color == BodyColor::Marker)
            .count();
        assert_eq!(markers, 1);
        assert!(
            state.bodies[..config.demo_batch as usize]
                .iter()
                .all(|b| b.color == BodyColor::Stream)
        );
    }

    #[test]
    fn test_stream_fires_on_start_then_on_cadence() {
        let (mut state, config) = board();
        let mut stream = AmbientStream::default();
        stream.advance(&mut state, &config, 1.0);
        assert!(state.bodies.is_empty(), "inactive stream spawns nothing");

        stream.start(&mut state, &config);
        assert!(stream.is_active());
        assert_eq!(state.bodies.len(), 1);

        stream.advance(&mut state, &config, config.stream_interval * 0.5);
        assert_eq!(state.bodies.len(), 1);
        stream.advance(&mut state, &config, config.stream_interval * 0.6);
        assert_eq!(state.bodies.len(), 2);
        // A long frame catches up every missed batch
        stream.advance(&mut state, &config, config.stream_interval * 3.0);
        assert_eq!(state.bodies.len(), 5);
        assert!(state.bodies.iter().all(|b| b.color == BodyColor::Stream));

        stream.stop();
        stream.advance(&mut state, &config, 10.0);
        assert_eq!(state.bodies.len(), 5);
    }

    #[test]
    fn test_zero_batch_stream_is_silent() {
        let (mut state, _) = board();
        let config = SimConfig {
            stream_batch: 0,
            ..Default::default()
        };
        let mut stream = AmbientStream::default();
        stream.start(&mut state, &config);
        stream.advance(&mut state, &config, 5.0);
        assert!(state.bodies.is_empty());
    }
}
