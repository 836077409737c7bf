//! Simulation tuning
//!
//! Every scalar the integrator, resolver and spawner read lives here. The
//! driver hands a `&SimConfig` to each step, so swapping the config between
//! frames retunes a running board without restarting it.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// When a bucketed ball's decay timer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecayPolicy {
    /// Timer runs from the moment the ball lands in a bucket
    #[default]
    FromEntry,
    /// Timer runs only while the ball rests on its bucket floor and is nearly still
    Resting,
}

impl DecayPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayPolicy::FromEntry => "from_entry",
            DecayPolicy::Resting => "resting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "from_entry" | "entry" => Some(DecayPolicy::FromEntry),
            "resting" | "rest" => Some(DecayPolicy::Resting),
            _ => None,
        }
    }
}

/// Tunable simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Forces ===
    /// Downward acceleration (pixels/s²)
    pub gravity: f32,
    /// Velocity retained per 1/60 s in the air
    pub air_drag: f32,
    /// Horizontal velocity retained per 1/60 s on a bucket floor
    pub ground_drag: f32,

    // === Surfaces ===
    pub wall_restitution: f32,
    pub floor_restitution: f32,
    pub pair_restitution: f32,
    pub peg_restitution: f32,
    pub funnel_restitution: f32,
    pub peg_tangent_damping: f32,
    pub funnel_tangent_damping: f32,
    /// Total span (pixels/s) of the random tangential kick on a peg hit. 0 disables it.
    pub peg_jitter: f32,

    // === Sizes ===
    pub body_radius: f32,
    pub peg_radius: f32,
    pub peg_spacing: f32,

    // === Stepping ===
    pub substeps: u32,
    /// Upper bound on a single frame's delta (seconds)
    pub max_frame_dt: f32,
    pub air_pair_iterations: u32,
    pub bucket_pair_iterations: u32,
    /// Fraction of overlap removed per airborne pair pass
    pub air_pair_push: f32,
    /// Fraction of overlap removed per bucket relaxation pass
    pub bucket_pair_push: f32,
    /// Distance from the floor that still counts as resting on it
    pub floor_slop: f32,
    /// Vertical speed below which a floored ball is snapped still
    pub rest_snap_speed: f32,

    // === Layout ===
    pub min_buckets: u32,
    pub max_buckets: u32,
    /// Approximate bucket width used to pick the bucket count
    pub bucket_target_width: f32,
    /// Opening at the bottom of the funnel
    pub funnel_gap: f32,
    /// Vertical depth of the funnel above the viewport
    pub funnel_depth: f32,
    /// Include funnel walls in render snapshots (debugging)
    pub render_funnel: bool,
    /// Funnel walls only collide with balls above this y
    pub funnel_zone: f32,

    // === Spawning ===
    /// Pointer presses above this y spawn from the funnel instead
    pub pointer_funnel_zone: f32,
    /// Total horizontal jitter span for pointer spawns
    pub pointer_jitter: f32,
    /// Total span of the random horizontal ejection velocity
    pub spawn_speed: f32,
    /// Seconds between ambient stream batches
    pub stream_interval: f32,
    /// Balls per ambient batch (0 disables the stream)
    pub stream_batch: u32,
    pub demo_batch: u32,

    // === Decay ===
    pub decay_policy: DecayPolicy,
    /// Seconds of decay time before a bucketed ball is removed
    pub decay_threshold: f32,
    /// Seconds of fade-out leading up to removal
    pub fade_duration: f32,
    /// Speed under which a floored ball counts as resting (`DecayPolicy::Resting`)
    pub resting_speed: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            air_drag: AIR_DRAG,
            ground_drag: GROUND_DRAG,

            wall_restitution: BOUNCE,
            floor_restitution: BOUNCE,
            pair_restitution: BOUNCE,
            peg_restitution: PEG_BOUNCE,
            funnel_restitution: PEG_BOUNCE,
            peg_tangent_damping: 0.9,
            funnel_tangent_damping: 0.95,
            peg_jitter: 25.0,

            body_radius: BALL_RADIUS,
            peg_radius: PEG_RADIUS,
            peg_spacing: PEG_SPACING,

            substeps: SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,
            air_pair_iterations: 1,
            bucket_pair_iterations: 3,
            air_pair_push: 0.45,
            bucket_pair_push: 0.6,
            floor_slop: 0.3,
            rest_snap_speed: 8.0,

            min_buckets: 16,
            max_buckets: 36,
            bucket_target_width: 45.0,
            funnel_gap: 30.0,
            funnel_depth: 160.0,
            render_funnel: false,
            funnel_zone: 60.0,

            pointer_funnel_zone: 80.0,
            pointer_jitter: 24.0,
            spawn_speed: 140.0,
            stream_interval: STREAM_INTERVAL,
            stream_batch: 1,
            demo_batch: DEMO_BATCH,

            decay_policy: DecayPolicy::FromEntry,
            decay_threshold: DECAY_THRESHOLD,
            fade_duration: FADE_DURATION,
            resting_speed: 20.0,
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Apply a (possibly partial) JSON document on top of this config
    ///
    /// Unlike `from_json`, fields the document omits keep their current values.
    pub fn with_json_overrides(&self, json: &str) -> serde_json::Result<Self> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(self)?;
        if let (Some(base), serde_json::Value::Object(fields)) = (merged.as_object_mut(), overrides) {
            base.extend(fields);
        }
        let config: Self = serde_json::from_value(merged)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Clamp every scalar into a range the solver can survive
    ///
    /// Bad values are replaced rather than rejected; each correction is logged.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        fn positive(name: &str, value: &mut f32, fallback: f32) {
            if !value.is_finite() || *value <= 0.0 {
                log::warn!("config: {name} = {value} is not positive, using {fallback}");
                *value = fallback;
            }
        }
        fn non_negative(name: &str, value: &mut f32, fallback: f32) {
            if !value.is_finite() || *value < 0.0 {
                log::warn!("config: {name} = {value} is negative, using {fallback}");
                *value = fallback;
            }
        }
        fn unit(name: &str, value: &mut f32, fallback: f32) {
            if !value.is_finite() {
                log::warn!("config: {name} is not finite, using {fallback}");
                *value = fallback;
            } else if !(0.0..=1.0).contains(value) {
                let clamped = value.clamp(0.0, 1.0);
                log::warn!("config: {name} = {value} outside [0, 1], clamped to {clamped}");
                *value = clamped;
            }
        }

        non_negative("gravity", &mut self.gravity, defaults.gravity);
        unit("air_drag", &mut self.air_drag, defaults.air_drag);
        unit("ground_drag", &mut self.ground_drag, defaults.ground_drag);

        unit("wall_restitution", &mut self.wall_restitution, defaults.wall_restitution);
        unit("floor_restitution", &mut self.floor_restitution, defaults.floor_restitution);
        unit("pair_restitution", &mut self.pair_restitution, defaults.pair_restitution);
        unit("peg_restitution", &mut self.peg_restitution, defaults.peg_restitution);
        unit("funnel_restitution", &mut self.funnel_restitution, defaults.funnel_restitution);
        unit("peg_tangent_damping", &mut self.peg_tangent_damping, defaults.peg_tangent_damping);
        unit(
            "funnel_tangent_damping",
            &mut self.funnel_tangent_damping,
            defaults.funnel_tangent_damping,
        );
        non_negative("peg_jitter", &mut self.peg_jitter, defaults.peg_jitter);

        positive("body_radius", &mut self.body_radius, defaults.body_radius);
        positive("peg_radius", &mut self.peg_radius, defaults.peg_radius);
        positive("peg_spacing", &mut self.peg_spacing, defaults.peg_spacing);

        if self.substeps == 0 {
            log::warn!("config: substeps = 0, using 1");
            self.substeps = 1;
        }
        positive("max_frame_dt", &mut self.max_frame_dt, defaults.max_frame_dt);
        unit("air_pair_push", &mut self.air_pair_push, defaults.air_pair_push);
        unit("bucket_pair_push", &mut self.bucket_pair_push, defaults.bucket_pair_push);
        non_negative("floor_slop", &mut self.floor_slop, defaults.floor_slop);
        non_negative("rest_snap_speed", &mut self.rest_snap_speed, defaults.rest_snap_speed);

        if self.min_buckets == 0 {
            log::warn!("config: min_buckets = 0, using 1");
            self.min_buckets = 1;
        }
        if self.max_buckets < self.min_buckets {
            log::warn!(
                "config: max_buckets {} < min_buckets {}, raising",
                self.max_buckets,
                self.min_buckets
            );
            self.max_buckets = self.min_buckets;
        }
        positive(
            "bucket_target_width",
            &mut self.bucket_target_width,
            defaults.bucket_target_width,
        );
        non_negative("funnel_gap", &mut self.funnel_gap, defaults.funnel_gap);
        non_negative("funnel_depth", &mut self.funnel_depth, defaults.funnel_depth);

        non_negative("pointer_jitter", &mut self.pointer_jitter, defaults.pointer_jitter);
        non_negative("spawn_speed", &mut self.spawn_speed, defaults.spawn_speed);
        positive("stream_interval", &mut self.stream_interval, defaults.stream_interval);

        positive("decay_threshold", &mut self.decay_threshold, defaults.decay_threshold);
        non_negative("fade_duration", &mut self.fade_duration, defaults.fade_duration);
        if self.fade_duration > self.decay_threshold {
            log::warn!(
                "config: fade_duration {} exceeds decay_threshold {}, clamped",
                self.fade_duration,
                self.decay_threshold
            );
            self.fade_duration = self.decay_threshold;
        }
        non_negative("resting_speed", &mut self.resting_speed, defaults.resting_speed);

        if self.peg_restitution < self.floor_restitution {
            log::warn!("config: peg_restitution below floor_restitution, stacks may look bouncy");
        }
        if self.ground_drag > self.air_drag {
            log::warn!("config: ground_drag retains more than air_drag, balls may slide forever");
        }

        self
    }

    /// True when `other` differs in any field that shapes the static layout
    pub fn layout_differs(&self, other: &SimConfig) -> bool {
        self.peg_radius != other.peg_radius
            || self.peg_spacing != other.peg_spacing
            || self.min_buckets != other.min_buckets
            || self.max_buckets != other.max_buckets
            || self.bucket_target_width != other.bucket_target_width
            || self.funnel_gap != other.funnel_gap
            || self.funnel_depth != other.funnel_depth
    }

    /// Broad-phase cell size for the current ball radius
    pub fn grid_cell(&self) -> f32 {
        self.body_radius * GRID_CELL_RADII
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_surface_ordering() {
        let config = SimConfig::default();
        assert!(config.peg_restitution >= config.floor_restitution);
        // Lower retention means more drag
        assert!(config.ground_drag < config.air_drag);
    }

    #[test]
    fn test_partial_json_overrides_named_fields() {
        let config = SimConfig::from_json(r#"{ "gravity": 900.0, "decay_policy": "resting" }"#)
            .expect("valid json");
        assert_eq!(config.gravity, 900.0);
        assert_eq!(config.decay_policy, DecayPolicy::Resting);
        assert_eq!(config.body_radius, BALL_RADIUS);
        assert_eq!(config.substeps, SUBSTEPS);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(SimConfig::from_json("{ gravity: ").is_err());
        assert!(SimConfig::from_json(r#"{ "substeps": -1 }"#).is_err());
    }

    #[test]
    fn test_sanitize_replaces_degenerate_values() {
        let config = SimConfig {
            body_radius: 0.0,
            substeps: 0,
            air_drag: 1.5,
            max_buckets: 4,
            min_buckets: 10,
            fade_duration: 10.0,
            max_frame_dt: f32::NAN,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(config.body_radius, BALL_RADIUS);
        assert_eq!(config.substeps, 1);
        assert_eq!(config.air_drag, 1.0);
        assert_eq!(config.max_buckets, 10);
        assert_eq!(config.fade_duration, config.decay_threshold);
        assert_eq!(config.max_frame_dt, MAX_FRAME_DT);
    }

    #[test]
    fn test_fade_longer_than_threshold_is_clamped() {
        let config = SimConfig::from_json(r#"{ "decay_threshold": 2.0, "fade_duration": 5.0 }"#)
            .expect("valid json");
        assert_eq!(config.fade_duration, 2.0);
        assert_eq!(config.decay_threshold, 2.0);
    }

    #[test]
    fn test_json_round_trip_preserves_config() {
        let config = SimConfig {
            decay_policy: DecayPolicy::Resting,
            demo_batch: 42,
            ..Default::default()
        };
        let json = config.to_json().expect("serializable");
        assert_eq!(SimConfig::from_json(&json).expect("parses"), config);
    }

    #[test]
    fn test_overrides_keep_current_values() {
        let current = SimConfig {
            gravity: 900.0,
            ..Default::default()
        };
        let next = current
            .with_json_overrides(r#"{ "body_radius": 5.0 }"#)
            .expect("valid json");
        assert_eq!(next.gravity, 900.0);
        assert_eq!(next.body_radius, 5.0);
        assert!(current.with_json_overrides("[1, 2").is_err());
    }

    #[test]
    fn test_decay_policy_from_str() {
        assert_eq!(DecayPolicy::from_str("Resting"), Some(DecayPolicy::Resting));
        assert_eq!(DecayPolicy::from_str("entry"), Some(DecayPolicy::FromEntry));
        assert_eq!(DecayPolicy::from_str("never"), None);
        assert_eq!(DecayPolicy::FromEntry.as_str(), "from_entry");
    }

    #[test]
    fn test_layout_differs_ignores_forces() {
        let base = SimConfig::default();
        let heavier = SimConfig {
            gravity: 3000.0,
            ..Default::default()
        };
        assert!(!base.layout_differs(&heavier));
        let wider = SimConfig {
            funnel_gap: 60.0,
            ..Default::default()
        };
        assert!(base.layout_differs(&wider));
    }
}
