//! Static board layout derived from the viewport
//!
//! Pegs, buckets and the off-screen funnel are pure functions of
//! `(width, height, config)`: regenerating with the same inputs yields the
//! same geometry, so resize handling can simply rebuild.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::consts::*;

/// A fixed circular obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peg {
    pub pos: Vec2,
    pub radius: f32,
}

/// A collection slot at the bottom of the board
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Top-left corner
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Bucket {
    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.origin.x + self.width
    }

    #[inline]
    pub fn floor(&self) -> f32 {
        self.origin.y + self.height
    }

    /// Check if a point lies inside the slot, with `slop` tolerance on every side
    pub fn contains(&self, point: Vec2, slop: f32) -> bool {
        point.x >= self.left() - slop
            && point.x <= self.right() + slop
            && point.y >= self.origin.y - slop
            && point.y <= self.floor() + slop
    }
}

/// A straight wall, used for the funnel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Closest point on the segment to `p`
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        let line = self.end - self.start;
        let len_sq = line.length_squared();
        if len_sq < f32::EPSILON {
            return self.start;
        }
        let t = ((p - self.start).dot(line) / len_sq).clamp(0.0, 1.0);
        self.start + line * t
    }
}

/// Everything static on the board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    /// Top of the bucket row; balls at or below `bucket_y - radius` are bucketed
    pub bucket_y: f32,
    pub pegs: Vec<Peg>,
    pub buckets: Vec<Bucket>,
    /// Left and right funnel walls
    pub funnel: Vec<Segment>,
}

impl Layout {
    /// Generate the full layout for a viewport
    pub fn generate(width: f32, height: f32, config: &SimConfig) -> Self {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        let bucket_y = height * BUCKET_ROW_FRACTION;

        Self {
            width,
            height,
            bucket_y,
            pegs: generate_pegs(width, height, config),
            buckets: generate_buckets(width, height, bucket_y, config),
            funnel: generate_funnel(width, config),
        }
    }

    /// Horizontal center, where the funnel opens
    #[inline]
    pub fn center_x(&self) -> f32 {
        self.width * 0.5
    }

    /// Bucket partition index for an x coordinate, clamped into range
    ///
    /// Returns `None` only when there are no buckets at all.
    pub fn bucket_index_for_x(&self, x: f32) -> Option<usize> {
        let count = self.buckets.len();
        if count == 0 {
            return None;
        }
        if self.width <= 0.0 || !x.is_finite() {
            return Some(0);
        }
        let idx = ((x / self.width) * count as f32).floor();
        Some((idx.max(0.0) as usize).min(count - 1))
    }

    /// True when a ball at `y` with `radius` sits above the bucket row
    #[inline]
    pub fn is_airborne(&self, y: f32, radius: f32) -> bool {
        y < self.bucket_y - radius
    }
}

/// Number of buckets for a viewport width: about one per `bucket_target_width` pixels
pub fn bucket_count(width: f32, config: &SimConfig) -> u32 {
    let target = (width / config.bucket_target_width).floor().max(0.0) as u32;
    target.clamp(config.min_buckets, config.max_buckets.max(config.min_buckets))
}

/// Staggered Galton lattice over the top of the board
fn generate_pegs(width: f32, height: f32, config: &SimConfig) -> Vec<Peg> {
    let spacing = config.peg_spacing;
    let board_bottom = height * PEG_BOARD_FRACTION - PEG_MARGIN_END;
    let right_limit = width - PEG_MARGIN_END;
    let mut pegs = Vec::new();

    let mut row = 0u32;
    loop {
        let y = PEG_MARGIN_START + row as f32 * spacing;
        if y >= board_bottom {
            break;
        }
        let stagger = if (y / spacing).floor() as i64 % 2 == 1 {
            spacing * 0.5
        } else {
            0.0
        };

        let mut col = 0u32;
        loop {
            let x = PEG_MARGIN_START + col as f32 * spacing;
            if x >= right_limit {
                break;
            }
            let px = x + stagger;
            if px < right_limit {
                pegs.push(Peg {
                    pos: Vec2::new(px, y),
                    radius: config.peg_radius,
                });
            }
            col += 1;
        }
        row += 1;
    }

    pegs
}

/// Equal-width buckets spanning the whole width
fn generate_buckets(width: f32, height: f32, bucket_y: f32, config: &SimConfig) -> Vec<Bucket> {
    let count = bucket_count(width, config);
    let bucket_width = width / count as f32;
    let bucket_height = height * BUCKET_HEIGHT_FRACTION;

    (0..count)
        .map(|i| Bucket {
            origin: Vec2::new(i as f32 * bucket_width, bucket_y),
            width: bucket_width,
            height: bucket_height,
        })
        .collect()
}

/// Symmetric V above the viewport that narrows spawns toward the center
fn generate_funnel(width: f32, config: &SimConfig) -> Vec<Segment> {
    let cx = width * 0.5;
    let bottom_y = FUNNEL_BOTTOM_Y;
    let top_y = bottom_y - config.funnel_depth;
    let half_gap = config.funnel_gap * 0.5;

    let left_top_x = (cx - width * FUNNEL_MOUTH_FRACTION).max(FUNNEL_EDGE_MARGIN);
    let right_top_x = (cx + width * FUNNEL_MOUTH_FRACTION).min(width - FUNNEL_EDGE_MARGIN);

    vec![
        Segment::new(Vec2::new(left_top_x, top_y), Vec2::new(cx - half_gap, bottom_y)),
        Segment::new(Vec2::new(right_top_x, top_y), Vec2::new(cx + half_gap, bottom_y)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_is_idempotent() {
        let config = SimConfig::default();
        let a = Layout::generate(1280.0, 720.0, &config);
        let b = Layout::generate(1280.0, 720.0, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bucket_count_is_clamped() {
        let config = SimConfig::default();
        assert_eq!(bucket_count(320.0, &config), 16);
        assert_eq!(bucket_count(900.0, &config), 20);
        assert_eq!(bucket_count(4000.0, &config), 36);
    }

    #[test]
    fn test_buckets_partition_width() {
        let config = SimConfig::default();
        let layout = Layout::generate(1000.0, 800.0, &config);
        let buckets = &layout.buckets;

        assert_eq!(buckets[0].left(), 0.0);
        assert!((buckets.last().map(|b| b.right()).unwrap_or(0.0) - 1000.0).abs() < 1e-3);
        for pair in buckets.windows(2) {
            assert!((pair[0].right() - pair[1].left()).abs() < 1e-3);
        }
        for bucket in buckets {
            assert_eq!(bucket.origin.y, 800.0 * BUCKET_ROW_FRACTION);
            assert!((bucket.height - 800.0 * BUCKET_HEIGHT_FRACTION).abs() < 1e-3);
        }
    }

    #[test]
    fn test_pegs_stay_above_bucket_row() {
        let config = SimConfig::default();
        let layout = Layout::generate(1024.0, 768.0, &config);
        assert!(!layout.pegs.is_empty());
        for peg in &layout.pegs {
            assert!(peg.pos.y < 768.0 * PEG_BOARD_FRACTION);
            assert!(peg.pos.y + peg.radius < layout.bucket_y);
            assert!(peg.pos.x < 1024.0 - PEG_MARGIN_END);
        }
    }

    #[test]
    fn test_peg_rows_alternate_stagger() {
        let config = SimConfig::default();
        let layout = Layout::generate(800.0, 600.0, &config);
        let first_row_x = layout.pegs[0].pos.x;
        let second_row = layout
            .pegs
            .iter()
            .find(|p| p.pos.y > layout.pegs[0].pos.y)
            .map(|p| p.pos.x)
            .unwrap_or(first_row_x);
        assert!(((first_row_x - second_row).abs() - config.peg_spacing * 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_funnel_is_symmetric_and_offscreen() {
        let config = SimConfig::default();
        let layout = Layout::generate(800.0, 600.0, &config);
        let [left, right] = [layout.funnel[0], layout.funnel[1]];
        let cx = layout.center_x();

        assert!((cx - left.end.x - (right.end.x - cx)).abs() < 1e-4);
        assert!((cx - left.start.x - (right.start.x - cx)).abs() < 1e-4);
        assert!((right.end.x - left.end.x - config.funnel_gap).abs() < 1e-4);
        assert!(left.start.y < 0.0 && left.end.y < 0.0);
        assert!((left.end.y - left.start.y - config.funnel_depth).abs() < 1e-4);
    }

    #[test]
    fn test_empty_viewport_is_harmless() {
        let config = SimConfig::default();
        let layout = Layout::generate(0.0, 0.0, &config);
        assert!(layout.pegs.is_empty());
        assert_eq!(layout.bucket_index_for_x(10.0), Some(0));
    }

    #[test]
    fn test_segment_closest_point() {
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert_eq!(seg.closest_point(Vec2::new(5.0, 3.0)), Vec2::new(5.0, 0.0));
        assert_eq!(seg.closest_point(Vec2::new(-4.0, 1.0)), Vec2::new(0.0, 0.0));
        assert_eq!(seg.closest_point(Vec2::new(14.0, -1.0)), Vec2::new(10.0, 0.0));

        let degenerate = Segment::new(Vec2::ONE, Vec2::ONE);
        assert_eq!(degenerate.closest_point(Vec2::new(9.0, 9.0)), Vec2::ONE);
    }

    proptest! {
        #[test]
        fn prop_bucket_index_always_in_range(x in proptest::num::f32::ANY, width in 1.0f32..4000.0) {
            let layout = Layout::generate(width, 600.0, &SimConfig::default());
            let idx = layout.bucket_index_for_x(x).expect("layout has buckets");
            prop_assert!(idx < layout.buckets.len());
        }

        #[test]
        fn prop_bucket_index_matches_bucket_span(t in 0.0f32..1.0, width in 100.0f32..4000.0) {
            let layout = Layout::generate(width, 600.0, &SimConfig::default());
            let x = t * width;
            let idx = layout.bucket_index_for_x(x).expect("layout has buckets");
            let bucket = layout.buckets[idx];
            prop_assert!(x >= bucket.left() - 1e-2 && x <= bucket.right() + 1e-2);
        }
    }
}
