//! Narrow-phase collision detection and response
//!
//! Every rule follows the same pattern: find the contact normal, push the
//! ball out along it by the penetration depth, then split the velocity into
//! normal and tangential parts and scale each by the surface's coefficients.

use glam::Vec2;

use super::geometry::{Peg, Segment};
use super::state::Body;

/// Normal used for static contacts when the ball center sits exactly on the obstacle
pub const FALLBACK_STATIC_NORMAL: Vec2 = Vec2::NEG_Y;
/// Normal used when two ball centers coincide
pub const FALLBACK_PAIR_NORMAL: Vec2 = Vec2::X;

/// Below this distance a normal cannot be derived from the centers
const MIN_NORMAL_LENGTH: f32 = 1e-6;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Unit normal pointing from the obstacle toward the ball center
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// How a static surface treats an impacting ball
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    /// Fraction of approaching normal speed reflected back
    pub restitution: f32,
    /// Fraction of tangential speed kept
    pub tangent_damping: f32,
}

/// Unit vector along `delta`, or `fallback` when `delta` is (nearly) zero
#[inline]
fn safe_normal(delta: Vec2, dist: f32, fallback: Vec2) -> Vec2 {
    if dist > MIN_NORMAL_LENGTH && dist.is_finite() {
        delta / dist
    } else {
        fallback
    }
}

/// Check a ball against a fixed circle
pub fn ball_circle_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    center: Vec2,
    radius: f32,
) -> CollisionResult {
    let min_dist = ball_radius + radius;
    let delta = ball_pos - center;
    // AABB reject before the sqrt
    if delta.x.abs() >= min_dist || delta.y.abs() >= min_dist {
        return CollisionResult::miss();
    }
    let dist = delta.length();
    if dist >= min_dist {
        return CollisionResult::miss();
    }

    let normal = safe_normal(delta, dist, FALLBACK_STATIC_NORMAL);
    CollisionResult {
        hit: true,
        normal,
        penetration: min_dist - dist,
    }
}

/// Check a ball against a line segment (closest-point projection)
pub fn ball_segment_collision(ball_pos: Vec2, ball_radius: f32, segment: &Segment) -> CollisionResult {
    let closest = segment.closest_point(ball_pos);
    let delta = ball_pos - closest;
    let dist = delta.length();
    if dist >= ball_radius {
        return CollisionResult::miss();
    }

    let fallback = {
        // Center on the wall: push out along the wall's perpendicular, upward
        let line = segment.end - segment.start;
        let perp = Vec2::new(-line.y, line.x).normalize_or_zero();
        if perp == Vec2::ZERO {
            FALLBACK_STATIC_NORMAL
        } else if perp.y > 0.0 {
            -perp
        } else {
            perp
        }
    };
    let normal = safe_normal(delta, dist, fallback);
    CollisionResult {
        hit: true,
        normal,
        penetration: ball_radius - dist,
    }
}

/// Split `velocity` along `normal`, reflect the approaching normal part with
/// `restitution`, and damp the tangential part (plus an optional kick)
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, surface: Surface, tangent_kick: f32) -> Vec2 {
    let tangent = normal.perp();
    let vn = velocity.dot(normal);
    let vt = velocity.dot(tangent);
    let new_vn = if vn < 0.0 { -vn * surface.restitution } else { vn };
    let new_vt = vt * surface.tangent_damping + tangent_kick;
    normal * new_vn + tangent * new_vt
}

/// Apply a static contact to a ball: full positional push, then bounce
pub fn resolve_static(body: &mut Body, hit: &CollisionResult, surface: Surface, tangent_kick: f32) {
    if !hit.hit {
        return;
    }
    body.pos += hit.normal * hit.penetration;
    body.vel = bounce_velocity(body.vel, hit.normal, surface, tangent_kick);
}

/// Ball vs. peg. `tangent_kick` is only evaluated on a confirmed hit, so a
/// random deflection is drawn once per real contact.
///
/// Returns true when the ball touched the peg.
pub fn resolve_body_peg<F>(body: &mut Body, peg: &Peg, surface: Surface, tangent_kick: F) -> bool
where
    F: FnOnce() -> f32,
{
    let hit = ball_circle_collision(body.pos, body.radius, peg.pos, peg.radius);
    if hit.hit {
        resolve_static(body, &hit, surface, tangent_kick());
    }
    hit.hit
}

/// Ball vs. funnel wall
pub fn resolve_body_segment(body: &mut Body, segment: &Segment, surface: Surface) -> bool {
    let hit = ball_segment_collision(body.pos, body.radius, segment);
    resolve_static(body, &hit, surface, 0.0);
    hit.hit
}

/// Ball vs. ball
///
/// `push` is the fraction of the overlap removed this pass, split evenly
/// between both balls. Only the approaching normal velocity is exchanged.
pub fn resolve_body_pair(a: &mut Body, b: &mut Body, push: f32, restitution: f32) -> bool {
    let min_dist = a.radius + b.radius;
    let delta = b.pos - a.pos;
    if delta.x.abs() > min_dist || delta.y.abs() > min_dist {
        return false;
    }
    let dist = delta.length();
    if dist >= min_dist {
        return false;
    }

    let normal = safe_normal(delta, dist, FALLBACK_PAIR_NORMAL);
    let correction = normal * ((min_dist - dist) * push * 0.5);
    a.pos -= correction;
    b.pos += correction;

    let rel = (b.vel - a.vel).dot(normal);
    if rel < 0.0 {
        let impulse = normal * (-(1.0 - restitution) * rel * 0.5);
        a.vel -= impulse;
        b.vel += impulse;
    }
    true
}

/// Mutable access to two distinct elements
///
/// # Panics
/// If `i == j` or either index is out of bounds.
#[inline]
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert!(i != j, "pair_mut requires distinct indices");
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}
