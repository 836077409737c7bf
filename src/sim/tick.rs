//! Fixed-substep integration
//!
//! One substep runs these phases, in this order, over every ball:
//! 1. gravity + integration + world walls + funnel + pegs (airborne only)
//! 2. broad-phase ball-ball resolution over airborne balls
//! 3. bucket classification and wall/floor containment
//! 4. per-bucket relaxation, lowest balls first
//! 5. decay and culling
//!
//! Reordering these reintroduces sinking and overlap artifacts.

use glam::Vec2;
use rand::Rng;

use super::collision::{Surface, pair_mut, resolve_body_pair, resolve_body_peg, resolve_body_segment};
use super::geometry::{Bucket, Layout};
use super::state::{Body, SimulationState};
use crate::config::{DecayPolicy, SimConfig};
use crate::pow_drag;

/// Advance the simulation by one frame's (already clamped) delta,
/// split into `config.substeps` equal substeps
pub fn step(state: &mut SimulationState, config: &SimConfig, frame_dt: f32) {
    if !(frame_dt > 0.0) {
        return;
    }
    let substeps = config.substeps.max(1);
    let dt = frame_dt / substeps as f32;
    for _ in 0..substeps {
        substep(state, config, dt);
    }
}

/// Advance the simulation by exactly one substep
pub fn substep(state: &mut SimulationState, config: &SimConfig, dt: f32) {
    let air_drag = pow_drag(config.air_drag, dt);
    let ground_drag = pow_drag(config.ground_drag, dt);

    state.time_ticks += 1;

    let SimulationState {
        layout,
        bodies,
        rng,
        scratch,
        ..
    } = state;

    let peg_surface = Surface {
        restitution: config.peg_restitution,
        tangent_damping: config.peg_tangent_damping,
    };
    let funnel_surface = Surface {
        restitution: config.funnel_restitution,
        tangent_damping: config.funnel_tangent_damping,
    };

    // --- INTEGRATION + STATIC OBSTACLES ---
    for body in bodies.iter_mut() {
        body.vel.y += config.gravity * dt;
        body.pos += body.vel * dt;

        confine_to_world(body, layout.width, config.wall_restitution);

        // Off-screen funnel only matters near or above the top edge
        if body.pos.y < config.funnel_zone {
            for segment in &layout.funnel {
                resolve_body_segment(body, segment, funnel_surface);
            }
        }

        if layout.is_airborne(body.pos.y, body.radius) {
            for peg in &layout.pegs {
                resolve_body_peg(body, peg, peg_surface, || peg_kick(rng, config.peg_jitter));
            }
            body.vel *= air_drag;
            body.mark_airborne();
        }
    }

    // --- AIRBORNE BALL-BALL (broad phase) ---
    scratch.grid.rebuild(
        config.grid_cell(),
        bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| layout.is_airborne(b.pos.y, b.radius))
            .map(|(i, b)| (i, b.pos)),
    );
    for _ in 0..config.air_pair_iterations {
        for i in 0..bodies.len() {
            if !layout.is_airborne(bodies[i].pos.y, bodies[i].radius) {
                continue;
            }
            let cell = scratch.grid.cell_of(bodies[i].pos);
            for j in scratch.grid.neighbors(cell) {
                if j <= i {
                    continue;
                }
                let (a, b) = pair_mut(bodies, i, j);
                resolve_body_pair(a, b, config.air_pair_push, config.pair_restitution);
            }
        }
    }
    for body in bodies.iter_mut() {
        confine_to_world(body, layout.width, config.wall_restitution);
    }

    // --- BUCKET CLASSIFICATION ---
    scratch.reset_buckets(layout.buckets.len());
    for (i, body) in bodies.iter_mut().enumerate() {
        if layout.is_airborne(body.pos.y, body.radius) {
            continue;
        }
        let Some(idx) = layout.bucket_index_for_x(body.pos.x) else {
            continue;
        };
        let bucket = layout.buckets[idx];
        let floor = contain_in_bucket(
            body,
            &bucket,
            config.wall_restitution,
            config.floor_restitution,
        );

        body.on_floor = (body.pos.y - floor).abs() < config.floor_slop;
        if body.on_floor {
            body.vel.x *= ground_drag;
            if body.vel.y.abs() < config.rest_snap_speed {
                body.vel.y = 0.0;
            }
        } else {
            body.vel *= air_drag;
        }

        body.bucket = Some(idx);
        scratch.bucket_members[idx].push(i);
    }

    // --- BUCKET RELAXATION ---
    for (idx, members) in scratch.bucket_members.iter_mut().enumerate() {
        if members.len() < 2 {
            continue;
        }
        // Closest to the floor first so supporting balls settle before the ones on top
        members.sort_by(|&a, &b| bodies[b].pos.y.total_cmp(&bodies[a].pos.y));
        for _ in 0..config.bucket_pair_iterations {
            for m in 0..members.len() {
                for n in (m + 1)..members.len() {
                    let (a, b) = pair_mut(bodies, members[m], members[n]);
                    resolve_body_pair(a, b, config.bucket_pair_push, config.pair_restitution);
                }
            }
        }
        let bucket = layout.buckets[idx];
        for &i in members.iter() {
            contain_in_bucket(
                &mut bodies[i],
                &bucket,
                config.wall_restitution,
                config.floor_restitution,
            );
        }
    }

    // --- DECAY ---
    apply_decay(bodies, config, dt);
}

/// Random tangential deflection for one peg hit
#[inline]
fn peg_kick<R: Rng>(rng: &mut R, jitter: f32) -> f32 {
    if jitter > 0.0 {
        (rng.random::<f32>() - 0.5) * jitter
    } else {
        0.0
    }
}

/// Keep a ball between the left and right edges of the world
pub fn confine_to_world(body: &mut Body, width: f32, restitution: f32) {
    if !body.pos.is_finite() || !body.vel.is_finite() {
        let y = if body.pos.y.is_finite() { body.pos.y } else { 0.0 };
        body.pos = Vec2::new(width * 0.5, y);
        body.vel = Vec2::ZERO;
    }
    let r = body.radius;
    if width < 2.0 * r {
        body.pos.x = width * 0.5;
        body.vel.x = 0.0;
        return;
    }
    if body.pos.x < r {
        body.pos.x = r;
        if body.vel.x < 0.0 {
            body.vel.x = -body.vel.x * restitution;
        }
    }
    if body.pos.x > width - r {
        body.pos.x = width - r;
        if body.vel.x > 0.0 {
            body.vel.x = -body.vel.x * restitution;
        }
    }
}

/// Clamp a ball inside its bucket's walls and floor, reflecting only the
/// velocity component that points out of the bucket. Returns the floor line.
pub fn contain_in_bucket(
    body: &mut Body,
    bucket: &Bucket,
    wall_restitution: f32,
    floor_restitution: f32,
) -> f32 {
    let r = body.radius;
    let left = bucket.left() + r;
    let right = bucket.right() - r;
    let floor = bucket.floor() - r;

    if left > right {
        body.pos.x = (bucket.left() + bucket.right()) * 0.5;
        body.vel.x = 0.0;
    } else {
        if body.pos.x < left {
            body.pos.x = left;
            if body.vel.x < 0.0 {
                body.vel.x = -body.vel.x * wall_restitution;
            }
        }
        if body.pos.x > right {
            body.pos.x = right;
            if body.vel.x > 0.0 {
                body.vel.x = -body.vel.x * wall_restitution;
            }
        }
    }
    if body.pos.y > floor {
        body.pos.y = floor;
        if body.vel.y > 0.0 {
            body.vel.y = -body.vel.y * floor_restitution;
        }
    }
    floor
}

/// Advance decay timers and drop balls that have expired
fn apply_decay(bodies: &mut Vec<Body>, config: &SimConfig, dt: f32) {
    for body in bodies.iter_mut() {
        if body.bucket.is_none() {
            body.time_in_bucket = 0.0;
            continue;
        }
        let counting = match config.decay_policy {
            DecayPolicy::FromEntry => true,
            DecayPolicy::Resting => body.on_floor && body.vel.length() < config.resting_speed,
        };
        if counting {
            body.time_in_bucket += dt;
        }
    }
    bodies.retain(|b| b.bucket.is_none() || b.time_in_bucket < config.decay_threshold);
}

/// True once every ball is bucketed and nearly still
pub fn is_at_rest(layout: &Layout, bodies: &[Body], speed: f32) -> bool {
    bodies
        .iter()
        .all(|b| !layout.is_airborne(b.pos.y, b.radius) && b.vel.length() < speed)
}
