//! Goal verification predicates
//!
//! Stateless geometric checks over live object states. Task termination
//! conditions are conjunctions of these primitives.

use std::f64::consts::PI;

use nalgebra::distance;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::footprint::Footprint;
use crate::goal::{GoalToken, Level, LevelShape, Stack};
use crate::scene::{ObjectKind, ObjectState};

/// Thresholds shared by every predicate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Edge of a unit block
    pub block_size: f64,
    /// Max gap between an object's underside and the table
    pub ground_epsilon: f64,
    /// Slack when testing whether a center lies over a footprint
    pub contact_margin: f64,
    /// Max distance of a spanning object from the line through its supports
    pub in_between_threshold: f64,
    /// Max yaw difference, in radians, modulo a half turn
    pub orientation_threshold: f64,
    /// Absolute tolerance for "same coordinate" in adjacency checks
    pub adjacency_atol: f64,
    /// Max extent of an adjacent row, in block sizes
    pub adjacency_span_factor: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            block_size: 0.03,
            ground_epsilon: 0.01,
            contact_margin: 0.005,
            in_between_threshold: 0.01,
            orientation_threshold: 0.1,
            adjacency_atol: 0.01,
            adjacency_span_factor: 3.5,
        }
    }
}

impl Tolerances {
    fn half_height(&self, object: &ObjectState) -> f64 {
        self.block_size * object.scale / 2.0
    }
}

/// The object rests on the table
#[must_use]
pub fn on_ground(object: &ObjectState, tol: &Tolerances) -> bool {
    object.position().z - tol.half_height(object) < tol.ground_epsilon
}

/// `top` rests on `bottom`.
///
/// The vertical offset must be one stacked height, give or take half of it,
/// and one center must lie over the other object's footprint. Asymmetric:
/// the offset is signed.
#[must_use]
pub fn on_top_of(bottom: &ObjectState, top: &ObjectState, tol: &Tolerances) -> bool {
    let expected = tol.half_height(bottom) + tol.half_height(top);
    let dz = top.position().z - bottom.position().z;
    if (dz - expected).abs() > expected / 2.0 {
        return false;
    }

    let below = Footprint::of_object(bottom, tol.block_size);
    let above = Footprint::of_object(top, tol.block_size);
    below.contains(&top.xy(), tol.contact_margin) || above.contains(&bottom.xy(), tol.contact_margin)
}

/// `middle` sits on the segment between `a` and `b`, seen from above
#[must_use]
pub fn in_between(middle: &ObjectState, a: &ObjectState, b: &ObjectState, tol: &Tolerances) -> bool {
    let (p, pa, pb) = (middle.xy(), a.xy(), b.xy());
    let ab = pb - pa;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON {
        return distance(&p, &pa) < tol.in_between_threshold;
    }

    let ap = p - pa;
    let t = ap.dot(&ab) / len_sq;
    let off_line = (ab.x * ap.y - ab.y * ap.x).abs() / len_sq.sqrt();
    (0.0..=1.0).contains(&t) && off_line < tol.in_between_threshold
}

/// Yaw difference folded into `[0, π/2]`; bricks and roofs look the same
/// after a half turn.
fn yaw_gap(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(PI);
    d.min(PI - d)
}

/// Every pair of objects has nearly the same yaw
#[must_use]
pub fn orientation_similar(objects: &[&ObjectState], tol: &Tolerances) -> bool {
    objects.iter().enumerate().all(|(i, a)| {
        objects[i + 1..]
            .iter()
            .all(|b| yaw_gap(a.yaw(), b.yaw()) < tol.orientation_threshold)
    })
}

fn spread(values: ArrayView1<'_, f64>) -> f64 {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    hi - lo
}

fn all_close(values: ArrayView1<'_, f64>, atol: f64) -> bool {
    values.get(0).map_or(true, |&first| values.iter().all(|v| (v - first).abs() <= atol))
}

/// Objects stand side by side in one row on the same level.
///
/// Heights must agree, then either x is shared and the row runs along y, or
/// y is shared and the row runs along x.
#[must_use]
pub fn stack_adjacency(objects: &[ObjectState], tol: &Tolerances) -> bool {
    if objects.is_empty() {
        return false;
    }
    let positions = Array2::from_shape_fn((objects.len(), 3), |(i, j)| objects[i].position()[j]);
    let (xs, ys, zs) = (positions.column(0), positions.column(1), positions.column(2));

    if spread(zs) > tol.adjacency_atol {
        return false;
    }
    let max_span = tol.block_size * tol.adjacency_span_factor;
    if all_close(xs, tol.adjacency_atol) {
        spread(ys) < max_span
    } else if all_close(ys, tol.adjacency_atol) {
        spread(xs) < max_span
    } else {
        false
    }
}

/// All objects form a single tower, bottom on the table
#[must_use]
pub fn check_stack(objects: &[ObjectState], tol: &Tolerances) -> bool {
    let mut sorted: Vec<&ObjectState> = objects.iter().collect();
    sorted.sort_by(|a, b| a.position().z.total_cmp(&b.position().z));

    match sorted.first() {
        None => false,
        Some(bottom) => {
            on_ground(bottom, tol) && sorted.windows(2).all(|w| on_top_of(w[0], w[1], tol))
        }
    }
}

fn of_kind(objects: &[ObjectState], kind: ObjectKind) -> Vec<&ObjectState> {
    objects.iter().filter(|o| o.kind == kind).collect()
}

/// Four-block house: two ground blocks under a brick, two blocks on the
/// brick, a roof over those, brick and roof aligned.
#[must_use]
pub fn house_building_4(objects: &[ObjectState], tol: &Tolerances) -> bool {
    let blocks = of_kind(objects, ObjectKind::Cube);
    let (Some(brick), Some(roof)) = (
        of_kind(objects, ObjectKind::Brick).first().copied(),
        of_kind(objects, ObjectKind::Roof).first().copied(),
    ) else {
        return false;
    };

    let (level1, level2): (Vec<&ObjectState>, Vec<&ObjectState>) =
        blocks.into_iter().partition(|b| on_ground(b, tol));
    let (&[l1a, l1b], &[l2a, l2b]) = (level1.as_slice(), level2.as_slice()) else {
        return false;
    };

    on_top_of(l1a, brick, tol)
        && on_top_of(l1b, brick, tol)
        && on_top_of(brick, l2a, tol)
        && on_top_of(brick, l2b, tol)
        && on_top_of(l2a, roof, tol)
        && on_top_of(l2b, roof, tol)
        && orientation_similar(&[brick, roof], tol)
        && in_between(brick, l1a, l1b, tol)
        && in_between(roof, l2a, l2b, tol)
        && in_between(brick, l2a, l2b, tol)
}

/// Whether `above` (objects of one level) is supported by `below` the way
/// the generator would have placed it.
fn supported_by(
    below_token: GoalToken,
    below: &[&ObjectState],
    shape: LevelShape,
    above: &[&ObjectState],
    tol: &Tolerances,
) -> bool {
    let on = |b: &ObjectState, t: &ObjectState| on_top_of(b, t, tol);

    match (below_token, below, shape, above) {
        (GoalToken::OneBlock | GoalToken::Brick, &[b], LevelShape::Single, &[o]) => on(b, o),
        (GoalToken::TwoBlocks, &[b1, b2], LevelShape::Single, &[o]) => on(b1, o) || on(b2, o),
        (GoalToken::TwoBlocks, &[b1, b2], LevelShape::Double, &[o1, o2]) => {
            (on(b1, o1) && on(b2, o2)) || (on(b1, o2) && on(b2, o1))
        }
        (GoalToken::TwoBlocks, &[b1, b2], LevelShape::Spanning, &[o]) => {
            on(b1, o) && on(b2, o) && in_between(o, b1, b2, tol)
        }
        (GoalToken::Brick, &[b], LevelShape::Double, &[o1, o2]) => {
            on(b, o1) && on(b, o2) && in_between(b, o1, o2, tol)
        }
        (GoalToken::Brick, &[b], LevelShape::Spanning, &[o]) => on(b, o) && orientation_similar(&[b, o], tol),
        _ => false,
    }
}

fn candidate_groups(level: &Level, objects: &[ObjectState], used: &[bool]) -> Vec<Vec<usize>> {
    let kind = level.token().kind();
    let free: Vec<usize> = (0..objects.len())
        .filter(|&i| !used[i] && objects[i].kind == kind)
        .collect();

    match level.token().shape() {
        LevelShape::Double => free
            .iter()
            .enumerate()
            .flat_map(|(n, &i)| free[n + 1..].iter().map(move |&j| vec![i, j]))
            .collect(),
        LevelShape::Single | LevelShape::Spanning => free.into_iter().map(|i| vec![i]).collect(),
    }
}

fn assign_level(
    levels: &[Level],
    index: usize,
    objects: &[ObjectState],
    tol: &Tolerances,
    used: &mut [bool],
    chosen: &mut Vec<Vec<usize>>,
) -> bool {
    let Some(level) = levels.get(index) else {
        return true;
    };

    for group in candidate_groups(level, objects, used) {
        let members: Vec<&ObjectState> = group.iter().map(|&i| &objects[i]).collect();
        let supported = match level.below() {
            None => members.iter().all(|o| on_ground(o, tol)),
            Some(b) => {
                let below: Vec<&ObjectState> = chosen[b].iter().map(|&i| &objects[i]).collect();
                supported_by(levels[b].token(), &below, level.token().shape(), &members, tol)
            }
        };
        if !supported {
            continue;
        }

        for &i in &group {
            used[i] = true;
        }
        chosen.push(group);
        if assign_level(levels, index + 1, objects, tol, used, chosen) {
            return true;
        }
        if let Some(group) = chosen.pop() {
            for i in group {
                used[i] = false;
            }
        }
    }
    false
}

/// Whether the live objects contain the structure described by `stack`.
///
/// Objects are matched to levels by backtracking, so distractors and the
/// order objects were spawned in do not matter. Each object fills at most
/// one slot.
#[must_use]
pub fn verify_structure(stack: &Stack, objects: &[ObjectState], tol: &Tolerances) -> bool {
    let mut used = vec![false; objects.len()];
    let mut chosen = Vec::with_capacity(stack.len());
    assign_level(stack.levels(), 0, objects, tol, &mut used, &mut chosen)
}
