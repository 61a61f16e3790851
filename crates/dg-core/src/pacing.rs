//! Pacing curves and difficulty assignment
//!
//! A curve maps normalized critical-path progress to a target difficulty.
//! Every room gets `clamp(curve(progress) + uniform(-v, v), 0, 1)` and a
//! reward derived from that difficulty.

use std::collections::BTreeMap;

use dg_rng::DungeonRng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GraphError};
use crate::graph::{DungeonGraph, RoomId};

/// Progress used when a room has no path to the critical path at all
const FALLBACK_PROGRESS: f64 = 0.5;

/// Weight of difficulty in the reward formula
const REWARD_FROM_DIFFICULTY: f64 = 0.7;
/// Upper bound of the random reward bonus
const REWARD_JITTER: f64 = 0.3;

/// A control point of a custom curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub progress: f64,
    pub value: f64,
}

impl ControlPoint {
    pub fn new(progress: f64, value: f64) -> Self {
        Self { progress, value }
    }
}

/// Piecewise-linear curve through at least two control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCurve {
    points: Vec<ControlPoint>,
}

impl CustomCurve {
    /// Sorts the points by progress. Points must lie in the unit square.
    pub fn new(mut points: Vec<ControlPoint>) -> Result<Self, ConfigError> {
        if points.len() < 2 {
            return Err(ConfigError::TooFewControlPoints(points.len()));
        }
        for p in &points {
            let in_unit = |x: f64| (0.0..=1.0).contains(&x);
            if !(in_unit(p.progress) && in_unit(p.value)) {
                return Err(ConfigError::ControlPoint {
                    progress: p.progress,
                    value: p.value,
                });
            }
        }
        points.sort_by(|a, b| a.progress.total_cmp(&b.progress));
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    fn evaluate(&self, p: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return p,
        };
        if p <= first.progress {
            return first.value;
        }
        if p >= last.progress {
            return last.value;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if p >= a.progress && p <= b.progress {
                let span = b.progress - a.progress;
                if span <= 0.0 {
                    return b.value;
                }
                let t = (p - a.progress) / span;
                return a.value + t * (b.value - a.value);
            }
        }
        last.value
    }
}

/// Progress → difficulty mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PacingCurve {
    Linear,
    /// Logistic curve re-normalized to pass through (0, 0) and (1, 1)
    SCurve { steepness: f64 },
    /// `p^exponent`
    Exponential { exponent: f64 },
    Custom(CustomCurve),
}

impl PacingCurve {
    /// Evaluate at `p`, clamped to [0, 1]; the result is in [0, 1]
    pub fn evaluate(&self, p: f64) -> f64 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        let v = match self {
            PacingCurve::Linear => p,
            PacingCurve::SCurve { steepness } => {
                let k = *steepness;
                let sigmoid = |x: f64| 1.0 / (1.0 + (-x).exp());
                let lo = sigmoid(-k / 2.0);
                let hi = sigmoid(k / 2.0);
                if hi - lo <= f64::EPSILON {
                    p
                } else {
                    (sigmoid(k * (p - 0.5)) - lo) / (hi - lo)
                }
            }
            PacingCurve::Exponential { exponent } => p.powf(*exponent),
            PacingCurve::Custom(curve) => curve.evaluate(p),
        };
        v.clamp(0.0, 1.0)
    }
}

/// Normalized progress of every room.
///
/// On-path rooms get `index / (len - 1)`. Off-path rooms take the mean of
/// their on-path neighbours, else the progress of the nearest on-path room,
/// else 0.5.
pub fn room_progress(graph: &DungeonGraph) -> BTreeMap<RoomId, f64> {
    let path = graph.critical_path().unwrap_or_default();
    let mut on_path: BTreeMap<RoomId, f64> = BTreeMap::new();
    let last = path.len().saturating_sub(1);
    for (i, id) in path.iter().enumerate() {
        let p = if last == 0 { 0.0 } else { i as f64 / last as f64 };
        on_path.entry(*id).or_insert(p);
    }

    graph
        .room_ids()
        .into_iter()
        .map(|id| {
            if let Some(&p) = on_path.get(&id) {
                return (id, p);
            }
            let adjacent: Vec<f64> = graph
                .neighbors(id)
                .iter()
                .filter_map(|n| on_path.get(n).copied())
                .collect();
            let p = if !adjacent.is_empty() {
                adjacent.iter().sum::<f64>() / adjacent.len() as f64
            } else {
                graph
                    .nearest(id, |r| on_path.contains_key(&r))
                    .and_then(|r| on_path.get(&r).copied())
                    .unwrap_or(FALLBACK_PROGRESS)
            };
            (id, p)
        })
        .collect()
}

/// Reward for a given difficulty: `0.7 * d + uniform(0, 0.3)`, clamped
pub fn derive_reward(difficulty: f64, rng: &mut DungeonRng) -> f64 {
    (REWARD_FROM_DIFFICULTY * difficulty + rng.uniform(0.0, REWARD_JITTER)).clamp(0.0, 1.0)
}

/// Write difficulty and reward onto every room, in id order.
///
/// Consumes exactly two draws per room regardless of the variance.
pub fn assign_difficulty(
    graph: &mut DungeonGraph,
    curve: &PacingCurve,
    variance: f64,
    rng: &mut DungeonRng,
) -> Result<(), GraphError> {
    let variance = variance.clamp(0.0, crate::config::MAX_VARIANCE);
    let progress = room_progress(graph);
    for (id, p) in progress {
        let difficulty = (curve.evaluate(p) + rng.uniform(-variance, variance)).clamp(0.0, 1.0);
        let reward = derive_reward(difficulty, rng);
        let room = graph.room_mut(id)?;
        room.difficulty = difficulty;
        room.reward = reward;
    }
    Ok(())
}
