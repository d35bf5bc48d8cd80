//! Level placement.
//!
//! Levels are resolved strictly bottom-up. The bottom level samples free
//! table space; every other level derives its position from what the level
//! below offers as support:
//!
//! | below     | single above      | double above       | spanning above |
//! |-----------|-------------------|--------------------|----------------|
//! | `1b`      | same point        | invalid            | invalid        |
//! | `2b`      | one of the two    | both points        | midpoint       |
//! | `1l`      | jittered along it | both ends          | same point     |
//! | `1r` `2r` | invalid           | invalid            | invalid        |

use nalgebra::{distance, Point2, Point3, UnitQuaternion};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use brickyard_rl_core::{RLError, Result};

use super::parser::{GoalToken, Level, LevelShape, Placement, Stack};
use super::GeneratorConfig;
use crate::scene::{ObjectId, ObjectKind, SampleRegion, Scene};

/// Lateral slack of the second block's search rectangle
const PAIR_LATERAL_SLACK: f64 = 0.005;

/// A spawned object that belongs to the goal structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureObject {
    /// Handle
    pub id: ObjectId,
    /// Kind
    pub kind: ObjectKind,
    /// Level index it was generated for
    pub level: usize,
}

/// Result of placing the second block of a bottom pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairSample {
    /// Spacing fell inside the window
    Matched {
        /// Second position
        second: Point2<f64>,
        /// Distance to the first position
        distance: f64,
    },
    /// Attempts ran out; this is the last candidate drawn
    Fallback {
        /// Second position
        second: Point2<f64>,
        /// Distance to the first position
        distance: f64,
    },
}

impl PairSample {
    /// The sampled point, whatever the outcome
    #[must_use]
    pub fn second(&self) -> Point2<f64> {
        match *self {
            Self::Matched { second, .. } | Self::Fallback { second, .. } => second,
        }
    }

    /// Whether the spacing is inside the window
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// What a resolved level offers to the level above it
#[derive(Debug, Clone, Copy)]
enum Support {
    Point(Point2<f64>),
    Pair(Point2<f64>, Point2<f64>),
    Beam(Point2<f64>),
    Apex,
}

impl Support {
    fn of(level: &Level) -> Result<Self> {
        let inconsistent = || {
            RLError::Environment(format!(
                "level {} ('{}') has no matching placement",
                level.height(),
                level.token()
            ))
        };

        match (level.token(), level.placement().copied()) {
            (GoalToken::Triangle | GoalToken::Roof, _) => Ok(Self::Apex),
            (GoalToken::OneBlock, Some(Placement::Single(p))) => Ok(Self::Point(p)),
            (GoalToken::TwoBlocks, Some(Placement::Pair(a, b))) => Ok(Self::Pair(a, b)),
            (GoalToken::Brick, Some(Placement::Single(p))) => Ok(Self::Beam(p)),
            _ => Err(inconsistent()),
        }
    }
}

/// Draw the second block of a bottom pair so that its distance to `first`
/// lands in `[2.1, 2.2]` block sizes.
///
/// Sampler failures count as spent attempts. Errors only when not a single
/// candidate could be drawn.
pub fn sample_pair<S>(scene: &mut S, first: Point2<f64>, config: &GeneratorConfig) -> Result<PairSample>
where
    S: Scene + ?Sized,
{
    let size = config.block_size;
    let padding = size * 1.5;
    let min_dist = 2.1 * size;
    let max_dist = 2.2 * size;
    let region = SampleRegion::around(first, PAIR_LATERAL_SLACK, max_dist);

    let mut last = None;
    for _ in 0..config.pair_attempts {
        let candidate = match scene.sample_valid_positions(padding, min_dist, &[first], 1, Some(&region)) {
            Ok(points) => match points.first() {
                Some(p) => *p,
                None => continue,
            },
            Err(e) if e.is_recoverable() => continue,
            Err(e) => return Err(e),
        };

        let d = distance(&first, &candidate);
        if (min_dist..=max_dist).contains(&d) {
            return Ok(PairSample::Matched {
                second: candidate,
                distance: d,
            });
        }
        last = Some((candidate, d));
    }

    match last {
        Some((second, distance)) => Ok(PairSample::Fallback { second, distance }),
        None => Err(RLError::sampling_exhausted("second block of a pair", config.pair_attempts)),
    }
}

fn place_bottom<S: Scene + ?Sized>(level: &Level, scene: &mut S, config: &GeneratorConfig) -> Result<Placement> {
    let padding = config.block_size * 1.5;
    let first = scene
        .sample_valid_positions(padding, 0.0, &[], 1, None)?
        .first()
        .copied()
        .ok_or_else(|| RLError::sampling_exhausted("bottom level", 1))?;

    if level.token().shape() != LevelShape::Double {
        return Ok(Placement::Single(first));
    }

    let second = match sample_pair(scene, first, config)? {
        PairSample::Matched { second, .. } => second,
        PairSample::Fallback { second, distance } => {
            warn!(
                distance,
                min = 2.1 * config.block_size,
                max = 2.2 * config.block_size,
                accepted = config.accept_fallback_pairs,
                "bottom pair spacing outside window"
            );
            if !config.accept_fallback_pairs {
                return Err(RLError::sampling_exhausted("bottom pair spacing", config.pair_attempts));
            }
            second
        }
    };
    Ok(Placement::Pair(first, second))
}

fn place_above<R: Rng + ?Sized>(level: &Level, below: &Level, rng: &mut R, unit: f64) -> Result<Placement> {
    let support = Support::of(below)?;

    let placement = match (support, level.token().shape()) {
        (Support::Point(p), LevelShape::Single) => Placement::Single(p),
        (Support::Pair(a, b), LevelShape::Single) => {
            let pick = [a, b].choose(rng).copied().unwrap_or(a);
            Placement::Single(pick)
        }
        (Support::Pair(a, b), LevelShape::Double) => Placement::Pair(a, b),
        (Support::Pair(a, b), LevelShape::Spanning) => Placement::Single(nalgebra::center(&a, &b)),
        (Support::Beam(p), LevelShape::Single) => {
            let offset = rng.gen_range(-unit..=unit);
            Placement::Single(Point2::new(p.x, p.y + offset))
        }
        (Support::Beam(p), LevelShape::Double) => {
            Placement::Pair(Point2::new(p.x, p.y - unit), Point2::new(p.x, p.y + unit))
        }
        (Support::Beam(p), LevelShape::Spanning) => Placement::Single(p),
        (Support::Point(_), LevelShape::Double | LevelShape::Spanning) | (Support::Apex, _) => {
            return Err(RLError::UnknownStructure {
                below: below.token().to_string(),
                above: level.token().to_string(),
            });
        }
    };
    Ok(placement)
}

/// Resolve every level of `stack` bottom-up and spawn its objects.
///
/// Returns the spawned structure objects in generation order.
pub fn generate_stack<S, R>(
    stack: &mut Stack,
    scene: &mut S,
    rng: &mut R,
    config: &GeneratorConfig,
) -> Result<Vec<StructureObject>>
where
    S: Scene + ?Sized,
    R: Rng + ?Sized,
{
    let unit = config.block_size;
    let mut objects = Vec::new();

    for index in 0..stack.len() {
        let levels = stack.levels();
        let level = &levels[index];
        let placement = match level.below() {
            None => place_bottom(level, scene, config)?,
            Some(below) => place_above(level, &levels[below], rng, unit)?,
        };

        let kind = level.token().kind();
        #[allow(clippy::cast_precision_loss)]
        let z = level.height() as f64 * unit + unit / 2.0;
        for point in placement.points() {
            let id = scene.spawn_object(kind, Point3::new(point.x, point.y, z), UnitQuaternion::identity(), None)?;
            objects.push(StructureObject { id, kind, level: index });
        }
        debug!(level = index, token = %level.token(), ?placement, "level placed");

        if let Some(level) = stack.level_mut(index) {
            level.resolve(placement)?;
        }
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::parse_goal;
    use crate::sim::KinematicScene;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const UNIT: f64 = 0.03;

    fn build(goal: &str, seed: u64) -> (Stack, Vec<StructureObject>, KinematicScene) {
        let mut parsed = parse_goal(goal).unwrap();
        let mut scene = KinematicScene::seeded(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let objects = generate_stack(&mut parsed.stack, &mut scene, &mut rng, &GeneratorConfig::default()).unwrap();
        (parsed.stack, objects, scene)
    }

    #[test]
    fn test_single_on_single_shares_position() {
        let (stack, objects, scene) = build("1b1b1r", 3);
        assert!(stack.is_resolved());
        assert_eq!(objects.len(), 3);

        let states: Vec<_> = objects.iter().map(|o| scene.object(o.id).unwrap()).collect();
        for (i, state) in states.iter().enumerate() {
            assert_relative_eq!(state.position().x, states[0].position().x);
            assert_relative_eq!(state.position().y, states[0].position().y);
            #[allow(clippy::cast_precision_loss)]
            let expected_z = i as f64 * UNIT + UNIT / 2.0;
            assert_relative_eq!(state.position().z, expected_z, epsilon = 1e-12);
        }
        assert_eq!(objects[2].kind, ObjectKind::Triangle);
    }

    #[test]
    fn test_spanning_on_pair_uses_midpoint() {
        let (stack, objects, _) = build("2b1l2r", 9);
        let levels = stack.levels();
        let Some(Placement::Pair(a, b)) = levels[0].placement().copied() else {
            panic!("bottom of 2b1l2r must be a pair");
        };
        let Some(Placement::Single(brick)) = levels[1].placement().copied() else {
            panic!("brick must be single");
        };
        let mid = nalgebra::center(&a, &b);
        assert_relative_eq!(brick.x, mid.x, epsilon = 1e-12);
        assert_relative_eq!(brick.y, mid.y, epsilon = 1e-12);
        assert_eq!(levels[2].placement(), Some(&Placement::Single(brick)));

        let d = distance(&a, &b);
        assert!((2.1 * UNIT..=2.2 * UNIT).contains(&d), "pair distance {d}");
        assert_eq!(
            objects.iter().map(|o| o.level).collect::<Vec<_>>(),
            vec![0, 0, 1, 2]
        );
    }

    #[test]
    fn test_single_on_pair_picks_one_support() {
        for seed in 0..10 {
            let (stack, _, _) = build("2b1b", seed);
            let levels = stack.levels();
            let Some(Placement::Pair(a, b)) = levels[0].placement().copied() else {
                panic!("expected pair");
            };
            let Some(Placement::Single(top)) = levels[1].placement().copied() else {
                panic!("expected single");
            };
            assert!(top == a || top == b);
        }
    }

    #[test]
    fn test_on_brick_placements() {
        let (stack, _, _) = build("1l2b", 4);
        let levels = stack.levels();
        let Some(Placement::Single(beam)) = levels[0].placement().copied() else {
            panic!("expected brick position");
        };
        let Some(Placement::Pair(a, b)) = levels[1].placement().copied() else {
            panic!("expected pair on brick");
        };
        assert_relative_eq!(a.x, beam.x);
        assert_relative_eq!(a.y, beam.y - UNIT, epsilon = 1e-12);
        assert_relative_eq!(b.y, beam.y + UNIT, epsilon = 1e-12);

        let (stack, _, _) = build("1l1b", 4);
        let levels = stack.levels();
        let Some(Placement::Single(beam)) = levels[0].placement().copied() else {
            panic!("expected brick position");
        };
        let Some(Placement::Single(top)) = levels[1].placement().copied() else {
            panic!("expected single on brick");
        };
        assert_relative_eq!(top.x, beam.x);
        assert!((top.y - beam.y).abs() <= UNIT + 1e-12);
    }

    #[test]
    fn test_unsupported_combinations_fail() {
        for goal in ["1b2b", "1b1l", "1r1b", "2r1b", "2b1r1b"] {
            let mut parsed = parse_goal(goal).unwrap();
            let mut scene = KinematicScene::seeded(1);
            let mut rng = StdRng::seed_from_u64(1);
            let err = generate_stack(&mut parsed.stack, &mut scene, &mut rng, &GeneratorConfig::default())
                .unwrap_err();
            assert!(matches!(err, RLError::UnknownStructure { .. }), "{goal}: {err}");
            assert!(!err.is_recoverable());
        }
    }

    /// Answers every region-restricted draw with a point `offset` past
    /// the first block along y
    struct FarSecond {
        inner: KinematicScene,
        offset: f64,
        region_draws: usize,
    }

    impl Scene for FarSecond {
        fn reset(&mut self) -> Result<()> {
            self.inner.reset()
        }

        fn sample_valid_positions(
            &mut self,
            padding: f64,
            min_distance: f64,
            existing: &[Point2<f64>],
            count: usize,
            region: Option<&SampleRegion>,
        ) -> Result<Vec<Point2<f64>>> {
            match (region, existing.first()) {
                (Some(_), Some(first)) => {
                    self.region_draws += 1;
                    Ok(vec![Point2::new(first.x, first.y + self.offset)])
                }
                _ => self.inner.sample_valid_positions(padding, min_distance, existing, count, region),
            }
        }

        fn spawn_object(
            &mut self,
            kind: ObjectKind,
            position: Point3<f64>,
            orientation: UnitQuaternion<f64>,
            scale: Option<f64>,
        ) -> Result<ObjectId> {
            self.inner.spawn_object(kind, position, orientation, scale)
        }

        fn generate_shapes(
            &mut self,
            kind: ObjectKind,
            count: usize,
            random_orientation: bool,
        ) -> Result<Vec<ObjectId>> {
            self.inner.generate_shapes(kind, count, random_orientation)
        }

        fn objects(&self) -> Vec<crate::scene::ObjectState> {
            self.inner.objects()
        }

        fn wait(&mut self, steps: usize) {
            self.inner.wait(steps);
        }

        fn take_action(&mut self, action: &crate::scene::PrimitiveAction) -> Result<()> {
            self.inner.take_action(action)
        }

        fn is_holding(&self) -> bool {
            self.inner.is_holding()
        }

        fn is_sim_valid(&self) -> bool {
            self.inner.is_sim_valid()
        }
    }

    fn far_second(seed: u64) -> FarSecond {
        FarSecond {
            inner: KinematicScene::seeded(seed),
            offset: 0.2,
            region_draws: 0,
        }
    }

    #[test]
    fn test_pair_sampling_falls_back_after_attempts() {
        let config = GeneratorConfig::default();
        let mut scene = far_second(8);
        let first = Point2::new(0.5, 0.0);

        let sample = sample_pair(&mut scene, first, &config).unwrap();
        assert!(!sample.is_matched());
        match sample {
            PairSample::Fallback { second, distance } => {
                assert_relative_eq!(distance, 0.2, epsilon = 1e-12);
                assert_relative_eq!(second.y, 0.2, epsilon = 1e-12);
            }
            PairSample::Matched { .. } => panic!("spacing cannot match"),
        }
        assert_eq!(scene.region_draws, config.pair_attempts);
    }

    #[test]
    fn test_fallback_pair_is_rejected_by_default() {
        let mut parsed = parse_goal("2b").unwrap();
        let mut scene = far_second(8);
        let mut rng = StdRng::seed_from_u64(8);

        let err = generate_stack(&mut parsed.stack, &mut scene, &mut rng, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, RLError::SamplingExhausted { .. }), "{err}");
        assert!(err.is_recoverable());
        assert!(scene.objects().is_empty());
        assert!(!parsed.stack.is_resolved());
    }

    #[test]
    fn test_fallback_pair_is_kept_when_accepted() {
        let config = GeneratorConfig {
            accept_fallback_pairs: true,
            ..GeneratorConfig::default()
        };
        let mut parsed = parse_goal("2b").unwrap();
        let mut scene = far_second(8);
        let mut rng = StdRng::seed_from_u64(8);

        let objects = generate_stack(&mut parsed.stack, &mut scene, &mut rng, &config).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(scene.objects().len(), 2);

        let Some(Placement::Pair(a, b)) = parsed.stack.levels()[0].placement().copied() else {
            panic!("expected pair");
        };
        assert_relative_eq!(b.x, a.x);
        assert_relative_eq!(distance(&a, &b), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_pair_spacing_mostly_matches() {
        let config = GeneratorConfig::default();
        let mut scene = KinematicScene::seeded(42);
        let mut matched = 0;
        let runs = 1000;
        for _ in 0..runs {
            let first = scene
                .sample_valid_positions(UNIT * 1.5, 0.0, &[], 1, None)
                .unwrap()[0];
            if let Ok(sample) = sample_pair(&mut scene, first, &config) {
                let d = distance(&first, &sample.second());
                if sample.is_matched() {
                    assert!((2.1 * UNIT..=2.2 * UNIT).contains(&d));
                    matched += 1;
                }
            }
        }
        assert!(matched * 100 >= runs * 95, "only {matched}/{runs} pairs matched");
    }
}
