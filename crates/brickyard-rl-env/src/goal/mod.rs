//! Procedural goal structures
//!
//! A goal string is parsed into a [`Stack`] of levels, each level is
//! placed on the one below it, and the scene is optionally topped up with
//! distractors so every episode holds the same number of objects per
//! category.

pub mod generator;
pub mod padding;
pub mod parser;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use brickyard_rl_core::Result;

use crate::scene::{ObjectId, ObjectKind, Scene};

pub use generator::{generate_stack, sample_pair, PairSample, StructureObject};
pub use padding::{pad_scene, PaddingReport, Shortfall, PADDING_ORDER};
pub use parser::{parse_goal, GoalToken, Level, LevelShape, ParsedGoal, Placement, Stack};

/// Object counts per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// Cubes
    pub blocks: usize,
    /// Bricks
    pub bricks: usize,
    /// Triangles
    pub triangles: usize,
    /// Roofs
    pub roofs: usize,
}

impl CategoryCounts {
    /// Contents of a complete scene: enough for any house of height three
    /// and width two with a roof on top.
    pub const CANONICAL: CategoryCounts = CategoryCounts {
        blocks: 4,
        bricks: 2,
        triangles: 1,
        roofs: 1,
    };

    /// Count for one kind. Cylinders count as blocks.
    #[must_use]
    pub fn get(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Cube | ObjectKind::Cylinder => self.blocks,
            ObjectKind::Brick => self.bricks,
            ObjectKind::Triangle => self.triangles,
            ObjectKind::Roof => self.roofs,
        }
    }

    /// Add `n` objects of a kind
    pub fn add(&mut self, kind: ObjectKind, n: usize) {
        let slot = match kind {
            ObjectKind::Cube | ObjectKind::Cylinder => &mut self.blocks,
            ObjectKind::Brick => &mut self.bricks,
            ObjectKind::Triangle => &mut self.triangles,
            ObjectKind::Roof => &mut self.roofs,
        };
        *slot += n;
    }

    /// Per-category difference, clamped at zero
    #[must_use]
    pub fn saturating_sub(&self, other: &CategoryCounts) -> CategoryCounts {
        CategoryCounts {
            blocks: self.blocks.saturating_sub(other.blocks),
            bricks: self.bricks.saturating_sub(other.bricks),
            triangles: self.triangles.saturating_sub(other.triangles),
            roofs: self.roofs.saturating_sub(other.roofs),
        }
    }

    /// Objects over all categories
    #[must_use]
    pub fn total(&self) -> usize {
        self.blocks + self.bricks + self.triangles + self.roofs
    }
}

/// Knobs of structure generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Edge of a unit block; also the height of every level
    pub block_size: f64,
    /// Draws allowed when placing the second block of a bottom pair
    pub pair_attempts: usize,
    /// Attempts per padded category
    pub padding_attempts: usize,
    /// Simulation steps to let the finished scene settle
    pub settle_steps: usize,
    /// Top up to the canonical counts with distractors
    pub with_padding: bool,
    /// Give distractors a random yaw
    pub random_orientation: bool,
    /// Keep a bottom pair whose spacing missed the window instead of failing
    pub accept_fallback_pairs: bool,
    /// Per-category totals after padding
    pub canonical: CategoryCounts,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            block_size: 0.03,
            pair_attempts: 100,
            padding_attempts: 100,
            settle_steps: 50,
            with_padding: true,
            random_orientation: false,
            accept_fallback_pairs: false,
            canonical: CategoryCounts::CANONICAL,
        }
    }
}

/// Outcome of one generation pass
#[derive(Debug, Clone)]
pub struct GeneratedStructure {
    /// The goal with every level resolved
    pub goal: ParsedGoal,
    /// Objects that make up the structure, bottom level first
    pub objects: Vec<StructureObject>,
    /// Distractors added afterwards
    pub padding: PaddingReport,
    /// Objects in the scene once generation finished
    pub total_objects: usize,
}

impl GeneratedStructure {
    /// Handles of the structure objects, excluding distractors
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }
}

/// Parse `goal`, build it in `scene` and pad the scene with distractors.
///
/// Any error leaves a half-built scene behind; the caller is expected to
/// reset the scene before trying again.
pub fn build_structure<S, R>(
    goal: &str,
    scene: &mut S,
    rng: &mut R,
    config: &GeneratorConfig,
) -> Result<GeneratedStructure>
where
    S: Scene + ?Sized,
    R: Rng + ?Sized,
{
    let mut parsed = parse_goal(goal)?;
    let objects = generate_stack(&mut parsed.stack, scene, rng, config)?;

    let padding = if config.with_padding {
        let deficit = config.canonical.saturating_sub(&parsed.counts);
        pad_scene(scene, &deficit, config)?
    } else {
        PaddingReport::default()
    };

    scene.wait(config.settle_steps);
    let total_objects = scene.objects().len();
    debug!(
        goal,
        structure = objects.len(),
        distractors = padding.spawned.len(),
        total_objects,
        "structure generated"
    );

    Ok(GeneratedStructure {
        goal: parsed,
        objects,
        padding,
        total_objects,
    })
}

/// Generation entry point with default settings
pub fn parse_and_build<S, R>(
    goal: &str,
    scene: &mut S,
    rng: &mut R,
    with_padding: bool,
) -> Result<GeneratedStructure>
where
    S: Scene + ?Sized,
    R: Rng + ?Sized,
{
    let config = GeneratorConfig {
        with_padding,
        ..GeneratorConfig::default()
    };
    build_structure(goal, scene, rng, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::KinematicScene;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deficit_is_clamped() {
        let generated = CategoryCounts {
            blocks: 6,
            bricks: 1,
            triangles: 0,
            roofs: 1,
        };
        let deficit = CategoryCounts::CANONICAL.saturating_sub(&generated);
        assert_eq!(
            deficit,
            CategoryCounts {
                blocks: 0,
                bricks: 1,
                triangles: 1,
                roofs: 0,
            }
        );
    }

    #[test]
    fn test_padding_reaches_canonical_counts() {
        let mut scene = KinematicScene::seeded(11);
        let mut rng = StdRng::seed_from_u64(11);
        let built = parse_and_build("2b1l2r", &mut scene, &mut rng, true).unwrap();

        assert_eq!(built.objects.len(), 4);
        assert!(built.padding.shortfalls.is_empty());

        let mut in_scene = CategoryCounts::default();
        for object in scene.objects() {
            in_scene.add(object.kind, 1);
        }
        assert_eq!(in_scene, CategoryCounts::CANONICAL);
        assert_eq!(built.total_objects, CategoryCounts::CANONICAL.total());
    }

    #[test]
    fn test_padding_keeps_structure_list() {
        let config = GeneratorConfig {
            with_padding: false,
            ..GeneratorConfig::default()
        };
        let mut scene = KinematicScene::seeded(5);
        let mut rng = StdRng::seed_from_u64(5);
        let bare = build_structure("1b1b", &mut scene, &mut rng, &config).unwrap();

        let mut scene = KinematicScene::seeded(5);
        let mut rng = StdRng::seed_from_u64(5);
        let padded = parse_and_build("1b1b", &mut scene, &mut rng, true).unwrap();

        assert_eq!(bare.objects.len(), padded.objects.len());
        assert!(padded.total_objects > padded.objects.len());
        for id in padded.object_ids() {
            assert!(!padded.padding.spawned.contains(&id));
        }
    }

    #[test]
    fn test_malformed_goal_spawns_nothing() {
        let mut scene = KinematicScene::seeded(1);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(parse_and_build("2b1", &mut scene, &mut rng, true).is_err());
        assert!(scene.objects().is_empty());
    }
}
