//! Distractor padding
//!
//! Tops the scene up to fixed per-category counts so that every episode
//! holds the same objects regardless of which structure was generated.

use tracing::{debug, warn};

use brickyard_rl_core::Result;

use super::{CategoryCounts, GeneratorConfig};
use crate::scene::{ObjectId, ObjectKind, Scene};

/// Categories are padded in this order
pub const PADDING_ORDER: [ObjectKind; 4] = [
    ObjectKind::Roof,
    ObjectKind::Brick,
    ObjectKind::Cube,
    ObjectKind::Triangle,
];

/// A category that could not be topped up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    /// Category
    pub kind: ObjectKind,
    /// Objects that were not spawned
    pub missing: usize,
    /// Attempts spent
    pub attempts: usize,
}

/// What padding added to the scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaddingReport {
    /// Distractors spawned
    pub spawned: Vec<ObjectId>,
    /// Categories left short
    pub shortfalls: Vec<Shortfall>,
}

/// Spawn `deficit` distractors at free random positions.
///
/// Each category gets `padding_attempts` tries to place all of its missing
/// objects at once. A category that keeps failing is skipped for this
/// episode. Only non-recoverable scene errors are returned.
pub fn pad_scene<S>(scene: &mut S, deficit: &CategoryCounts, config: &GeneratorConfig) -> Result<PaddingReport>
where
    S: Scene + ?Sized,
{
    let mut report = PaddingReport::default();

    for kind in PADDING_ORDER {
        let missing = deficit.get(kind);
        if missing == 0 {
            continue;
        }

        let mut placed = false;
        for attempt in 1..=config.padding_attempts {
            match scene.generate_shapes(kind, missing, config.random_orientation) {
                Ok(ids) => {
                    debug!(%kind, count = ids.len(), attempt, "distractors spawned");
                    report.spawned.extend(ids);
                    placed = true;
                    break;
                }
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e),
            }
        }

        if !placed {
            warn!(%kind, missing, attempts = config.padding_attempts, "padding shortfall");
            report.shortfalls.push(Shortfall {
                kind,
                missing,
                attempts: config.padding_attempts,
            });
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Workspace;
    use crate::sim::KinematicScene;

    #[test]
    fn test_pads_every_category() {
        let mut scene = KinematicScene::seeded(2);
        let report = pad_scene(&mut scene, &CategoryCounts::CANONICAL, &GeneratorConfig::default()).unwrap();
        assert_eq!(report.spawned.len(), 8);
        assert!(report.shortfalls.is_empty());

        let kinds: Vec<_> = scene.objects().iter().map(|o| o.kind).collect();
        // Roofs first, triangles last
        assert_eq!(kinds.first(), Some(&ObjectKind::Roof));
        assert_eq!(kinds.last(), Some(&ObjectKind::Triangle));
    }

    #[test]
    fn test_crowded_table_is_a_shortfall_not_an_error() {
        let tiny = Workspace {
            x: [0.0, 0.04],
            y: [0.0, 0.04],
            z: [0.0, 0.2],
        };
        let mut scene = KinematicScene::new(tiny, 0.03, 3);
        let config = GeneratorConfig {
            padding_attempts: 5,
            ..GeneratorConfig::default()
        };
        let deficit = CategoryCounts {
            blocks: 3,
            bricks: 1,
            triangles: 0,
            roofs: 0,
        };
        let report = pad_scene(&mut scene, &deficit, &config).unwrap();

        assert!(report.spawned.is_empty());
        assert_eq!(report.shortfalls.len(), 2);
        assert_eq!(report.shortfalls[0].kind, ObjectKind::Brick);
        assert_eq!(report.shortfalls[1].missing, 3);
        assert!(scene.objects().is_empty());
    }

    #[test]
    fn test_zero_deficit_does_nothing() {
        let mut scene = KinematicScene::seeded(1);
        let report = pad_scene(&mut scene, &CategoryCounts::default(), &GeneratorConfig::default()).unwrap();
        assert_eq!(report, PaddingReport::default());
    }
}
