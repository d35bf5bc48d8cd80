//! Four-block house

use rand::rngs::StdRng;

use brickyard_rl_core::Result;

use super::{BlockEnv, BlockEnvConfig, Task};
use crate::predicates::{house_building_4, Tolerances};
use crate::scene::{ObjectKind, ObjectState, Scene};

/// Objects on the table at the start of an episode
const HOUSE_PARTS: [(ObjectKind, usize); 3] = [
    (ObjectKind::Roof, 1),
    (ObjectKind::Brick, 1),
    (ObjectKind::Cube, 4),
];

/// Build two block pairs separated by a brick, with a roof on top
#[derive(Debug, Clone, Default)]
pub struct HouseBuilding4Task {
    random_orientation: bool,
}

impl Task for HouseBuilding4Task {
    const NAME: &'static str = "house_building_4";

    fn from_config(config: &BlockEnvConfig) -> Result<Self> {
        Ok(Self {
            random_orientation: config.random_orientation,
        })
    }

    fn populate(&mut self, scene: &mut dyn Scene, _rng: &mut StdRng, _config: &BlockEnvConfig) -> Result<()> {
        for (kind, count) in HOUSE_PARTS {
            scene.generate_shapes(kind, count, self.random_orientation)?;
        }
        Ok(())
    }

    fn check(&self, objects: &[ObjectState], tol: &Tolerances) -> bool {
        house_building_4(objects, tol)
    }
}

/// Four-block house environment
pub type HouseBuilding4Env<S> = BlockEnv<S, HouseBuilding4Task>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Pose, PrimitiveAction};
    use crate::sim::KinematicScene;
    use brickyard_rl_core::{Environment, EnvironmentConfig};
    use nalgebra::Point3;

    #[tokio::test]
    async fn test_reset_spawns_house_parts() {
        let mut env = HouseBuilding4Env::new(KinematicScene::seeded(2), &EnvironmentConfig::seeded(2)).unwrap();
        env.reset().await.unwrap();

        let objects = env.scene().objects();
        assert_eq!(objects.len(), 6);
        assert_eq!(objects.iter().filter(|o| o.kind == ObjectKind::Cube).count(), 4);
        assert_eq!(objects[0].kind, ObjectKind::Roof);
        assert!(!env.is_goal_reached());
    }

    #[tokio::test]
    async fn test_assembling_the_house_finishes_the_episode() {
        let config = EnvironmentConfig {
            seed: Some(9),
            max_steps: Some(20),
            ..EnvironmentConfig::default()
        };
        let mut env = HouseBuilding4Env::new(KinematicScene::seeded(9), &config).unwrap();
        env.reset().await.unwrap();

        // Park everything along one edge, away from the build site
        let objects = env.scene().objects();
        let parked: Vec<_> = objects
            .iter()
            .enumerate()
            .map(|(i, o)| {
                #[allow(clippy::cast_precision_loss)]
                let x = 0.25 + 0.05 * i as f64;
                (o.kind, Point3::new(x, -0.25, 0.015))
            })
            .collect();
        for (object, (_, at)) in objects.iter().zip(&parked) {
            env.scene_mut().set_pose(object.id, Pose::from_yaw(*at, 0.0)).unwrap();
        }

        let park_of = |kind: ObjectKind, nth: usize| {
            parked
                .iter()
                .filter(|(k, _)| *k == kind)
                .nth(nth)
                .map(|(_, p)| *p)
                .unwrap()
        };
        let (x, y) = (0.5, 0.1);
        let plan = [
            (park_of(ObjectKind::Cube, 0), (x, y - 0.033)),
            (park_of(ObjectKind::Cube, 1), (x, y + 0.033)),
            (park_of(ObjectKind::Brick, 0), (x, y)),
            (park_of(ObjectKind::Cube, 2), (x, y - 0.03)),
            (park_of(ObjectKind::Cube, 3), (x, y + 0.03)),
            (park_of(ObjectKind::Roof, 0), (x, y)),
        ];

        let mut steps = Vec::new();
        for (from, (tx, ty)) in plan {
            env.step(PrimitiveAction::pick(from.x, from.y, 0.0, 0.0)).await.unwrap();
            steps.push(env.step(PrimitiveAction::place(tx, ty, 0.0, 0.0)).await.unwrap());
        }

        let (last, before) = steps.split_last().unwrap();
        assert!(before.iter().all(|s| !s.done));
        assert!(last.done);

        let objects = env.scene().objects();
        let roof = objects.iter().find(|o| o.kind == ObjectKind::Roof).unwrap();
        approx::assert_relative_eq!(roof.position().z, 0.105, epsilon = 1e-9);
    }
}
