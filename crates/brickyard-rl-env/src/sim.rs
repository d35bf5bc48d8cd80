//! Kinematic reference scene
//!
//! An in-memory [`Scene`] without dynamics. Objects stay exactly where they
//! are put, a pick lifts the top-most object under the gripper and a place
//! drops the held object onto the highest surface below its footprint.
//! Good enough to exercise structure generation, padding and termination
//! checks deterministically; it does not model tipping, sliding or
//! collisions during motion.

use std::f64::consts::PI;

use nalgebra::{distance, Point2, Point3, UnitQuaternion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use brickyard_rl_core::{RLError, Result};

use crate::footprint::Footprint;
use crate::scene::{
    ObjectId, ObjectKind, ObjectState, Pose, Primitive, PrimitiveAction, SampleRegion, Scene, Workspace,
};

/// Draws per requested point before giving up
const SAMPLE_ATTEMPTS: usize = 100;

/// Deterministic, dynamics-free scene
#[derive(Debug, Clone)]
pub struct KinematicScene {
    workspace: Workspace,
    unit: f64,
    rng: StdRng,
    objects: Vec<ObjectState>,
    next_id: usize,
    held: Option<ObjectId>,
    steps: usize,
}

impl KinematicScene {
    /// Scene over `workspace` with blocks of edge `unit`
    #[must_use]
    pub fn new(workspace: Workspace, unit: f64, seed: u64) -> Self {
        Self {
            workspace,
            unit,
            rng: StdRng::seed_from_u64(seed),
            objects: Vec::new(),
            next_id: 0,
            held: None,
            steps: 0,
        }
    }

    /// Default workspace with 3 cm blocks
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(Workspace::default(), 0.03, seed)
    }

    /// Edge of a unit block
    #[must_use]
    pub fn unit(&self) -> f64 {
        self.unit
    }

    /// Object in the gripper, if any
    #[must_use]
    pub fn held(&self) -> Option<ObjectId> {
        self.held
    }

    /// Simulation steps waited since the last reset
    #[must_use]
    pub fn steps_waited(&self) -> usize {
        self.steps
    }

    /// Teleport an object
    pub fn set_pose(&mut self, id: ObjectId, pose: Pose) -> Result<()> {
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| RLError::Environment(format!("no object {id:?}")))?;
        object.pose = pose;
        Ok(())
    }

    /// Delete an object from the scene
    pub fn remove(&mut self, id: ObjectId) -> Option<ObjectState> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        if self.held == Some(id) {
            self.held = None;
        }
        Some(self.objects.remove(index))
    }

    fn half_height(&self, object: &ObjectState) -> f64 {
        self.unit * object.scale / 2.0
    }

    fn bounds(&self, padding: f64, region: Option<&SampleRegion>) -> Option<([f64; 2], [f64; 2])> {
        let mut x = [self.workspace.x[0] + padding / 2.0, self.workspace.x[1] - padding / 2.0];
        let mut y = [self.workspace.y[0] + padding / 2.0, self.workspace.y[1] - padding / 2.0];
        if let Some(region) = region {
            x = [x[0].max(region.x[0]), x[1].min(region.x[1])];
            y = [y[0].max(region.y[0]), y[1].min(region.y[1])];
        }
        (x[0] <= x[1] && y[0] <= y[1]).then_some((x, y))
    }

    fn draw(&mut self, x: [f64; 2], y: [f64; 2]) -> Point2<f64> {
        Point2::new(self.rng.gen_range(x[0]..=x[1]), self.rng.gen_range(y[0]..=y[1]))
    }

    /// Height of the highest top face under `footprint`, table is zero
    fn surface_under(&self, footprint: &Footprint, exclude: Option<ObjectId>) -> f64 {
        self.objects
            .iter()
            .filter(|o| Some(o.id) != exclude && Some(o.id) != self.held)
            .filter(|o| Footprint::of_object(o, self.unit).overlaps(footprint))
            .map(|o| o.pose.position.z + self.half_height(o))
            .fold(0.0, f64::max)
    }

    fn pick(&mut self, action: &PrimitiveAction) {
        if self.held.is_some() {
            trace!("pick ignored, gripper already holds an object");
            return;
        }
        let target = action.xy();
        let top = self
            .objects
            .iter()
            .filter(|o| Footprint::of_object(o, self.unit).contains(&target, 0.0))
            .max_by(|a, b| a.pose.position.z.total_cmp(&b.pose.position.z))
            .map(|o| o.id);

        if let Some(id) = top {
            let lift = self.workspace.z[1];
            if let Some(object) = self.objects.iter_mut().find(|o| o.id == id) {
                object.pose.position = Point3::new(target.x, target.y, lift);
            }
            self.held = Some(id);
            trace!(?id, "picked");
        }
    }

    fn place(&mut self, action: &PrimitiveAction) {
        let Some(id) = self.held else {
            trace!("place ignored, gripper is empty");
            return;
        };
        let Some(object) = self.object(id) else {
            self.held = None;
            return;
        };

        let footprint = Footprint::of_kind(object.kind, action.xy(), action.rot, self.unit, object.scale);
        self.held = None;
        let z = self.surface_under(&footprint, Some(id)) + self.half_height(&object);
        let pose = Pose::from_yaw(Point3::new(action.x, action.y, z), action.rot);
        if let Some(object) = self.objects.iter_mut().find(|o| o.id == id) {
            object.pose = pose;
        }
        trace!(?id, z, "placed");
    }
}

impl Scene for KinematicScene {
    fn reset(&mut self) -> Result<()> {
        self.objects.clear();
        self.next_id = 0;
        self.held = None;
        self.steps = 0;
        Ok(())
    }

    fn sample_valid_positions(
        &mut self,
        padding: f64,
        min_distance: f64,
        existing: &[Point2<f64>],
        count: usize,
        region: Option<&SampleRegion>,
    ) -> Result<Vec<Point2<f64>>> {
        let (x, y) = self
            .bounds(padding, region)
            .ok_or_else(|| RLError::sampling_exhausted("valid position (empty region)", 0))?;

        let mut taken = existing.to_vec();
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let found = (0..SAMPLE_ATTEMPTS).find_map(|_| {
                let p = self.draw(x, y);
                taken.iter().all(|q| distance(&p, q) > min_distance).then_some(p)
            });
            match found {
                Some(p) => {
                    taken.push(p);
                    points.push(p);
                }
                None => return Err(RLError::sampling_exhausted("valid position", SAMPLE_ATTEMPTS)),
            }
        }
        Ok(points)
    }

    fn spawn_object(
        &mut self,
        kind: ObjectKind,
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        scale: Option<f64>,
    ) -> Result<ObjectId> {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(ObjectState {
            id,
            kind,
            pose: Pose { position, orientation },
            scale: scale.unwrap_or(1.0),
        });
        trace!(?id, %kind, "spawned");
        Ok(id)
    }

    fn generate_shapes(
        &mut self,
        kind: ObjectKind,
        count: usize,
        random_orientation: bool,
    ) -> Result<Vec<ObjectId>> {
        let (hx, hy) = kind.half_extents();
        let padding = 2.0 * hx.max(hy) * self.unit;
        let (x, y) = self
            .bounds(padding, None)
            .ok_or_else(|| RLError::sampling_exhausted(format!("{kind} placement (workspace too small)"), 0))?;

        let margin = self.unit / 4.0;
        let mut occupied: Vec<Footprint> = self
            .objects
            .iter()
            .map(|o| Footprint::of_object(o, self.unit).inflated(margin))
            .collect();

        let mut poses = Vec::with_capacity(count);
        for _ in 0..count {
            let found = (0..SAMPLE_ATTEMPTS).find_map(|_| {
                let center = self.draw(x, y);
                let yaw = if random_orientation { self.rng.gen_range(0.0..PI) } else { 0.0 };
                let footprint = Footprint::of_kind(kind, center, yaw, self.unit, 1.0);
                (!occupied.iter().any(|o| o.overlaps(&footprint))).then_some((footprint, yaw))
            });
            let Some((footprint, yaw)) = found else {
                return Err(RLError::sampling_exhausted(format!("{kind} placement"), SAMPLE_ATTEMPTS));
            };
            occupied.push(footprint.inflated(margin));
            poses.push(Pose::from_yaw(
                Point3::new(footprint.center.x, footprint.center.y, self.unit / 2.0),
                yaw,
            ));
        }

        poses
            .into_iter()
            .map(|pose| self.spawn_object(kind, pose.position, pose.orientation, None))
            .collect()
    }

    fn objects(&self) -> Vec<ObjectState> {
        self.objects.clone()
    }

    fn wait(&mut self, steps: usize) {
        self.steps += steps;
        trace!(steps, total = self.steps, "wait");
    }

    fn take_action(&mut self, action: &PrimitiveAction) -> Result<()> {
        match action.primitive {
            Primitive::Pick => self.pick(action),
            Primitive::Place => self.place(action),
        }
        Ok(())
    }

    fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    fn is_sim_valid(&self) -> bool {
        let margin = self.unit * 2.0;
        self.objects
            .iter()
            .filter(|o| Some(o.id) != self.held)
            .all(|o| self.workspace.contains_xy(&o.xy(), margin) && o.pose.position.z > -self.unit)
    }
}
