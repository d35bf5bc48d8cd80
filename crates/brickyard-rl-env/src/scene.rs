//! Contract with the physics side of an environment
//!
//! Rigid-body simulation, robot control and rendering live outside this
//! crate. Everything the goal generator and the task environments need
//! from them goes through the [`Scene`] trait: sampling free positions,
//! spawning objects, querying live poses and executing gripper primitives.

use std::f64::consts::PI;
use std::fmt;

use nalgebra::{Point2, Point3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use brickyard_rl_core::{Action, ActionSpace, Bounds, ContinuousAction, RLError, Result};

/// Semantic type of a physical object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Unit cube
    Cube,
    /// Long block, 3.2 units along its local y axis
    Brick,
    /// Triangular prism the size of a cube
    Triangle,
    /// Long triangular prism, as long as a brick
    Roof,
    /// Unit cylinder
    Cylinder,
}

impl ObjectKind {
    /// Half extents of the footprint in the object's own frame, in units
    #[must_use]
    pub fn half_extents(self) -> (f64, f64) {
        match self {
            Self::Cube | Self::Triangle | Self::Cylinder => (0.5, 0.5),
            Self::Brick | Self::Roof => (0.5, 1.6),
        }
    }

    /// Whether the top face is flat enough to carry another level
    #[must_use]
    pub fn has_flat_top(self) -> bool {
        matches!(self, Self::Cube | Self::Brick | Self::Cylinder)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cube => "cube",
            Self::Brick => "brick",
            Self::Triangle => "triangle",
            Self::Roof => "roof",
            Self::Cylinder => "cylinder",
        };
        f.write_str(name)
    }
}

/// Opaque handle of a spawned object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

/// Position and orientation of an object's center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Center position
    pub position: Point3<f64>,
    /// Orientation
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Pose with the given yaw and no roll or pitch
    #[must_use]
    pub fn from_yaw(position: Point3<f64>, yaw: f64) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        }
    }

    /// Rotation about the vertical axis
    #[must_use]
    pub fn yaw(&self) -> f64 {
        self.orientation.euler_angles().2
    }

    /// Horizontal position
    #[must_use]
    pub fn xy(&self) -> Point2<f64> {
        Point2::new(self.position.x, self.position.y)
    }
}

/// Live state of one object, as reported by the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectState {
    /// Handle
    pub id: ObjectId,
    /// Semantic type
    pub kind: ObjectKind,
    /// Current pose
    pub pose: Pose,
    /// Uniform scale relative to the unit size
    pub scale: f64,
}

impl ObjectState {
    /// Current center position
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.pose.position
    }

    /// Current horizontal position
    #[must_use]
    pub fn xy(&self) -> Point2<f64> {
        self.pose.xy()
    }

    /// Current yaw
    #[must_use]
    pub fn yaw(&self) -> f64 {
        self.pose.yaw()
    }
}

/// Axis-aligned workspace bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// x range
    pub x: [f64; 2],
    /// y range
    pub y: [f64; 2],
    /// z range reachable by the gripper
    pub z: [f64; 2],
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            x: [0.2, 0.8],
            y: [-0.3, 0.3],
            z: [0.01, 0.5],
        }
    }
}

impl Workspace {
    /// Center of the table surface
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.x[0] + self.x[1]) / 2.0,
            (self.y[0] + self.y[1]) / 2.0,
        )
    }

    /// Whether a horizontal point lies inside the bounds grown by `margin`
    #[must_use]
    pub fn contains_xy(&self, point: &Point2<f64>, margin: f64) -> bool {
        point.x >= self.x[0] - margin
            && point.x <= self.x[1] + margin
            && point.y >= self.y[0] - margin
            && point.y <= self.y[1] + margin
    }
}

/// Rectangle that restricts where a sampler may look
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRegion {
    /// x range
    pub x: [f64; 2],
    /// y range
    pub y: [f64; 2],
}

impl SampleRegion {
    /// Rectangle of half widths `hx`, `hy` around a point
    #[must_use]
    pub fn around(center: Point2<f64>, hx: f64, hy: f64) -> Self {
        Self {
            x: [center.x - hx, center.x + hx],
            y: [center.y - hy, center.y + hy],
        }
    }
}

/// Gripper primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// Close the gripper on whatever is at the target
    Pick,
    /// Release the held object at the target
    Place,
}

/// One pick or place at a target pose, `pxyzr` layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveAction {
    /// Primitive to execute
    pub primitive: Primitive,
    /// Target x
    pub x: f64,
    /// Target y
    pub y: f64,
    /// Target z
    pub z: f64,
    /// Target yaw of the gripper
    pub rot: f64,
}

impl PrimitiveAction {
    /// Pick at a point
    #[must_use]
    pub fn pick(x: f64, y: f64, z: f64, rot: f64) -> Self {
        Self {
            primitive: Primitive::Pick,
            x,
            y,
            z,
            rot,
        }
    }

    /// Place at a point
    #[must_use]
    pub fn place(x: f64, y: f64, z: f64, rot: f64) -> Self {
        Self {
            primitive: Primitive::Place,
            x,
            y,
            z,
            rot,
        }
    }

    /// Horizontal target
    #[must_use]
    pub fn xy(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

impl Action for PrimitiveAction {
    fn encode(&self) -> Vec<f64> {
        let p = match self.primitive {
            Primitive::Pick => 0.0,
            Primitive::Place => 1.0,
        };
        vec![p, self.x, self.y, self.z, self.rot]
    }
}

impl TryFrom<&ContinuousAction> for PrimitiveAction {
    type Error = RLError;

    fn try_from(action: &ContinuousAction) -> Result<Self> {
        match action.0.as_slice() {
            &[p, x, y, z, rot] => {
                let primitive = if p < 0.5 { Primitive::Pick } else { Primitive::Place };
                Ok(Self {
                    primitive,
                    x,
                    y,
                    z,
                    rot,
                })
            }
            other => Err(RLError::DimensionMismatch {
                expected: 5,
                actual: other.len(),
            }),
        }
    }
}

/// Pick/place targets inside the workspace
#[derive(Debug, Clone)]
pub struct PrimitiveActionSpace {
    bounds: Bounds,
}

impl PrimitiveActionSpace {
    /// Space covering the whole workspace with any yaw
    #[must_use]
    pub fn new(workspace: &Workspace) -> Self {
        Self {
            bounds: Bounds {
                low: vec![0.0, workspace.x[0], workspace.y[0], workspace.z[0], -PI],
                high: vec![1.0, workspace.x[1], workspace.y[1], workspace.z[1], PI],
            },
        }
    }
}

impl ActionSpace for PrimitiveActionSpace {
    type Action = PrimitiveAction;

    fn sample(&self) -> Self::Action {
        let raw = ContinuousAction(self.bounds.sample_with(&mut rand::thread_rng()));
        // Bounds always have five dimensions
        PrimitiveAction::try_from(&raw).unwrap_or_else(|_| PrimitiveAction::pick(0.0, 0.0, 0.0, 0.0))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        self.bounds.contains(&action.encode())
    }

    fn dim(&self) -> Option<usize> {
        Some(self.bounds.dim())
    }
}

/// Physics and robot collaborator consumed by the goal generator and tasks.
///
/// Every call is a blocking query or mutation of engine state. Sampling and
/// spawning calls that can run out of room report
/// [`RLError::SamplingExhausted`] so the caller can retry.
pub trait Scene: Send + Sync {
    /// Remove every object and return the robot to its home pose
    fn reset(&mut self) -> Result<()>;

    /// Draw `count` horizontal positions that keep `padding` from the
    /// workspace border and `min_distance` from `existing` and from each
    /// other, optionally restricted to `region`.
    fn sample_valid_positions(
        &mut self,
        padding: f64,
        min_distance: f64,
        existing: &[Point2<f64>],
        count: usize,
        region: Option<&SampleRegion>,
    ) -> Result<Vec<Point2<f64>>>;

    /// Instantiate an object at an exact pose
    fn spawn_object(
        &mut self,
        kind: ObjectKind,
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        scale: Option<f64>,
    ) -> Result<ObjectId>;

    /// Scatter `count` objects of one kind on free table space.
    ///
    /// Either all of them are spawned or none is.
    fn generate_shapes(
        &mut self,
        kind: ObjectKind,
        count: usize,
        random_orientation: bool,
    ) -> Result<Vec<ObjectId>>;

    /// Live state of every object in the scene
    fn objects(&self) -> Vec<ObjectState>;

    /// Live state of one object
    fn object(&self, id: ObjectId) -> Option<ObjectState> {
        self.objects().into_iter().find(|o| o.id == id)
    }

    /// Advance the simulation
    fn wait(&mut self, steps: usize);

    /// Execute a gripper primitive
    fn take_action(&mut self, action: &PrimitiveAction) -> Result<()>;

    /// Whether the gripper currently holds an object
    fn is_holding(&self) -> bool;

    /// Whether the simulation is still in a usable state
    fn is_sim_valid(&self) -> bool;
}

impl<S: Scene + ?Sized> Scene for Box<S> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn sample_valid_positions(
        &mut self,
        padding: f64,
        min_distance: f64,
        existing: &[Point2<f64>],
        count: usize,
        region: Option<&SampleRegion>,
    ) -> Result<Vec<Point2<f64>>> {
        (**self).sample_valid_positions(padding, min_distance, existing, count, region)
    }

    fn spawn_object(
        &mut self,
        kind: ObjectKind,
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        scale: Option<f64>,
    ) -> Result<ObjectId> {
        (**self).spawn_object(kind, position, orientation, scale)
    }

    fn generate_shapes(
        &mut self,
        kind: ObjectKind,
        count: usize,
        random_orientation: bool,
    ) -> Result<Vec<ObjectId>> {
        (**self).generate_shapes(kind, count, random_orientation)
    }

    fn objects(&self) -> Vec<ObjectState> {
        (**self).objects()
    }

    fn object(&self, id: ObjectId) -> Option<ObjectState> {
        (**self).object(id)
    }

    fn wait(&mut self, steps: usize) {
        (**self).wait(steps);
    }

    fn take_action(&mut self, action: &PrimitiveAction) -> Result<()> {
        (**self).take_action(action)
    }

    fn is_holding(&self) -> bool {
        (**self).is_holding()
    }

    fn is_sim_valid(&self) -> bool {
        (**self).is_sim_valid()
    }
}
