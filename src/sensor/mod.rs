// src/sensor/mod.rs - Depth sensor capability boundary
//
// The device driver itself is opaque to the core: it can be opened, closed,
// and polled for the latest body frame. Everything else lives above this line.
pub mod scripted;
pub mod simulated;

pub use scripted::{ScriptStep, ScriptedSensor};
pub use simulated::SimulatedSensor;

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

use crate::joint::Joint;

/// Sensor-native body identifier. Sparse and not necessarily stable in order.
pub type BodyId = usize;

/// Maximum number of bodies a sensor reports per frame.
pub const MAX_BODIES: usize = 6;

/// Raw status code returned by a failing sensor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sensor status {0:#010x}")]
pub struct SensorStatus(pub i32);

impl SensorStatus {
    /// Generic failure, also returned for calls in the wrong session state.
    pub const FAIL: SensorStatus = SensorStatus(0x8000_4005_u32 as i32);
    /// No new frame was available at poll time.
    pub const PENDING: SensorStatus = SensorStatus(0x8000_000A_u32 as i32);
}

/// One joint's reported position for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    pub position: Vector3<f64>,
    pub tracked: bool,
}

impl RawObservation {
    pub fn tracked(position: Vector3<f64>) -> Self {
        Self { position, tracked: true }
    }

    pub fn untracked(position: Vector3<f64>) -> Self {
        Self { position, tracked: false }
    }
}

impl Default for RawObservation {
    fn default() -> Self {
        Self::untracked(Vector3::zeros())
    }
}

/// A body as reported in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub tracked: bool,
    pub joints: [RawObservation; Joint::COUNT],
}

impl Body {
    pub fn untracked(id: BodyId) -> Self {
        Self {
            id,
            tracked: false,
            joints: [RawObservation::default(); Joint::COUNT],
        }
    }

    /// A tracked body with every joint untracked; fill joints with [`Body::with_joint`].
    pub fn tracked(id: BodyId) -> Self {
        Self {
            tracked: true,
            ..Self::untracked(id)
        }
    }

    /// A tracked body with every joint tracked at the given positions.
    pub fn from_positions(id: BodyId, positions: [Vector3<f64>; Joint::COUNT]) -> Self {
        Self {
            id,
            tracked: true,
            joints: positions.map(RawObservation::tracked),
        }
    }

    pub fn with_joint(mut self, joint: Joint, position: Vector3<f64>) -> Self {
        self.joints[joint.index()] = RawObservation::tracked(position);
        self
    }

    pub fn observation(&self, joint: Joint) -> &RawObservation {
        &self.joints[joint.index()]
    }
}

/// Floor clip plane `normal · p + height = 0` in sensor space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorPlane {
    pub normal: Vector3<f64>,
    pub height: f64,
}

impl FloorPlane {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self {
            normal: Vector3::new(x, y, z),
            height: w,
        }
    }

    /// Rotation taking sensor space to a floor-aligned space where +y is the
    /// floor normal and y = 0 lies on the floor.
    ///
    /// Returns `None` when the plane cannot define a basis (zero, non-finite, or
    /// normal parallel to the sensor x axis).
    pub fn alignment(&self) -> Option<FloorAlignment> {
        let norm = self.normal.norm();
        if !norm.is_finite() || norm <= f64::EPSILON || !self.height.is_finite() {
            return None;
        }

        let y = self.normal / norm;
        let z = Vector3::new(0.0, y.z, -y.y) * y.z.signum();
        let z_norm = z.norm();
        if z_norm <= f64::EPSILON {
            return None;
        }
        let z = z / z_norm;
        let x = y.cross(&z);

        Some(FloorAlignment {
            rotation: Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]),
            height: self.height / norm,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorAlignment {
    rotation: Matrix3<f64>,
    height: f64,
}

impl FloorAlignment {
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let mut aligned = self.rotation * point;
        aligned.y += self.height;
        aligned
    }
}

/// The bodies and floor plane delivered by one successful poll.
#[derive(Debug, Clone, Copy)]
pub struct SensorFrame<'a> {
    pub bodies: &'a [Body],
    pub floor_plane: Option<FloorPlane>,
}

impl<'a> SensorFrame<'a> {
    pub fn new(bodies: &'a [Body]) -> Self {
        Self {
            bodies,
            floor_plane: None,
        }
    }

    pub fn with_floor(bodies: &'a [Body], floor_plane: Option<FloorPlane>) -> Self {
        Self { bodies, floor_plane }
    }
}

/// Connection to a body-tracking depth sensor.
///
/// `bodies` and `floor_plane` describe the frame fetched by the most recent
/// successful `poll` and are meaningless after a failed one.
pub trait SensorSession {
    fn open(&mut self) -> Result<(), SensorStatus>;

    fn close(&mut self) -> Result<(), SensorStatus>;

    /// Fetches the latest frame. The noise parameters are forwarded for
    /// sensors that smooth on-device; the core filters regardless.
    fn poll(&mut self, process_noise: f64, observation_noise: f64) -> Result<(), SensorStatus>;

    fn bodies(&self) -> &[Body];

    fn floor_plane(&self) -> Option<FloorPlane> {
        None
    }
}

impl<S: SensorSession + ?Sized> SensorSession for Box<S> {
    fn open(&mut self) -> Result<(), SensorStatus> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), SensorStatus> {
        (**self).close()
    }

    fn poll(&mut self, process_noise: f64, observation_noise: f64) -> Result<(), SensorStatus> {
        (**self).poll(process_noise, observation_noise)
    }

    fn bodies(&self) -> &[Body] {
        (**self).bodies()
    }

    fn floor_plane(&self) -> Option<FloorPlane> {
        (**self).floor_plane()
    }
}
