// src/sensor/simulated.rs - Synthetic sensor used when no device is attached
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Body, BodyId, FloorPlane, SensorSession, SensorStatus, MAX_BODIES};
use crate::joint::Joint;

/// Standing pose relative to SpineBase, sensor space (meters, y up, z away from camera).
const REST_POSE: [[f64; 3]; Joint::COUNT] = [
    [0.0, 0.0, 0.0],      // SpineBase
    [0.0, 0.30, 0.0],     // SpineMid
    [0.0, 0.60, 0.0],     // Neck
    [0.0, 0.75, 0.0],     // Head
    [-0.18, 0.55, 0.0],   // ShoulderLeft
    [-0.25, 0.30, 0.0],   // ElbowLeft
    [-0.28, 0.08, 0.0],   // WristLeft
    [-0.29, 0.0, 0.0],    // HandLeft
    [0.18, 0.55, 0.0],    // ShoulderRight
    [0.25, 0.30, 0.0],    // ElbowRight
    [0.28, 0.08, 0.0],    // WristRight
    [0.29, 0.0, 0.0],     // HandRight
    [-0.09, -0.02, 0.0],  // HipLeft
    [-0.10, -0.45, 0.0],  // KneeLeft
    [-0.10, -0.85, 0.0],  // AnkleLeft
    [-0.10, -0.90, -0.08], // FootLeft
    [0.09, -0.02, 0.0],   // HipRight
    [0.10, -0.45, 0.0],   // KneeRight
    [0.10, -0.85, 0.0],   // AnkleRight
    [0.10, -0.90, -0.08], // FootRight
    [0.0, 0.55, 0.0],     // SpineShoulder
    [-0.30, -0.08, 0.0],  // HandTipLeft
    [-0.26, 0.0, -0.03],  // ThumbLeft
    [0.30, -0.08, 0.0],   // HandTipRight
    [0.26, 0.0, -0.03],   // ThumbRight
];

/// Sensor ids handed out to simulated people, deliberately sparse.
const BODY_IDS: [BodyId; MAX_BODIES] = [2, 5, 0, 3, 1, 4];

/// Produces people swaying in front of a slightly tilted camera, with
/// per-joint jitter, occasional dropped frames, and all but the first person
/// periodically walking out of view.
pub struct SimulatedSensor {
    people: usize,
    frame_interval: f64,
    jitter: f64,
    drop_every: Option<u64>,
    rng: StdRng,
    sim_time: f64,
    polls: u64,
    is_open: bool,
    bodies: Vec<Body>,
}

impl SimulatedSensor {
    pub fn new(people: usize) -> Self {
        Self {
            people: people.min(MAX_BODIES),
            frame_interval: 1.0 / 30.0,
            jitter: 0.01,
            drop_every: Some(45),
            rng: StdRng::seed_from_u64(0x5eed),
            sim_time: 0.0,
            polls: 0,
            is_open: false,
            bodies: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    /// Fail every n-th poll; `None` never drops.
    pub fn with_drop_every(mut self, drop_every: Option<u64>) -> Self {
        self.drop_every = drop_every.filter(|&n| n > 0);
        self
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    fn is_present(&self, person: usize) -> bool {
        if person == 0 {
            return true;
        }
        // 10 s cycle, in view for the first 7 s, staggered per person
        let phase = (self.sim_time / 10.0 + person as f64 * 0.37).fract();
        phase < 0.7
    }

    fn generate_bodies(&mut self) {
        let t = self.sim_time;
        let mut bodies: Vec<Body> = BODY_IDS.iter().map(|&id| Body::untracked(id)).collect();

        for person in 0..self.people {
            if !self.is_present(person) {
                continue;
            }

            let lane = person as f64 - (self.people as f64 - 1.0) / 2.0;
            let root = Vector3::new(
                lane * 0.8 + 0.3 * (t * 0.2 + person as f64).sin(),
                0.1,
                2.5 + 0.4 * (t * 0.15 + person as f64 * 1.3).cos(),
            );
            let swing = 0.15 * (t * 1.5 + person as f64).sin();

            let mut positions = [Vector3::zeros(); Joint::COUNT];
            for joint in Joint::ALL {
                let rest = REST_POSE[joint.index()];
                let mut offset = Vector3::new(rest[0], rest[1], rest[2]);
                match joint {
                    Joint::ElbowLeft | Joint::ElbowRight => offset.z += swing * 0.5,
                    Joint::WristLeft
                    | Joint::HandLeft
                    | Joint::HandTipLeft
                    | Joint::ThumbLeft => offset.z += swing,
                    Joint::WristRight
                    | Joint::HandRight
                    | Joint::HandTipRight
                    | Joint::ThumbRight => offset.z -= swing,
                    _ => {}
                }
                let jitter = self.jitter;
                let noise = if jitter > 0.0 {
                    let rng = &mut self.rng;
                    Vector3::from_fn(|_, _| rng.gen_range(-jitter..=jitter))
                } else {
                    Vector3::zeros()
                };
                positions[joint.index()] = root + offset + noise;
            }

            bodies[person] = Body::from_positions(BODY_IDS[person], positions);
        }

        self.bodies = bodies;
    }
}

impl SensorSession for SimulatedSensor {
    fn open(&mut self) -> Result<(), SensorStatus> {
        if self.is_open {
            return Err(SensorStatus::FAIL);
        }
        self.is_open = true;
        self.sim_time = 0.0;
        self.polls = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SensorStatus> {
        if !self.is_open {
            return Err(SensorStatus::FAIL);
        }
        self.is_open = false;
        self.bodies.clear();
        Ok(())
    }

    fn poll(&mut self, _process_noise: f64, _observation_noise: f64) -> Result<(), SensorStatus> {
        if !self.is_open {
            return Err(SensorStatus::FAIL);
        }

        self.polls += 1;
        self.sim_time += self.frame_interval;

        if let Some(n) = self.drop_every {
            if self.polls % n == 0 {
                return Err(SensorStatus::PENDING);
            }
        }

        self.generate_bodies();
        Ok(())
    }

    fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn floor_plane(&self) -> Option<FloorPlane> {
        let tilt: f64 = 0.12;
        Some(FloorPlane::new(0.0, tilt.cos(), tilt.sin(), 0.9))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_requires_open() {
        let mut sensor = SimulatedSensor::new(1);
        assert_eq!(sensor.poll(1.0, 0.02), Err(SensorStatus::FAIL));
        sensor.open().unwrap();
        assert_eq!(sensor.open(), Err(SensorStatus::FAIL));
        sensor.poll(1.0, 0.02).unwrap();
        sensor.close().unwrap();
        assert!(sensor.bodies().is_empty());
    }

    #[test]
    fn test_reports_every_sensor_slot() {
        let mut sensor = SimulatedSensor::new(2).with_drop_every(None);
        sensor.open().unwrap();
        sensor.poll(1.0, 0.02).unwrap();

        let bodies = sensor.bodies();
        assert_eq!(bodies.len(), MAX_BODIES);
        assert!(bodies[0].tracked);
        assert_eq!(bodies[0].id, BODY_IDS[0]);
        assert!(bodies[0].joints.iter().all(|j| j.tracked));
        assert!(bodies[2..].iter().all(|b| !b.tracked));
    }

    #[test]
    fn test_drops_frames_periodically() {
        let mut sensor = SimulatedSensor::new(1).with_drop_every(Some(3));
        sensor.open().unwrap();
        let results: Vec<_> = (0..6).map(|_| sensor.poll(1.0, 0.02).is_ok()).collect();
        assert_eq!(results, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_secondary_people_leave_and_return() {
        let mut sensor = SimulatedSensor::new(2).with_drop_every(None);
        sensor.open().unwrap();

        let mut seen_present = false;
        let mut seen_absent = false;
        // 12 simulated seconds covers a full presence cycle
        for _ in 0..360 {
            sensor.poll(1.0, 0.02).unwrap();
            if sensor.bodies()[1].tracked {
                seen_present = true;
            } else {
                seen_absent = true;
            }
        }
        assert!(seen_present && seen_absent);
    }
}
