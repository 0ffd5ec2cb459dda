// src/sensor/scripted.rs - Sensor double that replays a fixed script of polls
use std::collections::VecDeque;

use super::{Body, FloorPlane, SensorSession, SensorStatus};

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Frame {
        bodies: Vec<Body>,
        floor_plane: Option<FloorPlane>,
    },
    Fail(SensorStatus),
}

/// Answers each `poll` with the next scripted step. An exhausted script
/// reports [`SensorStatus::PENDING`], like a sensor with no new frame.
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    script: VecDeque<ScriptStep>,
    bodies: Vec<Body>,
    floor_plane: Option<FloorPlane>,
    is_open: bool,
    open_failure: Option<SensorStatus>,
    close_failure: Option<SensorStatus>,
    pub opens: usize,
    pub closes: usize,
    pub polls: usize,
    pub last_noise: Option<(f64, f64)>,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, bodies: Vec<Body>) -> Self {
        self.script.push_back(ScriptStep::Frame {
            bodies,
            floor_plane: None,
        });
        self
    }

    pub fn frame_with_floor(mut self, bodies: Vec<Body>, floor_plane: FloorPlane) -> Self {
        self.script.push_back(ScriptStep::Frame {
            bodies,
            floor_plane: Some(floor_plane),
        });
        self
    }

    pub fn fail(mut self, status: SensorStatus) -> Self {
        self.script.push_back(ScriptStep::Fail(status));
        self
    }

    pub fn failing_open(mut self, status: SensorStatus) -> Self {
        self.open_failure = Some(status);
        self
    }

    pub fn failing_close(mut self, status: SensorStatus) -> Self {
        self.close_failure = Some(status);
        self
    }

    pub fn push(&mut self, step: ScriptStep) {
        self.script.push_back(step);
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SensorSession for ScriptedSensor {
    fn open(&mut self) -> Result<(), SensorStatus> {
        self.opens += 1;
        if self.is_open {
            return Err(SensorStatus::FAIL);
        }
        if let Some(status) = self.open_failure {
            return Err(status);
        }
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SensorStatus> {
        self.closes += 1;
        if !self.is_open {
            return Err(SensorStatus::FAIL);
        }
        self.is_open = false;
        self.bodies.clear();
        self.floor_plane = None;
        match self.close_failure {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn poll(&mut self, process_noise: f64, observation_noise: f64) -> Result<(), SensorStatus> {
        self.polls += 1;
        self.last_noise = Some((process_noise, observation_noise));
        if !self.is_open {
            return Err(SensorStatus::FAIL);
        }

        match self.script.pop_front() {
            Some(ScriptStep::Frame {
                bodies,
                floor_plane,
            }) => {
                self.bodies = bodies;
                self.floor_plane = floor_plane;
                Ok(())
            }
            Some(ScriptStep::Fail(status)) => Err(status),
            None => Err(SensorStatus::PENDING),
        }
    }

    fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn floor_plane(&self) -> Option<FloorPlane> {
        self.floor_plane
    }
}
