// src/rig.rs - Frames handed to the rig binding
use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::Serialize;

use crate::joint::Joint;
use crate::tracker::SkeletonFrame;

/// Smoothed positions for one published tick, keyed by (rig slot, joint).
///
/// Rig slots are tracker slots plus the configured body offset. Positions
/// stay in the tracker's y-up frame; [`RigFrame::targets`] gives the z-up view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigFrame {
    pub sequence: u64,
    pub insert_keyframes: bool,
    pub positions: BTreeMap<(usize, Joint), Vector3<f64>>,
}

/// One scene target to move, addressed by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigTarget {
    pub name: String,
    pub slot: usize,
    pub joint: &'static str,
    /// z-up location.
    pub location: [f64; 3],
}

impl RigFrame {
    pub fn from_skeletons(
        frame: &SkeletonFrame,
        body_offset: usize,
        insert_keyframes: bool,
        sequence: u64,
    ) -> Self {
        let positions = frame
            .iter()
            .map(|((slot, joint), position)| ((slot + body_offset, joint), position))
            .collect();
        Self {
            sequence,
            insert_keyframes,
            positions,
        }
    }

    pub fn position(&self, slot: usize, joint: Joint) -> Option<Vector3<f64>> {
        self.positions.get(&(slot, joint)).copied()
    }

    /// Distinct rig slots present, ascending.
    pub fn slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self.positions.keys().map(|(slot, _)| *slot).collect();
        slots.dedup();
        slots
    }

    pub fn targets(&self) -> Vec<RigTarget> {
        self.positions
            .iter()
            .map(|(&(slot, joint), position)| RigTarget {
                name: target_name(joint, slot),
                slot,
                joint: joint.name(),
                location: to_z_up(position),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Scene object name for a joint of a rig slot, e.g. `SpineBase0`.
pub fn target_name(joint: Joint, slot: usize) -> String {
    format!("{}{}", joint.name(), slot)
}

/// Sensor/tracker space is y-up; the authoring tool is z-up.
pub fn to_z_up(position: &Vector3<f64>) -> [f64; 3] {
    [position.x, position.z, position.y]
}

/// Receives one frame per successful tick.
pub trait SkeletonConsumer {
    fn publish(&mut self, frame: &RigFrame);
}

impl<F: FnMut(&RigFrame)> SkeletonConsumer for F {
    fn publish(&mut self, frame: &RigFrame) {
        self(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterParams;
    use crate::sensor::{Body, SensorFrame};
    use crate::tracker::BodyTracker;

    fn skeletons() -> SkeletonFrame {
        let mut tracker = BodyTracker::new();
        let bodies = [
            Body::tracked(4).with_joint(Joint::Head, Vector3::new(0.1, 1.7, 2.5)),
            Body::tracked(1).with_joint(Joint::SpineBase, Vector3::new(-0.3, 0.9, 3.0)),
        ];
        tracker.ingest(&SensorFrame::new(&bodies), &FilterParams::default())
    }

    #[test]
    fn test_body_offset_shifts_slots() {
        let frame = RigFrame::from_skeletons(&skeletons(), 2, true, 7);
        assert_eq!(frame.slots(), vec![2, 3]);
        assert_eq!(
            frame.position(2, Joint::Head),
            Some(Vector3::new(0.1, 1.7, 2.5))
        );
        assert_eq!(frame.position(0, Joint::Head), None);
        assert!(frame.insert_keyframes);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_targets_are_named_and_z_up() {
        let frame = RigFrame::from_skeletons(&skeletons(), 0, false, 0);
        let targets = frame.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].name, "Head0");
        assert_eq!(targets[0].location, [0.1, 2.5, 1.7]);
        assert_eq!(targets[1].name, "SpineBase1");
        assert_eq!(targets[1].joint, "SpineBase");
    }

    #[test]
    fn test_closure_consumer() {
        let mut seen = Vec::new();
        {
            let mut consumer = |frame: &RigFrame| seen.push(frame.sequence);
            consumer.publish(&RigFrame {
                sequence: 3,
                ..Default::default()
            });
        }
        assert_eq!(seen, vec![3]);
    }
}
