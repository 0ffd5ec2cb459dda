// src/tracker.rs - Body acquisition/loss and per-body joint filtering
use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::filter::{FilterParams, JointFilter};
use crate::joint::Joint;
use crate::sensor::{Body, BodyId, FloorAlignment, RawObservation, SensorFrame};

/// What happens to later slots when a body is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Later bodies shift down one slot, keeping slots contiguous.
    #[default]
    Compact,
    /// The lost body's slot stays vacant until the next acquisition fills it.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Acquired { body_id: BodyId, slot: usize },
    Lost { body_id: BodyId, slot: usize },
}

/// Tracked body ids in acquisition order; a body's position is its slot.
#[derive(Debug, Clone, Default)]
pub struct ActiveBodySlots {
    slots: Vec<Option<BodyId>>,
}

impl ActiveBodySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot_of(&self, id: BodyId) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(id))
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.slot_of(id).is_some()
    }

    /// Assigns `id` a slot and returns it. Already-active ids keep theirs.
    pub fn acquire(&mut self, id: BodyId, policy: SlotPolicy) -> usize {
        if let Some(slot) = self.slot_of(id) {
            return slot;
        }
        if policy == SlotPolicy::Hold {
            if let Some(slot) = self.slots.iter().position(Option::is_none) {
                self.slots[slot] = Some(id);
                return slot;
            }
        }
        self.slots.push(Some(id));
        self.slots.len() - 1
    }

    /// Drops `id`, returning the slot it held.
    pub fn release(&mut self, id: BodyId, policy: SlotPolicy) -> Option<usize> {
        let slot = self.slot_of(id)?;
        match policy {
            SlotPolicy::Compact => {
                self.slots.remove(slot);
            }
            SlotPolicy::Hold => {
                self.slots[slot] = None;
                while matches!(self.slots.last(), Some(None)) {
                    self.slots.pop();
                }
            }
        }
        Some(slot)
    }

    /// Closes vacant slots left behind by [`SlotPolicy::Hold`].
    pub fn compact(&mut self) {
        self.slots.retain(Option::is_some);
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, BodyId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| id.map(|id| (slot, id)))
    }

    pub fn ids(&self) -> Vec<BodyId> {
        self.iter().map(|(_, id)| id).collect()
    }

    /// Number of tracked bodies.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Smoothed joints of one tracked body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySkeleton {
    pub slot: usize,
    pub body_id: BodyId,
    /// `None` for joints not observed since the body was acquired.
    pub joints: [Option<Vector3<f64>>; Joint::COUNT],
}

impl BodySkeleton {
    pub fn position(&self, joint: Joint) -> Option<Vector3<f64>> {
        self.joints[joint.index()]
    }
}

/// Output of one `ingest`: smoothed positions keyed by (slot, joint).
///
/// Slots without an entry received no update this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonFrame {
    pub skeletons: Vec<BodySkeleton>,
    pub events: Vec<TrackingEvent>,
}

impl SkeletonFrame {
    pub fn position(&self, slot: usize, joint: Joint) -> Option<Vector3<f64>> {
        self.skeleton(slot).and_then(|s| s.position(joint))
    }

    pub fn skeleton(&self, slot: usize) -> Option<&BodySkeleton> {
        self.skeletons.iter().find(|s| s.slot == slot)
    }

    pub fn slot_of(&self, body_id: BodyId) -> Option<usize> {
        self.skeletons
            .iter()
            .find(|s| s.body_id == body_id)
            .map(|s| s.slot)
    }

    /// Entries in slot order, then catalog order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, Joint), Vector3<f64>)> + '_ {
        self.skeletons.iter().flat_map(|skeleton| {
            Joint::ALL.iter().filter_map(move |&joint| {
                skeleton
                    .position(joint)
                    .map(|position| ((skeleton.slot, joint), position))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.skeletons.iter().all(|s| s.joints.iter().all(Option::is_none))
    }
}

/// One filter per joint of one body. A joint's filter is empty until its
/// first tracked observation after (re-)acquisition.
struct FilterBank {
    filters: [Option<JointFilter>; Joint::COUNT],
}

impl FilterBank {
    fn new() -> Self {
        Self {
            filters: std::array::from_fn(|_| None),
        }
    }

    fn reset(&mut self) {
        self.filters.iter_mut().for_each(|filter| *filter = None);
    }

    fn step(&mut self, body: &Body, alignment: Option<&FloorAlignment>, params: &FilterParams) {
        for joint in Joint::ALL {
            let observation = observe(body.observation(joint), alignment);
            let slot = &mut self.filters[joint.index()];
            if let Some(filter) = slot.as_mut() {
                filter.step(&observation, params);
            } else if observation.tracked {
                // seeded directly, no predict on the first observation
                *slot = Some(JointFilter::new(observation.position, params.initial_uncertainty));
            }
        }
    }

    fn positions(&self) -> [Option<Vector3<f64>>; Joint::COUNT] {
        std::array::from_fn(|i| self.filters[i].as_ref().map(JointFilter::position))
    }
}

fn observe(observation: &RawObservation, alignment: Option<&FloorAlignment>) -> RawObservation {
    match alignment {
        Some(alignment) => RawObservation {
            position: alignment.apply(&observation.position),
            tracked: observation.tracked,
        },
        None => *observation,
    }
}

/// Keeps slot assignments and filter state for every body across frames.
pub struct BodyTracker {
    slots: ActiveBodySlots,
    banks: HashMap<BodyId, FilterBank>,
    policy: SlotPolicy,
    align_to_floor: bool,
    /// Last usable floor basis, reused while the sensor reports none.
    floor: Option<FloorAlignment>,
}

impl BodyTracker {
    pub fn new() -> Self {
        Self {
            slots: ActiveBodySlots::new(),
            banks: HashMap::new(),
            policy: SlotPolicy::default(),
            align_to_floor: true,
            floor: None,
        }
    }

    pub fn with_policy(mut self, policy: SlotPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: SlotPolicy) {
        self.policy = policy;
    }

    pub fn set_align_to_floor(&mut self, align_to_floor: bool) {
        self.align_to_floor = align_to_floor;
    }

    pub fn active_slots(&self) -> &ActiveBodySlots {
        &self.slots
    }

    /// Forgets every body, filter and floor plane.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.banks.clear();
        self.floor = None;
    }

    /// Consumes one raw frame and returns the smoothed skeletons.
    ///
    /// Acquisition and loss are applied in frame order before any filtering;
    /// active bodies missing from the frame count as lost. Events carry the
    /// slot a body holds in the returned frame, or for a loss the slot it
    /// held before this frame. Filters then run for each active body in slot
    /// order, joints in catalog order.
    ///
    /// Frames without a usable floor plane are aligned with the last usable
    /// one seen since [`reset`](Self::reset), if any.
    pub fn ingest(&mut self, frame: &SensorFrame<'_>, params: &FilterParams) -> SkeletonFrame {
        let policy = self.policy;
        if policy == SlotPolicy::Compact {
            self.slots.compact();
        }

        // (body, slot before this frame); `None` marks an acquisition
        let mut changes: Vec<(BodyId, Option<usize>)> = Vec::new();

        for body in frame.bodies {
            if body.tracked && !self.slots.contains(body.id) {
                self.slots.acquire(body.id, policy);
                self.banks.entry(body.id).or_insert_with(FilterBank::new).reset();
                changes.push((body.id, None));
            } else if !body.tracked {
                if let Some(slot) = self.slots.slot_of(body.id) {
                    changes.push((body.id, Some(slot)));
                }
            }
        }

        let missing: Vec<BodyId> = self
            .slots
            .iter()
            .map(|(_, id)| id)
            .filter(|id| !frame.bodies.iter().any(|body| body.id == *id))
            .collect();
        for id in missing {
            if let Some(slot) = self.slots.slot_of(id) {
                debug!(body_id = id, "body missing from frame, treating as lost");
                changes.push((id, Some(slot)));
            }
        }

        // pre-frame slots are all recorded before any release shifts them
        for (id, before) in &changes {
            if before.is_some() {
                self.slots.release(*id, policy);
            }
        }

        let mut events = Vec::with_capacity(changes.len());
        for (body_id, before) in changes {
            match before {
                Some(slot) => {
                    info!(body_id, slot, "body lost");
                    events.push(TrackingEvent::Lost { body_id, slot });
                }
                None => {
                    if let Some(slot) = self.slots.slot_of(body_id) {
                        info!(body_id, slot, "body acquired");
                        events.push(TrackingEvent::Acquired { body_id, slot });
                    }
                }
            }
        }

        if let Some(alignment) = frame.floor_plane.and_then(|plane| plane.alignment()) {
            self.floor = Some(alignment);
        }
        let alignment = if self.align_to_floor { self.floor } else { None };

        let mut skeletons = Vec::with_capacity(self.slots.len());
        for (slot, id) in self.slots.iter() {
            let Some(body) = frame.bodies.iter().find(|body| body.id == id) else {
                continue;
            };
            let bank = self.banks.entry(id).or_insert_with(FilterBank::new);
            bank.step(body, alignment.as_ref(), params);
            skeletons.push(BodySkeleton {
                slot,
                body_id: id,
                joints: bank.positions(),
            });
        }

        debug!(bodies = skeletons.len(), events = events.len(), "frame ingested");

        SkeletonFrame { skeletons, events }
    }
}

impl Default for BodyTracker {
    fn default() -> Self {
        Self::new()
    }
}
