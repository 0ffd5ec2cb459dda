// src/joint.rs
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// The 25 landmarks a depth sensor reports per body, in sensor output order.
///
/// The discriminant is the joint's position in every per-body array, both in
/// raw sensor frames and in smoothed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum Joint {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

static BY_NAME: Lazy<HashMap<&'static str, Joint>> =
    Lazy::new(|| Joint::ALL.iter().map(|&joint| (joint.name(), joint)).collect());

impl Joint {
    pub const COUNT: usize = 25;

    /// Catalog order. Filters and output are always walked in this order.
    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::SpineBase,
        Joint::SpineMid,
        Joint::Neck,
        Joint::Head,
        Joint::ShoulderLeft,
        Joint::ElbowLeft,
        Joint::WristLeft,
        Joint::HandLeft,
        Joint::ShoulderRight,
        Joint::ElbowRight,
        Joint::WristRight,
        Joint::HandRight,
        Joint::HipLeft,
        Joint::KneeLeft,
        Joint::AnkleLeft,
        Joint::FootLeft,
        Joint::HipRight,
        Joint::KneeRight,
        Joint::AnkleRight,
        Joint::FootRight,
        Joint::SpineShoulder,
        Joint::HandTipLeft,
        Joint::ThumbLeft,
        Joint::HandTipRight,
        Joint::ThumbRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name used by rig consumers to address scene targets.
    pub fn name(self) -> &'static str {
        match self {
            Joint::SpineBase => "SpineBase",
            Joint::SpineMid => "SpineMid",
            Joint::Neck => "Neck",
            Joint::Head => "Head",
            Joint::ShoulderLeft => "ShoulderLeft",
            Joint::ElbowLeft => "ElbowLeft",
            Joint::WristLeft => "WristLeft",
            Joint::HandLeft => "HandLeft",
            Joint::ShoulderRight => "ShoulderRight",
            Joint::ElbowRight => "ElbowRight",
            Joint::WristRight => "WristRight",
            Joint::HandRight => "HandRight",
            Joint::HipLeft => "HipLeft",
            Joint::KneeLeft => "KneeLeft",
            Joint::AnkleLeft => "AnkleLeft",
            Joint::FootLeft => "FootLeft",
            Joint::HipRight => "HipRight",
            Joint::KneeRight => "KneeRight",
            Joint::AnkleRight => "AnkleRight",
            Joint::FootRight => "FootRight",
            Joint::SpineShoulder => "SpineShoulder",
            Joint::HandTipLeft => "HandTipLeft",
            Joint::ThumbLeft => "ThumbLeft",
            Joint::HandTipRight => "HandTipRight",
            Joint::ThumbRight => "ThumbRight",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
