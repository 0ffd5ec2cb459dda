// src/lib.rs
pub mod config;
pub mod error;
pub mod filter;
pub mod joint;
pub mod rig;
pub mod sensor;
pub mod tracker;
pub mod tracking_loop;

pub use config::{ConfigHandle, TrackerConfig};
pub use error::{ConfigError, SessionError, TransientPollError};
pub use filter::{FilterParams, JointFilter};
pub use joint::Joint;
pub use rig::{RigFrame, RigTarget, SkeletonConsumer};
pub use sensor::{Body, BodyId, FloorPlane, RawObservation, SensorSession, SensorStatus};
pub use tracker::{ActiveBodySlots, BodyTracker, SkeletonFrame, SlotPolicy, TrackingEvent};
pub use tracking_loop::{run, stop_signal, LoopState, LoopStats, StopHandle, TrackingLoop};
