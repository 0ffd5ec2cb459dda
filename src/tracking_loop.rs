// src/tracking_loop.rs - Sensor lifecycle and fixed-cadence tracking ticks
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

use crate::config::TrackerConfig;
use crate::error::{SessionError, TransientPollError};
use crate::rig::{RigFrame, SkeletonConsumer};
use crate::sensor::{SensorFrame, SensorSession};
use crate::tracker::{BodyTracker, TrackingEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames_published: u64,
    pub polls_dropped: u64,
}

/// Owns the sensor session, the body tracker, and the consumer for one
/// connection lifecycle.
///
/// `tick` is meant to be called by a cooperative scheduler: it returns the
/// delay before the next tick, or `None` once the loop is no longer
/// connected and should be unscheduled. Dropping a connected loop
/// disconnects it.
pub struct TrackingLoop<S: SensorSession, C: SkeletonConsumer> {
    session: S,
    consumer: C,
    config: watch::Receiver<TrackerConfig>,
    tracker: BodyTracker,
    state: LoopState,
    session_id: Option<Uuid>,
    span: Span,
    stats: LoopStats,
}

impl<S: SensorSession, C: SkeletonConsumer> TrackingLoop<S, C> {
    pub fn new(session: S, consumer: C, config: watch::Receiver<TrackerConfig>) -> Self {
        Self {
            session,
            consumer,
            config,
            tracker: BodyTracker::new(),
            state: LoopState::Disconnected,
            session_id: None,
            span: Span::none(),
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LoopState::Connected
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn tracker(&self) -> &BodyTracker {
        &self.tracker
    }

    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != LoopState::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }

        self.state = LoopState::Connecting;
        if let Err(status) = self.session.open() {
            self.state = LoopState::Disconnected;
            warn!(%status, "failed to open sensor session");
            return Err(SessionError::Open(status));
        }

        let id = Uuid::new_v4();
        self.span = info_span!("sensor_session", %id);
        self.session_id = Some(id);
        self.stats = LoopStats::default();
        self.tracker.reset();
        self.state = LoopState::Connected;

        let _enter = self.span.enter();
        info!(update_rate = self.config.borrow().update_rate, "sensor session opened");
        Ok(())
    }

    /// Stops ticking, then closes the session.
    ///
    /// Disconnecting an idle loop is a no-op. A failed close is reported but
    /// the loop is stopped either way.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        if self.state == LoopState::Disconnected {
            return Ok(());
        }

        self.state = LoopState::Disconnected;
        self.tracker.reset();

        let span = std::mem::replace(&mut self.span, Span::none());
        let _enter = span.enter();
        self.session_id = None;

        let stats = self.stats;
        match self.session.close() {
            Ok(()) => {
                info!(
                    ticks = stats.ticks,
                    published = stats.frames_published,
                    dropped = stats.polls_dropped,
                    "sensor session closed"
                );
                Ok(())
            }
            Err(status) => {
                warn!(%status, "sensor session did not close cleanly");
                Err(SessionError::Close(status))
            }
        }
    }

    /// Polls one frame, tracks it, and publishes the result.
    pub fn tick(&mut self) -> Option<Duration> {
        if self.state != LoopState::Connected {
            return None;
        }

        let span = self.span.clone();
        let _enter = span.enter();

        let config = self.config.borrow().clone();
        self.stats.ticks += 1;

        match self.session.poll(config.process_noise, config.observation_noise) {
            Ok(()) => {
                self.tracker.set_policy(config.slot_policy);
                self.tracker.set_align_to_floor(config.align_to_floor);

                let frame =
                    SensorFrame::with_floor(self.session.bodies(), self.session.floor_plane());
                let skeletons = self.tracker.ingest(&frame, &config.filter_params());
                let offset = config.body_offset as usize;
                for event in &skeletons.events {
                    match *event {
                        TrackingEvent::Acquired { body_id, slot } => {
                            debug!(body_id, rig_slot = slot + offset, "rig slot filled")
                        }
                        TrackingEvent::Lost { body_id, slot } => {
                            debug!(body_id, rig_slot = slot + offset, "rig slot released")
                        }
                    }
                }

                self.stats.frames_published += 1;
                let rig_frame = RigFrame::from_skeletons(
                    &skeletons,
                    config.body_offset as usize,
                    config.insert_keyframes,
                    self.stats.frames_published,
                );
                self.consumer.publish(&rig_frame);
            }
            Err(status) => {
                self.stats.polls_dropped += 1;
                debug!(error = %TransientPollError(status), "skipping tick");
            }
        }

        Some(config.tick_interval())
    }
}

impl<S: SensorSession, C: SkeletonConsumer> Drop for TrackingLoop<S, C> {
    fn drop(&mut self) {
        if self.state != LoopState::Disconnected {
            if let Err(e) = self.disconnect() {
                warn!(error = %e, "disconnect during teardown failed");
            }
        }
    }
}

/// Cancels a running [`run`] between ticks.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

pub fn stop_signal() -> (StopHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, rx)
}

/// Drives `tracking` on the current task, sleeping the delay each tick asks for.
///
/// Returns when the loop stops being connected or `stop` fires. A stop
/// request never interrupts a tick, it only prevents the next one.
pub async fn run<S, C>(tracking: &mut TrackingLoop<S, C>, mut stop: watch::Receiver<bool>)
where
    S: SensorSession,
    C: SkeletonConsumer,
{
    loop {
        if *stop.borrow() {
            break;
        }
        let Some(delay) = tracking.tick() else {
            break;
        };

        tokio::select! {
            biased;
            changed = stop.changed() => {
                // a dropped StopHandle also ends the run
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
