use core::cell::Cell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    channel::Channel,
    signal::Signal,
};

use crate::{
    feedback::FeedbackQueue,
    gesture::types::{CancelReason, SensorSample, SessionPhase},
};

pub const SAMPLE_QUEUE_DEPTH: usize = 32;

/// Everything a running session shares with the outside world. Sensor
/// callbacks only ever write samples; the session future is the only reader.
pub struct SessionChannels {
    samples: Channel<CriticalSectionRawMutex, SensorSample, SAMPLE_QUEUE_DEPTH>,
    cancel: Signal<CriticalSectionRawMutex, CancelReason>,
    feedback: FeedbackQueue,
    phase: Mutex<CriticalSectionRawMutex, Cell<SessionPhase>>,
}

impl Default for SessionChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionChannels {
    pub const fn new() -> Self {
        Self {
            samples: Channel::new(),
            cancel: Signal::new(),
            feedback: FeedbackQueue::new(),
            phase: Mutex::new(Cell::new(SessionPhase::AwaitingBaseline)),
        }
    }

    pub fn handle(&self) -> SessionHandle<'_> {
        SessionHandle { channels: self }
    }

    pub fn feedback(&self) -> &FeedbackQueue {
        &self.feedback
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.lock(Cell::get)
    }

    pub(crate) fn publish_phase(&self, phase: SessionPhase) {
        self.phase.lock(|cell| cell.set(phase));
    }

    pub(crate) fn take_cancel(&self) -> Option<CancelReason> {
        self.cancel.try_take()
    }

    pub(crate) async fn receive_sample(&self) -> SensorSample {
        self.samples.receive().await
    }

    /// Samples or cancellations left over from a previous session are
    /// dropped. Samples pushed after `start_session` returns are kept.
    pub(crate) fn reset(&self) {
        while self.samples.try_receive().is_ok() {}
        self.cancel.reset();
        self.feedback.reset();
        self.publish_phase(SessionPhase::AwaitingBaseline);
    }
}

#[derive(Clone, Copy)]
pub struct SessionHandle<'a> {
    channels: &'a SessionChannels,
}

impl SessionHandle<'_> {
    /// Non-blocking; returns false when the queue is full and the sample
    /// was dropped.
    pub fn push_sample(&self, sample: SensorSample) -> bool {
        self.channels.samples.try_send(sample).is_ok()
    }

    pub async fn send_sample(&self, sample: SensorSample) {
        self.channels.samples.send(sample).await;
    }

    pub fn cancel(&self, reason: CancelReason) {
        self.channels.cancel.signal(reason);
    }

    pub fn phase(&self) -> SessionPhase {
        self.channels.phase()
    }
}
