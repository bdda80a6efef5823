use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use log::{debug, warn};

use crate::gesture::{config::GestureConfig, types::FeedbackEvent};

pub const FEEDBACK_QUEUE_DEPTH: usize = 8;
/// Slots baseline pulses never take, so a confirmation tone and vibration
/// always fit.
pub const CONFIRMATION_RESERVE: usize = 2;

const PULSE_TONE_MS: u32 = 120;
const PULSE_VIBRATE_MS: u32 = 80;
const PULSE_GAP_MS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackPattern {
    /// One short pulse per far sample while waiting for the baseline.
    Baseline,
    /// Three pulses once a gesture is confirmed.
    Confirmation,
}

impl FeedbackPattern {
    pub const fn for_event(event: FeedbackEvent) -> Self {
        match event {
            FeedbackEvent::BaselineReached => Self::Baseline,
            FeedbackEvent::GestureConfirmed(_) => Self::Confirmation,
        }
    }

    pub const fn pulses(self) -> u8 {
        match self {
            Self::Baseline => 1,
            Self::Confirmation => 3,
        }
    }

    pub const fn tone_ms(self) -> u32 {
        PULSE_TONE_MS
    }

    pub const fn vibrate_ms(self) -> u32 {
        PULSE_VIBRATE_MS
    }

    pub const fn gap_ms(self) -> u32 {
        PULSE_GAP_MS
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Confirmation => "confirmation",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackCommand {
    Tone(FeedbackPattern),
    Vibrate(FeedbackPattern),
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback device unavailable")]
    Unavailable,
    #[error("feedback playback failed: {0}")]
    Playback(String),
}

pub trait FeedbackBackend {
    fn play_tone(&mut self, pattern: FeedbackPattern) -> Result<(), FeedbackError>;
    fn vibrate(&mut self, pattern: FeedbackPattern) -> Result<(), FeedbackError>;
    fn release(&mut self);
}

/// Session-scoped command queue between the engine and the player.
pub struct FeedbackQueue {
    commands: Channel<CriticalSectionRawMutex, FeedbackCommand, FEEDBACK_QUEUE_DEPTH>,
    released: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for FeedbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackQueue {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            released: Signal::new(),
        }
    }

    pub fn try_send(&self, command: FeedbackCommand) -> bool {
        self.commands.try_send(command).is_ok()
    }

    pub fn free_capacity(&self) -> usize {
        self.commands.free_capacity()
    }

    pub fn try_receive(&self) -> Option<FeedbackCommand> {
        self.commands.try_receive().ok()
    }

    pub fn release(&self) {
        self.released.signal(());
    }

    pub fn is_released(&self) -> bool {
        self.released.signaled()
    }

    /// Drops queued commands and clears the release flag for a new session.
    pub fn reset(&self) {
        while self.commands.try_receive().is_ok() {}
        self.released.reset();
    }
}

pub struct FeedbackController<'a> {
    beep_enabled: bool,
    vibrate_enabled: bool,
    queue: &'a FeedbackQueue,
}

impl<'a> FeedbackController<'a> {
    pub fn new(config: &GestureConfig, queue: &'a FeedbackQueue) -> Self {
        Self {
            beep_enabled: config.beep_enabled,
            vibrate_enabled: config.vibrate_enabled,
            queue,
        }
    }

    /// Never blocks; returns how many commands were queued.
    pub fn emit(&self, event: FeedbackEvent) -> usize {
        let pattern = FeedbackPattern::for_event(event);
        let mut queued = 0;
        if self.beep_enabled {
            queued += self.enqueue(FeedbackCommand::Tone(pattern));
        }
        if self.vibrate_enabled {
            queued += self.enqueue(FeedbackCommand::Vibrate(pattern));
        }
        queued
    }

    fn enqueue(&self, command: FeedbackCommand) -> usize {
        let reserved = match command {
            FeedbackCommand::Tone(FeedbackPattern::Baseline)
            | FeedbackCommand::Vibrate(FeedbackPattern::Baseline) => CONFIRMATION_RESERVE,
            _ => 0,
        };
        if self.queue.free_capacity() <= reserved {
            debug!("feedback: backlog, dropping {:?}", command);
            return 0;
        }
        if self.queue.try_send(command) {
            1
        } else {
            warn!("feedback: queue full, dropping {:?}", command);
            0
        }
    }
}

pub struct FeedbackPlayer<'a, B: FeedbackBackend> {
    queue: &'a FeedbackQueue,
    backend: B,
    released: bool,
}

impl<'a, B: FeedbackBackend> FeedbackPlayer<'a, B> {
    pub fn new(queue: &'a FeedbackQueue, backend: B) -> Self {
        Self {
            queue,
            backend,
            released: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Plays everything queued right now.
    pub fn play_pending(&mut self) -> usize {
        let mut played = 0;
        while let Some(command) = self.queue.try_receive() {
            self.play(command);
            played += 1;
        }
        played
    }

    /// Plays commands until the queue is released, then drains what is left
    /// and releases the backend.
    pub async fn run(mut self) -> B {
        let queue = self.queue;
        loop {
            match select(queue.commands.receive(), queue.released.wait()).await {
                Either::First(command) => self.play(command),
                Either::Second(()) => break,
            }
        }
        self.play_pending();
        self.finish();
        self.backend
    }

    pub fn finish(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.backend.release();
        debug!("feedback: backend released");
    }

    fn play(&mut self, command: FeedbackCommand) {
        let result = match command {
            FeedbackCommand::Tone(pattern) => self.backend.play_tone(pattern),
            FeedbackCommand::Vibrate(pattern) => self.backend.vibrate(pattern),
        };
        if let Err(err) = result {
            warn!("feedback: {:?} failed: {}", command, err);
        }
    }
}
