use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorSample {
    Proximity { t_ms: u64, distance_cm: f32 },
    Acceleration { t_ms: u64, x: f32, y: f32, z: f32 },
    MagneticField { t_ms: u64, x: f32, y: f32, z: f32 },
}

impl SensorSample {
    pub const fn t_ms(&self) -> u64 {
        match *self {
            Self::Proximity { t_ms, .. }
            | Self::Acceleration { t_ms, .. }
            | Self::MagneticField { t_ms, .. } => t_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum ProximityState {
    #[default]
    Unknown = 0,
    Near = 1,
    Far = 2,
}

impl ProximityState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Near => "near",
            Self::Far => "far",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedReading {
    pub proximity: ProximityState,
    pub inclination_deg: Option<i16>,
    pub gravity: [f32; 3],
    pub magnetic: Option<[f32; 3]>,
}

impl Default for NormalizedReading {
    fn default() -> Self {
        Self {
            proximity: ProximityState::Unknown,
            inclination_deg: None,
            gravity: [0.0; 3],
            magnetic: None,
        }
    }
}

/// What a sample changed in the reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadingUpdate {
    Proximity,
    Acceleration,
    MagneticField,
    Ignored,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureOutcome {
    Answer,
    Decline,
}

impl GestureOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Answer => "answer",
            Self::Decline => "decline",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Detection {
    pub outcome: GestureOutcome,
    pub confirmed_at_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SessionPhase {
    #[default]
    AwaitingBaseline,
    Armed,
    Confirming(GestureOutcome),
    Done(Option<GestureOutcome>),
}

impl SessionPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AwaitingBaseline => "awaiting_baseline",
            Self::Armed => "armed",
            Self::Confirming(GestureOutcome::Answer) => "confirming_answer",
            Self::Confirming(GestureOutcome::Decline) => "confirming_decline",
            Self::Done(Some(GestureOutcome::Answer)) => "done_answer",
            Self::Done(Some(GestureOutcome::Decline)) => "done_decline",
            Self::Done(None) => "done_none",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub reset_confirmations: u16,
    pub gesture_confirmations: u16,
    pub started_at_ms: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CancelReason {
    CallEnded,
    UserCancelled,
    Timeout,
}

impl CancelReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CallEnded => "call_ended",
            Self::UserCancelled => "user_cancelled",
            Self::Timeout => "timeout",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeedbackEvent {
    BaselineReached,
    GestureConfirmed(GestureOutcome),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineAction {
    PhaseChanged { from: SessionPhase, to: SessionPhase },
    Feedback(FeedbackEvent),
    Detected(Detection),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActionBuffer {
    len: usize,
    slots: [Option<EngineAction>; Self::MAX],
}

impl ActionBuffer {
    pub const MAX: usize = 6;

    pub const fn new() -> Self {
        Self {
            len: 0,
            slots: [None; Self::MAX],
        }
    }

    pub fn push(&mut self, action: EngineAction) {
        if self.len >= Self::MAX {
            return;
        }
        self.slots[self.len] = Some(action);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineAction> {
        self.slots[..self.len].iter().filter_map(Option::as_ref)
    }

    pub fn detection(&self) -> Option<Detection> {
        self.iter().find_map(|action| match action {
            EngineAction::Detected(detection) => Some(*detection),
            _ => None,
        })
    }

    pub fn feedback_events(&self) -> impl Iterator<Item = FeedbackEvent> + '_ {
        self.iter().filter_map(|action| match action {
            EngineAction::Feedback(event) => Some(*event),
            _ => None,
        })
    }
}

impl Default for ActionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum RejectReason {
    #[default]
    None = 0,
    IgnoredSample = 1,
    BaselineNear = 2,
    AngleUnknown = 3,
    OutsideEarBand = 4,
    FlipNotSustained = 5,
    GestureDisabled = 6,
    Cancelled = 7,
    Terminal = 8,
}

impl RejectReason {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::IgnoredSample => "ignored_sample",
            Self::BaselineNear => "baseline_near",
            Self::AngleUnknown => "angle_unknown",
            Self::OutsideEarBand => "outside_ear_band",
            Self::FlipNotSustained => "flip_not_sustained",
            Self::GestureDisabled => "gesture_disabled",
            Self::Cancelled => "cancelled",
            Self::Terminal => "terminal",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum EngineStateId {
    #[default]
    AwaitingBaseline = 0,
    Armed = 1,
    Done = 2,
}

impl EngineStateId {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
