//! Hands-free call handling from motion: raise the phone to the ear to
//! answer, flip it face down to decline.
//!
//! A session is started per incoming call through
//! [`runtime::SessionSupervisor`]; sensor callbacks push raw samples through a
//! [`runtime::SessionHandle`] and the session future decides at most once.

pub mod diagnostics;
pub mod feedback;
pub mod gesture;
pub mod runtime;

pub use diagnostics::{DeviceReport, DiagnosticSink, LogEntry};
pub use feedback::{FeedbackBackend, FeedbackPlayer, FeedbackQueue};
pub use gesture::{
    CancelReason, DeviceCapabilities, DeviceFacts, Detection, GestureConfig, GestureEngine,
    GestureOutcome, GestureTuning, SensorSample, SessionPhase,
};
pub use runtime::{
    ActionResult, SessionChannels, SessionEnd, SessionError, SessionHandle, SessionReport,
    SessionSupervisor,
};
