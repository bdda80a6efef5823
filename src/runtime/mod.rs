pub mod channels;
pub mod session;
pub mod telephony;

pub use channels::{SessionChannels, SessionHandle, SAMPLE_QUEUE_DEPTH};
pub use session::{
    ActionResult, ActiveSession, SessionEnd, SessionError, SessionReport, SessionSupervisor,
};
pub use telephony::{SensorSet, SensorSubscription, Telephony, TelephonyError};
