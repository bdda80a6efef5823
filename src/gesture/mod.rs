pub mod capabilities;
pub mod config;
pub mod features;
pub mod gesture_hsm;
pub mod normalize;
pub mod trace;
pub mod types;

pub use capabilities::{DeviceCapabilities, DeviceFacts, EnabledGestures};
pub use config::{GestureConfig, GestureTuning};
pub use gesture_hsm::{EngineOutput, GestureEngine};
pub use normalize::SignalNormalizer;
pub use trace::EngineTraceSample;
pub use types::{
    CancelReason, Detection, EngineAction, FeedbackEvent, GestureOutcome, SensorSample,
    SessionPhase,
};
