use super::types::{EngineStateId, ProximityState, RejectReason};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineTraceSample {
    pub now_ms: u64,
    pub state_id: EngineStateId,
    pub reject_reason: RejectReason,
    pub proximity: ProximityState,
    pub inclination_deg: Option<i16>,
    pub reference_deg: Option<i16>,
    pub flip_delta_deg: u16,
    pub reset_confirmations: u16,
    pub gesture_confirmations: u16,
}
