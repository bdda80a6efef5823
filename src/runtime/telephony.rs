#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TelephonyError {
    #[error("telephony service unavailable")]
    Unavailable,
    #[error("call control permission denied")]
    PermissionDenied,
}

pub trait Telephony {
    fn accept_call(&mut self) -> Result<(), TelephonyError>;
    fn end_call(&mut self) -> Result<(), TelephonyError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorSet {
    pub proximity: bool,
    pub accelerometer: bool,
    pub magnetometer: bool,
}

/// Platform sensor registration. Samples flow back through `SessionHandle`.
pub trait SensorSubscription {
    fn subscribe(&mut self, sensors: SensorSet);
    fn unsubscribe(&mut self);
}
