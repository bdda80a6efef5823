use std::sync::OnceLock;

use log::debug;

use super::config::GestureConfig;

pub const DECLINE_MIN_OS_VERSION: u32 = 28;

static CAPABILITIES: OnceLock<DeviceCapabilities> = OnceLock::new();

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceFacts {
    pub os_version: u32,
    pub has_proximity_sensor: bool,
    pub has_accelerometer: bool,
    pub has_magnetometer: bool,
    pub proximity_max_range_cm: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceCapabilities {
    pub has_proximity_sensor: bool,
    pub has_accelerometer: bool,
    pub has_magnetometer: bool,
    pub os_supports_decline: bool,
    pub proximity_max_range_cm: Option<f32>,
}

impl DeviceCapabilities {
    pub const fn can_run_session(&self) -> bool {
        self.has_proximity_sensor && self.has_accelerometer
    }

    pub const fn supports_decline(&self) -> bool {
        self.has_magnetometer && self.os_supports_decline
    }

    pub const fn supports_all_angles(&self) -> bool {
        self.has_magnetometer
    }
}

pub fn resolve(facts: &DeviceFacts) -> DeviceCapabilities {
    DeviceCapabilities {
        has_proximity_sensor: facts.has_proximity_sensor,
        has_accelerometer: facts.has_accelerometer,
        has_magnetometer: facts.has_magnetometer,
        os_supports_decline: facts.os_version >= DECLINE_MIN_OS_VERSION,
        proximity_max_range_cm: facts.proximity_max_range_cm,
    }
}

/// Resolves once per process; sensor hardware does not change at runtime.
pub fn device_capabilities(facts: &DeviceFacts) -> DeviceCapabilities {
    *CAPABILITIES.get_or_init(|| resolve(facts))
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EnabledGestures {
    pub answer: bool,
    pub answer_all_angles: bool,
    pub decline: bool,
}

impl EnabledGestures {
    pub fn resolve(config: &GestureConfig, capabilities: &DeviceCapabilities) -> Self {
        let answer = config.answer_enabled;

        let mut answer_all_angles = answer && config.answer_all_angles_enabled;
        if answer_all_angles && !capabilities.supports_all_angles() {
            debug!("gestures: all-angles answer suppressed, no magnetometer");
            answer_all_angles = false;
        }

        let mut decline = config.decline_enabled;
        if decline && !capabilities.supports_decline() {
            debug!(
                "gestures: decline suppressed, magnetometer={} os_supports_decline={}",
                capabilities.has_magnetometer, capabilities.os_supports_decline
            );
            decline = false;
        }
        if decline && answer_all_angles {
            debug!("gestures: decline ignored while all-angles answer is active");
            decline = false;
        }

        Self {
            answer,
            answer_all_angles,
            decline,
        }
    }

    pub const fn any(&self) -> bool {
        self.answer || self.decline
    }
}
