use super::{
    config::{AnswerTuning, DeclineTuning},
    types::{NormalizedReading, ProximityState, RejectReason},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AnswerAssessment {
    pub accepted: bool,
    pub reason: RejectReason,
}

impl AnswerAssessment {
    const fn rejected(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }
}

/// Consecutive flipped acceleration updates toward a decline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlipRun {
    pub started_at_ms: u64,
    pub samples: u16,
}

impl FlipRun {
    pub const fn start(now_ms: u64) -> Self {
        Self {
            started_at_ms: now_ms,
            samples: 1,
        }
    }

    pub const fn extend(self) -> Self {
        Self {
            started_at_ms: self.started_at_ms,
            samples: self.samples.saturating_add(1),
        }
    }

    pub fn held_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    pub fn is_sustained(&self, now_ms: u64, tuning: &DeclineTuning) -> bool {
        self.samples >= tuning.min_samples && self.held_ms(now_ms) >= tuning.hold_ms
    }
}

/// Shortest angular distance between two inclinations, 0..=180.
pub fn angle_delta_deg(a: i16, b: i16) -> u16 {
    let raw = (i32::from(a) - i32::from(b)).rem_euclid(360);
    let wrapped = if raw > 180 { 360 - raw } else { raw };
    wrapped as u16
}

pub fn in_ear_band(inclination_deg: i16, band: &AnswerTuning) -> bool {
    (band.ear_band_min_deg..=band.ear_band_max_deg).contains(&inclination_deg)
}

pub fn is_flipped(delta_deg: u16, tuning: &DeclineTuning) -> bool {
    delta_deg >= tuning.flip_delta_deg
}

pub fn assess_answer(
    previous: ProximityState,
    reading: &NormalizedReading,
    all_angles: bool,
    band: &AnswerTuning,
) -> AnswerAssessment {
    if previous != ProximityState::Far || reading.proximity != ProximityState::Near {
        return AnswerAssessment::default();
    }
    if all_angles {
        return AnswerAssessment {
            accepted: true,
            reason: RejectReason::None,
        };
    }

    let Some(inclination) = reading.inclination_deg else {
        return AnswerAssessment::rejected(RejectReason::AngleUnknown);
    };
    if !in_ear_band(inclination, band) {
        return AnswerAssessment::rejected(RejectReason::OutsideEarBand);
    }

    AnswerAssessment {
        accepted: true,
        reason: RejectReason::None,
    }
}
