use log::debug;

use super::types::{NormalizedReading, ProximityState, ReadingUpdate, SensorSample};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalNormalizer {
    max_range_cm: f32,
    near_threshold_cm: f32,
}

impl SignalNormalizer {
    /// Falls back to `fallback_cm` when the sensor reports no usable range.
    pub fn from_max_range(reported_cm: Option<f32>, fallback_cm: f32) -> Self {
        let max_range_cm = match reported_cm {
            Some(range) if range.is_finite() && range > 0.0 => range,
            _ => {
                debug!(
                    "normalize: proximity range {:?} unusable, using {}cm",
                    reported_cm, fallback_cm
                );
                fallback_cm
            }
        };
        let near_threshold_cm = max_range_cm / 2.0;
        debug!(
            "normalize: proximity max_range={}cm near_threshold={}cm",
            max_range_cm, near_threshold_cm
        );
        Self {
            max_range_cm,
            near_threshold_cm,
        }
    }

    pub const fn max_range_cm(&self) -> f32 {
        self.max_range_cm
    }

    pub const fn near_threshold_cm(&self) -> f32 {
        self.near_threshold_cm
    }

    pub fn classify_distance(&self, distance_cm: f32) -> ProximityState {
        let clamped = distance_cm.clamp(0.0, self.max_range_cm);
        if clamped < self.near_threshold_cm {
            ProximityState::Near
        } else {
            ProximityState::Far
        }
    }

    pub fn normalize(
        &self,
        current: &NormalizedReading,
        sample: &SensorSample,
    ) -> (NormalizedReading, ReadingUpdate) {
        let mut next = *current;
        match *sample {
            SensorSample::Proximity { distance_cm, .. } => {
                if !distance_cm.is_finite() {
                    return (next, ReadingUpdate::Ignored);
                }
                next.proximity = self.classify_distance(distance_cm);
                (next, ReadingUpdate::Proximity)
            }
            SensorSample::Acceleration { x, y, z, .. } => {
                let Some(gravity) = unit_vector(x, y, z) else {
                    return (next, ReadingUpdate::Ignored);
                };
                next.gravity = gravity;
                next.inclination_deg = Some(inclination_deg(gravity));
                (next, ReadingUpdate::Acceleration)
            }
            SensorSample::MagneticField { x, y, z, .. } => {
                if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                    return (next, ReadingUpdate::Ignored);
                }
                next.magnetic = Some([x, y, z]);
                (next, ReadingUpdate::MagneticField)
            }
        }
    }
}

fn unit_vector(x: f32, y: f32, z: f32) -> Option<[f32; 3]> {
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return None;
    }
    let norm = (x * x + y * y + z * z).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some([x / norm, y / norm, z / norm])
}

/// Rotation of the device around its screen normal, in whole degrees
/// within (-180, 180]. Zero is upright, 180 is upside down.
pub fn inclination_deg(gravity: [f32; 3]) -> i16 {
    let degrees = gravity[0].atan2(gravity[1]).to_degrees().round() as i16;
    if degrees <= -180 {
        180
    } else {
        degrees
    }
}

#[cfg(test)]
mod tests;
