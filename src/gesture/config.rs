use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub answer_enabled: bool,
    pub answer_all_angles_enabled: bool,
    pub decline_enabled: bool,
    pub beep_enabled: bool,
    pub vibrate_enabled: bool,
    pub test_mode: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProximityTuning {
    pub fallback_max_range_cm: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineTuning {
    pub far_samples: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerTuning {
    pub ear_band_min_deg: i16,
    pub ear_band_max_deg: i16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclineTuning {
    pub flip_delta_deg: u16,
    pub min_samples: u16,
    pub hold_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionTuning {
    pub timeout_ms: u64,
    pub poll_slice_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GestureTuning {
    pub proximity: ProximityTuning,
    pub baseline: BaselineTuning,
    pub answer: AnswerTuning,
    pub decline: DeclineTuning,
    pub session: SessionTuning,
}

impl Default for GestureTuning {
    fn default() -> Self {
        Self {
            proximity: ProximityTuning {
                fallback_max_range_cm: 5.0,
            },
            baseline: BaselineTuning { far_samples: 2 },
            answer: AnswerTuning {
                ear_band_min_deg: -100,
                ear_band_max_deg: 100,
            },
            decline: DeclineTuning {
                flip_delta_deg: 150,
                min_samples: 2,
                hold_ms: 300,
            },
            session: SessionTuning {
                timeout_ms: 45_000,
                poll_slice_ms: 20,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

pub fn parse_tuning_str(raw: &str) -> Result<GestureTuning, ConfigError> {
    let tuning: GestureTuning =
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.message().to_string()))?;
    validate_tuning(&tuning)?;
    Ok(tuning)
}

pub fn parse_tuning_file(path: &Path) -> Result<GestureTuning, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_tuning_str(&raw)
}

pub fn validate_tuning(tuning: &GestureTuning) -> Result<(), ConfigError> {
    let range = tuning.proximity.fallback_max_range_cm;
    if !range.is_finite() || range <= 0.0 {
        return Err(ConfigError::Validation(
            "proximity.fallback_max_range_cm must be a positive number".into(),
        ));
    }

    if tuning.baseline.far_samples == 0 {
        return Err(ConfigError::Validation(
            "baseline.far_samples must be > 0".into(),
        ));
    }

    let band = tuning.answer;
    if !(-180..=180).contains(&band.ear_band_min_deg)
        || !(-180..=180).contains(&band.ear_band_max_deg)
    {
        return Err(ConfigError::Validation(
            "answer ear band bounds must be within -180..=180".into(),
        ));
    }
    if band.ear_band_min_deg >= band.ear_band_max_deg {
        return Err(ConfigError::Validation(
            "answer.ear_band_min_deg must be < answer.ear_band_max_deg".into(),
        ));
    }

    if !(1..=180).contains(&tuning.decline.flip_delta_deg) {
        return Err(ConfigError::Validation(
            "decline.flip_delta_deg must be within 1..=180".into(),
        ));
    }
    if tuning.decline.min_samples == 0 {
        return Err(ConfigError::Validation(
            "decline.min_samples must be > 0".into(),
        ));
    }

    if tuning.session.poll_slice_ms == 0 {
        return Err(ConfigError::Validation(
            "session.poll_slice_ms must be > 0".into(),
        ));
    }
    if tuning.session.timeout_ms < tuning.session.poll_slice_ms {
        return Err(ConfigError::Validation(
            "session.timeout_ms must be >= session.poll_slice_ms".into(),
        ));
    }

    Ok(())
}
