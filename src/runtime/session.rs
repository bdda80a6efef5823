use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use embassy_time::{with_timeout, Duration, Instant};
use log::{debug, info, warn};

use super::{
    channels::SessionChannels,
    telephony::{SensorSet, SensorSubscription, Telephony, TelephonyError},
};
use crate::{
    diagnostics::DiagnosticSink,
    feedback::FeedbackController,
    gesture::{
        capabilities::{DeviceCapabilities, EnabledGestures},
        config::{GestureConfig, GestureTuning},
        gesture_hsm::{EngineOutput, GestureEngine},
        normalize::SignalNormalizer,
        types::{
            CancelReason, Detection, EngineAction, GestureOutcome, RejectReason, SensorSample,
            SessionPhase,
        },
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("proximity sensor or accelerometer missing")]
    MissingSensor,
    #[error("no gesture enabled for this device")]
    NoGestureEnabled,
    #[error("a gesture session is already active")]
    AlreadyActive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    Detected,
    Cancelled(CancelReason),
    TimedOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionResult {
    NotInvoked,
    Accepted,
    Ended,
    /// Test mode: the gesture was logged instead of touching the call.
    DryRun(GestureOutcome),
    Failed(GestureOutcome, TelephonyError),
    Suppressed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub detection: Option<Detection>,
    pub end: SessionEnd,
    pub action: ActionResult,
    pub final_phase: SessionPhase,
}

pub struct SessionSupervisor<'a> {
    capabilities: DeviceCapabilities,
    tuning: GestureTuning,
    diagnostics: &'a DiagnosticSink,
    active: AtomicBool,
}

impl<'a> SessionSupervisor<'a> {
    pub fn new(
        capabilities: DeviceCapabilities,
        tuning: GestureTuning,
        diagnostics: &'a DiagnosticSink,
    ) -> Self {
        Self {
            capabilities,
            tuning,
            diagnostics,
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    /// Session limit from `session.timeout_ms`, for callers without their own.
    pub fn default_limit(&self) -> Duration {
        Duration::from_millis(self.tuning.session.timeout_ms)
    }

    pub fn start_session<'s>(
        &'s self,
        config: GestureConfig,
        channels: &'s SessionChannels,
        limit: Duration,
    ) -> Result<ActiveSession<'s>, SessionError> {
        let log = SessionLog {
            sink: self.diagnostics,
            enabled: config.test_mode,
        };
        if !self.capabilities.can_run_session() {
            log.append("SESSION REFUSED: proximity or accelerometer missing");
            return Err(SessionError::MissingSensor);
        }

        let gestures = EnabledGestures::resolve(&config, &self.capabilities);
        if !gestures.any() {
            log.append("SESSION REFUSED: no gesture enabled");
            return Err(SessionError::NoGestureEnabled);
        }

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("session: start refused, another session is active");
            return Err(SessionError::AlreadyActive);
        }
        let slot = ActiveSlot(&self.active);

        channels.reset();
        let normalizer = SignalNormalizer::from_max_range(
            self.capabilities.proximity_max_range_cm,
            self.tuning.proximity.fallback_max_range_cm,
        );
        log.append_fmt(format_args!(
            "PROXIMITY SENSOR RANGE DETECTED AS {}",
            normalizer.max_range_cm()
        ));
        log.append_fmt(format_args!(
            "SETTING PROXIMITY SENSOR THRESHOLD TO {}",
            normalizer.near_threshold_cm()
        ));
        log.append_fmt(format_args!(
            "SESSION STARTED answer={} all_angles={} decline={}",
            gestures.answer, gestures.answer_all_angles, gestures.decline
        ));
        info!(
            "session: started answer={} all_angles={} decline={} test_mode={}",
            gestures.answer, gestures.answer_all_angles, gestures.decline, config.test_mode
        );

        let poll_slice = Duration::from_millis(self.tuning.session.poll_slice_ms);
        let started = Instant::now();
        Ok(ActiveSession {
            config,
            engine: GestureEngine::new(gestures, self.tuning, normalizer, started.as_millis()),
            channels,
            log,
            slot,
            deadline: started.checked_add(limit).unwrap_or(Instant::MAX),
            poll_slice,
        })
    }
}

/// A started session. Dropping it without running releases the slot.
pub struct ActiveSession<'s> {
    config: GestureConfig,
    engine: GestureEngine,
    channels: &'s SessionChannels,
    log: SessionLog<'s>,
    slot: ActiveSlot<'s>,
    deadline: Instant,
    poll_slice: Duration,
}

impl<'s> ActiveSession<'s> {
    pub fn gestures(&self) -> EnabledGestures {
        self.engine.gestures()
    }

    pub async fn run<T, S>(self, telephony: &mut T, sensors: &mut S) -> SessionReport
    where
        T: Telephony,
        S: SensorSubscription,
    {
        let ActiveSession {
            config,
            mut engine,
            channels,
            log,
            slot,
            deadline,
            poll_slice,
        } = self;

        let gestures = engine.gestures();
        sensors.subscribe(SensorSet {
            proximity: true,
            accelerometer: true,
            magnetometer: gestures.decline || gestures.answer_all_angles,
        });
        let teardown = Teardown {
            sensors,
            channels,
            log,
            _slot: slot,
        };

        let feedback = FeedbackController::new(&config, channels.feedback());
        channels.publish_phase(engine.phase());

        let end = loop {
            if let Some(reason) = channels.take_cancel() {
                let output = engine.cancel(now_ms(), reason);
                record_output(&output, channels, log, &feedback);
                log.append_fmt(format_args!("SESSION CANCELLED ({})", reason.label()));
                break SessionEnd::Cancelled(reason);
            }

            let now = Instant::now();
            if now >= deadline {
                let output = engine.cancel(now.as_millis(), CancelReason::Timeout);
                record_output(&output, channels, log, &feedback);
                log.append("SESSION TIMED OUT");
                break SessionEnd::TimedOut;
            }

            let wait = (deadline - now).min(poll_slice);
            let Ok(sample) = with_timeout(wait, channels.receive_sample()).await else {
                continue;
            };

            let output = engine.tick(sample);
            log_sample(log, &sample, &output);
            record_output(&output, channels, log, &feedback);
            if output.actions.detection().is_some() {
                break SessionEnd::Detected;
            }
        };

        let action = match engine.detection() {
            Some(detection) if end == SessionEnd::Detected => {
                invoke(&config, gestures, detection.outcome, telephony, log)
            }
            _ => ActionResult::NotInvoked,
        };

        let report = SessionReport {
            detection: engine.detection(),
            end,
            action,
            final_phase: engine.phase(),
        };
        drop(teardown);
        report
    }
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Diagnostic entries for one session. Silent unless test mode is on; every
/// entry is stamped with the session clock, not the sensor timestamp.
#[derive(Clone, Copy)]
struct SessionLog<'s> {
    sink: &'s DiagnosticSink,
    enabled: bool,
}

impl SessionLog<'_> {
    fn append(&self, message: &str) {
        if self.enabled {
            self.sink.append(now_ms(), message);
        }
    }

    fn append_fmt(&self, args: fmt::Arguments<'_>) {
        if self.enabled {
            self.sink.append_fmt(now_ms(), args);
        }
    }
}

fn record_output(
    output: &EngineOutput,
    channels: &SessionChannels,
    log: SessionLog<'_>,
    feedback: &FeedbackController<'_>,
) {
    for action in output.actions.iter() {
        match *action {
            EngineAction::PhaseChanged { from, to } => {
                channels.publish_phase(to);
                log.append_fmt(format_args!("PHASE {} -> {}", from.label(), to.label()));
            }
            EngineAction::Feedback(event) => {
                feedback.emit(event);
            }
            EngineAction::Detected(detection) => {
                log.append_fmt(format_args!("{} CONFIRMED", detection.outcome.label()));
            }
        }
    }
}

fn log_sample(log: SessionLog<'_>, sample: &SensorSample, output: &EngineOutput) {
    if !log.enabled || output.trace.reject_reason == RejectReason::IgnoredSample {
        return;
    }
    match *sample {
        SensorSample::Proximity { .. } => {
            log.append_fmt(format_args!("PROXIMITY {}", output.trace.proximity.label()));
        }
        SensorSample::Acceleration { .. } => {
            if let Some(deg) = output.trace.inclination_deg {
                log.append_fmt(format_args!("INCLINATION {deg}"));
            }
        }
        SensorSample::MagneticField { x, y, z, .. } => {
            log.append_fmt(format_args!("MAGNETOMETER {x:.1} {y:.1} {z:.1}"));
        }
    }
}

fn invoke<T: Telephony>(
    config: &GestureConfig,
    gestures: EnabledGestures,
    outcome: GestureOutcome,
    telephony: &mut T,
    log: SessionLog<'_>,
) -> ActionResult {
    if config.test_mode {
        let message = match outcome {
            GestureOutcome::Answer => "PICKUP DETECTED",
            GestureOutcome::Decline => "DECLINE DETECTED",
        };
        log.append(message);
        info!("session: test mode, {} not forwarded", outcome.label());
        return ActionResult::DryRun(outcome);
    }

    let result = match outcome {
        GestureOutcome::Answer => telephony.accept_call().map(|()| ActionResult::Accepted),
        GestureOutcome::Decline if gestures.decline => {
            telephony.end_call().map(|()| ActionResult::Ended)
        }
        GestureOutcome::Decline => {
            debug!("session: decline detected but not permitted, ignoring");
            return ActionResult::Suppressed;
        }
    };

    match result {
        Ok(action) => {
            info!("session: {} forwarded to telephony", outcome.label());
            action
        }
        Err(err) => {
            warn!("session: {} failed: {}", outcome.label(), err);
            ActionResult::Failed(outcome, err)
        }
    }
}

struct ActiveSlot<'s>(&'s AtomicBool);

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs on every exit from `ActiveSession::run`, including the future being
/// dropped mid-await. The slot is released last.
struct Teardown<'s, 'r, S: SensorSubscription> {
    sensors: &'r mut S,
    channels: &'s SessionChannels,
    log: SessionLog<'s>,
    _slot: ActiveSlot<'s>,
}

impl<S: SensorSubscription> Drop for Teardown<'_, '_, S> {
    fn drop(&mut self) {
        self.sensors.unsubscribe();
        self.channels.feedback().release();
        self.log.append("SESSION ENDED");
        debug!("session: torn down");
    }
}
