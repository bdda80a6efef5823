use log::{debug, info};
use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use super::{
    capabilities::EnabledGestures,
    config::GestureTuning,
    features::{angle_delta_deg, assess_answer, is_flipped, AnswerAssessment, FlipRun},
    normalize::SignalNormalizer,
    trace::EngineTraceSample,
    types::{
        ActionBuffer, CancelReason, Detection, EngineAction, EngineStateId, FeedbackEvent,
        GestureOutcome, NormalizedReading, ProximityState, ReadingUpdate, RejectReason,
        SensorSample, SessionPhase, SessionState,
    },
};

#[derive(Clone, Copy, Debug)]
enum GestureHsmEvent {
    Sample(SensorSample),
    Cancel { now_ms: u64, reason: CancelReason },
}

#[derive(Default)]
struct DispatchContext {
    actions: ActionBuffer,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOutput {
    pub actions: ActionBuffer,
    pub trace: EngineTraceSample,
}

/// One session's gesture recognizer. Feed it samples in arrival order;
/// it decides at most once and ignores everything afterwards.
pub struct GestureEngine {
    machine: statig::blocking::StateMachine<GestureHsm>,
}

impl GestureEngine {
    pub fn new(
        gestures: EnabledGestures,
        tuning: GestureTuning,
        normalizer: SignalNormalizer,
        started_at_ms: u64,
    ) -> Self {
        Self {
            machine: GestureHsm::new(gestures, tuning, normalizer, started_at_ms).state_machine(),
        }
    }

    pub fn tick(&mut self, sample: SensorSample) -> EngineOutput {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&GestureHsmEvent::Sample(sample), &mut context);
        self.finish(context)
    }

    pub fn cancel(&mut self, now_ms: u64, reason: CancelReason) -> EngineOutput {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&GestureHsmEvent::Cancel { now_ms, reason }, &mut context);
        self.finish(context)
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.inner().session.phase
    }

    pub fn state(&self) -> SessionState {
        self.machine.inner().session
    }

    pub fn reading(&self) -> NormalizedReading {
        self.machine.inner().reading
    }

    pub fn detection(&self) -> Option<Detection> {
        self.machine.inner().detection
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.machine.inner().cancel_reason
    }

    pub fn gestures(&self) -> EnabledGestures {
        self.machine.inner().gestures
    }

    pub fn is_done(&self) -> bool {
        self.phase().is_terminal()
    }

    fn finish(&self, context: DispatchContext) -> EngineOutput {
        EngineOutput {
            actions: context.actions,
            trace: self.machine.inner().last_trace,
        }
    }
}

struct GestureHsm {
    gestures: EnabledGestures,
    tuning: GestureTuning,
    normalizer: SignalNormalizer,
    reading: NormalizedReading,
    reference_deg: Option<i16>,
    flip_run: Option<FlipRun>,
    session: SessionState,
    detection: Option<Detection>,
    cancel_reason: Option<CancelReason>,
    last_trace: EngineTraceSample,
}

impl GestureHsm {
    fn new(
        gestures: EnabledGestures,
        tuning: GestureTuning,
        normalizer: SignalNormalizer,
        started_at_ms: u64,
    ) -> Self {
        Self {
            gestures,
            tuning,
            normalizer,
            reading: NormalizedReading::default(),
            reference_deg: None,
            flip_run: None,
            session: SessionState {
                started_at_ms,
                ..SessionState::default()
            },
            detection: None,
            cancel_reason: None,
            last_trace: EngineTraceSample {
                now_ms: started_at_ms,
                state_id: EngineStateId::AwaitingBaseline,
                ..EngineTraceSample::default()
            },
        }
    }

    /// Returns the proximity seen before this sample and what it changed.
    fn ingest(&mut self, sample: &SensorSample) -> (ProximityState, ReadingUpdate) {
        let previous = self.reading.proximity;
        let (next, update) = self.normalizer.normalize(&self.reading, sample);
        self.reading = next;
        (previous, update)
    }

    fn flip_delta(&self) -> u16 {
        match (self.reading.inclination_deg, self.reference_deg) {
            (Some(current), Some(reference)) => angle_delta_deg(current, reference),
            _ => 0,
        }
    }

    fn clear_flip_run(&mut self) {
        self.flip_run = None;
        self.session.gesture_confirmations = 0;
    }

    fn set_phase(&mut self, context: &mut DispatchContext, to: SessionPhase) {
        let from = self.session.phase;
        if from == to {
            return;
        }
        self.session.phase = to;
        context.actions.push(EngineAction::PhaseChanged { from, to });
        debug!("gesture: phase {} -> {}", from.label(), to.label());
    }

    fn arm(&mut self, context: &mut DispatchContext) {
        self.reference_deg = self.reading.inclination_deg;
        self.set_phase(context, SessionPhase::Armed);
        debug!(
            "gesture: baseline reached after {} far samples, reference={:?}",
            self.session.reset_confirmations, self.reference_deg
        );
    }

    fn confirm(&mut self, context: &mut DispatchContext, outcome: GestureOutcome, now_ms: u64) {
        self.set_phase(context, SessionPhase::Confirming(outcome));
        context
            .actions
            .push(EngineAction::Feedback(FeedbackEvent::GestureConfirmed(outcome)));

        let detection = Detection {
            outcome,
            confirmed_at_ms: now_ms,
        };
        self.detection = Some(detection);
        context.actions.push(EngineAction::Detected(detection));
        if self.session.gesture_confirmations == 0 {
            self.session.gesture_confirmations = 1;
        }
        self.flip_run = None;

        self.set_phase(context, SessionPhase::Done(Some(outcome)));
        info!(
            "gesture: {} confirmed at {}ms ({}ms into session)",
            outcome.label(),
            now_ms,
            now_ms.saturating_sub(self.session.started_at_ms)
        );
    }

    fn decline_sustained(&self, previous: ProximityState, now_ms: u64) -> bool {
        self.gestures.decline
            && previous == ProximityState::Far
            && is_flipped(self.flip_delta(), &self.tuning.decline)
            && self
                .flip_run
                .is_some_and(|run| run.is_sustained(now_ms, &self.tuning.decline))
    }

    fn evaluate_proximity(
        &mut self,
        previous: ProximityState,
        now_ms: u64,
    ) -> (Option<GestureOutcome>, RejectReason) {
        let edge_to_near =
            previous == ProximityState::Far && self.reading.proximity == ProximityState::Near;
        let answer = if self.gestures.answer {
            assess_answer(
                previous,
                &self.reading,
                self.gestures.answer_all_angles,
                &self.tuning.answer,
            )
        } else if edge_to_near {
            AnswerAssessment {
                accepted: false,
                reason: RejectReason::GestureDisabled,
            }
        } else {
            AnswerAssessment::default()
        };

        // Answer wins when one sample satisfies both.
        if answer.accepted {
            return (Some(GestureOutcome::Answer), RejectReason::None);
        }
        if self.decline_sustained(previous, now_ms) {
            return (Some(GestureOutcome::Decline), RejectReason::None);
        }

        if self.reading.proximity == ProximityState::Near {
            self.clear_flip_run();
        }
        (None, answer.reason)
    }

    fn evaluate_acceleration(&mut self, now_ms: u64) -> (Option<GestureOutcome>, RejectReason) {
        let flipped = is_flipped(self.flip_delta(), &self.tuning.decline)
            && self.reading.proximity == ProximityState::Far;
        if !flipped {
            self.clear_flip_run();
            return (None, RejectReason::None);
        }
        if !self.gestures.decline {
            return (None, RejectReason::GestureDisabled);
        }

        let run = match self.flip_run {
            Some(run) => run.extend(),
            None => FlipRun::start(now_ms),
        };
        self.flip_run = Some(run);
        self.session.gesture_confirmations = run.samples;

        if run.is_sustained(now_ms, &self.tuning.decline) {
            (Some(GestureOutcome::Decline), RejectReason::None)
        } else {
            (None, RejectReason::FlipNotSustained)
        }
    }

    fn update_trace(&mut self, now_ms: u64, state_id: EngineStateId, reason: RejectReason) {
        self.last_trace = EngineTraceSample {
            now_ms,
            state_id,
            reject_reason: reason,
            proximity: self.reading.proximity,
            inclination_deg: self.reading.inclination_deg,
            reference_deg: self.reference_deg,
            flip_delta_deg: self.flip_delta(),
            reset_confirmations: self.session.reset_confirmations,
            gesture_confirmations: self.session.gesture_confirmations,
        };
    }
}

#[state_machine(initial = "State::awaiting_baseline()")]
impl GestureHsm {
    #[state(superstate = "live")]
    fn awaiting_baseline(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        let GestureHsmEvent::Sample(sample) = event else {
            return Super;
        };
        let now_ms = sample.t_ms();
        let (_, update) = self.ingest(sample);

        let reason = match update {
            ReadingUpdate::Ignored => RejectReason::IgnoredSample,
            ReadingUpdate::Proximity if self.reading.proximity == ProximityState::Far => {
                self.session.reset_confirmations =
                    self.session.reset_confirmations.saturating_add(1);
                context
                    .actions
                    .push(EngineAction::Feedback(FeedbackEvent::BaselineReached));
                if self.session.reset_confirmations >= self.tuning.baseline.far_samples {
                    self.arm(context);
                    self.update_trace(now_ms, EngineStateId::Armed, RejectReason::None);
                    return Transition(State::armed());
                }
                RejectReason::None
            }
            ReadingUpdate::Proximity => {
                self.session.reset_confirmations = 0;
                RejectReason::BaselineNear
            }
            ReadingUpdate::Acceleration | ReadingUpdate::MagneticField => RejectReason::None,
        };

        self.update_trace(now_ms, EngineStateId::AwaitingBaseline, reason);
        Handled
    }

    #[state(superstate = "live")]
    fn armed(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let GestureHsmEvent::Sample(sample) = event else {
            return Super;
        };
        let now_ms = sample.t_ms();
        let (previous, update) = self.ingest(sample);
        if self.reference_deg.is_none() && self.reading.inclination_deg.is_some() {
            self.reference_deg = self.reading.inclination_deg;
            debug!("gesture: late reference {:?}", self.reference_deg);
        }

        let (outcome, reason) = match update {
            ReadingUpdate::Ignored => (None, RejectReason::IgnoredSample),
            ReadingUpdate::Proximity => self.evaluate_proximity(previous, now_ms),
            ReadingUpdate::Acceleration => self.evaluate_acceleration(now_ms),
            ReadingUpdate::MagneticField => (None, RejectReason::None),
        };

        if let Some(outcome) = outcome {
            self.confirm(context, outcome, now_ms);
            self.update_trace(now_ms, EngineStateId::Armed, RejectReason::None);
            return Transition(State::done());
        }

        self.update_trace(now_ms, EngineStateId::Armed, reason);
        Handled
    }

    #[state]
    fn done(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let _ = context;
        let now_ms = match event {
            GestureHsmEvent::Sample(sample) => sample.t_ms(),
            GestureHsmEvent::Cancel { now_ms, .. } => *now_ms,
        };
        self.update_trace(now_ms, EngineStateId::Done, RejectReason::Terminal);
        Handled
    }

    #[superstate]
    fn live(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Cancel { now_ms, reason } => {
                self.cancel_reason = Some(*reason);
                self.clear_flip_run();
                self.set_phase(context, SessionPhase::Done(None));
                self.update_trace(*now_ms, EngineStateId::Done, RejectReason::Cancelled);
                info!("gesture: session cancelled ({})", reason.label());
                Transition(State::done())
            }
            GestureHsmEvent::Sample(_) => Handled,
        }
    }
}

#[cfg(test)]
mod tests;
