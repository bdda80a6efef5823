use super::*;

const ANSWER_ONLY: EnabledGestures = EnabledGestures {
    answer: true,
    answer_all_angles: false,
    decline: false,
};

const DECLINE_ONLY: EnabledGestures = EnabledGestures {
    answer: false,
    answer_all_angles: false,
    decline: true,
};

const ANSWER_AND_DECLINE: EnabledGestures = EnabledGestures {
    answer: true,
    answer_all_angles: false,
    decline: true,
};

fn engine(gestures: EnabledGestures) -> GestureEngine {
    let tuning = GestureTuning::default();
    let normalizer =
        SignalNormalizer::from_max_range(Some(5.0), tuning.proximity.fallback_max_range_cm);
    GestureEngine::new(gestures, tuning, normalizer, 0)
}

fn far(t_ms: u64) -> SensorSample {
    SensorSample::Proximity {
        t_ms,
        distance_cm: 5.0,
    }
}

fn near(t_ms: u64) -> SensorSample {
    SensorSample::Proximity {
        t_ms,
        distance_cm: 0.0,
    }
}

fn tilt(t_ms: u64, deg: f32) -> SensorSample {
    let rad = deg.to_radians();
    SensorSample::Acceleration {
        t_ms,
        x: 9.81 * rad.sin(),
        y: 9.81 * rad.cos(),
        z: 0.0,
    }
}

fn arm_at(engine: &mut GestureEngine, deg: f32) {
    let _ = engine.tick(tilt(0, deg));
    let _ = engine.tick(far(10));
    let out = engine.tick(far(20));
    assert_eq!(engine.phase(), SessionPhase::Armed);
    assert_eq!(out.trace.reference_deg, Some(deg as i16));
}

fn detections(outputs: &[EngineOutput]) -> Vec<Detection> {
    outputs
        .iter()
        .filter_map(|out| out.actions.detection())
        .collect()
}

#[test]
fn far_far_near_in_ear_band_answers() {
    let mut engine = engine(ANSWER_ONLY);
    let outputs = [
        engine.tick(tilt(0, 10.0)),
        engine.tick(far(10)),
        engine.tick(far(20)),
        engine.tick(near(30)),
    ];

    assert_eq!(
        detections(&outputs),
        vec![Detection {
            outcome: GestureOutcome::Answer,
            confirmed_at_ms: 30,
        }]
    );
    assert_eq!(engine.phase(), SessionPhase::Done(Some(GestureOutcome::Answer)));
    assert!(engine.is_done());

    let phases: Vec<_> = outputs[3]
        .actions
        .iter()
        .filter_map(|action| match action {
            EngineAction::PhaseChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            (
                SessionPhase::Armed,
                SessionPhase::Confirming(GestureOutcome::Answer)
            ),
            (
                SessionPhase::Confirming(GestureOutcome::Answer),
                SessionPhase::Done(Some(GestureOutcome::Answer))
            ),
        ]
    );
    assert_eq!(
        outputs[3].actions.feedback_events().collect::<Vec<_>>(),
        vec![FeedbackEvent::GestureConfirmed(GestureOutcome::Answer)]
    );
}

#[test]
fn near_outside_ear_band_does_not_answer() {
    let mut engine = engine(ANSWER_ONLY);
    arm_at(&mut engine, 170.0);
    let out = engine.tick(near(30));

    assert!(out.actions.detection().is_none());
    assert_eq!(out.trace.reject_reason, RejectReason::OutsideEarBand);
    assert_eq!(engine.phase(), SessionPhase::Armed);
    assert!(engine.detection().is_none());
}

#[test]
fn sustained_flip_declines_once() {
    let mut engine = engine(DECLINE_ONLY);
    arm_at(&mut engine, 0.0);

    let steady = engine.tick(tilt(100, 5.0));
    assert_eq!(steady.trace.flip_delta_deg, 5);
    assert_eq!(steady.trace.reject_reason, RejectReason::None);

    let first = engine.tick(tilt(200, 175.0));
    assert_eq!(first.trace.reject_reason, RejectReason::FlipNotSustained);
    let second = engine.tick(tilt(350, 175.0));
    assert_eq!(second.trace.reject_reason, RejectReason::FlipNotSustained);
    assert_eq!(second.trace.gesture_confirmations, 2);

    let third = engine.tick(tilt(500, 175.0));
    assert_eq!(
        third.actions.detection(),
        Some(Detection {
            outcome: GestureOutcome::Decline,
            confirmed_at_ms: 500,
        })
    );

    let after = engine.tick(tilt(650, 175.0));
    assert!(after.actions.is_empty());
    assert_eq!(after.trace.reject_reason, RejectReason::Terminal);
    assert_eq!(engine.phase(), SessionPhase::Done(Some(GestureOutcome::Decline)));
}

#[test]
fn cancel_while_armed_ends_without_detection() {
    let mut engine = engine(ANSWER_AND_DECLINE);
    arm_at(&mut engine, 0.0);

    let out = engine.cancel(40, CancelReason::UserCancelled);
    assert_eq!(engine.phase(), SessionPhase::Done(None));
    assert_eq!(out.trace.reject_reason, RejectReason::Cancelled);
    assert!(out.actions.detection().is_none());
    assert_eq!(engine.cancel_reason(), Some(CancelReason::UserCancelled));

    let again = engine.cancel(50, CancelReason::CallEnded);
    assert!(again.actions.is_empty());
    assert_eq!(engine.cancel_reason(), Some(CancelReason::UserCancelled));

    let late = engine.tick(near(60));
    assert!(late.actions.detection().is_none());
    assert!(engine.detection().is_none());
}

#[test]
fn near_only_sequence_never_arms() {
    let mut engine = engine(ANSWER_ONLY);
    let _ = engine.tick(tilt(0, 10.0));
    for t in (10..200).step_by(10) {
        let out = engine.tick(near(t));
        assert!(out.actions.is_empty());
        assert_eq!(out.trace.reject_reason, RejectReason::BaselineNear);
    }
    assert_eq!(engine.phase(), SessionPhase::AwaitingBaseline);
    assert!(engine.detection().is_none());
}

#[test]
fn near_resets_baseline_count() {
    let mut engine = engine(ANSWER_ONLY);
    let first = engine.tick(far(10));
    assert_eq!(
        first.actions.feedback_events().collect::<Vec<_>>(),
        vec![FeedbackEvent::BaselineReached]
    );
    assert_eq!(engine.state().reset_confirmations, 1);

    let _ = engine.tick(near(20));
    assert_eq!(engine.state().reset_confirmations, 0);

    let _ = engine.tick(far(30));
    assert_eq!(engine.phase(), SessionPhase::AwaitingBaseline);
    let _ = engine.tick(far(40));
    assert_eq!(engine.phase(), SessionPhase::Armed);
}

#[test]
fn answer_wins_when_both_gestures_match() {
    let mut engine = engine(ANSWER_AND_DECLINE);
    arm_at(&mut engine, -80.0);

    let _ = engine.tick(tilt(100, 95.0));
    let held = engine.tick(tilt(250, 95.0));
    assert_eq!(held.trace.flip_delta_deg, 175);
    assert_eq!(held.trace.reject_reason, RejectReason::FlipNotSustained);

    let out = engine.tick(near(500));
    assert_eq!(
        out.actions.detection().map(|d| d.outcome),
        Some(GestureOutcome::Answer)
    );
}

#[test]
fn disabled_decline_never_fires() {
    let mut engine = engine(ANSWER_ONLY);
    arm_at(&mut engine, 0.0);

    for (i, t) in (100..1_000).step_by(100).enumerate() {
        let out = engine.tick(tilt(t, 180.0));
        assert!(out.actions.is_empty(), "tick {i}");
        assert_eq!(out.trace.reject_reason, RejectReason::GestureDisabled);
    }
    let out = engine.tick(far(1_100));
    assert!(out.actions.detection().is_none());
    assert_eq!(engine.phase(), SessionPhase::Armed);
}

#[test]
fn disabled_answer_traces_the_edge() {
    let mut engine = engine(DECLINE_ONLY);
    arm_at(&mut engine, 0.0);
    let out = engine.tick(near(30));
    assert!(out.actions.is_empty());
    assert_eq!(out.trace.reject_reason, RejectReason::GestureDisabled);
}

#[test]
fn all_angles_answers_outside_band() {
    let mut engine = engine(EnabledGestures {
        answer: true,
        answer_all_angles: true,
        decline: false,
    });
    arm_at(&mut engine, 170.0);
    let out = engine.tick(near(30));
    assert_eq!(
        out.actions.detection().map(|d| d.outcome),
        Some(GestureOutcome::Answer)
    );
}

#[test]
fn upright_sample_breaks_flip_run() {
    let mut engine = engine(DECLINE_ONLY);
    arm_at(&mut engine, 0.0);

    let _ = engine.tick(tilt(100, 175.0));
    let _ = engine.tick(tilt(200, 175.0));
    let upright = engine.tick(tilt(300, 0.0));
    assert_eq!(upright.trace.gesture_confirmations, 0);

    let restarted = engine.tick(tilt(450, 175.0));
    assert_eq!(restarted.trace.reject_reason, RejectReason::FlipNotSustained);
    assert_eq!(restarted.trace.gesture_confirmations, 1);
    assert!(engine.detection().is_none());
}

#[test]
fn held_flip_completes_on_proximity_sample() {
    let mut engine = engine(DECLINE_ONLY);
    arm_at(&mut engine, 0.0);

    let _ = engine.tick(tilt(100, 175.0));
    let second = engine.tick(tilt(150, 175.0));
    assert_eq!(second.trace.reject_reason, RejectReason::FlipNotSustained);

    let out = engine.tick(far(450));
    assert_eq!(
        out.actions.detection(),
        Some(Detection {
            outcome: GestureOutcome::Decline,
            confirmed_at_ms: 450,
        })
    );
}

#[test]
fn first_inclination_after_arming_becomes_reference() {
    let mut engine = engine(DECLINE_ONLY);
    let _ = engine.tick(far(10));
    let armed = engine.tick(far(20));
    assert_eq!(engine.phase(), SessionPhase::Armed);
    assert_eq!(armed.trace.reference_deg, None);

    let out = engine.tick(tilt(30, 20.0));
    assert_eq!(out.trace.reference_deg, Some(20));
    assert_eq!(out.trace.flip_delta_deg, 0);
}

#[test]
fn malformed_samples_are_ignored() {
    let mut engine = engine(ANSWER_ONLY);
    arm_at(&mut engine, 10.0);
    let before = engine.reading();

    let nan = engine.tick(SensorSample::Proximity {
        t_ms: 30,
        distance_cm: f32::NAN,
    });
    assert_eq!(nan.trace.reject_reason, RejectReason::IgnoredSample);
    let zero = engine.tick(SensorSample::Acceleration {
        t_ms: 40,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    });
    assert_eq!(zero.trace.reject_reason, RejectReason::IgnoredSample);

    assert_eq!(engine.reading(), before);
    assert_eq!(engine.phase(), SessionPhase::Armed);
}

#[test]
fn baseline_far_samples_emit_feedback_pulses() {
    let mut engine = engine(ANSWER_ONLY);
    let first = engine.tick(far(10));
    let second = engine.tick(far(20));
    assert_eq!(first.actions.feedback_events().count(), 1);
    assert_eq!(second.actions.feedback_events().count(), 1);
    assert!(second.actions.iter().any(|action| matches!(
        action,
        EngineAction::PhaseChanged {
            from: SessionPhase::AwaitingBaseline,
            to: SessionPhase::Armed
        }
    )));
}

#[test]
fn cancel_after_answer_keeps_the_outcome() {
    let mut engine = engine(ANSWER_ONLY);
    arm_at(&mut engine, 10.0);
    let answered = engine.tick(near(30));
    assert!(answered.actions.detection().is_some());

    let out = engine.cancel(40, CancelReason::CallEnded);
    assert!(out.actions.is_empty());
    assert_eq!(out.trace.reject_reason, RejectReason::Terminal);
    assert_eq!(engine.phase(), SessionPhase::Done(Some(GestureOutcome::Answer)));
    assert_eq!(engine.cancel_reason(), None);
    assert_eq!(
        engine.detection().map(|d| d.outcome),
        Some(GestureOutcome::Answer)
    );
}
