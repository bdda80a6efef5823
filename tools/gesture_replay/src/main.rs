use std::{
    env,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    process,
};

use earshot::gesture::{
    capabilities::EnabledGestures,
    config::{parse_tuning_file, GestureTuning},
    types::{EngineAction, GestureOutcome, SensorSample},
    GestureEngine, SignalNormalizer,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let mut trace_path: Option<PathBuf> = None;
    let mut tuning_path: Option<PathBuf> = None;
    let mut expect: Option<Option<GestureOutcome>> = None;
    let mut max_range_cm: Option<f32> = None;
    let mut gestures = EnabledGestures::default();
    let mut verbose = false;

    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--answer" => gestures.answer = true,
            "--all-angles" => gestures.answer_all_angles = true,
            "--decline" => gestures.decline = true,
            "--verbose" => verbose = true,
            "--tuning" => {
                idx += 1;
                let Some(path) = args.get(idx) else {
                    return Err("missing path after --tuning".into());
                };
                tuning_path = Some(PathBuf::from(path));
            }
            "--max-range" => {
                idx += 1;
                let Some(raw) = args.get(idx) else {
                    return Err("missing value after --max-range".into());
                };
                let range = raw
                    .parse::<f32>()
                    .map_err(|e| format!("invalid --max-range '{raw}': {e}"))?;
                max_range_cm = Some(range);
            }
            "--expect" => {
                idx += 1;
                let Some(raw) = args.get(idx) else {
                    return Err("missing outcome after --expect".into());
                };
                expect = Some(parse_outcome(raw)?);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown argument: {value}"));
            }
            value => {
                if trace_path.is_some() {
                    return Err("multiple trace paths provided".into());
                }
                trace_path = Some(PathBuf::from(value));
            }
        }
        idx += 1;
    }

    if gestures.answer_all_angles && !gestures.answer {
        return Err("--all-angles requires --answer".into());
    }
    if gestures.answer_all_angles && gestures.decline {
        eprintln!("note: decline is ignored while all-angles answer is active");
        gestures.decline = false;
    }
    if !gestures.answer && !gestures.decline {
        return Err("enable at least one of --answer, --decline".into());
    }

    let tuning = match tuning_path {
        Some(path) => parse_tuning_file(&path).map_err(|e| e.to_string())?,
        None => GestureTuning::default(),
    };
    let trace_path = trace_path.ok_or_else(usage)?;
    let samples = parse_trace(&trace_path)?;

    let normalizer =
        SignalNormalizer::from_max_range(max_range_cm, tuning.proximity.fallback_max_range_cm);
    let started_at_ms = samples.first().map_or(0, SensorSample::t_ms);
    let mut engine = GestureEngine::new(gestures, tuning, normalizer, started_at_ms);

    if verbose {
        println!("trace,ms,state,reason,proximity,inclination,reference,delta,resets,confirms");
    }
    let mut detected = None;
    for sample in &samples {
        let output = engine.tick(*sample);
        if verbose {
            let trace = output.trace;
            println!(
                "trace,{},{},{},{},{},{},{},{},{}",
                trace.now_ms,
                trace.state_id.as_u8(),
                trace.reject_reason.label(),
                trace.proximity.label(),
                fmt_deg(trace.inclination_deg),
                fmt_deg(trace.reference_deg),
                trace.flip_delta_deg,
                trace.reset_confirmations,
                trace.gesture_confirmations
            );
        }
        for action in output.actions.iter() {
            match action {
                EngineAction::PhaseChanged { from, to } => {
                    println!("phase,{},{},{}", output.trace.now_ms, from.label(), to.label());
                }
                EngineAction::Feedback(event) => {
                    println!("feedback,{},{:?}", output.trace.now_ms, event);
                }
                EngineAction::Detected(detection) => {
                    println!(
                        "detected,{},{}",
                        detection.confirmed_at_ms,
                        detection.outcome.label()
                    );
                    detected = Some(detection.outcome);
                }
            }
        }
    }

    if let Some(expected) = expect {
        if expected != detected {
            eprintln!("expected: {}", outcome_label(expected));
            eprintln!("actual:   {}", outcome_label(detected));
            return Err("detection mismatch".into());
        }
    }

    Ok(())
}

fn usage() -> String {
    "usage: gesture_replay <trace.csv> [--answer] [--all-angles] [--decline] \
     [--tuning gestures.toml] [--max-range cm] [--expect answer|decline|none] [--verbose]"
        .to_string()
}

fn parse_outcome(raw: &str) -> Result<Option<GestureOutcome>, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "answer" => Ok(Some(GestureOutcome::Answer)),
        "decline" => Ok(Some(GestureOutcome::Decline)),
        "none" => Ok(None),
        other => Err(format!("invalid expected outcome: {other}")),
    }
}

fn outcome_label(outcome: Option<GestureOutcome>) -> &'static str {
    outcome.map_or("none", GestureOutcome::label)
}

fn fmt_deg(deg: Option<i16>) -> String {
    deg.map_or_else(|| "-".to_string(), |deg| deg.to_string())
}

fn parse_trace(path: &Path) -> Result<Vec<SensorSample>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed == "sample,ms,kind,v0,v1,v2" {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').collect();
        if parts.len() < 4 {
            return Err(format!(
                "{}:{} invalid trace line, expected at least 4 columns",
                path.display(),
                line_no
            ));
        }
        if parts[0].trim() != "sample" {
            continue;
        }

        let t_ms = parts[1].trim().parse::<u64>().map_err(|e| {
            format!("{}:{} invalid ms '{}': {e}", path.display(), line_no, parts[1].trim())
        })?;
        let value = |idx: usize, field: &str| -> Result<f32, String> {
            let raw = parts.get(idx).map_or("", |raw| raw.trim());
            raw.parse::<f32>().map_err(|e| {
                format!("{}:{} invalid {field} '{raw}': {e}", path.display(), line_no)
            })
        };

        let sample = match parts[2].trim() {
            "prox" => SensorSample::Proximity {
                t_ms,
                distance_cm: value(3, "distance")?,
            },
            "accel" => SensorSample::Acceleration {
                t_ms,
                x: value(3, "x")?,
                y: value(4, "y")?,
                z: value(5, "z")?,
            },
            "mag" => SensorSample::MagneticField {
                t_ms,
                x: value(3, "x")?,
                y: value(4, "y")?,
                z: value(5, "z")?,
            },
            other => {
                return Err(format!(
                    "{}:{} unknown sample kind '{other}'",
                    path.display(),
                    line_no
                ));
            }
        };
        out.push(sample);
    }

    Ok(out)
}
