//! Landmark recordings on disk.

mod common;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use common::squat_frame;
use fitvision::config::AnalysisConfig;
use fitvision::exercise::ExerciseKind;
use fitvision::pose::LandmarkFrame;
use fitvision::session::{Mode, SessionRunner};
use fitvision::source::{JsonlSource, SourceError};

fn to_line(frame: &LandmarkFrame) -> String {
    let landmarks: Vec<[f32; 4]> = frame
        .landmarks()
        .iter()
        .map(|l| [l.x, l.y, l.z, l.visibility])
        .collect();
    serde_json::json!({
        "index": frame.index(),
        "timestamp_ms": frame.timestamp_ms(),
        "landmarks": landmarks,
    })
    .to_string()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("fitvision-{}-{}.jsonl", name, std::process::id()))
}

#[test]
fn recording_round_trip_counts_reps() {
    let path = temp_path("squats");
    {
        let mut file = fs::File::create(&path).unwrap();
        for i in 0..60 {
            writeln!(file, "{}", to_line(&squat_frame(i))).unwrap();
        }
    }

    let mut source = JsonlSource::open(&path).unwrap();
    let mut runner = SessionRunner::new(Mode::Fixed(ExerciseKind::Squat), &AnalysisConfig::default()).unwrap();
    let (results, summary) = runner.run_to_vec(&mut source).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(results.len(), 60);
    assert_eq!(summary.total_reps(), 3);
}

#[test]
fn missing_file_is_io_error() {
    let path = temp_path("does-not-exist");
    assert!(matches!(JsonlSource::open(&path), Err(SourceError::Io(_))));
}
