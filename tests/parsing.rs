use std::fs;
use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;

use clutch_props::error::NarrationError;
use clutch_props::fallback::generate_fallback;
use clutch_props::narration::{GenerationConstraints, NarrationRequest};
use clutch_props::roster::matchups;
use clutch_props::script::{ScriptSource, Winner, parse_script_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_narration_fixture() {
    let raw = read_fixture("narration_script.json");
    let script = parse_script_json(&raw).expect("fixture should parse");
    assert_eq!(script.len(), 8);
    assert_eq!(script.source, ScriptSource::Narrated);
    assert_eq!(script.plays[4].quarter, 4);
    assert_eq!(script.plays[4].index, 4);
    assert_eq!(script.plays[6].involved, vec!["Saquon Barkley".to_string()]);
    assert_eq!(script.summary.winner, Winner::Home);
    assert_eq!(script.summary.stat_lines.len(), 2);
}

#[test]
fn rejects_quarter_past_four() {
    let raw = read_fixture("narration_bad_quarter.json");
    let err = parse_script_json(&raw).expect_err("quarter 5 must be rejected");
    assert!(matches!(err, NarrationError::Shape(_)), "{err}");
}

#[test]
fn rejects_non_array_body() {
    let err = parse_script_json(r#"{"plays": []}"#).expect_err("object body must be rejected");
    assert!(matches!(err, NarrationError::Malformed(_)), "{err}");
}

#[test]
fn fallback_output_passes_narration_validation() {
    let matchup = matchups().remove(3);
    let tracked = matchup.default_tracked().expect("catalog teams have players");
    let request = NarrationRequest {
        matchup,
        tracked,
        constraints: GenerationConstraints::default(),
        model: None,
    };
    let script = generate_fallback(&request, &mut StdRng::seed_from_u64(2026));
    let body = serde_json::to_string(&script.to_records()).expect("records serialize");
    let parsed = parse_script_json(&body).expect("fallback script should validate");
    assert_eq!(parsed.plays, script.plays);
    assert_eq!(parsed.summary, script.summary);
}
