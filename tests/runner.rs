use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use clutch_props::config::SimConfig;
use clutch_props::error::NarrationError;
use clutch_props::narration::{NarrationRequest, NarrationSource};
use clutch_props::roster::{Matchup, find_team};
use clutch_props::runner::spawn_with_source;
use clutch_props::script::ScriptSource;
use clutch_props::state::{Delta, SimCommand};

struct FixtureNarrator(String);

impl NarrationSource for FixtureNarrator {
    fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
        Ok(self.0.clone())
    }
}

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fast_config() -> SimConfig {
    SimConfig {
        tick_interval: Duration::from_millis(50),
        seed: Some(5),
        ..SimConfig::default()
    }
}

fn start_command() -> SimCommand {
    let matchup = Matchup {
        home: find_team("PHI").expect("PHI"),
        away: find_team("SF").expect("SF"),
    };
    let tracked = [
        matchup.home.player("Saquon Barkley").expect("Barkley").clone(),
        matchup.away.player("Brock Purdy").expect("Purdy").clone(),
    ];
    SimCommand::Start { matchup, tracked }
}

fn collect_until<F>(rx: &Receiver<Delta>, limit: Duration, mut done: F) -> Vec<Delta>
where
    F: FnMut(&Delta) -> bool,
{
    let deadline = Instant::now() + limit;
    let mut out = Vec::new();
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(delta) => {
                let stop = done(&delta);
                out.push(delta);
                if stop {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    out
}

#[test]
fn narrated_run_plays_to_completion() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let narrator: Arc<dyn NarrationSource> =
        Arc::new(FixtureNarrator(read_fixture("narration_script.json")));
    let handle = spawn_with_source(tx, cmd_rx, fast_config(), Some(narrator));

    cmd_tx.send(start_command()).expect("runner alive");
    cmd_tx.send(start_command()).expect("runner alive");

    let deltas = collect_until(&rx, Duration::from_secs(10), |d| {
        matches!(d, Delta::RunEnded(_))
    });

    let rejected = deltas
        .iter()
        .filter(|d| matches!(d, Delta::CommandRejected(_)))
        .count();
    assert_eq!(rejected, 1, "second start must be rejected");
    assert!(deltas.iter().any(|d| matches!(
        d,
        Delta::ScriptReady {
            plays: 8,
            source: ScriptSource::Narrated,
            ..
        }
    )));
    let observed: Vec<usize> = deltas
        .iter()
        .filter_map(|d| match d {
            Delta::PlayObserved { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(observed, (0..8).collect::<Vec<_>>());
    assert!(matches!(deltas.last(), Some(Delta::RunEnded(_))));

    drop(cmd_tx);
    handle.join().expect("runner thread exits cleanly");
}

#[test]
fn stop_halts_a_fallback_run() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let handle = spawn_with_source(tx, cmd_rx, fast_config(), None);

    cmd_tx.send(start_command()).expect("runner alive");
    let before = collect_until(&rx, Duration::from_secs(10), |d| {
        matches!(d, Delta::PlayObserved { index: 2, .. })
    });
    assert!(before.iter().any(|d| matches!(
        d,
        Delta::ScriptReady {
            source: ScriptSource::Fallback,
            ..
        }
    )));

    cmd_tx.send(SimCommand::Stop).expect("runner alive");
    cmd_tx.send(SimCommand::Stop).expect("runner alive");
    let after = collect_until(&rx, Duration::from_millis(600), |_| false);

    let stopped = after
        .iter()
        .filter(|d| matches!(d, Delta::RunStopped { .. }))
        .count();
    assert_eq!(stopped, 1);
    let stop_pos = after
        .iter()
        .position(|d| matches!(d, Delta::RunStopped { .. }))
        .expect("stop delta");
    assert!(
        after[stop_pos..]
            .iter()
            .all(|d| !matches!(d, Delta::PlayObserved { .. } | Delta::RunEnded(_)))
    );

    drop(cmd_tx);
    handle.join().expect("runner thread exits cleanly");
}
