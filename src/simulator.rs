//! Tick-driven coordinator for one run at a time.
//!
//! `Simulator` owns the only copy of per-run state (script, accumulators,
//! clutch latches, prediction windows) inside a `RunSession`. A new `start`
//! replaces the session wholesale. Time is passed in by the caller, so the
//! whole state machine can be exercised without sleeping:
//!
//! ```text
//! Idle --start--> Generating --install_script--> Running --(script exhausted)--> Ended
//!                      \                             \
//!                       `------------stop-------------`--> Stopped
//! ```
//!
//! `Generating` is the part of Running spent waiting on the script; it
//! rejects a second `start` the same way.

use std::sync::mpsc::Sender;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use crate::clutch::{ClutchTrigger, PredictionBook, PredictionRecord, clutch_threshold};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::narration::{GenerationConstraints, NarrationRequest};
use crate::outcome::{PropOutcome, resolve_prop};
use crate::props::{PropLine, generate_prop};
use crate::roster::{Matchup, Player};
use crate::script::{FinalSummary, GameScript, ScriptSource};
use crate::stat_parser::{StatLine, apply_play};
use crate::state::Delta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Generating,
    Running,
    Ended,
    Stopped,
}

impl RunPhase {
    pub fn is_active(self) -> bool {
        matches!(self, RunPhase::Generating | RunPhase::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunPhase::Idle => "IDLE",
            RunPhase::Generating => "GENERATING",
            RunPhase::Running => "RUNNING",
            RunPhase::Ended => "ENDED",
            RunPhase::Stopped => "STOPPED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedState {
    pub prop: PropLine,
    pub stats: StatLine,
    pub trigger: ClutchTrigger,
}

impl TrackedState {
    fn new(prop: PropLine) -> Self {
        Self {
            prop,
            stats: StatLine::default(),
            trigger: ClutchTrigger::default(),
        }
    }

    pub fn current(&self) -> f64 {
        self.stats.value(self.prop.category)
    }

    fn snapshot(&self) -> TrackedSnapshot {
        TrackedSnapshot {
            prop: self.prop.clone(),
            stats: self.stats,
            current: self.current(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSnapshot {
    pub prop: PropLine,
    pub stats: StatLine,
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOutcome {
    pub prop: PropLine,
    pub stats: StatLine,
    pub final_value: f64,
    pub outcome: PropOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: u64,
    pub summary: FinalSummary,
    pub source: ScriptSource,
    pub players: Vec<PlayerOutcome>,
    pub predictions: Vec<PredictionRecord>,
    pub total_score_delta: i32,
    pub ended_at: DateTime<Utc>,
}

/// Handed back by `start`; whoever produces the script must return it with
/// the same `run_id`.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub run_id: u64,
    pub narration: NarrationRequest,
}

#[derive(Debug)]
pub struct RunSession {
    pub run_id: u64,
    pub matchup: Matchup,
    pub tracked: [TrackedState; 2],
    pub script: Option<GameScript>,
    pub cursor: usize,
    pub book: PredictionBook,
}

impl RunSession {
    pub fn tracked_for(&self, name: &str) -> Option<&TrackedState> {
        self.tracked.iter().find(|t| t.prop.player.name == name)
    }

    fn snapshots(&self) -> Vec<TrackedSnapshot> {
        self.tracked.iter().map(TrackedState::snapshot).collect()
    }
}

pub struct Simulator {
    cfg: SimConfig,
    tx: Sender<Delta>,
    phase: RunPhase,
    last_run_id: u64,
    last_window_id: u64,
    session: Option<RunSession>,
    next_tick_at: Option<Instant>,
    last_report: Option<RunReport>,
}

impl Simulator {
    pub fn new(cfg: SimConfig, tx: Sender<Delta>) -> Self {
        Self {
            cfg,
            tx,
            phase: RunPhase::Idle,
            last_run_id: 0,
            last_window_id: 0,
            session: None,
            next_tick_at: None,
            last_report: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn run_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.run_id)
    }

    pub fn session(&self) -> Option<&RunSession> {
        self.session.as_ref()
    }

    pub fn next_tick_at(&self) -> Option<Instant> {
        self.next_tick_at
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Draws a prop for each tracked player, then begins a run.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        matchup: Matchup,
        tracked: [Player; 2],
        rng: &mut R,
    ) -> Result<ScriptRequest, SimError> {
        if self.phase.is_active() {
            return Err(SimError::AlreadyRunning);
        }
        let [a, b] = tracked;
        let props = [generate_prop(&a, rng), generate_prop(&b, rng)];
        self.start_with_props(matchup, props)
    }

    pub fn start_with_props(
        &mut self,
        matchup: Matchup,
        props: [PropLine; 2],
    ) -> Result<ScriptRequest, SimError> {
        if self.phase.is_active() {
            return Err(SimError::AlreadyRunning);
        }
        for prop in &props {
            if !matchup.all_players().any(|p| *p == prop.player) {
                return Err(SimError::UnknownPlayer(prop.player.name.clone()));
            }
        }

        self.last_run_id += 1;
        let run_id = self.last_run_id;
        let narration = NarrationRequest {
            matchup: matchup.clone(),
            tracked: [props[0].player.clone(), props[1].player.clone()],
            constraints: GenerationConstraints::with_budget(self.cfg.play_budget),
            model: self.cfg.narration_model.clone(),
        };
        let prop_list = props.to_vec();
        let [a, b] = props;

        self.session = Some(RunSession {
            run_id,
            matchup: matchup.clone(),
            tracked: [TrackedState::new(a), TrackedState::new(b)],
            script: None,
            cursor: 0,
            book: PredictionBook::default(),
        });
        self.phase = RunPhase::Generating;
        self.next_tick_at = None;
        self.last_report = None;

        info!(run_id, matchup = %matchup.label(), "run started");
        let _ = self.tx.send(Delta::RunStarted {
            run_id,
            matchup,
            props: prop_list,
        });
        Ok(ScriptRequest { run_id, narration })
    }

    /// Hands a generated script to the run that asked for it. Scripts for any
    /// other run, or arriving after a stop, are dropped.
    pub fn install_script(&mut self, run_id: u64, script: GameScript, now: Instant) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if self.phase != RunPhase::Generating || session.run_id != run_id {
            debug!(run_id, current = session.run_id, "discarding stale script");
            return false;
        }

        let plays = script.len();
        let source = script.source;
        session.script = Some(script);
        session.cursor = 0;
        self.phase = RunPhase::Running;
        self.next_tick_at = Some(now + self.cfg.tick_interval);

        info!(run_id, plays, source = source.label(), "script installed");
        let _ = self.tx.send(Delta::ScriptReady {
            run_id,
            plays,
            source,
        });
        true
    }

    /// Consumes at most one play when the scheduled tick is due.
    pub fn tick(&mut self, now: Instant) {
        if self.phase != RunPhase::Running {
            return;
        }
        let Some(due) = self.next_tick_at else {
            return;
        };
        if now < due {
            return;
        }

        self.step(now);

        if self.phase == RunPhase::Running {
            let mut next = due + self.cfg.tick_interval;
            if next <= now {
                next = now + self.cfg.tick_interval;
            }
            self.next_tick_at = Some(next);
        }
    }

    /// Stops the active run without settling predictions. Repeat calls and
    /// calls with nothing running are no-ops.
    pub fn stop(&mut self) -> bool {
        if !self.phase.is_active() {
            return false;
        }
        self.phase = RunPhase::Stopped;
        self.next_tick_at = None;
        let run_id = self.run_id().unwrap_or_default();
        info!(run_id, "run stopped, open predictions left unresolved");
        let _ = self.tx.send(Delta::RunStopped { run_id });
        true
    }

    pub fn submit_prediction(
        &mut self,
        window_id: u64,
        predicted: PropOutcome,
        now: Instant,
    ) -> Result<PredictionRecord, SimError> {
        if self.phase != RunPhase::Running {
            return Err(SimError::InvalidWindow(window_id));
        }
        let session = self
            .session
            .as_mut()
            .ok_or(SimError::InvalidWindow(window_id))?;
        let run_id = session.run_id;
        let record = session.book.submit(window_id, predicted, now)?.clone();

        info!(run_id, window_id, predicted = predicted.label(), "prediction placed");
        let _ = self.tx.send(Delta::PredictionPlaced {
            run_id,
            window_id,
            predicted,
        });
        Ok(record)
    }

    fn step(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(script) = session.script.as_ref() else {
            return;
        };
        let Some(play) = script.plays.get(session.cursor).cloned() else {
            self.end_run();
            return;
        };

        let mut involved = [false; 2];
        for (slot, tracked) in session.tracked.iter_mut().enumerate() {
            if play.involved.iter().any(|name| *name == tracked.prop.player.name) {
                tracked.stats = apply_play(&tracked.stats, &play.description);
                involved[slot] = true;
            }
        }

        let _ = self.tx.send(Delta::PlayObserved {
            run_id: session.run_id,
            index: session.cursor,
            play: play.clone(),
            tracked: session.snapshots(),
        });

        for (slot, tracked) in session.tracked.iter_mut().enumerate() {
            if !involved[slot] {
                continue;
            }
            let threshold = clutch_threshold(&tracked.prop, self.cfg.clutch_fraction);
            if !tracked.trigger.check(play.quarter, tracked.current(), threshold) {
                continue;
            }

            self.last_window_id += 1;
            let window_id = self.last_window_id;
            let window = session.book.open(
                window_id,
                session.run_id,
                &tracked.prop,
                now,
                self.cfg.window_duration,
            );

            info!(
                run_id = session.run_id,
                window_id,
                player = %tracked.prop.player.name,
                "clutch moment, prediction window open"
            );
            let _ = self.tx.send(Delta::ClutchTriggered {
                run_id: session.run_id,
                player: tracked.prop.player.name.clone(),
                prop: tracked.prop.clone(),
            });
            let _ = self.tx.send(Delta::PredictionWindowOpened {
                run_id: session.run_id,
                window_id,
                prop: window.prop.clone(),
                closes_at: window.closes_at,
            });
        }

        session.cursor += 1;
        if session.cursor >= script.len() {
            self.end_run();
        }
    }

    fn end_run(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(script) = session.script.as_ref() else {
            return;
        };
        self.phase = RunPhase::Ended;
        self.next_tick_at = None;

        let tracked = &session.tracked;
        let settled = session.book.resolve_all(|prop| {
            tracked
                .iter()
                .find(|t| t.prop.player == prop.player)
                .map(|t| t.stats.value(prop.category))
                .unwrap_or(0.0)
        });
        for record in &settled {
            let _ = self.tx.send(Delta::PredictionResolved(record.clone()));
        }

        let players = tracked
            .iter()
            .map(|t| {
                let final_value = t.current();
                PlayerOutcome {
                    prop: t.prop.clone(),
                    stats: t.stats,
                    final_value,
                    outcome: resolve_prop(&t.prop, final_value),
                }
            })
            .collect();
        let predictions = session.book.records();
        let total_score_delta = predictions.iter().filter_map(|r| r.score_delta).sum();

        let report = RunReport {
            run_id: session.run_id,
            summary: script.summary.clone(),
            source: script.source,
            players,
            predictions,
            total_score_delta,
            ended_at: Utc::now(),
        };
        info!(
            run_id = report.run_id,
            home = report.summary.home_score,
            away = report.summary.away_score,
            total_score_delta,
            "run ended"
        );
        let _ = self.tx.send(Delta::RunEnded(report.clone()));
        self.last_report = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{Direction, StatCategory};
    use crate::roster::matchups;
    use crate::script::{PlayEvent, Winner};
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(800);

    fn setup() -> (Simulator, Receiver<Delta>, Matchup) {
        let (tx, rx) = mpsc::channel();
        let sim = Simulator::new(SimConfig::default(), tx);
        (sim, rx, matchups().remove(0))
    }

    fn props(matchup: &Matchup) -> [PropLine; 2] {
        let [a, b] = matchup.default_tracked().unwrap();
        [
            PropLine {
                player: a,
                category: StatCategory::PassingYards,
                line: 24.5,
                direction: Direction::Over,
            },
            PropLine {
                player: b,
                category: StatCategory::RushingYards,
                line: 9.5,
                direction: Direction::Under,
            },
        ]
    }

    fn play(quarter: u8, description: &str, involved: &str) -> PlayEvent {
        PlayEvent {
            index: 0,
            quarter,
            clock: "10:00".to_string(),
            description: description.to_string(),
            involved: vec![involved.to_string()],
            home_score: 0,
            away_score: 0,
        }
    }

    fn script(plays: Vec<PlayEvent>) -> GameScript {
        GameScript {
            plays,
            summary: FinalSummary {
                home_score: 0,
                away_score: 0,
                winner: Winner::Tie,
                stat_lines: Vec::new(),
            },
            source: ScriptSource::Fallback,
        }
    }

    fn run_to_end(sim: &mut Simulator, t0: Instant) {
        for k in 1..200 {
            sim.tick(t0 + TICK * k);
            if sim.phase() != RunPhase::Running {
                break;
            }
        }
    }

    #[test]
    fn second_start_is_rejected_while_active() {
        let (mut sim, _rx, m) = setup();
        sim.start_with_props(m.clone(), props(&m)).unwrap();
        assert_eq!(
            sim.start_with_props(m.clone(), props(&m)).map(|r| r.run_id),
            Err(SimError::AlreadyRunning)
        );
        assert_eq!(sim.phase(), RunPhase::Generating);
    }

    #[test]
    fn stale_script_is_discarded() {
        let (mut sim, _rx, m) = setup();
        let first = sim.start_with_props(m.clone(), props(&m)).unwrap();
        sim.stop();
        let second = sim.start_with_props(m.clone(), props(&m)).unwrap();
        assert!(second.run_id > first.run_id);

        let t0 = Instant::now();
        let s = script(vec![play(1, "Mahomes pass for 5 yards", "Patrick Mahomes")]);
        assert!(!sim.install_script(first.run_id, s.clone(), t0));
        assert_eq!(sim.phase(), RunPhase::Generating);
        assert!(sim.install_script(second.run_id, s, t0));
        assert_eq!(sim.phase(), RunPhase::Running);
    }

    #[test]
    fn script_after_stop_is_discarded() {
        let (mut sim, _rx, m) = setup();
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        assert!(sim.stop());
        let s = script(vec![play(1, "Mahomes pass for 5 yards", "Patrick Mahomes")]);
        assert!(!sim.install_script(req.run_id, s, Instant::now()));
        assert_eq!(sim.phase(), RunPhase::Stopped);
    }

    #[test]
    fn tick_waits_for_cadence() {
        let (mut sim, _rx, m) = setup();
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        let t0 = Instant::now();
        sim.install_script(
            req.run_id,
            script(vec![
                play(1, "Mahomes pass for 5 yards", "Patrick Mahomes"),
                play(1, "Mahomes pass for 7 yards", "Patrick Mahomes"),
            ]),
            t0,
        );
        sim.tick(t0 + Duration::from_millis(100));
        assert_eq!(sim.session().unwrap().cursor, 0);
        sim.tick(t0 + TICK);
        assert_eq!(sim.session().unwrap().cursor, 1);
        sim.tick(t0 + TICK + Duration::from_millis(10));
        assert_eq!(sim.session().unwrap().cursor, 1);
    }

    #[test]
    fn only_involved_players_accumulate() {
        let (mut sim, _rx, m) = setup();
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        let t0 = Instant::now();
        sim.install_script(
            req.run_id,
            script(vec![
                play(1, "Mahomes pass for 12 yards", "Patrick Mahomes"),
                play(2, "Cook rushes for 4 yards", "James Cook"),
                play(2, "Pacheco rushes for 30 yards", "Isiah Pacheco"),
            ]),
            t0,
        );
        run_to_end(&mut sim, t0);
        let report = sim.last_report().unwrap();
        assert_eq!(report.players[0].stats.passing_yards, 12);
        assert_eq!(report.players[1].stats.rushing_yards, 4);
        assert_eq!(report.players[0].outcome, PropOutcome::Miss);
        assert_eq!(report.players[1].outcome, PropOutcome::Hit);
    }

    #[test]
    fn clutch_fires_once_per_player_in_fourth() {
        let (mut sim, rx, m) = setup();
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        let t0 = Instant::now();
        let mut plays = vec![play(3, "Mahomes pass for 12 yards", "Patrick Mahomes")];
        for _ in 0..6 {
            plays.push(play(4, "Mahomes pass for 12 yards", "Patrick Mahomes"));
            plays.push(play(4, "Cook rushes for 3 yards", "James Cook"));
        }
        sim.install_script(req.run_id, script(plays), t0);
        run_to_end(&mut sim, t0);

        let clutch: Vec<String> = rx
            .try_iter()
            .filter_map(|d| match d {
                Delta::ClutchTriggered { player, .. } => Some(player),
                _ => None,
            })
            .collect();
        assert_eq!(clutch, vec!["Patrick Mahomes".to_string(), "James Cook".to_string()]);
        assert_eq!(sim.session().unwrap().book.windows().len(), 2);
    }

    #[test]
    fn clutch_fraction_delays_trigger() {
        let (tx, _rx) = mpsc::channel();
        let cfg = SimConfig {
            clutch_fraction: 0.8,
            ..SimConfig::default()
        };
        let mut sim = Simulator::new(cfg, tx);
        let m = matchups().remove(0);
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        let t0 = Instant::now();
        sim.install_script(
            req.run_id,
            script(vec![
                play(4, "Mahomes pass for 10 yards", "Patrick Mahomes"),
                play(4, "Mahomes pass for 10 yards", "Patrick Mahomes"),
                play(4, "Mahomes pass for 10 yards", "Patrick Mahomes"),
            ]),
            t0,
        );
        sim.tick(t0 + TICK);
        assert!(!sim.session().unwrap().tracked[0].trigger.fired());
        sim.tick(t0 + TICK * 2);
        assert!(sim.session().unwrap().tracked[0].trigger.fired());
    }

    #[test]
    fn submit_rejected_when_not_running() {
        let (mut sim, _rx, _m) = setup();
        assert_eq!(
            sim.submit_prediction(1, PropOutcome::Hit, Instant::now()),
            Err(SimError::InvalidWindow(1))
        );
        assert_eq!(sim.phase(), RunPhase::Idle);
    }

    #[test]
    fn stop_is_idempotent_and_cancels_ticks() {
        let (mut sim, rx, m) = setup();
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        let t0 = Instant::now();
        sim.install_script(
            req.run_id,
            script(vec![play(1, "Mahomes pass for 5 yards", "Patrick Mahomes")]),
            t0,
        );
        assert!(sim.stop());
        assert!(!sim.stop());
        assert!(sim.next_tick_at().is_none());
        sim.tick(t0 + TICK * 5);
        assert_eq!(sim.session().unwrap().cursor, 0);
        assert!(sim.last_report().is_none());
        let stopped = rx
            .try_iter()
            .filter(|d| matches!(d, Delta::RunStopped { .. }))
            .count();
        assert_eq!(stopped, 1);
    }

    #[test]
    fn restart_discards_prior_run() {
        let (mut sim, _rx, m) = setup();
        let req = sim.start_with_props(m.clone(), props(&m)).unwrap();
        let t0 = Instant::now();
        sim.install_script(
            req.run_id,
            script(vec![play(4, "Mahomes pass for 50 yards", "Patrick Mahomes")]),
            t0,
        );
        run_to_end(&mut sim, t0);
        assert_eq!(sim.phase(), RunPhase::Ended);

        sim.start_with_props(m.clone(), props(&m)).unwrap();
        let session = sim.session().unwrap();
        assert!(session.script.is_none());
        assert_eq!(session.tracked[0].stats, StatLine::default());
        assert!(!session.tracked[0].trigger.fired());
        assert!(session.book.windows().is_empty());
        assert!(sim.last_report().is_none());
    }

    #[test]
    fn unknown_player_is_rejected() {
        let (mut sim, _rx, m) = setup();
        let mut p = props(&m);
        p[1].player.name = "Nobody".to_string();
        assert_eq!(
            sim.start_with_props(m, p).map(|r| r.run_id),
            Err(SimError::UnknownPlayer("Nobody".to_string()))
        );
        assert_eq!(sim.phase(), RunPhase::Idle);
    }
}
