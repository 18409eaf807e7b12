use std::collections::VecDeque;
use std::time::Instant;

use crate::clutch::PredictionRecord;
use crate::outcome::PropOutcome;
use crate::props::{Direction, PropLine};
use crate::roster::{Matchup, Player};
use crate::script::{PlayEvent, ScriptSource};
use crate::simulator::{RunPhase, RunReport, TrackedSnapshot};

const LOG_CAPACITY: usize = 200;
const TAPE_CAPACITY: usize = 64;

/// Everything the simulation emits, in the order it happens.
#[derive(Debug, Clone)]
pub enum Delta {
    RunStarted {
        run_id: u64,
        matchup: Matchup,
        props: Vec<PropLine>,
    },
    ScriptReady {
        run_id: u64,
        plays: usize,
        source: ScriptSource,
    },
    PlayObserved {
        run_id: u64,
        index: usize,
        play: PlayEvent,
        tracked: Vec<TrackedSnapshot>,
    },
    ClutchTriggered {
        run_id: u64,
        player: String,
        prop: PropLine,
    },
    PredictionWindowOpened {
        run_id: u64,
        window_id: u64,
        prop: PropLine,
        closes_at: Instant,
    },
    PredictionPlaced {
        run_id: u64,
        window_id: u64,
        predicted: PropOutcome,
    },
    PredictionResolved(PredictionRecord),
    RunEnded(RunReport),
    RunStopped {
        run_id: u64,
    },
    CommandRejected(String),
    Log(String),
}

#[derive(Debug, Clone)]
pub enum SimCommand {
    Start {
        matchup: Matchup,
        tracked: [Player; 2],
    },
    Stop,
    SubmitPrediction {
        window_id: u64,
        predicted: PropOutcome,
    },
    /// Over/under pick, mapped to hit/miss against the window's prop.
    SubmitPick {
        window_id: u64,
        pick: Direction,
    },
}

#[derive(Debug, Clone)]
pub struct WindowView {
    pub window_id: u64,
    pub prop: PropLine,
    pub closes_at: Instant,
    pub predicted: Option<PropOutcome>,
}

#[derive(Debug)]
pub struct AppState {
    pub phase: RunPhase,
    pub run_id: Option<u64>,
    pub matchup: Option<Matchup>,
    pub props: Vec<PropLine>,
    pub tracked: Vec<TrackedSnapshot>,
    pub tape: VecDeque<PlayEvent>,
    pub script_source: Option<ScriptSource>,
    pub script_len: usize,
    pub windows: Vec<WindowView>,
    pub resolved: Vec<PredictionRecord>,
    pub report: Option<RunReport>,
    /// Sum of prediction deltas over every finished run this session.
    pub score_total: i32,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            run_id: None,
            matchup: None,
            props: Vec::new(),
            tracked: Vec::new(),
            tape: VecDeque::with_capacity(TAPE_CAPACITY),
            script_source: None,
            script_len: 0,
            windows: Vec::new(),
            resolved: Vec::new(),
            report: None,
            score_total: 0,
            logs: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(msg.into());
    }

    pub fn last_play(&self) -> Option<&PlayEvent> {
        self.tape.back()
    }

    /// Newest window that is still open and has no prediction yet.
    pub fn open_window(&self, now: Instant) -> Option<&WindowView> {
        self.windows
            .iter()
            .rev()
            .find(|w| w.predicted.is_none() && now < w.closes_at)
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.run_id == Some(run_id)
    }

    fn reset_for_run(&mut self, run_id: u64, matchup: Matchup, props: Vec<PropLine>) {
        self.phase = RunPhase::Generating;
        self.run_id = Some(run_id);
        self.matchup = Some(matchup);
        self.props = props;
        self.tracked.clear();
        self.tape.clear();
        self.script_source = None;
        self.script_len = 0;
        self.windows.clear();
        self.resolved.clear();
        self.report = None;
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::RunStarted {
            run_id,
            matchup,
            props,
        } => {
            state.push_log(format!("[INFO] Run {run_id} started: {}", matchup.label()));
            for prop in &props {
                state.push_log(format!("[INFO] Prop: {prop}"));
            }
            state.reset_for_run(run_id, matchup, props);
        }
        Delta::ScriptReady {
            run_id,
            plays,
            source,
        } => {
            if !state.is_current(run_id) {
                return;
            }
            state.phase = RunPhase::Running;
            state.script_source = Some(source);
            state.script_len = plays;
            state.push_log(format!("[INFO] Script ready: {plays} plays ({})", source.label()));
        }
        Delta::PlayObserved {
            run_id,
            play,
            tracked,
            ..
        } => {
            if !state.is_current(run_id) {
                return;
            }
            if state.tape.len() == TAPE_CAPACITY {
                state.tape.pop_front();
            }
            state.tape.push_back(play);
            state.tracked = tracked;
        }
        Delta::ClutchTriggered {
            run_id,
            player,
            prop,
        } => {
            if state.is_current(run_id) {
                state.push_log(format!("[ALERT] Clutch moment: {player} ({prop})"));
            }
        }
        Delta::PredictionWindowOpened {
            run_id,
            window_id,
            prop,
            closes_at,
        } => {
            if !state.is_current(run_id) {
                return;
            }
            state.windows.push(WindowView {
                window_id,
                prop,
                closes_at,
                predicted: None,
            });
        }
        Delta::PredictionPlaced {
            run_id,
            window_id,
            predicted,
        } => {
            if !state.is_current(run_id) {
                return;
            }
            if let Some(window) = state.windows.iter_mut().find(|w| w.window_id == window_id) {
                window.predicted = Some(predicted);
            }
            state.push_log(format!(
                "[INFO] Prediction {} placed on window {window_id}",
                predicted.label()
            ));
        }
        Delta::PredictionResolved(record) => {
            if !state.is_current(record.run_id) {
                return;
            }
            state.resolved.push(record);
        }
        Delta::RunEnded(report) => {
            if !state.is_current(report.run_id) {
                return;
            }
            state.phase = RunPhase::Ended;
            state.score_total += report.total_score_delta;
            state.push_log(format!(
                "[INFO] Final: {} - {} ({:+} pts)",
                report.summary.home_score, report.summary.away_score, report.total_score_delta
            ));
            for player in &report.players {
                state.push_log(format!(
                    "[INFO] {} finished at {} -> {}",
                    player.prop,
                    player.final_value,
                    player.outcome.label()
                ));
            }
            state.report = Some(report);
        }
        Delta::RunStopped { run_id } => {
            if state.is_current(run_id) {
                state.phase = RunPhase::Stopped;
                state.push_log(format!("[WARN] Run {run_id} stopped"));
            }
        }
        Delta::CommandRejected(msg) => state.push_log(format!("[WARN] {msg}")),
        Delta::Log(msg) => state.push_log(msg),
    }
}
