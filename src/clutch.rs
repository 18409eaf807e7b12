use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::outcome::{PropOutcome, prediction_score_delta, resolve_prop};
use crate::props::{Direction, PropLine, StatCategory};
use crate::script::FINAL_QUARTER;

/// One-shot latch per tracked player per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClutchTrigger {
    fired: bool,
}

impl ClutchTrigger {
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// True exactly once: the first fourth-quarter check where `value`
    /// reaches `threshold`. Never rechecked after firing.
    pub fn check(&mut self, quarter: u8, value: f64, threshold: f64) -> bool {
        if self.fired || quarter != FINAL_QUARTER {
            return false;
        }
        if value >= threshold {
            self.fired = true;
            return true;
        }
        false
    }
}

pub fn clutch_threshold(prop: &PropLine, fraction: f64) -> f64 {
    prop.line * fraction
}

/// Maps an over/under pick onto a hit/miss call for `prop`.
pub fn pick_to_outcome(prop: &PropLine, pick: Direction) -> PropOutcome {
    if pick == prop.direction {
        PropOutcome::Hit
    } else {
        PropOutcome::Miss
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    Unresolved,
    Resolved { actual: PropOutcome },
    /// The window closed without a prediction; settled with no score change.
    Lapsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub window_id: u64,
    pub run_id: u64,
    pub player: String,
    pub category: StatCategory,
    pub line: f64,
    pub direction: Direction,
    pub predicted: Option<PropOutcome>,
    pub status: PredictionStatus,
    pub score_delta: Option<i32>,
}

impl PredictionRecord {
    pub fn is_correct(&self) -> Option<bool> {
        match (self.predicted, self.status) {
            (Some(predicted), PredictionStatus::Resolved { actual }) => Some(predicted == actual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionWindow {
    pub id: u64,
    /// Prop as it stood when the clutch moment fired.
    pub prop: PropLine,
    pub opened_at: Instant,
    pub closes_at: Instant,
    pub record: PredictionRecord,
}

impl PredictionWindow {
    pub fn is_open(&self, now: Instant) -> bool {
        now < self.closes_at
    }
}

#[derive(Debug, Default)]
pub struct PredictionBook {
    windows: Vec<PredictionWindow>,
}

impl PredictionBook {
    pub fn open(
        &mut self,
        id: u64,
        run_id: u64,
        prop: &PropLine,
        now: Instant,
        duration: Duration,
    ) -> &PredictionWindow {
        let window = PredictionWindow {
            id,
            prop: prop.clone(),
            opened_at: now,
            closes_at: now + duration,
            record: PredictionRecord {
                window_id: id,
                run_id,
                player: prop.player.name.clone(),
                category: prop.category,
                line: prop.line,
                direction: prop.direction,
                predicted: None,
                status: PredictionStatus::Unresolved,
                score_delta: None,
            },
        };
        self.windows.push(window);
        &self.windows[self.windows.len() - 1]
    }

    pub fn submit(
        &mut self,
        window_id: u64,
        predicted: PropOutcome,
        now: Instant,
    ) -> Result<&PredictionRecord, SimError> {
        let window = self
            .windows
            .iter_mut()
            .find(|w| w.id == window_id)
            .ok_or(SimError::InvalidWindow(window_id))?;
        if !window.is_open(now) || window.record.status != PredictionStatus::Unresolved {
            return Err(SimError::InvalidWindow(window_id));
        }
        if window.record.predicted.is_some() {
            return Err(SimError::PredictionAlreadyPlaced(window_id));
        }
        window.record.predicted = Some(predicted);
        Ok(&window.record)
    }

    pub fn get(&self, window_id: u64) -> Option<&PredictionWindow> {
        self.windows.iter().find(|w| w.id == window_id)
    }

    pub fn windows(&self) -> &[PredictionWindow] {
        &self.windows
    }

    pub fn records(&self) -> Vec<PredictionRecord> {
        self.windows.iter().map(|w| w.record.clone()).collect()
    }

    /// Settles every unresolved record against the final statistic for its
    /// snapshotted prop. Returns the records settled by this call.
    pub fn resolve_all<F>(&mut self, final_value: F) -> Vec<PredictionRecord>
    where
        F: Fn(&PropLine) -> f64,
    {
        let mut settled = Vec::new();
        for window in &mut self.windows {
            if window.record.status != PredictionStatus::Unresolved {
                continue;
            }
            match window.record.predicted {
                Some(predicted) => {
                    let actual = resolve_prop(&window.prop, final_value(&window.prop));
                    window.record.status = PredictionStatus::Resolved { actual };
                    window.record.score_delta = Some(prediction_score_delta(predicted, actual));
                }
                None => window.record.status = PredictionStatus::Lapsed,
            }
            settled.push(window.record.clone());
        }
        settled
    }
}
