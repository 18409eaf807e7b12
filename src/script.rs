use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::NarrationError;
use crate::game_clock::GameClock;

pub const FINAL_QUARTER: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    #[serde(default)]
    pub index: usize,
    pub quarter: u8,
    pub clock: String,
    pub description: String,
    #[serde(default)]
    pub involved: Vec<String>,
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Home,
    Away,
    Tie,
}

impl Winner {
    pub fn from_scores(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Winner::Home,
            std::cmp::Ordering::Less => Winner::Away,
            std::cmp::Ordering::Equal => Winner::Tie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub home_score: u32,
    pub away_score: u32,
    pub winner: Winner,
    #[serde(default)]
    pub stat_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptSource {
    Narrated,
    Fallback,
}

impl ScriptSource {
    pub fn label(self) -> &'static str {
        match self {
            ScriptSource::Narrated => "narrated",
            ScriptSource::Fallback => "fallback",
        }
    }
}

/// Ordered plays terminated by exactly one summary. Quarters never decrease
/// and never exceed four.
#[derive(Debug, Clone, PartialEq)]
pub struct GameScript {
    pub plays: Vec<PlayEvent>,
    pub summary: FinalSummary,
    pub source: ScriptSource,
}

impl GameScript {
    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    /// The script as wire records: every play followed by the summary.
    pub fn to_records(&self) -> Vec<ScriptRecord> {
        self.plays
            .iter()
            .cloned()
            .map(ScriptRecord::Play)
            .chain(std::iter::once(ScriptRecord::Summary(self.summary.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScriptRecord {
    Play(PlayEvent),
    Summary(FinalSummary),
}

/// Decodes a narration response body into a validated script.
pub fn parse_script_json(raw: &str) -> Result<GameScript, NarrationError> {
    let body = strip_code_fence(raw);
    let records: Vec<ScriptRecord> =
        serde_json::from_str(body).map_err(NarrationError::Malformed)?;
    validate_records(records).map_err(|err| NarrationError::Shape(format!("{err:#}")))
}

pub fn validate_records(records: Vec<ScriptRecord>) -> Result<GameScript> {
    let mut plays = Vec::with_capacity(records.len());
    let mut summary = None;

    for (pos, record) in records.into_iter().enumerate() {
        if summary.is_some() {
            anyhow::bail!("record {pos} follows the summary");
        }
        match record {
            ScriptRecord::Play(mut play) => {
                check_play(&play, plays.last()).with_context(|| format!("play record {pos}"))?;
                play.index = plays.len();
                plays.push(play);
            }
            ScriptRecord::Summary(s) => summary = Some(s),
        }
    }

    let summary: FinalSummary = summary.context("script has no summary record")?;
    if plays.is_empty() {
        anyhow::bail!("script has no plays");
    }
    let expected = Winner::from_scores(summary.home_score, summary.away_score);
    if summary.winner != expected {
        anyhow::bail!(
            "summary winner {:?} contradicts score {}-{}",
            summary.winner,
            summary.home_score,
            summary.away_score
        );
    }
    Ok(GameScript {
        plays,
        summary,
        source: ScriptSource::Narrated,
    })
}

fn check_play(play: &PlayEvent, prev: Option<&PlayEvent>) -> Result<()> {
    if play.quarter == 0 || play.quarter > FINAL_QUARTER {
        anyhow::bail!("quarter {} outside 1..=4", play.quarter);
    }
    let clock = parse_clock(&play.clock)?;
    if let Some(prev) = prev {
        if play.quarter < prev.quarter {
            anyhow::bail!("quarter went backwards ({} -> {})", prev.quarter, play.quarter);
        }
        if play.quarter == prev.quarter && clock > parse_clock(&prev.clock)? {
            anyhow::bail!("clock went up within quarter ({} -> {})", prev.clock, play.clock);
        }
    }
    if play.description.trim().is_empty() {
        anyhow::bail!("empty description");
    }
    Ok(())
}

fn parse_clock(raw: &str) -> Result<GameClock> {
    raw.parse::<GameClock>().map_err(|msg| anyhow::anyhow!(msg))
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
