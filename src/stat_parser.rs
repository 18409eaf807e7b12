use serde::{Deserialize, Serialize};

use crate::props::StatCategory;

/// Running per-category totals for one tracked player within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    pub passing_yards: u32,
    pub passing_tds: u32,
    pub rushing_yards: u32,
    pub rushing_tds: u32,
    pub receiving_yards: u32,
    pub receiving_tds: u32,
    pub receptions: u32,
}

impl StatLine {
    pub fn value(&self, category: StatCategory) -> f64 {
        let raw = match category {
            StatCategory::PassingYards => self.passing_yards,
            StatCategory::PassingTouchdowns => self.passing_tds,
            StatCategory::RushingYards => self.rushing_yards,
            StatCategory::RushingTouchdowns => self.rushing_tds,
            StatCategory::ReceivingYards => self.receiving_yards,
            StatCategory::ReceivingTouchdowns => self.receiving_tds,
        };
        raw as f64
    }

    pub fn touchdowns(&self) -> u32 {
        self.passing_tds + self.rushing_tds + self.receiving_tds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayKind {
    Receiving,
    Passing,
    Rushing,
}

/// Evaluated top to bottom; the first row with a matching keyword wins.
/// Receiving sits above passing because "catches pass" contains "pass".
pub const CATEGORY_RULES: &[(PlayKind, &[&str])] = &[
    (PlayKind::Receiving, &["catch", "reception", "receives"]),
    (PlayKind::Passing, &["pass", "completion"]),
    (PlayKind::Rushing, &["rush", "run"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPlay {
    pub kind: PlayKind,
    pub yards: u32,
    pub touchdown: bool,
}

pub fn classify(description: &str) -> Option<PlayKind> {
    let lower = description.to_ascii_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(kind, _)| *kind)
}

/// First integer sitting directly before a "yard"/"yards" token. Also accepts
/// the hyphenated "12-yard" form.
pub fn extract_yards(description: &str) -> Option<u32> {
    let tokens: Vec<String> = description
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-')
                .to_ascii_lowercase()
        })
        .collect();

    for (idx, token) in tokens.iter().enumerate() {
        if let Some((num, unit)) = token.split_once('-') {
            if is_yard_token(unit) {
                if let Ok(yards) = num.parse::<u32>() {
                    return Some(yards);
                }
            }
        }
        if is_yard_token(token) && idx > 0 {
            if let Ok(yards) = tokens[idx - 1].parse::<u32>() {
                return Some(yards);
            }
        }
    }
    None
}

pub fn is_touchdown(description: &str) -> bool {
    let lower = description.to_ascii_lowercase();
    if lower.contains("touchdown") || lower.contains("scores") {
        return true;
    }
    lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == "td")
}

pub fn parse_play(description: &str) -> Option<ParsedPlay> {
    let kind = classify(description)?;
    Some(ParsedPlay {
        kind,
        yards: extract_yards(description).unwrap_or(0),
        touchdown: is_touchdown(description),
    })
}

/// Returns the accumulator after crediting `description` to it. Totals only
/// ever grow; an unclassifiable description returns `stats` unchanged.
pub fn apply_play(stats: &StatLine, description: &str) -> StatLine {
    let mut next = *stats;
    let Some(parsed) = parse_play(description) else {
        return next;
    };
    let td = u32::from(parsed.touchdown);
    match parsed.kind {
        PlayKind::Receiving => {
            next.receiving_yards += parsed.yards;
            next.receptions += 1;
            next.receiving_tds += td;
        }
        PlayKind::Passing => {
            next.passing_yards += parsed.yards;
            next.passing_tds += td;
        }
        PlayKind::Rushing => {
            next.rushing_yards += parsed.yards;
            next.rushing_tds += td;
        }
    }
    next
}

fn is_yard_token(token: &str) -> bool {
    token == "yard" || token == "yards"
}
