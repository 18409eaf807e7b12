use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use tracing::debug;

use crate::config::SimConfig;
use crate::error::NarrationError;
use crate::http_client::http_client;
use crate::roster::{Matchup, Player};

pub const MIN_PLAYS: usize = 40;
pub const MAX_PLAYS: usize = 55;

/// Hard constraints forwarded to the narration service. The fallback
/// generator reads `play_budget` from here as well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConstraints {
    pub min_plays: usize,
    pub max_plays: usize,
    pub play_budget: usize,
    pub final_quarter: u8,
    pub min_touchdowns_per_player: u32,
    pub min_yards_per_player: u32,
    pub format: &'static str,
}

impl GenerationConstraints {
    pub fn with_budget(play_budget: usize) -> Self {
        Self {
            min_plays: MIN_PLAYS,
            max_plays: MAX_PLAYS,
            play_budget: play_budget.clamp(MIN_PLAYS, MAX_PLAYS),
            final_quarter: 4,
            min_touchdowns_per_player: 1,
            min_yards_per_player: 40,
            format: "JSON array of {\"type\":\"play\",quarter,clock,description,involved,home_score,away_score} \
                     records in order, ending with exactly one {\"type\":\"summary\",home_score,away_score,winner,stat_lines}",
        }
    }
}

impl Default for GenerationConstraints {
    fn default() -> Self {
        Self::with_budget(48)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrationRequest {
    pub matchup: Matchup,
    pub tracked: [Player; 2],
    pub constraints: GenerationConstraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Anything able to turn a request into a raw script body.
pub trait NarrationSource: Send + Sync {
    fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

#[derive(Debug, Clone)]
pub struct HttpNarrator {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpNarrator {
    pub fn from_config(cfg: &SimConfig) -> Option<Self> {
        let url = cfg.narration_url.clone()?;
        Some(Self {
            url,
            api_key: cfg.narration_api_key.clone(),
            timeout: cfg.narration_timeout,
        })
    }
}

impl NarrationSource for HttpNarrator {
    fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        let client = http_client().map_err(|err| {
            debug!(error = %err, "http client unavailable");
            NarrationError::Disabled
        })?;

        let mut req = client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(request);
        if let Some(key) = &self.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let resp = req.send().map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NarrationError::Status(status.as_u16()));
        }
        resp.text().map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> NarrationError {
    if err.is_timeout() {
        NarrationError::Timeout
    } else {
        NarrationError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::matchups;

    #[test]
    fn budget_is_clamped_to_play_bounds() {
        assert_eq!(GenerationConstraints::with_budget(10).play_budget, MIN_PLAYS);
        assert_eq!(GenerationConstraints::with_budget(90).play_budget, MAX_PLAYS);
        assert_eq!(GenerationConstraints::with_budget(47).play_budget, 47);
    }

    #[test]
    fn request_serializes_teams_players_and_constraints() {
        let matchup = matchups().remove(0);
        let tracked = matchup.default_tracked().unwrap();
        let req = NarrationRequest {
            matchup,
            tracked,
            constraints: GenerationConstraints::default(),
            model: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["constraints"]["final_quarter"], 4);
        assert_eq!(json["tracked"].as_array().map(|a| a.len()), Some(2));
        assert!(json["matchup"]["home"]["roster"].is_array());
        assert!(json.get("model").is_none());
    }

    #[test]
    fn unconfigured_narrator_is_none() {
        assert!(HttpNarrator::from_config(&SimConfig::default()).is_none());
    }
}
