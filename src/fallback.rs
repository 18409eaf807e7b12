//! Offline play-by-play generator used whenever narration is unavailable.
//!
//! Output is a pure function of the request and the random source, so a seeded
//! `StdRng` replays the same game. Clock and quarter rules:
//! - every play runs 5 to 15 seconds off the clock ("M:SS", borrowing a minute
//!   on underflow, clamped at "0:00");
//! - a quarter ends after its share of the play budget or when its clock hits
//!   "0:00", whichever comes first;
//! - nothing is ever emitted past the fourth quarter.
//!
//! The touchdown guarantee for tracked players is best-effort: late in the game
//! a scoreless tracked player is featured more often and given a fixed chance
//! of scoring on each touch, but a short budget can still run out first.

use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::game_clock::GameClock;
use crate::narration::NarrationRequest;
use crate::roster::{Player, Position};
use crate::script::{FINAL_QUARTER, FinalSummary, GameScript, PlayEvent, ScriptSource, Winner};

const SCORE_CHANCE: f64 = 0.08;
const SEVEN_POINT_SHARE: f64 = 0.70;
const BASE_TOUCHDOWN_CHANCE: f64 = 0.05;
const FORCED_TOUCHDOWN_CHANCE: f64 = 0.35;
const RUNOFF_SECS: RangeInclusive<u32> = 5..=15;

// Involvement weights out of 100: (player A, player B), remainder goes to filler.
const NORMAL_WEIGHTS: (u32, u32) = (35, 35);
const CATCH_UP_WEIGHT: u32 = 60;
const CATCH_UP_OTHER_WEIGHT: u32 = 20;

struct YardageProfile {
    common: RangeInclusive<u32>,
    breakaway: RangeInclusive<u32>,
    breakaway_chance: f64,
}

fn profile(position: Position) -> YardageProfile {
    match position {
        Position::QB => YardageProfile {
            common: 8..=15,
            breakaway: 20..=40,
            breakaway_chance: 0.15,
        },
        Position::RB => YardageProfile {
            common: 2..=8,
            breakaway: 10..=24,
            breakaway_chance: 0.12,
        },
        Position::WR | Position::TE => YardageProfile {
            common: 5..=15,
            breakaway: 15..=40,
            breakaway_chance: 0.15,
        },
    }
}

fn draw_yards<R: Rng + ?Sized>(position: Position, rng: &mut R) -> u32 {
    let p = profile(position);
    if rng.gen_bool(p.breakaway_chance) {
        rng.gen_range(p.breakaway)
    } else {
        rng.gen_range(p.common)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Tracked(usize),
    Filler,
}

fn pick_actor<R: Rng + ?Sized>(lagging: Option<usize>, rng: &mut R) -> Actor {
    let (weight_a, weight_b) = match lagging {
        Some(0) => (CATCH_UP_WEIGHT, CATCH_UP_OTHER_WEIGHT),
        Some(_) => (CATCH_UP_OTHER_WEIGHT, CATCH_UP_WEIGHT),
        None => NORMAL_WEIGHTS,
    };
    let roll = rng.gen_range(0..100);
    if roll < weight_a {
        Actor::Tracked(0)
    } else if roll < weight_a + weight_b {
        Actor::Tracked(1)
    } else {
        Actor::Filler
    }
}

pub fn generate_fallback<R: Rng + ?Sized>(request: &NarrationRequest, rng: &mut R) -> GameScript {
    let budget = request.constraints.play_budget.max(1);
    let per_quarter = budget.div_ceil(FINAL_QUARTER as usize);
    let catch_up_from = budget * 3 / 5;
    let tracked = &request.tracked;
    let fillers: Vec<&Player> = request
        .matchup
        .all_players()
        .filter(|p| !tracked.contains(p))
        .collect();

    let mut plays: Vec<PlayEvent> = Vec::with_capacity(budget);
    let mut quarter: u8 = 1;
    let mut clock = GameClock::start_of_quarter();
    let mut plays_in_quarter = 0usize;
    let mut home_score = 0u32;
    let mut away_score = 0u32;
    let mut touchdowns = [0u32; 2];

    while plays.len() < budget {
        let index = plays.len();
        let lagging: Vec<usize> = if index >= catch_up_from {
            (0..2).filter(|&i| touchdowns[i] == 0).collect()
        } else {
            Vec::new()
        };
        let focus = lagging.choose(rng).copied();

        let (description, involved) = match pick_actor(focus, rng) {
            Actor::Tracked(slot) => {
                let player = &tracked[slot];
                let forced = focus == Some(slot) && rng.gen_bool(FORCED_TOUCHDOWN_CHANCE);
                let touchdown = forced || rng.gen_bool(BASE_TOUCHDOWN_CHANCE);
                if touchdown {
                    touchdowns[slot] += 1;
                }
                let yards = draw_yards(player.position, rng);
                (
                    describe_tracked(player, yards, touchdown, rng),
                    vec![player.name.clone()],
                )
            }
            Actor::Filler => describe_filler(fillers.choose(rng).copied(), rng),
        };

        if rng.gen_bool(SCORE_CHANCE) {
            let points = if rng.gen_bool(SEVEN_POINT_SHARE) { 7 } else { 3 };
            if rng.gen_bool(0.5) {
                home_score += points;
            } else {
                away_score += points;
            }
        }

        plays.push(PlayEvent {
            index,
            quarter,
            clock: clock.to_string(),
            description,
            involved,
            home_score,
            away_score,
        });

        clock.run_off(rng.gen_range(RUNOFF_SECS));
        plays_in_quarter += 1;
        if plays_in_quarter >= per_quarter || clock.is_expired() {
            if quarter >= FINAL_QUARTER {
                break;
            }
            quarter += 1;
            clock = GameClock::start_of_quarter();
            plays_in_quarter = 0;
        }
    }

    // Closing lines are drawn on their own and are not reconciled with the plays.
    let stat_lines = tracked.iter().map(|p| closing_line(p, rng)).collect();

    GameScript {
        plays,
        summary: FinalSummary {
            home_score,
            away_score,
            winner: Winner::from_scores(home_score, away_score),
            stat_lines,
        },
        source: ScriptSource::Fallback,
    }
}

fn describe_tracked<R: Rng + ?Sized>(
    player: &Player,
    yards: u32,
    touchdown: bool,
    rng: &mut R,
) -> String {
    let name = &player.name;
    let pick = rng.gen_range(0..3);
    match (player.position, touchdown) {
        (Position::QB, false) => match pick {
            0 => format!("{name} completes a pass for {yards} yards"),
            1 => format!("{name} hits a pass over the middle for {yards} yards"),
            _ => format!("{name} throws a completion to the sideline for {yards} yards"),
        },
        (Position::QB, true) => match pick {
            0 => format!("{name} throws a {yards}-yard touchdown pass"),
            _ => format!("{name} fires a pass for {yards} yards, touchdown"),
        },
        (Position::RB, false) => match pick {
            0 => format!("{name} rushes for {yards} yards"),
            1 => format!("{name} runs up the middle for {yards} yards"),
            _ => format!("{name} bounces outside, rushing for {yards} yards"),
        },
        (Position::RB, true) => match pick {
            0 => format!("{name} rushes {yards} yards for a touchdown"),
            _ => format!("{name} runs it in from {yards} yards out, touchdown"),
        },
        (Position::WR | Position::TE, false) => match pick {
            0 => format!("{name} catches a pass for {yards} yards"),
            1 => format!("{name} hauls in a reception for {yards} yards"),
            _ => format!("{name} receives a short pass for {yards} yards"),
        },
        (Position::WR | Position::TE, true) => match pick {
            0 => format!("{name} catches a {yards}-yard touchdown pass"),
            _ => format!("{name} makes the catch for {yards} yards and scores"),
        },
    }
}

fn describe_filler<R: Rng + ?Sized>(player: Option<&Player>, rng: &mut R) -> (String, Vec<String>) {
    let Some(player) = player else {
        return ("Defense holds, no gain".to_string(), Vec::new());
    };
    let yards = draw_yards(player.position, rng);
    let name = &player.name;
    let text = match rng.gen_range(0..4) {
        0 => format!("{name} picks up {yards} yards"),
        1 => format!("{name} is brought down after {yards} yards"),
        2 => format!("Incomplete, intended for {name}"),
        _ => format!("{name} gains {yards} yards before stepping out"),
    };
    (text, vec![name.clone()])
}

fn closing_line<R: Rng + ?Sized>(player: &Player, rng: &mut R) -> String {
    let name = &player.name;
    match player.position {
        Position::QB => {
            let completions = rng.gen_range(18..=30);
            let attempts = completions + rng.gen_range(5..=14);
            let yards = rng.gen_range(180..=360);
            let tds = rng.gen_range(0..=4);
            format!("{name}: {completions}/{attempts}, {yards} yds, {tds} TD")
        }
        Position::RB => {
            let carries = rng.gen_range(12..=25);
            let yards = rng.gen_range(45..=140);
            let tds = rng.gen_range(0..=2);
            format!("{name}: {carries} car, {yards} yds, {tds} TD")
        }
        Position::WR | Position::TE => {
            let receptions = rng.gen_range(3..=10);
            let yards = rng.gen_range(35..=130);
            let tds = rng.gen_range(0..=2);
            format!("{name}: {receptions} rec, {yards} yds, {tds} TD")
        }
    }
}
